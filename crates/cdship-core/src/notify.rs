//! Operator-facing progress reporting.

/// Reports workflow progress to the operator and asks for confirmation.
///
/// The CLI prints to the terminal; tests record the calls.
pub trait Notifier: Send + Sync {
    /// A progress comment ("Create zip archive").
    fn announce(&self, message: &str);

    /// A completed step or a status transition.
    fn success(&self, message: &str);

    fn warn(&self, message: &str);

    fn fail(&self, message: &str);

    /// Ask a yes/no question. Empty input takes `default`.
    fn confirm(&self, question: &str, default: bool) -> bool;
}
