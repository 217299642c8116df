//! cdship pack — turn a prepared directory into a deployable zip revision.
//!
//! - **`prepare`** runs the project's optional preparation command
//! - **`archive`** walks the source tree and writes the zip

pub mod archive;
pub mod prepare;

pub use archive::{ArchiveError, ArchiveOptions, ArchiveSummary, archive};
pub use prepare::{PrepareError, prepare};
