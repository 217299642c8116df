//! Rollout monitor: creates the deployment and watches it to completion.
//!
//! The orchestrator owns the deployment; this side only observes it. Each
//! poll result goes through [`StatusTracker`], which suppresses repeated
//! statuses so the operator sees one line per transition.

use std::time::Duration;

use cdship_core::{
    BackendError, DeploymentOutcome, DeploymentRequest, DeploymentSnapshot, ErrorInfo, Notifier,
    Orchestrator, ShipConfig, Shutdown,
};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("failed to create deployment: {0}")]
    CreateDeploymentFailed(#[source] BackendError),
    #[error("failed to query deployment {deployment_id}: {source}")]
    StatusQueryFailed {
        deployment_id: String,
        source: BackendError,
    },
    #[error("deployment {deployment_id} still running after {}s", waited.as_secs())]
    DeadlineExceeded {
        deployment_id: String,
        waited: Duration,
    },
    #[error("stopped watching deployment {deployment_id}; it keeps running")]
    Cancelled { deployment_id: String },
    #[error("cancelled before the deployment was created")]
    CancelledBeforeCreate,
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    /// Stop watching after this long. `None` waits forever.
    pub deadline: Option<Duration>,
}

impl MonitorSettings {
    pub fn from_config(config: &ShipConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            deadline: config.deadline(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            deadline: None,
        }
    }
}

/// Whether the deployment has reached a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pending,
    Succeeded(DateTime<Utc>),
    Failed(ErrorInfo),
}

/// Result of feeding one snapshot to the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// The new status, if it differs from the previous observation.
    pub transition: Option<String>,
    pub verdict: Verdict,
}

/// Status-diffing state machine.
#[derive(Debug, Default)]
pub struct StatusTracker {
    last_status: Option<String>,
}

impl StatusTracker {
    pub fn observe(&mut self, snapshot: &DeploymentSnapshot) -> Observation {
        // An error descriptor ends the watch, whatever the status says.
        if let Some(error) = snapshot.error() {
            return Observation {
                transition: None,
                verdict: Verdict::Failed(error.clone()),
            };
        }

        let transition = if self.last_status.as_deref() == Some(snapshot.status.as_str()) {
            None
        } else {
            self.last_status = Some(snapshot.status.clone());
            Some(snapshot.status.clone())
        };

        let verdict = if snapshot.is_failed_status() {
            Verdict::Failed(ErrorInfo {
                code: snapshot.status.clone(),
                message: format!("deployment ended with status {}", snapshot.status),
            })
        } else if let Some(at) = snapshot.complete_time {
            Verdict::Succeeded(at)
        } else {
            Verdict::Pending
        };

        Observation { transition, verdict }
    }
}

pub struct RolloutMonitor<'a> {
    orchestrator: &'a dyn Orchestrator,
    settings: MonitorSettings,
}

impl<'a> RolloutMonitor<'a> {
    pub fn new(orchestrator: &'a dyn Orchestrator, settings: MonitorSettings) -> Self {
        Self {
            orchestrator,
            settings,
        }
    }

    /// Create the deployment and watch it to a terminal state.
    ///
    /// A deployment that ends with an error is an `Ok(Failed { .. })`
    /// outcome, not an `Err`.
    pub async fn deploy(
        &self,
        request: &DeploymentRequest,
        notifier: &dyn Notifier,
        shutdown: &mut Shutdown,
    ) -> Result<DeploymentOutcome, MonitorError> {
        if shutdown.is_triggered() {
            return Err(MonitorError::CancelledBeforeCreate);
        }
        let deployment_id = self
            .orchestrator
            .create_deployment(request)
            .await
            .map_err(MonitorError::CreateDeploymentFailed)?;

        info!(
            deployment = %deployment_id,
            application = %request.application_name,
            group = %request.deployment_group,
            etag = %request.revision.etag,
            "deployment created"
        );
        notifier.success(&format!("Deployment created with ID: {deployment_id}"));

        self.watch(&deployment_id, notifier, shutdown).await
    }

    /// Poll an existing deployment until it succeeds or fails.
    pub async fn watch(
        &self,
        deployment_id: &str,
        notifier: &dyn Notifier,
        shutdown: &mut Shutdown,
    ) -> Result<DeploymentOutcome, MonitorError> {
        let started = Instant::now();
        let mut tracker = StatusTracker::default();

        loop {
            let snapshot = self
                .orchestrator
                .get_deployment(deployment_id)
                .await
                .map_err(|source| MonitorError::StatusQueryFailed {
                    deployment_id: deployment_id.to_string(),
                    source,
                })?;

            let observation = tracker.observe(&snapshot);

            if let Some(status) = &observation.transition {
                debug!(deployment = %deployment_id, %status, "status changed");
                notifier.success(&format!("Deployment status: {status}"));
            }

            match observation.verdict {
                Verdict::Failed(error) => {
                    warn!(
                        deployment = %deployment_id,
                        code = %error.code,
                        message = %error.message,
                        "deployment failed"
                    );
                    notifier.fail(&format!("Error occurred: {} {}", error.code, error.message));
                    return Ok(DeploymentOutcome::Failed {
                        deployment_id: deployment_id.to_string(),
                        status: Some(snapshot.status),
                        error,
                    });
                }
                Verdict::Succeeded(completed_at) => {
                    info!(deployment = %deployment_id, %completed_at, "deployment finished");
                    notifier.success("Deployment finished!");
                    return Ok(DeploymentOutcome::Succeeded {
                        deployment_id: deployment_id.to_string(),
                        status: snapshot.status,
                        completed_at,
                    });
                }
                Verdict::Pending => {}
            }

            if let Some(deadline) = self.settings.deadline {
                if started.elapsed() >= deadline {
                    return Err(MonitorError::DeadlineExceeded {
                        deployment_id: deployment_id.to_string(),
                        waited: deadline,
                    });
                }
            }
            if !shutdown.sleep(self.settings.poll_interval).await {
                return Err(MonitorError::Cancelled {
                    deployment_id: deployment_id.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdship_core::{BackendFuture, Revision};
    use chrono::TimeZone;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn done_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    struct Scripted {
        responses: Mutex<VecDeque<DeploymentSnapshot>>,
        creates: AtomicUsize,
        polls: AtomicUsize,
    }

    impl Scripted {
        fn new(responses: Vec<DeploymentSnapshot>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                creates: AtomicUsize::new(0),
                polls: AtomicUsize::new(0),
            }
        }
    }

    impl Orchestrator for Scripted {
        fn create_deployment<'a>(&'a self, _request: &'a DeploymentRequest) -> BackendFuture<'a, String> {
            Box::pin(async move {
                self.creates.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BackendError>("d-TEST".to_string())
            })
        }

        fn get_deployment<'a>(
            &'a self,
            _deployment_id: &'a str,
        ) -> BackendFuture<'a, DeploymentSnapshot> {
            Box::pin(async move {
                self.polls.fetch_add(1, Ordering::SeqCst);
                self.responses
                    .lock()
                    .unwrap()
                    .pop_front()
                    .ok_or_else(|| BackendError::new("GetDeployment", "script exhausted"))
            })
        }
    }

    #[derive(Default)]
    struct Lines(Mutex<Vec<String>>);

    impl Notifier for Lines {
        fn announce(&self, message: &str) {
            self.0.lock().unwrap().push(format!("comment: {message}"));
        }
        fn success(&self, message: &str) {
            self.0.lock().unwrap().push(format!("success: {message}"));
        }
        fn warn(&self, message: &str) {
            self.0.lock().unwrap().push(format!("warn: {message}"));
        }
        fn fail(&self, message: &str) {
            self.0.lock().unwrap().push(format!("error: {message}"));
        }
        fn confirm(&self, _question: &str, default: bool) -> bool {
            default
        }
    }

    fn request() -> DeploymentRequest {
        DeploymentRequest {
            application_name: "shop".into(),
            deployment_group: "staging".into(),
            revision: Revision {
                bucket: "b".into(),
                key: "app.zip".into(),
                etag: "\"xyz\"".into(),
                url: "https://b.s3.amazonaws.com/app.zip".into(),
            },
            deployment_config_name: "CodeDeployDefault.OneAtATime".into(),
            description: "test".into(),
            ignore_application_stop_failures: true,
        }
    }

    #[test]
    fn tracker_suppresses_repeats() {
        let mut tracker = StatusTracker::default();
        let seen: Vec<Option<String>> = ["Created", "Created", "InProgress", "InProgress"]
            .iter()
            .map(|s| tracker.observe(&DeploymentSnapshot::new(s)).transition)
            .collect();
        assert_eq!(
            seen,
            vec![Some("Created".into()), None, Some("InProgress".into()), None]
        );
    }

    #[test]
    fn tracker_error_wins_over_status() {
        let mut tracker = StatusTracker::default();
        tracker.observe(&DeploymentSnapshot::new("InProgress"));
        let obs = tracker.observe(
            &DeploymentSnapshot::new("InProgress").with_error("SCRIPT_FAILED", "hook exited 1"),
        );
        assert_eq!(obs.transition, None);
        assert!(matches!(obs.verdict, Verdict::Failed(ref e) if e.code == "SCRIPT_FAILED"));
    }

    #[test]
    fn tracker_failed_status_without_error_info() {
        let mut tracker = StatusTracker::default();
        let obs = tracker.observe(&DeploymentSnapshot::new("Stopped").completed_at(done_at()));
        assert_eq!(obs.transition.as_deref(), Some("Stopped"));
        assert!(matches!(obs.verdict, Verdict::Failed(ref e) if e.code == "Stopped"));
    }

    #[test]
    fn tracker_completion_on_repeated_status() {
        let mut tracker = StatusTracker::default();
        tracker.observe(&DeploymentSnapshot::new("Succeeded"));
        let obs = tracker.observe(&DeploymentSnapshot::new("Succeeded").completed_at(done_at()));
        assert_eq!(obs.transition, None);
        assert_eq!(obs.verdict, Verdict::Succeeded(done_at()));
    }

    #[tokio::test(start_paused = true)]
    async fn prints_only_transitions_until_complete() {
        let orchestrator = Scripted::new(vec![
            DeploymentSnapshot::new("A"),
            DeploymentSnapshot::new("A"),
            DeploymentSnapshot::new("B"),
            DeploymentSnapshot::new("B"),
            DeploymentSnapshot::new("C").completed_at(done_at()),
        ]);
        let notifier = Lines::default();
        let monitor = RolloutMonitor::new(&orchestrator, MonitorSettings::default());

        let outcome = monitor
            .deploy(&request(), &notifier, &mut Shutdown::never())
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.deployment_id(), "d-TEST");
        let lines = notifier.0.lock().unwrap().clone();
        assert_eq!(
            lines,
            vec![
                "success: Deployment created with ID: d-TEST",
                "success: Deployment status: A",
                "success: Deployment status: B",
                "success: Deployment status: C",
                "success: Deployment finished!",
            ]
        );
        assert_eq!(orchestrator.polls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn error_stops_polling_immediately() {
        let orchestrator = Scripted::new(vec![
            DeploymentSnapshot::new("InProgress"),
            DeploymentSnapshot::new("Failed").with_error("HEALTH_CONSTRAINTS", "too many failed instances"),
            DeploymentSnapshot::new("Succeeded").completed_at(done_at()),
        ]);
        let notifier = Lines::default();
        let monitor = RolloutMonitor::new(&orchestrator, MonitorSettings::default());

        let outcome = monitor
            .watch("d-1", &notifier, &mut Shutdown::never())
            .await
            .unwrap();

        match outcome {
            DeploymentOutcome::Failed { error, status, .. } => {
                assert_eq!(error.code, "HEALTH_CONSTRAINTS");
                assert_eq!(status.as_deref(), Some("Failed"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(orchestrator.polls.load(Ordering::SeqCst), 2);
        assert_eq!(
            notifier.0.lock().unwrap().last().unwrap(),
            "error: Error occurred: HEALTH_CONSTRAINTS too many failed instances"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_bounds_the_watch() {
        let orchestrator = Scripted::new(vec![DeploymentSnapshot::new("InProgress"); 20]);
        let settings = MonitorSettings {
            poll_interval: Duration::from_secs(1),
            deadline: Some(Duration::from_secs(3)),
        };
        let monitor = RolloutMonitor::new(&orchestrator, settings);

        let err = monitor
            .watch("d-1", &Lines::default(), &mut Shutdown::never())
            .await
            .unwrap_err();

        assert!(matches!(err, MonitorError::DeadlineExceeded { .. }), "got {err}");
        assert_eq!(orchestrator.polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_is_honoured_between_polls() {
        let orchestrator = Scripted::new(vec![DeploymentSnapshot::new("InProgress"); 5]);
        let monitor = RolloutMonitor::new(&orchestrator, MonitorSettings::default());
        let (tx, mut shutdown) = Shutdown::channel();
        tx.send(true).unwrap();

        let err = monitor
            .watch("d-1", &Lines::default(), &mut shutdown)
            .await
            .unwrap_err();

        assert!(matches!(err, MonitorError::Cancelled { .. }));
        assert_eq!(orchestrator.polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_create_makes_no_calls() {
        let orchestrator = Scripted::new(vec![DeploymentSnapshot::new("Created")]);
        let monitor = RolloutMonitor::new(&orchestrator, MonitorSettings::default());
        let (tx, mut shutdown) = Shutdown::channel();
        tx.send(true).unwrap();

        let err = monitor
            .deploy(&request(), &Lines::default(), &mut shutdown)
            .await
            .unwrap_err();

        assert!(matches!(err, MonitorError::CancelledBeforeCreate), "got {err}");
        assert_eq!(orchestrator.creates.load(Ordering::SeqCst), 0);
        assert_eq!(orchestrator.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn error_on_first_poll_keeps_its_status() {
        let orchestrator = Scripted::new(vec![
            DeploymentSnapshot::new("Failed").with_error("REVISION_MISSING", "bundle not found"),
        ]);
        let monitor = RolloutMonitor::new(&orchestrator, MonitorSettings::default());

        let outcome = monitor
            .watch("d-1", &Lines::default(), &mut Shutdown::never())
            .await
            .unwrap();

        match outcome {
            DeploymentOutcome::Failed { status, error, .. } => {
                assert_eq!(status.as_deref(), Some("Failed"));
                assert_eq!(error.code, "REVISION_MISSING");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn query_failure_is_an_error() {
        let orchestrator = Scripted::new(vec![DeploymentSnapshot::new("Created")]);
        let monitor = RolloutMonitor::new(&orchestrator, MonitorSettings::default());

        let err = monitor
            .watch("d-1", &Lines::default(), &mut Shutdown::never())
            .await
            .unwrap_err();

        assert!(matches!(err, MonitorError::StatusQueryFailed { .. }));
    }
}
