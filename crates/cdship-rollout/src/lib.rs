//! cdship rollout — everything after the archive exists.
//!
//! # Components
//!
//! - **`publisher`** — upload the archive and wait until the store serves it
//! - **`monitor`** — create the deployment and poll it to a terminal state
//! - **`workflow`** — confirmation gate plus prepare → archive → publish → deploy

pub mod monitor;
pub mod publisher;
pub mod workflow;

pub use monitor::{MonitorError, MonitorSettings, Observation, RolloutMonitor, StatusTracker, Verdict};
pub use publisher::{PublishError, PublishSettings, RevisionPublisher};
pub use workflow::{Workflow, WorkflowError, WorkflowOptions, pack_revision};
