//! The deploy workflow: confirm, prepare, archive, publish, deploy.
//!
//! Steps run strictly in order and each one completes before the next
//! starts. Operator output goes through the [`Notifier`]; nothing here
//! touches the terminal directly.

use cdship_core::{
    DeploymentOutcome, DeploymentRequest, Notifier, ObjectStore, Orchestrator, ShipConfig,
    Shutdown, default_description,
};
use cdship_pack::{ArchiveError, ArchiveOptions, ArchiveSummary, PrepareError};
use chrono::Local;
use thiserror::Error;
use tracing::info;

use crate::monitor::{MonitorError, MonitorSettings, RolloutMonitor};
use crate::publisher::{PublishError, PublishSettings, RevisionPublisher};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("deployment aborted by operator")]
    Aborted,
    #[error("no deployment group given")]
    MissingGroup,
    #[error("deployment cancelled before anything was uploaded")]
    Cancelled,
    #[error(transparent)]
    Prepare(#[from] PrepareError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub group: String,
    pub description: String,
    /// Skip the confirmation prompt.
    pub assume_yes: bool,
    /// Archive the source tree as it is, without the prepare command.
    pub skip_prepare: bool,
}

impl WorkflowOptions {
    /// Options for `group`; a missing description is stamped with the
    /// current local time.
    pub fn new(group: &str, description: Option<String>) -> Self {
        Self {
            group: group.to_string(),
            description: description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| default_description(Local::now())),
            assume_yes: false,
            skip_prepare: false,
        }
    }
}

pub struct Workflow<'a> {
    config: &'a ShipConfig,
    store: &'a dyn ObjectStore,
    orchestrator: &'a dyn Orchestrator,
}

impl<'a> Workflow<'a> {
    pub fn new(
        config: &'a ShipConfig,
        store: &'a dyn ObjectStore,
        orchestrator: &'a dyn Orchestrator,
    ) -> Self {
        Self {
            config,
            store,
            orchestrator,
        }
    }

    pub async fn run(
        &self,
        options: &WorkflowOptions,
        notifier: &dyn Notifier,
        shutdown: &mut Shutdown,
    ) -> Result<DeploymentOutcome, WorkflowError> {
        self.confirm(options, notifier)?;
        if shutdown.is_triggered() {
            return Err(WorkflowError::Cancelled);
        }
        let summary = pack_revision(self.config, options.skip_prepare, notifier)?;
        self.release(options, &summary, notifier, shutdown).await
    }

    /// Check the options and ask the operator to go ahead.
    pub fn confirm(
        &self,
        options: &WorkflowOptions,
        notifier: &dyn Notifier,
    ) -> Result<(), WorkflowError> {
        if options.group.trim().is_empty() {
            return Err(WorkflowError::MissingGroup);
        }

        let question = format!(
            "Proceed with deployment to group \"{}\" with description \"{}\"?",
            options.group, options.description
        );
        if !options.assume_yes && !notifier.confirm(&question, true) {
            notifier.success("Deployment stopped");
            return Err(WorkflowError::Aborted);
        }
        Ok(())
    }

    /// Publish a built archive and roll it out. Nothing remote happens once
    /// `shutdown` has fired.
    pub async fn release(
        &self,
        options: &WorkflowOptions,
        summary: &ArchiveSummary,
        notifier: &dyn Notifier,
        shutdown: &mut Shutdown,
    ) -> Result<DeploymentOutcome, WorkflowError> {
        if shutdown.is_triggered() {
            return Err(WorkflowError::Cancelled);
        }

        info!(
            application = %self.config.deploy.application,
            group = %options.group,
            "starting deployment"
        );

        notifier.announce("Push revision to S3");
        let publisher =
            RevisionPublisher::new(self.store, PublishSettings::from_config(self.config));
        let revision = publisher
            .publish(
                &summary.path,
                &self.config.deploy.bucket,
                self.config.object_key(),
                shutdown,
            )
            .await?;
        notifier.success(&format!("Object created: {}", revision.url));

        notifier.announce("Create deployment");
        let request =
            DeploymentRequest::new(self.config, &options.group, revision, &options.description);
        let monitor =
            RolloutMonitor::new(self.orchestrator, MonitorSettings::from_config(self.config));
        Ok(monitor.deploy(&request, notifier, shutdown).await?)
    }
}

/// Run the prepare command (unless skipped) and build the archive.
pub fn pack_revision(
    config: &ShipConfig,
    skip_prepare: bool,
    notifier: &dyn Notifier,
) -> Result<ArchiveSummary, WorkflowError> {
    let source_dir = config.source_dir();

    match config.project.prepare.as_deref() {
        Some(command) if !skip_prepare => {
            notifier.announce(&format!("Preparing {} with `{command}`", source_dir.display()));
            cdship_pack::prepare(command, &config.project.root)?;
            notifier.success(&format!("Files prepared: {}", source_dir.display()));
        }
        _ => {}
    }

    notifier.announce("Create zip archive");
    let options = ArchiveOptions {
        skip_unreadable: config.project.skip_unreadable,
    };
    let summary = cdship_pack::archive(&source_dir, &config.archive_path(), &options)?;

    for path in &summary.skipped {
        notifier.warn(&format!("Skipped unreadable entry: {}", path.display()));
    }
    notifier.success(&format!(
        "Archive created: {} ({} files)",
        summary.path.display(),
        summary.entries.len()
    ));
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_description_gets_timestamp() {
        let options = WorkflowOptions::new("staging", None);
        assert!(options.description.starts_with("Deploy from CLI on "));
        assert_eq!(options.description.len(), "Deploy from CLI on 2024-01-01 00:00:00".len());
    }

    #[test]
    fn blank_description_gets_timestamp() {
        let options = WorkflowOptions::new("staging", Some("  ".into()));
        assert!(options.description.starts_with("Deploy from CLI on "));
    }

    #[test]
    fn explicit_description_is_kept() {
        let options = WorkflowOptions::new("prod", Some("hotfix #42".into()));
        assert_eq!(options.description, "hotfix #42");
        assert!(!options.assume_yes);
    }
}
