use std::process::ExitCode;

use anyhow::Context;
use cdship_core::{DeploymentOutcome, Notifier, ShipConfig, Shutdown};
use cdship_rollout::{Workflow, WorkflowError, WorkflowOptions};

use crate::console::ConsoleNotifier;

pub struct DeployArgs {
    pub group: String,
    pub description: Option<String>,
    pub yes: bool,
    pub skip_prepare: bool,
}

pub async fn run(config: &ShipConfig, args: DeployArgs) -> anyhow::Result<ExitCode> {
    config.validate().context("cdship deploy needs an application and a bucket")?;

    let mut options = WorkflowOptions::new(&args.group, args.description);
    options.assume_yes = args.yes;
    options.skip_prepare = args.skip_prepare;

    let (store, orchestrator) = cdship_aws::connect(&config.aws).await;
    let notifier = ConsoleNotifier::new();
    let workflow = Workflow::new(config, &store, &orchestrator);

    // Prompt and packing block the runtime thread, so Ctrl-C keeps its default
    // behaviour until the remote phase starts.
    let released = match workflow
        .confirm(&options, &notifier)
        .and_then(|()| cdship_rollout::pack_revision(config, options.skip_prepare, &notifier))
    {
        Ok(summary) => {
            let mut shutdown = interrupt_on_ctrl_c();
            workflow
                .release(&options, &summary, &notifier, &mut shutdown)
                .await
        }
        Err(e) => Err(e),
    };

    match released {
        Ok(DeploymentOutcome::Succeeded { deployment_id, .. }) => {
            tracing::info!(deployment = %deployment_id, "deployment succeeded");
            Ok(ExitCode::SUCCESS)
        }
        Ok(DeploymentOutcome::Failed { deployment_id, .. }) => {
            tracing::info!(deployment = %deployment_id, "deployment failed");
            Ok(ExitCode::FAILURE)
        }
        Err(WorkflowError::Aborted) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            notifier.fail(&format!("{:#}", anyhow::Error::new(e)));
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Route Ctrl-C into a [`Shutdown`] instead of terminating the process.
fn interrupt_on_ctrl_c() -> Shutdown {
    let (tx, shutdown) = Shutdown::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping at the next poll");
            let _ = tx.send(true);
        }
    });
    shutdown
}
