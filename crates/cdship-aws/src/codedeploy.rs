//! CodeDeploy orchestrator.

use aws_config::SdkConfig;
use aws_sdk_codedeploy::Client;
use aws_sdk_codedeploy::error::DisplayErrorContext;
use aws_sdk_codedeploy::types::{
    BundleType, DeploymentInfo, RevisionLocation, RevisionLocationType, S3Location,
};
use cdship_core::{
    BackendError, BackendFuture, DeploymentRequest, DeploymentSnapshot, ErrorInfo, Orchestrator,
    Revision,
};
use chrono::{DateTime, Utc};
use tracing::debug;

pub struct CodeDeployOrchestrator {
    client: Client,
}

impl CodeDeployOrchestrator {
    pub fn new(sdk: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk),
        }
    }
}

impl Orchestrator for CodeDeployOrchestrator {
    fn create_deployment<'a>(&'a self, request: &'a DeploymentRequest) -> BackendFuture<'a, String> {
        Box::pin(async move {
            let output = self
                .client
                .create_deployment()
                .application_name(&request.application_name)
                .deployment_group_name(&request.deployment_group)
                .revision(revision_location(&request.revision))
                .deployment_config_name(&request.deployment_config_name)
                .description(&request.description)
                .ignore_application_stop_failures(request.ignore_application_stop_failures)
                .send()
                .await
                .map_err(|e| {
                    BackendError::new("CreateDeployment", DisplayErrorContext(&e).to_string())
                })?;

            output
                .deployment_id()
                .map(str::to_string)
                .ok_or_else(|| BackendError::new("CreateDeployment", "response carried no deploymentId"))
        })
    }

    fn get_deployment<'a>(
        &'a self,
        deployment_id: &'a str,
    ) -> BackendFuture<'a, DeploymentSnapshot> {
        Box::pin(async move {
            let output = self
                .client
                .get_deployment()
                .deployment_id(deployment_id)
                .send()
                .await
                .map_err(|e| {
                    BackendError::new("GetDeployment", DisplayErrorContext(&e).to_string())
                })?;

            let info = output.deployment_info().ok_or_else(|| {
                BackendError::new("GetDeployment", "response carried no deploymentInfo")
            })?;
            let snapshot = snapshot_from(info);
            debug!(deployment = deployment_id, status = %snapshot.status, "polled deployment");
            Ok(snapshot)
        })
    }
}

/// Zip bundle in S3, pinned to the uploaded ETag.
fn revision_location(revision: &Revision) -> RevisionLocation {
    let location = S3Location::builder()
        .bucket(&revision.bucket)
        .key(&revision.key)
        .bundle_type(BundleType::Zip)
        .e_tag(&revision.etag)
        .build();
    RevisionLocation::builder()
        .revision_type(RevisionLocationType::S3)
        .s3_location(location)
        .build()
}

fn snapshot_from(info: &DeploymentInfo) -> DeploymentSnapshot {
    DeploymentSnapshot {
        status: info
            .status()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        error: info.error_information().map(|e| ErrorInfo {
            code: e.code().map(|c| c.as_str().to_string()).unwrap_or_default(),
            message: e.message().unwrap_or_default().to_string(),
        }),
        complete_time: info
            .complete_time()
            .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos())),
    }
}
