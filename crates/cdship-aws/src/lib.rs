//! AWS implementations of the cdship backend seams.
//!
//! - **`sdk`** — shared SDK configuration from `[aws]` settings
//! - **`s3`** — [`S3Store`], the revision store
//! - **`codedeploy`** — [`CodeDeployOrchestrator`], the deployment orchestrator

pub mod codedeploy;
pub mod s3;
pub mod sdk;

pub use codedeploy::CodeDeployOrchestrator;
pub use s3::S3Store;
pub use sdk::load_sdk_config;

use cdship_core::config::AwsConfig;

/// Build both AWS clients from one shared SDK configuration.
pub async fn connect(aws: &AwsConfig) -> (S3Store, CodeDeployOrchestrator) {
    let sdk = load_sdk_config(aws).await;
    (S3Store::new(&sdk, aws), CodeDeployOrchestrator::new(&sdk))
}
