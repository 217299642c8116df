//! Shared AWS SDK configuration.
//!
//! Credentials come from the standard provider chain unless a profile or an
//! explicit credentials file is configured.

use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use cdship_core::config::AwsConfig;
use tracing::debug;

pub async fn load_sdk_config(aws: &AwsConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = &aws.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(profile) = &aws.profile {
        loader = loader.profile_name(profile);
    }
    if let Some(path) = &aws.credentials_file {
        debug!(path = %path.display(), "using explicit credentials file");
        let files = ProfileFiles::builder()
            .include_default_config_file(true)
            .with_file(ProfileFileKind::Credentials, path)
            .build();
        loader = loader.profile_files(files);
    }
    if let Some(endpoint) = &aws.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }

    let sdk = loader.load().await;
    debug!(region = ?sdk.region(), "loaded AWS configuration");
    sdk
}
