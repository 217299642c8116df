//! S3 revision store.

use aws_config::SdkConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use cdship_core::config::AwsConfig;
use cdship_core::{BackendError, BackendFuture, ObjectStore, StoredObject};
use tracing::debug;

pub struct S3Store {
    client: Client,
    region: Option<String>,
    endpoint_url: Option<String>,
}

impl S3Store {
    pub fn new(sdk: &SdkConfig, aws: &AwsConfig) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk);
        // Custom endpoints (MinIO, LocalStack) rarely resolve virtual-hosted buckets.
        if aws.endpoint_url.is_some() {
            builder = builder.force_path_style(true);
        }
        Self {
            client: Client::from_conf(builder.build()),
            region: sdk.region().map(|r| r.to_string()),
            endpoint_url: aws.endpoint_url.clone(),
        }
    }
}

impl ObjectStore for S3Store {
    fn put_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
        body: Vec<u8>,
    ) -> BackendFuture<'a, StoredObject> {
        Box::pin(async move {
            let output = self
                .client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(ByteStream::from(body))
                .acl(ObjectCannedAcl::PublicRead)
                .send()
                .await
                .map_err(|e| BackendError::new("PutObject", DisplayErrorContext(&e).to_string()))?;

            let etag = output
                .e_tag()
                .map(normalize_etag)
                .ok_or_else(|| BackendError::new("PutObject", "response carried no ETag"))?;
            debug!(bucket, key, %etag, "object stored");

            Ok(StoredObject {
                etag,
                url: object_url(
                    bucket,
                    key,
                    self.region.as_deref(),
                    self.endpoint_url.as_deref(),
                ),
            })
        })
    }

    fn object_exists<'a>(&'a self, bucket: &'a str, key: &'a str) -> BackendFuture<'a, bool> {
        Box::pin(async move {
            match self.client.head_object().bucket(bucket).key(key).send().await {
                Ok(_) => Ok(true),
                Err(err) => match err.as_service_error() {
                    Some(e) if e.is_not_found() => Ok(false),
                    _ => Err(BackendError::new(
                        "HeadObject",
                        DisplayErrorContext(&err).to_string(),
                    )),
                },
            }
        })
    }
}

/// S3 quotes ETags; CodeDeploy expects the bare token.
fn normalize_etag(raw: &str) -> String {
    raw.trim_matches('"').to_string()
}

/// Public URL of an object.
fn object_url(bucket: &str, key: &str, region: Option<&str>, endpoint: Option<&str>) -> String {
    let key = key.trim_start_matches('/');
    match (endpoint, region) {
        (Some(endpoint), _) => format!("{}/{bucket}/{key}", endpoint.trim_end_matches('/')),
        (None, Some(region)) => format!("https://{bucket}.s3.{region}.amazonaws.com/{key}"),
        (None, None) => format!("https://{bucket}.s3.amazonaws.com/{key}"),
    }
}
