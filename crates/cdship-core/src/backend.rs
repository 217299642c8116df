//! Seams to the external services — injected for testability.
//!
//! The AWS implementations live in `cdship-aws`; tests substitute in-memory
//! fakes with scripted responses.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::types::{DeploymentRequest, DeploymentSnapshot, StoredObject};

/// Failure reported by a backend call.
#[derive(Debug, Clone, Error)]
#[error("{operation} failed: {message}")]
pub struct BackendError {
    pub operation: &'static str,
    pub message: String,
}

impl BackendError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Boxed future alias for backend results.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

/// Object storage holding published revisions.
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `bucket`/`key` with public-read visibility.
    fn put_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
        body: Vec<u8>,
    ) -> BackendFuture<'a, StoredObject>;

    /// Whether the object is currently retrievable.
    fn object_exists<'a>(&'a self, bucket: &'a str, key: &'a str) -> BackendFuture<'a, bool>;
}

/// The managed deployment orchestrator.
pub trait Orchestrator: Send + Sync {
    /// Start a deployment and return its identifier.
    fn create_deployment<'a>(&'a self, request: &'a DeploymentRequest) -> BackendFuture<'a, String>;

    /// Fetch the current state of a deployment.
    fn get_deployment<'a>(&'a self, deployment_id: &'a str)
    -> BackendFuture<'a, DeploymentSnapshot>;
}
