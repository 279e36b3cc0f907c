//! Read access to the source bucket.

use crate::models::object::SourceObject;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("object `{object}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, object: String },
    #[error("storage API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid storage endpoint `{0}`")]
    InvalidEndpoint(String),
    #[error("failed to obtain storage access token: {0}")]
    Auth(String),
    #[error("unexpected storage response: {0}")]
    Decode(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// A bucket store the gateway reads labels and object bytes from.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// Labels set on `bucket`. A bucket without labels yields an empty map.
    async fn bucket_labels(&self, bucket: &str) -> Result<HashMap<String, String>, SourceError>;

    /// Open `object` for streaming.
    async fn open_object(&self, bucket: &str, object: &str) -> Result<SourceObject, SourceError>;
}
