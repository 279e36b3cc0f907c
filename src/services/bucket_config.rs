//! Per-bucket configuration lookup.
//!
//! Buckets opt into the gateway by carrying two integer labels, `template_id`
//! and `folder_id`. Both are required; anything else is a typed failure.

use super::object_source::{ObjectSource, SourceError};
use crate::models::bucket::{BucketConfig, FOLDER_LABEL, TEMPLATE_LABEL};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("bucket `{bucket}` has no `{label}` label")]
    MissingLabel { bucket: String, label: &'static str },
    #[error("bucket `{bucket}` label `{label}` is not an integer: `{value}`")]
    MalformedLabel {
        bucket: String,
        label: &'static str,
        value: String,
    },
    #[error("could not read labels of bucket `{bucket}`: {source}")]
    Lookup {
        bucket: String,
        #[source]
        source: SourceError,
    },
}

/// Read the labels of `bucket` and turn them into a [`BucketConfig`].
pub async fn lookup(source: &dyn ObjectSource, bucket: &str) -> Result<BucketConfig, ConfigError> {
    let labels = source
        .bucket_labels(bucket)
        .await
        .map_err(|source| ConfigError::Lookup {
            bucket: bucket.to_string(),
            source,
        })?;
    tracing::info!("Bucket labels for {}: {:?}", bucket, labels);
    from_labels(bucket, &labels)
}

pub fn from_labels(
    bucket: &str,
    labels: &HashMap<String, String>,
) -> Result<BucketConfig, ConfigError> {
    Ok(BucketConfig {
        template_id: integer_label(bucket, labels, TEMPLATE_LABEL)?,
        root_folder_id: integer_label(bucket, labels, FOLDER_LABEL)?,
    })
}

fn integer_label(
    bucket: &str,
    labels: &HashMap<String, String>,
    label: &'static str,
) -> Result<i64, ConfigError> {
    let value = labels.get(label).ok_or_else(|| ConfigError::MissingLabel {
        bucket: bucket.to_string(),
        label,
    })?;
    value.parse::<i64>().map_err(|_| ConfigError::MalformedLabel {
        bucket: bucket.to_string(),
        label,
        value: value.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{FakeSource, call_log};

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn both_labels_parse_as_integers() {
        let cfg = from_labels("b1", &labels(&[("template_id", "5"), ("folder_id", "10")])).unwrap();
        assert_eq!(
            cfg,
            BucketConfig {
                template_id: 5,
                root_folder_id: 10,
            }
        );
    }

    #[test]
    fn missing_label_is_reported_by_name() {
        let err = from_labels("b1", &labels(&[("folder_id", "10")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingLabel {
                label: "template_id",
                ..
            }
        ));
    }

    #[test]
    fn non_integer_label_is_not_coerced() {
        let err = from_labels("b1", &labels(&[("template_id", "5"), ("folder_id", "ten")]))
            .unwrap_err();
        match err {
            ConfigError::MalformedLabel { label, value, .. } => {
                assert_eq!(label, "folder_id");
                assert_eq!(value, "ten");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn lookup_failure_is_wrapped() {
        let source = FakeSource::new(call_log());
        let err = lookup(&source, "unknown").await.unwrap_err();
        assert!(matches!(err, ConfigError::Lookup { .. }));
    }
}
