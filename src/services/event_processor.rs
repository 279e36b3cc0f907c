//! Notification handling, in two phases.
//!
//! Phase one parses the request body and alone decides the HTTP answer: a
//! body that decodes as UTF-8 JSON is acknowledged with `200`, anything else
//! is a `400`. Phase two runs the business pipeline for the acknowledged
//! payload (bucket labels, folder resolution, transfer, workflow) inside the
//! same request, but its outcome is only logged and never changes the
//! acknowledgement. Redelivery is left entirely to the event source.

use super::{
    bucket_config::{self, ConfigError},
    case_api::CaseApi,
    folder_resolver::{FolderResolver, ResolveError},
    object_source::ObjectSource,
    object_transfer::{ObjectTransfer, TransferError},
    workflow_dispatcher::{DispatchError, WorkflowDispatcher},
};
use crate::models::{
    notification::{Acknowledgement, EventError, NotificationEvent},
    object::ObjectPath,
    workflow::Workflow,
};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Reasons a request body is rejected in phase one.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Error: Could not decode POST data from bytes (expected UTF-8).")]
    Decode(#[source] std::str::Utf8Error),
    #[error("Error: Invalid JSON format in POST data. Details: {0}")]
    InvalidJson(#[source] serde_json::Error),
}

/// Reasons the pipeline stopped for an acknowledged notification.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to parse payload: {0}")]
    Event(#[from] EventError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("no destination folder resolved for `{0}`")]
    NoDestination(String),
    #[error("error uploading `{object}` from bucket `{bucket}`: {source}")]
    Transfer {
        bucket: String,
        object: String,
        #[source]
        source: TransferError,
    },
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Clone)]
pub struct EventProcessor {
    source: Arc<dyn ObjectSource>,
    resolver: FolderResolver,
    transfer: ObjectTransfer,
    dispatcher: WorkflowDispatcher,
}

impl EventProcessor {
    pub fn new(source: Arc<dyn ObjectSource>, api: Arc<dyn CaseApi>, chunk_size: u64) -> Self {
        Self {
            resolver: FolderResolver::new(api.clone()),
            transfer: ObjectTransfer::new(source.clone(), api.clone(), chunk_size),
            dispatcher: WorkflowDispatcher::new(api),
            source,
        }
    }

    /// Handle one notification body.
    ///
    /// Returns the acknowledgement once the body parsed, after the pipeline
    /// has run to completion or stopped; pipeline failures are logged here.
    pub async fn process(
        &self,
        raw: &[u8],
        content_type: Option<&str>,
    ) -> Result<Acknowledgement, PayloadError> {
        let ack = Self::accept(raw, content_type)?;

        match self.run_pipeline(&ack.received_data).await {
            Ok(workflow) => info!(
                "Notification processed: workflow {} over files {:?} in folder {}",
                workflow.workflow_id, workflow.file_ids, workflow.folder_id
            ),
            Err(err) => error!("Notification processing stopped: {}", err),
        }

        Ok(ack)
    }

    /// Phase one: decode and parse the body.
    pub fn accept(raw: &[u8], content_type: Option<&str>) -> Result<Acknowledgement, PayloadError> {
        let is_json = content_type
            .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false);
        if !is_json {
            warn!(
                "Received POST request without 'application/json' Content-Type ({:?})",
                content_type
            );
        }

        let text = std::str::from_utf8(raw).map_err(|err| {
            let err = PayloadError::Decode(err);
            warn!("{}", err);
            err
        })?;
        let parsed: Value = serde_json::from_str(text).map_err(|err| {
            let err = PayloadError::InvalidJson(err);
            warn!("{}", err);
            err
        })?;

        info!("Successfully parsed JSON: {}", parsed);
        Ok(Acknowledgement::success(parsed))
    }

    /// Phase two: labels, folders, transfer, workflow.
    pub async fn run_pipeline(&self, received: &Value) -> Result<Workflow, PipelineError> {
        let event = NotificationEvent::from_received(received)?;
        info!(
            "Bucket: {}, Object: {}, Size: {}",
            event.bucket, event.object_name, event.size
        );

        let config = bucket_config::lookup(self.source.as_ref(), &event.bucket).await?;
        info!(
            "folder_id: {}, template_id: {}",
            config.root_folder_id, config.template_id
        );

        let path = ObjectPath::parse(&event.object_name);
        let folder_id = if path.has_folders() {
            let resolved = self
                .resolver
                .resolve(Some(config.root_folder_id), &path.folders)
                .await?
                .ok_or_else(|| PipelineError::NoDestination(event.object_name.clone()))?;
            info!("folder_id updated to: {}", resolved);
            resolved
        } else {
            config.root_folder_id
        };
        info!("File name: {}", path.file_name);

        let file_id = self
            .transfer
            .upload(
                &event.bucket,
                &event.object_name,
                &path.file_name,
                event.size,
                folder_id,
            )
            .await
            .map_err(|source| PipelineError::Transfer {
                bucket: event.bucket.clone(),
                object: event.object_name.clone(),
                source,
            })?;
        info!(
            "Successfully streamed {} to OpenRelik, file_id: {}",
            path.file_name, file_id
        );

        Ok(self
            .dispatcher
            .dispatch(folder_id, vec![file_id], config.template_id)
            .await?)
    }
}
