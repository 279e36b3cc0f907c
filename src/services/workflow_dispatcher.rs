//! Creates and starts OpenRelik workflows for uploaded files.

use super::case_api::{CaseApi, CaseApiError};
use crate::models::{FileId, FolderId, TemplateId, WorkflowId, workflow::Workflow};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to create workflow in folder {folder_id}: {source}")]
    Create {
        folder_id: FolderId,
        #[source]
        source: CaseApiError,
    },
    #[error("failed to run workflow {workflow_id}: {source}")]
    Run {
        workflow_id: WorkflowId,
        #[source]
        source: CaseApiError,
    },
}

#[derive(Clone)]
pub struct WorkflowDispatcher {
    api: Arc<dyn CaseApi>,
}

impl WorkflowDispatcher {
    pub fn new(api: Arc<dyn CaseApi>) -> Self {
        Self { api }
    }

    /// Create a workflow from `template_id` over `file_ids`.
    ///
    /// No deduplication happens here: every call creates a new workflow.
    pub async fn create(
        &self,
        folder_id: FolderId,
        file_ids: &[FileId],
        template_id: TemplateId,
    ) -> Result<WorkflowId, DispatchError> {
        self.api
            .create_workflow(folder_id, file_ids, template_id)
            .await
            .map_err(|source| DispatchError::Create { folder_id, source })
    }

    pub async fn run(&self, folder_id: FolderId, workflow_id: WorkflowId) -> Result<(), DispatchError> {
        self.api
            .run_workflow(folder_id, workflow_id)
            .await
            .map_err(|source| DispatchError::Run { workflow_id, source })
    }

    /// Create the workflow, then run it. A failed create never reaches run.
    pub async fn dispatch(
        &self,
        folder_id: FolderId,
        file_ids: Vec<FileId>,
        template_id: TemplateId,
    ) -> Result<Workflow, DispatchError> {
        let workflow_id = self.create(folder_id, &file_ids, template_id).await?;
        info!("Successfully created workflow, workflow_id: {}", workflow_id);

        self.run(folder_id, workflow_id).await?;
        info!("Successfully ran workflow, workflow_id: {}", workflow_id);

        Ok(Workflow {
            workflow_id,
            folder_id,
            file_ids,
            template_id,
        })
    }
}
