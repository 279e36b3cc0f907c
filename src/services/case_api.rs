//! The OpenRelik operations the pipeline depends on.

use crate::models::{
    FileId, FolderId, TemplateId, WorkflowId, folder::Folder, upload::UploadChunk,
};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaseApiError {
    #[error("OpenRelik returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("OpenRelik reported a conflict: {0}")]
    Conflict(String),
    #[error("OpenRelik response carried no {0} id")]
    MissingId(&'static str),
    #[error("could not refresh OpenRelik access token: {0}")]
    Auth(String),
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Folder, upload and workflow endpoints of the case-management system.
///
/// A `None` parent means the top of the folder tree.
#[async_trait]
pub trait CaseApi: Send + Sync {
    async fn list_folders(&self, parent: Option<FolderId>) -> Result<Vec<Folder>, CaseApiError>;

    /// Create a folder and return its id. A name clash surfaces as
    /// [`CaseApiError::Conflict`] when the server reports one.
    async fn create_folder(
        &self,
        parent: Option<FolderId>,
        display_name: &str,
    ) -> Result<FolderId, CaseApiError>;

    /// Send one chunk of a resumable upload. Returns the file id once the
    /// server has assembled the complete file, `None` for accepted chunks
    /// before that.
    async fn upload_chunk(&self, chunk: UploadChunk) -> Result<Option<FileId>, CaseApiError>;

    async fn create_workflow(
        &self,
        folder_id: FolderId,
        file_ids: &[FileId],
        template_id: TemplateId,
    ) -> Result<WorkflowId, CaseApiError>;

    async fn run_workflow(
        &self,
        folder_id: FolderId,
        workflow_id: WorkflowId,
    ) -> Result<(), CaseApiError>;
}
