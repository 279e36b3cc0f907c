//! Workflows started in OpenRelik after an upload.

use super::{FileId, FolderId, TemplateId, WorkflowId};
use serde::Deserialize;

/// A workflow this gateway created and ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    pub workflow_id: WorkflowId,
    pub folder_id: FolderId,
    pub file_ids: Vec<FileId>,
    pub template_id: TemplateId,
}

/// Workflow as stored by OpenRelik. `spec_json` is the serialized spec the
/// template expanded into; it has to be echoed back to start the run.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRecord {
    pub id: WorkflowId,
    #[serde(default)]
    pub spec_json: Option<String>,
}
