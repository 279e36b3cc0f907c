//! Per-bucket configuration carried on the source bucket's labels.

use super::{FolderId, TemplateId};

/// Label holding the OpenRelik workflow template to run.
pub const TEMPLATE_LABEL: &str = "template_id";

/// Label holding the OpenRelik folder that mirrors the bucket root.
pub const FOLDER_LABEL: &str = "folder_id";

/// Where objects from a bucket land in OpenRelik and what runs on them.
///
/// Read fresh for every event, since labels are mutable bucket metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketConfig {
    /// Template used for every workflow started from this bucket.
    pub template_id: TemplateId,

    /// Folder that object paths are resolved under.
    pub root_folder_id: FolderId,
}
