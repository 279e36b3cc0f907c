//! Folder nodes in the OpenRelik folder tree.

use super::FolderId;
use serde::Deserialize;

/// A folder as returned by the OpenRelik folder listing endpoints.
///
/// Siblings are unique by `display_name`; the resolver relies on that when
/// deciding whether to create a folder.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Folder {
    pub id: FolderId,
    pub display_name: String,
    #[serde(default)]
    pub parent_id: Option<FolderId>,
}

/// Folder listings come back either as a bare array or wrapped in an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FolderListing {
    Plain(Vec<Folder>),
    Wrapped { folders: Vec<Folder> },
}

impl FolderListing {
    pub fn into_folders(self) -> Vec<Folder> {
        match self {
            FolderListing::Plain(folders) => folders,
            FolderListing::Wrapped { folders } => folders,
        }
    }
}

/// Find a child folder by exact display name.
pub fn find_by_name<'a>(folders: &'a [Folder], display_name: &str) -> Option<&'a Folder> {
    folders.iter().find(|f| f.display_name == display_name)
}
