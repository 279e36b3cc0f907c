//! Maps an object's folder path onto the OpenRelik folder tree.
//!
//! For every path segment the children of the current folder are listed and
//! searched by display name; a missing folder is created. OpenRelik is the
//! source of truth, so nothing is cached between calls.
//!
//! The list-then-create step for a given parent runs under a per-parent lock,
//! which keeps concurrent notifications in this process from creating
//! duplicate siblings. A parent's lock is dropped from the map once nobody
//! holds or waits on it. Another writer can still race us; when OpenRelik
//! answers a create with a conflict the parent is listed again and the
//! existing folder is used.

use super::case_api::{CaseApi, CaseApiError};
use crate::models::{FolderId, folder::find_by_name};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to list folders under {parent}: {source}")]
    List {
        parent: String,
        #[source]
        source: CaseApiError,
    },
}

type ParentLocks = HashMap<Option<FolderId>, Arc<AsyncMutex<()>>>;

#[derive(Clone)]
pub struct FolderResolver {
    api: Arc<dyn CaseApi>,
    locks: Arc<Mutex<ParentLocks>>,
}

impl FolderResolver {
    pub fn new(api: Arc<dyn CaseApi>) -> Self {
        Self {
            api,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Walk `folders` starting at `root` and return the id of the last one.
    ///
    /// `root` of `None` starts at the top of the tree. If creating a folder
    /// fails for any reason other than a conflict, the failure is logged and
    /// the walk continues from the parent, so the remaining segments end up
    /// one level higher. Listing failures abort the walk.
    pub async fn resolve(
        &self,
        root: Option<FolderId>,
        folders: &[String],
    ) -> Result<Option<FolderId>, ResolveError> {
        let mut current = root;
        for name in folders {
            info!("Processing folder `{}` under {}", name, describe(current));
            let lease = self.lease(current);
            let _guard = lease.lock.lock().await;
            current = self.find_or_create(current, name).await?;
        }
        Ok(current)
    }

    async fn find_or_create(
        &self,
        parent: Option<FolderId>,
        name: &str,
    ) -> Result<Option<FolderId>, ResolveError> {
        if let Some(existing) = self.find(parent, name).await? {
            debug!("Found folder `{}` ({}) under {}", name, existing, describe(parent));
            return Ok(Some(existing));
        }

        match self.api.create_folder(parent, name).await {
            Ok(id) => {
                info!("Created folder `{}` ({}) under {}", name, id, describe(parent));
                Ok(Some(id))
            }
            Err(CaseApiError::Conflict(reason)) => {
                warn!(
                    "Folder `{}` under {} was created concurrently ({}), listing again",
                    name,
                    describe(parent),
                    reason
                );
                match self.find(parent, name).await? {
                    Some(id) => Ok(Some(id)),
                    None => {
                        error!(
                            "Folder `{}` under {} reported as existing but not listed",
                            name,
                            describe(parent)
                        );
                        Ok(parent)
                    }
                }
            }
            Err(err) => {
                error!("Error creating folder `{}` under {}: {}", name, describe(parent), err);
                Ok(parent)
            }
        }
    }

    async fn find(&self, parent: Option<FolderId>, name: &str) -> Result<Option<FolderId>, ResolveError> {
        let children = self
            .api
            .list_folders(parent)
            .await
            .map_err(|source| ResolveError::List {
                parent: describe(parent),
                source,
            })?;
        Ok(find_by_name(&children, name).map(|folder| folder.id))
    }

    fn lease(&self, parent: Option<FolderId>) -> ParentLease {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        ParentLease {
            locks: self.locks.clone(),
            parent,
            lock: locks.entry(parent).or_default().clone(),
        }
    }
}

/// A handle on one parent's lock. Dropping the last handle removes the
/// parent from the map.
struct ParentLease {
    locks: Arc<Mutex<ParentLocks>>,
    parent: Option<FolderId>,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for ParentLease {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Release our reference under the map lock so concurrent drops see
        // each other's counts. Two left means the map's and ours.
        let lock = std::mem::take(&mut self.lock);
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&self.parent);
        }
    }
}

fn describe(folder: Option<FolderId>) -> String {
    match folder {
        Some(id) => format!("folder {}", id),
        None => "the root".to_string(),
    }
}
