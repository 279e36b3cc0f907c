//! Core data models for the eventarc gateway.
//!
//! These types describe what flows through the notification pipeline: the
//! inbound event, the per-bucket configuration read from labels, the folder
//! tree and file uploads on the OpenRelik side, and the workflow started at
//! the end. Identifiers are OpenRelik's integer ids.

pub mod bucket;
pub mod folder;
pub mod notification;
pub mod object;
pub mod upload;
pub mod workflow;

/// OpenRelik folder id.
pub type FolderId = i64;

/// OpenRelik file id, returned once an upload completes.
pub type FileId = i64;

/// OpenRelik workflow template id.
pub type TemplateId = i64;

/// OpenRelik workflow id.
pub type WorkflowId = i64;
