//! Services behind the notification endpoint.
//!
//! `object_source` and `case_api` are the seams to the outside world (the
//! source bucket and OpenRelik); `gcs_source` and `openrelik_client` are their
//! HTTP implementations. The remaining modules build the pipeline on top of
//! those traits.

pub mod bucket_config;
pub mod case_api;
pub mod event_processor;
pub mod folder_resolver;
pub mod gcs_source;
pub mod object_source;
pub mod object_transfer;
pub mod openrelik_client;
pub mod workflow_dispatcher;

#[cfg(test)]
pub mod testing;
