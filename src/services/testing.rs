//! In-memory stand-ins for the source bucket and OpenRelik.
//!
//! Both doubles append to one shared [`CallLog`], so tests can assert the
//! exact order of calls across the whole pipeline.

use super::{
    case_api::{CaseApi, CaseApiError},
    object_source::{ObjectSource, SourceError},
};
use crate::models::{
    FileId, FolderId, TemplateId, WorkflowId, folder::Folder, object::SourceObject,
    upload::UploadChunk,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::{
    collections::HashMap,
    io,
    sync::{Arc, Mutex},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    BucketLabels(String),
    OpenObject {
        bucket: String,
        object: String,
    },
    ListFolders(Option<FolderId>),
    CreateFolder {
        parent: Option<FolderId>,
        name: String,
    },
    UploadChunk {
        folder_id: FolderId,
        file_name: String,
        chunk_number: u64,
        total_chunks: u64,
        len: usize,
    },
    CreateWorkflow {
        folder_id: FolderId,
        file_ids: Vec<FileId>,
        template_id: TemplateId,
    },
    RunWorkflow {
        folder_id: FolderId,
        workflow_id: WorkflowId,
    },
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn recorded(log: &CallLog) -> Vec<Call> {
    log.lock().unwrap().clone()
}

fn record(log: &CallLog, call: Call) {
    log.lock().unwrap().push(call);
}

struct StoredObject {
    data: Vec<u8>,
    md5: Option<[u8; 16]>,
    /// Error injected after the stored bytes have been streamed.
    fail_mid_stream: bool,
}

/// Bucket labels and objects held in memory. Object bodies are streamed in
/// 3-byte pieces so consumers have to re-chunk them.
pub struct FakeSource {
    calls: CallLog,
    labels: HashMap<String, HashMap<String, String>>,
    objects: HashMap<(String, String), StoredObject>,
}

impl FakeSource {
    pub fn new(calls: CallLog) -> Self {
        Self {
            calls,
            labels: HashMap::new(),
            objects: HashMap::new(),
        }
    }

    pub fn with_labels(mut self, bucket: &str, pairs: &[(&str, &str)]) -> Self {
        let labels = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.labels.insert(bucket.to_string(), labels);
        self
    }

    /// Store an object whose reported MD5 matches its bytes.
    pub fn with_object(mut self, bucket: &str, name: &str, data: &[u8]) -> Self {
        self.objects.insert(
            (bucket.to_string(), name.to_string()),
            StoredObject {
                data: data.to_vec(),
                md5: Some(md5::compute(data).0),
                fail_mid_stream: false,
            },
        );
        self
    }

    pub fn with_reported_md5(mut self, bucket: &str, name: &str, md5: Option<[u8; 16]>) -> Self {
        if let Some(object) = self.objects.get_mut(&(bucket.to_string(), name.to_string())) {
            object.md5 = md5;
        }
        self
    }

    pub fn failing_mid_stream(mut self, bucket: &str, name: &str) -> Self {
        if let Some(object) = self.objects.get_mut(&(bucket.to_string(), name.to_string())) {
            object.fail_mid_stream = true;
        }
        self
    }
}

#[async_trait]
impl ObjectSource for FakeSource {
    async fn bucket_labels(&self, bucket: &str) -> Result<HashMap<String, String>, SourceError> {
        record(&self.calls, Call::BucketLabels(bucket.to_string()));
        self.labels
            .get(bucket)
            .cloned()
            .ok_or_else(|| SourceError::BucketNotFound(bucket.to_string()))
    }

    async fn open_object(&self, bucket: &str, object: &str) -> Result<SourceObject, SourceError> {
        record(
            &self.calls,
            Call::OpenObject {
                bucket: bucket.to_string(),
                object: object.to_string(),
            },
        );
        let stored = self
            .objects
            .get(&(bucket.to_string(), object.to_string()))
            .ok_or_else(|| SourceError::ObjectNotFound {
                bucket: bucket.to_string(),
                object: object.to_string(),
            })?;

        let mut pieces: Vec<io::Result<Bytes>> = stored
            .data
            .chunks(3)
            .map(|piece| Ok(Bytes::copy_from_slice(piece)))
            .collect();
        if stored.fail_mid_stream {
            pieces.push(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset",
            )));
        }

        Ok(SourceObject {
            size: Some(stored.data.len() as u64),
            md5: stored.md5,
            body: futures::stream::iter(pieces).boxed(),
        })
    }
}

#[derive(Default)]
struct FakeState {
    folders: Vec<Folder>,
    next_id: i64,
    uploaded: Vec<u8>,
    fail_folder_creation: bool,
    /// (parent, name, id) created by a "concurrent" writer when we try to create it.
    concurrent_folder: Option<(Option<FolderId>, String, FolderId)>,
    fail_folder_listing: bool,
    yield_after_list: bool,
    fail_upload: bool,
    upload_without_id: bool,
    fail_create_workflow: bool,
    fail_run_workflow: bool,
}

/// OpenRelik held in memory. Folder, file and workflow ids share one counter
/// starting at 100.
pub struct FakeCaseApi {
    calls: CallLog,
    state: Mutex<FakeState>,
}

impl FakeCaseApi {
    pub fn new(calls: CallLog) -> Self {
        Self {
            calls,
            state: Mutex::new(FakeState {
                next_id: 100,
                ..FakeState::default()
            }),
        }
    }

    pub fn with_folder(self, id: FolderId, parent: Option<FolderId>, name: &str) -> Self {
        self.state.lock().unwrap().folders.push(Folder {
            id,
            display_name: name.to_string(),
            parent_id: parent,
        });
        self
    }

    pub fn failing_folder_creation(self) -> Self {
        self.state.lock().unwrap().fail_folder_creation = true;
        self
    }

    /// Creating `name` under `parent` reports a conflict because another
    /// writer got there first with folder `id`.
    pub fn with_concurrent_folder(self, parent: Option<FolderId>, name: &str, id: FolderId) -> Self {
        self.state.lock().unwrap().concurrent_folder = Some((parent, name.to_string(), id));
        self
    }

    pub fn failing_folder_listing(self) -> Self {
        self.state.lock().unwrap().fail_folder_listing = true;
        self
    }

    /// Give other tasks a turn after every folder listing, so concurrent
    /// resolutions can interleave between list and create.
    pub fn yielding_after_list(self) -> Self {
        self.state.lock().unwrap().yield_after_list = true;
        self
    }

    pub fn failing_upload(self) -> Self {
        self.state.lock().unwrap().fail_upload = true;
        self
    }

    pub fn uploading_without_id(self) -> Self {
        self.state.lock().unwrap().upload_without_id = true;
        self
    }

    pub fn failing_workflow_creation(self) -> Self {
        self.state.lock().unwrap().fail_create_workflow = true;
        self
    }

    pub fn failing_workflow_run(self) -> Self {
        self.state.lock().unwrap().fail_run_workflow = true;
        self
    }

    pub fn folders(&self) -> Vec<Folder> {
        self.state.lock().unwrap().folders.clone()
    }

    pub fn uploaded_bytes(&self) -> Vec<u8> {
        self.state.lock().unwrap().uploaded.clone()
    }
}

fn server_error() -> CaseApiError {
    CaseApiError::Status {
        status: 500,
        body: "internal error".into(),
    }
}

impl FakeState {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[async_trait]
impl CaseApi for FakeCaseApi {
    async fn list_folders(&self, parent: Option<FolderId>) -> Result<Vec<Folder>, CaseApiError> {
        record(&self.calls, Call::ListFolders(parent));
        let (children, yield_after_list) = {
            let state = self.state.lock().unwrap();
            if state.fail_folder_listing {
                return Err(server_error());
            }
            let children: Vec<Folder> = state
                .folders
                .iter()
                .filter(|f| f.parent_id == parent)
                .cloned()
                .collect();
            (children, state.yield_after_list)
        };
        if yield_after_list {
            tokio::task::yield_now().await;
        }
        Ok(children)
    }

    async fn create_folder(
        &self,
        parent: Option<FolderId>,
        display_name: &str,
    ) -> Result<FolderId, CaseApiError> {
        record(
            &self.calls,
            Call::CreateFolder {
                parent,
                name: display_name.to_string(),
            },
        );
        let mut state = self.state.lock().unwrap();
        if let Some((racing_parent, racing_name, racing_id)) = state.concurrent_folder.take() {
            if racing_parent == parent && racing_name == display_name {
                state.folders.push(Folder {
                    id: racing_id,
                    display_name: racing_name,
                    parent_id: racing_parent,
                });
                return Err(CaseApiError::Conflict("folder already exists".into()));
            }
            state.concurrent_folder = Some((racing_parent, racing_name, racing_id));
        }
        if state.fail_folder_creation {
            return Err(server_error());
        }
        let id = state.allocate_id();
        state.folders.push(Folder {
            id,
            display_name: display_name.to_string(),
            parent_id: parent,
        });
        Ok(id)
    }

    async fn upload_chunk(&self, chunk: UploadChunk) -> Result<Option<FileId>, CaseApiError> {
        record(
            &self.calls,
            Call::UploadChunk {
                folder_id: chunk.folder_id,
                file_name: chunk.file_name.clone(),
                chunk_number: chunk.chunk_number,
                total_chunks: chunk.total_chunks,
                len: chunk.data.len(),
            },
        );
        let mut state = self.state.lock().unwrap();
        if state.fail_upload {
            return Err(server_error());
        }
        state.uploaded.extend_from_slice(&chunk.data);
        if !chunk.is_last() || state.upload_without_id {
            return Ok(None);
        }
        Ok(Some(state.allocate_id()))
    }

    async fn create_workflow(
        &self,
        folder_id: FolderId,
        file_ids: &[FileId],
        template_id: TemplateId,
    ) -> Result<WorkflowId, CaseApiError> {
        record(
            &self.calls,
            Call::CreateWorkflow {
                folder_id,
                file_ids: file_ids.to_vec(),
                template_id,
            },
        );
        let mut state = self.state.lock().unwrap();
        if state.fail_create_workflow {
            return Err(server_error());
        }
        Ok(state.allocate_id())
    }

    async fn run_workflow(
        &self,
        folder_id: FolderId,
        workflow_id: WorkflowId,
    ) -> Result<(), CaseApiError> {
        record(
            &self.calls,
            Call::RunWorkflow {
                folder_id,
                workflow_id,
            },
        );
        if self.state.lock().unwrap().fail_run_workflow {
            return Err(server_error());
        }
        Ok(())
    }
}
