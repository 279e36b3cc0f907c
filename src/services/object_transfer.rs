//! Streams an object from the source bucket into an OpenRelik folder.
//!
//! The object is re-chunked into fixed-size resumable upload chunks as it is
//! read, so at most one chunk is held in memory regardless of object size.
//! Length and checksum are verified before the final chunk goes out; the
//! server only assembles the file on the final chunk, so a bad transfer never
//! yields a file id.

use super::{
    case_api::{CaseApi, CaseApiError},
    object_source::{ObjectSource, SourceError},
};
use crate::models::{
    FileId, FolderId,
    upload::{UploadChunk, chunk_len, total_chunks},
};
use bytes::Bytes;
use std::{io, sync::Arc};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::StreamReader;
use tracing::{debug, warn};
use uuid::Uuid;

/// Default upload chunk size (8 MiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 8 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("failed to open source object: {0}")]
    Source(#[from] SourceError),
    #[error("failed to read source object: {0}")]
    Read(#[from] io::Error),
    #[error("upload rejected by OpenRelik: {0}")]
    Api(#[from] CaseApiError),
    #[error("source object ended after {received} of {expected} bytes")]
    Truncated { expected: u64, received: u64 },
    #[error("source object is larger than the declared {expected} bytes")]
    Oversized { expected: u64 },
    #[error("checksum mismatch: bucket reported {expected}, streamed {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("final upload chunk returned no file id")]
    MissingFileId,
}

#[derive(Clone)]
pub struct ObjectTransfer {
    source: Arc<dyn ObjectSource>,
    api: Arc<dyn CaseApi>,
    chunk_size: u64,
}

impl ObjectTransfer {
    /// `chunk_size` must be non-zero; configuration enforces it.
    pub fn new(source: Arc<dyn ObjectSource>, api: Arc<dyn CaseApi>, chunk_size: u64) -> Self {
        Self {
            source,
            api,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Copy `object_name` from `bucket` into `folder_id` as `file_name`.
    ///
    /// `size` is the size declared by the notification and determines the
    /// chunk layout.
    pub async fn upload(
        &self,
        bucket: &str,
        object_name: &str,
        file_name: &str,
        size: u64,
        folder_id: FolderId,
    ) -> Result<FileId, TransferError> {
        let object = self.source.open_object(bucket, object_name).await?;
        if let Some(reported) = object.size.filter(|reported| *reported != size) {
            warn!(
                "Object {} in {} is {} bytes but the event declared {}",
                object_name, bucket, reported, size
            );
        }

        let chunk_count = total_chunks(size, self.chunk_size);
        let identifier = format!("{}-{}", size, Uuid::new_v4().simple());
        let mut reader = StreamReader::new(object.body);
        let mut digest = md5::Context::new();
        let mut sent: u64 = 0;
        let mut file_id = None;

        for chunk_number in 1..=chunk_count {
            let expected_len = chunk_len(size, self.chunk_size, chunk_number);
            let data = read_chunk(&mut reader, expected_len).await?;
            if (data.len() as u64) < expected_len {
                return Err(TransferError::Truncated {
                    expected: size,
                    received: sent + data.len() as u64,
                });
            }
            digest.consume(&data);

            let chunk = UploadChunk {
                identifier: identifier.clone(),
                file_name: file_name.to_string(),
                folder_id,
                chunk_number,
                total_chunks: chunk_count,
                chunk_size: self.chunk_size,
                total_size: size,
                data,
            };
            let is_last = chunk.is_last();
            if is_last {
                ensure_exhausted(&mut reader, size).await?;
                if let Some(expected) = object.md5 {
                    let actual = std::mem::replace(&mut digest, md5::Context::new()).compute();
                    if actual.0 != expected {
                        return Err(TransferError::ChecksumMismatch {
                            expected: format!("{:x}", md5::Digest(expected)),
                            actual: format!("{:x}", actual),
                        });
                    }
                }
            }

            sent += chunk.data.len() as u64;
            let response = self.api.upload_chunk(chunk).await?;
            debug!(
                "Uploaded chunk {}/{} of {} ({} bytes so far)",
                chunk_number, chunk_count, file_name, sent
            );
            if is_last {
                file_id = response;
            }
        }

        file_id.ok_or(TransferError::MissingFileId)
    }
}

/// Read up to `len` bytes. Fewer bytes means the stream ended.
async fn read_chunk<R>(reader: &mut R, len: u64) -> io::Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(len as usize);
    reader.take(len).read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}

async fn ensure_exhausted<R>(reader: &mut R, expected: u64) -> Result<(), TransferError>
where
    R: AsyncRead + Unpin,
{
    let mut probe = [0u8; 1];
    if reader.read(&mut probe).await? != 0 {
        return Err(TransferError::Oversized { expected });
    }
    Ok(())
}
