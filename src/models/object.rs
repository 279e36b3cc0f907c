//! Source objects: how an object name maps onto folders, and the byte stream
//! read from the bucket.

use bytes::Bytes;
use futures::stream::BoxStream;
use std::io;

/// Streamed object payload.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// An object name split into the folders it lives under and its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    /// Folder names, outermost first. Empty when the object sits at the bucket root.
    pub folders: Vec<String>,

    /// Last path segment.
    pub file_name: String,
}

impl ObjectPath {
    /// Split `object_name` on `/`.
    ///
    /// Segments are kept verbatim, empty ones included, so the folder chain
    /// mirrors the object name exactly.
    pub fn parse(object_name: &str) -> Self {
        let mut segments: Vec<String> = object_name.split('/').map(str::to_string).collect();
        // split always yields at least one segment
        let file_name = segments.pop().unwrap_or_default();
        Self {
            folders: segments,
            file_name,
        }
    }

    pub fn has_folders(&self) -> bool {
        !self.folders.is_empty()
    }
}

/// An opened source object.
pub struct SourceObject {
    /// Size reported by the bucket, if any.
    pub size: Option<u64>,

    /// MD5 digest reported by the bucket, if any.
    pub md5: Option<[u8; 16]>,

    /// Object bytes.
    pub body: ByteStream,
}

impl std::fmt::Debug for SourceObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceObject")
            .field("size", &self.size)
            .field("md5", &self.md5)
            .finish_non_exhaustive()
    }
}
