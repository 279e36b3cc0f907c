//! Resumable upload chunks sent to OpenRelik.

use super::FolderId;
use bytes::Bytes;

/// A single chunk of a resumable upload.
///
/// Chunk numbers are 1-based. Every chunk of one upload shares the same
/// `identifier`, which is how the server stitches them back together.
#[derive(Debug, Clone)]
pub struct UploadChunk {
    pub identifier: String,
    pub file_name: String,
    pub folder_id: FolderId,
    pub chunk_number: u64,
    pub total_chunks: u64,
    /// Nominal chunk size; only the final chunk may be shorter.
    pub chunk_size: u64,
    pub total_size: u64,
    pub data: Bytes,
}

impl UploadChunk {
    pub fn is_last(&self) -> bool {
        self.chunk_number == self.total_chunks
    }
}

/// Number of chunks needed for `total_size` bytes. Empty objects still take one.
pub fn total_chunks(total_size: u64, chunk_size: u64) -> u64 {
    total_size.div_ceil(chunk_size).max(1)
}

/// Byte length of chunk `chunk_number` (1-based).
pub fn chunk_len(total_size: u64, chunk_size: u64, chunk_number: u64) -> u64 {
    let offset = (chunk_number - 1) * chunk_size;
    total_size.saturating_sub(offset).min(chunk_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_counts() {
        assert_eq!(total_chunks(0, 8), 1);
        assert_eq!(total_chunks(8, 8), 1);
        assert_eq!(total_chunks(9, 8), 2);
        assert_eq!(total_chunks(1024, 100), 11);
    }

    #[test]
    fn final_chunk_is_short() {
        assert_eq!(chunk_len(1024, 100, 1), 100);
        assert_eq!(chunk_len(1024, 100, 11), 24);
        assert_eq!(chunk_len(0, 100, 1), 0);
    }
}
