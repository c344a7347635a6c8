//! Firmware artifact streaming.
//!
//! The artifact is served in chunks sized by the spool file's preferred I/O
//! block size. Chunk count and the byte count of the final chunk are both
//! reconstructed from the file's allocation metadata rather than a running
//! total, so the stream advertises exactly the bytes the file holds.

pub mod source;

pub use source::RemoteArtifactSource;

use bytes::Bytes;
use futures_util::Stream;
use futures_util::stream;
use thiserror::Error;
use tokio::io::AsyncReadExt;

use crate::middleware::cache::BoxFuture;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FirmwareError {
    #[error("artifact fetch failed: {0}")]
    Fetch(String),
    #[error("artifact read failed: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Artifact source
// ---------------------------------------------------------------------------

/// Produces a readable spool file holding the artifact.
///
/// One fetch per streaming request; the handle drops with the stream, which
/// is the only place it is ever closed.
pub trait ArtifactSource: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, Result<tokio::fs::File, FirmwareError>>;
}

// ---------------------------------------------------------------------------
// Block layout
// ---------------------------------------------------------------------------

/// Allocation unit the kernel reports block counts in.
const ALLOC_UNIT: u64 = 512;

/// Chunking geometry for one artifact, lifted from file metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactLayout {
    /// Exact byte length of the artifact.
    pub file_size: u64,
    /// Preferred I/O block size; one chunk is one block.
    pub io_block_size: u64,
    /// Allocated 512-byte units backing the file.
    pub allocated_blocks: u64,
}

impl ArtifactLayout {
    /// Read the geometry from file metadata. Targets without allocation
    /// metadata get a synthesized 4 KiB layout.
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            Self {
                file_size: meta.size(),
                io_block_size: meta.blksize(),
                allocated_blocks: meta.blocks(),
            }
        }
        #[cfg(not(unix))]
        {
            let io_block_size = 4096u64;
            let file_size = meta.len();
            Self {
                file_size,
                io_block_size,
                allocated_blocks: file_size.div_ceil(io_block_size)
                    * (io_block_size / ALLOC_UNIT),
            }
        }
    }

    /// Number of chunks to stream: the 512-unit allocation count converted
    /// into whole preferred-size blocks.
    pub fn io_block_count(&self) -> u64 {
        if self.io_block_size > ALLOC_UNIT {
            self.allocated_blocks / (self.io_block_size / ALLOC_UNIT)
        } else if self.io_block_size < ALLOC_UNIT {
            self.allocated_blocks * (ALLOC_UNIT / self.io_block_size)
        } else {
            self.allocated_blocks
        }
    }

    /// Bytes of real data in the final chunk. The allocation count overshoots
    /// the file size; the overshoot comes off the last block.
    pub fn final_chunk_len(&self) -> u64 {
        let slack = (self.allocated_blocks * ALLOC_UNIT).saturating_sub(self.file_size);
        self.io_block_size.saturating_sub(slack)
    }
}

// ---------------------------------------------------------------------------
// Chunk stream
// ---------------------------------------------------------------------------

struct StreamState {
    file: tokio::fs::File,
    layout: ArtifactLayout,
    next_block: u64,
}

/// Stream the artifact as [`ArtifactLayout::io_block_count`] chunks of
/// `io_block_size` bytes each.
///
/// Every chunk is filled completely before it is yielded. A chunk cut short
/// by end-of-file is truncated to [`ArtifactLayout::final_chunk_len`] and
/// ends the stream. A read error is yielded once and also ends the stream.
pub fn chunk_stream(
    file: tokio::fs::File,
    layout: ArtifactLayout,
) -> impl Stream<Item = Result<Bytes, FirmwareError>> + Send {
    let state = StreamState {
        file,
        layout,
        next_block: 0,
    };

    stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        if state.next_block >= state.layout.io_block_count() {
            return None;
        }

        let block_size = state.layout.io_block_size as usize;
        let mut buf = vec![0u8; block_size];
        let mut filled = 0;
        while filled < block_size {
            match state.file.read(&mut buf[filled..]).await {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) => return Some((Err(FirmwareError::Io(e)), None)),
            }
        }

        state.next_block += 1;
        if filled < block_size {
            // End of file inside this block: advertise only the real bytes.
            let valid = state.layout.final_chunk_len().min(filled as u64) as usize;
            buf.truncate(valid);
            return Some((Ok(Bytes::from(buf)), None));
        }

        Some((Ok(Bytes::from(buf)), Some(state)))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
