//! Merge-and-verify assembly of chunked payloads.
//!
//! The merge walks chunk indices in logical order, never arrival order, and
//! enforces the binary-correctness contract: every copy is bounds-checked
//! against the declared size before it happens, and the final offset must
//! equal the declared size exactly.

use crate::error::{Error, Result};
use bytes::Bytes;
use std::collections::BTreeMap;

/// Assemble `total_chunks` chunks into one contiguous payload of exactly
/// `total_size` bytes.
///
/// Chunks are concatenated by index `0..total_chunks`. A chunk that would
/// overflow the remaining declared space fails before any out-of-bounds write
/// is attempted; a final length mismatch fails after the loop. Both surface
/// as [`Error::Corrupted`].
pub fn merge_chunks(
    total_size: u64,
    total_chunks: u32,
    chunks: &BTreeMap<u32, Bytes>,
) -> Result<Bytes> {
    // The payload is materialized in one buffer, so the declared size must be
    // addressable on this platform. Checked here rather than discovered via a
    // failed (or silently truncating) allocation.
    let capacity = usize::try_from(total_size).map_err(|_| Error::SizeExceeded {
        size: total_size,
        limit: usize::MAX as u64,
    })?;

    let mut buffer = Vec::with_capacity(capacity);
    for index in 0..total_chunks {
        let chunk = chunks.get(&index).ok_or(Error::Incomplete {
            received: chunks.len() as u32,
            expected: total_chunks,
        })?;

        let remaining = capacity - buffer.len();
        if chunk.len() > remaining {
            return Err(Error::Corrupted(format!(
                "chunk {} is {} bytes but only {} bytes of declared space remain",
                index,
                chunk.len(),
                remaining
            )));
        }
        buffer.extend_from_slice(chunk);
    }

    if buffer.len() != capacity {
        return Err(Error::Corrupted(format!(
            "assembled {} bytes, declared total size is {}",
            buffer.len(),
            capacity
        )));
    }

    Ok(Bytes::from(buffer))
}
