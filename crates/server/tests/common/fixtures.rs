//! Test data helpers.

use serde_json::{Value, json};

/// Deterministic payload of the given size.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub fn test_payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Split a payload into `count` chunks; the last chunk takes the remainder.
#[allow(dead_code)]
pub fn split_into_chunks(payload: &[u8], count: usize) -> Vec<Vec<u8>> {
    assert!(count > 0);
    let base = payload.len() / count;
    let mut chunks = Vec::with_capacity(count);
    for i in 0..count {
        let start = i * base;
        let end = if i == count - 1 {
            payload.len()
        } else {
            start + base
        };
        chunks.push(payload[start..end].to_vec());
    }
    chunks
}

/// JSON body for an initiate request.
#[allow(dead_code)]
pub fn initiate_body(total_size: usize, total_chunks: usize) -> Value {
    json!({
        "studio_id": "studio-1",
        "file_name": "reel.mp4",
        "content_type": "video/mp4",
        "total_size": total_size,
        "total_chunks": total_chunks,
    })
}
