use zstd::bulk::{compress, decompress};

/// Compress a node body with zstd
pub fn compress_body(body: &[u8], level: i32) -> anyhow::Result<Vec<u8>> {
    Ok(compress(body, level)?)
}

/// Decompress a node body, refusing to inflate past `limit` bytes
pub fn decompress_body(input: &[u8], limit: usize) -> anyhow::Result<Vec<u8>> {
    decompress(input, limit)
        .map_err(|e| anyhow::anyhow!("zstd body rejected (limit {} bytes): {}", limit, e))
}
