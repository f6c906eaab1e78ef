use serde::{Deserialize, Serialize};
use std::path::Path;

/// Limits and tuning for the node codec and frame layer.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// let cfg = binxml_token::CodecConfig::from_json(r#"{"max_depth": 8}"#).unwrap();
/// assert_eq!(cfg.max_depth, 8);
/// assert_eq!(cfg.compression_level, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Maximum nesting of child lists accepted by the decoder.
    pub max_depth: usize,
    /// Largest frame (flags + body + CRC) accepted or produced. Bounded by the 3-byte length.
    pub max_frame_size: usize,
    /// Bodies longer than this are zstd-compressed.
    pub compress_threshold: usize,
    pub compression_level: i32,
    /// Cap on a decompressed body.
    pub max_body_size: usize,
}

/// Deepest nesting `max_depth` may allow; the decoder recurses once per level.
pub const MAX_DEPTH_LIMIT: usize = 1024;

/// Largest value the 3-byte frame length can carry.
pub const FRAME_LENGTH_LIMIT: usize = (1 << 24) - 1;

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_frame_size: FRAME_LENGTH_LIMIT,
            compress_threshold: 1024,
            compression_level: 3,
            max_body_size: 64 << 20,
        }
    }
}

impl CodecConfig {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_depth == 0 {
            anyhow::bail!("max_depth must be at least 1");
        }
        if self.max_depth > MAX_DEPTH_LIMIT {
            anyhow::bail!(
                "max_depth {} exceeds limit {}",
                self.max_depth,
                MAX_DEPTH_LIMIT
            );
        }
        if self.max_frame_size > FRAME_LENGTH_LIMIT {
            anyhow::bail!(
                "max_frame_size {} exceeds frame length limit {}",
                self.max_frame_size,
                FRAME_LENGTH_LIMIT
            );
        }
        if self.max_body_size == 0 {
            anyhow::bail!("max_body_size must be non-zero");
        }
        Ok(())
    }
}
