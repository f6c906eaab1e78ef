use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::token::{DOUBLE_BYTE_TOKENS, SINGLE_BYTE_TOKENS};

/// Dictionary format version announced in manifests.
pub const DICTIONARY_VERSION: u32 = 1;

/// What a peer announces about its dictionary before exchanging frames.
///
/// ```json
/// {
///   "v": 1,
///   "single_byte_tokens": 175,
///   "double_byte_tokens": 0,
///   "fingerprint": 1234567890,
///   "compress": ["zstd"],
///   "crypto": ["xchacha20poly1305"]
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DictionaryManifest {
    pub v: u32,
    pub single_byte_tokens: usize,
    pub double_byte_tokens: usize,
    pub fingerprint: u64,
    #[serde(default)]
    pub compress: Vec<String>,
    #[serde(default)]
    pub crypto: Vec<String>,
}

/// xxh3 over both tables, slot by slot. Reordering or renaming any entry changes it.
pub fn dictionary_fingerprint() -> u64 {
    let mut buf = Vec::new();
    for slot in SINGLE_BYTE_TOKENS {
        match slot.as_token() {
            Some(t) => {
                buf.push(1);
                buf.extend_from_slice(t.as_bytes());
            }
            None => buf.push(0),
        }
        buf.push(0xff);
    }
    buf.push(0xfe);
    for t in DOUBLE_BYTE_TOKENS {
        buf.extend_from_slice(t.as_bytes());
        buf.push(0xff);
    }
    xxh3_64(&buf)
}

impl DictionaryManifest {
    /// Manifest describing the tables compiled into this build.
    pub fn local() -> Self {
        Self {
            v: DICTIONARY_VERSION,
            single_byte_tokens: SINGLE_BYTE_TOKENS.len(),
            double_byte_tokens: DOUBLE_BYTE_TOKENS.len(),
            fingerprint: dictionary_fingerprint(),
            compress: vec!["zstd".to_string()],
            crypto: vec!["xchacha20poly1305".to_string()],
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Fails unless both sides would map every code to the same string.
    pub fn check_compatible(&self, remote: &DictionaryManifest) -> anyhow::Result<()> {
        if self.v != remote.v {
            anyhow::bail!("Dictionary version mismatch: local {}, remote {}", self.v, remote.v);
        }
        if self.single_byte_tokens != remote.single_byte_tokens
            || self.double_byte_tokens != remote.double_byte_tokens
        {
            anyhow::bail!(
                "Dictionary size mismatch: local {}+{}, remote {}+{}",
                self.single_byte_tokens,
                self.double_byte_tokens,
                remote.single_byte_tokens,
                remote.double_byte_tokens
            );
        }
        if self.fingerprint != remote.fingerprint {
            anyhow::bail!(
                "Dictionary fingerprint mismatch: local {:#x}, remote {:#x}",
                self.fingerprint,
                remote.fingerprint
            );
        }
        Ok(())
    }

    pub fn supports_compression(&self, name: &str) -> bool {
        self.compress.iter().any(|c| c == name)
    }
}
