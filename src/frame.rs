//! Length-prefixed transport frames carrying one encoded node each.
//!
//! ```text
//! Frame:
//! [3B length BE]      # covers everything below
//! [1B flags]          # bit0: sealed, bit1: zstd
//! [ ... body ... ]    # encoded node, then zstd, then XChaCha20-Poly1305
//! [4B CRC32 LE]       # over flags and body
//! ```

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

use crate::compress::{compress_body, decompress_body};
use crate::config::{CodecConfig, FRAME_LENGTH_LIMIT};
use crate::crypto::{open_body, seal_body, KEY_LEN};
use crate::decoder::decode_node_with;
use crate::encoder::encode_node;
use crate::node::Node;

/// Size of the big-endian length prefix.
pub const LENGTH_PREFIX: usize = 3;
const MIN_PAYLOAD: usize = 1 + 4;

bitflags::bitflags! {
    /// Frame flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u8 {
        const SEALED = 1 << 0;
        const ZSTD = 1 << 1;
    }
}

/// Turns nodes into frames and back.
#[derive(Clone)]
pub struct FrameCodec {
    config: CodecConfig,
    key: Option<[u8; KEY_LEN]>,
}

impl std::fmt::Debug for FrameCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCodec")
            .field("config", &self.config)
            .field("sealed", &self.key.is_some())
            .finish()
    }
}

impl FrameCodec {
    pub fn new(config: CodecConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self { config, key: None })
    }

    /// Seal every outgoing body and require it on incoming ones.
    pub fn with_key(mut self, key: [u8; KEY_LEN]) -> Self {
        self.key = Some(key);
        self
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn frame_limit(&self) -> usize {
        self.config.max_frame_size.min(FRAME_LENGTH_LIMIT)
    }

    /// Encode a node into a complete frame, length prefix included.
    pub fn encode(&self, node: &Node) -> anyhow::Result<Vec<u8>> {
        let mut body = encode_node(node)?;
        let mut flags = Flags::empty();

        // the peer inflates at most max_body_size bytes
        if body.len() > self.config.max_body_size {
            anyhow::bail!(
                "Node body of {} bytes exceeds limit {}",
                body.len(),
                self.config.max_body_size
            );
        }

        if body.len() > self.config.compress_threshold {
            body = compress_body(&body, self.config.compression_level)?;
            flags |= Flags::ZSTD;
        }
        if let Some(key) = &self.key {
            body = seal_body(key, &body)?;
            flags |= Flags::SEALED;
        }

        let len = 1 + body.len() + 4;
        if len > self.frame_limit() {
            anyhow::bail!("Frame of {} bytes exceeds limit {}", len, self.frame_limit());
        }

        let mut buf = Vec::with_capacity(LENGTH_PREFIX + len);
        buf.write_u24::<BigEndian>(len as u32)?;
        buf.write_u8(flags.bits())?;
        buf.extend_from_slice(&body);

        let crc = crc32fast::hash(&buf[LENGTH_PREFIX..]);
        buf.write_u32::<LittleEndian>(crc)?;

        tracing::trace!("Encoded frame: {} bytes, flags {:?}", buf.len(), flags);
        Ok(buf)
    }

    /// Decode a complete frame, length prefix included.
    pub fn decode(&self, frame: &[u8]) -> anyhow::Result<Node> {
        if frame.len() < LENGTH_PREFIX {
            anyhow::bail!("Frame shorter than its length prefix");
        }
        let (prefix, payload) = frame.split_at(LENGTH_PREFIX);
        let declared = BigEndian::read_u24(prefix) as usize;
        if declared > self.frame_limit() {
            anyhow::bail!("Frame of {} bytes exceeds limit {}", declared, self.frame_limit());
        }
        if declared != payload.len() {
            anyhow::bail!(
                "Frame length mismatch: header says {}, got {}",
                declared,
                payload.len()
            );
        }
        self.decode_payload(payload)
    }

    /// Decode a payload as yielded by [`FrameBuffer::next_frame`].
    pub fn decode_payload(&self, payload: &[u8]) -> anyhow::Result<Node> {
        if payload.len() < MIN_PAYLOAD {
            anyhow::bail!("Frame payload of {} bytes is truncated", payload.len());
        }

        let (covered, tail) = payload.split_at(payload.len() - 4);
        let crc32 = LittleEndian::read_u32(tail);
        let computed_crc = crc32fast::hash(covered);
        if crc32 != computed_crc {
            tracing::warn!(
                "Dropping frame: CRC32 mismatch, expected {:#x}, got {:#x}",
                crc32,
                computed_crc
            );
            anyhow::bail!("CRC32 mismatch: expected {}, got {}", crc32, computed_crc);
        }

        let flags = Flags::from_bits(covered[0])
            .ok_or_else(|| anyhow::anyhow!("Invalid flags {:#04x}", covered[0]))?;
        let mut body = covered[1..].to_vec();

        if flags.contains(Flags::SEALED) {
            let key = self
                .key
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Sealed frame but no key configured"))?;
            body = open_body(key, &body)?;
        } else if self.key.is_some() {
            anyhow::bail!("Unsealed frame on a sealed channel");
        }
        if flags.contains(Flags::ZSTD) {
            body = decompress_body(&body, self.config.max_body_size)?;
        }

        tracing::trace!("Decoding frame body: {} bytes, flags {:?}", body.len(), flags);
        Ok(decode_node_with(&body, &self.config)?)
    }
}

/// Reassembles frames from a byte stream that may split or merge them.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    max_frame_size: usize,
}

impl FrameBuffer {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            buf: Vec::new(),
            max_frame_size: config.max_frame_size.min(FRAME_LENGTH_LIMIT),
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes held that do not yet form a whole frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Next complete payload (flags, body, CRC), or `None` until enough bytes arrived.
    ///
    /// An oversized length poisons the stream: the buffer is cleared and the
    /// error returned, since the frame boundary is lost.
    pub fn next_frame(&mut self) -> anyhow::Result<Option<Vec<u8>>> {
        if self.buf.len() < LENGTH_PREFIX {
            return Ok(None);
        }
        let len = BigEndian::read_u24(&self.buf[..LENGTH_PREFIX]) as usize;
        if len > self.max_frame_size || len < MIN_PAYLOAD {
            tracing::warn!(
                "Discarding {} buffered bytes: bad frame length {}",
                self.buf.len(),
                len
            );
            self.buf.clear();
            anyhow::bail!("Frame length {} outside [{}, {}]", len, MIN_PAYLOAD, self.max_frame_size);
        }
        if self.buf.len() < LENGTH_PREFIX + len {
            return Ok(None);
        }

        let payload = self.buf[LENGTH_PREFIX..LENGTH_PREFIX + len].to_vec();
        self.buf.drain(..LENGTH_PREFIX + len);
        Ok(Some(payload))
    }
}
