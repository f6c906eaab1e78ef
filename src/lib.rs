//! Compact token dictionary codec for binary XML messaging.
//!
//! Strings that occur in almost every stanza are sent as one byte indexing a
//! fixed dictionary; structural markers (lists, binary lengths, jid pairs,
//! packed digits) share the same byte space and are checked first.

pub mod compress;
pub mod config;
pub mod control;
pub mod crypto;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod manifest;
pub mod node;
pub mod token;

pub use config::CodecConfig;
pub use control::{ByteClass, ControlCode};
pub use decoder::{decode_node, decode_node_with, Decoder};
pub use encoder::{encode_node, Encoder};
pub use error::{DecodeError, EncodeError, TokenError};
pub use frame::{Flags, FrameBuffer, FrameCodec};
pub use manifest::{dictionary_fingerprint, DictionaryManifest};
pub use node::{Content, Node};
pub use token::{get_double_token, get_single_token, index_of_single_token, NOT_FOUND};
