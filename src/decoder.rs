use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

use crate::config::{CodecConfig, MAX_DEPTH_LIMIT};
use crate::control::{ByteClass, ControlCode, HEX_8, NIBBLE_8, STREAM_END};
use crate::encoder::PAD_DIGIT;
use crate::error::DecodeError;
use crate::node::{Content, Node};
use crate::token;

/// Reads nodes from a borrowed byte slice.
#[derive(Debug)]
pub struct Decoder<'a> {
    cursor: Cursor<&'a [u8]>,
    max_depth: usize,
}

/// Decode exactly one node; leftover input is an error.
pub fn decode_node(data: &[u8]) -> Result<Node, DecodeError> {
    decode_node_with(data, &CodecConfig::default())
}

pub fn decode_node_with(data: &[u8], config: &CodecConfig) -> Result<Node, DecodeError> {
    let mut dec = Decoder::with_config(data, config);
    let result = dec.read_node().and_then(|node| match dec.remaining() {
        0 => Ok(node),
        n => Err(DecodeError::TrailingBytes(n)),
    });
    if let Err(e) = &result {
        tracing::debug!(
            "Rejecting {} byte node at offset {}: {}",
            data.len(),
            dec.position(),
            e
        );
    }
    result
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_config(data, &CodecConfig::default())
    }

    pub fn with_config(data: &'a [u8], config: &CodecConfig) -> Self {
        Self {
            cursor: Cursor::new(data),
            max_depth: config.max_depth.min(MAX_DEPTH_LIMIT),
        }
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    pub fn read_node(&mut self) -> Result<Node, DecodeError> {
        self.read_node_at(0)
    }

    fn read_node_at(&mut self, depth: usize) -> Result<Node, DecodeError> {
        if depth >= self.max_depth {
            return Err(DecodeError::DepthExceeded(self.max_depth));
        }

        let list_tag = self.read_u8()?;
        let size = self.read_list_size(list_tag)?;
        let tag_code = self.read_u8()?;
        if tag_code == STREAM_END {
            return Err(DecodeError::UnexpectedStreamEnd);
        }
        let tag = self.read_string(tag_code)?;
        if size == 0 || tag.is_empty() {
            return Err(DecodeError::InvalidNode);
        }

        let num_attrs = (size - 1) / 2;
        let mut attrs = Vec::with_capacity(num_attrs.min(self.remaining() / 2));
        for _ in 0..num_attrs {
            let k = self.read_u8()?;
            let key = self.read_string(k)?;
            let v = self.read_u8()?;
            let value = self.read_string(v)?;
            attrs.push((key, value));
        }

        let content = if size % 2 == 1 {
            None
        } else {
            Some(self.read_content(depth)?)
        };

        Ok(Node { tag, attrs, content })
    }

    fn read_content(&mut self, depth: usize) -> Result<Content, DecodeError> {
        let tag = self.read_u8()?;
        match ByteClass::classify(tag) {
            ByteClass::Control(ControlCode::ListEmpty | ControlCode::List8 | ControlCode::List16) => {
                let size = self.read_list_size(tag)?;
                // every child takes at least three bytes
                let mut nodes = Vec::with_capacity(size.min(self.remaining() / 3));
                for _ in 0..size {
                    nodes.push(self.read_node_at(depth + 1)?);
                }
                Ok(Content::Nodes(nodes))
            }
            ByteClass::Control(
                code @ (ControlCode::Binary8 | ControlCode::Binary20 | ControlCode::Binary32),
            ) => {
                let len = self.read_byte_length(code)?;
                Ok(Content::Bytes(self.read_bytes(len)?.to_vec()))
            }
            _ => Ok(Content::Text(self.read_string(tag)?)),
        }
    }

    fn read_list_size(&mut self, tag: u8) -> Result<usize, DecodeError> {
        match ControlCode::from_u8(tag) {
            Some(ControlCode::ListEmpty) => Ok(0),
            Some(ControlCode::List8) => Ok(self.read_u8()? as usize),
            Some(ControlCode::List16) => {
                self.ensure(2)?;
                Ok(self.cursor.read_u16::<BigEndian>().map_err(|_| eof(2))? as usize)
            }
            _ => Err(DecodeError::InvalidListTag(tag)),
        }
    }

    fn read_string(&mut self, tag: u8) -> Result<String, DecodeError> {
        self.read_string_inner(tag, true)
    }

    // Control codes are ruled out before the byte reaches the dictionary.
    fn read_string_inner(&mut self, tag: u8, allow_jid: bool) -> Result<String, DecodeError> {
        let code = match ByteClass::classify(tag) {
            ByteClass::Token(index) => return Ok(token::get_single_token(index as usize)?.to_owned()),
            ByteClass::Control(code) => code,
            ByteClass::Unassigned(b) => return Err(DecodeError::InvalidStringTag(b)),
        };

        if let Some(dict) = code.dictionary_select() {
            let index = self.read_u8()?;
            return Ok(token::get_double_token(dict, index)?.to_owned());
        }

        match code {
            ControlCode::ListEmpty => Ok(String::new()),
            ControlCode::Binary8 | ControlCode::Binary20 | ControlCode::Binary32 => {
                let len = self.read_byte_length(code)?;
                let bytes = self.read_bytes(len)?;
                String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
            }
            ControlCode::JidPair if allow_jid => {
                let u = self.read_u8()?;
                let user = self.read_string_inner(u, false)?;
                let s = self.read_u8()?;
                let server = self.read_string_inner(s, false)?;
                if user.is_empty() || server.is_empty() {
                    return Err(DecodeError::InvalidJid);
                }
                Ok(format!("{}@{}", user, server))
            }
            ControlCode::JidPair => Err(DecodeError::InvalidJid),
            ControlCode::Nibble8 | ControlCode::Hex8 => self.read_packed(tag),
            _ => Err(DecodeError::InvalidStringTag(tag)),
        }
    }

    fn read_byte_length(&mut self, code: ControlCode) -> Result<usize, DecodeError> {
        match code {
            ControlCode::Binary8 => Ok(self.read_u8()? as usize),
            ControlCode::Binary20 => {
                let b = self.read_bytes(3)?;
                Ok(((b[0] as usize & 0x0f) << 16) | ((b[1] as usize) << 8) | b[2] as usize)
            }
            ControlCode::Binary32 => {
                self.ensure(4)?;
                Ok(self.cursor.read_u32::<BigEndian>().map_err(|_| eof(4))? as usize)
            }
            other => Err(DecodeError::InvalidStringTag(other as u8)),
        }
    }

    fn read_packed(&mut self, tag: u8) -> Result<String, DecodeError> {
        let start = self.read_u8()?;
        let bytes = self.read_bytes((start & 0x7f) as usize)?;
        let mut digits: Vec<u8> = bytes.iter().flat_map(|b| [b >> 4, b & 0x0f]).collect();
        // odd length: the final low nibble must be padding
        if start & 0x80 != 0 {
            match digits.pop() {
                Some(PAD_DIGIT) => {}
                Some(digit) => return Err(DecodeError::InvalidPackedDigit { tag, digit }),
                None => return Err(DecodeError::InvalidNode),
            }
        }
        digits
            .into_iter()
            .map(|d| unpack_digit(tag, d).ok_or(DecodeError::InvalidPackedDigit { tag, digit: d }))
            .collect()
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        self.ensure(1)?;
        self.cursor.read_u8().map_err(|_| eof(1))
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        self.ensure(len)?;
        let start = self.position();
        let data: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position((start + len) as u64);
        Ok(&data[start..start + len])
    }

    fn ensure(&self, needed: usize) -> Result<(), DecodeError> {
        let remaining = self.remaining();
        if remaining < needed {
            return Err(DecodeError::UnexpectedEof { needed, remaining });
        }
        Ok(())
    }
}

fn eof(needed: usize) -> DecodeError {
    DecodeError::UnexpectedEof {
        needed,
        remaining: 0,
    }
}

fn unpack_digit(tag: u8, d: u8) -> Option<char> {
    match (tag, d) {
        (_, 0..=9) => Some((b'0' + d) as char),
        (NIBBLE_8, 10) => Some('-'),
        (NIBBLE_8, 11) => Some('.'),
        (HEX_8, 10..=15) => Some((b'A' + d - 10) as char),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{BINARY_20, BINARY_8, DICTIONARY_0, JID_PAIR, LIST_8, LIST_EMPTY};
    use crate::encoder::encode_node;
    use crate::error::TokenError;

    #[test]
    fn test_decode_tokens() {
        let node = decode_node(&[LIST_8, 3, 64, 90, 13]).unwrap();
        assert_eq!(node.tag, "presence");
        assert_eq!(node.attr("type"), Some("available"));
        assert_eq!(node.content, None);
    }

    #[test]
    fn test_round_trip_tree() {
        let node = Node::new("message")
            .with_attr("id", "3EB0C431")
            .with_attr("to", "15551234567@s.whatsapp.net")
            .with_attr("t", "1730616000")
            .with_children(vec![
                Node::new("body").with_text("hello there"),
                Node::new("media").with_bytes(vec![0xAB; 700]),
                Node::new("receipt").with_children(vec![]),
            ]);

        let bytes = encode_node(&node).unwrap();
        let decoded = decode_node(&bytes).unwrap();

        assert_eq!(decoded.attrs, node.attrs);
        assert_eq!(decoded.children().len(), 3);
        // literals come back as binary content
        assert_eq!(decoded.children()[0].content_bytes(), Some(&b"hello there"[..]));
        assert_eq!(decoded.children()[1].content, Some(Content::Bytes(vec![0xAB; 700])));
        assert_eq!(decoded.children()[2].content, Some(Content::Nodes(vec![])));
    }

    #[test]
    fn test_token_text_content() {
        let bytes = encode_node(&Node::new("type").with_text("unavailable")).unwrap();
        let decoded = decode_node(&bytes).unwrap();
        assert_eq!(decoded.content, Some(Content::Text("unavailable".into())));
    }

    #[test]
    fn test_out_of_range_token_is_malformed() {
        // 200 is below the control codes but past the end of the dictionary
        let err = decode_node(&[LIST_8, 1, 200]).unwrap_err();
        assert_eq!(err, DecodeError::Token(TokenError::OutOfBounds { index: 200 }));
    }

    #[test]
    fn test_double_byte_tag_is_malformed() {
        let err = decode_node(&[LIST_8, 1, DICTIONARY_0 + 1, 7]).unwrap_err();
        assert_eq!(err, DecodeError::Token(TokenError::OutOfBounds { index: 263 }));
    }

    #[test]
    fn test_stream_end_and_invalid_nodes() {
        assert_eq!(decode_node(&[LIST_8, 1, STREAM_END]), Err(DecodeError::UnexpectedStreamEnd));
        assert_eq!(decode_node(&[LIST_EMPTY, 64]), Err(DecodeError::InvalidNode));
        assert_eq!(decode_node(&[LIST_8, 1, LIST_EMPTY]), Err(DecodeError::InvalidNode));
        assert_eq!(decode_node(&[7, 1, 64]), Err(DecodeError::InvalidListTag(7)));
        assert_eq!(decode_node(&[LIST_8, 1, 244]), Err(DecodeError::InvalidStringTag(244)));
        assert_eq!(decode_node(&[LIST_8, 1, 1]), Err(DecodeError::InvalidStringTag(1)));
    }

    #[test]
    fn test_truncated_input() {
        assert_eq!(
            decode_node(&[LIST_8, 2, 51, BINARY_8, 5, b'h']),
            Err(DecodeError::UnexpectedEof {
                needed: 5,
                remaining: 1
            })
        );
        assert_eq!(
            decode_node(&[LIST_8, 2, 51, BINARY_20, 0x0f, 0xff]),
            Err(DecodeError::UnexpectedEof {
                needed: 3,
                remaining: 2
            })
        );
        assert!(matches!(
            decode_node(&[LIST_8]),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_trailing_bytes() {
        assert_eq!(decode_node(&[LIST_8, 1, 64, 0, 0]), Err(DecodeError::TrailingBytes(2)));
    }

    #[test]
    fn test_nested_jid_rejected() {
        let bytes = [LIST_8, 2, 51, JID_PAIR, JID_PAIR, 13, 79, 79];
        assert_eq!(decode_node(&bytes), Err(DecodeError::InvalidJid));
        let empty_user = [LIST_8, 2, 51, JID_PAIR, LIST_EMPTY, 79];
        assert_eq!(decode_node(&empty_user), Err(DecodeError::InvalidJid));
    }

    #[test]
    fn test_bad_packed_digit() {
        // nibble 12 has no meaning
        let bytes = [LIST_8, 2, 51, NIBBLE_8, 0x01, 0x1c];
        assert_eq!(
            decode_node(&bytes),
            Err(DecodeError::InvalidPackedDigit {
                tag: NIBBLE_8,
                digit: 12
            })
        );
    }

    #[test]
    fn test_padding_nibble_must_be_canonical() {
        // odd flag set but the low nibble is 2, not padding
        let bytes = [LIST_8, 2, 51, NIBBLE_8, 0x81, 0x12];
        assert_eq!(
            decode_node(&bytes),
            Err(DecodeError::InvalidPackedDigit {
                tag: NIBBLE_8,
                digit: 2
            })
        );
        let bytes = [LIST_8, 2, 51, NIBBLE_8, 0x81, 0x1f];
        assert_eq!(decode_node(&bytes).unwrap().content, Some(Content::Text("1".into())));
        // odd flag with no packed bytes at all
        let bytes = [LIST_8, 2, 51, HEX_8, 0x80];
        assert_eq!(decode_node(&bytes), Err(DecodeError::InvalidNode));
    }

    #[test]
    fn test_binary_32_round_trip() {
        let node = Node::new("media").with_bytes(vec![0x5a; 1 << 20]);
        let bytes = encode_node(&node).unwrap();
        assert_eq!(bytes[3], crate::control::BINARY_32);
        assert_eq!(decode_node(&bytes).unwrap(), node);
    }

    #[test]
    fn test_list_16_round_trip() {
        let children: Vec<Node> = (0..300)
            .map(|i| Node::new("item").with_attr("index", i.to_string()))
            .collect();
        let node = Node::new("query").with_children(children);
        let bytes = encode_node(&node).unwrap();
        assert_eq!(bytes[3], crate::control::LIST_16);

        let decoded = decode_node(&bytes).unwrap();
        assert_eq!(decoded.children().len(), 300);
        assert_eq!(decoded, node);
    }

    #[test]
    fn test_oversized_depth_is_clamped() {
        let deep = CodecConfig {
            max_depth: usize::MAX,
            ..CodecConfig::default()
        };
        let mut bytes = Vec::new();
        for _ in 0..2000 {
            bytes.extend_from_slice(&[LIST_8, 2, 43, LIST_8, 1]);
        }
        // a thousand frames of recursion outgrow the default test stack in debug builds
        let result = std::thread::Builder::new()
            .stack_size(64 << 20)
            .spawn(move || decode_node_with(&bytes, &deep))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(result, Err(DecodeError::DepthExceeded(MAX_DEPTH_LIMIT)));
    }

    #[test]
    fn test_depth_limit() {
        let mut node = Node::new("item");
        for _ in 0..5 {
            node = Node::new("item").with_children(vec![node]);
        }
        let bytes = encode_node(&node).unwrap();

        let shallow = CodecConfig {
            max_depth: 3,
            ..CodecConfig::default()
        };
        assert_eq!(decode_node_with(&bytes, &shallow), Err(DecodeError::DepthExceeded(3)));
        assert!(decode_node(&bytes).is_ok());
    }

    #[test]
    fn test_hostile_list_size_does_not_preallocate() {
        // claims 65535 children with nothing behind it
        let bytes = [LIST_8, 2, 51, 249, 0xff, 0xff];
        assert!(matches!(
            decode_node(&bytes),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_sequential_reads() {
        let mut buf = encode_node(&Node::new("ping")).unwrap();
        buf.extend(encode_node(&Node::new("presence")).unwrap());
        let mut dec = Decoder::new(&buf);
        assert_eq!(dec.read_node().unwrap().tag, "ping");
        assert_eq!(dec.read_node().unwrap().tag, "presence");
        assert_eq!(dec.remaining(), 0);
    }
}
