use crate::control::{
    BINARY_20, BINARY_32, BINARY_8, DICTIONARY_0, HEX_8, JID_PAIR, LIST_16, LIST_8, LIST_EMPTY,
    NIBBLE_8, PACKED_MAX,
};
use crate::error::EncodeError;
use crate::node::{Content, Node};
use crate::token;

/// Writes nodes into a growing byte buffer.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

/// Encode a single node.
pub fn encode_node(node: &Node) -> Result<Vec<u8>, EncodeError> {
    let mut enc = Encoder::new();
    enc.write_node(node)?;
    Ok(enc.into_bytes())
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_node(&mut self, node: &Node) -> Result<(), EncodeError> {
        if node.tag.is_empty() {
            return Err(EncodeError::EmptyTag);
        }
        self.write_list_start(node.list_size())?;
        self.write_string(&node.tag)?;
        for (key, value) in &node.attrs {
            self.write_string(key)?;
            self.write_string(value)?;
        }

        match &node.content {
            None => {}
            Some(Content::Nodes(children)) => {
                self.write_list_start(children.len())?;
                for child in children {
                    self.write_node(child)?;
                }
            }
            Some(Content::Bytes(bytes)) => self.write_binary(bytes)?,
            Some(Content::Text(text)) => self.write_string(text)?,
        }
        Ok(())
    }

    fn write_list_start(&mut self, len: usize) -> Result<(), EncodeError> {
        if len == 0 {
            self.buf.push(LIST_EMPTY);
        } else if len < 256 {
            self.buf.push(LIST_8);
            self.buf.push(len as u8);
        } else if len <= u16::MAX as usize {
            self.buf.push(LIST_16);
            self.buf.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            return Err(EncodeError::ListTooLong(len));
        }
        Ok(())
    }

    /// Dictionary first, then jid pair, packed digits, and finally a literal.
    fn write_string(&mut self, s: &str) -> Result<(), EncodeError> {
        if let Some(code) = token::single_token_code(s) {
            self.buf.push(code);
            return Ok(());
        }
        // table size is asserted at compile time, so dict is 0..=3
        if let Some((dict, index)) = token::index_of_double_token(s) {
            self.buf.push(DICTIONARY_0 + dict);
            self.buf.push(index);
            return Ok(());
        }
        if let Some((user, server)) = split_jid(s) {
            self.buf.push(JID_PAIR);
            self.write_string(user)?;
            return self.write_string(server);
        }
        if let Some(tag) = packable_as(s) {
            return self.write_packed(s, tag);
        }
        self.write_binary(s.as_bytes())
    }

    fn write_packed(&mut self, s: &str, tag: u8) -> Result<(), EncodeError> {
        let digits = s
            .chars()
            .map(|ch| pack_digit(tag, ch).ok_or(EncodeError::UnpackableChar { tag, ch }))
            .collect::<Result<Vec<u8>, _>>()?;
        if digits.len() > PACKED_MAX {
            return Err(EncodeError::PackedTooLong(digits.len()));
        }

        let odd = digits.len() % 2 == 1;
        let head = (if odd { 0x80 } else { 0 }) | digits.len().div_ceil(2) as u8;
        self.buf.push(tag);
        self.buf.push(head);
        for pair in digits.chunks(2) {
            let lo = pair.get(1).copied().unwrap_or(PAD_DIGIT);
            self.buf.push((pair[0] << 4) | lo);
        }
        Ok(())
    }

    fn write_binary(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        let len = bytes.len();
        if len < 256 {
            self.buf.push(BINARY_8);
            self.buf.push(len as u8);
        } else if len < 1 << 20 {
            self.buf.push(BINARY_20);
            self.buf.push(((len >> 16) & 0x0f) as u8);
            self.buf.push(((len >> 8) & 0xff) as u8);
            self.buf.push((len & 0xff) as u8);
        } else if len <= u32::MAX as usize {
            self.buf.push(BINARY_32);
            self.buf.extend_from_slice(&(len as u32).to_be_bytes());
        } else {
            return Err(EncodeError::BinaryTooLong(len));
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }
}

/// Fills the low nibble of an odd-length packed string.
pub(crate) const PAD_DIGIT: u8 = 15;

// Both halves must be non-empty and the server must not nest another jid.
fn split_jid(s: &str) -> Option<(&str, &str)> {
    let (user, server) = s.split_once('@')?;
    if user.is_empty() || server.is_empty() || server.contains('@') {
        return None;
    }
    Some((user, server))
}

fn packable_as(s: &str) -> Option<u8> {
    if s.is_empty() || s.len() > PACKED_MAX {
        return None;
    }
    [NIBBLE_8, HEX_8]
        .into_iter()
        .find(|&tag| s.chars().all(|ch| pack_digit(tag, ch).is_some()))
}

fn pack_digit(tag: u8, ch: char) -> Option<u8> {
    match (tag, ch) {
        (_, '0'..='9') => Some(ch as u8 - b'0'),
        (NIBBLE_8, '-') => Some(10),
        (NIBBLE_8, '.') => Some(11),
        // lowercase hex would not survive the uppercase unpack
        (HEX_8, 'A'..='F') => Some(ch as u8 - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> u8 {
        token::single_token_code(s).unwrap()
    }

    #[test]
    fn test_tokens_become_single_bytes() {
        let node = Node::new("presence").with_attr("type", "available");
        let bytes = encode_node(&node).unwrap();
        assert_eq!(bytes, vec![LIST_8, 3, code("presence"), code("type"), code("available")]);
        assert_eq!(bytes[2..], [64, 90, 13]);
    }

    #[test]
    fn test_literal_fallback() {
        let node = Node::new("message").with_text("hello");
        let bytes = encode_node(&node).unwrap();
        assert_eq!(
            bytes,
            vec![LIST_8, 2, code("message"), BINARY_8, 5, b'h', b'e', b'l', b'l', b'o']
        );
    }

    #[test]
    fn test_children_list() {
        let node = Node::new("query").with_children(vec![Node::new("item"), Node::new("item")]);
        let bytes = encode_node(&node).unwrap();
        assert_eq!(
            bytes,
            vec![
                LIST_8, 2, code("query"),
                LIST_8, 2,
                LIST_8, 1, code("item"),
                LIST_8, 1, code("item"),
            ]
        );

        let empty = encode_node(&Node::new("query").with_children(vec![])).unwrap();
        assert_eq!(empty, vec![LIST_8, 2, code("query"), LIST_EMPTY]);
    }

    #[test]
    fn test_jid_pair_packs_user() {
        let node = Node::new("message").with_attr("to", "123-45@s.whatsapp.net");
        let bytes = encode_node(&node).unwrap();
        assert_eq!(
            bytes,
            vec![
                LIST_8, 3, code("message"), code("to"),
                JID_PAIR, NIBBLE_8, 0x03, 0x12, 0x3a, 0x45,
                code("s.whatsapp.net"),
            ]
        );
    }

    #[test]
    fn test_odd_packed_length_is_padded() {
        let bytes = encode_node(&Node::new("count").with_text("123")).unwrap();
        assert_eq!(bytes, vec![LIST_8, 2, code("count"), NIBBLE_8, 0x82, 0x12, 0x3f]);
    }

    #[test]
    fn test_hex_packing() {
        let node = Node::new("id").with_text("3EB0");
        let bytes = encode_node(&node).unwrap();
        assert_eq!(bytes, vec![LIST_8, 2, code("id"), HEX_8, 0x02, 0x3e, 0xb0]);

        // lowercase stays literal
        let bytes = encode_node(&Node::new("id").with_text("3eb0")).unwrap();
        assert_eq!(bytes[3], BINARY_8);
    }

    #[test]
    fn test_binary_length_prefixes() {
        let bytes = encode_node(&Node::new("media").with_bytes(vec![7u8; 300])).unwrap();
        assert_eq!(bytes[3..7], [BINARY_20, 0x00, 0x01, 0x2c]);
        assert_eq!(bytes.len(), 7 + 300);

        let bytes = encode_node(&Node::new("media").with_bytes(vec![0u8; 1 << 20])).unwrap();
        assert_eq!(bytes[3..8], [BINARY_32, 0x00, 0x10, 0x00, 0x00]);
    }

    #[test]
    fn test_list_16_header() {
        let children = vec![Node::new("item"); 300];
        let bytes = encode_node(&Node::new("query").with_children(children)).unwrap();
        assert_eq!(bytes[3..6], [LIST_16, 0x01, 0x2c]);
    }

    #[test]
    fn test_rejects_empty_tag() {
        assert_eq!(encode_node(&Node::new("")), Err(EncodeError::EmptyTag));
    }

    #[test]
    fn test_malformed_jids_stay_literal() {
        for s in ["@s.whatsapp.net", "user@", "a@b@c"] {
            let bytes = encode_node(&Node::new("to").with_text(s)).unwrap();
            assert_eq!(bytes[3], BINARY_8, "{}", s);
        }
    }
}
