/// Payload of a node
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Content {
    Nodes(Vec<Node>),
    Bytes(Vec<u8>),
    Text(String),
}

/// A binary XML element: tag, ordered attributes and optional content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub content: Option<Content>,
}

impl Node {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            content: None,
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.content = Some(Content::Nodes(children));
        self
    }

    pub fn with_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.content = Some(Content::Bytes(bytes.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.content = Some(Content::Text(text.into()));
        self
    }

    /// First attribute value stored under `key`.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> &[Node] {
        match &self.content {
            Some(Content::Nodes(nodes)) => nodes,
            _ => &[],
        }
    }

    /// Content as raw bytes, whether it was carried as text or binary.
    pub fn content_bytes(&self) -> Option<&[u8]> {
        match &self.content {
            Some(Content::Bytes(b)) => Some(b),
            Some(Content::Text(s)) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Number of entries in this node's list header.
    pub(crate) fn list_size(&self) -> usize {
        1 + 2 * self.attrs.len() + usize::from(self.content.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_accessors() {
        let node = Node::new("iq")
            .with_attr("type", "get")
            .with_attr("type", "set")
            .with_children(vec![Node::new("ping")]);

        assert_eq!(node.attr("type"), Some("get"));
        assert_eq!(node.attr("id"), None);
        assert_eq!(node.children().len(), 1);
        assert_eq!(node.list_size(), 6);
        assert_eq!(node.content_bytes(), None);
    }

    #[test]
    fn test_content_bytes() {
        assert_eq!(Node::new("body").with_text("hi").content_bytes(), Some(&b"hi"[..]));
        assert_eq!(Node::new("enc").with_bytes(vec![1, 2]).content_bytes(), Some(&[1u8, 2][..]));
        assert!(Node::new("ack").children().is_empty());
    }
}
