//! Document tree data structures.
//!
//! Nodes live in a flat arena owned by [`Document`] and refer to their
//! children by index. Every node except the root has exactly one parent, so
//! the structure is a strict tree even though it is stored flat.

use std::collections::HashMap;

/// Index used to address nodes in the document arena.
pub type NodeId = usize;

/// Tag carried by leaf text runs.
pub const TEXT_TAG: &str = "text";

/// Tag of the synthetic root element.
pub const ROOT_TAG: &str = "root";

/// Closed classification of the tags the renderer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Text,
    Paragraph,
    Heading1,
    Heading2,
    Anchor,
    Image,
    Strong,
    Emphasis,
    /// Everything else, including the synthetic root.
    Generic,
}

impl TagKind {
    /// Classifies an element tag name. Matching is exact; an element literally
    /// named `text` is still an element and classifies as [`TagKind::Generic`].
    pub fn for_element(tag: &str) -> Self {
        match tag {
            "p" => Self::Paragraph,
            "h1" => Self::Heading1,
            "h2" => Self::Heading2,
            "a" => Self::Anchor,
            "img" => Self::Image,
            "b" | "strong" => Self::Strong,
            "i" | "em" => Self::Emphasis,
            _ => Self::Generic,
        }
    }
}

/// One element or text run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    tag: String,
    text: String,
    attributes: HashMap<String, String>,
    children: Vec<NodeId>,
    kind: TagKind,
}

impl Node {
    fn element(tag: &str, attributes: HashMap<String, String>) -> Self {
        Self {
            tag: tag.to_owned(),
            text: String::new(),
            attributes,
            children: Vec::new(),
            kind: TagKind::for_element(tag),
        }
    }

    fn text_run(text: &str) -> Self {
        Self {
            tag: TEXT_TAG.to_owned(),
            text: text.to_owned(),
            attributes: HashMap::new(),
            children: Vec::new(),
            kind: TagKind::Text,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Raw text payload; empty for elements.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn kind(&self) -> TagKind {
        self.kind
    }

    pub fn is_text(&self) -> bool {
        self.kind == TagKind::Text
    }
}

/// A parsed document: the node arena plus the source it was built from.
///
/// Documents are rebuilt wholesale whenever the source changes; there is no
/// incremental mutation API beyond appending during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
    source: String,
    truncated: bool,
}

impl Document {
    /// Id of the synthetic root element.
    pub const ROOT: NodeId = 0;

    /// Creates a document holding only the synthetic root.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::element(ROOT_TAG, HashMap::new())],
            source: source.into(),
            truncated: false,
        }
    }

    /// Document whose root carries a single text child with `message`.
    pub fn error_page(message: impl Into<String>) -> Self {
        let message = message.into();
        let mut document = Self::new(message.clone());
        document.append_text(Self::ROOT, &message);
        document
    }

    pub fn root(&self) -> &Node {
        &self.nodes[Self::ROOT]
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of nodes including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the root exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Set when parsing stopped early on malformed input.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn mark_truncated(&mut self) {
        self.truncated = true;
    }

    /// Appends an element under `parent`. Returns `None` when `parent` does
    /// not exist or is a text run.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: HashMap<String, String>,
    ) -> Option<NodeId> {
        self.append(parent, Node::element(tag, attributes))
    }

    /// Appends a text run under `parent`. Same failure rules as
    /// [`Document::append_element`].
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Option<NodeId> {
        self.append(parent, Node::text_run(text))
    }

    fn append(&mut self, parent: NodeId, node: Node) -> Option<NodeId> {
        if self.nodes.get(parent)?.is_text() {
            return None;
        }

        let id = self.nodes.len();
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        Some(id)
    }

    /// Pre-order walk over `start` and everything below it.
    pub fn descendants(&self, start: NodeId) -> Descendants<'_> {
        let stack = if start < self.nodes.len() {
            vec![start]
        } else {
            Vec::new()
        };
        Descendants {
            document: self,
            stack,
        }
    }

    /// Concatenation of every text run below `id`, in tree order.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter(|(_, node)| node.is_text())
            .map(|(_, node)| node.text.as_str())
            .collect()
    }
}

/// Iterator returned by [`Document::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    document: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.document.nodes.get(id)?;
        self.stack.extend(node.children.iter().rev().copied());
        Some((id, node))
    }
}

#[cfg(test)]
mod tests {
    use super::Document;
    use super::TagKind;
    use std::collections::HashMap;

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn new_document_has_only_root() {
        let doc = Document::new("");
        assert!(doc.is_empty());
        assert_eq!(doc.root().tag(), "root");
        assert_eq!(doc.root().kind(), TagKind::Generic);
        assert!(doc.root().text().is_empty());
    }

    #[test]
    fn text_runs_cannot_take_children() {
        let mut doc = Document::new("");
        let text = doc.append_text(Document::ROOT, "hello");
        assert!(text.is_some());
        let text = text.unwrap_or_default();
        assert!(doc.append_text(text, "nested").is_none());
        assert!(doc.append_element(text, "b", HashMap::new()).is_none());
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn element_named_text_is_not_a_text_run() {
        let mut doc = Document::new("");
        let id = doc.append_element(Document::ROOT, "text", HashMap::new());
        let node = id.and_then(|id| doc.node(id));
        assert!(node.is_some_and(|node| !node.is_text()));
        assert!(node.is_some_and(|node| node.kind() == TagKind::Generic));
    }

    #[test]
    fn descendants_walk_in_tree_order() {
        let mut doc = Document::new("");
        let p = doc
            .append_element(Document::ROOT, "p", HashMap::new())
            .unwrap_or_default();
        doc.append_text(p, "Hi");
        let b = doc.append_element(p, "b", HashMap::new()).unwrap_or_default();
        doc.append_text(b, "there");
        doc.append_element(Document::ROOT, "img", attrs(&[("src", "a.png")]));

        let tags = doc
            .descendants(Document::ROOT)
            .map(|(_, node)| node.tag().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(tags, ["root", "p", "text", "b", "text", "img"]);
    }

    #[test]
    fn text_content_includes_nested_runs() {
        let mut doc = Document::new("");
        let a = doc
            .append_element(Document::ROOT, "a", attrs(&[("href", "/x")]))
            .unwrap_or_default();
        doc.append_text(a, "Read");
        let b = doc.append_element(a, "b", HashMap::new()).unwrap_or_default();
        doc.append_text(b, "more");

        assert_eq!(doc.text_content(a), "Readmore");
        assert_eq!(
            doc.node(a).and_then(|node| node.attr("href")),
            Some("/x")
        );
    }

    #[test]
    fn error_page_has_single_text_child() {
        let doc = Document::error_page("Failed to fetch URL: timeout");
        assert_eq!(doc.root().children().len(), 1);
        let child = doc.node(doc.root().children()[0]);
        assert!(child.is_some_and(|node| node.is_text()));
        assert_eq!(doc.text_content(Document::ROOT), "Failed to fetch URL: timeout");
    }

    #[test]
    fn classifies_supported_tags() {
        assert_eq!(TagKind::for_element("strong"), TagKind::Strong);
        assert_eq!(TagKind::for_element("b"), TagKind::Strong);
        assert_eq!(TagKind::for_element("em"), TagKind::Emphasis);
        assert_eq!(TagKind::for_element("h2"), TagKind::Heading2);
        assert_eq!(TagKind::for_element("H1"), TagKind::Generic);
        assert_eq!(TagKind::for_element("div"), TagKind::Generic);
    }
}
