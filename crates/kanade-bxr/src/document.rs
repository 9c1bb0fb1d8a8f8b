//! In-memory representation of a decoded BXR script.

/// A decoded BXR document: an ordered forest of [`Node`]s plus the
/// document-wide property name.
///
/// The property name is the XML attribute name carrying each node's scalar
/// value. It is a single name for the whole document, recovered on decode
/// and re-injected as a placeholder tag on encode.
///
/// Equality compares the property name and the forest; the captured pool
/// layout is an encoding detail and never affects comparisons.
#[derive(Debug, Clone)]
pub struct Bxr {
    /// Attribute name used for every node's scalar value.
    pub property_name: String,
    /// Top-level elements. The format permits more than one.
    pub roots: Vec<Node>,
    /// Pool and tag table layout captured at decode time; replayed on
    /// encode so untouched files re-encode byte for byte whatever their
    /// original layout.
    pub(crate) layout: Option<crate::layout::PoolLayout>,
}

impl PartialEq for Bxr {
    fn eq(&self, other: &Self) -> bool {
        self.property_name == other.property_name && self.roots == other.roots
    }
}

impl Eq for Bxr {}

/// Default property name used by documents built from scratch, matching
/// what the game's own script files use.
pub const DEFAULT_PROPERTY_NAME: &str = "symbol";

impl Bxr {
    /// Create an empty document with the given property name.
    pub fn new(property_name: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
            roots: Vec::new(),
            layout: None,
        }
    }

    /// Total number of nodes in the forest.
    pub fn node_count(&self) -> usize {
        fn count(node: &Node) -> usize {
            1 + node.children.iter().map(count).sum::<usize>()
        }
        self.roots.iter().map(count).sum()
    }

    /// Total number of leaves in the forest.
    pub fn leaf_count(&self) -> usize {
        fn count(node: &Node) -> usize {
            node.leaves.len() + node.children.iter().map(count).sum::<usize>()
        }
        self.roots.iter().map(count).sum()
    }
}

impl Default for Bxr {
    fn default() -> Self {
        Self::new(DEFAULT_PROPERTY_NAME)
    }
}

/// A tree node (a "main item" in the flat file).
///
/// A node with no children and no leaves is a valid terminal element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Tag name of the element.
    pub tag: String,
    /// Scalar value, serialized as the document property attribute.
    pub scalar: Option<String>,
    /// Wide value, serialized as UTF-16BE in the string pool. Carries
    /// Japanese text such as song lyrics.
    pub wide: Option<String>,
    /// Text-valued child elements, in order.
    pub leaves: Vec<Leaf>,
    /// Nested child elements, in order.
    pub children: Vec<Node>,
}

impl Node {
    /// Create a new node with the given tag name.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            scalar: None,
            wide: None,
            leaves: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set the scalar value.
    pub fn scalar(mut self, value: impl Into<String>) -> Self {
        self.scalar = Some(value.into());
        self
    }

    /// Set the wide value.
    pub fn wide(mut self, value: impl Into<String>) -> Self {
        self.wide = Some(value.into());
        self
    }

    /// Append a leaf.
    pub fn leaf(mut self, tag: impl Into<String>, value: impl Into<String>) -> Self {
        self.leaves.push(Leaf {
            tag: tag.into(),
            value: value.into(),
        });
        self
    }

    /// Append a child node.
    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }
}

/// A text-valued child element (a "sub item" in the flat file).
///
/// Owned by exactly one node; never itself a parent. An empty value is
/// meaningful: the flat format distinguishes a zero-length leaf from no
/// leaf at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    /// Tag name of the element.
    pub tag: String,
    /// Text content.
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let doc = Bxr {
            property_name: "sym".into(),
            roots: vec![Node::new("title")
                .scalar("Hello")
                .leaf("line", "A")
                .leaf("line", "B")
                .child(Node::new("page").leaf("line", "C"))],
            ..Bxr::default()
        };

        assert_eq!(doc.node_count(), 2);
        assert_eq!(doc.leaf_count(), 3);
    }
}
