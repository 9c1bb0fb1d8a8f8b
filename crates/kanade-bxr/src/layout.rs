//! Decoded string-pool layout, replayed on encode.
//!
//! Files produced by other tools can order the string chunk and the tag
//! tables however they like; the stored offsets are the only record of
//! that order. Decode captures every slot's offset here and encode lays
//! the pool out by sorting slots on the captured offsets, so an untouched
//! document reproduces its source file byte for byte even when the source
//! layout is not the one a from-scratch encode would pick.

use crate::records::NONE;
use crate::{Bxr, Node};

/// String pool offsets and tag table contents captured at decode time.
///
/// Slot vectors are indexed the way encode walks the document: main and
/// sub tags by table id, scalars and wides by node in flattening order,
/// leaf values in flattening-then-chain order.
#[derive(Debug, Clone)]
pub(crate) struct PoolLayout {
    pub(crate) main_tags: Vec<String>,
    pub(crate) sub_tags: Vec<String>,
    pub(crate) main_tag_offsets: Vec<i32>,
    pub(crate) sub_tag_offsets: Vec<i32>,
    pub(crate) scalar_offsets: Vec<i32>,
    pub(crate) value_offsets: Vec<i32>,
    pub(crate) wide_offsets: Vec<i32>,
}

impl PoolLayout {
    /// Check that the capture still lines up with the document: same node
    /// and leaf counts, same scalar/wide presence per node, and the
    /// property placeholder still in the sub tag table. Edits that change
    /// the shape fall back to the canonical encode order.
    pub(crate) fn matches(&self, doc: &Bxr) -> bool {
        if !self.sub_tags.iter().any(|tag| *tag == doc.property_name) {
            return false;
        }

        let mut nodes = 0usize;
        let mut leaves = 0usize;
        let mut aligned = true;
        walk(&doc.roots, &mut |node| {
            let scalar = node.scalar.as_deref().is_some_and(|s| !s.is_empty());
            let wide = node.wide.as_deref().is_some_and(|s| !s.is_empty());
            aligned &= self
                .scalar_offsets
                .get(nodes)
                .is_some_and(|&offset| (offset != NONE) == scalar);
            aligned &= self
                .wide_offsets
                .get(nodes)
                .is_some_and(|&offset| (offset != NONE) == wide);
            nodes += 1;
            leaves += node.leaves.len();
        });

        aligned
            && nodes == self.scalar_offsets.len()
            && nodes == self.wide_offsets.len()
            && leaves == self.value_offsets.len()
    }
}

fn walk<F: FnMut(&Node)>(nodes: &[Node], f: &mut F) {
    for node in nodes {
        f(node);
        walk(&node.children, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_node_layout() -> PoolLayout {
        PoolLayout {
            main_tags: vec!["a".into()],
            sub_tags: vec!["sym".into()],
            main_tag_offsets: vec![0],
            sub_tag_offsets: vec![2],
            scalar_offsets: vec![NONE],
            value_offsets: vec![],
            wide_offsets: vec![NONE],
        }
    }

    #[test]
    fn test_matches_same_shape() {
        let layout = single_node_layout();
        let doc = Bxr {
            property_name: "sym".into(),
            roots: vec![Node::new("a")],
            ..Bxr::default()
        };
        assert!(layout.matches(&doc));
    }

    #[test]
    fn test_shape_changes_invalidate() {
        let layout = single_node_layout();

        // A scalar where the capture recorded none.
        let doc = Bxr {
            property_name: "sym".into(),
            roots: vec![Node::new("a").scalar("v")],
            ..Bxr::default()
        };
        assert!(!layout.matches(&doc));

        // An extra node.
        let doc = Bxr {
            property_name: "sym".into(),
            roots: vec![Node::new("a"), Node::new("b")],
            ..Bxr::default()
        };
        assert!(!layout.matches(&doc));

        // A renamed property.
        let doc = Bxr {
            property_name: "other".into(),
            roots: vec![Node::new("a")],
            ..Bxr::default()
        };
        assert!(!layout.matches(&doc));
    }
}
