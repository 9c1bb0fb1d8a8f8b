//! BXR encoding: tree to flat records.
//!
//! Nodes are numbered in pre-order visitation order. String pool offsets
//! are assigned from slots: a document decoded from bytes carries every
//! slot's original offset in its captured [`PoolLayout`], and the pool is
//! laid out by sorting slots on those offsets, which reproduces the source
//! file byte for byte whatever order its pool used. Documents built from
//! scratch, ingested from XML, or reshaped since decode use the canonical
//! order instead: main tag names, sub tag names (property placeholder
//! first), then per node its scalar followed by its leaves' values, and
//! finally, after even-padding, the wide values in node order.

use crate::layout::PoolLayout;
use crate::records::{MainRecord, RawBxr, SubRecord, NONE};
use crate::strings::StringPool;
use crate::tags::TagTable;
use crate::{Bxr, Node, Result};

impl Bxr {
    /// Encode the document to BXR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(flatten(self).write())
    }

    /// Exact encoded size in bytes, without materializing the output.
    ///
    /// Callers use this to pre-size destination buffers, so it must follow
    /// the same even-padding rule as the encoder.
    pub fn byte_size(&self) -> usize {
        // Same table construction as the encoder: seeded from the captured
        // layout when one still applies, then grown by whatever the tree
        // actually uses.
        let (mut main_tags, mut sub_tags) = match self.layout.as_ref().filter(|l| l.matches(self))
        {
            Some(layout) => seed_tables(layout),
            None => {
                let mut sub_tags = TagTable::new();
                sub_tags.intern(&self.property_name);
                (TagTable::new(), sub_tags)
            }
        };

        let mut main_count = 0usize;
        let mut sub_count = 0usize;
        let mut narrow = 0usize;
        let mut wide = 0usize;

        visit(&self.roots, &mut |node| {
            main_tags.intern(&node.tag);
            main_count += 1;
            sub_count += node.leaves.len();
            if let Some(scalar) = &node.scalar {
                if !scalar.is_empty() {
                    narrow += scalar.len() + 1;
                }
            }
            for leaf in &node.leaves {
                sub_tags.intern(&leaf.tag);
                narrow += leaf.value.len() + 1;
            }
            if let Some(value) = &node.wide {
                if !value.is_empty() {
                    wide += (value.encode_utf16().count() + 1) * 2;
                }
            }
        });

        for name in main_tags.names().chain(sub_tags.names()) {
            narrow += name.len() + 1;
        }

        let chunk = narrow + narrow % 2 + wide;

        crate::records::HEADER_SIZE
            + (main_tags.len() + sub_tags.len()) * 4
            + main_count * crate::records::MAIN_RECORD_SIZE
            + sub_count * crate::records::SUB_RECORD_SIZE
            + chunk
    }
}

fn visit<F: FnMut(&Node)>(nodes: &[Node], f: &mut F) {
    for node in nodes {
        f(node);
        visit(&node.children, f);
    }
}

/// Intern every tag name in first-seen pre-order. The property name goes
/// into the sub table before any real leaf tag so that it is the one tag
/// no sub record ever references, which is how decode finds it again.
fn collect_tags(doc: &Bxr) -> (TagTable, TagTable) {
    let mut main_tags = TagTable::new();
    let mut sub_tags = TagTable::new();
    sub_tags.intern(&doc.property_name);

    visit(&doc.roots, &mut |node| {
        main_tags.intern(&node.tag);
        for leaf in &node.leaves {
            sub_tags.intern(&leaf.tag);
        }
    });

    (main_tags, sub_tags)
}

/// Rebuild the tag tables exactly as decoded, preserving table order.
fn seed_tables(layout: &PoolLayout) -> (TagTable, TagTable) {
    let mut main_tags = TagTable::new();
    for name in &layout.main_tags {
        main_tags.intern(name);
    }
    let mut sub_tags = TagTable::new();
    for name in &layout.sub_tags {
        sub_tags.intern(name);
    }
    (main_tags, sub_tags)
}

/// One narrow string occurrence, identified by the record field its pool
/// offset must be written back to.
#[derive(Debug, Clone, Copy)]
enum Slot {
    MainTag(usize),
    SubTag(usize),
    Scalar(usize),
    LeafValue(usize),
}

/// Sort key for a slot: the captured offset when replaying a decoded
/// layout (slots without one sort last, in emission order), the emission
/// index itself for the canonical order.
fn sort_key(layout: Option<&PoolLayout>, captured: Option<i32>, seq: usize) -> i64 {
    match layout {
        Some(_) => captured.map_or(i64::MAX, i64::from),
        None => seq as i64,
    }
}

struct Flattener<'a> {
    main_tags: TagTable,
    sub_tags: TagTable,
    mains: Vec<MainRecord>,
    subs: Vec<SubRecord>,
    /// Narrow slots in canonical per-node order: scalar before leaf
    /// values, parents before descendants. Offsets are assigned later.
    node_slots: Vec<(Slot, &'a str)>,
    /// Wide values paired with the owning main item index.
    wides: Vec<(usize, &'a str)>,
}

fn flatten(doc: &Bxr) -> RawBxr {
    let layout = doc.layout.as_ref().filter(|layout| layout.matches(doc));

    let (main_tags, sub_tags) = match layout {
        Some(layout) => seed_tables(layout),
        None => collect_tags(doc),
    };

    let mut flattener = Flattener {
        main_tags,
        sub_tags,
        mains: Vec::new(),
        subs: Vec::new(),
        node_slots: Vec::new(),
        wides: Vec::new(),
    };
    for root in &doc.roots {
        flattener.flatten_node(root);
    }
    if let Some(last) = flattener.mains.last_mut() {
        last.next = NONE;
    }

    let Flattener {
        main_tags,
        sub_tags,
        mut mains,
        mut subs,
        node_slots,
        wides,
    } = flattener;

    // Narrow slots in canonical emission order: tag tables first, then the
    // per-node strings.
    let mut slots: Vec<(Slot, &str, i64)> = Vec::new();
    for (id, name) in main_tags.names().enumerate() {
        let captured = layout.and_then(|l| l.main_tag_offsets.get(id).copied());
        slots.push((Slot::MainTag(id), name, sort_key(layout, captured, slots.len())));
    }
    for (id, name) in sub_tags.names().enumerate() {
        let captured = layout.and_then(|l| l.sub_tag_offsets.get(id).copied());
        slots.push((Slot::SubTag(id), name, sort_key(layout, captured, slots.len())));
    }
    for &(slot, text) in &node_slots {
        let captured = layout
            .and_then(|l| match slot {
                Slot::Scalar(node) => l.scalar_offsets.get(node).copied(),
                Slot::LeafValue(leaf) => l.value_offsets.get(leaf).copied(),
                _ => None,
            })
            .filter(|&offset| offset != NONE);
        slots.push((slot, text, sort_key(layout, captured, slots.len())));
    }

    // sort_by_key is stable, so canonical keys leave the order untouched.
    slots.sort_by_key(|&(_, _, key)| key);

    let mut pool = StringPool::new();
    let mut main_tag_offsets = vec![NONE; main_tags.len()];
    let mut sub_tag_offsets = vec![NONE; sub_tags.len()];
    for &(slot, text, _) in &slots {
        let offset = pool.intern(text);
        match slot {
            Slot::MainTag(id) => main_tag_offsets[id] = offset,
            Slot::SubTag(id) => sub_tag_offsets[id] = offset,
            Slot::Scalar(node) => mains[node].scalar_offset = offset,
            Slot::LeafValue(leaf) => subs[leaf].value_offset = offset,
        }
    }

    pool.pad_even();
    let mut wide_slots: Vec<(usize, &str, i64)> = wides
        .iter()
        .enumerate()
        .map(|(seq, &(node, text))| {
            let captured = layout
                .and_then(|l| l.wide_offsets.get(node).copied())
                .filter(|&offset| offset != NONE);
            (node, text, sort_key(layout, captured, seq))
        })
        .collect();
    wide_slots.sort_by_key(|&(_, _, key)| key);
    for &(node, text, _) in &wide_slots {
        mains[node].wide_offset = pool.intern_wide(text);
    }

    RawBxr {
        main_tag_offsets,
        sub_tag_offsets,
        main_records: mains,
        sub_records: subs,
        string_chunk: pool.into_bytes(),
    }
}

impl<'a> Flattener<'a> {
    fn flatten_node(&mut self, node: &'a Node) {
        let index = self.mains.len();
        let data_tag = self.main_tags.intern(&node.tag) as i32;

        // The record is completed after the subtree is visited; reserve
        // its slot now so descendants take later indices.
        self.mains.push(MainRecord {
            before: index as i32 - 1,
            next: index as i32 + 1,
            data_tag,
            scalar_offset: NONE,
            first_leaf: NONE,
            wide_offset: NONE,
            next_ticks: NONE,
        });

        // An empty scalar encodes as absent; an empty leaf value stays a
        // real, present-but-empty pool entry.
        if let Some(value) = &node.scalar {
            if !value.is_empty() {
                self.node_slots.push((Slot::Scalar(index), value.as_str()));
            }
        }

        let first_leaf = if node.leaves.is_empty() {
            NONE
        } else {
            self.subs.len() as i32
        };
        for (i, leaf) in node.leaves.iter().enumerate() {
            let next = if i + 1 == node.leaves.len() {
                NONE
            } else {
                self.subs.len() as i32 + 1
            };
            let data_tag = self.sub_tags.intern(&leaf.tag) as i32;
            self.node_slots
                .push((Slot::LeafValue(self.subs.len()), leaf.value.as_str()));
            self.subs.push(SubRecord {
                next,
                data_tag,
                value_offset: NONE,
            });
        }

        if let Some(value) = &node.wide {
            if !value.is_empty() {
                self.wides.push((index, value.as_str()));
            }
        }

        for child in &node.children {
            self.flatten_node(child);
        }

        let next_ticks = self.mains.len() as i32;
        let record = &mut self.mains[index];
        record.first_leaf = first_leaf;
        record.next_ticks = next_ticks;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RawBxr;

    fn scenario_doc() -> Bxr {
        Bxr {
            property_name: "sym".into(),
            roots: vec![crate::Node::new("title")
                .scalar("Hello")
                .leaf("line", "A")
                .leaf("line", "B")],
            ..Bxr::default()
        }
    }

    /// The scenario document serialized with the string values ahead of
    /// the tag names, an order the canonical encode never produces.
    fn foreign_pool_order_bytes() -> Vec<u8> {
        let mut pool = StringPool::new();
        let hello = pool.intern("Hello");
        let a = pool.intern("A");
        let b = pool.intern("B");
        let title = pool.intern("title");
        let sym = pool.intern("sym");
        let line = pool.intern("line");
        pool.pad_even();

        RawBxr {
            main_tag_offsets: vec![title],
            sub_tag_offsets: vec![sym, line],
            main_records: vec![MainRecord {
                before: -1,
                next: -1,
                data_tag: 0,
                scalar_offset: hello,
                first_leaf: 0,
                wide_offset: -1,
                next_ticks: 1,
            }],
            sub_records: vec![
                SubRecord {
                    next: 1,
                    data_tag: 1,
                    value_offset: a,
                },
                SubRecord {
                    next: -1,
                    data_tag: 1,
                    value_offset: b,
                },
            ],
            string_chunk: pool.into_bytes(),
        }
        .write()
    }

    #[test]
    fn test_scenario_tables() {
        let bytes = scenario_doc().to_bytes().unwrap();
        let raw = RawBxr::read(&bytes).unwrap();

        // Exactly two sub tags: the "sym" placeholder and "line", with the
        // placeholder referenced by zero sub records.
        assert_eq!(raw.sub_tag_offsets.len(), 2);
        assert_eq!(raw.main_tag_offsets.len(), 1);
        assert!(raw.sub_records.iter().all(|r| r.data_tag != 0));
        assert_eq!(raw.sub_records.len(), 2);
        assert_eq!(raw.main_records.len(), 1);
    }

    #[test]
    fn test_structural_round_trip() {
        let doc = Bxr {
            property_name: "sym".into(),
            roots: vec![
                crate::Node::new("scene")
                    .scalar("intro")
                    .leaf("bgm", "track01")
                    .child(
                        crate::Node::new("title")
                            .wide("春香")
                            .leaf("line", "A")
                            .leaf("line", ""),
                    )
                    .child(crate::Node::new("fade")),
                crate::Node::new("credits"),
            ],
            ..Bxr::default()
        };

        let decoded = Bxr::parse(&doc.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_byte_identical_re_encode() {
        let bytes = scenario_doc().to_bytes().unwrap();
        let decoded = Bxr::parse(&bytes).unwrap();
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_foreign_pool_order_round_trip() {
        let bytes = foreign_pool_order_bytes();

        let decoded = Bxr::parse(&bytes).unwrap();
        assert_eq!(decoded, scenario_doc());
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
        assert_eq!(decoded.byte_size(), bytes.len());
    }

    #[test]
    fn test_foreign_tag_table_order_round_trip() {
        // Tag table lists "b" before "a" while the tree uses "a" first.
        let mut pool = StringPool::new();
        let b = pool.intern("b");
        let a = pool.intern("a");
        let sym = pool.intern("sym");
        pool.pad_even();

        let record = |data_tag, index: i32, last, next_ticks| MainRecord {
            before: index - 1,
            next: if last { -1 } else { index + 1 },
            data_tag,
            scalar_offset: -1,
            first_leaf: -1,
            wide_offset: -1,
            next_ticks,
        };
        let bytes = RawBxr {
            main_tag_offsets: vec![b, a],
            sub_tag_offsets: vec![sym],
            main_records: vec![record(1, 0, false, 1), record(0, 1, true, 2)],
            sub_records: vec![],
            string_chunk: pool.into_bytes(),
        }
        .write();

        let decoded = Bxr::parse(&bytes).unwrap();
        assert_eq!(decoded.roots[0].tag, "a");
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_edited_value_keeps_layout() {
        // Translation workflow: replace a string in place, re-encode. The
        // pool keeps the source ordering, values still ahead of the tags.
        let mut doc = Bxr::parse(&foreign_pool_order_bytes()).unwrap();
        doc.roots[0].scalar = Some("Howdy".into());

        let raw = RawBxr::read(&doc.to_bytes().unwrap()).unwrap();
        assert!(raw.string_chunk.starts_with(b"Howdy\0A\0B\0title\0"));
    }

    #[test]
    fn test_reshaped_document_uses_canonical_order() {
        // A shape edit invalidates the captured layout; the canonical
        // order takes over and the result still decodes.
        let mut doc = Bxr::parse(&foreign_pool_order_bytes()).unwrap();
        doc.roots[0].leaves.push(crate::Leaf {
            tag: "line".into(),
            value: "C".into(),
        });

        let raw = RawBxr::read(&doc.to_bytes().unwrap()).unwrap();
        assert!(raw.string_chunk.starts_with(b"title\0sym\0line\0Hello\0"));

        let decoded = Bxr::parse(&doc.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.roots[0].leaves.len(), 3);
    }

    #[test]
    fn test_byte_size_matches_output() {
        let doc = Bxr {
            property_name: "symbol".into(),
            roots: vec![crate::Node::new("root")
                .scalar("v")
                .wide("歌詞テスト")
                .leaf("a", "one")
                .child(crate::Node::new("child").leaf("b", "two"))],
            ..Bxr::default()
        };

        assert_eq!(doc.byte_size(), doc.to_bytes().unwrap().len());
    }

    #[test]
    fn test_byte_size_odd_narrow_region() {
        // "ab" + NUL for the tag makes the 8-bit region odd before padding.
        let doc = Bxr {
            property_name: "sym".into(),
            roots: vec![crate::Node::new("ab").wide("x")],
            ..Bxr::default()
        };

        assert_eq!(doc.byte_size(), doc.to_bytes().unwrap().len());
    }

    #[test]
    fn test_hierarchy_markers() {
        // a(b(c)) d : subtree ends [3, 3, 3, 4]
        let doc = Bxr {
            property_name: "sym".into(),
            roots: vec![
                crate::Node::new("a").child(crate::Node::new("b").child(crate::Node::new("c"))),
                crate::Node::new("d"),
            ],
            ..Bxr::default()
        };

        let raw = RawBxr::read(&doc.to_bytes().unwrap()).unwrap();
        let ticks: Vec<i32> = raw.main_records.iter().map(|r| r.next_ticks).collect();
        assert_eq!(ticks, [3, 3, 3, 4]);

        let befores: Vec<i32> = raw.main_records.iter().map(|r| r.before).collect();
        let nexts: Vec<i32> = raw.main_records.iter().map(|r| r.next).collect();
        assert_eq!(befores, [-1, 0, 1, 2]);
        assert_eq!(nexts, [1, 2, 3, -1]);
    }

    #[test]
    fn test_tag_dedup() {
        let doc = Bxr {
            property_name: "sym".into(),
            roots: vec![crate::Node::new("line")
                .leaf("word", "a")
                .child(crate::Node::new("line").leaf("word", "b"))],
            ..Bxr::default()
        };

        let raw = RawBxr::read(&doc.to_bytes().unwrap()).unwrap();
        assert_eq!(raw.main_tag_offsets.len(), 1);
        // "sym" + "word"
        assert_eq!(raw.sub_tag_offsets.len(), 2);
    }

    #[test]
    fn test_empty_scalar_is_absent() {
        let doc = Bxr {
            property_name: "sym".into(),
            roots: vec![crate::Node::new("a").scalar("")],
            ..Bxr::default()
        };

        let raw = RawBxr::read(&doc.to_bytes().unwrap()).unwrap();
        assert_eq!(raw.main_records[0].scalar_offset, -1);

        let decoded = Bxr::parse(&doc.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.roots[0].scalar, None);
    }

    #[test]
    fn test_empty_leaf_is_present() {
        let doc = Bxr {
            property_name: "sym".into(),
            roots: vec![crate::Node::new("a").leaf("line", "")],
            ..Bxr::default()
        };

        let decoded = Bxr::parse(&doc.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.roots[0].leaves.len(), 1);
        assert_eq!(decoded.roots[0].leaves[0].value, "");
    }

    #[test]
    fn test_empty_document() {
        let doc = Bxr::new("sym");
        let bytes = doc.to_bytes().unwrap();
        let decoded = Bxr::parse(&bytes).unwrap();

        assert_eq!(decoded.property_name, "sym");
        assert!(decoded.roots.is_empty());
        assert_eq!(doc.byte_size(), bytes.len());
    }

    #[test]
    fn test_canonical_pool_order() {
        let bytes = scenario_doc().to_bytes().unwrap();
        let raw = RawBxr::read(&bytes).unwrap();

        // main tags, sub tags (placeholder first), scalar, leaf values,
        // and the even-padding byte at the end
        assert_eq!(raw.string_chunk, b"title\0sym\0line\0Hello\0A\0B\0\0");
    }
}
