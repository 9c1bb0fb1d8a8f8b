//! BXR decoding: flat records to tree.
//!
//! The file stores the tree as a pre-order sequence of main records. Each
//! record's `next_ticks` marks the first index past its subtree, so the
//! half-open range `(i, next_ticks)` holds exactly the descendants of item
//! `i` and the direct children of a range are recovered by repeatedly
//! jumping `i -> next_ticks(i)`.

use crate::layout::PoolLayout;
use crate::records::{RawBxr, NONE};
use crate::strings::StringPool;
use crate::{Bxr, Error, Leaf, Node, Result};

impl Bxr {
    /// Check if data is a BXR file by checking the magic bytes.
    pub fn is_bxr(data: &[u8]) -> bool {
        RawBxr::is_bxr(data)
    }

    /// Decode a BXR file from bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let raw = RawBxr::read(data)?;
        linearize(raw)
    }
}

/// A main record with its strings resolved, before the hierarchy is built.
struct FlatNode {
    tag: String,
    scalar: Option<String>,
    wide: Option<String>,
    leaves: Vec<Leaf>,
}

fn linearize(raw: RawBxr) -> Result<Bxr> {
    let pool = StringPool::from_bytes(raw.string_chunk);

    let main_tags = resolve_tag_names(&raw.main_tag_offsets, &pool)?;
    let sub_tags = resolve_tag_names(&raw.sub_tag_offsets, &pool)?;

    let property_name = recover_property_name(&raw.sub_records, &sub_tags)?;

    // Capture every slot's pool offset so encode can reproduce the layout.
    let mut scalar_offsets = Vec::with_capacity(raw.main_records.len());
    let mut wide_offsets = Vec::with_capacity(raw.main_records.len());
    let mut value_offsets = Vec::with_capacity(raw.sub_records.len());

    let mut flat = Vec::with_capacity(raw.main_records.len());
    for record in &raw.main_records {
        let tag = main_tags
            .get(record.data_tag.max(0) as usize)
            .filter(|_| record.data_tag >= 0)
            .ok_or(Error::DanglingReference {
                kind: "main tag",
                index: record.data_tag,
                count: main_tags.len(),
            })?
            .clone();

        let scalar = match record.scalar_offset {
            NONE => None,
            offset => Some(pool.cstring_at(offset)?.to_owned()),
        };

        let wide = match record.wide_offset {
            NONE => None,
            offset => Some(pool.wide_at(offset)?),
        };

        let leaves = collect_leaf_chain(
            record.first_leaf,
            &raw.sub_records,
            &sub_tags,
            &pool,
            &mut value_offsets,
        )?;

        scalar_offsets.push(record.scalar_offset);
        wide_offsets.push(record.wide_offset);

        flat.push(FlatNode {
            tag,
            scalar,
            wide,
            leaves,
        });
    }

    let mut flat: Vec<Option<FlatNode>> = flat.into_iter().map(Some).collect();
    let roots = build_forest(&raw.main_records, &mut flat, 0, raw.main_records.len())?;

    let layout = PoolLayout {
        main_tags,
        sub_tags,
        main_tag_offsets: raw.main_tag_offsets,
        sub_tag_offsets: raw.sub_tag_offsets,
        scalar_offsets,
        value_offsets,
        wide_offsets,
    };

    Ok(Bxr {
        property_name,
        roots,
        layout: Some(layout),
    })
}

fn resolve_tag_names(offsets: &[i32], pool: &StringPool) -> Result<Vec<String>> {
    offsets
        .iter()
        .map(|&offset| pool.cstring_at(offset).map(str::to_owned))
        .collect()
}

/// Recover the document property name: the single sub tag referenced by
/// zero sub records. The encoder always injects exactly one such
/// placeholder; anything else is a format inconsistency.
fn recover_property_name(
    sub_records: &[crate::records::SubRecord],
    sub_tags: &[String],
) -> Result<String> {
    let mut referenced = vec![false; sub_tags.len()];
    for record in sub_records {
        let slot = referenced
            .get_mut(record.data_tag.max(0) as usize)
            .filter(|_| record.data_tag >= 0)
            .ok_or(Error::DanglingReference {
                kind: "sub tag",
                index: record.data_tag,
                count: sub_tags.len(),
            })?;
        *slot = true;
    }

    let mut unreferenced = referenced
        .iter()
        .enumerate()
        .filter(|(_, &seen)| !seen)
        .map(|(id, _)| id);

    match (unreferenced.next(), unreferenced.next()) {
        (Some(id), None) => Ok(sub_tags[id].clone()),
        (first, _) => Err(Error::PropertyNameAmbiguous {
            unreferenced: match first {
                None => 0,
                Some(_) => 2 + unreferenced.count(),
            },
        }),
    }
}

/// Follow a leaf chain from `first_leaf` until the -1 terminator,
/// collecting leaves in chain order. The chain must terminate within the
/// sub record table; anything longer means a cycle.
fn collect_leaf_chain(
    first_leaf: i32,
    sub_records: &[crate::records::SubRecord],
    sub_tags: &[String],
    pool: &StringPool,
    value_offsets: &mut Vec<i32>,
) -> Result<Vec<Leaf>> {
    if first_leaf == NONE {
        return Ok(Vec::new());
    }

    let mut leaves = Vec::new();
    let mut cursor = first_leaf;
    let mut hops = 0usize;

    while cursor != NONE {
        if hops >= sub_records.len() {
            return Err(Error::LeafChainCycle {
                start: first_leaf as usize,
            });
        }
        hops += 1;

        let record = sub_records
            .get(cursor.max(0) as usize)
            .filter(|_| cursor >= 0)
            .ok_or(Error::DanglingReference {
                kind: "leaf",
                index: cursor,
                count: sub_records.len(),
            })?;

        let tag = sub_tags
            .get(record.data_tag.max(0) as usize)
            .filter(|_| record.data_tag >= 0)
            .ok_or(Error::DanglingReference {
                kind: "sub tag",
                index: record.data_tag,
                count: sub_tags.len(),
            })?
            .clone();

        leaves.push(Leaf {
            tag,
            value: pool.cstring_at(record.value_offset)?.to_owned(),
        });
        value_offsets.push(record.value_offset);

        cursor = record.next;
    }

    Ok(leaves)
}

/// Partition the flat range `[start, end)` into sibling subtrees.
///
/// The item at the cursor owns everything up to its `next_ticks`; its
/// direct children are recovered by recursing into that sub-range, and its
/// next sibling starts where the subtree ends.
fn build_forest(
    records: &[crate::records::MainRecord],
    flat: &mut [Option<FlatNode>],
    start: usize,
    end: usize,
) -> Result<Vec<Node>> {
    let mut siblings = Vec::new();
    let mut cursor = start;

    while cursor < end {
        let next_ticks = records[cursor].next_ticks;
        if next_ticks <= cursor as i32 || next_ticks as usize > end {
            return Err(Error::InconsistentHierarchy {
                index: cursor,
                next_ticks,
            });
        }
        let subtree_end = next_ticks as usize;

        let children = build_forest(records, flat, cursor + 1, subtree_end)?;

        // Each index is visited exactly once across the whole partition.
        let FlatNode {
            tag,
            scalar,
            wide,
            leaves,
        } = flat[cursor].take().ok_or(Error::InconsistentHierarchy {
            index: cursor,
            next_ticks,
        })?;

        siblings.push(Node {
            tag,
            scalar,
            wide,
            leaves,
            children,
        });

        cursor = subtree_end;
    }

    Ok(siblings)
}
