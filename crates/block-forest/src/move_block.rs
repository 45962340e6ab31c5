//! The block relocator.
//!
//! Moves a block — for tree maps, the block together with its delimited
//! subtree — before or after a target block, then repairs every
//! parent/sibling/child reference the move disturbed. The input container
//! is untouched; a new [`ContentState`] is returned with `selection_before`
//! advanced and `selection_after` re-anchored on the moved block.

use indexmap::IndexMap;

use crate::block::{FlatBlock, TreeBlock};
use crate::block_map::{BlockMap, InvariantViolation};
use crate::content_state::ContentState;
use crate::delimiter::next_delimiter_index;
use crate::keys::BlockKey;

/// Where the moved block lands relative to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
    /// Reserved; always rejected.
    Replace,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Before,
    After,
}

impl Placement {
    fn side(self) -> Option<Side> {
        match self {
            Placement::Before => Some(Side::Before),
            Placement::After => Some(Side::After),
            Placement::Replace => None,
        }
    }
}

/// Relocates the block under `block_key` next to `target_key`.
///
/// For tree maps the moved unit is the block's whole subtree: the block
/// plus every block following it in document order, up to its next sibling
/// or — when it has none — the next delimiter (parentless) block. Flat maps
/// move exactly one block.
///
/// Fails with [`InvariantViolation`] when the placement is `Replace`, when
/// block and target coincide, when either key is unknown, when the block is
/// already adjacent to the target on the requested side, or when the target
/// lies inside the moved subtree.
pub fn move_block_in_content_state(
    content: &ContentState,
    block_key: &BlockKey,
    target_key: &BlockKey,
    placement: Placement,
) -> Result<ContentState, InvariantViolation> {
    let side = placement
        .side()
        .ok_or_else(|| InvariantViolation("Replacing blocks is not supported.".into()))?;
    if block_key == target_key {
        return Err(adjacent_error());
    }
    let block_map = match content.block_map() {
        BlockMap::Flat(blocks) => {
            BlockMap::Flat(move_flat(blocks, block_key, target_key, side)?)
        }
        BlockMap::Tree(blocks) => {
            BlockMap::Tree(move_tree(blocks, block_key, target_key, side)?)
        }
    };
    Ok(content.merged(
        block_map,
        content.selection_after().clone(),
        content.selection_after().with_block(block_key),
    ))
}

fn adjacent_error() -> InvariantViolation {
    InvariantViolation("Block cannot be moved next to itself.".into())
}

fn unknown_key(key: &BlockKey) -> InvariantViolation {
    InvariantViolation(format!("unknown block key: {key}"))
}

fn neighbor_key<'a, V>(
    blocks: &'a IndexMap<BlockKey, V>,
    key: &BlockKey,
    side: Side,
) -> Option<&'a BlockKey> {
    let index = blocks.get_index_of(key)?;
    let neighbor = match side {
        Side::Before => index.checked_sub(1)?,
        Side::After => index + 1,
    };
    blocks.get_index(neighbor).map(|(k, _)| k)
}

/// Rejects placements that would put the block next to itself, detected via
/// the current document order around the target.
fn ensure_not_adjacent<V>(
    blocks: &IndexMap<BlockKey, V>,
    block_key: &BlockKey,
    target_key: &BlockKey,
    side: Side,
) -> Result<(), InvariantViolation> {
    if neighbor_key(blocks, target_key, side) == Some(block_key) {
        return Err(adjacent_error());
    }
    Ok(())
}

fn move_flat(
    blocks: &IndexMap<BlockKey, FlatBlock>,
    block_key: &BlockKey,
    target_key: &BlockKey,
    side: Side,
) -> Result<IndexMap<BlockKey, FlatBlock>, InvariantViolation> {
    let block = blocks
        .get(block_key)
        .cloned()
        .ok_or_else(|| unknown_key(block_key))?;
    if !blocks.contains_key(target_key) {
        return Err(unknown_key(target_key));
    }
    ensure_not_adjacent(blocks, block_key, target_key, side)?;

    let mut rebuilt = IndexMap::with_capacity(blocks.len());
    for (key, value) in blocks {
        if key == block_key {
            continue;
        }
        if key == target_key && side == Side::Before {
            rebuilt.insert(block_key.clone(), block.clone());
        }
        rebuilt.insert(key.clone(), value.clone());
        if key == target_key && side == Side::After {
            rebuilt.insert(block_key.clone(), block.clone());
        }
    }
    Ok(rebuilt)
}

/// Exclusive end index of the subtree rooted at position `start`.
///
/// The bound is the root's next sibling or, when it has none, the next
/// sibling of the nearest ancestor that has one; everything before the
/// bound is a descendant of the root. When no linked sibling follows at any
/// level (the last root, or a fragment whose roots are not chained) the
/// next delimiter block bounds the unit instead, falling back to the end of
/// the map. A bound key that does not resolve (fragment) also extends the
/// subtree to the end of the map.
fn subtree_end(blocks: &IndexMap<BlockKey, TreeBlock>, start: usize) -> usize {
    let Some((root_key, _)) = blocks.get_index(start) else {
        return start;
    };
    let mut cursor = Some(root_key);
    let mut hops = 0;
    while let Some(block) = cursor.and_then(|key| blocks.get(key)) {
        if let Some(next) = block.next_sibling() {
            return blocks.get_index_of(next).unwrap_or(blocks.len());
        }
        cursor = block.parent();
        hops += 1;
        if hops > blocks.len() {
            // parent cycle; bail out to the top-level bound
            break;
        }
    }
    next_delimiter_index(blocks, start).unwrap_or(blocks.len())
}

/// Exclusive end of the contiguous run of descendants of the block at
/// position `start`. Unlike [`subtree_end`] this never consults sibling
/// links, so it stays correct on a working map the moved unit has already
/// been detached from, where a sibling bound can name the detached block.
fn descendant_span_end(blocks: &IndexMap<BlockKey, TreeBlock>, start: usize) -> usize {
    let Some((root_key, _)) = blocks.get_index(start) else {
        return start;
    };
    let mut end = start + 1;
    while let Some((_, block)) = blocks.get_index(end) {
        if !has_ancestor(blocks, block, root_key) {
            break;
        }
        end += 1;
    }
    end
}

fn has_ancestor(
    blocks: &IndexMap<BlockKey, TreeBlock>,
    block: &TreeBlock,
    ancestor: &BlockKey,
) -> bool {
    let mut cursor = block.parent();
    let mut hops = 0;
    while let Some(key) = cursor {
        if key == ancestor {
            return true;
        }
        cursor = blocks.get(key).and_then(|b| b.parent());
        hops += 1;
        if hops > blocks.len() {
            // parent cycle
            break;
        }
    }
    false
}

fn move_tree(
    blocks: &IndexMap<BlockKey, TreeBlock>,
    block_key: &BlockKey,
    target_key: &BlockKey,
    side: Side,
) -> Result<IndexMap<BlockKey, TreeBlock>, InvariantViolation> {
    let block = blocks
        .get(block_key)
        .cloned()
        .ok_or_else(|| unknown_key(block_key))?;
    let target = blocks
        .get(target_key)
        .cloned()
        .ok_or_else(|| unknown_key(target_key))?;
    ensure_not_adjacent(blocks, block_key, target_key, side)?;

    // The sibling-level neighbours at the destination. When one of them is
    // the moved block itself the move is a no-op the document-order check
    // above cannot see (the block's descendants hide it), so reject it here
    // as well.
    let (new_prev, new_next) = match side {
        Side::Before => (target.prev_sibling().cloned(), Some(target_key.clone())),
        Side::After => (Some(target_key.clone()), target.next_sibling().cloned()),
    };
    if new_prev.as_ref() == Some(block_key) || new_next.as_ref() == Some(block_key) {
        return Err(adjacent_error());
    }

    let start = blocks
        .get_index_of(block_key)
        .ok_or_else(|| unknown_key(block_key))?;
    // the unit always contains the block itself, whatever the bound says
    let end = subtree_end(blocks, start).max(start + 1);
    let target_index = blocks
        .get_index_of(target_key)
        .ok_or_else(|| unknown_key(target_key))?;
    if (start..end).contains(&target_index) {
        return Err(InvariantViolation(
            "Block cannot be moved into its own subtree.".into(),
        ));
    }

    // detach the unit
    let mut unit = Vec::with_capacity(end - start);
    let mut working = IndexMap::with_capacity(blocks.len());
    for (index, (key, value)) in blocks.iter().enumerate() {
        if (start..end).contains(&index) {
            unit.push((key.clone(), value.clone()));
        } else {
            working.insert(key.clone(), value.clone());
        }
    }

    // splice it back in around the target; for `After` the insertion point
    // is behind the target's own subtree so its descendants stay with it
    let target_pos = working
        .get_index_of(target_key)
        .ok_or_else(|| unknown_key(target_key))?;
    let insert_at = match side {
        Side::Before => target_pos,
        Side::After => descendant_span_end(&working, target_pos),
    };
    let mut rebuilt = IndexMap::with_capacity(blocks.len());
    for (index, (key, value)) in working.iter().enumerate() {
        if index == insert_at {
            for (k, v) in &unit {
                rebuilt.insert(k.clone(), v.clone());
            }
        }
        rebuilt.insert(key.clone(), value.clone());
    }
    if insert_at >= working.len() {
        for (k, v) in &unit {
            rebuilt.insert(k.clone(), v.clone());
        }
    }

    relink(&mut rebuilt, &block, &target, new_prev, new_next, side)?;
    Ok(rebuilt)
}

/// Repairs every reference the splice disturbed. `block` and `target` are
/// snapshots taken before the move; the old-position relinks run first so
/// the new-position relinks see the gap already closed.
fn relink(
    blocks: &mut IndexMap<BlockKey, TreeBlock>,
    block: &TreeBlock,
    target: &TreeBlock,
    new_prev: Option<BlockKey>,
    new_next: Option<BlockKey>,
    side: Side,
) -> Result<(), InvariantViolation> {
    let block_key = block.key().clone();
    let new_parent = target.parent().cloned();

    // close the gap at the old position
    if let Some(key) = block.parent() {
        lookup_mut(blocks, key)?
            .children
            .retain(|child| child != &block_key);
    }
    if let Some(key) = block.prev_sibling() {
        lookup_mut(blocks, key)?.next_sibling = block.next_sibling().cloned();
    }
    if let Some(key) = block.next_sibling() {
        lookup_mut(blocks, key)?.prev_sibling = block.prev_sibling().cloned();
    }

    // stitch the unit in at the new position
    if let Some(key) = &new_next {
        lookup_mut(blocks, key)?.prev_sibling = Some(block_key.clone());
    }
    if let Some(key) = &new_prev {
        lookup_mut(blocks, key)?.next_sibling = Some(block_key.clone());
    }
    if let Some(key) = &new_parent {
        let parent = lookup_mut(blocks, key)?;
        let target_index = parent
            .children
            .iter()
            .position(|child| child == target.key())
            .ok_or_else(|| {
                InvariantViolation(format!(
                    "block {} is not listed among the children of {key}",
                    target.key()
                ))
            })?;
        let insert_at = match side {
            Side::Before => target_index,
            Side::After => target_index + 1,
        };
        parent.children.insert(insert_at, block_key.clone());
    }

    let moved = lookup_mut(blocks, &block_key)?;
    moved.parent = new_parent;
    moved.prev_sibling = new_prev;
    moved.next_sibling = new_next;
    Ok(())
}

fn lookup_mut<'a>(
    blocks: &'a mut IndexMap<BlockKey, TreeBlock>,
    key: &BlockKey,
) -> Result<&'a mut TreeBlock, InvariantViolation> {
    blocks.get_mut(key).ok_or_else(|| unknown_key(key))
}
