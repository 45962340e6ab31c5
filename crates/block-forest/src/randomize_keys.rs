//! The key randomizer.
//!
//! Re-keys every block of a map with freshly generated keys and rewrites
//! all cross-references to the new keys, leaving the structure isomorphic
//! to the input.

use indexmap::IndexMap;

use crate::block::{FlatBlock, TreeBlock};
use crate::block_map::BlockMap;
use crate::keys::{BlockKey, KeyGenerator};

/// Returns a copy of `map` in which every block carries a fresh key from
/// `keygen`, with all parent/sibling/child references remapped and the
/// iteration order preserved.
///
/// The map may be a fragment of a larger document: a reference to a key
/// that is not present in the map is cleared to `None` (or dropped from the
/// child list) rather than treated as an error.
pub fn randomize_block_map_keys(map: &BlockMap, keygen: &mut dyn KeyGenerator) -> BlockMap {
    match map {
        BlockMap::Flat(blocks) => BlockMap::Flat(randomize_flat(blocks, keygen)),
        BlockMap::Tree(blocks) => BlockMap::Tree(randomize_tree(blocks, keygen)),
    }
}

fn randomize_flat(
    blocks: &IndexMap<BlockKey, FlatBlock>,
    keygen: &mut dyn KeyGenerator,
) -> IndexMap<BlockKey, FlatBlock> {
    blocks
        .values()
        .map(|block| {
            let key = keygen.generate_key();
            let mut block = block.clone();
            block.key = key.clone();
            (key, block)
        })
        .collect()
}

fn randomize_tree(
    blocks: &IndexMap<BlockKey, TreeBlock>,
    keygen: &mut dyn KeyGenerator,
) -> IndexMap<BlockKey, TreeBlock> {
    // Exclusively-owned staging map. Entries keep their old map keys for the
    // whole pass; only link fields are rewritten to new keys. The map is
    // rebuilt under the new keys at the end. Snapshots come from the input
    // map: staging link fields may already hold new keys, which resolve
    // nowhere until the rebuild.
    let mut staging = blocks.clone();
    let order: Vec<BlockKey> = blocks.keys().cloned().collect();
    let mut new_keys = Vec::with_capacity(order.len());

    for old_key in &order {
        let new_key = keygen.generate_key();
        new_keys.push(new_key.clone());
        let Some(snapshot) = blocks.get(old_key) else {
            continue;
        };

        if let Some(next_key) = snapshot.next_sibling() {
            if let Some(next) = staging.get_mut(next_key) {
                next.prev_sibling = Some(new_key.clone());
            } else if let Some(block) = staging.get_mut(old_key) {
                // fragment boundary
                block.next_sibling = None;
            }
        }

        if let Some(prev_key) = snapshot.prev_sibling() {
            if let Some(prev) = staging.get_mut(prev_key) {
                prev.next_sibling = Some(new_key.clone());
            } else if let Some(block) = staging.get_mut(old_key) {
                block.prev_sibling = None;
            }
        }

        if let Some(parent_key) = snapshot.parent() {
            if let Some(parent) = staging.get_mut(parent_key) {
                // the parent still lists this block under its old key; the
                // entry is rewritten exactly once, here
                if let Some(index) = parent.children.iter().position(|child| child == old_key) {
                    parent.children[index] = new_key.clone();
                }
            } else if let Some(block) = staging.get_mut(old_key) {
                block.parent = None;
            }
        }

        for child_key in snapshot.children() {
            if let Some(child) = staging.get_mut(child_key) {
                child.parent = Some(new_key.clone());
            } else if let Some(block) = staging.get_mut(old_key) {
                block.children.retain(|child| child != child_key);
            }
        }
    }

    staging
        .into_values()
        .zip(new_keys)
        .map(|(mut block, new_key)| {
            block.key = new_key.clone();
            (new_key, block)
        })
        .collect()
}
