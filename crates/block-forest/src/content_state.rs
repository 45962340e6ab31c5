//! Document container: the current block map plus selection snapshots.

use serde::{Deserialize, Serialize};

use crate::block_map::{BlockMap, BlockRef};
use crate::keys::BlockKey;

/// Anchor/focus selection over block keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    anchor_key: BlockKey,
    anchor_offset: usize,
    focus_key: BlockKey,
    focus_offset: usize,
}

impl SelectionState {
    /// Collapsed selection at the start of `key`.
    pub fn on_block(key: impl Into<BlockKey>) -> Self {
        let key = key.into();
        Self {
            anchor_key: key.clone(),
            anchor_offset: 0,
            focus_key: key,
            focus_offset: 0,
        }
    }

    /// The same selection re-anchored on `key`; offsets are kept.
    pub fn with_block(&self, key: &BlockKey) -> Self {
        Self {
            anchor_key: key.clone(),
            focus_key: key.clone(),
            ..self.clone()
        }
    }

    pub fn anchor_key(&self) -> &BlockKey {
        &self.anchor_key
    }

    pub fn anchor_offset(&self) -> usize {
        self.anchor_offset
    }

    pub fn focus_key(&self) -> &BlockKey {
        &self.focus_key
    }

    pub fn focus_offset(&self) -> usize {
        self.focus_offset
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor_key == self.focus_key && self.anchor_offset == self.focus_offset
    }
}

/// Owns the current [`BlockMap`] and the selection snapshots around the
/// latest change. Operations never mutate a container; they return a new
/// one via [`merged`](ContentState::merged).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentState {
    block_map: BlockMap,
    selection_before: SelectionState,
    selection_after: SelectionState,
}

impl ContentState {
    /// Wraps a block map; both selection snapshots collapse onto the first
    /// block (or an empty key for an empty map).
    pub fn new(block_map: BlockMap) -> Self {
        let first = block_map
            .first()
            .map(|block| block.key().clone())
            .unwrap_or_else(|| BlockKey::new(""));
        let selection = SelectionState::on_block(first);
        Self {
            block_map,
            selection_before: selection.clone(),
            selection_after: selection,
        }
    }

    /// Merge-style update: a new container with the given map and
    /// selection snapshots.
    pub fn merged(
        &self,
        block_map: BlockMap,
        selection_before: SelectionState,
        selection_after: SelectionState,
    ) -> Self {
        Self {
            block_map,
            selection_before,
            selection_after,
        }
    }

    pub fn block_map(&self) -> &BlockMap {
        &self.block_map
    }

    pub fn selection_before(&self) -> &SelectionState {
        &self.selection_before
    }

    pub fn selection_after(&self) -> &SelectionState {
        &self.selection_after
    }

    pub fn block_for_key(&self, key: &BlockKey) -> Option<BlockRef<'_>> {
        self.block_map.get(key)
    }

    /// Block immediately before `key` in document order.
    pub fn block_before(&self, key: &BlockKey) -> Option<BlockRef<'_>> {
        self.block_map
            .key_before(key)
            .and_then(|k| self.block_map.get(k))
    }

    /// Block immediately after `key` in document order.
    pub fn block_after(&self, key: &BlockKey) -> Option<BlockRef<'_>> {
        self.block_map
            .key_after(key)
            .and_then(|k| self.block_map.get(k))
    }
}
