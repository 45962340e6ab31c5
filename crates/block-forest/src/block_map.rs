//! The ordered block collection and its structural invariants.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::{FlatBlock, TreeBlock};
use crate::keys::{BlockKey, KeyGenerator};

/// Structural-consistency error.
///
/// Raised for violated preconditions (moving a block next to itself,
/// requesting the reserved `Replace` placement, passing an unknown key) and
/// by [`BlockMap::check_invariants`]. These are caller programming errors;
/// retrying the same call would fail the same way.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct InvariantViolation(pub String);

/// Ordered key → block mapping; iteration order is document order.
///
/// The variant is decided once at the collection level. Flat maps carry no
/// cross-references. Tree maps store a forest flattened in pre-order: each
/// block is immediately followed by its descendants, before its next
/// sibling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockMap {
    Flat(IndexMap<BlockKey, FlatBlock>),
    Tree(IndexMap<BlockKey, TreeBlock>),
}

/// Borrowed view over a block of either variant.
///
/// The tree accessors return `None` (or an empty slice) for flat blocks.
#[derive(Debug, Clone, Copy)]
pub enum BlockRef<'a> {
    Flat(&'a FlatBlock),
    Tree(&'a TreeBlock),
}

impl<'a> BlockRef<'a> {
    pub fn key(&self) -> &'a BlockKey {
        match self {
            BlockRef::Flat(block) => block.key(),
            BlockRef::Tree(block) => block.key(),
        }
    }

    pub fn text(&self) -> &'a str {
        match self {
            BlockRef::Flat(block) => block.text(),
            BlockRef::Tree(block) => block.text(),
        }
    }

    pub fn parent(&self) -> Option<&'a BlockKey> {
        match self {
            BlockRef::Flat(_) => None,
            BlockRef::Tree(block) => block.parent(),
        }
    }

    pub fn prev_sibling(&self) -> Option<&'a BlockKey> {
        match self {
            BlockRef::Flat(_) => None,
            BlockRef::Tree(block) => block.prev_sibling(),
        }
    }

    pub fn next_sibling(&self) -> Option<&'a BlockKey> {
        match self {
            BlockRef::Flat(_) => None,
            BlockRef::Tree(block) => block.next_sibling(),
        }
    }

    pub fn children(&self) -> &'a [BlockKey] {
        match self {
            BlockRef::Flat(_) => &[],
            BlockRef::Tree(block) => block.children(),
        }
    }
}

impl BlockMap {
    /// Builds a flat map from blocks, keyed by each block's own key.
    pub fn flat_from_blocks(blocks: impl IntoIterator<Item = FlatBlock>) -> Self {
        Self::Flat(
            blocks
                .into_iter()
                .map(|block| (block.key.clone(), block))
                .collect(),
        )
    }

    /// Builds a tree map from blocks, keyed by each block's own key. The
    /// blocks must already be in pre-order with consistent links; prefer
    /// [`crate::builder::build_tree_map`] which derives the links.
    pub fn tree_from_blocks(blocks: impl IntoIterator<Item = TreeBlock>) -> Self {
        Self::Tree(
            blocks
                .into_iter()
                .map(|block| (block.key.clone(), block))
                .collect(),
        )
    }

    /// Builds a flat map with one freshly keyed block per text.
    pub fn flat_from_texts<I>(texts: I, keygen: &mut dyn KeyGenerator) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::Flat(
            texts
                .into_iter()
                .map(|text| {
                    let key = keygen.generate_key();
                    (key.clone(), FlatBlock::new(key, text))
                })
                .collect(),
        )
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, BlockMap::Tree(_))
    }

    pub fn len(&self) -> usize {
        match self {
            BlockMap::Flat(blocks) => blocks.len(),
            BlockMap::Tree(blocks) => blocks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &BlockKey) -> bool {
        match self {
            BlockMap::Flat(blocks) => blocks.contains_key(key),
            BlockMap::Tree(blocks) => blocks.contains_key(key),
        }
    }

    pub fn get(&self, key: &BlockKey) -> Option<BlockRef<'_>> {
        match self {
            BlockMap::Flat(blocks) => blocks.get(key).map(BlockRef::Flat),
            BlockMap::Tree(blocks) => blocks.get(key).map(BlockRef::Tree),
        }
    }

    /// Keys in document order.
    pub fn keys(&self) -> Box<dyn Iterator<Item = &BlockKey> + '_> {
        match self {
            BlockMap::Flat(blocks) => Box::new(blocks.keys()),
            BlockMap::Tree(blocks) => Box::new(blocks.keys()),
        }
    }

    /// Blocks in document order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = BlockRef<'_>> + '_> {
        match self {
            BlockMap::Flat(blocks) => Box::new(blocks.values().map(BlockRef::Flat)),
            BlockMap::Tree(blocks) => Box::new(blocks.values().map(BlockRef::Tree)),
        }
    }

    pub fn first(&self) -> Option<BlockRef<'_>> {
        self.iter().next()
    }

    pub fn index_of(&self, key: &BlockKey) -> Option<usize> {
        match self {
            BlockMap::Flat(blocks) => blocks.get_index_of(key),
            BlockMap::Tree(blocks) => blocks.get_index_of(key),
        }
    }

    pub fn key_at(&self, index: usize) -> Option<&BlockKey> {
        match self {
            BlockMap::Flat(blocks) => blocks.get_index(index).map(|(key, _)| key),
            BlockMap::Tree(blocks) => blocks.get_index(index).map(|(key, _)| key),
        }
    }

    /// Key of the block immediately before `key` in document order.
    pub fn key_before(&self, key: &BlockKey) -> Option<&BlockKey> {
        self.index_of(key)?
            .checked_sub(1)
            .and_then(|index| self.key_at(index))
    }

    /// Key of the block immediately after `key` in document order.
    pub fn key_after(&self, key: &BlockKey) -> Option<&BlockKey> {
        self.key_at(self.index_of(key)? + 1)
    }

    /// Verifies the structural invariants of a complete document: every
    /// reference resolves, parents and children agree, sibling chains match
    /// child order (and root order), and iteration order is the pre-order
    /// flattening of the forest.
    ///
    /// A fragment of a larger document may legitimately fail the dangling
    /// reference check; this validator is meant for complete documents and
    /// for the outputs of the relocator and randomizer.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        match self {
            BlockMap::Flat(blocks) => {
                for (key, block) in blocks {
                    if block.key() != key {
                        return Err(key_mismatch(key, block.key()));
                    }
                }
                Ok(())
            }
            BlockMap::Tree(blocks) => check_tree_invariants(blocks),
        }
    }
}

fn key_mismatch(map_key: &BlockKey, block_key: &BlockKey) -> InvariantViolation {
    InvariantViolation(format!(
        "block stored under key {map_key} carries key {block_key}"
    ))
}

fn check_tree_invariants(
    blocks: &IndexMap<BlockKey, TreeBlock>,
) -> Result<(), InvariantViolation> {
    for (key, block) in blocks {
        if block.key() != key {
            return Err(key_mismatch(key, block.key()));
        }
        let references = [block.parent(), block.prev_sibling(), block.next_sibling()];
        for reference in references.into_iter().flatten().chain(block.children()) {
            if !blocks.contains_key(reference) {
                return Err(InvariantViolation(format!(
                    "block {key} references missing block {reference}"
                )));
            }
        }
        if let Some(parent_key) = block.parent() {
            let parent = lookup(blocks, parent_key)?;
            let occurrences = parent
                .children()
                .iter()
                .filter(|child| *child == key)
                .count();
            if occurrences != 1 {
                return Err(InvariantViolation(format!(
                    "block {key} appears {occurrences} times among the children of {parent_key}"
                )));
            }
        }
    }

    // child lists must agree with the children's own links
    for (key, block) in blocks {
        let children = block.children();
        for (index, child_key) in children.iter().enumerate() {
            let child = lookup(blocks, child_key)?;
            if child.parent() != Some(key) {
                return Err(InvariantViolation(format!(
                    "block {child_key} is listed as a child of {key} but points at a different parent"
                )));
            }
            if child.prev_sibling() != index.checked_sub(1).and_then(|i| children.get(i))
                || child.next_sibling() != children.get(index + 1)
            {
                return Err(InvariantViolation(format!(
                    "sibling chain of {child_key} disagrees with the child order of {key}"
                )));
            }
        }
    }

    // root blocks chain among themselves in iteration order
    let roots: Vec<&BlockKey> = blocks
        .iter()
        .filter(|(_, block)| block.parent().is_none())
        .map(|(key, _)| key)
        .collect();
    for (index, root_key) in roots.iter().enumerate() {
        let root = lookup(blocks, root_key)?;
        if root.prev_sibling() != index.checked_sub(1).map(|i| roots[i])
            || root.next_sibling() != roots.get(index + 1).copied()
        {
            return Err(InvariantViolation(format!(
                "root sibling chain broken at {root_key}"
            )));
        }
    }

    // iteration order must be the pre-order flattening of the forest
    let mut expected: Vec<&BlockKey> = Vec::with_capacity(blocks.len());
    let mut stack: Vec<&BlockKey> = roots.into_iter().rev().collect();
    while let Some(key) = stack.pop() {
        expected.push(key);
        if expected.len() > blocks.len() {
            return Err(InvariantViolation(
                "cycle in parent/child references".into(),
            ));
        }
        for child in lookup(blocks, key)?.children().iter().rev() {
            stack.push(child);
        }
    }
    if expected.len() != blocks.len()
        || !expected.iter().zip(blocks.keys()).all(|(a, b)| *a == b)
    {
        return Err(InvariantViolation(
            "iteration order is not the pre-order flattening of the forest".into(),
        ));
    }
    Ok(())
}

fn lookup<'a>(
    blocks: &'a IndexMap<BlockKey, TreeBlock>,
    key: &BlockKey,
) -> Result<&'a TreeBlock, InvariantViolation> {
    blocks
        .get(key)
        .ok_or_else(|| InvariantViolation(format!("unknown block key: {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> BlockMap {
        BlockMap::tree_from_blocks([
            TreeBlock::new("r", "root")
                .with_children(vec!["a".into(), "b".into()])
                .with_next_sibling("s"),
            TreeBlock::new("a", "alpha")
                .with_parent("r")
                .with_next_sibling("b")
                .with_children(vec!["a1".into()]),
            TreeBlock::new("a1", "alpha-child").with_parent("a"),
            TreeBlock::new("b", "beta")
                .with_parent("r")
                .with_prev_sibling("a"),
            TreeBlock::new("s", "second-root").with_prev_sibling("r"),
        ])
    }

    #[test]
    fn consistent_tree_passes() {
        assert_eq!(sample_tree().check_invariants(), Ok(()));
    }

    #[test]
    fn dangling_reference_is_caught() {
        let map = BlockMap::tree_from_blocks([
            TreeBlock::new("r", "root").with_next_sibling("missing")
        ]);
        let err = map.check_invariants().unwrap_err();
        assert!(err.0.contains("missing"));
    }

    #[test]
    fn sibling_chain_disagreeing_with_child_order_is_caught() {
        // children say [a, b] but the chain says b comes first
        let map = BlockMap::tree_from_blocks([
            TreeBlock::new("r", "root").with_children(vec!["a".into(), "b".into()]),
            TreeBlock::new("a", "alpha")
                .with_parent("r")
                .with_prev_sibling("b"),
            TreeBlock::new("b", "beta")
                .with_parent("r")
                .with_next_sibling("a"),
        ]);
        assert!(map.check_invariants().is_err());
    }

    #[test]
    fn order_that_is_not_preorder_is_caught() {
        // a1 placed after b instead of directly after its parent a
        let map = BlockMap::tree_from_blocks([
            TreeBlock::new("r", "root").with_children(vec!["a".into(), "b".into()]),
            TreeBlock::new("a", "alpha")
                .with_parent("r")
                .with_next_sibling("b")
                .with_children(vec!["a1".into()]),
            TreeBlock::new("b", "beta")
                .with_parent("r")
                .with_prev_sibling("a"),
            TreeBlock::new("a1", "alpha-child").with_parent("a"),
        ]);
        let err = map.check_invariants().unwrap_err();
        assert!(err.0.contains("pre-order"));
    }

    #[test]
    fn key_field_must_match_map_key() {
        let mut block = FlatBlock::new("x", "text");
        block.key = BlockKey::from("y");
        let map = BlockMap::Flat(IndexMap::from_iter([(BlockKey::from("x"), block)]));
        assert!(map.check_invariants().is_err());
    }

    #[test]
    fn order_lookups() {
        let map = sample_tree();
        assert_eq!(map.key_before(&"a1".into()), Some(&"a".into()));
        assert_eq!(map.key_after(&"a1".into()), Some(&"b".into()));
        assert_eq!(map.key_before(&"r".into()), None);
        assert_eq!(map.key_after(&"s".into()), None);
        assert_eq!(map.index_of(&"b".into()), Some(3));
    }

    #[test]
    fn block_ref_exposes_tree_links_only_for_trees() {
        let tree = sample_tree();
        let a = tree.get(&"a".into()).unwrap();
        assert_eq!(a.parent(), Some(&"r".into()));
        assert_eq!(a.children(), &[BlockKey::from("a1")]);

        let flat = BlockMap::flat_from_blocks([FlatBlock::new("x", "text")]);
        let x = flat.get(&"x".into()).unwrap();
        assert_eq!(x.parent(), None);
        assert!(x.children().is_empty());
    }
}
