//! Delimiter lookup.
//!
//! A delimiter is the next parentless block in document order: the boundary
//! of a top-level group. It bounds a moved subtree when the moved block has
//! no next sibling.

use indexmap::IndexMap;

use crate::block::TreeBlock;
use crate::block_map::BlockMap;
use crate::keys::BlockKey;

/// Index of the first parentless block strictly after position `after`.
pub(crate) fn next_delimiter_index(
    blocks: &IndexMap<BlockKey, TreeBlock>,
    after: usize,
) -> Option<usize> {
    blocks
        .iter()
        .enumerate()
        .skip(after + 1)
        .find(|(_, (_, block))| block.parent().is_none())
        .map(|(index, _)| index)
}

/// Key of the next parentless block in document order after `key`, or
/// `None` when no such block exists. Always `None` for flat maps, which
/// have no parents at all.
pub fn next_delimiter_block_key<'a>(map: &'a BlockMap, key: &BlockKey) -> Option<&'a BlockKey> {
    match map {
        BlockMap::Flat(_) => None,
        BlockMap::Tree(blocks) => {
            let start = blocks.get_index_of(key)?;
            let index = next_delimiter_index(blocks, start)?;
            blocks.get_index(index).map(|(k, _)| k)
        }
    }
}
