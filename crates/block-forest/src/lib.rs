//! block-forest — ordered block map model for tree-structured rich-text
//! documents.
//!
//! A document is an ordered mapping from [`BlockKey`] to block. Flat maps
//! have no structure beyond their order; tree maps store a pre-order
//! flattened forest whose blocks carry redundant parent/sibling/child
//! references that must stay mutually consistent. Two operations preserve
//! that structure:
//!
//! - [`move_block_in_content_state`] relocates a block (and, in tree maps,
//!   its whole subtree) before or after a target block and repairs every
//!   disturbed reference.
//! - [`randomize_block_map_keys`] re-keys every block with fresh keys while
//!   keeping the structure isomorphic; references pointing outside the map
//!   (document fragments) are cleared rather than rejected.
//!
//! Both are pure functions over immutable input: they stage their edits on
//! an exclusively-owned working map and return a new value, so concurrent
//! calls on distinct inputs need no locking.

pub mod block;
pub mod block_map;
pub mod builder;
pub mod content_state;
pub mod delimiter;
pub mod keys;
pub mod move_block;
pub mod randomize_keys;

pub use block::{FlatBlock, TreeBlock};
pub use block_map::{BlockMap, BlockRef, InvariantViolation};
pub use content_state::{ContentState, SelectionState};
pub use delimiter::next_delimiter_block_key;
pub use keys::{BlockKey, KeyGenerator, RandomKeyGenerator, SequentialKeyGenerator};
pub use move_block::{move_block_in_content_state, Placement};
pub use randomize_keys::randomize_block_map_keys;

/// Returns the crate version at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
