//! Tree-map construction.
//!
//! A tree block carries four redundant link fields, so assembling a
//! consistent map by hand is error-prone. [`Node`] describes only the
//! shape — text plus children — and [`build_tree_map`] derives keys,
//! parent/sibling/child links, and pre-order placement.

use indexmap::IndexMap;

use crate::block::TreeBlock;
use crate::block_map::BlockMap;
use crate::keys::{BlockKey, KeyGenerator};

/// Shape of one block: its text and its children, in order.
#[derive(Debug, Clone)]
pub struct Node {
    text: String,
    children: Vec<Node>,
}

impl Node {
    pub fn leaf(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn branch(text: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            text: text.into(),
            children,
        }
    }
}

/// Builds a tree [`BlockMap`] from root shapes. Keys are drawn from
/// `keygen` in document order; every structural link is derived.
pub fn build_tree_map(roots: &[Node], keygen: &mut dyn KeyGenerator) -> BlockMap {
    let mut blocks = IndexMap::new();
    build_level(roots, None, keygen, &mut blocks);
    BlockMap::Tree(blocks)
}

fn build_level(
    nodes: &[Node],
    parent: Option<&BlockKey>,
    keygen: &mut dyn KeyGenerator,
    out: &mut IndexMap<BlockKey, TreeBlock>,
) -> Vec<BlockKey> {
    let mut keys = Vec::with_capacity(nodes.len());
    for node in nodes {
        let key = keygen.generate_key();
        keys.push(key.clone());
        let mut block = TreeBlock::new(key.clone(), node.text.clone());
        block.parent = parent.cloned();
        out.insert(key.clone(), block);
        let child_keys = build_level(&node.children, Some(&key), keygen, out);
        if let Some(block) = out.get_mut(&key) {
            block.children = child_keys;
        }
    }
    for (index, key) in keys.iter().enumerate() {
        if let Some(block) = out.get_mut(key) {
            block.prev_sibling = index.checked_sub(1).map(|i| keys[i].clone());
            block.next_sibling = keys.get(index + 1).cloned();
        }
    }
    keys
}
