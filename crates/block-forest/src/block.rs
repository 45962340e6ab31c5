//! Flat and tree content blocks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::keys::BlockKey;

/// Block of a flat document.
///
/// Carries no structural references; the owning map's iteration order is
/// the only structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatBlock {
    pub(crate) key: BlockKey,
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) data: Value,
}

impl FlatBlock {
    pub fn new(key: impl Into<BlockKey>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            data: Value::Null,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn key(&self) -> &BlockKey {
        &self.key
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}

/// Block of a tree document.
///
/// Besides its payload it carries redundant structural references: parent,
/// previous/next sibling at the same nesting level, and the ordered keys of
/// its immediate children. The link fields are crate-private so the
/// relocator and randomizer are the only writers and callers cannot
/// desynchronise them; use the builder-style constructors (or
/// [`crate::builder::build_tree_map`]) to assemble maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeBlock {
    pub(crate) key: BlockKey,
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) data: Value,
    pub(crate) parent: Option<BlockKey>,
    pub(crate) prev_sibling: Option<BlockKey>,
    pub(crate) next_sibling: Option<BlockKey>,
    pub(crate) children: Vec<BlockKey>,
}

impl TreeBlock {
    pub fn new(key: impl Into<BlockKey>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            data: Value::Null,
            parent: None,
            prev_sibling: None,
            next_sibling: None,
            children: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_parent(mut self, key: impl Into<BlockKey>) -> Self {
        self.parent = Some(key.into());
        self
    }

    pub fn with_prev_sibling(mut self, key: impl Into<BlockKey>) -> Self {
        self.prev_sibling = Some(key.into());
        self
    }

    pub fn with_next_sibling(mut self, key: impl Into<BlockKey>) -> Self {
        self.next_sibling = Some(key.into());
        self
    }

    pub fn with_children(mut self, keys: Vec<BlockKey>) -> Self {
        self.children = keys;
        self
    }

    pub fn key(&self) -> &BlockKey {
        &self.key
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn parent(&self) -> Option<&BlockKey> {
        self.parent.as_ref()
    }

    pub fn prev_sibling(&self) -> Option<&BlockKey> {
        self.prev_sibling.as_ref()
    }

    pub fn next_sibling(&self) -> Option<&BlockKey> {
        self.next_sibling.as_ref()
    }

    pub fn children(&self) -> &[BlockKey] {
        &self.children
    }
}
