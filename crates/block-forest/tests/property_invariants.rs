//! Property tests: the structural invariants survive arbitrary valid
//! moves, and randomization preserves topology while replacing every key.

use block_forest::builder::{build_tree_map, Node};
use block_forest::{
    move_block_in_content_state, randomize_block_map_keys, BlockKey, BlockMap, ContentState,
    Placement, RandomKeyGenerator, SequentialKeyGenerator,
};
use proptest::prelude::*;

fn node_strategy() -> impl Strategy<Value = Node> {
    let leaf = "[a-v]{1,4}".prop_map(Node::leaf);
    leaf.prop_recursive(3, 16, 4, |inner| {
        ("[a-v]{1,4}", prop::collection::vec(inner, 0..4))
            .prop_map(|(text, children)| Node::branch(text, children))
    })
}

fn forest_strategy() -> impl Strategy<Value = Vec<Node>> {
    prop::collection::vec(node_strategy(), 1..4)
}

/// Canonical shape of a map, ignoring keys: for every block in document
/// order, its text and the document-order position of its parent.
fn shape(map: &BlockMap) -> Vec<(String, Option<usize>)> {
    map.iter()
        .map(|block| {
            let parent = block.parent().and_then(|key| map.index_of(key));
            (block.text().to_owned(), parent)
        })
        .collect()
}

fn sorted_keys(map: &BlockMap) -> Vec<BlockKey> {
    let mut keys: Vec<BlockKey> = map.keys().cloned().collect();
    keys.sort();
    keys
}

const MOVE_REJECTIONS: [&str; 2] = [
    "Block cannot be moved next to itself.",
    "Block cannot be moved into its own subtree.",
];

proptest! {
    #[test]
    fn flat_moves_preserve_invariants(
        len in 2usize..12,
        src in any::<prop::sample::Index>(),
        dst in any::<prop::sample::Index>(),
        after in any::<bool>(),
    ) {
        let mut keygen = SequentialKeyGenerator::new("b");
        let texts: Vec<String> = (0..len).map(|i| format!("text-{i}")).collect();
        let map = BlockMap::flat_from_texts(texts, &mut keygen);
        let keys: Vec<BlockKey> = map.keys().cloned().collect();
        let block_key = keys[src.index(len)].clone();
        let target_key = keys[dst.index(len)].clone();
        prop_assume!(block_key != target_key);

        let content = ContentState::new(map);
        let placement = if after { Placement::After } else { Placement::Before };
        match move_block_in_content_state(&content, &block_key, &target_key, placement) {
            Ok(moved) => {
                prop_assert!(moved.block_map().check_invariants().is_ok());
                prop_assert_eq!(sorted_keys(content.block_map()), sorted_keys(moved.block_map()));
                // the moved block sits on the requested side of the target
                let neighbor = if after {
                    moved.block_map().key_after(&target_key)
                } else {
                    moved.block_map().key_before(&target_key)
                };
                prop_assert_eq!(neighbor, Some(&block_key));
            }
            Err(err) => prop_assert!(MOVE_REJECTIONS.contains(&err.0.as_str())),
        }
    }

    #[test]
    fn tree_moves_preserve_invariants(
        forest in forest_strategy(),
        src in any::<prop::sample::Index>(),
        dst in any::<prop::sample::Index>(),
        after in any::<bool>(),
    ) {
        let mut keygen = SequentialKeyGenerator::new("b");
        let map = build_tree_map(&forest, &mut keygen);
        prop_assert!(map.check_invariants().is_ok());
        let keys: Vec<BlockKey> = map.keys().cloned().collect();
        let block_key = keys[src.index(keys.len())].clone();
        let target_key = keys[dst.index(keys.len())].clone();
        prop_assume!(block_key != target_key);

        let content = ContentState::new(map);
        let placement = if after { Placement::After } else { Placement::Before };
        match move_block_in_content_state(&content, &block_key, &target_key, placement) {
            Ok(moved) => {
                prop_assert!(
                    moved.block_map().check_invariants().is_ok(),
                    "invariants broken after moving {} {} {}: {:?}",
                    block_key,
                    if after { "after" } else { "before" },
                    target_key,
                    moved.block_map().check_invariants()
                );
                prop_assert_eq!(sorted_keys(content.block_map()), sorted_keys(moved.block_map()));
            }
            Err(err) => prop_assert!(MOVE_REJECTIONS.contains(&err.0.as_str())),
        }
    }

    #[test]
    fn subtrees_move_as_one_contiguous_unit(
        forest in forest_strategy(),
        src in any::<prop::sample::Index>(),
        dst in any::<prop::sample::Index>(),
        after in any::<bool>(),
    ) {
        let mut keygen = SequentialKeyGenerator::new("b");
        let map = build_tree_map(&forest, &mut keygen);
        let keys: Vec<BlockKey> = map.keys().cloned().collect();
        let block_key = keys[src.index(keys.len())].clone();
        let target_key = keys[dst.index(keys.len())].clone();
        prop_assume!(block_key != target_key);

        // descendants of the moved block, in document order
        let descendants: Vec<BlockKey> = map
            .iter()
            .filter(|block| {
                let mut cursor = block.parent();
                while let Some(key) = cursor {
                    if key == &block_key {
                        return true;
                    }
                    cursor = map.get(key).and_then(|b| b.parent());
                }
                false
            })
            .map(|block| block.key().clone())
            .collect();

        let content = ContentState::new(map);
        let placement = if after { Placement::After } else { Placement::Before };
        if let Ok(moved) = move_block_in_content_state(&content, &block_key, &target_key, placement)
        {
            let order: Vec<BlockKey> = moved.block_map().keys().cloned().collect();
            let start = order.iter().position(|key| key == &block_key);
            prop_assert!(start.is_some());
            let start = start.unwrap_or_default();
            prop_assert!(start + 1 + descendants.len() <= order.len());
            let unit = &order[start..start + 1 + descendants.len()];
            prop_assert_eq!(&unit[1..], descendants.as_slice());
        }
    }

    #[test]
    fn randomization_replaces_every_key_and_keeps_topology(
        forest in forest_strategy(),
        seed in any::<[u8; 32]>(),
    ) {
        let mut keygen = SequentialKeyGenerator::new("key");
        let map = build_tree_map(&forest, &mut keygen);
        let mut random_keys = RandomKeyGenerator::from_seed(seed);
        let fresh = randomize_block_map_keys(&map, &mut random_keys);

        prop_assert!(fresh.check_invariants().is_ok());
        prop_assert_eq!(fresh.len(), map.len());
        // generated keys never use the letter 'y', so the sequential
        // "key0", "key1", … inputs cannot collide with them
        for key in fresh.keys() {
            prop_assert!(!map.contains_key(key));
        }
        prop_assert_eq!(shape(&fresh), shape(&map));
    }

    #[test]
    fn flat_randomization_keeps_order_and_texts(
        len in 1usize..16,
        seed in any::<[u8; 32]>(),
    ) {
        let mut keygen = SequentialKeyGenerator::new("key");
        let texts: Vec<String> = (0..len).map(|i| format!("text-{i}")).collect();
        let map = BlockMap::flat_from_texts(texts.clone(), &mut keygen);
        let mut random_keys = RandomKeyGenerator::from_seed(seed);
        let fresh = randomize_block_map_keys(&map, &mut random_keys);

        prop_assert!(fresh.check_invariants().is_ok());
        let fresh_texts: Vec<String> =
            fresh.iter().map(|block| block.text().to_owned()).collect();
        prop_assert_eq!(fresh_texts, texts);
        for key in fresh.keys() {
            prop_assert!(!map.contains_key(key));
        }
    }
}
