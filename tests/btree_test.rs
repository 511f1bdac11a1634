//! # B+Tree Integration Tests
//!
//! End-to-end scenarios over the public tree API: the reference insert
//! workload, split boundaries, the root-page invariant, range scans over
//! the leaf chain, and write/load equivalence.

use tempfile::tempdir;
use twigdb::BPlusTree;

const SCENARIO: [(u64, &[u8]); 11] = [
    (5, b"val-5"),
    (2, b"val-222"),
    (15, b"val-1555"),
    (4, b"val-44444"),
    (7, b"val-7"),
    (9, b"val-9"),
    (19, b"val-19"),
    (11, b"val-11"),
    (1, b"val-1"),
    (32, b"val-32"),
    (21, b"val-21"),
];

fn scenario_tree() -> BPlusTree {
    let mut tree = BPlusTree::create(5).unwrap();
    for (key, payload) in SCENARIO {
        tree.insert(key, payload).unwrap();
    }
    tree
}

#[test]
fn get_returns_last_inserted_payload_per_key() {
    let tree = scenario_tree();
    assert_eq!(tree.get(15).unwrap().as_deref(), Some(&b"val-1555"[..]));
    for (key, payload) in SCENARIO {
        assert_eq!(tree.get(key).unwrap().as_deref(), Some(payload));
    }
    assert_eq!(tree.get(1000).unwrap(), None);
}

#[test]
fn range_search_emits_ascending_window() {
    let tree = scenario_tree();
    let keys: Vec<u64> = tree
        .range_search(4, 15)
        .unwrap()
        .into_iter()
        .map(|(key, _)| key)
        .collect();
    assert_eq!(keys, vec![4, 5, 7, 9, 11, 15]);
}

#[test]
fn full_range_scan_is_sorted_and_complete() {
    let tree = scenario_tree();
    let keys: Vec<u64> = tree
        .range_search(0, u64::MAX)
        .unwrap()
        .into_iter()
        .map(|(key, _)| key)
        .collect();
    assert_eq!(keys, vec![1, 2, 4, 5, 7, 9, 11, 15, 19, 21, 32]);
}

#[test]
fn eleven_inserts_split_the_root() {
    let tree = scenario_tree();
    // the root stays at page 1 and became internal; its dump says so
    let dump = tree.dump().unwrap();
    assert!(dump.contains("internal [1:P0:"));
}

#[test]
fn random_workload_round_trips() {
    let mut tree = BPlusTree::create(5).unwrap();
    // fixed pseudo-random insertion order, unique keys
    let keys: Vec<u64> = (1..=40).map(|i| i * 13 % 41).collect();
    for &key in &keys {
        tree.insert(key, format!("payload-{key}").as_bytes()).unwrap();
    }
    for &key in &keys {
        assert_eq!(
            tree.get(key).unwrap().as_deref(),
            Some(format!("payload-{key}").as_bytes()),
            "key {key} lost"
        );
    }
}

#[test]
fn write_then_load_preserves_gets_and_ranges() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("twig.db");

    let mut tree = scenario_tree();
    tree.write(&path).unwrap();

    let loaded = BPlusTree::load(&path).unwrap();
    assert_eq!(loaded.order(), 5);
    for (key, payload) in SCENARIO {
        assert_eq!(loaded.get(key).unwrap().as_deref(), Some(payload));
    }
    assert_eq!(
        loaded.range_search(4, 15).unwrap(),
        tree.range_search(4, 15).unwrap()
    );
    assert_eq!(loaded.leftmost_leaf(), tree.leftmost_leaf());
}

#[test]
fn written_image_has_big_endian_header() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("twig.db");

    let mut tree = scenario_tree();
    tree.write(&path).unwrap();

    let image = std::fs::read(&path).unwrap();
    assert_eq!(image.len(), 512 * 32);
    // page 0: order at offset 0, leftmost leaf at offset 4
    assert_eq!(&image[0..4], &[0, 0, 0, 5]);
    assert_eq!(
        u32::from_be_bytes(image[4..8].try_into().unwrap()),
        tree.leftmost_leaf()
    );
}

#[test]
fn load_honors_the_path_argument() {
    let dir = tempdir().unwrap();
    let path_a = dir.path().join("a.db");
    let path_b = dir.path().join("b.db");

    let mut tree_a = BPlusTree::create(5).unwrap();
    tree_a.insert(1, b"from-a").unwrap();
    tree_a.write(&path_a).unwrap();

    let mut tree_b = BPlusTree::create(5).unwrap();
    tree_b.insert(1, b"from-b").unwrap();
    tree_b.write(&path_b).unwrap();

    let loaded = BPlusTree::load(&path_b).unwrap();
    assert_eq!(loaded.get(1).unwrap().as_deref(), Some(&b"from-b"[..]));
}
