//! # B+Tree Module
//!
//! The B+tree maps 64-bit integer keys to opaque variable-length payloads
//! inside the fixed 32-page image. Every node occupies exactly one
//! 512-byte page; the tree stores page numbers rather than pointers, so a
//! written image is directly loadable.
//!
//! ## Shape
//!
//! ```text
//!                  [Internal, page 1 (root, forever)]
//!                   /               \
//!        [Leaf, page 3]  ──next──>  [Leaf, page 2]  ──next──>  0
//! ```
//!
//! - Internal nodes route by **subtree maxima**: each slot's key is the
//!   largest key under its child, and search descends into the first slot
//!   whose key is >= the search key (falling back to the last slot).
//! - All payloads live in leaves; leaves are singly linked in ascending
//!   key order for range scans, and the tree tracks the leftmost leaf.
//! - The root never moves from page 1. Splitting the root materializes a
//!   fresh left sibling, copies the reduced root into it, and rebuilds
//!   page 1 as an internal node with exactly two routing entries.
//!
//! ## Module Organization
//!
//! - `node`: one-page view types ([`Node`], [`NodeMut`]) - the zerocopy
//!   header and slot structs plus the slotted-cell insert/update/delete
//!   mechanics
//! - `tree`: [`BPlusTree`] - search, insert with split propagation, range
//!   scan, persistence, and the diagnostic tree dump

mod node;
mod tree;

pub use node::{Node, NodeMut, NodeType, Slot, MAX_ORDER, OFFSET_PAYLOAD};
pub use tree::BPlusTree;
