//! # TwigDB - Teaching-Scale Embedded Storage Engine
//!
//! TwigDB is a deliberately small storage engine that demonstrates the two
//! hardest ideas inside a SQL-like database at a scale that fits in your
//! head:
//!
//! - A **disk-format B+tree** mapping 64-bit keys to opaque payloads inside
//!   a fixed 16KB image of 512-byte pages, with slotted cells and full
//!   split propagation up to the root.
//! - An **MVCC transaction engine** providing snapshot isolation over an
//!   in-memory row store, with read views captured at begin time and undo
//!   chains for version travel.
//!
//! ## Quick Start
//!
//! ```ignore
//! use twigdb::BPlusTree;
//!
//! let mut tree = BPlusTree::create(5)?;
//! tree.insert(15, b"val-1555")?;
//! assert_eq!(tree.get(15)?.as_deref(), Some(&b"val-1555"[..]));
//! tree.write("twig.db")?;
//! ```
//!
//! ## Architecture
//!
//! The two cores share only the crate boundary:
//!
//! ```text
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │   B+Tree (btree::tree)   │   │  Transactions (mvcc)     │
//! ├──────────────────────────┤   ├──────────────────────────┤
//! │ Slotted nodes            │   │ Read views + visibility  │
//! │ (btree::node)            │   │ Undo version chains      │
//! ├──────────────────────────┤   ├──────────────────────────┤
//! │ Paged image (storage)    │   │ Fixed slot pools         │
//! └──────────────────────────┘   └──────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! The on-disk format is a flat 16384-byte image: 32 pages of 512 bytes.
//! Page 0 carries the file header (tree order and leftmost-leaf pointer),
//! page 1 is the root forever, pages 2..31 are allocatable. All integers
//! are big-endian.
//!
//! ## Module Overview
//!
//! - [`storage`]: fixed-size paged byte image, page allocator, file header
//! - [`btree`]: slotted-cell node layer and the B+tree algorithms
//! - [`mvcc`]: transaction pools, read views, undo chains
//!
//! ## What TwigDB Is Not
//!
//! There is no WAL, no crash recovery, no overflow pages, no key deletion,
//! and no concurrent tree access. Rollback of a transaction flips its
//! status without unwinding version chains. These are teaching-scale
//! boundaries, not oversights.

pub mod btree;
pub mod mvcc;
pub mod storage;

pub use btree::BPlusTree;
pub use mvcc::{Trx, TrxContext, VisibleRow};
