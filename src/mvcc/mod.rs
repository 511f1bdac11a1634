//! # Multi-Version Concurrency Control (MVCC)
//!
//! This module implements snapshot-isolated transactions over an in-memory
//! row store. Readers never block: every row keeps its latest version in
//! the data pool and prior versions in an undo chain, and each transaction
//! decides per version whether it may see it using a read view captured
//! once at begin time.
//!
//! ## Version Chains
//!
//! ```text
//!   data pool                        undo pool
//! ┌─────────────────────┐         ┌──────────────────┐
//! │ row_id: 1           │         │ trx_id: 3        │
//! │ trx_id: 5 (newest)  │  roll   │ data: "v2"       │  roll   ┌───────────┐
//! │ data: "v3"          ├────────>│                  ├────────>│ trx_id: 1 │
//! │                     │   ptr   │                  │   ptr   │ data:"v1" │
//! └─────────────────────┘         └──────────────────┘         └───────────┘
//!                                  newest-first, reverse chronological
//! ```
//!
//! A select that cannot see the newest version walks the chain head-first
//! and emits the first version whose writer is visible; a row with no
//! visible version is simply skipped.
//!
//! ## Read Views
//!
//! At begin time a transaction records which transactions were still
//! uncommitted - including itself - as `active_ids`, bracketed by
//! `low_limit_id` (first active) and `up_limit_id` (last active). A writer
//! is then visible iff it is the reader itself, committed before the
//! window, or falls inside the window without being active at capture
//! time. Writers past the window began after the snapshot and are never
//! visible. The view is immutable after begin, so concurrent commits do
//! not leak into a running transaction.
//!
//! ## Pools
//!
//! Transactions, rows, and undo records live in three fixed pools of 1024
//! entries, allocated by linear scan for the first free slot (`status ==
//! Unused` for transactions, `row_id == 0` for records). Exhaustion is an
//! error, never a block. The transaction-ID and row-ID counters are atomic
//! fields of the context - the only synchronized state in the engine.
//!
//! ## Lifecycle
//!
//! ```text
//! allocate_trx() ──> begin() ──> Uncommitted ──> commit() ──> Committed
//!                                    │
//!                                    └──> rollback() ──> RolledBack
//! ```
//!
//! Rollback is a status flip only: version chains are not unwound. A
//! caller needing true rollback must pop undo heads for every record last
//! written by the rolled-back transaction; this engine does not.

mod context;
mod transaction;

pub use context::{Record, TrxContext, TrxStatus, POOL_SIZE};
pub use transaction::{ReadView, Trx, VisibleRow};
