//! Transaction operations and the visibility predicate.
//!
//! [`Trx`] is a copyable handle onto a transaction pool slot; every
//! operation takes the [`TrxContext`] explicitly. The handle becomes live
//! at `begin`, which assigns its ID and captures the read view that all
//! of its selects will use.

use std::sync::atomic::Ordering;

use eyre::{ensure, eyre, Result};
use smallvec::SmallVec;
use tracing::debug;

use super::context::{TrxContext, TrxStatus};

/// A transaction's snapshot of the world at begin time: which transaction
/// IDs were still uncommitted, bracketed by the first and last of them.
/// Captured exactly once and never mutated.
#[derive(Debug, Clone)]
pub struct ReadView {
    low_limit_id: i64,
    up_limit_id: i64,
    active_ids: SmallVec<[i64; 16]>,
}

impl ReadView {
    pub(crate) fn new(active_ids: SmallVec<[i64; 16]>) -> Self {
        Self {
            low_limit_id: active_ids.first().copied().unwrap_or(0),
            up_limit_id: active_ids.last().copied().unwrap_or(0),
            active_ids,
        }
    }

    pub fn low_limit_id(&self) -> i64 {
        self.low_limit_id
    }

    pub fn up_limit_id(&self) -> i64 {
        self.up_limit_id
    }

    pub fn active_ids(&self) -> &[i64] {
        &self.active_ids
    }

    fn contains(&self, trx_id: i64) -> bool {
        self.active_ids.contains(&trx_id)
    }

    /// Snapshot-isolation visibility: may `reader` see a version written
    /// by `writer`?
    pub fn is_visible(&self, reader: i64, writer: i64) -> bool {
        if writer == reader {
            return true;
        }
        if writer < self.low_limit_id {
            return true;
        }
        if writer > self.up_limit_id {
            return false;
        }
        !self.contains(writer)
    }
}

/// One row visible to a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleRow {
    pub row_id: i64,
    pub data: Vec<u8>,
}

/// Handle onto a transaction pool slot.
#[derive(Debug, Clone, Copy)]
pub struct Trx {
    slot: usize,
}

impl Trx {
    pub(crate) fn new(slot: usize) -> Self {
        Self { slot }
    }

    /// Index of the backing pool slot.
    pub fn slot_index(&self) -> usize {
        self.slot
    }

    /// The transaction ID assigned at begin (0 before).
    pub fn id(&self, ctx: &TrxContext) -> i64 {
        ctx.trx_pool[self.slot].trx_id
    }

    pub fn status(&self, ctx: &TrxContext) -> TrxStatus {
        ctx.trx_pool[self.slot].status
    }

    /// Assign the next transaction ID, mark the slot uncommitted, and
    /// capture the read view. The view sees this transaction as active.
    pub fn begin(&self, ctx: &mut TrxContext) {
        let trx_id = ctx.trx_counter.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let slot = &mut ctx.trx_pool[self.slot];
            slot.trx_id = trx_id;
            slot.status = TrxStatus::Uncommitted;
        }
        let view = ctx.create_read_view();
        ctx.trx_pool[self.slot].view = Some(view);
        debug!(trx_id, "begin transaction");
    }

    fn ensure_active(&self, ctx: &TrxContext) -> Result<i64> {
        let slot = &ctx.trx_pool[self.slot];
        ensure!(
            slot.status == TrxStatus::Uncommitted,
            "transaction {} is not active",
            slot.trx_id
        );
        Ok(slot.trx_id)
    }

    /// Insert a new row; returns its row ID.
    pub fn insert(&self, ctx: &mut TrxContext, data: &str) -> Result<i64> {
        let trx_id = self.ensure_active(ctx)?;
        let index = ctx.alloc_record()?;
        let row_id = ctx.row_counter.fetch_add(1, Ordering::SeqCst) + 1;

        let record = &mut ctx.data_pool[index];
        record.row_id = row_id;
        record.trx_id = trx_id;
        record.roll_ptr = None;
        record.data = data.as_bytes().to_vec();
        Ok(row_id)
    }

    /// Overwrite a row, pushing its current version onto the head of the
    /// undo chain.
    pub fn update(&self, ctx: &mut TrxContext, row_id: i64, data: &str) -> Result<()> {
        let trx_id = self.ensure_active(ctx)?;
        let record_index = ctx
            .find_record(row_id)
            .ok_or_else(|| eyre!("row {} not found", row_id))?;
        let undo_index = ctx.alloc_undo()?;

        let (old_trx_id, old_data, old_roll_ptr) = {
            let record = &ctx.data_pool[record_index];
            (record.trx_id, record.data.clone(), record.roll_ptr)
        };
        let undo = &mut ctx.undo_pool[undo_index];
        undo.row_id = row_id;
        undo.trx_id = old_trx_id;
        undo.data = old_data;
        undo.roll_ptr = old_roll_ptr;

        let record = &mut ctx.data_pool[record_index];
        record.roll_ptr = Some(undo_index);
        record.trx_id = trx_id;
        record.data = data.as_bytes().to_vec();
        Ok(())
    }

    /// Emit every row with a version visible to this transaction: the
    /// newest version when its writer is visible, otherwise the first
    /// visible entry of the undo chain, otherwise nothing for that row.
    pub fn select(&self, ctx: &TrxContext) -> Result<Vec<VisibleRow>> {
        let slot = &ctx.trx_pool[self.slot];
        let view = slot
            .view
            .as_ref()
            .ok_or_else(|| eyre!("select before begin"))?;
        let reader = slot.trx_id;

        let mut rows = Vec::new();
        for record in &ctx.data_pool {
            if record.row_id == 0 {
                continue;
            }
            if view.is_visible(reader, record.trx_id) {
                rows.push(VisibleRow {
                    row_id: record.row_id,
                    data: record.data.clone(),
                });
                continue;
            }
            let mut next = record.roll_ptr;
            while let Some(index) = next {
                let undo = &ctx.undo_pool[index];
                if view.is_visible(reader, undo.trx_id) {
                    rows.push(VisibleRow {
                        row_id: record.row_id,
                        data: undo.data.clone(),
                    });
                    break;
                }
                next = undo.roll_ptr;
            }
        }
        Ok(rows)
    }

    /// Mark the transaction committed. A status flip only.
    pub fn commit(&self, ctx: &mut TrxContext) {
        let slot = &mut ctx.trx_pool[self.slot];
        slot.status = TrxStatus::Committed;
        debug!(trx_id = slot.trx_id, "commit transaction");
    }

    /// Mark the transaction rolled back. Version chains are not unwound.
    pub fn rollback(&self, ctx: &mut TrxContext) {
        let slot = &mut ctx.trx_pool[self.slot];
        slot.status = TrxStatus::RolledBack;
        debug!(trx_id = slot.trx_id, "rollback transaction");
    }
}
