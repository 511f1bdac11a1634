//! Transaction context: the three fixed pools and their allocators.

use std::sync::atomic::AtomicI64;

use eyre::{bail, Result};
use smallvec::SmallVec;

use super::transaction::{ReadView, Trx};

/// Capacity of the transaction, data, and undo pools.
pub const POOL_SIZE: usize = 1024;

/// Transaction lifecycle states. `Unused` marks a free pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrxStatus {
    #[default]
    Unused,
    Uncommitted,
    Committed,
    RolledBack,
}

/// One transaction pool slot.
#[derive(Debug, Default)]
pub(crate) struct TrxSlot {
    pub(crate) trx_id: i64,
    pub(crate) status: TrxStatus,
    pub(crate) view: Option<ReadView>,
}

/// A row version. The data pool holds the newest version of each row; the
/// undo pool holds prior versions. `row_id == 0` marks a free slot in
/// either pool, and `roll_ptr` indexes the undo pool to form the
/// newest-first version chain.
#[derive(Debug, Clone, Default)]
pub struct Record {
    pub row_id: i64,
    pub trx_id: i64,
    pub roll_ptr: Option<usize>,
    pub data: Vec<u8>,
}

/// The MVCC engine state: three fixed pools plus the two monotonic
/// counters. Single-process, cooperatively concurrent; only the counters
/// are synchronized.
pub struct TrxContext {
    pub(crate) trx_pool: Vec<TrxSlot>,
    pub(crate) data_pool: Vec<Record>,
    pub(crate) undo_pool: Vec<Record>,
    pub(crate) trx_counter: AtomicI64,
    pub(crate) row_counter: AtomicI64,
}

impl TrxContext {
    pub fn new() -> Self {
        let mut trx_pool = Vec::with_capacity(POOL_SIZE);
        trx_pool.resize_with(POOL_SIZE, TrxSlot::default);
        let mut data_pool = Vec::with_capacity(POOL_SIZE);
        data_pool.resize_with(POOL_SIZE, Record::default);
        let mut undo_pool = Vec::with_capacity(POOL_SIZE);
        undo_pool.resize_with(POOL_SIZE, Record::default);

        Self {
            trx_pool,
            data_pool,
            undo_pool,
            trx_counter: AtomicI64::new(0),
            row_counter: AtomicI64::new(0),
        }
    }

    /// Hand out the first unused transaction slot, or `None` when the
    /// pool is full. The slot is not reserved until `begin`.
    pub fn allocate_trx(&self) -> Option<Trx> {
        self.trx_pool
            .iter()
            .position(|slot| slot.status == TrxStatus::Unused)
            .map(Trx::new)
    }

    /// First free data-pool slot.
    pub(crate) fn alloc_record(&mut self) -> Result<usize> {
        match self.data_pool.iter().position(|r| r.row_id == 0) {
            Some(index) => Ok(index),
            None => bail!("data pool exhausted ({} slots)", POOL_SIZE),
        }
    }

    /// First free undo-pool slot.
    pub(crate) fn alloc_undo(&mut self) -> Result<usize> {
        match self.undo_pool.iter().position(|r| r.row_id == 0) {
            Some(index) => Ok(index),
            None => bail!("undo pool exhausted ({} slots)", POOL_SIZE),
        }
    }

    pub(crate) fn find_record(&self, row_id: i64) -> Option<usize> {
        self.data_pool.iter().position(|r| r.row_id == row_id)
    }

    /// Snapshot the set of currently uncommitted transactions, in
    /// encounter order. Limits are the first and last active IDs (0 when
    /// none are active).
    pub(crate) fn create_read_view(&self) -> ReadView {
        let mut active_ids: SmallVec<[i64; 16]> = SmallVec::new();
        for slot in &self.trx_pool {
            if slot.status == TrxStatus::Uncommitted {
                active_ids.push(slot.trx_id);
            }
        }
        ReadView::new(active_ids)
    }
}

impl Default for TrxContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_has_empty_pools() {
        let ctx = TrxContext::new();
        assert_eq!(ctx.trx_pool.len(), POOL_SIZE);
        assert_eq!(ctx.data_pool.len(), POOL_SIZE);
        assert_eq!(ctx.undo_pool.len(), POOL_SIZE);
        assert!(ctx.trx_pool.iter().all(|s| s.status == TrxStatus::Unused));
        assert!(ctx.data_pool.iter().all(|r| r.row_id == 0));
    }

    #[test]
    fn allocate_trx_returns_first_unused_slot() {
        let mut ctx = TrxContext::new();
        let trx = ctx.allocate_trx().unwrap();
        assert_eq!(trx.slot_index(), 0);

        // an occupied slot is skipped
        ctx.trx_pool[0].status = TrxStatus::Uncommitted;
        let trx = ctx.allocate_trx().unwrap();
        assert_eq!(trx.slot_index(), 1);
    }

    #[test]
    fn allocate_trx_exhaustion_returns_none() {
        let mut ctx = TrxContext::new();
        for slot in &mut ctx.trx_pool {
            slot.status = TrxStatus::Committed;
        }
        assert!(ctx.allocate_trx().is_none());
    }

    #[test]
    fn alloc_record_exhaustion_is_error() {
        let mut ctx = TrxContext::new();
        for record in &mut ctx.data_pool {
            record.row_id = 1;
        }
        let result = ctx.alloc_record();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exhausted"));
    }

    #[test]
    fn read_view_captures_uncommitted_in_encounter_order() {
        let mut ctx = TrxContext::new();
        ctx.trx_pool[0].trx_id = 4;
        ctx.trx_pool[0].status = TrxStatus::Committed;
        ctx.trx_pool[1].trx_id = 5;
        ctx.trx_pool[1].status = TrxStatus::Uncommitted;
        ctx.trx_pool[2].trx_id = 7;
        ctx.trx_pool[2].status = TrxStatus::Uncommitted;

        let view = ctx.create_read_view();
        assert_eq!(view.low_limit_id(), 5);
        assert_eq!(view.up_limit_id(), 7);
        assert_eq!(view.active_ids(), &[5, 7]);
    }

    #[test]
    fn read_view_with_no_active_transactions_has_zero_limits() {
        let ctx = TrxContext::new();
        let view = ctx.create_read_view();
        assert_eq!(view.low_limit_id(), 0);
        assert_eq!(view.up_limit_id(), 0);
        assert!(view.active_ids().is_empty());
    }
}
