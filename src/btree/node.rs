//! # Node Layer: One-Page Slotted Cells
//!
//! Every tree node is one self-contained 512-byte page. A fixed header and
//! a slot array grow downward from the top of the page; variable-length
//! cell bodies grow upward from the bottom (from `OFFSET_PAYLOAD` toward
//! the slot array). `usable_ptr` names the lowest occupied cell byte, so
//! free space is exactly the gap between the slot array and `usable_ptr`.
//!
//! ## Page Layout
//!
//! ```text
//! Offset  Size      Field
//! ------  --------  -------------------------------------------
//! 0       4         page_no (self-identifying)
//! 4       1         node_type (0x01 internal, 0x02 leaf)
//! 5       1         used (0x00 free, 0x01 allocated)
//! 6       2         reserved
//! 8       4         parent page number (0 = root)
//! 12      4         usable_ptr (lowest used cell byte)
//! 16      16        reserved
//! 32      4         number_of_keys
//! 36      12/slot   slot array {key: u64, cell_ptr: u32}
//! ...               free space
//! ...     varies    cell bodies, growing down from offset 504
//! 504     4         next leaf page number (leaves)
//! 508     4         overflow page (reserved, unused)
//! ```
//!
//! All integers are big-endian; the header and slots are zerocopy structs
//! over `big_endian::{U32, U64}` with compile-time size and offset guards.
//!
//! ## Cell Formats
//!
//! ```text
//! internal cell: [child_page: u32]                          (4 bytes)
//! leaf cell:     [child_page: u32][payload_len: u32][payload] (8 + n)
//! ```
//!
//! A leaf cell stores `child_page` for layout uniformity but never
//! interprets it (it is written as 0). Cell length is derived from the
//! node type, never stored in the slot.
//!
//! ## Cell Mutation Mechanics
//!
//! Inserting into an empty slot reserves bytes below `usable_ptr`.
//! Updating an occupied slot keeps the cell's *end* anchored: the byte
//! range `[usable_ptr, cell_ptr)` is shifted by `old_len - new_len`, every
//! slot pointing into that range is adjusted by the same delta, and
//! `usable_ptr` plus the slot's own pointer move with it. Deleting a cell
//! is the same shift with the cell's full length, after which the slot
//! pointer is zeroed. The slot array itself is never compacted here; slot
//! index bookkeeping is the tree layer's job.

use eyre::{bail, ensure, Result};
use zerocopy::big_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::storage::{OFFSET_USED, PAGE_SIZE, PAGE_USED};

/// Size of the fixed node header preceding the slot array.
pub const NODE_HEADER_SIZE: usize = 36;

/// Size of one slot entry.
pub const SLOT_SIZE: usize = 12;

/// Byte offset of the first slot.
pub const OFFSET_SLOTS: usize = NODE_HEADER_SIZE;

/// Cells grow downward from this offset; also where `next` lives.
pub const OFFSET_PAYLOAD: usize = PAGE_SIZE - 8;

/// Byte offset of the next-leaf pointer.
pub const OFFSET_NEXT: usize = PAGE_SIZE - 8;

/// Fixed prefix of a leaf cell: child page + payload length.
pub const LEAF_CELL_PREFIX: usize = 8;

/// Size of an internal (routing-only) cell.
pub const CHILD_CELL_SIZE: usize = 4;

/// Largest order for which the slot array still fits below the cell area.
pub const MAX_ORDER: usize = (OFFSET_PAYLOAD - OFFSET_SLOTS) / SLOT_SIZE;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Internal = 0x01,
    Leaf = 0x02,
}

impl NodeType {
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0x01 => Ok(NodeType::Internal),
            0x02 => Ok(NodeType::Leaf),
            _ => bail!("invalid node type byte: {:#04x}", b),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct NodeHeader {
    page_no: U32,
    node_type: u8,
    used: u8,
    reserved0: [u8; 2],
    parent: U32,
    usable_ptr: U32,
    reserved1: [u8; 16],
    number_of_keys: U32,
}

const _: () = assert!(std::mem::size_of::<NodeHeader>() == NODE_HEADER_SIZE);
const _: () = assert!(std::mem::offset_of!(NodeHeader, used) == OFFSET_USED);
const _: () = assert!(std::mem::offset_of!(NodeHeader, parent) == 8);
const _: () = assert!(std::mem::offset_of!(NodeHeader, usable_ptr) == 12);
const _: () = assert!(std::mem::offset_of!(NodeHeader, number_of_keys) == 32);

/// One slot array entry: a key and the in-page offset of its cell body
/// (0 when the slot holds no cell).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct Slot {
    key: U64,
    cell_ptr: U32,
}

const _: () = assert!(std::mem::size_of::<Slot>() == SLOT_SIZE);

impl Slot {
    pub fn key(&self) -> u64 {
        self.key.get()
    }

    pub fn cell_ptr(&self) -> u32 {
        self.cell_ptr.get()
    }
}

/// Encode a cell body: routing-only when `payload` is absent, otherwise
/// the 8-byte leaf prefix followed by the payload.
pub(crate) fn marshal_cell(child: u32, payload: Option<&[u8]>) -> Vec<u8> {
    match payload {
        Some(payload) => {
            let mut cell = Vec::with_capacity(LEAF_CELL_PREFIX + payload.len());
            cell.extend_from_slice(&child.to_be_bytes());
            cell.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            cell.extend_from_slice(payload);
            cell
        }
        None => child.to_be_bytes().to_vec(),
    }
}

/// Read-only view of one page as a tree node.
#[derive(Debug)]
pub struct Node<'a> {
    data: &'a [u8],
}

/// Mutable view of one page as a tree node.
pub struct NodeMut<'a> {
    data: &'a mut [u8],
}

fn slot_offset(index: usize) -> Result<usize> {
    let offset = OFFSET_SLOTS + index * SLOT_SIZE;
    ensure!(
        offset + SLOT_SIZE <= OFFSET_PAYLOAD,
        "slot index {} out of page capacity",
        index
    );
    Ok(offset)
}

/// Shift `len` bytes starting at `src` by `shift` (memmove semantics,
/// either direction).
fn shift_range(data: &mut [u8], src: usize, len: usize, shift: isize) -> Result<()> {
    let dst = src as isize + shift;
    ensure!(dst >= 0, "shift destination underflows the page");
    let dst = dst as usize;
    ensure!(
        src + len <= data.len() && dst + len <= data.len(),
        "shift range [{}+{}] by {} out of page bounds",
        src,
        len,
        shift
    );
    data.copy_within(src..src + len, dst);
    Ok(())
}

impl<'a> Node<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        ensure!(
            data.len() == PAGE_SIZE,
            "invalid page size: {} != {}",
            data.len(),
            PAGE_SIZE
        );
        Ok(Self { data })
    }

    fn header(&self) -> Result<&NodeHeader> {
        NodeHeader::ref_from_bytes(&self.data[..NODE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read NodeHeader: {:?}", e))
    }

    pub fn page_no(&self) -> Result<u32> {
        Ok(self.header()?.page_no.get())
    }

    pub fn node_type(&self) -> Result<NodeType> {
        NodeType::from_byte(self.header()?.node_type)
    }

    pub fn is_used(&self) -> Result<bool> {
        Ok(self.header()?.used == PAGE_USED)
    }

    pub fn parent(&self) -> Result<u32> {
        Ok(self.header()?.parent.get())
    }

    pub fn usable_ptr(&self) -> Result<u32> {
        Ok(self.header()?.usable_ptr.get())
    }

    pub fn number_of_keys(&self) -> Result<usize> {
        Ok(self.header()?.number_of_keys.get() as usize)
    }

    pub fn next(&self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[OFFSET_NEXT..OFFSET_NEXT + 4]);
        Ok(u32::from_be_bytes(bytes))
    }

    pub fn slot(&self, index: usize) -> Result<&Slot> {
        let offset = slot_offset(index)?;
        Slot::ref_from_bytes(&self.data[offset..offset + SLOT_SIZE])
            .map_err(|e| eyre::eyre!("failed to read Slot {}: {:?}", index, e))
    }

    pub fn key(&self, index: usize) -> Result<u64> {
        Ok(self.slot(index)?.key())
    }

    pub fn cell_ptr(&self, index: usize) -> Result<u32> {
        Ok(self.slot(index)?.cell_ptr())
    }

    /// Key of the last live slot, or 0 for an empty node.
    pub fn max_key(&self) -> Result<u64> {
        let count = self.number_of_keys()?;
        if count == 0 {
            return Ok(0);
        }
        self.key(count - 1)
    }

    /// Linear scan for an exact key match among live slots.
    pub fn find_key(&self, key: u64) -> Result<Option<usize>> {
        for index in 0..self.number_of_keys()? {
            if self.key(index)? == key {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Length of the cell body starting at `cell_ptr`, derived from the
    /// node type.
    pub fn cell_size_at(&self, cell_ptr: u32) -> Result<usize> {
        let start = cell_ptr as usize;
        match self.node_type()? {
            NodeType::Internal => {
                ensure!(
                    start + CHILD_CELL_SIZE <= PAGE_SIZE,
                    "internal cell at {} out of page bounds",
                    start
                );
                Ok(CHILD_CELL_SIZE)
            }
            NodeType::Leaf => {
                ensure!(
                    start + LEAF_CELL_PREFIX <= PAGE_SIZE,
                    "leaf cell at {} out of page bounds",
                    start
                );
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(&self.data[start + 4..start + 8]);
                let payload_len = u32::from_be_bytes(bytes) as usize;
                ensure!(
                    start + LEAF_CELL_PREFIX + payload_len <= PAGE_SIZE,
                    "leaf cell at {} with payload {} out of page bounds",
                    start,
                    payload_len
                );
                Ok(LEAF_CELL_PREFIX + payload_len)
            }
        }
    }

    /// The full cell body for a slot.
    pub fn cell(&self, index: usize) -> Result<&'a [u8]> {
        let cell_ptr = self.cell_ptr(index)?;
        ensure!(cell_ptr != 0, "slot {} holds no cell", index);
        let size = self.cell_size_at(cell_ptr)?;
        let start = cell_ptr as usize;
        Ok(&self.data[start..start + size])
    }

    /// The child page recorded in a slot's cell (0 in leaf cells).
    pub fn child(&self, index: usize) -> Result<u32> {
        let cell = self.cell(index)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&cell[..4]);
        Ok(u32::from_be_bytes(bytes))
    }

    /// The payload portion of a leaf cell; `None` on internal nodes.
    pub fn payload(&self, index: usize) -> Result<Option<&'a [u8]>> {
        if self.node_type()? != NodeType::Leaf {
            return Ok(None);
        }
        Ok(Some(&self.cell(index)?[LEAF_CELL_PREFIX..]))
    }
}

impl<'a> NodeMut<'a> {
    pub fn new(data: &'a mut [u8]) -> Result<Self> {
        ensure!(
            data.len() == PAGE_SIZE,
            "invalid page size: {} != {}",
            data.len(),
            PAGE_SIZE
        );
        Ok(Self { data })
    }

    /// Read-only view of the same page.
    pub fn as_node(&self) -> Node<'_> {
        Node { data: &*self.data }
    }

    fn header_mut(&mut self) -> Result<&mut NodeHeader> {
        NodeHeader::mut_from_bytes(&mut self.data[..NODE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read NodeHeader: {:?}", e))
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut Slot> {
        let offset = slot_offset(index)?;
        Slot::mut_from_bytes(&mut self.data[offset..offset + SLOT_SIZE])
            .map_err(|e| eyre::eyre!("failed to read Slot {}: {:?}", index, e))
    }

    pub fn set_page_no(&mut self, page_no: u32) -> Result<()> {
        self.header_mut()?.page_no = U32::new(page_no);
        Ok(())
    }

    pub fn set_node_type(&mut self, node_type: NodeType) -> Result<()> {
        self.header_mut()?.node_type = node_type as u8;
        Ok(())
    }

    pub fn set_used(&mut self, used: u8) -> Result<()> {
        self.header_mut()?.used = used;
        Ok(())
    }

    pub fn set_parent(&mut self, parent: u32) -> Result<()> {
        self.header_mut()?.parent = U32::new(parent);
        Ok(())
    }

    pub fn set_usable_ptr(&mut self, usable_ptr: u32) -> Result<()> {
        self.header_mut()?.usable_ptr = U32::new(usable_ptr);
        Ok(())
    }

    pub fn set_number_of_keys(&mut self, count: u32) -> Result<()> {
        self.header_mut()?.number_of_keys = U32::new(count);
        Ok(())
    }

    pub fn set_next(&mut self, next: u32) -> Result<()> {
        self.data[OFFSET_NEXT..OFFSET_NEXT + 4].copy_from_slice(&next.to_be_bytes());
        Ok(())
    }

    pub fn set_key(&mut self, index: usize, key: u64) -> Result<()> {
        self.slot_mut(index)?.key = U64::new(key);
        Ok(())
    }

    pub fn set_cell_ptr(&mut self, index: usize, cell_ptr: u32) -> Result<()> {
        self.slot_mut(index)?.cell_ptr = U32::new(cell_ptr);
        Ok(())
    }

    /// Adjust every slot whose cell pointer lies strictly below `boundary`
    /// by `shift`. Used after the cell area between `usable_ptr` and
    /// `boundary` has been moved.
    fn shift_cell_ptrs(&mut self, boundary: u32, shift: isize) -> Result<()> {
        let count = self.as_node().number_of_keys()?;
        for index in 0..count {
            let cell_ptr = self.as_node().cell_ptr(index)?;
            if cell_ptr > 0 && cell_ptr < boundary {
                self.set_cell_ptr(index, (cell_ptr as isize + shift) as u32)?;
            }
        }
        Ok(())
    }

    /// Install `cell` at `index`. An empty slot gets fresh space below
    /// `usable_ptr`; an occupied slot is resized in place with the cell's
    /// end anchored (other cells shift to absorb the size delta).
    pub fn insert_or_update_cell(&mut self, index: usize, cell: &[u8]) -> Result<()> {
        let cell_ptr = self.as_node().cell_ptr(index)? as usize;
        if cell_ptr == 0 {
            let usable = self.as_node().usable_ptr()? as usize;
            ensure!(
                usable >= NODE_HEADER_SIZE + cell.len(),
                "cell of {} bytes does not fit below usable_ptr {}",
                cell.len(),
                usable
            );
            let new_ptr = usable - cell.len();
            self.set_cell_ptr(index, new_ptr as u32)?;
            self.set_usable_ptr(new_ptr as u32)?;
            self.data[new_ptr..new_ptr + cell.len()].copy_from_slice(cell);
            return Ok(());
        }

        let old_len = self.as_node().cell_size_at(cell_ptr as u32)?;
        let shift = old_len as isize - cell.len() as isize;
        let usable = self.as_node().usable_ptr()? as usize;
        ensure!(
            cell_ptr >= usable,
            "cell_ptr {} below usable_ptr {}",
            cell_ptr,
            usable
        );
        if shift != 0 {
            let span = cell_ptr - usable;
            if span > 0 {
                shift_range(self.data, usable, span, shift)?;
                self.shift_cell_ptrs(cell_ptr as u32, shift)?;
            }
            self.set_usable_ptr((usable as isize + shift) as u32)?;
            self.set_cell_ptr(index, (cell_ptr as isize + shift) as u32)?;
        }
        let start = (cell_ptr as isize + shift) as usize;
        ensure!(
            start + cell.len() <= OFFSET_PAYLOAD,
            "cell write [{}, {}) out of cell area",
            start,
            start + cell.len()
        );
        self.data[start..start + cell.len()].copy_from_slice(cell);
        Ok(())
    }

    /// Remove the cell behind a slot, compacting the cell area and zeroing
    /// the slot pointer. A slot without a cell is a noop.
    pub fn delete_cell(&mut self, index: usize) -> Result<()> {
        let cell_ptr = self.as_node().cell_ptr(index)? as usize;
        if cell_ptr == 0 {
            return Ok(());
        }
        let size = self.as_node().cell_size_at(cell_ptr as u32)?;
        let usable = self.as_node().usable_ptr()? as usize;
        ensure!(
            cell_ptr >= usable,
            "cell_ptr {} below usable_ptr {}",
            cell_ptr,
            usable
        );
        let span = cell_ptr - usable;
        if span > 0 {
            shift_range(self.data, usable, span, size as isize)?;
            self.shift_cell_ptrs(cell_ptr as u32, size as isize)?;
        }
        self.set_usable_ptr((usable + size) as u32)?;
        self.set_cell_ptr(index, 0)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_leaf() -> Vec<u8> {
        let mut data = vec![0u8; PAGE_SIZE];
        {
            let mut node = NodeMut::new(&mut data).unwrap();
            node.set_node_type(NodeType::Leaf).unwrap();
            node.set_usable_ptr(OFFSET_PAYLOAD as u32).unwrap();
        }
        data
    }

    fn fresh_internal() -> Vec<u8> {
        let mut data = vec![0u8; PAGE_SIZE];
        {
            let mut node = NodeMut::new(&mut data).unwrap();
            node.set_node_type(NodeType::Internal).unwrap();
            node.set_usable_ptr(OFFSET_PAYLOAD as u32).unwrap();
        }
        data
    }

    #[test]
    fn header_layout_matches_page_format() {
        assert_eq!(std::mem::size_of::<NodeHeader>(), 36);
        assert_eq!(std::mem::offset_of!(NodeHeader, node_type), 4);
        assert_eq!(std::mem::offset_of!(NodeHeader, used), 5);
        assert_eq!(std::mem::offset_of!(NodeHeader, parent), 8);
        assert_eq!(std::mem::offset_of!(NodeHeader, usable_ptr), 12);
        assert_eq!(std::mem::offset_of!(NodeHeader, number_of_keys), 32);
    }

    #[test]
    fn node_type_from_byte() {
        assert_eq!(NodeType::from_byte(0x01).unwrap(), NodeType::Internal);
        assert_eq!(NodeType::from_byte(0x02).unwrap(), NodeType::Leaf);
        assert!(NodeType::from_byte(0x03).is_err());
    }

    #[test]
    fn max_order_fits_slot_array() {
        assert_eq!(MAX_ORDER, 39);
        assert!(OFFSET_SLOTS + MAX_ORDER * SLOT_SIZE <= OFFSET_PAYLOAD);
    }

    #[test]
    fn header_fields_round_trip() {
        let mut data = vec![0u8; PAGE_SIZE];
        {
            let mut node = NodeMut::new(&mut data).unwrap();
            node.set_page_no(7).unwrap();
            node.set_node_type(NodeType::Internal).unwrap();
            node.set_used(PAGE_USED).unwrap();
            node.set_parent(1).unwrap();
            node.set_usable_ptr(500).unwrap();
            node.set_number_of_keys(3).unwrap();
            node.set_next(9).unwrap();
        }
        let node = Node::new(&data).unwrap();
        assert_eq!(node.page_no().unwrap(), 7);
        assert_eq!(node.node_type().unwrap(), NodeType::Internal);
        assert!(node.is_used().unwrap());
        assert_eq!(node.parent().unwrap(), 1);
        assert_eq!(node.usable_ptr().unwrap(), 500);
        assert_eq!(node.number_of_keys().unwrap(), 3);
        assert_eq!(node.next().unwrap(), 9);
    }

    #[test]
    fn header_bytes_land_at_format_offsets() {
        let mut data = vec![0u8; PAGE_SIZE];
        {
            let mut node = NodeMut::new(&mut data).unwrap();
            node.set_page_no(0x01020304).unwrap();
            node.set_parent(0x0A0B0C0D).unwrap();
            node.set_number_of_keys(2).unwrap();
        }
        assert_eq!(&data[0..4], &[1, 2, 3, 4]);
        assert_eq!(&data[8..12], &[0x0A, 0x0B, 0x0C, 0x0D]);
        assert_eq!(&data[32..36], &[0, 0, 0, 2]);
    }

    #[test]
    fn slot_round_trip() {
        let mut data = fresh_leaf();
        {
            let mut node = NodeMut::new(&mut data).unwrap();
            node.set_key(0, 42).unwrap();
            node.set_cell_ptr(0, 496).unwrap();
            node.set_key(1, 77).unwrap();
        }
        let node = Node::new(&data).unwrap();
        assert_eq!(node.key(0).unwrap(), 42);
        assert_eq!(node.cell_ptr(0).unwrap(), 496);
        assert_eq!(node.key(1).unwrap(), 77);
        assert_eq!(node.cell_ptr(1).unwrap(), 0);
    }

    #[test]
    fn slot_index_out_of_capacity_is_error() {
        let data = fresh_leaf();
        let node = Node::new(&data).unwrap();
        assert!(node.slot(MAX_ORDER).is_err());
    }

    #[test]
    fn marshal_leaf_and_internal_cells() {
        let leaf = marshal_cell(0, Some(b"abc"));
        assert_eq!(leaf.len(), 11);
        assert_eq!(&leaf[4..8], &[0, 0, 0, 3]);
        assert_eq!(&leaf[8..], b"abc");

        let internal = marshal_cell(6, None);
        assert_eq!(internal, vec![0, 0, 0, 6]);
    }

    #[test]
    fn insert_cell_reserves_below_usable_ptr() {
        let mut data = fresh_leaf();
        let mut node = NodeMut::new(&mut data).unwrap();
        node.insert_or_update_cell(0, &marshal_cell(0, Some(b"hello")))
            .unwrap();

        let expected_ptr = (OFFSET_PAYLOAD - 13) as u32;
        assert_eq!(node.as_node().cell_ptr(0).unwrap(), expected_ptr);
        assert_eq!(node.as_node().usable_ptr().unwrap(), expected_ptr);
        assert_eq!(node.as_node().payload(0).unwrap(), Some(&b"hello"[..]));
    }

    #[test]
    fn usable_ptr_accounts_for_all_cells() {
        let mut data = fresh_leaf();
        let mut node = NodeMut::new(&mut data).unwrap();
        node.insert_or_update_cell(0, &marshal_cell(0, Some(b"aa")))
            .unwrap();
        node.insert_or_update_cell(1, &marshal_cell(0, Some(b"bbbb")))
            .unwrap();

        let total = (8 + 2) + (8 + 4);
        assert_eq!(
            node.as_node().usable_ptr().unwrap(),
            (OFFSET_PAYLOAD - total) as u32
        );
    }

    #[test]
    fn delete_cell_compacts_and_adjusts_pointers() {
        let mut data = fresh_leaf();
        let mut node = NodeMut::new(&mut data).unwrap();
        node.insert_or_update_cell(0, &marshal_cell(0, Some(b"first")))
            .unwrap();
        node.insert_or_update_cell(1, &marshal_cell(0, Some(b"second")))
            .unwrap();
        node.set_number_of_keys(2).unwrap();

        let first_size = 8 + 5;
        node.delete_cell(0).unwrap();

        assert_eq!(node.as_node().cell_ptr(0).unwrap(), 0);
        // the surviving cell moved up by the deleted cell's size
        assert_eq!(
            node.as_node().cell_ptr(1).unwrap(),
            (OFFSET_PAYLOAD - first_size - 6 - 8 + first_size) as u32
        );
        assert_eq!(node.as_node().payload(1).unwrap(), Some(&b"second"[..]));
        assert_eq!(
            node.as_node().usable_ptr().unwrap(),
            (OFFSET_PAYLOAD - 8 - 6) as u32
        );
    }

    #[test]
    fn delete_cell_on_empty_slot_is_noop() {
        let mut data = fresh_leaf();
        let mut node = NodeMut::new(&mut data).unwrap();
        node.delete_cell(0).unwrap();
        assert_eq!(node.as_node().usable_ptr().unwrap(), OFFSET_PAYLOAD as u32);
    }

    #[test]
    fn update_cell_with_smaller_body_compacts_rightward() {
        let mut data = fresh_leaf();
        let mut node = NodeMut::new(&mut data).unwrap();
        node.insert_or_update_cell(0, &marshal_cell(0, Some(b"long-payload")))
            .unwrap();
        node.insert_or_update_cell(1, &marshal_cell(0, Some(b"x")))
            .unwrap();
        node.set_number_of_keys(2).unwrap();

        node.insert_or_update_cell(0, &marshal_cell(0, Some(b"tiny")))
            .unwrap();

        assert_eq!(node.as_node().payload(0).unwrap(), Some(&b"tiny"[..]));
        assert_eq!(node.as_node().payload(1).unwrap(), Some(&b"x"[..]));
        let total = (8 + 4) + (8 + 1);
        assert_eq!(
            node.as_node().usable_ptr().unwrap(),
            (OFFSET_PAYLOAD - total) as u32
        );
    }

    #[test]
    fn update_cell_with_larger_body_grows_leftward() {
        let mut data = fresh_leaf();
        let mut node = NodeMut::new(&mut data).unwrap();
        node.insert_or_update_cell(0, &marshal_cell(0, Some(b"ab")))
            .unwrap();
        node.insert_or_update_cell(1, &marshal_cell(0, Some(b"cd")))
            .unwrap();
        node.set_number_of_keys(2).unwrap();

        node.insert_or_update_cell(0, &marshal_cell(0, Some(b"abcdefgh")))
            .unwrap();

        assert_eq!(node.as_node().payload(0).unwrap(), Some(&b"abcdefgh"[..]));
        assert_eq!(node.as_node().payload(1).unwrap(), Some(&b"cd"[..]));
        let total = (8 + 8) + (8 + 2);
        assert_eq!(
            node.as_node().usable_ptr().unwrap(),
            (OFFSET_PAYLOAD - total) as u32
        );
    }

    #[test]
    fn update_lowest_cell_keeps_slot_consistent() {
        let mut data = fresh_leaf();
        let mut node = NodeMut::new(&mut data).unwrap();
        node.insert_or_update_cell(0, &marshal_cell(0, Some(b"abcdef")))
            .unwrap();
        node.set_number_of_keys(1).unwrap();

        // resizing the lowest cell must move its pointer with the body
        node.insert_or_update_cell(0, &marshal_cell(0, Some(b"ab")))
            .unwrap();

        let ptr = node.as_node().cell_ptr(0).unwrap();
        assert_eq!(ptr, node.as_node().usable_ptr().unwrap());
        assert_eq!(node.as_node().payload(0).unwrap(), Some(&b"ab"[..]));
    }

    #[test]
    fn internal_cells_are_four_bytes() {
        let mut data = fresh_internal();
        let mut node = NodeMut::new(&mut data).unwrap();
        node.insert_or_update_cell(0, &marshal_cell(12, None)).unwrap();
        node.set_number_of_keys(1).unwrap();

        assert_eq!(node.as_node().child(0).unwrap(), 12);
        assert_eq!(node.as_node().payload(0).unwrap(), None);
        assert_eq!(
            node.as_node().usable_ptr().unwrap(),
            (OFFSET_PAYLOAD - 4) as u32
        );
    }

    #[test]
    fn cell_on_empty_slot_is_error() {
        let data = fresh_leaf();
        let node = Node::new(&data).unwrap();
        assert!(node.cell(0).is_err());
    }

    #[test]
    fn find_key_scans_live_slots_only() {
        let mut data = fresh_leaf();
        {
            let mut node = NodeMut::new(&mut data).unwrap();
            node.set_key(0, 10).unwrap();
            node.set_key(1, 20).unwrap();
            node.set_key(2, 30).unwrap();
            node.set_number_of_keys(2).unwrap();
        }
        let node = Node::new(&data).unwrap();
        assert_eq!(node.find_key(20).unwrap(), Some(1));
        assert_eq!(node.find_key(30).unwrap(), None);
    }
}
