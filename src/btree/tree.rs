//! # B+Tree Algorithms
//!
//! [`BPlusTree`] owns the paged image and implements search, insert with
//! split propagation, range scans over the leaf chain, and whole-image
//! persistence.
//!
//! ## Routing
//!
//! Internal slots carry **subtree maxima**: the key in slot `i` is the
//! largest key stored under child `i`. Search therefore descends into the
//! first slot whose key is >= the search key, falling back to the last
//! slot when the key exceeds every maximum. This locates the unique leaf
//! that holds a key or would hold it after insertion.
//!
//! ## Insert
//!
//! ```text
//! 1. Descend to the target leaf.
//! 2. Fewer than `order` keys: shift slots right from the tail (zeroing
//!    vacated cell pointers), drop the key in place, and rewrite the
//!    parent's routing key if the node maximum changed.
//! 3. Exactly `order` keys: split. The left node keeps ceil(order/2)
//!    keys; the right sibling takes the rest plus the new key. Keys that
//!    move right have their left slot cleared and cell deleted; keys that
//!    stay keep their cell bodies untouched. The right sibling inherits
//!    the node type, enters the leaf chain, and is routed from the parent
//!    by inserting its maximum - which recurses and may split again.
//! ```
//!
//! ## Root Split
//!
//! The root must remain page 1, so splitting it takes an extra step: after
//! the key redistribution above, a fresh page is allocated, the reduced
//! root is copied into it (and restamped), and page 1 is rebuilt as an
//! internal node with exactly two routing entries - the copied left half
//! and the new right half. Children of both halves are reparented, and
//! the leftmost-leaf pointer follows the left half when it is a leaf.
//!
//! ## Persistence
//!
//! `write` stamps the file header (order, leftmost leaf) into page 0 and
//! writes the whole image; `load` reads it back and lifts the header.

use std::fmt::Write as _;
use std::path::Path;

use eyre::{ensure, Result};
use tracing::debug;

use crate::storage::{FileHeader, PageBuffer, MAX_PAGES, PAGE_FREE, PAGE_USED, ROOT_PAGE_NO};

use super::node::{marshal_cell, Node, NodeMut, NodeType, MAX_ORDER, OFFSET_PAYLOAD};

/// A B+tree over a fixed 32-page image.
///
/// Not thread-safe; a single logical caller owns the tree.
pub struct BPlusTree {
    buffer: PageBuffer,
    order: usize,
    leaf: u32,
}

impl BPlusTree {
    /// Create an empty tree of the given order (maximum live keys per
    /// node). The root starts as an empty leaf at page 1.
    pub fn create(order: usize) -> Result<Self> {
        ensure!(order >= 2, "order {} too small (minimum 2)", order);
        ensure!(
            order <= MAX_ORDER,
            "order {} too large (maximum {})",
            order,
            MAX_ORDER
        );

        let mut buffer = PageBuffer::new();
        for page_no in 0..MAX_PAGES {
            let mut node = NodeMut::new(buffer.page_mut(page_no)?)?;
            node.set_page_no(page_no)?;
            node.set_used(PAGE_FREE)?;
            node.set_usable_ptr(OFFSET_PAYLOAD as u32)?;
        }
        let mut root = NodeMut::new(buffer.page_mut(ROOT_PAGE_NO)?)?;
        root.set_node_type(NodeType::Leaf)?;
        root.set_used(PAGE_USED)?;

        Ok(Self {
            buffer,
            order,
            leaf: ROOT_PAGE_NO,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Page number of the leftmost leaf (head of the leaf chain).
    pub fn leftmost_leaf(&self) -> u32 {
        self.leaf
    }

    fn node(&self, page_no: u32) -> Result<Node<'_>> {
        Node::new(self.buffer.page(page_no)?)
    }

    fn node_mut(&mut self, page_no: u32) -> Result<NodeMut<'_>> {
        NodeMut::new(self.buffer.page_mut(page_no)?)
    }

    /// Descend from the root to the leaf that covers `key`.
    fn locate_leaf(&self, key: u64) -> Result<u32> {
        let mut page = ROOT_PAGE_NO;
        loop {
            let node = self.node(page)?;
            if node.node_type()? == NodeType::Leaf {
                return Ok(page);
            }
            let count = node.number_of_keys()?;
            ensure!(count > 0, "internal page {} has no keys", page);
            let mut index = count - 1;
            for i in 0..count {
                if node.key(i)? >= key {
                    index = i;
                    break;
                }
            }
            page = node.child(index)?;
        }
    }

    /// Insert a payload under `key`.
    pub fn insert(&mut self, key: u64, payload: &[u8]) -> Result<()> {
        let leaf = self.locate_leaf(key)?;
        self.insert_key(leaf, key, 0, Some(payload))
    }

    /// Retrieve the payload stored under `key`, if any.
    pub fn get(&self, key: u64) -> Result<Option<Vec<u8>>> {
        let page = self.locate_leaf(key)?;
        let node = self.node(page)?;
        match node.find_key(key)? {
            Some(index) => Ok(node.payload(index)?.map(|p| p.to_vec())),
            None => Ok(None),
        }
    }

    /// All entries with keys in `[key1, key2]`, ascending, gathered by
    /// walking the leaf chain from the leaf covering `key1` through the
    /// leaf covering `key2`.
    pub fn range_search(&self, key1: u64, key2: u64) -> Result<Vec<(u64, Vec<u8>)>> {
        let start = self.locate_leaf(key1)?;
        let end = self.locate_leaf(key2)?;

        let mut entries = Vec::new();
        let mut page = start;
        loop {
            let node = self.node(page)?;
            for index in 0..node.number_of_keys()? {
                let key = node.key(index)?;
                if key >= key1 && key <= key2 {
                    let payload = node.payload(index)?.unwrap_or_default().to_vec();
                    entries.push((key, payload));
                }
            }
            if page == end {
                break;
            }
            page = node.next()?;
            if page == 0 {
                break;
            }
        }
        Ok(entries)
    }

    fn insert_key(&mut self, page: u32, key: u64, child: u32, payload: Option<&[u8]>) -> Result<()> {
        if self.node(page)?.number_of_keys()? != self.order {
            self.insert_no_split(page, key, child, payload)
        } else {
            self.insert_and_split(page, key, child, payload)
        }
    }

    /// Marshal and install a cell for slot `index`.
    fn set_child(&mut self, page: u32, index: usize, child: u32, payload: Option<&[u8]>) -> Result<()> {
        let cell = marshal_cell(child, payload);
        self.node_mut(page)?.insert_or_update_cell(index, &cell)
    }

    /// Sorted in-place insert into a node with free slots. Slots are
    /// shifted right from the tail until the insertion point is found;
    /// vacated slots get their cell pointers zeroed so the new cell is
    /// allocated fresh. The parent's routing key is rewritten when the
    /// node maximum changed.
    fn insert_no_split(
        &mut self,
        page: u32,
        key: u64,
        child: u32,
        payload: Option<&[u8]>,
    ) -> Result<()> {
        let count = self.node(page)?.number_of_keys()?;
        let old_max = self.node(page)?.max_key()?;

        let mut index = count;
        {
            let mut node = self.node_mut(page)?;
            for i in (0..count).rev() {
                let ikey = node.as_node().key(i)?;
                if ikey < key {
                    index = i + 1;
                    break;
                }
                let icell_ptr = node.as_node().cell_ptr(i)?;
                node.set_key(i + 1, ikey)?;
                node.set_cell_ptr(i + 1, icell_ptr)?;
                node.set_cell_ptr(i, 0)?;
                index = i;
            }
            node.set_key(index, key)?;
            // a dead slot past the live range may carry a stale pointer
            node.set_cell_ptr(index, 0)?;
        }
        self.set_child(page, index, child, payload)?;

        let new_max = self.node(page)?.key(count)?;
        let parent = self.node(page)?.parent()?;
        if parent != 0 && old_max != new_max {
            self.update_key(parent, old_max, new_max)?;
        }
        self.node_mut(page)?.set_number_of_keys(count as u32 + 1)?;
        Ok(())
    }

    /// Split a full node and thread the new right sibling into the tree.
    fn insert_and_split(
        &mut self,
        page: u32,
        key: u64,
        child: u32,
        payload: Option<&[u8]>,
    ) -> Result<()> {
        let old_left_max = self.node(page)?.max_key()?;

        let right = self.split_keys(page, key, child, payload)?;
        let node_type = self.node(page)?.node_type()?;
        self.node_mut(right)?.set_node_type(node_type)?;
        debug!(page, right, "split node");

        let parent = self.node(page)?.parent()?;
        if parent == 0 {
            // The root cannot move: materialize the reduced root as a new
            // left sibling and rebuild page 1 around the two halves.
            let new_left = self.buffer.alloc()?;
            self.buffer.copy_page(page, new_left)?;
            self.node_mut(new_left)?.set_page_no(new_left)?;
            self.install_root(page, new_left, right)?;
            self.set_child_parent(new_left)?;
            self.set_child_parent(right)?;
        } else {
            let new_left_max = self.node(page)?.max_key()?;
            let right_max = self.node(right)?.max_key()?;
            self.node_mut(right)?.set_parent(parent)?;
            self.set_child_parent(right)?;
            self.update_key(parent, old_left_max, new_left_max)?;
            self.insert_key(parent, right_max, right, None)?;
        }
        Ok(())
    }

    /// Redistribute a full node plus one incoming key between the node and
    /// a freshly allocated right sibling. The left half keeps
    /// ceil(order/2) keys with their cell bodies in place; everything else
    /// is re-inserted into the right page and deleted from the left.
    /// Returns the right sibling's page number.
    fn split_keys(
        &mut self,
        page: u32,
        key: u64,
        child: u32,
        payload: Option<&[u8]>,
    ) -> Result<u32> {
        let right = self.buffer.alloc()?;
        let left_count = self.order.div_ceil(2);
        let right_count = self.order - left_count + 1;

        let mut l = left_count;
        let mut r = right_count;
        let mut pending = Some((key, child));
        for i in (0..self.order).rev() {
            let ikey = self.node(page)?.key(i)?;
            if let Some((new_key, new_child)) = pending {
                if new_key > ikey {
                    if r > 0 {
                        r -= 1;
                        self.node_mut(right)?.set_key(r, new_key)?;
                        self.set_child(right, r, new_child, payload)?;
                    } else {
                        l -= 1;
                        let mut node = self.node_mut(page)?;
                        node.set_key(l, new_key)?;
                        // the slot still aliases a kept key's cell
                        node.set_cell_ptr(l, 0)?;
                        drop(node);
                        self.set_child(page, l, new_child, payload)?;
                    }
                    pending = None;
                }
            }

            if r > 0 {
                // key moves to the right sibling: re-insert there, clear
                // the left slot, and release its cell
                let ichild = self.node(page)?.child(i)?;
                let ipayload = self.node(page)?.payload(i)?.map(|p| p.to_vec());
                r -= 1;
                self.node_mut(right)?.set_key(r, ikey)?;
                self.set_child(right, r, ichild, ipayload.as_deref())?;
                let mut node = self.node_mut(page)?;
                node.set_key(i, 0)?;
                node.delete_cell(i)?;
            } else {
                // key stays on the left: the cell body does not move
                let icell_ptr = self.node(page)?.cell_ptr(i)?;
                l -= 1;
                let mut node = self.node_mut(page)?;
                node.set_key(l, ikey)?;
                node.set_cell_ptr(l, icell_ptr)?;
            }
        }
        if let Some((new_key, new_child)) = pending {
            // the new key is smaller than every existing key; slot 0 still
            // carries the old first key's cell pointer, now owned by slot 1
            let mut node = self.node_mut(page)?;
            node.set_key(0, new_key)?;
            node.set_cell_ptr(0, 0)?;
            drop(node);
            self.set_child(page, 0, new_child, payload)?;
        }

        self.node_mut(right)?.set_number_of_keys(right_count as u32)?;
        self.node_mut(page)?.set_number_of_keys(left_count as u32)?;

        // thread the sibling into the leaf chain
        let old_next = self.node(page)?.next()?;
        self.node_mut(right)?.set_next(old_next)?;
        self.node_mut(page)?.set_next(right)?;

        Ok(right)
    }

    /// Rebuild the root page as an internal node routing to the two
    /// halves of a root split.
    fn install_root(&mut self, root: u32, left: u32, right: u32) -> Result<()> {
        let left_max = self.node(left)?.max_key()?;
        let right_max = self.node(right)?.max_key()?;

        {
            let mut node = self.node_mut(root)?;
            node.set_node_type(NodeType::Internal)?;
            node.set_usable_ptr(OFFSET_PAYLOAD as u32)?;
            node.set_key(0, left_max)?;
            node.set_cell_ptr(0, 0)?;
            node.set_key(1, right_max)?;
            node.set_cell_ptr(1, 0)?;
        }
        self.set_child(root, 0, left, None)?;
        self.set_child(root, 1, right, None)?;
        self.node_mut(root)?.set_number_of_keys(2)?;

        self.node_mut(left)?.set_parent(root)?;
        self.node_mut(right)?.set_parent(root)?;

        if self.node(left)?.node_type()? == NodeType::Leaf {
            self.leaf = left;
        }
        Ok(())
    }

    /// Rewrite the first routing slot holding `old_key` to `new_key`.
    /// Rewriting the last slot changes this node's own maximum, so the
    /// rewrite cascades to its router - every ancestor tracking the old
    /// maximum holds the same key value.
    fn update_key(&mut self, page: u32, old_key: u64, new_key: u64) -> Result<()> {
        let count = self.node(page)?.number_of_keys()?;
        let mut replaced = None;
        {
            let mut node = self.node_mut(page)?;
            for i in 0..count {
                if node.as_node().key(i)? == old_key {
                    node.set_key(i, new_key)?;
                    replaced = Some(i);
                    break;
                }
            }
        }
        if replaced == Some(count.saturating_sub(1)) {
            let parent = self.node(page)?.parent()?;
            if parent != 0 {
                self.update_key(parent, old_key, new_key)?;
            }
        }
        Ok(())
    }

    /// Point every child of an internal page back at it. Leaf pages hold
    /// no children (their cells store a dummy child of 0), so they are
    /// skipped.
    fn set_child_parent(&mut self, page: u32) -> Result<()> {
        if self.node(page)?.node_type()? != NodeType::Internal {
            return Ok(());
        }
        let count = self.node(page)?.number_of_keys()?;
        for i in 0..count {
            let child = self.node(page)?.child(i)?;
            self.node_mut(child)?.set_parent(page)?;
        }
        Ok(())
    }

    /// Stamp the file header and write the whole image to `path`.
    pub fn write(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let header = FileHeader::new(self.order as u32, self.leaf);
        header.write_to(self.buffer.page_mut(0)?)?;
        self.buffer.write_to(path)
    }

    /// Load a tree image from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let buffer = PageBuffer::read_from(path)?;
        let (order, leaf) = {
            let header = FileHeader::from_bytes(buffer.page(0)?)?;
            (header.order() as usize, header.leaf())
        };
        ensure!(
            (2..=MAX_ORDER).contains(&order),
            "image header carries invalid order {}",
            order
        );
        ensure!(
            leaf < MAX_PAGES,
            "image header carries invalid leaf page {}",
            leaf
        );
        Ok(Self { buffer, order, leaf })
    }

    /// Human-readable tree walk. Diagnostic output only; the format is
    /// not a stable contract.
    pub fn dump(&self) -> Result<String> {
        let mut out = String::new();
        let _ = writeln!(out, "leftmost leaf is page {}", self.leaf);
        self.dump_node(ROOT_PAGE_NO, &mut out)?;
        Ok(out)
    }

    fn dump_node(&self, page: u32, out: &mut String) -> Result<()> {
        let node = self.node(page)?;
        let label = match node.node_type()? {
            NodeType::Internal => "internal",
            NodeType::Leaf => "leaf",
        };
        let _ = write!(
            out,
            "{} [{}:P{}:N{}] ->",
            label,
            page,
            node.parent()?,
            node.next()?
        );
        for i in 0..node.number_of_keys()? {
            let _ = write!(
                out,
                " {}:C{}*[{}]:ptr[{}] |",
                i,
                node.child(i)?,
                node.key(i)?,
                node.cell_ptr(i)?
            );
        }
        let _ = writeln!(out);

        if node.node_type()? == NodeType::Internal {
            for i in 0..node.number_of_keys()? {
                self.dump_node(node.child(i)?, out)?;
            }
        }
        Ok(())
    }

    /// Print the tree walk to stdout.
    pub fn print(&self) -> Result<()> {
        println!("{}", self.dump()?);
        Ok(())
    }
}
