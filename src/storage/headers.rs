//! # File Header Definition
//!
//! Page 0 of the image begins with an 8-byte header that makes a written
//! file self-describing:
//!
//! ```text
//! Offset  Size  Field   Description
//! ------  ----  ------  -----------------------------------
//! 0       4     order   Maximum live keys per node (u32 BE)
//! 4       4     leaf    Leftmost-leaf page number (u32 BE)
//! ```
//!
//! The remaining 504 bytes of page 0 are padding. The header is a zerocopy
//! struct over big-endian fields so it can be read from and written into
//! the page image without manual byte plumbing.

use eyre::{ensure, Result};
use zerocopy::big_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Size of the page-0 file header in bytes.
pub const FILE_HEADER_SIZE: usize = 8;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FileHeader {
    order: U32,
    leaf: U32,
}

const _: () = assert!(std::mem::size_of::<FileHeader>() == FILE_HEADER_SIZE);

impl FileHeader {
    pub fn new(order: u32, leaf: u32) -> Self {
        Self {
            order: U32::new(order),
            leaf: U32::new(leaf),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= FILE_HEADER_SIZE,
            "buffer too small for FileHeader: {} < {}",
            bytes.len(),
            FILE_HEADER_SIZE
        );
        Self::ref_from_bytes(&bytes[..FILE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read FileHeader: {:?}", e))
    }

    pub fn write_to(&self, data: &mut [u8]) -> Result<()> {
        ensure!(
            data.len() >= FILE_HEADER_SIZE,
            "buffer too small for FileHeader: {} < {}",
            data.len(),
            FILE_HEADER_SIZE
        );
        data[..FILE_HEADER_SIZE].copy_from_slice(self.as_bytes());
        Ok(())
    }

    pub fn order(&self) -> u32 {
        self.order.get()
    }

    pub fn leaf(&self) -> u32 {
        self.leaf.get()
    }
}
