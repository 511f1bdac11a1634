//! # Storage Module
//!
//! The storage layer owns the flat byte image behind the B+tree. There is
//! no paging-from-disk machinery: the whole database is a fixed-capacity
//! in-memory image that is loaded from and written to a file in one shot.
//!
//! ## Image Geometry
//!
//! ```text
//! ┌─────────────┬─────────────┬─────────────┬───────┬─────────────┐
//! │   Page 0    │   Page 1    │   Page 2    │  ...  │   Page 31   │
//! │ file header │  tree root  │ allocatable │       │ allocatable │
//! └─────────────┴─────────────┴─────────────┴───────┴─────────────┘
//!   512 bytes each, 16384 bytes total, big-endian integers throughout
//! ```
//!
//! Page 0 never holds a node: its first eight bytes are the file header
//! (tree order, then the leftmost-leaf page number) and the rest is
//! padding. Page 1 is the root forever; root splits preserve its page
//! number. The allocator hands out pages 2..31 by scanning the per-page
//! `used` flag.
//!
//! ## Module Organization
//!
//! - `buffer`: [`PageBuffer`] - the image, page slices, the allocator,
//!   big-endian primitive accessors, and whole-image file I/O
//! - `headers`: [`FileHeader`] - the zerocopy page-0 header
//!
//! ## Constants
//!
//! The geometry constants below are shared with the node layer, which
//! asserts at compile time that its zerocopy header layout agrees with
//! them.

mod buffer;
mod headers;

pub use buffer::PageBuffer;
pub use headers::{FileHeader, FILE_HEADER_SIZE};

/// Size of one page in bytes.
pub const PAGE_SIZE: usize = 512;

/// Hard ceiling on the number of pages in an image.
pub const MAX_PAGES: u32 = 32;

/// Size of the whole backing image in bytes.
pub const IMAGE_SIZE: usize = PAGE_SIZE * MAX_PAGES as usize;

/// The tree root lives here for the lifetime of the image.
pub const ROOT_PAGE_NO: u32 = 1;

/// First page number the allocator may hand out. Page 0 is the file
/// header, page 1 the root.
pub const FIRST_ALLOC_PAGE: u32 = 2;

/// Byte offset of the `used` flag within a page header.
pub const OFFSET_USED: usize = 5;

/// `used` flag value for a free page.
pub const PAGE_FREE: u8 = 0x00;

/// `used` flag value for an allocated page.
pub const PAGE_USED: u8 = 0x01;
