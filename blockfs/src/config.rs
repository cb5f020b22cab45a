//! Geometry of the on-disk format. Everything below is derived from the
//! block size, so changing `BLOCK_SIZE` re-shapes directories and inodes
//! consistently.

/// Bytes per block. Disks commonly expose 512-byte sectors; this format uses
/// small blocks so that directory and inode records fill one block exactly.
pub const BLOCK_SIZE: usize = 128;

/// Total number of blocks in the disk image.
pub const NUM_BLOCKS: usize = 1024;

/// Index of a block in the disk image. Handle 0 doubles as "no block": the
/// super block lives there and is never handed out by the allocator.
pub type BlockHandle = u32;

pub const NULL_HANDLE: BlockHandle = 0;
pub const SUPER_BLOCK_HANDLE: BlockHandle = 0;
pub const ROOT_DIR_HANDLE: BlockHandle = 1;

/// First word of a directory block.
pub const DIR_MAGIC_NUM: u32 = 0xFFFF_FFFF;
/// First word of an inode block. Data blocks carry no magic.
pub const INODE_MAGIC_NUM: u32 = 0xFFFF_FFFE;

/// Longest permitted file name; stored NUL-terminated in one extra byte.
pub const MAX_FNAME_SIZE: usize = 11;

/// Directory entry: name bytes plus a 4-byte handle.
pub const DIR_ENTRY_SIZE: usize = MAX_FNAME_SIZE + 1 + 4;

/// Entries that fit after the directory header (magic + entry count).
pub const MAX_DIR_ENTRIES: usize = (BLOCK_SIZE - 8) / DIR_ENTRY_SIZE;

/// Data-block handles that fit after the inode header (magic + size).
pub const MAX_DATA_BLOCKS: usize = (BLOCK_SIZE - 8) / 4;

pub const MAX_FILE_SIZE: usize = MAX_DATA_BLOCKS * BLOCK_SIZE;

/// One bit per block, packed into the super block.
pub const BITMAP_BYTES: usize = NUM_BLOCKS / 8;

const _: () = assert!(BITMAP_BYTES <= BLOCK_SIZE);
const _: () = assert!(8 + MAX_DIR_ENTRIES * DIR_ENTRY_SIZE <= BLOCK_SIZE);
const _: () = assert!(8 + MAX_DATA_BLOCKS * 4 <= BLOCK_SIZE);
