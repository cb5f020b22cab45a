//! On-disk record types. Directory and inode blocks open with a 4-byte magic
//! word; data blocks are raw bytes and are only identified by being
//! referenced from an inode. The `repr(C)` layout of these structs is the
//! disk layout (host-endian, like the rest of the image).

use std::mem;

use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::config::{
    BlockHandle, BLOCK_SIZE, DIR_ENTRY_SIZE, DIR_MAGIC_NUM, INODE_MAGIC_NUM, MAX_DATA_BLOCKS,
    MAX_DIR_ENTRIES, MAX_FNAME_SIZE, NULL_HANDLE,
};

/// One slot of a directory: a NUL-terminated name and the handle of the
/// block it names. A zero handle marks the slot empty.
#[repr(C)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy)]
pub struct DirEntry {
    pub name: [u8; MAX_FNAME_SIZE + 1],
    pub block: BlockHandle,
}

impl DirEntry {
    pub fn is_empty(&self) -> bool {
        self.block == NULL_HANDLE
    }

    /// The stored name up to its NUL terminator.
    pub fn name(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        std::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    /// Fills the slot. The caller must have checked the name length.
    pub fn fill(&mut self, name: &str, block: BlockHandle) {
        self.name = [0; MAX_FNAME_SIZE + 1];
        self.name[..name.len()].copy_from_slice(name.as_bytes());
        self.block = block;
    }

    pub fn clear(&mut self) {
        *self = Self::new_zeroed();
    }
}

/// A directory block: magic, live-entry count, fixed slot array.
#[repr(C)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy)]
pub struct DirBlock {
    pub magic: u32,
    pub num_entries: u32,
    pub entries: [DirEntry; MAX_DIR_ENTRIES],
}

impl DirBlock {
    pub fn new() -> Self {
        let mut block = Self::new_zeroed();
        block.magic = DIR_MAGIC_NUM;
        block
    }

    /// Slot index of the first occupied entry with this name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| !entry.is_empty() && entry.name() == name)
    }

    pub fn first_empty(&self) -> Option<usize> {
        self.entries.iter().position(DirEntry::is_empty)
    }
}

/// An inode block: magic, byte size, and handles of the file's data blocks
/// in order. A file of `size` bytes uses the first `size.div_ceil(BLOCK_SIZE)`
/// slots; the rest stay zero.
#[repr(C)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy)]
pub struct Inode {
    pub magic: u32,
    pub size: u32,
    pub blocks: [BlockHandle; MAX_DATA_BLOCKS],
}

impl Inode {
    pub fn new() -> Self {
        let mut block = Self::new_zeroed();
        block.magic = INODE_MAGIC_NUM;
        block
    }

    /// Data blocks currently holding file bytes.
    pub fn used_blocks(&self) -> usize {
        (self.size as usize + BLOCK_SIZE - 1) / BLOCK_SIZE
    }
}

fn leading_magic(buf: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&buf[..4]);
    u32::from_ne_bytes(word)
}

pub fn is_directory(buf: &[u8]) -> bool {
    leading_magic(buf) == DIR_MAGIC_NUM
}

pub fn is_inode(buf: &[u8]) -> bool {
    leading_magic(buf) == INODE_MAGIC_NUM
}

/// A typed view of a block, decoded from its magic word. Raw data blocks
/// decode to `None`; they never appear where a record is expected.
pub enum Block {
    Directory(DirBlock),
    Inode(Inode),
}

impl Block {
    pub fn decode(buf: &[u8]) -> Option<Block> {
        if is_directory(buf) {
            DirBlock::read_from_prefix(buf).map(Block::Directory)
        } else if is_inode(buf) {
            Inode::read_from_prefix(buf).map(Block::Inode)
        } else {
            None
        }
    }
}

const _: () = assert!(mem::size_of::<DirEntry>() == DIR_ENTRY_SIZE);
const _: () = assert!(mem::size_of::<DirBlock>() <= BLOCK_SIZE);
const _: () = assert!(mem::size_of::<Inode>() == BLOCK_SIZE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_records_decode_to_their_kind() {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[..mem::size_of::<DirBlock>()].copy_from_slice(DirBlock::new().as_bytes());
        assert!(is_directory(&buf));
        assert!(!is_inode(&buf));
        assert!(matches!(Block::decode(&buf), Some(Block::Directory(_))));

        buf.copy_from_slice(Inode::new().as_bytes());
        assert!(is_inode(&buf));
        assert!(matches!(Block::decode(&buf), Some(Block::Inode(_))));
    }

    #[test]
    fn raw_data_decodes_to_none() {
        let buf = [0x41u8; BLOCK_SIZE];
        assert!(Block::decode(&buf).is_none());
        assert!(Block::decode(&[0u8; BLOCK_SIZE]).is_none());
    }

    #[test]
    fn entries_store_and_find_names() {
        let mut dir = DirBlock::new();
        assert_eq!(dir.find("notes"), None);
        assert_eq!(dir.first_empty(), Some(0));

        dir.entries[2].fill("notes", 7);
        dir.num_entries = 1;

        assert_eq!(dir.entries[2].name(), "notes");
        assert_eq!(dir.find("notes"), Some(2));
        assert_eq!(dir.first_empty(), Some(0));

        dir.entries[2].clear();
        assert_eq!(dir.find("notes"), None);
    }

    #[test]
    fn empty_file_uses_no_blocks() {
        let mut inode = Inode::new();
        assert_eq!(inode.used_blocks(), 0);

        inode.size = 1;
        assert_eq!(inode.used_blocks(), 1);
        inode.size = BLOCK_SIZE as u32;
        assert_eq!(inode.used_blocks(), 1);
        inode.size = BLOCK_SIZE as u32 + 1;
        assert_eq!(inode.used_blocks(), 2);
    }
}
