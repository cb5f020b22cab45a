use std::mem;

use log::debug;
use zerocopy::AsBytes;

use crate::alloc::{Bitmap, State};
use crate::config::{
    BlockHandle, BLOCK_SIZE, NUM_BLOCKS, ROOT_DIR_HANDLE, SUPER_BLOCK_HANDLE,
};
use crate::error::Result;
use crate::io::BlockStorage;
use crate::node::DirBlock;

/// The basic file system: a block allocator over raw storage. Owns the super
/// block (block 0, the allocation bitmap) and hands out or reclaims blocks;
/// the bitmap is written back on every change so the image on disk is always
/// current.
pub struct BasicFs<T: BlockStorage> {
    dev: T,
    bitmap: Bitmap,
}

impl<T: BlockStorage> BasicFs<T> {
    /// Mounts the storage, formatting it first if the super block was never
    /// initialized. Formatting reserves block 0 for the bitmap and block 1
    /// for an empty root directory and frees everything else.
    pub fn mount(mut dev: T) -> Result<Self> {
        let mut buf = [0u8; BLOCK_SIZE];
        dev.read_block(SUPER_BLOCK_HANDLE as usize, &mut buf)?;

        let mut bfs = BasicFs {
            dev,
            bitmap: Bitmap::parse(&buf),
        };
        if bfs.bitmap.is_blank() {
            bfs.format()?;
        }
        Ok(bfs)
    }

    fn format(&mut self) -> Result<()> {
        debug!("super block uninitialized, formatting disk");
        for blocknr in 2..NUM_BLOCKS {
            self.bitmap.set_free(blocknr);
        }
        self.bitmap.set_used(SUPER_BLOCK_HANDLE as usize);
        self.bitmap.set_used(ROOT_DIR_HANDLE as usize);
        self.write_super()?;

        let mut buf = [0u8; BLOCK_SIZE];
        buf[..mem::size_of::<DirBlock>()].copy_from_slice(DirBlock::new().as_bytes());
        self.write_block(ROOT_DIR_HANDLE, &buf)
    }

    /// Allocates the lowest-numbered free block, zero-fills it on disk and
    /// returns its handle, or `None` when the disk is full. The zero fill
    /// guarantees callers always start from a clean block even when their
    /// own writes touch only part of it.
    pub fn get_free_block(&mut self) -> Result<Option<BlockHandle>> {
        let Some(blocknr) = self.bitmap.first_free() else {
            return Ok(None);
        };
        self.bitmap.set_used(blocknr);
        self.write_super()?;
        self.dev.write_block(blocknr, &[0u8; BLOCK_SIZE])?;
        Ok(Some(blocknr as BlockHandle))
    }

    /// Returns a block to the free pool. Contents are left in place; the
    /// next allocation re-zeros them.
    pub fn reclaim_block(&mut self, handle: BlockHandle) -> Result<()> {
        self.bitmap.set_free(handle as usize);
        self.write_super()
    }

    pub fn read_block(&mut self, handle: BlockHandle, buf: &mut [u8]) -> Result<()> {
        self.dev.read_block(handle as usize, buf)?;
        Ok(())
    }

    pub fn write_block(&mut self, handle: BlockHandle, buf: &[u8]) -> Result<()> {
        self.dev.write_block(handle as usize, buf)?;
        Ok(())
    }

    pub fn sync(&mut self) -> Result<()> {
        self.dev.sync_disk()?;
        Ok(())
    }

    pub fn is_free(&self, handle: BlockHandle) -> bool {
        self.bitmap.get(handle as usize) == State::Free
    }

    pub fn free_count(&self) -> usize {
        self.bitmap.free_count()
    }

    fn write_super(&mut self) -> Result<()> {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[..self.bitmap.as_bytes().len()].copy_from_slice(self.bitmap.as_bytes());
        self.dev.write_block(SUPER_BLOCK_HANDLE as usize, &buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::FileDisk;
    use crate::node::is_directory;

    fn mounted() -> (BasicFs<FileDisk>, tempfile::NamedTempFile) {
        let tf = tempfile::NamedTempFile::new().unwrap();
        let dev = FileDisk::open_disk(tf.path(), NUM_BLOCKS).unwrap();
        (BasicFs::mount(dev).unwrap(), tf)
    }

    #[test]
    fn formatting_reserves_super_and_root() {
        let (bfs, _tf) = mounted();
        assert!(!bfs.is_free(SUPER_BLOCK_HANDLE));
        assert!(!bfs.is_free(ROOT_DIR_HANDLE));
        assert_eq!(bfs.free_count(), NUM_BLOCKS - 2);
    }

    #[test]
    fn formatting_writes_an_empty_root_directory() {
        let (mut bfs, _tf) = mounted();
        let mut buf = [0u8; BLOCK_SIZE];
        bfs.read_block(ROOT_DIR_HANDLE, &mut buf).unwrap();
        assert!(is_directory(&buf));
    }

    #[test]
    fn formatting_happens_only_once() {
        let tf = tempfile::NamedTempFile::new().unwrap();
        {
            let dev = FileDisk::open_disk(tf.path(), NUM_BLOCKS).unwrap();
            let mut bfs = BasicFs::mount(dev).unwrap();
            let handle = bfs.get_free_block().unwrap().unwrap();
            bfs.write_block(handle, &[0x7fu8; BLOCK_SIZE]).unwrap();
            bfs.sync().unwrap();
        }

        let dev = FileDisk::open_disk(tf.path(), NUM_BLOCKS).unwrap();
        let mut bfs = BasicFs::mount(dev).unwrap();
        assert_eq!(bfs.free_count(), NUM_BLOCKS - 3);
        assert!(!bfs.is_free(2));

        let mut buf = [0u8; BLOCK_SIZE];
        bfs.read_block(2, &mut buf).unwrap();
        assert_eq!(buf, [0x7fu8; BLOCK_SIZE]);
    }

    #[test]
    fn allocation_is_first_fit_and_zero_fills() {
        let (mut bfs, _tf) = mounted();
        let first = bfs.get_free_block().unwrap().unwrap();
        let second = bfs.get_free_block().unwrap().unwrap();
        assert_eq!(first, 2);
        assert_eq!(second, 3);

        bfs.write_block(first, &[0xaau8; BLOCK_SIZE]).unwrap();
        bfs.reclaim_block(first).unwrap();
        let again = bfs.get_free_block().unwrap().unwrap();
        assert_eq!(again, first);

        let mut buf = [0xffu8; BLOCK_SIZE];
        bfs.read_block(again, &mut buf).unwrap();
        assert_eq!(buf, [0u8; BLOCK_SIZE]);
    }

    #[test]
    fn exhaustion_reports_none() {
        let (mut bfs, _tf) = mounted();
        while bfs.get_free_block().unwrap().is_some() {}
        assert_eq!(bfs.free_count(), 0);
        assert!(bfs.get_free_block().unwrap().is_none());
    }
}
