use std::io;
use std::path::Path;

/// The block number to access, ranging from 0 (the first block) to n - 1
/// (the last block) where n is the number of blocks available.
pub type BlockNumber = usize;

/// Positioned block access over some backing store. All transfers move
/// exactly [`BLOCK_SIZE`](crate::BLOCK_SIZE) bytes; partial transfers are
/// reported as errors because they mean the store itself is broken.
pub trait BlockStorage {
    /// Opens a disk at the specified path, creating it when absent. The
    /// store is sized to `nblocks` blocks; fresh blocks read as zeros.
    fn open_disk<P: AsRef<Path>>(path: P, nblocks: usize) -> io::Result<Self>
    where
        Self: Sized;

    /// Reads one block into the provided buffer.
    ///
    /// # Errors
    ///
    /// Attempting to read a block out of range will return an error, as will
    /// a buffer that is not exactly one block long.
    fn read_block(&mut self, blocknr: BlockNumber, buf: &mut [u8]) -> io::Result<()>;

    /// Writes the provided buffer into the specified block number, with the
    /// same range and length requirements as [`read_block`].
    ///
    /// [`read_block`]: BlockStorage::read_block
    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> io::Result<()>;

    /// Flushes any buffered disk IO from memory. This is useful if it must
    /// be guaranteed the disk writes actually occurred, for instance, if
    /// being re-read from disk.
    fn sync_disk(&mut self) -> io::Result<()>;
}
