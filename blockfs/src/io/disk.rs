use std::fs::{File, OpenOptions};
use std::io::prelude::*;
use std::io::{self, ErrorKind, SeekFrom};
use std::path::Path;

use crate::config::BLOCK_SIZE;
use crate::io::block::{BlockNumber, BlockStorage};

/// Block storage over a regular file. One image file backs the whole disk;
/// the file is created on first open and zero-extended to its full size, so
/// an unformatted disk reads as all zeros.
pub struct FileDisk {
    fd: File,
    block_count: usize,
}

impl FileDisk {
    /// Returns ownership of the underlying file to the caller.
    pub fn into_file(self) -> File {
        self.fd
    }

    fn check_range(&self, blocknr: BlockNumber, buf_len: usize) -> io::Result<()> {
        if blocknr >= self.block_count {
            return Err(io::Error::new(ErrorKind::InvalidInput, "block out of range"));
        }
        if buf_len != BLOCK_SIZE {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                "buffer is not exactly one block",
            ));
        }
        Ok(())
    }
}

impl BlockStorage for FileDisk {
    fn open_disk<P: AsRef<Path>>(path: P, nblocks: usize) -> io::Result<Self> {
        let fd = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let disk_len = (nblocks * BLOCK_SIZE) as u64;
        if fd.metadata()?.len() < disk_len {
            fd.set_len(disk_len)?;
        }

        Ok(FileDisk {
            fd,
            block_count: nblocks,
        })
    }

    fn read_block(&mut self, blocknr: BlockNumber, buf: &mut [u8]) -> io::Result<()> {
        self.check_range(blocknr, buf.len())?;
        self.fd.seek(SeekFrom::Start((blocknr * BLOCK_SIZE) as u64))?;
        self.fd.read_exact(buf)
    }

    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> io::Result<()> {
        self.check_range(blocknr, buf.len())?;
        self.fd.seek(SeekFrom::Start((blocknr * BLOCK_SIZE) as u64))?;
        self.fd.write_all(buf)
    }

    fn sync_disk(&mut self) -> io::Result<()> {
        self.fd.sync_all()
    }
}
