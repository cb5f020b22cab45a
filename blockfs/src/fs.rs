//! The file-system engine: interprets allocator blocks as directories,
//! inodes and data, and implements the shell-level commands over them.
//!
//! Commands never fail with an `Err` for ordinary user mistakes; those are
//! recorded in the sticky per-command [`Status`] and the command simply
//! stops. `Err` is reserved for a broken disk or structural corruption.

use std::mem;

use log::{error, warn};
use zerocopy::AsBytes;

use crate::config::{
    BlockHandle, BLOCK_SIZE, MAX_DIR_ENTRIES, MAX_FILE_SIZE, MAX_FNAME_SIZE, NULL_HANDLE,
    ROOT_DIR_HANDLE,
};
use crate::error::{FsError, Result, Status};
use crate::io::BlockStorage;
use crate::node::{is_directory, Block, DirBlock, Inode};
use crate::sb::BasicFs;

/// Kind of record stamped into a freshly made block.
#[derive(Clone, Copy)]
enum BlockKind {
    Directory,
    Inode,
}

/// A mounted file system plus the per-session command state: the current
/// directory cursor and the response/status pair of the command in flight.
pub struct FileSys<T: BlockStorage> {
    bfs: BasicFs<T>,
    cur_dir: BlockHandle,
    response: Vec<u8>,
    last_err: Status,
}

impl<T: BlockStorage> FileSys<T> {
    /// Mounts (formatting on first use) and places the cursor at the root.
    pub fn mount(storage: T) -> Result<Self> {
        Ok(FileSys {
            bfs: BasicFs::mount(storage)?,
            cur_dir: ROOT_DIR_HANDLE,
            response: Vec::new(),
            last_err: Status::Ok,
        })
    }

    /// Flushes the backing storage. Every mutation is already written
    /// through, so this only forces host-file durability.
    pub fn unmount(&mut self) -> Result<()> {
        self.bfs.sync()
    }

    /// Takes the accumulated response text, clearing it for the next
    /// command. A non-empty response is normalized to end in exactly one
    /// newline; an empty one stays empty.
    pub fn take_response(&mut self) -> Vec<u8> {
        let mut out = mem::take(&mut self.response);
        if !out.is_empty() {
            while out.last() == Some(&b'\n') {
                out.pop();
            }
            out.push(b'\n');
        }
        out
    }

    /// Takes the status of the last command, resetting it to `Ok`.
    pub fn take_status(&mut self) -> Status {
        mem::replace(&mut self.last_err, Status::Ok)
    }

    pub fn cur_dir(&self) -> BlockHandle {
        self.cur_dir
    }

    pub fn allocator(&self) -> &BasicFs<T> {
        &self.bfs
    }

    pub fn allocator_mut(&mut self) -> &mut BasicFs<T> {
        &mut self.bfs
    }

    // ---- directory commands ----

    /// Makes a directory in the current directory.
    pub fn mkdir(&mut self, name: &str) -> Result<()> {
        self.make_block(name, BlockKind::Directory)
    }

    /// Creates an empty data file in the current directory.
    pub fn create(&mut self, name: &str) -> Result<()> {
        self.make_block(name, BlockKind::Inode)
    }

    /// Moves the cursor into a child directory.
    pub fn cd(&mut self, name: &str) -> Result<()> {
        let Some((dir, slot)) = self.lookup(name)? else {
            return Ok(());
        };
        let target = dir.entries[slot].block;

        let mut buf = [0u8; BLOCK_SIZE];
        self.bfs.read_block(target, &mut buf)?;
        if is_directory(&buf) {
            self.cur_dir = target;
        } else {
            warn!("cd target {name:?} is not a directory");
            self.last_err = Status::FileNotDir;
        }
        Ok(())
    }

    /// Moves the cursor back to the root directory.
    pub fn home(&mut self) {
        self.cur_dir = ROOT_DIR_HANDLE;
    }

    /// Removes an empty child directory.
    pub fn rmdir(&mut self, name: &str) -> Result<()> {
        let Some((mut dir, slot)) = self.lookup(name)? else {
            return Ok(());
        };
        let target = dir.entries[slot].block;

        let mut buf = [0u8; BLOCK_SIZE];
        self.bfs.read_block(target, &mut buf)?;
        let victim = match Block::decode(&buf) {
            Some(Block::Directory(victim)) => victim,
            _ => {
                warn!("rmdir target {name:?} is not a directory");
                self.last_err = Status::FileNotDir;
                return Ok(());
            }
        };
        if victim.num_entries != 0 {
            warn!("directory {name:?} is not empty");
            self.last_err = Status::DirNotEmpty;
            return Ok(());
        }

        self.bfs.reclaim_block(target)?;
        dir.entries[slot].clear();
        dir.num_entries -= 1;
        self.write_dir(self.cur_dir, &dir)
    }

    /// Lists the current directory, one entry per line, directories marked
    /// with a trailing slash.
    pub fn ls(&mut self) -> Result<()> {
        let Some(dir) = self.read_dir(self.cur_dir)? else {
            return Ok(());
        };
        for entry in dir.entries.iter().filter(|entry| !entry.is_empty()) {
            let mut buf = [0u8; BLOCK_SIZE];
            self.bfs.read_block(entry.block, &mut buf)?;
            self.response.extend_from_slice(entry.name().as_bytes());
            if is_directory(&buf) {
                self.response.push(b'/');
            }
            self.response.push(b'\n');
        }
        self.response.push(b'\n');
        Ok(())
    }

    // ---- file commands ----

    /// Appends bytes to an existing file. Blocks are pre-allocated before
    /// any state changes so exhaustion mid-append rolls back completely;
    /// the inode is persisted last, after every data block has hit disk.
    pub fn append(&mut self, name: &str, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let Some((dir, slot)) = self.lookup(name)? else {
            return Ok(());
        };
        let inode_handle = dir.entries[slot].block;
        let Some(mut inode) = self.read_inode(inode_handle, name)? else {
            return Ok(());
        };

        let mut size = inode.size as usize;
        if size + data.len() > MAX_FILE_SIZE {
            warn!("appending {} bytes to {name:?} would exceed the maximum file size", data.len());
            self.last_err = Status::AppendExceedsMaxSize;
            return Ok(());
        }

        // Fresh blocks needed: whatever overflows the tail block, plus the
        // tail block itself when the file ends on a block boundary.
        let free_in_tail = BLOCK_SIZE - size % BLOCK_SIZE;
        let overflow = data.len().saturating_sub(free_in_tail);
        let mut needed = (overflow + BLOCK_SIZE - 1) / BLOCK_SIZE;
        if inode.blocks[size / BLOCK_SIZE] == NULL_HANDLE {
            needed += 1;
        }

        let mut fresh: Vec<BlockHandle> = Vec::with_capacity(needed);
        for _ in 0..needed {
            match self.bfs.get_free_block()? {
                Some(handle) => fresh.push(handle),
                None => {
                    error!("disk full while appending to {name:?}");
                    for handle in fresh {
                        self.bfs.reclaim_block(handle)?;
                    }
                    self.last_err = Status::DiskFull;
                    return Ok(());
                }
            }
        }

        let mut fresh = fresh.into_iter();
        for block_slot in inode.blocks[size / BLOCK_SIZE..].iter_mut() {
            if *block_slot == NULL_HANDLE {
                match fresh.next() {
                    Some(handle) => *block_slot = handle,
                    None => break,
                }
            }
        }

        let mut written = 0;
        while written < data.len() {
            let handle = inode.blocks[size / BLOCK_SIZE];
            let offset = size % BLOCK_SIZE;
            let take = (BLOCK_SIZE - offset).min(data.len() - written);

            let mut buf = [0u8; BLOCK_SIZE];
            self.bfs.read_block(handle, &mut buf)?;
            buf[offset..offset + take].copy_from_slice(&data[written..written + take]);
            self.bfs.write_block(handle, &buf)?;

            written += take;
            size += take;
        }

        inode.size = size as u32;
        self.bfs.write_block(inode_handle, inode.as_bytes())
    }

    /// Displays the whole file.
    pub fn cat(&mut self, name: &str) -> Result<()> {
        self.head(name, MAX_FILE_SIZE)
    }

    /// Displays the first `count` bytes of the file.
    pub fn head(&mut self, name: &str, count: usize) -> Result<()> {
        let Some((dir, slot)) = self.lookup(name)? else {
            return Ok(());
        };
        let Some(inode) = self.read_inode(dir.entries[slot].block, name)? else {
            return Ok(());
        };

        let size = inode.size as usize;
        if size == 0 {
            return Ok(());
        }

        let want = count.min(size);
        let num_blocks = (want + BLOCK_SIZE - 1) / BLOCK_SIZE;
        for i in 0..num_blocks {
            let mut buf = [0u8; BLOCK_SIZE];
            self.bfs.read_block(inode.blocks[i], &mut buf)?;
            let take = if i == num_blocks - 1 {
                want - i * BLOCK_SIZE
            } else {
                BLOCK_SIZE
            };
            self.response.extend_from_slice(&buf[..take]);
        }
        self.response.push(b'\n');
        Ok(())
    }

    /// Deletes a file, returning its data blocks and inode to the free pool.
    pub fn rm(&mut self, name: &str) -> Result<()> {
        let Some((mut dir, slot)) = self.lookup(name)? else {
            return Ok(());
        };
        let inode_handle = dir.entries[slot].block;
        let Some(inode) = self.read_inode(inode_handle, name)? else {
            return Ok(());
        };

        for i in 0..inode.used_blocks() {
            self.bfs.reclaim_block(inode.blocks[i])?;
        }
        self.bfs.reclaim_block(inode_handle)?;

        dir.entries[slot].clear();
        dir.num_entries -= 1;
        self.write_dir(self.cur_dir, &dir)
    }

    /// Displays stats about a file or directory.
    pub fn stat(&mut self, name: &str) -> Result<()> {
        let Some((dir, slot)) = self.lookup(name)? else {
            return Ok(());
        };
        let handle = dir.entries[slot].block;

        let mut buf = [0u8; BLOCK_SIZE];
        self.bfs.read_block(handle, &mut buf)?;
        match Block::decode(&buf) {
            Some(Block::Directory(_)) => {
                self.respond(format!("Directory name: {name}/\n"));
                self.respond(format!("Directory block: {handle}\n"));
            }
            Some(Block::Inode(inode)) => {
                // "Number of blocks" counts the inode block itself and always
                // rounds up; clients depend on these exact figures.
                let num_blocks = if inode.size == 0 {
                    1
                } else {
                    inode.size as usize / BLOCK_SIZE + 2
                };
                self.respond(format!("iNode block: {handle}\n"));
                self.respond(format!("Bytes in files: {}\n", inode.size));
                self.respond(format!("Number of blocks: {num_blocks}\n"));
                if inode.size == 0 {
                    self.respond("First block: N/A\n".to_string());
                } else {
                    self.respond(format!("First block: {}\n", inode.blocks[0]));
                }
            }
            None => return Err(FsError::UnknownRecord(handle)),
        }
        Ok(())
    }

    // ---- helpers ----

    /// Allocates one block, stamps it as the given record kind and names it
    /// in the current directory. On any rejection the block is reclaimed.
    fn make_block(&mut self, name: &str, kind: BlockKind) -> Result<()> {
        let Some(mut dir) = self.read_dir(self.cur_dir)? else {
            return Ok(());
        };

        let Some(handle) = self.bfs.get_free_block()? else {
            error!("disk full while creating {name:?}");
            self.last_err = Status::DiskFull;
            return Ok(());
        };

        if !self.insert_into_dir(&mut dir, handle, name)? {
            return self.bfs.reclaim_block(handle);
        }

        let mut buf = [0u8; BLOCK_SIZE];
        match kind {
            BlockKind::Directory => {
                buf[..mem::size_of::<DirBlock>()].copy_from_slice(DirBlock::new().as_bytes())
            }
            BlockKind::Inode => buf.copy_from_slice(Inode::new().as_bytes()),
        }
        self.bfs.write_block(handle, &buf)?;
        self.write_dir(self.cur_dir, &dir)
    }

    /// Validates and performs the insertion of a name into a directory.
    /// Returns `false` (with the status set) when the insert was rejected.
    fn insert_into_dir(
        &mut self,
        dir: &mut DirBlock,
        handle: BlockHandle,
        name: &str,
    ) -> Result<bool> {
        if dir.find(name).is_some() {
            warn!("name {name:?} already exists in the current directory");
            self.last_err = Status::FileExists;
            return Ok(false);
        }
        if dir.num_entries as usize >= MAX_DIR_ENTRIES {
            warn!("current directory is full, cannot add {name:?}");
            self.last_err = Status::DirFull;
            return Ok(false);
        }
        if name.len() > MAX_FNAME_SIZE {
            warn!("name {name:?} is too long");
            self.last_err = Status::FileNameTooLong;
            return Ok(false);
        }

        let Some(slot) = dir.first_empty() else {
            // Entry count says there is room but every slot is taken.
            return Err(FsError::CorruptDirectory {
                handle: self.cur_dir,
                declared: dir.num_entries,
            });
        };
        dir.entries[slot].fill(name, handle);
        dir.num_entries += 1;
        Ok(true)
    }

    /// Reads the current directory's record. A block without the directory
    /// magic sets `FileNotDir` and yields `None`.
    fn read_dir(&mut self, handle: BlockHandle) -> Result<Option<DirBlock>> {
        let mut buf = [0u8; BLOCK_SIZE];
        self.bfs.read_block(handle, &mut buf)?;
        match Block::decode(&buf) {
            Some(Block::Directory(dir)) => Ok(Some(dir)),
            _ => {
                error!("block {handle} is not a directory");
                self.last_err = Status::FileNotDir;
                Ok(None)
            }
        }
    }

    /// Reads an inode record. Anything else under the handle (in practice a
    /// directory) sets `FileIsDir` and yields `None`.
    fn read_inode(&mut self, handle: BlockHandle, name: &str) -> Result<Option<Inode>> {
        let mut buf = [0u8; BLOCK_SIZE];
        self.bfs.read_block(handle, &mut buf)?;
        match Block::decode(&buf) {
            Some(Block::Inode(inode)) => Ok(Some(inode)),
            _ => {
                warn!("{name:?} is not a data file");
                self.last_err = Status::FileIsDir;
                Ok(None)
            }
        }
    }

    fn write_dir(&mut self, handle: BlockHandle, dir: &DirBlock) -> Result<()> {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[..mem::size_of::<DirBlock>()].copy_from_slice(dir.as_bytes());
        self.bfs.write_block(handle, &buf)
    }

    /// Finds `name` in the current directory. A miss sets `FileNotExists`.
    fn lookup(&mut self, name: &str) -> Result<Option<(DirBlock, usize)>> {
        let Some(dir) = self.read_dir(self.cur_dir)? else {
            return Ok(None);
        };
        match dir.find(name) {
            Some(slot) => Ok(Some((dir, slot))),
            None => {
                warn!("failed to find {name:?} in the current directory");
                self.last_err = Status::FileNotExists;
                Ok(None)
            }
        }
    }

    fn respond(&mut self, text: String) {
        self.response.extend_from_slice(text.as_bytes());
    }
}
