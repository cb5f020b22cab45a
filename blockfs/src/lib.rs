//! A small block-structured file system stored in a single disk-image file.
//!
//! Three layers stack bottom-up:
//!
//! 1. [`BlockStorage`] / [`FileDisk`] - positioned block access over a
//!    regular host file.
//! 2. [`BasicFs`] - the allocator: owns the super-block bitmap and hands
//!    blocks out or reclaims them.
//! 3. [`FileSys`] - the engine: interprets blocks as directories, inodes and
//!    data, and implements the shell-level commands.

mod alloc;
mod config;
mod error;
mod fs;
mod io;
mod node;
mod sb;

pub use config::*;
pub use error::{FsError, Result, Status};
pub use fs::FileSys;
pub use io::{BlockNumber, BlockStorage, FileDisk};
pub use node::{is_directory, is_inode, Block, DirBlock, DirEntry, Inode};
pub use sb::BasicFs;
