use std::io;

use thiserror::Error;

use crate::config::BlockHandle;

/// Fatal failures. Anything here means the disk image is unusable and the
/// hosting process should give up; there is no in-engine recovery.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("disk image unusable")]
    Disk(#[from] io::Error),

    #[error("directory block {handle} declares {declared} entries but has no free slot")]
    CorruptDirectory { handle: BlockHandle, declared: u32 },

    #[error("block {0} referenced from a directory carries no record magic")]
    UnknownRecord(BlockHandle),
}

pub type Result<T> = std::result::Result<T, FsError>;

/// Per-command outcome reported to the client. Unlike [`FsError`], these are
/// ordinary results of a command: the engine keeps going and the code travels
/// back over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    FileNotDir,
    FileIsDir,
    FileExists,
    FileNotExists,
    FileNameTooLong,
    DiskFull,
    DirFull,
    DirNotEmpty,
    AppendExceedsMaxSize,
    CommandNotFound,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 0,
            Status::FileNotDir => 500,
            Status::FileIsDir => 501,
            Status::FileExists => 502,
            Status::FileNotExists => 503,
            Status::FileNameTooLong => 504,
            Status::DiskFull => 505,
            Status::DirFull => 506,
            Status::DirNotEmpty => 507,
            Status::AppendExceedsMaxSize => 508,
            Status::CommandNotFound => 509,
        }
    }

    pub fn from_code(code: u16) -> Option<Status> {
        let status = match code {
            0 => Status::Ok,
            500 => Status::FileNotDir,
            501 => Status::FileIsDir,
            502 => Status::FileExists,
            503 => Status::FileNotExists,
            504 => Status::FileNameTooLong,
            505 => Status::DiskFull,
            506 => Status::DirFull,
            507 => Status::DirNotEmpty,
            508 => Status::AppendExceedsMaxSize,
            509 => Status::CommandNotFound,
            _ => return None,
        };
        Some(status)
    }

    /// Uppercase symbol used in the response status line.
    pub fn symbol(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::FileNotDir => "FILE_NOT_DIR",
            Status::FileIsDir => "FILE_IS_DIR",
            Status::FileExists => "FILE_EXISTS",
            Status::FileNotExists => "FILE_NOT_EXISTS",
            Status::FileNameTooLong => "FILE_NAME_TOO_LONG",
            Status::DiskFull => "DISK_FULL",
            Status::DirFull => "DIR_FULL",
            Status::DirNotEmpty => "DIR_NOT_EMPTY",
            Status::AppendExceedsMaxSize => "APPEND_EXCEEDS_MAX_SIZE",
            Status::CommandNotFound => "COMMAND_NOT_FOUND",
        }
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for status in [
            Status::Ok,
            Status::FileNotDir,
            Status::FileIsDir,
            Status::FileExists,
            Status::FileNotExists,
            Status::FileNameTooLong,
            Status::DiskFull,
            Status::DirFull,
            Status::DirNotEmpty,
            Status::AppendExceedsMaxSize,
            Status::CommandNotFound,
        ] {
            assert_eq!(Status::from_code(status.code()), Some(status));
        }
        assert_eq!(Status::from_code(510), None);
    }
}
