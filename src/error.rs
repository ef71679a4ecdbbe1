use std::path::PathBuf;
use thiserror::Error;

use crate::teec::TeecError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid arguments: {0}")]
    Usage(&'static str),

    #[error("invalid file name {0:?}: need at least 4 UTF-8 characters")]
    InvalidName(PathBuf),

    #[error("cannot read {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key file {} does not hold a decimal integer", .0.display())]
    KeyFormat(PathBuf),

    #[error("cannot write {}: {source}", .path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} failed with code {code:#x} origin {origin:#x}")]
    Connection {
        stage: &'static str,
        code: u32,
        origin: u32,
    },

    #[error("TEEC_InvokeCommand({command}) failed with code {code:#x} origin {origin:#x}")]
    Invocation { command: u32, code: u32, origin: u32 },

    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}

impl Error {
    pub(crate) fn connection(stage: &'static str, err: TeecError) -> Self {
        Error::Connection {
            stage,
            code: err.code,
            origin: err.origin,
        }
    }

    pub(crate) fn invocation(command: u32, err: TeecError) -> Self {
        Error::Invocation {
            command,
            code: err.code,
            origin: err.origin,
        }
    }

    /// Process exit status for this error.
    ///
    /// Unreadable inputs keep the historical `-1` (255 once truncated to a byte).
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::FileAccess { .. } | Error::KeyFormat(_) => 255,
            Error::Usage(_) | Error::InvalidName(_) => 2,
            Error::FileWrite { .. }
            | Error::Connection { .. }
            | Error::Invocation { .. }
            | Error::Unsupported(_) => 1,
        }
    }
}
