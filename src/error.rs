// SPDX-License-Identifier: Apache-2.0

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file metadata does not expose an inode on this platform")]
    IdentityUnsupported,

    #[error("end of stream")]
    EndOfStream,
}

impl Error {
    /// Not-found on the tracked path is part of normal operation while a
    /// rotation is in flight, so the watcher needs to tell it apart from
    /// errors that must surface.
    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
