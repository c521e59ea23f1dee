// SPDX-License-Identifier: Apache-2.0

//! Configuration for the watcher and line reader.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::file_state::FileState;

/// Poll period used when the configured interval is zero.
pub(crate) const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Seek anchor for the first file a watcher opens.
///
/// Only the first open is affected; files adopted after a rotation are always
/// read from the beginning. `Current` behaves the same as `Start` because a
/// freshly opened descriptor sits at offset zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Whence {
    #[default]
    Start,
    Current,
    End,
}

/// Configuration shared by [`PollWatcher`](crate::watcher::PollWatcher) and
/// [`LineReader`](crate::reader::LineReader).
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Location of a regular file to tail. The file does not have to exist
    /// yet; the watcher polls until it appears.
    pub path: PathBuf,

    /// How frequently to stat the file and check for more data. Zero selects
    /// the 1 second default.
    pub interval: Duration,

    /// Seek anchor for the first file opened. Disregarded if the file does
    /// not initially exist on disk, or if `start_state` is supplied.
    pub whence: Whence,

    /// Optional resume point for the first file opened. Honored only when the
    /// recorded inode still matches and the file is at least as large as the
    /// recorded position.
    pub start_state: Option<FileState>,

    /// Line reader only: terminate with [`Error::EndOfStream`] at the first
    /// end-of-file instead of waiting for growth or rotation.
    pub stop_at_eof: bool,
}

impl Config {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Validate the configuration and apply defaults.
    pub(crate) fn normalized(mut self) -> Result<Self> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::Config("path cannot be empty".to_string()));
        }

        if self.interval.is_zero() {
            self.interval = DEFAULT_INTERVAL;
        }

        Ok(self)
    }
}
