// SPDX-License-Identifier: Apache-2.0

//! Transparent tailing of a rotated regular file.
//!
//! A consumer reads a continuous stream of bytes or lines from a logical log
//! path even as the file behind it is renamed aside and replaced, the way
//! log rotation works. The hard part is the race this opens up: bytes can
//! land in the old file between the moment the tailer saw "no more data" and
//! the moment it noticed a replacement exists. [`PollWatcher`] closes that
//! window by re-checking the drained file's size before adopting the
//! replacement, so nothing written before the switch is lost.
//!
//! This is a polling design on purpose. It needs nothing from the host
//! beyond stat (with an inode-like id), seek, and atomic rename, which keeps
//! it working on filesystems where native change notification is unreliable.
//!
//! Truncation in place is not supported; rotate instead.
//!
//! # Example
//!
//! ```rust,no_run
//! use rotail::{Config, LineReader};
//!
//! fn main() -> rotail::Result<()> {
//!     let mut reader = LineReader::new(Config::new("app.log"), None)?;
//!
//!     while reader.next() {
//!         println!("{}", String::from_utf8_lossy(reader.bytes()));
//!     }
//!
//!     if let Some(err) = reader.err() {
//!         eprintln!("tail stopped: {err}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Checkpointed resume: persist [`LineReader::file_state`] after each record
//! (it serializes as JSON with string-encoded integers) and hand it back as
//! [`Config::start_state`] to continue with the record after the last one
//! consumed.

pub mod config;
pub mod error;
pub mod file_state;
pub mod reader;
pub mod watcher;

#[cfg(test)]
mod testutil;

pub use config::{Config, Whence};
pub use error::{Error, Result};
pub use file_state::FileState;
pub use reader::{ErrorHandler, LineReader};
pub use watcher::{Closer, PollWatcher, WaitStatus};
