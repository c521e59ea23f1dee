//! Line-oriented reading across file rotations.

use std::io::{BufRead, BufReader};
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::file_state::FileState;
use crate::watcher::{Closer, PollWatcher, SharedFile};

/// Backoff applied after an error has been surfaced to the handler.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Decides whether an error terminates the reader.
///
/// Invoked with every unexpected read or watcher error. Returning `Some`
/// records the error as terminal and makes subsequent [`LineReader::next`]
/// calls return false; returning `None` means "recovered, keep going".
pub type ErrorHandler = Box<dyn FnMut(Error) -> Option<Error> + Send>;

/// Reads `\n` or `\r\n` delimited records transparently across multiple
/// files as the underlying path is rotated.
///
/// After each record, [`file_state`](Self::file_state) points at the start
/// of the next line, so persisting it and handing it back as
/// [`Config::start_state`] resumes exactly where reading stopped.
///
/// Only [`Closer::close`] on the handle from [`closer`](Self::closer) is
/// safe to use from another thread while `next` is in flight.
pub struct LineReader {
    watcher: PollWatcher,
    on_err: ErrorHandler,
    interval: Duration,
    stop_at_eof: bool,
    closer: Closer,

    buf: Option<BufReader<SharedFile>>,
    state: FileState,
    record: Vec<u8>,
    err: Option<Error>,
}

impl LineReader {
    /// Build a reader over a watcher created from `config`. Unexpected
    /// errors run through `handler`; `None` installs a handler that discards
    /// every error and retries forever.
    pub fn new(config: Config, handler: Option<ErrorHandler>) -> Result<Self> {
        let config = config.normalized()?;
        let interval = config.interval;
        let stop_at_eof = config.stop_at_eof;

        let watcher = PollWatcher::new(config)?;
        let closer = watcher.closer();

        Ok(Self {
            watcher,
            on_err: handler.unwrap_or_else(|| Box::new(|_| None)),
            interval,
            stop_at_eof,
            closer,
            buf: None,
            state: FileState::default(),
            record: Vec::new(),
            err: None,
        })
    }

    /// Advance to the next record. Returns false when the reader is closed
    /// or a terminal error was recorded; [`err`](Self::err) tells which.
    pub fn next(&mut self) -> bool {
        let mut sleep_time = Duration::ZERO;

        self.record.clear();

        loop {
            if self.err.is_some() || !self.closer.sleep(sleep_time) {
                return false;
            }

            sleep_time = self.interval;

            let wait_for_more = match self.buf.as_mut() {
                None => true,
                Some(buf) => {
                    let len_before = self.record.len();
                    match buf.read_until(b'\n', &mut self.record) {
                        Ok(n) => {
                            self.state.position += n as u64;

                            if self.record.last() == Some(&b'\n') {
                                break;
                            }

                            // End of file, possibly mid-line; the partial
                            // bytes stay in the record until the rest
                            // arrives.
                            if self.stop_at_eof {
                                self.err = Some(Error::EndOfStream);
                                continue;
                            }
                            true
                        }
                        Err(e) => {
                            // read_until appends whatever it pulled off the
                            // stream before failing; those bytes count
                            // toward the position like any others.
                            self.state.position += (self.record.len() - len_before) as u64;
                            self.err = (self.on_err)(Error::Io(e));
                            sleep_time = ERROR_BACKOFF;
                            continue;
                        }
                    }
                }
            };

            if wait_for_more {
                match self.watcher.wait() {
                    Ok(None) => return false,
                    Err(e) => {
                        self.err = (self.on_err)(e);
                        sleep_time = ERROR_BACKOFF;
                    }
                    Ok(Some(status)) => {
                        self.state = status.state;
                        if status.reopened {
                            self.buf = Some(BufReader::new(status.shared()));
                        }
                    }
                }
            }
        }

        // The record ends with \n here; strip it, and a preceding \r with it.
        self.record.pop();
        if self.record.last() == Some(&b'\r') {
            self.record.pop();
        }

        true
    }

    /// The current record, without its delimiter. Valid until the next call
    /// to [`next`](Self::next) or [`close`](Self::close).
    pub fn bytes(&self) -> &[u8] {
        &self.record
    }

    /// The terminal error, if `next` returned false for a reason other than
    /// close.
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Identity and position of the underlying file after the last record,
    /// suitable for checkpointing. The position includes the delimiter
    /// bytes, pointing at the start of the next line.
    pub fn file_state(&self) -> FileState {
        self.state
    }

    /// A cancellation handle for stopping this reader from another thread.
    pub fn closer(&self) -> Closer {
        self.closer.clone()
    }

    /// Stop the reader and close the underlying watcher. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        self.watcher.close()
    }
}
