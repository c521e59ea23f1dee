// SPDX-License-Identifier: Apache-2.0

//! Poll-driven rotation watcher.
//!
//! [`PollWatcher`] owns at most one open handle on the tailed path and
//! decides when the handle is fully drained and a replacement on disk should
//! be adopted. It never uses OS notification APIs; a stat per poll tick on
//! the handle and on the path is all it needs, which keeps it portable to
//! any filesystem that exposes an inode, a size, and rename.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::config::{Config, Whence};
use crate::error::Result;
use crate::file_state::FileState;

/// One-shot cancellation signal shared between a watcher and any thread that
/// needs to shut it down.
///
/// Cloning is cheap; all clones observe the same signal. Closing is
/// idempotent and write-once. A watcher blocked in
/// [`wait`](PollWatcher::wait) notices the signal during its poll sleep and
/// returns promptly.
#[derive(Clone)]
pub struct Closer {
    tx: Arc<Mutex<Option<flume::Sender<()>>>>,
    rx: flume::Receiver<()>,
}

impl Closer {
    fn new() -> Self {
        let (tx, rx) = flume::bounded::<()>(0);
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
            rx,
        }
    }

    /// Signal cancellation. Safe to call from any thread, any number of
    /// times.
    pub fn close(&self) {
        let mut slot = match self.tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.take();
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.rx.try_recv(), Err(flume::TryRecvError::Disconnected))
    }

    /// Sleep for `timeout`, or less if cancellation arrives. Returns false
    /// once the signal has fired. A zero timeout is a plain cancellation
    /// check.
    pub(crate) fn sleep(&self, timeout: Duration) -> bool {
        if timeout.is_zero() {
            return !self.is_closed();
        }

        match self.rx.recv_timeout(timeout) {
            Err(flume::RecvTimeoutError::Timeout) => true,
            Ok(()) | Err(flume::RecvTimeoutError::Disconnected) => false,
        }
    }
}

/// Read access to the watcher's current handle that can outlive a single
/// [`PollWatcher::wait`] call. Reads advance the shared descriptor offset,
/// which is exactly what keeps the watcher's position accounting truthful.
pub(crate) struct SharedFile(Arc<File>);

impl Read for SharedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut handle: &File = &self.0;
        handle.read(buf)
    }
}

/// What [`PollWatcher::wait`] unblocked with.
pub struct WaitStatus<'a> {
    /// Identity of the handle at the instant the watcher unblocked.
    pub state: FileState,

    /// True iff this status reflects a file the watcher just opened (first
    /// open, or after a rotation), rather than growth on the current one.
    pub reopened: bool,

    file: &'a Arc<File>,
}

impl<'a> WaitStatus<'a> {
    /// The watcher's open handle. Read from it freely, but treat it as a
    /// short-lived borrow: the watcher may close it inside the next `wait`,
    /// and seeking it breaks position accounting.
    pub fn file(&self) -> &'a File {
        self.file
    }

    pub(crate) fn shared(&self) -> SharedFile {
        SharedFile(Arc::clone(self.file))
    }
}

enum WatchState {
    /// No handle open; the path may not even exist yet.
    Unopened,
    /// A handle is open and being drained.
    Tracking { file: Arc<File> },
}

enum Step {
    Ready { state: FileState, reopened: bool },
    Idle,
}

/// Rotation-aware watcher for a single regular file.
///
/// `wait` blocks until the tailed file has unread bytes, returning a handle
/// positioned at the first of them. When the file is renamed aside and
/// replaced, the watcher keeps returning the old handle until every byte
/// written to it has been consumed, then adopts the replacement. Bytes that
/// land in the old file after the replacement already exists are still
/// delivered first; that ordering is the reason for the second size check in
/// the poll loop.
pub struct PollWatcher {
    path: PathBuf,
    interval: Duration,
    whence: Whence,
    start_state: Option<FileState>,
    state: WatchState,
    closer: Closer,
    closed: bool,
}

impl PollWatcher {
    /// Validate `config` and build a watcher. No filesystem access happens
    /// here; the path is first touched inside [`wait`](Self::wait).
    pub fn new(config: Config) -> Result<Self> {
        let config = config.normalized()?;

        Ok(Self {
            path: config.path,
            interval: config.interval,
            whence: config.whence,
            start_state: config.start_state,
            state: WatchState::Unopened,
            closer: Closer::new(),
            closed: false,
        })
    }

    /// A cancellation handle for shutting this watcher down from another
    /// thread while `wait` is blocked.
    pub fn closer(&self) -> Closer {
        self.closer.clone()
    }

    /// Block until the tailed file is readable, the watcher is closed, or an
    /// error is observed.
    ///
    /// Returns `Ok(None)` once closed. Not-found on the tailed path is never
    /// surfaced; the watcher keeps polling until the file appears. Any other
    /// open/stat/seek error is returned exactly once, with the watcher state
    /// retained, so calling `wait` again retries from where it left off.
    pub fn wait(&mut self) -> Result<Option<WaitStatus<'_>>> {
        loop {
            if self.closed || !self.closer.sleep(self.interval) {
                self.closed = true;
                self.state = WatchState::Unopened;
                return Ok(None);
            }

            let step = match self.state {
                WatchState::Unopened => self.poll_unopened()?,
                WatchState::Tracking { .. } => self.poll_tracking()?,
            };

            let (state, reopened) = match step {
                Step::Idle => continue,
                Step::Ready { state, reopened } => (state, reopened),
            };

            let WatchState::Tracking { ref file } = self.state else {
                continue;
            };
            return Ok(Some(WaitStatus {
                state,
                reopened,
                file,
            }));
        }
    }

    /// Signal cancellation and release the owned handle. Idempotent; any
    /// in-flight `wait` on another thread returns promptly via the shared
    /// [`Closer`].
    pub fn close(&mut self) -> Result<()> {
        self.closer.close();
        self.closed = true;
        self.state = WatchState::Unopened;
        Ok(())
    }

    fn poll_unopened(&mut self) -> Result<Step> {
        let file = match self.open_first() {
            Ok(file) => file,
            Err(e) if e.is_not_found() => {
                // A whence configured for a file that never existed is
                // stale; later opens anchor at the start.
                self.whence = Whence::Start;
                return Ok(Step::Idle);
            }
            Err(e) => return Err(e),
        };

        let state = FileState::from_file(&file)?;
        debug!("opened {:?} at position {}", self.path, state.position);

        self.state = WatchState::Tracking {
            file: Arc::new(file),
        };

        Ok(Step::Ready {
            state,
            reopened: true,
        })
    }

    fn poll_tracking(&mut self) -> Result<Step> {
        let WatchState::Tracking { ref file } = self.state else {
            return Ok(Step::Idle);
        };

        let state = FileState::from_file(file)?;
        if state.size > state.position {
            return Ok(Step::Ready {
                state,
                reopened: false,
            });
        }

        match FileState::from_path(&self.path) {
            // The file was unlinked without a replacement; keep draining
            // the handle we have.
            Err(e) if e.is_not_found() => return Ok(Step::Idle),
            Err(e) => return Err(e),
            // Same file still at the path, nothing rotated.
            Ok(named) if named.inode == state.inode => return Ok(Step::Idle),
            Ok(_) => {}
        }

        // A replacement exists at the path. Bytes could have landed in the
        // open file between the size check above and the stat, so check the
        // size once more before letting go of the old handle.
        let state = FileState::from_file(file)?;
        if state.size > state.position {
            debug!(
                "replacement for {:?} exists, {} bytes left in the old file",
                self.path,
                state.size - state.position
            );
            return Ok(Step::Ready {
                state,
                reopened: false,
            });
        }

        debug!(
            "rotated file {:?} drained at {} bytes, adopting replacement",
            self.path, state.position
        );
        self.state = WatchState::Unopened;
        Ok(Step::Idle)
    }

    /// Open the tailed path and apply the one-shot first-open policy:
    /// `start_state` resume if configured, otherwise the configured whence.
    /// Both collapse to `Start` once honored.
    fn open_first(&mut self) -> Result<File> {
        let file = File::open(&self.path)?;

        if let Some(resume) = self.start_state.as_ref() {
            let (_, matched) = resume.seek_if_matches(&file)?;
            debug!(
                "resume state {} for {:?} {}",
                resume,
                self.path,
                if matched { "matched" } else { "declined" }
            );

            self.start_state = None;
            self.whence = Whence::Start;
            return Ok(file);
        }

        if let Whence::End = self.whence {
            let mut handle = &file;
            handle.seek(SeekFrom::End(0))?;
        }
        // Current is equivalent to Start here: a freshly opened descriptor
        // is already at offset zero.
        self.whence = Whence::Start;

        Ok(file)
    }
}
