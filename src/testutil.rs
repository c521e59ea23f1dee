// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for exercising rotation against a real filesystem.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A tailed path inside a scratch directory, with the rename-aside rotation
/// scheme log rotators use (`log` -> `log.1`, `log.2`, ...).
pub(crate) struct RotateHarness {
    _dir: TempDir,
    path: PathBuf,
    rotations: usize,
}

impl RotateHarness {
    pub fn new(name: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(name);
        Self {
            _dir: dir,
            path,
            rotations: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the live file, failing if it already exists.
    pub fn create(&self) -> File {
        OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(&self.path)
            .unwrap()
    }

    /// Rename the live file aside without creating a replacement.
    pub fn rotate(&mut self) {
        self.rotations += 1;
        let aside = self.path.with_extension(self.rotations.to_string());
        fs::rename(&self.path, aside).unwrap();
    }

    /// Append to whichever file currently lives at the path.
    pub fn append(&self, bytes: &[u8]) {
        let mut file = OpenOptions::new().append(true).open(&self.path).unwrap();
        file.write_all(bytes).unwrap();
    }
}

/// Read exactly `len` bytes and return them as a string.
pub(crate) fn read_string(mut reader: impl Read, len: usize) -> String {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}
