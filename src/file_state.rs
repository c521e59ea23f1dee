// SPDX-License-Identifier: Apache-2.0

//! File identity snapshots for rotation detection and checkpointed resume.
//!
//! A [`FileState`] pairs the inode of a file with its size and a descriptor
//! position. The inode distinguishes a renamed original from its freshly
//! created replacement, and the size acts as a sanity check against inode
//! reuse. The position makes the snapshot usable as a resume checkpoint.

use std::fs::{self, File};
use std::io::{Seek, SeekFrom};
use std::path::Path;

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

/// A snapshot of a regular file's identity and a read position within it.
///
/// The serialized form encodes every field as a decimal string so checkpoints
/// survive JSON consumers that clamp large integers to floating point. Field
/// names are matched case-insensitively on input, so checkpoints written by
/// implementations that capitalize them deserialize cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileState {
    /// Byte length of the file at observation time.
    #[serde(serialize_with = "string_int::serialize")]
    pub size: u64,

    /// Byte offset of a descriptor into the file; zero for snapshots taken
    /// by path.
    #[serde(serialize_with = "string_int::serialize")]
    pub position: u64,

    /// OS-assigned identifier of the file on its filesystem, stable across
    /// renames.
    #[serde(serialize_with = "string_int::serialize")]
    pub inode: u64,
}

impl FileState {
    /// Snapshot an open handle: inode and size from its metadata, position
    /// from its current offset. The offset is read without being modified.
    #[cfg(unix)]
    pub fn from_file(file: &File) -> Result<Self> {
        use std::os::unix::fs::MetadataExt;

        let metadata = file.metadata()?;

        let mut handle = file;
        let position = handle.stream_position()?;

        Ok(Self {
            size: metadata.len(),
            position,
            inode: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    pub fn from_file(file: &File) -> Result<Self> {
        let _ = file;
        Err(crate::error::Error::IdentityUnsupported)
    }

    /// Snapshot a path without holding a descriptor; the position is zero.
    #[cfg(unix)]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        use std::os::unix::fs::MetadataExt;

        let metadata = fs::metadata(path)?;

        Ok(Self {
            size: metadata.len(),
            position: 0,
            inode: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let _ = path;
        Err(crate::error::Error::IdentityUnsupported)
    }

    /// Try to determine whether this snapshot describes `file`, and if so,
    /// seek `file` to the recorded position.
    ///
    /// A match requires the same inode and a file at least as large as the
    /// recorded position. The size requirement guards against a reused inode
    /// (and against truncation, which this crate does not support) being
    /// mistaken for the original file. On a mismatch the handle is left
    /// untouched.
    ///
    /// The returned snapshot always describes `file`; on a match its position
    /// reflects the post-seek offset.
    pub fn seek_if_matches(&self, file: &File) -> Result<(FileState, bool)> {
        let mut new_state = FileState::from_file(file)?;

        if self.inode != new_state.inode {
            return Ok((new_state, false));
        }

        if self.position > new_state.size {
            return Ok((new_state, false));
        }

        let mut handle = file;
        new_state.position = handle.seek(SeekFrom::Start(self.position))?;

        Ok((new_state, true))
    }
}

impl std::fmt::Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}/{}", self.inode, self.position, self.size)
    }
}

impl<'de> Deserialize<'de> for FileState {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FileStateVisitor;

        impl<'de> Visitor<'de> for FileStateVisitor {
            type Value = FileState;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a map with size, position, and inode as decimal strings")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<FileState, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut size = None;
                let mut position = None;
                let mut inode = None;

                while let Some(key) = map.next_key::<String>()? {
                    let slot = match key.to_ascii_lowercase().as_str() {
                        "size" => &mut size,
                        "position" => &mut position,
                        "inode" => &mut inode,
                        _ => {
                            map.next_value::<IgnoredAny>()?;
                            continue;
                        }
                    };

                    if slot.is_some() {
                        return Err(de::Error::custom(format_args!("duplicate field `{key}`")));
                    }

                    let value = map.next_value::<String>()?;
                    *slot = Some(value.parse::<u64>().map_err(de::Error::custom)?);
                }

                Ok(FileState {
                    size: size.ok_or_else(|| de::Error::missing_field("size"))?,
                    position: position.ok_or_else(|| de::Error::missing_field("position"))?,
                    inode: inode.ok_or_else(|| de::Error::missing_field("inode"))?,
                })
            }
        }

        deserializer.deserialize_struct("FileState", &["size", "position", "inode"], FileStateVisitor)
    }
}

mod string_int {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }
}
