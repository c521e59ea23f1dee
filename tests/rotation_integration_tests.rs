// SPDX-License-Identifier: Apache-2.0

//! End-to-end checks of the public surface against a real filesystem.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use rotail::{Config, FileState, LineReader};
use tempfile::TempDir;

fn config(path: &Path) -> Config {
    Config {
        interval: Duration::from_millis(25),
        ..Config::new(path)
    }
}

#[test]
fn delivers_every_line_across_repeated_rotations() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");

    let mut reader = LineReader::new(config(&path), None).unwrap();
    let mut expected = Vec::new();
    let mut collected = Vec::new();

    for generation in 0..3 {
        let mut writer = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)
            .unwrap();
        for i in 0..4 {
            let line = format!("gen{generation}-line{i}");
            writeln!(writer, "{line}").unwrap();
            expected.push(line);
        }
        drop(writer);

        for _ in 0..4 {
            assert!(reader.next());
            collected.push(String::from_utf8(reader.bytes().to_vec()).unwrap());
        }

        fs::rename(&path, dir.path().join(format!("app.log.{generation}"))).unwrap();
    }

    assert_eq!(collected, expected);
    reader.close().unwrap();
}

#[test]
fn checkpoint_survives_json_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, b"alpha\nbeta\ngamma\n").unwrap();

    let mut reader = LineReader::new(config(&path), None).unwrap();
    assert!(reader.next());
    assert_eq!(reader.bytes(), b"alpha");
    assert!(reader.next());
    assert_eq!(reader.bytes(), b"beta");
    reader.close().unwrap();

    let json = serde_json::to_string(&reader.file_state()).unwrap();

    let checkpoint: FileState = serde_json::from_str(&json).unwrap();
    assert_eq!(checkpoint.position, 11);

    let mut reader = LineReader::new(
        Config {
            start_state: Some(checkpoint),
            stop_at_eof: true,
            ..config(&path)
        },
        None,
    )
    .unwrap();

    assert!(reader.next());
    assert_eq!(reader.bytes(), b"gamma");
    assert_eq!(reader.file_state().position, 17);

    assert!(!reader.next());
    reader.close().unwrap();
}

#[test]
fn bytes_written_after_replacement_exists_are_not_skipped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");

    let mut writer = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&path)
        .unwrap();
    writeln!(writer, "before").unwrap();

    let mut reader = LineReader::new(config(&path), None).unwrap();
    assert!(reader.next());
    assert_eq!(reader.bytes(), b"before");

    // Rotate, create the replacement with content, then write one more
    // line into the rotated-away file through the still-open descriptor.
    fs::rename(&path, dir.path().join("app.log.1")).unwrap();
    fs::write(&path, b"after\n").unwrap();
    writeln!(writer, "straggler").unwrap();
    drop(writer);

    assert!(reader.next());
    assert_eq!(reader.bytes(), b"straggler");

    assert!(reader.next());
    assert_eq!(reader.bytes(), b"after");

    reader.close().unwrap();
}
