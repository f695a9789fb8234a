use camino::Utf8Path;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use dsync::EntryKind;
use futures::future::BoxFuture;

use crate::{stubs::drive, utils};

/// Reference time of the datasets.
/// Carries sub-millisecond digits so that precision handling is exercised.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 14, 15, 9, 26).unwrap() + TimeDelta::nanoseconds(535_897_932)
}

/// `base_time()` shifted by `secs` seconds
pub fn at(secs: i64) -> DateTime<Utc> {
    base_time() + TimeDelta::seconds(secs)
}

#[derive(Debug, Copy, Clone)]
pub enum Entry {
    Dir {
        /// Name of the directory
        name: &'static str,
        /// Entries of the directory
        entries: &'static [Entry],
    },
    File {
        /// Name of the file
        name: &'static str,
        /// Content of the file
        content: &'static str,
        /// Modification time, in seconds from `base_time()`
        time: i64,
    },
    /// Native document, remote only
    Doc { name: &'static str },
    /// Shortcut remotely, symlink locally
    Link { name: &'static str },
}

/// Tree of the local side
#[rustfmt::skip]
pub const LOCAL: &[Entry] = &[
    Entry::Dir{name: "Documents", entries: &[
        Entry::File{name: "both.txt", content: "both", time: 0},
        Entry::File{name: "local-newer.txt", content: "local-newer - local", time: 10},
        Entry::File{name: "remote-newer.txt", content: "remote-newer - local", time: 0},
        Entry::File{name: "only-local.txt", content: "only-local", time: 0},
        Entry::File{name: "mismatch", content: "file locally", time: 0},
        Entry::Dir{name: "both", entries: &[
            Entry::File{name: "deep.txt", content: "both/deep", time: 0},
        ]},
        Entry::Dir{name: "only-local", entries: &[
            Entry::File{name: "file1.txt", content: "only-local/file1", time: 0},
            Entry::Dir{name: "deep", entries: &[
                Entry::File{name: "file2.txt", content: "only-local/deep/file2", time: 0},
            ]},
        ]},
    ]},
];

/// Tree of the remote side
#[rustfmt::skip]
pub const REMOTE: &[Entry] = &[
    Entry::Dir{name: "Documents", entries: &[
        Entry::File{name: "both.txt", content: "both", time: 0},
        Entry::File{name: "local-newer.txt", content: "local-newer - remote", time: 0},
        Entry::File{name: "remote-newer.txt", content: "remote-newer - remote", time: 10},
        Entry::File{name: "only-remote.txt", content: "only-remote", time: 0},
        Entry::Dir{name: "mismatch", entries: &[]},
        Entry::Doc{name: "Budget"},
        Entry::Dir{name: "both", entries: &[
            Entry::File{name: "deep.txt", content: "both/deep", time: 0},
        ]},
        Entry::Dir{name: "only-remote", entries: &[
            Entry::File{name: "file1.txt", content: "only-remote/file1", time: 0},
            Entry::Dir{name: "deep", entries: &[
                Entry::File{name: "file2.txt", content: "only-remote/deep/file2", time: 0},
            ]},
        ]},
    ]},
];

/// Creates `entries` under the existing local directory `dir`
pub fn create_local<'a>(dir: &'a Utf8Path, entries: &'static [Entry]) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        for entry in entries {
            match *entry {
                Entry::Dir { name, entries } => {
                    let path = dir.join(name);
                    tokio::fs::create_dir(&path).await.unwrap();
                    create_local(&path, entries).await;
                }
                Entry::File { name, content, time } => {
                    utils::write_file(&dir.join(name), content, at(time)).await;
                }
                Entry::Doc { .. } => (),
                #[cfg(unix)]
                Entry::Link { name } => {
                    std::os::unix::fs::symlink("/dev/null", dir.join(name)).unwrap();
                }
                #[cfg(not(unix))]
                Entry::Link { .. } => (),
            }
        }
    })
}

/// Creates `entries` in the folder at `dir` of the drive stub ("" for the root)
pub fn create_remote(drive: &drive::Stub, dir: &str, entries: &'static [Entry]) {
    for entry in entries {
        let path = |name: &str| {
            if dir.is_empty() {
                name.to_string()
            } else {
                format!("{dir}/{name}")
            }
        };
        match *entry {
            Entry::Dir { name, entries } => {
                drive.add(dir, name, EntryKind::Directory, base_time(), "");
                create_remote(drive, &path(name), entries);
            }
            Entry::File { name, content, time } => {
                drive.add(dir, name, EntryKind::Regular, at(time), content);
            }
            Entry::Doc { name } => {
                drive.add(dir, name, EntryKind::Special, base_time(), "");
            }
            Entry::Link { name } => {
                drive.add(dir, name, EntryKind::Symlink, base_time(), "");
            }
        }
    }
}
