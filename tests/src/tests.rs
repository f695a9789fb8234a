use std::collections::BTreeMap;

use chrono::TimeDelta;
use dsync::{Direction, EntryKind, Event, Outcome, Precision, SkipReason};

use crate::dataset::{at, Entry, LOCAL, REMOTE};
use crate::{harness, harness_with};

const DOCS: &str = "Documents";

fn pulled(path: &str, kind: EntryKind) -> Event {
    Event::Pulled {
        path: path.into(),
        kind,
    }
}

fn pushed(path: &str, kind: EntryKind) -> Event {
    Event::Pushed {
        path: path.into(),
        kind,
    }
}

fn skipped(path: &str, reason: SkipReason) -> Event {
    Event::Skipped {
        path: path.into(),
        reason,
    }
}

#[tokio::test]
async fn sync_both_directions() {
    let h = harness(LOCAL, REMOTE).await;

    let report = h.run().await;
    let docs = report.mapping(DOCS).unwrap();
    assert_eq!(docs.local_dir.as_deref(), Some(h.local_path(DOCS).as_path()));
    assert_eq!(docs.outcome, Outcome::SynchronizedWithSkips);
    assert_eq!(docs.stats.pulled, 6);
    assert_eq!(docs.stats.pushed, 6);
    assert_eq!(docs.stats.up_to_date, 2);
    assert_eq!(docs.stats.skipped, 2);
    assert_eq!(docs.stats.errors, 0);

    let events = h.events();
    assert!(events.contains(&pulled("remote-newer.txt", EntryKind::Regular)));
    assert!(events.contains(&pulled("only-remote/deep/file2.txt", EntryKind::Regular)));
    assert!(events.contains(&pushed("local-newer.txt", EntryKind::Regular)));
    assert!(events.contains(&pushed("only-local/deep", EntryKind::Directory)));
    assert!(events.contains(&skipped("both.txt", SkipReason::UpToDate)));
    assert!(events.contains(&skipped("Budget", SkipReason::NotDownloadable)));

    assert_eq!(
        h.local_content("Documents/only-remote/deep/file2.txt").await.as_deref(),
        Some("only-remote/deep/file2")
    );
    assert_eq!(
        h.remote.content("Documents/only-local/deep/file2.txt").as_deref(),
        Some("only-local/deep/file2")
    );
    assert!(!h.local_exists("Documents/Budget"));
}

#[tokio::test]
async fn second_run_transfers_nothing() {
    let h = harness(LOCAL, REMOTE).await;

    let first = h.run().await;
    assert!(first.total().transfers() > 0);
    let (uploads, downloads, mkdirs) = (h.remote.uploads(), h.remote.downloads(), h.remote.mkdirs());

    let second = h.run().await;
    let total = second.total();
    assert_eq!(total.transfers(), 0);
    assert_eq!(total.errors, 0);
    assert!(h.events().iter().all(|ev| !ev.is_transfer()));
    assert_eq!(h.remote.uploads(), uploads);
    assert_eq!(h.remote.downloads(), downloads);
    assert_eq!(h.remote.mkdirs(), mkdirs);
}

#[tokio::test]
async fn newer_side_wins() {
    let h = harness(LOCAL, REMOTE).await;
    h.run().await;

    assert_eq!(
        h.remote.content("Documents/local-newer.txt").as_deref(),
        Some("local-newer - local")
    );
    assert_eq!(
        h.local_content("Documents/local-newer.txt").await.as_deref(),
        Some("local-newer - local")
    );
    assert_eq!(
        h.local_content("Documents/remote-newer.txt").await.as_deref(),
        Some("remote-newer - remote")
    );
    assert_eq!(
        h.remote.content("Documents/remote-newer.txt").as_deref(),
        Some("remote-newer - remote")
    );

    assert_eq!(
        h.events_of("local-newer.txt"),
        vec![pushed("local-newer.txt", EntryKind::Regular)]
    );
    assert_eq!(
        h.events_of("remote-newer.txt"),
        vec![pulled("remote-newer.txt", EntryKind::Regular)]
    );
}

#[tokio::test]
async fn transfers_carry_modification_time() {
    let h = harness(LOCAL, REMOTE).await;
    h.run().await;

    let ms = Precision::Millisecond;
    assert_eq!(h.local_mtime("Documents/remote-newer.txt").await, ms.truncate(at(10)));
    assert_eq!(
        h.remote.mtime("Documents/local-newer.txt"),
        Some(ms.truncate(at(10)))
    );
}

#[tokio::test]
async fn equal_times_ignore_content() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[
        Entry::Dir{name: "Notes", entries: &[
            Entry::File{name: "todo.txt", content: "local todo", time: 0},
        ]},
    ];
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[
        Entry::Dir{name: "Notes", entries: &[
            Entry::File{name: "todo.txt", content: "remote todo", time: 0},
        ]},
    ];

    let h = harness(LOCAL, REMOTE).await;
    let report = h.run().await;

    assert_eq!(report.total().transfers(), 0);
    assert_eq!(report.mapping("Notes").unwrap().outcome, Outcome::Synchronized);
    assert_eq!(h.skip_reason("todo.txt"), Some(SkipReason::UpToDate));
    assert_eq!(h.local_content("Notes/todo.txt").await.as_deref(), Some("local todo"));
    assert_eq!(h.remote.content("Notes/todo.txt").as_deref(), Some("remote todo"));
}

#[tokio::test]
async fn times_compare_at_coarser_precision() {
    #[rustfmt::skip]
    const TREE: &[Entry] = &[Entry::Dir{name: "Notes", entries: &[]}];

    let h = harness_with(TREE, TREE, Precision::Second).await;
    // same second, different sub-second digits
    h.write_local("Notes/same.txt", "local", at(0)).await;
    h.remote.add(
        "Notes",
        "same.txt",
        EntryKind::Regular,
        at(0) + TimeDelta::milliseconds(300),
        "remote",
    );
    h.write_local("Notes/later.txt", "local", at(1)).await;
    h.remote.add("Notes", "later.txt", EntryKind::Regular, at(0), "remote");

    h.run().await;

    assert_eq!(h.skip_reason("same.txt"), Some(SkipReason::UpToDate));
    assert_eq!(h.remote.content("Notes/same.txt").as_deref(), Some("remote"));
    assert_eq!(h.remote.content("Notes/later.txt").as_deref(), Some("local"));
}

#[tokio::test]
async fn millisecond_difference_counts_at_nanosecond_precision() {
    #[rustfmt::skip]
    const TREE: &[Entry] = &[Entry::Dir{name: "Notes", entries: &[]}];

    let h = harness_with(TREE, TREE, Precision::Nanosecond).await;
    h.write_local("Notes/a.txt", "local", at(0) + TimeDelta::milliseconds(1)).await;
    h.remote.add("Notes", "a.txt", EntryKind::Regular, at(0), "remote");

    h.run().await;

    assert_eq!(h.events_of("a.txt"), vec![pushed("a.txt", EntryKind::Regular)]);
    assert_eq!(h.remote.content("Notes/a.txt").as_deref(), Some("local"));
}

#[tokio::test]
async fn blacklisted_entries_are_never_transferred() {
    let mut h = harness(LOCAL, REMOTE).await;
    h.config.blacklist = vec!["only-remote".into(), "only-local.txt".into()];
    h.config.ignore = vec!["only-local*".into(), "*-newer.txt".into()];

    let report = h.run().await;

    assert_eq!(report.mapping(DOCS).unwrap().stats.errors, 0);
    assert!(!h.local_exists("Documents/only-remote"));
    assert_eq!(h.remote.kind("Documents/only-local"), None);
    assert_eq!(h.remote.kind("Documents/only-local.txt"), None);
    assert_eq!(
        h.remote.content("Documents/local-newer.txt").as_deref(),
        Some("local-newer - remote")
    );
    let excluded = |path: &str| {
        path == "only-remote"
            || path.starts_with("only-remote/")
            || path.starts_with("only-local")
            || path.ends_with("-newer.txt")
    };
    for ev in h.events() {
        assert!(!excluded(ev.path().as_str()), "{ev}");
    }
    // still synchronized
    assert!(h.local_exists("Documents/only-remote.txt"));
}

#[tokio::test]
async fn ignore_patterns_can_fold_case() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[
        Entry::Dir{name: "Photos", entries: &[
            Entry::File{name: "tmp.psd", content: "layers", time: 0},
            Entry::File{name: "cat.jpg", content: "meow", time: 0},
        ]},
    ];
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[Entry::Dir{name: "Photos", entries: &[]}];

    let mut h = harness(LOCAL, REMOTE).await;
    h.config.ignore = vec!["*.PSD".into()];
    h.config.case_sensitive = false;

    h.run().await;

    assert_eq!(h.remote.children_names("Photos"), vec!["cat.jpg".to_string()]);
}

#[tokio::test]
async fn directories_are_created_once() {
    let mut h = harness(LOCAL, REMOTE).await;

    h.run_with(Direction::Push).await;
    h.run_with(Direction::Push).await;
    h.run_with(Direction::Both).await;

    assert_eq!(h.remote.count(DOCS, "only-local"), 1);
    assert_eq!(h.remote.count("Documents/only-local", "deep"), 1);
    assert_eq!(h.remote.count("", DOCS), 1);
}

#[tokio::test]
async fn make_directory_twice_yields_one_folder() {
    use drivesync::storage::MkDir;

    let h = harness(LOCAL, REMOTE).await;
    let root = h.remote.root_entry();

    let first = h.remote.make_directory(&root, "Music").await.unwrap();
    let second = h.remote.make_directory(&root, "Music").await.unwrap();
    assert_eq!(first.handle(), second.handle());
    assert_eq!(h.remote.count("", "Music"), 1);

    let docs = drivesync::storage::LocalStorage::entry(&h.local, &h.local_path(DOCS))
        .await
        .unwrap();
    let first = h.local.make_directory(&docs, "Music").await.unwrap();
    let second = h.local.make_directory(&docs, "Music").await.unwrap();
    assert_eq!(first.handle(), second.handle());
    assert!(h.local_is_dir("Documents/Music"));
}

#[tokio::test]
async fn kind_mismatch_is_left_alone() {
    let mut h = harness(LOCAL, REMOTE).await;

    for direction in [Direction::Pull, Direction::Push, Direction::Both] {
        h.run_with(direction).await;
        assert_eq!(h.skip_reason("mismatch"), Some(SkipReason::KindMismatch));
        assert_eq!(
            h.local_content("Documents/mismatch").await.as_deref(),
            Some("file locally")
        );
        assert_eq!(h.remote.kind("Documents/mismatch"), Some(EntryKind::Directory));
    }
}

#[tokio::test]
async fn newer_local_file_is_held_back_when_pushing_is_disabled() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[
        Entry::Dir{name: "docs", entries: &[
            Entry::File{name: "report.txt", content: "local report", time: 10},
        ]},
    ];
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[
        Entry::Dir{name: "docs", entries: &[
            Entry::File{name: "report.txt", content: "remote report", time: 0},
        ]},
    ];

    let mut h = harness(LOCAL, REMOTE).await;
    let report = h.run_with(Direction::Pull).await;

    assert_eq!(
        h.events(),
        vec![skipped("report.txt", SkipReason::PushDisabled)]
    );
    let docs = report.mapping("docs").unwrap();
    assert_eq!(docs.stats.held_back, 1);
    assert_eq!(docs.outcome, Outcome::Synchronized);
    assert_eq!(h.local_content("docs/report.txt").await.as_deref(), Some("local report"));
    assert_eq!(h.remote.content("docs/report.txt").as_deref(), Some("remote report"));
    assert_eq!(h.remote.uploads(), 0);
    assert_eq!(h.remote.downloads(), 0);
}

#[tokio::test]
async fn remote_directory_is_pulled_recursively() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[Entry::Dir{name: "Pictures", entries: &[]}];
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[
        Entry::Dir{name: "Pictures", entries: &[
            Entry::Dir{name: "Photos", entries: &[
                Entry::File{name: "cat.jpg", content: "meow", time: 0},
                Entry::File{name: "Thumbs.db", content: "cache", time: 0},
                Entry::Dir{name: "2023", entries: &[
                    Entry::File{name: "dog.jpg", content: "woof", time: 0},
                    Entry::Dir{name: "empty", entries: &[]},
                ]},
            ]},
        ]},
    ];

    let mut h = harness(LOCAL, REMOTE).await;
    h.config.blacklist = vec!["Thumbs.db".into()];
    let report = h.run_with(Direction::Pull).await;

    assert_eq!(report.mapping("Pictures").unwrap().outcome, Outcome::Synchronized);
    assert!(h.local_is_dir("Pictures/Photos"));
    assert!(h.local_is_dir("Pictures/Photos/2023/empty"));
    assert_eq!(h.local_content("Pictures/Photos/cat.jpg").await.as_deref(), Some("meow"));
    assert_eq!(
        h.local_content("Pictures/Photos/2023/dog.jpg").await.as_deref(),
        Some("woof")
    );
    assert!(!h.local_exists("Pictures/Photos/Thumbs.db"));
    assert!(h.events().contains(&pulled("Photos", EntryKind::Directory)));
}

#[tokio::test]
async fn disabled_push_is_not_an_error() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[
        Entry::Dir{name: "Photos", entries: &[
            Entry::File{name: "tmp.psd", content: "layers", time: 0},
        ]},
    ];
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[Entry::Dir{name: "Photos", entries: &[]}];

    let mut h = harness(LOCAL, REMOTE).await;
    let report = h.run_with(Direction::Pull).await;

    assert_eq!(report.total().errors, 0);
    assert!(!report.has_failures());
    assert_eq!(h.remote.kind("Photos/tmp.psd"), None);
    assert_eq!(h.skip_reason("tmp.psd"), Some(SkipReason::PushDisabled));
}

#[tokio::test]
async fn disabled_pull_is_reported() {
    let mut h = harness(LOCAL, REMOTE).await;
    let report = h.run_with(Direction::Push).await;

    assert_eq!(report.total().errors, 0);
    assert_eq!(h.skip_reason("remote-newer.txt"), Some(SkipReason::PullDisabled));
    assert_eq!(h.skip_reason("only-remote"), Some(SkipReason::PullDisabled));
    assert!(!h.local_exists("Documents/only-remote"));
    assert_eq!(
        h.local_content("Documents/remote-newer.txt").await.as_deref(),
        Some("remote-newer - local")
    );
    assert_eq!(
        h.remote.content("Documents/local-newer.txt").as_deref(),
        Some("local-newer - local")
    );
}

#[tokio::test]
async fn links_and_native_documents_are_skipped() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[
        Entry::Dir{name: "Work", entries: &[
            Entry::Link{name: "local-link"},
        ]},
    ];
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[
        Entry::Dir{name: "Work", entries: &[
            Entry::Doc{name: "Budget"},
            Entry::Link{name: "shortcut"},
        ]},
    ];

    let h = harness(LOCAL, REMOTE).await;
    let report = h.run().await;

    let work = report.mapping("Work").unwrap();
    assert_eq!(work.outcome, Outcome::SynchronizedWithSkips);
    assert_eq!(work.stats.errors, 0);
    assert_eq!(work.stats.transfers(), 0);
    assert_eq!(h.skip_reason("Budget"), Some(SkipReason::NotDownloadable));
    assert_eq!(h.skip_reason("shortcut"), Some(SkipReason::NotDownloadable));
    assert!(!h.local_exists("Work/Budget"));
    if cfg!(unix) {
        assert_eq!(h.skip_reason("local-link"), Some(SkipReason::Unsupported));
        assert_eq!(h.remote.kind("Work/local-link"), None);
    }
}

#[tokio::test]
async fn duplicate_names_are_skipped() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[Entry::Dir{name: "Work", entries: &[]}];
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[
        Entry::Dir{name: "Work", entries: &[
            Entry::File{name: "notes.txt", content: "first", time: 0},
            Entry::File{name: "notes.txt", content: "second", time: 5},
            Entry::File{name: "plan.txt", content: "plan", time: 0},
        ]},
    ];

    let h = harness(LOCAL, REMOTE).await;
    let report = h.run().await;

    assert_eq!(h.events_of("notes.txt"), vec![skipped("notes.txt", SkipReason::DuplicateName)]);
    assert!(!h.local_exists("Work/notes.txt"));
    assert_eq!(h.local_content("Work/plan.txt").await.as_deref(), Some("plan"));
    assert_eq!(report.mapping("Work").unwrap().stats.skipped, 1);
}

#[tokio::test]
async fn duplicate_top_level_folders_fail_their_mapping() {
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[
        Entry::Dir{name: "Twins", entries: &[]},
        Entry::Dir{name: "Twins", entries: &[]},
        Entry::Dir{name: "Single", entries: &[]},
    ];

    let h = harness(&[], REMOTE).await;
    let report = h.run().await;

    assert!(matches!(
        report.mapping("Twins").unwrap().outcome,
        Outcome::Failed(dsync::Error::InvalidArgument(..))
    ));
    assert_eq!(report.mapping("Single").unwrap().outcome, Outcome::Synchronized);
    assert!(!h.local_exists("Twins"));
    assert!(h.local_is_dir("Single"));
}

#[tokio::test]
async fn failed_listing_spares_siblings() {
    let h = harness(LOCAL, REMOTE).await;
    h.remote.fail_listing("both");

    let report = h.run().await;

    let docs = report.mapping(DOCS).unwrap();
    assert_eq!(docs.outcome, Outcome::SynchronizedWithSkips);
    assert_eq!(docs.stats.errors, 1);
    let errors: Vec<_> = h
        .events()
        .into_iter()
        .filter(|ev| matches!(ev, Event::Error { .. }))
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path(), "both");
    assert_eq!(
        h.local_content("Documents/only-remote/file1.txt").await.as_deref(),
        Some("only-remote/file1")
    );
    assert_eq!(
        h.remote.content("Documents/only-local/file1.txt").as_deref(),
        Some("only-local/file1")
    );
}

#[tokio::test]
async fn failed_root_listing_fails_the_mapping() {
    let h = harness(LOCAL, REMOTE).await;
    h.remote.fail_listing(DOCS);

    let report = h.run().await;

    assert!(report.has_failures());
    let docs = report.mapping(DOCS).unwrap();
    assert!(matches!(docs.outcome, Outcome::Failed(dsync::Error::Api(..))));
    assert_eq!(docs.stats, dsync::Stats::default());
}

#[tokio::test]
async fn failed_upload_is_reported() {
    let h = harness(LOCAL, REMOTE).await;
    h.remote.fail_upload("only-local.txt");

    let report = h.run().await;

    let docs = report.mapping(DOCS).unwrap();
    assert_eq!(docs.outcome, Outcome::SynchronizedWithSkips);
    assert_eq!(docs.stats.errors, 1);
    match h.events_of("only-local.txt").as_slice() {
        [Event::Error {
            error: dsync::Error::TransferFailure(msg),
            ..
        }] => assert!(msg.starts_with("only-local.txt: "), "{msg}"),
        events => panic!("unexpected events: {events:?}"),
    }
    assert_eq!(h.remote.kind("Documents/only-local.txt"), None);
    assert_eq!(
        h.remote.content("Documents/local-newer.txt").as_deref(),
        Some("local-newer - local")
    );
}

#[tokio::test]
async fn failed_download_leaves_local_file_intact() {
    let h = harness(LOCAL, REMOTE).await;
    h.remote.fail_download("remote-newer.txt");

    let report = h.run().await;

    assert_eq!(report.mapping(DOCS).unwrap().stats.errors, 1);
    assert_eq!(
        h.local_content("Documents/remote-newer.txt").await.as_deref(),
        Some("remote-newer - local")
    );
    assert!(!h.local_exists("Documents/.remote-newer.txt.dsync-part"));
    // not pushed back either: the remote copy stays newer
    assert_eq!(
        h.remote.content("Documents/remote-newer.txt").as_deref(),
        Some("remote-newer - remote")
    );
}

#[tokio::test]
async fn unmapped_remote_folder_fails() {
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[
        Entry::Dir{name: "Documenti", entries: &[
            Entry::File{name: "cv.pdf", content: "cv", time: 0},
        ]},
        Entry::Dir{name: "Musica", entries: &[]},
    ];

    let mut h = harness(&[], REMOTE).await;
    h.config.mappings = Some(BTreeMap::from([("Documenti".into(), "Documents".into())]));

    let report = h.run().await;

    assert_eq!(report.mappings.len(), 2);
    assert_eq!(
        report.mapping("Musica").unwrap().outcome,
        Outcome::Failed(dsync::Error::MissingMapping("Musica".into()))
    );
    let docs = report.mapping("Documenti").unwrap();
    assert_eq!(docs.outcome, Outcome::Synchronized);
    assert_eq!(h.local_content("Documents/cv.pdf").await.as_deref(), Some("cv"));
    assert!(!h.local_exists("Musica"));
}

#[tokio::test]
async fn missing_remote_folder_is_created_when_pushing() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[
        Entry::Dir{name: "Archive", entries: &[
            Entry::File{name: "2019.zip", content: "old", time: 0},
        ]},
    ];

    let mut h = harness(LOCAL, &[]).await;
    h.config.mappings = Some(BTreeMap::from([("Archive".into(), "Archive".into())]));

    let report = h.run_with(Direction::Pull).await;
    assert!(matches!(
        report.mapping("Archive").unwrap().outcome,
        Outcome::Failed(dsync::Error::NotFound(..))
    ));
    assert_eq!(h.remote.kind("Archive"), None);

    let report = h.run_with(Direction::Push).await;
    assert_eq!(report.mapping("Archive").unwrap().outcome, Outcome::Synchronized);
    assert_eq!(h.remote.kind("Archive"), Some(EntryKind::Directory));
    assert_eq!(h.remote.content("Archive/2019.zip").as_deref(), Some("old"));
}

#[tokio::test]
async fn missing_local_directory_needs_pulling() {
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[
        Entry::Dir{name: "Music", entries: &[
            Entry::File{name: "song.mp3", content: "la", time: 0},
        ]},
    ];

    let mut h = harness(&[], REMOTE).await;

    let report = h.run_with(Direction::Push).await;
    assert!(matches!(
        report.mapping("Music").unwrap().outcome,
        Outcome::Failed(dsync::Error::NotFound(..))
    ));
    assert!(!h.local_exists("Music"));

    let report = h.run_with(Direction::Pull).await;
    assert_eq!(report.mapping("Music").unwrap().outcome, Outcome::Synchronized);
    assert_eq!(h.local_content("Music/song.mp3").await.as_deref(), Some("la"));
}

#[tokio::test]
async fn concurrent_mappings_keep_listing_order() {
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[
        Entry::Dir{name: "Zeta", entries: &[
            Entry::File{name: "z.txt", content: "z", time: 0},
        ]},
        Entry::Dir{name: "Alpha", entries: &[
            Entry::File{name: "a.txt", content: "a", time: 0},
        ]},
        Entry::Dir{name: "Mu", entries: &[
            Entry::File{name: "m.txt", content: "m", time: 0},
        ]},
        Entry::File{name: "loose.txt", content: "top-level files are not mappings", time: 0},
    ];

    let mut h = harness(&[], REMOTE).await;
    h.config.jobs = 3;
    h.config.blacklist = vec!["Mu".into()];

    let report = h.run().await;

    let names: Vec<_> = report.mappings.iter().map(|m| m.remote_name.as_str()).collect();
    assert_eq!(names, ["Alpha", "Zeta"]);
    assert_eq!(report.total().pulled, 2);
    assert_eq!(h.local_content("Alpha/a.txt").await.as_deref(), Some("a"));
    assert_eq!(h.local_content("Zeta/z.txt").await.as_deref(), Some("z"));
    assert!(!h.local_exists("Mu"));
    assert!(!h.local_exists("loose.txt"));
}

#[cfg(unix)]
#[tokio::test]
async fn skips_inside_pushed_directory_are_reported() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[
        Entry::Dir{name: "Work", entries: &[
            Entry::Dir{name: "fresh", entries: &[
                Entry::Link{name: "inner-link"},
                Entry::File{name: "a.txt", content: "a", time: 0},
            ]},
        ]},
    ];
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[Entry::Dir{name: "Work", entries: &[]}];

    for direction in [Direction::Push, Direction::Both] {
        let mut h = harness(LOCAL, REMOTE).await;
        let report = h.run_with(direction).await;

        let work = report.mapping("Work").unwrap();
        assert_eq!(work.outcome, Outcome::SynchronizedWithSkips, "{direction}");
        assert_eq!(work.stats.skipped, 1, "{direction}");
        assert_eq!(
            h.events_of("fresh/inner-link"),
            vec![skipped("fresh/inner-link", SkipReason::Unsupported)],
            "{direction}"
        );
        assert_eq!(h.remote.content("Work/fresh/a.txt").as_deref(), Some("a"));
        assert_eq!(h.remote.kind("Work/fresh/inner-link"), None);
    }
}

#[tokio::test]
async fn skips_inside_pulled_directory_are_reported_once() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[Entry::Dir{name: "Work", entries: &[]}];
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[
        Entry::Dir{name: "Work", entries: &[
            Entry::Dir{name: "fresh", entries: &[
                Entry::Doc{name: "Budget"},
                Entry::File{name: "a.txt", content: "a", time: 0},
            ]},
        ]},
    ];

    let h = harness(LOCAL, REMOTE).await;
    let report = h.run().await;

    assert_eq!(report.mapping("Work").unwrap().stats.skipped, 1);
    assert_eq!(
        h.events_of("fresh/Budget"),
        vec![skipped("fresh/Budget", SkipReason::NotDownloadable)]
    );
    assert_eq!(h.local_content("Work/fresh/a.txt").await.as_deref(), Some("a"));
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn non_utf8_local_name_spares_its_siblings() {
    use std::os::unix::ffi::OsStrExt;

    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[Entry::Dir{name: "Work", entries: &[]}];
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[
        Entry::Dir{name: "Work", entries: &[
            Entry::File{name: "plan.txt", content: "plan", time: 0},
        ]},
    ];

    let h = harness(LOCAL, REMOTE).await;
    let bad = h
        .local_path("Work")
        .as_std_path()
        .join(std::ffi::OsStr::from_bytes(b"bad\xff.txt"));
    std::fs::write(bad, b"bad").unwrap();

    let report = h.run().await;

    let work = report.mapping("Work").unwrap();
    assert_eq!(work.outcome, Outcome::SynchronizedWithSkips);
    assert_eq!(work.stats.errors, 0);
    assert_eq!(h.skip_reason("bad\u{FFFD}.txt"), Some(SkipReason::Unsupported));
    assert_eq!(h.local_content("Work/plan.txt").await.as_deref(), Some("plan"));
    assert_eq!(h.remote.children_names("Work"), vec!["plan.txt".to_string()]);
}
