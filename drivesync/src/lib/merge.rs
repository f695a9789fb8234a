use std::{cmp::Ordering, collections::BTreeMap, sync::Arc};

use camino::{Utf8Path, Utf8PathBuf};
use dsync::{config::Blacklist, Direction, Entry, EntryKind, Event, Reporter, SkipReason, Stats};
use futures::future::BoxFuture;

use crate::storage::{self, list_children, LocalStorage, Transfer};

/// What to do with a name present on one side or both
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Remote to local
    Pull,
    /// Local to remote
    Push,
    /// Directory on both sides
    Recurse,
    Skip(SkipReason),
}

/// Decides the fate of a pair of entries sharing the same name.
///
/// `remote_vs_local` is the comparison of the remote modification time
/// with the local one and is only consulted when both are regular files.
pub fn decide<LH, RH>(
    local: Option<&Entry<LH>>,
    remote: Option<&Entry<RH>>,
    remote_vs_local: Option<Ordering>,
) -> Decision {
    match (local, remote) {
        (Some(loc), Some(rem)) => {
            if loc.is_unsupported() || rem.is_unsupported() {
                Decision::Skip(SkipReason::Unsupported)
            } else if loc.is_dir() && rem.is_dir() {
                Decision::Recurse
            } else if loc.is_dir() != rem.is_dir() {
                Decision::Skip(SkipReason::KindMismatch)
            } else {
                match remote_vs_local {
                    Some(Ordering::Greater) => Decision::Pull,
                    Some(Ordering::Less) => Decision::Push,
                    Some(Ordering::Equal) | None => Decision::Skip(SkipReason::UpToDate),
                }
            }
        }
        (None, Some(rem)) if rem.is_dir() || rem.is_file() => Decision::Pull,
        (None, Some(_)) => Decision::Skip(SkipReason::NotDownloadable),
        (Some(loc), None) if loc.is_dir() || loc.is_file() => Decision::Push,
        (Some(_), None) => Decision::Skip(SkipReason::Unsupported),
        (None, None) => Decision::Skip(SkipReason::UpToDate),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pull,
    Push,
}

/// State shared by a whole pass over a mapping
#[derive(Clone, Copy)]
struct Pass<'a> {
    phase: Phase,
    /// Decisions that don't depend on the phase are reported by the first pass only,
    /// or by the pass that created the directory they belong to
    first: bool,
    mapping: &'a str,
    reporter: &'a dyn Reporter,
}

impl Pass<'_> {
    fn emit(&self, stats: &mut Stats, event: Event) {
        self.reporter.report(self.mapping, &event);
        stats.record(&event);
    }

    fn emit_shared(&self, stats: &mut Stats, event: Event) {
        if self.first {
            self.emit(stats, event);
        }
    }
}

/// Two-way merge of a local directory tree with a remote one
#[derive(Debug, Clone)]
pub struct Merger<L, R> {
    local: L,
    remote: R,
    blacklist: Arc<Blacklist>,
    direction: Direction,
}

impl<L, R> Merger<L, R>
where
    L: LocalStorage,
    R: storage::Storage,
{
    pub fn new(local: L, remote: R, blacklist: Arc<Blacklist>, direction: Direction) -> Self {
        Self {
            local,
            remote,
            blacklist,
            direction,
        }
    }

    /// Synchronizes `local_dir` with `remote_dir`, reporting every decision
    /// to `reporter` under the name `mapping`.
    ///
    /// When both directions are enabled, the whole tree is pulled before
    /// anything is pushed. Entry-level failures are reported and do not stop
    /// the walk. Failing to list either root is returned as an error.
    pub async fn synchronize(
        &self,
        mapping: &str,
        local_dir: Entry<Utf8PathBuf>,
        remote_dir: Entry<R::Handle>,
        reporter: &dyn Reporter,
    ) -> dsync::Result<Stats> {
        let phases = [
            (Phase::Pull, self.direction.pulls()),
            (Phase::Push, self.direction.pushes()),
        ];
        let mut stats = Stats::default();
        let mut first = true;
        for (phase, enabled) in phases {
            if !enabled {
                continue;
            }
            log::debug!("[{mapping}] {phase:?} pass");
            let pass = Pass {
                phase,
                first,
                mapping,
                reporter,
            };
            stats += self
                .walk(&pass, Utf8PathBuf::new(), local_dir.clone(), remote_dir.clone())
                .await?;
            first = false;
        }
        Ok(stats)
    }

    fn walk<'a>(
        &'a self,
        pass: &'a Pass<'a>,
        rel: Utf8PathBuf,
        local_dir: Entry<Utf8PathBuf>,
        remote_dir: Entry<R::Handle>,
    ) -> BoxFuture<'a, dsync::Result<Stats>> {
        Box::pin(async move {
            let (loc_children, rem_children) = tokio::join!(
                list_children(&self.local, &local_dir),
                list_children(&self.remote, &remote_dir),
            );
            let pairs = self.pair(loc_children?, rem_children?);

            let mut stats = Stats::default();
            for (name, (mut locs, mut rems)) in pairs {
                let path = rel.join(&name);
                if locs.len() > 1 || rems.len() > 1 {
                    let event = Event::Skipped {
                        path,
                        reason: SkipReason::DuplicateName,
                    };
                    pass.emit_shared(&mut stats, event);
                    continue;
                }
                let (loc, rem) = (locs.pop(), rems.pop());

                let order = match (&loc, &rem) {
                    (Some(l), Some(r)) if l.is_file() && r.is_file() => match self.compare(l, r).await {
                        Ok(order) => Some(order),
                        Err(error) => {
                            pass.emit_shared(&mut stats, Event::Error { path, error });
                            continue;
                        }
                    },
                    _ => None,
                };

                let decision = decide(loc.as_ref(), rem.as_ref(), order);
                log::trace!("[{}] {path}: {decision:?}", pass.mapping);
                stats += self
                    .apply(pass, path, &local_dir, &remote_dir, loc, rem, decision)
                    .await;
            }
            Ok(stats)
        })
    }

    /// Groups children by name after dropping blacklisted ones
    #[allow(clippy::type_complexity)]
    fn pair(
        &self,
        loc_children: Vec<Entry<Utf8PathBuf>>,
        rem_children: Vec<Entry<R::Handle>>,
    ) -> BTreeMap<String, (Vec<Entry<Utf8PathBuf>>, Vec<Entry<R::Handle>>)> {
        let mut pairs: BTreeMap<String, (Vec<_>, Vec<_>)> = BTreeMap::new();
        for loc in loc_children {
            if !self.blacklist.is_blacklisted(loc.name()) {
                pairs.entry(loc.name().to_string()).or_default().0.push(loc);
            }
        }
        for rem in rem_children {
            if !self.blacklist.is_blacklisted(rem.name()) {
                pairs.entry(rem.name().to_string()).or_default().1.push(rem);
            }
        }
        pairs
    }

    /// Compares the remote modification time with the local one
    async fn compare(&self, loc: &Entry<Utf8PathBuf>, rem: &Entry<R::Handle>) -> dsync::Result<Ordering> {
        let (loc_mtime, rem_mtime) = tokio::join!(
            self.local.modified_time(loc),
            self.remote.modified_time(rem)
        );
        Ok(dsync::compare_mtime(
            rem_mtime?,
            self.remote.mtime_precision(),
            loc_mtime?,
            self.local.mtime_precision(),
        ))
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply(
        &self,
        pass: &Pass<'_>,
        path: Utf8PathBuf,
        local_dir: &Entry<Utf8PathBuf>,
        remote_dir: &Entry<R::Handle>,
        loc: Option<Entry<Utf8PathBuf>>,
        rem: Option<Entry<R::Handle>>,
        decision: Decision,
    ) -> Stats {
        let mut stats = Stats::default();
        match (decision, loc, rem) {
            (Decision::Recurse, Some(loc), Some(rem)) => {
                stats += self.descend(pass, path, loc, rem, false).await;
            }
            (Decision::Skip(reason), ..) => {
                pass.emit_shared(&mut stats, Event::Skipped { path, reason });
            }
            (Decision::Pull, _, Some(rem)) if pass.phase == Phase::Pull => {
                stats += self.pull(pass, path, local_dir, rem).await;
            }
            (Decision::Pull, ..) => {
                if !self.direction.pulls() {
                    let reason = SkipReason::PullDisabled;
                    pass.emit_shared(&mut stats, Event::Skipped { path, reason });
                }
            }
            (Decision::Push, Some(loc), _) if pass.phase == Phase::Push => {
                stats += self.push(pass, path, remote_dir, loc).await;
            }
            (Decision::Push, ..) => {
                if !self.direction.pushes() {
                    let reason = SkipReason::PushDisabled;
                    pass.emit_shared(&mut stats, Event::Skipped { path, reason });
                }
            }
            (Decision::Recurse, ..) => {
                log::error!("[{}] {path}: cannot recurse in a one-sided entry", pass.mapping);
            }
        }
        stats
    }

    async fn pull(
        &self,
        pass: &Pass<'_>,
        path: Utf8PathBuf,
        local_dir: &Entry<Utf8PathBuf>,
        rem: Entry<R::Handle>,
    ) -> Stats {
        let mut stats = Stats::default();
        if rem.is_dir() {
            match self.local.make_directory(local_dir, rem.name()).await {
                Ok(loc) => {
                    let kind = EntryKind::Directory;
                    pass.emit(&mut stats, Event::Pulled { path: path.clone(), kind });
                    stats += self.descend(pass, path, loc, rem, true).await;
                }
                Err(err) => {
                    let error = entry_error(&path, err);
                    pass.emit(&mut stats, Event::Error { path, error });
                }
            }
            return stats;
        }

        let dest = local_dir.handle().join(rem.name());
        let event = match self.remote.download(&rem, &dest).await {
            Ok(()) => Event::Pulled {
                path,
                kind: rem.kind(),
            },
            Err(dsync::Error::NotDownloadable(..)) => Event::Skipped {
                path,
                reason: SkipReason::NotDownloadable,
            },
            Err(err) => Event::Error {
                error: entry_error(&path, err),
                path,
            },
        };
        pass.emit(&mut stats, event);
        stats
    }

    async fn push(
        &self,
        pass: &Pass<'_>,
        path: Utf8PathBuf,
        remote_dir: &Entry<R::Handle>,
        loc: Entry<Utf8PathBuf>,
    ) -> Stats {
        let mut stats = Stats::default();
        if loc.is_dir() {
            match self.remote.make_directory(remote_dir, loc.name()).await {
                Ok(rem) => {
                    let kind = EntryKind::Directory;
                    pass.emit(&mut stats, Event::Pushed { path: path.clone(), kind });
                    stats += self.descend(pass, path, loc, rem, true).await;
                }
                Err(err) => {
                    let error = entry_error(&path, err);
                    pass.emit(&mut stats, Event::Error { path, error });
                }
            }
            return stats;
        }

        let event = match self.remote.upload(loc.handle(), remote_dir, loc.name()).await {
            Ok(rem) => Event::Pushed {
                path,
                kind: rem.kind(),
            },
            Err(err) => Event::Error {
                error: entry_error(&path, err),
                path,
            },
        };
        pass.emit(&mut stats, event);
        stats
    }

    /// Walks a sub-directory. A listing failure is reported and
    /// leaves the siblings of the directory unaffected.
    /// `created` tells whether the current pass just created one side.
    async fn descend(
        &self,
        pass: &Pass<'_>,
        path: Utf8PathBuf,
        loc: Entry<Utf8PathBuf>,
        rem: Entry<R::Handle>,
        created: bool,
    ) -> Stats {
        let fresh;
        let pass = if created {
            fresh = Pass { first: true, ..*pass };
            &fresh
        } else {
            pass
        };
        match self.walk(pass, path.clone(), loc, rem).await {
            Ok(stats) => stats,
            Err(err) => {
                let mut stats = Stats::default();
                let event = Event::Error {
                    error: entry_error(&path, err),
                    path,
                };
                pass.emit_shared(&mut stats, event);
                stats
            }
        }
    }
}

/// Qualifies a storage error with the path of the entry it occurred on
fn entry_error(path: &Utf8Path, err: dsync::Error) -> dsync::Error {
    match err {
        dsync::Error::Io(msg)
        | dsync::Error::Api(msg)
        | dsync::Error::Other(msg)
        | dsync::Error::NotFound(msg) => dsync::Error::TransferFailure(format!("{path}: {msg}")),
        err => err,
    }
}
