use std::{collections::BTreeMap, sync::Arc};

use camino::Utf8PathBuf;
use dsync::{config::Blacklist, Config, Direction, Entry, MappingReport, Outcome, Report, Reporter, Stats};
use futures::{stream, StreamExt};

use crate::{
    merge::Merger,
    storage::{self, list_children, LocalStorage},
};

/// A remote top-level folder and the local directory it synchronizes with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub remote_name: String,
    pub local_dir: Utf8PathBuf,
}

/// Remote side of a mapping before it is synchronized
#[derive(Debug)]
enum RemoteDir<H> {
    Listed(Entry<H>),
    /// Configured but absent remotely
    Missing,
}

#[derive(Debug)]
enum Unit<H> {
    Sync(Mapping, RemoteDir<H>),
    Invalid {
        remote_name: String,
        local_dir: Option<Utf8PathBuf>,
        error: dsync::Error,
    },
}

/// Applies the merge engine to every top-level mapping
#[derive(Debug)]
pub struct Driver<L, R>
where
    R: storage::Storage,
{
    local: L,
    remote: R,
    remote_root: Entry<R::Handle>,
    blacklist: Arc<Blacklist>,
    config: Config,
}

impl<L, R> Driver<L, R>
where
    L: LocalStorage,
    R: storage::Storage,
{
    pub fn new(local: L, remote: R, remote_root: Entry<R::Handle>, config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            local,
            remote,
            remote_root,
            blacklist: Arc::new(config.blacklist()?),
            config: config.clone(),
        })
    }

    pub fn direction(&self) -> Direction {
        self.config.direction
    }

    /// Synchronizes every mapping.
    /// Only a failure to list the remote root fails the whole run,
    /// other failures are confined to the report of their mapping.
    pub async fn run(&self, reporter: &dyn Reporter) -> dsync::Result<Report> {
        log::info!(
            "synchronizing {} with {} (direction: {})",
            self.config.local_root,
            if self.remote_root.name().is_empty() { "remote root" } else { self.remote_root.name() },
            self.config.direction
        );
        let top_level = list_children(&self.remote, &self.remote_root).await?;
        let units = self.resolve(top_level);

        let mappings = stream::iter(units)
            .map(|unit| self.run_unit(unit, reporter))
            .buffered(self.config.jobs.max(1))
            .collect::<Vec<_>>()
            .await;

        Ok(Report { mappings })
    }

    /// Pairs remote top-level folders with local directories, in remote listing order.
    /// Configured mappings absent remotely come last.
    fn resolve(&self, top_level: Vec<Entry<R::Handle>>) -> Vec<Unit<R::Handle>> {
        let mut by_name: BTreeMap<String, Vec<Entry<R::Handle>>> = BTreeMap::new();
        let mut order = Vec::new();
        for entry in top_level {
            if self.blacklist.is_blacklisted(entry.name()) {
                log::debug!("ignoring blacklisted remote folder {}", entry.name());
                continue;
            }
            if !entry.is_dir() {
                log::debug!("ignoring remote top-level {} {}", entry.kind(), entry.name());
                continue;
            }
            let name = entry.name().to_string();
            let group = by_name.entry(name.clone()).or_default();
            if group.is_empty() {
                order.push(name);
            }
            group.push(entry);
        }

        let mut units = Vec::with_capacity(order.len());
        for name in order {
            let Some(mut group) = by_name.remove(&name) else {
                continue;
            };
            let local_dir = self.config.local_dir(&name);
            if group.len() > 1 {
                units.push(Unit::Invalid {
                    error: dsync::Error::InvalidArgument(format!(
                        "{} remote folders are named {name}",
                        group.len()
                    )),
                    remote_name: name,
                    local_dir,
                });
                continue;
            }
            let Some(entry) = group.pop() else {
                continue;
            };
            match local_dir {
                Some(local_dir) => units.push(Unit::Sync(
                    Mapping {
                        remote_name: name,
                        local_dir,
                    },
                    RemoteDir::Listed(entry),
                )),
                None => units.push(Unit::Invalid {
                    error: dsync::Error::MissingMapping(name.clone()),
                    remote_name: name,
                    local_dir: None,
                }),
            }
        }

        if let Some(mappings) = &self.config.mappings {
            let listed: Vec<String> = units.iter().map(|u| u.remote_name().to_string()).collect();
            for (name, local) in mappings {
                if listed.contains(name) || self.blacklist.is_blacklisted(name) {
                    continue;
                }
                let mapping = Mapping {
                    remote_name: name.clone(),
                    local_dir: self.config.local_root.join(local),
                };
                units.push(Unit::Sync(mapping, RemoteDir::Missing));
            }
        }
        units
    }

    async fn run_unit(&self, unit: Unit<R::Handle>, reporter: &dyn Reporter) -> MappingReport {
        let (mapping, remote_dir) = match unit {
            Unit::Sync(mapping, remote_dir) => (mapping, remote_dir),
            Unit::Invalid {
                remote_name,
                local_dir,
                error,
            } => {
                log::error!("{remote_name}: {error}");
                return MappingReport {
                    remote_name,
                    local_dir,
                    outcome: Outcome::Failed(error),
                    stats: Stats::default(),
                };
            }
        };

        let res = self.sync_mapping(&mapping, remote_dir, reporter).await;
        let (outcome, stats) = match res {
            Ok(stats) => (Outcome::from_stats(&stats), stats),
            Err(err) => {
                log::error!("{}: {err}", mapping.remote_name);
                (Outcome::Failed(err), Stats::default())
            }
        };
        let report = MappingReport {
            remote_name: mapping.remote_name,
            local_dir: Some(mapping.local_dir),
            outcome,
            stats,
        };
        log::info!("{report}");
        report
    }

    async fn sync_mapping(
        &self,
        mapping: &Mapping,
        remote_dir: RemoteDir<R::Handle>,
        reporter: &dyn Reporter,
    ) -> dsync::Result<Stats> {
        let local_dir = self.local_entry(mapping).await?;

        let remote_dir = match remote_dir {
            RemoteDir::Listed(entry) => entry,
            RemoteDir::Missing if self.config.direction.pushes() => {
                log::info!("creating remote folder {}", mapping.remote_name);
                self.remote
                    .make_directory(&self.remote_root, &mapping.remote_name)
                    .await?
            }
            RemoteDir::Missing => {
                return Err(dsync::Error::NotFound(format!(
                    "remote folder {}",
                    mapping.remote_name
                )));
            }
        };

        let merger = Merger::new(
            self.local.clone(),
            self.remote.clone(),
            self.blacklist.clone(),
            self.config.direction,
        );
        merger
            .synchronize(&mapping.remote_name, local_dir, remote_dir, reporter)
            .await
    }

    async fn local_entry(&self, mapping: &Mapping) -> dsync::Result<Entry<Utf8PathBuf>> {
        let local_dir = &mapping.local_dir;
        match self.local.entry(local_dir).await {
            Ok(entry) if entry.is_dir() => Ok(entry),
            Ok(_) => Err(dsync::Error::NotADirectory(local_dir.to_string())),
            Err(dsync::Error::NotFound(..)) if self.config.direction.pulls() => {
                self.local.create_dir_all(local_dir).await
            }
            Err(dsync::Error::NotFound(..)) => Err(dsync::Error::NotFound(local_dir.to_string())),
            Err(err) => Err(err),
        }
    }
}

impl<H> Unit<H> {
    fn remote_name(&self) -> &str {
        match self {
            Unit::Sync(mapping, _) => &mapping.remote_name,
            Unit::Invalid { remote_name, .. } => remote_name,
        }
    }
}
