use std::collections::{BTreeMap, HashSet};

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use glob::{MatchOptions, Pattern, PatternError};
use serde::{Deserialize, Serialize};

use crate::{oauth2, Direction, Provider};

/// Suffix of the files that receive data while a download is in progress
pub const PARTIAL_SUFFIX: &str = ".dsync-part";

/// Names excluded from every comparison and transfer
#[derive(Debug, Clone)]
pub struct Blacklist {
    names: HashSet<String>,
    patterns: Vec<Pattern>,
    opts: MatchOptions,
}

impl Blacklist {
    pub fn new<N, P>(names: N, patterns: P, case_sensitive: bool) -> Result<Self, PatternError>
    where
        N: IntoIterator,
        N::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| fold_case(n.as_ref(), case_sensitive))
            .collect();
        let patterns: Result<Vec<_>, _> = patterns
            .into_iter()
            .map(|p| Pattern::new(p.as_ref()))
            .collect();
        let opts = MatchOptions {
            case_sensitive,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        Ok(Blacklist {
            names,
            patterns: patterns?,
            opts,
        })
    }

    pub fn is_blacklisted(&self, name: &str) -> bool {
        name.ends_with(PARTIAL_SUFFIX)
            || self
                .names
                .contains(&fold_case(name, self.opts.case_sensitive))
            || self.patterns.iter().any(|p| p.matches_with(name, self.opts))
    }
}

impl Default for Blacklist {
    fn default() -> Self {
        Blacklist {
            names: HashSet::new(),
            patterns: Vec::new(),
            opts: MatchOptions::new(),
        }
    }
}

fn fold_case(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_string()
    } else {
        name.to_lowercase()
    }
}

/// Where to find the OAuth2 client secret
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretSource {
    Inline(oauth2::Secret),
    /// Path to a `client_secret.json` downloaded from the Google console
    File(Utf8PathBuf),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleDriveConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretSource>,
    /// Drive folder used as synchronization root instead of "My Drive"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProviderConfig {
    GoogleDrive(GoogleDriveConfig),
}

impl ProviderConfig {
    pub fn provider(&self) -> Provider {
        match self {
            ProviderConfig::GoogleDrive(..) => Provider::GoogleDrive,
        }
    }
}

fn default_case_sensitive() -> bool {
    true
}

fn default_jobs() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base of relative mapped paths and of name-matched mappings
    pub local_root: Utf8PathBuf,
    /// Remote top-level folder name to local directory.
    /// When absent, remote folders are matched by name under `local_root`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<BTreeMap<String, Utf8PathBuf>>,
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// Glob patterns matched against entry names
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    pub provider: ProviderConfig,
}

impl Config {
    pub async fn load_from_file(path: &Utf8Path) -> anyhow::Result<Self> {
        let config_json = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read config from {path}"))?;
        let config_json = std::str::from_utf8(&config_json)?;
        let config: Config = serde_json::from_str(config_json)
            .with_context(|| format!("Failed to parse config from {path}"))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> anyhow::Result<()> {
        if !self.local_root.is_absolute() {
            anyhow::bail!("local_root must be absolute, got '{}'", self.local_root);
        }
        if self.jobs == 0 {
            anyhow::bail!("jobs must be at least 1");
        }
        Ok(())
    }

    pub fn blacklist(&self) -> anyhow::Result<Blacklist> {
        Blacklist::new(&self.blacklist, &self.ignore, self.case_sensitive)
            .context("Invalid ignore pattern")
    }

    /// Local directory of the remote top-level folder `remote_name`
    pub fn local_dir(&self, remote_name: &str) -> Option<Utf8PathBuf> {
        match &self.mappings {
            Some(mappings) => mappings
                .get(remote_name)
                .map(|local| self.local_root.join(local)),
            None => Some(self.local_root.join(remote_name)),
        }
    }
}
