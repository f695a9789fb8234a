use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, TimeDelta, Utc};
use oauth2::{AccessToken, RefreshToken, Scope, TokenResponse, TokenType};
use serde::{Deserialize, Serialize};

use crate::PersistCache;

/// Tokens are considered expired this many seconds before their actual expiration
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenEntry {
    /// Sorted
    scopes: Vec<Scope>,
    access_token: AccessToken,
    refresh_token: Option<RefreshToken>,
    expiration: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub enum CacheResult {
    None,
    Expired(RefreshToken, Vec<Scope>),
    Ok(AccessToken),
}

#[derive(Debug, Default)]
struct TokenStore {
    entries: Vec<TokenEntry>,
}

impl TokenStore {
    /// Reads the cache from disk.
    /// A missing or unreadable file yields an empty store.
    async fn read_from_disk(path: &Utf8Path) -> Self {
        let json = match tokio::fs::read(path).await {
            Ok(json) => json,
            Err(_) => return Self::default(),
        };
        log::info!("reading cached tokens from {path}");
        match serde_json::from_slice(&json) {
            Ok(entries) => TokenStore { entries },
            Err(err) => {
                log::warn!("discarding token cache {path}: {err}");
                Self::default()
            }
        }
    }

    async fn write_to_disk(&self, path: &Utf8Path) -> anyhow::Result<()> {
        log::info!("caching tokens to {path}");
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    fn insert<T, TT>(&mut self, tok: &T, requested: &[Scope])
    where
        T: TokenResponse<TT>,
        TT: TokenType,
    {
        let mut scopes = tok.scopes().cloned().unwrap_or_else(|| requested.to_vec());
        scopes.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));
        scopes.dedup();
        log::trace!("inserting token for scopes {scopes:?}");

        let expiration = tok
            .expires_in()
            .and_then(|exp| TimeDelta::from_std(exp).ok())
            .map(|exp| Utc::now() + exp);

        match self.entries.iter_mut().find(|ent| ent.scopes == scopes) {
            Some(ent) => {
                ent.access_token = tok.access_token().clone();
                // refresh responses usually don't carry a new refresh token
                if let Some(refresh_token) = tok.refresh_token() {
                    ent.refresh_token = Some(refresh_token.clone());
                }
                ent.expiration = expiration;
            }
            None => self.entries.push(TokenEntry {
                scopes,
                access_token: tok.access_token().clone(),
                refresh_token: tok.refresh_token().cloned(),
                expiration,
            }),
        }
    }

    fn get(&self, scopes: &[Scope], now: DateTime<Utc>) -> CacheResult {
        // few scope combinations are used, so stop at the first entry covering all
        let Some(ent) = self
            .entries
            .iter()
            .find(|ent| scopes.iter().all(|s| ent.scopes.contains(s)))
        else {
            return CacheResult::None;
        };
        match ent.expiration {
            Some(expiration) if expiration - TimeDelta::seconds(EXPIRY_MARGIN_SECS) < now => match &ent.refresh_token {
                Some(refresh_token) => CacheResult::Expired(refresh_token.clone(), ent.scopes.clone()),
                None => CacheResult::None,
            },
            _ => CacheResult::Ok(ent.access_token.clone()),
        }
    }
}

/// Specifies how the cache should persist tokens
#[derive(Debug, Clone)]
pub enum TokenPersist {
    /// Persist in memory, but start from scratch
    /// each time the program starts
    Memory,
    /// Load from disk when the program starts,
    /// and save back in the `PersistCache` implementation.
    MemoryAndDisk(Utf8PathBuf),
}

impl TokenPersist {
    fn try_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::MemoryAndDisk(path) => Some(path),
            Self::Memory => None,
        }
    }
}

#[derive(Debug)]
pub struct TokenCache {
    persist: TokenPersist,
    store: TokenStore,
    last_scopes: Vec<Scope>,
}

impl TokenCache {
    pub async fn new(persist: TokenPersist) -> anyhow::Result<Self> {
        let store = match persist.try_path() {
            Some(path) => TokenStore::read_from_disk(path).await,
            None => TokenStore::default(),
        };
        Ok(TokenCache {
            persist,
            store,
            last_scopes: Vec::new(),
        })
    }

    pub fn put<T, TT>(&mut self, tok: &T)
    where
        T: TokenResponse<TT>,
        TT: TokenType,
    {
        log::trace!(
            "put token for scopes {:?}, expires in {:?}",
            tok.scopes(),
            tok.expires_in()
        );
        self.store.insert(tok, &self.last_scopes);
    }

    pub fn check(&mut self, scopes: &[Scope]) -> CacheResult {
        self.last_scopes = scopes.to_vec();
        let res = self.store.get(scopes, Utc::now());

        if log::log_enabled!(log::Level::Trace) {
            let res = match &res {
                CacheResult::None => "None",
                CacheResult::Expired(..) => "Expired",
                CacheResult::Ok(..) => "Ok",
            };
            let scopes = scopes.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ");
            log::trace!("check token for scopes {scopes}: {res}");
        }

        res
    }
}

impl PersistCache for TokenCache {
    async fn persist_cache(&self) -> anyhow::Result<()> {
        if let Some(path) = self.persist.try_path() {
            self.store.write_to_disk(path).await?;
        }
        Ok(())
    }
}
