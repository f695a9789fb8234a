use futures::{future, Future};

pub mod driver;
pub mod merge;
pub mod oauth2;
pub mod storage;

mod error;

pub use crate::driver::Driver;
pub use crate::merge::Merger;

/// Flushes in-memory caches (e.g. OAuth2 tokens) at the end of a run
pub trait PersistCache {
    fn persist_cache(&self) -> impl Future<Output = anyhow::Result<()>> + Send {
        future::ready(Ok(()))
    }
}
