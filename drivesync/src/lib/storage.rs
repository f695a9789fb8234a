use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use dsync::{Entry, Precision};
use futures::{Future, Stream, TryStreamExt};
use tokio::io;

use crate::PersistCache;

pub mod fs;
pub mod gdrive;
pub mod id;

pub trait DirEntries: Send + Sync {
    /// How the storage addresses its entries
    type Handle: Clone + fmt::Debug + Send + Sync + 'static;

    fn dir_entries(
        &self,
        dir: &Entry<Self::Handle>,
    ) -> impl Stream<Item = dsync::Result<Entry<Self::Handle>>> + Send;
}

pub trait ModifiedTime: DirEntries {
    /// Granularity of the times returned by `modified_time`
    fn mtime_precision(&self) -> Precision;

    fn modified_time(
        &self,
        entry: &Entry<Self::Handle>,
    ) -> impl Future<Output = dsync::Result<DateTime<Utc>>> + Send;
}

pub trait ReadFile: DirEntries {
    /// Opens the content of a regular file.
    /// Fails with `NotDownloadable` for anything else.
    fn read_file(
        &self,
        entry: &Entry<Self::Handle>,
    ) -> impl Future<Output = dsync::Result<impl io::AsyncRead + Send>> + Send;
}

pub trait WriteFile: DirEntries {
    /// Creates or overwrites the file `name` in `dir`, then stamps it with `mtime`
    fn write_file(
        &self,
        dir: &Entry<Self::Handle>,
        name: &str,
        mtime: DateTime<Utc>,
        size: u64,
        data: impl io::AsyncRead + Send,
    ) -> impl Future<Output = dsync::Result<Entry<Self::Handle>>> + Send;
}

pub trait MkDir: DirEntries {
    /// Creates the directory `name` in `dir`, or returns it if it already exists.
    fn make_directory(
        &self,
        dir: &Entry<Self::Handle>,
        name: &str,
    ) -> impl Future<Output = dsync::Result<Entry<Self::Handle>>> + Send;
}

pub trait Exists: DirEntries {
    /// Whether `entry` refers to something that is actually stored
    fn exists(&self, entry: &Entry<Self::Handle>) -> impl Future<Output = dsync::Result<bool>> + Send;
}

/// A trait to delete files or folders
pub trait Delete: DirEntries {
    /// Deletes the file or folder `entry`.
    /// Only empty folders can be deleted.
    fn delete(&self, entry: &Entry<Self::Handle>) -> impl Future<Output = dsync::Result<()>> + Send;
}

/// Transfers between a storage and the local file system
pub trait Transfer: ReadFile + WriteFile {
    /// Downloads the regular file `entry` to `dest`,
    /// giving `dest` the modification time of `entry`.
    fn download(
        &self,
        entry: &Entry<Self::Handle>,
        dest: &Utf8Path,
    ) -> impl Future<Output = dsync::Result<()>> + Send {
        async move {
            if entry.is_dir() {
                dsync::invalid_bail!("{} is a directory", entry.name());
            }
            if !entry.is_file() {
                return Err(dsync::Error::NotDownloadable(entry.name().to_string()));
            }
            log::trace!("downloading {} to {dest}", entry.name());
            let data = self.read_file(entry).await?;
            fs::write_atomic(dest, data, entry.mtime()).await
        }
    }

    /// Uploads the local regular file `local_path` as `name` in `dir`
    fn upload(
        &self,
        local_path: &Utf8Path,
        dir: &Entry<Self::Handle>,
        name: &str,
    ) -> impl Future<Output = dsync::Result<Entry<Self::Handle>>> + Send {
        async move {
            let metadata = tokio::fs::symlink_metadata(local_path).await?;
            if !metadata.is_file() {
                dsync::invalid_bail!("{local_path} is not a regular file");
            }
            log::trace!("uploading {local_path} as {name}");
            let mtime: DateTime<Utc> = metadata.modified()?.into();
            let data = tokio::fs::File::open(local_path).await?;
            self.write_file(dir, name, mtime, metadata.len(), data).await
        }
    }
}

impl<S> Transfer for S where S: ReadFile + WriteFile {}

/// A trait for handle-based storage
pub trait Storage:
    Clone
    + DirEntries
    + ModifiedTime
    + ReadFile
    + WriteFile
    + MkDir
    + Exists
    + Delete
    + PersistCache
    + 'static
{
}

/// A storage addressed by file system paths
pub trait LocalStorage: Storage + DirEntries<Handle = Utf8PathBuf> {
    fn entry(&self, path: &Utf8Path) -> impl Future<Output = dsync::Result<Entry<Utf8PathBuf>>> + Send;

    /// Creates `path` and its missing parents
    fn create_dir_all(
        &self,
        path: &Utf8Path,
    ) -> impl Future<Output = dsync::Result<Entry<Utf8PathBuf>>> + Send;
}

/// Lists the children of `dir`, sorted by name
pub async fn list_children<S>(storage: &S, dir: &Entry<S::Handle>) -> dsync::Result<Vec<Entry<S::Handle>>>
where
    S: DirEntries,
{
    if !dir.is_dir() {
        return Err(dsync::Error::NotADirectory(dir.name().to_string()));
    }
    let children = storage.dir_entries(dir);
    let mut children = children.try_collect::<Vec<_>>().await?;

    children.sort_unstable_by(|a, b| a.name().cmp(b.name()));

    Ok(children)
}
