use std::time::SystemTime;

use async_stream::try_stream;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use dsync::{config::PARTIAL_SUFFIX, Entry, Precision};
use futures::Stream;
use tokio::{
    fs::{self, DirEntry},
    io::{self, AsyncWriteExt},
};

use crate::PersistCache;

/// File system storage. Entries are addressed by absolute paths.
#[derive(Debug, Default, Clone)]
pub struct FileSystem;

impl FileSystem {
    pub fn new() -> Self {
        FileSystem
    }
}

/// Writes `data` to a hidden sibling of `dest`, stamps it with `mtime`
/// and renames it over `dest`. `dest` is left untouched on failure.
pub(crate) async fn write_atomic(
    dest: &Utf8Path,
    data: impl io::AsyncRead + Send,
    mtime: Option<DateTime<Utc>>,
) -> dsync::Result<()> {
    let file_name = match dest.file_name() {
        Some(file_name) => file_name,
        None => dsync::invalid_bail!("{dest} has no file name"),
    };
    let part = dest.with_file_name(format!(".{file_name}{PARTIAL_SUFFIX}"));

    let res = async {
        tokio::pin!(data);

        let mut f = fs::File::create(&part).await?;
        io::copy(&mut data, &mut f).await?;
        f.flush().await?;

        let f = f.into_std().await;
        if let Some(mtime) = mtime {
            f.set_modified(mtime.into())?;
        }
        drop(f);
        fs::rename(&part, dest).await?;
        Ok::<(), dsync::Error>(())
    }
    .await;

    if res.is_err() {
        let _ = fs::remove_file(&part).await;
    }
    res
}

impl super::DirEntries for FileSystem {
    type Handle = Utf8PathBuf;

    fn dir_entries(
        &self,
        dir: &Entry<Utf8PathBuf>,
    ) -> impl Stream<Item = dsync::Result<Entry<Utf8PathBuf>>> + Send {
        let fs_base = dir.handle().clone();
        log::trace!("listing entries of {fs_base}");
        try_stream! {
            let mut read_dir = fs::read_dir(&fs_base).await?;
            while let Some(direntry) = read_dir.next_entry().await? {
                match map_direntry(&direntry).await {
                    Ok(entry) => yield entry,
                    Err(err) => log::warn!("skipping {}: {err}", direntry.path().display()),
                }
            }
        }
    }
}

impl super::ModifiedTime for FileSystem {
    fn mtime_precision(&self) -> Precision {
        Precision::Nanosecond
    }

    async fn modified_time(&self, entry: &Entry<Utf8PathBuf>) -> dsync::Result<DateTime<Utc>> {
        let metadata = fs::symlink_metadata(entry.handle()).await?;
        Ok(metadata.modified()?.into())
    }
}

impl super::ReadFile for FileSystem {
    async fn read_file(&self, entry: &Entry<Utf8PathBuf>) -> dsync::Result<impl io::AsyncRead + Send> {
        if !entry.is_file() {
            return Err(dsync::Error::NotDownloadable(entry.handle().to_string()));
        }
        log::trace!("reading {}", entry.handle());
        Ok(fs::File::open(entry.handle()).await?)
    }
}

impl super::WriteFile for FileSystem {
    async fn write_file(
        &self,
        dir: &Entry<Utf8PathBuf>,
        name: &str,
        mtime: DateTime<Utc>,
        _size: u64,
        data: impl io::AsyncRead + Send,
    ) -> dsync::Result<Entry<Utf8PathBuf>> {
        let fs_path = dir.handle().join(name);
        log::info!("writing {fs_path}");
        if fs_path.is_dir() {
            dsync::invalid_bail!("{fs_path} is a directory");
        }
        write_atomic(&fs_path, data, Some(mtime)).await?;
        stat(fs_path).await
    }
}

impl super::MkDir for FileSystem {
    async fn make_directory(
        &self,
        dir: &Entry<Utf8PathBuf>,
        name: &str,
    ) -> dsync::Result<Entry<Utf8PathBuf>> {
        let fs_path = dir.handle().join(name);
        match fs::create_dir(&fs_path).await {
            Ok(()) => log::info!("mkdir {fs_path}"),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                if !fs::symlink_metadata(&fs_path).await?.is_dir() {
                    dsync::invalid_bail!("{fs_path} exists and is not a directory");
                }
            }
            Err(err) => return Err(err.into()),
        }
        stat(fs_path).await
    }
}

impl super::Exists for FileSystem {
    async fn exists(&self, entry: &Entry<Utf8PathBuf>) -> dsync::Result<bool> {
        match fs::symlink_metadata(entry.handle()).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

impl super::Delete for FileSystem {
    async fn delete(&self, entry: &Entry<Utf8PathBuf>) -> dsync::Result<()> {
        let fs_path = entry.handle();
        log::info!("deleting {fs_path}");
        let md = match fs::symlink_metadata(fs_path).await {
            Ok(md) => md,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        if md.is_dir() {
            let mut entries = fs::read_dir(fs_path).await?;
            if entries.next_entry().await?.is_some() {
                dsync::io_bail!("{fs_path} is a non-empty folder");
            }
            fs::remove_dir(fs_path).await?;
        } else {
            fs::remove_file(fs_path).await?;
        }
        Ok(())
    }
}

impl PersistCache for FileSystem {}

impl super::Storage for FileSystem {}

impl super::LocalStorage for FileSystem {
    async fn entry(&self, path: &Utf8Path) -> dsync::Result<Entry<Utf8PathBuf>> {
        stat(path.to_owned()).await
    }

    async fn create_dir_all(&self, path: &Utf8Path) -> dsync::Result<Entry<Utf8PathBuf>> {
        log::info!("mkdir -p {path}");
        fs::create_dir_all(path).await?;
        stat(path.to_owned()).await
    }
}

async fn stat(path: Utf8PathBuf) -> dsync::Result<Entry<Utf8PathBuf>> {
    let metadata = fs::symlink_metadata(&path).await?;
    let name = path.file_name().unwrap_or_default().to_string();
    Ok(map_metadata(name, path, &metadata))
}

async fn map_direntry(direntry: &DirEntry) -> dsync::Result<Entry<Utf8PathBuf>> {
    let metadata = direntry.metadata().await?;
    match Utf8PathBuf::try_from(direntry.path()) {
        Ok(path) => {
            let name = path.file_name().unwrap_or_default().to_string();
            Ok(map_metadata(name, path, &metadata))
        }
        // non UTF-8 names are listed as special entries, never transferred
        Err(err) => {
            let path = err.into_path_buf();
            let path = Utf8PathBuf::from(path.to_string_lossy().into_owned());
            let name = path.file_name().unwrap_or_default().to_string();
            let mtime = metadata.modified().ok().map(DateTime::<Utc>::from);
            Ok(Entry::special(name, path, mtime))
        }
    }
}

fn map_metadata(name: String, path: Utf8PathBuf, metadata: &std::fs::Metadata) -> Entry<Utf8PathBuf> {
    let mtime = metadata.modified().ok().map(DateTime::<Utc>::from);
    let ty = metadata.file_type();
    if ty.is_symlink() {
        Entry::symlink(name, path, mtime)
    } else if ty.is_file() {
        let mtime = mtime.unwrap_or_else(|| SystemTime::UNIX_EPOCH.into());
        Entry::regular(name, path, mtime, metadata.len())
    } else if ty.is_dir() {
        Entry::directory(name, path, mtime)
    } else {
        Entry::special(name, path, mtime)
    }
}
