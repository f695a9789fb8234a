//! Default locations of the files used by the synchronizer

use camino::Utf8PathBuf;

const APP_DIR: &str = "dsync";

fn app_dir(base: Option<std::path::PathBuf>, what: &str) -> anyhow::Result<Utf8PathBuf> {
    let base = base.ok_or_else(|| anyhow::anyhow!("Can't get {what} directory"))?;
    Ok(Utf8PathBuf::try_from(base)?.join(APP_DIR))
}

pub fn config_dir() -> anyhow::Result<Utf8PathBuf> {
    app_dir(dirs::config_dir(), "config")
}

pub fn cache_dir() -> anyhow::Result<Utf8PathBuf> {
    app_dir(dirs::cache_dir(), "cache")
}

/// `<config_dir>/dsync/config.json`
pub fn config_file() -> anyhow::Result<Utf8PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

/// `client_secret.json` as downloaded from the Google console
pub fn client_secret_file() -> anyhow::Result<Utf8PathBuf> {
    Ok(config_dir()?.join("client_secret.json"))
}

pub fn token_cache_file() -> anyhow::Result<Utf8PathBuf> {
    Ok(cache_dir()?.join("token_cache.json"))
}
