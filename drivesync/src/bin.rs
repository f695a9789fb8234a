use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use dsync::{config::ProviderConfig, loc, Config, Direction, Entry, LogReporter};
use drivesync::{
    oauth2,
    storage::{self, fs::FileSystem, gdrive::GoogleDrive, LocalStorage},
    Driver, PersistCache,
};

#[cfg(unix)]
mod posix;

#[derive(Parser)]
#[command(name = "drivesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file [default: <config dir>/dsync/config.json]
    #[arg(short, long)]
    config: Option<Utf8PathBuf>,

    /// Overrides the direction of the configuration (pull, push or both)
    #[arg(short, long)]
    direction: Option<Direction>,

    /// Number of mappings synchronized concurrently
    #[arg(short, long)]
    jobs: Option<usize>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    #[cfg(unix)]
    if let Err(err) = posix::init_logging() {
        eprintln!("Could not initialize logging: {err:#}");
        return ExitCode::FAILURE;
    }
    #[cfg(not(unix))]
    init_env_logger();

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(err) => {
            log::error!("Could not start the async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_env_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Returns whether every mapping was synchronized
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config_file = match cli.config {
        Some(config_file) => config_file,
        None => loc::config_file()?,
    };
    if !config_file.exists() {
        anyhow::bail!("No such config file: {config_file}");
    }
    log::info!("Found config file: {config_file}");

    let mut config = Config::load_from_file(&config_file).await?;
    if let Some(direction) = cli.direction {
        config.direction = direction;
    }
    if let Some(jobs) = cli.jobs {
        anyhow::ensure!(jobs > 0, "--jobs must be at least 1");
        config.jobs = jobs;
    }
    log::trace!("Loaded config: {config:?}");

    let local = FileSystem::new();

    match &config.provider {
        ProviderConfig::GoogleDrive(gd_config) => {
            let secret =
                dsync::oauth2::Secret::resolve(gd_config.secret.as_ref(), &loc::client_secret_file()?).await?;
            log::info!(
                "Initializing Google Drive storage with client-id {}",
                secret.client_id.as_str()
            );

            let client = reqwest::Client::builder().build()?;
            let auth = oauth2::Client::new(
                secret,
                oauth2::TokenPersist::MemoryAndDisk(loc::token_cache_file()?),
                Some(client.clone()),
            )
            .await?;
            let remote = GoogleDrive::new(auth.clone(), client, gd_config.root.as_deref()).await;
            let remote = match remote {
                Ok(remote) => remote,
                Err(err) => {
                    persist(&auth).await;
                    return Err(err.into());
                }
            };
            let remote_root = remote.root_entry();
            synchronize(local, remote, remote_root, &config).await
        }
    }
}

async fn synchronize<L, R>(local: L, remote: R, remote_root: Entry<R::Handle>, config: &Config) -> anyhow::Result<bool>
where
    L: LocalStorage,
    R: storage::Storage,
{
    let driver = Driver::new(local, remote.clone(), remote_root, config)?;

    let report = tokio::select! {
        report = driver.run(&LogReporter) => report,
        _ = tokio::signal::ctrl_c() => {
            log::warn!("interrupted");
            persist(&remote).await;
            anyhow::bail!("Synchronization interrupted");
        }
    };
    persist(&remote).await;
    let report = report?;

    for mapping in &report.mappings {
        println!("{mapping}");
    }
    let total = report.total();
    log::info!(
        "{} pulled, {} pushed, {} up to date, {} held back, {} skipped, {} errors",
        total.pulled,
        total.pushed,
        total.up_to_date,
        total.held_back,
        total.skipped,
        total.errors
    );
    Ok(!report.has_failures())
}

async fn persist<P: PersistCache>(cache: &P) {
    if let Err(err) = cache.persist_cache().await {
        log::warn!("Could not persist cache: {err:#}");
    }
}
