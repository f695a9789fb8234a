use systemd_journal_logger::{connected_to_journal, JournalLog};

/// Logs to the journal when started by systemd, to stderr otherwise
pub fn init_logging() -> anyhow::Result<()> {
    if connected_to_journal() {
        JournalLog::new()?
            .add_extra_field("VERSION", env!("CARGO_PKG_VERSION"))
            .install()?;

        log::set_max_level(log::LevelFilter::Info);
    } else {
        super::init_env_logger();
    }
    Ok(())
}
