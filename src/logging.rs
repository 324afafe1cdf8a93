use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use anyhow::{Result, anyhow};
use virtualgpt_core::Config;

/// Route `log` output to a file: the terminal belongs to the UI.
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &Config) -> Result<PathBuf> {
    let log_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?
        .join("virtualgpt");
    fs::create_dir_all(&log_dir)?;

    let log_path = log_dir.join("virtualgpt.log");
    let file = OpenOptions::new().create(true).append(true).open(&log_path)?;

    env_logger::Builder::new()
        .parse_filters(&config.log_level)
        .parse_default_env()
        .format_timestamp_millis()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()?;

    Ok(log_path)
}
