//! File-backed `tracing` subscriber. The terminal belongs to the TUI, so events never
//! go to stdout or stderr.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::APP_NAME;

/// Log file location: explicit path, then the configured one, then the user cache dir.
pub fn resolve_log_path(cli_path: Option<&Path>, config: &LoggingConfig) -> Result<PathBuf> {
    if let Some(path) = cli_path.or(config.file.as_deref()) {
        return Ok(path.to_path_buf());
    }
    let dir = dirs::cache_dir()
        .ok_or_else(|| eyre!("Could not determine cache directory for the log file"))?;
    Ok(dir.join(APP_NAME).join(format!("{}.log", APP_NAME)))
}

/// Installs the global subscriber. `RUST_LOG` overrides the configured level;
/// `--debug` raises it to `debug`.
pub fn init(path: &Path, config: &LoggingConfig, debug: bool) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| eyre!("Cannot open log file {}: {}", path.display(), e))?;

    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if debug {
            "debug".to_string()
        } else {
            config.level.clone()
        }
    });
    let filter = EnvFilter::try_new(&level).map_err(|e| eyre!("Invalid log filter: {}", e))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

    tracing::info!(path = %path.display(), level = %level, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let config = LoggingConfig {
            file: Some(PathBuf::from("/tmp/from-config.log")),
            ..Default::default()
        };
        let path = resolve_log_path(Some(Path::new("/tmp/cli.log")), &config).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/cli.log"));
        let path = resolve_log_path(None, &config).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/from-config.log"));
    }
}
