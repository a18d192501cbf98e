use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{APP_NAME, ProjectPaths};

const MAX_LOG_SIZE: u64 = 1024 * 1024; // 1MB

/// Default filter for a `-d` count; `RUST_LOG` takes precedence
pub fn default_level(debug: u8) -> &'static str {
    match debug {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn env_filter(debug: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(debug)))
}

/// Initialize logging for a component.
///
/// Console output goes to stderr so it never mixes with command results. With
/// `file` set, logs are also appended to `<data_dir>/logs/<component>.log`.
///
/// Returns a guard that must be kept alive for the duration of the program.
pub fn init_logging(component: &str, file: bool, debug: u8) -> io::Result<Option<WorkerGuard>> {
    if !file {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter(debug))
            .with_writer(io::stderr)
            .init();
        return Ok(None);
    }

    let log_dir = log_directory()?;
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join(format!("{component}.log"));
    truncate_if_needed(&log_path)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    let (non_blocking_file, guard) = tracing_appender::non_blocking(BufWriter::new(file));

    tracing_subscriber::registry()
        .with(env_filter(debug))
        .with(fmt::layer().with_writer(io::stderr).with_ansi(true))
        .with(
            fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::info!("Logging to file: {}", log_path.display());
    Ok(Some(guard))
}

fn log_directory() -> io::Result<PathBuf> {
    ProjectPaths::new(APP_NAME)
        .map(|paths| paths.log_dir())
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Failed to find home directory"))
}

/// Start the log over once it has grown past MAX_LOG_SIZE
fn truncate_if_needed(log_path: &Path) -> io::Result<()> {
    match fs::metadata(log_path) {
        Ok(metadata) if metadata.len() > MAX_LOG_SIZE => {
            File::create(log_path)?;
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_from_debug_count() {
        assert_eq!(default_level(0), "info");
        assert_eq!(default_level(1), "debug");
        assert_eq!(default_level(5), "trace");
    }

    #[test]
    fn test_truncates_oversized_log() {
        let dir = tempfile::tempdir().unwrap();
        let big = dir.path().join("big.log");
        let small = dir.path().join("small.log");
        fs::write(&big, vec![b'x'; MAX_LOG_SIZE as usize + 1]).unwrap();
        fs::write(&small, b"keep me\n").unwrap();

        truncate_if_needed(&big).unwrap();
        truncate_if_needed(&small).unwrap();
        truncate_if_needed(&dir.path().join("absent.log")).unwrap();

        assert_eq!(fs::metadata(&big).unwrap().len(), 0);
        assert_eq!(fs::read(&small).unwrap(), b"keep me\n");
    }
}
