use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const MAX_LOG_AGE_DAYS: i64 = 3;
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Keeps the file writer flushing until dropped
#[allow(dead_code)]
pub struct LoggerGuard(WorkerGuard);

fn normalize_level(level: &str) -> &str {
    if LOG_LEVELS.contains(&level) {
        level
    } else {
        "info"
    }
}

/// Install a daily rolling file layer under `log_dir` and a colored stdout
/// layer. `RUST_LOG` directives take precedence over `level`.
pub fn init_logging(log_dir: impl AsRef<Path>, prefix: &str, level: &str) -> Result<LoggerGuard> {
    let log_dir = log_dir.as_ref().to_path_buf();
    let effective = normalize_level(level);

    let builder = EnvFilter::builder().with_default_directive(
        effective
            .parse()
            .context("Failed to parse default log directive")?,
    );
    let directives = std::env::var("RUST_LOG").unwrap_or_default();
    let console_filter = builder.clone().parse_lossy(&directives);
    let file_filter = builder.parse_lossy(&directives);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(&log_dir)
        .context(format!("Failed to create log appender in {:?}", log_dir))?;
    let (non_blocking, guard) = NonBlocking::new(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(file_filter);
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if effective != level {
        tracing::warn!("Invalid log level '{}', defaulting to 'info'", level);
    }

    start_log_cleanup_task(log_dir, prefix.to_string());

    Ok(LoggerGuard(guard))
}

fn start_log_cleanup_task(log_dir: PathBuf, prefix: String) {
    tokio::spawn(async move {
        loop {
            let cutoff = Utc::now() - chrono::Duration::days(MAX_LOG_AGE_DAYS);
            match cleanup_old_logs(&log_dir, &prefix, cutoff).await {
                Ok(0) => {}
                Ok(deleted) => tracing::info!("Deleted {} old log files", deleted),
                Err(e) => tracing::warn!("Failed to clean up old log files: {}", e),
            }
            tokio::time::sleep(CLEANUP_INTERVAL).await;
        }
    });
}

/// Remove `<prefix>*.log` files last modified before `cutoff`.
async fn cleanup_old_logs(
    log_dir: &Path,
    prefix: &str,
    cutoff: DateTime<Utc>,
) -> std::io::Result<usize> {
    let mut deleted = 0;
    let mut entries = tokio::fs::read_dir(log_dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !file_name.starts_with(prefix) || !file_name.ends_with(".log") {
            continue;
        }

        let modified: DateTime<Utc> = entry.metadata().await?.modified()?.into();
        if modified < cutoff {
            tokio::fs::remove_file(&path).await?;
            tracing::debug!("Old log file deleted: {}", file_name);
            deleted += 1;
        }
    }

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level("debug"), "debug");
        assert_eq!(normalize_level("verbose"), "info");
    }

    #[tokio::test]
    async fn test_cleanup_only_touches_matching_files() {
        let dir = std::env::temp_dir()
            .join(format!("norad-logs-{}", uuid::Uuid::new_v4().simple()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("norad-server.2026-01-01.log"), b"old").await.unwrap();
        tokio::fs::write(dir.join("other.log"), b"keep").await.unwrap();
        tokio::fs::write(dir.join("norad-server.txt"), b"keep").await.unwrap();

        // Everything is older than a cutoff in the future
        let cutoff = Utc::now() + chrono::Duration::days(1);
        let deleted = cleanup_old_logs(&dir, "norad-server", cutoff).await.unwrap();

        assert_eq!(deleted, 1);
        assert!(!dir.join("norad-server.2026-01-01.log").exists());
        assert!(dir.join("other.log").exists());
        assert!(dir.join("norad-server.txt").exists());

        // Nothing is older than a cutoff in the past
        tokio::fs::write(dir.join("norad-server.2026-01-02.log"), b"new").await.unwrap();
        let cutoff = Utc::now() - chrono::Duration::days(1);
        assert_eq!(cleanup_old_logs(&dir, "norad-server", cutoff).await.unwrap(), 0);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
