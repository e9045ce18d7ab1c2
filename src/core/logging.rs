//! Structured logging
//!
//! JSON or text output to stdout or a size-rotated file, driven by
//! [`LoggingConfig`]. `RUST_LOG` wins over the configured level when set.

use crate::core::config::LoggingConfig;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Keeps the non-blocking writer alive; drop it only at shutdown
pub struct Logger {
    _guard: WorkerGuard,
}

impl Logger {
    /// Install the global tracing subscriber
    pub fn init(config: &LoggingConfig) -> Result<Self> {
        let level = parse_log_level(&config.level)?;

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

        let (writer, guard) = match config.output.as_str() {
            "stdout" => tracing_appender::non_blocking(std::io::stdout()),
            "file" => {
                let log_file = config
                    .log_file
                    .as_ref()
                    .context("log_file must be specified when output is 'file'")?;

                if let Some(parent) = log_file.parent() {
                    std::fs::create_dir_all(parent).context("Failed to create log directory")?;
                }

                let appender =
                    RollingFileAppender::new(log_file, config.max_file_size, config.max_backups)?;
                tracing_appender::non_blocking(appender)
            }
            other => anyhow::bail!("Invalid output configuration: {}", other),
        };

        let fmt_layer = match config.format.as_str() {
            "json" => fmt::layer()
                .json()
                .with_writer(writer)
                .with_current_span(true)
                .with_target(true)
                .boxed(),
            "text" => fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(config.output == "stdout")
                .boxed(),
            other => anyhow::bail!("Invalid format configuration: {}", other),
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .context("Failed to initialize tracing subscriber")?;

        tracing::info!(
            level = %config.level,
            format = %config.format,
            output = %config.output,
            "Logging system initialized"
        );

        Ok(Logger { _guard: guard })
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("Invalid log level: {}", level),
    }
}

/// Our crate and the HTTP trace layer follow the configured level; everything else stays at warn
fn default_directives(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    format!("warn,school_registry={level},tower_http={level}")
}

/// File writer that rotates to `<name>.1 .. <name>.N` once `max_file_size` is reached
pub struct RollingFileAppender {
    path: PathBuf,
    max_file_size: usize,
    max_backups: usize,
    state: Mutex<AppenderState>,
}

struct AppenderState {
    file: Option<File>,
    size: usize,
}

impl RollingFileAppender {
    pub fn new(path: &Path, max_file_size: usize, max_backups: usize) -> Result<Self> {
        path.file_name().context("Log file must have a filename")?;

        Ok(Self {
            path: path.to_path_buf(),
            max_file_size,
            max_backups,
            state: Mutex::new(AppenderState { file: None, size: 0 }),
        })
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&self, state: &mut AppenderState) -> std::io::Result<()> {
        state.file = None;

        for i in (1..self.max_backups).rev() {
            let from = self.backup_path(i);
            if from.exists() {
                std::fs::rename(&from, self.backup_path(i + 1))?;
            }
        }

        if self.path.exists() {
            std::fs::rename(&self.path, self.backup_path(1))?;
        }

        state.size = 0;
        Ok(())
    }

    fn open(&self, state: &mut AppenderState) -> std::io::Result<()> {
        if state.file.is_none() {
            let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
            state.size = file.metadata()?.len() as usize;
            state.file = Some(file);
        }
        Ok(())
    }
}

impl Write for RollingFileAppender {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        self.open(&mut state)?;
        if state.size > 0 && state.size + buf.len() > self.max_file_size {
            self.rotate(&mut state)?;
            self.open(&mut state)?;
        }

        let written = match state.file.as_mut() {
            Some(file) => file.write(buf)?,
            None => 0,
        };
        state.size += written;

        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("debug"), Ok(Level::DEBUG)));
        assert!(matches!(parse_log_level("INFO"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("warn"), Ok(Level::WARN)));
        assert!(matches!(parse_log_level("error"), Ok(Level::ERROR)));
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn test_default_directives() {
        assert_eq!(
            default_directives(Level::DEBUG),
            "warn,school_registry=debug,tower_http=debug"
        );
    }

    #[test]
    fn test_rolling_appender_rotates() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("registry.log");
        let mut appender = RollingFileAppender::new(&path, 16, 2).unwrap();

        appender.write_all(b"0123456789\n").unwrap();
        appender.write_all(b"abcdefghij\n").unwrap();
        appender.write_all(b"ABCDEFGHIJ\n").unwrap();
        appender.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ABCDEFGHIJ\n");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("registry.log.1")).unwrap(),
            "abcdefghij\n"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("registry.log.2")).unwrap(),
            "0123456789\n"
        );
    }
}
