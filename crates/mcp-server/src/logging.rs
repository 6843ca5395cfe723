//! Logger selection.
//!
//! The `loggers` option picks the active sinks. stdout is reserved for the
//! MCP protocol, so the stderr sink writes to stderr only; the disk sink
//! appends to a state-dir log file. Every line passes through the keychain
//! so registered secrets never reach a sink. The `mcp` sink (protocol log
//! notifications) is delivered by the transport collaborator.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use log::{LevelFilter, Log, Metadata, Record};

use mongo_mcp_config::{keychain, Config, LoggerKind};

struct CompositeLogger {
    stderr: bool,
    disk: Option<Mutex<File>>,
}

impl Log for CompositeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}] {}: {}",
            record.level(),
            record.target(),
            keychain().redact(&record.args().to_string())
        );
        if self.stderr {
            eprintln!("{line}");
        }
        if let Some(file) = &self.disk {
            if let Ok(mut file) = file.lock() {
                let _ = writeln!(file, "{line}");
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.disk {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

/// Default location of the disk log.
pub fn disk_log_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".mongodb-mcp").join("server.log"),
        None => std::env::temp_dir().join("mongodb-mcp.log"),
    }
}

/// Install the configured loggers. Safe to call once per process.
pub fn init(config: &Config) -> anyhow::Result<()> {
    let stderr = config.loggers.contains(&LoggerKind::Stderr);
    let disk = if config.loggers.contains(&LoggerKind::Disk) {
        let path = disk_log_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Some(Mutex::new(
            OpenOptions::new().create(true).append(true).open(&path)?,
        ))
    } else {
        None
    };

    if config.loggers.contains(&LoggerKind::Mcp) {
        // Forwarded as protocol logging notifications by the transport.
        log::debug!("mcp logger requested; delivery is handled by the transport layer");
    }

    log::set_boxed_logger(Box::new(CompositeLogger { stderr, disk }))?;
    log::set_max_level(LevelFilter::Info);
    Ok(())
}
