//! Logging initialization

use std::fs::File;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Initialize logging
///
/// With `debug` set, everything at debug level goes to a temporary file
/// whose path is returned, keeping stdout clean for the graph. Otherwise,
/// or when the log file cannot be opened, warnings go to stderr.
pub fn init_logging(debug: bool) -> Option<PathBuf> {
    if !debug {
        init_stderr();
        return None;
    }

    let log_path = tempfile::Builder::new()
        .prefix("kubegraph-")
        .suffix(".log")
        .tempfile()
        .and_then(|file| file.keep().map_err(|e| e.error))
        .map(|(_, path)| path)
        .unwrap_or_else(|_| {
            std::env::temp_dir().join(format!("kubegraph-{}.log", std::process::id()))
        });

    let Some(file) = open_log_file(&log_path) else {
        init_stderr();
        return None;
    };

    tracing_subscriber::fmt()
        .with_writer(file)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    Some(log_path)
}

fn init_stderr() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();
}

fn open_log_file(path: &Path) -> Option<File> {
    match std::fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)
    {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!(
                "Cannot open log file {}: {}; logging to stderr",
                path.display(),
                err
            );
            None
        }
    }
}
