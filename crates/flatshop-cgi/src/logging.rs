//! Logging setup
//!
//! Under CGI, stderr goes to the web server's error log, so that is the
//! default destination. `log_file` redirects it to a file of our own,
//! appended to by every request process.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use flatshop_core::Config;

/// Install the global subscriber
///
/// `log_level` is an `EnvFilter` directive; a bare level applies to both
/// flatshop crates only. A log file that cannot be opened falls back to
/// stderr, so a request is still answered.
pub fn init(config: &Config) {
    let writer = match &config.log_file {
        Some(path) => match open_log_file(path) {
            Ok(file) => BoxMakeWriter::new(Mutex::new(file)),
            Err(e) => {
                eprintln!("Warning: {:#}", e);
                BoxMakeWriter::new(std::io::stderr)
            }
        },
        None => BoxMakeWriter::new(std::io::stderr),
    };

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(&config.log_level))
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .try_init();
}

fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Could not open log file {:?}", path))
}

fn filter(log_level: &str) -> EnvFilter {
    let directive = if is_bare_level(log_level) {
        format!("flatshop_core={0},flatshop_cgi={0}", log_level)
    } else {
        log_level.to_string()
    };
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn is_bare_level(directive: &str) -> bool {
    matches!(
        directive.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_log_file_appends() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("flatshop.log");
        std::fs::write(&path, "earlier\n").unwrap();

        let mut file = open_log_file(&path).unwrap();
        std::io::Write::write_all(&mut file, b"later\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "earlier\nlater\n");

        assert!(open_log_file(&temp.path().join("missing/dir/log")).is_err());
    }

    #[test]
    fn test_bare_level() {
        assert!(is_bare_level("debug"));
        assert!(is_bare_level("WARN"));
        assert!(!is_bare_level("flatshop_core=debug"));
        assert!(!is_bare_level("verbose"));
    }
}
