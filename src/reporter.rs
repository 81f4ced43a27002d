// reporter.rs - Console Reporting and Result Persistence
// Purpose: Serialize console output across concurrent jobs and append valid
//          findings to an optional results log

use anyhow::{Context, Result};
use chrono::Local;
use colored::*;
use lazy_static::lazy_static;
use regex::Regex;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::engine::Finding;

lazy_static! {
    static ref ANSI_CODES: Regex = Regex::new("\x1b\\[[0-9;]*m").unwrap();
}

/// Strip ANSI color codes so persisted lines stay plain text.
pub fn strip_ansi(message: &str) -> String {
    ANSI_CODES.replace_all(message, "").into_owned()
}

/// Console reporting seam handed to the engine and orchestrator.
///
/// `persist` additionally routes the (color-stripped) message to the results
/// log. Reporting never blocks or fails a scan.
pub trait Reporter: Send + Sync {
    fn report(&self, message: &str, persist: bool);
}

/// Serializes console writes from concurrent jobs behind a single lock so
/// lines from different scans never interleave.
pub struct ConsoleReporter {
    print_lock: Mutex<()>,
    sink: ResultSink,
}

impl ConsoleReporter {
    pub fn new(sink: ResultSink) -> Self {
        Self {
            print_lock: Mutex::new(()),
            sink,
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, message: &str, persist: bool) {
        let _guard = self.print_lock.lock().unwrap();
        println!("{}", message);
        if persist {
            self.sink.append_line(&strip_ansi(message));
        }
    }
}

struct SinkInner {
    path: PathBuf,
    file: Mutex<File>,
}

/// Append-only destination for findings.
///
/// Cloneable; all clones share one file handle and lock, so concurrent
/// writers never interleave mid-line. With no destination configured every
/// append is a no-op.
#[derive(Clone)]
pub struct ResultSink {
    inner: Option<Arc<SinkInner>>,
}

impl ResultSink {
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Create the log fresh, truncating prior content, and write the header
    /// before any scan begins.
    pub fn create(path: &Path) -> Result<Self> {
        let mut file = File::create(path)
            .context(format!("Failed to initialize output file '{}'", path.display()))?;
        writeln!(file, "Skybrute Scan Results")?;
        writeln!(file, "=======================")?;
        writeln!(file, "Time: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
        Ok(Self {
            inner: Some(Arc::new(SinkInner {
                path: path.to_path_buf(),
                file: Mutex::new(file),
            })),
        })
    }

    /// Record one finding as `<url> (Status: <code>)`.
    pub fn append(&self, finding: &Finding) {
        self.append_line(&format!("{} (Status: {})", finding.url, finding.status));
    }

    /// Write one complete line under the lock. A failed write is reported to
    /// stderr only; losing a persisted line never fails the scan.
    pub fn append_line(&self, line: &str) {
        let Some(inner) = &self.inner else { return };
        let mut file = inner.file.lock().unwrap();
        if let Err(e) = writeln!(file, "{}", line) {
            eprintln!(
                "{}",
                format!("[!] Error writing to '{}': {}", inner.path.display(), e).red()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn strip_ansi_removes_color_codes() {
        assert_eq!(
            strip_ansi("\x1b[92mhttps://acme.s3.amazonaws.com\x1b[0m"),
            "https://acme.s3.amazonaws.com"
        );
        assert_eq!(strip_ansi("plain"), "plain");
    }

    #[test]
    fn create_writes_the_header_before_any_finding() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.txt");
        let _sink = ResultSink::create(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("Skybrute Scan Results"));
        assert_eq!(lines.next(), Some("======================="));
        assert!(lines.next().unwrap().starts_with("Time: "));
    }

    #[test]
    fn concurrent_appends_never_interleave() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.txt");
        let sink = ResultSink::create(&path).unwrap();

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    sink.append(&Finding {
                        url: format!("https://bucket-{}.s3.amazonaws.com", i),
                        status: 200,
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let findings: Vec<&str> = contents.lines().skip(3).collect();
        assert_eq!(findings.len(), 32);
        for line in findings {
            assert!(line.starts_with("https://bucket-"));
            assert!(line.ends_with(" (Status: 200)"));
        }
    }

    #[test]
    fn disabled_sink_ignores_appends() {
        let sink = ResultSink::disabled();
        // Must be a silent no-op, not a panic or a stray file.
        sink.append(&Finding {
            url: "https://acme.s3.amazonaws.com".to_string(),
            status: 200,
        });
    }

    #[test]
    fn persisted_reports_are_stripped_of_color() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.txt");
        let sink = ResultSink::create(&path).unwrap();

        let reporter = ConsoleReporter::new(sink);
        reporter.report("\x1b[92m[+] hit\x1b[0m", true);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.lines().any(|line| line == "[+] hit"));
    }
}
