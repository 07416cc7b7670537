//! Job-visible build log.
//!
//! Operators read (and sometimes parse) this output, so its line format is
//! stable: info lines are written verbatim, problems carry an `ERROR: ` or
//! `FATAL: ` prefix. Every line is also mirrored as a tracing event.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use crate::config::JobConfig;

/// Separator line framing the start header.
pub const HEADER_RULE: &str = "=======================";

/// Line-oriented writer for the job's log.
pub struct BuildLog {
    sink: Box<dyn Write + Send>,
}

impl BuildLog {
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self { sink }
    }

    /// Log to standard output.
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Log into memory; the returned capture reads back what was written.
    pub fn capture() -> (Self, LogCapture) {
        let capture = LogCapture::default();
        (Self::new(Box::new(capture.clone())), capture)
    }

    pub fn info(&mut self, message: &str) {
        info!(target: "octorelease::build_log", "{message}");
        self.write_line(message);
    }

    pub fn error(&mut self, message: &str) {
        warn!(target: "octorelease::build_log", "{message}");
        self.write_line(&format!("ERROR: {message}"));
    }

    pub fn fatal(&mut self, message: &str) {
        error!(target: "octorelease::build_log", "{message}");
        self.write_line(&format!("FATAL: {message}"));
    }

    fn write_line(&mut self, line: &str) {
        // A broken log sink must not fail the release itself.
        if let Err(e) = writeln!(self.sink, "{line}").and_then(|_| self.sink.flush()) {
            warn!(error = %e, "failed to write build log line");
        }
    }

    /// Write the header describing the configured inputs.
    ///
    /// Values are the configured ones, before variable substitution.
    pub fn start_header(&mut self, config: &JobConfig) {
        for line in start_header_lines(config) {
            self.info(&line);
        }
    }
}

/// Lines of the start header for `config`.
pub fn start_header_lines(config: &JobConfig) -> Vec<String> {
    let mut lines = vec![
        "Started Octopus Release".to_string(),
        HEADER_RULE.to_string(),
        format!("Project: {}", config.project),
        format!("Release Version: {}", config.release_version),
        format!("Include Release Notes?: {}", config.release_notes),
    ];
    if config.release_notes {
        lines.push(format!("\tRelease Notes Source: {}", config.release_notes_source));
        lines.push(format!("\tRelease Notes File: {}", config.release_notes_file));
    }
    lines.push(format!("Deploy this Release?: {}", config.deploy_this_release));
    if config.deploy_this_release {
        lines.push(format!("\tEnvironment: {}", config.environment));
        lines.push(format!("\tWait for Deployment: {}", config.wait_for_deployment));
    }
    if config.package_configs.is_empty() {
        lines.push("Package Configurations: none".to_string());
    } else {
        lines.push("Package Configurations:".to_string());
        for pc in &config.package_configs {
            lines.push(format!("\t{}\tv{}", pc.package_name, pc.package_version));
        }
    }
    lines.push(HEADER_RULE.to_string());
    lines
}

/// Shared in-memory sink for [`BuildLog::capture`].
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&buffer).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
