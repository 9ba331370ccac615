//! Harness settings shared by the runner and the suite.

use anyhow::{Context as _, Result, anyhow};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for replaying transcripts.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// How long a blocked input read waits for the outputs that must precede it.
    pub handshake_timeout: Duration,
    /// Upper bound on one whole program run.
    pub run_timeout: Duration,
    /// Directory, relative to the transcript directory, receiving the log files.
    pub log_dir: PathBuf,
    /// Appended to a transcript's file stem to name its log file.
    pub log_suffix: String,
    /// Transcript file extension, without the dot.
    pub extension: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(5),
            run_timeout: Duration::from_secs(30),
            log_dir: PathBuf::from("logs"),
            log_suffix: "Test.log".to_string(),
            extension: "test".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Log file for `transcript`, inside `log_dir`: `calc.test` becomes `calcTest.log`.
    pub fn log_path(&self, log_dir: &Path, transcript: &Path) -> PathBuf {
        let stem = transcript
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        log_dir.join(format!("{stem}{}", self.log_suffix))
    }
}

/// Parse a duration string: `1s`, `500ms`, `1.5s`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if let Some(ms_str) = s.strip_suffix("ms") {
        let ms: u64 = ms_str
            .trim()
            .parse()
            .context("Invalid milliseconds value")?;
        Ok(Duration::from_millis(ms))
    } else if let Some(s_str) = s.strip_suffix('s') {
        let secs: f64 = s_str.trim().parse().context("Invalid seconds value")?;
        Duration::try_from_secs_f64(secs).context("Invalid seconds value")
    } else {
        Err(anyhow!("Duration must end with 's' or 'ms', got: {}", s))
    }
}
