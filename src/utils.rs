//! Utility functions for pacing, string manipulation, and file system checks.
//!
//! - Randomized sleeps for advisory rate limiting
//! - String truncation for logging (safe on Thai text)
//! - Output location validation before any network activity

use crate::config::DelayRange;
use rand::{Rng, rng};
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

/// Draw a random duration from `range`.
///
/// # Arguments
///
/// * `range` - Inclusive bounds, at millisecond precision
///
/// # Returns
///
/// A uniformly drawn duration. A reversed or empty range yields its lower
/// bound, so a zero range never sleeps.
pub fn random_delay(range: &DelayRange) -> Duration {
    let min = range.min.as_millis() as u64;
    let max = range.max.as_millis() as u64;
    if max <= min {
        return range.min;
    }
    Duration::from_millis(rng().random_range(min..=max))
}

/// Sleep for a random duration from `range`.
pub async fn pause(range: &DelayRange) {
    let delay = random_delay(range);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Truncate a string for logging purposes.
///
/// Cuts on a character boundary, so multi-byte Thai text never splits.
///
/// # Arguments
///
/// * `s` - The string to potentially truncate
/// * `max` - Maximum number of characters to keep
///
/// # Returns
///
/// The original string if it has at most `max` characters, otherwise the
/// first `max` characters with `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure the directory that will hold `file` exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or written to.
#[instrument(level = "info", skip_all, fields(file = %file.display()))]
pub async fn ensure_parent_writable(file: &Path) -> Result<(), Box<dyn Error>> {
    let dir = match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    fs::create_dir_all(&dir).await?;

    // Try a small sync write using std fs (simpler error surface)
    let probe_path = dir.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!(dir = %dir.display(), "Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
