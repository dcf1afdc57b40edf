use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};

/// Replace characters that are unsafe in file names.
///
/// Whitespace becomes `-`, anything outside `[A-Za-z0-9._-]` becomes `_`. Leading dots and
/// separators are stripped; an empty result becomes `"recording"`.
pub fn sanitize_file_stem(label: &str) -> String {
    let mapped: String = label
        .trim()
        .chars()
        .map(|c| match c {
            c if c.is_whitespace() => '-',
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') => c,
            _ => '_',
        })
        .collect();
    let trimmed = mapped.trim_matches(|c| matches!(c, '-' | '_' | '.'));
    if trimmed.is_empty() {
        "recording".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Issues `<dir>/<stem>_<YYYYMMDD-HHMMSS-mmm>.mp4` paths.
///
/// Repeated requests for the same directory and label within one millisecond get distinct names
/// (`-1`, `-2`, ... suffixes), regardless of what was issued in between.
#[derive(Debug, Default)]
pub struct OutputNamer {
    issued: Mutex<IssuedStamp>,
}

/// Names handed out for the most recent timestamp; older stamps can no longer collide.
#[derive(Debug, Default)]
struct IssuedStamp {
    stamp: String,
    counts: HashMap<PathBuf, u32>,
}

impl OutputNamer {
    /// Create a namer with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Output path for `label` recorded at `now`.
    pub fn next_path(&self, dir: &Path, label: &str, now: DateTime<Local>) -> PathBuf {
        let stamp = now.format("%Y%m%d-%H%M%S-%3f").to_string();
        let base = dir.join(format!("{}_{stamp}", sanitize_file_stem(label)));

        let repeat = match self.issued.lock() {
            Ok(mut issued) => {
                if issued.stamp != stamp {
                    issued.stamp = stamp;
                    issued.counts.clear();
                }
                let count = issued.counts.entry(base.clone()).or_insert(0);
                let n = *count;
                *count += 1;
                n
            }
            Err(_) => 0,
        };

        let mut name = base.into_os_string();
        if repeat == 0 {
            name.push(".mp4");
        } else {
            name.push(format!("-{repeat}.mp4"));
        }
        PathBuf::from(name)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/record/naming.rs"]
mod tests;
