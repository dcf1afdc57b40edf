use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::error::{BreathcastError, BreathcastResult};

/// Tunables of a [`crate::Recorder`].
///
/// Every field has a default, so a JSON config file only needs the keys it overrides.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecorderConfig {
    /// Directory recordings are written to. Created on demand.
    pub output_dir: PathBuf,
    /// Target H.264 bitrate in kbit/s.
    pub bitrate_kbps: u32,
    /// Sleep between encoder readiness polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Capacity of the encoder's in-flight frame queue.
    pub max_in_flight_frames: usize,
    /// Fraction of frames that may fail to render before the recording is abandoned.
    pub max_skipped_frame_ratio: f64,
    /// Opaque color transparent pixels are flattened over. `None` uses the theme background.
    pub background_rgba: Option<[u8; 4]>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("recordings"),
            bitrate_kbps: 10_000,
            poll_interval_ms: 10,
            max_in_flight_frames: 8,
            max_skipped_frame_ratio: 0.25,
            background_rgba: None,
        }
    }
}

impl RecorderConfig {
    /// Validate value ranges.
    pub fn validate(&self) -> BreathcastResult<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(BreathcastError::validation("output_dir must not be empty"));
        }
        if self.bitrate_kbps == 0 {
            return Err(BreathcastError::validation("bitrate_kbps must be > 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(BreathcastError::validation("poll_interval_ms must be > 0"));
        }
        if self.max_in_flight_frames == 0 {
            return Err(BreathcastError::validation(
                "max_in_flight_frames must be > 0",
            ));
        }
        if !self.max_skipped_frame_ratio.is_finite()
            || !(0.0..=1.0).contains(&self.max_skipped_frame_ratio)
        {
            return Err(BreathcastError::validation(
                "max_skipped_frame_ratio must be within [0, 1]",
            ));
        }
        if let Some([_, _, _, a]) = self.background_rgba
            && a != 255
        {
            return Err(BreathcastError::validation(
                "background_rgba must be opaque (alpha 255)",
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(s: &str) -> BreathcastResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| BreathcastError::validation(format!("invalid recorder config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: &Path) -> BreathcastResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read recorder config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Number of skipped frames tolerated in a recording of `total_frames`.
    pub fn max_skipped_frames(&self, total_frames: u64) -> u64 {
        (total_frames as f64 * self.max_skipped_frame_ratio).floor() as u64
    }
}

#[cfg(test)]
#[path = "../../tests/unit/record/config.rs"]
mod tests;
