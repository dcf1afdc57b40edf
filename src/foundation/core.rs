use crate::foundation::error::{BreathcastError, BreathcastResult};

/// Absolute 0-based frame index; doubles as the presentation timestamp in `1/fps` ticks.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> BreathcastResult<Self> {
        if den == 0 {
            return Err(BreathcastError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(BreathcastError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Integer frame rate (`den == 1`).
    pub const fn integer(num: u32) -> Self {
        Self { num, den: 1 }
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Timeline position of `frame`, in seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * f64::from(self.den) / f64::from(self.num)
    }

    /// Convert seconds to frame count using floor semantics.
    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        if !secs.is_finite() {
            return 0;
        }
        (secs * self.as_f64()).floor().max(0.0) as u64
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a canvas; zero-sized canvases are rejected.
    pub fn new(width: u32, height: u32) -> BreathcastResult<Self> {
        if width == 0 || height == 0 {
            return Err(BreathcastError::validation(
                "canvas width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    /// Bytes needed for one tightly packed 32-bit-per-pixel frame.
    pub fn rgba_len(self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

/// Fixed set of export resolutions offered to the control surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizePreset {
    /// 1080x1080.
    Square,
    /// 1080x1920, for phone stories.
    Portrait,
    /// 1920x1080.
    Landscape,
    /// 720x720, quick drafts.
    Small,
}

impl SizePreset {
    /// Every preset, in menu order.
    pub const ALL: [SizePreset; 4] = [
        SizePreset::Square,
        SizePreset::Portrait,
        SizePreset::Landscape,
        SizePreset::Small,
    ];

    /// Pixel dimensions of the preset.
    pub fn canvas(self) -> Canvas {
        let (width, height) = match self {
            SizePreset::Square => (1080, 1080),
            SizePreset::Portrait => (1080, 1920),
            SizePreset::Landscape => (1920, 1080),
            SizePreset::Small => (720, 720),
        };
        Canvas { width, height }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
