use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{BreathcastError, BreathcastResult};
use crate::render::buffer::{PixelBuffer, PixelFormat};

/// Configuration provided to a [`FrameSink`] when its session opens.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Output dimensions.
    pub canvas: Canvas,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Target video bitrate in kbit/s.
    pub bitrate_kbps: u32,
    /// Total frames the finished output must span, when known up front.
    ///
    /// Sinks that cannot carry per-frame timestamps pad through this count on `end`.
    pub duration_frames: Option<u64>,
}

/// Sink contract for consuming encoder-ready frames.
///
/// Ordering contract: `push_frame` is called with strictly increasing [`FrameIndex`] values,
/// starting at or after 0. Indices may skip values when the producer dropped a frame.
pub trait FrameSink: Send {
    /// Pixel layout this sink wants to receive.
    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Rgba8
    }
    /// Called once before any frames are pushed. Errors here mean the output cannot be opened.
    fn begin(&mut self, cfg: SinkConfig) -> BreathcastResult<()>;
    /// Push one frame at presentation timestamp `idx`.
    fn push_frame(&mut self, idx: FrameIndex, frame: &PixelBuffer) -> BreathcastResult<()>;
    /// Called once after the last frame; flushes and closes the output.
    fn end(&mut self) -> BreathcastResult<()>;
    /// Close the output of a recording that will be discarded. No trailing padding is written.
    fn abort(&mut self) -> BreathcastResult<()> {
        self.end()
    }
}

/// What an [`InMemorySink`] has received so far.
#[derive(Debug, Default)]
pub struct InMemoryRecording {
    /// Configuration passed to `begin`.
    pub config: Option<SinkConfig>,
    /// Frames in push order.
    pub frames: Vec<(FrameIndex, PixelBuffer)>,
    /// Whether `end` or `abort` was called.
    pub ended: bool,
    /// Whether the output was closed through `abort`.
    pub aborted: bool,
}

/// In-memory sink for tests and debugging.
///
/// The sink is moved into an encoder session; keep an [`InMemorySink::recording`] handle to
/// inspect what it received.
#[derive(Debug, Default, Clone)]
pub struct InMemorySink {
    recording: Arc<Mutex<InMemoryRecording>>,
    format: PixelFormat,
    frame_delay: Option<Duration>,
}

impl InMemorySink {
    /// Create a new in-memory sink that accepts RGBA frames.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that asks for a specific pixel layout.
    pub fn with_format(format: PixelFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Sleep for `delay` on every pushed frame, simulating a slow encoder.
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = Some(delay);
        self
    }

    /// Shared handle to the captured data.
    pub fn recording(&self) -> Arc<Mutex<InMemoryRecording>> {
        Arc::clone(&self.recording)
    }

    /// Presentation timestamps received so far.
    pub fn timestamps(&self) -> Vec<FrameIndex> {
        self.lock()
            .map(|r| r.frames.iter().map(|(idx, _)| *idx).collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> BreathcastResult<std::sync::MutexGuard<'_, InMemoryRecording>> {
        self.recording
            .lock()
            .map_err(|_| BreathcastError::encoder_write("in-memory sink lock poisoned"))
    }
}

impl FrameSink for InMemorySink {
    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn begin(&mut self, cfg: SinkConfig) -> BreathcastResult<()> {
        let mut rec = self.lock()?;
        rec.config = Some(cfg);
        rec.frames.clear();
        rec.ended = false;
        rec.aborted = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &PixelBuffer) -> BreathcastResult<()> {
        if let Some(delay) = self.frame_delay {
            std::thread::sleep(delay);
        }
        self.lock()?.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> BreathcastResult<()> {
        self.lock()?.ended = true;
        Ok(())
    }

    fn abort(&mut self) -> BreathcastResult<()> {
        let mut rec = self.lock()?;
        rec.ended = true;
        rec.aborted = true;
        Ok(())
    }
}
