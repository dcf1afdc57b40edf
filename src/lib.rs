//! breathcast renders a cyclic breathing animation and records it to an MP4 file.
//!
//! A breathing pattern (`inhale-hold-exhale` seconds) drives a phase model; a recorder samples
//! that model at exactly 60 frames per second, renders every frame and streams the frames into
//! an encoder while honouring its backpressure.
//!
//! # Pipeline overview
//!
//! 1. **Phase**: `BreathingPattern + time -> PhaseSample` ([`sample_phase`], pure)
//! 2. **Render**: `FrameRequest -> FrameRGBA` ([`FrameRenderer`], run on the [`UiContext`])
//! 3. **Buffer**: `FrameRGBA -> PixelBuffer` ([`build_pixel_buffer`], exact size, opaque)
//! 4. **Encode**: `PixelBuffer -> MP4` ([`EncoderSession`] over a [`FrameSink`], usually
//!    the system `ffmpeg` binary)
//!
//! [`Recorder`] drives the loop on a background thread and reports through an [`EventSink`].
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic**: the phase model and the reference renderer are pure for given inputs.
//! - **Premultiplied RGBA8** out of renderers; buffers handed to encoders are opaque.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod encode;
mod foundation;
mod phase;
mod record;
mod render;

pub use encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, ensure_parent_dir, is_ffmpeg_on_path};
pub use encode::session::{EncodeConfig, EncoderSession, FinishStatus, SessionState, SessionStats};
pub use encode::sink::{FrameSink, InMemoryRecording, InMemorySink, SinkConfig};
pub use foundation::core::{Canvas, Fps, FrameIndex, SizePreset};
pub use foundation::error::{BreathcastError, BreathcastResult};
pub use phase::model::{Phase, PhaseSample, sample_phase};
pub use phase::pattern::{BreathingPattern, Exercise};
pub use record::config::RecorderConfig;
pub use record::events::{
    EventLevel, EventLog, EventSink, FanoutEventSink, ProgressEvent, TracingEventSink,
};
pub use record::naming::{OutputNamer, sanitize_file_stem};
pub use record::recorder::{
    EncoderFactory, FfmpegEncoderFactory, RECORDING_FPS, RecordOutcome, RecordStats, Recorder,
    RecordingHandle, RecordingRequest,
};
pub use record::ui::{UiCall, UiContext};
pub use render::backend::{FrameRGBA, FrameRenderer, FrameRequest, Palette, RenderParams, Theme};
pub use render::buffer::{PixelBuffer, PixelFormat, build_pixel_buffer};
pub use render::cpu::BreathingRenderer;
