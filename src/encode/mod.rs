//! Encoder sinks and the session state machine that drives them.
//!
//! A [`FrameSink`](sink::FrameSink) is the raw output (an `ffmpeg` child process or memory). The
//! [`EncoderSession`](session::EncoderSession) wraps one sink with a bounded writer queue,
//! readiness signalling and asynchronous finalization.

/// `ffmpeg`-based sink (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Session lifecycle, backpressure and completion.
pub mod session;
/// Generic frame sink trait and the in-memory sink.
pub mod sink;
