use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{BreathcastError, BreathcastResult};
use crate::render::buffer::{PixelBuffer, PixelFormat};

/// Encoder settings negotiated when a session opens.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeConfig {
    /// Output dimensions.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Target video bitrate in kbit/s.
    pub bitrate_kbps: u32,
    /// Frames the writer queue may hold before [`EncoderSession::is_ready_for_more_data`] turns
    /// false.
    pub max_in_flight_frames: usize,
    /// Length of the finished output in frames, when known up front.
    ///
    /// `append` rejects timestamps at or past this count, and `finish` pads the output to it.
    pub duration_frames: Option<u64>,
}

impl EncodeConfig {
    /// Reject settings no sink can encode.
    pub fn validate(&self) -> BreathcastResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(BreathcastError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(BreathcastError::validation("encode fps must be non-zero"));
        }
        if !self.canvas.width.is_multiple_of(2) || !self.canvas.height.is_multiple_of(2) {
            // yuv420p output subsamples chroma 2x2.
            return Err(BreathcastError::validation(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if self.bitrate_kbps == 0 {
            return Err(BreathcastError::validation("encode bitrate must be non-zero"));
        }
        if self.max_in_flight_frames == 0 {
            return Err(BreathcastError::validation(
                "encode max_in_flight_frames must be >= 1",
            ));
        }
        if self.duration_frames == Some(0) {
            return Err(BreathcastError::validation(
                "encode duration_frames must be >= 1",
            ));
        }
        Ok(())
    }
}

/// Lifecycle state of an [`EncoderSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, sink not yet opened.
    Created,
    /// Sink opened; waiting for `begin_session`.
    Ready,
    /// Accepting frames.
    Writing,
    /// Input closed, output being flushed.
    Finalizing,
    /// Output complete.
    Completed,
    /// Irrecoverable encoder error.
    Failed,
}

/// Counters reported when a session completes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames accepted by `append`.
    pub frames_appended: u64,
    /// Frames the writer delivered to the sink.
    pub frames_written: u64,
}

/// Outcome passed to the [`EncoderSession::finish`] callback.
#[derive(Debug)]
pub enum FinishStatus {
    /// Output flushed and closed.
    Completed(SessionStats),
    /// Writing or finalization failed.
    Failed(BreathcastError),
}

#[derive(Default)]
struct WriterShared {
    failed: AtomicBool,
    error: Mutex<Option<String>>,
    written: AtomicU64,
}

impl WriterShared {
    fn fail(&self, msg: String) {
        if let Ok(mut slot) = self.error.lock()
            && slot.is_none()
        {
            *slot = Some(msg);
        }
        self.failed.store(true, Ordering::Release);
    }

    fn error_message(&self) -> Option<String> {
        self.error.lock().ok().and_then(|slot| slot.clone())
    }
}

struct FrameMsg {
    idx: FrameIndex,
    buffer: PixelBuffer,
}

/// One encoder output for one recording.
///
/// `open` -> `begin_session` -> `append`* -> `finish` (or `abort`). Frames are queued on a bounded channel and
/// written to the sink by a dedicated writer thread; `is_ready_for_more_data` reports whether the
/// queue has room. `finish` and `abort` consume the session, so it cannot be reused.
pub struct EncoderSession {
    cfg: EncodeConfig,
    state: SessionState,
    format: PixelFormat,
    sink: Option<Box<dyn FrameSink>>,
    tx: Option<Sender<FrameMsg>>,
    writer: Option<JoinHandle<Box<dyn FrameSink>>>,
    shared: Arc<WriterShared>,
    last_pts: Option<FrameIndex>,
    appended: u64,
}

impl EncoderSession {
    /// Validate `cfg` and open `sink`.
    ///
    /// Every failure is reported as [`BreathcastError::EncoderOpen`].
    pub fn open(mut sink: Box<dyn FrameSink>, cfg: EncodeConfig) -> BreathcastResult<Self> {
        cfg.validate()
            .map_err(|e| BreathcastError::encoder_open(format!("settings rejected: {e}")))?;

        sink.begin(SinkConfig {
            canvas: cfg.canvas,
            fps: cfg.fps,
            bitrate_kbps: cfg.bitrate_kbps,
            duration_frames: cfg.duration_frames,
        })
        .map_err(|e| match e {
            BreathcastError::EncoderOpen(_) => e,
            other => BreathcastError::encoder_open(other.to_string()),
        })?;

        tracing::info!(
            width = cfg.canvas.width,
            height = cfg.canvas.height,
            fps = cfg.fps.num,
            "encoder session opened"
        );
        Ok(Self {
            format: sink.pixel_format(),
            cfg,
            state: SessionState::Ready,
            sink: Some(sink),
            tx: None,
            writer: None,
            shared: Arc::new(WriterShared::default()),
            last_pts: None,
            appended: 0,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Settings the session was opened with.
    pub fn config(&self) -> &EncodeConfig {
        &self.cfg
    }

    /// Pixel layout `append` expects.
    pub fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    /// Frames accepted so far.
    pub fn frames_appended(&self) -> u64 {
        self.appended
    }

    /// Start accepting frames; the time origin is presentation timestamp 0.
    pub fn begin_session(&mut self) -> BreathcastResult<()> {
        if self.state != SessionState::Ready {
            return Err(BreathcastError::encoder_write(format!(
                "begin_session called in state {:?}",
                self.state
            )));
        }
        let sink = self
            .sink
            .take()
            .ok_or_else(|| BreathcastError::encoder_write("encoder sink missing"))?;

        let (tx, rx) = bounded::<FrameMsg>(self.cfg.max_in_flight_frames);
        let shared = Arc::clone(&self.shared);
        let writer = std::thread::Builder::new()
            .name("breathcast-encoder".to_string())
            .spawn(move || write_frames(sink, rx, &shared))
            .map_err(|e| {
                self.state = SessionState::Failed;
                BreathcastError::encoder_write(format!("failed to spawn encoder thread: {e}"))
            })?;

        self.tx = Some(tx);
        self.writer = Some(writer);
        self.state = SessionState::Writing;
        Ok(())
    }

    /// `true` once the writer has hit an irrecoverable error.
    pub fn has_failed(&self) -> bool {
        self.state == SessionState::Failed || self.shared.failed.load(Ordering::Acquire)
    }

    /// Non-blocking backpressure signal: `true` when `append` will not have to wait.
    pub fn is_ready_for_more_data(&self) -> bool {
        self.state == SessionState::Writing
            && !self.shared.failed.load(Ordering::Acquire)
            && self.tx.as_ref().is_some_and(|tx| !tx.is_full())
    }

    /// Queue `buffer` at presentation timestamp `pts`.
    ///
    /// Returns `false` when the session is not writing, `pts` does not increase, the buffer does
    /// not match the session, or the writer has failed.
    pub fn append(&mut self, buffer: PixelBuffer, pts: FrameIndex) -> bool {
        if self.state != SessionState::Writing {
            tracing::warn!(state = ?self.state, pts = pts.0, "append outside writing state");
            return false;
        }
        if let Some(last) = self.last_pts
            && pts <= last
        {
            tracing::warn!(pts = pts.0, last = last.0, "non-increasing presentation timestamp");
            return false;
        }
        if let Some(total) = self.cfg.duration_frames
            && pts.0 >= total
        {
            tracing::warn!(pts = pts.0, total, "presentation timestamp past the output duration");
            return false;
        }
        if buffer.canvas() != self.cfg.canvas || buffer.format() != self.format {
            tracing::warn!(pts = pts.0, "pixel buffer does not match encoder settings");
            return false;
        }
        if self.shared.failed.load(Ordering::Acquire) {
            self.state = SessionState::Failed;
            return false;
        }
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };
        if tx.send(FrameMsg { idx: pts, buffer }).is_err() {
            self.state = SessionState::Failed;
            return false;
        }
        self.last_pts = Some(pts);
        self.appended += 1;
        true
    }

    /// Close input and flush asynchronously.
    ///
    /// `on_complete` runs exactly once, on a finalizer thread, with the final status.
    pub fn finish<F>(self, on_complete: F)
    where
        F: FnOnce(FinishStatus) + Send + 'static,
    {
        self.close(None, on_complete);
    }

    /// Close input and discard the output.
    ///
    /// The sink is closed without trailing padding and `on_complete` receives
    /// [`FinishStatus::Failed`] carrying `reason`.
    pub fn abort<F>(self, reason: BreathcastError, on_complete: F)
    where
        F: FnOnce(FinishStatus) + Send + 'static,
    {
        self.close(Some(reason), on_complete);
    }

    fn close<F>(mut self, abort: Option<BreathcastError>, on_complete: F)
    where
        F: FnOnce(FinishStatus) + Send + 'static,
    {
        let prior = self.state;
        self.state = SessionState::Finalizing;
        tracing::debug!(
            ?prior,
            appended = self.appended,
            aborting = abort.is_some(),
            "finalizing encoder session"
        );

        drop(self.tx.take());
        let writer = self.writer.take();
        let idle_sink = self.sink.take();
        let shared = Arc::clone(&self.shared);
        let appended = self.appended;

        let job = move || {
            let status = finalize_sink(writer, idle_sink, &shared, appended, prior, abort);
            match &status {
                FinishStatus::Completed(stats) => {
                    tracing::info!(
                        frames_appended = stats.frames_appended,
                        frames_written = stats.frames_written,
                        "encoder session completed"
                    );
                }
                FinishStatus::Failed(e) => tracing::error!(error = %e, "encoder session failed"),
            }
            on_complete(status);
        };

        let job = Arc::new(Mutex::new(Some(job)));
        let thread_job = Arc::clone(&job);
        if let Err(e) = std::thread::Builder::new()
            .name("breathcast-finalize".to_string())
            .spawn(move || run_once(&thread_job))
        {
            tracing::warn!(error = %e, "finalizing on the caller thread");
            run_once(&job);
        }
    }
}

fn write_frames(
    mut sink: Box<dyn FrameSink>,
    rx: Receiver<FrameMsg>,
    shared: &WriterShared,
) -> Box<dyn FrameSink> {
    for msg in rx.iter() {
        if let Err(e) = sink.push_frame(msg.idx, &msg.buffer) {
            tracing::error!(pts = msg.idx.0, error = %e, "encoder rejected frame");
            shared.fail(e.to_string());
            break;
        }
        shared.written.fetch_add(1, Ordering::Relaxed);
    }
    sink
}

fn run_once<F: FnOnce()>(job: &Mutex<Option<F>>) {
    let job = job.lock().ok().and_then(|mut slot| slot.take());
    if let Some(job) = job {
        job();
    }
}

fn finalize_sink(
    writer: Option<JoinHandle<Box<dyn FrameSink>>>,
    idle_sink: Option<Box<dyn FrameSink>>,
    shared: &WriterShared,
    appended: u64,
    prior: SessionState,
    abort: Option<BreathcastError>,
) -> FinishStatus {
    let sink = match writer {
        Some(handle) => match handle.join() {
            Ok(sink) => Some(sink),
            Err(_) => {
                return FinishStatus::Failed(BreathcastError::encoder_write(
                    "encoder thread panicked",
                ));
            }
        },
        None => idle_sink,
    };
    let Some(mut sink) = sink else {
        return FinishStatus::Failed(BreathcastError::encoder_write("encoder sink missing"));
    };

    // Always close the sink so external encoders are reaped. Output that will be discarded is
    // not padded.
    let writer_failed = shared.failed.load(Ordering::Acquire) || prior == SessionState::Failed;
    let end_res = if abort.is_some() || writer_failed {
        sink.abort()
    } else {
        sink.end()
    };

    if let Some(reason) = abort {
        return FinishStatus::Failed(reason);
    }
    if let Some(msg) = shared.error_message() {
        return FinishStatus::Failed(BreathcastError::encoder_write(msg));
    }
    if prior == SessionState::Failed {
        return FinishStatus::Failed(BreathcastError::encoder_write(
            "encoder writer stopped accepting frames",
        ));
    }
    if let Err(e) = end_res {
        return FinishStatus::Failed(match e {
            BreathcastError::EncoderWrite(_) => e,
            other => BreathcastError::encoder_write(other.to_string()),
        });
    }

    FinishStatus::Completed(SessionStats {
        frames_appended: appended,
        frames_written: shared.written.load(Ordering::Relaxed),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/encode/session.rs"]
mod tests;
