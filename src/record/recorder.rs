use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Local;
use crossbeam_channel::Receiver;

use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::session::{EncodeConfig, EncoderSession, FinishStatus, SessionState};
use crate::encode::sink::FrameSink;
use crate::foundation::core::{Canvas, Fps, FrameIndex, SizePreset};
use crate::foundation::error::{BreathcastError, BreathcastResult};
use crate::phase::model::sample_phase;
use crate::phase::pattern::{BreathingPattern, Exercise};
use crate::record::config::RecorderConfig;
use crate::record::events::{EventLevel, EventSink};
use crate::record::naming::OutputNamer;
use crate::record::ui::{UiCall, UiContext};
use crate::render::backend::{FrameRGBA, FrameRequest, RenderParams, Theme};
use crate::render::buffer::build_pixel_buffer;

/// Recording frame rate.
pub const RECORDING_FPS: u32 = 60;

/// Emit a progress event every this many frames.
const PROGRESS_EVERY_FRAMES: u64 = 60;

/// Parameters of one recording.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RecordingRequest {
    /// Pattern text such as `"4-7-8"`. Malformed text falls back to 4-0-4.
    pub pattern_source: String,
    /// Color theme handed to the renderer.
    pub theme: Theme,
    /// Content name, used in the output file name.
    pub label: String,
    /// Recording length in seconds.
    pub duration_secs: f64,
    /// Output size.
    pub canvas: Canvas,
}

impl RecordingRequest {
    /// Request for one of the preset exercises.
    pub fn for_exercise(
        exercise: Exercise,
        theme: Theme,
        size: SizePreset,
        duration_secs: f64,
    ) -> Self {
        Self {
            pattern_source: exercise.pattern_source().to_string(),
            theme,
            label: exercise.label().to_string(),
            duration_secs,
            canvas: size.canvas(),
        }
    }

    /// Frame rate of every recording.
    pub fn fps(&self) -> Fps {
        Fps::integer(RECORDING_FPS)
    }

    /// `floor(duration * fps)`.
    pub fn total_frames(&self) -> u64 {
        self.fps().secs_to_frames_floor(self.duration_secs)
    }

    /// Pattern the animation follows, after fallback.
    pub fn pattern(&self) -> BreathingPattern {
        BreathingPattern::parse_or_default(&self.pattern_source)
    }

    /// Renderer parameters for this request.
    pub fn render_params(&self) -> RenderParams {
        RenderParams {
            theme: self.theme,
            pattern: self.pattern(),
            label: self.label.clone(),
        }
    }

    /// Reject requests that cannot produce a video.
    pub fn validate(&self) -> BreathcastResult<()> {
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(BreathcastError::validation(format!(
                "duration must be finite and > 0, got {}",
                self.duration_secs
            )));
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(BreathcastError::validation("canvas width/height must be > 0"));
        }
        if self.total_frames() == 0 {
            return Err(BreathcastError::validation(format!(
                "duration {}s is shorter than one frame at {RECORDING_FPS} fps",
                self.duration_secs
            )));
        }
        Ok(())
    }
}

/// Creates the frame sink a recording writes into.
pub trait EncoderFactory: Send + Sync {
    /// Sink writing to `out_path`. `background` is the opaque color frames are flattened over.
    fn create_sink(
        &self,
        out_path: &Path,
        background: [u8; 4],
    ) -> BreathcastResult<Box<dyn FrameSink>>;
}

impl<F> EncoderFactory for F
where
    F: Fn(&Path, [u8; 4]) -> BreathcastResult<Box<dyn FrameSink>> + Send + Sync,
{
    fn create_sink(
        &self,
        out_path: &Path,
        background: [u8; 4],
    ) -> BreathcastResult<Box<dyn FrameSink>> {
        self(out_path, background)
    }
}

/// Encodes MP4 files with the system `ffmpeg`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegEncoderFactory;

impl EncoderFactory for FfmpegEncoderFactory {
    fn create_sink(
        &self,
        out_path: &Path,
        background: [u8; 4],
    ) -> BreathcastResult<Box<dyn FrameSink>> {
        Ok(Box::new(FfmpegSink::new(FfmpegSinkOpts {
            bg_rgba: background,
            ..FfmpegSinkOpts::new(out_path)
        })))
    }
}

/// Frame counts of a finished recording.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecordStats {
    /// `floor(duration * fps)`.
    pub frames_total: u64,
    /// Frames handed to the encoder.
    pub frames_appended: u64,
    /// Frames whose render or buffer build failed.
    pub frames_skipped: u64,
}

/// Result delivered once per started recording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Whether a complete video was written.
    pub success: bool,
    /// The video, when `success`.
    pub output_path: Option<PathBuf>,
    /// Frame counts reached before completion.
    pub stats: RecordStats,
}

impl RecordOutcome {
    fn failed(stats: RecordStats) -> Self {
        Self {
            success: false,
            output_path: None,
            stats,
        }
    }
}

/// Handle to an in-flight recording.
#[derive(Debug)]
pub struct RecordingHandle {
    output_path: PathBuf,
    done: Receiver<RecordOutcome>,
}

impl RecordingHandle {
    /// Where the video will be written.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Outcome, if completion has already been delivered.
    pub fn try_outcome(&self) -> Option<RecordOutcome> {
        self.done.try_recv().ok()
    }

    /// Block until completion has been delivered.
    pub fn wait(self) -> RecordOutcome {
        self.done
            .recv()
            .unwrap_or_else(|_| RecordOutcome::failed(RecordStats::default()))
    }
}

/// Records breathing animations to video files.
///
/// At most one recording runs per recorder. The frame loop runs on a background thread; frames
/// are rendered on the [`UiContext`] and completion callbacks are delivered there too.
pub struct Recorder {
    cfg: RecorderConfig,
    ui: UiContext,
    encoders: Arc<dyn EncoderFactory>,
    namer: Arc<OutputNamer>,
    busy: Arc<AtomicBool>,
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("cfg", &self.cfg)
            .field("ui", &self.ui)
            .field("busy", &self.is_recording())
            .finish_non_exhaustive()
    }
}

impl Recorder {
    /// Recorder encoding through `ffmpeg`.
    pub fn new(cfg: RecorderConfig, ui: UiContext) -> BreathcastResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            ui,
            encoders: Arc::new(FfmpegEncoderFactory),
            namer: Arc::new(OutputNamer::new()),
            busy: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replace how frame sinks are created.
    pub fn with_encoder_factory(mut self, encoders: impl EncoderFactory + 'static) -> Self {
        self.encoders = Arc::new(encoders);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &RecorderConfig {
        &self.cfg
    }

    /// Whether a recording is in flight.
    pub fn is_recording(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Start a recording.
    ///
    /// Invalid requests and a second concurrent recording are rejected here, before anything is
    /// opened. Otherwise the returned handle completes exactly once, after `on_complete` has run
    /// on the UI context with `(true, Some(path))` or `(false, None)`.
    pub fn record<F>(
        &self,
        request: RecordingRequest,
        events: Arc<dyn EventSink>,
        on_complete: F,
    ) -> BreathcastResult<RecordingHandle>
    where
        F: FnOnce(bool, Option<PathBuf>) + Send + 'static,
    {
        request.validate()?;
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(BreathcastError::validation(
                "a recording is already in progress",
            ));
        }

        let out_path = self
            .namer
            .next_path(&self.cfg.output_dir, &request.label, Local::now());
        let (done_tx, done) = crossbeam_channel::bounded(1);

        let job = RecordJob {
            params: Arc::new(request.render_params()),
            request,
            out_path: out_path.clone(),
            cfg: self.cfg.clone(),
            ui: self.ui.clone(),
            encoders: Arc::clone(&self.encoders),
            events: Arc::clone(&events),
            completion: Completion {
                ui: self.ui.clone(),
                busy: Arc::clone(&self.busy),
                on_complete: Box::new(on_complete),
                done_tx,
            },
        };

        let spawned = std::thread::Builder::new()
            .name("breathcast-record".to_string())
            .spawn(move || run_recording(job));
        if let Err(e) = spawned {
            self.busy.store(false, Ordering::Release);
            events.emit(EventLevel::Error, &format!("Could not start recording: {e}"));
            return Err(anyhow::anyhow!("spawn recording thread: {e}").into());
        }

        Ok(RecordingHandle {
            output_path: out_path,
            done,
        })
    }

    /// Render a single frame of `request` at time `t` via the UI context.
    pub fn render_still(&self, request: &RecordingRequest, t: f64) -> BreathcastResult<FrameRGBA> {
        let params = Arc::new(request.render_params());
        let frame = FrameRequest {
            time_secs: t,
            sample: sample_phase(&params.pattern, t),
            canvas: request.canvas,
        };
        self.ui.render(frame, params)
    }
}

struct Completion {
    ui: UiContext,
    busy: Arc<AtomicBool>,
    on_complete: Box<dyn FnOnce(bool, Option<PathBuf>) + Send>,
    done_tx: crossbeam_channel::Sender<RecordOutcome>,
}

impl Completion {
    /// Release the recorder, run `on_complete` on the UI context, then wake waiters.
    ///
    /// The recorder is idle by the time `on_complete` runs, so the callback may start the next
    /// recording.
    fn deliver(self, outcome: RecordOutcome) {
        let Self {
            ui,
            busy,
            on_complete,
            done_tx,
        } = self;
        let call: UiCall = Box::new(move || {
            busy.store(false, Ordering::Release);
            on_complete(outcome.success, outcome.output_path.clone());
            let _ = done_tx.send(outcome);
        });
        if let Err(call) = ui.dispatch(call) {
            tracing::warn!("ui context is gone; delivering completion inline");
            call();
        }
    }
}

struct RecordJob {
    request: RecordingRequest,
    params: Arc<RenderParams>,
    out_path: PathBuf,
    cfg: RecorderConfig,
    ui: UiContext,
    encoders: Arc<dyn EncoderFactory>,
    events: Arc<dyn EventSink>,
    completion: Completion,
}

#[tracing::instrument(
    name = "record",
    skip_all,
    fields(out = %job.out_path.display(), frames = job.request.total_frames())
)]
fn run_recording(job: RecordJob) {
    let RecordJob {
        request,
        params,
        out_path,
        cfg,
        ui,
        encoders,
        events,
        completion,
    } = job;

    let mut stats = RecordStats {
        frames_total: request.total_frames(),
        ..RecordStats::default()
    };
    events.emit(
        EventLevel::Info,
        &format!(
            "Recording '{}' ({}): {}x{}, {}s, {} frames at {RECORDING_FPS} fps",
            request.label,
            params.pattern,
            request.canvas.width,
            request.canvas.height,
            request.duration_secs,
            stats.frames_total,
        ),
    );

    remove_stale_output(&out_path);

    let background = cfg
        .background_rgba
        .unwrap_or_else(|| params.theme.palette().background);

    let enc_cfg = EncodeConfig {
        canvas: request.canvas,
        fps: request.fps(),
        bitrate_kbps: cfg.bitrate_kbps,
        max_in_flight_frames: cfg.max_in_flight_frames,
        duration_frames: Some(stats.frames_total),
    };
    let opened = encoders
        .create_sink(&out_path, background)
        .and_then(|sink| EncoderSession::open(sink, enc_cfg));
    let mut session = match opened {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "encoder open failed");
            events.emit(EventLevel::Error, &format!("Failed to start encoder: {e}"));
            completion.deliver(RecordOutcome::failed(stats));
            return;
        }
    };
    tracing::info!(path = %out_path.display(), "encoder opened");

    if let Err(e) = session.begin_session() {
        events.emit(EventLevel::Error, &format!("Failed to start encoder: {e}"));
        session.abort(e, move |_| {
            remove_stale_output(&out_path);
            completion.deliver(RecordOutcome::failed(stats));
        });
        return;
    }

    let frame_loop = FrameLoop {
        request: &request,
        params: &params,
        ui: &ui,
        events: events.as_ref(),
        poll_interval: Duration::from_millis(cfg.poll_interval_ms),
        max_skipped: cfg.max_skipped_frames(stats.frames_total),
        background,
    };
    let looped = frame_loop.run(&mut session, &mut stats);

    let on_status = move |status: FinishStatus| {
        match status {
            FinishStatus::Completed(s) => {
                tracing::info!(
                    frames = s.frames_appended,
                    written = s.frames_written,
                    "recording finished"
                );
                events.emit(
                    EventLevel::Success,
                    &format!(
                        "Saved {} ({} frames, {} skipped)",
                        out_path.display(),
                        stats.frames_appended,
                        stats.frames_skipped
                    ),
                );
                completion.deliver(RecordOutcome {
                    success: true,
                    output_path: Some(out_path),
                    stats,
                });
            }
            FinishStatus::Failed(e) => {
                tracing::error!(error = %e, "recording failed");
                events.emit(EventLevel::Error, &format!("Recording failed: {e}"));
                remove_stale_output(&out_path);
                completion.deliver(RecordOutcome::failed(stats));
            }
        }
    };
    // A failed loop discards the output, so it is closed without trailing padding.
    match looped {
        Ok(()) => session.finish(on_status),
        Err(e) => session.abort(e, on_status),
    }
}

struct FrameLoop<'a> {
    request: &'a RecordingRequest,
    params: &'a Arc<RenderParams>,
    ui: &'a UiContext,
    events: &'a dyn EventSink,
    poll_interval: Duration,
    max_skipped: u64,
    background: [u8; 4],
}

impl FrameLoop<'_> {
    fn run(&self, session: &mut EncoderSession, stats: &mut RecordStats) -> BreathcastResult<()> {
        let fps = self.request.fps();
        let canvas = self.request.canvas;
        let total = stats.frames_total;
        let format = session.pixel_format();

        for index in 0..total {
            self.wait_for_capacity(session)?;

            let t = fps.frames_to_secs(index);
            let frame = FrameRequest {
                time_secs: t,
                sample: sample_phase(&self.params.pattern, t),
                canvas,
            };
            let built = self
                .ui
                .render(frame, Arc::clone(self.params))
                .and_then(|rgba| build_pixel_buffer(&rgba, canvas, format, self.background));

            match built {
                Ok(buffer) => {
                    if !session.append(buffer, FrameIndex(index)) {
                        return Err(BreathcastError::encoder_write(format!(
                            "encoder rejected frame {index}"
                        )));
                    }
                    stats.frames_appended += 1;
                }
                Err(e) => {
                    stats.frames_skipped += 1;
                    tracing::warn!(frame = index, error = %e, "skipping frame");
                    self.events
                        .emit(EventLevel::Info, &format!("Skipped frame {index}: {e}"));
                    if stats.frames_skipped > self.max_skipped {
                        return Err(BreathcastError::frame_render(format!(
                            "{} of {total} frames failed to render",
                            stats.frames_skipped
                        )));
                    }
                }
            }

            if index % PROGRESS_EVERY_FRAMES == 0 {
                let percent = index * 100 / total;
                tracing::debug!(frame = index, percent, "progress");
                self.events
                    .emit(EventLevel::Progress, &format!("Progress: {percent}%"));
            }
        }
        Ok(())
    }

    fn wait_for_capacity(&self, session: &EncoderSession) -> BreathcastResult<()> {
        loop {
            if session.is_ready_for_more_data() {
                return Ok(());
            }
            if session.has_failed() || session.state() != SessionState::Writing {
                return Err(BreathcastError::encoder_write(
                    "encoder failed while waiting for capacity",
                ));
            }
            std::thread::sleep(self.poll_interval);
        }
    }
}

fn remove_stale_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed existing output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove existing output"),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/record/recorder.rs"]
mod tests;
