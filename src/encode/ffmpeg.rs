use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{BreathcastError, BreathcastResult};
use crate::render::buffer::{PixelBuffer, PixelFormat};

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// Opaque color written for frames missing before the first real frame.
    pub bg_rgba: [u8; 4],
}

impl FfmpegSinkOpts {
    /// Create options for outputting an MP4 to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Raw frame stream with one frame per presentation timestamp.
///
/// Skipped timestamps are filled with the previous frame, or with the background before the first
/// real frame, so the stream length always equals the highest timestamp reached plus one.
pub(crate) struct RawFrameWriter<W> {
    out: W,
    canvas: Canvas,
    format: PixelFormat,
    background: [u8; 4],
    last_idx: Option<FrameIndex>,
    last_frame: Vec<u8>,
    written: u64,
}

impl<W: Write> RawFrameWriter<W> {
    pub(crate) fn new(out: W, canvas: Canvas, format: PixelFormat, background: [u8; 4]) -> Self {
        Self {
            out,
            canvas,
            format,
            background,
            last_idx: None,
            last_frame: Vec::new(),
            written: 0,
        }
    }

    /// Frames written so far, fillers included.
    pub(crate) fn written(&self) -> u64 {
        self.written
    }

    fn next_index(&self) -> u64 {
        self.last_idx.map_or(0, |last| last.0 + 1)
    }

    pub(crate) fn push(&mut self, idx: FrameIndex, frame: &PixelBuffer) -> BreathcastResult<()> {
        if idx.0 < self.next_index() {
            return Err(BreathcastError::encoder_write(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        if frame.canvas() != self.canvas {
            return Err(BreathcastError::encoder_write(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.canvas().width,
                frame.canvas().height,
                self.canvas.width,
                self.canvas.height
            )));
        }
        if frame.format() != self.format {
            return Err(BreathcastError::encoder_write("frame pixel format mismatch"));
        }

        let gap = idx.0 - self.next_index();
        if gap > 0 {
            self.fill(gap)?;
            tracing::debug!(gap, at = idx.0, "filled skipped frames");
        }
        self.write_raw(frame.data())?;
        self.last_idx = Some(idx);
        self.last_frame.clear();
        self.last_frame.extend_from_slice(frame.data());
        Ok(())
    }

    /// Fill every timestamp below `total_frames` that has not been written yet.
    ///
    /// Returns the number of filler frames written.
    pub(crate) fn pad_to(&mut self, total_frames: u64) -> BreathcastResult<u64> {
        let missing = total_frames.saturating_sub(self.next_index());
        if missing > 0 {
            self.fill(missing)?;
            self.last_idx = Some(FrameIndex(total_frames - 1));
            tracing::debug!(missing, total_frames, "padded trailing frames");
        }
        Ok(missing)
    }

    pub(crate) fn into_inner(self) -> W {
        self.out
    }

    /// Repeat the last real frame `count` times, or the background if none was pushed yet.
    fn fill(&mut self, count: u64) -> BreathcastResult<()> {
        if self.last_frame.is_empty() {
            let bg = PixelBuffer::solid(self.canvas, self.format, self.background);
            for _ in 0..count {
                self.write_raw(bg.data())?;
            }
        } else {
            let last = std::mem::take(&mut self.last_frame);
            let res = (0..count).try_for_each(|_| self.write_raw(&last));
            self.last_frame = last;
            res?;
        }
        Ok(())
    }

    fn write_raw(&mut self, bytes: &[u8]) -> BreathcastResult<()> {
        self.out.write_all(bytes).map_err(|e| {
            BreathcastError::encoder_write(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.written += 1;
        Ok(())
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw frames to its stdin.
///
/// Output is H.264 (High profile, yuv420p) in an MP4 container with a single video track. Raw
/// video carries no timestamps, so skipped indices are filled (see [`RawFrameWriter`]) and `end`
/// pads through [`SinkConfig::duration_frames`]: the container always spans the full requested
/// duration. `abort` closes the stream without padding.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    writer: Option<RawFrameWriter<ChildStdin>>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    duration_frames: Option<u64>,
    frames_written: u64,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            writer: None,
            stderr_drain: None,
            duration_frames: None,
            frames_written: 0,
        }
    }

    /// Output path of this sink.
    pub fn out_path(&self) -> &Path {
        &self.opts.out_path
    }

    /// Frames written to `ffmpeg`, including gap fillers.
    pub fn frames_written(&self) -> u64 {
        self.writer
            .as_ref()
            .map_or(self.frames_written, RawFrameWriter::written)
    }

    fn close(&mut self, pad: bool) -> BreathcastResult<()> {
        let mut child = self
            .child
            .take()
            .ok_or_else(|| BreathcastError::encoder_write("ffmpeg sink not started"))?;

        let mut pad_res = Ok(0);
        if let Some(mut writer) = self.writer.take() {
            if pad && let Some(total) = self.duration_frames {
                pad_res = writer.pad_to(total);
            }
            self.frames_written = writer.written();
            // Closing stdin signals end of input.
            drop(writer.into_inner());
        }

        let status = child.wait().map_err(|e| {
            BreathcastError::encoder_write(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| BreathcastError::encoder_write("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| {
                    BreathcastError::encoder_write(format!("ffmpeg stderr read failed: {e}"))
                })?,
            None => Vec::new(),
        };
        self.duration_frames = None;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(BreathcastError::encoder_write(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        pad_res.map(drop)
    }
}

impl FrameSink for FfmpegSink {
    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Rgba8
    }

    fn begin(&mut self, cfg: SinkConfig) -> BreathcastResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(BreathcastError::validation("fps must be non-zero"));
        }
        if cfg.canvas.width == 0 || cfg.canvas.height == 0 {
            return Err(BreathcastError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.canvas.width.is_multiple_of(2) || !cfg.canvas.height.is_multiple_of(2) {
            return Err(BreathcastError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(BreathcastError::encoder_open(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        check_writable(&self.opts.out_path)?;

        if !is_ffmpeg_on_path() {
            let _ = std::fs::remove_file(&self.opts.out_path);
            return Err(BreathcastError::encoder_open(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        if self.opts.overwrite {
            cmd.arg("-y");
        } else {
            cmd.arg("-n");
        }

        // Input: opaque raw frames in the sink's pixel layout.
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            self.pixel_format().ffmpeg_name(),
            "-s",
            &format!("{}x{}", cfg.canvas.width, cfg.canvas.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0"]);

        // Output: h264 + yuv420p for broad compatibility.
        cmd.args([
            "-an",
            "-c:v",
            "libx264",
            "-profile:v",
            "high",
            "-pix_fmt",
            "yuv420p",
            "-b:v",
            &format!("{}k", cfg.bitrate_kbps),
            "-movflags",
            "+faststart",
        ]);
        cmd.arg(&self.opts.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            BreathcastError::encoder_open(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            BreathcastError::encoder_open("failed to open ffmpeg stdin (unexpected)")
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            BreathcastError::encoder_open("failed to open ffmpeg stderr (unexpected)")
        })?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::debug!(
            out = %self.opts.out_path.display(),
            width = cfg.canvas.width,
            height = cfg.canvas.height,
            bitrate_kbps = cfg.bitrate_kbps,
            "spawned ffmpeg"
        );

        self.writer = Some(RawFrameWriter::new(
            stdin,
            cfg.canvas,
            self.pixel_format(),
            self.opts.bg_rgba,
        ));
        self.child = Some(child);
        self.stderr_drain = Some(stderr_drain);
        self.duration_frames = cfg.duration_frames;
        self.frames_written = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &PixelBuffer) -> BreathcastResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| BreathcastError::encoder_write("ffmpeg sink not started"))?;
        writer.push(idx, frame)
    }

    fn end(&mut self) -> BreathcastResult<()> {
        self.close(true)
    }

    fn abort(&mut self) -> BreathcastResult<()> {
        self.close(false)
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.writer.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input, `-r` goes before `-i` to set the input framerate.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

fn check_writable(path: &Path) -> BreathcastResult<()> {
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map(drop)
        .map_err(|e| {
            BreathcastError::encoder_open(format!(
                "output file '{}' is not writable: {e}",
                path.display()
            ))
        })
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> BreathcastResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
