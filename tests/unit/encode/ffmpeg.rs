use super::*;
use crate::foundation::core::Canvas;

fn cfg(width: u32, height: u32) -> SinkConfig {
    SinkConfig {
        canvas: Canvas { width, height },
        fps: Fps::integer(60),
        bitrate_kbps: 10_000,
        duration_frames: None,
    }
}

const BG: [u8; 4] = [9, 9, 9, 255];
const RED: [u8; 4] = [200, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 200, 255];

fn raw_writer() -> RawFrameWriter<Vec<u8>> {
    RawFrameWriter::new(Vec::new(), Canvas::new(2, 2).unwrap(), PixelFormat::Rgba8, BG)
}

fn solid(rgba: [u8; 4]) -> PixelBuffer {
    PixelBuffer::solid(Canvas::new(2, 2).unwrap(), PixelFormat::Rgba8, rgba)
}

/// First pixel of every frame in a raw 2x2 RGBA stream.
fn frame_colors(bytes: &[u8]) -> Vec<[u8; 4]> {
    let frame_len = Canvas::new(2, 2).unwrap().rgba_len();
    assert_eq!(bytes.len() % frame_len, 0, "stream ends mid-frame");
    bytes
        .chunks(frame_len)
        .map(|f| [f[0], f[1], f[2], f[3]])
        .collect()
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("unit_ffmpeg").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn begin_rejects_odd_and_zero_dimensions() {
    let dir = scratch_dir("dims");
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(dir.join("odd.mp4")));
    assert!(sink.begin(cfg(11, 10)).is_err());
    assert!(sink.begin(cfg(0, 10)).is_err());
}

#[test]
fn begin_fails_when_parent_is_a_file() {
    let dir = scratch_dir("blocked");
    let blocker = dir.join("not_a_dir");
    std::fs::write(&blocker, b"x").unwrap();

    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(blocker.join("out.mp4")));
    assert!(sink.begin(cfg(16, 16)).is_err());
}

#[test]
fn begin_refuses_existing_file_without_overwrite() {
    let dir = scratch_dir("no_overwrite");
    let out = dir.join("exists.mp4");
    std::fs::write(&out, b"old").unwrap();

    let mut opts = FfmpegSinkOpts::new(&out);
    opts.overwrite = false;
    let err = FfmpegSink::new(opts).begin(cfg(16, 16)).unwrap_err();
    assert!(matches!(err, BreathcastError::EncoderOpen(_)));
    assert_eq!(std::fs::read(&out).unwrap(), b"old");
}

#[test]
fn push_and_end_before_begin_are_errors() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("target/unit_ffmpeg/unused.mp4"));
    let buf = PixelBuffer::solid(Canvas::new(2, 2).unwrap(), PixelFormat::Rgba8, [0, 0, 0, 255]);
    assert!(sink.push_frame(FrameIndex(0), &buf).is_err());
    assert!(sink.end().is_err());
    assert!(sink.abort().is_err());
    assert_eq!(sink.frames_written(), 0);
}

#[test]
fn ensure_parent_dir_accepts_bare_file_names() {
    ensure_parent_dir(Path::new("out.mp4")).unwrap();
}

#[test]
fn leading_gap_is_filled_with_background() {
    let mut w = raw_writer();
    w.push(FrameIndex(2), &solid(RED)).unwrap();
    assert_eq!(w.written(), 3);
    assert_eq!(frame_colors(&w.into_inner()), vec![BG, BG, RED]);
}

#[test]
fn middle_gap_repeats_the_previous_frame() {
    let mut w = raw_writer();
    w.push(FrameIndex(0), &solid(RED)).unwrap();
    w.push(FrameIndex(3), &solid(BLUE)).unwrap();
    w.push(FrameIndex(4), &solid(RED)).unwrap();
    assert_eq!(w.written(), 5);
    assert_eq!(
        frame_colors(&w.into_inner()),
        vec![RED, RED, RED, BLUE, RED]
    );
}

#[test]
fn trailing_padding_reaches_the_full_duration() {
    let mut w = raw_writer();
    w.push(FrameIndex(0), &solid(RED)).unwrap();
    w.push(FrameIndex(1), &solid(BLUE)).unwrap();
    assert_eq!(w.pad_to(5).unwrap(), 3);
    assert_eq!(w.pad_to(5).unwrap(), 0);
    assert!(w.push(FrameIndex(4), &solid(RED)).is_err());
    assert_eq!(w.written(), 5);
    assert_eq!(
        frame_colors(&w.into_inner()),
        vec![RED, BLUE, BLUE, BLUE, BLUE]
    );
}

#[test]
fn padding_without_frames_writes_background() {
    let mut w = raw_writer();
    assert_eq!(w.pad_to(2).unwrap(), 2);
    assert_eq!(frame_colors(&w.into_inner()), vec![BG, BG]);
}

#[test]
fn writer_rejects_stale_and_mismatched_frames() {
    let mut w = raw_writer();
    w.push(FrameIndex(1), &solid(RED)).unwrap();
    assert!(w.push(FrameIndex(1), &solid(RED)).is_err());
    assert!(w.push(FrameIndex(0), &solid(RED)).is_err());
    let big = PixelBuffer::solid(Canvas::new(4, 4).unwrap(), PixelFormat::Rgba8, RED);
    assert!(w.push(FrameIndex(2), &big).is_err());
    let bgra = PixelBuffer::solid(Canvas::new(2, 2).unwrap(), PixelFormat::Bgra8, RED);
    assert!(w.push(FrameIndex(2), &bgra).is_err());
    assert_eq!(frame_colors(&w.into_inner()), vec![BG, RED]);
}
