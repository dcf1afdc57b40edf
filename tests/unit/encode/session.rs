use std::time::{Duration, Instant};

use super::*;
use crate::encode::sink::InMemorySink;

fn cfg(width: u32, height: u32) -> EncodeConfig {
    EncodeConfig {
        canvas: Canvas { width, height },
        fps: Fps::integer(60),
        bitrate_kbps: 10_000,
        max_in_flight_frames: 4,
        duration_frames: None,
    }
}

fn buf(canvas: Canvas) -> PixelBuffer {
    PixelBuffer::solid(canvas, PixelFormat::Rgba8, [1, 2, 3, 255])
}

fn abort_and_wait(session: EncoderSession, reason: &str) -> FinishStatus {
    let (tx, rx) = crossbeam_channel::bounded(1);
    session.abort(BreathcastError::encoder_write(reason), move |status| {
        let _ = tx.send(status);
    });
    rx.recv_timeout(Duration::from_secs(10))
        .expect("abort callback delivered")
}

fn finish_and_wait(session: EncoderSession) -> FinishStatus {
    let (tx, rx) = crossbeam_channel::bounded(1);
    session.finish(move |status| {
        let _ = tx.send(status);
    });
    rx.recv_timeout(Duration::from_secs(10))
        .expect("finish callback delivered")
}

fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        std::thread::sleep(Duration::from_millis(1));
    }
}

struct RejectingSink;

impl FrameSink for RejectingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> BreathcastResult<()> {
        Err(BreathcastError::validation("no output for you"))
    }
    fn push_frame(&mut self, _idx: FrameIndex, _frame: &PixelBuffer) -> BreathcastResult<()> {
        Ok(())
    }
    fn end(&mut self) -> BreathcastResult<()> {
        Ok(())
    }
}

struct FailOnSecondFrame {
    pushed: u64,
}

impl FrameSink for FailOnSecondFrame {
    fn begin(&mut self, _cfg: SinkConfig) -> BreathcastResult<()> {
        Ok(())
    }
    fn push_frame(&mut self, _idx: FrameIndex, _frame: &PixelBuffer) -> BreathcastResult<()> {
        self.pushed += 1;
        if self.pushed >= 2 {
            return Err(BreathcastError::encoder_write("disk full"));
        }
        Ok(())
    }
    fn end(&mut self) -> BreathcastResult<()> {
        Ok(())
    }
}

struct GatedSink {
    gate: crossbeam_channel::Receiver<()>,
}

impl FrameSink for GatedSink {
    fn begin(&mut self, _cfg: SinkConfig) -> BreathcastResult<()> {
        Ok(())
    }
    fn push_frame(&mut self, _idx: FrameIndex, _frame: &PixelBuffer) -> BreathcastResult<()> {
        self.gate
            .recv()
            .map_err(|_| BreathcastError::encoder_write("gate closed"))
    }
    fn end(&mut self) -> BreathcastResult<()> {
        Ok(())
    }
}

#[test]
fn config_validation_catches_bad_values() {
    assert!(cfg(0, 10).validate().is_err());
    assert!(cfg(11, 10).validate().is_err());
    assert!(
        EncodeConfig {
            bitrate_kbps: 0,
            ..cfg(10, 10)
        }
        .validate()
        .is_err()
    );
    assert!(
        EncodeConfig {
            max_in_flight_frames: 0,
            ..cfg(10, 10)
        }
        .validate()
        .is_err()
    );
    assert!(
        EncodeConfig {
            duration_frames: Some(0),
            ..cfg(10, 10)
        }
        .validate()
        .is_err()
    );
    assert!(cfg(10, 10).validate().is_ok());
}

#[test]
fn open_reports_rejected_settings_and_sink_failures_as_encoder_open() {
    let err = EncoderSession::open(Box::new(InMemorySink::new()), cfg(11, 10))
        .err()
        .unwrap();
    assert!(matches!(err, BreathcastError::EncoderOpen(_)));

    let err = EncoderSession::open(Box::new(RejectingSink), cfg(10, 10))
        .err()
        .unwrap();
    assert!(matches!(err, BreathcastError::EncoderOpen(_)));
    assert!(err.to_string().contains("no output for you"));
}

#[test]
fn lifecycle_writes_frames_in_order() {
    let sink = InMemorySink::new();
    let recording = sink.recording();
    let canvas = Canvas::new(4, 4).unwrap();

    let mut session = EncoderSession::open(Box::new(sink.clone()), cfg(4, 4)).unwrap();
    assert_eq!(session.state(), SessionState::Ready);
    assert!(!session.is_ready_for_more_data());
    assert!(!session.append(buf(canvas), FrameIndex(0)));

    session.begin_session().unwrap();
    assert_eq!(session.state(), SessionState::Writing);
    assert!(session.begin_session().is_err());

    for i in [0u64, 1, 2, 5] {
        wait_until(|| session.is_ready_for_more_data());
        assert!(session.append(buf(canvas), FrameIndex(i)));
    }
    assert!(!session.append(buf(canvas), FrameIndex(5)));
    assert!(!session.append(buf(canvas), FrameIndex(3)));
    assert_eq!(session.frames_appended(), 4);

    match finish_and_wait(session) {
        FinishStatus::Completed(stats) => {
            assert_eq!(stats.frames_appended, 4);
            assert_eq!(stats.frames_written, 4);
        }
        FinishStatus::Failed(e) => panic!("unexpected failure: {e}"),
    }

    {
        let rec = recording.lock().unwrap();
        assert!(rec.ended);
        assert!(!rec.aborted);
        assert_eq!(rec.config.as_ref().unwrap().canvas, canvas);
    }
    assert_eq!(
        sink.timestamps(),
        vec![FrameIndex(0), FrameIndex(1), FrameIndex(2), FrameIndex(5)]
    );
}

#[test]
fn mismatched_buffers_are_refused() {
    let mut session =
        EncoderSession::open(Box::new(InMemorySink::new()), cfg(4, 4)).unwrap();
    session.begin_session().unwrap();
    assert!(!session.append(buf(Canvas::new(2, 2).unwrap()), FrameIndex(0)));
    let bgra = PixelBuffer::solid(Canvas::new(4, 4).unwrap(), PixelFormat::Bgra8, [0, 0, 0, 255]);
    assert!(!session.append(bgra, FrameIndex(0)));
    assert!(matches!(
        finish_and_wait(session),
        FinishStatus::Completed(SessionStats {
            frames_appended: 0,
            ..
        })
    ));
}

#[test]
fn writer_failure_surfaces_in_append_and_finish() {
    let canvas = Canvas::new(2, 2).unwrap();
    let mut session =
        EncoderSession::open(Box::new(FailOnSecondFrame { pushed: 0 }), cfg(2, 2)).unwrap();
    session.begin_session().unwrap();

    assert!(session.append(buf(canvas), FrameIndex(0)));
    assert!(session.append(buf(canvas), FrameIndex(1)));
    wait_until(|| session.has_failed());
    assert!(!session.is_ready_for_more_data());
    assert!(!session.append(buf(canvas), FrameIndex(2)));
    assert_eq!(session.state(), SessionState::Failed);

    match finish_and_wait(session) {
        FinishStatus::Failed(e) => assert!(e.to_string().contains("disk full")),
        FinishStatus::Completed(_) => panic!("expected failure"),
    }
}

#[test]
fn duration_bounds_timestamps_and_reaches_the_sink() {
    let sink = InMemorySink::new();
    let recording = sink.recording();
    let canvas = Canvas::new(2, 2).unwrap();
    let mut session = EncoderSession::open(
        Box::new(sink.clone()),
        EncodeConfig {
            duration_frames: Some(3),
            ..cfg(2, 2)
        },
    )
    .unwrap();
    assert_eq!(
        recording.lock().unwrap().config.as_ref().unwrap().duration_frames,
        Some(3)
    );
    session.begin_session().unwrap();

    assert!(session.append(buf(canvas), FrameIndex(0)));
    assert!(!session.append(buf(canvas), FrameIndex(3)));
    assert!(session.append(buf(canvas), FrameIndex(2)));
    assert!(matches!(
        finish_and_wait(session),
        FinishStatus::Completed(SessionStats {
            frames_appended: 2,
            ..
        })
    ));
    assert_eq!(sink.timestamps(), vec![FrameIndex(0), FrameIndex(2)]);
}

#[test]
fn abort_closes_the_sink_without_completing() {
    let sink = InMemorySink::new();
    let recording = sink.recording();
    let canvas = Canvas::new(2, 2).unwrap();
    let mut session = EncoderSession::open(Box::new(sink), cfg(2, 2)).unwrap();
    session.begin_session().unwrap();
    assert!(session.append(buf(canvas), FrameIndex(0)));

    match abort_and_wait(session, "render failed") {
        FinishStatus::Failed(e) => assert!(e.to_string().contains("render failed")),
        FinishStatus::Completed(_) => panic!("aborted session must not complete"),
    }
    let rec = recording.lock().unwrap();
    assert!(rec.ended);
    assert!(rec.aborted);
}

#[test]
fn readiness_tracks_queue_capacity() {
    let canvas = Canvas::new(2, 2).unwrap();
    let (gate_tx, gate_rx) = crossbeam_channel::unbounded();
    let mut session = EncoderSession::open(
        Box::new(GatedSink { gate: gate_rx }),
        EncodeConfig {
            max_in_flight_frames: 1,
            ..cfg(2, 2)
        },
    )
    .unwrap();
    session.begin_session().unwrap();

    assert!(session.append(buf(canvas), FrameIndex(0)));
    // Writer picks frame 0 up and blocks on the gate, leaving the queue empty.
    wait_until(|| session.is_ready_for_more_data());
    assert!(session.append(buf(canvas), FrameIndex(1)));
    assert!(!session.is_ready_for_more_data());

    gate_tx.send(()).unwrap();
    gate_tx.send(()).unwrap();
    wait_until(|| session.is_ready_for_more_data());

    match finish_and_wait(session) {
        FinishStatus::Completed(stats) => assert_eq!(stats.frames_written, 2),
        FinishStatus::Failed(e) => panic!("unexpected failure: {e}"),
    }
}

#[test]
fn finishing_an_unstarted_session_still_ends_the_sink() {
    let sink = InMemorySink::new();
    let recording = sink.recording();
    let session = EncoderSession::open(Box::new(sink), cfg(2, 2)).unwrap();
    assert!(matches!(
        finish_and_wait(session),
        FinishStatus::Completed(_)
    ));
    assert!(recording.lock().unwrap().ended);
}
