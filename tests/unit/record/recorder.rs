use super::*;

fn request(duration_secs: f64) -> RecordingRequest {
    RecordingRequest::for_exercise(
        Exercise::Relaxing,
        Theme::Ocean,
        SizePreset::Small,
        duration_secs,
    )
}

#[test]
fn exercise_request_carries_preset_values() {
    let req = request(5.0);
    assert_eq!(req.pattern_source, "4-7-8");
    assert_eq!(req.label, "Relaxing 4-7-8");
    assert_eq!(req.canvas, SizePreset::Small.canvas());
    assert_eq!(req.fps(), Fps::integer(60));
    assert_eq!(req.total_frames(), 300);
    req.validate().unwrap();
}

#[test]
fn total_frames_floors() {
    assert_eq!(request(0.5).total_frames(), 30);
    assert_eq!(request(1.0 / 60.0 + 1e-9).total_frames(), 1);
    assert_eq!(request(0.01).total_frames(), 0);
}

#[test]
fn validate_rejects_empty_recordings() {
    for d in [0.0, -1.0, f64::NAN, f64::INFINITY, 0.01] {
        assert!(
            matches!(request(d).validate(), Err(BreathcastError::Validation(_))),
            "duration {d}"
        );
    }
}

#[test]
fn malformed_pattern_falls_back() {
    let req = RecordingRequest {
        pattern_source: "4-x-4".to_string(),
        ..request(5.0)
    };
    assert_eq!(req.pattern(), BreathingPattern::FALLBACK);
    let params = req.render_params();
    assert_eq!(params.pattern, BreathingPattern::FALLBACK);
    assert_eq!(params.label, "Relaxing 4-7-8");
    assert_eq!(params.theme, Theme::Ocean);
}

#[test]
fn ffmpeg_factory_defers_process_start_to_begin() {
    let sink = FfmpegEncoderFactory
        .create_sink(Path::new("never-written.mp4"), [0, 0, 0, 255])
        .unwrap();
    assert_eq!(sink.pixel_format(), crate::render::buffer::PixelFormat::Rgba8);
    assert!(!Path::new("never-written.mp4").exists());
}

#[test]
fn closures_are_encoder_factories() {
    let factory = |_: &Path, _: [u8; 4]| -> BreathcastResult<Box<dyn FrameSink>> {
        Err(BreathcastError::encoder_open("no encoder here"))
    };
    let err = factory.create_sink(Path::new("x.mp4"), [0, 0, 0, 255]).err().unwrap();
    assert!(matches!(err, BreathcastError::EncoderOpen(_)));
}
