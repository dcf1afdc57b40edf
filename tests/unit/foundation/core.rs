use super::*;

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(60, 0).is_err());
    assert_eq!(Fps::new(60, 1).unwrap(), Fps::integer(60));
}

#[test]
fn fps_secs_to_frames_uses_floor() {
    let fps = Fps::integer(60);
    assert_eq!(fps.secs_to_frames_floor(10.0), 600);
    assert_eq!(fps.secs_to_frames_floor(0.999), 59);
    assert_eq!(fps.secs_to_frames_floor(0.01), 0);
    assert_eq!(fps.secs_to_frames_floor(-3.0), 0);
    assert_eq!(fps.secs_to_frames_floor(f64::NAN), 0);
}

#[test]
fn fps_frames_to_secs_is_exact_tick_spacing() {
    let fps = Fps::integer(60);
    assert_eq!(fps.frames_to_secs(0), 0.0);
    assert_eq!(fps.frames_to_secs(60), 1.0);
    assert_eq!(fps.frames_to_secs(30), 0.5);

    let ntsc = Fps::new(30000, 1001).unwrap();
    assert_eq!(ntsc.secs_to_frames_floor(ntsc.frames_to_secs(123)), 123);
}

#[test]
fn canvas_rejects_zero_size() {
    assert!(Canvas::new(0, 10).is_err());
    assert!(Canvas::new(10, 0).is_err());
    assert_eq!(Canvas::new(4, 2).unwrap().rgba_len(), 32);
}

#[test]
fn size_presets_are_even_for_yuv420p() {
    for preset in SizePreset::ALL {
        let c = preset.canvas();
        assert!(c.width.is_multiple_of(2) && c.height.is_multiple_of(2));
    }
    assert_eq!(
        SizePreset::Portrait.canvas(),
        Canvas {
            width: 1080,
            height: 1920
        }
    );
}
