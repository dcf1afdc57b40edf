use super::*;
use crate::phase::model::sample_phase;
use crate::phase::pattern::BreathingPattern;
use crate::render::backend::Theme;

fn params(theme: Theme) -> RenderParams {
    RenderParams {
        theme,
        pattern: BreathingPattern::parse("4-7-8").unwrap(),
        label: "test".to_string(),
    }
}

fn request(t: f64, width: u32, height: u32) -> FrameRequest {
    let pattern = BreathingPattern::parse("4-7-8").unwrap();
    FrameRequest {
        time_secs: t,
        sample: sample_phase(&pattern, t),
        canvas: Canvas { width, height },
    }
}

fn px(frame: &FrameRGBA, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * frame.width + x) * 4) as usize;
    [
        frame.data[i],
        frame.data[i + 1],
        frame.data[i + 2],
        frame.data[i + 3],
    ]
}

#[test]
fn orb_grows_on_inhale_and_shrinks_on_exhale() {
    let p = BreathingPattern::parse("4-7-8").unwrap();
    let start = orb_scale(&sample_phase(&p, 0.0));
    let mid_inhale = orb_scale(&sample_phase(&p, 2.0));
    let hold = orb_scale(&sample_phase(&p, 6.0));
    let late_exhale = orb_scale(&sample_phase(&p, 18.0));
    assert!((start - ORB_MIN_SCALE).abs() < 1e-9);
    assert!(mid_inhale > start && mid_inhale < 1.0);
    assert_eq!(hold, 1.0);
    assert!(late_exhale < hold);
}

#[test]
fn output_matches_requested_size_and_is_premultiplied() {
    let mut r = BreathingRenderer::new();
    let f = r.render(&request(1.0, 64, 48), &params(Theme::Ocean)).unwrap();
    assert_eq!((f.width, f.height), (64, 48));
    assert_eq!(f.data.len(), 64 * 48 * 4);
    assert!(f.premultiplied);
}

#[test]
fn background_corner_uses_theme_color() {
    let mut r = BreathingRenderer::new();
    let f = r.render(&request(0.0, 32, 32), &params(Theme::Mono)).unwrap();
    assert_eq!(px(&f, 0, 0), Theme::Mono.palette().background);
}

#[test]
fn rendering_is_deterministic_and_time_dependent() {
    let mut r = BreathingRenderer::new();
    let a = r.render(&request(2.5, 48, 48), &params(Theme::Sunset)).unwrap();
    let b = r.render(&request(2.5, 48, 48), &params(Theme::Sunset)).unwrap();
    let c = r.render(&request(13.0, 48, 48), &params(Theme::Sunset)).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn oversized_canvas_is_a_render_error() {
    let mut r = BreathingRenderer::new();
    let err = r
        .render(&request(0.0, 70_000, 8), &params(Theme::Ocean))
        .unwrap_err();
    assert!(err.is_per_frame());
}
