use crate::foundation::core::Canvas;
use crate::foundation::error::BreathcastResult;
use crate::phase::model::PhaseSample;
use crate::phase::pattern::BreathingPattern;

/// A rendered frame as RGBA8 pixels.
///
/// Renderers in this crate output **premultiplied** alpha; the flag makes that explicit at API
/// boundaries so third-party renderers can hand over straight alpha instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Frame filled with a single premultiplied color.
    pub fn solid(width: u32, height: u32, rgba_premul: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((width as usize) * (height as usize) * 4);
        for _ in 0..(width as usize) * (height as usize) {
            data.extend_from_slice(&rgba_premul);
        }
        Self {
            width,
            height,
            data,
            premultiplied: true,
        }
    }
}

/// Visual theme of the breathing animation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    /// Deep blue background, cyan orb.
    #[default]
    Ocean,
    /// Dusk purple background, warm orange orb.
    Sunset,
    /// Dark green background, leaf-green orb.
    Forest,
    /// Black and white.
    Mono,
}

/// Straight-alpha RGBA8 colors of a [`Theme`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    /// Canvas background.
    pub background: [u8; 4],
    /// Guide ring drawn at full-inhale size.
    pub ring: [u8; 4],
    /// Breathing orb.
    pub orb: [u8; 4],
    /// Orbiting progress marker.
    pub marker: [u8; 4],
}

impl Theme {
    /// Every theme, in menu order.
    pub const ALL: [Theme; 4] = [Theme::Ocean, Theme::Sunset, Theme::Forest, Theme::Mono];

    /// Colors for the theme.
    pub fn palette(self) -> Palette {
        match self {
            Theme::Ocean => Palette {
                background: [8, 24, 48, 255],
                ring: [40, 90, 140, 255],
                orb: [64, 200, 230, 255],
                marker: [230, 250, 255, 255],
            },
            Theme::Sunset => Palette {
                background: [40, 18, 52, 255],
                ring: [110, 50, 90, 255],
                orb: [250, 150, 70, 255],
                marker: [255, 230, 180, 255],
            },
            Theme::Forest => Palette {
                background: [10, 32, 20, 255],
                ring: [40, 90, 55, 255],
                orb: [120, 210, 110, 255],
                marker: [230, 255, 220, 255],
            },
            Theme::Mono => Palette {
                background: [12, 12, 12, 255],
                ring: [70, 70, 70, 255],
                orb: [235, 235, 235, 255],
                marker: [255, 255, 255, 255],
            },
        }
    }
}

/// Visual parameters of a recording. Opaque to the recorder; only renderers interpret them.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderParams {
    /// Color theme.
    pub theme: Theme,
    /// Pattern being visualized.
    pub pattern: BreathingPattern,
    /// Human-readable content name (exercise label).
    pub label: String,
}

/// Everything a renderer needs to draw one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameRequest {
    /// Animation time in seconds.
    pub time_secs: f64,
    /// Phase state at `time_secs`.
    pub sample: PhaseSample,
    /// Target canvas.
    pub canvas: Canvas,
}

/// Draws a fully composed frame for a given animation time.
///
/// Implementations must be deterministic: the same request and parameters produce
/// pixel-identical output. Renderers run only on the UI context, so they need not be `Send`.
pub trait FrameRenderer {
    /// Render one frame.
    fn render(&mut self, frame: &FrameRequest, params: &RenderParams)
    -> BreathcastResult<FrameRGBA>;
}

impl<F> FrameRenderer for F
where
    F: FnMut(&FrameRequest, &RenderParams) -> BreathcastResult<FrameRGBA>,
{
    fn render(
        &mut self,
        frame: &FrameRequest,
        params: &RenderParams,
    ) -> BreathcastResult<FrameRGBA> {
        self(frame, params)
    }
}
