use kurbo::{BezPath, Circle, Point, Shape as _};

use crate::foundation::core::Canvas;
use crate::foundation::error::{BreathcastError, BreathcastResult};
use crate::foundation::math::{ease_in_out, lerp};
use crate::phase::model::{Phase, PhaseSample};
use crate::render::backend::{FrameRGBA, FrameRenderer, FrameRequest, RenderParams};

const ORB_MIN_SCALE: f64 = 0.45;
const RING_RADIUS: f64 = 0.78;
const RING_WIDTH: f64 = 0.018;
const MARKER_RADIUS: f64 = 0.035;
const HALO_ALPHA: u8 = 56;
const TOLERANCE: f64 = 0.1;

/// Reference CPU renderer for the breathing animation, rasterized with `vello_cpu`.
///
/// Draws a guide ring, an orb that grows while inhaling and shrinks while exhaling, and a marker
/// orbiting the ring once per cycle. Output is premultiplied RGBA8.
#[derive(Default)]
pub struct BreathingRenderer {
    ctx: Option<vello_cpu::RenderContext>,
}

impl BreathingRenderer {
    /// Create a renderer; the raster context is allocated lazily on the first frame.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_ctx_mut<R>(
        &mut self,
        width: u16,
        height: u16,
        f: impl FnOnce(&mut vello_cpu::RenderContext) -> BreathcastResult<R>,
    ) -> BreathcastResult<R> {
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            _ => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();
        let out = f(&mut ctx)?;
        self.ctx = Some(ctx);
        Ok(out)
    }
}

/// Orb radius as a fraction of the ring radius for the given phase state.
pub(crate) fn orb_scale(sample: &PhaseSample) -> f64 {
    let t = ease_in_out(sample.phase_progress);
    match sample.phase {
        Phase::Inhale => lerp(ORB_MIN_SCALE, 1.0, t),
        Phase::Hold => 1.0,
        Phase::Exhale => lerp(1.0, ORB_MIN_SCALE, t),
    }
}

fn canvas_u16(canvas: Canvas) -> BreathcastResult<(u16, u16)> {
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| BreathcastError::frame_render("canvas width exceeds u16"))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| BreathcastError::frame_render("canvas height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(BreathcastError::frame_render("canvas must be non-empty"));
    }
    Ok((w, h))
}

impl FrameRenderer for BreathingRenderer {
    fn render(
        &mut self,
        frame: &FrameRequest,
        params: &RenderParams,
    ) -> BreathcastResult<FrameRGBA> {
        let (w, h) = canvas_u16(frame.canvas)?;
        let palette = params.theme.palette();

        let (fw, fh) = (f64::from(w), f64::from(h));
        let center = Point::new(fw / 2.0, fh / 2.0);
        let unit = fw.min(fh) / 2.0;
        let ring_r = unit * RING_RADIUS;
        let ring_half = unit * RING_WIDTH;
        let orb_r = ring_r * 0.94 * orb_scale(&frame.sample);

        let angle = frame.sample.angle_degrees.to_radians();
        let marker = Point::new(
            center.x + ring_r * angle.cos(),
            center.y + ring_r * angle.sin(),
        );

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        self.with_ctx_mut(w, h, |ctx| {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);

            set_color(ctx, palette.background);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, fw, fh));

            set_color(ctx, palette.ring);
            ctx.fill_path(&circle_path(center, ring_r + ring_half));
            set_color(ctx, palette.background);
            ctx.fill_path(&circle_path(center, ring_r - ring_half));

            let [r, g, b, _] = palette.orb;
            set_color(ctx, [r, g, b, HALO_ALPHA]);
            ctx.fill_path(&circle_path(center, orb_r * 1.12));
            set_color(ctx, palette.orb);
            ctx.fill_path(&circle_path(center, orb_r));

            set_color(ctx, palette.marker);
            ctx.fill_path(&circle_path(marker, unit * MARKER_RADIUS));

            ctx.flush();
            ctx.render_to_pixmap(&mut pixmap);
            Ok(())
        })?;

        Ok(FrameRGBA {
            width: u32::from(w),
            height: u32::from(h),
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}

fn set_color(ctx: &mut vello_cpu::RenderContext, rgba: [u8; 4]) {
    let [r, g, b, a] = rgba;
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
}

fn circle_path(center: Point, radius: f64) -> vello_cpu::kurbo::BezPath {
    bezpath_to_cpu(&Circle::new(center, radius.max(0.0)).to_path(TOLERANCE))
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let pt = |p: Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(pt(p1), pt(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(pt(p1), pt(p2), pt(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
