use image::{DynamicImage, RgbaImage, imageops::FilterType};

use crate::foundation::core::Canvas;
use crate::foundation::error::{BreathcastError, BreathcastResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::backend::FrameRGBA;

/// Byte order of the 32-bit pixels handed to an encoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PixelFormat {
    /// R, G, B, A.
    #[default]
    Rgba8,
    /// B, G, R, A.
    Bgra8,
}

impl PixelFormat {
    /// Name of the format in `ffmpeg -pix_fmt` terms.
    pub fn ffmpeg_name(self) -> &'static str {
        match self {
            PixelFormat::Rgba8 => "rgba",
            PixelFormat::Bgra8 => "bgra",
        }
    }
}

/// Opaque, encoder-ready frame.
///
/// Moved into the encoder session on append and never touched by the producer afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    canvas: Canvas,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Buffer filled with one opaque straight-alpha color.
    pub fn solid(canvas: Canvas, format: PixelFormat, rgba: [u8; 4]) -> Self {
        let px = swizzle([rgba[0], rgba[1], rgba[2], 255], format);
        let mut data = Vec::with_capacity(canvas.rgba_len());
        for _ in 0..canvas.rgba_len() / 4 {
            data.extend_from_slice(&px);
        }
        Self {
            canvas,
            format,
            data,
        }
    }

    /// Buffer dimensions.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Channel layout of [`Self::data`].
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Tightly packed pixel bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Convert a rendered frame into an encoder pixel buffer of exactly `canvas` size.
///
/// Frames of a different size are scaled to cover the target and center-cropped; the renderer is
/// expected to already match the aspect ratio. Alpha is flattened over `background`
/// (straight-alpha RGBA8) so the result is fully opaque.
pub fn build_pixel_buffer(
    frame: &FrameRGBA,
    canvas: Canvas,
    format: PixelFormat,
    background: [u8; 4],
) -> BreathcastResult<PixelBuffer> {
    if canvas.width == 0 || canvas.height == 0 {
        return Err(BreathcastError::buffer_creation(
            "target buffer width/height must be non-zero",
        ));
    }
    let src_len = (frame.width as usize) * (frame.height as usize) * 4;
    if frame.width == 0 || frame.height == 0 || frame.data.len() != src_len {
        return Err(BreathcastError::buffer_creation(format!(
            "frame data is {} bytes, expected {}x{}x4",
            frame.data.len(),
            frame.width,
            frame.height
        )));
    }

    let mut data = vec![0u8; canvas.rgba_len()];
    if frame.width == canvas.width && frame.height == canvas.height {
        flatten_to_opaque(&mut data, &frame.data, frame.premultiplied, background, format)?;
    } else {
        let scaled = scale_to_fill(frame, canvas)?;
        flatten_to_opaque(&mut data, &scaled, frame.premultiplied, background, format)?;
    }

    Ok(PixelBuffer {
        canvas,
        format,
        data,
    })
}

fn scale_to_fill(frame: &FrameRGBA, canvas: Canvas) -> BreathcastResult<Vec<u8>> {
    let img = RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or_else(|| BreathcastError::buffer_creation("frame data does not form an image"))?;
    let filled = DynamicImage::ImageRgba8(img)
        .resize_to_fill(canvas.width, canvas.height, FilterType::Triangle)
        .into_rgba8();
    if filled.width() != canvas.width || filled.height() != canvas.height {
        return Err(BreathcastError::buffer_creation(format!(
            "scaled frame is {}x{}, expected {}x{}",
            filled.width(),
            filled.height(),
            canvas.width,
            canvas.height
        )));
    }
    Ok(filled.into_raw())
}

fn flatten_to_opaque(
    dst: &mut [u8],
    src: &[u8],
    src_is_premul: bool,
    bg_rgba: [u8; 4],
    format: PixelFormat,
) -> BreathcastResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(BreathcastError::buffer_creation(
            "flatten_to_opaque expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = s[3] as u16;
        let px = if a == 255 {
            [s[0], s[1], s[2], 255]
        } else {
            let inv = 255u16 - a;
            let (r, g, b) = if src_is_premul {
                (
                    s[0] as u16 + mul_div255_u16(bg_r, inv),
                    s[1] as u16 + mul_div255_u16(bg_g, inv),
                    s[2] as u16 + mul_div255_u16(bg_b, inv),
                )
            } else {
                (
                    mul_div255_u16(s[0] as u16, a) + mul_div255_u16(bg_r, inv),
                    mul_div255_u16(s[1] as u16, a) + mul_div255_u16(bg_g, inv),
                    mul_div255_u16(s[2] as u16, a) + mul_div255_u16(bg_b, inv),
                )
            };
            [r.min(255) as u8, g.min(255) as u8, b.min(255) as u8, 255]
        };
        d.copy_from_slice(&swizzle(px, format));
    }

    Ok(())
}

fn swizzle(rgba: [u8; 4], format: PixelFormat) -> [u8; 4] {
    match format {
        PixelFormat::Rgba8 => rgba,
        PixelFormat::Bgra8 => [rgba[2], rgba[1], rgba[0], rgba[3]],
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/buffer.rs"]
mod tests;
