use std::io::Cursor;

use epub_core::{CoverError, CoverLayout, CoverRasterizer, EstimatedMeasure, TextLine, TextMeasure};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

/// Share of the font size covered by a glyph block, measured up from the baseline.
const GLYPH_HEIGHT: f32 = 0.7;
/// Horizontal gap left between neighbouring glyph blocks.
const GLYPH_GAP: f32 = 0.12;

/// Font-free rasterizer: paints the background and one solid block per
/// non-space character at the laid-out positions ("greeked" text).
pub struct PlaceholderCoverRasterizer {
    measure: Box<dyn TextMeasure>,
}

impl PlaceholderCoverRasterizer {
    pub fn new(measure: Box<dyn TextMeasure>) -> Self {
        Self { measure }
    }
}

impl Default for PlaceholderCoverRasterizer {
    fn default() -> Self {
        Self::new(Box::new(EstimatedMeasure))
    }
}

impl CoverRasterizer for PlaceholderCoverRasterizer {
    fn rasterize(&self, layout: &CoverLayout) -> Result<Vec<u8>, CoverError> {
        if layout.width == 0 || layout.height == 0 {
            return Err(CoverError::Render(format!(
                "empty canvas {}x{}",
                layout.width, layout.height
            )));
        }
        let mut canvas = RgbImage::from_pixel(layout.width, layout.height, Rgb(layout.background));
        for line in layout.lines() {
            self.paint_line(&mut canvas, line, Rgb(layout.text_color));
        }

        let mut jpeg = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(canvas)
            .write_to(&mut jpeg, ImageFormat::Jpeg)
            .map_err(|err| CoverError::Encode(err.to_string()))?;
        Ok(jpeg.into_inner())
    }
}

impl PlaceholderCoverRasterizer {
    fn paint_line(&self, canvas: &mut RgbImage, line: &TextLine, color: Rgb<u8>) {
        let line_width = self.measure.measure(&line.text, &line.font);
        let top = line.baseline_y - line.font.size * GLYPH_HEIGHT;
        let mut x = line.center_x - line_width / 2.0;
        let mut buf = [0u8; 4];
        for c in line.text.chars() {
            let advance = self.measure.measure(c.encode_utf8(&mut buf), &line.font);
            if !c.is_whitespace() {
                let gap = advance * GLYPH_GAP;
                fill_rect(canvas, x + gap / 2.0, top, advance - gap, line.baseline_y, color);
            }
            x += advance;
        }
    }
}

fn fill_rect(canvas: &mut RgbImage, left: f32, top: f32, width: f32, bottom: f32, color: Rgb<u8>) {
    let clamp_x = |v: f32| v.clamp(0.0, canvas.width() as f32) as u32;
    let clamp_y = |v: f32| v.clamp(0.0, canvas.height() as f32) as u32;
    let (x0, x1) = (clamp_x(left), clamp_x(left + width));
    let (y0, y1) = (clamp_y(top), clamp_y(bottom));
    for y in y0..y1 {
        for x in x0..x1 {
            canvas.put_pixel(x, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epub_core::{COVER_HEIGHT, COVER_WIDTH};

    #[test]
    fn produces_a_decodable_jpeg_of_canvas_size() {
        let layout = CoverLayout::new("A fairly long article title", "Someone", &EstimatedMeasure);
        let bytes = PlaceholderCoverRasterizer::default()
            .rasterize(&layout)
            .expect("cover renders");
        assert_eq!(&bytes[..3], &[0xff, 0xd8, 0xff]);

        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)
            .expect("cover decodes");
        assert_eq!((decoded.width(), decoded.height()), (COVER_WIDTH, COVER_HEIGHT));
    }
}
