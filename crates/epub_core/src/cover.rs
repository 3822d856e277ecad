//! Cover text layout.
//!
//! Rendering glyphs is left to a [`CoverRasterizer`]; this module decides what
//! goes where on the fixed-size canvas.

use thiserror::Error;

pub const COVER_WIDTH: u32 = 900;
pub const COVER_HEIGHT: u32 = 1200;
/// Maximum width of a title line, in pixels.
pub const TITLE_MAX_WIDTH: f32 = 800.0;
pub const TITLE_FONT_SIZE: f32 = 108.0;
pub const TITLE_LINE_HEIGHT: f32 = 120.0;
pub const TITLE_FIRST_BASELINE: f32 = 380.0;
pub const AUTHOR_FONT_SIZE: f32 = 54.0;
/// Author baseline before adding one line height per title line.
pub const AUTHOR_BASELINE: f32 = 600.0;
pub const BACKGROUND_COLOR: [u8; 3] = [0xfd, 0xfa, 0xf5];
pub const TEXT_COLOR: [u8; 3] = [0x66, 0x66, 0x66];

/// Archive path of the cover, relative to the package document.
pub const COVER_HREF: &str = "images/cover.jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFamily {
    Serif,
    SansSerif,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    pub family: FontFamily,
    pub size: f32,
    pub bold: bool,
}

impl FontSpec {
    pub fn title() -> Self {
        Self {
            family: FontFamily::Serif,
            size: TITLE_FONT_SIZE,
            bold: true,
        }
    }

    pub fn author() -> Self {
        Self {
            family: FontFamily::SansSerif,
            size: AUTHOR_FONT_SIZE,
            bold: false,
        }
    }
}

pub trait TextMeasure: Send + Sync {
    /// Rendered width of `text` in pixels.
    fn measure(&self, text: &str, font: &FontSpec) -> f32;
}

/// Font-free width estimate: full-width characters take one em, everything
/// else a little over half an em.
#[derive(Debug, Default, Clone, Copy)]
pub struct EstimatedMeasure;

impl TextMeasure for EstimatedMeasure {
    fn measure(&self, text: &str, font: &FontSpec) -> f32 {
        let ems: f32 = text
            .chars()
            .map(|c| if is_wide(c) { 1.0 } else { 0.55 })
            .sum();
        let weight = if font.bold { 1.05 } else { 1.0 };
        ems * font.size * weight
    }
}

fn is_wide(c: char) -> bool {
    matches!(c,
        '\u{1100}'..='\u{115f}'
        | '\u{2e80}'..='\u{a4cf}'
        | '\u{ac00}'..='\u{d7a3}'
        | '\u{f900}'..='\u{faff}'
        | '\u{fe30}'..='\u{fe4f}'
        | '\u{ff00}'..='\u{ff60}'
        | '\u{ffe0}'..='\u{ffe6}'
        | '\u{20000}'..='\u{3fffd}'
    )
}

/// Break `text` into lines no wider than `max_width`, one character at a time.
///
/// Breaking per character rather than per word keeps scripts without spaces
/// wrappable. A line always holds at least one character.
pub fn wrap_text(text: &str, max_width: f32, font: &FontSpec, measure: &dyn TextMeasure) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for c in text.chars() {
        let mut candidate = line.clone();
        candidate.push(c);
        if !line.is_empty() && measure.measure(&candidate, font) > max_width {
            lines.push(std::mem::take(&mut line));
            line.push(c);
        } else {
            line = candidate;
        }
    }
    lines.push(line);
    lines
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub center_x: f32,
    pub baseline_y: f32,
    pub font: FontSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverLayout {
    pub width: u32,
    pub height: u32,
    pub background: [u8; 3],
    pub text_color: [u8; 3],
    pub title_lines: Vec<TextLine>,
    pub author_line: TextLine,
}

impl CoverLayout {
    pub fn new(title: &str, author: &str, measure: &dyn TextMeasure) -> Self {
        let center_x = COVER_WIDTH as f32 / 2.0;
        let title_font = FontSpec::title();
        let title_lines: Vec<TextLine> = wrap_text(title, TITLE_MAX_WIDTH, &title_font, measure)
            .into_iter()
            .enumerate()
            .map(|(i, text)| TextLine {
                text,
                center_x,
                baseline_y: TITLE_FIRST_BASELINE + i as f32 * TITLE_LINE_HEIGHT,
                font: title_font,
            })
            .collect();
        let author_line = TextLine {
            text: author.to_string(),
            center_x,
            baseline_y: AUTHOR_BASELINE + title_lines.len() as f32 * TITLE_LINE_HEIGHT,
            font: FontSpec::author(),
        };
        Self {
            width: COVER_WIDTH,
            height: COVER_HEIGHT,
            background: BACKGROUND_COLOR,
            text_color: TEXT_COLOR,
            title_lines,
            author_line,
        }
    }

    /// Title lines followed by the author line.
    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.title_lines.iter().chain(std::iter::once(&self.author_line))
    }
}

#[derive(Debug, Error)]
pub enum CoverError {
    #[error("cover encoding failed: {0}")]
    Encode(String),
    #[error("cover rendering failed: {0}")]
    Render(String),
}

/// Turns a cover layout into an encoded JPEG.
pub trait CoverRasterizer: Send + Sync {
    fn rasterize(&self, layout: &CoverLayout) -> Result<Vec<u8>, CoverError>;
}
