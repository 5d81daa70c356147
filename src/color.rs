use palette::{Hsl, IntoColor, Srgb};
use plotters::style::RGBColor;

// ---------------------------------------------------------------------------
// Series styles
// ---------------------------------------------------------------------------

/// Line width given to every overlaid histogram.
pub const LINE_WIDTH: u32 = 2;

/// Visual style of one overlaid histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesStyle {
    /// 1-based colour index, in order of successful draws.
    pub color_index: u32,
    pub line_width: u32,
}

/// Hands out colour indices 1, 2, 3, ... one per successfully drawn series.
///
/// Only [`StyleCursor::next_style`] advances the cursor, so files that fail
/// to open or lack the histogram never consume a colour.
#[derive(Debug, Clone)]
pub struct StyleCursor {
    next: u32,
}

impl Default for StyleCursor {
    fn default() -> Self {
        StyleCursor { next: 1 }
    }
}

impl StyleCursor {
    pub fn next_style(&mut self) -> SeriesStyle {
        let style = SeriesStyle {
            color_index: self.next,
            line_width: LINE_WIDTH,
        };
        self.next += 1;
        style
    }

    /// Number of styles handed out so far.
    pub fn assigned(&self) -> u32 {
        self.next - 1
    }
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

fn hsl_to_rgb(hue: f32) -> RGBColor {
    let hsl = Hsl::new(hue, 0.75, 0.45);
    let rgb: Srgb = hsl.into_color();
    RGBColor(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<RGBColor> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| hsl_to_rgb((i as f32 / n as f32) * 360.0))
        .collect()
}

/// ROOT's basic colour table for indices 1-9; higher indices walk the hue
/// circle by the golden angle so neighbours stay distinguishable.
pub fn root_color(index: u32) -> RGBColor {
    match index {
        0 => RGBColor(255, 255, 255),
        1 => RGBColor(0, 0, 0),
        2 => RGBColor(255, 0, 0),
        3 => RGBColor(0, 255, 0),
        4 => RGBColor(0, 0, 255),
        5 => RGBColor(255, 255, 0),
        6 => RGBColor(255, 0, 255),
        7 => RGBColor(0, 255, 255),
        8 => RGBColor(89, 212, 84),
        9 => RGBColor(89, 84, 217),
        n => hsl_to_rgb(((n - 10) as f32 * 137.508) % 360.0),
    }
}

// ---------------------------------------------------------------------------
// Color scheme: colour index → RGB
// ---------------------------------------------------------------------------

/// How colour indices are turned into actual colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorScheme {
    /// ROOT's indexed colours (1 = black, 2 = red, 3 = green, ...).
    #[default]
    Root,
    /// Hues spread evenly over however many series were drawn.
    Spread,
}

/// Resolves colour indices for a plot with a known number of series.
#[derive(Debug, Clone)]
pub struct ColorMap {
    scheme: ColorScheme,
    spread: Vec<RGBColor>,
}

impl ColorMap {
    pub fn new(scheme: ColorScheme, series: usize) -> Self {
        let spread = match scheme {
            ColorScheme::Root => Vec::new(),
            ColorScheme::Spread => generate_palette(series),
        };
        ColorMap { scheme, spread }
    }

    /// Look up the colour for a given style.
    pub fn color_for(&self, style: &SeriesStyle) -> RGBColor {
        match self.scheme {
            ColorScheme::Root => root_color(style.color_index),
            ColorScheme::Spread => style
                .color_index
                .checked_sub(1)
                .and_then(|i| self.spread.get(i as usize))
                .copied()
                .unwrap_or_else(|| root_color(style.color_index)),
        }
    }
}
