//! Background colors and text contrast.
//!
//! Colors are a pure function of the identifier's digest: gradient mode reads
//! the first six digest bytes as two RGB triples, solid mode indexes a fixed
//! Material-style palette with the first byte.

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::hasher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Perceived brightness, 0.0 ..= 255.0.
    pub fn luminance(self) -> f64 {
        0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }

    /// `rgb(r,g,b)` notation used in the vector output.
    pub fn css(self) -> String {
        format!("rgb({},{},{})", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundMode {
    #[default]
    Gradient,
    Solid,
}

/// Background endpoints. `primary == secondary` in solid mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPair {
    pub primary: Rgb,
    pub secondary: Rgb,
}

pub const PALETTE: [Rgb; 20] = [
    Rgb::new(244, 67, 54),   // red
    Rgb::new(233, 30, 99),   // pink
    Rgb::new(156, 39, 176),  // purple
    Rgb::new(103, 58, 183),  // deep purple
    Rgb::new(63, 81, 181),   // indigo
    Rgb::new(33, 150, 243),  // blue
    Rgb::new(3, 169, 244),   // light blue
    Rgb::new(0, 188, 212),   // cyan
    Rgb::new(0, 150, 136),   // teal
    Rgb::new(76, 175, 80),   // green
    Rgb::new(139, 195, 74),  // light green
    Rgb::new(205, 220, 57),  // lime
    Rgb::new(255, 193, 7),   // amber
    Rgb::new(255, 152, 0),   // orange
    Rgb::new(255, 87, 34),   // deep orange
    Rgb::new(121, 85, 72),   // brown
    Rgb::new(158, 158, 158), // grey
    Rgb::new(96, 125, 139),  // blue grey
    Rgb::new(0, 121, 107),   // dark teal
    Rgb::new(85, 139, 47),   // olive green
];

pub fn derive(identifier: &str, mode: BackgroundMode) -> ColorPair {
    let digest = hasher::digest(identifier);

    match mode {
        BackgroundMode::Gradient => ColorPair {
            primary: Rgb::new(digest[0], digest[1], digest[2]),
            secondary: Rgb::new(digest[3], digest[4], digest[5]),
        },
        BackgroundMode::Solid => {
            let color = PALETTE[digest[0] as usize % PALETTE.len()];
            ColorPair {
                primary: color,
                secondary: color,
            }
        }
    }
}

const LIGHT_BACKGROUND_THRESHOLD: f64 = 186.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextColor {
    Black,
    White,
}

impl TextColor {
    /// Readable default for text drawn on `background`.
    pub fn contrasting(background: Rgb) -> Self {
        if background.luminance() > LIGHT_BACKGROUND_THRESHOLD {
            TextColor::Black
        } else {
            TextColor::White
        }
    }

    /// Caller's `black`/`white` token (any case) wins; anything else falls
    /// back to the contrast default.
    pub fn resolve(background: Rgb, token: Option<&str>) -> Self {
        match token.map(str::to_ascii_lowercase).as_deref() {
            Some("black") => TextColor::Black,
            Some("white") => TextColor::White,
            _ => Self::contrasting(background),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TextColor::Black => "black",
            TextColor::White => "white",
        }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        match self {
            TextColor::Black => Rgba([0, 0, 0, 255]),
            TextColor::White => Rgba([255, 255, 255, 255]),
        }
    }
}
