//! Avatar composition.
//!
//! A request is turned into colors and optional text, then handed to either
//! the vector renderer ([`svg`]) or the raster renderer ([`raster`]).

pub mod raster;
pub mod svg;

use std::sync::Arc;

use crate::error::AvatarResult;
use crate::glyph::{self, FontCache, GlyphSpec, TextSizing};
use crate::palette::{self, BackgroundMode, TextColor};

/// Largest accepted canvas edge in pixels.
pub const MAX_CANVAS_SIZE: u32 = 1080;
pub const DEFAULT_CANVAS_SIZE: u32 = 120;

/// Output is a pure function of the request, so clients may cache it for half a day.
pub const CACHE_CONTROL: &str = "public, max-age=43200";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Raster,
    Vector,
}

impl OutputFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Raster => "image/png",
            OutputFormat::Vector => "image/svg+xml",
        }
    }
}

/// What text, if any, goes on the avatar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TextMode {
    #[default]
    None,
    Literal(String),
    /// Initials of `seed`, or of the identifier when no seed is given.
    AutoInitials { seed: Option<String> },
}

impl TextMode {
    pub fn resolve(&self, identifier: &str) -> String {
        match self {
            TextMode::None => String::new(),
            TextMode::Literal(text) => text.clone(),
            TextMode::AutoInitials { seed } => glyph::initials(seed.as_deref().unwrap_or(identifier)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarRequest {
    pub identifier: String,
    pub format: OutputFormat,
    pub canvas_size: u32,
    pub background: BackgroundMode,
    pub explicit_color: Option<String>,
    pub text: TextMode,
    /// Corner radius for the vector background shape.
    pub corner_radius: u32,
}

impl AvatarRequest {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            format: OutputFormat::default(),
            canvas_size: DEFAULT_CANVAS_SIZE,
            background: BackgroundMode::default(),
            explicit_color: None,
            text: TextMode::default(),
            corner_radius: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedAvatar {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    fonts: Arc<FontCache>,
    sizing: TextSizing,
}

impl Renderer {
    pub fn new(fonts: Arc<FontCache>) -> Self {
        Self {
            fonts,
            sizing: TextSizing::default(),
        }
    }

    pub fn with_sizing(mut self, sizing: TextSizing) -> Self {
        self.sizing = sizing;
        self
    }

    pub fn fonts(&self) -> &FontCache {
        &self.fonts
    }

    pub fn glyph_spec(&self, request: &AvatarRequest, background: palette::Rgb) -> Option<GlyphSpec> {
        let text = request.text.resolve(&request.identifier);
        if text.is_empty() {
            return None;
        }

        Some(GlyphSpec {
            font_size_px: self.sizing.font_size(request.canvas_size, &text),
            fill: TextColor::resolve(background, request.explicit_color.as_deref()),
            text,
        })
    }

    pub fn render(&self, request: &AvatarRequest) -> AvatarResult<RenderedAvatar> {
        let colors = palette::derive(&request.identifier, request.background);
        let glyph = self.glyph_spec(request, colors.primary);

        let bytes = match request.format {
            OutputFormat::Vector => svg::render(
                request.canvas_size,
                &colors,
                request.background,
                glyph.as_ref(),
                request.corner_radius,
            )
            .into_bytes(),
            OutputFormat::Raster => {
                let mut canvas = raster::fill_background(request.canvas_size, &colors, request.background);
                if let Some(glyph) = &glyph {
                    raster::draw_text(&mut canvas, glyph, &self.fonts);
                }
                raster::encode_png(&canvas)?
            }
        };

        Ok(RenderedAvatar {
            bytes,
            content_type: request.format.content_type(),
        })
    }
}
