//! Text for the avatar: initials extraction, font sizing, and centering
//! metrics taken from a loaded font.

use rusttype::{point, Font, PositionedGlyph, Scale};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use crate::palette::TextColor;

/// Upper bound on distinct pixel sizes kept in the face cache.
pub const MAX_CACHED_FACES: usize = 64;

/// DejaVu Sans, compiled in so raster text works without a font on disk.
static BUNDLED_FONT: &[u8] = include_bytes!("../fonts/DejaVuSans.ttf");

/// First character of every whitespace-separated word, uppercased.
/// Falls back to the first character of `name` when that yields nothing.
pub fn initials(name: &str) -> String {
    let initials: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect();

    if initials.is_empty() {
        return name.chars().next().map(|c| c.to_uppercase().collect()).unwrap_or_default();
    }
    initials
}

/// Font size rule shared by the vector and raster renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSizing {
    pub single_glyph_divisor: u32,
    pub multi_glyph_divisor: u32,
}

impl Default for TextSizing {
    fn default() -> Self {
        Self {
            single_glyph_divisor: 2,
            multi_glyph_divisor: 5,
        }
    }
}

impl TextSizing {
    pub fn font_size(&self, canvas_size: u32, text: &str) -> u32 {
        let divisor = if text.chars().count() > 1 {
            self.multi_glyph_divisor
        } else {
            self.single_glyph_divisor
        };
        (canvas_size / divisor.max(1)).max(1)
    }
}

/// Text to draw plus how to draw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphSpec {
    pub text: String,
    pub fill: TextColor,
    pub font_size_px: u32,
}

/// Top-left origin of the text box: `x` is where the pen starts, `baseline`
/// is the y coordinate of the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    pub x: f32,
    pub baseline: f32,
}

/// Centers a run of `text_width` on a square canvas. `descent` is the
/// positive distance below the baseline.
pub fn center(canvas_size: u32, text_width: f32, ascent: f32, descent: f32) -> TextPlacement {
    let size = canvas_size as f32;
    TextPlacement {
        x: ((size - text_width) / 2.0).round(),
        baseline: ((size - (ascent + descent)) / 2.0).round() + ascent.round(),
    }
}

/// A font scaled to one pixel size.
#[derive(Clone)]
pub struct SizedFace {
    font: Font<'static>,
    scale: Scale,
    ascent: f32,
    descent: f32,
}

impl fmt::Debug for SizedFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizedFace")
            .field("scale", &self.scale)
            .field("ascent", &self.ascent)
            .field("descent", &self.descent)
            .finish()
    }
}

impl SizedFace {
    fn new(font: Font<'static>, px: u32) -> Self {
        let scale = Scale::uniform(px as f32);
        let v_metrics = font.v_metrics(scale);
        Self {
            font,
            scale,
            ascent: v_metrics.ascent,
            descent: -v_metrics.descent,
        }
    }

    pub fn ascent(&self) -> f32 {
        self.ascent
    }

    pub fn descent(&self) -> f32 {
        self.descent
    }

    /// Advance width of `text` (sum of glyph advances with kerning).
    pub fn measure(&self, text: &str) -> f32 {
        self.font
            .layout(text, self.scale, point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }

    /// Glyphs for `text` centered on a `canvas_size` square.
    pub fn layout_centered(&self, canvas_size: u32, text: &str) -> Vec<PositionedGlyph<'static>> {
        let placement = center(canvas_size, self.measure(text), self.ascent, self.descent);
        self.font
            .layout(text, self.scale, point(placement.x, placement.baseline))
            .collect()
    }
}

/// One base font plus faces derived from it, keyed by pixel size.
///
/// When no font could be loaded every lookup returns `None` and callers
/// render without text.
#[derive(Default)]
pub struct FontCache {
    font: Option<Font<'static>>,
    faces: Mutex<HashMap<u32, Arc<SizedFace>>>,
}

impl fmt::Debug for FontCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontCache")
            .field("has_font", &self.has_font())
            .field("cached_sizes", &self.cached_sizes())
            .finish()
    }
}

impl FontCache {
    /// Cache with no font; text is never drawn.
    pub fn empty() -> Self {
        Self::default()
    }

    fn with_font(font: Font<'static>) -> Self {
        Self {
            font: Some(font),
            faces: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        Font::try_from_vec(bytes).map(Self::with_font)
    }

    /// The font compiled into the binary.
    pub fn bundled() -> Self {
        match Font::try_from_bytes(BUNDLED_FONT) {
            Some(font) => Self::with_font(font),
            None => {
                tracing::error!("bundled font is unreadable, text will not be drawn");
                Self::empty()
            }
        }
    }

    /// Loads the font at `path`, falling back to [`FontCache::bundled`].
    pub fn load(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => Self::from_bytes(bytes).unwrap_or_else(|| {
                tracing::warn!(path = %path.display(), "failed to parse font file, using bundled font");
                Self::bundled()
            }),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read font file, using bundled font");
                Self::bundled()
            }
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn cached_sizes(&self) -> usize {
        self.faces.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn face(&self, px: u32) -> Option<Arc<SizedFace>> {
        let font = self.font.as_ref()?;
        let mut faces = self.faces.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(face) = faces.get(&px) {
            return Some(Arc::clone(face));
        }

        let face = Arc::new(SizedFace::new(font.clone(), px));
        if faces.len() < MAX_CACHED_FACES {
            faces.insert(px, Arc::clone(&face));
        }
        Some(face)
    }
}
