//! Vector output. Self-contained SVG with no raster dependency.

use crate::glyph::GlyphSpec;
use crate::palette::{BackgroundMode, ColorPair};

const FONT_FAMILY: &str = "DejaVu Sans, sans-serif";

pub fn render(
    size: u32,
    colors: &ColorPair,
    mode: BackgroundMode,
    glyph: Option<&GlyphSpec>,
    corner_radius: u32,
) -> String {
    let mut svg = String::with_capacity(512);

    svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    svg.push_str(&format!(
        "<svg width=\"{size}\" height=\"{size}\" viewBox=\"0 0 {size} {size}\" xmlns=\"http://www.w3.org/2000/svg\">\n"
    ));

    let fill = match mode {
        BackgroundMode::Solid => colors.primary.css(),
        BackgroundMode::Gradient => {
            svg.push_str(&gradient_defs(colors));
            "url(#gradient)".to_string()
        }
    };

    svg.push_str(&format!(
        "  <rect width=\"{size}\" height=\"{size}\" rx=\"{corner_radius}\" ry=\"{corner_radius}\" fill=\"{fill}\"/>\n"
    ));

    if let Some(glyph) = glyph {
        svg.push_str(&text_element(glyph));
    }

    svg.push_str("</svg>\n");
    svg
}

/// Diagonal gradient, primary at the top-left corner.
fn gradient_defs(colors: &ColorPair) -> String {
    format!(
        "  <defs><linearGradient id=\"gradient\" x1=\"0\" y1=\"0\" x2=\"1\" y2=\"1\"><stop offset=\"0%\" stop-color=\"{}\"/><stop offset=\"100%\" stop-color=\"{}\"/></linearGradient></defs>\n",
        colors.primary.css(),
        colors.secondary.css()
    )
}

fn text_element(glyph: &GlyphSpec) -> String {
    format!(
        "  <text x=\"50%\" y=\"50%\" text-anchor=\"middle\" dominant-baseline=\"middle\" font-family=\"{FONT_FAMILY}\" font-size=\"{}\" fill=\"{}\">{}</text>\n",
        glyph.font_size_px,
        glyph.fill.as_str(),
        escape_text(&glyph.text)
    )
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}
