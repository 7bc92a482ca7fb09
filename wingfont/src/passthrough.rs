//! Rescaling the glyphs that receive no annotation.

use std::collections::HashSet;

use crate::{
    bounds::{scale_rotate, VerticalOffsets},
    compose::{draw_centered, side_bearing},
    font::{GlyphMetric, WorkingFont},
    metrics::InkExtents,
    pen::Canvas,
    Options,
};

/// Counts from a passthrough pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Passthrough {
    /// Glyphs redrawn at the base scale.
    pub rescaled: usize,
    /// Glyphs left alone because they have no outline.
    pub skipped: usize,
}

/// Redraw every base glyph not in `processed` at the base scale.
///
/// Each glyph keeps its advance width and is recentered within it, at the
/// vertical offset shared by all base glyphs.
pub fn rescale_unannotated(
    base: &WorkingFont,
    out: &mut WorkingFont,
    processed: &HashSet<String>,
    options: &Options,
    offsets: VerticalOffsets,
    extents: &mut InkExtents,
) -> Passthrough {
    let matrix = scale_rotate(options.base_scale, options.base_scale, options.base_rotate);
    let mut result = Passthrough::default();

    for name in base.glyph_order() {
        if processed.contains(name) {
            continue;
        }
        let Some(outline) = base.outline(name) else {
            result.skipped += 1;
            continue;
        };
        let advance = base.advance_width(name).unwrap_or_default();

        let mut canvas = Canvas::new();
        draw_centered(outline, matrix, advance as f64, offsets.passthrough(), &mut canvas);
        let bounds = canvas.bounds();
        if let Some(bounds) = bounds.filter(|_| options.auto_height) {
            extents.add(bounds);
        }
        let metric = GlyphMetric::new(advance, side_bearing(bounds, options.min_lsb));
        out.set_glyph(name, canvas.into_path(), metric);
        result.rescaled += 1;
    }

    if result.skipped > 0 {
        log::info!("skipped {} empty glyphs", result.skipped);
    }
    result
}
