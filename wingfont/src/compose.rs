//! Composing base glyphs with annotation runs.

use std::collections::HashSet;

use kurbo::{Affine, BezPath, Point, Rect, Shape};

use crate::{
    alloc::GlyphNameAllocator,
    bounds::{scale_rotate, Run, VerticalOffsets},
    font::{GlyphMetric, WorkingFont},
    mapping::VariantGlyph,
    metrics::InkExtents,
    pen::Canvas,
    Options,
};

/// Draw `outline` scaled by `matrix`, with its visual center moved to the
/// middle of `advance` and shifted up by `dy`.
///
/// Glyphs that draw nothing are left out.
pub(crate) fn draw_centered(
    outline: &BezPath,
    matrix: Affine,
    advance: f64,
    dy: f64,
    canvas: &mut Canvas,
) {
    if outline.elements().is_empty() {
        return;
    }
    let center = outline.bounding_box().center();
    let [a, _, c, _, _, _] = matrix.as_coeffs();
    let x_offset = advance / 2.0 - (a * center.x + c * center.y);
    canvas.draw(outline, matrix.then_translate((x_offset, dy).into()));
}

/// The left side bearing for a glyph with the given ink bounds.
pub(crate) fn side_bearing(bounds: Option<Rect>, min_lsb: Option<f64>) -> i16 {
    let x_min = bounds.map(|bounds| bounds.x0).unwrap_or(0.0);
    let lsb = match min_lsb {
        Some(min_lsb) => min_lsb.max(x_min),
        None => x_min,
    };
    lsb.round_ties_even()
        .clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Builds annotated glyphs into an output font.
///
/// One compositor is used for a whole run: it owns the name allocator, the
/// set of base glyphs it has replaced, and the ink extents of everything it
/// drew.
pub struct Compositor<'a> {
    base: &'a WorkingFont,
    anno: &'a WorkingFont,
    options: &'a Options,
    offsets: VerticalOffsets,
    base_matrix: Affine,
    anno_run: Run,
    names: GlyphNameAllocator,
    processed: HashSet<String>,
    extents: InkExtents,
}

/// Where the compositor's state ends up once every character is composed.
#[derive(Clone, Debug, Default)]
pub struct Composed {
    /// Base glyphs handled by the compositor, whether or not they were drawn.
    pub processed: HashSet<String>,
    pub extents: InkExtents,
}

impl<'a> Compositor<'a> {
    pub fn new(
        base: &'a WorkingFont,
        anno: &'a WorkingFont,
        options: &'a Options,
        offsets: VerticalOffsets,
        names: GlyphNameAllocator,
    ) -> Self {
        Compositor {
            base,
            anno,
            options,
            offsets,
            base_matrix: scale_rotate(options.base_scale, options.base_scale, options.base_rotate),
            anno_run: Run::new(
                options.anno_scale,
                options.anno_rotate,
                options.spacing_units(anno.units_per_em()),
            ),
            names,
            processed: HashSet::new(),
            extents: InkExtents::new(),
        }
    }

    /// Compose one glyph per annotation of `ch` into `out`.
    ///
    /// Returns the composed variants in annotation order. A character the
    /// base font doesn't map, or whose glyph has no outline, yields no
    /// variants.
    pub fn compose(
        &mut self,
        out: &mut WorkingFont,
        ch: char,
        annotations: &[String],
    ) -> Vec<VariantGlyph> {
        let base = self.base;
        let Some(glyph_name) = base.glyph_for_char(ch).filter(|name| base.contains(name)) else {
            log::debug!("'{ch}' is not in the base font, skipping");
            return Vec::new();
        };
        self.processed.insert(glyph_name.to_owned());
        let Some(outline) = base.outline(glyph_name) else {
            return Vec::new();
        };
        let base_advance = base.advance_width(glyph_name).unwrap_or_default();

        annotations
            .iter()
            .enumerate()
            .map(|(index, annotation)| {
                let glyph = self.names.name_for(index, glyph_name, out);
                self.compose_variant(out, glyph_name, outline, base_advance, annotation, &glyph);
                if index == 0 {
                    out.bind_char(ch, &glyph);
                }
                VariantGlyph {
                    annotation: annotation.clone(),
                    glyph,
                    index: index as u8,
                }
            })
            .collect()
    }

    fn compose_variant(
        &mut self,
        out: &mut WorkingFont,
        base_name: &str,
        outline: &BezPath,
        base_advance: u16,
        annotation: &str,
        glyph: &str,
    ) {
        // measure the annotation uncompressed, relative to its own origin
        let mut measure = Canvas::measure();
        self.anno_run
            .draw(self.anno, annotation, Point::ORIGIN, &mut measure);
        let (width, center) = measure
            .bounds()
            .map(|bounds| (bounds.width(), bounds.center().x))
            .unwrap_or_default();

        let safe = self.options.safe_width_factor();
        let mut advance = base_advance as f64;
        if self.options.auto_width && width > advance * safe {
            advance = (width / safe).ceil();
        }
        let advance = advance.min(u16::MAX as f64);

        let mut canvas = Canvas::new();
        draw_centered(outline, self.base_matrix, advance, self.offsets.base, &mut canvas);

        let safe_width = advance * safe;
        let mut ratio = 1.0;
        if self.options.fit && width > safe_width && safe_width > 0.0 {
            ratio = safe_width / width;
        }
        let origin = Point::new(advance / 2.0 - center * ratio, self.offsets.annotation);
        self.anno_run
            .compressed(ratio)
            .draw(self.anno, annotation, origin, &mut canvas);

        let bounds = canvas.bounds();
        if let Some(bounds) = bounds.filter(|_| self.options.auto_height) {
            self.extents.add(bounds);
        }
        if let Some(metric) = self.base.v_metric(base_name) {
            out.set_v_metric(glyph, metric);
        }
        let metric = GlyphMetric::new(advance as u16, side_bearing(bounds, self.options.min_lsb));
        out.set_glyph(glyph, canvas.into_path(), metric);
    }

    pub fn finish(self) -> Composed {
        Composed {
            processed: self.processed,
            extents: self.extents,
        }
    }
}
