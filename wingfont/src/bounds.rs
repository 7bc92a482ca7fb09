//! Measuring reference glyphs, and the vertical offsets derived from them.

use kurbo::{Affine, Point, Vec2};

use crate::{font::WorkingFont, pen::Canvas, Options};

/// The annotation string whose extent anchors annotation placement.
pub const REFERENCE_ANNOTATION: &str = "kwaang3";

/// Base characters probed, in order, to anchor base glyph placement.
pub const REFERENCE_BASE_CHARS: [char; 2] = ['逛', '一'];

/// A scale and rotation with no translation.
///
/// The horizontal scale may differ from the vertical one so that
/// annotations can be compressed without changing their height.
pub(crate) fn scale_rotate(scale_x: f64, scale_y: f64, degrees: f64) -> Affine {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Affine::new([
        scale_x * cos,
        scale_x * sin,
        -scale_y * sin,
        scale_y * cos,
        0.0,
        0.0,
    ])
}

/// A run of glyphs drawn left to right along a (possibly rotated) baseline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Run {
    scale: f64,
    degrees: f64,
    ratio: f64,
    spacing: f64,
}

impl Run {
    /// `spacing` is added between characters, in unscaled font units.
    pub(crate) fn new(scale: f64, degrees: f64, spacing: f64) -> Self {
        Run {
            scale,
            degrees,
            ratio: 1.0,
            spacing,
        }
    }

    /// The same run, squeezed horizontally by `ratio`.
    pub(crate) fn compressed(self, ratio: f64) -> Self {
        Run { ratio, ..self }
    }

    /// Draw `text` with the first glyph's origin at `origin`.
    ///
    /// Characters the font can't map are skipped without advancing. Each
    /// advance is the scaled advance width, rounded to whole units, and then
    /// compressed.
    pub(crate) fn draw(&self, font: &WorkingFont, text: &str, origin: Point, canvas: &mut Canvas) {
        let scale_x = self.scale * self.ratio;
        let matrix = scale_rotate(scale_x, self.scale, self.degrees);
        let (sin, cos) = self.degrees.to_radians().sin_cos();
        let direction = Vec2::new(cos, sin);

        let len = text.chars().count();
        let mut pos = origin;
        for (idx, ch) in text.chars().enumerate() {
            let Some(name) = font.glyph_for_char(ch) else {
                continue;
            };
            let Some(outline) = font.outline(name) else {
                continue;
            };
            canvas.draw(outline, matrix.then_translate(pos.to_vec2()));

            let advance = font.advance_width(name).unwrap_or_default() as f64;
            let advance = (advance * self.scale).round_ties_even();
            pos += direction * (advance * self.ratio);
            if idx + 1 < len {
                pos += direction * (self.spacing * scale_x);
            }
        }
    }
}

/// The vertical extent `(min_y, max_y)` of a glyph under `transform`.
///
/// Returns `(0, 0)` for glyphs that are missing or draw nothing.
pub fn glyph_extent(font: &WorkingFont, name: &str, transform: Affine) -> (f64, f64) {
    let mut canvas = Canvas::measure();
    if let Some(outline) = font.outline(name) {
        // measurements ignore translation
        let [a, b, c, d, _, _] = transform.as_coeffs();
        canvas.draw(outline, Affine::new([a, b, c, d, 0.0, 0.0]));
    }
    y_range(&canvas)
}

/// The vertical extent of `text` laid out as a run starting at the origin.
pub(crate) fn run_extent(font: &WorkingFont, text: &str, run: Run) -> (f64, f64) {
    let mut canvas = Canvas::measure();
    run.draw(font, text, Point::ORIGIN, &mut canvas);
    y_range(&canvas)
}

fn y_range(canvas: &Canvas) -> (f64, f64) {
    canvas
        .bounds()
        .map(|bounds| (bounds.y0, bounds.y1))
        .unwrap_or_default()
}

/// Vertical placement shared by every glyph in the output.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VerticalOffsets {
    /// Offset applied to base glyphs, including those without annotations.
    pub base: f64,
    /// Offset applied to annotation runs.
    pub annotation: f64,
}

impl VerticalOffsets {
    /// Derive the offsets from the options and the reference glyphs.
    ///
    /// Without `invert` these are just the configured offsets in font units.
    /// With it, the two layers swap places: each is aligned against the
    /// reference extent of the other so that the gap between them is kept.
    pub fn compute(base: &WorkingFont, anno: &WorkingFont, options: &Options) -> Self {
        let upem = base.units_per_em() as f64;
        let base_dy = (upem * options.base_y_offset).round_ties_even();
        let anno_dy = (upem * options.anno_y_offset).round_ties_even();

        let run = Run::new(
            options.anno_scale,
            options.anno_rotate,
            options.spacing_units(anno.units_per_em()),
        );
        let (anno_bottom, anno_top) = run_extent(anno, REFERENCE_ANNOTATION, run);

        let base_transform = scale_rotate(options.base_scale, options.base_scale, options.base_rotate);
        let (base_bottom, base_top, base_ref) = match reference_base_glyph(base) {
            Some((ch, name)) => {
                let (bottom, top) = glyph_extent(base, name, base_transform);
                (bottom, top, Some(ch))
            }
            None => {
                log::warn!("no reference base glyph found, using zero bounds");
                (0.0, 0.0, None)
            }
        };
        log::info!(
            "reference glyphs: annotation '{REFERENCE_ANNOTATION}', base '{}'",
            base_ref.map(String::from).unwrap_or_default()
        );

        if !options.invert {
            return VerticalOffsets {
                base: base_dy,
                annotation: anno_dy,
            };
        }
        if anno_dy > base_dy {
            VerticalOffsets {
                annotation: base_dy + base_bottom - anno_bottom,
                base: anno_dy + anno_top - base_top,
            }
        } else {
            VerticalOffsets {
                annotation: base_dy + base_top - anno_top,
                base: anno_dy + anno_bottom - base_bottom,
            }
        }
    }

    /// The offset for glyphs that receive no annotation.
    pub fn passthrough(&self) -> f64 {
        self.base
    }
}

// the first probe must have an outline; the fallback only needs a mapping
fn reference_base_glyph(font: &WorkingFont) -> Option<(char, &str)> {
    let [preferred, fallback] = REFERENCE_BASE_CHARS;
    if let Some(name) = font.glyph_for_char(preferred) {
        if font.outline(name).is_some() {
            return Some((preferred, name));
        }
    }
    font.glyph_for_char(fallback).map(|name| (fallback, name))
}
