//! Font-wide vertical metrics derived from the drawn glyphs.

use kurbo::Rect;

use crate::{
    font::{VerticalMetrics, WorkingFont},
    Options,
};

/// The vertical range covered by every glyph drawn so far.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InkExtents {
    range: Option<(f64, f64)>,
}

impl InkExtents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the bounds of one drawn glyph into the range.
    pub fn add(&mut self, bounds: Rect) {
        self.range = Some(match self.range {
            Some((min, max)) => (min.min(bounds.y0), max.max(bounds.y1)),
            None => (bounds.y0, bounds.y1),
        });
    }

    pub fn min_y(&self) -> Option<f64> {
        self.range.map(|(min, _)| min)
    }

    pub fn max_y(&self) -> Option<f64> {
        self.range.map(|(_, max)| max)
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_none()
    }
}

/// Replace the font's vertical metrics to fit the drawn ink.
///
/// The ascender sits `top_padding` of an em above the highest point, the
/// descender `bottom_padding` of an em above the lowest one. Returns the
/// new metrics, or `None` if nothing was drawn.
pub fn fit_vertical_metrics(
    font: &mut WorkingFont,
    extents: &InkExtents,
    options: &Options,
) -> Option<VerticalMetrics> {
    let (min_y, max_y) = extents.range?;
    let (top, bottom) = options.paddings();
    let upem = font.units_per_em() as f64;
    let top_units = (upem * top).round_ties_even();
    let bottom_units = (upem * bottom).round_ties_even();

    let ascender = clamp_i16(max_y.round_ties_even() + top_units);
    let descender = clamp_i16(min_y.round_ties_even() - bottom_units);
    let metrics = VerticalMetrics {
        ascender,
        descender,
        typo_ascender: ascender,
        typo_descender: descender,
        win_ascent: ascender.max(0) as u16,
        win_descent: descender.unsigned_abs(),
    };
    font.set_vertical_metrics(metrics);
    log::info!(
        "auto height: top padding {:.1}%, bottom padding {:.1}%",
        top * 100.0,
        bottom * 100.0
    );
    Some(metrics)
}

fn clamp_i16(value: f64) -> i16 {
    value.clamp(i16::MIN as f64, i16::MAX as f64) as i16
}
