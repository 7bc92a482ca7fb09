//! Layout and metrics configuration.

use crate::family::FamilyNames;

/// Options controlling how annotated glyphs are laid out.
///
/// Scales are relative to the source glyphs; offsets, paddings and spacing
/// are fractions of an em.
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    pub base_scale: f64,
    pub anno_scale: f64,
    pub base_y_offset: f64,
    pub anno_y_offset: f64,
    /// Rotation of the base glyph, in degrees.
    pub base_rotate: f64,
    /// Rotation of the annotation run, in degrees.
    pub anno_rotate: f64,
    /// Lower bound for the left side bearing of rewritten glyphs.
    pub min_lsb: Option<f64>,
    /// Swap the vertical placement of base and annotation.
    pub invert: bool,
    /// Compress annotations horizontally when they don't fit the advance.
    pub fit: bool,
    /// Fraction of the advance kept clear when fitting or widening.
    pub fit_padding: f64,
    /// Extra space between annotation characters, as a fraction of the
    /// annotation font's em.
    pub anno_spacing: f64,
    /// Widen the advance of glyphs whose annotation is too long.
    pub auto_width: bool,
    /// Recompute the font's vertical metrics from the drawn glyphs.
    pub auto_height: bool,
    pub top_padding: Option<f64>,
    pub bottom_padding: Option<f64>,
    /// New family names for the output font.
    pub family_names: FamilyNames,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            base_scale: 0.60,
            anno_scale: 0.35,
            base_y_offset: 0.0,
            anno_y_offset: 0.70,
            base_rotate: 0.0,
            anno_rotate: 0.0,
            min_lsb: None,
            invert: false,
            fit: false,
            fit_padding: 0.03,
            anno_spacing: -0.03,
            auto_width: false,
            auto_height: false,
            top_padding: None,
            bottom_padding: None,
            family_names: FamilyNames::default(),
        }
    }
}

impl Options {
    /// The share of an advance that annotations may occupy.
    pub(crate) fn safe_width_factor(&self) -> f64 {
        let factor = 1.0 - self.fit_padding;
        if factor <= 0.0 {
            1.0
        } else {
            factor
        }
    }

    /// Spacing between annotation characters, in unscaled annotation units.
    pub(crate) fn spacing_units(&self, anno_units_per_em: u16) -> f64 {
        anno_units_per_em as f64 * self.anno_spacing
    }

    /// The (top, bottom) auto-height paddings, as fractions of an em.
    pub(crate) fn paddings(&self) -> (f64, f64) {
        let (top, bottom) = if self.invert { (-0.60, 0.10) } else { (0.10, -0.60) };
        (
            self.top_padding.unwrap_or(top),
            self.bottom_padding.unwrap_or(bottom),
        )
    }

    pub(crate) fn log_enabled(&self) {
        if self.invert {
            log::info!("inverting annotation and base vertical positions");
        }
        if self.fit {
            log::info!(
                "horizontal fitting enabled with {:.0}% padding",
                self.fit_padding * 100.0
            );
        }
        if self.auto_width {
            log::info!("auto width enabled, advances expand for long annotations");
        }
        if self.auto_height {
            log::info!("auto height enabled, vertical metrics follow the drawn glyphs");
        }
        if self.anno_spacing != 0.0 {
            log::info!(
                "spacing between annotation characters: {:.0}%",
                self.anno_spacing * 100.0
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_width_factor_falls_back_to_one() {
        let mut options = Options::default();
        assert!((options.safe_width_factor() - 0.97).abs() < 1e-9);
        options.fit_padding = 1.5;
        assert_eq!(options.safe_width_factor(), 1.0);
    }

    #[test]
    fn padding_defaults_follow_invert() {
        let mut options = Options::default();
        assert_eq!(options.paddings(), (0.10, -0.60));
        options.invert = true;
        assert_eq!(options.paddings(), (-0.60, 0.10));
        options.bottom_padding = Some(0.2);
        assert_eq!(options.paddings(), (-0.60, 0.2));
    }
}
