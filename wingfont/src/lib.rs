//! Synthesize fonts with annotated glyphs.
//!
//! Each base character listed in an [`AnnotationMapping`] is redrawn with a
//! short run of annotation glyphs (such as a phonetic gloss) stacked next to
//! it. A character with several annotations gets one glyph per annotation,
//! and `liga` rules let a reader pick a variant by typing a digit, or a
//! marker followed by a numeral, after the character.
//!
//! ```no_run
//! # fn main() -> Result<(), wingfont::WingError> {
//! use wingfont::{annotate_font, AnnotationMapping, Options, WorkingFont};
//!
//! let base = WorkingFont::from_bytes(&std::fs::read("base.ttf").unwrap())?;
//! let anno = WorkingFont::from_bytes(&std::fs::read("anno.ttf").unwrap())?;
//! let mapping = AnnotationMapping::from_text("行,hang4\n行,hang6\n")?;
//! let annotated = annotate_font(&base, &anno, &mapping, &Options::default())?;
//! let ttf = annotated.font.to_bytes()?;
//! std::fs::write("out.woff", wingfont::woff::to_woff(&ttf)?).unwrap();
//! std::fs::write("out.ttf", ttf).unwrap();
//! # Ok(())
//! # }
//! ```

pub mod alloc;
pub mod bounds;
pub mod compose;
pub mod family;
mod font;
pub mod liga;
pub mod mapping;
pub mod metrics;
mod options;
mod output;
pub mod passthrough;
mod pen;
pub mod woff;

use thiserror::Error;
use write_fonts::{read::ReadError, types::Tag};

pub use family::FamilyNames;
pub use font::{GlyphMetric, VerticalMetrics, WorkingFont};
pub use mapping::{AnnotationMapping, VariantGlyph, VariantMap};
pub use options::Options;

use alloc::GlyphNameAllocator;
use bounds::VerticalOffsets;
use compose::Compositor;
use liga::LigatureSummary;
use passthrough::Passthrough;

#[derive(Debug, Error)]
pub enum WingError {
    #[error("Error reading font data: {0}")]
    Read(#[from] ReadError),

    #[error("Only fonts with TrueType outlines are supported")]
    UnsupportedOutlines,

    #[error("Failed to load outlines: {0}")]
    Scaler(String),

    #[error("Failed to draw glyph '{glyph}': {reason}")]
    Draw { glyph: String, reason: String },

    #[error("Invalid outline for glyph '{glyph}': {reason}")]
    Outline { glyph: String, reason: String },

    #[error("Compiling table '{table}' failed: {reason}")]
    Compile { table: Tag, reason: String },

    #[error("Invalid mapping on line {line}: {reason}")]
    Mapping { line: usize, reason: String },

    #[error("Too many annotations for '{ch}', at most {} are supported", mapping::MAX_VARIANTS)]
    TooManyVariants { ch: char },

    #[error("Too many lookups in GSUB")]
    TooManyLookups,

    #[error("Too many glyphs: {0}")]
    TooManyGlyphs(usize),

    #[error("Failed to build WOFF data: {0}")]
    Woff(String),
}

/// What a run of [`annotate_font`] did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    /// Characters that received at least one annotated glyph.
    pub annotated_chars: usize,
    /// Annotated glyphs written, across all characters.
    pub variant_glyphs: usize,
    /// Mapping entries that produced nothing.
    pub skipped_chars: usize,
    pub passthrough: Passthrough,
    pub ligatures: LigatureSummary,
    /// The vertical metrics set by auto height, if they changed.
    pub vertical_metrics: Option<VerticalMetrics>,
    /// `name` records written with the new family names.
    pub family_name_records: usize,
}

/// The result of [`annotate_font`].
#[derive(Clone, Debug)]
pub struct Annotated {
    pub font: WorkingFont,
    pub variants: VariantMap,
    pub report: Report,
}

/// Build the annotated font.
///
/// `base` provides the glyphs being annotated and every table not touched
/// here; `anno` provides the glyphs the annotations are drawn with. Neither
/// is modified.
pub fn annotate_font(
    base: &WorkingFont,
    anno: &WorkingFont,
    mapping: &AnnotationMapping,
    options: &Options,
) -> Result<Annotated, WingError> {
    options.log_enabled();
    let offsets = VerticalOffsets::compute(base, anno, options);

    let mut font = base.clone();
    let mut variants = VariantMap::new();
    let mut report = Report::default();

    let mut compositor = Compositor::new(base, anno, options, offsets, GlyphNameAllocator::new());
    for (ch, annotations) in mapping.iter() {
        let composed = compositor.compose(&mut font, ch, annotations);
        if composed.is_empty() {
            report.skipped_chars += 1;
            continue;
        }
        report.annotated_chars += 1;
        report.variant_glyphs += composed.len();
        variants.insert(ch, composed);
    }
    let composed = compositor.finish();
    let mut extents = composed.extents;

    report.passthrough = passthrough::rescale_unannotated(
        base,
        &mut font,
        &composed.processed,
        options,
        offsets,
        &mut extents,
    );

    if options.auto_height {
        report.vertical_metrics = metrics::fit_vertical_metrics(&mut font, &extents, options);
    }

    report.ligatures = liga::add_variant_ligatures(&mut font, &variants)?;
    report.family_name_records = font.rename_family(&options.family_names)?;
    log::info!(
        "annotated {} characters with {} glyphs",
        report.annotated_chars,
        report.variant_glyphs
    );
    Ok(Annotated {
        font,
        variants,
        report,
    })
}
