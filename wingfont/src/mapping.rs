//! Character to annotation mappings, and the variant glyphs built from them.

use indexmap::IndexMap;

use crate::WingError;

/// The maximum number of annotations for one character.
///
/// Variants are selected by a single digit, so indices are limited to 0..=9.
pub const MAX_VARIANTS: usize = 10;

/// An ordered mapping from base characters to their annotations.
///
/// The position of an annotation in its character's list is its variant
/// index; the first annotation is the default rendering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnotationMapping {
    entries: IndexMap<char, Vec<String>>,
}

impl AnnotationMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a mapping from text.
    ///
    /// Each line holds a character and an annotation, separated by a comma
    /// or a tab. Blank lines and lines starting with `#` are ignored, except
    /// that `#` directly followed by a separator is a record for `#` itself.
    pub fn from_text(text: &str) -> Result<Self, WingError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut mapping = AnnotationMapping::new();
        for (i, line) in text.lines().enumerate() {
            let line_no = i + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || is_comment(trimmed) {
                continue;
            }
            let (ch, annotation) = parse_record(trimmed).map_err(|reason| WingError::Mapping {
                line: line_no,
                reason,
            })?;
            mapping.push(ch, annotation)?;
        }
        Ok(mapping)
    }

    /// Add an annotation for `ch`.
    ///
    /// Returns `false` if `ch` already has this annotation.
    pub fn push(&mut self, ch: char, annotation: &str) -> Result<bool, WingError> {
        let annotations = self.entries.entry(ch).or_default();
        if annotations.iter().any(|existing| existing == annotation) {
            return Ok(false);
        }
        if annotations.len() == MAX_VARIANTS {
            return Err(WingError::TooManyVariants { ch });
        }
        annotations.push(annotation.to_owned());
        Ok(true)
    }

    pub fn get(&self, ch: char) -> Option<&[String]> {
        self.entries.get(&ch).map(Vec::as_slice)
    }

    /// Iterate characters and their annotations, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (char, &[String])> + '_ {
        self.entries.iter().map(|(ch, annos)| (*ch, annos.as_slice()))
    }

    /// The number of characters in the mapping.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const SEPARATORS: [char; 2] = [',', '\t'];

fn is_comment(line: &str) -> bool {
    line.strip_prefix('#')
        .is_some_and(|rest| !rest.trim_start_matches(' ').starts_with(SEPARATORS))
}

/// Split a record after its first character, so that the separators
/// themselves can be annotated.
fn parse_record(line: &str) -> Result<(char, &str), String> {
    let mut chars = line.chars();
    let Some(ch) = chars.next() else {
        return Err("empty record".into());
    };
    let rest = chars.as_str().trim_start_matches(' ');
    let Some(annotation) = rest.strip_prefix(SEPARATORS) else {
        return Err(match rest.split_once(SEPARATORS) {
            Some((key, _)) => format!("'{ch}{}' is not a single character", key.trim_end()),
            None => "expected '<char>,<annotation>'".into(),
        });
    };
    let annotation = annotation.trim();
    if annotation.is_empty() {
        return Err(format!("empty annotation for '{ch}'"));
    }
    Ok((ch, annotation))
}

/// A composed glyph for one annotation of a character.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantGlyph {
    pub annotation: String,
    /// The name of the glyph in the output font.
    pub glyph: String,
    /// The variant index; 0 is the default rendering.
    pub index: u8,
}

/// The composed glyphs for every mapped character.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariantMap {
    entries: IndexMap<char, Vec<VariantGlyph>>,
}

impl VariantMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the variants composed for `ch`.
    ///
    /// Empty lists are not recorded.
    pub fn insert(&mut self, ch: char, variants: Vec<VariantGlyph>) {
        if !variants.is_empty() {
            self.entries.insert(ch, variants);
        }
    }

    pub fn get(&self, ch: char) -> Option<&[VariantGlyph]> {
        self.entries.get(&ch).map(Vec::as_slice)
    }

    /// Find the glyph composed for a particular annotation of `ch`.
    pub fn lookup(&self, ch: char, annotation: &str) -> Option<&VariantGlyph> {
        self.get(ch)?
            .iter()
            .find(|variant| variant.annotation == annotation)
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &[VariantGlyph])> + '_ {
        self.entries
            .iter()
            .map(|(ch, variants)| (*ch, variants.as_slice()))
    }

    /// The number of characters with at least one variant.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The total number of composed glyphs.
    pub fn num_glyphs(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}
