//! Naming of synthesized variant glyphs.

use std::collections::HashSet;

use crate::font::WorkingFont;

/// Prefix of every synthesized glyph name.
pub const GLYPH_PREFIX: &str = "wingfont";

/// Hands out glyph names for composed glyphs.
///
/// The first variant of a character normally takes over the base glyph's
/// name; every other variant gets a fresh `wingfontNNNNNN` name. Names are
/// never reused within one run, and never collide with a glyph that is
/// already in the output font.
#[derive(Clone, Debug, Default)]
pub struct GlyphNameAllocator {
    counter: u32,
    emitted: HashSet<String>,
}

impl GlyphNameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the name for variant `index` of the glyph `base_name`.
    ///
    /// The returned name is recorded as emitted.
    pub fn name_for(&mut self, index: usize, base_name: &str, font: &WorkingFont) -> String {
        if index == 0 && !self.emitted.contains(base_name) {
            self.emitted.insert(base_name.to_owned());
            return base_name.to_owned();
        }
        let name = loop {
            let candidate = format!("{GLYPH_PREFIX}{:06}", self.counter);
            self.counter += 1;
            if candidate != base_name
                && !self.emitted.contains(&candidate)
                && !font.contains(&candidate)
            {
                break candidate;
            }
        };
        self.emitted.insert(name.clone());
        name
    }
}
