//! Ligature rules for switching between annotation variants.
//!
//! A variant is selected by typing a trigger after the character: a digit,
//! or the marker '丅' followed by a Chinese numeral. Trigger 0 selects the
//! character's default glyph; trigger N selects variant N.

use write_fonts::{
    tables::{
        gsub::{builders::LigatureSubBuilder, Gsub, LigatureSubstFormat1, SubstitutionLookup},
        layout::{
            builders::Builder, Feature, FeatureRecord, LangSys, Lookup, LookupFlag, Script,
            ScriptRecord,
        },
        variations::ivs_builder::VariationStoreBuilder,
    },
    types::{GlyphId16, Tag},
    OffsetMarker,
};

use crate::{font::WorkingFont, mapping::VariantMap, WingError};

pub const DIGITS: [char; 10] = ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub const MARKER: char = '丅';
pub const NUMERALS: [char; 10] = ['零', '一', '二', '三', '四', '五', '六', '七', '八', '九'];

/// The number of characters whose rules share one lookup.
pub const CHUNK_SIZE: usize = 5000;

const LIGA: Tag = Tag::new(b"liga");

/// A ligature substitution rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LigatureRule {
    /// The input sequence, starting with the variant glyph.
    pub components: Vec<GlyphId16>,
    pub replacement: GlyphId16,
}

/// What [`add_variant_ligatures`] added to the font.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LigatureSummary {
    pub rules: usize,
    pub lookups: usize,
}

/// Trigger glyphs, as found in the font.
#[derive(Clone, Debug, Default)]
struct Triggers {
    digits: [Option<GlyphId16>; 10],
    marker: Option<GlyphId16>,
    numerals: [Option<GlyphId16>; 10],
}

impl Triggers {
    fn resolve(font: &WorkingFont) -> Self {
        let lookup = |ch: char| font.glyph_for_char(ch).and_then(|name| font.glyph_id(name));
        let triggers = Triggers {
            digits: DIGITS.map(&lookup),
            marker: lookup(MARKER),
            numerals: NUMERALS.map(&lookup),
        };
        if !triggers.has_digits() {
            log::warn!("no glyphs for the digits 0-9, digit triggers are skipped");
        }
        if triggers.marker.is_none() {
            log::warn!("no glyph for '{MARKER}', numeral triggers are skipped");
        }
        if !triggers.has_numerals() {
            log::warn!("no glyphs for the numerals 零-九, numeral triggers are skipped");
        }
        triggers
    }

    fn has_digits(&self) -> bool {
        self.digits.iter().any(Option::is_some)
    }

    fn has_numerals(&self) -> bool {
        self.numerals.iter().any(Option::is_some)
    }

    fn has_marker_sequences(&self) -> bool {
        self.marker.is_some() && self.has_numerals()
    }

    fn is_empty(&self) -> bool {
        !self.has_digits() && !self.has_marker_sequences()
    }
}

/// Build the rules for every character in `variants`.
///
/// Rules are grouped by character, in the order of the variant map; a
/// character whose codepoint no longer maps to a glyph gets no rules.
/// Rules that would replace a glyph with itself are not generated.
pub fn variant_rules(font: &WorkingFont, variants: &VariantMap) -> Vec<Vec<LigatureRule>> {
    let triggers = Triggers::resolve(font);
    if triggers.is_empty() {
        log::warn!("no trigger glyphs in the font, no ligatures added");
        return Vec::new();
    }
    variants
        .iter()
        .filter_map(|(ch, glyphs)| {
            let default = font
                .glyph_for_char(ch)
                .and_then(|name| font.glyph_id(name))?;
            let mut by_index = [None; 10];
            for variant in glyphs {
                if let Some(slot) = by_index.get_mut(variant.index as usize) {
                    *slot = font.glyph_id(&variant.glyph);
                }
            }
            let target = |n: usize| if n == 0 { Some(default) } else { by_index[n] };

            let mut rules = Vec::new();
            for source in glyphs.iter().filter_map(|v| font.glyph_id(&v.glyph)) {
                for (n, digit) in triggers.digits.iter().enumerate() {
                    if let (Some(digit), Some(target)) = (digit, target(n)) {
                        push_rule(&mut rules, vec![source, *digit], target);
                    }
                }
                let Some(marker) = triggers.marker else {
                    continue;
                };
                for (n, numeral) in triggers.numerals.iter().enumerate() {
                    if let (Some(numeral), Some(target)) = (numeral, target(n)) {
                        push_rule(&mut rules, vec![source, marker, *numeral], target);
                    }
                }
            }
            Some(rules)
        })
        .collect()
}

fn push_rule(rules: &mut Vec<LigatureRule>, components: Vec<GlyphId16>, replacement: GlyphId16) {
    if components[0] != replacement {
        rules.push(LigatureRule {
            components,
            replacement,
        });
    }
}

/// Compile rules into ligature subtables.
///
/// Rules are grouped into one ligature set per first glyph, with longer
/// sequences first; the builder starts a new subtable whenever the current
/// one would outgrow a 16-bit offset.
pub fn build_subtables(rules: impl IntoIterator<Item = LigatureRule>) -> Vec<LigatureSubstFormat1> {
    let mut builder = LigatureSubBuilder::default();
    for rule in rules {
        builder.insert(rule.components, rule.replacement);
    }
    // ligature subtables carry no variation data
    builder.build(&mut VariationStoreBuilder::new(0))
}

/// Add lookups selecting annotation variants to the font's `liga` feature.
///
/// Characters are split into chunks of [`CHUNK_SIZE`], each getting its own
/// lookup.
pub fn add_variant_ligatures(
    font: &mut WorkingFont,
    variants: &VariantMap,
) -> Result<LigatureSummary, WingError> {
    let per_char = variant_rules(font, variants);
    let mut summary = LigatureSummary::default();
    for chunk in per_char.chunks(CHUNK_SIZE) {
        let rules: Vec<_> = chunk.iter().flatten().cloned().collect();
        if rules.is_empty() {
            continue;
        }
        summary.rules += rules.len();
        let subtables = build_subtables(rules);
        let lookup = SubstitutionLookup::Ligature(Lookup::new(LookupFlag::empty(), subtables));
        install_lookup(font.gsub_mut(), lookup)?;
        summary.lookups += 1;
    }
    if summary.lookups > 0 {
        log::info!(
            "added {} ligature rules in {} lookups",
            summary.rules,
            summary.lookups
        );
    }
    Ok(summary)
}

/// Append `lookup` and make it reachable from the `liga` feature.
///
/// If the table has no `liga` feature, one is added to the default language
/// system of every script.
fn install_lookup(gsub: &mut Gsub, lookup: SubstitutionLookup) -> Result<(), WingError> {
    let lookup_index = u16::try_from(gsub.lookup_list.lookups.len())
        .map_err(|_| WingError::TooManyLookups)?;
    gsub.lookup_list.lookups.push(OffsetMarker::new(lookup));

    let mut found = false;
    for record in gsub
        .feature_list
        .feature_records
        .iter_mut()
        .filter(|record| record.feature_tag == LIGA)
    {
        found = true;
        if !record.feature.lookup_list_indices.contains(&lookup_index) {
            record.feature.lookup_list_indices.push(lookup_index);
        }
    }
    if found {
        return Ok(());
    }

    let feature_index = u16::try_from(gsub.feature_list.feature_records.len())
        .map_err(|_| WingError::TooManyLookups)?;
    gsub.feature_list
        .feature_records
        .push(FeatureRecord::new(LIGA, Feature::new(None, vec![lookup_index])));

    if gsub.script_list.script_records.is_empty() {
        let script = Script::new(Some(LangSys::new(Vec::new())), Vec::new());
        gsub.script_list
            .script_records
            .push(ScriptRecord::new(Tag::new(b"DFLT"), script));
    }
    for record in gsub.script_list.script_records.iter_mut() {
        let script = &mut *record.script;
        let lang_sys = script
            .default_lang_sys
            .get_or_insert_with(|| Box::new(LangSys::new(Vec::new())));
        if !lang_sys.feature_indices.contains(&feature_index) {
            lang_sys.feature_indices.push(feature_index);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use kurbo::BezPath;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        font::GlyphMetric,
        mapping::{VariantGlyph, VariantMap},
    };

    fn gid(id: u16) -> GlyphId16 {
        GlyphId16::new(id)
    }

    /// glyph order: .notdef, 0-9, 丅, 零-九, then 'han' and two variants
    fn font_with_triggers() -> WorkingFont {
        let mut font = WorkingFont::new(1000);
        font.set_glyph(".notdef", BezPath::new(), GlyphMetric::new(500, 0));
        for ch in DIGITS.into_iter().chain([MARKER]).chain(NUMERALS) {
            let name = format!("uni{:04X}", ch as u32);
            font.set_glyph(&name, BezPath::new(), GlyphMetric::new(500, 0));
            font.bind_char(ch, &name);
        }
        font.set_glyph("han", BezPath::new(), GlyphMetric::new(1000, 0));
        font.bind_char('字', "han");
        font.set_glyph("wingfont000000", BezPath::new(), GlyphMetric::new(1000, 0));
        font
    }

    fn two_variants() -> VariantMap {
        let mut variants = VariantMap::new();
        variants.insert(
            '字',
            vec![
                VariantGlyph {
                    annotation: "zi6".into(),
                    glyph: "han".into(),
                    index: 0,
                },
                VariantGlyph {
                    annotation: "zi3".into(),
                    glyph: "wingfont000000".into(),
                    index: 1,
                },
            ],
        );
        variants
    }

    #[test]
    fn two_variants_make_four_rules() {
        let font = font_with_triggers();
        let han = gid(22);
        let alt = gid(23);
        let rules = variant_rules(&font, &two_variants());
        assert_eq!(rules.len(), 1);
        let digit_0 = font.glyph_id("uni0030").unwrap();
        let digit_1 = font.glyph_id("uni0031").unwrap();
        let marker = font.glyph_id("uni4E05").unwrap();
        let numeral_0 = font.glyph_id("uni96F6").unwrap();
        let numeral_1 = font.glyph_id("uni4E00").unwrap();
        assert_eq!(
            rules[0],
            vec![
                LigatureRule {
                    components: vec![han, digit_1],
                    replacement: alt
                },
                LigatureRule {
                    components: vec![han, marker, numeral_1],
                    replacement: alt
                },
                LigatureRule {
                    components: vec![alt, digit_0],
                    replacement: han
                },
                LigatureRule {
                    components: vec![alt, marker, numeral_0],
                    replacement: han
                },
            ]
        );
    }

    #[test]
    fn no_triggers_no_rules() {
        let mut font = WorkingFont::new(1000);
        font.set_glyph("han", BezPath::new(), GlyphMetric::new(1000, 0));
        font.bind_char('字', "han");
        font.set_glyph("wingfont000000", BezPath::new(), GlyphMetric::new(1000, 0));
        assert!(variant_rules(&font, &two_variants()).is_empty());
        let summary = add_variant_ligatures(&mut font, &two_variants()).unwrap();
        assert_eq!(summary, LigatureSummary::default());
        assert!(font.gsub().is_none());
    }

    #[test]
    fn marker_without_numerals_is_not_a_trigger() {
        let mut font = WorkingFont::new(1000);
        font.set_glyph("marker", BezPath::new(), GlyphMetric::new(1000, 0));
        font.bind_char(MARKER, "marker");
        font.set_glyph("han", BezPath::new(), GlyphMetric::new(1000, 0));
        font.bind_char('字', "han");
        font.set_glyph("wingfont000000", BezPath::new(), GlyphMetric::new(1000, 0));
        assert!(variant_rules(&font, &two_variants()).is_empty());
    }

    #[test]
    fn longer_sequences_come_first() {
        let rules = vec![
            LigatureRule {
                components: vec![gid(5), gid(1)],
                replacement: gid(6),
            },
            LigatureRule {
                components: vec![gid(5), gid(2), gid(3)],
                replacement: gid(6),
            },
            LigatureRule {
                components: vec![gid(4), gid(1)],
                replacement: gid(5),
            },
        ];
        let subtables = build_subtables(rules);
        assert_eq!(subtables.len(), 1);
        let sets = &subtables[0].ligature_sets;
        assert_eq!(sets.len(), 2);
        // sets follow coverage order
        assert_eq!(sets[0].ligatures.len(), 1);
        let second: Vec<_> = sets[1]
            .ligatures
            .iter()
            .map(|lig| lig.component_glyph_ids.len())
            .collect();
        assert_eq!(second, [2, 1]);
    }

    #[test]
    fn large_rule_sets_are_split() {
        // 200 ligatures of 2 components per set: 2 + 200 * (2 + 4 + 2) bytes
        let rules = (0..100u16).flat_map(|first| {
            (0..200u16).map(move |second| LigatureRule {
                components: vec![gid(first), gid(1000 + second)],
                replacement: gid(5000),
            })
        });
        let subtables = build_subtables(rules);
        assert!(subtables.len() > 1);
        let total: usize = subtables.iter().map(|sub| sub.ligature_sets.len()).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn new_liga_feature_is_registered() {
        let mut font = font_with_triggers();
        let summary = add_variant_ligatures(&mut font, &two_variants()).unwrap();
        assert_eq!(
            summary,
            LigatureSummary {
                rules: 4,
                lookups: 1
            }
        );
        let gsub = font.gsub().unwrap();
        assert_eq!(gsub.lookup_list.lookups.len(), 1);
        assert_eq!(gsub.feature_list.feature_records.len(), 1);
        let record = &gsub.feature_list.feature_records[0];
        assert_eq!(record.feature_tag, LIGA);
        assert_eq!(record.feature.lookup_list_indices, [0]);
        let script = &gsub.script_list.script_records[0].script;
        let lang_sys = (*script.default_lang_sys).as_ref().unwrap();
        assert_eq!(lang_sys.feature_indices, [0]);
    }

    #[test]
    fn existing_liga_feature_gets_the_lookup() {
        let mut font = font_with_triggers();
        {
            let gsub = font.gsub_mut();
            let other = SubstitutionLookup::Ligature(Lookup::new(
                LookupFlag::empty(),
                build_subtables([LigatureRule {
                    components: vec![gid(1), gid(2)],
                    replacement: gid(3),
                }]),
            ));
            gsub.lookup_list.lookups.push(OffsetMarker::new(other));
            gsub.feature_list
                .feature_records
                .push(FeatureRecord::new(LIGA, Feature::new(None, vec![0])));
        }
        add_variant_ligatures(&mut font, &two_variants()).unwrap();
        let gsub = font.gsub().unwrap();
        assert_eq!(gsub.lookup_list.lookups.len(), 2);
        assert_eq!(gsub.feature_list.feature_records.len(), 1);
        assert_eq!(
            gsub.feature_list.feature_records[0]
                .feature
                .lookup_list_indices,
            [0, 1]
        );
        // the default script was not touched
        let script = &gsub.script_list.script_records[0].script;
        let lang_sys = (*script.default_lang_sys).as_ref().unwrap();
        assert!(lang_sys.feature_indices.is_empty());
    }

    #[test]
    fn scripts_without_default_lang_sys_get_one() {
        let mut font = font_with_triggers();
        font.gsub_mut().script_list.script_records.push(ScriptRecord::new(
            Tag::new(b"latn"),
            Script::new(None, Vec::new()),
        ));
        add_variant_ligatures(&mut font, &two_variants()).unwrap();
        let gsub = font.gsub().unwrap();
        for record in &gsub.script_list.script_records {
            let lang_sys = (*record.script.default_lang_sys).as_ref().unwrap();
            assert_eq!(lang_sys.feature_indices, [0], "{}", record.script_tag);
        }
    }
}
