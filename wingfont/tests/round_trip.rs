//! Annotate fonts built in memory, write them out and read them back.

use kurbo::{BezPath, Shape};
use pretty_assertions::assert_eq;
use wingfont::{
    annotate_font,
    liga::{DIGITS, MARKER, NUMERALS},
    AnnotationMapping, FamilyNames, GlyphMetric, Options, WingError, WorkingFont,
};
use write_fonts::{
    read::{FontRef, TableProvider},
    tables::{
        gsub::SubstitutionLookup,
        layout::Lookup,
        name::{Name, NameRecord},
    },
    types::{NameId, Tag},
    FontBuilder,
};

const LIGA: Tag = Tag::new(b"liga");

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> BezPath {
    let mut path = BezPath::new();
    path.move_to((x0, y0));
    path.line_to((x0, y1));
    path.line_to((x1, y1));
    path.line_to((x1, y0));
    path.close_path();
    path
}

/// A CJK-ish base font with every trigger glyph, compiled and reloaded.
fn base_font() -> WorkingFont {
    let mut font = WorkingFont::new(1000);
    font.set_glyph(".notdef", BezPath::new(), GlyphMetric::new(500, 0));
    font.set_glyph("space", BezPath::new(), GlyphMetric::new(250, 0));
    font.bind_char(' ', "space");
    for ch in ['逛', '行', '字'] {
        let name = format!("uni{:04X}", ch as u32);
        font.set_glyph(&name, rect(50.0, -80.0, 950.0, 820.0), GlyphMetric::new(1000, 50));
        font.bind_char(ch, &name);
    }
    for ch in DIGITS.into_iter().chain([MARKER]).chain(NUMERALS) {
        let name = format!("uni{:04X}", ch as u32);
        font.set_glyph(&name, rect(40.0, 0.0, 460.0, 700.0), GlyphMetric::new(500, 40));
        font.bind_char(ch, &name);
    }
    WorkingFont::from_bytes(&font.to_bytes().unwrap()).unwrap()
}

fn anno_font() -> WorkingFont {
    let mut font = WorkingFont::new(1000);
    font.set_glyph(".notdef", BezPath::new(), GlyphMetric::new(500, 0));
    for ch in ('a'..='z').chain('0'..='9') {
        font.set_glyph(&ch.to_string(), rect(0.0, 0.0, 500.0, 600.0), GlyphMetric::new(500, 0));
        font.bind_char(ch, &ch.to_string());
    }
    WorkingFont::from_bytes(&font.to_bytes().unwrap()).unwrap()
}

fn mapping() -> AnnotationMapping {
    AnnotationMapping::from_text("# readings\n行,hang4\n行\thong4\n字,zi6\n").unwrap()
}

fn liga_lookups(font: &WorkingFont) -> Vec<usize> {
    let gsub = font.gsub().unwrap();
    gsub.feature_list
        .feature_records
        .iter()
        .filter(|record| record.feature_tag == LIGA)
        .flat_map(|record| record.feature.lookup_list_indices.iter())
        .map(|idx| *idx as usize)
        .collect()
}

#[test]
fn annotated_font_reloads() {
    let base = base_font();
    let options = Options {
        auto_height: true,
        ..Default::default()
    };
    let annotated = annotate_font(&base, &anno_font(), &mapping(), &options).unwrap();
    let data = annotated.font.to_bytes().unwrap();
    let font = WorkingFont::from_bytes(&data).unwrap();

    // one extra glyph for the second reading of 行
    assert_eq!(font.num_glyphs(), base.num_glyphs() + 1);
    let hong = annotated.variants.lookup('行', "hong4").unwrap();
    assert_eq!(hong.index, 1);
    assert_eq!(font.glyph_order().last(), Some(&hong.glyph));
    assert!(hong.glyph.starts_with("wingfont"));
    assert_eq!(font.glyph_for_char('行'), Some("uni884C"));
    assert_eq!(font.advance_width(&hong.glyph), Some(1000));

    // the annotation sits above the scaled base glyph
    let bounds = font.outline("uni884C").unwrap().bounding_box();
    assert!(bounds.y1 > 700.0);
    let lsb = font.h_metric("uni884C").unwrap().side_bearing as f64;
    assert!((lsb - bounds.x0).abs() <= 1.0, "{lsb} vs {}", bounds.x0);

    let metrics = font.vertical_metrics();
    assert_eq!(metrics, annotated.report.vertical_metrics.unwrap());
    assert_eq!(metrics.win_descent, metrics.descender.unsigned_abs());

    // two digit and two marker rules, in one lookup
    let lookups = liga_lookups(&font);
    assert_eq!(lookups.len(), 1);
    let gsub = font.gsub().unwrap();
    let SubstitutionLookup::Ligature(Lookup { subtables, .. }) = &*gsub.lookup_list.lookups[lookups[0]]
    else {
        panic!("expected a ligature lookup");
    };
    let rules: usize = subtables
        .iter()
        .flat_map(|sub| sub.ligature_sets.iter())
        .map(|set| set.ligatures.len())
        .sum();
    assert_eq!(rules, 4);
    assert_eq!(annotated.report.ligatures.rules, 4);
}

#[test]
fn auto_width_survives_compilation() {
    let mut mapping = AnnotationMapping::new();
    mapping.push('字', "abcdefghij").unwrap();
    let options = Options {
        auto_width: true,
        ..Default::default()
    };
    let annotated = annotate_font(&base_font(), &anno_font(), &mapping, &options).unwrap();
    let font = WorkingFont::from_bytes(&annotated.font.to_bytes().unwrap()).unwrap();
    // 9 * (175 - 10.5) + 175 wide, over 0.97 of the advance
    assert_eq!(font.advance_width("uni5B57"), Some(1707));
    assert_eq!(font.advance_width("uni884C"), Some(1000));
}

#[test]
fn output_is_deterministic() {
    let base = base_font();
    let anno = anno_font();
    let options = Options {
        fit: true,
        auto_height: true,
        ..Default::default()
    };
    let first = annotate_font(&base, &anno, &mapping(), &options).unwrap();
    let second = annotate_font(&base, &anno, &mapping(), &options).unwrap();
    assert_eq!(first.font.glyph_order(), second.font.glyph_order());
    assert_eq!(first.font.to_bytes().unwrap(), second.font.to_bytes().unwrap());
}

#[test]
fn unknown_tables_are_copied() {
    let data = base_font().to_bytes().unwrap();
    let source = FontRef::new(&data).unwrap();
    let mut builder = FontBuilder::new();
    builder.add_raw(Tag::new(b"TEST"), vec![1u8, 2, 3, 4]);
    builder.add_raw(Tag::new(b"DSIG"), vec![0u8; 8]);
    builder.copy_missing_tables(source);
    let base = WorkingFont::from_bytes(&builder.build()).unwrap();

    let annotated = annotate_font(&base, &anno_font(), &mapping(), &Options::default()).unwrap();
    let data = annotated.font.to_bytes().unwrap();
    let font = FontRef::new(&data).unwrap();
    assert_eq!(
        font.data_for_tag(Tag::new(b"TEST")).unwrap().as_bytes(),
        [1, 2, 3, 4]
    );
    assert!(font.data_for_tag(Tag::new(b"DSIG")).is_none());
    assert_eq!(font.maxp().unwrap().num_glyphs(), base.num_glyphs() as u16 + 1);
}

#[test]
fn fonts_without_glyf_are_rejected() {
    let mut builder = FontBuilder::new();
    builder.add_raw(Tag::new(b"CFF "), vec![1u8, 0, 4, 1]);
    let err = WorkingFont::from_bytes(&builder.build()).unwrap_err();
    assert!(matches!(err, WingError::UnsupportedOutlines), "{err}");
}

fn windows_name(font: &FontRef, name_id: NameId) -> Option<String> {
    let name = font.name().unwrap();
    let record = name
        .name_record()
        .iter()
        .find(|r| r.platform_id() == 3 && r.language_id() == 0x0409 && r.name_id() == name_id)?;
    Some(record.string(name.string_data()).unwrap().to_string())
}

#[test]
fn family_is_renamed_and_other_names_kept() {
    let data = base_font().to_bytes().unwrap();
    let source = FontRef::new(&data).unwrap();
    let mut name = Name::new(vec![
        NameRecord::new(3, 1, 0x0409, NameId::FAMILY_NAME, "Base Song".to_string().into()),
        NameRecord::new(3, 1, 0x0409, NameId::SUBFAMILY_NAME, "Regular".to_string().into()),
    ]);
    name.name_record.sort();
    let mut builder = FontBuilder::new();
    builder.add_table(&name).unwrap();
    builder.copy_missing_tables(source);
    let base = WorkingFont::from_bytes(&builder.build()).unwrap();

    let options = Options {
        family_names: FamilyNames {
            english: Some("Wing Song".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    let annotated = annotate_font(&base, &anno_font(), &mapping(), &options).unwrap();
    let data = annotated.font.to_bytes().unwrap();
    let font = FontRef::new(&data).unwrap();
    assert_eq!(windows_name(&font, NameId::FAMILY_NAME).as_deref(), Some("Wing Song"));
    assert_eq!(windows_name(&font, NameId::POSTSCRIPT_NAME).as_deref(), Some("Wing Song"));
    assert_eq!(windows_name(&font, NameId::SUBFAMILY_NAME).as_deref(), Some("Regular"));
}

#[test]
fn woff_wraps_every_table() {
    let annotated = annotate_font(&base_font(), &anno_font(), &mapping(), &Options::default()).unwrap();
    let ttf = annotated.font.to_bytes().unwrap();
    let woff = wingfont::woff::to_woff(&ttf).unwrap();
    let num_tables = FontRef::new(&ttf).unwrap().table_directory.table_records().len();
    assert_eq!(&woff[..4], b"wOFF");
    assert_eq!(u16::from_be_bytes([woff[12], woff[13]]) as usize, num_tables);
    assert!(woff.len() < ttf.len());
}

