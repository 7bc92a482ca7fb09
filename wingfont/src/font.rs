//! The in-memory font model that the compositor reads from and writes into.

use std::collections::{BTreeMap, HashMap};

use kurbo::BezPath;
use skrifa::{
    instance::{LocationRef, Size},
    outline::DrawSettings,
    GlyphNameSource, MetadataProvider,
};
use write_fonts::{
    from_obj::FromTableRef,
    read::{FontRef, TableProvider, TopLevelTable},
    tables::{
        glyf::Glyf,
        gsub::Gsub,
        layout::{LangSys, Script, ScriptList, ScriptRecord},
        name::Name,
    },
    types::{GlyphId, GlyphId16, Tag},
};

use crate::{pen::OutlineRecorder, WingError};

const NAME: Tag = Tag::new(b"name");

/// An advance and side bearing pair, in font units.
///
/// Used for both the horizontal (advance width, left side bearing) and the
/// vertical (advance height, top side bearing) metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GlyphMetric {
    pub advance: u16,
    pub side_bearing: i16,
}

impl GlyphMetric {
    pub fn new(advance: u16, side_bearing: i16) -> Self {
        Self {
            advance,
            side_bearing,
        }
    }
}

/// Font-wide vertical metrics from the `hhea` and `OS/2` tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VerticalMetrics {
    pub ascender: i16,
    pub descender: i16,
    pub typo_ascender: i16,
    pub typo_descender: i16,
    pub win_ascent: u16,
    pub win_descent: u16,
}

/// A mutable view of a TrueType font.
///
/// Glyphs are identified by name; the position of a name in the glyph order
/// is its glyph id in the compiled font. New glyphs are only ever appended,
/// so glyph ids referenced by tables copied from the source stay valid.
#[derive(Clone, Debug)]
pub struct WorkingFont {
    source: Vec<u8>,
    units_per_em: u16,
    glyph_order: Vec<String>,
    glyph_ids: HashMap<String, u32>,
    outlines: HashMap<String, BezPath>,
    h_metrics: HashMap<String, GlyphMetric>,
    v_metrics: Option<HashMap<String, GlyphMetric>>,
    cmap: BTreeMap<u32, String>,
    cmap_modified: bool,
    vertical: VerticalMetrics,
    has_glyph_names: bool,
    gsub: Option<Gsub>,
    gsub_modified: bool,
    /// The `name` table, once something rewrites it.
    name: Option<Name>,
}

impl WorkingFont {
    /// An empty font with no backing binary.
    pub fn new(units_per_em: u16) -> Self {
        WorkingFont {
            source: Vec::new(),
            units_per_em,
            glyph_order: Vec::new(),
            glyph_ids: HashMap::new(),
            outlines: HashMap::new(),
            h_metrics: HashMap::new(),
            v_metrics: None,
            cmap: BTreeMap::new(),
            cmap_modified: false,
            vertical: VerticalMetrics::default(),
            has_glyph_names: true,
            gsub: None,
            gsub_modified: false,
            name: None,
        }
    }

    /// Load a TrueType font.
    ///
    /// Every glyph is drawn unhinted at the default location and stored as a
    /// path in font units.
    pub fn from_bytes(data: &[u8]) -> Result<Self, WingError> {
        let font = FontRef::new(data)?;
        if font.data_for_tag(Glyf::TAG).is_none() {
            return Err(WingError::UnsupportedOutlines);
        }
        let scaler_font =
            skrifa::FontRef::new(data).map_err(|e| WingError::Scaler(e.to_string()))?;

        let units_per_em = font.head()?.units_per_em();
        let num_glyphs = font.maxp()?.num_glyphs() as u32;
        let hhea = font.hhea()?;
        let hmtx = font.hmtx()?;
        let vmtx = font.vmtx().ok();

        let mut vertical = VerticalMetrics {
            ascender: hhea.ascender().to_i16(),
            descender: hhea.descender().to_i16(),
            ..Default::default()
        };
        if let Ok(os2) = font.os2() {
            vertical.typo_ascender = os2.s_typo_ascender();
            vertical.typo_descender = os2.s_typo_descender();
            vertical.win_ascent = os2.us_win_ascent();
            vertical.win_descent = os2.us_win_descent();
        }

        let names = scaler_font.glyph_names();
        let has_glyph_names = names.source() == GlyphNameSource::Post;
        let outline_glyphs = scaler_font.outline_glyphs();

        let mut this = WorkingFont {
            source: data.to_owned(),
            units_per_em,
            vertical,
            has_glyph_names,
            v_metrics: vmtx.as_ref().map(|_| HashMap::new()),
            ..WorkingFont::new(units_per_em)
        };

        for gid in 0..num_glyphs {
            let name = names
                .get(skrifa::GlyphId::new(gid))
                .map(|name| name.as_str().to_owned())
                .unwrap_or_else(|| format!("gid{gid}"));
            let name = this.dedup_name(name);
            let glyph_id = GlyphId::new(gid);

            let metric = GlyphMetric::new(
                hmtx.advance(glyph_id).unwrap_or_default(),
                hmtx.side_bearing(glyph_id).unwrap_or_default(),
            );
            this.h_metrics.insert(name.clone(), metric);

            if let (Some(vmtx), Some(v_metrics)) = (vmtx.as_ref(), this.v_metrics.as_mut()) {
                let metric = GlyphMetric::new(
                    vmtx.advance(glyph_id).unwrap_or_default(),
                    vmtx.side_bearing(glyph_id).unwrap_or_default(),
                );
                v_metrics.insert(name.clone(), metric);
            }

            if let Some(outline) = outline_glyphs.get(skrifa::GlyphId::new(gid)) {
                let mut pen = OutlineRecorder::default();
                outline
                    .draw(
                        DrawSettings::unhinted(Size::unscaled(), LocationRef::default()),
                        &mut pen,
                    )
                    .map_err(|e| WingError::Draw {
                        glyph: name.clone(),
                        reason: e.to_string(),
                    })?;
                this.outlines.insert(name.clone(), pen.finish());
            }

            this.glyph_ids.insert(name.clone(), gid);
            this.glyph_order.push(name);
        }

        for (codepoint, gid) in scaler_font.charmap().mappings() {
            if let Some(name) = this.glyph_order.get(gid.to_u32() as usize) {
                this.cmap.insert(codepoint, name.clone());
            }
        }

        this.gsub = font.gsub().ok().map(|gsub| Gsub::from_table_ref(&gsub));
        log::debug!(
            "loaded {} glyphs, {} codepoints, upem {}",
            this.glyph_order.len(),
            this.cmap.len(),
            units_per_em
        );
        Ok(this)
    }

    // glyph names must be unique; repeated names get a '#n' suffix
    fn dedup_name(&self, name: String) -> String {
        if !self.glyph_ids.contains_key(&name) {
            return name;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{name}#{n}");
            if !self.glyph_ids.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    pub fn glyph_order(&self) -> &[String] {
        &self.glyph_order
    }

    pub fn num_glyphs(&self) -> usize {
        self.glyph_order.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.glyph_ids.contains_key(name)
    }

    /// The glyph id this name will have in the compiled font.
    pub fn glyph_id(&self, name: &str) -> Option<GlyphId16> {
        let gid = *self.glyph_ids.get(name)?;
        u16::try_from(gid).ok().map(GlyphId16::new)
    }

    /// The name of the glyph mapped to `ch`, if any.
    pub fn glyph_for_char(&self, ch: char) -> Option<&str> {
        self.cmap.get(&(ch as u32)).map(String::as_str)
    }

    pub fn charmap(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.cmap.iter().map(|(cp, name)| (*cp, name.as_str()))
    }

    /// The glyph's outline in font units, or `None` if it has no drawable
    /// outline.
    pub fn outline(&self, name: &str) -> Option<&BezPath> {
        self.outlines.get(name)
    }

    pub fn h_metric(&self, name: &str) -> Option<GlyphMetric> {
        self.h_metrics.get(name).copied()
    }

    pub fn advance_width(&self, name: &str) -> Option<u16> {
        self.h_metric(name).map(|metric| metric.advance)
    }

    pub fn has_vertical_metrics(&self) -> bool {
        self.v_metrics.is_some()
    }

    pub fn v_metric(&self, name: &str) -> Option<GlyphMetric> {
        self.v_metrics.as_ref()?.get(name).copied()
    }

    pub fn vertical_metrics(&self) -> VerticalMetrics {
        self.vertical
    }

    pub fn set_vertical_metrics(&mut self, metrics: VerticalMetrics) {
        self.vertical = metrics;
    }

    /// Store an outline and horizontal metrics under `name`.
    ///
    /// A name that is not yet part of the font is appended to the glyph
    /// order.
    pub fn set_glyph(&mut self, name: &str, outline: BezPath, metric: GlyphMetric) {
        if !self.contains(name) {
            let gid = self.glyph_order.len() as u32;
            self.glyph_ids.insert(name.to_owned(), gid);
            self.glyph_order.push(name.to_owned());
        }
        self.outlines.insert(name.to_owned(), outline);
        self.h_metrics.insert(name.to_owned(), metric);
    }

    /// Set the vertical metrics for a glyph; ignored if the font has no
    /// vertical metrics table.
    pub fn set_v_metric(&mut self, name: &str, metric: GlyphMetric) {
        if let Some(v_metrics) = self.v_metrics.as_mut() {
            v_metrics.insert(name.to_owned(), metric);
        }
    }

    /// Enable vertical metrics for a font that has none.
    #[cfg(test)]
    pub(crate) fn enable_vertical_metrics(&mut self) {
        if self.v_metrics.is_none() {
            self.v_metrics = Some(HashMap::new());
        }
    }

    /// Map `ch` to the glyph `name`.
    pub fn bind_char(&mut self, ch: char, name: &str) {
        let previous = self.cmap.insert(ch as u32, name.to_owned());
        if previous.as_deref() != Some(name) {
            self.cmap_modified = true;
        }
    }

    pub fn gsub(&self) -> Option<&Gsub> {
        self.gsub.as_ref()
    }

    /// Mutable access to the GSUB table, creating an empty one with a single
    /// 'DFLT' script if the font has none.
    pub fn gsub_mut(&mut self) -> &mut Gsub {
        self.gsub_modified = true;
        self.gsub.get_or_insert_with(|| {
            let script = Script::new(Some(LangSys::new(Vec::new())), Vec::new());
            let scripts = ScriptList::new(vec![ScriptRecord::new(Tag::new(b"DFLT"), script)]);
            Gsub::new(scripts, Default::default(), Default::default())
        })
    }

    /// The rewritten `name` table, if any.
    pub fn name_table(&self) -> Option<&Name> {
        self.name.as_ref()
    }

    /// Mutable access to the `name` table, copied from the source font on
    /// first use.
    pub(crate) fn name_table_mut(&mut self) -> Result<&mut Name, WingError> {
        if self.name.is_none() {
            let table = match self.source() {
                Some(font) if font.data_for_tag(NAME).is_some() => {
                    Name::from_table_ref(&font.name()?)
                }
                _ => Name::default(),
            };
            self.name = Some(table);
        }
        Ok(self.name.get_or_insert_with(Name::default))
    }

    pub(crate) fn source(&self) -> Option<FontRef<'_>> {
        if self.source.is_empty() {
            return None;
        }
        FontRef::new(&self.source).ok()
    }

    pub(crate) fn cmap_modified(&self) -> bool {
        self.cmap_modified
    }

    pub(crate) fn gsub_modified(&self) -> bool {
        self.gsub_modified
    }

    pub(crate) fn has_glyph_names(&self) -> bool {
        self.has_glyph_names
    }
}
