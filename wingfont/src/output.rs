//! Compiling a [`WorkingFont`] back into a TrueType binary.

use write_fonts::{
    from_obj::ToOwnedTable,
    read::{FontRef, TableProvider},
    tables::{
        cmap::Cmap,
        glyf::{Bbox, GlyfLocaBuilder, SimpleGlyph},
        head::Head,
        hhea::Hhea,
        hmtx::{Hmtx, LongMetric},
        maxp::Maxp,
        os2::Os2,
        post::Post,
        vhea::Vhea,
        vmtx::Vmtx,
    },
    types::{FWord, GlyphId, Tag, UfWord},
    BuilderError, FontBuilder,
};

use crate::{
    font::{GlyphMetric, WorkingFont},
    WingError,
};

/// Source tables that are not carried over to the output.
///
/// These hold per-glyph data that would be stale once outlines change or
/// glyphs are appended.
const DROPPED_TABLES: [Tag; 6] = [
    Tag::new(b"DSIG"),
    Tag::new(b"hdmx"),
    Tag::new(b"LTSH"),
    Tag::new(b"gvar"),
    Tag::new(b"HVAR"),
    Tag::new(b"VVAR"),
];

const CMAP: Tag = Tag::new(b"cmap");

impl WorkingFont {
    /// Compile the font.
    ///
    /// Outlines, metrics and the glyph order are always rewritten; the
    /// character map, glyph names, `name` and GSUB are rewritten when they
    /// changed.
    /// Every other table of the source font is copied as is.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WingError> {
        let num_glyphs = u16::try_from(self.num_glyphs())
            .map_err(|_| WingError::TooManyGlyphs(self.num_glyphs()))?;
        let source = self.source();
        let mut builder = FontBuilder::new();

        let glyphs = self.compile_glyphs()?;
        let mut glyf_builder = GlyfLocaBuilder::new();
        let mut bbox: Option<Bbox> = None;
        for (name, glyph) in self.glyph_order().iter().zip(&glyphs) {
            glyf_builder
                .add_glyph(glyph)
                .map_err(|e| WingError::Outline {
                    glyph: name.clone(),
                    reason: e.to_string(),
                })?;
            if !glyph.contours.is_empty() {
                bbox = Some(bbox.map_or(glyph.bbox, |bbox| bbox.union(glyph.bbox)));
            }
        }
        let (glyf, loca, loca_format) = glyf_builder.build();
        let bbox = bbox.unwrap_or_default();

        let mut head = match source.as_ref().map(FontRef::head).transpose()? {
            Some(head) => head.to_owned_table(),
            None => Head {
                units_per_em: self.units_per_em(),
                ..Default::default()
            },
        };
        head.index_to_loc_format = loca_format as i16;
        head.x_min = bbox.x_min;
        head.y_min = bbox.y_min;
        head.x_max = bbox.x_max;
        head.y_max = bbox.y_max;

        let mut maxp = match source.as_ref().map(FontRef::maxp).transpose()? {
            Some(maxp) => maxp.to_owned_table(),
            None => Maxp {
                max_zones: Some(1),
                ..Maxp::default()
            },
        };
        update_maxp(&mut maxp, num_glyphs, &glyphs);

        builder
            .add_table(&glyf)
            .and_then(|b| b.add_table(&loca))
            .and_then(|b| b.add_table(&head))
            .and_then(|b| b.add_table(&maxp))
            .map_err(compile_error)?;

        self.add_horizontal_metrics(&mut builder, source.as_ref(), &glyphs)?;
        if self.has_vertical_metrics() {
            self.add_vertical_metrics(&mut builder, source.as_ref())?;
        }
        self.add_os2(&mut builder, source.as_ref())?;

        if self.cmap_modified() || source.is_none() {
            let cmap = self.compile_cmap(source.as_ref())?;
            builder.add_table(&cmap).map_err(compile_error)?;
        }

        if self.has_glyph_names() {
            let mut post = Post::new_v2(self.glyph_order().iter().map(String::as_str));
            if let Some(source) = source.as_ref().and_then(|font| font.post().ok()) {
                let source: Post = source.to_owned_table();
                post.italic_angle = source.italic_angle;
                post.underline_position = source.underline_position;
                post.underline_thickness = source.underline_thickness;
                post.is_fixed_pitch = source.is_fixed_pitch;
                post.min_mem_type42 = source.min_mem_type42;
                post.max_mem_type42 = source.max_mem_type42;
                post.min_mem_type1 = source.min_mem_type1;
                post.max_mem_type1 = source.max_mem_type1;
            }
            builder.add_table(&post).map_err(compile_error)?;
        }

        if let Some(name) = self.name_table() {
            builder.add_table(name).map_err(compile_error)?;
        }

        if let Some(gsub) = self.gsub().filter(|_| self.gsub_modified()) {
            builder.add_table(gsub).map_err(compile_error)?;
        }

        if let Some(source) = source.as_ref() {
            for record in source.table_directory.table_records() {
                let tag = record.tag();
                if builder.contains(tag) {
                    continue;
                }
                if DROPPED_TABLES.contains(&tag) {
                    log::warn!("dropping '{tag}' table");
                    continue;
                }
                match source.data_for_tag(tag) {
                    Some(data) => {
                        builder.add_raw(tag, data.as_bytes());
                    }
                    None => log::warn!("data for '{tag}' is malformed"),
                }
            }
        }
        Ok(builder.build())
    }

    /// Build a cmap from the current character map.
    ///
    /// Subtables of the source font that [`Cmap::from_mappings`] does not
    /// produce, such as variation sequences (format 14) or legacy platform
    /// encodings, are carried over.
    fn compile_cmap(&self, source: Option<&FontRef>) -> Result<Cmap, WingError> {
        let mappings = self.charmap().filter_map(|(codepoint, name)| {
            let ch = char::from_u32(codepoint)?;
            let gid = self.glyph_id(name)?;
            Some((ch, GlyphId::from(gid)))
        });
        let mut cmap = Cmap::from_mappings(mappings).map_err(|e| WingError::Compile {
            table: CMAP,
            reason: e.to_string(),
        })?;
        let Some(source) = source.and_then(|font| font.cmap().ok()) else {
            return Ok(cmap);
        };
        let source: Cmap = source.to_owned_table();
        for record in source.encoding_records {
            let generated = cmap.encoding_records.iter().any(|existing| {
                existing.platform_id == record.platform_id
                    && existing.encoding_id == record.encoding_id
            });
            if !generated {
                log::debug!(
                    "keeping cmap subtable ({:?}, {})",
                    record.platform_id,
                    record.encoding_id
                );
                cmap.encoding_records.push(record);
            }
        }
        cmap.encoding_records
            .sort_by_key(|record| (record.platform_id, record.encoding_id));
        Ok(cmap)
    }

    fn compile_glyphs(&self) -> Result<Vec<SimpleGlyph>, WingError> {
        self.glyph_order()
            .iter()
            .map(|name| match self.outline(name) {
                Some(path) if !path.elements().is_empty() => SimpleGlyph::from_bezpath(path)
                    .map_err(|e| WingError::Outline {
                        glyph: name.clone(),
                        reason: format!("{e:?}"),
                    }),
                _ => Ok(SimpleGlyph::default()),
            })
            .collect()
    }

    fn add_horizontal_metrics(
        &self,
        builder: &mut FontBuilder,
        source: Option<&FontRef>,
        glyphs: &[SimpleGlyph],
    ) -> Result<(), WingError> {
        let metrics: Vec<GlyphMetric> = self
            .glyph_order()
            .iter()
            .map(|name| self.h_metric(name).unwrap_or_default())
            .collect();
        let num_long = num_long_metrics(&metrics);

        let mut hhea = match source.map(FontRef::hhea).transpose()? {
            Some(hhea) => hhea.to_owned_table(),
            None => Hhea::default(),
        };
        let vertical = self.vertical_metrics();
        hhea.ascender = FWord::new(vertical.ascender);
        hhea.descender = FWord::new(vertical.descender);
        hhea.number_of_h_metrics = num_long as u16;
        hhea.advance_width_max = UfWord::new(metrics.iter().map(|m| m.advance).max().unwrap_or(0));

        let mut min_lsb = None::<i16>;
        let mut min_rsb = None::<i16>;
        let mut max_extent = None::<i16>;
        for (metric, glyph) in metrics.iter().zip(glyphs) {
            if glyph.contours.is_empty() {
                continue;
            }
            let width = glyph.bbox.x_max as i32 - glyph.bbox.x_min as i32;
            let lsb = metric.side_bearing as i32;
            let rsb = metric.advance as i32 - lsb - width;
            let extent = lsb + width;
            min_lsb = Some(min_lsb.map_or(metric.side_bearing, |v| v.min(metric.side_bearing)));
            min_rsb = Some(min_rsb.map_or(clamp_i16(rsb), |v| v.min(clamp_i16(rsb))));
            max_extent = Some(max_extent.map_or(clamp_i16(extent), |v| v.max(clamp_i16(extent))));
        }
        hhea.min_left_side_bearing = FWord::new(min_lsb.unwrap_or(0));
        hhea.min_right_side_bearing = FWord::new(min_rsb.unwrap_or(0));
        hhea.x_max_extent = FWord::new(max_extent.unwrap_or(0));

        let (long, short) = metrics.split_at(num_long);
        let hmtx = Hmtx::new(
            long.iter()
                .map(|m| LongMetric::new(m.advance, m.side_bearing))
                .collect(),
            short.iter().map(|m| m.side_bearing).collect(),
        );
        builder
            .add_table(&hhea)
            .and_then(|b| b.add_table(&hmtx))
            .map_err(compile_error)?;
        Ok(())
    }

    fn add_vertical_metrics(
        &self,
        builder: &mut FontBuilder,
        source: Option<&FontRef>,
    ) -> Result<(), WingError> {
        let metrics: Vec<GlyphMetric> = self
            .glyph_order()
            .iter()
            .map(|name| {
                self.v_metric(name)
                    .unwrap_or_else(|| GlyphMetric::new(self.units_per_em(), 0))
            })
            .collect();
        let num_long = num_long_metrics(&metrics);

        let mut vhea = match source.and_then(|font| font.vhea().ok()) {
            Some(vhea) => vhea.to_owned_table(),
            None => Vhea::default(),
        };
        vhea.number_of_long_ver_metrics = num_long as u16;
        vhea.advance_height_max = UfWord::new(metrics.iter().map(|m| m.advance).max().unwrap_or(0));

        let (long, short) = metrics.split_at(num_long);
        let vmtx = Vmtx::new(
            long.iter()
                .map(|m| LongMetric::new(m.advance, m.side_bearing))
                .collect(),
            short.iter().map(|m| m.side_bearing).collect(),
        );
        builder
            .add_table(&vhea)
            .and_then(|b| b.add_table(&vmtx))
            .map_err(compile_error)?;
        Ok(())
    }

    fn add_os2(&self, builder: &mut FontBuilder, source: Option<&FontRef>) -> Result<(), WingError> {
        let mut os2 = match source.and_then(|font| font.os2().ok()) {
            Some(os2) => os2.to_owned_table(),
            None => Os2::default(),
        };
        let vertical = self.vertical_metrics();
        os2.s_typo_ascender = vertical.typo_ascender;
        os2.s_typo_descender = vertical.typo_descender;
        os2.us_win_ascent = vertical.win_ascent;
        os2.us_win_descent = vertical.win_descent;
        builder.add_table(&os2).map_err(compile_error)?;
        Ok(())
    }
}

fn compile_error(error: BuilderError) -> WingError {
    WingError::Compile {
        table: error.tag,
        reason: error.inner.to_string(),
    }
}

/// The number of metrics that need a full record; trailing glyphs that
/// repeat the last advance only store a side bearing.
fn num_long_metrics(metrics: &[GlyphMetric]) -> usize {
    let mut num_long = metrics.len();
    while num_long > 1 && metrics[num_long - 2].advance == metrics[num_long - 1].advance {
        num_long -= 1;
    }
    num_long
}

fn update_maxp(maxp: &mut Maxp, num_glyphs: u16, glyphs: &[SimpleGlyph]) {
    maxp.num_glyphs = num_glyphs;
    let max_points = glyphs
        .iter()
        .map(|glyph| glyph.contours.iter().map(|c| c.len()).sum::<usize>())
        .max()
        .unwrap_or(0);
    let max_contours = glyphs
        .iter()
        .map(|glyph| glyph.contours.len())
        .max()
        .unwrap_or(0);
    let clamp = |v: usize| v.min(u16::MAX as usize) as u16;
    // every outline is rewritten as a simple glyph
    maxp.max_points = Some(clamp(max_points));
    maxp.max_contours = Some(clamp(max_contours));
    maxp.max_composite_points = Some(0);
    maxp.max_composite_contours = Some(0);
    maxp.max_component_elements = Some(0);
    maxp.max_component_depth = Some(0);
    maxp.max_zones = maxp.max_zones.or(Some(1));
    maxp.max_twilight_points = maxp.max_twilight_points.or(Some(0));
    maxp.max_storage = maxp.max_storage.or(Some(0));
    maxp.max_function_defs = maxp.max_function_defs.or(Some(0));
    maxp.max_instruction_defs = maxp.max_instruction_defs.or(Some(0));
    maxp.max_stack_elements = maxp.max_stack_elements.or(Some(0));
    maxp.max_size_of_instructions = maxp.max_size_of_instructions.or(Some(0));
}

fn clamp_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
