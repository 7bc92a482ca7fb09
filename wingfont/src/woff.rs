//! Packing a compiled font as WOFF 1.0.

use std::io::Write;

use flate2::{write::ZlibEncoder, Compression};
use write_fonts::read::{FontRef, TableProvider};

use crate::WingError;

/// 'wOFF'
const SIGNATURE: u32 = 0x774F_4646;
const HEADER_LEN: usize = 44;
const DIRECTORY_ENTRY_LEN: usize = 20;
const SFNT_HEADER_LEN: usize = 12;
const SFNT_RECORD_LEN: usize = 16;

struct Entry<'a> {
    tag: [u8; 4],
    checksum: u32,
    orig_length: usize,
    /// Compressed data, or `None` if compressing didn't make it smaller.
    compressed: Option<Vec<u8>>,
    data: &'a [u8],
}

impl Entry<'_> {
    fn stored(&self) -> &[u8] {
        self.compressed.as_deref().unwrap_or(self.data)
    }
}

fn padded(len: usize) -> usize {
    (len + 3) & !3
}

fn to_u32(value: usize) -> Result<u32, WingError> {
    u32::try_from(value).map_err(|_| WingError::Woff(format!("{value} bytes do not fit in WOFF")))
}

fn compress(data: &[u8]) -> Result<Vec<u8>, WingError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(data)
        .map_err(|e| WingError::Woff(e.to_string()))?;
    encoder.finish().map_err(|e| WingError::Woff(e.to_string()))
}

/// Wrap the TrueType binary `sfnt` in a WOFF container.
///
/// Each table is zlib compressed, unless that doesn't make it smaller, in
/// which case it is stored as is. No metadata or private data is written.
pub fn to_woff(sfnt: &[u8]) -> Result<Vec<u8>, WingError> {
    let font = FontRef::new(sfnt)?;
    let records = font.table_directory.table_records();

    let mut entries = Vec::with_capacity(records.len());
    let mut total_sfnt_size = SFNT_HEADER_LEN + SFNT_RECORD_LEN * records.len();
    for record in records {
        let tag = record.tag();
        let data = font
            .data_for_tag(tag)
            .ok_or_else(|| WingError::Woff(format!("table '{tag}' is out of bounds")))?
            .as_bytes();
        let compressed = compress(data)?;
        total_sfnt_size += padded(data.len());
        entries.push(Entry {
            tag: tag.to_be_bytes(),
            checksum: record.checksum(),
            orig_length: data.len(),
            compressed: (compressed.len() < data.len()).then_some(compressed),
            data,
        });
    }

    let mut offset = HEADER_LEN + DIRECTORY_ENTRY_LEN * entries.len();
    let length = entries
        .iter()
        .fold(offset, |len, entry| padded(len) + entry.stored().len());

    let mut out = Vec::with_capacity(padded(length));
    out.extend_from_slice(&SIGNATURE.to_be_bytes());
    out.extend_from_slice(&font.table_directory.sfnt_version().to_be_bytes());
    out.extend_from_slice(&to_u32(length)?.to_be_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    // reserved
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&to_u32(total_sfnt_size)?.to_be_bytes());
    // font version 1.0
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    // metadata offset, length and original length; private offset and length
    out.extend_from_slice(&[0u8; 20]);

    for entry in &entries {
        offset = padded(offset);
        out.extend_from_slice(&entry.tag);
        out.extend_from_slice(&to_u32(offset)?.to_be_bytes());
        out.extend_from_slice(&to_u32(entry.stored().len())?.to_be_bytes());
        out.extend_from_slice(&to_u32(entry.orig_length)?.to_be_bytes());
        out.extend_from_slice(&entry.checksum.to_be_bytes());
        offset += entry.stored().len();
    }

    for entry in &entries {
        out.resize(padded(out.len()), 0);
        out.extend_from_slice(entry.stored());
    }
    let compressed = entries.iter().filter(|e| e.compressed.is_some()).count();
    log::debug!(
        "WOFF: {} of {} tables compressed, {} -> {} bytes",
        compressed,
        entries.len(),
        sfnt.len(),
        out.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::ZlibDecoder;
    use kurbo::BezPath;
    use pretty_assertions::assert_eq;
    use write_fonts::types::Tag;

    use super::*;
    use crate::font::{GlyphMetric, WorkingFont};

    fn u32_at(data: &[u8], pos: usize) -> u32 {
        u32::from_be_bytes(data[pos..pos + 4].try_into().unwrap())
    }

    fn u16_at(data: &[u8], pos: usize) -> u16 {
        u16::from_be_bytes(data[pos..pos + 2].try_into().unwrap())
    }

    fn sfnt() -> Vec<u8> {
        let mut font = WorkingFont::new(1000);
        font.set_glyph(".notdef", BezPath::new(), GlyphMetric::new(500, 0));
        for (i, ch) in ('a'..='z').enumerate() {
            let mut path = BezPath::new();
            path.move_to((0.0, 0.0));
            path.line_to((10.0 * i as f64, 700.0));
            path.line_to((500.0, 0.0));
            path.close_path();
            font.set_glyph(&ch.to_string(), path, GlyphMetric::new(500, 0));
            font.bind_char(ch, &ch.to_string());
        }
        font.to_bytes().unwrap()
    }

    #[test]
    fn tables_decode_to_the_original() {
        let sfnt = sfnt();
        let woff = to_woff(&sfnt).unwrap();
        let font = FontRef::new(&sfnt).unwrap();
        let records = font.table_directory.table_records();

        assert_eq!(u32_at(&woff, 0), SIGNATURE);
        assert_eq!(u32_at(&woff, 4), 0x0001_0000);
        assert_eq!(u32_at(&woff, 8) as usize, woff.len());
        assert_eq!(u16_at(&woff, 12) as usize, records.len());
        assert_eq!(u16_at(&woff, 14), 0);
        let expected_size: usize = 12
            + 16 * records.len()
            + records
                .iter()
                .map(|r| padded(r.length() as usize))
                .sum::<usize>();
        assert_eq!(u32_at(&woff, 16) as usize, expected_size);

        for (i, record) in records.iter().enumerate() {
            let entry = HEADER_LEN + DIRECTORY_ENTRY_LEN * i;
            let tag_bytes: [u8; 4] = woff[entry..entry + 4].try_into().unwrap();
            let tag = Tag::new(&tag_bytes);
            assert_eq!(tag, record.tag());
            let offset = u32_at(&woff, entry + 4) as usize;
            let comp_length = u32_at(&woff, entry + 8) as usize;
            let orig_length = u32_at(&woff, entry + 12) as usize;
            assert_eq!(offset % 4, 0, "{tag}");
            assert_eq!(u32_at(&woff, entry + 16), record.checksum());

            let stored = &woff[offset..offset + comp_length];
            let original = font.data_for_tag(tag).unwrap().as_bytes();
            assert_eq!(orig_length, original.len());
            if comp_length < orig_length {
                let mut decoded = Vec::new();
                ZlibDecoder::new(stored).read_to_end(&mut decoded).unwrap();
                assert_eq!(decoded, original, "{tag}");
            } else {
                assert_eq!(stored, original, "{tag}");
            }
        }
    }

    #[test]
    fn glyf_is_compressed() {
        let sfnt = sfnt();
        let woff = to_woff(&sfnt).unwrap();
        assert!(woff.len() < sfnt.len());
        let font = FontRef::new(&sfnt).unwrap();
        let glyf = font
            .table_directory
            .table_records()
            .iter()
            .position(|r| r.tag() == Tag::new(b"glyf"))
            .unwrap();
        let entry = HEADER_LEN + DIRECTORY_ENTRY_LEN * glyf;
        assert!(u32_at(&woff, entry + 8) < u32_at(&woff, entry + 12));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(to_woff(b"not a font"), Err(WingError::Read(_))));
    }
}
