//! Renaming the font family in the `name` table.

use write_fonts::{
    read::tables::name::MacRomanMapping,
    tables::name::{Name, NameRecord},
    types::NameId,
};

use crate::{font::WorkingFont, WingError};

/// Family, full name, PostScript name and typographic family.
pub const FAMILY_NAME_IDS: [NameId; 4] = [
    NameId::FAMILY_NAME,
    NameId::FULL_NAME,
    NameId::POSTSCRIPT_NAME,
    NameId::TYPOGRAPHIC_FAMILY_NAME,
];

/// A (platform, encoding, language) triple identifying a set of names.
type NameKey = (u16, u16, u16);

const WINDOWS_ENGLISH: NameKey = (3, 1, 0x0409);
const MAC_ROMAN: NameKey = (1, 0, 0);
const WINDOWS_SIMPLIFIED_CHINESE: NameKey = (3, 1, 0x0804);
const WINDOWS_TAIWAN: NameKey = (3, 1, 0x0404);
const WINDOWS_HONG_KONG: NameKey = (3, 1, 0x0C04);

const MACINTOSH: u16 = 1;

/// Replacement family names. Languages left as `None` keep their names.
///
/// The English name is written for both Windows (US English) and Macintosh
/// (Roman); the Chinese names only for Windows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FamilyNames {
    pub english: Option<String>,
    /// Simplified Chinese (PRC).
    pub simplified_chinese: Option<String>,
    /// Traditional Chinese (Taiwan).
    pub taiwan: Option<String>,
    /// Traditional Chinese (Hong Kong).
    pub hong_kong: Option<String>,
}

impl FamilyNames {
    pub fn is_empty(&self) -> bool {
        self.targets().next().is_none()
    }

    fn targets(&self) -> impl Iterator<Item = (NameKey, &str)> + '_ {
        [
            (WINDOWS_ENGLISH, &self.english),
            (MAC_ROMAN, &self.english),
            (WINDOWS_SIMPLIFIED_CHINESE, &self.simplified_chinese),
            (WINDOWS_TAIWAN, &self.taiwan),
            (WINDOWS_HONG_KONG, &self.hong_kong),
        ]
        .into_iter()
        .filter_map(|(key, name)| Some((key, name.as_deref()?)))
    }

    /// Write the names into `table`, returning the number of records set.
    ///
    /// Existing records are replaced and missing ones added. A Macintosh
    /// name that can't be encoded as Mac Roman is skipped.
    pub fn apply(&self, table: &mut Name) -> usize {
        let mut written = 0;
        for (key, family) in self.targets() {
            let (platform_id, encoding_id, language_id) = key;
            if platform_id == MACINTOSH && family.chars().any(|c| MacRomanMapping.encode(c).is_none()) {
                log::warn!("'{family}' has no Mac Roman encoding, Macintosh names are unchanged");
                continue;
            }
            for name_id in FAMILY_NAME_IDS {
                let existing = table.name_record.iter_mut().find(|record| {
                    (record.platform_id, record.encoding_id, record.language_id) == key
                        && record.name_id == name_id
                });
                match existing {
                    Some(record) => {
                        log::info!(
                            "[{platform_id}/{encoding_id}/{language_id:#06x}] name {name_id}: '{}' -> '{family}'",
                            record.string.as_str()
                        );
                        record.string = family.to_owned().into();
                    }
                    None => {
                        log::info!(
                            "[{platform_id}/{encoding_id}/{language_id:#06x}] name {name_id}: set to '{family}'"
                        );
                        table.name_record.push(NameRecord::new(
                            platform_id,
                            encoding_id,
                            language_id,
                            name_id,
                            family.to_owned().into(),
                        ));
                    }
                }
                written += 1;
            }
        }
        table.name_record.sort();
        written
    }
}

impl WorkingFont {
    /// Replace the family names of this font.
    ///
    /// Returns the number of name records written.
    pub fn rename_family(&mut self, names: &FamilyNames) -> Result<usize, WingError> {
        if names.is_empty() {
            return Ok(0);
        }
        Ok(names.apply(self.name_table_mut()?))
    }
}
