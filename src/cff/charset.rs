use crate::{
    error::{CffError, CffResult},
    parse_binary::BinaryParser,
};

use super::strings::{CffStrings, Sid};

/// Charsets built into the format, selected by a Top DICT `charset` offset of
/// 0, 1 or 2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredefinedCharset {
    IsoAdobe = 0,
    Expert = 1,
    ExpertSubset = 2,
}

impl PredefinedCharset {
    pub fn from_offset(offset: usize) -> Option<Self> {
        Some(match offset {
            0 => Self::IsoAdobe,
            1 => Self::Expert,
            2 => Self::ExpertSubset,
            _ => return None,
        })
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharsetEntry {
    /// Glyph name of a name-keyed font
    Name(String),
    /// CID of a CID-keyed font
    Cid(u16),
}

impl CharsetEntry {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Cid(..) => None,
        }
    }

    pub fn cid(&self) -> Option<u16> {
        match self {
            Self::Name(..) => None,
            Self::Cid(cid) => Some(*cid),
        }
    }
}

/// Maps glyph indices to glyph names or CIDs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Charset {
    Predefined(PredefinedCharset),
    /// Glyph identities indexed by GID, starting with `.notdef` (or CID 0)
    Custom {
        format: u8,
        glyphs: Vec<CharsetEntry>,
    },
}

impl Charset {
    /// Read a charset located at the parser's cursor; cursor positions 0, 1
    /// and 2 select a predefined charset instead
    pub fn parse<'a>(
        parser: &mut impl BinaryParser<'a>,
        n_glyphs: usize,
        strings: &CffStrings,
        is_cid: bool,
    ) -> CffResult<Self> {
        if let Some(predefined) = PredefinedCharset::from_offset(parser.cursor()) {
            return Ok(Self::Predefined(predefined));
        }

        let format = parser.next()?;

        let entry = |id: u16| {
            if is_cid {
                CharsetEntry::Cid(id)
            } else {
                CharsetEntry::Name(strings.resolve(id).to_owned())
            }
        };

        let mut glyphs = vec![if is_cid {
            CharsetEntry::Cid(0)
        } else {
            CharsetEntry::Name(".notdef".to_owned())
        }];

        match format {
            0 => {
                for _ in 1..n_glyphs {
                    let id: Sid = parser.parse_u16()?;
                    glyphs.push(entry(id));
                }
            }
            // ranges are expanded in full, even past the glyph count
            1 | 2 => {
                while glyphs.len() < n_glyphs {
                    let first = parser.parse_u16()?;
                    let n_left = if format == 1 {
                        parser.next()? as u16
                    } else {
                        parser.parse_u16()?
                    };

                    for id in first..=first.saturating_add(n_left) {
                        glyphs.push(entry(id));
                    }
                }
            }
            format => {
                return Err(CffError::UnsupportedFormat {
                    table: "charset",
                    format,
                })
            }
        }

        Ok(Self::Custom { format, glyphs })
    }

    pub fn predefined(&self) -> Option<PredefinedCharset> {
        match self {
            Self::Predefined(predefined) => Some(*predefined),
            Self::Custom { .. } => None,
        }
    }

    /// Glyphs described by a custom charset; empty for predefined ones
    pub fn glyphs(&self) -> &[CharsetEntry] {
        match self {
            Self::Predefined(..) => &[],
            Self::Custom { glyphs, .. } => glyphs,
        }
    }

    pub fn glyph(&self, gid: u16) -> Option<&CharsetEntry> {
        self.glyphs().get(gid as usize)
    }

    pub fn gid_for_name(&self, name: &str) -> Option<u16> {
        self.glyphs()
            .iter()
            .position(|entry| entry.name() == Some(name))
            .map(|gid| gid as u16)
    }

    pub fn gid_for_cid(&self, cid: u16) -> Option<u16> {
        self.glyphs()
            .iter()
            .position(|entry| entry.cid() == Some(cid))
            .map(|gid| gid as u16)
    }
}
