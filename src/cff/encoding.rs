use std::collections::BTreeMap;

use crate::{
    error::{CffError, CffResult},
    parse_binary::BinaryParser,
};

use super::{
    charset::Charset,
    strings::{CffStrings, Sid},
};

/// Set on the format byte when supplemental code mappings follow the table
const SUPPLEMENT_FLAG: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredefinedEncoding {
    Standard = 0,
    Expert = 1,
}

impl PredefinedEncoding {
    pub fn from_offset(offset: usize) -> Option<Self> {
        match offset {
            0 => Some(Self::Standard),
            1 => Some(Self::Expert),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

/// An extra code for a glyph that already has one in the base table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Supplement {
    pub code: u8,
    pub sid: Sid,
}

/// Maps character codes to glyph indices in name-keyed fonts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoding {
    Predefined(PredefinedEncoding),
    Custom(CustomEncoding),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomEncoding {
    format: u8,
    /// `codes[i]` is the code of GID `i + 1`
    codes: Vec<u8>,
    supplements: Vec<Supplement>,
    map: BTreeMap<u8, u16>,
}

impl CustomEncoding {
    /// Build an encoding from the codes of GIDs `1..=codes.len()`
    pub fn new(codes: Vec<u8>, supplements: Vec<Supplement>, charset: &Charset, strings: &CffStrings) -> Self {
        let mut map: BTreeMap<u8, u16> = codes
            .iter()
            .enumerate()
            .map(|(idx, &code)| (code, idx as u16 + 1))
            .collect();

        for supplement in &supplements {
            let name = strings.resolve(supplement.sid);

            match charset.gid_for_name(name) {
                Some(gid) => {
                    map.insert(supplement.code, gid);
                }
                None => log::warn!(
                    "encoding supplement for code {} names {:?}, which is not in the charset",
                    supplement.code,
                    name
                ),
            }
        }

        Self {
            format: 0,
            codes,
            supplements,
            map,
        }
    }

    /// The base table format the encoding was read from
    pub fn format(&self) -> u8 {
        self.format
    }

    pub fn codes(&self) -> &[u8] {
        &self.codes
    }

    pub fn supplements(&self) -> &[Supplement] {
        &self.supplements
    }

    pub fn map(&self) -> &BTreeMap<u8, u16> {
        &self.map
    }
}

impl Encoding {
    /// Read an encoding located at the parser's cursor; cursor positions 0
    /// and 1 select a predefined encoding instead
    pub fn parse<'a>(
        parser: &mut impl BinaryParser<'a>,
        strings: &CffStrings,
        charset: &Charset,
    ) -> CffResult<Self> {
        if let Some(predefined) = PredefinedEncoding::from_offset(parser.cursor()) {
            return Ok(Self::Predefined(predefined));
        }

        let format_byte = parser.next()?;
        let format = format_byte & !SUPPLEMENT_FLAG;

        let codes = match format {
            0 => {
                let count = parser.next()?;
                parser.slice(count as usize)?.to_vec()
            }
            1 => {
                let n_ranges = parser.next()?;
                let mut codes = Vec::new();

                for _ in 0..n_ranges {
                    let first = parser.next()?;
                    let n_left = parser.next()?;

                    codes.extend((0..=n_left).map_while(|i| first.checked_add(i)));
                }

                codes
            }
            _ => {
                return Err(CffError::UnsupportedFormat {
                    table: "Encoding",
                    format,
                })
            }
        };

        let mut supplements = Vec::new();

        if format_byte & SUPPLEMENT_FLAG != 0 {
            let count = parser.next()?;

            for _ in 0..count {
                let code = parser.next()?;
                let sid = parser.parse_u16()?;

                supplements.push(Supplement { code, sid });
            }
        }

        let mut encoding = CustomEncoding::new(codes, supplements, charset, strings);
        encoding.format = format;

        Ok(Self::Custom(encoding))
    }

    pub fn predefined(&self) -> Option<PredefinedEncoding> {
        match self {
            Self::Predefined(predefined) => Some(*predefined),
            Self::Custom(..) => None,
        }
    }

    /// The GID for a character code, if the encoding is a custom one that
    /// maps it
    pub fn lookup(&self, code: u8) -> Option<u16> {
        match self {
            Self::Predefined(..) => None,
            Self::Custom(encoding) => encoding.map.get(&code).copied(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{cff::charset::CharsetEntry, parse_binary::ByteCursor};

    fn parse(bytes: &[u8], charset: &Charset) -> CffResult<Encoding> {
        let mut cursor = ByteCursor::at(bytes, 2).unwrap();
        Encoding::parse(&mut cursor, &CffStrings::new(), charset)
    }

    fn empty_charset() -> Charset {
        Charset::Custom {
            format: 0,
            glyphs: Vec::new(),
        }
    }

    #[test]
    fn format_0() {
        let encoding = parse(&[0x00, 0x00, 0x00, 0x01, 0x08], &empty_charset()).unwrap();

        let Encoding::Custom(custom) = &encoding else {
            panic!("expected a custom encoding");
        };

        assert_eq!(custom.map(), &BTreeMap::from([(8, 1)]));
        assert_eq!(custom.format(), 0);
        assert_eq!(encoding.lookup(8), Some(1));
        assert_eq!(encoding.lookup(9), None);
    }

    #[test]
    fn format_1() {
        let encoding = parse(&[0x00, 0x00, 0x01, 0x01, 0x07, 0x01], &empty_charset()).unwrap();

        let Encoding::Custom(custom) = &encoding else {
            panic!("expected a custom encoding");
        };

        assert_eq!(custom.map(), &BTreeMap::from([(7, 1), (8, 2)]));
        assert_eq!(custom.codes(), &[7, 8]);
        assert_eq!(custom.format(), 1);
    }

    #[test]
    fn supplements_map_through_the_charset() {
        let charset = Charset::Custom {
            format: 0,
            glyphs: vec![
                CharsetEntry::Name(".notdef".to_owned()),
                CharsetEntry::Name("space".to_owned()),
                CharsetEntry::Name("A".to_owned()),
            ],
        };

        // format 0 with supplements; "A" is SID 34
        let bytes = [0x00, 0x00, 0x80, 0x02, 0x20, 0x41, 0x01, 0xa0, 0x00, 0x22];

        let encoding = parse(&bytes, &charset).unwrap();

        assert_eq!(encoding.lookup(0x20), Some(1));
        assert_eq!(encoding.lookup(0x41), Some(2));
        assert_eq!(encoding.lookup(0xa0), Some(2));

        let Encoding::Custom(custom) = &encoding else {
            panic!("expected a custom encoding");
        };
        assert_eq!(
            custom.supplements(),
            &[Supplement {
                code: 0xa0,
                sid: 34
            }]
        );
    }

    #[test]
    fn predefined_offsets() {
        let mut cursor = ByteCursor::at(&[0x00, 0x00], 1).unwrap();

        assert_eq!(
            Encoding::parse(&mut cursor, &CffStrings::new(), &empty_charset()).unwrap(),
            Encoding::Predefined(PredefinedEncoding::Expert)
        );
    }

    #[test]
    fn unknown_format() {
        assert!(matches!(
            parse(&[0x00, 0x00, 0x02], &empty_charset()),
            Err(CffError::UnsupportedFormat {
                table: "Encoding",
                format: 2
            })
        ));
    }
}
