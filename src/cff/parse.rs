use std::collections::BTreeMap;

use crate::{
    error::{CffError, CffResult},
    parse_binary::{BinaryParser, ByteCursor},
};

use super::{
    charset::Charset,
    charstring::CharstringDecoder,
    dict::{CffDictInterpreter, Dict, DictValue, PRIVATE_DICT_SCHEMA, TOP_DICT_SCHEMA},
    encoding::Encoding,
    fd_select::FdSelect,
    index::{parse_index, CffIndex},
    sanitize_name,
    strings::CffStrings,
    CffFont, CffHeader, PrivateDict, TopDict,
};

/// Program that replaces glyphs which can't be decoded or that are composed
/// through seac
const LONE_ENDCHAR: &[u8] = &[14];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Recognize four-operand `endchar` as an accented character
    pub seac_analysis: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            seac_analysis: true,
        }
    }
}

pub struct CffParser<'a> {
    buffer: &'a [u8],
    cursor: usize,
    options: ParseOptions,
}

impl<'a> CffParser<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self::with_options(buffer, ParseOptions::default())
    }

    pub fn with_options(buffer: &'a [u8], options: ParseOptions) -> Self {
        Self {
            buffer,
            cursor: 0,
            options,
        }
    }

    pub fn parse(&mut self) -> CffResult<CffFont<'a>> {
        let header = self.parse_header()?;

        // the first four structures follow each other; everything else is
        // found through Top DICT offsets
        self.seek(header.header_size as usize)?;
        let name_index = parse_index(self)?;
        let top_dict_index = parse_index(self)?;
        let string_index = parse_index(self)?;
        let global_subrs = parse_index(self)?;

        let names = Self::parse_name_index(&name_index);
        let strings = Self::parse_string_index(&string_index);

        if top_dict_index.count() > 1 {
            log::info!(
                "CFF FontSet holds {} fonts, only the first is used",
                top_dict_index.count()
            );
        }

        let top_dict_data = top_dict_index
            .get(0)
            .ok_or(CffError::MalformedFont("empty Top DICT INDEX".into()))?;
        let top_dict = self.parse_font_dict(top_dict_data)?;

        let char_strings_offset = top_dict
            .dict
            .offset("CharStrings")
            .ok_or(CffError::MalformedFont("Top DICT has no CharStrings".into()))?;
        self.seek(char_strings_offset)?;
        let char_strings = parse_index(self)?;
        let n_glyphs = char_strings.count();

        let is_cid = top_dict.is_cid();

        let charset_offset = top_dict.dict.offset("charset").unwrap_or(0);
        self.seek(charset_offset)?;
        let charset = Charset::parse(self, n_glyphs, &strings, is_cid)?;

        let (encoding, fd_select, fd_array) = if is_cid {
            let fd_array = self.parse_fd_array(&top_dict.dict)?;
            let fd_select = self.parse_fd_select(&top_dict.dict, n_glyphs)?;

            (None, Some(fd_select), fd_array)
        } else {
            let encoding_offset = top_dict.dict.offset("Encoding").unwrap_or(0);
            self.seek(encoding_offset)?;
            let encoding = Encoding::parse(self, &strings, &charset)?;

            (Some(encoding), None, Vec::new())
        };

        let mut font = CffFont {
            header,
            names,
            strings,
            top_dict,
            global_subrs,
            char_strings,
            charset,
            encoding,
            fd_select,
            fd_array,
            seacs: BTreeMap::new(),
            widths: Vec::new(),
        };

        self.parse_char_strings(&mut font)?;

        Ok(font)
    }

    /// The header is expected at the start of the buffer, but some producers
    /// prepend garbage; everything before the first major version byte is
    /// skipped
    fn parse_header(&mut self) -> CffResult<CffHeader> {
        let start = self
            .buffer
            .iter()
            .position(|&b| b == 1)
            .ok_or(CffError::MalformedFont("no CFF header".into()))?;

        if start != 0 {
            log::info!("CFF data is shifted by {} bytes", start);
            self.buffer = &self.buffer[start..];
        }

        self.cursor = 0;

        let major = self.next()?;
        let minor = self.next()?;
        let header_size = self.next()?;
        let off_size = self.next()?;

        Ok(CffHeader {
            major,
            minor,
            header_size,
            off_size,
        })
    }

    pub fn parse_name_index(index: &CffIndex) -> Vec<String> {
        index.iter().map(sanitize_name).collect()
    }

    pub fn parse_string_index(index: &CffIndex) -> CffStrings {
        CffStrings::from_custom(
            index
                .iter()
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect(),
        )
    }

    /// Parse a Top DICT or Font DICT along with its Private DICT
    fn parse_font_dict(&self, data: &[u8]) -> CffResult<TopDict<'a>> {
        let mut dict = CffDictInterpreter::parse(data, &TOP_DICT_SCHEMA)?;
        let private = self.parse_private_dict(&mut dict)?;

        Ok(TopDict { dict, private })
    }

    /// Replace a missing or unusable Private DICT with an empty one located
    /// at `[0, 0]`
    fn empty_private_dict(&self, parent: &mut Dict) -> CffResult<PrivateDict<'a>> {
        parent.set("Private", DictValue::SizeOffset { size: 0, offset: 0 })?;

        Ok(PrivateDict::empty())
    }

    fn parse_private_dict(&self, parent: &mut Dict) -> CffResult<PrivateDict<'a>> {
        let (size, offset) = match parent.get("Private") {
            Some(&DictValue::SizeOffset { size, offset }) => (size, offset),
            _ => return self.empty_private_dict(parent),
        };

        if size == 0 || offset >= self.buffer.len() {
            log::debug!("ignoring Private DICT of {} bytes at {}", size, offset);
            return self.empty_private_dict(parent);
        }

        let end = offset.saturating_add(size).min(self.buffer.len());
        let dict = CffDictInterpreter::parse(&self.buffer[offset..end], &PRIVATE_DICT_SCHEMA)?;

        let subrs_offset = match dict.offset("Subrs") {
            Some(subrs_offset) => subrs_offset,
            None => return Ok(PrivateDict::new(dict)),
        };

        // Subrs is relative to the start of the Private DICT
        let subrs_start = offset.saturating_add(subrs_offset);

        if subrs_offset == 0 || subrs_start >= self.buffer.len() {
            log::warn!("Private DICT has an invalid Subrs offset: {}", subrs_offset);
            return self.empty_private_dict(parent);
        }

        let mut cursor = ByteCursor::at(self.buffer, subrs_start)?;
        let subrs = parse_index(&mut cursor)?;

        Ok(PrivateDict {
            dict,
            subrs: Some(subrs),
        })
    }

    fn parse_fd_array(&mut self, top_dict: &Dict) -> CffResult<Vec<TopDict<'a>>> {
        let offset = top_dict
            .offset("FDArray")
            .ok_or(CffError::MalformedFont("CID-keyed font has no FDArray".into()))?;

        self.seek(offset)?;
        let index = parse_index(self)?;

        index
            .iter()
            .map(|data| self.parse_font_dict(data))
            .collect()
    }

    fn parse_fd_select(&mut self, top_dict: &Dict, n_glyphs: usize) -> CffResult<FdSelect> {
        let offset = top_dict
            .offset("FDSelect")
            .ok_or(CffError::MalformedFont("CID-keyed font has no FDSelect".into()))?;

        self.seek(offset)?;

        FdSelect::parse(self, n_glyphs)
    }

    /// Decode every glyph to find widths and seac compositions
    ///
    /// Glyphs that fail to decode don't fail the font; their programs are
    /// replaced by a lone `endchar`.
    fn parse_char_strings(&self, font: &mut CffFont<'a>) -> CffResult<()> {
        let mut seacs = BTreeMap::new();
        let mut widths = Vec::with_capacity(font.num_glyphs());
        let mut replaced = Vec::new();

        for gid in 0..font.num_glyphs() {
            let gid = u16::try_from(gid)
                .map_err(|_| CffError::MalformedFont("too many glyphs".into()))?;

            let private = match font.private_dict_for(gid) {
                Ok(private) => private,
                Err(e) => {
                    log::warn!("{}", e);
                    widths.push(font.top_dict.private.default_width_x() as f32);
                    replaced.push(gid);
                    continue;
                }
            };

            let charstring = font.char_strings.get(gid as usize).unwrap_or_default();

            let program = CharstringDecoder::new(self.options.seac_analysis)
                .with_subrs(Some(&font.global_subrs), private.subrs.as_ref())
                .decode(charstring);

            let program = match program {
                Ok(program) => program,
                Err(e) => {
                    log::warn!("invalid charstring for glyph {}: {}", gid, e);
                    widths.push(private.default_width_x() as f32);
                    replaced.push(gid);
                    continue;
                }
            };

            let width = match program.width {
                Some(width) => private.nominal_width_x() + width as f64,
                None => private.default_width_x(),
            };
            widths.push(width as f32);

            if let Some(seac) = program.seac {
                seacs.insert(gid, seac);
                replaced.push(gid);
            }
        }

        for gid in replaced {
            font.char_strings.set(gid as usize, LONE_ENDCHAR)?;
        }

        font.seacs = seacs;
        font.widths = widths;

        Ok(())
    }
}

impl<'a> BinaryParser<'a> for CffParser<'a> {
    fn buffer(&self) -> &'a [u8] {
        self.buffer
    }
    fn cursor(&self) -> usize {
        self.cursor
    }
    fn cursor_mut(&mut self) -> &mut usize {
        &mut self.cursor
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cff::{compile::CffCompiler, Token};

    fn index(objects: &[&[u8]]) -> CffIndex<'static> {
        CffIndex::from_objects(objects.iter().map(|obj| obj.to_vec()))
    }

    #[test]
    fn name_index_is_sanitized() {
        let names = CffParser::parse_name_index(&index(&[b"[a", &[0; 129]]));

        assert_eq!(names[0], "_a");
        assert_eq!(names[1].len(), 127);
    }

    #[test]
    fn string_index_follows_standard_strings() {
        let strings = CffParser::parse_string_index(&index(&[b"001.007", b"Times"]));

        assert_eq!(strings.get(0), Some(".notdef"));
        assert_eq!(strings.get(391), Some("001.007"));
        assert_eq!(strings.get(392), Some("Times"));
    }

    #[test]
    fn shifted_header() {
        let mut parser = CffParser::new(&[0xff, 0x00, 0x01, 0x00, 0x04, 0x01]);

        let header = parser.parse_header().unwrap();

        assert_eq!(
            header,
            CffHeader {
                major: 1,
                minor: 0,
                header_size: 4,
                off_size: 1
            }
        );
        assert_eq!(parser.buffer().len(), 4);
    }

    #[test]
    fn missing_header() {
        assert!(matches!(
            CffParser::new(&[0x00, 0x02]).parse(),
            Err(CffError::MalformedFont(..))
        ));
    }

    #[test]
    fn private_dict_pointing_past_the_end_is_emptied() {
        let parser = CffParser::new(&[0x01, 0x00, 0x04, 0x01]);
        let mut dict = Dict::new(&TOP_DICT_SCHEMA);
        dict.set("Private", DictValue::SizeOffset { size: 10, offset: 100 })
            .unwrap();

        let private = parser.parse_private_dict(&mut dict).unwrap();

        assert!(private.dict.is_empty());
        assert_eq!(
            dict.get("Private"),
            Some(&DictValue::SizeOffset { size: 0, offset: 0 })
        );
    }

    #[test]
    fn private_dict_with_local_subrs() {
        let buffer = [
            0x01, 0x00, 0x04, 0x01, // header
            0xf8, 0x1b, 0x14, // defaultWidthX 391
            0x90, 0x13, // Subrs at +5
            0x00, 0x01, 0x01, 0x01, 0x02, 0x0b, // one subroutine: return
        ];

        let parser = CffParser::new(&buffer);
        let mut dict = Dict::new(&TOP_DICT_SCHEMA);
        dict.set("Private", DictValue::SizeOffset { size: 5, offset: 4 })
            .unwrap();

        let private = parser.parse_private_dict(&mut dict).unwrap();

        assert_eq!(private.default_width_x(), 391.0);
        assert_eq!(private.subrs.unwrap().get(0), Some(&[0x0b][..]));
    }

    /// 130 180 65 194 endchar after a width of 98: an accented `A`
    const SEAC_GLYPH: &[u8] = &[237, 247, 22, 247, 72, 204, 247, 86, 14];

    /// A name-keyed font with `.notdef` and one other glyph
    fn name_keyed_font(glyph: &[u8]) -> Vec<u8> {
        let font = CffFont {
            header: CffHeader {
                major: 1,
                minor: 0,
                header_size: 4,
                off_size: 1,
            },
            names: vec!["SeacTest".to_owned()],
            strings: CffStrings::new(),
            top_dict: TopDict::new(Dict::new(&TOP_DICT_SCHEMA)),
            global_subrs: CffIndex::new(),
            char_strings: index(&[&[0x0e], glyph]),
            charset: Charset::Predefined(crate::cff::PredefinedCharset::IsoAdobe),
            encoding: Some(Encoding::Predefined(crate::cff::PredefinedEncoding::Standard)),
            fd_select: None,
            fd_array: Vec::new(),
            seacs: BTreeMap::new(),
            widths: Vec::new(),
        };

        CffCompiler::new(&font).compile().unwrap()
    }

    #[test]
    fn seac_glyphs_are_recorded_and_replaced() {
        let data = name_keyed_font(SEAC_GLYPH);

        let font = CffParser::new(&data).parse().unwrap();

        assert_eq!(
            font.seacs,
            BTreeMap::from([(
                1,
                crate::cff::Seac {
                    adx: 130.0,
                    ady: 180.0,
                    bchar: 65.0,
                    achar: 194.0,
                }
            )])
        );
        assert_eq!(font.char_strings.get(1), Some(LONE_ENDCHAR));
        assert_eq!(font.char_strings.get(0), Some(&[0x0e][..]));
        assert_eq!(font.widths, vec![0.0, 98.0]);
    }

    #[test]
    fn seac_glyphs_are_kept_without_seac_analysis() {
        let data = name_keyed_font(SEAC_GLYPH);

        let font = CffParser::with_options(
            &data,
            ParseOptions {
                seac_analysis: false,
            },
        )
        .parse()
        .unwrap();

        assert!(font.seacs.is_empty());
        assert_eq!(font.char_strings.get(1), Some(SEAC_GLYPH));
        assert_eq!(font.widths, vec![0.0, 98.0]);
    }

    #[test]
    fn overflowing_subroutine_call_only_replaces_its_glyph() {
        // 32767 32767 mul 32767 mul callgsubr endchar
        let glyph = [
            28, 0x7f, 0xff, 28, 0x7f, 0xff, 12, 24, 28, 0x7f, 0xff, 12, 24, 29, 14,
        ];
        let data = name_keyed_font(&glyph);

        let font = CffParser::new(&data).parse().unwrap();

        assert_eq!(font.char_strings.get(1), Some(LONE_ENDCHAR));
        assert_eq!(font.num_glyphs(), 2);
    }

    /// A CID-keyed font with two glyphs, each using its own Font DICT
    fn cid_font() -> Vec<u8> {
        let mut font = CffFont {
            header: CffHeader {
                major: 1,
                minor: 0,
                header_size: 4,
                off_size: 1,
            },
            names: vec!["CIDTest".to_owned()],
            strings: CffStrings::from_custom(vec!["Adobe".to_owned(), "Identity".to_owned()]),
            top_dict: TopDict::new(Dict::new(&TOP_DICT_SCHEMA)),
            global_subrs: CffIndex::new(),
            char_strings: index(&[&[0x0e], &[0xf7, 0x00, 0x8b, 0x16, 0x0e]]),
            charset: Charset::Custom {
                format: 2,
                glyphs: vec![
                    crate::cff::CharsetEntry::Cid(0),
                    crate::cff::CharsetEntry::Cid(5),
                ],
            },
            encoding: None,
            fd_select: Some(FdSelect::new(3, vec![0, 1])),
            fd_array: Vec::new(),
            seacs: BTreeMap::new(),
            widths: Vec::new(),
        };

        font.top_dict
            .dict
            .set(
                "ROS",
                DictValue::Ros {
                    registry: 391,
                    ordering: 392,
                    supplement: 0.0,
                },
            )
            .unwrap();
        font.top_dict.dict.set("CharStrings", DictValue::Offset(0)).unwrap();
        font.top_dict.dict.set("FDSelect", DictValue::Offset(0)).unwrap();
        font.top_dict.dict.set("FDArray", DictValue::Offset(0)).unwrap();
        font.top_dict
            .dict
            .set("Private", DictValue::SizeOffset { size: 0, offset: 0 })
            .unwrap();

        for nominal in [0.0, 100.0] {
            let mut font_dict = TopDict::new(Dict::new(&TOP_DICT_SCHEMA));
            font_dict
                .dict
                .set("Private", DictValue::SizeOffset { size: 0, offset: 0 })
                .unwrap();
            font_dict
                .private
                .dict
                .set("nominalWidthX", DictValue::Number(nominal))
                .unwrap();
            font.fd_array.push(font_dict);
        }

        CffCompiler::new(&font).compile().unwrap()
    }

    #[test]
    fn cid_keyed_font() {
        let data = cid_font();

        let font = CffParser::new(&data).parse().unwrap();

        assert!(font.is_cid());
        assert!(font.encoding.is_none());
        assert_eq!(font.fd_array.len(), 2);
        assert_eq!(font.fd_select.as_ref().unwrap().fds, vec![0, 1]);
        assert_eq!(font.charset.gid_for_cid(5), Some(1));
        // 108 0 hmoveto in a glyph using nominalWidthX 100
        assert_eq!(font.widths, vec![0.0, 208.0]);
        assert_eq!(
            font.program(1, true).unwrap().tokens.last(),
            Some(&Token::Operator(crate::cff::Operator::EndChar))
        );
    }

    #[test]
    fn invalid_glyphs_become_endchar() {
        let data = cid_font();
        let mut font = CffParser::new(&data).parse().unwrap();
        // 2-operand rmoveto without enough operands
        font.char_strings.set(1, vec![0x8b, 0x15]).unwrap();
        let data = CffCompiler::new(&font).compile().unwrap();

        let font = CffParser::new(&data).parse().unwrap();

        assert_eq!(font.char_strings.get(1), Some(LONE_ENDCHAR));
        assert_eq!(font.widths[1], 0.0);
    }
}
