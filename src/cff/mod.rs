/*!
 * https://adobe-type-tools.github.io/font-tech-notes/pdfs/5176.CFF.pdf
 *
 * See also:
 *  - https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf
 */

use std::collections::BTreeMap;

use crate::error::{CffError, CffResult};

mod charset;
mod charstring;
mod compile;
mod dict;
mod encoding;
mod fd_select;
mod index;
mod operator;
mod parse;
mod strings;

pub use charset::*;
pub use charstring::{CharstringDecoder, CharstringProgram, Seac, Token};
pub use compile::*;
pub use dict::{
    decode_number, CffDictInterpreter, Dict, DictEntry, DictKey, DictSchema, DictValue,
    OperandKind, PRIVATE_DICT_SCHEMA, TOP_DICT_SCHEMA,
};
pub use encoding::*;
pub use fd_select::FdSelect;
pub use index::*;
pub use operator::Operator;
pub use parse::{CffParser, ParseOptions};
pub use strings::{CffStrings, Sid, STANDARD_STRINGS};

/// Names longer than this are truncated
const MAX_NAME_LEN: usize = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CffHeader {
    pub major: u8,
    pub minor: u8,
    pub header_size: u8,
    pub off_size: u8,
}

/// A Private DICT together with the local subroutines it points to
#[derive(Debug, Clone, PartialEq)]
pub struct PrivateDict<'a> {
    pub dict: Dict,
    pub subrs: Option<CffIndex<'a>>,
}

impl<'a> PrivateDict<'a> {
    pub fn new(dict: Dict) -> Self {
        Self { dict, subrs: None }
    }

    pub fn empty() -> Self {
        Self::new(Dict::new(&PRIVATE_DICT_SCHEMA))
    }

    pub fn default_width_x(&self) -> f64 {
        self.dict.number("defaultWidthX").unwrap_or(0.0)
    }

    pub fn nominal_width_x(&self) -> f64 {
        self.dict.number("nominalWidthX").unwrap_or(0.0)
    }
}

/// A Top DICT, or one Font DICT of a CID-keyed font's FDArray
#[derive(Debug, Clone, PartialEq)]
pub struct TopDict<'a> {
    pub dict: Dict,
    pub private: PrivateDict<'a>,
}

impl<'a> TopDict<'a> {
    pub fn new(dict: Dict) -> Self {
        Self {
            dict,
            private: PrivateDict::empty(),
        }
    }

    /// CID-keyed fonts are marked by a `ROS` entry
    pub fn is_cid(&self) -> bool {
        self.dict.has("ROS")
    }

    pub fn font_matrix(&self) -> Vec<f64> {
        self.dict.array("FontMatrix").unwrap_or_default()
    }

    pub fn font_bbox(&self) -> Vec<f64> {
        self.dict.array("FontBBox").unwrap_or_default()
    }
}

/// A decoded CFF font
///
/// Only the first font of a FontSet is decoded; PDF embeds one font per
/// `FontFile3` stream.
#[derive(Debug, Clone, PartialEq)]
pub struct CffFont<'a> {
    pub header: CffHeader,
    pub names: Vec<String>,
    pub strings: CffStrings,
    pub top_dict: TopDict<'a>,
    pub global_subrs: CffIndex<'a>,
    pub char_strings: CffIndex<'a>,
    pub charset: Charset,
    /// CID-keyed fonts have no encoding
    pub encoding: Option<Encoding>,
    pub fd_select: Option<FdSelect>,
    pub fd_array: Vec<TopDict<'a>>,
    /// Accented glyphs whose programs were replaced by a lone `endchar`
    pub seacs: BTreeMap<u16, Seac>,
    /// Advance width of every glyph, in glyph space
    pub widths: Vec<f32>,
}

impl<'a> CffFont<'a> {
    pub fn is_cid(&self) -> bool {
        self.top_dict.is_cid()
    }

    pub fn num_glyphs(&self) -> usize {
        self.char_strings.count()
    }

    pub fn name(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }

    /// The Private DICT governing a glyph: the Font DICT's selected by
    /// FDSelect in CID-keyed fonts, the Top DICT's otherwise
    pub fn private_dict_for(&self, gid: u16) -> CffResult<&PrivateDict<'a>> {
        let fd_select = match &self.fd_select {
            Some(fd_select) if !self.fd_array.is_empty() => fd_select,
            _ => return Ok(&self.top_dict.private),
        };

        let fd = fd_select.fd_index(gid).ok_or_else(|| {
            CffError::MalformedFont(format!("glyph {} is not in FDSelect", gid).into())
        })?;

        self.fd_array
            .get(fd as usize)
            .map(|font_dict| &font_dict.private)
            .ok_or_else(|| {
                CffError::MalformedFont(
                    format!("glyph {} selects missing Font DICT {}", gid, fd).into(),
                )
            })
    }

    /// Decode the charstring of `gid` with the subroutines it has access to
    pub fn program(&self, gid: u16, seac_analysis: bool) -> CffResult<CharstringProgram> {
        let charstring = self.char_strings.get(gid as usize).ok_or_else(|| {
            CffError::InvalidArgument(format!("font has no glyph {}", gid).into())
        })?;

        let private = self.private_dict_for(gid)?;

        CharstringDecoder::new(seac_analysis)
            .with_subrs(Some(&self.global_subrs), private.subrs.as_ref())
            .decode(charstring)
    }

    /// Glyph name of a name-keyed font
    pub fn glyph_name(&self, gid: u16) -> Option<&str> {
        self.charset.glyph(gid)?.name()
    }
}

/// Make a font name safe to use as a PostScript name
///
/// Bytes outside the printable ASCII range and the PostScript delimiters
/// become `_`.
pub fn sanitize_name(name: &[u8]) -> String {
    let name: String = name
        .iter()
        .take(MAX_NAME_LEN)
        .map(|&b| match b {
            b'[' | b']' | b'(' | b')' | b'{' | b'}' | b'<' | b'>' | b'/' | b'%' => '_',
            b'!'..=b'~' => b as char,
            _ => '_',
        })
        .collect();

    if name.is_empty() {
        return "Bad_Font_Name".to_owned();
    }

    name
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_name(b"[a"), "_a");
        assert_eq!(sanitize_name(b"Times-Roman"), "Times-Roman");
        assert_eq!(sanitize_name(b"a b%c"), "a_b_c");
        assert_eq!(sanitize_name(b""), "Bad_Font_Name");
        assert_eq!(sanitize_name(&[0; 129]), "_".repeat(127));
    }

    #[test]
    fn private_dict_defaults() {
        let private = PrivateDict::empty();

        assert_eq!(private.default_width_x(), 0.0);
        assert_eq!(private.nominal_width_x(), 0.0);
        assert_eq!(private.dict.number("BlueScale"), Some(0.039625));
        assert!(private.subrs.is_none());
    }

    #[test]
    fn top_dict_defaults() {
        let top_dict = TopDict::new(Dict::new(&TOP_DICT_SCHEMA));

        assert!(!top_dict.is_cid());
        assert_eq!(top_dict.font_matrix(), vec![0.001, 0.0, 0.0, 0.001, 0.0, 0.0]);
        assert_eq!(top_dict.dict.number("CIDCount"), Some(8720.0));
    }
}
