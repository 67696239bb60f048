use crate::{
    error::{CffError, CffResult},
    parse_binary::BinaryParser,
};

/// Per-glyph Font DICT index of a CID-keyed font
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FdSelect {
    pub format: u8,
    pub fds: Vec<u8>,
}

impl FdSelect {
    pub fn new(format: u8, fds: Vec<u8>) -> Self {
        Self { format, fds }
    }

    pub fn parse<'a>(parser: &mut impl BinaryParser<'a>, n_glyphs: usize) -> CffResult<Self> {
        let format = parser.next()?;

        let fds = match format {
            0 => parser.slice(n_glyphs)?.to_vec(),
            3 => Self::parse_ranges(parser)?,
            format => {
                return Err(CffError::UnsupportedFormat {
                    table: "FDSelect",
                    format,
                })
            }
        };

        if fds.len() != n_glyphs {
            log::warn!(
                "FDSelect covers {} glyphs, but the font has {}",
                fds.len(),
                n_glyphs
            );
        }

        Ok(Self { format, fds })
    }

    /// Format 3: `{first, fd}` ranges closed by a sentinel GID, which decides
    /// how many glyphs are covered
    fn parse_ranges<'a>(parser: &mut impl BinaryParser<'a>) -> CffResult<Vec<u8>> {
        let n_ranges = parser.parse_u16()?;

        let mut ranges = Vec::with_capacity(n_ranges as usize);

        for i in 0..n_ranges {
            let mut first = parser.parse_u16()?;
            let fd = parser.next()?;

            if i == 0 && first != 0 {
                log::warn!("first FDSelect range starts at GID {}, not 0", first);
                first = 0;
            }

            ranges.push((first, fd));
        }

        let sentinel = parser.parse_u16()?;

        let mut fds = Vec::with_capacity(sentinel as usize);

        for (idx, &(first, fd)) in ranges.iter().enumerate() {
            let next = ranges.get(idx + 1).map_or(sentinel, |&(next, _)| next);

            if next < first {
                return Err(CffError::MalformedFont(
                    format!("FDSelect range at GID {} is out of order", first).into(),
                ));
            }

            fds.extend(std::iter::repeat(fd).take((next - first) as usize));
        }

        Ok(fds)
    }

    pub fn fd_index(&self, gid: u16) -> Option<u8> {
        self.fds.get(gid as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.fds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fds.is_empty()
    }
}
