use std::borrow::Cow;

use crate::{
    error::{CffError, CffResult},
    parse_binary::BinaryParser,
};

/// A CFF INDEX: a counted array of variable-length byte objects
///
/// Objects borrow from the font buffer when parsed and may be replaced by
/// owned data when a glyph program has to be rewritten.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CffIndex<'a> {
    objects: Vec<Cow<'a, [u8]>>,
}

impl<'a> CffIndex<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_objects<I, T>(objects: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Cow<'a, [u8]>>,
    {
        Self {
            objects: objects.into_iter().map(Into::into).collect(),
        }
    }

    pub fn count(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&[u8]> {
        self.objects.get(idx).map(|obj| &**obj)
    }

    pub fn push(&mut self, obj: impl Into<Cow<'a, [u8]>>) {
        self.objects.push(obj.into());
    }

    pub fn set(&mut self, idx: usize, obj: impl Into<Cow<'a, [u8]>>) -> CffResult<()> {
        let slot = self.objects.get_mut(idx).ok_or_else(|| {
            CffError::InvalidArgument(format!("INDEX has no object {}", idx).into())
        })?;

        *slot = obj.into();

        Ok(())
    }

    /// Total size of the object data
    pub fn data_len(&self) -> usize {
        self.objects.iter().map(|obj| obj.len()).sum()
    }

    pub fn iter(&self) -> CffIndexIterator<'a, '_> {
        CffIndexIterator::new(self)
    }

    pub fn into_owned(self) -> CffIndex<'static> {
        CffIndex {
            objects: self
                .objects
                .into_iter()
                .map(|obj| Cow::Owned(obj.into_owned()))
                .collect(),
        }
    }
}

#[derive(Debug)]
pub struct CffIndexIterator<'a, 'b> {
    index: &'b CffIndex<'a>,
    cursor: usize,
}

impl<'a, 'b> CffIndexIterator<'a, 'b> {
    pub fn new(index: &'b CffIndex<'a>) -> Self {
        Self { index, cursor: 0 }
    }
}

impl<'a, 'b> Iterator for CffIndexIterator<'a, 'b> {
    type Item = &'b [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.index.get(self.cursor)?;
        self.cursor += 1;
        Some(n)
    }
}

/// Read an INDEX starting at the parser's cursor, leaving the cursor just past
/// its object data
pub fn parse_index<'a>(parser: &mut impl BinaryParser<'a>) -> CffResult<CffIndex<'a>> {
    let count = parser.parse_u16()?;

    // an empty INDEX is only the count, without an offsize or offset array
    if count == 0 {
        return Ok(CffIndex::new());
    }

    let offsize = parser.next()?;

    if !(1..=4).contains(&offsize) {
        return Err(CffError::InvalidIndex(
            format!("invalid offsize: {}", offsize).into(),
        ));
    }

    let mut offsets = Vec::with_capacity(count as usize + 1);

    for _ in 0..=count {
        let offset = parser.parse_offset(offsize)?;

        // offsets are relative to the byte preceding the object data
        let offset = offset
            .checked_sub(1)
            .ok_or(CffError::InvalidIndex("offset of zero".into()))?;

        if let Some(&prev) = offsets.last() {
            if offset < prev {
                return Err(CffError::InvalidIndex(
                    format!("offset {} is less than previous offset {}", offset, prev).into(),
                ));
            }
        }

        offsets.push(offset);
    }

    let start = offsets[0] as usize;
    let end = offsets[count as usize] as usize;

    let data = parser.slice(end)?;

    let objects = offsets
        .windows(2)
        .map(|w| Cow::Borrowed(&data[w[0] as usize..w[1] as usize]))
        .collect();

    if start != 0 {
        log::debug!("INDEX data begins {} bytes after the offset array", start);
    }

    Ok(CffIndex { objects })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parse_binary::ByteCursor;

    #[test]
    fn empty_index_is_two_bytes() {
        let mut cursor = ByteCursor::new(&[0x00, 0x00, 0xff, 0xff]);

        let index = parse_index(&mut cursor).unwrap();

        assert_eq!(index.count(), 0);
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn objects_are_sliced_by_offsets() {
        let mut cursor = ByteCursor::new(&[
            0x00, 0x03, // count
            0x01, // offsize
            0x01, 0x02, 0x02, 0x05, // offsets
            b'a', b'b', b'c', b'd', // data
            0xee, // following structure
        ]);

        let index = parse_index(&mut cursor).unwrap();

        assert_eq!(index.count(), 3);
        assert_eq!(index.get(0), Some(&b"a"[..]));
        assert_eq!(index.get(1), Some(&b""[..]));
        assert_eq!(index.get(2), Some(&b"bcd"[..]));
        assert_eq!(index.get(3), None);
        assert_eq!(cursor.position(), 11);
    }

    #[test]
    fn two_byte_offsets() {
        let mut cursor = ByteCursor::new(&[0x00, 0x01, 0x02, 0x00, 0x01, 0x00, 0x03, b'h', b'i']);

        let index = parse_index(&mut cursor).unwrap();

        assert_eq!(index.iter().collect::<Vec<_>>(), vec![&b"hi"[..]]);
    }

    #[test]
    fn rejects_invalid_offsize() {
        let mut cursor = ByteCursor::new(&[0x00, 0x01, 0x05, 0x01, 0x02, 0x00]);

        assert!(matches!(
            parse_index(&mut cursor),
            Err(CffError::InvalidIndex(..))
        ));
    }

    #[test]
    fn rejects_decreasing_offsets() {
        let mut cursor = ByteCursor::new(&[0x00, 0x02, 0x01, 0x01, 0x03, 0x02, 0x00, 0x00]);

        assert!(matches!(
            parse_index(&mut cursor),
            Err(CffError::InvalidIndex(..))
        ));
    }

    #[test]
    fn truncated_object_data() {
        let mut cursor = ByteCursor::new(&[0x00, 0x01, 0x01, 0x01, 0x10, 0x00]);

        assert_eq!(parse_index(&mut cursor), Err(CffError::TruncatedInput));
    }

    #[test]
    fn replaced_objects_are_owned() {
        let data = [1, 2, 3];
        let mut index = CffIndex::from_objects([&data[..1], &data[1..]]);

        index.set(1, vec![14]).unwrap();

        assert_eq!(index.get(0), Some(&[1][..]));
        assert_eq!(index.get(1), Some(&[14][..]));
        assert_eq!(index.data_len(), 2);
        assert!(index.set(2, vec![]).is_err());
    }
}
