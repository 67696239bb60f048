use crate::error::{CffError, CffResult};

/// Generic trait for parsing binary formats
///
/// Every read goes through [`BinaryParser::next`] or
/// [`BinaryParser::slice`], which refuse to step past the end of the buffer.
pub trait BinaryParser<'a> {
    fn buffer(&self) -> &'a [u8];
    fn cursor(&self) -> usize;
    fn cursor_mut(&mut self) -> &mut usize;

    fn next(&mut self) -> CffResult<u8> {
        let b = self.buffer().get(self.cursor()).copied();
        if b.is_some() {
            *self.cursor_mut() += 1;
        }
        b.ok_or(CffError::TruncatedInput)
    }

    fn peek(&mut self) -> Option<u8> {
        self.buffer().get(self.cursor()).copied()
    }

    fn is_eof(&self) -> bool {
        self.cursor() >= self.buffer().len()
    }

    fn remaining(&self) -> usize {
        self.buffer().len().saturating_sub(self.cursor())
    }

    fn seek(&mut self, pos: usize) -> CffResult<()> {
        if pos > self.buffer().len() {
            return Err(CffError::TruncatedInput);
        }

        *self.cursor_mut() = pos;

        Ok(())
    }

    /// Borrow the next `len` bytes and advance past them
    fn slice(&mut self, len: usize) -> CffResult<&'a [u8]> {
        let start = self.cursor();
        let end = start.checked_add(len).ok_or(CffError::TruncatedInput)?;
        let bytes = self
            .buffer()
            .get(start..end)
            .ok_or(CffError::TruncatedInput)?;

        *self.cursor_mut() = end;

        Ok(bytes)
    }

    fn parse_u16(&mut self) -> CffResult<u16> {
        let b1 = self.next()?;
        let b2 = self.next()?;

        Ok(u16::from_be_bytes([b1, b2]))
    }

    fn parse_i16(&mut self) -> CffResult<i16> {
        let b1 = self.next()?;
        let b2 = self.next()?;

        Ok(i16::from_be_bytes([b1, b2]))
    }

    fn parse_u24(&mut self) -> CffResult<u32> {
        let b1 = self.next()?;
        let b2 = self.next()?;
        let b3 = self.next()?;

        Ok(u32::from_be_bytes([0, b1, b2, b3]))
    }

    fn parse_u32(&mut self) -> CffResult<u32> {
        let b1 = self.next()?;
        let b2 = self.next()?;
        let b3 = self.next()?;
        let b4 = self.next()?;

        Ok(u32::from_be_bytes([b1, b2, b3, b4]))
    }

    fn parse_i32(&mut self) -> CffResult<i32> {
        let b1 = self.next()?;
        let b2 = self.next()?;
        let b3 = self.next()?;
        let b4 = self.next()?;

        Ok(i32::from_be_bytes([b1, b2, b3, b4]))
    }

    /// Read a big-endian offset of `offsize` bytes (1 through 4)
    fn parse_offset(&mut self, offsize: u8) -> CffResult<u32> {
        Ok(match offsize {
            1 => self.next()? as u32,
            2 => self.parse_u16()? as u32,
            3 => self.parse_u24()?,
            4 => self.parse_u32()?,
            _ => {
                return Err(CffError::InvalidIndex(
                    format!("invalid offsize: {}", offsize).into(),
                ))
            }
        })
    }
}

/// Positional reader over an immutable byte buffer
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    pub fn at(buffer: &'a [u8], pos: usize) -> CffResult<Self> {
        let mut cursor = Self::new(buffer);
        cursor.seek(pos)?;
        Ok(cursor)
    }

    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl<'a> BinaryParser<'a> for ByteCursor<'a> {
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

    #[test]
    fn reads_big_endian_integers() {
        let mut cursor = ByteCursor::new(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09]);

        assert_eq!(cursor.next().unwrap(), 0x01);
        assert_eq!(cursor.parse_u16().unwrap(), 0x0203);
        assert_eq!(cursor.parse_u24().unwrap(), 0x040506);
        assert_eq!(cursor.position(), 6);
        assert!(matches!(cursor.parse_u32(), Err(CffError::TruncatedInput)));
    }

    #[test]
    fn failed_read_does_not_advance_past_end() {
        let mut cursor = ByteCursor::new(&[0xff]);

        assert_eq!(cursor.next().unwrap(), 0xff);
        assert!(cursor.next().is_err());
        assert_eq!(cursor.position(), 1);
        assert!(cursor.is_eof());
    }

    #[test]
    fn slice_is_bounds_checked() {
        let mut cursor = ByteCursor::new(b"abcdef");

        cursor.seek(2).unwrap();
        assert_eq!(cursor.slice(3).unwrap(), b"cde");
        assert_eq!(cursor.remaining(), 1);
        assert!(matches!(cursor.slice(2), Err(CffError::TruncatedInput)));
        assert!(cursor.seek(7).is_err());
    }

    #[test]
    fn offsets_of_every_size() {
        let mut cursor = ByteCursor::new(&[0x7f, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2a]);

        assert_eq!(cursor.parse_offset(1).unwrap(), 0x7f);
        assert_eq!(cursor.parse_offset(2).unwrap(), 0x0100);
        assert_eq!(cursor.parse_offset(3).unwrap(), 0x000100);
        assert_eq!(cursor.parse_offset(4).unwrap(), 0x0000002a);
        assert!(matches!(
            cursor.parse_offset(5),
            Err(CffError::InvalidIndex(..))
        ));
    }
}
