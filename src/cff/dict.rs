use crate::{
    error::{CffError, CffResult},
    parse_binary::BinaryParser,
};

use super::strings::Sid;

/// Technical Note #5176 caps DICT operand stacks at 48 entries
const MAX_OPERANDS: usize = 48;

/// A DICT operator: one byte in `0..=21`, or `12` followed by a second byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DictKey(u16);

impl DictKey {
    pub const fn single(b0: u8) -> Self {
        Self(b0 as u16)
    }

    pub const fn escaped(b1: u8) -> Self {
        Self((12 << 8) | b1 as u16)
    }

    pub fn bytes(self) -> Vec<u8> {
        if self.0 >> 8 == 12 {
            vec![12, self.0 as u8]
        } else {
            vec![self.0 as u8]
        }
    }
}

/// How the operands preceding an operator are to be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Number,
    Sid,
    Boolean,
    /// A fixed number of operands, or any non-zero number of them
    Array(Option<usize>),
    /// Delta-encoded array, kept as written
    Delta,
    Offset,
    /// Private DICT pointer, written as size then offset
    SizeOffset,
    /// Registry, Ordering, Supplement
    Ros,
}

#[derive(Debug, PartialEq)]
pub struct DictEntry {
    pub key: DictKey,
    pub name: &'static str,
    pub kind: OperandKind,
    pub default: &'static [f64],
}

const fn entry(
    key: DictKey,
    name: &'static str,
    kind: OperandKind,
    default: &'static [f64],
) -> DictEntry {
    DictEntry {
        key,
        name,
        kind,
        default,
    }
}

/// The operators a kind of DICT understands, in the order they are written
#[derive(Debug, PartialEq)]
pub struct DictSchema {
    pub name: &'static str,
    pub entries: &'static [DictEntry],
}

impl DictSchema {
    pub fn by_key(&self, key: DictKey) -> Option<&'static DictEntry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    pub fn by_name(&self, name: &str) -> Option<&'static DictEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}

use DictKey as K;
use OperandKind::*;

/// Top DICT operators; Font DICTs in an FDArray share this schema
pub static TOP_DICT_SCHEMA: DictSchema = DictSchema {
    name: "Top DICT",
    entries: &[
        entry(K::escaped(30), "ROS", Ros, &[]),
        entry(K::escaped(20), "SyntheticBase", Number, &[]),
        entry(K::single(0), "version", Sid, &[]),
        entry(K::single(1), "Notice", Sid, &[]),
        entry(K::escaped(0), "Copyright", Sid, &[]),
        entry(K::single(2), "FullName", Sid, &[]),
        entry(K::single(3), "FamilyName", Sid, &[]),
        entry(K::single(4), "Weight", Sid, &[]),
        entry(K::escaped(1), "isFixedPitch", Boolean, &[0.0]),
        entry(K::escaped(2), "ItalicAngle", Number, &[0.0]),
        entry(K::escaped(3), "UnderlinePosition", Number, &[-100.0]),
        entry(K::escaped(4), "UnderlineThickness", Number, &[50.0]),
        entry(K::escaped(5), "PaintType", Number, &[0.0]),
        entry(K::escaped(6), "CharstringType", Number, &[2.0]),
        entry(
            K::escaped(7),
            "FontMatrix",
            Array(Some(6)),
            &[0.001, 0.0, 0.0, 0.001, 0.0, 0.0],
        ),
        entry(K::single(13), "UniqueID", Number, &[]),
        entry(K::single(5), "FontBBox", Array(Some(4)), &[0.0, 0.0, 0.0, 0.0]),
        entry(K::escaped(8), "StrokeWidth", Number, &[0.0]),
        entry(K::single(14), "XUID", Array(None), &[]),
        entry(K::single(15), "charset", Offset, &[0.0]),
        entry(K::single(16), "Encoding", Offset, &[0.0]),
        entry(K::single(17), "CharStrings", Offset, &[]),
        entry(K::single(18), "Private", SizeOffset, &[]),
        entry(K::escaped(21), "PostScript", Sid, &[]),
        entry(K::escaped(22), "BaseFontName", Sid, &[]),
        entry(K::escaped(23), "BaseFontBlend", Delta, &[]),
        entry(K::escaped(31), "CIDFontVersion", Number, &[0.0]),
        entry(K::escaped(32), "CIDFontRevision", Number, &[0.0]),
        entry(K::escaped(33), "CIDFontType", Number, &[0.0]),
        entry(K::escaped(34), "CIDCount", Number, &[8720.0]),
        entry(K::escaped(35), "UIDBase", Number, &[]),
        // some consumers require FDSelect to be written before FDArray
        entry(K::escaped(37), "FDSelect", Offset, &[]),
        entry(K::escaped(36), "FDArray", Offset, &[]),
        entry(K::escaped(38), "FontName", Sid, &[]),
    ],
};

pub static PRIVATE_DICT_SCHEMA: DictSchema = DictSchema {
    name: "Private DICT",
    entries: &[
        entry(K::single(6), "BlueValues", Delta, &[]),
        entry(K::single(7), "OtherBlues", Delta, &[]),
        entry(K::single(8), "FamilyBlues", Delta, &[]),
        entry(K::single(9), "FamilyOtherBlues", Delta, &[]),
        entry(K::escaped(9), "BlueScale", Number, &[0.039625]),
        entry(K::escaped(10), "BlueShift", Number, &[7.0]),
        entry(K::escaped(11), "BlueFuzz", Number, &[1.0]),
        entry(K::single(10), "StdHW", Number, &[]),
        entry(K::single(11), "StdVW", Number, &[]),
        entry(K::escaped(12), "StemSnapH", Delta, &[]),
        entry(K::escaped(13), "StemSnapV", Delta, &[]),
        entry(K::escaped(14), "ForceBold", Boolean, &[0.0]),
        entry(K::escaped(17), "LanguageGroup", Number, &[0.0]),
        entry(K::escaped(18), "ExpansionFactor", Number, &[0.06]),
        entry(K::escaped(19), "initialRandomSeed", Number, &[0.0]),
        entry(K::single(20), "defaultWidthX", Number, &[0.0]),
        entry(K::single(21), "nominalWidthX", Number, &[0.0]),
        entry(K::single(19), "Subrs", Offset, &[]),
    ],
};

#[derive(Debug, Clone, PartialEq)]
pub enum DictValue {
    Number(f64),
    Sid(Sid),
    Bool(bool),
    Array(Vec<f64>),
    Delta(Vec<f64>),
    Offset(usize),
    SizeOffset { size: usize, offset: usize },
    Ros {
        registry: Sid,
        ordering: Sid,
        supplement: f64,
    },
}

impl DictValue {
    /// Interpret raw operands according to `kind`, or `None` if they don't fit
    fn from_operands(kind: OperandKind, operands: &[f64]) -> Option<Self> {
        Some(match (kind, operands) {
            (Number, &[n]) => Self::Number(n),
            (Sid, &[n]) => Self::Sid(as_sid(n)?),
            (Boolean, &[n]) if n == 0.0 || n == 1.0 => Self::Bool(n != 0.0),
            (Array(Some(len)), ops) if ops.len() == len => Self::Array(ops.to_vec()),
            (Array(None), ops) if !ops.is_empty() => Self::Array(ops.to_vec()),
            (Delta, ops) => Self::Delta(ops.to_vec()),
            (Offset, &[n]) => Self::Offset(as_offset(n)?),
            (SizeOffset, &[size, offset]) => Self::SizeOffset {
                size: as_offset(size)?,
                offset: as_offset(offset)?,
            },
            (Ros, &[registry, ordering, supplement]) => Self::Ros {
                registry: as_sid(registry)?,
                ordering: as_sid(ordering)?,
                supplement,
            },
            _ => return None,
        })
    }

    fn matches(&self, kind: OperandKind) -> bool {
        match (self, kind) {
            (Self::Number(..), Number)
            | (Self::Sid(..), Sid)
            | (Self::Bool(..), Boolean)
            | (Self::Array(..), Array(None))
            | (Self::Delta(..), Delta)
            | (Self::Offset(..), Offset)
            | (Self::SizeOffset { .. }, SizeOffset)
            | (Self::Ros { .. }, Ros) => true,
            (Self::Array(values), Array(Some(len))) => values.len() == len,
            _ => false,
        }
    }

    /// The operands as they would be written before the operator
    pub fn to_numbers(&self) -> Vec<f64> {
        match self {
            Self::Number(n) => vec![*n],
            Self::Sid(sid) => vec![*sid as f64],
            Self::Bool(b) => vec![*b as u8 as f64],
            Self::Array(values) | Self::Delta(values) => values.clone(),
            Self::Offset(offset) => vec![*offset as f64],
            Self::SizeOffset { size, offset } => vec![*size as f64, *offset as f64],
            Self::Ros {
                registry,
                ordering,
                supplement,
            } => vec![*registry as f64, *ordering as f64, *supplement],
        }
    }

    fn from_default(kind: OperandKind, default: &[f64]) -> Option<Self> {
        if default.is_empty() {
            return None;
        }

        Self::from_operands(kind, default)
    }
}

fn as_sid(n: f64) -> Option<Sid> {
    if n.fract() == 0.0 && (0.0..=Sid::MAX as f64).contains(&n) {
        Some(n as Sid)
    } else {
        None
    }
}

fn as_offset(n: f64) -> Option<usize> {
    if n.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&n) {
        Some(n as usize)
    } else {
        None
    }
}

/// A decoded DICT: operator values keyed by the schema
#[derive(Debug, Clone, PartialEq)]
pub struct Dict {
    schema: &'static DictSchema,
    values: Vec<(DictKey, DictValue)>,
}

impl Dict {
    pub fn new(schema: &'static DictSchema) -> Self {
        Self {
            schema,
            values: Vec::new(),
        }
    }

    pub fn schema(&self) -> &'static DictSchema {
        self.schema
    }

    /// The explicitly stored value for `name`, ignoring defaults
    pub fn get(&self, name: &str) -> Option<&DictValue> {
        let entry = self.schema.by_name(name)?;

        self.values
            .iter()
            .find(|(key, _)| *key == entry.key)
            .map(|(_, value)| value)
    }

    /// The stored value for `name`, falling back to the schema default
    pub fn get_or_default(&self, name: &str) -> Option<DictValue> {
        if let Some(value) = self.get(name) {
            return Some(value.clone());
        }

        let entry = self.schema.by_name(name)?;

        DictValue::from_default(entry.kind, entry.default)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// A single-operand value as a number, with the default applied
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.get_or_default(name)? {
            DictValue::Number(n) => Some(n),
            DictValue::Sid(sid) => Some(sid as f64),
            DictValue::Bool(b) => Some(b as u8 as f64),
            DictValue::Offset(offset) => Some(offset as f64),
            _ => None,
        }
    }

    pub fn array(&self, name: &str) -> Option<Vec<f64>> {
        match self.get_or_default(name)? {
            DictValue::Array(values) | DictValue::Delta(values) => Some(values),
            _ => None,
        }
    }

    pub fn offset(&self, name: &str) -> Option<usize> {
        match self.get_or_default(name)? {
            DictValue::Offset(offset) => Some(offset),
            _ => None,
        }
    }

    pub fn set(&mut self, name: &str, value: DictValue) -> CffResult<()> {
        let entry = self.schema.by_name(name).ok_or_else(|| {
            CffError::InvalidArgument(
                format!("{} has no operator named {:?}", self.schema.name, name).into(),
            )
        })?;

        if !value.matches(entry.kind) {
            return Err(CffError::InvalidArgument(
                format!("{:?} is not a valid value for {}", value, name).into(),
            ));
        }

        self.insert(entry.key, value);

        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<DictValue> {
        let entry = self.schema.by_name(name)?;
        let idx = self.values.iter().position(|(key, _)| *key == entry.key)?;

        Some(self.values.remove(idx).1)
    }

    fn insert(&mut self, key: DictKey, value: DictValue) {
        match self.values.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((key, value)),
        }
    }

    /// Stored values in schema order, which is the order they are written in
    pub fn entries(&self) -> impl Iterator<Item = (&'static DictEntry, &DictValue)> + '_ {
        self.schema.entries.iter().filter_map(move |entry| {
            self.values
                .iter()
                .find(|(key, _)| *key == entry.key)
                .map(|(_, value)| (entry, value))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Decode a DICT operand stream against a schema
pub struct CffDictInterpreter<'a> {
    buffer: &'a [u8],
    cursor: usize,
    operand_stack: Vec<f64>,
    // set when an operand could not be decoded; the next operator is dropped
    poisoned: bool,
}

impl<'a> CffDictInterpreter<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            cursor: 0,
            operand_stack: Vec::new(),
            poisoned: false,
        }
    }

    fn push(&mut self, n: f64) -> CffResult<()> {
        if self.operand_stack.len() >= MAX_OPERANDS {
            return Err(CffError::InvalidDictOperand(
                "too many operands on the stack".into(),
            ));
        }

        self.operand_stack.push(n);

        Ok(())
    }

    fn parse_number(&mut self, b0: u8) -> CffResult<()> {
        match b0 {
            30 => match self.parse_real()? {
                Some(n) => self.push(n)?,
                None => self.poisoned = true,
            },
            b @ (22..=27 | 31) => {
                log::warn!("{} is a reserved DICT operand", b);
                self.poisoned = true;
            }
            255 => {
                return Err(CffError::InvalidDictOperand(
                    "255 is not a valid DICT operand".into(),
                ))
            }
            b0 => {
                let n = self.parse_integer(b0)?;
                self.push(n as f64)?;
            }
        }

        Ok(())
    }

    fn parse_integer(&mut self, b0: u8) -> CffResult<i32> {
        Ok(match b0 {
            32..=246 => b0 as i32 - 139,
            247..=250 => {
                let b1 = self.next()? as i32;
                (b0 as i32 - 247) * 256 + b1 + 108
            }
            251..=254 => {
                let b1 = self.next()? as i32;
                -(b0 as i32 - 251) * 256 - b1 - 108
            }
            28 => self.parse_i16()? as i32,
            29 => self.parse_i32()?,
            _ => {
                return Err(CffError::InvalidDictOperand(
                    format!("{} does not begin an integer", b0).into(),
                ))
            }
        })
    }

    /// Read a nibble-packed real number; `None` if the text isn't a number
    fn parse_real(&mut self) -> CffResult<Option<f64>> {
        let mut s = String::new();

        'outer: loop {
            let b = self.next()?;

            for nibble in [b >> 4, b & 0xf] {
                match nibble {
                    0..=9 => s.push((b'0' + nibble) as char),
                    0xa => s.push('.'),
                    0xb => s.push('E'),
                    0xc => s.push_str("E-"),
                    0xd => {}
                    0xe => s.push('-'),
                    _ => break 'outer,
                }
            }
        }

        match s.parse::<f64>() {
            Ok(n) => Ok(Some(n)),
            Err(..) => {
                log::warn!("invalid real number operand: {:?}", s);
                Ok(None)
            }
        }
    }

    fn apply_operator(&mut self, key: DictKey, schema: &'static DictSchema, dict: &mut Dict) {
        let operands = std::mem::take(&mut self.operand_stack);
        let poisoned = std::mem::replace(&mut self.poisoned, false);

        let entry = match schema.by_key(key) {
            Some(entry) => entry,
            None => {
                log::debug!("ignoring unknown {} operator {:?}", schema.name, key);
                return;
            }
        };

        if poisoned {
            log::warn!("ignoring {} with invalid operands", entry.name);
            return;
        }

        if operands.is_empty() {
            log::debug!("ignoring {} without operands", entry.name);
            return;
        }

        match DictValue::from_operands(entry.kind, &operands) {
            Some(value) => dict.insert(key, value),
            None => log::warn!(
                "ignoring {} with operands {:?} that don't fit {:?}",
                entry.name,
                operands,
                entry.kind
            ),
        }
    }

    pub fn parse(buffer: &'a [u8], schema: &'static DictSchema) -> CffResult<Dict> {
        let mut parser = Self::new(buffer);
        let mut dict = Dict::new(schema);

        while let Some(b0) = parser.peek() {
            parser.cursor += 1;

            match b0 {
                12 => {
                    let b1 = parser.next()?;
                    parser.apply_operator(DictKey::escaped(b1), schema, &mut dict);
                }
                0..=21 => parser.apply_operator(DictKey::single(b0), schema, &mut dict),
                b0 => parser.parse_number(b0)?,
            }
        }

        if !parser.operand_stack.is_empty() {
            log::warn!(
                "{} ends with {} dangling operands",
                schema.name,
                parser.operand_stack.len()
            );
        }

        Ok(dict)
    }
}

impl<'a> BinaryParser<'a> for CffDictInterpreter<'a> {
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

/// Decode one DICT number operand, returning it and the number of bytes read
pub fn decode_number(bytes: &[u8]) -> CffResult<(f64, usize)> {
    let mut parser = CffDictInterpreter::new(bytes);
    let b0 = parser.next()?;

    parser.parse_number(b0)?;

    match parser.operand_stack.pop() {
        Some(n) => Ok((n, parser.cursor)),
        None => Err(CffError::InvalidDictOperand(
            format!("{} does not begin a number", b0).into(),
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn integer_encodings() {
        assert_eq!(decode_number(&[0x8b]).unwrap(), (0.0, 1));
        assert_eq!(decode_number(&[0xef]).unwrap(), (100.0, 1));
        assert_eq!(decode_number(&[0x27]).unwrap(), (-100.0, 1));
        assert_eq!(decode_number(&[0xfa, 0x7c]).unwrap(), (1000.0, 2));
        assert_eq!(decode_number(&[0xfe, 0x7c]).unwrap(), (-1000.0, 2));
        assert_eq!(decode_number(&[0x1c, 0x27, 0x10]).unwrap(), (10000.0, 3));
        assert_eq!(decode_number(&[0x1c, 0xd8, 0xf0]).unwrap(), (-10000.0, 3));
        assert_eq!(
            decode_number(&[0x1d, 0x00, 0x01, 0x86, 0xa0]).unwrap(),
            (100000.0, 5)
        );
    }

    #[test]
    fn real_numbers() {
        assert_eq!(decode_number(&[0x1e, 0xe2, 0xa2, 0x5f]).unwrap(), (-2.25, 4));
        assert_eq!(decode_number(&[0x1e, 0x5c, 0x11, 0xff]).unwrap(), (5e-11, 4));
        assert_eq!(decode_number(&[0x1e, 0x0a, 0x14, 0x05, 0x41, 0xc3, 0xff]).unwrap().0, 0.140541e-3);
    }

    #[test]
    fn byte_255_is_invalid() {
        assert!(matches!(
            decode_number(&[0xff]),
            Err(CffError::InvalidDictOperand(..))
        ));
        assert!(matches!(
            CffDictInterpreter::parse(&[0xff, 0x00], &TOP_DICT_SCHEMA),
            Err(CffError::InvalidDictOperand(..))
        ));
    }

    #[test]
    fn truncated_operand() {
        assert_eq!(decode_number(&[0x1c, 0x27]), Err(CffError::TruncatedInput));
        assert_eq!(decode_number(&[0x1e, 0x12]), Err(CffError::TruncatedInput));
    }

    #[test]
    fn top_dict_operands_follow_schema() {
        let dict = CffDictInterpreter::parse(
            &[
                0xf8, 0x1b, 0x00, // version
                0xfb, 0x3c, 0xfb, 0x6e, 0xfa, 0x7c, 0xfa, 0x16, 0x05, // FontBBox
                0x8c, 0x0c, 0x01, // isFixedPitch
                0xb8, 0xf1, 0x12, // Private
            ],
            &TOP_DICT_SCHEMA,
        )
        .unwrap();

        assert_eq!(dict.get("version"), Some(&DictValue::Sid(391)));
        assert_eq!(
            dict.array("FontBBox"),
            Some(vec![-168.0, -218.0, 1000.0, 898.0])
        );
        assert_eq!(dict.get("isFixedPitch"), Some(&DictValue::Bool(true)));
        assert_eq!(
            dict.get("Private"),
            Some(&DictValue::SizeOffset {
                size: 45,
                offset: 102
            })
        );
    }

    #[test]
    fn defaults_apply_to_missing_operators() {
        let dict = CffDictInterpreter::parse(&[], &PRIVATE_DICT_SCHEMA).unwrap();

        assert_eq!(dict.number("BlueScale"), Some(0.039625));
        assert_eq!(dict.number("defaultWidthX"), Some(0.0));
        assert_eq!(dict.number("StdHW"), None);
        assert!(!dict.has("BlueScale"));
    }

    #[test]
    fn unknown_operators_are_ignored() {
        let dict = CffDictInterpreter::parse(&[0x8c, 0x02, 0x8d, 0x0c, 0x63, 0x8b, 0x14], &PRIVATE_DICT_SCHEMA)
            .unwrap();

        assert_eq!(dict.get("defaultWidthX"), Some(&DictValue::Number(0.0)));
        assert_eq!(dict.entries().count(), 1);
    }

    #[test]
    fn reserved_operands_poison_their_entry() {
        let dict = CffDictInterpreter::parse(
            &[
                64, 39, 31, 30, 252, 114, 137, 115, 79, 30, 197, 119, 2, 99, 127, 6,
            ],
            &PRIVATE_DICT_SCHEMA,
        )
        .unwrap();

        assert_eq!(dict.get("BlueValues"), None);
    }

    #[test]
    fn mismatched_operands_are_dropped() {
        // three operands where FontBBox expects four
        let dict = CffDictInterpreter::parse(&[0x8b, 0x8b, 0x8b, 0x05], &TOP_DICT_SCHEMA).unwrap();

        assert!(!dict.has("FontBBox"));
        assert_eq!(dict.array("FontBBox"), Some(vec![0.0; 4]));
    }

    #[test]
    fn set_checks_the_schema() {
        let mut dict = Dict::new(&TOP_DICT_SCHEMA);

        dict.set("CharStrings", DictValue::Offset(94)).unwrap();
        assert_eq!(dict.offset("CharStrings"), Some(94));

        assert!(dict.set("CharStrings", DictValue::Number(1.5)).is_err());
        assert!(dict.set("FontMatrix", DictValue::Array(vec![1.0])).is_err());
        assert!(dict.set("BlueValues", DictValue::Delta(vec![])).is_err());

        assert_eq!(dict.remove("CharStrings"), Some(DictValue::Offset(94)));
        assert!(dict.is_empty());
    }

    #[test]
    fn entries_come_out_in_schema_order() {
        let mut dict = Dict::new(&TOP_DICT_SCHEMA);

        dict.set("CharStrings", DictValue::Offset(1)).unwrap();
        dict.set("version", DictValue::Sid(391)).unwrap();

        let names = dict.entries().map(|(entry, _)| entry.name).collect::<Vec<_>>();

        assert_eq!(names, vec!["version", "CharStrings"]);
    }
}
