use crate::error::{CffError, CffResult};

use super::{
    charset::Charset,
    charstring::{CharstringProgram, F16Dot16, Token},
    dict::{Dict, DictValue, OperandKind},
    encoding::Encoding,
    fd_select::FdSelect,
    index::CffIndex,
    operator::Operator,
    sanitize_name,
    strings::CffStrings,
    CffFont, CffHeader, TopDict,
};

/// Five-byte integer written in place of an offset until the offset is known
const OFFSET_PLACEHOLDER: [u8; 5] = [29, 0, 0, 0, 0];

/// Top DICT keys that Font DICTs in an FDArray don't carry
const CID_ONLY_KEYS: [&str; 5] = [
    "CIDFontVersion",
    "CIDFontRevision",
    "CIDFontType",
    "CIDCount",
    "UIDBase",
];

/// XUID arrays longer than this are dropped
const MAX_XUID_LEN: usize = 16;

pub fn encode_integer(value: i32) -> Vec<u8> {
    match value {
        -107..=107 => vec![(value + 139) as u8],
        108..=1131 => {
            let value = value - 108;
            vec![((value >> 8) + 247) as u8, value as u8]
        }
        -1131..=-108 => {
            let value = -value - 108;
            vec![((value >> 8) + 251) as u8, value as u8]
        }
        -32768..=32767 => {
            let [b1, b2] = (value as i16).to_be_bytes();
            vec![28, b1, b2]
        }
        _ => {
            let [b1, b2, b3, b4] = value.to_be_bytes();
            vec![29, b1, b2, b3, b4]
        }
    }
}

/// Encode a real number as nibble-packed decimal text
pub fn encode_float(value: f64) -> CffResult<Vec<u8>> {
    if !value.is_finite() {
        return Err(CffError::InvalidArgument(
            format!("{} can't be written as a real number", value).into(),
        ));
    }

    let mut text = shortest_decimal(value);

    if let Some(rounded) = round_float_noise(value, &text) {
        text = shortest_decimal(rounded);
    }

    let mut nibbles = Vec::with_capacity(text.len() + 2);
    let mut chars = text.bytes();

    while let Some(c) = chars.next() {
        match c {
            b'0'..=b'9' => nibbles.push(c - b'0'),
            b'.' => nibbles.push(0xa),
            b'e' => nibbles.push(if chars.next() == Some(b'-') { 0xc } else { 0xb }),
            b'-' => nibbles.push(0xe),
            _ => {
                return Err(CffError::InvalidArgument(
                    format!("{:?} can't be written as a real number", text).into(),
                ))
            }
        }
    }

    nibbles.push(0xf);

    if nibbles.len() % 2 == 1 {
        nibbles.push(0xf);
    }

    let mut out = vec![30];
    out.extend(nibbles.chunks_exact(2).map(|pair| pair[0] << 4 | pair[1]));

    Ok(out)
}

/// Integral values that fit in 32 bits are written as integers, everything
/// else as a real number
pub fn encode_number(value: f64) -> CffResult<Vec<u8>> {
    if value.fract() == 0.0 && (i32::MIN as f64..=i32::MAX as f64).contains(&value) {
        return Ok(encode_integer(value as i32));
    }

    encode_float(value)
}

/// Format a finite number with the fewest digits that read back to the same
/// value, switching to exponent notation outside `1e-6 <= |x| < 1e21`
fn shortest_decimal(value: f64) -> String {
    if value == 0.0 {
        return "0".to_owned();
    }

    let scientific = format!("{:e}", value.abs());
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    let digits: String = mantissa.chars().filter(|&c| c != '.').collect();
    let k = digits.len() as i32;
    // position of the decimal point relative to the first digit
    let n = exponent + 1;

    let mut s = String::with_capacity(digits.len() + 8);

    if value < 0.0 {
        s.push('-');
    }

    if k <= n && n <= 21 {
        s.push_str(&digits);
        s.extend(std::iter::repeat('0').take((n - k) as usize));
    } else if 0 < n && n <= 21 {
        s.push_str(&digits[..n as usize]);
        s.push('.');
        s.push_str(&digits[n as usize..]);
    } else if -6 < n && n <= 0 {
        s.push_str("0.");
        s.extend(std::iter::repeat('0').take(-n as usize));
        s.push_str(&digits);
    } else {
        s.push_str(&digits[..1]);
        if k > 1 {
            s.push('.');
            s.push_str(&digits[1..]);
        }
        s.push('e');
        s.push(if n - 1 < 0 { '-' } else { '+' });
        s.push_str(&(n - 1).abs().to_string());
    }

    s
}

/// Round away binary floating point noise: a fraction whose last digits are a
/// run of five to twenty `0`s or `9`s followed by at most two other digits is
/// rounded to the digits before the run
fn round_float_noise(value: f64, text: &str) -> Option<f64> {
    let (_, fraction) = text.split_once('.')?;
    let (fraction, exponent) = match fraction.split_once('e') {
        Some((fraction, exponent)) => (fraction, exponent.parse::<i32>().ok()?),
        None => (fraction, 0),
    };

    let fraction = fraction.as_bytes();

    let lead = (0..fraction.len()).find(|&lead| {
        let c = fraction[lead];

        if c != b'0' && c != b'9' {
            return false;
        }

        let remaining = fraction.len() - lead;
        let run = fraction[lead..].iter().take_while(|&&b| b == c).count();

        remaining.saturating_sub(2).max(5) <= run.min(20)
    })?;

    let epsilon = 10f64.powi(lead as i32 - exponent);
    let rounded = (value * epsilon).round() / epsilon;

    // subnormals have no finite scale
    (epsilon.is_finite() && rounded.is_finite() && rounded != 0.0).then_some(rounded)
}

/// Remembers where offset placeholders were written so they can be filled in
/// once the structures they point to have been placed
#[derive(Debug, Default)]
pub struct OffsetTracker {
    offsets: Vec<(&'static str, usize)>,
}

impl OffsetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tracking(&self, name: &str) -> bool {
        self.offsets.iter().any(|&(key, _)| key == name)
    }

    pub fn track(&mut self, name: &'static str, location: usize) -> CffResult<()> {
        if self.is_tracking(name) {
            return Err(CffError::InvalidArgument(
                format!("already tracking the location of {}", name).into(),
            ));
        }

        self.offsets.push((name, location));

        Ok(())
    }

    /// Shift every tracked location by `shift` bytes
    pub fn offset(&mut self, shift: usize) {
        for (_, location) in &mut self.offsets {
            *location += shift;
        }
    }

    /// Fill in consecutive placeholders for `name` with `values`
    pub fn set_entry_location(
        &self,
        name: &str,
        values: &[usize],
        output: &mut [u8],
    ) -> CffResult<()> {
        let location = self
            .offsets
            .iter()
            .find(|&&(key, _)| key == name)
            .map(|&(_, location)| location)
            .ok_or_else(|| {
                CffError::InvalidArgument(format!("not tracking the location of {}", name).into())
            })?;

        for (idx, &value) in values.iter().enumerate() {
            let start = location + idx * OFFSET_PLACEHOLDER.len();
            let slot = output
                .get_mut(start..start + OFFSET_PLACEHOLDER.len())
                .filter(|slot| **slot == OFFSET_PLACEHOLDER)
                .ok_or_else(|| {
                    CffError::InvalidArgument(
                        format!("{} offset slot at {} is not empty", name, start).into(),
                    )
                })?;

            let value = i32::try_from(value).map_err(|_| {
                CffError::InvalidArgument(format!("{} offset {} is too large", name, value).into())
            })?;

            slot[1..].copy_from_slice(&value.to_be_bytes());
        }

        Ok(())
    }
}

fn compile_index(objects: &[&[u8]], trackers: &mut [OffsetTracker]) -> CffResult<Vec<u8>> {
    let count = u16::try_from(objects.len()).map_err(|_| {
        CffError::InvalidArgument(format!("{} objects don't fit in an INDEX", objects.len()).into())
    })?;

    if count == 0 {
        return Ok(vec![0, 0]);
    }

    let last_offset = 1 + objects.iter().map(|obj| obj.len()).sum::<usize>();

    let off_size: usize = match last_offset {
        0..=0xff => 1,
        0x100..=0xffff => 2,
        0x1_0000..=0xff_ffff => 3,
        _ => 4,
    };

    let last_offset = u32::try_from(last_offset)
        .map_err(|_| CffError::InvalidArgument("INDEX data is too large".into()))?;

    let mut data = Vec::with_capacity(3 + (objects.len() + 1) * off_size + last_offset as usize);
    data.extend(count.to_be_bytes());
    data.push(off_size as u8);

    let mut relative_offset = 1u32;

    for i in 0..=objects.len() {
        data.extend(&relative_offset.to_be_bytes()[4 - off_size..]);

        if let Some(obj) = objects.get(i) {
            relative_offset += obj.len() as u32;
        }
    }

    for (i, obj) in objects.iter().enumerate() {
        if let Some(tracker) = trackers.get_mut(i) {
            tracker.offset(data.len());
        }

        data.extend_from_slice(obj);
    }

    Ok(data)
}

/// Write an INDEX, choosing the smallest offset size that fits
pub fn encode_index(index: &CffIndex) -> CffResult<Vec<u8>> {
    compile_index(&index.iter().collect::<Vec<_>>(), &mut [])
}

fn write_dict(dict: &Dict, mut tracker: Option<&mut OffsetTracker>) -> CffResult<Vec<u8>> {
    let mut out = Vec::new();

    for (entry, value) in dict.entries() {
        let operands = value.to_numbers();

        if operands.is_empty() {
            continue;
        }

        match (entry.kind, tracker.as_deref_mut()) {
            (OperandKind::Offset | OperandKind::SizeOffset, Some(tracker)) => {
                tracker.track(entry.name, out.len())?;

                for _ in &operands {
                    out.extend(OFFSET_PLACEHOLDER);
                }
            }
            _ => {
                for n in operands {
                    out.extend(encode_number(n)?);
                }
            }
        }

        out.extend(entry.key.bytes());
    }

    Ok(out)
}

/// Write a DICT with its values as they are
pub fn encode_dict(dict: &Dict) -> CffResult<Vec<u8>> {
    write_dict(dict, None)
}

/// Write a DICT, leaving placeholders for its offsets in `tracker`
pub fn compile_dict(dict: &Dict, tracker: &mut OffsetTracker) -> CffResult<Vec<u8>> {
    write_dict(dict, Some(tracker))
}

/// The header is always written with a size of 4
pub fn compile_header(header: &CffHeader) -> Vec<u8> {
    vec![header.major, header.minor, 4, header.off_size]
}

pub fn compile_name_index(names: &[String]) -> CffResult<Vec<u8>> {
    let names: Vec<String> = names
        .iter()
        .map(|name| sanitize_name(name.as_bytes()))
        .collect();

    compile_index(
        &names.iter().map(String::as_bytes).collect::<Vec<_>>(),
        &mut [],
    )
}

pub fn compile_string_index(strings: &CffStrings) -> CffResult<Vec<u8>> {
    compile_index(
        &strings
            .custom()
            .iter()
            .map(String::as_bytes)
            .collect::<Vec<_>>(),
        &mut [],
    )
}

pub fn compile_char_strings(char_strings: &CffIndex) -> CffResult<Vec<u8>> {
    let objects: Vec<&[u8]> = char_strings
        .iter()
        .map(|glyph| {
            if glyph.is_empty() {
                // 0 endchar
                &[0x8b, 0x0e][..]
            } else {
                glyph
            }
        })
        .collect();

    compile_index(&objects, &mut [])
}

fn next_in_range<T: Into<u32>>(first: T, n_left: usize) -> u32 {
    first.into() + n_left as u32 + 1
}

/// Group values into runs of consecutive numbers, as `(first, n_left)`
fn ranges<T>(values: &[T]) -> Vec<(T, usize)>
where
    T: Copy + Into<u32>,
{
    let mut ranges: Vec<(T, usize)> = Vec::new();

    for &value in values {
        match ranges.last_mut() {
            Some((first, n_left)) if next_in_range(*first, *n_left) == value.into() => {
                *n_left += 1;
            }
            _ => ranges.push((value, 0)),
        }
    }

    ranges
}

/// Write a charset for `n_glyphs` glyphs
///
/// CID-keyed fonts get format 2 ranges of their CIDs, or an identity range
/// when the charset doesn't list CIDs. Name-keyed fonts get format 0.
pub fn compile_charset(
    charset: &Charset,
    n_glyphs: usize,
    strings: &CffStrings,
    is_cid: bool,
) -> CffResult<Vec<u8>> {
    let n_glyphs_less_notdef = n_glyphs.saturating_sub(1);

    if n_glyphs_less_notdef == 0 {
        return Ok(vec![0]);
    }

    if is_cid {
        let cids: Vec<u16> = charset
            .glyphs()
            .iter()
            .skip(1)
            .filter_map(|entry| entry.cid())
            .collect();

        let mut out = vec![2];

        if cids.len() == n_glyphs_less_notdef {
            for (first, n_left) in ranges(&cids) {
                out.extend(first.to_be_bytes());
                out.extend((n_left as u16).to_be_bytes());
            }
        } else {
            let n_left = u16::try_from(n_glyphs_less_notdef)
                .map_err(|_| CffError::InvalidArgument("too many glyphs".into()))?;
            out.extend([0, 0]);
            out.extend(n_left.to_be_bytes());
        }

        return Ok(out);
    }

    let mut out = Vec::with_capacity(1 + n_glyphs_less_notdef * 2);
    out.push(0);

    let mut warned = false;

    for gid in 1..n_glyphs {
        let sid = match charset.glyphs().get(gid).and_then(|entry| entry.name()) {
            Some(name) => match strings.sid(name) {
                Some(sid) => sid,
                None => {
                    if !warned {
                        log::warn!("couldn't find {:?} in the CFF strings", name);
                        warned = true;
                    }
                    0
                }
            },
            None => 0,
        };

        out.extend(sid.to_be_bytes());
    }

    Ok(out)
}

/// Write a custom encoding in format 0 or 1, whichever is smaller
pub fn compile_encoding(encoding: &Encoding) -> CffResult<Vec<u8>> {
    let encoding = match encoding {
        Encoding::Custom(encoding) => encoding,
        Encoding::Predefined(..) => {
            return Err(CffError::InvalidArgument(
                "predefined encodings are referenced, not written".into(),
            ))
        }
    };

    let codes = encoding.codes();

    let n_codes = u8::try_from(codes.len())
        .map_err(|_| CffError::InvalidArgument("more than 255 encoded glyphs".into()))?;

    let code_ranges = ranges(codes);

    let mut out = Vec::new();

    if code_ranges.len() * 2 < codes.len() {
        out.push(1);
        out.push(code_ranges.len() as u8);
        for (first, n_left) in code_ranges {
            out.push(first);
            out.push(n_left as u8);
        }
    } else {
        out.push(0);
        out.push(n_codes);
        out.extend_from_slice(codes);
    }

    let supplements = encoding.supplements();

    if !supplements.is_empty() {
        out[0] |= 0x80;
        out.push(
            u8::try_from(supplements.len())
                .map_err(|_| CffError::InvalidArgument("more than 255 supplements".into()))?,
        );

        for supplement in supplements {
            out.push(supplement.code);
            out.extend(supplement.sid.to_be_bytes());
        }
    }

    Ok(out)
}

pub fn compile_fd_select(fd_select: &FdSelect) -> CffResult<Vec<u8>> {
    let fds = &fd_select.fds;

    match fd_select.format {
        0 => {
            let mut out = Vec::with_capacity(fds.len() + 1);
            out.push(0);
            out.extend_from_slice(fds);
            Ok(out)
        }
        3 => {
            let gid = |i: usize| {
                u16::try_from(i)
                    .map_err(|_| CffError::InvalidArgument("too many glyphs for FDSelect".into()))
            };

            let mut runs: Vec<(u16, u8)> = Vec::new();

            for (i, &fd) in fds.iter().enumerate() {
                if runs.last().map(|&(_, last_fd)| last_fd) != Some(fd) {
                    runs.push((gid(i)?, fd));
                }
            }

            let mut out = vec![3];
            out.extend((runs.len() as u16).to_be_bytes());

            for (first, fd) in runs {
                out.extend(first.to_be_bytes());
                out.push(fd);
            }

            // sentinel
            out.extend(gid(fds.len())?.to_be_bytes());

            Ok(out)
        }
        format => Err(CffError::UnsupportedFormat {
            table: "FDSelect",
            format,
        }),
    }
}

fn encode_charstring_number(n: f32) -> Vec<u8> {
    if n.fract() == 0.0 && (-32768.0..=32767.0).contains(&n) {
        return encode_integer(n as i32);
    }

    let mut out = vec![255];
    out.extend(F16Dot16::saturating_from_num(n).to_bits().to_be_bytes());
    out
}

/// Re-encode a decoded charstring program
///
/// A seac program gets back the `endchar` that decoding consumed, unless the
/// seac happened inside a subroutine.
pub fn encode_charstring(program: &CharstringProgram) -> Vec<u8> {
    let mut out = Vec::new();

    for token in &program.tokens {
        match token {
            Token::Number(n) => out.extend(encode_charstring_number(*n)),
            Token::Operator(op) => out.extend_from_slice(op.bytes()),
            Token::Mask { operator, mask } => {
                out.extend_from_slice(operator.bytes());
                out.extend_from_slice(mask);
            }
            Token::Reserved(b) => out.push(*b),
            Token::ReservedEscape(b) => out.extend([12, *b]),
        }
    }

    let ends_in_call = matches!(
        program.tokens.last(),
        Some(Token::Operator(Operator::CallSubr | Operator::CallGsubr))
    );

    if program.seac.is_some() && !ends_in_call {
        out.extend_from_slice(Operator::EndChar.bytes());
    }

    out
}

/// `[a b c d e f]` transformation matrix product, applying `m1` after `m2`
fn transform(m1: &[f64], m2: &[f64]) -> Vec<f64> {
    vec![
        m1[0] * m2[0] + m1[2] * m2[1],
        m1[1] * m2[0] + m1[3] * m2[1],
        m1[0] * m2[2] + m1[2] * m2[3],
        m1[1] * m2[2] + m1[3] * m2[3],
        m1[0] * m2[4] + m1[2] * m2[5] + m1[4],
        m1[1] * m2[4] + m1[3] * m2[5] + m1[5],
    ]
}

/// Serializes a [`CffFont`]
pub struct CffCompiler<'f, 'a> {
    font: &'f CffFont<'a>,
}

impl<'f, 'a> CffCompiler<'f, 'a> {
    pub fn new(font: &'f CffFont<'a>) -> Self {
        Self { font }
    }

    pub fn compile(&self) -> CffResult<Vec<u8>> {
        let font = self.font;
        let is_cid = font.is_cid();

        let mut top_dict = font.top_dict.clone();
        let mut fd_array = font.fd_array.clone();

        if is_cid {
            Self::fold_font_matrix(&mut top_dict, &mut fd_array)?;
        }

        if let Some(DictValue::Array(xuid)) = top_dict.dict.get("XUID") {
            if xuid.len() > MAX_XUID_LEN {
                top_dict.dict.remove("XUID");
            }
        }

        // every offset is rewritten, so each gets a placeholder
        top_dict.dict.set("charset", DictValue::Offset(0))?;
        top_dict.dict.set("CharStrings", DictValue::Offset(0))?;

        if let Some(Encoding::Custom(..)) = font.encoding {
            top_dict.dict.set("Encoding", DictValue::Offset(0))?;
        }

        if is_cid {
            top_dict.dict.set("FDSelect", DictValue::Offset(0))?;
            top_dict.dict.set("FDArray", DictValue::Offset(0))?;
        }

        let mut output = compile_header(&font.header);
        output.extend(compile_name_index(&font.names)?);

        let (top_dict_index, top_dict_trackers) =
            Self::compile_top_dicts(std::slice::from_mut(&mut top_dict), output.len(), false)?;
        output.extend(top_dict_index);

        output.extend(compile_string_index(&font.strings)?);
        output.extend(encode_index(&font.global_subrs)?);

        let top_dict_tracker = &top_dict_trackers[0];

        if top_dict.dict.has("Encoding") {
            match &font.encoding {
                Some(Encoding::Predefined(predefined)) => top_dict_tracker.set_entry_location(
                    "Encoding",
                    &[predefined.id() as usize],
                    &mut output,
                )?,
                Some(encoding @ Encoding::Custom(..)) => {
                    let encoding = compile_encoding(encoding)?;
                    top_dict_tracker.set_entry_location("Encoding", &[output.len()], &mut output)?;
                    output.extend(encoding);
                }
                // left as 0, the standard encoding
                None => {}
            }
        }

        match &font.charset {
            Charset::Predefined(predefined) if !is_cid => {
                top_dict_tracker.set_entry_location(
                    "charset",
                    &[predefined.id() as usize],
                    &mut output,
                )?;
            }
            charset => {
                let charset =
                    compile_charset(charset, font.num_glyphs(), &font.strings, is_cid)?;
                top_dict_tracker.set_entry_location("charset", &[output.len()], &mut output)?;
                output.extend(charset);
            }
        }

        let char_strings = compile_char_strings(&font.char_strings)?;
        top_dict_tracker.set_entry_location("CharStrings", &[output.len()], &mut output)?;
        output.extend(char_strings);

        if is_cid {
            let fd_select = font.fd_select.as_ref().ok_or(CffError::InvalidArgument(
                "CID-keyed font has no FDSelect".into(),
            ))?;

            top_dict_tracker.set_entry_location("FDSelect", &[output.len()], &mut output)?;
            output.extend(compile_fd_select(fd_select)?);

            let (fd_array_index, fd_trackers) =
                Self::compile_top_dicts(&mut fd_array, output.len(), true)?;
            top_dict_tracker.set_entry_location("FDArray", &[output.len()], &mut output)?;
            output.extend(fd_array_index);

            Self::compile_private_dicts(&fd_array, &fd_trackers, &mut output)?;
        }

        Self::compile_private_dicts(
            std::slice::from_ref(&top_dict),
            &top_dict_trackers,
            &mut output,
        )?;

        // some consumers reject fonts ending in an INDEX with empty data
        output.push(0);

        Ok(output)
    }

    /// Move the Top DICT's FontMatrix into every Font DICT, combining it with
    /// the Font DICT's own matrix
    fn fold_font_matrix(top_dict: &mut TopDict, fd_array: &mut [TopDict]) -> CffResult<()> {
        let base = match top_dict.dict.remove("FontMatrix") {
            Some(base) => base.to_numbers(),
            None => return Ok(()),
        };

        for font_dict in fd_array {
            let matrix = match font_dict.dict.get("FontMatrix") {
                Some(matrix) => transform(&base, &matrix.to_numbers()),
                None => base.clone(),
            };

            font_dict.dict.set("FontMatrix", DictValue::Array(matrix))?;
        }

        Ok(())
    }

    fn compile_top_dicts(
        dicts: &mut [TopDict],
        length: usize,
        remove_cid_keys: bool,
    ) -> CffResult<(Vec<u8>, Vec<OffsetTracker>)> {
        let mut trackers = Vec::with_capacity(dicts.len());
        let mut objects = Vec::with_capacity(dicts.len());

        for font_dict in dicts {
            if remove_cid_keys {
                for key in CID_ONLY_KEYS {
                    font_dict.dict.remove(key);
                }
            }

            if !font_dict.dict.has("Private") {
                font_dict
                    .dict
                    .set("Private", DictValue::SizeOffset { size: 0, offset: 0 })?;
            }

            let mut tracker = OffsetTracker::new();
            objects.push(compile_dict(&font_dict.dict, &mut tracker)?);
            tracker.offset(length);
            trackers.push(tracker);
        }

        let index = compile_index(
            &objects.iter().map(Vec::as_slice).collect::<Vec<_>>(),
            &mut trackers,
        )?;

        Ok((index, trackers))
    }

    fn compile_private_dicts(
        dicts: &[TopDict],
        trackers: &[OffsetTracker],
        output: &mut Vec<u8>,
    ) -> CffResult<()> {
        for (font_dict, tracker) in dicts.iter().zip(trackers.iter()) {
            let private = &font_dict.private;

            let mut dict = private.dict.clone();

            if private.subrs.is_some() {
                dict.set("Subrs", DictValue::Offset(0))?;
            } else {
                dict.remove("Subrs");
            }

            let mut private_tracker = OffsetTracker::new();
            let data = compile_dict(&dict, &mut private_tracker)?;

            let mut output_len = output.len();
            private_tracker.offset(output_len);

            // an empty Private DICT is written as [0, 0]
            if data.is_empty() {
                output_len = 0;
            }

            tracker.set_entry_location("Private", &[data.len(), output_len], output)?;
            output.extend(&data);

            if let Some(subrs) = &private.subrs {
                private_tracker.set_entry_location("Subrs", &[data.len()], output)?;
                output.extend(encode_index(subrs)?);
            }
        }

        Ok(())
    }
}
