use fixed::{types::extra::U16, FixedI32};

use crate::{
    error::{CffError, CffResult},
    parse_binary::BinaryParser,
};

use super::{
    index::CffIndex,
    operator::{Operator, OperatorKind, ESCAPE},
};

pub(crate) type F16Dot16 = FixedI32<U16>;

/// Type 2 charstrings may not hold more than 48 operands at once
const MAX_STACK: usize = 48;

/// Maximum subroutine call depth
const MAX_SUBR_NESTING: usize = 10;

const TRANSIENT_ARRAY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f32),
    Operator(Operator),
    /// `hintmask` or `cntrmask` together with the mask bytes that follow it
    Mask { operator: Operator, mask: Vec<u8> },
    /// Unassigned one-byte operator
    Reserved(u8),
    /// Unassigned two-byte operator, holding the byte after the escape
    ReservedEscape(u8),
}

/// Accented character built from a base and accent glyph by a four-operand
/// `endchar`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seac {
    pub adx: f32,
    pub ady: f32,
    pub bchar: f32,
    pub achar: f32,
}

impl Seac {
    pub fn base_code(&self) -> u8 {
        self.bchar as u8
    }

    pub fn accent_code(&self) -> u8 {
        self.achar as u8
    }
}

/// One glyph's decoded charstring
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharstringProgram {
    pub tokens: Vec<Token>,
    /// Number of stem hints declared, including those declared in subroutines
    pub stem_count: usize,
    /// Width operand preceding the first stack-clearing operator, relative to
    /// `nominalWidthX`
    pub width: Option<f32>,
    /// Set when the program ends in a four-operand `endchar`; the operands
    /// stay in `tokens`, the `endchar` does not
    pub seac: Option<Seac>,
}

impl CharstringProgram {
    pub fn operators(&self) -> impl Iterator<Item = Operator> + '_ {
        self.tokens.iter().filter_map(|token| match token {
            Token::Operator(op) | Token::Mask { operator: op, .. } => Some(*op),
            _ => None,
        })
    }
}

/// Fixed-capacity operand stack
#[derive(Debug)]
struct OperandStack {
    values: [f32; MAX_STACK],
    len: usize,
}

impl OperandStack {
    fn new() -> Self {
        Self {
            values: [0.0; MAX_STACK],
            len: 0,
        }
    }

    fn push(&mut self, n: f32) -> CffResult<()> {
        if self.len == MAX_STACK {
            return Err(CffError::StackOverflow);
        }

        self.values[self.len] = n;
        self.len += 1;

        Ok(())
    }

    fn pop(&mut self) -> CffResult<f32> {
        if self.len == 0 {
            return Err(CffError::StackUnderflow);
        }

        self.len -= 1;

        Ok(self.values[self.len])
    }

    fn len(&self) -> usize {
        self.len
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn clear(&mut self) {
        self.len = 0;
    }

    fn as_slice(&self) -> &[f32] {
        &self.values[..self.len]
    }

    fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.values[..self.len]
    }
}

/// Decodes Type 2 charstrings into [`CharstringProgram`]s
///
/// Subroutine INDEXes are optional; a program that calls into a missing
/// INDEX fails to decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharstringDecoder<'b> {
    seac_analysis: bool,
    global_subrs: Option<&'b CffIndex<'b>>,
    local_subrs: Option<&'b CffIndex<'b>>,
}

impl<'b> CharstringDecoder<'b> {
    pub fn new(seac_analysis: bool) -> Self {
        Self {
            seac_analysis,
            global_subrs: None,
            local_subrs: None,
        }
    }

    pub fn with_subrs(
        mut self,
        global_subrs: Option<&'b CffIndex<'b>>,
        local_subrs: Option<&'b CffIndex<'b>>,
    ) -> Self {
        self.global_subrs = global_subrs;
        self.local_subrs = local_subrs;
        self
    }

    pub fn decode(&self, buffer: &'b [u8]) -> CffResult<CharstringProgram> {
        let mut interpreter = CffCharStringInterpreter::new(*self, buffer);

        interpreter.run()?;

        Ok(CharstringProgram {
            tokens: interpreter.tokens,
            stem_count: interpreter.stem_count,
            width: interpreter.width,
            seac: interpreter.seac,
        })
    }
}

/// Subroutine numbers are stored biased by an amount depending on the size of
/// the INDEX
pub(crate) fn subr_bias(count: usize) -> i32 {
    if count < 1240 {
        107
    } else if count < 33900 {
        1131
    } else {
        32768
    }
}

enum Flow {
    /// The buffer ran out
    Exhausted,
    Return,
    EndChar,
}

struct CffCharStringInterpreter<'b> {
    buffer: &'b [u8],
    cursor: usize,
    decoder: CharstringDecoder<'b>,
    operand_stack: OperandStack,
    transient: [f32; TRANSIENT_ARRAY_LEN],
    tokens: Vec<Token>,
    stem_count: usize,
    width: Option<f32>,
    first_stack_clearing_op: bool,
    depth: usize,
    seac: Option<Seac>,
    random_state: u32,
}

impl<'b> CffCharStringInterpreter<'b> {
    fn new(decoder: CharstringDecoder<'b>, buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            cursor: 0,
            decoder,
            operand_stack: OperandStack::new(),
            transient: [0.0; TRANSIENT_ARRAY_LEN],
            tokens: Vec::new(),
            stem_count: 0,
            width: None,
            first_stack_clearing_op: true,
            depth: 0,
            seac: None,
            random_state: 0x2545_f491,
        }
    }

    /// Only the glyph's own program is recorded, not the subroutines it calls
    fn emit(&mut self, token: Token) {
        if self.depth == 0 {
            self.tokens.push(token);
        }
    }

    fn push(&mut self, n: f32) -> CffResult<()> {
        self.operand_stack.push(n)
    }

    fn pop(&mut self) -> CffResult<f32> {
        self.operand_stack.pop()
    }

    fn push_literal(&mut self, n: f32) -> CffResult<()> {
        self.push(n)?;
        self.emit(Token::Number(n));
        Ok(())
    }

    fn parse_number(&mut self, b0: u8) -> CffResult<()> {
        let n = match b0 {
            28 => self.parse_i16()? as f32,
            32..=246 => (b0 as i32 - 139) as f32,
            247..=250 => {
                let b1 = self.next()? as i32;
                ((b0 as i32 - 247) * 256 + b1 + 108) as f32
            }
            251..=254 => {
                let b1 = self.next()? as i32;
                (-(b0 as i32 - 251) * 256 - b1 - 108) as f32
            }
            255 => F16Dot16::from_bits(self.parse_i32()?).to_num::<f32>(),
            _ => unreachable!("{} is not a charstring number", b0),
        };

        self.push_literal(n)
    }

    fn run(&mut self) -> CffResult<Flow> {
        while let Some(b0) = self.peek() {
            self.cursor += 1;

            let flow = match b0 {
                ESCAPE => {
                    let b1 = self.next()?;
                    match Operator::from_escape(b1) {
                        Some(op) => self.execute(op)?,
                        None => {
                            log::debug!("reserved charstring operator 12 {}", b1);
                            self.emit(Token::ReservedEscape(b1));
                            None
                        }
                    }
                }
                // a trailing zero byte stands in for endchar
                0 if self.is_eof() => self.execute(Operator::EndChar)?,
                28 | 32..=255 => {
                    self.parse_number(b0)?;
                    None
                }
                b0 => match Operator::from_byte(b0) {
                    Some(op) => self.execute(op)?,
                    None => {
                        log::debug!("reserved charstring operator {}", b0);
                        self.emit(Token::Reserved(b0));
                        None
                    }
                },
            };

            if let Some(flow) = flow {
                return Ok(flow);
            }
        }

        Ok(Flow::Exhausted)
    }

    /// Record the optional width operand if this is the first stack-clearing
    /// operator and `has_width` says there is a surplus operand
    fn maybe_take_width(&mut self, has_width: bool) {
        if self.first_stack_clearing_op && has_width {
            self.width = self.operand_stack.as_slice().first().copied();
        }

        self.first_stack_clearing_op = false;
    }

    fn execute(&mut self, op: Operator) -> CffResult<Option<Flow>> {
        match op.kind() {
            OperatorKind::Stem => self.stem(op)?,
            OperatorKind::Mask => self.mask(op)?,
            OperatorKind::MoveTo { min } => {
                let len = self.operand_stack.len();
                if len < min {
                    return Err(CffError::StackUnderflow);
                }
                self.maybe_take_width(len > min);
                self.operand_stack.clear();
                self.emit(Token::Operator(op));
            }
            OperatorKind::EndChar => {
                self.end_char()?;
                return Ok(Some(Flow::EndChar));
            }
            OperatorKind::Path { min } => {
                if self.operand_stack.len() < min {
                    return Err(CffError::StackUnderflow);
                }
                self.first_stack_clearing_op = false;
                self.operand_stack.clear();
                self.emit(Token::Operator(op));
            }
            OperatorKind::CallSubr | OperatorKind::CallGsubr => {
                self.emit(Token::Operator(op));
                let subrs = if op == Operator::CallSubr {
                    self.decoder.local_subrs
                } else {
                    self.decoder.global_subrs
                };
                if let Flow::EndChar = self.call_subroutine(op, subrs)? {
                    return Ok(Some(Flow::EndChar));
                }
            }
            OperatorKind::Return => {
                self.emit(Token::Operator(op));
                return Ok(Some(Flow::Return));
            }
            OperatorKind::DotSection => {
                self.operand_stack.clear();
                self.emit(Token::Operator(op));
            }
            OperatorKind::Arithmetic => {
                self.arithmetic(op)?;
                self.emit(Token::Operator(op));
            }
        }

        Ok(None)
    }

    /// hstem, vstem, hstemhm, vstemhm: every pair of operands declares a stem
    fn stem(&mut self, op: Operator) -> CffResult<()> {
        let len = self.operand_stack.len();

        if len < 2 {
            return Err(CffError::StackUnderflow);
        }

        self.maybe_take_width(len % 2 == 1);
        self.stem_count += len / 2;
        self.operand_stack.clear();
        self.emit(Token::Operator(op));

        Ok(())
    }

    /// hintmask and cntrmask: operands left on the stack are an implicit
    /// vstem, and one mask bit follows per declared stem
    fn mask(&mut self, op: Operator) -> CffResult<()> {
        let len = self.operand_stack.len();

        if !self.operand_stack.is_empty() {
            self.maybe_take_width(len % 2 == 1);
            self.stem_count += len / 2;
            self.operand_stack.clear();
        } else {
            self.maybe_take_width(false);
        }

        let num_bytes = (self.stem_count + 7) / 8;
        let mask = self.slice(num_bytes)?.to_vec();

        self.emit(Token::Mask { operator: op, mask });

        Ok(())
    }

    fn end_char(&mut self) -> CffResult<()> {
        let len = self.operand_stack.len();
        let has_width = self.first_stack_clearing_op && (len == 1 || len == 5);
        let args = len - has_width as usize;

        self.maybe_take_width(has_width);

        if self.decoder.seac_analysis && args == 4 {
            let achar = self.pop()?;
            let bchar = self.pop()?;
            let ady = self.pop()?;
            let adx = self.pop()?;

            self.seac = Some(Seac {
                adx,
                ady,
                bchar,
                achar,
            });
        } else {
            self.emit(Token::Operator(Operator::EndChar));
        }

        self.operand_stack.clear();

        Ok(())
    }

    fn call_subroutine(&mut self, op: Operator, subrs: Option<&'b CffIndex<'b>>) -> CffResult<Flow> {
        let subrs = subrs.ok_or_else(|| {
            CffError::MalformedFont(format!("{} without a subroutine INDEX", op.mnemonic()).into())
        })?;

        if self.depth >= MAX_SUBR_NESTING {
            return Err(CffError::MalformedFont(
                "subroutines nested too deeply".into(),
            ));
        }

        let n = self.pop()?;
        let subr_number = (n as i64).checked_add(subr_bias(subrs.count()) as i64);

        let subr = subr_number
            .and_then(|idx| usize::try_from(idx).ok())
            .and_then(|idx| subrs.get(idx))
            .ok_or_else(|| {
                CffError::MalformedFont(
                    format!("{} operand {} is out of bounds", op.mnemonic(), n).into(),
                )
            })?;

        let buffer = std::mem::replace(&mut self.buffer, subr);
        let cursor = std::mem::replace(&mut self.cursor, 0);
        self.depth += 1;

        let flow = self.run();

        self.depth -= 1;
        self.buffer = buffer;
        self.cursor = cursor;

        flow
    }

    fn next_random(&mut self) -> f32 {
        // xorshift32, mapped into (0, 1]
        let mut x = self.random_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.random_state = x;

        ((x % 0xffff) + 1) as f32 / 0xffff as f32
    }

    fn arithmetic(&mut self, op: Operator) -> CffResult<()> {
        match op {
            Operator::And => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(bool_to_num(a != 0.0 && b != 0.0))?;
            }
            Operator::Or => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(bool_to_num(a != 0.0 || b != 0.0))?;
            }
            Operator::Not => {
                let a = self.pop()?;
                self.push(bool_to_num(a == 0.0))?;
            }
            Operator::Abs => {
                let a = self.pop()?;
                self.push(a.abs())?;
            }
            Operator::Add => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(a + b)?;
            }
            Operator::Sub => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(a - b)?;
            }
            Operator::Div => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(if b == 0.0 { 0.0 } else { a / b })?;
            }
            Operator::Neg => {
                let a = self.pop()?;
                self.push(-a)?;
            }
            Operator::Eq => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(bool_to_num(a == b))?;
            }
            Operator::Drop => {
                self.pop()?;
            }
            Operator::Put => {
                let i = self.pop()?;
                let val = self.pop()?;
                if let Some(slot) = transient_index(i).map(|i| &mut self.transient[i]) {
                    *slot = val;
                }
            }
            Operator::Get => {
                let i = self.pop()?;
                let val = transient_index(i).map_or(0.0, |i| self.transient[i]);
                self.push(val)?;
            }
            Operator::IfElse => {
                let v2 = self.pop()?;
                let v1 = self.pop()?;
                let s2 = self.pop()?;
                let s1 = self.pop()?;
                self.push(if v1 <= v2 { s1 } else { s2 })?;
            }
            Operator::Random => {
                let n = self.next_random();
                self.push(n)?;
            }
            Operator::Mul => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(a * b)?;
            }
            Operator::Sqrt => {
                let a = self.pop()?;
                self.push(a.max(0.0).sqrt())?;
            }
            Operator::Dup => {
                let a = self.pop()?;
                self.push(a)?;
                self.push(a)?;
            }
            Operator::Exch => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(b)?;
                self.push(a)?;
            }
            Operator::Index => {
                let i = self.pop()?;
                let len = self.operand_stack.len();
                // a negative index copies the top element
                let i = if i < 0.0 { 0 } else { i as usize };
                if i >= len {
                    return Err(CffError::StackUnderflow);
                }
                let val = self.operand_stack.as_slice()[len - 1 - i];
                self.push(val)?;
            }
            Operator::Roll => {
                let j = self.pop()? as i64;
                let n = self.pop()?;
                if n < 0.0 || n as usize > self.operand_stack.len() {
                    return Err(CffError::StackUnderflow);
                }
                let n = n as usize;
                if n > 0 {
                    let len = self.operand_stack.len();
                    let shift = j.rem_euclid(n as i64) as usize;
                    self.operand_stack.as_mut_slice()[len - n..].rotate_right(shift);
                }
            }
            _ => unreachable!("{} is not an arithmetic operator", op.mnemonic()),
        }

        Ok(())
    }
}

fn bool_to_num(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn transient_index(i: f32) -> Option<usize> {
    if i >= 0.0 && (i as usize) < TRANSIENT_ARRAY_LEN {
        Some(i as usize)
    } else {
        None
    }
}

impl<'b> BinaryParser<'b> for CffCharStringInterpreter<'b> {
    fn buffer(&self) -> &'b [u8] {
        self.buffer
    }
    fn cursor(&self) -> usize {
        self.cursor
    }
    fn cursor_mut(&mut self) -> &mut usize {
        &mut self.cursor
    }
}
