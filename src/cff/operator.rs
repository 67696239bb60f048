//! Type 2 charstring operators
//!
//! One-byte operators occupy codes 0 through 31; code 12 escapes into a
//! second table selected by the following byte.

/// Escape byte introducing a two-byte operator
pub(crate) const ESCAPE: u8 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Hstem,
    Vstem,
    Vmoveto,
    Rlineto,
    Hlineto,
    Vlineto,
    Rrcurveto,
    CallSubr,
    Return,
    EndChar,
    Hstemhm,
    HintMask,
    CntrMask,
    Rmoveto,
    Hmoveto,
    Vstemhm,
    Rcurveline,
    Rlinecurve,
    Vvcurveto,
    Hhcurveto,
    CallGsubr,
    Vhcurveto,
    Hvcurveto,

    DotSection,
    And,
    Or,
    Not,
    Abs,
    Add,
    Sub,
    Div,
    Neg,
    Eq,
    Drop,
    Put,
    Get,
    IfElse,
    Random,
    Mul,
    Sqrt,
    Dup,
    Exch,
    Index,
    Roll,
    Hflex,
    Flex,
    Hflex1,
    Flex1,
}

/// How an operator interacts with the operand stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperatorKind {
    /// Declares stem hints from pairs of operands
    Stem,
    /// Followed by hint mask bytes
    Mask,
    /// Stack-clearing move that may be preceded by the glyph width
    MoveTo { min: usize },
    EndChar,
    /// Path construction; clears the stack
    Path { min: usize },
    CallSubr,
    CallGsubr,
    Return,
    DotSection,
    /// Arithmetic and storage operators evaluated in place on the stack
    Arithmetic,
}

impl Operator {
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            1 => Self::Hstem,
            3 => Self::Vstem,
            4 => Self::Vmoveto,
            5 => Self::Rlineto,
            6 => Self::Hlineto,
            7 => Self::Vlineto,
            8 => Self::Rrcurveto,
            10 => Self::CallSubr,
            11 => Self::Return,
            14 => Self::EndChar,
            18 => Self::Hstemhm,
            19 => Self::HintMask,
            20 => Self::CntrMask,
            21 => Self::Rmoveto,
            22 => Self::Hmoveto,
            23 => Self::Vstemhm,
            24 => Self::Rcurveline,
            25 => Self::Rlinecurve,
            26 => Self::Vvcurveto,
            27 => Self::Hhcurveto,
            29 => Self::CallGsubr,
            30 => Self::Vhcurveto,
            31 => Self::Hvcurveto,
            _ => return None,
        })
    }

    /// Look up the operator following an escape byte
    pub fn from_escape(b: u8) -> Option<Self> {
        Some(match b {
            0 => Self::DotSection,
            3 => Self::And,
            4 => Self::Or,
            5 => Self::Not,
            9 => Self::Abs,
            10 => Self::Add,
            11 => Self::Sub,
            12 => Self::Div,
            14 => Self::Neg,
            15 => Self::Eq,
            18 => Self::Drop,
            20 => Self::Put,
            21 => Self::Get,
            22 => Self::IfElse,
            23 => Self::Random,
            24 => Self::Mul,
            26 => Self::Sqrt,
            27 => Self::Dup,
            28 => Self::Exch,
            29 => Self::Index,
            30 => Self::Roll,
            34 => Self::Hflex,
            35 => Self::Flex,
            36 => Self::Hflex1,
            37 => Self::Flex1,
            _ => return None,
        })
    }

    /// The byte sequence that encodes this operator
    pub fn bytes(self) -> &'static [u8] {
        match self {
            Self::Hstem => &[1],
            Self::Vstem => &[3],
            Self::Vmoveto => &[4],
            Self::Rlineto => &[5],
            Self::Hlineto => &[6],
            Self::Vlineto => &[7],
            Self::Rrcurveto => &[8],
            Self::CallSubr => &[10],
            Self::Return => &[11],
            Self::EndChar => &[14],
            Self::Hstemhm => &[18],
            Self::HintMask => &[19],
            Self::CntrMask => &[20],
            Self::Rmoveto => &[21],
            Self::Hmoveto => &[22],
            Self::Vstemhm => &[23],
            Self::Rcurveline => &[24],
            Self::Rlinecurve => &[25],
            Self::Vvcurveto => &[26],
            Self::Hhcurveto => &[27],
            Self::CallGsubr => &[29],
            Self::Vhcurveto => &[30],
            Self::Hvcurveto => &[31],
            Self::DotSection => &[ESCAPE, 0],
            Self::And => &[ESCAPE, 3],
            Self::Or => &[ESCAPE, 4],
            Self::Not => &[ESCAPE, 5],
            Self::Abs => &[ESCAPE, 9],
            Self::Add => &[ESCAPE, 10],
            Self::Sub => &[ESCAPE, 11],
            Self::Div => &[ESCAPE, 12],
            Self::Neg => &[ESCAPE, 14],
            Self::Eq => &[ESCAPE, 15],
            Self::Drop => &[ESCAPE, 18],
            Self::Put => &[ESCAPE, 20],
            Self::Get => &[ESCAPE, 21],
            Self::IfElse => &[ESCAPE, 22],
            Self::Random => &[ESCAPE, 23],
            Self::Mul => &[ESCAPE, 24],
            Self::Sqrt => &[ESCAPE, 26],
            Self::Dup => &[ESCAPE, 27],
            Self::Exch => &[ESCAPE, 28],
            Self::Index => &[ESCAPE, 29],
            Self::Roll => &[ESCAPE, 30],
            Self::Hflex => &[ESCAPE, 34],
            Self::Flex => &[ESCAPE, 35],
            Self::Hflex1 => &[ESCAPE, 36],
            Self::Flex1 => &[ESCAPE, 37],
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Hstem => "hstem",
            Self::Vstem => "vstem",
            Self::Vmoveto => "vmoveto",
            Self::Rlineto => "rlineto",
            Self::Hlineto => "hlineto",
            Self::Vlineto => "vlineto",
            Self::Rrcurveto => "rrcurveto",
            Self::CallSubr => "callsubr",
            Self::Return => "return",
            Self::EndChar => "endchar",
            Self::Hstemhm => "hstemhm",
            Self::HintMask => "hintmask",
            Self::CntrMask => "cntrmask",
            Self::Rmoveto => "rmoveto",
            Self::Hmoveto => "hmoveto",
            Self::Vstemhm => "vstemhm",
            Self::Rcurveline => "rcurveline",
            Self::Rlinecurve => "rlinecurve",
            Self::Vvcurveto => "vvcurveto",
            Self::Hhcurveto => "hhcurveto",
            Self::CallGsubr => "callgsubr",
            Self::Vhcurveto => "vhcurveto",
            Self::Hvcurveto => "hvcurveto",
            Self::DotSection => "dotsection",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::Abs => "abs",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Div => "div",
            Self::Neg => "neg",
            Self::Eq => "eq",
            Self::Drop => "drop",
            Self::Put => "put",
            Self::Get => "get",
            Self::IfElse => "ifelse",
            Self::Random => "random",
            Self::Mul => "mul",
            Self::Sqrt => "sqrt",
            Self::Dup => "dup",
            Self::Exch => "exch",
            Self::Index => "index",
            Self::Roll => "roll",
            Self::Hflex => "hflex",
            Self::Flex => "flex",
            Self::Hflex1 => "hflex1",
            Self::Flex1 => "flex1",
        }
    }

    pub(crate) fn kind(self) -> OperatorKind {
        match self {
            Self::Hstem | Self::Vstem | Self::Hstemhm | Self::Vstemhm => OperatorKind::Stem,
            Self::HintMask | Self::CntrMask => OperatorKind::Mask,
            Self::Rmoveto => OperatorKind::MoveTo { min: 2 },
            Self::Hmoveto | Self::Vmoveto => OperatorKind::MoveTo { min: 1 },
            Self::EndChar => OperatorKind::EndChar,
            Self::Rlineto => OperatorKind::Path { min: 2 },
            Self::Hlineto | Self::Vlineto => OperatorKind::Path { min: 1 },
            Self::Rrcurveto => OperatorKind::Path { min: 6 },
            Self::Rcurveline | Self::Rlinecurve => OperatorKind::Path { min: 8 },
            Self::Vvcurveto | Self::Hhcurveto | Self::Vhcurveto | Self::Hvcurveto => {
                OperatorKind::Path { min: 4 }
            }
            Self::Hflex => OperatorKind::Path { min: 7 },
            Self::Flex => OperatorKind::Path { min: 13 },
            Self::Hflex1 => OperatorKind::Path { min: 9 },
            Self::Flex1 => OperatorKind::Path { min: 11 },
            Self::CallSubr => OperatorKind::CallSubr,
            Self::CallGsubr => OperatorKind::CallGsubr,
            Self::Return => OperatorKind::Return,
            Self::DotSection => OperatorKind::DotSection,
            Self::And
            | Self::Or
            | Self::Not
            | Self::Abs
            | Self::Add
            | Self::Sub
            | Self::Div
            | Self::Neg
            | Self::Eq
            | Self::Drop
            | Self::Put
            | Self::Get
            | Self::IfElse
            | Self::Random
            | Self::Mul
            | Self::Sqrt
            | Self::Dup
            | Self::Exch
            | Self::Index
            | Self::Roll => OperatorKind::Arithmetic,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn one_byte_operators_round_trip() {
        for b in 0..32 {
            if let Some(op) = Operator::from_byte(b) {
                assert_eq!(op.bytes(), &[b]);
            }
        }
    }

    #[test]
    fn escaped_operators_round_trip() {
        for b in 0..=255 {
            if let Some(op) = Operator::from_escape(b) {
                assert_eq!(op.bytes(), &[ESCAPE, b]);
            }
        }
    }

    #[test]
    fn reserved_codes_are_unassigned() {
        for b in [0, 2, 9, 12, 13, 15, 16, 17, 28] {
            assert_eq!(Operator::from_byte(b), None);
        }

        assert_eq!(Operator::from_escape(1), None);
        assert_eq!(Operator::from_escape(38), None);
    }

    #[test]
    fn vhcurveto_shares_the_dict_real_number_code() {
        assert_eq!(Operator::from_byte(30), Some(Operator::Vhcurveto));
        assert_eq!(Operator::Vhcurveto.mnemonic(), "vhcurveto");
    }
}
