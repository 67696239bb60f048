//! Reading and writing Compact Font Format (CFF) fonts, as embedded in PDF
//! `FontFile3` streams

pub mod cff;
pub mod error;
pub mod parse_binary;

pub use cff::{CffCompiler, CffFont, CffParser, ParseOptions};
pub use error::{CffError, CffResult};
