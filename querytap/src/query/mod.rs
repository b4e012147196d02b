//! Query text handling
//!
//! Turns raw request payloads into aggregation keys:
//! - `tokenizer`: byte-level lexer (words, literals, whitespace, other)
//! - `canonical`: literal stripping and route-annotation cleanup
//! - `format`: user-supplied output-format programs (`#s:#q`)

pub mod canonical;
pub mod format;
pub mod tokenizer;

pub use canonical::Canonicalizer;
pub use format::{FormatItem, FormatProgram, RequestContext};
pub use tokenizer::{TokenKind, Tokenizer};
