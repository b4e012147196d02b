//! Query lexer.
//!
//! Known limits of the lexer, kept for compatibility of aggregation keys:
//! - `-5` and `1.5` are not single numeric tokens; the sign and the dot are
//!   separate `Other` tokens.
//! - Words swallow trailing digits (`s2compiled` is one word).
//! - A quote inside a differently-quoted literal is fine, but an
//!   unterminated literal runs to the end of input.

/// Token classes produced by [`Tokenizer::scan`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Quoted,
    Number,
    Whitespace,
    Other,
}

/// Splits raw query bytes into tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct Tokenizer {
    /// Return the whole input as a single `Other` token
    passthrough: bool,
}

impl Tokenizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A tokenizer that never splits its input (uncleaned verbose output)
    #[must_use]
    pub fn passthrough() -> Self {
        Self { passthrough: true }
    }

    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    /// Scan the first token of `query`, returning its length and kind.
    ///
    /// # Panics
    /// If `query` is empty. Callers only scan non-empty remainders.
    #[must_use]
    pub fn scan(&self, query: &[u8]) -> (usize, TokenKind) {
        assert!(!query.is_empty(), "scan called with empty query");

        if self.passthrough {
            return (query.len(), TokenKind::Other);
        }

        let first = query[0];
        match first {
            b'\'' | b'"' => (scan_quoted(query, first), TokenKind::Quoted),
            b'0'..=b'9' => (run_length(query, |b| b.is_ascii_digit()), TokenKind::Number),
            b if is_space(b) => (run_length(query, is_space), TokenKind::Whitespace),
            b if b.is_ascii_alphabetic() => (run_length(query, is_word_byte), TokenKind::Word),
            _ => (1, TokenKind::Other),
        }
    }

    /// Iterate over all tokens of `query` as `(kind, bytes)` pairs.
    pub fn tokens<'q>(&self, query: &'q [u8]) -> impl Iterator<Item = (TokenKind, &'q [u8])> {
        let tokenizer = *self;
        let mut rest = query;
        std::iter::from_fn(move || {
            if rest.is_empty() {
                return None;
            }
            let (len, kind) = tokenizer.scan(rest);
            let (token, tail) = rest.split_at(len);
            rest = tail;
            Some((kind, token))
        })
    }
}

fn is_space(b: u8) -> bool {
    b == b' ' || (9..=13).contains(&b)
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'$' || b == b'_'
}

/// Length of the run starting at index 0 whose tail bytes satisfy `pred`.
fn run_length(query: &[u8], pred: impl Fn(u8) -> bool) -> usize {
    query[1..].iter().position(|&b| !pred(b)).map_or(query.len(), |i| i + 1)
}

fn scan_quoted(query: &[u8], delimiter: u8) -> usize {
    let mut escaped = false;
    for (i, &b) in query.iter().enumerate().skip(1) {
        if b == delimiter {
            if escaped {
                escaped = false;
                continue;
            }
            return i + 1;
        }
        escaped = b == b'\\';
    }
    query.len()
}
