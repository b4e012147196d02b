//! Query canonicalization
//!
//! Literals become `?`, whitespace runs become one space, and the hostname
//! is dropped from a leading `/* host:route */` annotation so the same route
//! coming from many application hosts aggregates under one key.

use super::tokenizer::{TokenKind, Tokenizer};

/// Placeholder-list collapse: `IN (?, ?, ?)` becomes `IN (?)`
const PLACEHOLDER_SEPARATOR: &str = "?, ";

/// Produces aggregation text from raw query bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct Canonicalizer {
    tokenizer: Tokenizer,
}

impl Canonicalizer {
    #[must_use]
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }

    /// Reduce `query` to its canonical text.
    #[must_use]
    pub fn canonicalize(&self, query: &[u8]) -> String {
        let mut out: Vec<u8> = Vec::with_capacity(query.len());
        for (kind, token) in self.tokenizer.tokens(query) {
            match kind {
                TokenKind::Word | TokenKind::Other => out.extend_from_slice(token),
                TokenKind::Number | TokenKind::Quoted => out.push(b'?'),
                TokenKind::Whitespace => out.push(b' '),
            }
        }

        let text = String::from_utf8_lossy(&out);
        let parts: Vec<&str> = text.splitn(5, ' ').collect();
        let text = match parts.as_slice() {
            [head, "/*", annotation, "*/", rest] => match annotation.split_once(':') {
                Some((_, route)) => format!("{head} /* {route} */ {rest}"),
                None => text.to_string(),
            },
            _ => text.to_string(),
        };

        text.replace(PLACEHOLDER_SEPARATOR, "")
    }

    /// Route named in a `/* host:route */` annotation of the raw query.
    ///
    /// Queries without the annotation yield `(unknown) ` followed by their
    /// canonical text.
    #[must_use]
    pub fn extract_route(&self, query: &[u8]) -> String {
        let raw = String::from_utf8_lossy(query);
        let parts: Vec<&str> = raw.splitn(5, ' ').collect();
        if parts.len() >= 4 && parts[1] == "/*" && parts[3] == "*/" {
            return match parts[2].split_once(':') {
                Some((_, route)) => route.to_string(),
                None => parts[2].to_string(),
            };
        }
        format!("(unknown) {}", self.canonicalize(query))
    }
}
