//! Output-format programs
//!
//! A format string such as `#s:#q` compiles into literal text and
//! placeholders that build the aggregation key for every request:
//!
//! | placeholder | expands to                                   |
//! |-------------|----------------------------------------------|
//! | `#s`        | flow key (`ip:port` of the client)           |
//! | `#i`        | client address only                          |
//! | `#r`        | route from a `/* host:route */` annotation   |
//! | `#q`        | canonical query (raw text when unsanitized)  |
//!
//! Placeholders are case-insensitive. `##` is a literal `#`, any other
//! `#x` is kept as literal text, and a trailing lone `#` is dropped.

use super::canonical::Canonicalizer;
use crate::domain::{ConfigError, FlowKey};

/// One step of a compiled format program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatItem {
    Text(String),
    Source,
    SourceIp,
    Route,
    Query,
}

/// Compiled format string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatProgram {
    items: Vec<FormatItem>,
}

/// Inputs a program can draw from when rendering one request
pub struct RequestContext<'a> {
    pub flow: &'a FlowKey,
    pub payload: &'a [u8],
    pub canonicalizer: &'a Canonicalizer,
    /// `false` in unsanitized mode: `#q` renders the raw query
    pub canonicalize: bool,
}

impl FormatProgram {
    /// Compile a format string.
    ///
    /// # Errors
    /// `ConfigError::EmptyFormat` if the string is blank.
    pub fn parse(format: &str) -> Result<Self, ConfigError> {
        let format = format.trim();
        if format.is_empty() {
            return Err(ConfigError::EmptyFormat);
        }

        let mut items = Vec::new();
        let mut text = String::new();
        let mut special = false;

        for ch in format.chars() {
            if ch == '#' {
                if special {
                    text.push('#');
                }
                special = !special;
                continue;
            }

            if !special {
                text.push(ch);
                continue;
            }
            special = false;

            let placeholder = match ch.to_ascii_lowercase() {
                's' => FormatItem::Source,
                'i' => FormatItem::SourceIp,
                'r' => FormatItem::Route,
                'q' => FormatItem::Query,
                _ => {
                    text.push('#');
                    text.push(ch);
                    continue;
                }
            };
            if !text.is_empty() {
                items.push(FormatItem::Text(std::mem::take(&mut text)));
            }
            items.push(placeholder);
        }

        if !text.is_empty() {
            items.push(FormatItem::Text(text));
        }
        Ok(Self { items })
    }

    #[must_use]
    pub fn items(&self) -> &[FormatItem] {
        &self.items
    }

    /// Build the aggregation key for one request.
    #[must_use]
    pub fn render(&self, ctx: &RequestContext<'_>) -> String {
        let mut out = String::new();
        for item in &self.items {
            match item {
                FormatItem::Text(text) => out.push_str(text),
                FormatItem::Source => out.push_str(&ctx.flow.to_string()),
                FormatItem::SourceIp => out.push_str(&ctx.flow.addr()),
                FormatItem::Route => out.push_str(&ctx.canonicalizer.extract_route(ctx.payload)),
                FormatItem::Query if ctx.canonicalize => {
                    out.push_str(&ctx.canonicalizer.canonicalize(ctx.payload));
                }
                FormatItem::Query => out.push_str(&String::from_utf8_lossy(ctx.payload)),
            }
        }
        out
    }
}
