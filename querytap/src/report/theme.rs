//! Report colour scheme
//!
//! Terminal colours for the periodic report, one per column group.

use crossterm::style::{style, Color, Stylize};
use std::fmt::Display;

pub const TOTALS: Color = Color::Red;
pub const COUNT: Color = Color::Yellow;
pub const RATE: Color = Color::Cyan;
pub const BYTES: Color = Color::Green;
pub const KEY: Color = Color::White;

/// Applies colours, or passes text through when colour is off
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    #[must_use]
    pub fn plain() -> Self {
        Self::new(false)
    }

    #[must_use]
    pub fn paint(&self, text: impl Display, color: Color) -> String {
        if self.enabled {
            style(text).with(color).to_string()
        } else {
            text.to_string()
        }
    }
}
