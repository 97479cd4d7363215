//! Terminal color representation.
//!
//! A cell color is one of:
//! - the default foreground/background (resolved by the renderer's scheme,
//!   never by the core)
//! - a 256-color palette index
//! - a 24-bit RGB value

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Color {
    /// Sentinel for "whatever the scheme decides at render time".
    #[default]
    Default,
    /// 256-color palette index (0-15 are the ANSI colors).
    Indexed(u8),
    /// 24-bit true color.
    Rgb(Rgb),
}

impl Color {
    pub fn is_default(&self) -> bool {
        matches!(self, Color::Default)
    }
}

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }
}

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Color::Rgb(rgb)
    }
}
