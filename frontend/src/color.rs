use std::{error::Error, fmt, str::FromStr};

use crossterm::style::Color;

pub const DEFAULT_BACKGROUND: Rgb = Rgb::new(0, 0, 0);
pub const DEFAULT_FOREGROUND: Rgb = Rgb::new(255, 255, 255);

/// Terminal true-colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Rgb {
        Rgb { r, g, b }
    }
}

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Color {
        Color::Rgb {
            r: rgb.r,
            g: rgb.g,
            b: rgb.b,
        }
    }
}

impl FromStr for Rgb {
    type Err = RgbParseError;

    fn from_str(s: &str) -> Result<Rgb, RgbParseError> {
        let s = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix('#'))
            .unwrap_or(s);

        if s.len() != 6 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(RgbParseError(s.to_string()));
        }

        let channel = |i: usize| {
            u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| RgbParseError(s.to_string()))
        };

        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbParseError(String);

impl fmt::Display for RgbParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse hex color {:?}, expected 0xRRGGBB", self.0)
    }
}

impl Error for RgbParseError {}
