//! RGB colors and the default bucket palette.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An sRGB color, serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub [u8; 3]);

impl Color {
    /// Build a color from its channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    /// Hex notation with a leading `#`, lowercase.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = String;

    /// Parses `#rrggbb` or `rrggbb`, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("`{s}` is not a #rrggbb color"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| format!("`{s}` is not a #rrggbb color"))
        };
        Ok(Self([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Bucket colors in table order. Tables longer than the palette reuse the
/// last entry.
pub const PALETTE: [Color; 10] = [
    Color::rgb(0x52, 0xd7, 0x26),
    Color::rgb(0xff, 0xaf, 0x00),
    Color::rgb(0xff, 0x73, 0x00),
    Color::rgb(0x7b, 0xdd, 0xdc),
    Color::rgb(0xdd, 0x1b, 0x79),
    Color::rgb(0xc7, 0x58, 0xd0),
    Color::rgb(0x9b, 0x46, 0xce),
    Color::rgb(0x8d, 0x6c, 0xef),
    Color::rgb(0x83, 0x99, 0xec),
    Color::rgb(0xdd, 0x1b, 0x1b),
];

/// Color of voxels that have not been classified yet.
pub const UNCLASSIFIED: Color = Color::rgb(0x05, 0x74, 0x00);

/// Palette color for bucket `index`.
pub fn palette_color(index: usize) -> Color {
    PALETTE[index.min(PALETTE.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        let c: Color = "#FFAF00".parse().unwrap();
        assert_eq!(c, Color::rgb(0xff, 0xaf, 0x00));
        assert_eq!(c.to_hex(), "#ffaf00");
        assert_eq!("057400".parse::<Color>().unwrap(), UNCLASSIFIED);
    }

    #[test]
    fn test_reject_malformed() {
        assert!("#fff".parse::<Color>().is_err());
        assert!("#gg0000".parse::<Color>().is_err());
        assert!("#ééé".parse::<Color>().is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let json = serde_json::to_string(&PALETTE[0]).unwrap();
        assert_eq!(json, "\"#52d726\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PALETTE[0]);
        assert!(serde_json::from_str::<Color>("\"blue\"").is_err());
    }

    #[test]
    fn test_palette_saturates() {
        assert_eq!(palette_color(3).to_hex(), "#7bdddc");
        assert_eq!(palette_color(42), PALETTE[9]);
    }
}
