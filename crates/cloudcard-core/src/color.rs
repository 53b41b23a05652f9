//! Colors and the card palette

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An 8-bit sRGB color, written as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0x00, 0x00, 0x00);
    pub const WHITE: Self = Self::new(0xFF, 0xFF, 0xFF);
    pub const SILVER: Self = Self::new(0xC0, 0xC0, 0xC0);
    pub const GREENSCREEN: Self = Self::new(0x00, 0xFF, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a `0xRRGGBB` literal
    pub const fn from_hex(hex: u32) -> Self {
        Self::new((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    /// Linear-ish float channels in 0..1 (no gamma conversion)
    pub fn to_f32(self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }

    /// RGBA bytes with the given alpha
    pub fn with_alpha(self, a: u8) -> [u8; 4] {
        [self.r, self.g, self.b, a]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 {
            return Err(format!("expected #rrggbb, got '{}'", s));
        }
        let value = u32::from_str_radix(hex, 16).map_err(|e| format!("'{}': {}", s, e))?;
        Ok(Self::from_hex(value))
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The fixed palette offered for the card body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardColor {
    /// Matte black
    #[default]
    Black,
    Red,
    Green,
    Gold,
    Blue,
}

impl CardColor {
    /// All palette entries in display order
    pub fn all() -> &'static [CardColor] {
        &[
            Self::Black,
            Self::Red,
            Self::Green,
            Self::Gold,
            Self::Blue,
        ]
    }

    pub fn rgb(self) -> Rgb {
        match self {
            Self::Black => Rgb::from_hex(0x00_0000),
            Self::Red => Rgb::from_hex(0xCC_0000),
            Self::Green => Rgb::from_hex(0x00_6600),
            Self::Gold => Rgb::from_hex(0xCC_9900),
            Self::Blue => Rgb::from_hex(0x00_00CC),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Red => "red",
            Self::Green => "green",
            Self::Gold => "gold",
            Self::Blue => "blue",
        }
    }

    /// Look up a palette entry by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let color: Rgb = "#cc9900".parse().expect("valid hex");
        assert_eq!(color, CardColor::Gold.rgb());
        assert_eq!(color.to_string(), "#cc9900");
    }

    #[test]
    fn test_invalid_hex() {
        assert!("#ccc".parse::<Rgb>().is_err());
        assert!("zzzzzz".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_palette_lookup() {
        assert_eq!(CardColor::from_name("BLUE"), Some(CardColor::Blue));
        assert_eq!(CardColor::from_name("purple"), None);
        assert_eq!(CardColor::default().rgb(), Rgb::BLACK);
    }
}
