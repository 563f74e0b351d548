//! CSS color parsing and luminance.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

static RGB_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*([0-9]*\.?[0-9]+)\s*)?\)$",
    )
    .expect("invalid rgb regex")
});

/// An sRGB color with alpha.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel (255 = opaque).
    pub a: u8,
}

/// Error returned when a string is not a supported color.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unsupported color `{0}`")]
pub struct ParseColorError(pub String);

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Create an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Same color with a different alpha.
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// CSS hex notation: `#rrggbb`, or `#rrggbbaa` when not opaque.
    #[must_use]
    pub fn to_css(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// WCAG relative luminance in `0.0..=1.0`. Alpha is ignored.
    #[must_use]
    pub fn relative_luminance(&self) -> f64 {
        fn channel(c: u8) -> f64 {
            let c = f64::from(c) / 255.0;
            if c <= 0.039_28 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * channel(self.r) + 0.7152 * channel(self.g) + 0.0722 * channel(self.b)
    }

    /// WCAG contrast ratio against another color, in `1.0..=21.0`.
    #[must_use]
    pub fn contrast_ratio(&self, other: &Self) -> f64 {
        let a = self.relative_luminance();
        let b = other.relative_luminance();
        let (light, dark) = if a > b { (a, b) } else { (b, a) };
        (light + 0.05) / (dark + 0.05)
    }

    /// Whether text on this background reads better in white than in black.
    #[must_use]
    pub fn is_dark(&self) -> bool {
        self.contrast_ratio(&Self::WHITE) > self.contrast_ratio(&Self::BLACK)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    /// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(...)` or `rgba(...)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ParseColorError(s.to_owned());

        if let Some(hex) = trimmed.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(err);
        }

        let caps = RGB_PATTERN.captures(trimmed).ok_or_else(err)?;
        let channel = |i: usize| -> Option<u8> { caps.get(i)?.as_str().parse().ok() };
        let (r, g, b) = (
            channel(1).ok_or_else(err)?,
            channel(2).ok_or_else(err)?,
            channel(3).ok_or_else(err)?,
        );
        let a = match caps.get(4) {
            Some(m) => {
                let alpha: f64 = m.as_str().parse().map_err(|_| err())?;
                if !(0.0..=1.0).contains(&alpha) {
                    return Err(err());
                }
                alpha_channel(alpha)
            }
            None => 255,
        };
        Ok(Self { r, g, b, a })
    }
}

/// Convert a `0.0..=1.0` alpha to a channel value.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn alpha_channel(alpha: f64) -> u8 {
    (alpha.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let short = |i: usize| -> Option<u8> {
        let v = u8::from_str_radix(hex.get(i..=i)?, 16).ok()?;
        Some(v * 17)
    };
    let long = |i: usize| -> Option<u8> { u8::from_str_radix(hex.get(i..i + 2)?, 16).ok() };

    match hex.len() {
        3 => Some(Color::rgb(short(0)?, short(1)?, short(2)?)),
        4 => Some(Color::rgb(short(0)?, short(1)?, short(2)?).with_alpha(short(3)?)),
        6 => Some(Color::rgb(long(0)?, long(2)?, long(4)?)),
        8 => Some(Color::rgb(long(0)?, long(2)?, long(4)?).with_alpha(long(6)?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!("#fff".parse::<Color>(), Ok(Color::WHITE));
        assert_eq!("#000000".parse::<Color>(), Ok(Color::BLACK));
        assert_eq!("#0d1117".parse::<Color>(), Ok(Color::rgb(0x0d, 0x11, 0x17)));
        assert_eq!("#f008".parse::<Color>(), Ok(Color::rgb(255, 0, 0).with_alpha(0x88)));
        assert_eq!(
            "#11223344".parse::<Color>(),
            Ok(Color::rgb(0x11, 0x22, 0x33).with_alpha(0x44))
        );
    }

    #[test]
    fn test_parse_rgb_functions() {
        assert_eq!("rgb(1, 2, 3)".parse::<Color>(), Ok(Color::rgb(1, 2, 3)));
        assert_eq!(
            "rgba(255,255,255,0.5)".parse::<Color>(),
            Ok(Color::WHITE.with_alpha(128))
        );
    }

    #[test]
    fn test_parse_invalid() {
        for input in ["", "#ff", "#gggggg", "red", "rgb(256, 0, 0)", "rgba(0,0,0,2)", "#12345"] {
            assert!(input.parse::<Color>().is_err(), "{input} should not parse");
        }
    }

    #[test]
    fn test_to_css() {
        assert_eq!(Color::rgb(0x0d, 0x11, 0x17).to_css(), "#0d1117");
        assert_eq!(Color::BLACK.with_alpha(0x33).to_css(), "#00000033");
    }

    #[test]
    fn test_luminance_extremes() {
        assert!(Color::BLACK.relative_luminance().abs() < 0.001);
        assert!((Color::WHITE.relative_luminance() - 1.0).abs() < 0.001);
        assert!((Color::BLACK.contrast_ratio(&Color::WHITE) - 21.0).abs() < 0.001);
    }

    #[test]
    fn test_is_dark() {
        assert!(Color::rgb(0x0d, 0x11, 0x17).is_dark());
        assert!(Color::rgb(0x12, 0x12, 0x12).is_dark());
        assert!(!Color::WHITE.is_dark());
        assert!(!Color::rgb(0xf6, 0xf8, 0xfa).is_dark());
        // Mid gray (sRGB 127) still reads better with black text
        assert!(!Color::rgb(127, 127, 127).is_dark());
    }
}
