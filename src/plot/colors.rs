//! Hex, RGB and decimal color conversions

use crate::errors::{CodeBaseError, Result};

/// Parse a hex color of 3 or 6 digits, with or without a leading `#`.
///
/// `"#f00"` expands to `"ff0000"` and yields `(255, 0, 0)`.
///
/// # Errors
///
/// Returns an error for any other length or non-hex characters.
pub fn hex_to_rgb(value: &str) -> Result<(u8, u8, u8)> {
    let value = value.trim_matches('#');
    let expanded: String = match value.chars().count() {
        3 => value.chars().flat_map(|c| [c, c]).collect(),
        6 => value.to_string(),
        _ => {
            return Err(CodeBaseError::InvalidInput(
                "HEX value must be of length 3 or 6.".to_string(),
            ))
        }
    };
    let channel = |i: usize| {
        expanded
            .get(i..i + 2)
            .and_then(|digits| u8::from_str_radix(digits, 16).ok())
            .ok_or_else(|| CodeBaseError::InvalidInput(format!("Invalid HEX value '{value}'")))
    };
    Ok((channel(0)?, channel(2)?, channel(4)?))
}

/// Scale RGB values to the range `[0, 1]`.
#[must_use]
pub fn rgb_to_dec(value: [f64; 3]) -> [f64; 3] {
    value.map(|v| v / 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#f00").unwrap(), (255, 0, 0));
        assert_eq!(hex_to_rgb("fff").unwrap(), (255, 255, 255));
        assert_eq!(hex_to_rgb("#1a2B3c").unwrap(), (26, 43, 60));
        assert!(hex_to_rgb("#ff00").is_err());
        assert!(hex_to_rgb("zzzzzz").is_err());
    }

    #[test]
    fn test_rgb_to_dec() {
        assert_eq!(rgb_to_dec([255.0, 0.0, 51.0]), [1.0, 0.0, 0.2]);
    }
}
