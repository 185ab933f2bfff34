//! Category model.

use crate::libs::error::{Error, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY_COLOR: &str = "#FFFFFF";

/// Categories inserted when `seed_default_categories` is enabled.
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[("Work", "#FF5733"), ("Personal", "#33FF57"), ("Study", "#3357FF")];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub color: String,
}

pub fn validate_category_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidName {
            name: name.to_string(),
            reason: "must not be empty",
        });
    }
    Ok(trimmed.to_string())
}

/// Accepts `#RRGGBB`, case-insensitive, and returns it upper-cased.
/// `None` yields the default white.
pub fn validate_color(color: Option<&str>) -> Result<String> {
    let Some(color) = color.map(str::trim) else {
        return Ok(DEFAULT_CATEGORY_COLOR.to_string());
    };

    let valid = color.len() == 7 && color.starts_with('#') && color.chars().skip(1).all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(Error::InvalidColor(color.to_string()));
    }
    Ok(color.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_defaults_to_white() {
        assert_eq!(validate_color(None).unwrap(), "#FFFFFF");
    }

    #[test]
    fn color_is_normalized() {
        assert_eq!(validate_color(Some("#ff5733")).unwrap(), "#FF5733");
    }

    #[test]
    fn malformed_colors_are_rejected() {
        for bad in ["red", "#FFF", "FF5733", "#GG5733", "#FF57331"] {
            assert!(validate_color(Some(bad)).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn blank_category_name_is_rejected() {
        assert!(validate_category_name("  ").is_err());
        assert_eq!(validate_category_name(" Work ").unwrap(), "Work");
    }
}
