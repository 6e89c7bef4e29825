//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, Money, Percentage, ResultEngine};

/// Parse a UUID coming from a caller and return a labeled error on failure.
pub fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value.trim()).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Trimmed display name, NFC normalized, with inner whitespace collapsed.
pub(crate) fn normalize_display_name(value: &str, label: &str) -> ResultEngine<String> {
    let collapsed = value
        .nfc()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if collapsed.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    if collapsed.chars().count() > 100 {
        return Err(EngineError::InvalidName(format!(
            "{label} name must be at most 100 characters"
        )));
    }
    Ok(collapsed)
}

/// Case-insensitive key used for per-family name uniqueness.
pub(crate) fn normalize_name_key(display: &str) -> String {
    display.nfkc().collect::<String>().to_lowercase()
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Accepts `#RRGGBB` (case-insensitive) and returns it upper-cased.
pub(crate) fn normalize_color(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    let valid = trimmed.len() == 7
        && trimmed.starts_with('#')
        && trimmed[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(EngineError::InvalidRequest(format!(
            "invalid color '{trimmed}': expected #RRGGBB"
        )));
    }
    Ok(trimmed.to_ascii_uppercase())
}

pub(crate) fn require_positive_amount(amount: Money, label: &str) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(EngineError::InvalidAmount(format!("{label} must be > 0")));
    }
    Ok(())
}

/// Budget category targets must be in `(0, 100]`.
pub(crate) fn validate_target_percentage(value: Percentage) -> ResultEngine<()> {
    if value.basis_points() <= 0 || value > Percentage::HUNDRED {
        return Err(EngineError::InvalidPercentage(format!(
            "target percentage must be > 0 and <= 100, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_collapsed_and_keyed_case_insensitively() {
        let display = normalize_display_name("  Eating   Out ", "category").unwrap();
        assert_eq!(display, "Eating Out");
        assert_eq!(normalize_name_key(&display), "eating out");
        assert_eq!(normalize_name_key("HOUSING"), normalize_name_key("housing"));
        assert!(normalize_display_name("   ", "category").is_err());
    }

    #[test]
    fn colors_must_be_hex() {
        assert_eq!(normalize_color("#a1b2c3").unwrap(), "#A1B2C3");
        assert!(normalize_color("a1b2c3").is_err());
        assert!(normalize_color("#GGGGGG").is_err());
    }

    #[test]
    fn target_percentage_bounds() {
        assert!(validate_target_percentage(Percentage::HUNDRED).is_ok());
        assert!(validate_target_percentage(Percentage::ZERO).is_err());
        assert!(validate_target_percentage(Percentage::from_percent(101.0).unwrap()).is_err());
    }

    #[test]
    fn malformed_uuid_is_invalid_id() {
        assert!(matches!(
            parse_uuid("not-a-uuid", "payment"),
            Err(EngineError::InvalidId(_))
        ));
    }
}
