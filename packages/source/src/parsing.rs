//! Shared property parsing for warning feeds.
//!
//! Feeds publish the same attribute as a number, a numeric string, an empty
//! string, or null depending on the layer; these helpers fold all of that
//! into `Option`s.

use chrono::NaiveDate;
use serde_json::Value;

/// Category code table of the IMD district warning layer.
pub const CATEGORY_CODES: &[(u32, &str)] = &[
    (1, "No Warning"),
    (2, "Heavy Rain"),
    (3, "Heavy Snow"),
    (4, "Thunderstorms & Lightning, Squall etc"),
    (5, "Hailstorm"),
    (6, "Dust Storm"),
    (7, "Dust Raising Winds"),
    (8, "Strong Surface Winds"),
    (9, "Heat Wave"),
    (10, "Hot Day"),
    (11, "Warm Night"),
    (12, "Cold Wave"),
    (13, "Cold Day"),
    (14, "Ground Frost"),
    (15, "Fog"),
    (16, "Very Heavy Rain"),
    (17, "Extremely Heavy Rain"),
];

/// Parses an integer from a JSON number or numeric string.
///
/// Empty strings, null, fractional numbers, and garbage yield `None`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn clean_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parses a colour code; anything outside `u8` is dropped.
#[must_use]
pub fn clean_color(value: Option<&Value>) -> Option<u8> {
    clean_int(value).and_then(|i| u8::try_from(i).ok())
}

/// Returns non-empty text, stringifying scalars.
#[must_use]
pub fn clean_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}

/// Decodes a comma-separated list of category codes into warning text
/// joined by `" + "`.
///
/// Unknown codes are dropped; if no code is known the result is `None`.
#[must_use]
pub fn category_text(value: Option<&Value>) -> Option<String> {
    let raw = clean_text(value)?;
    let texts: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .filter_map(|c| {
            let code: u32 = c.parse().ok()?;
            CATEGORY_CODES
                .iter()
                .find(|(k, _)| *k == code)
                .map(|(_, text)| *text)
        })
        .collect();

    if texts.is_empty() {
        None
    } else {
        Some(texts.join(" + "))
    }
}

/// Parses a feed date. Accepts `YYYY-MM-DD`, `DD-MM-YYYY`, `YYYY/MM/DD`,
/// and timestamps whose first ten characters are one of those.
#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let head = s.get(..10).unwrap_or(s);
    ["%Y-%m-%d", "%d-%m-%Y", "%Y/%m/%d", "%d/%m/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(head, fmt).ok())
}

/// Parses a feed date held in a JSON value.
#[must_use]
pub fn parse_date_value(value: Option<&Value>) -> Option<NaiveDate> {
    clean_text(value).as_deref().and_then(parse_date)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn clean_int_variants() {
        assert_eq!(clean_int(Some(&json!(3))), Some(3));
        assert_eq!(clean_int(Some(&json!("4"))), Some(4));
        assert_eq!(clean_int(Some(&json!(2.0))), Some(2));
        assert_eq!(clean_int(Some(&json!(2.5))), None);
        assert_eq!(clean_int(Some(&json!(""))), None);
        assert_eq!(clean_int(Some(&json!("abc"))), None);
        assert_eq!(clean_int(Some(&Value::Null)), None);
        assert_eq!(clean_int(None), None);
    }

    #[test]
    fn category_codes_decode_and_join() {
        assert_eq!(
            category_text(Some(&json!("2, 15"))).as_deref(),
            Some("Heavy Rain + Fog")
        );
        assert_eq!(
            category_text(Some(&json!("4"))).as_deref(),
            Some("Thunderstorms & Lightning, Squall etc")
        );
        assert_eq!(category_text(Some(&json!("99"))), None);
        assert_eq!(
            category_text(Some(&json!("99,12"))).as_deref(),
            Some("Cold Wave")
        );
        assert_eq!(category_text(Some(&json!(""))), None);
        assert_eq!(category_text(Some(&json!(16))).as_deref(), Some("Very Heavy Rain"));
    }

    #[test]
    fn parses_feed_dates() {
        let d = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(parse_date("2024-06-01"), Some(d));
        assert_eq!(parse_date("2024-06-01Z"), Some(d));
        assert_eq!(parse_date("2024-06-01T05:30:00"), Some(d));
        assert_eq!(parse_date("01-06-2024"), Some(d));
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn blank_text_is_none() {
        assert_eq!(clean_text(Some(&json!("  "))), None);
        assert_eq!(clean_text(Some(&json!(" Fog "))).as_deref(), Some("Fog"));
    }
}
