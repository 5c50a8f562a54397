use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse the leading integer of a cell.
///
/// Leading whitespace and a sign are accepted, parsing stops at the first
/// non-digit (`"250.5"` is 250, `"12kg"` is 12). Anything without a leading
/// digit, including an empty cell, is `None` rather than zero.
pub fn parse_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_end = rest
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }

    let magnitude: i64 = rest[..digits_end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Deserialize an optional integer from whatever the trackers stored:
/// a JSON integer, a float (truncated), a numeric string, or null.
pub fn deserialize_lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => parse_int(&s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_prefix_rules() {
        assert_eq!(parse_int("2000"), Some(2000));
        assert_eq!(parse_int("  -15"), Some(-15));
        assert_eq!(parse_int("+7"), Some(7));
        assert_eq!(parse_int("250.5"), Some(250));
        assert_eq!(parse_int("12kg"), Some(12));
    }

    #[test]
    fn test_parse_int_rejects_non_numeric() {
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int("-"), None);
        assert_eq!(parse_int(".5"), None);
    }

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "deserialize_lenient_int")]
        amount: Option<i64>,
    }

    #[test]
    fn test_lenient_int_accepts_stored_shapes() {
        let parse = |json: &str| serde_json::from_str::<Holder>(json).unwrap().amount;
        assert_eq!(parse(r#"{"amount":250}"#), Some(250));
        assert_eq!(parse(r#"{"amount":250.9}"#), Some(250));
        assert_eq!(parse(r#"{"amount":"300"}"#), Some(300));
        assert_eq!(parse(r#"{"amount":null}"#), None);
        assert_eq!(parse(r#"{}"#), None);
    }
}
