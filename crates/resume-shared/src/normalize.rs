//! Canonicalization of loosely-shaped report payloads.
//!
//! Report forms in the field send the same quantity under several names
//! (`totalFaithful`, `total`, `offrande`, ...) and often as strings with a
//! comma decimal separator. [`normalize_payload`] maps those onto the
//! canonical report keys and coerces numeric-looking strings into numbers.
//! It never rejects anything: values that cannot be coerced are passed
//! through untouched and left for validation to report.

use serde_json::{Map, Number, Value};

/// Accepted synonym -> canonical report key.
const SYNONYMS: &[(&str, &str)] = &[
    ("totalFaithful", "total_attendees"),
    ("total_faithful", "total_attendees"),
    ("totalFaithfulCount", "total_attendees"),
    ("total", "total_attendees"),
    ("menCount", "men"),
    ("men_count", "men"),
    ("womenCount", "women"),
    ("women_count", "women"),
    ("childrenCount", "children"),
    ("children_count", "children"),
    ("kids", "children"),
    ("youthCount", "youth"),
    ("youth_count", "youth"),
    ("offrande", "offering"),
    ("offre", "offering"),
    ("don", "offering"),
    ("note", "notes"),
    ("predicateur", "preacher"),
    ("report_date", "date"),
];

/// Canonical keys whose values are numeric.
const NUMERIC_FIELDS: &[&str] = &[
    "total_attendees",
    "men",
    "women",
    "children",
    "youth",
    "offering",
];

/// Canonical name for `key`, or `None` when the key has no synonym entry.
pub fn canonical_key(key: &str) -> Option<&'static str> {
    SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == key)
        .map(|(_, canonical)| *canonical)
}

pub fn is_numeric_field(key: &str) -> bool {
    NUMERIC_FIELDS.contains(&key)
}

/// Map synonym keys onto canonical keys and coerce numeric fields.
///
/// A key that is already canonical wins over any of its synonyms.
pub fn normalize_payload(payload: &Map<String, Value>) -> Map<String, Value> {
    let mut normalized = Map::new();

    for (key, value) in payload.iter().filter(|(k, _)| canonical_key(k).is_some()) {
        if let Some(target) = canonical_key(key) {
            normalized.insert(target.to_string(), coerce_for(target, value));
        }
    }

    for (key, value) in payload.iter().filter(|(k, _)| canonical_key(k).is_none()) {
        normalized.insert(key.clone(), coerce_for(key, value));
    }

    normalized
}

fn coerce_for(key: &str, value: &Value) -> Value {
    if is_numeric_field(key) {
        coerce_numeric(value)
    } else {
        value.clone()
    }
}

/// Coerce a numeric-looking value.
///
/// Numbers and `null` pass through. Strings are trimmed (empty becomes
/// `null`), grouping spaces are dropped, plain integer literals become
/// integers and anything else is parsed as a float with `,` read as the
/// decimal separator. Unparseable input is returned unchanged.
pub fn coerce_numeric(value: &Value) -> Value {
    let Value::String(raw) = value else {
        return value.clone();
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }

    let compact: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .collect();

    if is_integer_literal(&compact) {
        if let Ok(n) = compact.parse::<i64>() {
            return Value::Number(n.into());
        }
    }

    compact
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| value.clone())
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn maps_synonyms_and_coerces_strings() {
        let payload = object(json!({
            "totalFaithful": "42",
            "menCount": "10",
            "offrande": "1 000,50",
        }));

        let normalized = normalize_payload(&payload);

        assert_eq!(
            Value::Object(normalized),
            json!({ "total_attendees": 42, "men": 10, "offering": 1000.5 })
        );
    }

    #[test]
    fn unknown_keys_pass_through() {
        let payload = object(json!({ "preacher": "Pasteur Kouassi", "extra": "x" }));
        let normalized = normalize_payload(&payload);
        assert_eq!(normalized["preacher"], "Pasteur Kouassi");
        assert_eq!(normalized["extra"], "x");
    }

    #[test]
    fn canonical_key_wins_over_synonym() {
        let payload = object(json!({ "total": "5", "total_attendees": 9 }));
        let normalized = normalize_payload(&payload);
        assert_eq!(normalized["total_attendees"], 9);
        assert_eq!(normalized.len(), 1);
    }

    #[test]
    fn synonyms_cover_every_text_field() {
        let payload = object(json!({
            "predicateur": "Frère Jean",
            "report_date": "2024-03-06",
            "note": "culte de louange",
            "kids": "3",
        }));
        let normalized = normalize_payload(&payload);
        assert_eq!(normalized["preacher"], "Frère Jean");
        assert_eq!(normalized["date"], "2024-03-06");
        assert_eq!(normalized["notes"], "culte de louange");
        assert_eq!(normalized["children"], 3);
    }

    #[test]
    fn non_numeric_fields_are_not_coerced() {
        let payload = object(json!({ "preacher": "12" }));
        assert_eq!(normalize_payload(&payload)["preacher"], "12");
    }

    #[test]
    fn coercion_rules() {
        assert_eq!(coerce_numeric(&json!(" 17 ")), json!(17));
        assert_eq!(coerce_numeric(&json!("-1")), json!(-1));
        assert_eq!(coerce_numeric(&json!("2500.75")), json!(2500.75));
        assert_eq!(coerce_numeric(&json!("12,5")), json!(12.5));
        assert_eq!(coerce_numeric(&json!("")), Value::Null);
        assert_eq!(coerce_numeric(&json!(null)), Value::Null);
        assert_eq!(coerce_numeric(&json!(3.5)), json!(3.5));
        assert_eq!(coerce_numeric(&json!("beaucoup")), json!("beaucoup"));
        assert_eq!(coerce_numeric(&json!("inf")), json!("inf"));
        assert_eq!(coerce_numeric(&json!(true)), json!(true));
    }
}
