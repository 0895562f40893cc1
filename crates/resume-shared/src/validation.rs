//! Validation of normalized report payloads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::PREACHER_MAX_LEN;
use crate::error::FieldErrors;
use crate::normalize::normalize_payload;
use crate::week::parse_date;

const MISSING: &str = "Missing data for required field.";
const NULL: &str = "Field may not be null.";
const NOT_STRING: &str = "Not a valid string.";
const NOT_INTEGER: &str = "Not a valid integer.";
const NOT_NUMBER: &str = "Not a valid number.";
const NEGATIVE: &str = "Must be greater than or equal to 0.";
const BAD_DATE: &str = "Invalid date, expected format YYYY-MM-DD.";

/// Canonical, validated report fields ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportInput {
    pub date: NaiveDate,
    pub preacher: String,
    pub total_attendees: i64,
    pub men: i64,
    pub women: i64,
    pub children: i64,
    pub youth: i64,
    pub offering: f64,
    pub notes: Option<String>,
}

/// Normalize a raw payload and validate the result.
pub fn normalize_and_validate(raw: &Map<String, Value>) -> Result<ReportInput, FieldErrors> {
    validate(&normalize_payload(raw))
}

/// Validate an already-normalized payload, collecting every field error.
///
/// Unknown keys are ignored. Sub-counts are not checked against
/// `total_attendees`.
pub fn validate(fields: &Map<String, Value>) -> Result<ReportInput, FieldErrors> {
    let mut errors = FieldErrors::new();

    let date = required(fields, "date", &mut errors).and_then(|v| {
        let parsed = v.as_str().and_then(parse_date);
        if parsed.is_none() {
            errors.add("date", BAD_DATE);
        }
        parsed
    });

    let preacher = required(fields, "preacher", &mut errors).and_then(|v| match v.as_str() {
        Some(s) => {
            let len = s.chars().count();
            if (1..=PREACHER_MAX_LEN).contains(&len) {
                Some(s.to_string())
            } else {
                errors.add(
                    "preacher",
                    format!("Length must be between 1 and {PREACHER_MAX_LEN}."),
                );
                None
            }
        }
        None => {
            errors.add("preacher", NOT_STRING);
            None
        }
    });

    let total_attendees = required(fields, "total_attendees", &mut errors)
        .and_then(|v| count(v, "total_attendees", &mut errors));

    let men = optional_count(fields, "men", &mut errors);
    let women = optional_count(fields, "women", &mut errors);
    let children = optional_count(fields, "children", &mut errors);
    let youth = optional_count(fields, "youth", &mut errors);

    let offering = match fields.get("offering") {
        None | Some(Value::Null) => Some(0.0),
        Some(v) => match v.as_f64() {
            Some(amount) if amount >= 0.0 => Some(amount),
            Some(_) => {
                errors.add("offering", NEGATIVE);
                None
            }
            None => {
                errors.add("offering", NOT_NUMBER);
                None
            }
        },
    };

    let notes = match fields.get("notes") {
        None | Some(Value::Null) => Some(None),
        Some(Value::String(s)) => Some(Some(s.clone())),
        Some(_) => {
            errors.add("notes", NOT_STRING);
            None
        }
    };

    match (
        date,
        preacher,
        total_attendees,
        men,
        women,
        children,
        youth,
        offering,
        notes,
    ) {
        (
            Some(date),
            Some(preacher),
            Some(total_attendees),
            Some(men),
            Some(women),
            Some(children),
            Some(youth),
            Some(offering),
            Some(notes),
        ) if errors.is_empty() => Ok(ReportInput {
            date,
            preacher,
            total_attendees,
            men,
            women,
            children,
            youth,
            offering,
            notes,
        }),
        _ => Err(errors),
    }
}

/// Present and non-null, or record why not.
fn required<'a>(
    fields: &'a Map<String, Value>,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<&'a Value> {
    match fields.get(field) {
        None => {
            errors.add(field, MISSING);
            None
        }
        Some(Value::Null) => {
            errors.add(field, NULL);
            None
        }
        Some(value) => Some(value),
    }
}

/// Optional head count; absent or `null` counts as zero.
fn optional_count(fields: &Map<String, Value>, field: &str, errors: &mut FieldErrors) -> Option<i64> {
    match fields.get(field) {
        None | Some(Value::Null) => Some(0),
        Some(value) => count(value, field, errors),
    }
}

/// Non-negative integer. Integral floats such as `42.0` are accepted.
fn count(value: &Value, field: &str, errors: &mut FieldErrors) -> Option<i64> {
    let n = value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    });

    match n {
        Some(n) if n >= 0 => Some(n),
        Some(_) => {
            errors.add(field, NEGATIVE);
            None
        }
        None => {
            errors.add(field, NOT_INTEGER);
            None
        }
    }
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

    fn valid_payload() -> Map<String, Value> {
        object(json!({
            "date": "2024-03-06",
            "preacher": "Pasteur Yao",
            "total_attendees": 50,
        }))
    }

    #[test]
    fn minimal_payload_fills_defaults() {
        let input = validate(&valid_payload()).unwrap();
        assert_eq!(input.date, NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
        assert_eq!(input.total_attendees, 50);
        assert_eq!((input.men, input.women, input.children, input.youth), (0, 0, 0, 0));
        assert_eq!(input.offering, 0.0);
        assert_eq!(input.notes, None);
    }

    #[test]
    fn explicit_nulls_become_zero() {
        let mut payload = valid_payload();
        payload.insert("men".into(), Value::Null);
        payload.insert("offering".into(), Value::Null);
        payload.insert("notes".into(), Value::Null);

        let input = validate(&payload).unwrap();
        assert_eq!(input.men, 0);
        assert_eq!(input.offering, 0.0);
    }

    #[test]
    fn missing_preacher_is_reported_as_required() {
        let mut payload = valid_payload();
        payload.remove("preacher");

        let errors = validate(&payload).unwrap_err();
        assert_eq!(errors.messages("preacher"), [MISSING.to_string()]);
    }

    #[test]
    fn negative_total_is_a_range_violation() {
        let mut payload = valid_payload();
        payload.insert("total_attendees".into(), json!(-1));

        let errors = validate(&payload).unwrap_err();
        assert_eq!(errors.messages("total_attendees"), [NEGATIVE.to_string()]);
    }

    #[test]
    fn all_errors_are_reported_together() {
        let payload = object(json!({
            "date": "06/03/2024",
            "preacher": "",
            "men": -2,
            "offering": "beaucoup",
            "notes": 5,
        }));

        let errors = validate(&payload).unwrap_err();
        let fields: Vec<_> = errors.fields().collect();
        assert_eq!(
            fields,
            vec!["date", "men", "notes", "offering", "preacher", "total_attendees"]
        );
    }

    #[test]
    fn preacher_longer_than_limit_is_rejected() {
        let mut payload = valid_payload();
        payload.insert("preacher".into(), json!("é".repeat(PREACHER_MAX_LEN + 1)));
        assert!(validate(&payload).unwrap_err().contains("preacher"));

        payload.insert("preacher".into(), json!("é".repeat(PREACHER_MAX_LEN)));
        assert!(validate(&payload).is_ok());
    }

    #[test]
    fn fractional_counts_are_rejected_but_integral_floats_pass() {
        let mut payload = valid_payload();
        payload.insert("total_attendees".into(), json!(42.0));
        assert_eq!(validate(&payload).unwrap().total_attendees, 42);

        payload.insert("total_attendees".into(), json!(42.5));
        let errors = validate(&payload).unwrap_err();
        assert_eq!(errors.messages("total_attendees"), [NOT_INTEGER.to_string()]);
    }

    #[test]
    fn out_of_range_years_are_rejected() {
        let mut payload = valid_payload();
        payload.insert("date".into(), json!("+262142-12-31"));
        assert_eq!(validate(&payload).unwrap_err().messages("date"), [BAD_DATE.to_string()]);
    }

    #[test]
    fn sub_counts_may_exceed_total() {
        let mut payload = valid_payload();
        payload.insert("men".into(), json!(500));
        assert_eq!(validate(&payload).unwrap().men, 500);
    }

    #[test]
    fn loose_payload_normalizes_then_validates() {
        let raw = object(json!({
            "report_date": "2024-03-10",
            "predicateur": "Évangéliste Koné",
            "totalFaithful": "42",
            "menCount": "10",
            "offrande": "1 000,50",
            "unknown_field": true,
        }));

        let input = normalize_and_validate(&raw).unwrap();
        assert_eq!(input.total_attendees, 42);
        assert_eq!(input.men, 10);
        assert_eq!(input.offering, 1000.5);
    }

    #[test]
    fn uncoercible_string_is_rejected_by_validation() {
        let raw = object(json!({
            "date": "2024-03-06",
            "preacher": "Pasteur Yao",
            "total": "une cinquantaine",
        }));

        let errors = normalize_and_validate(&raw).unwrap_err();
        assert_eq!(errors.messages("total_attendees"), [NOT_INTEGER.to_string()]);
    }
}
