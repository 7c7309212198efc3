//! Pulse-check form sanitizer.
//!
//! Browser form fields arrive loosely typed: numbers may be JSON numbers or
//! numeric strings, and an untouched field may be missing, `null`, or `""`.
//! The scoring service and the vitals table both need to distinguish
//! "patient did not report this metric" from "value is zero", so every field
//! here degrades to an explicit `None` instead of being coerced. Pure
//! functions, no failure mode: unparsable input becomes `None`, never an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw pulse-check submission, exactly as posted by the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPulseCheck {
    #[serde(default)]
    pub mood: Option<Value>,
    #[serde(default)]
    pub systolic: Option<Value>,
    #[serde(default)]
    pub diastolic: Option<Value>,
    #[serde(default)]
    pub heart_rate: Option<Value>,
    #[serde(default)]
    pub sp_o2: Option<Value>,
    #[serde(default)]
    pub weight: Option<Value>,
    #[serde(default)]
    pub symptoms: Option<Value>,
}

/// Typed reading with every absent or unparsable field as an explicit null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanReading {
    pub mood: Option<i32>,
    pub systolic: Option<i32>,
    pub diastolic: Option<i32>,
    pub heart_rate: Option<i32>,
    pub sp_o2: Option<i32>,
    pub weight: Option<f64>,
    pub symptoms: Option<String>,
}

/// Normalize a raw submission into a [`CleanReading`].
pub fn sanitize_pulse_check(raw: &RawPulseCheck) -> CleanReading {
    CleanReading {
        mood: to_int(raw.mood.as_ref()),
        systolic: to_int(raw.systolic.as_ref()),
        diastolic: to_int(raw.diastolic.as_ref()),
        heart_rate: to_int(raw.heart_rate.as_ref()),
        sp_o2: to_int(raw.sp_o2.as_ref()),
        weight: to_float(raw.weight.as_ref()),
        symptoms: to_text(raw.symptoms.as_ref()),
    }
}

/// Integer conversion: JSON numbers and numeric strings are truncated toward
/// zero; everything else is null.
fn to_int(val: Option<&Value>) -> Option<i32> {
    to_float(val).map(|f| f.trunc() as i32)
}

/// Float conversion: finite JSON numbers and parsable numeric strings only.
fn to_float(val: Option<&Value>) -> Option<f64> {
    let parsed = match val? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

/// Text conversion: empty or whitespace-only strings become null.
fn to_text(val: Option<&Value>) -> Option<String> {
    match val? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_from(value: Value) -> RawPulseCheck {
        serde_json::from_value(value).expect("raw pulse check should deserialize")
    }

    #[test]
    fn test_full_form_submission_parses_exactly() {
        // Field-for-field form scenario: empty strings become nulls,
        // numeric strings become numbers, weight keeps its fraction.
        let raw = raw_from(json!({
            "mood": "4",
            "systolic": "120",
            "diastolic": "80",
            "heart_rate": "",
            "sp_o2": "98",
            "weight": "150.5",
            "symptoms": ""
        }));

        let clean = sanitize_pulse_check(&raw);

        assert_eq!(clean.mood, Some(4));
        assert_eq!(clean.systolic, Some(120));
        assert_eq!(clean.diastolic, Some(80));
        assert_eq!(clean.heart_rate, None);
        assert_eq!(clean.sp_o2, Some(98));
        assert_eq!(clean.weight, Some(150.5));
        assert_eq!(clean.symptoms, None);
    }

    #[test]
    fn test_missing_fields_become_null() {
        let raw = raw_from(json!({}));
        let clean = sanitize_pulse_check(&raw);

        assert_eq!(
            clean,
            CleanReading {
                mood: None,
                systolic: None,
                diastolic: None,
                heart_rate: None,
                sp_o2: None,
                weight: None,
                symptoms: None,
            }
        );
    }

    #[test]
    fn test_explicit_null_fields_stay_null() {
        let raw = raw_from(json!({
            "mood": null,
            "systolic": null,
            "weight": null,
            "symptoms": null
        }));
        let clean = sanitize_pulse_check(&raw);

        assert_eq!(clean.mood, None);
        assert_eq!(clean.systolic, None);
        assert_eq!(clean.weight, None);
        assert_eq!(clean.symptoms, None);
    }

    #[test]
    fn test_unparsable_strings_become_null() {
        let raw = raw_from(json!({
            "mood": "angry",
            "systolic": "one twenty",
            "weight": "heavy"
        }));
        let clean = sanitize_pulse_check(&raw);

        assert_eq!(clean.mood, None);
        assert_eq!(clean.systolic, None);
        assert_eq!(clean.weight, None);
    }

    #[test]
    fn test_zero_submitted_as_string_is_preserved() {
        // "0" is a real reported value, not a missing one.
        let raw = raw_from(json!({ "mood": "0", "weight": "0" }));
        let clean = sanitize_pulse_check(&raw);

        assert_eq!(clean.mood, Some(0));
        assert_eq!(clean.weight, Some(0.0));
    }

    #[test]
    fn test_json_numbers_accepted_directly() {
        let raw = raw_from(json!({
            "mood": 3,
            "systolic": 118,
            "weight": 72.4
        }));
        let clean = sanitize_pulse_check(&raw);

        assert_eq!(clean.mood, Some(3));
        assert_eq!(clean.systolic, Some(118));
        assert_eq!(clean.weight, Some(72.4));
    }

    #[test]
    fn test_integer_fields_truncate_fractional_input() {
        let raw = raw_from(json!({ "heart_rate": "72.9", "sp_o2": 97.6 }));
        let clean = sanitize_pulse_check(&raw);

        assert_eq!(clean.heart_rate, Some(72));
        assert_eq!(clean.sp_o2, Some(97));
    }

    #[test]
    fn test_whitespace_strings_become_null() {
        let raw = raw_from(json!({ "systolic": "   ", "symptoms": "  " }));
        let clean = sanitize_pulse_check(&raw);

        assert_eq!(clean.systolic, None);
        assert_eq!(clean.symptoms, None);
    }

    #[test]
    fn test_symptom_text_is_kept_verbatim() {
        let raw = raw_from(json!({ "symptoms": "dizzy in the morning" }));
        let clean = sanitize_pulse_check(&raw);

        assert_eq!(clean.symptoms.as_deref(), Some("dizzy in the morning"));
    }

    #[test]
    fn test_non_string_non_number_values_become_null() {
        let raw = raw_from(json!({
            "mood": [1, 2],
            "systolic": {"value": 120},
            "symptoms": 42
        }));
        let clean = sanitize_pulse_check(&raw);

        assert_eq!(clean.mood, None);
        assert_eq!(clean.systolic, None);
        assert_eq!(clean.symptoms, None);
    }
}
