//! Type coercion - turning normalized text into typed argument values
//!
//! The generator is unreliable, so coercion is forgiving: integers fall
//! back to an English number-word table and then to the first digit run,
//! lists fall back to comma splitting, and a total failure is reported as
//! an error the orchestrator recovers from by keeping the original string.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::tool::{ParamType, RecordSchema};

/// A value that could not be interpreted as its declared type.
///
/// Never aborts a run: the orchestrator logs it and substitutes the
/// original string.
#[derive(Error, Debug)]
pub enum CoerceError {
    #[error("cannot interpret {0:?} as an integer")]
    Integer(String),

    #[error("cannot interpret {0:?} as a float")]
    Float(String),

    #[error("cannot interpret {0:?} as a JSON object: {1}")]
    Object(String, String),
}

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("static pattern"));

const NUMBER_WORDS: [(&str, i64); 43] = [
    ("zero", 0),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("thirteen", 13),
    ("fourteen", 14),
    ("fifteen", 15),
    ("sixteen", 16),
    ("seventeen", 17),
    ("eighteen", 18),
    ("nineteen", 19),
    ("twenty", 20),
    ("twenty-one", 21),
    ("twenty-two", 22),
    ("twenty-three", 23),
    ("twenty-four", 24),
    ("twenty-five", 25),
    ("twenty-six", 26),
    ("twenty-seven", 27),
    ("twenty-eight", 28),
    ("twenty-nine", 29),
    ("thirty", 30),
    ("thirty-one", 31),
    ("thirty-two", 32),
    ("forty", 40),
    ("forty-five", 45),
    ("fifty", 50),
    ("fifty-seven", 57),
    ("sixty", 60),
    ("sixty-two", 62),
    ("seventy", 70),
    ("eighty", 80),
    ("ninety", 90),
    ("hundred", 100),
];

/// Convert normalized text to the parameter's declared type.
pub fn coerce(raw: &str, param_type: &ParamType) -> Result<Value, CoerceError> {
    match param_type {
        ParamType::Integer => coerce_integer(raw).map(Value::from),
        ParamType::Float => coerce_float(raw),
        ParamType::Boolean => Ok(Value::Bool(matches!(
            raw.trim().to_lowercase().as_str(),
            "true" | "1" | "yes"
        ))),
        ParamType::List(inner) => Ok(coerce_list(raw, inner)),
        ParamType::Record(schema) => coerce_object(raw).map(|map| {
            Value::Object(coerce_record_fields(map, schema))
        }),
        ParamType::Dict => coerce_object(raw).map(Value::Object),
        ParamType::Text | ParamType::Code(_) => Ok(Value::String(raw.to_string())),
    }
}

fn coerce_integer(raw: &str) -> Result<i64, CoerceError> {
    if let Ok(n) = raw.trim().parse::<i64>() {
        return Ok(n);
    }
    let lower = raw.trim().to_lowercase();
    if let Some((_, n)) = NUMBER_WORDS.iter().find(|(word, _)| *word == lower) {
        return Ok(*n);
    }
    if let Some(m) = DIGIT_RUN.find(raw)
        && let Ok(n) = m.as_str().parse::<i64>()
    {
        return Ok(n);
    }
    Err(CoerceError::Integer(raw.to_string()))
}

fn coerce_float(raw: &str) -> Result<Value, CoerceError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| CoerceError::Float(raw.to_string()))
}

/// Locate the first balanced `[...]` span by bracket counting.
fn bracketed_span(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let mut depth = 0usize;
    for (offset, c) in raw[start..].char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a list value, mapping decoded objects through the element
/// schema when one is declared. Any failure falls back to splitting the
/// raw text on commas.
fn coerce_list(raw: &str, element_type: &ParamType) -> Value {
    let parsed = bracketed_span(raw).and_then(|span| serde_json::from_str::<Value>(span).ok());

    match parsed {
        Some(Value::Array(items)) => {
            let items = match element_type {
                ParamType::Record(schema) => items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(map) => Value::Object(coerce_record_fields(map, schema)),
                        other => other,
                    })
                    .collect(),
                _ => items,
            };
            Value::Array(items)
        }
        Some(other) => other,
        None => comma_split(raw),
    }
}

fn comma_split(raw: &str) -> Value {
    Value::Array(
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect(),
    )
}

fn coerce_object(raw: &str) -> Result<Map<String, Value>, CoerceError> {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CoerceError::Object(
            raw.to_string(),
            format!("expected object, got {}", value_kind(&other)),
        )),
        Err(e) => Err(CoerceError::Object(raw.to_string(), e.to_string())),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Coerce decoded object fields against the schema. Integer-typed fields
/// that arrived as strings (e.g. `"10 milligrams"`) have their leading
/// digit run extracted; fields that still do not fit are kept as decoded.
fn coerce_record_fields(map: Map<String, Value>, schema: &RecordSchema) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| {
            let coerced = match (schema.field_type(&key), &value) {
                (Some(ParamType::Integer), Value::String(s)) => DIGIT_RUN
                    .find(s)
                    .and_then(|m| m.as_str().parse::<i64>().ok())
                    .map(Value::from)
                    .unwrap_or(value),
                _ => value,
            };
            (key, coerced)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_direct() {
        assert_eq!(coerce("42", &ParamType::Integer).unwrap(), json!(42));
        assert_eq!(coerce("-7", &ParamType::Integer).unwrap(), json!(-7));
    }

    #[test]
    fn test_integer_number_word() {
        assert_eq!(coerce("twelve", &ParamType::Integer).unwrap(), json!(12));
        assert_eq!(coerce("Twenty-Five", &ParamType::Integer).unwrap(), json!(25));
    }

    #[test]
    fn test_integer_digit_run() {
        assert_eq!(
            coerce("about 30 years old", &ParamType::Integer).unwrap(),
            json!(30)
        );
    }

    #[test]
    fn test_integer_failure() {
        assert!(coerce("no digits here", &ParamType::Integer).is_err());
    }

    #[test]
    fn test_float() {
        assert_eq!(coerce("3.5", &ParamType::Float).unwrap(), json!(3.5));
        assert!(coerce("not a number", &ParamType::Float).is_err());
    }

    #[test]
    fn test_boolean() {
        for truthy in ["true", "1", "yes", "YES"] {
            assert_eq!(coerce(truthy, &ParamType::Boolean).unwrap(), json!(true));
        }
        assert_eq!(coerce("false", &ParamType::Boolean).unwrap(), json!(false));
        assert_eq!(coerce("maybe", &ParamType::Boolean).unwrap(), json!(false));
    }

    #[test]
    fn test_list_json() {
        let out = coerce(
            "[\"a\", \"b\"]",
            &ParamType::List(Box::new(ParamType::Text)),
        )
        .unwrap();
        assert_eq!(out, json!(["a", "b"]));
    }

    #[test]
    fn test_list_extracts_bracketed_span() {
        let out = coerce(
            "The items are [\"a\", \"b\"] as requested.",
            &ParamType::List(Box::new(ParamType::Text)),
        )
        .unwrap();
        assert_eq!(out, json!(["a", "b"]));
    }

    #[test]
    fn test_list_nested_brackets() {
        let out = coerce(
            "[[1, 2], [3]]",
            &ParamType::List(Box::new(ParamType::Dict)),
        )
        .unwrap();
        assert_eq!(out, json!([[1, 2], [3]]));
    }

    #[test]
    fn test_list_malformed_falls_back_to_comma_split() {
        let out = coerce(
            "aspirin, ibuprofen , paracetamol",
            &ParamType::List(Box::new(ParamType::Text)),
        )
        .unwrap();
        assert_eq!(out, json!(["aspirin", "ibuprofen", "paracetamol"]));
    }

    #[test]
    fn test_list_of_records_coerces_integer_fields() {
        let schema = RecordSchema::new()
            .field("name", ParamType::Text)
            .field("dosage", ParamType::Integer);
        let out = coerce(
            "[{\"name\": \"aspirin\", \"dosage\": \"10 milligrams\"}]",
            &ParamType::List(Box::new(ParamType::Record(schema))),
        )
        .unwrap();
        assert_eq!(out, json!([{"name": "aspirin", "dosage": 10}]));
    }

    #[test]
    fn test_dict() {
        let out = coerce("{\"name\": \"Alice\", \"age\": 30}", &ParamType::Dict).unwrap();
        assert_eq!(out, json!({"name": "Alice", "age": 30}));
        assert!(coerce("not json", &ParamType::Dict).is_err());
        assert!(coerce("[1, 2]", &ParamType::Dict).is_err());
    }

    #[test]
    fn test_text_passthrough() {
        assert_eq!(
            coerce("anything at all", &ParamType::Text).unwrap(),
            json!("anything at all")
        );
        assert_eq!(
            coerce("x = 1", &ParamType::Code(None)).unwrap(),
            json!("x = 1")
        );
    }
}
