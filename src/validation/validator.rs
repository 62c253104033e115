//! Record validation against a form schema
//!
//! Validation semantics:
//! - Required fields that are not read-only must be non-empty
//! - Empty optional fields are skipped entirely
//! - Number fields must coerce to a finite number within inclusive bounds
//! - Date fields must be strict `YYYY-MM-DD` real calendar dates
//! - Text, select and radio fields are presence-checked only; option
//!   membership is not enforced
//! - Keys not declared by the schema pass through unchecked
//!
//! Validation never mutates the candidate record.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::rules::RuleRegistry;
use super::violation::{Violation, ViolationKind};
use crate::schema::{FieldDefinition, FieldType, FormSchema};

/// Validates candidate records against form schemas plus the cross-field
/// rules registered for the schema's form code.
#[derive(Debug)]
pub struct FormValidator {
    rules: RuleRegistry,
}

impl FormValidator {
    /// Creates a validator with the given cross-field rules.
    pub fn new(rules: RuleRegistry) -> Self {
        Self { rules }
    }

    /// Returns the cross-field rule registry.
    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    /// Validates `data` against `schema`.
    ///
    /// Returns violations in flattened field order, followed by cross-field
    /// violations. An empty result means the record is valid.
    pub fn validate(&self, schema: &FormSchema, data: &Map<String, Value>) -> Vec<Violation> {
        let mut violations: Vec<Violation> = schema
            .fields()
            .flat_map(|field| check_field(field, data.get(&field.path)))
            .collect();

        violations.extend(self.rules.check(&schema.form_code, data));
        violations
    }
}

impl Default for FormValidator {
    fn default() -> Self {
        Self::new(RuleRegistry::with_defaults())
    }
}

/// Validates with the standard rule set.
pub fn validate(schema: &FormSchema, data: &Map<String, Value>) -> Vec<Violation> {
    FormValidator::default().validate(schema, data)
}

fn check_field(field: &FieldDefinition, value: Option<&Value>) -> Vec<Violation> {
    let value = match value {
        Some(v) if !is_empty(Some(v)) => v,
        _ => {
            if field.required && !field.read_only {
                return vec![Violation::new(
                    ViolationKind::Required,
                    &field.path,
                    format!("{} is required.", field.label),
                )];
            }
            return Vec::new();
        }
    };

    match field.field_type {
        FieldType::Number => check_number(field, value),
        FieldType::Date => {
            if parse_date(value).is_none() {
                vec![Violation::new(
                    ViolationKind::InvalidDate,
                    &field.path,
                    format!("{} must be a valid date (YYYY-MM-DD).", field.label),
                )]
            } else {
                Vec::new()
            }
        }
        FieldType::Text | FieldType::Select | FieldType::Radio => Vec::new(),
    }
}

fn check_number(field: &FieldDefinition, value: &Value) -> Vec<Violation> {
    let Some(n) = coerce_number(value) else {
        return vec![Violation::new(
            ViolationKind::NotANumber,
            &field.path,
            format!("{} must be a number.", field.label),
        )];
    };

    let mut violations = Vec::new();
    if let Some(min) = field.min {
        if n < min {
            violations.push(Violation::new(
                ViolationKind::BelowMinimum,
                &field.path,
                format!("{} must be at least {}.", field.label, min),
            ));
        }
    }
    if let Some(max) = field.max {
        if n > max {
            violations.push(Violation::new(
                ViolationKind::AboveMaximum,
                &field.path,
                format!("{} must be at most {}.", field.label, max),
            ));
        }
    }
    violations
}

/// Absent, null and empty-string values count as empty.
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Coerces a submitted value to a finite number.
///
/// Strings are trimmed; a blank string coerces to zero. Booleans coerce to
/// one and zero. Arrays and objects never coerce.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().ok()?
            }
        }
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    n.is_finite().then_some(n)
}

/// Parses a strict `YYYY-MM-DD` string into a real calendar date.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?;
    let bytes = s.as_bytes();
    let digits_at = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    if !(digits_at(0..4) && digits_at(5..7) && digits_at(8..10)) {
        return None;
    }
    let year = s[0..4].parse().ok()?;
    let month = s[5..7].parse().ok()?;
    let day = s[8..10].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
