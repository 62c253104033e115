//! Cross-field business rules keyed by form code
//!
//! Each form code maps to zero or more rules. A form code without an entry
//! simply has no cross-field checks.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::validator::{is_empty, parse_date};
use super::violation::{Violation, ViolationKind};

/// A `{data} -> violations` check registered for one form code.
pub trait CrossFieldRule: Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &'static str;

    /// Checks the submitted data. Must not assume any field is present.
    fn check(&self, data: &Map<String, Value>) -> Vec<Violation>;
}

/// `end` must not be chronologically before `start`.
///
/// Only applies when `end` is non-empty and both values are valid dates;
/// malformed dates are already reported by the per-field checks.
#[derive(Debug, Clone)]
pub struct EndNotBeforeStart {
    pub start: String,
    pub end: String,
    pub message: String,
}

impl CrossFieldRule for EndNotBeforeStart {
    fn name(&self) -> &'static str {
        "end_not_before_start"
    }

    fn check(&self, data: &Map<String, Value>) -> Vec<Violation> {
        let end = data.get(&self.end);
        if is_empty(end) {
            return Vec::new();
        }
        let start = data.get(&self.start).and_then(parse_date);
        let end = end.and_then(parse_date);

        match (start, end) {
            (Some(start), Some(end)) if end < start => {
                vec![Violation::new(ViolationKind::CrossField, &self.end, &self.message)]
            }
            _ => Vec::new(),
        }
    }
}

/// `dependent` must be non-empty whenever `trigger` equals `trigger_value`.
#[derive(Debug, Clone)]
pub struct RequiredWhenEquals {
    pub trigger: String,
    pub trigger_value: String,
    pub dependent: String,
    pub message: String,
}

impl CrossFieldRule for RequiredWhenEquals {
    fn name(&self) -> &'static str {
        "required_when_equals"
    }

    fn check(&self, data: &Map<String, Value>) -> Vec<Violation> {
        let triggered = data
            .get(&self.trigger)
            .and_then(Value::as_str)
            .is_some_and(|v| v == self.trigger_value);

        if triggered && is_empty(data.get(&self.dependent)) {
            vec![Violation::new(ViolationKind::CrossField, &self.dependent, &self.message)]
        } else {
            Vec::new()
        }
    }
}

/// Mapping from form code to its cross-field rules.
#[derive(Default)]
pub struct RuleRegistry {
    rules: HashMap<String, Vec<Box<dyn CrossFieldRule>>>,
}

impl RuleRegistry {
    /// Registry with no rules at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the standard AE and IC rules
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(
            "AE",
            EndNotBeforeStart {
                start: "START".into(),
                end: "END".into(),
                message: "End date must not be before the onset date.".into(),
            },
        );
        registry.register(
            "IC",
            RequiredWhenEquals {
                trigger: "SIGNED".into(),
                trigger_value: "Y".into(),
                dependent: "DATE".into(),
                message: "Signature date is required when the consent form is signed.".into(),
            },
        );
        registry
    }

    /// Adds a rule for a form code; rules run in registration order.
    pub fn register(&mut self, form_code: impl Into<String>, rule: impl CrossFieldRule + 'static) {
        self.rules.entry(form_code.into()).or_default().push(Box::new(rule));
    }

    /// Rules for a form code (empty when none are registered)
    pub fn rules_for(&self, form_code: &str) -> &[Box<dyn CrossFieldRule>] {
        self.rules.get(form_code).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Runs every rule registered for `form_code`.
    pub fn check(&self, form_code: &str, data: &Map<String, Value>) -> Vec<Violation> {
        self.rules_for(form_code)
            .iter()
            .flat_map(|rule| rule.check(data))
            .collect()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut codes: Vec<_> = self.rules.keys().collect();
        codes.sort();
        f.debug_struct("RuleRegistry").field("form_codes", &codes).finish()
    }
}
