//! Validation engine for submitted records
//!
//! A pure function of (schema, candidate data) to an ordered list of
//! violations. Per-field checks run in flattened schema order; cross-field
//! rules selected by the schema's form code are appended afterwards. Any
//! non-empty result rejects the submission before it reaches the record store.

mod rules;
mod validator;
mod violation;

pub use rules::{CrossFieldRule, EndNotBeforeStart, RequiredWhenEquals, RuleRegistry};
pub use validator::{coerce_number, is_empty, parse_date, validate, FormValidator};
pub use violation::{Violation, ViolationKind};
