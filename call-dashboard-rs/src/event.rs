//! Typed view over stored call events.
//!
//! Events are kept as raw JSON so unknown fields survive storage untouched.
//! The recognized fields are pulled out here without ever failing: bad or
//! missing values fall back to defaults.

use serde_json::{json, Map, Value};

pub const DEAL_SUCCESS: &str = "deal_success";
pub const DEAL_ONGOING: &str = "deal_ongoing";

/// Outcome bucket of one call.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Success,
    Ongoing,
    /// Any other tag, kept literally. An absent tag is `Value::Null`.
    Failure(Value),
}

/// Recognized fields of a call event.
#[derive(Debug, Clone, PartialEq)]
pub struct CallEvent<'a> {
    pub classification: Classification,
    pub origin: Option<&'a str>,
    pub destination: Option<&'a str>,
    pub start_rate: i64,
    pub final_rate: i64,
}

impl<'a> CallEvent<'a> {
    /// Extract the recognized fields from a stored event.
    ///
    /// Entries that are not JSON objects behave like an empty object.
    pub fn from_value(value: &'a Value) -> Self {
        match value.as_object() {
            Some(fields) => Self::from_fields(fields),
            None => Self {
                classification: Classification::Failure(Value::Null),
                origin: None,
                destination: None,
                start_rate: 0,
                final_rate: 0,
            },
        }
    }

    fn from_fields(fields: &'a Map<String, Value>) -> Self {
        let classification = match fields.get("classification") {
            Some(Value::String(tag)) if tag == DEAL_SUCCESS => Classification::Success,
            Some(Value::String(tag)) if tag == DEAL_ONGOING => Classification::Ongoing,
            Some(other) => Classification::Failure(other.clone()),
            None => Classification::Failure(Value::Null),
        };

        Self {
            classification,
            origin: non_empty_str(fields.get("origin")),
            destination: non_empty_str(fields.get("destination")),
            start_rate: coerce_rate(fields.get("start_rate")),
            final_rate: coerce_rate(fields.get("final_rate")),
        }
    }

    /// `final_rate / start_rate`, or 0.0 when there is no start rate.
    pub fn rate_ratio(&self) -> f64 {
        if self.start_rate == 0 {
            0.0
        } else {
            self.final_rate as f64 / self.start_rate as f64
        }
    }

    /// Both rates are known and non-zero.
    pub fn has_rate_pair(&self) -> bool {
        self.start_rate != 0 && self.final_rate != 0
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Coerce a rate field to an integer.
///
/// Integers pass through, floats truncate toward zero, numeric strings are
/// parsed (integer first, then float), `true` is 1. Everything else,
/// including missing values, is 0.
pub fn coerce_rate(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
                .unwrap_or(0)
        }
        Some(Value::Bool(true)) => 1,
        _ => 0,
    }
}

/// The fixed demo events appended by the seed operation.
///
/// The successful samples carry their booked price under `sold_rate`, so they
/// add no rate pairs to the dashboard.
pub fn seed_samples() -> Vec<Value> {
    vec![
        json!({
            "mc_number": "11111",
            "origin": "San Ramon, CA",
            "destination": "Fort Worth, TX",
            "classification": "deal_success",
            "start_rate": 3900,
            "sold_rate": 4200,
            "reasoning": "Accepted"
        }),
        json!({
            "mc_number": "22222",
            "origin": "Oakland, CA",
            "destination": "Dallas, TX",
            "classification": "deal_success",
            "start_rate": 6500,
            "sold_rate": 7200,
            "reasoning": "Matched need"
        }),
        json!({
            "mc_number": "33333",
            "origin": "Los Angeles, CA",
            "destination": "Seattle, WA",
            "classification": "deal_success",
            "start_rate": 2900,
            "sold_rate": 2900,
            "reasoning": "Booked at ask"
        }),
        json!({
            "mc_number": "44444",
            "origin": "San Francisco, CA",
            "destination": "Dallas, TX",
            "classification": "deal_failure",
            "reasoning": "Rate mismatch"
        }),
    ]
}
