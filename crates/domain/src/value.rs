//! The sample value model (spec §3, "Data Sample").
//!
//! A [`Sample`] is immutable once constructed and cheaply `Clone`-able —
//! cloning bumps an `Arc` refcount rather than copying the payload. This is
//! the Rust equivalent of the reference-counted samples the original C
//! implementation passes between the current-value slot, buffer slots, and
//! in-flight handler deliveries (spec §3, §9 "Sample ownership"): the last
//! `Sample` to drop frees the payload, with no explicit lifetime management
//! at any call site.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The five value kinds a [`Sample`] may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Trigger,
    Bool,
    Numeric,
    String,
    Json,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Trigger => "trigger",
            DataType::Bool => "bool",
            DataType::Numeric => "numeric",
            DataType::String => "string",
            DataType::Json => "json",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The payload of a [`Sample`]. `Trigger` carries no data — it exists so a
/// push can signal "something happened" without a value.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Trigger,
    Bool(bool),
    Numeric(f64),
    String(String),
    /// A JSON document, stored verbatim. The implementation may re-parse and
    /// re-emit it (spec §6.3) but never rewrites it on ingestion.
    Json(String),
}

impl SampleValue {
    pub fn data_type(&self) -> DataType {
        match self {
            SampleValue::Trigger => DataType::Trigger,
            SampleValue::Bool(_) => DataType::Bool,
            SampleValue::Numeric(_) => DataType::Numeric,
            SampleValue::String(_) => DataType::String,
            SampleValue::Json(_) => DataType::Json,
        }
    }

    /// Encode this value as the `v` field of the wire JSON representation
    /// (spec §6.3). `Trigger` has no JSON counterpart; callers must omit the
    /// field entirely rather than call this.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SampleValue::Trigger => serde_json::Value::Null,
            SampleValue::Bool(b) => serde_json::Value::Bool(*b),
            SampleValue::Numeric(n) => {
                if n.is_finite() {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                } else {
                    serde_json::Value::Null
                }
            }
            SampleValue::String(s) => serde_json::Value::String(s.clone()),
            SampleValue::Json(raw) => {
                serde_json::from_str(raw).unwrap_or(serde_json::Value::String(raw.clone()))
            }
        }
    }

    /// Coerce this value into `json` by encoding it (spec §4.4 coercion
    /// table: "Any type → json by encoding the value").
    pub fn coerce_to_json(&self) -> SampleValue {
        match self {
            SampleValue::Json(_) => self.clone(),
            other => SampleValue::Json(other.to_json().to_string()),
        }
    }
}

struct SampleInner {
    timestamp: f64,
    value: SampleValue,
}

/// An immutable `(timestamp, value)` datum, shared by reference count.
///
/// `timestamp` is seconds since the Unix epoch. A `timestamp` of `0.0` at
/// push time means "stamp this with the wall clock now" (spec §4.4 step 3);
/// by the time a `Sample` exists that substitution has already happened, so
/// every live `Sample`'s timestamp is the value actually recorded.
#[derive(Clone)]
pub struct Sample(Arc<SampleInner>);

impl Sample {
    pub fn new(timestamp: f64, value: SampleValue) -> Self {
        Sample(Arc::new(SampleInner { timestamp, value }))
    }

    pub fn timestamp(&self) -> f64 {
        self.0.timestamp
    }

    pub fn value(&self) -> &SampleValue {
        &self.0.value
    }

    pub fn data_type(&self) -> DataType {
        self.0.value.data_type()
    }

    /// Reference count of the underlying payload — exposed only for tests
    /// that assert a buffer slot or current-value slot is the last holder.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl std::fmt::Debug for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sample")
            .field("timestamp", &self.0.timestamp)
            .field("value", &self.0.value)
            .finish()
    }
}

impl PartialEq for Sample {
    fn eq(&self, other: &Self) -> bool {
        self.0.timestamp == other.0.timestamp && self.0.value == other.0.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_shares_payload() {
        let s = Sample::new(1.0, SampleValue::Numeric(21.5));
        let s2 = s.clone();
        assert_eq!(s.strong_count(), 2);
        drop(s2);
        assert_eq!(s.strong_count(), 1);
    }

    #[test]
    fn numeric_to_json_preserves_precision() {
        let v = SampleValue::Numeric(21.5);
        assert_eq!(v.to_json(), serde_json::json!(21.5));
    }

    #[test]
    fn non_finite_numeric_encodes_null() {
        assert_eq!(SampleValue::Numeric(f64::NAN).to_json(), serde_json::Value::Null);
        assert_eq!(
            SampleValue::Numeric(f64::INFINITY).to_json(),
            serde_json::Value::Null
        );
    }

    #[test]
    fn coerce_bool_to_json() {
        let coerced = SampleValue::Bool(true).coerce_to_json();
        assert_eq!(coerced, SampleValue::Json("true".to_string()));
    }

    #[test]
    fn data_type_round_trips_through_serde() {
        for dt in [
            DataType::Trigger,
            DataType::Bool,
            DataType::Numeric,
            DataType::String,
            DataType::Json,
        ] {
            let json = serde_json::to_string(&dt).unwrap();
            let back: DataType = serde_json::from_str(&json).unwrap();
            assert_eq!(dt, back);
        }
    }
}
