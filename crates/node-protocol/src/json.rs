//! JSON encoding of samples (spec §6.3, §4.6 `read_json`).

use datahub_domain::value::{Sample, SampleValue};

/// Encode one `(timestamp, value)` entry as `{"t":<double>,"v":<value>}`,
/// omitting `v` entirely for `trigger` samples.
pub fn encode_entry(timestamp: f64, value: &SampleValue) -> serde_json::Value {
    let mut obj = serde_json::Map::new();
    obj.insert("t".to_string(), json_number_or_null(timestamp));
    if !matches!(value, SampleValue::Trigger) {
        obj.insert("v".to_string(), value.to_json());
    }
    serde_json::Value::Object(obj)
}

/// Encode an ordered sequence of buffered entries as the JSON array the
/// `read_buffer_json` call writes to its destination (spec §4.6: "a single
/// JSON array of objects ... ordered oldest→newest by storage order").
pub fn encode_array<'a, I>(entries: I) -> serde_json::Value
where
    I: IntoIterator<Item = (f64, &'a SampleValue)>,
{
    serde_json::Value::Array(
        entries
            .into_iter()
            .map(|(t, v)| encode_entry(t, v))
            .collect(),
    )
}

fn json_number_or_null(n: f64) -> serde_json::Value {
    if n.is_finite() {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    } else {
        serde_json::Value::Null
    }
}

/// Encode a single current-value `Sample` the same way (used by typed
/// getters' JSON-mode callers and tests, not by the buffer dump).
pub fn encode_sample(sample: &Sample) -> serde_json::Value {
    encode_entry(sample.timestamp(), sample.value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_omits_v_field() {
        let v = encode_entry(1.0, &SampleValue::Trigger);
        assert_eq!(v, serde_json::json!({"t": 1.0}));
    }

    #[test]
    fn numeric_keeps_v_field() {
        let v = encode_entry(2.0, &SampleValue::Numeric(2.0));
        assert_eq!(v, serde_json::json!({"t": 2.0, "v": 2.0}));
    }

    #[test]
    fn array_preserves_order() {
        let values = vec![
            SampleValue::Numeric(1.0),
            SampleValue::Numeric(2.0),
            SampleValue::Numeric(3.0),
        ];
        let arr = encode_array(values.iter().enumerate().map(|(i, v)| (i as f64, v)));
        assert_eq!(
            arr,
            serde_json::json!([
                {"t": 0.0, "v": 1.0},
                {"t": 1.0, "v": 2.0},
                {"t": 2.0, "v": 3.0},
            ])
        );
    }

    #[test]
    fn json_sample_dump_matches_scenario_4() {
        // spec §8 scenario 4: capacity-3 buffer after four pushes dumps the
        // last three entries in storage order.
        let pushed = [(1.0, 1.0), (2.0, 2.0), (3.0, 3.0), (4.0, 4.0)];
        let retained = &pushed[1..]; // oldest evicted once capacity is hit
        let values: Vec<SampleValue> = retained.iter().map(|(_, v)| SampleValue::Numeric(*v)).collect();
        let arr = encode_array(retained.iter().zip(values.iter()).map(|((t, _), v)| (*t, v)));
        assert_eq!(
            arr,
            serde_json::json!([
                {"t": 2.0, "v": 2.0},
                {"t": 3.0, "v": 3.0},
                {"t": 4.0, "v": 4.0},
            ])
        );
    }
}
