use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::fields::{FieldKind, FieldRegistry};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordEntry {
    pub name: String,
    pub kind: FieldKind,
    pub value: f64,
}

/// One fully populated row of model input, in registry order.
///
/// Only [`crate::predictor::Predictor`] builds these, so every record has
/// passed validation against the registry it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRecord {
    entries: Vec<RecordEntry>,
}

impl InputRecord {
    pub(crate) fn from_entries(entries: Vec<RecordEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordEntry> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Values in column order, the layout tabular models consume.
    pub fn features(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.value).collect()
    }

    /// True when the record's columns are exactly the registry's, in order.
    pub fn matches(&self, registry: &FieldRegistry) -> bool {
        self.entries.len() == registry.len()
            && self.entries.iter().zip(registry.names()).all(|(e, n)| e.name == n)
    }

    /// Short stats line for debug logs.
    pub fn summary(&self) -> String {
        let n = self.entries.len();
        let nz = self.entries.iter().filter(|e| e.value != 0.0).count();
        let mean = if n == 0 {
            0.0
        } else {
            self.entries.iter().map(|e| e.value).sum::<f64>() / n as f64
        };
        let sample: Vec<String> = self
            .entries
            .iter()
            .take(4)
            .map(|e| format!("{}={:.3}", e.name, e.value))
            .collect();
        format!("in_dim={} nonzero={} mean={:.3} sample=[{}]", n, nz, mean, sample.join(", "))
    }
}

// Integer columns serialize as integers so the JSON row matches the
// training frame's dtypes.
impl Serialize for InputRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for e in &self.entries {
            match e.kind {
                FieldKind::Integer => map.serialize_entry(&e.name, &(e.value as i64))?,
                FieldKind::Float => map.serialize_entry(&e.name, &e.value)?,
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InputRecord {
        InputRecord::from_entries(vec![
            RecordEntry {
                name: "event_id".into(),
                kind: FieldKind::Integer,
                value: 7.0,
            },
            RecordEntry {
                name: "relative_speed".into(),
                kind: FieldKind::Float,
                value: 13792.5,
            },
        ])
    }

    #[test]
    fn serializes_in_column_order_with_integer_ids() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(json, r#"{"event_id":7,"relative_speed":13792.5}"#);
    }

    #[test]
    fn features_follow_column_order() {
        let r = sample();
        assert_eq!(r.features(), vec![7.0, 13792.5]);
        assert_eq!(r.get("relative_speed"), Some(13792.5));
        assert_eq!(r.get("azimuth"), None);
        assert_eq!(r.names(), vec!["event_id".to_string(), "relative_speed".to_string()]);
    }

    #[test]
    fn summary_counts_nonzero_values() {
        let s = sample().summary();
        assert!(s.starts_with("in_dim=2 nonzero=2"), "{s}");
        assert!(s.contains("event_id=7.000"));
    }
}
