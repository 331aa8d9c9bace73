//! Flat per-event record with typed field access.

use std::collections::HashMap;

use serde::Deserialize;

use hpp_core::{Error, Result};

/// A single field value in an event record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean flag (pass/fail, gen-match, isData).
    Bool(bool),
    /// Scalar kinematic or weight.
    Float(f64),
    /// Channel strings and other labels.
    Str(String),
}

/// One event: a read-only mapping from field name to scalar value.
///
/// Records are supplied by an external tuple reader; the engine only reads
/// them. A missing field or a wrong value kind is a schema error and is
/// fatal for the run; there is no malformed-record recovery.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct EventRecord {
    fields: HashMap<String, FieldValue>,
}

impl EventRecord {
    /// Create an empty record (test helper; real records come from the
    /// tuple reader).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a float field.
    pub fn set_f64(&mut self, name: impl Into<String>, value: f64) -> &mut Self {
        self.fields.insert(name.into(), FieldValue::Float(value));
        self
    }

    /// Set a boolean field.
    pub fn set_bool(&mut self, name: impl Into<String>, value: bool) -> &mut Self {
        self.fields.insert(name.into(), FieldValue::Bool(value));
        self
    }

    /// Set a string field.
    pub fn set_str(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fields.insert(name.into(), FieldValue::Str(value.into()));
        self
    }

    fn get(&self, name: &str) -> Result<&FieldValue> {
        self.fields
            .get(name)
            .ok_or_else(|| Error::Schema(format!("missing field '{name}'")))
    }

    /// Read a float field. Booleans are not coerced.
    pub fn get_f64(&self, name: &str) -> Result<f64> {
        match self.get(name)? {
            FieldValue::Float(v) => Ok(*v),
            other => Err(Error::Schema(format!("field '{name}' is not a float: {other:?}"))),
        }
    }

    /// Read an optional float field (e.g. the qqZZ k-factor, present only
    /// on some samples).
    pub fn get_f64_opt(&self, name: &str) -> Result<Option<f64>> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(FieldValue::Float(v)) => Ok(Some(*v)),
            Some(other) => {
                Err(Error::Schema(format!("field '{name}' is not a float: {other:?}")))
            }
        }
    }

    /// Read a boolean field. Floats 0.0/1.0 are accepted since flat tuples
    /// often store flags as numbers.
    pub fn get_bool(&self, name: &str) -> Result<bool> {
        match self.get(name)? {
            FieldValue::Bool(v) => Ok(*v),
            FieldValue::Float(v) if *v == 0.0 => Ok(false),
            FieldValue::Float(v) if *v == 1.0 => Ok(true),
            other => Err(Error::Schema(format!("field '{name}' is not a bool: {other:?}"))),
        }
    }

    /// Read a string field.
    pub fn get_str(&self, name: &str) -> Result<&str> {
        match self.get(name)? {
            FieldValue::Str(v) => Ok(v),
            other => Err(Error::Schema(format!("field '{name}' is not a string: {other:?}"))),
        }
    }

    /// Whether this record is real collision data.
    pub fn is_data(&self) -> Result<bool> {
        self.get_bool("isData")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters() {
        let mut r = EventRecord::new();
        r.set_f64("hpp_mass", 412.5).set_bool("isData", false).set_str("channel", "emm");
        assert_eq!(r.get_f64("hpp_mass").unwrap(), 412.5);
        assert!(!r.is_data().unwrap());
        assert_eq!(r.get_str("channel").unwrap(), "emm");
    }

    #[test]
    fn missing_field_is_schema_error() {
        let r = EventRecord::new();
        let err = r.get_f64("met_pt").unwrap_err();
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn wrong_kind_is_schema_error() {
        let mut r = EventRecord::new();
        r.set_str("met_pt", "nope");
        assert!(r.get_f64("met_pt").is_err());
    }

    #[test]
    fn numeric_flags_coerce_to_bool() {
        let mut r = EventRecord::new();
        r.set_f64("hpp1_passMedium", 1.0).set_f64("hpp2_passMedium", 0.0);
        assert!(r.get_bool("hpp1_passMedium").unwrap());
        assert!(!r.get_bool("hpp2_passMedium").unwrap());
    }

    #[test]
    fn optional_field() {
        let mut r = EventRecord::new();
        assert_eq!(r.get_f64_opt("qqZZkfactor").unwrap(), None);
        r.set_f64("qqZZkfactor", 1.21);
        assert_eq!(r.get_f64_opt("qqZZkfactor").unwrap(), Some(1.21));
    }

    #[test]
    fn deserializes_from_json_object() {
        let r: EventRecord = serde_json::from_str(
            r#"{"isData": true, "channel": "eem", "met_pt": 42.0}"#,
        )
        .unwrap();
        assert!(r.is_data().unwrap());
        assert_eq!(r.get_f64("met_pt").unwrap(), 42.0);
    }
}
