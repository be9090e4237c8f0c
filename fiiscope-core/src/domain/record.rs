//! The merged, provider-agnostic view of one fund.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::field::{FieldName, FieldValue};

/// Mapping of requested fields to their resolved values.
///
/// Every requested field is present as a key; fields nobody could resolve map
/// to `None`. Keys iterate (and serialize) in canonical `FieldName` order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalRecord {
    fields: BTreeMap<FieldName, Option<FieldValue>>,
}

impl CanonicalRecord {
    /// An all-null record over the given field set.
    pub fn empty(fields: &[FieldName]) -> Self {
        Self {
            fields: fields.iter().map(|f| (*f, None)).collect(),
        }
    }

    pub fn get(&self, field: FieldName) -> Option<&FieldValue> {
        self.fields.get(&field).and_then(Option::as_ref)
    }

    pub fn contains(&self, field: FieldName) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn is_filled(&self, field: FieldName) -> bool {
        self.get(field).is_some_and(FieldValue::is_filled)
    }

    /// Requested fields that are still unfilled, in canonical order.
    pub fn unfilled(&self) -> Vec<FieldName> {
        self.fields
            .iter()
            .filter(|(_, v)| !v.as_ref().is_some_and(FieldValue::is_filled))
            .map(|(f, _)| *f)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.unfilled().is_empty()
    }

    /// True when at least one field holds a filled value.
    pub fn has_any_value(&self) -> bool {
        self.fields
            .values()
            .any(|v| v.as_ref().is_some_and(FieldValue::is_filled))
    }

    /// Write `value` only if `field` was requested and is currently unfilled.
    ///
    /// Returns whether the write happened. Filled values are never overwritten.
    pub fn fill(&mut self, field: FieldName, value: FieldValue) -> bool {
        if !value.is_filled() {
            return false;
        }
        match self.fields.get_mut(&field) {
            Some(slot) if !slot.as_ref().is_some_and(FieldValue::is_filled) => {
                *slot = Some(value);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, Option<&FieldValue>)> {
        self.fields.iter().map(|(f, v)| (*f, v.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_record_lists_every_requested_field_as_unfilled() {
        let record = CanonicalRecord::empty(&[FieldName::Price, FieldName::Name]);
        assert_eq!(record.len(), 2);
        assert_eq!(record.unfilled(), vec![FieldName::Name, FieldName::Price]);
        assert!(!record.has_any_value());
    }

    #[test]
    fn fill_never_overwrites() {
        let mut record = CanonicalRecord::empty(&[FieldName::Price]);
        assert!(record.fill(FieldName::Price, 10.0.into()));
        assert!(!record.fill(FieldName::Price, 20.0.into()));
        assert_eq!(record.get(FieldName::Price), Some(&FieldValue::Number(10.0)));
    }

    #[test]
    fn fill_ignores_unrequested_and_blank_values() {
        let mut record = CanonicalRecord::empty(&[FieldName::Name]);
        assert!(!record.fill(FieldName::Price, 1.0.into()));
        assert!(!record.fill(FieldName::Name, "  ".into()));
        assert!(!record.contains(FieldName::Price));
        assert!(record.get(FieldName::Name).is_none());
    }

    #[test]
    fn serializes_in_canonical_order_with_nulls() {
        let mut record = CanonicalRecord::empty(&[FieldName::Dy, FieldName::Name]);
        record.fill(FieldName::Name, "FII Teste".into());
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"name":"FII Teste","DY":null}"#);

        let back: CanonicalRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
