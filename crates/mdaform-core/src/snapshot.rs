#![forbid(unsafe_code)]

//! Stable baselines for change detection.

use std::collections::{BTreeMap, BTreeSet};

use crate::value::FieldMap;

/// Field name → canonical value, captured at load or reset time.
///
/// A snapshot is replaced wholesale and never edited field-by-field. Keys
/// absent from the snapshot compare as `""`, so adding an empty field to a
/// form does not make it dirty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormSnapshot {
    values: BTreeMap<String, String>,
}

impl FormSnapshot {
    /// Capture the canonical form of every field in `fields`.
    #[must_use]
    pub fn capture(fields: &FieldMap) -> Self {
        Self {
            values: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.canonical()))
                .collect(),
        }
    }

    /// Canonical value stored for `name` (`""` when absent).
    #[must_use]
    pub fn get(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    /// Number of captured fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no fields were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate captured fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys of `current` whose canonical value differs from this snapshot.
    #[must_use]
    pub fn differing_fields(&self, current: &FieldMap) -> BTreeSet<String> {
        current
            .iter()
            .filter(|(name, value)| value.canonical() != self.get(name))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Whether any key of `current` differs from this snapshot.
    #[must_use]
    pub fn differs_from(&self, current: &FieldMap) -> bool {
        current
            .iter()
            .any(|(name, value)| value.canonical() != self.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Scalar;

    #[test]
    fn capture_then_compare_is_clean() {
        let fields = FieldMap::new().with("name", "Apollo").with("hours", 4_i64);
        let snap = FormSnapshot::capture(&fields);
        assert!(!snap.differs_from(&fields));
        assert!(snap.differing_fields(&fields).is_empty());
    }

    #[test]
    fn added_empty_field_is_not_a_change() {
        let snap = FormSnapshot::capture(&FieldMap::new().with("name", "Apollo"));
        let current = FieldMap::new()
            .with("name", "Apollo")
            .with("notes", Scalar::Null);
        assert!(!snap.differs_from(&current));
    }

    #[test]
    fn differing_fields_lists_only_changed_keys() {
        let snap = FormSnapshot::capture(&FieldMap::new().with("a", "1").with("b", "2"));
        let current = FieldMap::new().with("a", "1").with("b", "3");
        let diff = snap.differing_fields(&current);
        assert_eq!(diff.into_iter().collect::<Vec<_>>(), vec!["b".to_string()]);
    }
}
