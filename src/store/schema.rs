use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::DatasetKind;

/// Keys of entries excluded from random draws. Persisted as a plain JSON
/// array of strings, sorted so saved files diff cleanly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisabledSet(BTreeSet<String>);

impl DisabledSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    /// Flips membership and returns whether `key` is now disabled.
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.0.remove(key) {
            false
        } else {
            self.0.insert(key.to_string());
            true
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn replace<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0 = keys.into_iter().map(Into::into).collect();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for DisabledSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

pub const EXPORT_VERSION: u32 = 1;

/// Backup of every dataset's disabled set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportData {
    pub kanjiviet_export_version: u32,
    pub exported_at: DateTime<Utc>,
    pub disabled: BTreeMap<DatasetKind, DisabledSet>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_twice_restores_prior_state() {
        let mut set: DisabledSet = ["1-1", "1-2"].into_iter().collect();
        let before = set.clone();
        assert!(set.toggle("1-5"));
        assert!(!set.toggle("1-5"));
        assert_eq!(set, before);

        assert!(!set.toggle("1-1"));
        assert!(set.toggle("1-1"));
        assert_eq!(set, before);
    }

    #[test]
    fn test_serializes_as_sorted_json_array() {
        let set: DisabledSet = ["2-5", "1-5", "山"].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["1-5","2-5","山"]"#);
    }

    #[test]
    fn test_deserializes_array_with_duplicates() {
        let set: DisabledSet = serde_json::from_str(r#"["a", "b", "a"]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("a"));
    }

    #[test]
    fn test_export_keys_dataset_by_name() {
        let mut disabled = BTreeMap::new();
        disabled.insert(DatasetKind::Kanji, ["山"].into_iter().collect::<DisabledSet>());
        let export = ExportData {
            kanjiviet_export_version: EXPORT_VERSION,
            exported_at: Utc::now(),
            disabled,
        };
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["disabled"]["kanji"][0], "山");
    }
}
