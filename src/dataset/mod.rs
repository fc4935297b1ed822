pub mod entry;
pub mod loader;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use entry::{Entry, Field};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset file {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("dataset file {name} is not a JSON array: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Hsk,
    Tocfl,
    Kanji,
    Sentences,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 4] = [
        DatasetKind::Hsk,
        DatasetKind::Tocfl,
        DatasetKind::Kanji,
        DatasetKind::Sentences,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DatasetKind::Hsk => "hsk",
            DatasetKind::Tocfl => "tocfl",
            DatasetKind::Kanji => "kanji",
            DatasetKind::Sentences => "sentences",
        }
    }

    /// Persistence key of this dataset's disabled set.
    pub fn storage_key(self) -> &'static str {
        match self {
            DatasetKind::Hsk => "kanji_viet_hsk_disabled",
            DatasetKind::Tocfl => "kanji_viet_tocfl_disabled",
            DatasetKind::Kanji => "kanji_viet_kanji_disabled",
            DatasetKind::Sentences => "kanji_viet_sentences_disabled",
        }
    }

    pub fn has_levels(self) -> bool {
        !matches!(self, DatasetKind::Sentences)
    }

    pub fn has_character_count(self) -> bool {
        matches!(self, DatasetKind::Hsk | DatasetKind::Tocfl)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hsk" => Ok(DatasetKind::Hsk),
            "tocfl" => Ok(DatasetKind::Tocfl),
            "kanji" => Ok(DatasetKind::Kanji),
            "sentences" | "sentence" => Ok(DatasetKind::Sentences),
            other => Err(format!(
                "unknown dataset '{other}' (expected hsk, tocfl, kanji or sentences)"
            )),
        }
    }
}

/// All entries of one dataset type, in canonical load order.
pub struct Dataset {
    kind: DatasetKind,
    entries: Vec<Entry>,
    positions: HashMap<String, usize>,
}

impl Dataset {
    /// Builds the dataset, making every key unique: a key seen before gets
    /// a `#n` suffix.
    pub fn new(kind: DatasetKind, mut entries: Vec<Entry>) -> Self {
        let mut positions = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter_mut().enumerate() {
            if positions.contains_key(&entry.key) {
                let base = entry.key.clone();
                let mut n = 2;
                while positions.contains_key(&format!("{base}#{n}")) {
                    n += 1;
                }
                entry.key = format!("{base}#{n}");
                tracing::debug!("duplicate {kind} key {base}, renamed to {}", entry.key);
            }
            positions.insert(entry.key.clone(), idx);
        }
        Self {
            kind,
            entries,
            positions,
        }
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.position(key).map(|idx| &self.entries[idx])
    }

    /// Levels (or grades) present in the loaded data.
    pub fn levels(&self) -> BTreeSet<u8> {
        self.entries.iter().filter_map(|e| e.level).collect()
    }
}

/// Every dataset the app knows about, loaded once at startup.
pub struct Library {
    datasets: BTreeMap<DatasetKind, Arc<Dataset>>,
}

impl Library {
    /// Loads bundled datasets, letting files in `override_dir` replace
    /// bundled files of the same name.
    pub fn load(override_dir: Option<&Path>) -> Self {
        let datasets = DatasetKind::ALL
            .into_iter()
            .map(|kind| {
                let entries = loader::load_entries(kind, override_dir);
                (kind, Arc::new(Dataset::new(kind, entries)))
            })
            .collect();
        Self { datasets }
    }

    pub fn get(&self, kind: DatasetKind) -> Arc<Dataset> {
        // `load` inserts every kind.
        Arc::clone(&self.datasets[&kind])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, level: Option<u8>) -> Entry {
        Entry {
            key: key.to_string(),
            id: key.to_string(),
            level,
            ..Entry::default()
        }
    }

    #[test]
    fn test_duplicate_keys_get_suffix() {
        let dataset = Dataset::new(
            DatasetKind::Kanji,
            vec![
                entry("日", Some(1)),
                entry("日", Some(1)),
                entry("日", Some(2)),
            ],
        );
        let keys: Vec<&str> = dataset.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["日", "日#2", "日#3"]);
        assert_eq!(dataset.position("日#3"), Some(2));
    }

    #[test]
    fn test_levels_collects_present_levels() {
        let dataset = Dataset::new(
            DatasetKind::Hsk,
            vec![entry("1-1", Some(1)), entry("2-1", Some(2)), entry("2-2", Some(2))],
        );
        assert_eq!(dataset.levels(), BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_dataset_kind_round_trips_through_str() {
        for kind in DatasetKind::ALL {
            assert_eq!(kind.as_str().parse::<DatasetKind>().unwrap(), kind);
        }
        assert!("hsk7".parse::<DatasetKind>().is_err());
    }

    #[test]
    fn test_storage_keys_are_independent() {
        let keys: BTreeSet<&str> = DatasetKind::ALL.iter().map(|k| k.storage_key()).collect();
        assert_eq!(keys.len(), DatasetKind::ALL.len());
    }
}
