use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use icu_normalizer::ComposingNormalizerBorrowed;
use serde::{Deserialize, Serialize};

use crate::dataset::{DatasetKind, Entry, Field};
use crate::store::schema::DisabledSet;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterFilter {
    #[default]
    All,
    Single,
    Multi,
}

impl CharacterFilter {
    pub fn matches(self, count: Option<u32>) -> bool {
        match self {
            CharacterFilter::All => true,
            CharacterFilter::Single => count == Some(1),
            CharacterFilter::Multi => count.is_some_and(|c| c > 1),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CharacterFilter::All => "all",
            CharacterFilter::Single => "single",
            CharacterFilter::Multi => "multi",
        }
    }
}

impl fmt::Display for CharacterFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CharacterFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(CharacterFilter::All),
            "single" => Ok(CharacterFilter::Single),
            "multi" => Ok(CharacterFilter::Multi),
            other => Err(format!("unknown character filter '{other}' (expected all, single or multi)")),
        }
    }
}

/// What the learner currently filters by. Not persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub levels: BTreeSet<u8>,
    pub character_filter: CharacterFilter,
    pub search: String,
}

impl FilterSelection {
    /// Level 1 for levelled datasets, nothing for sentences.
    pub fn defaults_for(kind: DatasetKind) -> Self {
        let levels = if kind.has_levels() {
            BTreeSet::from([1])
        } else {
            BTreeSet::new()
        };
        Self {
            levels,
            character_filter: CharacterFilter::All,
            search: String::new(),
        }
    }

    pub fn toggle_level(&mut self, level: u8) {
        if !self.levels.remove(&level) {
            self.levels.insert(level);
        }
    }
}

/// Case-folds text for search: NFC first so precomposed and combining
/// tone marks compare equal, then lower-case.
pub fn fold(text: &str) -> String {
    ComposingNormalizerBorrowed::new_nfc()
        .normalize(text)
        .to_lowercase()
}

/// Entries at one of the selected levels, ignoring every other filter.
/// Datasets without levels pass through whole.
pub fn level_population<'a, I>(kind: DatasetKind, entries: I, levels: &BTreeSet<u8>) -> Vec<&'a Entry>
where
    I: IntoIterator<Item = &'a Entry>,
{
    entries
        .into_iter()
        .filter(|entry| in_levels(kind, entry, levels))
        .collect()
}

/// Applies level, disabled, character-count and search filters in that
/// order, keeping the input order.
pub fn filter_entries<'a, I>(
    kind: DatasetKind,
    entries: I,
    selection: &FilterSelection,
    disabled: &DisabledSet,
) -> Vec<&'a Entry>
where
    I: IntoIterator<Item = &'a Entry>,
{
    let filter = Filter::new(kind, selection, disabled);
    entries.into_iter().filter(|entry| filter.keeps(entry)).collect()
}

/// Same as [`filter_entries`], but yields positions into `entries`.
pub fn filter_positions(
    kind: DatasetKind,
    entries: &[Entry],
    selection: &FilterSelection,
    disabled: &DisabledSet,
) -> Vec<usize> {
    let filter = Filter::new(kind, selection, disabled);
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| filter.keeps(entry))
        .map(|(idx, _)| idx)
        .collect()
}

struct Filter<'s> {
    kind: DatasetKind,
    selection: &'s FilterSelection,
    disabled: &'s DisabledSet,
    query: String,
    fields: &'static [Field],
}

impl<'s> Filter<'s> {
    fn new(kind: DatasetKind, selection: &'s FilterSelection, disabled: &'s DisabledSet) -> Self {
        Self {
            kind,
            selection,
            disabled,
            query: fold(selection.search.trim()),
            fields: Field::searchable(kind),
        }
    }

    fn keeps(&self, entry: &Entry) -> bool {
        in_levels(self.kind, entry, &self.selection.levels)
            && !self.disabled.contains(&entry.key)
            && (!self.kind.has_character_count()
                || self.selection.character_filter.matches(entry.character_count))
            && (self.query.is_empty() || matches_query(entry, self.fields, &self.query))
    }
}

fn in_levels(kind: DatasetKind, entry: &Entry, levels: &BTreeSet<u8>) -> bool {
    if !kind.has_levels() {
        return true;
    }
    entry.level.is_some_and(|level| levels.contains(&level))
}

fn matches_query(entry: &Entry, fields: &[Field], folded_query: &str) -> bool {
    fields
        .iter()
        .filter_map(|&field| entry.field(field))
        .any(|value| fold(value).contains(folded_query))
}
