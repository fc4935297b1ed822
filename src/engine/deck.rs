use std::collections::BTreeSet;
use std::sync::Arc;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::{Dataset, DatasetKind, Entry, Field};
use crate::engine::filter::{self, CharacterFilter, FilterSelection};
use crate::store::disabled::DisabledSetStore;
use crate::store::schema::DisabledSet;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeckError {
    #[error("no more items: enable some or change the filters")]
    EmptyPool,
}

/// Picks one candidate uniformly at random. Draws are independent, so the
/// same entry can come up twice in a row.
pub fn pick<'a, T, R: Rng + ?Sized>(candidates: &'a [T], rng: &mut R) -> Result<&'a T, DeckError> {
    if candidates.is_empty() {
        return Err(DeckError::EmptyPool);
    }
    Ok(&candidates[rng.gen_range(0..candidates.len())])
}

/// Serializable view of a deck's state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSnapshot {
    pub dataset: DatasetKind,
    pub current: Option<String>,
    pub revealed: Vec<Field>,
    pub disabled: DisabledSet,
    pub selection: FilterSelection,
}

/// Practice state for one dataset: the current card, which of its fields
/// are revealed, the filter selection and the disabled set.
///
/// Every change to the disabled set is handed to the store, if any, right
/// away. The in-memory set is what draws use regardless of whether the
/// save succeeds.
pub struct PracticeDeck {
    dataset: Arc<Dataset>,
    selection: FilterSelection,
    disabled: DisabledSet,
    current: Option<usize>,
    revealed: BTreeSet<Field>,
    store: Option<Arc<DisabledSetStore>>,
    rng: SmallRng,
}

impl PracticeDeck {
    pub fn new(dataset: Arc<Dataset>, store: Option<Arc<DisabledSetStore>>) -> Self {
        let kind = dataset.kind();
        let disabled = store
            .as_ref()
            .map(|s| s.load(kind))
            .unwrap_or_default();
        Self {
            dataset,
            selection: FilterSelection::defaults_for(kind),
            disabled,
            current: None,
            revealed: BTreeSet::new(),
            store,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Rebuilds a deck from a snapshot. The snapshot's disabled set wins over
    /// whatever the store holds and is saved back.
    pub fn restore(
        dataset: Arc<Dataset>,
        snapshot: DeckSnapshot,
        store: Option<Arc<DisabledSetStore>>,
    ) -> Self {
        let current = snapshot
            .current
            .as_deref()
            .and_then(|key| dataset.position(key));
        let deck = Self {
            dataset,
            selection: snapshot.selection,
            disabled: snapshot.disabled,
            current,
            revealed: snapshot.revealed.into_iter().collect(),
            store,
            rng: SmallRng::from_entropy(),
        };
        deck.persist();
        deck
    }

    pub fn with_rng(mut self, rng: SmallRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn kind(&self) -> DatasetKind {
        self.dataset.kind()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    /// Entries a draw would choose from right now.
    pub fn candidates(&self) -> Vec<&Entry> {
        filter::filter_entries(
            self.kind(),
            self.dataset.entries(),
            &self.selection,
            &self.disabled,
        )
    }

    pub fn available_count(&self) -> usize {
        self.candidates().len()
    }

    /// Draws a new current card and hides all of its fields. On an empty
    /// pool nothing changes.
    pub fn next(&mut self) -> Result<&Entry, DeckError> {
        let positions = filter::filter_positions(
            self.kind(),
            self.dataset.entries(),
            &self.selection,
            &self.disabled,
        );
        let idx = *pick(&positions, &mut self.rng)?;
        self.current = Some(idx);
        self.revealed.clear();
        Ok(&self.dataset.entries()[idx])
    }

    pub fn current(&self) -> Option<&Entry> {
        self.current.map(|idx| &self.dataset.entries()[idx])
    }

    /// Flips a reveal flag on the current card. Returns the new state, or
    /// `false` when no card is showing.
    pub fn toggle_reveal(&mut self, field: Field) -> bool {
        if self.current.is_none() {
            return false;
        }
        if self.revealed.remove(&field) {
            false
        } else {
            self.revealed.insert(field);
            true
        }
    }

    pub fn is_revealed(&self, field: Field) -> bool {
        self.revealed.contains(&field)
    }

    pub fn is_disabled(&self, key: &str) -> bool {
        self.disabled.contains(key)
    }

    pub fn disabled(&self) -> &DisabledSet {
        &self.disabled
    }

    pub fn disabled_count(&self) -> usize {
        self.disabled.len()
    }

    /// Returns whether `key` is disabled afterwards.
    pub fn toggle_disabled(&mut self, key: &str) -> bool {
        let now_disabled = self.disabled.toggle(key);
        tracing::debug!(
            "{} {key} in {}",
            if now_disabled { "disabled" } else { "enabled" },
            self.kind()
        );
        self.persist();
        now_disabled
    }

    pub fn toggle_current_disabled(&mut self) -> Option<bool> {
        let key = self.current()?.key.clone();
        Some(self.toggle_disabled(&key))
    }

    /// Disables exactly the entries at the selected levels. Character filter
    /// and search do not narrow it, and entries at other levels are
    /// re-enabled.
    pub fn disable_all(&mut self) {
        let keys: Vec<String> = filter::level_population(
            self.kind(),
            self.dataset.entries(),
            &self.selection.levels,
        )
        .into_iter()
        .map(|e| e.key.clone())
        .collect();
        self.disabled.replace(keys);
        self.persist();
    }

    pub fn enable_all(&mut self) {
        self.disabled.clear();
        self.persist();
    }

    pub fn toggle_level(&mut self, level: u8) {
        self.selection.toggle_level(level);
    }

    pub fn set_levels(&mut self, levels: impl IntoIterator<Item = u8>) {
        self.selection.levels = levels.into_iter().collect();
    }

    pub fn set_character_filter(&mut self, character_filter: CharacterFilter) {
        self.selection.character_filter = character_filter;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.selection.search = search.into();
    }

    pub fn clear_filters(&mut self) {
        self.selection = FilterSelection::defaults_for(self.kind());
    }

    pub fn snapshot(&self) -> DeckSnapshot {
        DeckSnapshot {
            dataset: self.kind(),
            current: self.current().map(|e| e.key.clone()),
            revealed: self.revealed.iter().copied().collect(),
            disabled: self.disabled.clone(),
            selection: self.selection.clone(),
        }
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            store.save(self.kind(), &self.disabled);
        }
    }
}
