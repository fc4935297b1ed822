//! Plain-text rendering of decks for the command line.
//!
//! Everything here reads [`Config`] and deck state and returns strings; it
//! never mutates a deck.

use std::fmt::Write;

use rust_i18n::t;

use crate::config::{Config, DisplayMode};
use crate::dataset::{DatasetKind, Entry, Field};
use crate::engine::PracticeDeck;

const HIDDEN: &str = "•••";

pub fn field_label(field: Field, locale: &str) -> String {
    match field {
        Field::Simplified => t!("field.simplified", locale = locale),
        Field::Traditional => t!("field.traditional", locale = locale),
        Field::Kanji => t!("field.kanji", locale = locale),
        Field::Pinyin => t!("field.pinyin", locale = locale),
        Field::Jyutping => t!("field.jyutping", locale = locale),
        Field::HanViet => t!("field.hanviet", locale = locale),
        Field::Onyomi => t!("field.onyomi", locale = locale),
        Field::Kunyomi => t!("field.kunyomi", locale = locale),
        Field::Vietnamese => t!("field.vietnamese", locale = locale),
        Field::English => t!("field.english", locale = locale),
        Field::WrittenCantonese => t!("field.cantonese", locale = locale),
        Field::CantoneseJyutping => t!("field.cantonese_jyutping", locale = locale),
    }
    .to_string()
}

pub fn dataset_label(kind: DatasetKind, locale: &str) -> String {
    match kind {
        DatasetKind::Hsk => t!("dataset.hsk", locale = locale),
        DatasetKind::Tocfl => t!("dataset.tocfl", locale = locale),
        DatasetKind::Kanji => t!("dataset.kanji", locale = locale),
        DatasetKind::Sentences => t!("dataset.sentences", locale = locale),
    }
    .to_string()
}

/// Headline text of a card. Chinese cards follow the configured script and
/// fall back to the other one when a record only has one.
pub fn headline(entry: &Entry, config: &Config) -> String {
    let (first, second) = match config.main_display_mode {
        DisplayMode::Traditional => (Field::Traditional, Field::Simplified),
        DisplayMode::Simplified => (Field::Simplified, Field::Traditional),
    };
    entry
        .field(Field::Kanji)
        .or_else(|| entry.field(first))
        .or_else(|| entry.field(second))
        .unwrap_or_default()
        .to_string()
}

/// The field the headline already shows, so it is not listed again.
fn headline_field(entry: &Entry, config: &Config) -> Option<Field> {
    if entry.field(Field::Kanji).is_some() {
        return Some(Field::Kanji);
    }
    let preferred = match config.main_display_mode {
        DisplayMode::Traditional => Field::Traditional,
        DisplayMode::Simplified => Field::Simplified,
    };
    if entry.field(preferred).is_some() {
        Some(preferred)
    } else {
        [Field::Simplified, Field::Traditional]
            .into_iter()
            .find(|f| entry.field(*f).is_some())
    }
}

/// Fields of the current card the learner can interact with, in display
/// order: shown by config, present on the entry, not the headline.
pub fn card_fields(deck: &PracticeDeck, config: &Config) -> Vec<Field> {
    let Some(entry) = deck.current() else {
        return Vec::new();
    };
    let skip = headline_field(entry, config);
    Field::revealable(deck.kind())
        .iter()
        .copied()
        .filter(|f| Some(*f) != skip && config.shows(*f) && entry.field(*f).is_some())
        .collect()
}

pub fn render_card(deck: &PracticeDeck, config: &Config) -> String {
    let locale = config.locale.as_str();
    let Some(entry) = deck.current() else {
        return t!("card.idle", locale = locale).to_string();
    };

    let mut out = String::new();
    let mut title = headline(entry, config);
    if let Some(level) = entry.level {
        let _ = write!(title, "  [{}]", level_label(deck.kind(), level, locale));
    }
    if deck.is_disabled(&entry.key) {
        let _ = write!(title, "  ({})", t!("card.disabled", locale = locale));
    }
    let _ = writeln!(out, "{title}");

    let fields = card_fields(deck, config);
    let width = fields
        .iter()
        .map(|f| field_label(*f, locale).chars().count())
        .max()
        .unwrap_or(0);
    for field in fields {
        let label = field_label(field, locale);
        let value = if deck.is_revealed(field) {
            entry.field(field).unwrap_or_default()
        } else {
            HIDDEN
        };
        let pad = width.saturating_sub(label.chars().count());
        let _ = writeln!(out, "  {label}{:pad$}  {value}", "");
    }
    out
}

pub fn level_label(kind: DatasetKind, level: u8, locale: &str) -> String {
    match kind {
        DatasetKind::Kanji => t!("level.grade", locale = locale, n = level).to_string(),
        _ => t!("level.level", locale = locale, n = level).to_string(),
    }
}

/// One line per entry: key, headline, and a gloss in the learner's
/// language when there is one.
pub fn render_list(entries: &[&Entry], config: &Config) -> String {
    let gloss_field = if config.locale == "vi" {
        [Field::Vietnamese, Field::English]
    } else {
        [Field::English, Field::Vietnamese]
    };
    let mut out = String::new();
    for entry in entries {
        let gloss = gloss_field
            .iter()
            .find_map(|f| entry.field(*f))
            .unwrap_or_default();
        let _ = writeln!(out, "{:<12} {}  {}", entry.key, headline(entry, config), gloss);
    }
    out
}

pub fn render_stats(deck: &PracticeDeck, locale: &str) -> String {
    let selection = deck.selection();
    let levels = if deck.kind().has_levels() {
        let list: Vec<String> = selection.levels.iter().map(u8::to_string).collect();
        if list.is_empty() {
            "-".to_string()
        } else {
            list.join(",")
        }
    } else {
        "-".to_string()
    };
    t!(
        "stats.summary",
        locale = locale,
        dataset = dataset_label(deck.kind(), locale),
        available = deck.available_count(),
        disabled = deck.disabled_count(),
        levels = levels,
        chars = selection.character_filter,
        search = selection.search.as_str()
    )
    .to_string()
}

pub fn empty_pool_message(locale: &str) -> String {
    t!("alert.empty_pool", locale = locale).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::sync::Arc;

    fn beijing() -> Entry {
        Entry {
            key: "1-5".to_string(),
            id: "5".to_string(),
            level: Some(1),
            character_count: Some(2),
            simplified: Some("北京".to_string()),
            traditional: Some("北京".to_string()),
            pinyin: Some("Běijīng".to_string()),
            english: Some("Beijing".to_string()),
            vietnamese: Some("Bắc Kinh".to_string()),
            ..Entry::default()
        }
    }

    fn study() -> Entry {
        Entry {
            key: "1-9".to_string(),
            id: "9".to_string(),
            level: Some(1),
            character_count: Some(2),
            simplified: Some("学习".to_string()),
            traditional: Some("學習".to_string()),
            pinyin: Some("xuéxí".to_string()),
            ..Entry::default()
        }
    }

    fn deck_with(entry: Entry) -> PracticeDeck {
        let dataset = Arc::new(Dataset::new(DatasetKind::Hsk, vec![entry]));
        let mut deck = PracticeDeck::new(dataset, None).with_rng(SmallRng::seed_from_u64(3));
        deck.next().unwrap();
        deck
    }

    #[test]
    fn test_headline_follows_display_mode() {
        let mut config = Config::default();
        assert_eq!(headline(&study(), &config), "學習");
        config.main_display_mode = DisplayMode::Simplified;
        assert_eq!(headline(&study(), &config), "学习");
    }

    #[test]
    fn test_headline_falls_back_to_other_script() {
        let config = Config::default();
        let entry = Entry {
            simplified: Some("猫".to_string()),
            ..Entry::default()
        };
        assert_eq!(headline(&entry, &config), "猫");
    }

    #[test]
    fn test_idle_card() {
        let deck = PracticeDeck::new(Arc::new(Dataset::new(DatasetKind::Hsk, vec![])), None);
        let out = render_card(&deck, &Config::default());
        assert!(!out.is_empty());
        assert!(!out.contains(HIDDEN));
    }

    #[test]
    fn test_fields_hidden_until_revealed() {
        let config = Config::default();
        let mut deck = deck_with(beijing());
        let out = render_card(&deck, &config);
        assert!(!out.contains("Beijing"));
        assert!(out.contains(HIDDEN));

        deck.toggle_reveal(Field::English);
        let out = render_card(&deck, &config);
        assert!(out.contains("Beijing"));
        assert!(!out.contains("Běijīng"));
    }

    #[test]
    fn test_config_hides_fields() {
        let mut config = Config::default();
        config.show_pinyin = false;
        let deck = deck_with(beijing());
        let fields = card_fields(&deck, &config);
        assert!(!fields.contains(&Field::Pinyin));
        assert!(fields.contains(&Field::English));
        // Missing on the entry, so nothing to reveal.
        assert!(!fields.contains(&Field::Jyutping));
        // Shown as the headline.
        assert!(!fields.contains(&Field::Traditional));
    }

    #[test]
    fn test_render_list_uses_locale_gloss() {
        let entry = beijing();
        let mut config = Config::default();
        assert!(render_list(&[&entry], &config).contains("Beijing"));
        config.locale = "vi".to_string();
        let out = render_list(&[&entry], &config);
        assert!(out.contains("Bắc Kinh"));
        assert!(out.starts_with("1-5"));
    }

    #[test]
    fn test_stats_mentions_counts() {
        let deck = deck_with(beijing());
        let out = render_stats(&deck, "en");
        assert!(out.contains('1'));
        assert!(out.contains("HSK"));
    }
}
