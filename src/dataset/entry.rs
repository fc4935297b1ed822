use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dataset::DatasetKind;

/// A displayable field of an entry. Reveal flags and search both work in
/// terms of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Simplified,
    Traditional,
    Kanji,
    Pinyin,
    Jyutping,
    HanViet,
    Onyomi,
    Kunyomi,
    Vietnamese,
    English,
    WrittenCantonese,
    CantoneseJyutping,
}

const WORD_SEARCH_FIELDS: &[Field] = &[
    Field::Simplified,
    Field::Traditional,
    Field::Pinyin,
    Field::Jyutping,
    Field::HanViet,
    Field::Vietnamese,
    Field::English,
];

const KANJI_SEARCH_FIELDS: &[Field] = &[
    Field::Kanji,
    Field::Onyomi,
    Field::Kunyomi,
    Field::HanViet,
    Field::Vietnamese,
    Field::English,
];

const WORD_REVEAL_FIELDS: &[Field] = &[
    Field::Simplified,
    Field::Traditional,
    Field::Pinyin,
    Field::Jyutping,
    Field::HanViet,
    Field::Vietnamese,
    Field::English,
];

const KANJI_REVEAL_FIELDS: &[Field] = &[
    Field::Onyomi,
    Field::Kunyomi,
    Field::HanViet,
    Field::Vietnamese,
    Field::English,
];

const SENTENCE_REVEAL_FIELDS: &[Field] = &[
    Field::Simplified,
    Field::Traditional,
    Field::Pinyin,
    Field::Jyutping,
    Field::HanViet,
    Field::WrittenCantonese,
    Field::CantoneseJyutping,
    Field::Vietnamese,
    Field::English,
];

impl Field {
    pub fn searchable(kind: DatasetKind) -> &'static [Field] {
        match kind {
            DatasetKind::Hsk | DatasetKind::Tocfl | DatasetKind::Sentences => WORD_SEARCH_FIELDS,
            DatasetKind::Kanji => KANJI_SEARCH_FIELDS,
        }
    }

    /// Fields a learner can reveal on the practice card, in display order.
    pub fn revealable(kind: DatasetKind) -> &'static [Field] {
        match kind {
            DatasetKind::Hsk | DatasetKind::Tocfl => WORD_REVEAL_FIELDS,
            DatasetKind::Kanji => KANJI_REVEAL_FIELDS,
            DatasetKind::Sentences => SENTENCE_REVEAL_FIELDS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Simplified => "simplified",
            Field::Traditional => "traditional",
            Field::Kanji => "kanji",
            Field::Pinyin => "pinyin",
            Field::Jyutping => "jyutping",
            Field::HanViet => "hanviet",
            Field::Onyomi => "onyomi",
            Field::Kunyomi => "kunyomi",
            Field::Vietnamese => "vietnamese",
            Field::English => "english",
            Field::WrittenCantonese => "cantonese",
            Field::CantoneseJyutping => "cantonese_jyutping",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simplified" | "simp" => Ok(Field::Simplified),
            "traditional" | "trad" => Ok(Field::Traditional),
            "kanji" => Ok(Field::Kanji),
            "pinyin" | "py" => Ok(Field::Pinyin),
            "jyutping" | "jp" => Ok(Field::Jyutping),
            "hanviet" | "han-viet" | "hv" => Ok(Field::HanViet),
            "onyomi" | "on" => Ok(Field::Onyomi),
            "kunyomi" | "kun" => Ok(Field::Kunyomi),
            "vietnamese" | "viet" | "vi" => Ok(Field::Vietnamese),
            "english" | "en" => Ok(Field::English),
            "cantonese" | "written_cantonese" => Ok(Field::WrittenCantonese),
            "cantonese_jyutping" => Ok(Field::CantoneseJyutping),
            other => Err(format!("unknown field: {other}")),
        }
    }
}

/// One vocabulary item, normalised across datasets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Dataset-scoped key used by the disabled set.
    pub key: String,
    pub id: String,
    pub level: Option<u8>,
    pub character_count: Option<u32>,
    pub simplified: Option<String>,
    pub traditional: Option<String>,
    pub kanji: Option<String>,
    pub pinyin: Option<String>,
    pub jyutping: Option<String>,
    pub hanviet: Option<String>,
    pub onyomi: Option<String>,
    pub kunyomi: Option<String>,
    pub vietnamese: Option<String>,
    pub english: Option<String>,
    pub written_cantonese: Option<String>,
    pub cantonese_jyutping: Option<String>,
}

impl Entry {
    pub fn field(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::Simplified => &self.simplified,
            Field::Traditional => &self.traditional,
            Field::Kanji => &self.kanji,
            Field::Pinyin => &self.pinyin,
            Field::Jyutping => &self.jyutping,
            Field::HanViet => &self.hanviet,
            Field::Onyomi => &self.onyomi,
            Field::Kunyomi => &self.kunyomi,
            Field::Vietnamese => &self.vietnamese,
            Field::English => &self.english,
            Field::WrittenCantonese => &self.written_cantonese,
            Field::CantoneseJyutping => &self.cantonese_jyutping,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }
}

/// Counts CJK Unified Ideographs, the same range the dataset tooling uses
/// when it fills in `characterCount`.
pub fn count_ideographs(text: &str) -> u32 {
    text.chars()
        .filter(|c| ('\u{4e00}'..='\u{9fff}').contains(c))
        .count() as u32
}
