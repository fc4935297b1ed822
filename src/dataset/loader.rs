use std::borrow::Cow;
use std::fs;
use std::path::Path;

use rust_embed::Embed;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::dataset::entry::{Entry, count_ideographs};
use crate::dataset::{DatasetError, DatasetKind};

#[derive(Embed)]
#[folder = "assets/"]
struct BundledData;

/// One source file and the level its records belong to.
pub struct DatasetFile {
    pub kind: DatasetKind,
    pub level: Option<u8>,
    pub name: &'static str,
}

pub const DATASET_FILES: &[DatasetFile] = &[
    DatasetFile {
        kind: DatasetKind::Hsk,
        level: Some(1),
        name: "hsk_level1.json",
    },
    DatasetFile {
        kind: DatasetKind::Hsk,
        level: Some(2),
        name: "hsk_level2.json",
    },
    DatasetFile {
        kind: DatasetKind::Tocfl,
        level: Some(1),
        name: "tocfl_level1.json",
    },
    DatasetFile {
        kind: DatasetKind::Kanji,
        level: Some(1),
        name: "kanji_grade1.json",
    },
    DatasetFile {
        kind: DatasetKind::Kanji,
        level: Some(2),
        name: "kanji_grade2.json",
    },
    DatasetFile {
        kind: DatasetKind::Sentences,
        level: None,
        name: "sentences.json",
    },
];

/// Numeric ids in the word lists, but tolerate string ids too.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WordRecord {
    id: Option<RawId>,
    #[serde(default, alias = "simplified")]
    simplified_chinese: Option<String>,
    #[serde(default, alias = "traditional")]
    traditional_chinese: Option<String>,
    #[serde(default)]
    pinyin: Option<String>,
    #[serde(default)]
    jyutping: Option<String>,
    #[serde(default)]
    hanviet: Option<String>,
    #[serde(default)]
    english: Option<String>,
    #[serde(default, alias = "viet")]
    vietnamese: Option<String>,
    #[serde(default)]
    character_count: Option<u32>,
}

#[derive(Deserialize)]
struct KanjiRecord {
    kanji: String,
    #[serde(default)]
    onyomi: Option<String>,
    #[serde(default)]
    kunyomi: Option<String>,
    #[serde(default)]
    hanviet: Option<String>,
    #[serde(default, alias = "vietnamese")]
    viet: Option<String>,
    #[serde(default)]
    english: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SentenceRecord {
    #[serde(default)]
    id: Option<RawId>,
    #[serde(default, alias = "simplifiedChinese")]
    simplified: Option<String>,
    #[serde(default, alias = "traditionalChinese")]
    traditional: Option<String>,
    #[serde(default)]
    pinyin: Option<String>,
    #[serde(default)]
    jyutping: Option<String>,
    #[serde(default)]
    hanviet: Option<String>,
    #[serde(default)]
    written_cantonese: Option<String>,
    #[serde(default)]
    cantonese_jyutping: Option<String>,
    #[serde(default, alias = "vietnamese")]
    viet: Option<String>,
    #[serde(default)]
    english: Option<String>,
}

/// Loads every file of `kind` in manifest order. Unreadable or malformed
/// files are logged and contribute nothing.
pub fn load_entries(kind: DatasetKind, override_dir: Option<&Path>) -> Vec<Entry> {
    let mut entries = Vec::new();
    for file in DATASET_FILES.iter().filter(|f| f.kind == kind) {
        let Some(bytes) = read_source(file.name, override_dir) else {
            tracing::warn!("dataset file {} not found; skipping", file.name);
            continue;
        };
        match parse_file(file, &bytes) {
            Ok(parsed) => entries.extend(parsed),
            Err(e) => tracing::warn!("{e}"),
        }
    }
    entries
}

fn read_source(name: &str, override_dir: Option<&Path>) -> Option<Cow<'static, [u8]>> {
    if let Some(dir) = override_dir {
        let path = dir.join(name);
        if path.exists() {
            match fs::read(&path) {
                Ok(bytes) => return Some(Cow::Owned(bytes)),
                Err(source) => {
                    let err = DatasetError::Read {
                        name: path.display().to_string(),
                        source,
                    };
                    tracing::warn!("{err}; falling back to bundled copy");
                }
            }
        }
    }
    BundledData::get(name).map(|file| file.data)
}

pub fn parse_file(file: &DatasetFile, bytes: &[u8]) -> Result<Vec<Entry>, DatasetError> {
    let values: Vec<serde_json::Value> =
        serde_json::from_slice(bytes).map_err(|source| DatasetError::Parse {
            name: file.name.to_string(),
            source,
        })?;

    let mut entries = Vec::with_capacity(values.len());
    for (idx, value) in values.into_iter().enumerate() {
        let entry = match file.kind {
            DatasetKind::Hsk | DatasetKind::Tocfl => {
                record::<WordRecord>(file, idx, value).and_then(|r| word_entry(r, file.level))
            }
            DatasetKind::Kanji => record::<KanjiRecord>(file, idx, value)
                .filter(|r| !r.kanji.is_empty())
                .map(|r| kanji_entry(r, file.level)),
            DatasetKind::Sentences => {
                record::<SentenceRecord>(file, idx, value).and_then(sentence_entry)
            }
        };
        if let Some(entry) = entry {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// A record that doesn't match the expected shape is skipped, not fatal.
fn record<T: DeserializeOwned>(file: &DatasetFile, idx: usize, value: serde_json::Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!("skipping record {idx} of {}: {e}", file.name);
            None
        }
    }
}

/// Words key on their record id. A record without one falls back to its
/// text, like sentences; a record with neither is dropped.
fn word_entry(record: WordRecord, level: Option<u8>) -> Option<Entry> {
    let id = match record.id {
        Some(id) => id.into_string(),
        None => record
            .simplified_chinese
            .clone()
            .or_else(|| record.traditional_chinese.clone())
            .filter(|text| !text.is_empty())?,
    };
    let key = match level {
        Some(level) => format!("{level}-{id}"),
        None => id.clone(),
    };
    let character_count = record.character_count.or_else(|| {
        record
            .simplified_chinese
            .as_deref()
            .or(record.traditional_chinese.as_deref())
            .map(count_ideographs)
    });
    Some(Entry {
        key,
        id,
        level,
        character_count,
        simplified: record.simplified_chinese,
        traditional: record.traditional_chinese,
        pinyin: record.pinyin,
        jyutping: record.jyutping,
        hanviet: record.hanviet,
        vietnamese: record.vietnamese,
        english: record.english,
        ..Entry::default()
    })
}

fn kanji_entry(record: KanjiRecord, level: Option<u8>) -> Entry {
    Entry {
        key: record.kanji.clone(),
        id: record.kanji.clone(),
        level,
        kanji: Some(record.kanji),
        onyomi: record.onyomi,
        kunyomi: record.kunyomi,
        hanviet: record.hanviet,
        vietnamese: record.viet,
        english: record.english,
        ..Entry::default()
    }
}

/// Sentences key on their own id or, lacking one, on their text. Never on
/// their position, which shifts when the file is edited.
fn sentence_entry(record: SentenceRecord) -> Option<Entry> {
    let id = match record.id {
        Some(id) => id.into_string(),
        None => record
            .simplified
            .clone()
            .or_else(|| record.traditional.clone())
            .filter(|text| !text.is_empty())?,
    };
    Some(Entry {
        key: format!("sentence-{id}"),
        id,
        level: None,
        simplified: record.simplified,
        traditional: record.traditional,
        pinyin: record.pinyin,
        jyutping: record.jyutping,
        hanviet: record.hanviet,
        written_cantonese: record.written_cantonese,
        cantonese_jyutping: record.cantonese_jyutping,
        vietnamese: record.viet,
        english: record.english,
        ..Entry::default()
    })
}
