use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::dataset::{DatasetKind, Field};

pub const SUPPORTED_LOCALES: &[&str] = &["en", "vi"];

/// Which script leads a Chinese card.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Traditional,
    Simplified,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DisplayMode::Traditional => "traditional",
            DisplayMode::Simplified => "simplified",
        })
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "traditional" | "trad" => Ok(DisplayMode::Traditional),
            "simplified" | "simp" => Ok(DisplayMode::Simplified),
            other => Err(format!("unknown display mode '{other}'")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub main_display_mode: DisplayMode,
    #[serde(default = "default_true")]
    pub show_simplified: bool,
    #[serde(default = "default_true")]
    pub show_pinyin: bool,
    #[serde(default = "default_true")]
    pub show_jyutping: bool,
    #[serde(default = "default_true")]
    pub show_hanviet: bool,
    #[serde(default = "default_true")]
    pub show_vietnamese: bool,
    #[serde(default = "default_true")]
    pub show_english: bool,
    #[serde(default = "default_dataset")]
    pub default_dataset: DatasetKind,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub data_dir: String,
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

fn default_true() -> bool {
    true
}
fn default_dataset() -> DatasetKind {
    DatasetKind::Hsk
}
fn default_locale() -> String {
    "en".to_string()
}
fn default_state_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kanjiviet")
        .to_string_lossy()
        .to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            main_display_mode: DisplayMode::default(),
            show_simplified: default_true(),
            show_pinyin: default_true(),
            show_jyutping: default_true(),
            show_hanviet: default_true(),
            show_vietnamese: default_true(),
            show_english: default_true(),
            default_dataset: default_dataset(),
            locale: default_locale(),
            data_dir: String::new(),
            state_dir: default_state_dir(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.normalize_locale();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kanjiviet")
            .join("config.toml")
    }

    /// Dataset override directory, if one is configured.
    pub fn data_dir(&self) -> Option<PathBuf> {
        let trimmed = self.data_dir.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    pub fn state_dir(&self) -> PathBuf {
        PathBuf::from(&self.state_dir)
    }

    /// Whether the renderer shows `field` at all. Fields without a setting
    /// are always shown.
    pub fn shows(&self, field: Field) -> bool {
        match field {
            Field::Simplified => self.show_simplified,
            Field::Pinyin => self.show_pinyin,
            Field::Jyutping | Field::CantoneseJyutping => self.show_jyutping,
            Field::HanViet => self.show_hanviet,
            Field::Vietnamese => self.show_vietnamese,
            Field::English => self.show_english,
            _ => true,
        }
    }

    /// Turns the visibility setting for `field` on or off. Fields without a
    /// setting are always shown and cannot be hidden.
    pub fn set_shown(&mut self, field: Field, shown: bool) -> Result<()> {
        let flag = match field {
            Field::Simplified => &mut self.show_simplified,
            Field::Pinyin => &mut self.show_pinyin,
            Field::Jyutping | Field::CantoneseJyutping => &mut self.show_jyutping,
            Field::HanViet => &mut self.show_hanviet,
            Field::Vietnamese => &mut self.show_vietnamese,
            Field::English => &mut self.show_english,
            other => bail!("{other} is always shown"),
        };
        *flag = shown;
        Ok(())
    }

    /// Resets `locale` to the default when it names a locale we don't ship.
    /// Region suffixes such as `vi-VN` or `en_US` are accepted.
    pub fn normalize_locale(&mut self) {
        let base = self
            .locale
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_lowercase();
        self.locale = if SUPPORTED_LOCALES.contains(&base.as_str()) {
            base
        } else {
            default_locale()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.main_display_mode, DisplayMode::Traditional);
        assert!(config.show_pinyin);
        assert!(config.show_english);
        assert_eq!(config.default_dataset, DatasetKind::Hsk);
        assert_eq!(config.locale, "en");
        assert!(config.data_dir().is_none());
        assert!(config.state_dir.contains("kanjiviet"));
    }

    #[test]
    fn test_config_serde_partial_file() {
        let toml_str = r#"
main_display_mode = "simplified"
show_jyutping = false
default_dataset = "kanji"
locale = "vi"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.main_display_mode, DisplayMode::Simplified);
        assert!(!config.show_jyutping);
        assert!(!config.shows(Field::CantoneseJyutping));
        assert!(config.show_hanviet);
        assert_eq!(config.default_dataset, DatasetKind::Kanji);
        assert_eq!(config.locale, "vi");
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let mut config = Config::default();
        config.show_english = false;
        config.data_dir = "/tmp/decks".to_string();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.show_english, false);
        assert_eq!(deserialized.data_dir(), Some(PathBuf::from("/tmp/decks")));
        assert_eq!(deserialized.state_dir, config.state_dir);
    }

    #[test]
    fn test_shows_unconfigured_fields() {
        let mut config = Config::default();
        config.show_simplified = false;
        assert!(!config.shows(Field::Simplified));
        assert!(config.shows(Field::Traditional));
        assert!(config.shows(Field::Onyomi));
    }

    #[test]
    fn test_normalize_locale_valid_unchanged() {
        let mut config = Config::default();
        config.locale = "vi".to_string();
        config.normalize_locale();
        assert_eq!(config.locale, "vi");
    }

    #[test]
    fn test_normalize_locale_strips_region() {
        let mut config = Config::default();
        config.locale = "vi-VN".to_string();
        config.normalize_locale();
        assert_eq!(config.locale, "vi");

        config.locale = "EN_us".to_string();
        config.normalize_locale();
        assert_eq!(config.locale, "en");
    }

    #[test]
    fn test_normalize_locale_unknown_resets() {
        let mut config = Config::default();
        config.locale = "ja".to_string();
        config.normalize_locale();
        assert_eq!(config.locale, "en");

        config.locale = String::new();
        config.normalize_locale();
        assert_eq!(config.locale, "en");
    }

    #[test]
    fn test_set_shown() {
        let mut config = Config::default();
        config.set_shown(Field::CantoneseJyutping, false).unwrap();
        assert!(!config.shows(Field::Jyutping));
        config.set_shown(Field::Jyutping, true).unwrap();
        assert!(config.show_jyutping);
        assert!(config.set_shown(Field::Kanji, false).is_err());
        assert!(config.shows(Field::Kanji));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.main_display_mode = DisplayMode::Simplified;
        config.show_hanviet = false;
        config.locale = "vi".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.main_display_mode, DisplayMode::Simplified);
        assert!(!loaded.show_hanviet);
        assert_eq!(loaded.locale, "vi");
        assert_eq!(loaded.state_dir, config.state_dir);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.main_display_mode, DisplayMode::Traditional);
        assert_eq!(config.locale, "en");
    }

    #[test]
    fn test_display_mode_parse() {
        assert_eq!("Simplified".parse::<DisplayMode>(), Ok(DisplayMode::Simplified));
        assert!("pinyin".parse::<DisplayMode>().is_err());
    }
}
