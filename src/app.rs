use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use rust_i18n::t;

use crate::config::Config;
use crate::dataset::{DatasetKind, Field, Library};
use crate::display;
use crate::engine::{CharacterFilter, PracticeDeck};
use crate::store::disabled::DisabledSetStore;
use crate::store::schema::ExportData;

/// One line of input in the interactive practice loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Next,
    Reveal(Field),
    ToggleCurrent,
    Toggle(String),
    DisableAll,
    EnableAll,
    Level(u8),
    Chars(CharacterFilter),
    Search(String),
    ClearFilters,
    Switch(DatasetKind),
    List,
    Info,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, arg) = match line.split_once(char::is_whitespace) {
            Some((word, arg)) => (word, arg.trim()),
            None => (line, ""),
        };
        let command = match (word, arg) {
            ("" | "n", "") => Command::Next,
            ("r", field) if !field.is_empty() => Command::Reveal(field.parse()?),
            ("d", "") => Command::ToggleCurrent,
            ("x", key) if !key.is_empty() => Command::Toggle(key.to_string()),
            ("D", "") => Command::DisableAll,
            ("E", "") => Command::EnableAll,
            ("l", level) => Command::Level(
                level
                    .parse()
                    .map_err(|_| format!("not a level: '{level}'"))?,
            ),
            ("c", filter) => Command::Chars(filter.parse()?),
            ("s", text) => Command::Search(text.to_string()),
            ("f", "") => Command::ClearFilters,
            ("t", kind) => Command::Switch(kind.parse()?),
            ("ls", "") => Command::List,
            ("i", "") => Command::Info,
            ("h" | "?", "") => Command::Help,
            ("q", "") => Command::Quit,
            _ => return Err(format!("unknown command '{line}'")),
        };
        Ok(command)
    }
}

pub struct App {
    pub config: Config,
    pub should_quit: bool,
    library: Library,
    store: Arc<DisabledSetStore>,
    deck: PracticeDeck,
}

impl App {
    pub fn new(config: Config, library: Library, store: Arc<DisabledSetStore>) -> Self {
        let deck = PracticeDeck::new(library.get(config.default_dataset), Some(Arc::clone(&store)));
        Self {
            config,
            should_quit: false,
            library,
            store,
            deck,
        }
    }

    pub fn deck(&self) -> &PracticeDeck {
        &self.deck
    }

    pub fn deck_mut(&mut self) -> &mut PracticeDeck {
        &mut self.deck
    }

    pub fn store(&self) -> &DisabledSetStore {
        &self.store
    }

    /// Replaces the active deck with a fresh one for `kind`. Filters go back
    /// to their defaults and the disabled set is reloaded from the store.
    pub fn switch_dataset(&mut self, kind: DatasetKind) {
        if kind == self.deck.kind() {
            return;
        }
        self.deck = PracticeDeck::new(self.library.get(kind), Some(Arc::clone(&self.store)));
        tracing::info!("switched to {kind} ({} entries)", self.deck.dataset().len());
    }

    /// Applies `command` and returns what to print.
    pub fn handle(&mut self, command: Command) -> String {
        let locale = self.config.locale.clone();
        let locale = locale.as_str();
        match command {
            Command::Next => {
                if self.deck.next().is_ok() {
                    display::render_card(&self.deck, &self.config)
                } else {
                    display::empty_pool_message(locale)
                }
            }
            Command::Reveal(field) => {
                if self.deck.current().is_none() {
                    return t!("practice.no_card", locale = locale).to_string();
                }
                self.deck.toggle_reveal(field);
                display::render_card(&self.deck, &self.config)
            }
            Command::ToggleCurrent => {
                let key = self.deck.current().map(|e| e.key.clone());
                match (key, self.deck.toggle_current_disabled()) {
                    (Some(key), Some(true)) => t!("practice.disabled", locale = locale, key = key).to_string(),
                    (Some(key), Some(false)) => t!("practice.enabled", locale = locale, key = key).to_string(),
                    _ => t!("practice.no_card", locale = locale).to_string(),
                }
            }
            Command::Toggle(key) => self.toggle_key(&key),
            Command::DisableAll => {
                self.deck.disable_all();
                t!(
                    "practice.all_disabled",
                    locale = locale,
                    count = self.deck.disabled_count()
                )
                .to_string()
            }
            Command::EnableAll => {
                self.deck.enable_all();
                t!("practice.all_enabled", locale = locale).to_string()
            }
            Command::Level(level) => {
                if !self.deck.dataset().levels().contains(&level) {
                    return t!(
                        "practice.no_level",
                        locale = locale,
                        dataset = display::dataset_label(self.deck.kind(), locale),
                        n = level
                    )
                    .to_string();
                }
                self.deck.toggle_level(level);
                display::render_stats(&self.deck, locale)
            }
            Command::Chars(filter) => {
                self.deck.set_character_filter(filter);
                display::render_stats(&self.deck, locale)
            }
            Command::Search(text) => {
                self.deck.set_search(text);
                display::render_stats(&self.deck, locale)
            }
            Command::ClearFilters => {
                self.deck.clear_filters();
                display::render_stats(&self.deck, locale)
            }
            Command::Switch(kind) => {
                self.switch_dataset(kind);
                t!(
                    "practice.switched",
                    locale = locale,
                    dataset = display::dataset_label(kind, locale)
                )
                .to_string()
            }
            Command::List => display::render_list(&self.deck.candidates(), &self.config),
            Command::Info => display::render_stats(&self.deck, locale),
            Command::Help => t!("practice.help", locale = locale).to_string(),
            Command::Quit => {
                self.should_quit = true;
                t!("practice.bye", locale = locale).to_string()
            }
        }
    }

    /// Writes every dataset's disabled set to `path` as pretty JSON.
    pub fn export_to(&self, path: &Path) -> Result<String> {
        let data = self.store.export_all();
        let json = serde_json::to_string_pretty(&data)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(t!(
            "cli.exported",
            locale = self.config.locale.as_str(),
            path = path.display()
        )
        .to_string())
    }

    /// Writes the current config, including any command-line overrides, to
    /// `path`.
    pub fn save_settings_to(&self, path: &Path) -> Result<String> {
        self.config
            .save_to(path)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(t!(
            "cli.settings_saved",
            locale = self.config.locale.as_str(),
            path = path.display()
        )
        .to_string())
    }

    /// Replaces every dataset's disabled set with the backup at `path` and
    /// reloads the active deck. Filters are kept.
    pub fn import_from(&mut self, path: &Path) -> Result<String> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let data: ExportData = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        self.store.import_all(&data)?;

        let selection = self.deck.selection().clone();
        self.deck = PracticeDeck::new(self.library.get(self.deck.kind()), Some(Arc::clone(&self.store)));
        self.deck.set_levels(selection.levels);
        self.deck.set_character_filter(selection.character_filter);
        self.deck.set_search(selection.search);

        Ok(t!(
            "cli.imported",
            locale = self.config.locale.as_str(),
            path = path.display()
        )
        .to_string())
    }

    /// Toggles an item by key. Unknown keys are reported, not added.
    pub fn toggle_key(&mut self, key: &str) -> String {
        let locale = self.config.locale.as_str();
        if self.deck.dataset().get(key).is_none() {
            return t!(
                "cli.unknown_key",
                locale = locale,
                key = key,
                dataset = display::dataset_label(self.deck.kind(), locale)
            )
            .to_string();
        }
        if self.deck.toggle_disabled(key) {
            t!("cli.toggled_on", locale = locale, key = key).to_string()
        } else {
            t!("cli.toggled_off", locale = locale, key = key).to_string()
        }
    }
}

/// Line-driven practice loop. Reads commands until `q` or end of input and
/// waits for queued saves before returning.
pub fn run_session<R: BufRead, W: Write>(app: &mut App, input: R, output: &mut W) -> io::Result<()> {
    let locale = app.config.locale.clone();
    writeln!(output, "{}", display::render_stats(app.deck(), &locale))?;
    writeln!(output, "{}", t!("card.idle", locale = locale.as_str()))?;
    write!(output, "{}", t!("practice.prompt", locale = locale.as_str()))?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        let reply = match line.parse::<Command>() {
            Ok(command) => app.handle(command),
            Err(e) => {
                tracing::debug!("{e}");
                t!(
                    "practice.unknown_command",
                    locale = locale.as_str(),
                    input = line.trim()
                )
                .to_string()
            }
        };
        write!(output, "{reply}")?;
        if !reply.ends_with('\n') {
            writeln!(output)?;
        }
        if app.should_quit {
            break;
        }
        write!(output, "{}", t!("practice.prompt", locale = locale.as_str()))?;
        output.flush()?;
    }

    app.store().flush();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FilterSelection;
    use std::io::Cursor;

    fn app() -> App {
        App::new(
            Config::default(),
            Library::load(None),
            Arc::new(DisabledSetStore::in_memory()),
        )
    }

    fn run(app: &mut App, script: &str) -> String {
        let mut out = Vec::new();
        run_session(app, Cursor::new(script.to_string()), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("n".parse::<Command>(), Ok(Command::Next));
        assert_eq!("".parse::<Command>(), Ok(Command::Next));
        assert_eq!("r py".parse::<Command>(), Ok(Command::Reveal(Field::Pinyin)));
        assert_eq!("x  1-5 ".parse::<Command>(), Ok(Command::Toggle("1-5".to_string())));
        assert_eq!("l 2".parse::<Command>(), Ok(Command::Level(2)));
        assert_eq!("c single".parse::<Command>(), Ok(Command::Chars(CharacterFilter::Single)));
        assert_eq!("s Bắc Kinh".parse::<Command>(), Ok(Command::Search("Bắc Kinh".to_string())));
        assert_eq!("s".parse::<Command>(), Ok(Command::Search(String::new())));
        assert_eq!("t kanji".parse::<Command>(), Ok(Command::Switch(DatasetKind::Kanji)));
        assert_eq!("D".parse::<Command>(), Ok(Command::DisableAll));
        assert_eq!("d".parse::<Command>(), Ok(Command::ToggleCurrent));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("zz".parse::<Command>().is_err());
        assert!("l two".parse::<Command>().is_err());
        assert!("r".parse::<Command>().is_err());
        assert!("t klingon".parse::<Command>().is_err());
        assert!("n extra".parse::<Command>().is_err());
    }

    #[test]
    fn test_switch_dataset_resets_filters() {
        let mut app = app();
        app.deck_mut().toggle_level(2);
        app.deck_mut().set_search("b");
        app.switch_dataset(DatasetKind::Sentences);
        assert_eq!(app.deck().kind(), DatasetKind::Sentences);
        assert_eq!(
            app.deck().selection(),
            &FilterSelection::defaults_for(DatasetKind::Sentences)
        );
        assert!(app.deck().current().is_none());
    }

    #[test]
    fn test_switch_reloads_disabled_set() {
        let mut app = app();
        app.toggle_key("1-5");
        app.switch_dataset(DatasetKind::Kanji);
        assert_eq!(app.deck().disabled_count(), 0);
        app.switch_dataset(DatasetKind::Hsk);
        assert!(app.deck().is_disabled("1-5"));
    }

    #[test]
    fn test_level_missing_from_dataset_is_rejected() {
        let mut app = app();
        let out = app.handle(Command::Level(9));
        assert!(out.contains("no level 9"));
        assert_eq!(app.deck().selection().levels.len(), 1);

        app.handle(Command::Level(2));
        assert!(app.deck().selection().levels.contains(&2));
    }

    #[test]
    fn test_toggle_unknown_key_is_rejected() {
        let mut app = app();
        app.toggle_key("9-999");
        assert_eq!(app.deck().disabled_count(), 0);
    }

    #[test]
    fn test_session_draws_and_quits() {
        let mut app = app();
        let out = run(&mut app, "n\nr en\nq\nn\n");
        assert!(app.should_quit);
        assert!(app.deck().current().is_some());
        assert!(app.deck().is_revealed(Field::English));
        assert!(out.contains("Bye."));
    }

    #[test]
    fn test_session_reports_empty_pool() {
        let mut app = app();
        let out = run(&mut app, "D\nn\n");
        assert!(out.contains("No more items"));
        assert!(app.deck().current().is_none());
    }

    #[test]
    fn test_session_unknown_command() {
        let mut app = app();
        let out = run(&mut app, "wat\n");
        assert!(out.contains("Unknown command: wat"));
    }

    #[test]
    fn test_session_persists_on_exit() {
        let store = Arc::new(DisabledSetStore::in_memory());
        let mut app = App::new(Config::default(), Library::load(None), Arc::clone(&store));
        run(&mut app, "x 1-5\nq\n");
        assert!(store.load(DatasetKind::Hsk).contains("1-5"));
    }

    #[test]
    fn test_save_settings_writes_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut app = app();
        app.config.main_display_mode = "simp".parse().unwrap();
        app.config.set_shown(Field::English, false).unwrap();

        let message = app.save_settings_to(&path).unwrap();
        assert!(message.contains("config.toml"));
        let saved = Config::load_from(&path).unwrap();
        assert_eq!(saved.main_display_mode, crate::config::DisplayMode::Simplified);
        assert!(!saved.show_english);
    }
}
