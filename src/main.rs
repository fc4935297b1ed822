use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use kanjiviet::app::{self, App, Command};
use kanjiviet::config::{Config, DisplayMode};
use kanjiviet::dataset::{DatasetKind, Field, Library};
use kanjiviet::display;
use kanjiviet::engine::CharacterFilter;
use kanjiviet::store::disabled::DisabledSetStore;

#[derive(Parser)]
#[command(
    name = "kanjiviet",
    version,
    about = "Flashcard drills for HSK, TOCFL, Kanji and example sentences"
)]
struct Cli {
    #[arg(short, long, global = true, help = "Dataset: hsk, tocfl, kanji, sentences")]
    dataset: Option<DatasetKind>,

    #[arg(
        short = 'l',
        long = "level",
        global = true,
        help = "Level or grade to include (repeatable, default 1)"
    )]
    levels: Vec<u8>,

    #[arg(short, long, global = true, help = "Character count filter: all, single, multi")]
    chars: Option<CharacterFilter>,

    #[arg(short, long, global = true, help = "Only items containing this text")]
    search: Option<String>,

    #[arg(long, global = true, help = "Interface language (en, vi)")]
    locale: Option<String>,

    #[arg(long, global = true, help = "Keep disabled items in memory only")]
    memory: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive practice (default)
    Practice,
    /// Draw one card and print it
    Draw {
        #[arg(short, long, help = "Show every field")]
        reveal: bool,
    },
    /// List the items a draw can pick from
    List,
    /// Print how many items a draw can pick from
    Count,
    /// Disable an item, or enable it if already disabled
    Toggle { key: String },
    /// Enable every item of the dataset
    EnableAll,
    /// Disable every item in the selected levels
    DisableAll,
    /// Write all disabled items to a JSON file
    Export { path: PathBuf },
    /// Replace all disabled items with a JSON backup
    Import { path: PathBuf },
    /// Save display settings, plus any --locale or --dataset given, to the config file
    Settings {
        #[arg(long, help = "Script for the headline: traditional, simplified")]
        display: Option<DisplayMode>,
        #[arg(long, help = "Field to show on cards (repeatable)")]
        show: Vec<Field>,
        #[arg(long, help = "Field to hide on cards (repeatable)")]
        hide: Vec<Field>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "kanjiviet=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("ignoring unreadable config {}: {e}", Config::config_path().display());
        Config::default()
    });
    if let Some(locale) = &cli.locale {
        config.locale = locale.clone();
        config.normalize_locale();
    }
    if let Some(kind) = cli.dataset {
        config.default_dataset = kind;
    }

    let library = Library::load(config.data_dir().as_deref());
    let store = open_store(&config, cli.memory);
    let mut app = App::new(config, library, Arc::clone(&store));
    apply_filters(&mut app, &cli);

    match cli.command.unwrap_or(Commands::Practice) {
        Commands::Practice => {
            let stdin = io::stdin();
            app::run_session(&mut app, stdin.lock(), &mut io::stdout())?;
        }
        Commands::Draw { reveal } => {
            let card = app.handle(Command::Next);
            if reveal && app.deck().current().is_some() {
                for field in display::card_fields(app.deck(), &app.config) {
                    app.deck_mut().toggle_reveal(field);
                }
                print!("{}", display::render_card(app.deck(), &app.config));
            } else {
                println!("{}", card.trim_end());
            }
        }
        Commands::List => {
            print!("{}", display::render_list(&app.deck().candidates(), &app.config));
        }
        Commands::Count => println!("{}", app.deck().available_count()),
        Commands::Toggle { key } => println!("{}", app.toggle_key(&key)),
        Commands::EnableAll => println!("{}", app.handle(Command::EnableAll)),
        Commands::DisableAll => println!("{}", app.handle(Command::DisableAll)),
        Commands::Export { path } => println!("{}", app.export_to(&path)?),
        Commands::Import { path } => println!("{}", app.import_from(&path)?),
        Commands::Settings { display, show, hide } => {
            if let Some(mode) = display {
                app.config.main_display_mode = mode;
            }
            for field in show {
                app.config.set_shown(field, true)?;
            }
            for field in hide {
                app.config.set_shown(field, false)?;
            }
            println!("{}", app.save_settings_to(&Config::config_path())?);
        }
    }

    store.flush();
    Ok(())
}

fn open_store(config: &Config, memory: bool) -> Arc<DisabledSetStore> {
    if memory {
        return Arc::new(DisabledSetStore::in_memory());
    }
    match DisabledSetStore::open(config.state_dir()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!("{e}; disabled items will not be saved this session");
            Arc::new(DisabledSetStore::in_memory())
        }
    }
}

fn apply_filters(app: &mut App, cli: &Cli) {
    let deck = app.deck_mut();
    if !cli.levels.is_empty() {
        deck.set_levels(cli.levels.iter().copied());
    }
    if let Some(chars) = cli.chars {
        deck.set_character_filter(chars);
    }
    if let Some(search) = &cli.search {
        deck.set_search(search.clone());
    }
}
