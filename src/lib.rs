// The binary in main.rs is a thin front end; everything it drives lives here
// so integration tests and benches can reach it.

rust_i18n::i18n!("locales", fallback = "en");

pub mod app;
pub mod config;
pub mod dataset;
pub mod display;
pub mod engine;
pub mod store;
