pub mod deck;
pub mod filter;

pub use deck::{DeckError, DeckSnapshot, PracticeDeck};
pub use filter::{CharacterFilter, FilterSelection};
