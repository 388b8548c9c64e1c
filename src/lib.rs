//! Pokedex TUI - paginated PokeAPI catalog browser
//!
//! The library exposes the app's modules for testing.

pub mod action;
pub mod api;
pub mod cache;
pub mod connectivity;
pub mod effect;
pub mod loader;
pub mod reducer;
pub mod state;
pub mod ui;
