//! Terminal client for the todos API.
//!
//! Layered bottom-up: a collection store with optimistic local updates
//! ([`store`]), one presenter per visible item ([`presenter`]), an
//! application shell wiring the two together ([`shell`]), and a thin
//! ratatui layer that maps gestures to shell calls ([`ui`]). Persistence
//! goes through the [`backend::BackingStore`] seam, either over HTTP or
//! in process.

pub mod backend;
pub mod presenter;
pub mod shell;
pub mod store;
pub mod ui;
