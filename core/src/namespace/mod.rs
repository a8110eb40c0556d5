//! Key paths and the reactive store.
//!
//! Dotted-path addressing (e.g. `vars.trial.id`) over a nested tree, and
//! the store that owns that tree together with the last snapshot published
//! to observers.

pub mod path;
pub mod store;

pub use path::{extract, update, upsert, validate, KeyPath};
pub use store::ReactiveStore;
