//! The page runtime: update loop, events, and watchers.

pub mod events;
pub mod update;
pub mod watch;

pub use events::Event;
pub use update::{DirectiveHandle, InitReport, Page, UpdateResult};
pub use watch::Watcher;
