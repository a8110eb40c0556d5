//! Reactive page state engine.
//!
//! A page owns a nested state tree. After collaborators mutate it,
//! `Page::update_page` snapshots the tree, diffs it against the last
//! published snapshot, and broadcasts the minimal set of changed paths to
//! the directives bound to those paths.

pub mod config;
pub mod directive;
pub mod error;
pub mod logging;
pub mod namespace;
pub mod page;
pub mod params;
pub mod snapshot;
pub mod types;

pub use config::EngineConfig;
pub use directive::{Directive, DirectiveRegistry, Element, Observer, Selector};
pub use error::{ConfigError, DirectiveError, KeyPathError, ParamError, TypeMismatchError};
pub use namespace::{KeyPath, ReactiveStore};
pub use page::{Event, Page, UpdateResult};
pub use params::{ParamConfig, ParamSpec, ParamType, ParamUpdates};
pub use snapshot::{affects, diff, snap, ChangeSet, Snapshot};
pub use types::{List, Map, NodeId, Opaque, Value};
