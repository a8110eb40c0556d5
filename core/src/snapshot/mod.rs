//! Snapshots of the state tree and the change sets between them.
//!
//! `flatten`/`snap` turn the nested tree into a flat path map, `diff`
//! compares two of those maps, and `ChangeSet` answers which subscribers a
//! set of changes concerns.

pub mod changes;
pub mod diff;
pub mod flatten;

pub use changes::{affects, ChangeSet};
pub use diff::diff;
pub use flatten::{flatten, snap, Flatten, SnapValue, Snapshot};
