//! Value types shared by every layer of the engine.

pub mod value;

pub use value::{List, Map, NodeId, Opaque, Value};
