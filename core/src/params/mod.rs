//! Directive parameters: declaration schema and binding.

pub mod binder;
pub mod schema;

pub use binder::{BoundParam, BoundParams, Evaluation, ParamBinder, ParamUpdates, VARIABLE_ROOT};
pub use schema::{Attributes, ParamConfig, ParamSpec, ParamType};
