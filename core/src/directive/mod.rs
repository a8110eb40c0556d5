//! Directives: observers attached to page elements.

pub mod element;
pub mod observer;
pub mod registry;

pub use element::{Element, Selector};
pub use observer::{Directive, DirectiveState, Observer};
pub use registry::{DirectiveRegistry, Factory, Registration};
