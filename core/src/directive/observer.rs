//! The observer contract and the directive lifecycle wrapped around it.
//!
//! An `Observer` is the behavior behind a directive kind: it declares its
//! parameters, takes typed updates, and renders. `Directive` owns one
//! observer attached to one element and drives it through
//! `Created -> Initialized -> Active`.

use crate::error::{DirectiveError, TypeMismatchError};
use crate::page::{Event, Page};
use crate::params::{BoundParams, ParamBinder, ParamSpec, ParamUpdates};
use crate::snapshot::ChangeSet;
use crate::types::Value;

use super::element::Element;


// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Behavior of one directive kind.
pub trait Observer {
    /// Directive kind, used in diagnostics.
    fn kind(&self) -> &str;

    /// Declared parameters, read once at initialization.
    fn parameters(&self) -> ParamSpec;

    /// Store new parameter values. `Value::Null` means the bound variable
    /// was deleted.
    fn apply(&mut self, updates: &ParamUpdates);

    /// Reflect the current fields in the page.
    fn render(&mut self) {}

    /// Receive a non-empty batch of updates from a broadcast.
    fn update(&mut self, updates: &ParamUpdates, _page: &Page) {
        self.apply(updates);
        self.render();
    }

    /// React to an event targeted at the host element.
    fn handle_event(&mut self, _event: &Event, _page: &Page) {}
}


// ---------------------------------------------------------------------------
// Directive
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveState {
    /// Attached to its element, parameters not parsed yet.
    Created,
    /// Parameters bound, not rendered yet.
    Initialized,
    /// Seeded and rendered; receives broadcasts.
    Active,
}


/// An observer bound to an element.
pub struct Directive {
    kind: String,
    element: Element,
    observer: Box<dyn Observer>,
    params: BoundParams,
    state: DirectiveState,
}

impl Directive {
    pub fn new(observer: Box<dyn Observer>, element: Element) -> Self {
        Directive {
            kind: observer.kind().to_string(),
            element,
            observer,
            params: BoundParams::default(),
            state: DirectiveState::Created,
        }
    }

    /// Bind parameters against the element's attributes, seed the observer
    /// with their current values, and render once.
    ///
    /// Every parameter error is logged and returned together; the directive
    /// stays `Created` in that case.
    pub fn initialize(&mut self, binder: &ParamBinder, tree: &Value) -> Result<(), DirectiveError> {
        let spec = self.observer.parameters();
        self.params = match binder.parse_all(&spec, self.element.attributes()) {
            Ok(params) => params,
            Err(errors) => {
                let element = self.element.label();
                for e in &errors {
                    tracing::error!(
                        kind = %self.kind,
                        element = %element,
                        param = e.param(),
                        error = %e,
                        "invalid parameter"
                    );
                }
                return Err(DirectiveError::Params {
                    kind: self.kind.clone(),
                    element,
                    errors,
                });
            }
        };
        self.state = DirectiveState::Initialized;

        let (values, failures) = self.params.resolve(tree);
        self.log_mismatches(&failures);
        self.observer.apply(&values);
        self.observer.render();
        self.state = DirectiveState::Active;
        tracing::debug!(
            kind = %self.kind,
            element = %self.element,
            params = self.params.len(),
            "directive active"
        );
        Ok(())
    }

    /// Evaluate the bound parameters against a broadcast. Parameters whose
    /// live value has the wrong type are logged and left out.
    pub fn collect(&self, changes: &ChangeSet, tree: &Value) -> ParamUpdates {
        if self.state != DirectiveState::Active {
            return ParamUpdates::new();
        }
        let (updates, failures) = self.params.evaluate(changes, tree);
        self.log_mismatches(&failures);
        updates
    }

    /// Hand a non-empty batch to the observer.
    pub fn deliver(&mut self, updates: &ParamUpdates, page: &Page) {
        if updates.is_empty() {
            return;
        }
        self.observer.update(updates, page);
    }

    pub fn handle_event(&mut self, event: &Event, page: &Page) {
        if self.state == DirectiveState::Active {
            self.observer.handle_event(event, page);
        }
    }

    fn log_mismatches(&self, failures: &[TypeMismatchError]) {
        for e in failures {
            tracing::warn!(
                kind = %self.kind,
                element = %self.element,
                param = %e.param,
                path = %e.path,
                error = %e,
                "parameter skipped"
            );
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn state(&self) -> DirectiveState {
        self.state
    }

    pub fn params(&self) -> &BoundParams {
        &self.params
    }

    /// Variable paths this directive is bound to.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.params.iter().filter_map(|(_, p)| p.variable_path())
    }

    pub fn observer(&self) -> &dyn Observer {
        self.observer.as_ref()
    }
}

impl std::fmt::Debug for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directive")
            .field("kind", &self.kind)
            .field("element", &self.element)
            .field("state", &self.state)
            .finish()
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
