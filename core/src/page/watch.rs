//! Page-level watchers on single variables.

use crate::error::KeyPathError;
use crate::snapshot::ChangeSet;
use crate::types::Value;

use super::update::Page;


enum WatchHandler {
    Update(Box<dyn Fn(&Value, &Page)>),
    Delete(Box<dyn Fn(&Page)>),
}

/// A handler bound to one variable path, run after directives on every
/// broadcast that reaches the path.
pub struct Watcher {
    path: String,
    handler: WatchHandler,
}

impl Watcher {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub(super) fn notify(&self, changes: &ChangeSet, page: &Page) {
        if !changes.reaches(&self.path) {
            return;
        }
        let value = page.get(&self.path).filter(|v| !v.is_void());
        match (&self.handler, value) {
            (WatchHandler::Update(handler), Some(value)) => handler(&value, page),
            (WatchHandler::Delete(handler), None) => handler(page),
            _ => {}
        }
    }
}

impl Page {
    /// Run `handler` with the live value whenever a broadcast reaches `var`
    /// and the variable holds a value.
    pub fn on_update<F>(&self, var: &str, handler: F) -> Result<(), KeyPathError>
    where
        F: Fn(&Value, &Page) + 'static,
    {
        self.watch(var, WatchHandler::Update(Box::new(handler)))
    }

    /// Run `handler` whenever a broadcast reaches `var` and it is gone.
    pub fn on_delete<F>(&self, var: &str, handler: F) -> Result<(), KeyPathError>
    where
        F: Fn(&Page) + 'static,
    {
        self.watch(var, WatchHandler::Delete(Box::new(handler)))
    }

    fn watch(&self, var: &str, handler: WatchHandler) -> Result<(), KeyPathError> {
        let path = self
            .binder()
            .variable_ref(var)
            .ok_or_else(|| KeyPathError::Invalid(var.to_string()))?;
        self.watchers.borrow_mut().push(std::rc::Rc::new(Watcher {
            path: path.to_string(),
            handler,
        }));
        Ok(())
    }
}
