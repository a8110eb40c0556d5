//! Named events and deferred tasks.
//!
//! Listeners are page-wide or scoped to one element id. Publishing runs the
//! matching listeners, then the directive on the target element, then
//! `update_page`. Deferred work sits in a queue driven by a virtual
//! millisecond clock that only moves through `advance`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::types::Value;

use super::update::{Page, UpdateResult};


/// A named notification with an optional payload and target element id.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub detail: Value,
    pub target: Option<String>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Event {
            name: name.into(),
            detail: Value::Null,
            target: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn targeted(mut self, id: impl Into<String>) -> Self {
        self.target = Some(id.into());
        self
    }
}


// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

struct Listener {
    name: String,
    scope: Option<String>,
    handler: Box<dyn Fn(&Event, &Page)>,
}

impl Listener {
    fn accepts(&self, event: &Event) -> bool {
        self.name == event.name
            && match &self.scope {
                Some(id) => event.target.as_deref() == Some(id.as_str()),
                None => true,
            }
    }
}

#[derive(Default)]
pub struct EventBus {
    listeners: RefCell<Vec<Rc<Listener>>>,
}

impl EventBus {
    fn add(&self, listener: Listener) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    fn matching(&self, event: &Event) -> Vec<Rc<Listener>> {
        self.listeners
            .borrow()
            .iter()
            .filter(|l| l.accepts(event))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }
}


// ---------------------------------------------------------------------------
// Task queue
// ---------------------------------------------------------------------------

type Task = Box<dyn FnOnce(&Page)>;

struct Scheduled {
    due: u64,
    seq: u64,
    task: Task,
}

/// Deferred tasks ordered by due time, then by scheduling order.
#[derive(Default)]
pub struct TaskQueue {
    now: u64,
    seq: u64,
    tasks: Vec<Scheduled>,
}

impl TaskQueue {
    fn push(&mut self, delay_ms: u64, task: Task) {
        self.seq += 1;
        self.tasks.push(Scheduled {
            due: self.now.saturating_add(delay_ms),
            seq: self.seq,
            task,
        });
    }

    /// Remove the earliest task due by `limit`, moving the clock to it.
    fn pop_due(&mut self, limit: u64) -> Option<Task> {
        let index = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= limit)
            .min_by_key(|(_, t)| (t.due, t.seq))
            .map(|(i, _)| i)?;
        let scheduled = self.tasks.swap_remove(index);
        self.now = self.now.max(scheduled.due);
        Some(scheduled.task)
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}


// ---------------------------------------------------------------------------
// Page API
// ---------------------------------------------------------------------------

impl Page {
    /// Listen for `name` anywhere on the page.
    pub fn on_event<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&Event, &Page) + 'static,
    {
        self.bus.add(Listener {
            name: name.into(),
            scope: None,
            handler: Box::new(handler),
        });
    }

    /// Listen for `name` targeted at the element with id `id`.
    pub fn on_element_event<F>(&self, id: impl Into<String>, name: impl Into<String>, handler: F)
    where
        F: Fn(&Event, &Page) + 'static,
    {
        self.bus.add(Listener {
            name: name.into(),
            scope: Some(id.into()),
            handler: Box::new(handler),
        });
    }

    /// Dispatch `event` synchronously, then publish whatever the handlers
    /// changed.
    pub fn publish_now(&self, event: Event) -> UpdateResult {
        self.dispatch(&event);
        self.update_page()
    }

    /// Dispatch `event` after `delay_ms` of page time.
    pub fn publish_deferred(&self, event: Event, delay_ms: u64) {
        self.schedule(delay_ms, move |page| page.dispatch(&event));
    }

    /// Run `task` after `delay_ms` of page time, followed by `update_page`.
    pub fn schedule<F>(&self, delay_ms: u64, task: F)
    where
        F: FnOnce(&Page) + 'static,
    {
        self.tasks.borrow_mut().push(delay_ms, Box::new(task));
    }

    /// Current page time in milliseconds.
    pub fn now(&self) -> u64 {
        self.tasks.borrow().now()
    }

    /// Run tasks already due. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let now = self.now();
        self.run_until(now)
    }

    /// Move the clock forward, running every task that falls due on the
    /// way in order. Returns how many ran.
    pub fn advance(&self, ms: u64) -> usize {
        let limit = self.now().saturating_add(ms);
        let ran = self.run_until(limit);
        let mut tasks = self.tasks.borrow_mut();
        tasks.now = tasks.now.max(limit);
        ran
    }

    fn run_until(&self, limit: u64) -> usize {
        let mut ran = 0;
        loop {
            let next = self.tasks.borrow_mut().pop_due(limit);
            let Some(task) = next else {
                break;
            };
            task(self);
            self.update_page();
            ran += 1;
        }
        ran
    }

    fn dispatch(&self, event: &Event) {
        tracing::debug!(event = %event.name, element = ?event.target, "dispatching event");
        for listener in self.bus.matching(event) {
            (listener.handler)(event, self);
        }

        let Some(target) = event.target.as_deref() else {
            return;
        };
        for handle in self.directives() {
            let targeted = handle
                .try_borrow()
                .map_or(false, |d| d.element().id() == Some(target));
            if !targeted {
                continue;
            }
            match handle.try_borrow_mut() {
                Ok(mut directive) => directive.handle_event(event, self),
                Err(_) => tracing::debug!(
                    event = %event.name,
                    element = target,
                    "directive busy, event skipped"
                ),
            }
        }
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
