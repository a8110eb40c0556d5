//! The page: owner of the reactive store and its directives, and the
//! bounded refresh loop that publishes tree changes to them.
//!
//! `update_page` runs up to `retry_budget` passes. Each pass snapshots the
//! tree, diffs it against the last published snapshot, and broadcasts the
//! change set to directives and watchers. Handlers may mutate the tree;
//! their changes are picked up by the next pass. A call to `update_page`
//! made while a broadcast runs is folded into the running cycle.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use crate::config::EngineConfig;
use crate::directive::{Directive, DirectiveRegistry, Element, Observer};
use crate::error::{ConfigError, DirectiveError, KeyPathError};
use crate::namespace::ReactiveStore;
use crate::params::ParamBinder;
use crate::snapshot::ChangeSet;
use crate::types::{Map, Value};

use super::events::{EventBus, TaskQueue};
use super::watch::Watcher;


/// Shared handle to an attached directive.
pub type DirectiveHandle = Rc<RefCell<Directive>>;


/// Outcome of one `update_page` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateResult {
    /// Change sets broadcast, one per generation.
    pub published: Vec<ChangeSet>,
    /// Changes were still pending when the budget ran out.
    pub exhausted: bool,
    /// The call arrived during a broadcast and was merged into it.
    pub folded: bool,
}

impl UpdateResult {
    pub fn generations(&self) -> usize {
        self.published.len()
    }
}


/// Outcome of `init_directives`.
#[derive(Debug, Default)]
pub struct InitReport {
    /// `(kind, element label)` of every directive now active.
    pub attached: Vec<(String, String)>,
    pub failed: Vec<DirectiveError>,
}


pub struct Page {
    config: EngineConfig,
    binder: ParamBinder,
    store: RefCell<ReactiveStore>,
    directives: RefCell<Vec<DirectiveHandle>>,
    pub(super) watchers: RefCell<Vec<Rc<Watcher>>>,
    pub(super) bus: EventBus,
    pub(super) tasks: RefCell<TaskQueue>,
    publishing: Cell<bool>,
    generation: Cell<u64>,
}

/// Clears the publishing flag however the broadcast ends.
struct PublishGuard<'a>(&'a Cell<bool>);

impl<'a> PublishGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        PublishGuard(flag)
    }
}

impl Drop for PublishGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Page {
    /// A page with default config and an empty variable mapping.
    pub fn new() -> Self {
        Page::build(EngineConfig::default(), None)
    }

    /// A page over an existing tree. The tree counts as already published.
    pub fn with_tree(tree: Value) -> Self {
        Page::build(EngineConfig::default(), Some(tree))
    }

    /// A page with a validated config. With no tree, starts from
    /// `{<variable_root>: {}}`.
    pub fn with_config(config: EngineConfig, tree: Option<Value>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Page::build(config, tree))
    }

    fn build(config: EngineConfig, tree: Option<Value>) -> Self {
        let tree = tree.unwrap_or_else(|| {
            Value::Map(Map::from([(config.variable_root.clone(), Value::map())]))
        });
        Page {
            binder: ParamBinder::new(config.variable_root.clone()),
            config,
            store: RefCell::new(ReactiveStore::new(tree)),
            directives: RefCell::new(Vec::new()),
            watchers: RefCell::new(Vec::new()),
            bus: EventBus::default(),
            tasks: RefCell::new(TaskQueue::default()),
            publishing: Cell::new(false),
            generation: Cell::new(0),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn binder(&self) -> &ParamBinder {
        &self.binder
    }

    // --- Tree access ---

    /// Borrow the whole tree. Do not hold across calls that mutate it.
    pub fn tree(&self) -> Ref<'_, Value> {
        Ref::map(self.store.borrow(), |s| s.tree())
    }

    pub fn get(&self, path: &str) -> Option<Value> {
        self.store.borrow().get(path).cloned()
    }

    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<(), KeyPathError> {
        self.store.borrow_mut().set(path, value.into())
    }

    pub fn upsert(&self, path: &str, value: impl Into<Value>) -> Result<(), KeyPathError> {
        self.store.borrow_mut().upsert(path, value.into())
    }

    pub fn append(&self, path: &str, value: impl Into<Value>) -> Result<(), KeyPathError> {
        self.store.borrow_mut().append(path, value.into())
    }

    pub fn remove(&self, path: &str) -> Option<Value> {
        self.store.borrow_mut().remove(path)
    }

    /// Arbitrary in-place edit of the tree.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        f(self.store.borrow_mut().tree_mut())
    }

    /// Changes not yet published.
    pub fn pending(&self) -> ChangeSet {
        self.store.borrow().pending()
    }

    /// Number of change sets broadcast so far.
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    pub fn is_publishing(&self) -> bool {
        self.publishing.get()
    }

    // --- Directives ---

    /// Initialize `observer` on `element` and register it for broadcasts.
    pub fn attach(
        &self,
        observer: Box<dyn Observer>,
        element: Element,
    ) -> Result<DirectiveHandle, DirectiveError> {
        let mut directive = Directive::new(observer, element);
        {
            let store = self.store.borrow();
            directive.initialize(&self.binder, store.tree())?;
        }
        let handle = Rc::new(RefCell::new(directive));
        self.directives.borrow_mut().push(handle.clone());
        Ok(handle)
    }

    /// Attach every matching directive kind to every element. A failing
    /// directive is reported and skipped; the rest still attach.
    pub fn init_directives(
        &self,
        registry: &DirectiveRegistry,
        elements: &[Element],
    ) -> InitReport {
        let mut report = InitReport::default();
        for element in elements {
            for registration in registry.matching(element) {
                let observer = registration.build(element);
                match self.attach(observer, element.clone()) {
                    Ok(handle) => {
                        let d = handle.borrow();
                        report.attached.push((d.kind().to_string(), d.element().label()));
                    }
                    Err(e) => report.failed.push(e),
                }
            }
        }
        if !report.failed.is_empty() {
            tracing::warn!(
                attached = report.attached.len(),
                failed = report.failed.len(),
                "some directives failed to initialize"
            );
        }
        report
    }

    pub fn directives(&self) -> Vec<DirectiveHandle> {
        self.directives.borrow().clone()
    }

    // --- Update loop ---

    /// Publish pending tree changes, repeating while handlers keep changing
    /// the tree, up to the configured budget.
    pub fn update_page(&self) -> UpdateResult {
        if self.publishing.get() {
            tracing::debug!(
                generation = self.generation.get(),
                "update during broadcast folded into running cycle"
            );
            return UpdateResult {
                folded: true,
                ..UpdateResult::default()
            };
        }
        let _guard = PublishGuard::enter(&self.publishing);

        let mut result = UpdateResult::default();
        for _ in 0..self.config.retry_budget {
            let changes = self.store.borrow_mut().publish();
            if changes.is_empty() {
                return result;
            }
            let generation = self.generation.get() + 1;
            self.generation.set(generation);
            tracing::debug!(generation, changes = %changes, "broadcasting");
            self.broadcast(&changes);
            result.published.push(changes);
        }

        if !self.store.borrow().pending().is_empty() {
            tracing::debug!(
                budget = self.config.retry_budget,
                generation = self.generation.get(),
                "retry budget exhausted with changes pending"
            );
            result.exhausted = true;
        }
        result
    }

    /// Deliver one change set to every directive, then every watcher,
    /// registered when the broadcast starts.
    fn broadcast(&self, changes: &ChangeSet) {
        let directives = self.directives.borrow().clone();
        for handle in directives {
            let Ok(directive) = handle.try_borrow() else {
                continue;
            };
            let updates = directive.collect(changes, self.store.borrow().tree());
            drop(directive);
            if updates.is_empty() {
                continue;
            }
            match handle.try_borrow_mut() {
                Ok(mut d) => d.deliver(&updates, self),
                Err(_) => tracing::debug!("directive busy, broadcast skipped"),
            }
        }

        let watchers = self.watchers.borrow().clone();
        for watcher in watchers {
            watcher.notify(changes, self);
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new()
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::Selector;
    use crate::params::{ParamConfig, ParamSpec, ParamType, ParamUpdates};
    use serde_json::json;

    #[derive(Default)]
    struct Seen {
        updates: Vec<ParamUpdates>,
        renders: usize,
    }

    /// Shows one numeric variable.
    struct Counter {
        seen: Rc<RefCell<Seen>>,
    }

    impl Observer for Counter {
        fn kind(&self) -> &str {
            "ot-counter"
        }

        fn parameters(&self) -> ParamSpec {
            ParamSpec::new().param("value", ParamConfig::new().with_type(ParamType::Number))
        }

        fn apply(&mut self, updates: &ParamUpdates) {
            self.seen.borrow_mut().updates.push(updates.clone());
        }

        fn render(&mut self) {
            self.seen.borrow_mut().renders += 1;
        }
    }

    /// Copies `vars.a + 1` into `vars.b` on every update, and asks for an
    /// update from inside the broadcast.
    struct Follower;

    impl Observer for Follower {
        fn kind(&self) -> &str {
            "ot-follower"
        }

        fn parameters(&self) -> ParamSpec {
            ParamSpec::new().param("src", ParamConfig::new().with_type(ParamType::Number))
        }

        fn apply(&mut self, _: &ParamUpdates) {}

        fn update(&mut self, updates: &ParamUpdates, page: &Page) {
            if let Some(a) = updates.get("src").and_then(Value::as_f64) {
                page.set("vars.b", a + 1.0).unwrap();
                assert!(page.update_page().folded);
            }
        }
    }

    fn counter(page: &Page, attr: &str) -> Rc<RefCell<Seen>> {
        let seen = Rc::new(RefCell::new(Seen::default()));
        page.attach(
            Box::new(Counter { seen: seen.clone() }),
            Element::new("ot-counter").with_attr("value", attr),
        )
        .unwrap();
        seen
    }

    // --- Publishing ---

    #[test]
    fn score_update_end_to_end() {
        let page = Page::with_tree(Value::from(json!({"vars": {"score": 0}})));
        let seen = counter(&page, "vars.score");
        assert_eq!(seen.borrow().updates[0].get("value"), Some(&Value::Number(0.0)));

        page.set("vars.score", 10).unwrap();
        let result = page.update_page();

        assert_eq!(result.generations(), 1);
        assert_eq!(result.published[0].iter().collect::<Vec<_>>(), vec!["vars.score"]);
        assert!(!result.exhausted);
        let seen = seen.borrow();
        assert_eq!(seen.updates.len(), 2);
        assert_eq!(seen.updates[1].get("value"), Some(&Value::Number(10.0)));
        assert_eq!(seen.renders, 2);
    }

    #[test]
    fn nothing_changed_nothing_published() {
        let page = Page::with_tree(Value::from(json!({"vars": {"score": 0}})));
        let seen = counter(&page, "vars.score");
        let result = page.update_page();
        assert_eq!(result, UpdateResult::default());
        assert_eq!(seen.borrow().updates.len(), 1);
        assert_eq!(page.generation(), 0);
    }

    #[test]
    fn unrelated_change_skips_directive() {
        let page = Page::with_tree(Value::from(json!({"vars": {"score": 0, "other": 1}})));
        let seen = counter(&page, "vars.score");
        page.set("vars.other", 2).unwrap();
        assert_eq!(page.update_page().generations(), 1);
        assert_eq!(seen.borrow().updates.len(), 1);
    }

    #[test]
    fn deletion_is_delivered_as_null() {
        let page = Page::with_tree(Value::from(json!({"vars": {"score": 4}})));
        let seen = counter(&page, "vars.score");
        page.remove("vars.score");
        page.update_page();
        assert_eq!(seen.borrow().updates[1].get("value"), Some(&Value::Null));
    }

    #[test]
    fn new_subtree_reaches_nested_binding() {
        let page = Page::new();
        let seen = counter(&page, "vars.trial.score");
        page.upsert("vars.trial.score", 7).unwrap();
        let result = page.update_page();
        assert_eq!(result.published[0].iter().collect::<Vec<_>>(), vec!["vars.trial"]);
        assert_eq!(seen.borrow().updates[1].get("value"), Some(&Value::Number(7.0)));
    }

    #[test]
    fn replaced_subtree_published_at_root() {
        let page = Page::with_tree(Value::from(json!({"vars": {"trial": {"id": 1, "stim": "A"}}})));
        let seen = counter(&page, "vars.trial.id");

        page.set("vars.trial", json!({"id": 2, "stim": "B"})).unwrap();
        let result = page.update_page();
        assert_eq!(result.published[0].iter().collect::<Vec<_>>(), vec!["vars.trial"]);
        assert_eq!(seen.borrow().updates[1].get("value"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn equal_content_replacement_is_redelivered() {
        let page = Page::with_tree(Value::from(json!({"vars": {"trial": {"id": 1}}})));
        let seen = counter(&page, "vars.trial.id");

        page.set("vars.trial", json!({"id": 1})).unwrap();
        let result = page.update_page();
        assert_eq!(result.generations(), 1);
        assert_eq!(result.published[0].iter().collect::<Vec<_>>(), vec!["vars.trial"]);
        assert_eq!(seen.borrow().updates.len(), 2);
        assert_eq!(seen.borrow().updates[1].get("value"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn type_mismatch_excluded_from_batch() {
        let page = Page::with_tree(Value::from(json!({"vars": {"score": 0}})));
        let seen = counter(&page, "vars.score");
        page.set("vars.score", "lots").unwrap();
        assert_eq!(page.update_page().generations(), 1);
        assert_eq!(seen.borrow().updates.len(), 1);
    }

    // --- Bounded retry ---

    #[test]
    fn handler_changes_publish_in_next_generation() {
        let page = Page::with_tree(Value::from(json!({"vars": {"a": 0, "b": 0}})));
        page.attach(Box::new(Follower), Element::new("x").with_attr("src", "vars.a")).unwrap();
        let seen = counter(&page, "vars.b");

        page.set("vars.a", 1).unwrap();
        let result = page.update_page();

        assert_eq!(result.generations(), 2);
        assert_eq!(result.published[0].iter().collect::<Vec<_>>(), vec!["vars.a"]);
        assert_eq!(result.published[1].iter().collect::<Vec<_>>(), vec!["vars.b"]);
        assert!(!result.exhausted);
        assert_eq!(seen.borrow().updates[1].get("value"), Some(&Value::Number(2.0)));
        assert_eq!(page.get("vars.b"), Some(Value::Number(2.0)));
    }

    #[test]
    fn feedback_loop_stops_at_budget() {
        let page = Page::with_tree(Value::from(json!({"vars": {"a": 0, "b": 0}})));
        page.attach(Box::new(Follower), Element::new("x").with_attr("src", "vars.a")).unwrap();
        page.attach(Box::new(Follower), Element::new("y").with_attr("src", "vars.b")).unwrap();

        page.set("vars.a", 1).unwrap();
        let result = page.update_page();

        // a=1 -> b=2 -> (b changed) b=3: never settles.
        assert_eq!(result.generations(), 2);
        assert!(result.exhausted);
        assert!(!page.is_publishing());
        assert!(!page.pending().is_empty());
    }

    #[test]
    fn configured_budget_is_respected() {
        let config = EngineConfig {
            retry_budget: 1,
            ..EngineConfig::default()
        };
        let tree = Value::from(json!({"vars": {"a": 0, "b": 0}}));
        let page = Page::with_config(config, Some(tree)).unwrap();
        page.attach(Box::new(Follower), Element::new("x").with_attr("src", "vars.a")).unwrap();
        page.set("vars.a", 1).unwrap();
        let result = page.update_page();
        assert_eq!(result.generations(), 1);
        assert!(result.exhausted);

        // Leftovers go out with the next call.
        let next = page.update_page();
        assert_eq!(next.published[0].iter().collect::<Vec<_>>(), vec!["vars.b"]);
    }

    #[test]
    fn invalid_config_rejected() {
        let zero = EngineConfig {
            retry_budget: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(Page::with_config(zero, None), Err(ConfigError::Invalid(_))));

        let bad_root = EngineConfig {
            variable_root: "1vars".into(),
            ..EngineConfig::default()
        };
        assert!(Page::with_config(bad_root, None).is_err());
    }

    // --- Directive registry ---

    struct Named;

    impl Observer for Named {
        fn kind(&self) -> &str {
            "ot-input"
        }

        fn parameters(&self) -> ParamSpec {
            ParamSpec::new().param("name", ParamConfig::new().with_type(ParamType::Name))
        }

        fn apply(&mut self, _: &ParamUpdates) {}
    }

    #[test]
    fn init_directives_isolates_failures() {
        let mut registry = DirectiveRegistry::new();
        registry.register("input", Selector::tag("ot-input"), |_| Box::new(Named));

        let page = Page::new();
        let elements = vec![
            Element::new("ot-input").with_attr("id", "good").with_attr("name", "answer"),
            Element::new("ot-input").with_attr("id", "bad").with_attr("name", "1st"),
            Element::new("ot-input").with_attr("id", "missing"),
            Element::new("div"),
        ];
        let report = page.init_directives(&registry, &elements);

        assert_eq!(report.attached, vec![("ot-input".to_string(), "ot-input#good".to_string())]);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(page.directives().len(), 1);
    }

    #[test]
    fn custom_variable_root() {
        let config = EngineConfig {
            variable_root: "state".into(),
            ..EngineConfig::default()
        };
        let page = Page::with_config(config, None).unwrap();
        let seen = counter(&page, "state.n");
        page.set("state.n", 5).unwrap();
        page.update_page();
        assert_eq!(seen.borrow().updates[1].get("value"), Some(&Value::Number(5.0)));
    }
}
