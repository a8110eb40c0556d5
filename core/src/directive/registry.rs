//! Registry of directive kinds, keyed on structural selectors.

use super::element::{Element, Selector};
use super::observer::Observer;


/// Builds a fresh observer for a matched element.
pub type Factory = Box<dyn Fn(&Element) -> Box<dyn Observer>>;


pub struct Registration {
    name: String,
    selector: Selector,
    factory: Factory,
}

impl Registration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn build(&self, element: &Element) -> Box<dyn Observer> {
        (self.factory)(element)
    }
}


/// Directive kinds in registration order.
#[derive(Default)]
pub struct DirectiveRegistry {
    entries: Vec<Registration>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        DirectiveRegistry::default()
    }

    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        selector: Selector,
        factory: F,
    ) -> &mut Self
    where
        F: Fn(&Element) -> Box<dyn Observer> + 'static,
    {
        self.entries.push(Registration {
            name: name.into(),
            selector,
            factory: Box::new(factory),
        });
        self
    }

    /// Registrations whose selector matches `element`.
    pub fn matching<'a>(&'a self, element: &'a Element) -> impl Iterator<Item = &'a Registration> {
        self.entries.iter().filter(move |r| r.selector.matches(element))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParamSpec, ParamUpdates};

    struct Nop(&'static str);

    impl Observer for Nop {
        fn kind(&self) -> &str {
            self.0
        }

        fn parameters(&self) -> ParamSpec {
            ParamSpec::new()
        }

        fn apply(&mut self, _: &ParamUpdates) {}
    }

    #[test]
    fn matching_respects_order_and_selectors() {
        let mut registry = DirectiveRegistry::new();
        registry
            .register("input", Selector::tag("ot-input"), |_| Box::new(Nop("input")))
            .register("text", Selector::attr("ot-text"), |_| Box::new(Nop("text")));
        assert_eq!(registry.len(), 2);

        let el = Element::new("ot-input").with_attr("ot-text", "vars.a");
        let names: Vec<&str> = registry.matching(&el).map(|r| r.name()).collect();
        assert_eq!(names, vec!["input", "text"]);

        let plain = Element::new("div");
        assert_eq!(registry.matching(&plain).count(), 0);
    }

    #[test]
    fn build_uses_factory() {
        let mut registry = DirectiveRegistry::new();
        registry.register("input", Selector::tag("ot-input"), |_| Box::new(Nop("ot-input")));
        let el = Element::new("ot-input");
        let observer = registry.matching(&el).next().unwrap().build(&el);
        assert_eq!(observer.kind(), "ot-input");
    }
}
