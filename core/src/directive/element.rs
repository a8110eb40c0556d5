//! Host elements and the structural selectors that pick directives for them.

use std::fmt;

use crate::params::Attributes;


/// A page element a directive attaches to. Only its tag and attribute bag
/// are visible to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: Attributes,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn has_attr(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// The `id` attribute, used to address element-scoped events.
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Short description for diagnostics, e.g. `ot-input#answer`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)?;
        if let Some(id) = self.id() {
            write!(f, "#{}", id)?;
        }
        Ok(())
    }
}


/// Structural element match: an optional tag, attributes that must be
/// present, and a tag that must not match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    tag: Option<String>,
    attrs: Vec<String>,
    not_tag: Option<String>,
}

impl Selector {
    /// Match elements with this tag.
    pub fn tag(tag: impl Into<String>) -> Self {
        Selector {
            tag: Some(tag.into()),
            ..Selector::default()
        }
    }

    /// Match any element carrying this attribute.
    pub fn attr(attr: impl Into<String>) -> Self {
        Selector {
            attrs: vec![attr.into()],
            ..Selector::default()
        }
    }

    pub fn with_attr(mut self, attr: impl Into<String>) -> Self {
        self.attrs.push(attr.into());
        self
    }

    pub fn excluding_tag(mut self, tag: impl Into<String>) -> Self {
        self.not_tag = Some(tag.into());
        self
    }

    pub fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if element.tag() != tag {
                return false;
            }
        }
        if self.not_tag.as_deref() == Some(element.tag()) {
            return false;
        }
        self.attrs.iter().all(|a| element.has_attr(a))
    }
}
