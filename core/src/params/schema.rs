//! Parameter schemas declared by directives.
//!
//! A directive lists its parameters by name, each with a `ParamConfig`
//! saying which literal type it accepts, whether it may be omitted, its
//! default, whether it must (or must not) be a `vars.` reference, and which
//! attribute it is read from.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::namespace::path::is_identifier;
use crate::types::Value;


/// Attribute bag of a host element, the static source of parameters.
pub type Attributes = BTreeMap<String, String>;


// ---------------------------------------------------------------------------
// ParamType
// ---------------------------------------------------------------------------

/// Literal types a parameter can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    /// An identifier, used for input and display names.
    Name,
    /// Attribute presence, no value.
    Flag,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Name => "name",
            ParamType::Flag => "flag",
        }
    }

    /// Runtime check of a live variable value against the declared type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String | ParamType::Name => matches!(value, Value::String(_)),
            ParamType::Number => matches!(value, Value::Number(_)),
            ParamType::Boolean | ParamType::Flag => matches!(value, Value::Bool(_)),
        }
    }

    /// Coerce a raw attribute literal. `None` means the literal is
    /// malformed for this type.
    pub fn parse_literal(&self, raw: &str) -> Option<Value> {
        match self {
            ParamType::String => Some(Value::String(raw.to_string())),
            ParamType::Number => {
                if is_numeric_literal(raw) {
                    raw.parse::<f64>().ok().map(Value::Number)
                } else {
                    None
                }
            }
            ParamType::Boolean => match raw {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            ParamType::Name => is_identifier(raw).then(|| Value::String(raw.to_string())),
            ParamType::Flag => raw.is_empty().then_some(Value::Bool(true)),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `-?\d*(\.\d+)?` with at least one digit somewhere.
fn is_numeric_literal(raw: &str) -> bool {
    let unsigned = raw.strip_prefix('-').unwrap_or(raw);
    let (int, frac) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (unsigned, None),
    };
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    match frac {
        Some(frac) => digits(int) && !frac.is_empty() && digits(frac),
        None => !int.is_empty() && digits(int),
    }
}


// ---------------------------------------------------------------------------
// ParamConfig
// ---------------------------------------------------------------------------

/// Declaration of one parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamConfig {
    /// Accepted literal type; `None` accepts any string as-is.
    #[serde(default, rename = "type")]
    pub ty: Option<ParamType>,

    /// If true, a missing attribute resolves to `default`.
    #[serde(default)]
    pub optional: bool,

    /// Value for omitted parameters and for variables not yet set.
    #[serde(default)]
    pub default: Option<Value>,

    /// `Some(true)`: must be a variable. `Some(false)`: must be a literal.
    #[serde(default)]
    pub variable: Option<bool>,

    /// Attribute to read instead of the parameter name.
    #[serde(default)]
    pub attr: Option<String>,
}

impl ParamConfig {
    pub fn new() -> Self {
        ParamConfig::default()
    }

    /// Shorthand for a presence-only parameter.
    pub fn flag() -> Self {
        ParamConfig::new().with_type(ParamType::Flag)
    }

    pub fn with_type(mut self, ty: ParamType) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn variable_only(mut self) -> Self {
        self.variable = Some(true);
        self
    }

    pub fn literal_only(mut self) -> Self {
        self.variable = Some(false);
        self
    }

    pub fn from_attr(mut self, attr: impl Into<String>) -> Self {
        self.attr = Some(attr.into());
        self
    }

    /// Attribute key the raw value is read from.
    pub fn source_key<'a>(&'a self, name: &'a str) -> &'a str {
        self.attr.as_deref().unwrap_or(name)
    }
}


// ---------------------------------------------------------------------------
// ParamSpec
// ---------------------------------------------------------------------------

/// Ordered parameter declarations of one directive kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSpec {
    params: Vec<(String, ParamConfig)>,
}

impl ParamSpec {
    pub fn new() -> Self {
        ParamSpec::default()
    }

    /// Declare a parameter. Redeclaring a name replaces the earlier config.
    pub fn param(mut self, name: impl Into<String>, config: ParamConfig) -> Self {
        let name = name.into();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = config,
            None => self.params.push((name, config)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamConfig> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamConfig)> {
        self.params.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
