//! Binding of declared parameters to attribute values and live variables.
//!
//! `ParamBinder::parse` resolves each declared parameter once, when a
//! directive is initialized, into a constant, a flag, or a variable
//! binding. `BoundParam::evaluate` re-reads variable bindings on every
//! broadcast that reaches them.

use std::collections::BTreeMap;

use crate::error::{ParamError, TypeMismatchError};
use crate::namespace::path::{extract, validate};
use crate::snapshot::ChangeSet;
use crate::types::Value;

use super::schema::{Attributes, ParamConfig, ParamSpec, ParamType};


/// Default root segment of variable references.
pub const VARIABLE_ROOT: &str = "vars";


/// Values produced for a directive in one pass, by parameter name.
/// A deleted variable appears as `Value::Null`.
pub type ParamUpdates = BTreeMap<String, Value>;


// ---------------------------------------------------------------------------
// BoundParam
// ---------------------------------------------------------------------------

/// A parameter resolved from static configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundParam {
    /// Literal (or omitted optional) value. Never changes.
    Constant {
        value: Option<Value>,
        ty: Option<ParamType>,
    },
    /// Presence of a flag attribute.
    Flag(bool),
    /// Reference to a node of the state tree.
    Variable {
        path: String,
        ty: Option<ParamType>,
        default: Option<Value>,
    },
}

/// Outcome of evaluating one bound parameter against a change set.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Not a variable, or the change set does not reach it.
    Unchanged,
    /// The bound node is gone (or null).
    Deleted,
    Changed(Value),
}

impl BoundParam {
    /// Value known without consulting the tree.
    pub fn initial(&self) -> Option<Value> {
        match self {
            BoundParam::Constant { value, .. } => value.clone(),
            BoundParam::Flag(present) => Some(Value::Bool(*present)),
            BoundParam::Variable { default, .. } => default.clone(),
        }
    }

    pub fn variable_path(&self) -> Option<&str> {
        match self {
            BoundParam::Variable { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Re-read a variable binding if `changes` reaches it.
    pub fn evaluate(
        &self,
        name: &str,
        changes: &ChangeSet,
        tree: &Value,
    ) -> Result<Evaluation, TypeMismatchError> {
        let BoundParam::Variable { path, ty, .. } = self else {
            return Ok(Evaluation::Unchanged);
        };
        if !changes.reaches(path) {
            return Ok(Evaluation::Unchanged);
        }
        match extract(tree, path) {
            Some(value) if !value.is_void() => {
                check_type(name, path, *ty, value)?;
                Ok(Evaluation::Changed(value.clone()))
            }
            _ => Ok(Evaluation::Deleted),
        }
    }

    /// Current value for seeding a freshly initialized directive: the live
    /// value of a variable when present, otherwise `initial`.
    pub fn resolve(&self, name: &str, tree: &Value) -> Result<Option<Value>, TypeMismatchError> {
        if let BoundParam::Variable { path, ty, .. } = self {
            if let Some(value) = extract(tree, path).filter(|v| !v.is_void()) {
                check_type(name, path, *ty, value)?;
                return Ok(Some(value.clone()));
            }
        }
        Ok(self.initial())
    }
}

fn check_type(
    name: &str,
    path: &str,
    ty: Option<ParamType>,
    value: &Value,
) -> Result<(), TypeMismatchError> {
    match ty {
        Some(expected) if !expected.matches(value) => Err(TypeMismatchError {
            param: name.to_string(),
            path: path.to_string(),
            expected,
            found: value.kind_name(),
        }),
        _ => Ok(()),
    }
}


// ---------------------------------------------------------------------------
// BoundParams
// ---------------------------------------------------------------------------

/// All bound parameters of one directive, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundParams {
    params: Vec<(String, BoundParam)>,
}

impl BoundParams {
    pub fn get(&self, name: &str) -> Option<&BoundParam> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoundParam)> {
        self.params.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Evaluate every parameter. Failing parameters are left out of the
    /// updates and returned alongside them.
    pub fn evaluate(
        &self,
        changes: &ChangeSet,
        tree: &Value,
    ) -> (ParamUpdates, Vec<TypeMismatchError>) {
        let mut updates = ParamUpdates::new();
        let mut failures = Vec::new();
        for (name, param) in &self.params {
            match param.evaluate(name, changes, tree) {
                Ok(Evaluation::Unchanged) => {}
                Ok(Evaluation::Deleted) => {
                    updates.insert(name.clone(), Value::Null);
                }
                Ok(Evaluation::Changed(value)) => {
                    updates.insert(name.clone(), value);
                }
                Err(e) => failures.push(e),
            }
        }
        (updates, failures)
    }

    /// Values to seed a directive with. Parameters with nothing to offer
    /// are left out; failing ones are returned alongside.
    pub fn resolve(&self, tree: &Value) -> (ParamUpdates, Vec<TypeMismatchError>) {
        let mut values = ParamUpdates::new();
        let mut failures = Vec::new();
        for (name, param) in &self.params {
            match param.resolve(name, tree) {
                Ok(Some(value)) => {
                    values.insert(name.clone(), value);
                }
                Ok(None) => {}
                Err(e) => failures.push(e),
            }
        }
        (values, failures)
    }
}

impl FromIterator<(String, BoundParam)> for BoundParams {
    fn from_iter<I: IntoIterator<Item = (String, BoundParam)>>(iter: I) -> Self {
        BoundParams {
            params: iter.into_iter().collect(),
        }
    }
}


// ---------------------------------------------------------------------------
// ParamBinder
// ---------------------------------------------------------------------------

/// Resolves parameter declarations against an attribute bag.
#[derive(Debug, Clone)]
pub struct ParamBinder {
    variable_root: String,
}

impl ParamBinder {
    pub fn new(variable_root: impl Into<String>) -> Self {
        ParamBinder {
            variable_root: variable_root.into(),
        }
    }

    pub fn variable_root(&self) -> &str {
        &self.variable_root
    }

    /// If `raw` is a variable reference (`vars.` + path, optionally `.*`),
    /// return the path it binds. The root segment is kept: the tree holds
    /// the variables under that key.
    pub fn variable_ref<'a>(&self, raw: &'a str) -> Option<&'a str> {
        let rest = raw
            .strip_prefix(self.variable_root.as_str())?
            .strip_prefix('.')?;
        validate(rest).then_some(raw)
    }

    /// Resolve one declared parameter.
    pub fn parse(
        &self,
        name: &str,
        config: &ParamConfig,
        attrs: &Attributes,
    ) -> Result<BoundParam, ParamError> {
        let key = config.source_key(name);
        let raw = attrs.get(key);

        if config.ty == Some(ParamType::Flag) {
            if raw.is_some_and(|v| !v.is_empty()) {
                return Err(ParamError::FlagWithValue { name: name.to_string() });
            }
            return Ok(BoundParam::Flag(raw.is_some()));
        }

        let Some(raw) = raw else {
            if !config.optional {
                return Err(ParamError::Missing { name: name.to_string() });
            }
            return Ok(BoundParam::Constant {
                value: config.default.clone(),
                ty: config.ty,
            });
        };

        if let Some(path) = self.variable_ref(raw) {
            if config.variable == Some(false) {
                return Err(ParamError::UnexpectedVariable { name: name.to_string() });
            }
            return Ok(BoundParam::Variable {
                path: path.to_string(),
                ty: config.ty,
                default: config.default.clone(),
            });
        }

        if config.variable == Some(true) {
            return Err(ParamError::ExpectedVariable { name: name.to_string() });
        }

        let value = match config.ty {
            Some(ty) => ty.parse_literal(raw).ok_or_else(|| ParamError::Malformed {
                name: name.to_string(),
                expected: ty,
                raw: raw.clone(),
            })?,
            None => Value::String(raw.clone()),
        };
        Ok(BoundParam::Constant {
            value: Some(value),
            ty: config.ty,
        })
    }

    /// Resolve every declared parameter, collecting all failures rather
    /// than stopping at the first.
    pub fn parse_all(
        &self,
        spec: &ParamSpec,
        attrs: &Attributes,
    ) -> Result<BoundParams, Vec<ParamError>> {
        let mut params = Vec::with_capacity(spec.len());
        let mut errors = Vec::new();
        for (name, config) in spec.iter() {
            match self.parse(name, config, attrs) {
                Ok(param) => params.push((name.to_string(), param)),
                Err(e) => errors.push(e),
            }
        }
        if errors.is_empty() {
            Ok(BoundParams { params })
        } else {
            Err(errors)
        }
    }
}

impl Default for ParamBinder {
    fn default() -> Self {
        ParamBinder::new(VARIABLE_ROOT)
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
