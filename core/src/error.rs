use thiserror::Error;

use crate::params::ParamType;

// ---------------------------------------------------------------------------
// Key path errors
// ---------------------------------------------------------------------------

/// A path could not be written into the state tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyPathError {
    /// The path does not follow the key path grammar.
    #[error("invalid key path '{0}'")]
    Invalid(String),
    /// An intermediate segment is missing or is not a container.
    #[error("unreachable key path '{path}': nothing to write into at '{at}'")]
    Unreachable { path: String, at: String },
}


// ---------------------------------------------------------------------------
// Parameter errors
// ---------------------------------------------------------------------------

/// A directive parameter's static configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("missing parameter '{name}'")]
    Missing { name: String },
    #[error("invalid parameter '{name}'; expected: flag with no value")]
    FlagWithValue { name: String },
    #[error("invalid parameter '{name}'; expected: value")]
    UnexpectedVariable { name: String },
    #[error("invalid parameter '{name}'; expected: variable")]
    ExpectedVariable { name: String },
    #[error("invalid parameter '{name}'; expected: {expected}, got '{raw}'")]
    Malformed {
        name: String,
        expected: ParamType,
        raw: String,
    },
}

impl ParamError {
    /// Name of the parameter the error refers to.
    pub fn param(&self) -> &str {
        match self {
            ParamError::Missing { name }
            | ParamError::FlagWithValue { name }
            | ParamError::UnexpectedVariable { name }
            | ParamError::ExpectedVariable { name }
            | ParamError::Malformed { name, .. } => name,
        }
    }
}


/// A bound variable holds a value of the wrong runtime type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value of '{path}' for parameter '{param}'; expected: {expected}, found: {found}")]
pub struct TypeMismatchError {
    pub param: String,
    pub path: String,
    pub expected: ParamType,
    pub found: &'static str,
}


// ---------------------------------------------------------------------------
// Directive errors
// ---------------------------------------------------------------------------

/// A directive could not be brought up on its element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    /// One or more parameters failed to parse. Every failure is kept.
    #[error("failed to initialize {kind} at {element}: {} parameter error(s)", .errors.len())]
    Params {
        kind: String,
        element: String,
        errors: Vec<ParamError>,
    },
}


// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid engine config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid engine config: {0}")]
    Invalid(String),
}
