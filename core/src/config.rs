//! Engine configuration, loaded from YAML.
//!
//! Every field has a default, so an empty document is a valid config.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::namespace::path::is_identifier;


/// Tunables of one page engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Snapshot/diff/broadcast passes per `update_page` call.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: usize,

    /// Fallback filter for the log subscriber when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Root segment marking a parameter value as a variable reference.
    #[serde(default = "default_variable_root")]
    pub variable_root: String,
}


fn default_retry_budget() -> usize {
    2
}

fn default_log_filter() -> String {
    "info".into()
}

fn default_variable_root() -> String {
    crate::params::VARIABLE_ROOT.into()
}


impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            retry_budget: default_retry_budget(),
            log_filter: default_log_filter(),
            variable_root: default_variable_root(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_budget == 0 {
            return Err(ConfigError::Invalid("retry_budget must be at least 1".into()));
        }
        if !is_identifier(&self.variable_root) {
            return Err(ConfigError::Invalid(format!(
                "variable_root '{}' is not an identifier",
                self.variable_root
            )));
        }
        Ok(())
    }
}


/// Load an engine config from a YAML file.
pub fn load(path: &Path) -> Result<EngineConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse(&content)
}


/// Parse and validate an engine config from a YAML string.
pub fn parse(content: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = if content.trim().is_empty() {
        EngineConfig::default()
    } else {
        serde_yaml::from_str(content)?
    };
    config.validate()?;
    Ok(config)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let yaml = r#"
retry_budget: 3
log_filter: "pagevars_core=debug"
variable_root: "state"
"#;
        let config = parse(yaml).unwrap();
        assert_eq!(config.retry_budget, 3);
        assert_eq!(config.log_filter, "pagevars_core=debug");
        assert_eq!(config.variable_root, "state");
    }

    #[test]
    fn parse_minimal_config() {
        let config = parse("retry_budget: 5\n").unwrap();
        assert_eq!(config.retry_budget, 5);
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.variable_root, "vars");
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(parse("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn zero_budget_rejected() {
        let err = parse("retry_budget: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn bad_variable_root_rejected() {
        let err = parse("variable_root: \"1vars\"\n").unwrap_err();
        assert!(err.to_string().contains("not an identifier"));
    }

    #[test]
    fn parse_invalid_yaml() {
        let err = parse("retry_budget: [\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_missing_file() {
        let err = load(Path::new("/nonexistent/pagevars.yaml")).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }

    #[test]
    fn load_from_file() {
        let name = format!("pagevars-config-{}.yaml", std::process::id());
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, "retry_budget: 4\n").unwrap();
        let config = load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(config.retry_budget, 4);
    }
}
