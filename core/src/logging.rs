//! Log subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;


/// Install a fmt subscriber. `RUST_LOG` wins over `fallback`. Returns false
/// if a global subscriber was already installed.
pub fn init(fallback: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}


/// Install a subscriber using the config's filter.
pub fn init_from(config: &EngineConfig) -> bool {
    init(&config.log_filter)
}
