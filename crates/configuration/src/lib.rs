use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{Config, DataConfig, ReportConfig, SimulationConfig, StrategyConfig};

/// Prefix for environment overrides, e.g. `WALKFOLIO__SIMULATION__MAX_WEIGHT=0.1`.
pub const ENV_PREFIX: &str = "WALKFOLIO";

/// Loads the application configuration from a TOML file.
///
/// This function is the primary entry point for this crate. It reads the configuration file,
/// layers any `WALKFOLIO__*` environment variables on top, deserializes the result into our
/// strongly-typed `Config` struct and validates it.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path.as_ref()).format(config::FileFormat::Toml))
        .add_source(environment())
        .build()?;

    finish(builder)
}

/// Parses a configuration held in memory, with the same environment overrides
/// and validation as [`load_config`].
pub fn parse_config(toml: &str) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .add_source(environment())
        .build()?;

    finish(builder)
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

fn finish(builder: config::Config) -> Result<Config, ConfigError> {
    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    tracing::debug!(strategies = config.strategies.len(), "Configuration loaded.");
    Ok(config)
}
