//! Injector configuration. By default, injectors are created with opinionated default values, which
//! can be overwritten by calling [InjectorConfig::init_from_environment] - it reads environment
//! variables prefixed with `KEYSTONE_` and the optional `keystone.json` file.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_ENV_PREFIX: &str = "KEYSTONE";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "keystone.json";

/// Behavior configuration for [Injector](crate::injector::Injector)s. Sub-injectors inherit the
/// configuration of their parent.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InjectorConfig {
    /// Should a warning be logged when an existing mapping gets overridden.
    pub warn_on_mapping_override: bool,

    /// Should mapping a type, which already has an unsealed direct mapping, replace the existing
    /// mapping. If not, such attempt results in an error.
    pub allow_mapping_override: bool,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            warn_on_mapping_override: true,
            allow_mapping_override: true,
        }
    }
}

impl From<OptionalInjectorConfig> for InjectorConfig {
    fn from(value: OptionalInjectorConfig) -> Self {
        let default = Self::default();
        Self {
            warn_on_mapping_override: value
                .warn_on_mapping_override
                .unwrap_or(default.warn_on_mapping_override),
            allow_mapping_override: value
                .allow_mapping_override
                .unwrap_or(default.allow_mapping_override),
        }
    }
}

impl InjectorConfig {
    /// Creates a config from [CONFIG_FILE] and environment variables, falling back to defaults for
    /// missing values.
    pub fn init_from_environment() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(CONFIG_ENV_PREFIX))
            .build()
            .and_then(|config| config.try_deserialize::<OptionalInjectorConfig>())
            .map(|config| config.into())
    }

    pub fn with_warn_on_mapping_override(mut self, warn_on_mapping_override: bool) -> Self {
        self.warn_on_mapping_override = warn_on_mapping_override;
        self
    }

    pub fn with_allow_mapping_override(mut self, allow_mapping_override: bool) -> Self {
        self.allow_mapping_override = allow_mapping_override;
        self
    }
}

#[derive(Deserialize, Default)]
struct OptionalInjectorConfig {
    warn_on_mapping_override: Option<bool>,
    allow_mapping_override: Option<bool>,
}

#[cfg(test)]
mod tests {
    use crate::config::{InjectorConfig, OptionalInjectorConfig};

    #[test]
    fn should_fill_missing_values_with_defaults() {
        let config = InjectorConfig::from(OptionalInjectorConfig {
            allow_mapping_override: Some(false),
            ..Default::default()
        });

        assert!(config.warn_on_mapping_override);
        assert!(!config.allow_mapping_override);
    }

    #[test]
    fn should_build_config() {
        let config = InjectorConfig::default()
            .with_warn_on_mapping_override(false)
            .with_allow_mapping_override(false);

        assert!(!config.warn_on_mapping_override);
        assert!(!config.allow_mapping_override);
    }
}
