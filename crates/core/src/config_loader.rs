use std::path::Path;

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::config::{AppConfig, ModelProfile};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/axiom.toml";

/// Prefix for environment overrides, e.g. `AXIOM_MODEL__MIN_EDGE_PCT=3`.
pub const ENV_PREFIX: &str = "AXIOM_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from the default location, then validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or the
    /// resulting configuration is invalid.
    pub fn load() -> Result<AppConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration from a specific TOML file, then validates it.
    ///
    /// Missing files are not an error; defaults and the environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or the
    /// resulting configuration is invalid.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
        Self::extract(Self::base(path.as_ref()))
    }

    /// Loads configuration with a profile overlay (`axiom.<profile>.toml`
    /// next to the base file).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or the
    /// resulting configuration is invalid.
    pub fn load_with_profile(path: impl AsRef<Path>, profile: &str) -> Result<AppConfig> {
        let path = path.as_ref();
        let overlay = path.with_file_name(format!("axiom.{profile}.toml"));
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Toml::file(overlay))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    /// Replaces the model section with a built-in preset, keeping other sections.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown presets or an invalid configuration.
    pub fn load_with_preset(path: impl AsRef<Path>, preset: &str) -> Result<AppConfig> {
        let model = ModelProfile::preset(preset)
            .with_context(|| format!("unknown model preset '{preset}'"))?;
        let mut config = Self::load_from(path)?;
        config.model = model;
        config.validate()?;
        Ok(config)
    }

    fn base(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn extract(figment: Figment) -> Result<AppConfig> {
        let config: AppConfig = figment
            .extract()
            .context("failed to read configuration")?;
        config.validate()?;
        tracing::debug!(profile = %config.model.name, "configuration loaded");
        Ok(config)
    }
}
