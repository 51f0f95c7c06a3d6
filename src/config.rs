//! Application configuration.
//!
//! Configuration is read from YAML files in a directory: `default.yaml` is
//! loaded first and `<environment>.yaml` is layered on top of it. A handful of
//! `MARATHON_*` environment variables override the file values last.
//!
//! The running application never holds a private copy of the configuration.
//! It reads through a [`SharedConfig`] handle, so values written after
//! construction (most importantly `app.port`) are observed the next time the
//! application listens.

use std::{
    env,
    fs,
    io,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard},
};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use thiserror::Error;


/// Environment variable selecting the configuration environment.
pub const ENV_VAR: &str = "MARATHON_ENV";
/// Environment used when [`ENV_VAR`] is unset.
pub const DEFAULT_ENVIRONMENT: &str = "development";

const HOST_OVERRIDE: &str = "MARATHON_APP_HOST";
const PORT_OVERRIDE: &str = "MARATHON_APP_PORT";
const WORKING_TEXT_OVERRIDE: &str = "MARATHON_HEALTHCHECK_WORKING_TEXT";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A configuration file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A configuration file is not valid YAML for [`Config`].
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    /// The merged document does not describe a valid [`Config`].
    #[error("invalid configuration: {0}")]
    Invalid(#[source] serde_yaml::Error),
    /// An environment override holds a value of the wrong type.
    #[error("invalid value {value:?} for {var}")]
    InvalidOverride { var: &'static str, value: String },
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppSection,
    pub healthcheck: HealthcheckSection,
    pub logging: LoggingSection,
    pub metrics: MetricsSection,
}

/// Listener settings for the HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub host: String,
    pub port: u16,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8080,
        }
    }
}

/// Healthcheck endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealthcheckSection {
    /// Body returned by `GET /healthcheck`.
    pub working_text: String,
}

impl Default for HealthcheckSection {
    fn default() -> Self {
        Self {
            working_text: "WORKING".to_owned(),
        }
    }
}

/// Log filter used by the binary when `RUST_LOG` is unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSection {
    /// Address the exporter listens on. The exporter is disabled when unset.
    pub listen: Option<SocketAddr>,
}

impl Config {
    /// Load configuration for `environment` from the files in `dir`.
    ///
    /// Missing files are skipped, so an empty directory yields
    /// [`Config::default`] plus any environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a file cannot be read or parsed, or an
    /// override variable holds an invalid value.
    pub fn load(dir: impl AsRef<Path>, environment: &str) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let mut merged = Value::Mapping(serde_yaml::Mapping::new());
        for name in ["default", environment] {
            if let Some(layer) = read_layer(&dir.join(format!("{name}.yaml")))? {
                merge(&mut merged, layer);
            }
        }
        let mut config: Config = serde_yaml::from_value(merged).map_err(ConfigError::Invalid)?;
        config.apply_overrides(|var| env::var(var).ok())?;
        Ok(config)
    }

    /// Name of the active configuration environment.
    #[must_use]
    pub fn environment() -> String {
        env::var(ENV_VAR).unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_owned())
    }

    /// Apply `MARATHON_*` overrides resolved through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if the port override is not a
    /// valid `u16`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(HOST_OVERRIDE) {
            self.app.host = host;
        }
        if let Some(raw) = lookup(PORT_OVERRIDE) {
            self.app.port = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride {
                    var: PORT_OVERRIDE,
                    value: raw,
                })?;
        }
        if let Some(text) = lookup(WORKING_TEXT_OVERRIDE) {
            self.healthcheck.working_text = text;
        }
        Ok(())
    }
}

fn read_layer(path: &Path) -> Result<Option<Value>, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_owned(),
                source,
            });
        }
    };
    let value: Value = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })?;
    // An empty file parses as null; treat it as absent.
    Ok((!value.is_null()).then_some(value))
}

/// Deep-merge `overlay` into `base`. Mappings merge key by key, anything else
/// is replaced.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Cloneable handle to a mutable [`Config`] shared between the application
/// and whoever drives it.
///
/// ```
/// use marathon::config::{Config, SharedConfig};
///
/// let shared = SharedConfig::new(Config::default());
/// let view = shared.clone();
/// shared.set_port(9001);
/// assert_eq!(view.port(), 9001);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SharedConfig(Arc<RwLock<Config>>);

impl SharedConfig {
    /// Wrap `config` for sharing.
    #[must_use]
    pub fn new(config: Config) -> Self { Self(Arc::new(RwLock::new(config))) }

    /// Borrow the current configuration.
    pub fn read(&self) -> RwLockReadGuard<'_, Config> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current configuration.
    #[must_use]
    pub fn snapshot(&self) -> Config { self.read().clone() }

    /// Mutate the configuration in place.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Config),
    {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }

    /// Currently configured listener port.
    #[must_use]
    pub fn port(&self) -> u16 { self.read().app.port }

    /// Overwrite `app.port`.
    pub fn set_port(&self, port: u16) { self.update(|config| config.app.port = port); }

    /// Currently configured healthcheck body.
    #[must_use]
    pub fn working_text(&self) -> String { self.read().healthcheck.working_text.clone() }

    /// Returns `true` if both handles point at the same configuration.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl From<Config> for SharedConfig {
    fn from(config: Config) -> Self { Self::new(config) }
}
