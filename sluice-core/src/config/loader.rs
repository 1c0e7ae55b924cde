//! Reading manager configs and scenarios from disk.
//!
//! A document is parsed according to its extension, then
//! [`ConfigLoader::finish`] layers `PREFIX_*` environment overrides on top
//! and runs [`Validatable::validate`].

use std::fmt;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Configurable, Validatable};
use crate::error::ConfigError;

/// Document formats a config may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.yaml` or `.yml`
    Yaml,
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Picks the format from the extension of `path`.
    pub fn for_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }

    /// Parses `content`; `origin` names the source in error messages.
    pub fn parse<T: DeserializeOwned>(self, content: &str, origin: &str) -> Result<T, ConfigError> {
        let parsed = match self {
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|reason| ConfigError::Malformed {
            origin: origin.to_string(),
            format: self,
            reason,
        })
    }

    /// Renders `value` as a document of this format.
    pub fn render<T: Serialize>(self, value: &T) -> Result<String, ConfigError> {
        let rendered = match self {
            Self::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
            Self::Toml => toml::to_string_pretty(value).map_err(|e| e.to_string()),
            Self::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
        };
        rendered.map_err(|reason| ConfigError::Render {
            format: self,
            reason,
        })
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yaml => "YAML",
            Self::Toml => "TOML",
            Self::Json => "JSON",
        })
    }
}

/// Loads configs and applies environment overrides and validation.
///
/// ```rust,ignore
/// use sluice_core::config::{ConfigLoader, ManagerConfig};
///
/// let config: ManagerConfig = ConfigLoader::new()
///     .with_env_prefix("SLUICE")
///     .load_validated("demos/manager.toml")?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Creates a loader that applies no environment overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads overrides from variables named `{prefix}_{FIELD}`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Reads and parses `path` without overrides or validation.
    pub fn load_file<T, P>(&self, path: P) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let format = ConfigFormat::for_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        format.parse(&content, &path.display().to_string())
    }

    /// Reads `path`, then applies [`finish`](Self::finish).
    pub fn load_validated<T, P>(&self, path: P) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Configurable + Validatable,
        P: AsRef<Path>,
    {
        let config = self.load_file(path)?;
        self.finish(config)
    }

    /// Applies environment overrides (when a prefix is set), then validates.
    pub fn finish<T>(&self, mut config: T) -> Result<T, ConfigError>
    where
        T: Configurable + Validatable,
    {
        if let Some(prefix) = &self.env_prefix {
            config.apply_env_overrides(prefix)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parses in-memory content without overrides or validation.
    pub fn load_str<T>(&self, content: &str, format: ConfigFormat) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
    {
        format.parse(content, "inline")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    use crate::types::Amount;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Reserve {
        backend: String,
        floor: Amount,
        #[serde(default)]
        frozen: bool,
    }

    impl Validatable for Reserve {
        fn validate(&self) -> Result<(), ConfigError> {
            if self.floor.is_zero() {
                return Err(ConfigError::invalid_value("floor", "must be positive"));
            }
            Ok(())
        }
    }

    impl Configurable for Reserve {
        fn apply_env_overrides(&mut self, _prefix: &str) -> Result<(), ConfigError> {
            self.frozen = true;
            Ok(())
        }

        fn env_var_names(prefix: &str) -> Vec<String> {
            vec![format!("{prefix}_FROZEN")]
        }
    }

    fn reserve(floor: u128) -> Reserve {
        Reserve {
            backend: "aave".to_string(),
            floor: Amount::new(floor),
            frozen: false,
        }
    }

    #[test]
    fn test_format_for_path() {
        for (name, format) in [
            ("manager.yaml", ConfigFormat::Yaml),
            ("manager.YML", ConfigFormat::Yaml),
            ("manager.toml", ConfigFormat::Toml),
            ("scenario.json", ConfigFormat::Json),
        ] {
            assert_eq!(ConfigFormat::for_path(Path::new(name)).unwrap(), format);
        }
        assert!(matches!(
            ConfigFormat::for_path(Path::new("manager.ini")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
        assert!(ConfigFormat::for_path(Path::new("manager")).is_err());
    }

    #[test]
    fn test_same_document_in_every_format() {
        let loader = ConfigLoader::new();
        let yaml: Reserve = loader
            .load_str("backend: aave\nfloor: 500\n", ConfigFormat::Yaml)
            .unwrap();
        let toml: Reserve = loader
            .load_str("backend = \"aave\"\nfloor = 500\n", ConfigFormat::Toml)
            .unwrap();
        let json: Reserve = loader
            .load_str(r#"{"backend": "aave", "floor": 500}"#, ConfigFormat::Json)
            .unwrap();
        assert_eq!(yaml, reserve(500));
        assert_eq!(toml, yaml);
        assert_eq!(json, yaml);
    }

    #[test]
    fn test_malformed_names_origin() {
        let err = ConfigLoader::new()
            .load_str::<Reserve>("backend: [aave", ConfigFormat::Yaml)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Malformed { ref origin, format: ConfigFormat::Yaml, .. } if origin == "inline"
        ));
    }

    #[test]
    fn test_finish_overrides_then_validates() {
        let finished = ConfigLoader::new()
            .with_env_prefix("TEST")
            .finish(reserve(1))
            .unwrap();
        assert!(finished.frozen);

        let unprefixed = ConfigLoader::new().finish(reserve(1)).unwrap();
        assert!(!unprefixed.frozen);

        let err = ConfigLoader::new().finish(reserve(0)).unwrap_err();
        assert_eq!(err.field(), Some("floor"));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let result: Result<Reserve, _> = ConfigLoader::new().load_file("no/such/reserve.yaml");
        assert!(matches!(result, Err(ConfigError::Unreadable { .. })));
    }

    #[test]
    fn test_render_parses_back() {
        for format in [ConfigFormat::Yaml, ConfigFormat::Toml, ConfigFormat::Json] {
            let text = format.render(&reserve(42)).unwrap();
            let parsed: Reserve = format.parse(&text, "rendered").unwrap();
            assert_eq!(parsed, reserve(42), "{format}");
        }
    }
}
