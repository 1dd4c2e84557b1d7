//! Server configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use twocold_core::PortalSettings;

use crate::controller::SetStatePolicy;

/// Shortest accepted API key.
pub const MIN_API_KEY_LEN: usize = 16;
/// Longest accepted portal timeout in seconds.
pub const MAX_PORTAL_TIMEOUT: u64 = 300;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Portal address, credentials and room identifiers.
    pub portal: PortalSettings,
    /// Device control behavior.
    pub control: ControlConfig,
    /// API access control.
    pub security: SecurityConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    ///
    /// # Example
    ///
    /// ```
    /// use twocold_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(validate_portal(&self.portal));
        errors.extend(self.security.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError::new(
                "server.bind",
                "bind address cannot be empty",
            ));
            return errors;
        }

        match self.bind.rsplit_once(':') {
            None => errors.push(ValidationError::new(
                "server.bind",
                format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            )),
            Some((_, port)) => match port.parse::<u16>() {
                Ok(0) => errors.push(ValidationError::new("server.bind", "port cannot be 0")),
                Ok(_) => {}
                Err(_) => errors.push(ValidationError::new(
                    "server.bind",
                    format!("invalid port '{}': must be a number 1-65535", port),
                )),
            },
        }

        errors
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Device registry file.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: twocold_store::default_store_path(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.path",
                "registry path cannot be empty",
            ));
        }
        errors
    }
}

/// Device control configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Behavior when a device already has the requested state.
    pub set_state_policy: SetStatePolicy,
}

/// API access control.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Require an `X-API-Key` header on every request except `/api/health`.
    pub api_key_enabled: bool,
    /// The expected key.
    pub api_key: Option<String>,
}

impl SecurityConfig {
    /// Validate security configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !self.api_key_enabled {
            return errors;
        }
        match &self.api_key {
            None => errors.push(ValidationError::new(
                "security.api_key",
                "api key is required when api_key_enabled is true",
            )),
            Some(key) if key.len() < MIN_API_KEY_LEN => errors.push(ValidationError::new(
                "security.api_key",
                format!("api key must be at least {MIN_API_KEY_LEN} characters"),
            )),
            Some(_) => {}
        }
        errors
    }
}

fn validate_portal(portal: &PortalSettings) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !portal.base_url.starts_with("http://") && !portal.base_url.starts_with("https://") {
        errors.push(ValidationError::new(
            "portal.base_url",
            format!(
                "invalid portal URL '{}': must start with http:// or https://",
                portal.base_url
            ),
        ));
    }
    for (field, value) in [
        ("portal.main_page", &portal.main_page),
        ("portal.login_page", &portal.login_page),
        ("portal.username", &portal.username),
        ("portal.user_type", &portal.user_type),
        ("portal.rooms.floor5", &portal.rooms.floor5),
        ("portal.rooms.floor8", &portal.rooms.floor8),
    ] {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(field, "cannot be empty"));
        }
    }
    if portal.timeout_secs == 0 || portal.timeout_secs > MAX_PORTAL_TIMEOUT {
        errors.push(ValidationError::new(
            "portal.timeout_secs",
            format!(
                "timeout {} is out of range (1 to {} seconds)",
                portal.timeout_secs, MAX_PORTAL_TIMEOUT
            ),
        ));
    }
    if portal.rooms.floor5 == portal.rooms.floor8 {
        errors.push(ValidationError::new(
            "portal.rooms",
            "floors 5 and 8 must use different room identifiers",
        ));
    }

    errors
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `portal.rooms.floor5`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("twocold")
        .join("server.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.storage.path, twocold_store::default_store_path());
        assert_eq!(config.portal, PortalSettings::default());
        assert_eq!(
            config.control.set_state_policy,
            SetStatePolicy::SkipIfSatisfied
        );
        assert!(!config.security.api_key_enabled);
    }

    #[test]
    fn test_config_full_toml() {
        let toml = r#"
            [server]
            bind = "0.0.0.0:9000"

            [storage]
            path = "/data/devices.json"

            [portal]
            base_url = "https://portal.example/screenmate"
            username = "5floor"
            password = "hunter2"
            timeout_secs = 30

            [portal.rooms]
            floor5 = "{5A}"
            floor8 = "{8B}"

            [control]
            set_state_policy = "always_post"

            [security]
            api_key_enabled = true
            api_key = "0123456789abcdef"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.storage.path, PathBuf::from("/data/devices.json"));
        assert_eq!(config.portal.username, "5floor");
        assert_eq!(config.portal.password, "hunter2");
        // Unset portal fields keep their defaults
        assert_eq!(config.portal.user_type, "VISTA_USER");
        assert_eq!(config.portal.main_page, "ScreenMatePage.aspx");
        assert_eq!(config.portal.rooms.floor8, "{8B}");
        assert_eq!(
            config.control.set_state_policy,
            SetStatePolicy::AlwaysPost
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("server.toml");

        let mut config = Config::default();
        config.server.bind = "127.0.0.1:9090".to_string();
        config.storage.path = PathBuf::from("/tmp/devices.json");
        config.portal.rooms.floor5 = "r5".to_string();

        config.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();

        assert_eq!(loaded.server.bind, "127.0.0.1:9090");
        assert_eq!(loaded.storage.path, PathBuf::from("/tmp/devices.json"));
        assert_eq!(loaded.portal, config.portal);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/server.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not valid { toml").unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [control]
            set_state_policy = "sometimes"
        "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_default_config_path() {
        assert!(default_config_path().ends_with("twocold/server.toml"));
    }

    // ==========================================================================
    // Validation tests
    // ==========================================================================

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_server_bind_validation() {
        let bind = |s: &str| ServerConfig {
            bind: s.to_string(),
        };
        assert!(bind("127.0.0.1:8080").validate().is_empty());
        assert!(bind("[::1]:8080").validate().is_empty());
        assert!(bind("localhost:8080").validate().is_empty());

        let errors = bind("").validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("cannot be empty"));

        let errors = bind("127.0.0.1").validate();
        assert!(errors[0].message.contains("host:port"));

        let errors = bind("127.0.0.1:0").validate();
        assert!(errors[0].message.contains("cannot be 0"));

        let errors = bind("127.0.0.1:http").validate();
        assert!(errors[0].message.contains("must be a number"));
    }

    #[test]
    fn test_storage_path_validation() {
        let empty = StorageConfig {
            path: PathBuf::new(),
        };
        assert_eq!(empty.validate().len(), 1);
    }

    #[test]
    fn test_portal_validation() {
        let mut portal = PortalSettings::default();
        assert!(validate_portal(&portal).is_empty());

        portal.base_url = "portal.local".to_string();
        portal.username = " ".to_string();
        portal.timeout_secs = 0;
        portal.rooms.floor8 = portal.rooms.floor5.clone();

        let errors = validate_portal(&portal);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "portal.base_url",
                "portal.username",
                "portal.timeout_secs",
                "portal.rooms"
            ]
        );
    }

    #[test]
    fn test_security_validation() {
        let disabled = SecurityConfig::default();
        assert!(disabled.validate().is_empty());

        let missing = SecurityConfig {
            api_key_enabled: true,
            api_key: None,
        };
        assert!(missing.validate()[0].message.contains("required"));

        let short = SecurityConfig {
            api_key_enabled: true,
            api_key: Some("short".to_string()),
        };
        assert!(short.validate()[0].message.contains("at least 16"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let mut config = Config::default();
        config.server.bind = "nope".to_string();
        config.security.api_key_enabled = true;

        let error = config.validate().unwrap_err();
        let display = format!("{}", error);
        assert!(display.contains("server.bind"));
        assert!(display.contains("security.api_key"));
    }
}
