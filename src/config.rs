use crate::error::{PossessionError, Result};
use crate::session::SessionConfig;
use crate::utils::{get_env_with_prefix, parse_bool};
use serde::{Deserialize, Serialize};

/// Main configuration for the possession engine and its HTTP surface
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PossessionConfig {
    /// Realm whose current principal must pass the admin capability check
    #[serde(default = "default_realm")]
    pub admin_realm: String,

    /// Realm the target is logged into when the caller does not name one
    #[serde(default = "default_realm")]
    pub default_realm: String,

    #[serde(default)]
    pub session_keys: SessionKeys,

    #[serde(default = "default_redirect")]
    pub redirect_after_possess: String,

    #[serde(default = "default_redirect")]
    pub redirect_after_unpossess: String,

    /// Where `forbid_during_possession` sends non-JSON requests
    #[serde(default = "default_redirect")]
    pub forbidden_redirect: String,

    #[serde(default)]
    pub routes: RoutesConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Session keys used to record an active impersonation.
///
/// Both keys, plus the derived [`SessionKeys::original_kind`], are written
/// and cleared together.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionKeys {
    #[serde(default = "default_original_key")]
    pub original_principal: String,

    #[serde(default = "default_realm_key")]
    pub impersonated_realm: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RoutesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path prefix the possess/leave routes are mounted under
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for PossessionConfig {
    fn default() -> Self {
        Self {
            admin_realm: default_realm(),
            default_realm: default_realm(),
            session_keys: SessionKeys::default(),
            redirect_after_possess: default_redirect(),
            redirect_after_unpossess: default_redirect(),
            forbidden_redirect: default_redirect(),
            routes: RoutesConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SessionKeys {
    /// Key holding the original principal's kind, stored next to its id.
    pub fn original_kind(&self) -> String {
        format!("{}.kind", self.original_principal)
    }
}

impl Default for SessionKeys {
    fn default() -> Self {
        Self {
            original_principal: default_original_key(),
            impersonated_realm: default_realm_key(),
        }
    }
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: default_prefix(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_realm() -> String {
    "web".to_string()
}

fn default_original_key() -> String {
    "possession.original_user_id".to_string()
}

fn default_realm_key() -> String {
    "possession.impersonated_guard".to_string()
}

fn default_redirect() -> String {
    "/".to_string()
}

fn default_prefix() -> String {
    "possession".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Builder for [`PossessionConfig`] with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: PossessionConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PossessionConfig::default(),
        }
    }

    /// Start from an existing configuration, e.g. one deserialized from a file.
    pub fn from_config(config: PossessionConfig) -> Self {
        Self { config }
    }

    pub fn with_admin_realm(mut self, realm: impl Into<String>) -> Self {
        self.config.admin_realm = realm.into();
        self
    }

    pub fn with_default_realm(mut self, realm: impl Into<String>) -> Self {
        self.config.default_realm = realm.into();
        self
    }

    pub fn with_original_principal_key(mut self, key: impl Into<String>) -> Self {
        self.config.session_keys.original_principal = key.into();
        self
    }

    pub fn with_impersonated_realm_key(mut self, key: impl Into<String>) -> Self {
        self.config.session_keys.impersonated_realm = key.into();
        self
    }

    pub fn with_redirect_after_possess(mut self, path: impl Into<String>) -> Self {
        self.config.redirect_after_possess = path.into();
        self
    }

    pub fn with_redirect_after_unpossess(mut self, path: impl Into<String>) -> Self {
        self.config.redirect_after_unpossess = path.into();
        self
    }

    pub fn with_forbidden_redirect(mut self, path: impl Into<String>) -> Self {
        self.config.forbidden_redirect = path.into();
        self
    }

    pub fn with_routes_enabled(mut self, enabled: bool) -> Self {
        self.config.routes.enabled = enabled;
        self
    }

    pub fn with_routes_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.routes.prefix = prefix.into();
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    /// Load configuration from environment variables with POSSESSION_ prefix
    pub fn from_env(mut self) -> Self {
        if let Some(realm) = get_env_with_prefix("ADMIN_REALM") {
            self.config.admin_realm = realm;
        }
        if let Some(realm) = get_env_with_prefix("DEFAULT_REALM") {
            self.config.default_realm = realm;
        }
        if let Some(key) = get_env_with_prefix("SESSION_KEY_ORIGINAL") {
            self.config.session_keys.original_principal = key;
        }
        if let Some(key) = get_env_with_prefix("SESSION_KEY_REALM") {
            self.config.session_keys.impersonated_realm = key;
        }
        if let Some(path) = get_env_with_prefix("REDIRECT_AFTER_POSSESS") {
            self.config.redirect_after_possess = path;
        }
        if let Some(path) = get_env_with_prefix("REDIRECT_AFTER_UNPOSSESS") {
            self.config.redirect_after_unpossess = path;
        }
        if let Some(path) = get_env_with_prefix("FORBIDDEN_REDIRECT") {
            self.config.forbidden_redirect = path;
        }
        if let Some(enabled) = get_env_with_prefix("ROUTES_ENABLED") {
            self.config.routes.enabled = parse_bool(&enabled).unwrap_or(true);
        }
        if let Some(prefix) = get_env_with_prefix("ROUTES_PREFIX") {
            self.config.routes.prefix = prefix;
        }
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = parse_bool(&json).unwrap_or(false);
        }

        self.config.session = SessionConfig::from_env();

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns [`PossessionError::Config`] if:
    /// - A realm name is empty
    /// - A session key is empty, or both session keys are the same
    /// - The log level is not one of trace, debug, info, warn, error
    /// - A redirect target does not start with `/`
    /// - The routes prefix is empty or contains `/`
    pub fn build(self) -> Result<PossessionConfig> {
        let config = self.config;

        if config.admin_realm.trim().is_empty() {
            return Err(PossessionError::config("Admin realm must not be empty"));
        }
        if config.default_realm.trim().is_empty() {
            return Err(PossessionError::config("Default realm must not be empty"));
        }

        let keys = &config.session_keys;
        if keys.original_principal.is_empty() || keys.impersonated_realm.is_empty() {
            return Err(PossessionError::config("Session keys must not be empty"));
        }
        if keys.original_principal == keys.impersonated_realm {
            return Err(PossessionError::config(format!(
                "Session keys must be distinct, both are '{}'",
                keys.original_principal
            )));
        }
        if keys.original_kind() == keys.impersonated_realm {
            return Err(PossessionError::config(format!(
                "Session key '{}' collides with the original kind key",
                keys.impersonated_realm
            )));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(PossessionError::config(format!(
                "Invalid log level: {}. Must be one of: {}",
                config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        for (name, path) in [
            ("redirect_after_possess", &config.redirect_after_possess),
            ("redirect_after_unpossess", &config.redirect_after_unpossess),
            ("forbidden_redirect", &config.forbidden_redirect),
        ] {
            if !path.starts_with('/') {
                return Err(PossessionError::config(format!(
                    "{name} must be an absolute path, got: {path}"
                )));
            }
        }

        if config.routes.prefix.is_empty() || config.routes.prefix.contains('/') {
            return Err(PossessionError::config(format!(
                "Routes prefix must be a single non-empty path segment, got: '{}'",
                config.routes.prefix
            )));
        }

        Ok(config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config.admin_realm, "web");
        assert_eq!(config.default_realm, "web");
        assert_eq!(
            config.session_keys.original_principal,
            "possession.original_user_id"
        );
        assert_eq!(
            config.session_keys.impersonated_realm,
            "possession.impersonated_guard"
        );
        assert!(config.routes.enabled);
        assert_eq!(config.routes.prefix, "possession");
    }

    #[test]
    fn test_builder_setters() {
        let config = ConfigBuilder::new()
            .with_admin_realm("admin")
            .with_default_realm("customer")
            .with_redirect_after_possess("/dashboard")
            .with_redirect_after_unpossess("/admin")
            .with_routes_prefix("impersonate")
            .build()
            .unwrap();

        assert_eq!(config.admin_realm, "admin");
        assert_eq!(config.default_realm, "customer");
        assert_eq!(config.redirect_after_possess, "/dashboard");
        assert_eq!(config.redirect_after_unpossess, "/admin");
        assert_eq!(config.routes.prefix, "impersonate");
    }

    #[test]
    fn test_rejects_identical_session_keys() {
        let err = ConfigBuilder::new()
            .with_original_principal_key("same")
            .with_impersonated_realm_key("same")
            .build()
            .unwrap_err();
        assert!(matches!(err, PossessionError::Config(_)));
    }

    #[test]
    fn test_rejects_realm_key_shadowing_kind_key() {
        let err = ConfigBuilder::new()
            .with_original_principal_key("orig")
            .with_impersonated_realm_key("orig.kind")
            .build()
            .unwrap_err();
        assert!(matches!(err, PossessionError::Config(_)));
    }

    #[test]
    fn test_rejects_empty_realm() {
        assert!(ConfigBuilder::new().with_admin_realm(" ").build().is_err());
        assert!(ConfigBuilder::new().with_default_realm("").build().is_err());
    }

    #[test]
    fn test_rejects_invalid_log_level() {
        assert!(ConfigBuilder::new().with_log_level("loud").build().is_err());
    }

    #[test]
    fn test_rejects_relative_redirect() {
        assert!(
            ConfigBuilder::new()
                .with_forbidden_redirect("https://evil.example")
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_rejects_bad_prefix() {
        assert!(ConfigBuilder::new().with_routes_prefix("").build().is_err());
        assert!(ConfigBuilder::new().with_routes_prefix("a/b").build().is_err());
    }

    #[test]
    fn test_from_env() {
        unsafe {
            std::env::set_var("POSSESSION_ADMIN_REALM", "backoffice");
            std::env::set_var("POSSESSION_ROUTES_ENABLED", "false");
        }

        let config = ConfigBuilder::new().from_env().build().unwrap();
        assert_eq!(config.admin_realm, "backoffice");
        assert!(!config.routes.enabled);

        unsafe {
            std::env::remove_var("POSSESSION_ADMIN_REALM");
            std::env::remove_var("POSSESSION_ROUTES_ENABLED");
        }
    }

    #[test]
    fn test_deserialize_partial() {
        let config: PossessionConfig = serde_json::from_str(
            r#"{"admin_realm": "admin", "session_keys": {"original_principal": "orig"}}"#,
        )
        .unwrap();
        assert_eq!(config.admin_realm, "admin");
        assert_eq!(config.default_realm, "web");
        assert_eq!(config.session_keys.original_principal, "orig");
        assert_eq!(
            config.session_keys.impersonated_realm,
            "possession.impersonated_guard"
        );
    }
}
