use crate::models::{KeyScheme, ProviderKind};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BridgeSettings {
    pub application: ApplicationSettings,
    pub provider: ProviderSettings,
    pub firebase: FirebaseSettings,
    pub identity: IdentitySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    /// Overrides the provider's built-in profile endpoint
    pub profile_endpoint: Option<String>,
    /// Overrides the provider's default key scheme
    pub key_scheme: Option<KeyScheme>,
    /// Photo stored for providers that do not report one (LINE)
    pub default_photo_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseSettings {
    pub project_id: Option<String>,

    // Direct value (can be overridden by environment variable)
    pub service_account_path: Option<String>,
    // Environment variable name for override
    pub service_account_path_env: Option<String>,

    pub identity_toolkit_url: String,
    pub token_uri: String,
    /// Lifetime of minted custom tokens; Firebase rejects anything above one hour
    pub custom_token_lifetime_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityBackend {
    Firebase,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    pub backend: IdentityBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

pub const DEFAULT_LINE_PHOTO_URL: &str =
    "https://www.kindpng.com/picc/m/78-785827_user-profile-avatar-login-account-male-user-icon.png";

/// Upper bound Firebase accepts for custom token lifetimes
pub const MAX_CUSTOM_TOKEN_LIFETIME_SECS: u64 = 3600;

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: "http://localhost:3000,http://localhost:8080".to_string(),
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Kakao,
            profile_endpoint: None,
            key_scheme: None,
            default_photo_url: DEFAULT_LINE_PHOTO_URL.to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl Default for FirebaseSettings {
    fn default() -> Self {
        Self {
            project_id: None,
            service_account_path: None,
            service_account_path_env: Some("GOOGLE_APPLICATION_CREDENTIALS".to_string()),
            identity_toolkit_url: "https://identitytoolkit.googleapis.com".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            custom_token_lifetime_secs: MAX_CUSTOM_TOKEN_LIFETIME_SECS,
        }
    }
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            backend: IdentityBackend::Firebase,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    /// Logger configured from `level`, which takes `RUST_LOG` filter syntax
    #[must_use]
    pub fn logger_builder(&self) -> env_logger::Builder {
        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&self.level);
        builder
    }
}

impl BridgeSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Logger initialization fails
    /// - Settings file cannot be read or parsed
    /// - TOML parsing fails
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_file();

        let mut settings = Self::load_base_settings()?;

        Self::apply_env_overrides(&mut settings);

        settings.logging.logger_builder().try_init()?;

        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `BRIDGE_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(&default_config_path)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(secrets_dir) = std::env::var("BRIDGE_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
                println!("✓ Overriding settings from {}", secrets_path.display());
            } else {
                println!(
                    "ℹ BRIDGE_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a single TOML settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid settings TOML
    pub fn from_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let toml_content = fs::read_to_string(path)?;
        Ok(basic_toml::from_str(&toml_content)?)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_provider_env_overrides(&mut settings.provider);
        Self::apply_firebase_env_overrides(&mut settings.firebase);
        Self::apply_identity_env_overrides(&mut settings.identity);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        if let Ok(cors_origins) = std::env::var("CORS_ORIGINS") {
            app_settings.cors_origins = cors_origins;
        }
    }

    /// Apply environment overrides for provider settings
    pub fn apply_provider_env_overrides(provider_settings: &mut ProviderSettings) {
        if let Ok(kind_str) = std::env::var("BRIDGE_PROVIDER") {
            match kind_str.parse::<ProviderKind>() {
                Ok(kind) => provider_settings.kind = kind,
                Err(e) => log::warn!("Ignoring BRIDGE_PROVIDER: {e}"),
            }
        }
        if let Ok(endpoint) = std::env::var("PROFILE_ENDPOINT") {
            if !endpoint.is_empty() {
                provider_settings.profile_endpoint = Some(endpoint);
            }
        }
        if let Ok(scheme_str) = std::env::var("KEY_SCHEME") {
            match scheme_str.parse::<KeyScheme>() {
                Ok(scheme) => provider_settings.key_scheme = Some(scheme),
                Err(e) => log::warn!("Ignoring KEY_SCHEME: {e}"),
            }
        }
        if let Ok(timeout_str) = std::env::var("PROFILE_REQUEST_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout_str.parse::<u64>() {
                provider_settings.request_timeout_secs = timeout;
            }
        }
    }

    fn apply_firebase_env_overrides(firebase_settings: &mut FirebaseSettings) {
        if let Ok(project_id) = std::env::var("FIREBASE_PROJECT_ID") {
            if !project_id.is_empty() {
                firebase_settings.project_id = Some(project_id);
            }
        }
    }

    fn apply_identity_env_overrides(identity_settings: &mut IdentitySettings) {
        if let Ok(backend) = std::env::var("IDENTITY_BACKEND") {
            match backend.trim().to_ascii_lowercase().as_str() {
                "firebase" => identity_settings.backend = IdentityBackend::Firebase,
                "memory" => identity_settings.backend = IdentityBackend::Memory,
                other => log::warn!("Ignoring unknown IDENTITY_BACKEND: {other}"),
            }
        }
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                if line.trim_start().starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Get CORS origins as a vector of strings
    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl ProviderSettings {
    /// Effective key scheme: configured value, else the provider default.
    /// Only Kakao may use suffixed keys; other providers always resolve deterministically.
    #[must_use]
    pub fn effective_key_scheme(&self) -> KeyScheme {
        match (self.kind, self.key_scheme) {
            (ProviderKind::Kakao, Some(scheme)) => scheme,
            (kind, _) => kind.default_key_scheme(),
        }
    }

    /// Effective profile endpoint: configured override, else the provider's built-in one
    #[must_use]
    pub fn effective_profile_endpoint(&self) -> Option<String> {
        self.profile_endpoint
            .clone()
            .or_else(|| self.kind.default_profile_endpoint().map(ToString::to_string))
    }
}

impl FirebaseSettings {
    /// Get the service account path, checking environment variable first, then falling back to direct value
    #[must_use]
    pub fn get_service_account_path(&self) -> Option<String> {
        if let Some(env_var) = &self.service_account_path_env {
            if let Ok(value) = std::env::var(env_var) {
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }
        self.service_account_path.clone()
    }

    /// Custom token lifetime clamped to what Firebase accepts
    #[must_use]
    pub fn effective_token_lifetime_secs(&self) -> u64 {
        self.custom_token_lifetime_secs
            .clamp(1, MAX_CUSTOM_TOKEN_LIFETIME_SECS)
    }
}
