use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    /// Exposes real error messages for 5xx responses
    pub dev_mode: bool,
    pub server: ServerConfig,
    pub urls: UrlConfig,
    pub security: SecurityConfig,
    pub templates: TemplateConfig,
    pub i18n: I18nConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Honour `X-Forwarded-Proto` when deciding whether a request is secure.
    /// Only enable behind a reverse proxy that overwrites the header.
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlConfig {
    /// Base URL of the site, with or without trailing slash. When unset the
    /// request's Host header is used.
    pub site_url: Option<String>,
    pub script_name: String,
    /// Query parameter carrying the route when script names are shown
    pub path_param: String,
    pub omit_script_name_in_urls: bool,
    /// First path segment that selects the control panel
    pub cp_trigger: String,
    pub login_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Key for signed data (posted redirect targets)
    pub security_key: String,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub session_cookie: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub site_path: PathBuf,
    pub cp_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct I18nConfig {
    pub default_locale: String,
    /// Extra `<locale>.json` tables loaded on top of the bundled ones
    pub translations_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("Could not determine the site URL: {0} is not available")]
    MissingServerField(&'static str),
}

impl AppConfig {
    /// Load configuration from environment presets, an optional YAML file
    /// named by `BLOCKS_CONFIG`, and per-field environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let config = match env::var("BLOCKS_CONFIG") {
            Ok(path) => Self::from_yaml_file(Path::new(&path))?,
            Err(_) => Self::preset(environment),
        };

        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn preset(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    /// Read a full config from YAML. Every section must be present; use
    /// [`AppConfig::preset`] as a starting point when generating one.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("BLOCKS_DEV_MODE") {
            self.dev_mode = v.parse().unwrap_or(self.dev_mode);
        }

        // Server overrides
        if let Ok(v) = env::var("BLOCKS_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("BLOCKS_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("BLOCKS_TRUST_PROXY_HEADERS") {
            self.server.trust_proxy_headers = v.parse().unwrap_or(self.server.trust_proxy_headers);
        }

        // URL overrides
        if let Ok(v) = env::var("BLOCKS_SITE_URL") {
            self.urls.site_url = if v.trim().is_empty() { None } else { Some(v) };
        }
        if let Ok(v) = env::var("BLOCKS_SCRIPT_NAME") {
            self.urls.script_name = v;
        }
        if let Ok(v) = env::var("BLOCKS_OMIT_SCRIPT_NAME_IN_URLS") {
            self.urls.omit_script_name_in_urls = v.parse().unwrap_or(self.urls.omit_script_name_in_urls);
        }
        if let Ok(v) = env::var("BLOCKS_CP_TRIGGER") {
            self.urls.cp_trigger = v;
        }
        if let Ok(v) = env::var("BLOCKS_LOGIN_PATH") {
            self.urls.login_path = v;
        }

        // Security overrides
        if let Ok(v) = env::var("BLOCKS_SECURITY_KEY") {
            self.security.security_key = v;
        }
        if let Ok(v) = env::var("BLOCKS_JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("BLOCKS_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        // Template and translation overrides
        if let Ok(v) = env::var("BLOCKS_SITE_TEMPLATES") {
            self.templates.site_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("BLOCKS_CP_TEMPLATES") {
            self.templates.cp_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("BLOCKS_LOCALE") {
            self.i18n.default_locale = v;
        }
        if let Ok(v) = env::var("BLOCKS_TRANSLATIONS") {
            self.i18n.translations_path = Some(PathBuf::from(v));
        }

        self
    }

    /// Reject settings that would make signing or routing unsafe.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.urls.script_name.trim().is_empty() {
            return Err(ConfigError::MissingSetting("urls.script_name"));
        }
        if self.urls.cp_trigger.trim().trim_matches('/').is_empty() {
            return Err(ConfigError::MissingSetting("urls.cp_trigger"));
        }
        if let Some(site_url) = &self.urls.site_url {
            url::Url::parse(site_url).map_err(|e| ConfigError::InvalidSetting {
                name: "urls.site_url",
                reason: e.to_string(),
            })?;
        }

        if self.environment != Environment::Development {
            if self.security.security_key.is_empty() {
                return Err(ConfigError::MissingSetting("security.security_key"));
            }
            if self.security.jwt_secret.is_empty() {
                return Err(ConfigError::MissingSetting("security.jwt_secret"));
            }
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Copy with keys and secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mask = |s: &str| if s.is_empty() { String::new() } else { "********".to_string() };
        let mut copy = self.clone();
        copy.security.security_key = mask(&self.security.security_key);
        copy.security.jwt_secret = mask(&self.security.jwt_secret);
        copy
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            dev_mode: true,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                trust_proxy_headers: false,
            },
            urls: UrlConfig::default(),
            security: SecurityConfig {
                security_key: "dev-security-key".to_string(),
                jwt_secret: "dev-jwt-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                session_cookie: "blocks_session".to_string(),
            },
            templates: TemplateConfig::default(),
            i18n: I18nConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            dev_mode: false,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                trust_proxy_headers: false,
            },
            urls: UrlConfig::default(),
            security: SecurityConfig {
                security_key: String::new(),
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                session_cookie: "blocks_session".to_string(),
            },
            templates: TemplateConfig::default(),
            i18n: I18nConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            dev_mode: false,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                trust_proxy_headers: false,
            },
            urls: UrlConfig {
                omit_script_name_in_urls: true,
                ..UrlConfig::default()
            },
            security: SecurityConfig {
                security_key: String::new(),
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                session_cookie: "blocks_session".to_string(),
            },
            templates: TemplateConfig::default(),
            i18n: I18nConfig::default(),
        }
    }
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            site_url: None,
            script_name: "index.php".to_string(),
            path_param: "p".to_string(),
            omit_script_name_in_urls: false,
            cp_trigger: "admin".to_string(),
            login_path: "login".to_string(),
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            site_path: PathBuf::from("templates"),
            cp_path: PathBuf::from("cp/templates"),
        }
    }
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_locale: "en".to_string(),
            translations_path: None,
        }
    }
}
