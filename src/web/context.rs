// web/context.rs - Per-request state handed to every action
//
// Replaces "the current request/response/app" globals: each action receives
// the request data, the caller's identity, pending response headers and a
// handle to the shared read-only services.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::Identity;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::i18n::Translator;
use crate::security::{HmacSigner, Signer};
use crate::templates::{TemplateMode, Templates};

/// Shared, read-only collaborators built once at startup
pub struct AppServices {
    pub config: AppConfig,
    pub signer: Arc<dyn Signer>,
    pub templates: Templates,
    pub translator: Translator,
}

impl AppServices {
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let signer = HmacSigner::new(&config.security.security_key)
            .map_err(|e| anyhow::anyhow!("Invalid security key: {}", e))?;

        let mut translator = Translator::bundled(config.i18n.default_locale.clone())?;
        if let Some(dir) = &config.i18n.translations_path {
            let loaded = translator.load_dir(dir)?;
            tracing::info!("Loaded {} translation tables from {}", loaded, dir.display());
        }

        let templates = Templates::new(&config.templates.site_path, &config.templates.cp_path);

        Ok(Self {
            config,
            signer: Arc::new(signer),
            templates,
            translator,
        })
    }
}

impl std::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppServices")
            .field("environment", &self.config.environment)
            .field("templates", &self.templates)
            .field("locales", &self.translator.locales())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub query: HashMap<String, String>,
    pub body_params: Map<String, Value>,
    /// Values bound by routing, e.g. the template name of a page request
    pub route_params: HashMap<String, String>,
    pub identity: Option<Identity>,
    pub template_mode: TemplateMode,
    pub locale: String,
    /// Whether the request arrived over TLS (directly or via a proxy)
    pub secure: bool,
    /// Headers set before the action produced its response
    pub response_headers: HeaderMap,
    pub services: Arc<AppServices>,
}

impl RequestContext {
    pub fn new(services: Arc<AppServices>, method: Method, path: impl Into<String>) -> Self {
        let locale = services.translator.default_locale().to_string();
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: HashMap::new(),
            body_params: Map::new(),
            route_params: HashMap::new(),
            identity: None,
            template_mode: TemplateMode::Site,
            locale,
            secure: false,
            response_headers: HeaderMap::new(),
            services,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.services.config
    }

    /// Set a request header; invalid names or values are ignored
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::from_str(value)) {
            self.headers.insert(name, value);
        }
    }

    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Media types listed in the Accept header, without parameters
    pub fn acceptable_content_types(&self) -> Vec<String> {
        self.headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .filter_map(|part| {
                let media = part.split(';').next()?.trim().to_ascii_lowercase();
                (!media.is_empty()).then_some(media)
            })
            .collect()
    }

    /// `application/json` or any other `*/json` media type was accepted
    pub fn accepts_json(&self) -> bool {
        self.acceptable_content_types()
            .iter()
            .any(|t| t.ends_with("/json"))
    }

    pub fn is_post(&self) -> bool {
        self.method == Method::POST
    }

    pub fn is_cp_request(&self) -> bool {
        self.template_mode == TemplateMode::Cp
    }

    pub fn is_guest(&self) -> bool {
        self.identity.is_none()
    }

    /// String body parameter
    pub fn body_param(&self, name: &str) -> Option<&str> {
        self.body_params.get(name).and_then(Value::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Route parameter, then body parameter, then query parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.route_params
            .get(name)
            .map(String::as_str)
            .or_else(|| self.body_param(name))
            .or_else(|| self.query_param(name))
    }

    pub fn required_param(&self, name: &str) -> Result<&str, ApiError> {
        self.param(name)
            .ok_or_else(|| ApiError::bad_request(format!("Request missing required param: {}", name)))
    }

    /// Translate a message into the request locale
    pub fn t(&self, message: &str, params: &[(&str, &str)]) -> String {
        self.services.translator.translate(&self.locale, message, params)
    }

    /// Parse a request body into `body_params` according to its content type
    pub fn parse_body(&mut self, body: &[u8]) -> Result<(), ApiError> {
        if body.is_empty() {
            return Ok(());
        }

        let content_type = self
            .header(header::CONTENT_TYPE)
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            match serde_json::from_slice::<Value>(body) {
                Ok(Value::Object(map)) => self.body_params = map,
                Ok(_) => return Err(ApiError::bad_request("Request body must be a JSON object")),
                Err(e) => return Err(ApiError::bad_request(format!("Invalid JSON body: {}", e))),
            }
        } else {
            self.body_params = url::form_urlencoded::parse(body)
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect();
        }
        Ok(())
    }

    pub fn set_query_string(&mut self, query: Option<&str>) {
        self.query = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, Environment};

    fn ctx() -> RequestContext {
        let services = AppServices::from_config(AppConfig::preset(Environment::Development)).unwrap();
        RequestContext::new(Arc::new(services), Method::GET, "/")
    }

    #[test]
    fn accept_header_is_parsed() {
        let mut ctx = ctx();
        assert!(!ctx.accepts_json());
        ctx.set_header("Accept", "text/html, Application/JSON;q=0.9");
        assert_eq!(ctx.acceptable_content_types(), vec!["text/html", "application/json"]);
        assert!(ctx.accepts_json());

        ctx.set_header("Accept", "text/json");
        assert!(ctx.accepts_json());
        ctx.set_header("Accept", "application/jsonp");
        assert!(!ctx.accepts_json());
    }

    #[test]
    fn params_prefer_route_then_body_then_query() {
        let mut ctx = ctx();
        ctx.set_query_string(Some("a=query&b=query&c=query"));
        ctx.body_params.insert("b".into(), Value::String("body".into()));
        ctx.body_params.insert("a".into(), Value::String("body".into()));
        ctx.route_params.insert("a".into(), "route".into());

        assert_eq!(ctx.param("a"), Some("route"));
        assert_eq!(ctx.param("b"), Some("body"));
        assert_eq!(ctx.param("c"), Some("query"));
        assert!(ctx.required_param("d").is_err());
    }

    #[test]
    fn form_and_json_bodies_are_parsed() {
        let mut ctx = ctx();
        ctx.parse_body(b"redirect=abc%2Fdef&x=1").unwrap();
        assert_eq!(ctx.body_param("redirect"), Some("abc/def"));

        let mut ctx = self::ctx();
        ctx.set_header("Content-Type", "application/json");
        ctx.parse_body(br#"{"redirect": "x", "n": 1}"#).unwrap();
        assert_eq!(ctx.body_param("redirect"), Some("x"));
        assert_eq!(ctx.body_param("n"), None);

        assert!(ctx.parse_body(b"[1]").is_err());
        assert!(ctx.parse_body(b"{nope").is_err());
    }
}
