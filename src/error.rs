// HTTP API Error Types
use axum::http::StatusCode;

/// Errors raised while handling an action, with the status code they map to
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 405 Method Not Allowed
    MethodNotAllowed(String),

    // 500 Internal Server Error (misconfiguration: missing site URL, bad paths)
    Config(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::MethodNotAllowed(msg) => msg,
            ApiError::Config(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Message safe to show a client. Server-side failures are masked unless
    /// `dev_mode` is on.
    pub fn public_message(&self, dev_mode: bool) -> &str {
        if dev_mode || !self.status_code().is_server_error() {
            self.message()
        } else {
            "A server error occurred."
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        ApiError::MethodNotAllowed(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        ApiError::Config(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

// Convert other error types to ApiError
impl From<crate::config::ConfigError> for ApiError {
    fn from(err: crate::config::ConfigError) -> Self {
        tracing::error!("Configuration error: {}", err);
        ApiError::config(err.to_string())
    }
}

impl From<crate::templates::TemplateError> for ApiError {
    fn from(err: crate::templates::TemplateError) -> Self {
        use crate::templates::TemplateError;
        match err {
            TemplateError::NotFound(name) => ApiError::not_found(format!("Template not found: {}", name)),
            TemplateError::InvalidName(msg) => ApiError::bad_request(msg),
            TemplateError::Io { name, source } => {
                tracing::error!("Failed to read template '{}': {}", name, source);
                ApiError::internal_server_error(format!("Failed to read template '{}'", name))
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}
