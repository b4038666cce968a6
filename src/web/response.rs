// web/response.rs - Response descriptor returned by actions
//
// An action's outcome is data plus a format tag. Serialization happens only
// when the descriptor is turned into an HTTP response.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ApiError;

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=UTF-8";
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
pub const JSONP_CONTENT_TYPE: &str = "application/javascript; charset=UTF-8";

/// Callback used for JSONP responses that don't name one
pub const DEFAULT_JSONP_CALLBACK: &str = "callback";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Body passed through as is
    Raw,
    Json,
    JsonP,
}

#[derive(Debug, Clone)]
pub struct ActionResponse {
    pub format: ResponseFormat,
    pub data: Value,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub jsonp_callback: Option<String>,
}

impl ActionResponse {
    pub fn new(format: ResponseFormat, data: Value) -> Self {
        Self {
            format,
            data,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            jsonp_callback: None,
        }
    }

    /// Empty response carrying a Location header
    pub fn redirect(location: &str, status: StatusCode) -> Result<Self, ApiError> {
        if !location.is_ascii() {
            return Err(ApiError::bad_request(format!(
                "Redirect URL must be percent-encoded: {}",
                location
            )));
        }
        let value = HeaderValue::from_str(location)
            .map_err(|_| ApiError::bad_request(format!("Invalid redirect URL: {}", location)))?;
        Ok(Self::new(ResponseFormat::Raw, Value::Null)
            .with_status(status)
            .with_header(header::LOCATION, value))
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.jsonp_callback = Some(callback.into());
        self
    }

    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn location(&self) -> Option<&str> {
        self.header(header::LOCATION)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE)
    }

    /// Add headers from `pending` that this response doesn't set itself
    pub fn merge_missing_headers(&mut self, pending: &HeaderMap) {
        for name in pending.keys() {
            if self.headers.contains_key(name) {
                continue;
            }
            for value in pending.get_all(name) {
                self.headers.append(name.clone(), value.clone());
            }
        }
    }

    /// Serialized body and the content type it implies
    pub fn body(&self) -> (String, &'static str) {
        match self.format {
            ResponseFormat::Raw => {
                let body = match &self.data {
                    Value::Null => String::new(),
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (body, HTML_CONTENT_TYPE)
            }
            ResponseFormat::Json => (self.data.to_string(), JSON_CONTENT_TYPE),
            ResponseFormat::JsonP => {
                let callback = self.jsonp_callback.as_deref().unwrap_or(DEFAULT_JSONP_CALLBACK);
                (format!("{}({});", callback, self.data), JSONP_CONTENT_TYPE)
            }
        }
    }
}

pub fn as_json(data: Value) -> ActionResponse {
    ActionResponse::new(ResponseFormat::Json, data)
}

pub fn as_json_p(data: Value) -> ActionResponse {
    ActionResponse::new(ResponseFormat::JsonP, data)
}

pub fn as_raw(data: Value) -> ActionResponse {
    ActionResponse::new(ResponseFormat::Raw, data)
}

pub fn as_error_json(message: impl Into<String>) -> ActionResponse {
    as_json(json!({ "error": message.into() }))
}

/// JavaScript identifier path such as `handle` or `app.callbacks.done`
pub fn is_valid_jsonp_callback(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        })
}

impl IntoResponse for ActionResponse {
    fn into_response(self) -> Response {
        let (body, default_content_type) = self.body();

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        if !response.headers().contains_key(header::CONTENT_TYPE) {
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(default_content_type),
            );
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_keep_payload_and_tag_format() {
        let data = json!({"test": "test"});

        let r = as_json_p(data.clone());
        assert_eq!(r.format, ResponseFormat::JsonP);
        assert_eq!(r.data, data);

        let r = as_raw(data.clone());
        assert_eq!(r.format, ResponseFormat::Raw);
        assert_eq!(r.data, data);

        let r = as_error_json("im an error");
        assert_eq!(r.format, ResponseFormat::Json);
        assert_eq!(r.data, json!({"error": "im an error"}));
        assert_eq!(r.status, StatusCode::OK);
    }

    #[test]
    fn bodies_follow_format() {
        assert_eq!(as_raw(json!("<p>hi</p>")).body(), ("<p>hi</p>".to_string(), HTML_CONTENT_TYPE));
        assert_eq!(as_raw(Value::Null).body().0, "");
        assert_eq!(as_json(json!({"a": 1})).body(), (r#"{"a":1}"#.to_string(), JSON_CONTENT_TYPE));
        assert_eq!(as_json_p(json!([1])).body().0, "callback([1]);");
        assert_eq!(as_json_p(json!([1])).with_callback("app.done").body().0, "app.done([1]);");
    }

    #[test]
    fn redirect_locations_must_be_ascii() {
        let r = ActionResponse::redirect("http://a.test/?p=caf%C3%A9", StatusCode::FOUND).unwrap();
        assert_eq!(r.location(), Some("http://a.test/?p=caf%C3%A9"));
        assert!(ActionResponse::redirect("http://a.test/?p=café", StatusCode::FOUND).is_err());
    }

    #[test]
    fn explicit_content_type_survives_serialization() {
        let r = as_json(json!({})).with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let response = r.into_response();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");

        let response = as_json(json!({})).into_response();
        assert_eq!(response.headers()[header::CONTENT_TYPE], JSON_CONTENT_TYPE);
    }

    #[test]
    fn merge_keeps_own_headers() {
        let mut pending = HeaderMap::new();
        pending.insert(header::CONTENT_TYPE, HeaderValue::from_static("HEADERS"));
        pending.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        pending.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));

        let mut r = as_json(json!({})).with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        r.merge_missing_headers(&pending);
        assert_eq!(r.content_type(), Some("text/plain"));
        assert_eq!(r.headers.get_all(header::SET_COOKIE).iter().count(), 2);
    }

    #[test]
    fn redirect_rejects_unencodable_locations() {
        let r = ActionResponse::redirect("https://example.com", StatusCode::FOUND).unwrap();
        assert_eq!(r.location(), Some("https://example.com"));
        assert!(ActionResponse::redirect("bad\nurl", StatusCode::FOUND).is_err());
    }

    #[test]
    fn jsonp_callback_validation() {
        assert!(is_valid_jsonp_callback("handle"));
        assert!(is_valid_jsonp_callback("$.app_1.done"));
        assert!(!is_valid_jsonp_callback(""));
        assert!(!is_valid_jsonp_callback("alert(1)"));
        assert!(!is_valid_jsonp_callback("a..b"));
        assert!(!is_valid_jsonp_callback("1abc"));
    }
}
