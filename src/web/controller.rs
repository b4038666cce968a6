// web/controller.rs - Controllers, the anonymous-access gate and action helpers
//
// A controller is a table of named actions plus the set of actions that may
// run without a signed-in user. `run_action` never fails: unknown actions and
// handler errors become error responses shaped for what the client accepts.

use axum::http::{header, HeaderValue, StatusCode};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::error::ApiError;
use crate::i18n;
use crate::templates::{escape_html, TemplateMode};
use crate::web::context::RequestContext;
use crate::web::response::{as_error_json, as_raw, ActionResponse, HTML_CONTENT_TYPE};
use crate::web::url;

pub type ActionHandler = Arc<dyn Fn(&mut RequestContext) -> Result<ActionResponse, ApiError> + Send + Sync>;

/// Result of the pre-dispatch hook
#[derive(Debug)]
pub enum GateOutcome {
    Continue,
    /// Stop the request and send this response instead of running the action
    Terminate(ActionResponse),
}

impl GateOutcome {
    pub fn is_continue(&self) -> bool {
        matches!(self, GateOutcome::Continue)
    }
}

pub struct Controller {
    id: String,
    actions: HashMap<String, ActionHandler>,
    allow_anonymous: HashSet<String>,
}

impl Controller {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            actions: HashMap::new(),
            allow_anonymous: HashSet::new(),
        }
    }

    /// Register an action handler
    pub fn action<F>(mut self, id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Result<ActionResponse, ApiError> + Send + Sync + 'static,
    {
        self.actions.insert(id.into(), Arc::new(handler));
        self
    }

    /// Mark actions as runnable without a signed-in user
    pub fn allow_anonymous<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_anonymous.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn has_action(&self, action_id: &str) -> bool {
        self.actions.contains_key(action_id)
    }

    /// Registered action ids, sorted
    pub fn action_ids(&self) -> Vec<&str> {
        let ids: BTreeSet<&str> = self.actions.keys().map(String::as_str).collect();
        ids.into_iter().collect()
    }

    pub fn is_anonymous_allowed(&self, action_id: &str) -> bool {
        self.allow_anonymous.contains(action_id)
    }

    /// Decide whether an action may run for this request
    pub fn before_action(&self, action_id: &str, ctx: &RequestContext) -> GateOutcome {
        if self.is_anonymous_allowed(action_id) || !ctx.is_guest() {
            return GateOutcome::Continue;
        }

        tracing::debug!("Guest request for {}/{} requires login", self.id, action_id);
        GateOutcome::Terminate(login_required(ctx))
    }

    pub fn run_action(&self, action_id: &str, ctx: &mut RequestContext) -> ActionResponse {
        let Some(handler) = self.actions.get(action_id).cloned() else {
            let err = ApiError::not_found(format!(
                "Unable to resolve the request \"{}/{}\".",
                self.id, action_id
            ));
            return finalize(ctx, error_response(ctx, &err));
        };

        if let GateOutcome::Terminate(response) = self.before_action(action_id, ctx) {
            return finalize(ctx, response);
        }

        let response = match handler(ctx) {
            Ok(response) => response,
            Err(err) => error_response(ctx, &err),
        };
        finalize(ctx, response)
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("id", &self.id)
            .field("actions", &self.action_ids())
            .field("allow_anonymous", &self.allow_anonymous)
            .finish()
    }
}

fn finalize(ctx: &RequestContext, mut response: ActionResponse) -> ActionResponse {
    response.merge_missing_headers(&ctx.response_headers);
    response
}

/// Response for a guest hitting a protected action: a redirect to the login
/// page, or a 403 JSON error for clients that want JSON
pub fn login_required(ctx: &RequestContext) -> ActionResponse {
    if ctx.accepts_json() {
        return as_error_json(ctx.t("Login is required.", &[])).with_status(StatusCode::FORBIDDEN);
    }

    let login_path = ctx.config().urls.login_path.clone();
    match redirect(ctx, Some(&login_path), StatusCode::FOUND) {
        Ok(response) => response,
        Err(err) => error_response(ctx, &err),
    }
}

/// Shape an error for the client. JSON clients get `{"error": message}`;
/// everyone else gets an HTML page, from the `<status>` template of the
/// request's template mode when one exists.
pub fn error_response(ctx: &RequestContext, err: &ApiError) -> ActionResponse {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!("{} {}: {}", ctx.method, ctx.path, err);
    } else {
        tracing::debug!("{} {}: {}", ctx.method, ctx.path, err);
    }

    let message = ctx.t(err.public_message(ctx.config().dev_mode), &[]);
    if ctx.accepts_json() {
        return as_error_json(message).with_status(status);
    }

    let status_template = status.as_u16().to_string();
    let vars = json!({ "message": message, "statusCode": status.as_u16() });
    let services = ctx.services.clone();
    let rendered = services
        .templates
        .render(ctx.template_mode, &status_template, &vars, |m| ctx.t(m, &[]));

    let body = match rendered {
        Ok(body) => body,
        Err(_) => {
            let title = if status == StatusCode::NOT_FOUND {
                ctx.t("Page Not Found", &[])
            } else {
                status.canonical_reason().unwrap_or("Error").to_string()
            };
            format!(
                "<!DOCTYPE html>\n<html><head><title>{title}</title></head>\
                 <body><h1>{title}</h1><p>{message}</p></body></html>\n",
                title = escape_html(&title),
                message = escape_html(&message)
            )
        }
    };

    as_raw(Value::String(body))
        .with_status(status)
        .with_header(header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE))
}

pub fn require_login(ctx: &RequestContext) -> Result<(), ApiError> {
    if ctx.is_guest() {
        return Err(ApiError::unauthorized(ctx.t("Login is required.", &[])));
    }
    Ok(())
}

pub fn require_admin(ctx: &RequestContext) -> Result<(), ApiError> {
    require_login(ctx)?;
    match &ctx.identity {
        Some(identity) if identity.admin => Ok(()),
        _ => Err(ApiError::forbidden("User is not permitted to perform this action.")),
    }
}

pub fn require_permission(ctx: &RequestContext, permission: &str) -> Result<(), ApiError> {
    require_login(ctx)?;
    match &ctx.identity {
        Some(identity) if identity.can(permission) => Ok(()),
        _ => {
            tracing::debug!("Permission '{}' denied", permission);
            Err(ApiError::forbidden("User is not permitted to perform this action."))
        }
    }
}

pub fn require_post_request(ctx: &RequestContext) -> Result<(), ApiError> {
    if !ctx.is_post() {
        return Err(ApiError::method_not_allowed("Post request required"));
    }
    Ok(())
}

pub fn require_accepts_json(ctx: &RequestContext) -> Result<(), ApiError> {
    if !ctx.accepts_json() {
        return Err(ApiError::bad_request("Request must accept JSON in response"));
    }
    Ok(())
}

/// Render a template in the request's template mode. A content type set
/// earlier in the request is kept; otherwise HTML is assumed.
pub fn render_template(ctx: &RequestContext, name: &str, vars: &Value) -> Result<ActionResponse, ApiError> {
    let services = ctx.services.clone();
    let html = services
        .templates
        .render(ctx.template_mode, name, vars, |m| ctx.t(m, &[]))?;

    let mut response = as_raw(Value::String(html));
    response.headers = ctx.response_headers.clone();
    if !response.headers.contains_key(header::CONTENT_TYPE) {
        response
            .headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
    }
    Ok(response)
}

/// Redirect to `url`: `None` goes home, full URLs pass through, anything
/// else is treated as a site path
pub fn redirect(ctx: &RequestContext, target: Option<&str>, status: StatusCode) -> Result<ActionResponse, ApiError> {
    let location = match target {
        Some(target) => url::url(ctx, target, &[])?,
        None => url::home_url(ctx),
    };
    tracing::debug!("Redirecting ({}) to {}", status.as_u16(), location);
    ActionResponse::redirect(&location, status)
}

/// Redirect to the signed `redirect` body param, then `default`, then the
/// site base URL. Tokens that fail verification are skipped. With `object`,
/// `{field}` tokens in the chosen URL are filled from it.
pub fn redirect_to_posted_url(
    ctx: &RequestContext,
    object: Option<&Value>,
    default: Option<&str>,
) -> Result<ActionResponse, ApiError> {
    let posted = ctx.body_param("redirect").and_then(|token| {
        let verified = ctx.services.signer.validate_data(token);
        if verified.is_none() {
            tracing::debug!("Ignoring posted redirect that failed verification");
        }
        verified
    });

    let target = posted.or_else(|| default.map(str::to_string)).unwrap_or_default();
    let target = match object {
        Some(object) => render_object_template(&target, object),
        None => target,
    };

    redirect(ctx, Some(&target), StatusCode::FOUND)
}

/// Fill `{field}` tokens from an object's top-level fields
pub fn render_object_template(template: &str, object: &Value) -> String {
    let names = i18n::placeholders(template);
    let values: Vec<(String, String)> = names
        .into_iter()
        .filter_map(|name| {
            let value = match object.get(&name)? {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            Some((name, value))
        })
        .collect();
    let params: Vec<(&str, &str)> = values.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    i18n::interpolate(template, &params)
}
