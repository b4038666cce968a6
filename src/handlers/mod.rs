// handlers/mod.rs - HTTP entry points
//
// Every request is turned into a RequestContext and handed to the
// dispatcher. Routes:
//
//   /health                          liveness probe
//   /actions/:controller/:action     controller actions
//   everything else                  front controller: `?p=` routes,
//                                    `/{cp_trigger}/...` CP pages, site pages

pub mod controllers;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, Method, Uri},
    response::{IntoResponse, Json, Response},
    routing::get,
    Extension, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::Identity;
use crate::config::AppConfig;
use crate::middleware::identity_middleware;
use crate::templates::TemplateMode;
use crate::web::controller::error_response;
use crate::web::{AppServices, Dispatcher, RequestContext};

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<AppServices>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// State with the built-in controllers registered
    pub fn new(services: AppServices) -> Self {
        Self::with_dispatcher(services, controllers::dispatcher())
    }

    pub fn with_dispatcher(services: AppServices, dispatcher: Dispatcher) -> Self {
        Self {
            services: Arc::new(services),
            dispatcher: Arc::new(dispatcher),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/actions/:controller/:action", get(action).post(action))
        .fallback(front_controller)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(axum::middleware::from_fn_with_state(state.clone(), identity_middleware)),
        )
        .with_state(state)
}

/// Bind the configured address and serve until the process is stopped
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr();
    tracing::info!("Starting blocks-web in {:?} mode", config.environment);

    let state = AppState::new(AppServices::from_config(config)?);
    tracing::debug!("Registered routes: {:?}", state.dispatcher.routes());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Where a front-controller request goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Action { mode: TemplateMode, route: String },
    Template { mode: TemplateMode, name: String },
}

/// Map a request path (or its `?p=` param) to an action or a template
pub fn resolve_route(ctx: &RequestContext) -> Route {
    let urls = &ctx.config().urls;

    let mut path = ctx.path.trim_matches('/');
    if path.is_empty() || path == urls.script_name.trim_matches('/') {
        path = ctx.query_param(&urls.path_param).unwrap_or_default().trim_matches('/');
    }

    let trigger = urls.cp_trigger.trim_matches('/');
    let (mode, rest) = match strip_segment(path, trigger) {
        Some(rest) => (TemplateMode::Cp, rest),
        None => (TemplateMode::Site, path),
    };

    match strip_segment(rest, "actions") {
        Some(route) => Route::Action {
            mode,
            route: route.to_string(),
        },
        None => Route::Template {
            mode,
            name: rest.to_string(),
        },
    }
}

/// `prefix/rest` -> `rest`, `prefix` -> ``
fn strip_segment<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if path == prefix {
        return Some("");
    }
    path.strip_prefix(prefix)?.strip_prefix('/')
}

fn build_context(
    state: &AppState,
    method: Method,
    uri: &Uri,
    headers: HeaderMap,
    identity: Option<Identity>,
) -> RequestContext {
    let mut ctx = RequestContext::new(state.services.clone(), method, uri.path());
    ctx.set_query_string(uri.query());
    ctx.secure = is_secure(uri, &headers, state.services.config.server.trust_proxy_headers);
    ctx.locale = state
        .services
        .translator
        .negotiate(headers.get(header::ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok()));
    ctx.headers = headers;
    ctx.identity = identity;
    ctx
}

/// `X-Forwarded-Proto` is only consulted when the deployment trusts its proxy
fn is_secure(uri: &Uri, headers: &HeaderMap, trust_proxy_headers: bool) -> bool {
    uri.scheme_str() == Some("https")
        || trust_proxy_headers
            && headers
                .get("x-forwarded-proto")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

async fn action(
    State(state): State<AppState>,
    Path((controller, action)): Path<(String, String)>,
    identity: Option<Extension<Identity>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut ctx = build_context(&state, method, &uri, headers, identity.map(|Extension(i)| i));
    if let Err(err) = ctx.parse_body(&body) {
        return error_response(&ctx, &err).into_response();
    }
    state.dispatcher.run(&controller, &action, &mut ctx).into_response()
}

async fn front_controller(
    State(state): State<AppState>,
    identity: Option<Extension<Identity>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut ctx = build_context(&state, method, &uri, headers, identity.map(|Extension(i)| i));
    if let Err(err) = ctx.parse_body(&body) {
        return error_response(&ctx, &err).into_response();
    }

    match resolve_route(&ctx) {
        Route::Action { mode, route } => {
            ctx.template_mode = mode;
            state.dispatcher.run_route(&route, &mut ctx).into_response()
        }
        Route::Template { mode, name } => {
            ctx.template_mode = mode;
            ctx.route_params.insert("template".to_string(), name);
            state.dispatcher.run("templates", "render", &mut ctx).into_response()
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "environment": state.services.config.environment,
            "locales": state.services.translator.locales(),
            "timestamp": chrono::Utc::now(),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, Environment};

    fn ctx(path: &str, query: Option<&str>) -> RequestContext {
        let services = AppServices::from_config(AppConfig::preset(Environment::Development)).unwrap();
        let mut ctx = RequestContext::new(Arc::new(services), Method::GET, path);
        ctx.set_query_string(query);
        ctx
    }

    fn template(mode: TemplateMode, name: &str) -> Route {
        Route::Template { mode, name: name.to_string() }
    }

    #[test]
    fn resolves_site_and_cp_templates() {
        assert_eq!(resolve_route(&ctx("/", None)), template(TemplateMode::Site, ""));
        assert_eq!(resolve_route(&ctx("/news/2024/", None)), template(TemplateMode::Site, "news/2024"));
        assert_eq!(resolve_route(&ctx("/admin", None)), template(TemplateMode::Cp, ""));
        assert_eq!(resolve_route(&ctx("/admin/login", None)), template(TemplateMode::Cp, "login"));
        assert_eq!(resolve_route(&ctx("/administrator", None)), template(TemplateMode::Site, "administrator"));
    }

    #[test]
    fn resolves_path_param_routes() {
        assert_eq!(
            resolve_route(&ctx("/index.php", Some("p=do/stuff"))),
            template(TemplateMode::Site, "do/stuff")
        );
        assert_eq!(resolve_route(&ctx("/index.php", None)), template(TemplateMode::Site, ""));
        assert_eq!(
            resolve_route(&ctx("/", Some("p=actions/forms/submit"))),
            Route::Action { mode: TemplateMode::Site, route: "forms/submit".into() }
        );
        assert_eq!(
            resolve_route(&ctx("/admin/actions/dashboard/index", None)),
            Route::Action { mode: TemplateMode::Cp, route: "dashboard/index".into() }
        );
    }

    #[test]
    fn forwarded_proto_marks_secure_only_behind_trusted_proxy() {
        let uri: Uri = "/x".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert!(!is_secure(&uri, &headers, true));
        headers.insert("x-forwarded-proto", "https, http".parse().unwrap());
        assert!(is_secure(&uri, &headers, true));
        assert!(!is_secure(&uri, &headers, false));

        let tls: Uri = "https://blocks.test/x".parse().unwrap();
        assert!(is_secure(&tls, &HeaderMap::new(), false));
    }
}
