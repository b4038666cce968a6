// handlers/controllers/templates.rs - Page rendering for the front controller

use serde_json::json;

use crate::error::ApiError;
use crate::web::controller::{login_required, render_template};
use crate::web::response::ActionResponse;
use crate::web::{Controller, RequestContext};

pub fn controller() -> Controller {
    Controller::new("templates")
        .action("render", render)
        .allow_anonymous(["render"])
}

/// Render the `template` route param in the request's template mode. An
/// empty name renders `index`. Guests only see the login page of the CP.
fn render(ctx: &mut RequestContext) -> Result<ActionResponse, ApiError> {
    let name = ctx.param("template").unwrap_or_default().trim_matches('/').to_string();
    let name = if name.is_empty() { "index".to_string() } else { name };

    if ctx.is_cp_request() && ctx.is_guest() && name != ctx.config().urls.login_path.trim_matches('/') {
        tracing::debug!("Guest request for CP template '{}' requires login", name);
        return Ok(login_required(ctx));
    }

    let vars = json!({
        "currentUser": ctx.identity,
        "isGuest": ctx.is_guest(),
        "locale": ctx.locale,
        "template": name,
        "query": ctx.query,
    });
    render_template(ctx, &name, &vars)
}
