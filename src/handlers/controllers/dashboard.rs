// handlers/controllers/dashboard.rs - Control panel landing page

use serde_json::json;

use crate::error::ApiError;
use crate::templates::TemplateMode;
use crate::web::controller::{render_template, require_permission};
use crate::web::response::ActionResponse;
use crate::web::{Controller, RequestContext};

pub fn controller() -> Controller {
    Controller::new("dashboard").action("index", index)
}

fn index(ctx: &mut RequestContext) -> Result<ActionResponse, ApiError> {
    require_permission(ctx, "accessCp")?;
    ctx.template_mode = TemplateMode::Cp;

    let vars = json!({
        "currentUser": ctx.identity,
        "locale": ctx.locale,
    });
    render_template(ctx, "dashboard", &vars)
}
