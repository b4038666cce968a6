// handlers/controllers/users.rs - Session info for the signed-in user

use serde_json::json;

use crate::error::ApiError;
use crate::web::controller::require_accepts_json;
use crate::web::response::{as_json, ActionResponse};
use crate::web::{Controller, RequestContext};

pub fn controller() -> Controller {
    Controller::new("users").action("session-info", session_info)
}

fn session_info(ctx: &mut RequestContext) -> Result<ActionResponse, ApiError> {
    require_accepts_json(ctx)?;

    Ok(as_json(json!({
        "isGuest": ctx.is_guest(),
        "user": ctx.identity,
        "locale": ctx.locale,
    })))
}
