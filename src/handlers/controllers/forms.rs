// handlers/controllers/forms.rs - Form posts that end in a redirect

use serde_json::Value;

use crate::error::ApiError;
use crate::web::controller::{redirect_to_posted_url, require_post_request};
use crate::web::response::ActionResponse;
use crate::web::{Controller, RequestContext};

pub fn controller() -> Controller {
    Controller::new("forms")
        .action("submit", submit)
        .allow_anonymous(["submit"])
}

/// Redirect to the signed `redirect` field, filling `{field}` tokens from
/// the submitted form
fn submit(ctx: &mut RequestContext) -> Result<ActionResponse, ApiError> {
    require_post_request(ctx)?;

    let object = Value::Object(ctx.body_params.clone());
    redirect_to_posted_url(ctx, Some(&object), None)
}
