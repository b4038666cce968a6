// handlers/controllers/app.rs - Application-level actions

use serde_json::{json, Value};

use crate::error::ApiError;
use crate::web::controller::{require_admin, require_permission};
use crate::web::response::{as_json, as_json_p, is_valid_jsonp_callback, ActionResponse};
use crate::web::{Controller, RequestContext};

/// Query/body params consumed by `translate` itself rather than interpolated
const TRANSLATE_RESERVED: &[&str] = &["message", "locale", "callback", "p"];

pub fn controller() -> Controller {
    Controller::new("app")
        .action("health", health)
        .action("translate", translate)
        .action("locales", locales)
        .action("config", config)
        .allow_anonymous(["health", "translate"])
}

fn health(ctx: &mut RequestContext) -> Result<ActionResponse, ApiError> {
    Ok(as_json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": ctx.config().environment,
    })))
}

/// Translate `message` into `locale` (or the negotiated request locale).
/// Any other params are interpolated into `{name}` placeholders.
fn translate(ctx: &mut RequestContext) -> Result<ActionResponse, ApiError> {
    let message = ctx.required_param("message")?.to_string();
    let locale = ctx.param("locale").unwrap_or(&ctx.locale).to_string();

    let mut names: Vec<&String> = ctx
        .query
        .keys()
        .chain(ctx.body_params.keys())
        .filter(|k| !TRANSLATE_RESERVED.contains(&k.as_str()))
        .collect();
    names.sort();
    names.dedup();
    let params: Vec<(&str, &str)> = names
        .into_iter()
        .filter_map(|name| Some((name.as_str(), ctx.param(name)?)))
        .collect();

    let translation = ctx.services.translator.translate(&locale, &message, &params);
    let data = json!({
        "message": message,
        "locale": locale,
        "translation": translation,
    });

    match ctx.param("callback") {
        Some(callback) if is_valid_jsonp_callback(callback) => Ok(as_json_p(data).with_callback(callback)),
        Some(_) => Err(ApiError::bad_request("Invalid JSONP callback")),
        None => Ok(as_json(data)),
    }
}

fn locales(ctx: &mut RequestContext) -> Result<ActionResponse, ApiError> {
    require_permission(ctx, "accessCp")?;

    let translator = &ctx.services.translator;
    let tables: Vec<Value> = translator
        .locales()
        .into_iter()
        .filter_map(|locale| {
            let table = translator.table(locale)?;
            Some(json!({
                "locale": locale,
                "entries": table.len(),
                "translated": table.translated_count(),
                "rejected": table.rejected().len(),
            }))
        })
        .collect();

    Ok(as_json(json!({
        "defaultLocale": translator.default_locale(),
        "requestLocale": ctx.locale,
        "locales": tables,
    })))
}

/// Non-secret view of the running configuration
fn config(ctx: &mut RequestContext) -> Result<ActionResponse, ApiError> {
    require_admin(ctx)?;

    let config = ctx.config();
    Ok(as_json(json!({
        "environment": config.environment,
        "devMode": config.dev_mode,
        "urls": config.urls,
        "templates": config.templates,
        "i18n": config.i18n,
    })))
}
