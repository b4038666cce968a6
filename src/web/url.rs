// web/url.rs - Site URL construction
//
// Routes are addressed as `{site_url}{script_name}?p={path}`, or
// `{site_url}{path}` when script names are omitted from URLs.

use ::url::{Position, Url};

use crate::config::ConfigError;
use crate::error::ApiError;
use crate::web::context::RequestContext;

/// Absolute URL, protocol-relative URL, or a mailto/tel link
pub fn is_full_url(url: &str) -> bool {
    if url.starts_with("//") || url.starts_with("mailto:") || url.starts_with("tel:") {
        return true;
    }
    match url.split_once("://") {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

pub fn is_root_relative_url(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//")
}

/// Replace the scheme of an absolute URL
pub fn url_with_scheme(url: &str, scheme: &str) -> String {
    match url.split_once("://") {
        Some((_, rest)) => format!("{}://{}", scheme, rest),
        None => match url.strip_prefix("//") {
            Some(rest) => format!("{}://{}", scheme, rest),
            None => url.to_string(),
        },
    }
}

/// Site base URL with a trailing slash. Secure requests upgrade it to https.
pub fn site_base_url(ctx: &RequestContext) -> Result<String, ApiError> {
    let base = match &ctx.config().urls.site_url {
        Some(site_url) => site_url.clone(),
        None => {
            let host = ctx
                .header("host")
                .filter(|h| !h.trim().is_empty())
                .ok_or(ConfigError::MissingServerField("Host"))?;
            let scheme = if ctx.secure { "https" } else { "http" };
            format!("{}://{}/", scheme, host.trim())
        }
    };

    let base = if ctx.secure { url_with_scheme(&base, "https") } else { base };
    Ok(if base.ends_with('/') { base } else { format!("{}/", base) })
}

/// Where a `redirect(None)` goes
pub fn home_url(ctx: &RequestContext) -> String {
    let urls = &ctx.config().urls;
    if urls.omit_script_name_in_urls {
        "/".to_string()
    } else {
        urls.script_name.clone()
    }
}

/// Build a site URL for `path` with optional query parameters. Full and
/// root-relative URLs are returned unchanged.
pub fn url(ctx: &RequestContext, path: &str, params: &[(&str, &str)]) -> Result<String, ApiError> {
    if is_full_url(path) || is_root_relative_url(path) {
        return encode_given(&append_params(path.to_string(), params));
    }

    let urls = &ctx.config().urls;
    let (path, fragment) = match path.split_once('#') {
        Some((p, f)) => (p, Some(f)),
        None => (path, None),
    };
    let mut path = path.trim_matches('/').to_string();
    if ctx.is_cp_request() {
        let trigger = urls.cp_trigger.trim_matches('/');
        path = if path.is_empty() {
            trigger.to_string()
        } else {
            format!("{}/{}", trigger, path)
        };
    }

    let mut url = site_base_url(ctx)?;
    if urls.omit_script_name_in_urls {
        url.push_str(&path);
    } else {
        url.push_str(urls.script_name.trim_start_matches('/'));
        if !path.is_empty() {
            // a path with its own query string keeps it behind the route param
            let path = path.replacen('?', "&", 1);
            url.push_str(&format!("?{}={}", urls.path_param, path));
        }
    }

    let mut url = append_params(url, params);
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    encode(&url)
}

/// Percent-encode non-ASCII and reserved characters by running the URL
/// through the WHATWG parser
fn encode(raw: &str) -> Result<String, ApiError> {
    Url::parse(raw)
        .map(String::from)
        .map_err(|e| ApiError::bad_request(format!("Invalid URL {}: {}", raw, e)))
}

/// Encode a caller-supplied full or root-relative URL. ASCII input is
/// returned untouched.
fn encode_given(target: &str) -> Result<String, ApiError> {
    if target.is_ascii() {
        return Ok(target.to_string());
    }

    let invalid = |e: ::url::ParseError| ApiError::bad_request(format!("Invalid URL {}: {}", target, e));
    let joined = Url::parse("http://localhost/").and_then(|base| base.join(target)).map_err(invalid)?;

    Ok(if is_root_relative_url(target) {
        joined[Position::BeforePath..].to_string()
    } else if target.starts_with("//") {
        format!("//{}", &joined[Position::BeforeUsername..])
    } else {
        joined.into()
    })
}

fn append_params(mut url: String, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return url;
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().copied())
        .finish();
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(&query);
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, Environment};
    use crate::templates::TemplateMode;
    use crate::web::context::AppServices;
    use axum::http::Method;
    use std::sync::Arc;

    fn ctx_with(configure: impl FnOnce(&mut AppConfig)) -> RequestContext {
        let mut config = AppConfig::preset(Environment::Development);
        config.urls.site_url = Some("http://blocks.test/".into());
        configure(&mut config);
        let services = AppServices::from_config(config).unwrap();
        RequestContext::new(Arc::new(services), Method::GET, "/")
    }

    #[test]
    fn recognizes_full_urls() {
        assert!(is_full_url("https://craftcms.com"));
        assert!(is_full_url("//cdn.test/x.js"));
        assert!(is_full_url("mailto:hi@blocks.test"));
        assert!(!is_full_url("do/stuff"));
        assert!(!is_full_url("/do/stuff"));
        assert!(!is_full_url("do/stuff?next=http://x"));
        assert!(is_root_relative_url("/do/stuff"));
        assert!(!is_root_relative_url("//cdn.test"));
    }

    #[test]
    fn builds_script_name_urls() {
        let ctx = ctx_with(|_| {});
        assert_eq!(url(&ctx, "do/stuff", &[]).unwrap(), "http://blocks.test/index.php?p=do/stuff");
        assert_eq!(url(&ctx, "", &[]).unwrap(), "http://blocks.test/index.php");
        assert_eq!(
            url(&ctx, "news/", &[("page", "2")]).unwrap(),
            "http://blocks.test/index.php?p=news&page=2"
        );
        assert_eq!(url(&ctx, "/news/", &[]).unwrap(), "/news/");
        assert_eq!(
            url(&ctx, "search?q=a#results", &[]).unwrap(),
            "http://blocks.test/index.php?p=search&q=a#results"
        );
        assert_eq!(url(&ctx, "https://craftcms.com", &[]).unwrap(), "https://craftcms.com");
        assert_eq!(home_url(&ctx), "index.php");
    }

    #[test]
    fn non_ascii_routes_are_percent_encoded() {
        let ctx = ctx_with(|_| {});
        assert_eq!(
            url(&ctx, "entrées/café", &[]).unwrap(),
            "http://blocks.test/index.php?p=entr%C3%A9es/caf%C3%A9"
        );
        assert_eq!(
            url(&ctx, "news#sección", &[]).unwrap(),
            "http://blocks.test/index.php?p=news#secci%C3%B3n"
        );

        let ctx = ctx_with(|c| c.urls.omit_script_name_in_urls = true);
        assert_eq!(url(&ctx, "café menu", &[]).unwrap(), "http://blocks.test/caf%C3%A9%20menu");
    }

    #[test]
    fn given_urls_are_only_encoded_when_needed() {
        let ctx = ctx_with(|_| {});
        assert_eq!(url(&ctx, "https://example.com", &[]).unwrap(), "https://example.com");
        assert_eq!(url(&ctx, "/menú?x=1", &[]).unwrap(), "/men%C3%BA?x=1");
        assert_eq!(url(&ctx, "//cdn.test/ñ.js", &[]).unwrap(), "//cdn.test/%C3%B1.js");
        assert_eq!(
            url(&ctx, "https://example.com/café", &[]).unwrap(),
            "https://example.com/caf%C3%A9"
        );
    }

    #[test]
    fn omitted_script_name_and_cp_trigger() {
        let mut ctx = ctx_with(|c| c.urls.omit_script_name_in_urls = true);
        assert_eq!(url(&ctx, "do/stuff", &[]).unwrap(), "http://blocks.test/do/stuff");
        assert_eq!(home_url(&ctx), "/");

        ctx.template_mode = TemplateMode::Cp;
        assert_eq!(url(&ctx, "login", &[]).unwrap(), "http://blocks.test/admin/login");
        assert_eq!(url(&ctx, "", &[]).unwrap(), "http://blocks.test/admin");
    }

    #[test]
    fn secure_requests_upgrade_scheme() {
        let mut ctx = ctx_with(|_| {});
        ctx.secure = true;
        assert_eq!(site_base_url(&ctx).unwrap(), "https://blocks.test/");
    }

    #[test]
    fn falls_back_to_host_header() {
        let mut ctx = ctx_with(|c| c.urls.site_url = None);
        assert!(matches!(site_base_url(&ctx), Err(ApiError::Config(_))));

        ctx.set_header("Host", "example.org:8080");
        assert_eq!(site_base_url(&ctx).unwrap(), "http://example.org:8080/");
    }

    #[test]
    fn scheme_replacement() {
        assert_eq!(url_with_scheme("http://a.test/x", "https"), "https://a.test/x");
        assert_eq!(url_with_scheme("//a.test/x", "http"), "http://a.test/x");
        assert_eq!(url_with_scheme("index.php", "https"), "index.php");
    }
}
