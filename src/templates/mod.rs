// templates/mod.rs - Template lookup and rendering
//
// Templates live under one of two roots: the site root for front-end pages
// and the control panel root for CP pages. Rendering only interpolates
// `{{ var.path }}` and `{{ 'Message'|t }}` tags, HTML-escaped unless `|raw`
// is applied; there is no template language.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Extensions tried, in order, when a template name has none
const EXTENSIONS: &[&str] = &["html", "twig"];

/// Which template root resolves a template name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateMode {
    Site,
    Cp,
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidName(String),

    #[error("Failed to read template '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Templates {
    site_root: PathBuf,
    cp_root: PathBuf,
}

impl Templates {
    pub fn new(site_root: impl Into<PathBuf>, cp_root: impl Into<PathBuf>) -> Self {
        Self {
            site_root: site_root.into(),
            cp_root: cp_root.into(),
        }
    }

    pub fn root(&self, mode: TemplateMode) -> &Path {
        match mode {
            TemplateMode::Site => &self.site_root,
            TemplateMode::Cp => &self.cp_root,
        }
    }

    /// Find the file a template name refers to
    pub fn resolve(&self, mode: TemplateMode, name: &str) -> Result<PathBuf, TemplateError> {
        let relative = sanitize_name(name)?;
        let base = self.root(mode).join(&relative);

        let mut candidates = Vec::with_capacity(1 + EXTENSIONS.len() * 2);
        if !relative.as_os_str().is_empty() && relative.extension().is_some() {
            candidates.push(base.clone());
        }
        if !relative.as_os_str().is_empty() {
            candidates.extend(EXTENSIONS.iter().map(|ext| with_extra_extension(&base, ext)));
        }
        candidates.extend(EXTENSIONS.iter().map(|ext| base.join(format!("index.{}", ext))));

        candidates
            .into_iter()
            .find(|path| path.is_file())
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }

    pub fn exists(&self, mode: TemplateMode, name: &str) -> bool {
        self.resolve(mode, name).is_ok()
    }

    /// Render a template with `vars`, translating `|t` tags through `translate`
    pub fn render<F>(&self, mode: TemplateMode, name: &str, vars: &Value, translate: F) -> Result<String, TemplateError>
    where
        F: Fn(&str) -> String,
    {
        let path = self.resolve(mode, name)?;
        tracing::debug!("Rendering {:?} template '{}' from {}", mode, name, path.display());

        let source = std::fs::read_to_string(&path).map_err(|source| TemplateError::Io {
            name: name.to_string(),
            source,
        })?;
        Ok(render_str(&source, vars, translate))
    }
}

/// Strip slashes and reject names that could escape the template root
fn sanitize_name(name: &str) -> Result<PathBuf, TemplateError> {
    if name.contains('\0') {
        return Err(TemplateError::InvalidName(
            "A template name cannot contain NUL bytes.".to_string(),
        ));
    }

    let trimmed = name.trim().trim_matches('/');
    let path = Path::new(trimmed);
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            Component::CurDir => {}
            _ => {
                return Err(TemplateError::InvalidName(format!(
                    "Template name '{}' must stay inside the template root",
                    name
                )))
            }
        }
    }
    Ok(path.to_path_buf())
}

/// `a/b.c` + `html` -> `a/b.c.html`
fn with_extra_extension(path: &Path, ext: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}

/// Replace `{{ ... }}` tags. Unknown variables render as empty strings.
pub fn render_str<F>(source: &str, vars: &Value, translate: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        out.push_str(&render_tag(after[..end].trim(), vars, &translate));
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn render_tag<F>(tag: &str, vars: &Value, translate: &F) -> String
where
    F: Fn(&str) -> String,
{
    let mut parts = tag.split('|').map(str::trim);
    let expr = parts.next().unwrap_or_default();

    let mut text = match unquote(expr) {
        Some(literal) => literal.to_string(),
        None => value_to_text(lookup(vars, expr)),
    };
    let mut raw = false;
    for filter in parts {
        match filter {
            "t" => text = translate(&text),
            "raw" => raw = true,
            other => tracing::debug!("Ignoring unknown template filter '{}'", other),
        }
    }

    if raw {
        text
    } else {
        escape_html(&text)
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn unquote(s: &str) -> Option<&str> {
    let quoted = |q: char| s.len() >= 2 && s.starts_with(q) && s.ends_with(q);
    (quoted('\'') || quoted('"')).then(|| &s[1..s.len() - 1])
}

fn lookup<'a>(vars: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(vars, |current, key| match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn value_to_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> (tempfile::TempDir, Templates) {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("site");
        let cp = dir.path().join("cp");
        std::fs::create_dir_all(site.join("news")).unwrap();
        std::fs::create_dir_all(&cp).unwrap();
        std::fs::write(site.join("template.html"), "Im a template!").unwrap();
        std::fs::write(site.join("index.twig"), "home").unwrap();
        std::fs::write(site.join("news/index.html"), "news index").unwrap();
        std::fs::write(site.join("feed.xml"), "<rss/>").unwrap();
        std::fs::write(cp.join("dashboard.html"), "Hi {{ user.username }}").unwrap();
        let templates = Templates::new(site, cp);
        (dir, templates)
    }

    fn identity(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn resolves_extensions_and_index_files() {
        let (_dir, templates) = fixture();
        assert!(templates.resolve(TemplateMode::Site, "template").unwrap().ends_with("template.html"));
        assert!(templates.resolve(TemplateMode::Site, "/news/").unwrap().ends_with("news/index.html"));
        assert!(templates.resolve(TemplateMode::Site, "").unwrap().ends_with("index.twig"));
        assert!(templates.resolve(TemplateMode::Site, "feed.xml").unwrap().ends_with("feed.xml"));
    }

    #[test]
    fn modes_use_separate_roots() {
        let (_dir, templates) = fixture();
        assert!(templates.exists(TemplateMode::Cp, "dashboard"));
        assert!(!templates.exists(TemplateMode::Site, "dashboard"));
        assert!(!templates.exists(TemplateMode::Cp, "template"));
    }

    #[test]
    fn rejects_nul_bytes_and_traversal() {
        let (_dir, templates) = fixture();
        let err = templates.resolve(TemplateMode::Site, "temp\0late").unwrap_err();
        assert_eq!(err.to_string(), "A template name cannot contain NUL bytes.");
        assert!(matches!(
            templates.resolve(TemplateMode::Site, "../cp/dashboard"),
            Err(TemplateError::InvalidName(_))
        ));
        assert!(matches!(
            templates.resolve(TemplateMode::Site, "nope"),
            Err(TemplateError::NotFound(_))
        ));
    }

    #[test]
    fn renders_variables_and_translations() {
        let (_dir, templates) = fixture();
        let out = templates
            .render(TemplateMode::Cp, "dashboard", &json!({"user": {"username": "admin"}}), identity)
            .unwrap();
        assert_eq!(out, "Hi admin");

        let out = render_str(
            "{{ 'Content'|t }}: {{ items.1 }} {{ missing }}{{ \"lit\" }}",
            &json!({"items": ["a", "b"]}),
            |s| if s == "Content" { "Contenido".into() } else { s.into() },
        );
        assert_eq!(out, "Contenido: b lit");
    }

    #[test]
    fn output_is_escaped_unless_raw() {
        let vars = json!({"html": "<b>&</b>"});
        assert_eq!(render_str("{{ html }}", &vars, identity), "&lt;b&gt;&amp;&lt;/b&gt;");
        assert_eq!(render_str("{{ html|raw }}", &vars, identity), "<b>&</b>");
    }

    #[test]
    fn unterminated_tag_is_left_verbatim() {
        assert_eq!(render_str("a {{ b", &json!({}), identity), "a {{ b");
    }
}
