#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use axum::http::Method;
use axum::Router;
use tempfile::TempDir;
use uuid::Uuid;

use blocks_web::auth::{generate_jwt, Claims, Identity};
use blocks_web::config::{AppConfig, Environment};
use blocks_web::handlers::{router, AppState};
use blocks_web::web::{AppServices, RequestContext};

pub const SITE_URL: &str = "http://blocks.test/";

/// A development config pointed at throwaway template roots
pub struct TestSite {
    _dir: TempDir,
    pub config: AppConfig,
}

impl TestSite {
    pub fn new() -> Result<Self> {
        Self::with_config(|_| {})
    }

    pub fn with_config(configure: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let site = dir.path().join("site");
        let cp = dir.path().join("cp");

        write_template(&site, "index.html", "<h1>{{ 'Home'|t }}</h1>")?;
        write_template(&site, "hello.html", "Hello {{ name }}")?;
        write_template(&site, "login.html", "<h1>{{ 'Login'|t }}</h1>")?;
        write_template(&site, "404.html", "<p class=\"missing\">{{ message }}</p>")?;
        write_template(&site, "news/index.twig", "<ul>{{ currentUser.username }}</ul>")?;
        write_template(&cp, "login.html", "<form>{{ 'Login'|t }}</form>")?;
        write_template(&cp, "index.html", "<h1>CP</h1>")?;
        write_template(&cp, "404.html", "<p class=\"cp-missing\">{{ message }}</p>")?;
        write_template(&cp, "dashboard.html", "<h1>{{ 'Dashboard'|t }}</h1><p>{{ currentUser.username }}</p>")?;

        let mut config = AppConfig::preset(Environment::Development);
        config.urls.site_url = Some(SITE_URL.to_string());
        config.templates.site_path = site;
        config.templates.cp_path = cp;
        configure(&mut config);

        Ok(Self { _dir: dir, config })
    }

    pub fn services(&self) -> Result<Arc<AppServices>> {
        Ok(Arc::new(AppServices::from_config(self.config.clone())?))
    }

    pub fn context(&self, method: Method, path: &str) -> Result<RequestContext> {
        Ok(RequestContext::new(self.services()?, method, path))
    }

    pub fn router(&self) -> Result<Router> {
        let services = AppServices::from_config(self.config.clone())?;
        Ok(router(AppState::new(services)))
    }

    /// Session JWT for a user with the given rights
    pub fn token(&self, username: &str, admin: bool, permissions: &[&str]) -> Result<String> {
        let claims = Claims::new(
            &self.config.security,
            Uuid::new_v4(),
            username.to_string(),
            admin,
            permissions.iter().map(|p| p.to_string()).collect(),
        );
        Ok(generate_jwt(&self.config.security, &claims)?)
    }
}

pub fn write_template(root: &Path, name: &str, contents: &str) -> Result<()> {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

pub fn identity(username: &str) -> Identity {
    Identity {
        user_id: Uuid::new_v4(),
        username: username.to_string(),
        admin: false,
        permissions: vec!["accessCp".to_string()],
    }
}
