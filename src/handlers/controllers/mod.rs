// handlers/controllers/mod.rs - Built-in controllers
//
// app        health, translate, locales, config
// dashboard  control panel landing page
// forms      posted-form redirects
// templates  front-end page rendering
// users      session info

pub mod app;
pub mod dashboard;
pub mod forms;
pub mod templates;
pub mod users;

use crate::web::Dispatcher;

/// Dispatcher with every built-in controller registered
pub fn dispatcher() -> Dispatcher {
    Dispatcher::new()
        .register(app::controller())
        .register(dashboard::controller())
        .register(forms::controller())
        .register(templates::controller())
        .register(users::controller())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_builtin_routes_are_registered() {
        assert_eq!(
            dispatcher().routes(),
            vec![
                "app/config",
                "app/health",
                "app/locales",
                "app/translate",
                "dashboard/index",
                "forms/submit",
                "templates/render",
                "users/session-info",
            ]
        );
    }
}
