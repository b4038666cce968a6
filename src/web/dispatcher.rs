// web/dispatcher.rs - Routes `controller/action` pairs to registered controllers

use std::collections::{BTreeMap, HashMap};

use crate::error::ApiError;
use crate::web::context::RequestContext;
use crate::web::controller::{error_response, Controller};
use crate::web::response::ActionResponse;

#[derive(Debug, Default)]
pub struct Dispatcher {
    controllers: HashMap<String, Controller>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a controller; a later controller with the same id replaces the earlier one
    pub fn register(mut self, controller: Controller) -> Self {
        if self.controllers.contains_key(controller.id()) {
            tracing::warn!("Replacing controller '{}'", controller.id());
        }
        self.controllers.insert(controller.id().to_string(), controller);
        self
    }

    pub fn controller(&self, id: &str) -> Option<&Controller> {
        self.controllers.get(id)
    }

    /// Every `controller/action` route, sorted
    pub fn routes(&self) -> Vec<String> {
        let sorted: BTreeMap<&str, &Controller> = self
            .controllers
            .iter()
            .map(|(id, c)| (id.as_str(), c))
            .collect();
        sorted
            .into_iter()
            .flat_map(|(id, c)| c.action_ids().into_iter().map(move |a| format!("{}/{}", id, a)))
            .collect()
    }

    /// Run `controller_id/action_id`. Always produces a response.
    pub fn run(&self, controller_id: &str, action_id: &str, ctx: &mut RequestContext) -> ActionResponse {
        tracing::debug!("Dispatching {}/{}", controller_id, action_id);
        match self.controllers.get(controller_id) {
            Some(controller) => controller.run_action(action_id, ctx),
            None => {
                let err = ApiError::not_found(format!(
                    "Unable to resolve the request \"{}/{}\".",
                    controller_id, action_id
                ));
                let mut response = error_response(ctx, &err);
                response.merge_missing_headers(&ctx.response_headers);
                response
            }
        }
    }

    /// Run an action route such as `forms/submit`
    pub fn run_route(&self, route: &str, ctx: &mut RequestContext) -> ActionResponse {
        let route = route.trim_matches('/');
        let (controller_id, action_id) = route.split_once('/').unwrap_or((route, "index"));
        self.run(controller_id, action_id, ctx)
    }
}
