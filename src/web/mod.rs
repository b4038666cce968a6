// web/mod.rs - Request handling core
//
// context     per-request state and shared services
// controller  action tables, the anonymous-access gate and action helpers
// dispatcher  controller registry
// response    response descriptor and JSON/JSONP/raw builders
// url         site URL construction

pub mod context;
pub mod controller;
pub mod dispatcher;
pub mod response;
pub mod url;

pub use context::{AppServices, RequestContext};
pub use controller::{Controller, GateOutcome};
pub use dispatcher::Dispatcher;
pub use response::{ActionResponse, ResponseFormat};
