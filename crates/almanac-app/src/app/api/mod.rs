mod admin;
mod calendar;
mod healthcheck;
pub mod util;

use salvo::Router;

use crate::middleware::request_context::RequestContextMiddleware;

pub use almanac_core::constants::{
    ADMIN_ROUTE_COMPONENT, ADMIN_ROUTE_PREFIX, API_ROUTE_COMPONENT, API_ROUTE_PREFIX,
    CALENDAR_ROUTE_COMPONENT, CALENDAR_ROUTE_PREFIX,
};

/// ## Summary
/// Constructs the API router: the public calendar and the staff endpoints.
#[must_use]
pub fn routes() -> Router {
    Router::with_path(API_ROUTE_COMPONENT)
        .hoop(RequestContextMiddleware)
        .push(healthcheck::routes())
        .push(calendar::routes())
        .push(admin::routes())
}
