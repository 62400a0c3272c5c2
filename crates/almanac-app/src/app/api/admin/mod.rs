//! Staff endpoints. Records created here are owned by the requesting user.

mod category;
mod event;
mod import;

use salvo::Router;

use almanac_core::constants::ADMIN_ROUTE_COMPONENT;

#[must_use]
pub fn routes() -> Router {
    Router::with_path(ADMIN_ROUTE_COMPONENT)
        .push(import::routes())
        .push(event::routes())
        .push(category::routes())
}
