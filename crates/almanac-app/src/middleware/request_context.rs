use chrono::Utc;
use salvo::Depot;
use salvo::http::StatusCode;
use tracing::error;

use almanac_core::constants::REMOTE_USER_HEADER;
use almanac_core::error::CoreError;
use almanac_core::types::RequestContext;

use crate::config::get_config_from_depot;
use crate::error::{AppError, AppResult};

/// Builds the [`RequestContext`] of each request and stores it in the depot.
pub struct RequestContextMiddleware;

/// ## Summary
/// The requesting user: the id in the remote user header, else the configured
/// default owner, else the nil id.
///
/// ## Errors
/// Returns `BadRequest` if the header is present but not a UUID.
pub fn resolve_user(
    header: Option<&str>,
    default_owner: Option<uuid::Uuid>,
) -> AppResult<uuid::Uuid> {
    match header.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => uuid::Uuid::parse_str(value)
            .map_err(|e| AppError::BadRequest(format!("invalid {REMOTE_USER_HEADER}: {e}"))),
        None => Ok(default_owner.unwrap_or_default()),
    }
}

/// ## Summary
/// Inserts a [`RequestContext`] for the configured site, evaluated now.
///
/// ## Errors
/// Answers 400 for a malformed user header, 500 if the configuration is missing.
#[salvo::async_trait]
impl salvo::Handler for RequestContextMiddleware {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        let config = match get_config_from_depot(depot) {
            Ok(cfg) => cfg,
            Err(e) => {
                error!(error = ?e, "Failed to get config from depot");
                res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
                ctrl.skip_rest();
                return;
            }
        };

        let header = req
            .headers()
            .get(REMOTE_USER_HEADER)
            .and_then(|value| value.to_str().ok());
        let user_id = match resolve_user(header, config.site.default_owner) {
            Ok(user_id) => user_id,
            Err(e) => {
                e.render(res);
                ctrl.skip_rest();
                return;
            }
        };

        let ctx = RequestContext::new(config.site.id, user_id, Utc::now());
        tracing::trace!(site_id = ctx.site_id, user_id = %ctx.user_id, "Request context built");
        depot.inject(ctx);
    }
}

/// ## Summary
/// Retrieves the request context from the depot.
///
/// ## Errors
/// Returns an error if the middleware did not run for this request.
pub fn get_request_context(depot: &Depot) -> AppResult<RequestContext> {
    depot
        .obtain::<RequestContext>()
        .copied()
        .map_err(|_err| CoreError::InvariantViolation("Request context not found in depot").into())
}

/// ## Summary
/// The request context of a request that creates records, which needs a known user.
///
/// ## Errors
/// Returns `Unauthenticated` when no user could be determined.
pub fn require_user(depot: &Depot) -> AppResult<RequestContext> {
    let ctx = get_request_context(depot)?;
    if ctx.user_id.is_nil() {
        return Err(AppError::Unauthenticated);
    }
    Ok(ctx)
}
