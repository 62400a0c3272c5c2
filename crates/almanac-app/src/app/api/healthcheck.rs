//! Liveness of the server and reachability of its database.

use salvo::http::StatusCode;
use salvo::writing::Json;
use salvo::{Depot, Response, Router, handler};
use serde::Serialize;

use almanac_db::db::connection::ping;

use crate::db_handler::get_db_from_depot;
use crate::error::AppResult;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub database: &'static str,
}

async fn database_reachable(depot: &Depot) -> AppResult<()> {
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;
    ping(&mut conn).await?;
    Ok(())
}

/// ## Summary
/// GET /healthcheck - 200 when a pooled connection answers, 503 otherwise.
#[handler]
async fn healthcheck(depot: &mut Depot, res: &mut Response) {
    let report = match database_reachable(depot).await {
        Ok(()) => HealthReport {
            status: "ok",
            database: "ok",
        },
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            res.status_code(StatusCode::SERVICE_UNAVAILABLE);
            HealthReport {
                status: "degraded",
                database: "unavailable",
            }
        }
    };
    res.render(Json(report));
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("healthcheck").get(healthcheck)
}
