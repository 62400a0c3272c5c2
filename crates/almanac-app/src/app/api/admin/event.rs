use diesel_async::scoped_futures::ScopedFutureExt;
use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::Serialize;

use almanac_db::db::pg_store::PgStore;
use almanac_db::db::transaction::with_transaction;
use almanac_service::event::duplicate_event;

use crate::app::api::util::event_detail_path;
use crate::db_handler::get_db_from_depot;
use crate::error::{AppError, AppResult};
use crate::middleware::request_context::require_user;

/// ## Summary
/// Duplicated event response payload
#[derive(Debug, Serialize)]
pub struct DuplicateResponse {
    pub id: uuid::Uuid,
    pub slug: String,
    pub title: String,
    pub path: String,
}

/// ## Summary
/// POST /admin/event/{id}/duplicate - Copies an event as a draft.
///
/// ## Side Effects
/// Inserts the copy with its category links and occurrences in one transaction.
///
/// ## Errors
/// Returns HTTP 404 if the event does not exist, HTTP 500 if writing fails.
#[handler]
async fn duplicate_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    match duplicate(req, depot).await {
        Ok(body) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(body));
        }
        Err(e) => e.render(res),
    }
}

async fn duplicate(req: &mut Request, depot: &Depot) -> AppResult<DuplicateResponse> {
    let ctx = require_user(depot)?;
    let Some(event_id) = req
        .param::<String>("id")
        .and_then(|raw| uuid::Uuid::parse_str(&raw).ok())
    else {
        return Err(AppError::BadRequest("event id must be a UUID".to_string()));
    };

    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;
    let copy = with_transaction(&mut conn, move |tx| {
        async move {
            let mut store = PgStore::new(tx);
            duplicate_event(&mut store, &ctx, event_id).await
        }
        .scope_boxed()
    })
    .await?;

    Ok(DuplicateResponse {
        id: copy.id,
        path: event_detail_path(&copy.slug),
        slug: copy.slug,
        title: copy.title,
    })
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("event/{id}/duplicate").post(duplicate_handler)
}
