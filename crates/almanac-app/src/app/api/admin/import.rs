use diesel_async::scoped_futures::ScopedFutureExt;
use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::{Deserialize, Serialize};

use almanac_db::db::pg_store::PgStore;
use almanac_db::db::transaction::with_transaction;
use almanac_service::error::ServiceError;
use almanac_service::import::FsAssetStorage;
use almanac_service::import::pipeline::{
    commit_import, discard_featured_image, fetch_event_data, prepare_import,
};

use crate::app::api::util::event_detail_path;
use crate::config::{get_config_from_depot, import_settings};
use crate::db_handler::get_db_from_depot;
use crate::error::{AppError, AppResult};
use crate::fetch_handler::get_fetcher_from_depot;
use crate::middleware::request_context::require_user;

/// ## Summary
/// Import request payload
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    /// Public page of the event on the other installation.
    pub event_url: String,
}

/// ## Summary
/// Imported event response payload
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub id: uuid::Uuid,
    pub slug: String,
    pub title: String,
    pub path: String,
    pub occurrences: usize,
    pub featured_image: Option<String>,
}

/// ## Summary
/// POST /admin/import - Imports an event published by another installation.
///
/// The remote page and its JSON are fetched and the featured image is stored
/// before anything is written. The event and its occurrences are then inserted
/// in one transaction. If that fails the stored image is deleted again.
///
/// ## Side Effects
/// - Stores the featured image under the media root
/// - Inserts the event and its occurrences
///
/// ## Errors
/// Returns HTTP 400 with the import error message if fetching, discovery or
/// parsing fails, HTTP 401 without a requesting user, HTTP 500 if writing fails.
#[handler]
async fn import_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    tracing::debug!("Processing import request");

    match import(req, depot).await {
        Ok(body) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(body));
        }
        Err(e) => e.render(res),
    }
}

async fn import(req: &mut Request, depot: &Depot) -> AppResult<ImportResponse> {
    let ctx = require_user(depot)?;
    let request: ImportRequest = req
        .parse_json()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid import request: {e}")))?;

    let settings = get_config_from_depot(depot)?;
    let import_settings = import_settings(&settings)?;
    let fetcher = get_fetcher_from_depot(depot)?;
    let assets = FsAssetStorage::new(&settings.import.media_root);

    let data = fetch_event_data(fetcher.as_ref(), &request.event_url)
        .await
        .map_err(ServiceError::from)?;
    let prepared = prepare_import(fetcher.as_ref(), &assets, &data, &ctx, &import_settings)
        .await
        .map_err(ServiceError::from)?;

    let stored_image = prepared.event.featured_image.clone();
    let committed = async {
        let provider = get_db_from_depot(depot)?;
        let mut conn = provider.get_connection().await?;
        let written = with_transaction(&mut conn, move |tx| {
            async move {
                let mut store = PgStore::new(tx);
                commit_import(&mut store, prepared).await
            }
            .scope_boxed()
        })
        .await?;
        Ok::<_, AppError>(written)
    }
    .await;
    let (event, occurrences) = match committed {
        Ok(written) => written,
        Err(e) => {
            discard_featured_image(&assets, stored_image.as_deref()).await;
            return Err(e);
        }
    };

    Ok(ImportResponse {
        id: event.id,
        path: event_detail_path(&event.slug),
        slug: event.slug,
        title: event.title,
        occurrences: occurrences.len(),
        featured_image: event.featured_image,
    })
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("import").post(import_handler)
}
