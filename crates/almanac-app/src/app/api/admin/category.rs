use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::{Deserialize, Serialize};

use almanac_db::db::pg_store::PgStore;
use almanac_db::model::category::EventCategory;
use almanac_service::category::{create_category, delete_category, list_categories};

use crate::db_handler::get_db_from_depot;
use crate::error::{AppError, AppResult};
use crate::middleware::request_context::{get_request_context, require_user};

/// ## Summary
/// Create category request payload
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub title: String,
}

/// ## Summary
/// Category response payload
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: uuid::Uuid,
    pub title: String,
    pub slug: String,
    pub order: Option<i32>,
}

impl From<EventCategory> for CategoryResponse {
    fn from(category: EventCategory) -> Self {
        Self {
            id: category.id,
            title: category.title,
            slug: category.slug,
            order: category.sort_order,
        }
    }
}

/// ## Summary
/// GET /admin/categories - Categories of the site by position.
#[handler]
async fn list_handler(depot: &mut Depot, res: &mut Response) {
    match list(depot).await {
        Ok(body) => res.render(Json(body)),
        Err(e) => e.render(res),
    }
}

async fn list(depot: &Depot) -> AppResult<Vec<CategoryResponse>> {
    let ctx = get_request_context(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;
    let mut store = PgStore::new(&mut conn);
    let categories = list_categories(&mut store, &ctx).await?;
    Ok(categories.into_iter().map(CategoryResponse::from).collect())
}

/// ## Summary
/// POST /admin/categories - Creates a category at the end of the order.
///
/// ## Errors
/// Returns HTTP 400 for a blank title.
#[handler]
async fn create_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    match create(req, depot).await {
        Ok(body) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(body));
        }
        Err(e) => e.render(res),
    }
}

async fn create(req: &mut Request, depot: &Depot) -> AppResult<CategoryResponse> {
    let ctx = require_user(depot)?;
    let request: CreateCategoryRequest = req
        .parse_json()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid category: {e}")))?;

    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;
    let mut store = PgStore::new(&mut conn);
    Ok(create_category(&mut store, &ctx, &request.title).await?.into())
}

/// ## Summary
/// DELETE /admin/categories/{id} - Deletes a category and closes the gap in the order.
///
/// ## Errors
/// Returns HTTP 404 if the category does not exist.
#[handler]
async fn delete_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    match delete(req, depot).await {
        Ok(()) => {
            res.status_code(StatusCode::NO_CONTENT);
        }
        Err(e) => e.render(res),
    }
}

async fn delete(req: &mut Request, depot: &Depot) -> AppResult<()> {
    require_user(depot)?;
    let Some(category_id) = req
        .param::<String>("id")
        .and_then(|raw| uuid::Uuid::parse_str(&raw).ok())
    else {
        return Err(AppError::BadRequest("category id must be a UUID".to_string()));
    };

    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;
    let mut store = PgStore::new(&mut conn);
    delete_category(&mut store, category_id).await?;
    Ok(())
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("categories")
        .get(list_handler)
        .post(create_handler)
        .push(Router::with_path("{id}").delete(delete_handler))
}
