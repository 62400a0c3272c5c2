//! Public calendar: month redirect, month grid, event list, upcoming feed,
//! event detail discovery page and JSON export.

mod view;

use salvo::http::StatusCode;
use salvo::writing::{Json, Text};
use salvo::{Depot, Request, Response, Router, handler};

use almanac_core::constants::{CALENDAR_ROUTE_COMPONENT, EVENT_JSON_ROUTE_COMPONENT};
use almanac_db::db::pg_store::PgStore;
use almanac_service::calendar::views::{
    ListParams, current_month, load_event_list, load_month_grid, load_upcoming,
};
use almanac_service::category::split_slugs;
use almanac_service::error::ServiceError;
use almanac_service::event::published_event_by_slug;
use almanac_service::export::export_published_event;

use crate::app::api::util::{
    check_if_none_match, event_json_path, list_path, month_path, request_origin, set_header,
};
use crate::config::{expand_options, get_config_from_depot};
use crate::db_handler::get_db_from_depot;
use crate::error::AppResult;
use crate::middleware::request_context::get_request_context;

use view::{EventListView, MonthGridView, Presenter, UpcomingView, discovery_page};

fn query_string(req: &Request, key: &str) -> Option<String> {
    req.query::<String>(key)
}

fn category_slugs(req: &Request) -> Vec<String> {
    query_string(req, "categories")
        .map(|raw| split_slugs(&raw))
        .unwrap_or_default()
}

fn path_param<T: std::str::FromStr>(req: &Request, key: &str) -> AppResult<T> {
    req.param::<String>(key)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| ServiceError::NotFound(format!("no such {key}")).into())
}

/// ## Summary
/// GET /calendar - Redirects to the event list.
#[handler]
async fn home(res: &mut Response) {
    res.status_code(StatusCode::FOUND);
    set_header(res, "Location", &list_path());
}

/// ## Summary
/// GET /calendar/month - Redirects to the grid of the current month in the site timezone.
#[handler]
async fn month_redirect(depot: &mut Depot, res: &mut Response) {
    if let Err(e) = redirect_to_current_month(depot, res) {
        e.render(res);
    }
}

fn redirect_to_current_month(depot: &Depot, res: &mut Response) -> AppResult<()> {
    let settings = get_config_from_depot(depot)?;
    let ctx = get_request_context(depot)?;
    let options = expand_options(&settings)?;

    let (year, month) = current_month(ctx.now, options.timezone);
    res.status_code(StatusCode::FOUND);
    set_header(res, "Location", &month_path(year, month));
    Ok(())
}

/// ## Summary
/// GET /calendar/{year}/{month} - Month grid, optionally restricted with
/// `?categories=a,b`.
#[handler]
async fn month_grid(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    if let Err(e) = render_month_grid(req, depot, res).await {
        e.render(res);
    }
}

async fn render_month_grid(req: &mut Request, depot: &Depot, res: &mut Response) -> AppResult<()> {
    let year: i32 = path_param(req, "year")?;
    let month: u32 = path_param(req, "month")?;
    let settings = get_config_from_depot(depot)?;
    let ctx = get_request_context(depot)?;
    let options = expand_options(&settings)?;

    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;
    let mut store = PgStore::new(&mut conn);
    let grid = load_month_grid(&mut store, &ctx, &options, year, month, &category_slugs(req)).await?;

    let origin = request_origin(req, depot);
    let presenter = Presenter {
        timezone: options.timezone,
        origin: &origin,
    };
    res.render(Json(MonthGridView::build(&grid, &presenter)?));
    Ok(())
}

/// ## Summary
/// GET /calendar/list - Featured and regular instances from `start_day` on,
/// each paginated on its own.
///
/// Query: `start_day`, `end_day` (`MM/DD/YYYY`), `categories`, `featured-page`, `page`.
#[handler]
async fn event_list(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    if let Err(e) = render_event_list(req, depot, res).await {
        e.render(res);
    }
}

async fn render_event_list(req: &mut Request, depot: &Depot, res: &mut Response) -> AppResult<()> {
    let settings = get_config_from_depot(depot)?;
    let ctx = get_request_context(depot)?;
    let options = expand_options(&settings)?;
    let params = ListParams {
        start_day: query_string(req, "start_day"),
        end_day: query_string(req, "end_day"),
        categories: category_slugs(req),
        featured_page: query_string(req, "featured-page"),
        page: query_string(req, "page"),
    };

    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;
    let mut store = PgStore::new(&mut conn);
    let list = load_event_list(&mut store, &ctx, &options, &settings.events.listing(), &params).await?;

    let origin = request_origin(req, depot);
    let presenter = Presenter {
        timezone: options.timezone,
        origin: &origin,
    };
    res.render(Json(EventListView::build(list, &presenter)?));
    Ok(())
}

/// ## Summary
/// GET /calendar/upcoming - The next instance of each upcoming event.
///
/// Query: `category` (slug; unknown slugs are ignored), `limit`.
#[handler]
async fn upcoming(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    if let Err(e) = render_upcoming(req, depot, res).await {
        e.render(res);
    }
}

async fn render_upcoming(req: &mut Request, depot: &Depot, res: &mut Response) -> AppResult<()> {
    let settings = get_config_from_depot(depot)?;
    let ctx = get_request_context(depot)?;
    let options = expand_options(&settings)?;
    let category = query_string(req, "category");
    let limit = query_string(req, "limit")
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .unwrap_or(settings.events.upcoming_limit);

    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;
    let mut store = PgStore::new(&mut conn);
    let feed = load_upcoming(&mut store, &ctx, &options, category.as_deref(), limit).await?;

    let origin = request_origin(req, depot);
    let presenter = Presenter {
        timezone: options.timezone,
        origin: &origin,
    };
    res.render(Json(UpcomingView::build(&feed, &presenter)?));
    Ok(())
}

/// ## Summary
/// GET /calendar/event/{slug} - The detail page of a published event. Its head
/// advertises the JSON export so other installations can import the event.
#[handler]
async fn event_detail(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    if let Err(e) = render_event_detail(req, depot, res).await {
        e.render(res);
    }
}

async fn render_event_detail(req: &mut Request, depot: &Depot, res: &mut Response) -> AppResult<()> {
    let slug: String = path_param(req, "slug")?;
    let ctx = get_request_context(depot)?;

    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;
    let mut store = PgStore::new(&mut conn);
    let event = published_event_by_slug(&mut store, &ctx, &slug).await?;

    res.render(Text::Html(discovery_page(&event, &event_json_path(event.id))));
    Ok(())
}

/// ## Summary
/// GET /calendar/event/{id}/json - The JSON representation of a published event.
///
/// Answers 304 when `If-None-Match` carries the current entity tag.
#[handler]
async fn event_json(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    if let Err(e) = render_event_json(req, depot, res).await {
        e.render(res);
    }
}

async fn render_event_json(req: &mut Request, depot: &Depot, res: &mut Response) -> AppResult<()> {
    let event_id: uuid::Uuid = path_param(req, "id")?;
    let ctx = get_request_context(depot)?;

    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;
    let mut store = PgStore::new(&mut conn);
    let exported = export_published_event(&mut store, &ctx, event_id).await?;

    set_header(res, "ETag", &exported.etag);
    if check_if_none_match(req, &exported.etag) {
        res.status_code(StatusCode::NOT_MODIFIED);
        return Ok(());
    }

    set_header(res, "Content-Type", "application/json");
    res.status_code(StatusCode::OK);
    if let Err(e) = res.write_body(exported.body) {
        tracing::error!("Failed to write response body: {}", e);
    }
    Ok(())
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(CALENDAR_ROUTE_COMPONENT)
        .get(home)
        .push(Router::with_path("month").get(month_redirect))
        .push(Router::with_path("list").get(event_list))
        .push(Router::with_path("upcoming").get(upcoming))
        .push(
            Router::with_path("event/{id}").push(
                Router::with_path(EVENT_JSON_ROUTE_COMPONENT).get(event_json),
            ),
        )
        .push(Router::with_path("event/{slug}").get(event_detail))
        .push(Router::with_path("{year}/{month}").get(month_grid))
}
