//! HTTP handler functions for the trail API.

use actix_web::{HttpRequest, HttpResponse, web};
use ihike_database_models::{BoundingBox, TrailQuery};
use ihike_server_models::{
    ApiDetail, ApiFeature, ApiFeatureCollection, ApiHealth, ApiPage, GONE_DETAIL, TrailListParams,
};
use ihike_trail_models::{Difficulty, LengthKm, TrailKind};

use crate::AppState;

/// `GET /` and `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        status: "ok".to_string(),
    })
}

/// Any method on a removed `/api/trails` or `/api/paths` endpoint.
pub async fn gone() -> HttpResponse {
    HttpResponse::Gone().json(ApiDetail::new(GONE_DETAIL))
}

/// `GET /api/route`
pub async fn list_routes(
    state: web::Data<AppState>,
    req: HttpRequest,
    params: web::Query<TrailListParams>,
) -> HttpResponse {
    list(TrailKind::Route, &state, &req, &params).await
}

/// `GET /api/ways`
pub async fn list_ways(
    state: web::Data<AppState>,
    req: HttpRequest,
    params: web::Query<TrailListParams>,
) -> HttpResponse {
    list(TrailKind::Ways, &state, &req, &params).await
}

/// `GET /api/route/{id}`
pub async fn route_detail(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    detail(TrailKind::Route, &state, &path).await
}

/// `GET /api/ways/{id}`
pub async fn ways_detail(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    detail(TrailKind::Ways, &state, &path).await
}

/// Which page a listing request asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageRequest {
    Number(u64),
    Last,
}

fn parse_page(page: Option<&str>) -> Option<PageRequest> {
    match page.map(str::trim) {
        None | Some("") => Some(PageRequest::Number(1)),
        Some("last") => Some(PageRequest::Last),
        Some(s) => s
            .parse::<u64>()
            .ok()
            .filter(|n| *n >= 1)
            .map(PageRequest::Number),
    }
}

fn page_count(count: u64, page_size: u32) -> u64 {
    count.div_ceil(u64::from(page_size)).max(1)
}

async fn list(
    kind: TrailKind,
    state: &AppState,
    req: &HttpRequest,
    params: &TrailListParams,
) -> HttpResponse {
    let page_size = state.pagination.page_size(params.page_size.as_deref());
    let Some(requested) = parse_page(params.page.as_deref()) else {
        return invalid_page();
    };

    let mut query = build_query(kind, params, page_size);

    let page_number = match requested {
        PageRequest::Number(n) => n,
        PageRequest::Last => {
            let mut count_only = query.clone();
            count_only.limit = 0;
            match state.reader.query_trails(&count_only).await {
                Ok(page) => page_count(page.count, page_size),
                Err(e) => return server_error(kind, &e),
            }
        }
    };
    query.offset = (page_number - 1).saturating_mul(u64::from(page_size));

    let page = match state.reader.query_trails(&query).await {
        Ok(page) => page,
        Err(e) => return server_error(kind, &e),
    };

    let pages = page_count(page.count, page_size);
    if page_number > pages {
        return invalid_page();
    }

    let next = (page_number < pages).then(|| page_url(req, Some(page_number + 1)));
    let previous = (page_number > 1).then(|| {
        let previous = page_number - 1;
        page_url(req, (previous > 1).then_some(previous))
    });

    let features = page
        .rows
        .into_iter()
        .map(|row| ApiFeature::from_row(kind, row))
        .collect();

    HttpResponse::Ok().json(ApiPage {
        count: page.count,
        next,
        previous,
        results: ApiFeatureCollection::new(features),
    })
}

async fn detail(kind: TrailKind, state: &AppState, id: &str) -> HttpResponse {
    let Ok(id) = id.parse::<i64>() else {
        return not_found();
    };

    match state.reader.get_trail(kind, id).await {
        Ok(Some(row)) => HttpResponse::Ok().json(ApiFeature::from_row(kind, row)),
        Ok(None) => not_found(),
        Err(e) => server_error(kind, &e),
    }
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiDetail::new("Not found."))
}

fn invalid_page() -> HttpResponse {
    HttpResponse::NotFound().json(ApiDetail::new("Invalid page."))
}

fn server_error(kind: TrailKind, e: &ihike_database::DbError) -> HttpResponse {
    log::error!("Failed to query {kind} trails: {e}");
    HttpResponse::InternalServerError().json(ApiDetail::new("Failed to query trails."))
}

/// Translates listing parameters into a [`TrailQuery`]. Values that do
/// not parse are dropped.
fn build_query(kind: TrailKind, params: &TrailListParams, page_size: u32) -> TrailQuery {
    let mut query = TrailQuery::new(kind, page_size);

    query.external_id = params
        .osm_id
        .as_deref()
        .and_then(|s| s.trim().parse().ok());
    query.external_id_in = parse_list(params.osm_id_in.as_deref());
    query.difficulty = params
        .difficulty
        .as_deref()
        .and_then(|s| s.trim().parse::<Difficulty>().ok());
    query.difficulty_in = parse_list(params.difficulty_in.as_deref());

    let (category, category_in) = params.category_filters(kind);
    query.category = category
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);
    query.category_in = parse_list(category_in);

    query.length_min = params
        .length_min
        .as_deref()
        .and_then(|s| s.parse::<LengthKm>().ok());
    query.length_max = params
        .length_max
        .as_deref()
        .and_then(|s| s.parse::<LengthKm>().ok());
    query.bbox = params.in_bbox.as_deref().and_then(parse_bbox);
    query.ordering = params
        .ordering
        .as_deref()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or_default();

    query
}

/// Parses a comma-separated list, skipping blank and unparseable items.
fn parse_list<T: std::str::FromStr>(s: Option<&str>) -> Vec<T> {
    s.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .filter_map(|item| item.parse().ok())
            .collect()
    })
    .unwrap_or_default()
}

/// Parses a bounding box string `"west,south,east,north"` into a
/// [`BoundingBox`].
fn parse_bbox(s: &str) -> Option<BoundingBox> {
    let parts: Vec<f64> = s.split(',').filter_map(|p| p.trim().parse().ok()).collect();
    if parts.len() == 4 && parts.iter().all(|p| p.is_finite()) {
        Some(BoundingBox::new(parts[0], parts[1], parts[2], parts[3]))
    } else {
        None
    }
}

/// The absolute URL of this request with its `page` parameter replaced,
/// or removed when `page` is `None`.
fn page_url(req: &HttpRequest, page: Option<u64>) -> String {
    let info = req.connection_info();
    let mut pairs: Vec<String> = req
        .query_string()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some("page"))
        .map(ToString::to_string)
        .collect();
    if let Some(page) = page {
        pairs.push(format!("page={page}"));
    }

    let mut url = format!("{}://{}{}", info.scheme(), info.host(), req.path());
    if !pairs.is_empty() {
        url.push('?');
        url.push_str(&pairs.join("&"));
    }
    url
}
