use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::{ApiError, ApiResult, parse_param, present, required};
use crate::core::places::{
    Coordinates, NavigationLinks, PlaceName, Restaurant, map_link, navigation_links,
};

const DEFAULT_RADIUS: u32 = 1000;
const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug, Deserialize)]
struct CoordinateQuery {
    lng: Option<String>,
    lat: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RestaurantQuery {
    lng: Option<String>,
    lat: Option<String>,
    keyword: Option<String>,
    city: Option<String>,
    radius: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NavigationQuery {
    lng: Option<String>,
    lat: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct Navigation {
    #[serde(flatten)]
    links: NavigationLinks,
    marker: String,
}

fn or_default(value: &Option<String>, name: &str, default: u32) -> ApiResult<u32> {
    present(value).map_or(Ok(default), |v| parse_param(v, name))
}

async fn get_place_name(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CoordinateQuery>,
) -> ApiResult<Json<PlaceName>> {
    let lng: f64 = parse_param(required(&q.lng, "lng")?, "lng")?;
    let lat: f64 = parse_param(required(&q.lat, "lat")?, "lat")?;
    Ok(Json(state.places.reverse_geocode(lng, lat).await?))
}

/// A keyword search takes precedence over a nearby search.
async fn list_restaurants(
    State(state): State<Arc<AppState>>,
    Query(q): Query<RestaurantQuery>,
) -> ApiResult<Json<Vec<Restaurant>>> {
    if let Some(keyword) = present(&q.keyword) {
        let city = present(&q.city).unwrap_or_default();
        return Ok(Json(state.places.search(keyword, city).await?));
    }

    let (Some(lng), Some(lat)) = (present(&q.lng), present(&q.lat)) else {
        return Err(ApiError::BadRequest(
            "Coordinates or keyword required".to_string(),
        ));
    };
    let lng: f64 = parse_param(lng, "lng")?;
    let lat: f64 = parse_param(lat, "lat")?;
    let radius = or_default(&q.radius, "radius", DEFAULT_RADIUS)?;
    let limit = or_default(&q.limit, "limit", DEFAULT_LIMIT)?;

    Ok(Json(
        state
            .places
            .nearby_restaurants(lng, lat, radius, limit)
            .await?,
    ))
}

async fn get_navigation(Query(q): Query<NavigationQuery>) -> ApiResult<Json<Navigation>> {
    let dest = Coordinates {
        lng: parse_param(required(&q.lng, "lng")?, "lng")?,
        lat: parse_param(required(&q.lat, "lat")?, "lat")?,
    };
    let name = present(&q.name).unwrap_or_default();
    Ok(Json(Navigation {
        links: navigation_links(dest, name),
        marker: map_link(dest, name),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/geocode", get(get_place_name))
        .route("/restaurants", get(list_restaurants))
        .route("/navigation", get(get_navigation))
}
