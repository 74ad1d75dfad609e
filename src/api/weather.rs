use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::AppState;
use super::error::{ApiError, ApiResult, parse_param, present};
use crate::core::itinerary::City;
use crate::core::weather::{WeatherReport, weather_for_date};

#[derive(Debug, Deserialize)]
struct WeatherQuery {
    city: Option<String>,
    date: Option<String>,
    lng: Option<String>,
    lat: Option<String>,
}

/// Coordinates win over `city`. Unknown city keys fall back to Hong Kong.
async fn get_weather(
    State(state): State<Arc<AppState>>,
    Query(q): Query<WeatherQuery>,
) -> ApiResult<Json<WeatherReport>> {
    if let (Some(lng), Some(lat)) = (present(&q.lng), present(&q.lat)) {
        let lng: f64 = parse_param(lng, "lng")?;
        let lat: f64 = parse_param(lat, "lat")?;
        let weather = state.weather.at_coordinates(lng, lat).await?;
        return Ok(Json(WeatherReport::current(weather)));
    }

    let city = present(&q.city)
        .ok_or_else(|| ApiError::BadRequest("City or coordinates required".to_string()))?;
    let city = City::from_key(city).unwrap_or(City::Hongkong);

    let report = match present(&q.date) {
        Some(date) => {
            let date: NaiveDate = parse_param(date, "date")?;
            weather_for_date(state.weather.as_ref(), city, date, state.clock.today()).await?
        }
        None => WeatherReport::current(state.weather.current(city).await?),
    };
    Ok(Json(report))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/weather", get(get_weather))
}
