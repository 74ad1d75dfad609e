use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;

use super::AppState;
use super::error::{ApiError, ApiResult};
use crate::core::itinerary::{Activity, Attraction, Flight, Itinerary, TravelInfo};
use crate::core::schedule::{DaySchedule, select_default_day};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DayQuery {
    day_id: Option<String>,
}

impl DayQuery {
    fn day_id(&self) -> Option<&str> {
        self.day_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

async fn sorted_days(state: &AppState) -> ApiResult<Vec<Itinerary>> {
    let mut days = state.store.itineraries().await?;
    days.sort_by_key(|d| d.day_number);
    Ok(days)
}

async fn list_itineraries(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Itinerary>>> {
    Ok(Json(sorted_days(&state).await?))
}

async fn get_today(State(state): State<Arc<AppState>>) -> ApiResult<Json<Option<Itinerary>>> {
    let days = sorted_days(&state).await?;
    Ok(Json(select_default_day(&days, state.clock.today()).cloned()))
}

async fn list_activities(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DayQuery>,
) -> ApiResult<Json<Vec<Activity>>> {
    Ok(Json(state.store.activities(q.day_id()).await?))
}

/// Statuses are recomputed from the clock on every call; clients poll at
/// `refreshSeconds`. Without `dayId` the default day is used.
async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DayQuery>,
) -> ApiResult<Json<DaySchedule>> {
    let days = sorted_days(&state).await?;
    let day = match q.day_id() {
        Some(id) => days
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown day: {id}")))?,
        None => select_default_day(&days, state.clock.today())
            .ok_or_else(|| ApiError::BadRequest("No itinerary days available".to_string()))?,
    }
    .clone();

    let activities = state.store.activities(Some(&day.id)).await?;
    Ok(Json(DaySchedule::resolve(
        day,
        activities,
        state.clock.local_now(),
    )))
}

async fn list_flights(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Flight>>> {
    Ok(Json(state.store.flights().await?))
}

async fn list_attractions(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Attraction>>> {
    Ok(Json(state.store.attractions().await?))
}

async fn list_travel_info(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<TravelInfo>>> {
    Ok(Json(state.store.travel_info().await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/itinerary", get(list_itineraries))
        .route("/itinerary/today", get(get_today))
        .route("/activities", get(list_activities))
        .route("/schedule", get(get_schedule))
        .route("/flights", get(list_flights))
        .route("/attractions", get(list_attractions))
        .route("/travelinfo", get(list_travel_info))
}
