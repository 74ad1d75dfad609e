//! HTTP surface: one router per area, merged under `/api`.

pub mod error;
mod exchange;
mod itinerary;
mod places;
mod weather;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{Router, http::HeaderValue, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::core::config::{AppConfig, ServerConfig};
use crate::core::{Clock, ExchangeRateProvider, ItineraryStore, PlacesProvider, WeatherProvider};
use crate::providers::util::http_client;
use crate::providers::{AmapProvider, BankOfTaiwanProvider, NotionStore, QWeatherProvider};
use crate::store::MemoryCache;

/// Everything a handler needs, shared across requests.
pub struct AppState {
    pub store: Arc<dyn ItineraryStore>,
    pub rates: Arc<dyn ExchangeRateProvider>,
    pub weather: Arc<dyn WeatherProvider>,
    pub places: Arc<dyn PlacesProvider>,
    pub clock: Arc<dyn Clock>,
}

/// Wires the configured upstreams. Missing secrets are not an error here;
/// the affected routes report them when called.
pub fn build_state(config: &AppConfig) -> Result<Arc<AppState>> {
    let client = http_client(config.http_timeout())?;
    let clock = config.trip.clock()?;
    let providers = &config.providers;

    let notion = &providers.notion;
    let store = NotionStore::new(
        &notion.base_url,
        &notion.version,
        notion.token.clone(),
        notion.databases.clone(),
        client.clone(),
    );

    let bot = &providers.bank_of_taiwan;
    let rates = BankOfTaiwanProvider::new(
        &bot.base_url,
        client.clone(),
        Arc::new(MemoryCache::new()),
        Duration::from_secs(bot.cache_ttl_secs),
        Arc::clone(&clock),
    );

    let weather = QWeatherProvider::new(
        &providers.qweather.base_url,
        providers.qweather.key.clone(),
        client.clone(),
        Arc::new(MemoryCache::new()),
        Arc::new(MemoryCache::new()),
    );

    let places = AmapProvider::new(&providers.amap.base_url, providers.amap.key.clone(), client);

    Ok(Arc::new(AppState {
        store: Arc::new(store),
        rates: Arc::new(rates),
        weather: Arc::new(weather),
        places: Arc::new(places),
        clock,
    }))
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    if server.cors_allow_origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any);
    }
    let origins = server
        .cors_allow_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();
    CorsLayer::new().allow_origin(origins)
}

async fn healthz() -> &'static str {
    "ok"
}

pub fn app_router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    let api = Router::new()
        .merge(itinerary::router())
        .merge(exchange::router())
        .merge(weather::router())
        .merge(places::router());

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api)
        .with_state(state)
        .layer(cors_layer(server))
        .layer(TraceLayer::new_for_http())
}
