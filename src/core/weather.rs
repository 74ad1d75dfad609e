//! Weather abstractions and date-based report selection.

use crate::core::itinerary::City;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Conditions as delivered by the feed; values are kept as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherData {
    pub temp: String,
    pub text: String,
    pub icon: String,
    pub humidity: String,
    pub wind_dir: String,
    pub wind_scale: String,
}

/// One day of a forecast. `weather.temp` is `"min~max"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub weather: WeatherData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    #[serde(flatten)]
    pub weather: WeatherData,
    pub is_forecast: bool,
}

impl WeatherReport {
    pub fn current(weather: WeatherData) -> Self {
        Self {
            weather,
            is_forecast: false,
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, city: City) -> Result<WeatherData>;
    /// The upcoming days, today first.
    async fn forecast(&self, city: City) -> Result<Vec<ForecastDay>>;
    async fn at_coordinates(&self, lng: f64, lat: f64) -> Result<WeatherData>;
}

/// Picks the report for `date`: current conditions for today, the forecast
/// entry otherwise, and current conditions again when the forecast does not
/// reach that far (or cannot be fetched).
pub async fn weather_for_date(
    provider: &dyn WeatherProvider,
    city: City,
    date: NaiveDate,
    today: NaiveDate,
) -> Result<WeatherReport> {
    if date != today {
        match provider.forecast(city).await {
            Ok(days) => {
                if let Some(day) = days.into_iter().find(|d| d.date == date) {
                    return Ok(WeatherReport {
                        weather: day.weather,
                        is_forecast: true,
                    });
                }
                debug!(%date, ?city, "Date outside forecast window, using current weather");
            }
            Err(e) => warn!(error = %e, ?city, "Forecast unavailable, using current weather"),
        }
    }
    provider.current(city).await.map(WeatherReport::current)
}
