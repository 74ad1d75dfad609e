use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::cache::Cache;
use crate::core::config::require;
use crate::core::itinerary::City;
use crate::core::weather::{ForecastDay, WeatherData, WeatherProvider};
use crate::providers::util::{ensure_success, trim_base};

const CURRENT_TTL: Duration = Duration::from_secs(30 * 60);
const FORECAST_TTL: Duration = Duration::from_secs(60 * 60);

pub struct QWeatherProvider {
    base_url: String,
    key: Option<String>,
    client: reqwest::Client,
    current_cache: Arc<dyn Cache<String, WeatherData>>,
    forecast_cache: Arc<dyn Cache<String, Vec<ForecastDay>>>,
}

impl QWeatherProvider {
    pub fn new(
        base_url: &str,
        key: Option<String>,
        client: reqwest::Client,
        current_cache: Arc<dyn Cache<String, WeatherData>>,
        forecast_cache: Arc<dyn Cache<String, Vec<ForecastDay>>>,
    ) -> Self {
        QWeatherProvider {
            base_url: trim_base(base_url),
            key,
            client,
            current_cache,
            forecast_cache,
        }
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, location: &str) -> Result<T> {
        let key = require(&self.key, "QWEATHER_KEY")?;
        let url = reqwest::Url::parse_with_params(
            &format!("{}{}", self.base_url, endpoint),
            &[("location", location), ("key", key)],
        )?;
        debug!("Requesting weather from {}{}?location={}", self.base_url, endpoint, location);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for weather location: {}", e, location))?;
        let text = ensure_success(response, "Weather API")?.text().await?;

        serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", location, e))
    }

    async fn now_at(&self, location: String) -> Result<WeatherData> {
        if let Some(cached) = self.current_cache.get(&location).await {
            return Ok(cached);
        }

        let data: NowResponse = self.get("/v7/weather/now", &location).await?;
        check_code(&data.code)?;
        let now = data
            .now
            .ok_or_else(|| anyhow!("No current weather for location: {}", location))?;
        let weather = WeatherData::from(now);

        self.current_cache
            .put(location, weather.clone(), Some(CURRENT_TTL))
            .await;
        Ok(weather)
    }
}

fn check_code(code: &str) -> Result<()> {
    if code != "200" {
        return Err(anyhow!("Weather API error code: {}", code));
    }
    Ok(())
}

/// `"lng,lat"` at the two-decimal precision the feed expects.
fn coordinate_location(lng: f64, lat: f64) -> String {
    format!("{lng:.2},{lat:.2}")
}

#[derive(Debug, Deserialize)]
struct NowResponse {
    code: String,
    now: Option<NowItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NowItem {
    temp: String,
    text: String,
    icon: String,
    humidity: String,
    wind_dir: String,
    wind_scale: String,
}

impl From<NowItem> for WeatherData {
    fn from(item: NowItem) -> Self {
        WeatherData {
            temp: item.temp,
            text: item.text,
            icon: item.icon,
            humidity: item.humidity,
            wind_dir: item.wind_dir,
            wind_scale: item.wind_scale,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    code: String,
    #[serde(default)]
    daily: Vec<DailyItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyItem {
    fx_date: NaiveDate,
    temp_max: String,
    temp_min: String,
    text_day: String,
    icon_day: String,
    humidity: String,
    wind_dir_day: String,
    wind_scale_day: String,
}

impl From<DailyItem> for ForecastDay {
    fn from(item: DailyItem) -> Self {
        ForecastDay {
            date: item.fx_date,
            weather: WeatherData {
                temp: format!("{}~{}", item.temp_min, item.temp_max),
                text: item.text_day,
                icon: item.icon_day,
                humidity: item.humidity,
                wind_dir: item.wind_dir_day,
                wind_scale: item.wind_scale_day,
            },
        }
    }
}

#[async_trait]
impl WeatherProvider for QWeatherProvider {
    #[instrument(name = "WeatherNowFetch", skip(self))]
    async fn current(&self, city: City) -> Result<WeatherData> {
        self.now_at(city.location_id().to_string()).await
    }

    #[instrument(name = "WeatherForecastFetch", skip(self))]
    async fn forecast(&self, city: City) -> Result<Vec<ForecastDay>> {
        let location = city.location_id().to_string();
        if let Some(cached) = self.forecast_cache.get(&location).await {
            return Ok(cached);
        }

        let data: DailyResponse = self.get("/v7/weather/7d", &location).await?;
        check_code(&data.code)?;
        let days: Vec<ForecastDay> = data.daily.into_iter().map(ForecastDay::from).collect();

        self.forecast_cache
            .put(location, days.clone(), Some(FORECAST_TTL))
            .await;
        Ok(days)
    }

    #[instrument(name = "WeatherCoordsFetch", skip(self))]
    async fn at_coordinates(&self, lng: f64, lat: f64) -> Result<WeatherData> {
        self.now_at(coordinate_location(lng, lat)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ConfigError;
    use crate::providers::util::http_client;
    use crate::store::MemoryCache;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const NOW_BODY: &str = r#"{
        "code": "200",
        "updateTime": "2026-01-29T09:00+08:00",
        "now": {
            "obsTime": "2026-01-29T08:50+08:00",
            "temp": "19",
            "feelsLike": "18",
            "icon": "101",
            "text": "多雲",
            "windDir": "東北風",
            "windScale": "3",
            "humidity": "72"
        }
    }"#;

    const DAILY_BODY: &str = r#"{
        "code": "200",
        "daily": [
            {"fxDate": "2026-01-29", "tempMax": "22", "tempMin": "16", "iconDay": "100",
             "textDay": "晴", "windDirDay": "東風", "windScaleDay": "1-3", "humidity": "65"},
            {"fxDate": "2026-01-30", "tempMax": "20", "tempMin": "15", "iconDay": "305",
             "textDay": "小雨", "windDirDay": "北風", "windScaleDay": "3-4", "humidity": "88"}
        ]
    }"#;

    fn provider(base_url: &str, key: Option<&str>) -> QWeatherProvider {
        QWeatherProvider::new(
            base_url,
            key.map(str::to_string),
            http_client(Duration::from_secs(2)).unwrap(),
            Arc::new(MemoryCache::new()),
            Arc::new(MemoryCache::new()),
        )
    }

    #[tokio::test]
    async fn test_current_weather_for_city() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v7/weather/now"))
            .and(query_param("location", "101320101"))
            .and(query_param("key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string(NOW_BODY))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server.uri(), Some("secret"));
        let weather = provider.current(City::Hongkong).await.unwrap();
        assert_eq!(weather.temp, "19");
        assert_eq!(weather.text, "多雲");
        assert_eq!(weather.wind_dir, "東北風");
        assert_eq!(weather.humidity, "72");

        // Served from cache the second time.
        let again = provider.current(City::Hongkong).await.unwrap();
        assert_eq!(again, weather);
    }

    #[tokio::test]
    async fn test_forecast_maps_daily_entries() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v7/weather/7d"))
            .and(query_param("location", "101280601"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DAILY_BODY))
            .mount(&mock_server)
            .await;

        let days = provider(&mock_server.uri(), Some("secret"))
            .forecast(City::Shenzhen)
            .await
            .unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[1].date, NaiveDate::from_ymd_opt(2026, 1, 30).unwrap());
        assert_eq!(days[1].weather.temp, "15~20");
        assert_eq!(days[1].weather.text, "小雨");
        assert_eq!(days[1].weather.wind_scale, "3-4");
    }

    #[tokio::test]
    async fn test_coordinates_use_two_decimals() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v7/weather/now"))
            .and(query_param("location", "114.17,22.32"))
            .respond_with(ResponseTemplate::new(200).set_body_string(NOW_BODY))
            .mount(&mock_server)
            .await;

        let weather = provider(&mock_server.uri(), Some("secret"))
            .at_coordinates(114.1694, 22.3193)
            .await
            .unwrap();
        assert_eq!(weather.icon, "101");
    }

    #[tokio::test]
    async fn test_non_200_code_is_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v7/weather/now"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"code":"401"}"#))
            .mount(&mock_server)
            .await;

        let err = provider(&mock_server.uri(), Some("bad"))
            .current(City::Taipei)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Weather API error code: 401");
    }

    #[tokio::test]
    async fn test_http_error_is_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server.uri(), Some("secret"))
            .forecast(City::Hongkong)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let err = provider("http://127.0.0.1:9", None)
            .current(City::Hongkong)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::Missing("QWEATHER_KEY"))
        );
    }
}
