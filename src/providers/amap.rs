use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::config::require;
use crate::core::places::{Coordinates, PlaceName, PlacesProvider, Restaurant};
use crate::providers::util::{ensure_success, trim_base};

/// POI type code for food and beverage.
const RESTAURANT_TYPES: &str = "050000";
const SEARCH_PAGE_SIZE: &str = "10";

pub struct AmapProvider {
    base_url: String,
    key: Option<String>,
    client: reqwest::Client,
}

/// AMap reports missing text fields as `[]`; only non-empty strings count.
fn text(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn text_or_empty(value: Option<&Value>) -> String {
    text(value).unwrap_or_default().to_string()
}

/// Reduces a `regeocode` object to the header's place name. The short name
/// is the most specific of street, neighborhood, building, township,
/// district, city and province.
fn place_name(regeocode: &Value) -> PlaceName {
    let addr = &regeocode["addressComponent"];
    let district = text(addr.get("district"));
    let city = text(addr.get("city"));
    let province = text(addr.get("province"));

    let short_name = [
        text(addr["streetNumber"].get("street")),
        text(addr["neighborhood"].get("name")),
        text(addr["building"].get("name")),
        text(addr.get("township")),
        district,
        city,
        province,
    ]
    .into_iter()
    .flatten()
    .next()
    .unwrap_or_default();

    PlaceName {
        short_name: short_name.to_string(),
        district: district.unwrap_or_default().to_string(),
        city: city.or(province).unwrap_or_default().to_string(),
        full_address: text_or_empty(regeocode.get("formatted_address")),
    }
}

/// Maps one POI. Keyword results carry no distance and report `"0"`.
fn restaurant(poi: &Value) -> Restaurant {
    let (lng, lat) = text(poi.get("location"))
        .and_then(|l| l.split_once(','))
        .map(|(lng, lat)| {
            (
                lng.trim().parse().unwrap_or(0.0),
                lat.trim().parse().unwrap_or(0.0),
            )
        })
        .unwrap_or((0.0, 0.0));

    Restaurant {
        id: text_or_empty(poi.get("id")),
        name: text_or_empty(poi.get("name")),
        kind: text_or_empty(poi.get("type")),
        address: text_or_empty(poi.get("address")),
        tel: text_or_empty(poi.get("tel")),
        distance: text(poi.get("distance")).unwrap_or("0").to_string(),
        rating: text_or_empty(poi["biz_ext"].get("rating")),
        location: Coordinates { lng, lat },
    }
}

impl AmapProvider {
    pub fn new(base_url: &str, key: Option<String>, client: reqwest::Client) -> Self {
        AmapProvider {
            base_url: trim_base(base_url),
            key,
            client,
        }
    }

    /// Calls an endpoint and returns the body once `status` is `"1"`.
    async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value> {
        let key = require(&self.key, "AMAP_WEB_KEY")?;
        let mut query = vec![("key", key)];
        query.extend_from_slice(params);
        let url =
            reqwest::Url::parse_with_params(&format!("{}{}", self.base_url, endpoint), &query)?;
        debug!("Requesting {} with {:?}", endpoint, params);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for endpoint: {}", e, endpoint))?;
        let text = ensure_success(response, "AMap API")?.text().await?;
        let data: Value = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", endpoint, e))?;

        if data["status"].as_str() != Some("1") {
            return Err(anyhow!(
                "AMap API error: {}",
                data["info"].as_str().unwrap_or("unknown")
            ));
        }
        Ok(data)
    }

    async fn pois(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Vec<Restaurant>> {
        let data = self.get(endpoint, params).await?;
        let pois = data["pois"].as_array().map(Vec::as_slice).unwrap_or_default();
        Ok(pois.iter().map(restaurant).collect())
    }
}

#[async_trait]
impl PlacesProvider for AmapProvider {
    #[instrument(name = "AmapRegeo", skip(self))]
    async fn reverse_geocode(&self, lng: f64, lat: f64) -> Result<PlaceName> {
        let location = format!("{lng},{lat}");
        let data = self
            .get(
                "/v3/geocode/regeo",
                &[("location", location.as_str()), ("extensions", "base")],
            )
            .await?;
        let regeocode = data
            .get("regeocode")
            .filter(|r| r.is_object())
            .ok_or_else(|| anyhow!("Geocoding failed for location: {}", location))?;
        Ok(place_name(regeocode))
    }

    #[instrument(name = "AmapNearby", skip(self))]
    async fn nearby_restaurants(
        &self,
        lng: f64,
        lat: f64,
        radius: u32,
        limit: u32,
    ) -> Result<Vec<Restaurant>> {
        let location = format!("{lng},{lat}");
        let radius = radius.to_string();
        let limit = limit.to_string();
        self.pois(
            "/v3/place/around",
            &[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("types", RESTAURANT_TYPES),
                ("offset", limit.as_str()),
                ("extensions", "all"),
                ("sortrule", "weight"),
            ],
        )
        .await
    }

    #[instrument(name = "AmapSearch", skip(self))]
    async fn search(&self, keyword: &str, city: &str) -> Result<Vec<Restaurant>> {
        self.pois(
            "/v3/place/text",
            &[
                ("keywords", keyword),
                ("city", city),
                ("offset", SEARCH_PAGE_SIZE),
                ("extensions", "all"),
            ],
        )
        .await
    }
}
