//! Points of interest, reverse geocoding and map deep links.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lng: f64,
    pub lat: f64,
}

/// Parses the content store's `"lng,lat"` text. Anything malformed or out of
/// range is `None`.
pub fn parse_coordinates(text: &str) -> Option<Coordinates> {
    let (lng, lat) = text.split_once(',')?;
    let lng: f64 = lng.trim().parse().ok()?;
    let lat: f64 = lat.trim().parse().ok()?;
    let in_range = (-180.0..=180.0).contains(&lng) && (-90.0..=90.0).contains(&lat);
    in_range.then_some(Coordinates { lng, lat })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub address: String,
    pub tel: String,
    /// Metres from the search centre; `"0"` for keyword searches.
    pub distance: String,
    pub rating: String,
    pub location: Coordinates,
}

/// A reverse-geocoded position reduced to what the header shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceName {
    pub short_name: String,
    pub district: String,
    pub city: String,
    pub full_address: String,
}

#[async_trait]
pub trait PlacesProvider: Send + Sync {
    async fn reverse_geocode(&self, lng: f64, lat: f64) -> Result<PlaceName>;
    async fn nearby_restaurants(
        &self,
        lng: f64,
        lat: f64,
        radius: u32,
        limit: u32,
    ) -> Result<Vec<Restaurant>>;
    async fn search(&self, keyword: &str, city: &str) -> Result<Vec<Restaurant>>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationLinks {
    pub amap: String,
    pub google: String,
    pub apple: String,
}

/// Transit directions to a destination in the three map apps.
pub fn navigation_links(dest: Coordinates, name: &str) -> NavigationLinks {
    let Coordinates { lng, lat } = dest;
    NavigationLinks {
        amap: format!(
            "https://uri.amap.com/navigation?to={lng},{lat},{}&mode=bus&coordinate=gaode",
            urlencoding::encode(name)
        ),
        google: format!(
            "https://www.google.com/maps/dir/?api=1&destination={lat},{lng}&travelmode=transit"
        ),
        apple: format!("https://maps.apple.com/?daddr={lat},{lng}&dirflg=r"),
    }
}

pub fn map_link(at: Coordinates, name: &str) -> String {
    format!(
        "https://uri.amap.com/marker?position={},{}&name={}",
        at.lng,
        at.lat,
        urlencoding::encode(name)
    )
}
