//! Trip content records and the read-only store they come from.

use crate::core::schedule::{TimeRange, hhmm};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum City {
    Shenzhen,
    Hongkong,
    Taipei,
}

/// Content-store labels. Unknown labels default to Hong Kong, the city most
/// of the trip is spent in.
impl From<&str> for City {
    fn from(label: &str) -> Self {
        match label.trim() {
            "深圳" | "shenzhen" => City::Shenzhen,
            "台北" | "taipei" => City::Taipei,
            _ => City::Hongkong,
        }
    }
}

impl City {
    /// QWeather location id.
    pub fn location_id(&self) -> &'static str {
        match self {
            City::Shenzhen => "101280601",
            City::Hongkong => "101320101",
            City::Taipei => "101340101",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            City::Shenzhen => "深圳",
            City::Hongkong => "香港",
            City::Taipei => "台北",
        }
    }

    /// City centre as (lng, lat).
    pub fn centre(&self) -> (f64, f64) {
        match self {
            City::Shenzhen => (114.0579, 22.5431),
            City::Hongkong => (114.1694, 22.3193),
            City::Taipei => (121.5654, 25.033),
        }
    }

    /// Strict parse for API parameters, unlike the lenient label mapping.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "shenzhen" => Some(City::Shenzhen),
            "hongkong" => Some(City::Hongkong),
            "taipei" => Some(City::Taipei),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Attraction,
    Transport,
    Food,
    Hotel,
    Shopping,
}

/// Unknown labels default to `Attraction`.
impl From<&str> for ActivityType {
    fn from(label: &str) -> Self {
        match label.trim() {
            "交通" => ActivityType::Transport,
            "餐飲" => ActivityType::Food,
            "住宿" => ActivityType::Hotel,
            "購物" => ActivityType::Shopping,
            _ => ActivityType::Attraction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttractionType {
    Attraction,
    Shopping,
    Restaurant,
}

/// Unknown labels default to `Attraction`.
impl From<&str> for AttractionType {
    fn from(label: &str) -> Self {
        match label.trim() {
            "購物" => AttractionType::Shopping,
            "餐廳" => AttractionType::Restaurant,
            _ => AttractionType::Attraction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoCategory {
    Flight,
    Hotel,
    Emergency,
    Souvenir,
    Notice,
    Clothing,
}

/// Unknown labels default to `Notice`.
impl From<&str> for InfoCategory {
    fn from(label: &str) -> Self {
        match label.trim() {
            "航班" => InfoCategory::Flight,
            "住宿" => InfoCategory::Hotel,
            "緊急聯絡" => InfoCategory::Emergency,
            "伴手禮" => InfoCategory::Souvenir,
            "衣著建議" => InfoCategory::Clothing,
            _ => InfoCategory::Notice,
        }
    }
}

/// One day of the trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    pub id: String,
    pub name: String,
    pub date: Option<NaiveDate>,
    pub day_number: u32,
    pub city: City,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub name: String,
    pub day_id: String,
    /// Free-text time as authored, e.g. `"14:00-16:00"`.
    pub time: String,
    #[serde(with = "hhmm::option", default)]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "hhmm::option", default)]
    pub end_time: Option<NaiveTime>,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub location: String,
    pub coordinates: String,
    pub description: String,
    pub tips: String,
    pub must_eat: Vec<String>,
    pub must_buy: Vec<String>,
    pub price: String,
    pub order: i64,
}

impl Activity {
    /// Builds an activity with only the scheduling fields set; the time
    /// range is derived from `time`.
    pub fn new(id: &str, name: &str, time: &str) -> Self {
        let mut activity = Activity {
            id: id.to_string(),
            name: name.to_string(),
            day_id: String::new(),
            time: String::new(),
            start_time: None,
            end_time: None,
            kind: ActivityType::Attraction,
            location: String::new(),
            coordinates: String::new(),
            description: String::new(),
            tips: String::new(),
            must_eat: Vec::new(),
            must_buy: Vec::new(),
            price: String::new(),
            order: 0,
        };
        activity.set_time(time);
        activity
    }

    /// Replaces the free-text time and re-derives start/end.
    pub fn set_time(&mut self, time: &str) {
        let range = TimeRange::parse(time);
        self.time = time.to_string();
        self.start_time = range.start;
        self.end_time = range.end_time();
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange::parse(&self.time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: String,
    pub name: String,
    pub flight_no: String,
    pub date: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub check_in_counter: String,
    pub gate: String,
    pub seat: String,
    pub baggage_allowance: String,
    pub booking_ref: String,
    pub notes: String,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attraction {
    pub id: String,
    pub name: String,
    pub city: City,
    #[serde(rename = "type")]
    pub kind: AttractionType,
    pub description: String,
    pub tips: String,
    pub highlight: String,
    pub must_buy: Vec<String>,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelInfo {
    pub id: String,
    pub name: String,
    pub category: InfoCategory,
    pub content: String,
    pub sub_content: String,
    /// `None` when the entry applies to the whole trip.
    pub city: Option<City>,
    pub date_range: String,
    pub phone: String,
    pub important: bool,
    pub order: i64,
}

/// Read-only access to the trip content. Every list is returned in the
/// store's display order.
#[async_trait]
pub trait ItineraryStore: Send + Sync {
    async fn itineraries(&self) -> Result<Vec<Itinerary>>;
    /// Activities of one day, or of the whole trip when `day_id` is `None`.
    async fn activities(&self, day_id: Option<&str>) -> Result<Vec<Activity>>;
    async fn flights(&self) -> Result<Vec<Flight>>;
    async fn attractions(&self) -> Result<Vec<Attraction>>;
    async fn travel_info(&self) -> Result<Vec<TravelInfo>>;
}
