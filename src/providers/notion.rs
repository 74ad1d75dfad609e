//! Trip content read from Notion databases.
//!
//! Each record type lives in its own database. Pages are mapped property by
//! property; a missing or differently typed property reads as an empty value
//! rather than failing the whole list.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use crate::core::config::{NotionDatabases, require};
use crate::core::itinerary::{
    Activity, ActivityType, Attraction, AttractionType, City, Flight, InfoCategory, Itinerary,
    ItineraryStore, TravelInfo,
};
use crate::providers::util::{ensure_success, trim_base};

pub struct NotionStore {
    base_url: String,
    version: String,
    token: Option<String>,
    databases: NotionDatabases,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<Page>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page {
    id: String,
    #[serde(default)]
    properties: Properties,
}

/// Typed readers over a page's property bag.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
struct Properties(Map<String, Value>);

impl Properties {
    /// The property's payload when it exists with the expected `type`.
    fn typed(&self, name: &str, kind: &str) -> Option<&Value> {
        let prop = self.0.get(name)?;
        if prop.get("type")?.as_str()? != kind {
            return None;
        }
        prop.get(kind).filter(|v| !v.is_null())
    }

    /// Title or rich text, plain text segments joined.
    fn text(&self, name: &str) -> String {
        let segments = self
            .typed(name, "title")
            .or_else(|| self.typed(name, "rich_text"))
            .and_then(Value::as_array);
        segments
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("plain_text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn number(&self, name: &str) -> f64 {
        self.typed(name, "number")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }

    fn order(&self) -> i64 {
        self.number("Order") as i64
    }

    fn select(&self, name: &str) -> String {
        self.typed(name, "select")
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn multi_select(&self, name: &str) -> Vec<String> {
        self.typed(name, "multi_select")
            .and_then(Value::as_array)
            .map(|options| {
                options
                    .iter()
                    .filter_map(|o| o.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Start of a date property. Date-times keep only their date part.
    fn date(&self, name: &str) -> Option<NaiveDate> {
        let start = self.typed(name, "date")?.get("start")?.as_str()?;
        NaiveDate::parse_from_str(start.get(..10)?, "%Y-%m-%d").ok()
    }

    fn checkbox(&self, name: &str) -> bool {
        self.typed(name, "checkbox")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn relation(&self, name: &str) -> Vec<String> {
        self.typed(name, "relation")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(|r| r.get("id").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn sort_by(property: &str) -> Value {
    json!({ "sorts": [{ "property": property, "direction": "ascending" }] })
}

fn to_itinerary(page: Page) -> Itinerary {
    let p = &page.properties;
    Itinerary {
        name: p.text("Name"),
        date: p.date("Date"),
        day_number: p.number("DayNumber").max(0.0) as u32,
        city: City::from(p.select("City").as_str()),
        id: page.id,
    }
}

fn to_activity(page: Page) -> Activity {
    let p = &page.properties;
    let mut activity = Activity::new(&page.id, &p.text("Name"), &p.text("Time"));
    activity.day_id = p.relation("Day").into_iter().next().unwrap_or_default();
    activity.kind = ActivityType::from(p.select("Type").as_str());
    activity.location = p.text("Location");
    activity.coordinates = p.text("Coordinates");
    activity.description = p.text("Description");
    activity.tips = p.text("Tips");
    activity.must_eat = p.multi_select("MustEat");
    activity.must_buy = p.multi_select("MustBuy");
    activity.price = p.text("Price");
    activity.order = p.order();
    activity
}

fn to_flight(page: Page) -> Flight {
    let p = &page.properties;
    Flight {
        name: p.text("Name"),
        flight_no: p.text("FlightNo"),
        date: p.text("Date"),
        departure_airport: p.text("DepartureAirport"),
        arrival_airport: p.text("ArrivalAirport"),
        departure_time: p.text("DepartureTime"),
        arrival_time: p.text("ArrivalTime"),
        check_in_counter: p.text("CheckInCounter"),
        gate: p.text("Gate"),
        seat: p.text("Seat"),
        baggage_allowance: p.text("BaggageAllowance"),
        booking_ref: p.text("BookingRef"),
        notes: p.text("Notes"),
        order: p.order(),
        id: page.id,
    }
}

/// The attractions database only distinguishes Shenzhen; everything else
/// is filed under Hong Kong.
fn attraction_city(label: &str) -> City {
    match label.trim() {
        "深圳" => City::Shenzhen,
        _ => City::Hongkong,
    }
}

fn to_attraction(page: Page) -> Attraction {
    let p = &page.properties;
    Attraction {
        name: p.text("Name"),
        city: attraction_city(&p.select("City")),
        kind: AttractionType::from(p.select("Type").as_str()),
        description: p.text("Description"),
        tips: p.text("Tips"),
        highlight: p.text("Highlight"),
        must_buy: p.multi_select("MustBuy"),
        order: p.order(),
        id: page.id,
    }
}

/// Travel info without a recognised city applies to the whole trip.
fn info_city(label: &str) -> Option<City> {
    match label.trim() {
        "深圳" => Some(City::Shenzhen),
        "香港" => Some(City::Hongkong),
        _ => None,
    }
}

fn to_travel_info(page: Page) -> TravelInfo {
    let p = &page.properties;
    TravelInfo {
        name: p.text("Name"),
        category: InfoCategory::from(p.select("Category").as_str()),
        content: p.text("Content"),
        sub_content: p.text("SubContent"),
        city: info_city(&p.select("City")),
        date_range: p.text("DateRange"),
        phone: p.text("Phone"),
        important: p.checkbox("Important"),
        order: p.order(),
        id: page.id,
    }
}

impl NotionStore {
    pub fn new(
        base_url: &str,
        version: &str,
        token: Option<String>,
        databases: NotionDatabases,
        client: reqwest::Client,
    ) -> Self {
        NotionStore {
            base_url: trim_base(base_url),
            version: version.to_string(),
            token,
            databases,
            client,
        }
    }

    /// Runs a database query, following pagination until exhausted.
    async fn query(
        &self,
        database: &Option<String>,
        name: &'static str,
        body: Value,
    ) -> Result<Vec<Page>> {
        let token = require(&self.token, "NOTION_TOKEN")?;
        let database_id = require(database, name)?;
        let url = format!("{}/v1/databases/{}/query", self.base_url, database_id);

        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut request = body.clone();
            if let (Some(c), Some(obj)) = (&cursor, request.as_object_mut()) {
                obj.insert("start_cursor".to_string(), json!(c));
            }
            debug!("Querying Notion database {} (cursor: {:?})", database_id, cursor);

            let response = self
                .client
                .post(&url)
                .bearer_auth(token)
                .header("Notion-Version", &self.version)
                .json(&request)
                .send()
                .await
                .map_err(|e| anyhow!("Request error: {} for database: {}", e, name))?;
            let text = ensure_success(response, "Notion API")?.text().await?;
            let data: QueryResponse = serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse Notion response for {name}"))?;

            pages.extend(data.results);
            match data.next_cursor {
                Some(next) if data.has_more => cursor = Some(next),
                _ => break,
            }
        }
        debug!("Fetched {} pages from {}", pages.len(), name);
        Ok(pages)
    }
}

#[async_trait]
impl ItineraryStore for NotionStore {
    #[instrument(name = "NotionItineraries", skip(self))]
    async fn itineraries(&self) -> Result<Vec<Itinerary>> {
        let pages = self
            .query(
                &self.databases.itinerary,
                "NOTION_ITINERARY_DB",
                sort_by("DayNumber"),
            )
            .await?;
        Ok(pages.into_iter().map(to_itinerary).collect())
    }

    #[instrument(name = "NotionActivities", skip(self))]
    async fn activities(&self, day_id: Option<&str>) -> Result<Vec<Activity>> {
        let mut body = sort_by("Order");
        if let Some(day_id) = day_id {
            body["filter"] = json!({ "property": "Day", "relation": { "contains": day_id } });
        }
        let pages = self
            .query(&self.databases.activities, "NOTION_ACTIVITIES_DB", body)
            .await?;
        Ok(pages.into_iter().map(to_activity).collect())
    }

    #[instrument(name = "NotionFlights", skip(self))]
    async fn flights(&self) -> Result<Vec<Flight>> {
        let pages = self
            .query(&self.databases.flights, "NOTION_FLIGHTS_DB", sort_by("Order"))
            .await?;
        Ok(pages.into_iter().map(to_flight).collect())
    }

    #[instrument(name = "NotionAttractions", skip(self))]
    async fn attractions(&self) -> Result<Vec<Attraction>> {
        let pages = self
            .query(
                &self.databases.attractions,
                "NOTION_ATTRACTIONS_DB",
                sort_by("Order"),
            )
            .await?;
        Ok(pages.into_iter().map(to_attraction).collect())
    }

    #[instrument(name = "NotionTravelInfo", skip(self))]
    async fn travel_info(&self) -> Result<Vec<TravelInfo>> {
        let pages = self
            .query(
                &self.databases.travel_info,
                "NOTION_TRAVELINFO_DB",
                sort_by("Order"),
            )
            .await?;
        Ok(pages.into_iter().map(to_travel_info).collect())
    }
}
