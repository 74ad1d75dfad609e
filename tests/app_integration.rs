use serde_json::{Value, json};
use std::fs;
use std::net::SocketAddr;
use tracing::info;
use tripboard::api::{app_router, build_state};
use tripboard::core::config::AppConfig;

// Adds automatic logging to test
mod test_utils {
    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const RATE_FEED: &str = "\
幣別,匯率,現金,即期,遠期10天,遠期30天,遠期60天,遠期90天,遠期120天,遠期150天,遠期180天,匯率,現金,即期,遠期10天,遠期30天,遠期60天,遠期90天,遠期120天,遠期150天,遠期180天
HKD,本行買入,3.86100,3.98200,3.97500,3.96500,3.95400,3.94300,3.93300,3.92300,3.91300,本行賣出,4.06500,4.05200,4.04700,4.03900,4.02900,4.01900,4.01000,4.00100,3.99200
CNY,本行買入,4.19900,4.31700,4.31300,4.30300,4.29200,4.28200,4.27200,4.26300,4.25400,本行賣出,4.36100,4.38700,4.38600,4.37800,4.36800,4.35800,4.34900,4.34100,4.33200
";

    fn page(id: &str, properties: Value) -> Value {
        json!({ "id": id, "properties": properties })
    }

    fn activity(id: &str, name: &str, time: &str, order: f64) -> Value {
        page(
            id,
            json!({
                "Name": { "type": "title", "title": [{ "plain_text": name }] },
                "Day": { "type": "relation", "relation": [{ "id": "day-2" }] },
                "Time": { "type": "rich_text", "rich_text": [{ "plain_text": time }] },
                "Order": { "type": "number", "number": order }
            }),
        )
    }

    /// One mock server standing in for every upstream.
    pub async fn create_mock_server() -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/databases/db-days/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    page("day-2", json!({
                        "Name": { "type": "title", "title": [{ "plain_text": "香港" }] },
                        "Date": { "type": "date", "date": { "start": "2026-01-29" } },
                        "DayNumber": { "type": "number", "number": 2 },
                        "City": { "type": "select", "select": { "name": "香港" } }
                    })),
                    page("day-1", json!({
                        "Name": { "type": "title", "title": [{ "plain_text": "深圳" }] },
                        "Date": { "type": "date", "date": { "start": "2026-01-28" } },
                        "DayNumber": { "type": "number", "number": 1 },
                        "City": { "type": "select", "select": { "name": "深圳" } }
                    }))
                ],
                "has_more": false,
                "next_cursor": null
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/databases/db-acts/query"))
            .and(body_partial_json(json!({
                "filter": { "property": "Day", "relation": { "contains": "day-2" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    activity("act-1", "Breakfast", "08:00", 1.0),
                    activity("act-2", "Victoria Peak", "14:00-16:30", 2.0),
                    activity("act-3", "Temple Street", "18:30", 3.0),
                    activity("act-4", "Free time", "TBD", 4.0)
                ],
                "has_more": false,
                "next_cursor": null
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/xrt/flcsv/0/day"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RATE_FEED))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v3/place/around"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "1",
                "pois": [{
                    "id": "B001", "name": "蓮香樓", "type": "餐飲服務",
                    "address": [], "tel": "25444556", "distance": "120",
                    "location": "114.152,22.285", "biz_ext": { "rating": "4.5" }
                }]
            })))
            .mount(&mock_server)
            .await;

        mock_server
    }
}

/// Writes a config pointing every upstream at `upstream`, without a weather
/// key, and pins the clock to 14:30 on day 2.
fn write_config(upstream: &str) -> tempfile::NamedTempFile {
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_content = format!(
        r#"
        server:
          listen_addr: "127.0.0.1:0"
        trip:
          utc_offset_hours: 8
          fixed_now: "2026-01-29T14:30:00"
        http_timeout_secs: 5
        providers:
          notion:
            base_url: "{upstream}"
            token: "secret"
            databases:
              itinerary: "db-days"
              activities: "db-acts"
          bank_of_taiwan:
            base_url: "{upstream}"
          qweather:
            base_url: "{upstream}"
          amap:
            base_url: "{upstream}"
            key: "amap-key"
    "#
    );
    fs::write(config_file.path(), &config_content).expect("Failed to write config file");
    config_file
}

async fn spawn_app(upstream: &str) -> SocketAddr {
    let config_file = write_config(upstream);
    let config = AppConfig::load_from_path(config_file.path()).expect("Failed to load config");

    let state = build_state(&config).expect("Failed to build state");
    let router = app_router(state, &config.server);
    let listener = tokio::net::TcpListener::bind(config.server.listen_addr)
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    info!(%addr, "Test server started");
    addr
}

async fn get(addr: SocketAddr, path_and_query: &str) -> (u16, Value) {
    let response = reqwest::get(format!("http://{addr}{path_and_query}"))
        .await
        .expect("Request failed");
    let status = response.status().as_u16();
    let body = response.json::<Value>().await.expect("Body is not JSON");
    (status, body)
}

#[test_log::test(tokio::test)]
async fn test_health_check() {
    let mock_server = test_utils::create_mock_server().await;
    let addr = spawn_app(&mock_server.uri()).await;

    let response = reqwest::get(format!("http://{addr}/healthz")).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[test_log::test(tokio::test)]
async fn test_itinerary_and_today() {
    let mock_server = test_utils::create_mock_server().await;
    let addr = spawn_app(&mock_server.uri()).await;

    let (status, days) = get(addr, "/api/itinerary").await;
    assert_eq!(status, 200);
    assert_eq!(days[0]["id"], "day-1");
    assert_eq!(days[0]["city"], "shenzhen");
    assert_eq!(days[1]["dayNumber"], 2);

    let (status, today) = get(addr, "/api/itinerary/today").await;
    assert_eq!(status, 200);
    assert_eq!(today["id"], "day-2");
    assert_eq!(today["date"], "2026-01-29");
}

#[test_log::test(tokio::test)]
async fn test_schedule_resolves_current_and_next() {
    let mock_server = test_utils::create_mock_server().await;
    let addr = spawn_app(&mock_server.uri()).await;

    let (status, schedule) = get(addr, "/api/schedule?dayId=day-2").await;
    assert_eq!(status, 200);
    assert_eq!(schedule["currentActivityId"], "act-2");
    assert_eq!(schedule["nextActivityId"], "act-3");
    assert_eq!(schedule["refreshSeconds"], 60);

    let statuses: Vec<&str> = schedule["activities"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["none", "current", "next", "none"]);
    assert_eq!(schedule["activities"][1]["startTime"], "14:00");

    // Without dayId the day dated today is used.
    let (status, schedule) = get(addr, "/api/schedule").await;
    assert_eq!(status, 200);
    assert_eq!(schedule["day"]["id"], "day-2");

    let (status, body) = get(addr, "/api/schedule?dayId=nope").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Unknown day: nope");
}

#[test_log::test(tokio::test)]
async fn test_exchange_routes() {
    let mock_server = test_utils::create_mock_server().await;
    let addr = spawn_app(&mock_server.uri()).await;

    let (status, quotes) = get(addr, "/api/exchange").await;
    assert_eq!(status, 200);
    assert_eq!(quotes[0]["currency"], "HKD");
    assert_eq!(quotes[0]["cashSell"], 4.065);
    assert!(quotes[0]["updateTime"].as_str().unwrap().starts_with("2026-01-29T14:30:00"));

    let (status, conversion) =
        get(addr, "/api/exchange/convert?amount=1000&direction=toBase&currency=HKD").await;
    assert_eq!(status, 200);
    assert_eq!(conversion, json!({
        "direction": "toBase", "amount": 1000.0, "currency": "HKD", "result": 4065.0
    }));

    let (status, conversion) =
        get(addr, "/api/exchange/convert?amount=1000&direction=fromBase").await;
    assert_eq!(status, 200);
    assert_eq!(conversion["results"], json!({ "HKD": "246.0", "CNY": "229.3" }));

    let (status, calculation) = get(addr, "/api/exchange/calculate?amount=100&from=HKD&to=CNY").await;
    assert_eq!(status, 200);
    assert_eq!(calculation["result"], 93.21);

    let (status, body) = get(addr, "/api/exchange/convert?direction=toBase").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Missing amount parameter");

    let (status, body) =
        get(addr, "/api/exchange/convert?amount=5&direction=toBase&currency=JPY").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Invalid currency parameter: JPY");
}

#[test_log::test(tokio::test)]
async fn test_places_and_missing_configuration() {
    let mock_server = test_utils::create_mock_server().await;
    let addr = spawn_app(&mock_server.uri()).await;

    let (status, restaurants) = get(addr, "/api/restaurants?lng=114.15&lat=22.28").await;
    assert_eq!(status, 200);
    assert_eq!(restaurants[0]["name"], "蓮香樓");
    assert_eq!(restaurants[0]["address"], "");
    assert_eq!(restaurants[0]["location"]["lng"], 114.152);

    let (status, nav) = get(addr, "/api/navigation?lng=114.17&lat=22.29&name=Star%20Ferry").await;
    assert_eq!(status, 200);
    assert_eq!(nav["apple"], "https://maps.apple.com/?daddr=22.29,114.17&dirflg=r");
    assert_eq!(
        nav["marker"],
        "https://uri.amap.com/marker?position=114.17,22.29&name=Star%20Ferry"
    );

    let (status, body) = get(addr, "/api/restaurants").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Coordinates or keyword required");

    // No weather key is configured.
    let (status, body) = get(addr, "/api/weather?city=hongkong").await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Missing configuration: QWEATHER_KEY");

    let (status, body) = get(addr, "/api/weather").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "City or coordinates required");

    // Flights database id is not configured either.
    let (status, body) = get(addr, "/api/flights").await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Missing configuration: NOTION_FLIGHTS_DB");
}
