mod common;

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

async fn seeded_app() -> (common::TestApp, String) {
    let app = common::spawn_app();
    let (_, token) = app.user("owner@example.com").await;
    let first = app.create_link(&token, "https://example.com/a").await["id"]
        .as_i64()
        .unwrap();
    let second = app.create_link(&token, "https://example.com/b").await["id"]
        .as_i64()
        .unwrap();

    let day = |m, d| Utc.with_ymd_and_hms(2024, m, d, 12, 0, 0).unwrap();
    app.seed_clicks(
        first,
        &[
            (day(1, 10), "US", "Desktop"),
            (day(1, 10), "US", "Mobile"),
            (day(2, 3), "DE", "Mobile"),
        ],
    )
    .await;
    app.seed_clicks(second, &[(day(3, 15), "FR", "Tablet")]).await;

    (app, token)
}

#[tokio::test]
async fn test_clicks_over_time_by_interval() {
    let (app, token) = seeded_app().await;

    let days = app
        .server
        .get("/analysis/clicks-over-time")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(
        days,
        json!([
            { "date": "2024-01-10", "count": 2 },
            { "date": "2024-02-03", "count": 1 },
            { "date": "2024-03-15", "count": 1 },
        ])
    );

    let months = app
        .server
        .get("/analysis/clicks-over-time")
        .add_query_param("interval", "month")
        .authorization_bearer(&token)
        .await
        .json::<Vec<Value>>();
    assert_eq!(months.len(), 3);
    assert_eq!(months[1]["date"], "2024-02-01");

    let years = app
        .server
        .get("/analysis/clicks-over-time")
        .add_query_param("interval", "year")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(years, json!([{ "date": "2024-01-01", "count": 4 }]));
}

#[tokio::test]
async fn test_clicks_over_time_range() {
    let (app, token) = seeded_app().await;

    let february = app
        .server
        .get("/analysis/clicks-over-time")
        .add_query_param("from", "2024-02-01T00:00:00Z")
        .add_query_param("to", "2024-03-01T00:00:00Z")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(february, json!([{ "date": "2024-02-03", "count": 1 }]));

    // Seeded clicks are at noon; a 13:00 bound excludes the 2024-01-10 pair.
    let partial = app
        .server
        .get("/analysis/clicks-over-time")
        .add_query_param("from", "2024-01-10T13:00:00Z")
        .add_query_param("to", "2024-03-15T11:00:00Z")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(partial, json!([{ "date": "2024-02-03", "count": 1 }]));

    let countries = app
        .server
        .get("/analysis/country-breakdown")
        .add_query_param("from", "2024-01-10T13:00:00Z")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(countries, json!({ "DE": 1, "FR": 1 }));

    app.server
        .get("/analysis/clicks-over-time")
        .add_query_param("from", "2024-03-01T00:00:00Z")
        .add_query_param("to", "2024-02-01T00:00:00Z")
        .authorization_bearer(&token)
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn test_breakdowns() {
    let (app, token) = seeded_app().await;

    let countries = app
        .server
        .get("/analysis/country-breakdown")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(countries, json!({ "US": 2, "DE": 1, "FR": 1 }));

    let devices = app
        .server
        .get("/analysis/device-breakdown")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(devices, json!({ "Desktop": 1, "Mobile": 2, "Tablet": 1 }));

    let browsers = app
        .server
        .get("/analysis/browser-breakdown")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(browsers, json!({ "Firefox": 4 }));

    let referrers = app
        .server
        .get("/analysis/referrer-breakdown")
        .add_query_param("from", "2024-03-01T00:00:00Z")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(referrers, json!({ "Direct": 1 }));
}

#[tokio::test]
async fn test_analysis_is_owner_scoped() {
    let (app, _) = seeded_app().await;
    let (_, stranger) = app.user("stranger@example.com").await;

    let series = app
        .server
        .get("/analysis/clicks-over-time")
        .authorization_bearer(&stranger)
        .await
        .json::<Vec<Value>>();
    assert!(series.is_empty());

    let countries = app
        .server
        .get("/analysis/country-breakdown")
        .authorization_bearer(&stranger)
        .await
        .json::<Value>();
    assert_eq!(countries, json!({}));
}
