mod common;

use axum::http::StatusCode;
use common::{ADMIN, METRIC_1, METRIC_2, STANDARD, SUBSCRIPTION_1, TECHNICIAN, spawn_seeded_app};
use serde_json::json;

#[tokio::test]
async fn test_unknown_metric_ids_create_nothing() {
    let app = spawn_seeded_app().await;
    let standard = app.login(STANDARD).await;

    let (status, body) = app
        .post(
            "/subscriptions",
            &standard,
            json!({ "name": "Broken", "metric_ids": [METRIC_1, METRIC_2, 999] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "One or more metric IDs are invalid");

    let (status, body) = app.get("/subscriptions", &standard).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Subscription 1"]);
}

#[tokio::test]
async fn test_subscriptions_are_private_even_to_admins() {
    let app = spawn_seeded_app().await;
    let uri = format!("/subscriptions/{SUBSCRIPTION_1}");

    for who in [ADMIN, TECHNICIAN] {
        let token = app.login(who).await;

        for path in [uri.clone(), format!("{uri}/latest"), format!("{uri}/history")] {
            let (status, body) = app.get(&path, &token).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{} {path}", who.0);
            assert_eq!(body["error"], "Not authorized to access this subscription");
        }

        let (status, _) = app
            .put(&uri, &token, json!({ "name": "Hijacked", "metric_ids": [] }))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.delete(&uri, &token).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app.get("/subscriptions", &token).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([]));
    }

    let (status, _) = app.get("/subscriptions/999", &app.login(ADMIN).await).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_owner_manages_subscription() {
    let app = spawn_seeded_app().await;
    let standard = app.login(STANDARD).await;

    let (status, body) = app
        .post(
            "/subscriptions",
            &standard,
            json!({ "name": "Mine", "metric_ids": [METRIC_2, METRIC_1, METRIC_2] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["metric_ids"], json!([METRIC_1, METRIC_2]));
    let id = body["data"]["id"].as_i64().unwrap();
    let uri = format!("/subscriptions/{id}");

    let (status, body) = app
        .put(&uri, &standard, json!({ "name": "Renamed", "metric_ids": [METRIC_2] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Renamed");
    assert_eq!(body["data"]["metric_ids"], json!([METRIC_2]));

    // A failed update leaves the previous state intact.
    let (status, _) = app
        .put(&uri, &standard, json!({ "name": "Broken", "metric_ids": [999] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get(&uri, &standard).await;
    assert_eq!(body["data"]["name"], "Renamed");
    assert_eq!(body["data"]["metric_ids"], json!([METRIC_2]));

    let (status, _) = app.delete(&uri, &standard).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&uri, &standard).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Metrics survive their subscriptions.
    let (status, _) = app.get(&format!("/metrics/{METRIC_2}"), &standard).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_latest_reports_origin() {
    let app = spawn_seeded_app().await;
    let standard = app.login(STANDARD).await;

    let (status, body) = app
        .get(&format!("/subscriptions/{SUBSCRIPTION_1}/latest"), &standard)
        .await;
    assert_eq!(status, StatusCode::OK);

    let data = &body["data"];
    assert_eq!(data["subscription_name"], "Subscription 1");

    let metrics = data["metrics"].as_array().unwrap();
    assert_eq!(metrics.len(), 2);
    assert_eq!(metrics[0]["metric_id"], METRIC_1);
    assert_eq!(metrics[0]["value"], 10.5);
    assert_eq!(metrics[0]["device_name"], "Device 1");
    assert_eq!(metrics[0]["site_name"], "Site A");
    assert_eq!(metrics[1]["metric_id"], METRIC_2);
    assert_eq!(metrics[1]["value"], 20.5);
    assert_eq!(metrics[1]["site_name"], "Site B");
}

#[tokio::test]
async fn test_history_stays_near_latest_value() {
    let app = spawn_seeded_app().await;
    let standard = app.login(STANDARD).await;

    let uri = format!(
        "/subscriptions/{SUBSCRIPTION_1}/history?start_time=2024-01-01T00:00:00Z&end_time=2024-01-01T02:00:00Z&interval_minutes=30"
    );

    let (status, first) = app.get(&uri, &standard).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["interval_minutes"], 30);

    let series = first["data"]["metrics"].as_array().unwrap();
    assert_eq!(series.len(), 2);

    for (entry, base) in series.iter().zip([10.5_f64, 20.5]) {
        let values = entry["values"].as_array().unwrap();
        assert_eq!(values.len(), 5);
        assert_eq!(entry["timestamps"].as_array().unwrap().len(), 5);
        for value in values {
            let value = value.as_f64().unwrap();
            assert!((value - base).abs() <= base * 0.1 + 1e-9, "{value} vs {base}");
        }
    }

    let (_, second) = app.get(&uri, &standard).await;
    assert_eq!(first["data"]["metrics"], second["data"]["metrics"]);

    let (status, body) = app
        .get(
            &format!(
                "/subscriptions/{SUBSCRIPTION_1}/history?start_time=2024-01-02T00:00:00Z&end_time=2024-01-01T00:00:00Z"
            ),
            &standard,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Start time must be before end time");
}

#[tokio::test]
async fn test_history_point_cap_covers_all_series() {
    let app = spawn_seeded_app().await;
    let standard = app.login(STANDARD).await;

    // 6000 points per series: within the cap alone, over it for two metrics.
    let range = "start_time=2024-01-01T00:00:00Z&end_time=2024-01-05T03:59:00Z&interval_minutes=1";

    let (status, body) = app
        .get(&format!("/metrics/{METRIC_1}/history?{range}"), &standard)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["values"].as_array().unwrap().len(), 6000);

    let (status, body) = app
        .get(
            &format!("/subscriptions/{SUBSCRIPTION_1}/history?{range}"),
            &standard,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Requested window would produce 12000 points (limit 10000)"
    );

    let (status, _) = app
        .get(
            &format!("/subscriptions/{SUBSCRIPTION_1}/history?end_time=-262143-01-01T00:00:00Z"),
            &standard,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
