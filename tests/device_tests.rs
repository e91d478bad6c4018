mod common;

use axum::http::StatusCode;
use common::{
    ADMIN, DEVICE_1, DEVICE_2, METRIC_1, METRIC_2, SITE_A, SITE_B, STANDARD, SUBSCRIPTION_1,
    TECHNICIAN, spawn_seeded_app,
};
use serde_json::{Value, json};

fn ids(body: &Value) -> Vec<i64> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_standard_user_cannot_create_devices() {
    let app = spawn_seeded_app().await;
    let standard = app.login(STANDARD).await;

    for site_id in [SITE_A, SITE_B] {
        let (status, body) = app
            .post(
                "/devices",
                &standard,
                json!({ "name": "Meter", "type": "meter", "site_id": site_id }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Not enough permissions");
    }
}

#[tokio::test]
async fn test_technician_is_scoped_to_authorized_sites() {
    let app = spawn_seeded_app().await;
    let technician = app.login(TECHNICIAN).await;

    let (status, body) = app
        .post(
            "/devices",
            &technician,
            json!({ "name": "Inverter", "type": "inverter", "site_id": SITE_A }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["type"], "inverter");
    assert_eq!(body["data"]["site_id"], SITE_A);
    assert_eq!(body["data"]["metrics"], json!([]));

    let (status, body) = app
        .post(
            "/devices",
            &technician,
            json!({ "name": "Inverter", "site_id": SITE_B }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Not authorized to access this site");

    // Authorization is decided before the site is looked up.
    let (status, _) = app
        .post(
            "/devices",
            &technician,
            json!({ "name": "Ghost", "site_id": 999 }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get(&format!("/devices/{DEVICE_2}"), &technician).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .get(&format!("/devices?site_id={SITE_B}"), &technician)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get("/devices", &technician).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!ids(&body).contains(&i64::from(DEVICE_2)));
    assert!(ids(&body).contains(&i64::from(DEVICE_1)));
}

#[tokio::test]
async fn test_admin_device_create_with_unknown_site() {
    let app = spawn_seeded_app().await;
    let admin = app.login(ADMIN).await;

    let (status, _) = app
        .post("/devices", &admin, json!({ "name": "Ghost", "site_id": 999 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/devices", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![i64::from(DEVICE_1), i64::from(DEVICE_2)]);
}

#[tokio::test]
async fn test_moving_a_device_checks_both_sites() {
    let app = spawn_seeded_app().await;
    let technician = app.login(TECHNICIAN).await;
    let admin = app.login(ADMIN).await;

    let uri = format!("/devices/{DEVICE_1}");

    let (status, _) = app
        .put(
            &uri,
            &technician,
            json!({ "name": "Device 1", "type": "sensor", "site_id": SITE_B }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(
            &uri,
            &technician,
            json!({ "name": "Renamed", "type": "sensor", "site_id": SITE_A }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Renamed");

    let (status, body) = app
        .put(
            &uri,
            &admin,
            json!({ "name": "Renamed", "site_id": SITE_B }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["site_id"], SITE_B);

    let (status, _) = app.get(&uri, &technician).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deleting_a_device_deletes_its_metrics() {
    let app = spawn_seeded_app().await;
    let admin = app.login(ADMIN).await;
    let standard = app.login(STANDARD).await;

    let (status, body) = app.get(&format!("/devices/{DEVICE_1}/metrics"), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![i64::from(METRIC_1)]);

    let (status, body) = app.delete(&format!("/devices/{DEVICE_1}"), &admin).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = app.get(&format!("/devices/{DEVICE_1}"), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get(&format!("/metrics/{METRIC_1}"), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .get(&format!("/subscriptions/{SUBSCRIPTION_1}"), &standard)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["metric_ids"], json!([METRIC_2]));

    let (status, _) = app.delete(&format!("/devices/{DEVICE_1}"), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_site_listing_hides_devices_outside_scope() {
    let app = spawn_seeded_app().await;
    let standard = app.login(STANDARD).await;

    let (status, body) = app.get("/sites", &standard).await;
    assert_eq!(status, StatusCode::OK);

    let sites = body["data"].as_array().unwrap();
    assert_eq!(sites.len(), 2);
    assert_eq!(sites[0]["name"], "Site A");
    assert_eq!(sites[0]["devices"].as_array().unwrap().len(), 1);
    assert_eq!(sites[1]["name"], "Site B");
    assert_eq!(sites[1]["devices"], json!([]));

    let (status, _) = app.get("/sites/999", &standard).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_site_lifecycle() {
    let app = spawn_seeded_app().await;
    let admin = app.login(ADMIN).await;
    let technician = app.login(TECHNICIAN).await;

    let (status, _) = app
        .post("/sites", &technician, json!({ "name": "Site C" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(
            "/sites",
            &admin,
            json!({ "name": "  Site C ", "location": "Location C" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], "Site C");

    let (status, _) = app.post("/sites", &admin, json!({ "name": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.delete(&format!("/sites/{SITE_B}"), &technician).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.delete(&format!("/sites/{SITE_B}"), &admin).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("cascade=true"));

    let (status, _) = app
        .get(&format!("/devices/{DEVICE_2}"), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .delete(&format!("/sites/{SITE_B}?cascade=true"), &admin)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/devices/{DEVICE_2}"), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/metrics/{METRIC_2}"), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/sites/{SITE_B}"), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
