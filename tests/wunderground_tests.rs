use axum::{extract::Path, routing::get, Json, Router};
use serde_json::{json, Value};
use std::time::Duration;

use stormwatch::providers::{AlertSource, WundergroundProvider};

const TEST_KEY: &str = "testkey";

async fn alerts_handler(Path((key, location)): Path<(String, String)>) -> Json<Value> {
    if key != TEST_KEY {
        return Json(json!({
            "response": {
                "error": {"type": "keynotfound", "description": "this key does not exist"}
            }
        }));
    }

    match location.as_str() {
        "94103.json" => Json(json!({
            "response": {"version": "0.1"},
            "alerts": [
                {
                    "type": "HEA",
                    "description": "Heat Advisory",
                    "expires_epoch": "1341662400",
                    "message": "Heat advisory remains in effect",
                    "phenomena": "HT"
                },
                {
                    "type": "FLO",
                    "description": "Flood Warning",
                    "expires_epoch": 1341662400,
                    "message": "Flooding likely"
                }
            ]
        })),
        _ => Json(json!({"response": {"version": "0.1"}, "alerts": []})),
    }
}

async fn spawn_upstream() -> String {
    let app = Router::new().route("/api/:key/alerts/q/:location", get(alerts_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_fetch_alerts_from_upstream() {
    let base_url = spawn_upstream().await;
    let provider = WundergroundProvider::new(Some(base_url), Duration::from_secs(5)).unwrap();

    let alerts = provider.fetch_alerts(TEST_KEY, "94103").await.unwrap();

    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].alert_type, "HEA");
    assert_eq!(alerts[0].extra["phenomena"], "HT");
    assert_eq!(alerts[1].alert_type, "FLO");
    assert_eq!(alerts[1].expires_at.timestamp(), 1341662400);
}

#[tokio::test]
async fn test_fetch_no_alerts() {
    let base_url = spawn_upstream().await;
    let provider = WundergroundProvider::new(Some(base_url), Duration::from_secs(5)).unwrap();

    let alerts = provider.fetch_alerts(TEST_KEY, "10001").await.unwrap();
    assert!(alerts.is_empty());
}

#[tokio::test]
async fn test_fetch_with_bad_key_fails() {
    let base_url = spawn_upstream().await;
    let provider = WundergroundProvider::new(Some(base_url), Duration::from_secs(5)).unwrap();

    let err = provider.fetch_alerts("wrong", "94103").await.unwrap_err();
    assert!(err.to_string().contains("keynotfound"));
}

#[tokio::test]
async fn test_fetch_http_error_fails() {
    let base_url = spawn_upstream().await;
    let provider =
        WundergroundProvider::new(Some(format!("{}/missing", base_url)), Duration::from_secs(5))
            .unwrap();

    let err = provider.fetch_alerts(TEST_KEY, "94103").await.unwrap_err();
    assert!(err.to_string().contains("404"));
}
