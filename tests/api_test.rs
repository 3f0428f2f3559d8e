//! HTTP surface tests: the full router over in-memory sqlite with the
//! heuristic-only pipeline.

use std::sync::Arc;

use arbitrage_api::{app_router, config::AppConfig, AppState};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn test_state() -> AppState {
    let db = arbitrage_api::db::establish_connection("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    arbitrage_api::db::run_migrations(&db).await.expect("migrations");

    let config = AppConfig::default();
    let pipeline = Arc::new(arbitrage_api::build_pipeline(&config));
    AppState {
        db: Arc::new(db),
        config,
        pipeline,
    }
}

fn analyze_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/manifests/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

const COSTCO_CSV: &str = "Item Number,Description,Quantity,Sell Price\n\
                          100,Air Compressor 20 Gal,2,\"$1,299.00\"\n\
                          101,Storage Cabinet,1,$450.00\n\
                          102,Sump Pump,1,$380.00\n";

#[tokio::test]
async fn analyze_endpoint_returns_summary_items_and_charts() {
    let app = app_router(test_state().await);

    let response = app
        .oneshot(analyze_request(
            json!({"file": COSTCO_CSV, "filename": "pallet.csv"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], json!(true));

    let data = &body["data"];
    assert_eq!(data["format"], json!("costco"));
    assert_eq!(data["cached"], json!(false));
    assert_eq!(data["partial"], json!(false));
    assert_eq!(data["summary"]["total_items"], json!(3));
    assert_eq!(data["items"].as_array().unwrap().len(), 3);
    assert_eq!(
        data["charts"]["revenue_timeline"]["labels"]
            .as_array()
            .unwrap()
            .len(),
        12
    );

    // items[] carries the original row fields plus analysis and profit.
    let first = &data["items"][0];
    assert_eq!(first["item_number"], json!("100"));
    assert_eq!(first["quantity"], json!(2));
    assert!(first["assessment"]["estimated_sale_price"].is_string() || first["assessment"]["estimated_sale_price"].is_number());
    assert!(first.get("profit").is_some());
}

#[tokio::test]
async fn unrecognized_format_returns_bad_request_with_reason() {
    let app = app_router(test_state().await);

    let response = app
        .oneshot(analyze_request(json!({
            "file": "x,y\n1.0,2.0\n3.5,4.5\n",
            "filename": "numbers.csv"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Unrecognized manifest format"));
}

#[tokio::test]
async fn resubmitting_the_same_file_is_answered_from_storage() {
    let app = app_router(test_state().await);
    let payload = json!({"file": COSTCO_CSV, "filename": "pallet.csv"});

    let first = app
        .clone()
        .oneshot(analyze_request(payload.clone()))
        .await
        .unwrap();
    let first_body = json_body(first).await;
    assert_eq!(first_body["data"]["cached"], json!(false));
    let manifest_id = first_body["data"]["manifest_id"].as_str().unwrap().to_string();

    let second = app.oneshot(analyze_request(payload)).await.unwrap();
    let second_body = json_body(second).await;
    assert_eq!(second_body["data"]["cached"], json!(true));
    assert_eq!(
        second_body["data"]["manifest_id"].as_str().unwrap(),
        manifest_id
    );
    // The stored summary is recomputed, not replayed.
    assert_eq!(
        second_body["data"]["summary"]["total_items"],
        first_body["data"]["summary"]["total_items"]
    );
}

#[tokio::test]
async fn stored_manifest_can_be_fetched_and_deleted() {
    let app = app_router(test_state().await);

    let created = app
        .clone()
        .oneshot(analyze_request(
            json!({"file": COSTCO_CSV, "filename": "pallet.csv"}),
        ))
        .await
        .unwrap();
    let created_body = json_body(created).await;
    let id = created_body["data"]["manifest_id"].as_str().unwrap().to_string();

    let fetched = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/manifests/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(fetched.status(), StatusCode::OK);
    let fetched_body = json_body(fetched).await;
    assert_eq!(fetched_body["data"]["summary"]["total_items"], json!(3));

    let deleted = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/manifests/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/manifests/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn fetching_an_unknown_manifest_is_not_found() {
    let app = app_router(test_state().await);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/manifests/00000000-0000-0000-0000-000000000000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_upload_is_rejected_by_validation() {
    let app = app_router(test_state().await);
    let response = app
        .oneshot(analyze_request(json!({"file": "", "filename": "empty.csv"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_endpoint_reports_database_status() {
    let app = app_router(test_state().await);
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], json!("up"));
    assert_eq!(body["database"], json!("up"));
    assert_eq!(body["marketplaces"], json!(0));
}
