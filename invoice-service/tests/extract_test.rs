mod common;

use common::{TestApp, TestOptions};
use invoice_service::services::providers::mock::MockExtractionProvider;
use serde_json::json;

#[tokio::test]
async fn empty_text_is_a_validation_error() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/extract-invoice", app.address))
        .json(&json!({ "text": "   " }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn oversized_text_is_a_validation_error() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/extract-invoice", app.address))
        .json(&json!({ "text": "a".repeat(10_001) }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn garbage_text_returns_nulls_with_a_warning_not_an_error() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/extract-invoice", app.address))
        .json(&json!({ "text": "asdf" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");

    // Every contract key is present and null.
    assert!(body["invoiceNumber"].is_null());
    assert!(body["dueDate"].is_null());
    assert!(body["items"].is_null());
    // Plus the soft low-confidence flag.
    assert!(body["warning"].as_str().unwrap().contains("invoice"));
}

#[tokio::test]
async fn extracted_items_beyond_five_are_truncated_and_flagged() {
    let items: Vec<String> = (0..8)
        .map(|i| format!(r#"{{"description":"Item {}","quantity":1,"rate":10}}"#, i))
        .collect();
    let canned = format!(
        r#"{{"invoiceNumber":"INV-2","invoiceName":null,"date":null,"dueDate":null,
            "sender":null,"recipient":null,"items":[{}],"taxRate":null,
            "currency":null,"notes":null,"paymentInstructions":null,"shipping":null}}"#,
        items.join(",")
    );

    let app = TestApp::spawn_with(TestOptions {
        extraction: MockExtractionProvider::with_response(canned),
        ..TestOptions::default()
    })
    .await;

    let response = app
        .client
        .post(format!("{}/extract-invoice", app.address))
        .json(&json!({ "text": "an invoice with many items" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["items"].as_array().unwrap().len(), 5);
    assert!(body["warning"].as_str().unwrap().contains("first 5"));
}

#[tokio::test]
async fn extraction_quota_is_enforced_per_caller() {
    let app = TestApp::spawn_with(TestOptions {
        ai_requests_per_window: 2,
        ..TestOptions::default()
    })
    .await;

    for _ in 0..2 {
        let response = app
            .client
            .post(format!("{}/extract-invoice", app.address))
            .json(&json!({ "text": "invoice INV-1 due tomorrow" }))
            .send()
            .await
            .expect("Failed to execute request");
        assert!(response.status().is_success());
    }

    let response = app
        .client
        .post(format!("{}/extract-invoice", app.address))
        .json(&json!({ "text": "invoice INV-1 due tomorrow" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 429);
    assert!(response.headers().contains_key("retry-after"));
}

#[tokio::test]
async fn over_quota_callers_never_reach_validation() {
    // Quota zero: even an invalid payload must see 429, proving the limiter
    // runs first.
    let app = TestApp::spawn_with(TestOptions {
        ai_requests_per_window: 0,
        ..TestOptions::default()
    })
    .await;

    let response = app
        .client
        .post(format!("{}/extract-invoice", app.address))
        .json(&json!({ "text": "" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 429);
}
