//! # Integration Tests for scango-api
//!
//! Drives the full router with `tower::ServiceExt::oneshot`: the cash and
//! card flows from checkout to exit, ledger outages, staff authentication,
//! receipt polling, reward balances, and the operational endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use scango_api::state::{AppConfig, AppState};
use scango_chain::{MemoryChainMirror, MemoryRewardMinter};
use scango_core::{ExitProof, OrderHash, ReceiptNumber, TxRef};

const WALLET: &str = "0x52908400098527886e0f7030069857d2e4169ee7";

struct Harness {
    app: axum::Router,
    mirror: Arc<MemoryChainMirror>,
}

fn harness_with(config: AppConfig) -> Harness {
    let mirror = Arc::new(MemoryChainMirror::new());
    let state = AppState::new(
        config,
        mirror.clone(),
        Arc::new(MemoryRewardMinter::new()),
        None,
    );
    Harness {
        app: scango_api::app(state),
        mirror,
    }
}

fn harness() -> Harness {
    harness_with(AppConfig::default())
}

fn harness_with_auth(secret: &str) -> Harness {
    harness_with(AppConfig {
        staff_token: Some(secret.to_string()),
        ..AppConfig::default()
    })
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_as(uri: &str, token: &str, body: Value) -> Request<Body> {
    let mut request = post(uri, body);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    request
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn cart_body(method: &str) -> Value {
    json!({
        "cart": [
            {"productId": "milk-1l", "name": "Milk", "quantity": 2, "price": 60.0, "mrp": 64.0},
            {"productId": "rice-5kg", "quantity": 1, "price": 180.0, "mrp": 199.0}
        ],
        "total": 300.0,
        "storeId": "store-blr-01",
        "paymentMethod": method,
        "timeSpent": 10,
        "walletAddress": WALLET
    })
}

async fn checkout(app: &axum::Router, method: &str) -> Value {
    let (status, body) = send(app, post("/api/orders/checkout", cart_body(method))).await;
    assert_eq!(status, StatusCode::OK, "checkout failed: {body}");
    body
}

// -- Health and operations ----------------------------------------------------

#[tokio::test]
async fn liveness_and_readiness() {
    let h = harness();
    let response = h.app.clone().oneshot(get("/health/liveness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");

    let response = h.app.clone().oneshot(get("/health/readiness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn metrics_count_flow_outcomes() {
    let h = harness();
    let receipt = checkout(&h.app, "CARD").await;
    send(
        &h.app,
        post("/api/guard/verify-exit", json!({"orderHash": receipt["orderHash"]})),
    )
    .await;

    let response = h.app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("scango_checkouts_total 1\n"), "{text}");
    assert!(text.contains("scango_exits_total{outcome=\"allowed\"} 1\n"), "{text}");
    assert!(text.contains("scango_receipts{status=\"VERIFIED\"} 1\n"), "{text}");
    assert!(
        text.contains(
            "scango_http_requests_total{method=\"POST\",path=\"/api/orders/checkout\",status=\"200\"} 1\n"
        ),
        "{text}"
    );
    assert!(text.contains("scango_http_request_duration_seconds_count"), "{text}");
    assert!(text.contains("# TYPE scango_rewards_credited_total counter"), "{text}");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let h = harness();
    let (status, body) = send(&h.app, get("/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/orders/checkout"].is_object());
    assert!(body["components"]["securitySchemes"]["bearer_auth"].is_object());
}

// -- Cash flow ----------------------------------------------------------------

#[tokio::test]
async fn cash_order_from_checkout_to_exit() {
    let h = harness();
    let receipt = checkout(&h.app, "cash").await;
    assert_eq!(receipt["success"], true);
    assert_eq!(receipt["status"], "PENDING");
    assert_eq!(receipt["chainSynced"], true);
    let tx = receipt["txHash"].as_str().unwrap();
    assert!(!tx.starts_with("OFFLINE-"));
    let order_hash = receipt["orderHash"].clone();
    let number = receipt["receiptNumber"].as_str().unwrap().to_string();

    // Unpaid: the guard refuses.
    let (status, verdict) = send(
        &h.app,
        post("/api/guard/verify-exit", json!({"orderHash": order_hash})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verdict["allowed"], false);
    assert_eq!(verdict["status"], "PAYMENT_PENDING");

    let (status, paid) = send(
        &h.app,
        post(
            "/api/cashier/mark-paid",
            json!({"receiptNumber": number, "orderHash": order_hash}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["result"], "PAYMENT_CONFIRMED");
    assert_eq!(paid["status"], "PAID");
    assert_eq!(paid["chainSynced"], true);

    let (_, verdict) = send(
        &h.app,
        post("/api/guard/verify-exit", json!({"orderHash": order_hash})),
    )
    .await;
    assert_eq!(verdict["allowed"], true);
    assert_eq!(verdict["status"], "EXIT_ALLOWED");
    assert_eq!(verdict["itemCount"], 3);
    assert_eq!(verdict["receiptNumber"], number.as_str());

    // The same QR cannot admit a second exit.
    let (_, verdict) = send(
        &h.app,
        post("/api/guard/verify-exit", json!({"orderHash": order_hash})),
    )
    .await;
    assert_eq!(verdict["allowed"], false);
    assert_eq!(verdict["status"], "QR_USED");

    let (status, view) = send(&h.app, get(&format!("/api/receipts/{number}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"], "VERIFIED");
    assert_eq!(view["itemCount"], 3);
    let actors: Vec<&str> = view["transitions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["actor"].as_str().unwrap())
        .collect();
    assert_eq!(actors, ["checkout", "cashier", "guard"]);
}

#[tokio::test]
async fn marking_paid_twice_reports_already_paid() {
    let h = harness();
    let receipt = checkout(&h.app, "CASH").await;
    let body = json!({"receiptNumber": receipt["receiptNumber"]});

    let (_, first) = send(&h.app, post("/api/cashier/mark-paid", body.clone())).await;
    assert_eq!(first["result"], "PAYMENT_CONFIRMED");
    let (status, second) = send(&h.app, post("/api/cashier/mark-paid", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["result"], "ALREADY_PAID");
    assert_eq!(second["status"], "PAID");
}

#[tokio::test]
async fn mark_paid_rejects_unknown_and_mismatched_receipts() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        post("/api/cashier/mark-paid", json!({"receiptNumber": "RCP-000000"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let receipt = checkout(&h.app, "CASH").await;
    let other = checkout(&h.app, "CASH").await;
    let (status, _) = send(
        &h.app,
        post(
            "/api/cashier/mark-paid",
            json!({"receiptNumber": receipt["receiptNumber"], "orderHash": other["orderHash"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Nothing changed.
    let number = receipt["receiptNumber"].as_str().unwrap();
    let (_, view) = send(&h.app, get(&format!("/api/receipts/{number}"))).await;
    assert_eq!(view["status"], "PENDING");
}

// -- Card flow and proofs -----------------------------------------------------

#[tokio::test]
async fn card_order_exits_with_scanned_proof() {
    let h = harness();
    let receipt = checkout(&h.app, "UPI").await;
    assert_eq!(receipt["status"], "PAID");

    let proof = ExitProof::new(
        OrderHash::parse(receipt["orderHash"].as_str().unwrap()).unwrap(),
        TxRef::new(receipt["txHash"].as_str().unwrap()).unwrap(),
        ReceiptNumber::new(receipt["receiptNumber"].as_str().unwrap()).unwrap(),
    );
    let (status, verdict) = send(
        &h.app,
        post("/api/guard/verify-proof", json!({"payload": proof.encode()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verdict["status"], "EXIT_ALLOWED");
}

#[tokio::test]
async fn malformed_or_unknown_proofs_are_invalid_qr() {
    let h = harness();
    for payload in ["not json", "{}", r#"{"orderHash":"0x00"}"#] {
        let (status, verdict) = send(
            &h.app,
            post("/api/guard/verify-proof", json!({"payload": payload})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(verdict["status"], "INVALID_QR", "payload {payload}");
    }

    let unknown = format!("0x{}", "ab".repeat(32));
    let (_, verdict) = send(
        &h.app,
        post("/api/guard/verify-exit", json!({"orderHash": unknown})),
    )
    .await;
    assert_eq!(verdict["status"], "INVALID_QR");
    assert!(verdict.get("itemCount").is_none());
}

#[tokio::test]
async fn proof_with_wrong_receipt_number_is_invalid_qr() {
    let h = harness();
    let receipt = checkout(&h.app, "CARD").await;
    let proof = json!({
        "orderHash": receipt["orderHash"],
        "txHash": receipt["txHash"],
        "receiptNumber": "RCP-999999-X"
    });
    let (_, verdict) = send(
        &h.app,
        post("/api/guard/verify-proof", json!({"payload": proof.to_string()})),
    )
    .await;
    assert_eq!(verdict["status"], "INVALID_QR");
}

// -- Ledger outages -----------------------------------------------------------

#[tokio::test]
async fn checkout_succeeds_while_ledger_is_down() {
    let h = harness();
    h.mirror.set_online(false);

    let receipt = checkout(&h.app, "CARD").await;
    assert_eq!(receipt["status"], "PAID");
    assert_eq!(receipt["chainSynced"], false);
    let number = receipt["receiptNumber"].as_str().unwrap();
    assert_eq!(receipt["txHash"], format!("OFFLINE-{number}"));

    // The ledger has not confirmed payment, so the guard holds the shopper.
    let (_, verdict) = send(
        &h.app,
        post("/api/guard/verify-exit", json!({"orderHash": receipt["orderHash"]})),
    )
    .await;
    assert_eq!(verdict["status"], "PAYMENT_PENDING");
}

// -- Validation ---------------------------------------------------------------

#[tokio::test]
async fn checkout_rejects_bad_input() {
    let h = harness();
    let mut empty_cart = cart_body("CASH");
    empty_cart["cart"] = json!([]);
    let mut zero_total = cart_body("CASH");
    zero_total["total"] = json!(0);
    let mut bad_method = cart_body("CASH");
    bad_method["paymentMethod"] = json!("BARTER");
    let mut bad_qty = cart_body("CASH");
    bad_qty["cart"][0]["quantity"] = json!(0);

    for body in [empty_cart, zero_total, bad_method, bad_qty, json!({})] {
        let (status, err) = send(&h.app, post("/api/orders/checkout", body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {body}");
        assert_eq!(err["error"]["code"], "BAD_REQUEST");
    }

    let request = Request::builder()
        .method("POST")
        .uri("/api/orders/checkout")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn receipt_lookup_errors() {
    let h = harness();
    let (status, _) = send(&h.app, get("/api/receipts/RCP-123456")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&h.app, get("/api/receipts/RCP_123456")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// -- Rewards ------------------------------------------------------------------

#[tokio::test]
async fn reward_balance_follows_checkout() {
    let h = harness();
    let (status, body) = send(&h.app, get(&format!("/api/users/{WALLET}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rewardBalance"], 0);

    checkout(&h.app, "CARD").await;

    // The reward worker runs asynchronously.
    let mut balance = 0;
    for _ in 0..200 {
        let (_, body) = send(&h.app, get(&format!("/api/users/{WALLET}"))).await;
        balance = body["rewardBalance"].as_u64().unwrap();
        if balance > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    // 300 / 100 * 2 + 10 * 0.5
    assert_eq!(balance, 11);

    let upper = WALLET.to_uppercase().replacen("0X", "0x", 1);
    let (_, body) = send(&h.app, get(&format!("/api/users/{upper}"))).await;
    assert_eq!(body["walletAddress"], WALLET);
    assert_eq!(body["rewardBalance"], 11);
}

#[tokio::test]
async fn malformed_wallet_has_zero_balance() {
    let h = harness();
    let (status, body) = send(&h.app, get("/api/users/0x1234")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["walletAddress"], "0x1234");
    assert_eq!(body["rewardBalance"], 0);
}

async fn metrics_text(app: &axum::Router) -> String {
    let response = app.clone().oneshot(get("/metrics")).await.unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn malformed_wallet_only_costs_the_reward() {
    let h = harness();
    let mut body = cart_body("CARD");
    body["walletAddress"] = json!("0xnotawallet");
    let (status, receipt) = send(&h.app, post("/api/orders/checkout", body)).await;
    assert_eq!(status, StatusCode::OK, "{receipt}");
    assert_eq!(receipt["success"], true);
    let order_hash = OrderHash::parse(receipt["orderHash"].as_str().unwrap()).unwrap();
    assert!(h.mirror.order(&order_hash).is_some());

    let mut text = String::new();
    for _ in 0..200 {
        text = metrics_text(&h.app).await;
        if text.contains("scango_rewards_rejected_total 1\n") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(text.contains("scango_rewards_rejected_total 1\n"), "{text}");
    assert!(text.contains("scango_rewards_credited_total 0\n"), "{text}");
}

// -- Staff authentication -----------------------------------------------------

#[tokio::test]
async fn staff_routes_require_a_token() {
    let h = harness_with_auth("s3cret");
    let receipt = checkout(&h.app, "CASH").await;

    let body = json!({"receiptNumber": receipt["receiptNumber"]});
    let (status, err) = send(&h.app, post("/api/cashier/mark-paid", body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send(
        &h.app,
        post_as("/api/cashier/mark-paid", "cashier:wrong", body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, ok) = send(
        &h.app,
        post_as("/api/cashier/mark-paid", "cashier:s3cret", body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ok["result"], "PAYMENT_CONFIRMED");
}

#[tokio::test]
async fn roles_are_enforced() {
    let h = harness_with_auth("s3cret");
    let receipt = checkout(&h.app, "CARD").await;
    let exit = json!({"orderHash": receipt["orderHash"]});

    let (status, err) = send(
        &h.app,
        post_as("/api/guard/verify-exit", "cashier:s3cret", exit.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["error"]["code"], "FORBIDDEN");

    let (status, _) = send(
        &h.app,
        post_as(
            "/api/cashier/mark-paid",
            "guard:s3cret",
            json!({"receiptNumber": receipt["receiptNumber"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, verdict) = send(
        &h.app,
        post_as("/api/guard/verify-exit", "manager:s3cret", exit),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verdict["status"], "EXIT_ALLOWED");
}

#[tokio::test]
async fn shopper_routes_are_open_when_auth_is_on() {
    let h = harness_with_auth("s3cret");
    let receipt = checkout(&h.app, "CASH").await;
    let number = receipt["receiptNumber"].as_str().unwrap();
    let (status, _) = send(&h.app, get(&format!("/api/receipts/{number}"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&h.app, get("/health/liveness")).await;
    assert_eq!(status, StatusCode::OK);
}
