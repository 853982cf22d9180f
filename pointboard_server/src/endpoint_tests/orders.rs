use actix_web::http::StatusCode;

use super::helpers::{json, TestServer, NEW_ORDER_JSON};

#[actix_web::test]
async fn health_check() {
    let server = TestServer::new().await;
    let (status, body) = server.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn create_order() {
    let server = TestServer::new().await;
    let (status, body) = server.post_json("/api/orders", NEW_ORDER_JSON).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order = json(&body);
    let code = order["paymentCode"].as_str().unwrap();
    assert_eq!(order["orderNumber"].as_str(), Some(code));
    assert!(code.starts_with("POINTBOARD") && code.len() == 17, "{code}");
    assert_eq!(order["frontendOrderRef"], "web-1001");
    assert_eq!(order["subtotal"], 50_000);
    assert_eq!(order["vatAmount"], 5_000);
    assert_eq!(order["totalAmount"], 55_000);
    assert_eq!(order["orderStatus"], "pending");
    assert_eq!(order["paymentStatus"], "pending");
    assert_eq!(order["paymentMethod"], "bank_transfer");
    assert_eq!(order["created"], true);
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn resubmitting_an_order_number_returns_the_original() {
    let server = TestServer::new().await;
    let code = server.create_order().await;
    let retry = NEW_ORDER_JSON.replacen('{', &format!(r#"{{ "orderNumber": "{}","#, code.to_lowercase()), 1);
    let (status, body) = server.post_json("/api/orders", &retry).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = json(&body);
    assert_eq!(order["paymentCode"].as_str(), Some(code.as_str()));
    assert_eq!(order["created"], false);
}

#[actix_web::test]
async fn invalid_orders_are_rejected() {
    let server = TestServer::new().await;
    let (status, body) = server.post_json("/api/orders", r#"{"items": []}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("at least one item"));

    let mismatch = r#"{
        "items": [{ "productId": "mug-blue", "quantity": 2, "price": 25000 }],
        "includeVAT": true,
        "totalPolicy": { "mode": "verify", "total": 50000 }
    }"#;
    let (status, body) = server.post_json("/api/orders", mismatch).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("does not match"), "{body}");

    let (status, body) = server.post_json("/api/orders", "not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("Could not read request body"), "{body}");

    let (status, body) = server.post_json("/api/orders", r#"{"customer": {"name": "No items"}}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].is_string(), "{body}");
}

#[actix_web::test]
async fn client_totals_are_checked() {
    let server = TestServer::new().await;
    let order = |total: i64| {
        format!(
            r#"{{
            "items": [{{ "productId": "mug-blue", "quantity": 2, "price": 25000 }}],
            "includeVAT": true,
            "totalAmount": {total}
        }}"#
        )
    };
    let (status, body) = server.post_json("/api/orders", &order(1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(json(&body)["error"].as_str().unwrap().contains("does not match"), "{body}");

    let (status, body) = server.post_json("/api/orders", &order(55_001)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(json(&body)["totalAmount"], 55_000);

    let (status, body) = server.get("/api/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body).as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn oversized_orders_are_rejected() {
    let server = TestServer::new().await;
    let huge = r#"{"items": [{ "productId": "gold-bar", "quantity": 2, "price": 4611686018427387904 }]}"#;
    let (status, body) = server.post_json("/api/orders", huge).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(json(&body)["error"].as_str().unwrap().contains("too large"), "{body}");
}

#[actix_web::test]
async fn fetch_order_by_number() {
    let server = TestServer::new().await;
    let code = server.create_order().await;
    let (status, body) = server.get(&format!("/api/order/{}", code.to_lowercase())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = json(&body);
    assert_eq!(order["orderNumber"].as_str(), Some(code.as_str()));
    assert_eq!(order["customerName"], "Tran Thi B");
    assert_eq!(order["items"][0]["productId"], "mug-blue");

    let (status, body) = server.get("/api/order/POINTBOARDZ999999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json(&body)["error"].as_str().unwrap().contains("POINTBOARDZ999999"));
}

#[actix_web::test]
async fn search_orders() {
    let server = TestServer::new().await;
    let code = server.create_order().await;
    let (status, body) = server.get("/api/orders?customerEmail=B@EXAMPLE.COM&orderStatus=pending").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let orders = json(&body);
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["orderNumber"].as_str(), Some(code.as_str()));

    let (status, body) = server.get("/api/orders?orderStatus=shipped").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json(&body).as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn order_status_changes() {
    let server = TestServer::new().await;
    let code = server.create_order().await;
    let update = |status: &str| format!(r#"{{"orderNumber": "{code}", "status": "{status}"}}"#);

    let (status, body) = server.patch_json("/api/order_status", &update("shipped")).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert!(json(&body)["error"].as_str().unwrap().contains("from pending to shipped"));

    let (status, body) = server.patch_json("/api/order_status", &update("confirmed")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["orderStatus"], "confirmed");

    let (status, _) = server.patch_json("/api/order_status", &update("confirmed")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = server.patch_json("/api/order_status", &update("exploded")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].is_string(), "{body}");
}

#[actix_web::test]
async fn payment_status_changes() {
    let server = TestServer::new().await;
    let code = server.create_order().await;
    let update = |status: &str| format!(r#"{{"orderNumber": "{code}", "status": "{status}"}}"#);

    let (status, body) = server.patch_json("/api/payment_status", &update("completed")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["paymentStatus"], "completed");

    let (status, _) = server.patch_json("/api/payment_status", &update("pending")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = server.patch_json("/api/payment_status", &update("refunded")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["paymentStatus"], "refunded");
}

#[actix_web::test]
async fn cancel_order() {
    let server = TestServer::new().await;
    let code = server.create_order().await;
    let cancel = format!(r#"{{"orderNumber": "{code}", "reason": "Changed my mind"}}"#);
    let (status, body) = server.post_json("/api/cancel", &cancel).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["orderStatus"], "cancelled");

    let (status, _) = server.post_json("/api/cancel", &cancel).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = server.post_json("/api/cancel", r#"{"orderNumber": "POINTBOARDZ999999"}"#).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
