use actix_web::http::StatusCode;

use super::helpers::{json, payment_notification, TestServer};

#[actix_web::test]
async fn webhook_confirms_the_order() {
    let server = TestServer::new().await;
    let code = server.create_order().await;
    let notification = payment_notification(&format!("MBVCB.3278.{}.CT tu 0123", code.to_lowercase()), "FT001", 55_000);
    let (status, body) = server.send_webhook(&notification).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), serde_json::json!({ "success": true }));

    let (_, body) = server.get(&format!("/api/order/{code}")).await;
    let order = json(&body);
    assert_eq!(order["paymentStatus"], "completed");
    assert_eq!(order["orderStatus"], "confirmed");
    assert!(order["transactionId"].is_i64());
}

#[actix_web::test]
async fn webhook_always_acknowledges() {
    let server = TestServer::new().await;
    for body in ["this is not json", "[1, 2, 3]", ""] {
        let (status, response) = server.send_webhook(body).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(json(&response)["success"], true);
    }
    // A valid notification for an order we don't know about is stored, and still acknowledged
    let (status, _) = server.send_webhook(&payment_notification("POINTBOARDQ000001", "FT002", 10_000)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server.get("/api/webhook_failures").await;
    assert_eq!(status, StatusCode::OK);
    let failures = json(&body);
    assert_eq!(failures.as_array().unwrap().len(), 3, "{body}");
    let (_, body) = server.get("/api/transactions").await;
    assert_eq!(json(&body).as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn verify_payment() {
    let server = TestServer::new().await;
    let (status, body) = server.get("/api/verify/not-an-order").await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let code = server.create_order().await;
    let (status, body) = server.get(&format!("/api/verify/{code}")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let result = json(&body);
    assert_eq!(result["found"], false);
    assert_eq!(result["status"], "unknown");
    assert!(result.get("transaction").is_none());

    server.send_webhook(&payment_notification(&format!("Thanh toan {code}"), "FT003", 55_000)).await;
    let (status, body) = server.get(&format!("/api/verify/{}", code.to_lowercase())).await;
    assert_eq!(status, StatusCode::OK);
    let result = json(&body);
    assert_eq!(result["found"], true);
    assert_eq!(result["status"], "success");
    assert_eq!(result["transaction"]["referenceCode"], "FT003");
}

#[actix_web::test]
async fn verification_does_not_store_anything() {
    let server = TestServer::new().await;
    let code = server.create_order().await;
    server.get(&format!("/api/verify/{code}")).await;
    let (_, body) = server.get("/api/transactions").await;
    assert!(json(&body).as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn reconcile_a_payment_that_arrived_first() {
    let server = TestServer::new().await;
    // The customer quotes a code that is only stored afterwards
    let code = "POINTBOARDK123456";
    server.send_webhook(&payment_notification(&format!("CK {code}"), "FT004", 55_000)).await;
    let (status, _) = server.post_json("/api/reconcile/POINTBOARDK123456", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = super::helpers::NEW_ORDER_JSON.replacen('{', &format!(r#"{{ "orderNumber": "{code}","#), 1);
    let (status, body) = server.post_json("/api/orders", &request).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = server.post_json(&format!("/api/reconcile/{code}"), "").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = json(&body);
    assert_eq!(order["paymentStatus"], "completed");
    assert_eq!(order["orderStatus"], "confirmed");
}

#[actix_web::test]
async fn reconcile_without_payment() {
    let server = TestServer::new().await;
    let code = server.create_order().await;
    let (status, body) = server.post_json(&format!("/api/reconcile/{code}"), "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json(&body)["error"].as_str().unwrap().contains("No transaction matches"));
    let (status, _) = server.post_json("/api/reconcile/garbage", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
