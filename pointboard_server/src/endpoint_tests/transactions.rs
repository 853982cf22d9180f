use actix_web::{http::StatusCode, test::TestRequest};

use super::helpers::{json, payment_notification, TestServer};

async fn store_pending_transaction(server: &TestServer, content: &str, reference: &str) -> i64 {
    let notification = payment_notification(content, reference, 54_000).replace("success", "pending");
    server.send_webhook(&notification).await;
    let (_, body) = server.get("/api/transactions?limit=1").await;
    let transactions = json(&body);
    assert_eq!(transactions[0]["referenceCode"], reference);
    transactions[0]["id"].as_i64().unwrap()
}

#[actix_web::test]
async fn list_and_fetch_transactions() {
    let server = TestServer::new().await;
    for i in 1..=3 {
        server.send_webhook(&payment_notification("no code here", &format!("FT10{i}"), 1_000 * i)).await;
    }
    let (status, body) = server.get("/api/transactions").await;
    assert_eq!(status, StatusCode::OK);
    let all = json(&body);
    assert_eq!(all.as_array().unwrap().len(), 3);
    assert_eq!(all[0]["referenceCode"], "FT103", "Most recent first");

    let (_, body) = server.get("/api/transactions?limit=2").await;
    assert_eq!(json(&body).as_array().unwrap().len(), 2);

    let id = all[2]["id"].as_i64().unwrap();
    let (status, body) = server.get(&format!("/api/transactions/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    let tx = json(&body);
    assert_eq!(tx["referenceCode"], "FT101");
    assert_eq!(tx["transferAmount"], 1_000);
    assert_eq!(tx["gateway"], "Vietcombank");

    let (status, _) = server.get("/api/transactions/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn transaction_status_updates() {
    let server = TestServer::new().await;
    let id = store_pending_transaction(&server, "no code", "FT201").await;
    let update = |status: &str| format!(r#"{{"id": {id}, "status": "{status}"}}"#);

    let (status, body) = server.patch_json("/api/transaction_status", &update("processing")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["status"], "processing");

    let (status, body) = server.patch_json("/api/transaction_status", &update("processing")).await;
    assert_eq!(status, StatusCode::OK, "Setting the same status again is harmless: {body}");

    let (status, _) = server.patch_json("/api/transaction_status", &update("rejected")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server.patch_json("/api/transaction_status", &update("completed")).await;
    assert_eq!(status, StatusCode::CONFLICT, "Rejected transactions are final: {body}");

    let missing = r#"{"id": 9999, "status": "completed"}"#;
    let (status, _) = server.patch_json("/api/transaction_status", missing).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn completing_a_transaction_reconciles_it() {
    let server = TestServer::new().await;
    let code = server.create_order().await;
    let id = store_pending_transaction(&server, &format!("payment {code}"), "FT301").await;
    let (_, body) = server.get(&format!("/api/order/{code}")).await;
    assert_eq!(json(&body)["paymentStatus"], "pending");

    let correction = r#"{"transferAmount": 55000, "gateway": "MB Bank"}"#;
    let (status, body) = server.post_json(&format!("/api/transactions/{id}/complete"), correction).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let outcome = json(&body);
    assert_eq!(outcome["transaction"]["status"], "completed");
    assert_eq!(outcome["transaction"]["transferAmount"], 55_000);
    assert_eq!(outcome["transaction"]["gateway"], "MB Bank");
    assert_eq!(outcome["order"]["orderNumber"].as_str(), Some(code.as_str()));
    assert_eq!(outcome["order"]["paymentStatus"], "completed");
    assert_eq!(outcome["order"]["orderStatus"], "confirmed");
}

#[actix_web::test]
async fn completing_without_a_body() {
    let server = TestServer::new().await;
    let id = store_pending_transaction(&server, "no code", "FT401").await;
    let (status, body) = server.send(TestRequest::post().uri(&format!("/api/transactions/{id}/complete"))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let outcome = json(&body);
    assert_eq!(outcome["transaction"]["status"], "completed");
    assert_eq!(outcome["transaction"]["transferAmount"], 54_000);

    let (status, _) = server.send(TestRequest::post().uri("/api/transactions/9999/complete")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
