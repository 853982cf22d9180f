use actix_web::{http::StatusCode, test, test::TestRequest, App};
use log::debug;
use pointboard_engine::{events::EventProducers, test_utils::new_test_database, SqliteDatabase};
use serde_json::Value;

use crate::{
    config::{ServerConfig, ServerOptions},
    server::configure_app,
};

pub const NEW_ORDER_JSON: &str = r#"{
    "orderId": "web-1001",
    "customer": { "name": "Tran Thi B", "email": "b@example.com", "phone": "0912345678" },
    "shippingAddress": "12 Le Loi, District 1, HCMC",
    "items": [
        { "productId": "mug-blue", "productName": "Blue mug", "quantity": 2, "price": 25000 }
    ],
    "includeVAT": true
}"#;

pub struct TestServer {
    pub db: SqliteDatabase,
    options: ServerOptions,
}

impl TestServer {
    pub async fn new() -> Self {
        let _ = env_logger::try_init().ok();
        let db = new_test_database().await;
        let options = ServerOptions::from_config(&ServerConfig::default());
        Self { db, options }
    }

    /// Sends the request through a freshly configured app. State lives in the database, so it carries over between
    /// calls.
    pub async fn send(&self, req: TestRequest) -> (StatusCode, String) {
        let db = self.db.clone();
        let options = self.options.clone();
        let app = App::new().configure(move |cfg| configure_app(cfg, db, EventProducers::default(), &options));
        let service = test::init_service(app).await;
        debug!("Making request");
        let res = test::call_service(&service, req.to_request()).await;
        let status = res.status();
        let body = test::read_body(res).await;
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    pub async fn get(&self, path: &str) -> (StatusCode, String) {
        self.send(TestRequest::get().uri(path)).await
    }

    pub async fn send_json(&self, req: TestRequest, body: &str) -> (StatusCode, String) {
        let req = req.insert_header(("content-type", "application/json")).set_payload(body.to_string());
        self.send(req).await
    }

    pub async fn post_json(&self, path: &str, body: &str) -> (StatusCode, String) {
        self.send_json(TestRequest::post().uri(path), body).await
    }

    pub async fn patch_json(&self, path: &str, body: &str) -> (StatusCode, String) {
        self.send_json(TestRequest::patch().uri(path), body).await
    }

    /// Creates the standard order (2 x 25,000 plus 10% VAT) and returns its payment code.
    pub async fn create_order(&self) -> String {
        let (status, body) = self.post_json("/api/orders", NEW_ORDER_JSON).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let order = json(&body);
        order["paymentCode"].as_str().expect("paymentCode missing").to_string()
    }

    pub async fn send_webhook(&self, body: &str) -> (StatusCode, String) {
        self.post_json("/webhook/payment", body).await
    }
}

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON ({e}): {body}"))
}

pub fn payment_notification(content: &str, reference: &str, amount: i64) -> String {
    serde_json::json!({
        "gateway": "Vietcombank",
        "transactionDate": "2024-06-01 10:15:00",
        "accountNumber": "0071000123456",
        "content": content,
        "transferAmount": amount,
        "referenceCode": reference,
        "status": "success"
    })
    .to_string()
}
