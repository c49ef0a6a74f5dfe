//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use api::config::Config;
use api::mailer::InMemoryTransport;
use api::state::{AppState, MemoryBackend, create_memory_state};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::ProductId;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const ADMIN_EMAIL: &str = "admin@shop.test";

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: Router,
    state: Arc<AppState<MemoryBackend>>,
    transport: InMemoryTransport,
}

impl TestApp {
    fn new() -> Self {
        let config = Config {
            admin_emails: vec![ADMIN_EMAIL.to_string()],
            commit_retry_backoff_ms: 1,
            ..Config::default()
        };
        let transport = InMemoryTransport::new();
        let state = create_memory_state(&config, Arc::new(transport.clone()));
        let app = api::create_app(state.clone(), get_metrics_handle());
        Self {
            app,
            state,
            transport,
        }
    }

    async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_string(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn signup(&self, name: &str, email: &str) -> String {
        let (status, json) = self
            .request(
                "POST",
                "/signup",
                None,
                Some(json!({ "name": name, "email": email, "password": "hunter22" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {json}");
        json["access_token"].as_str().unwrap().to_string()
    }

    async fn admin(&self) -> String {
        self.signup("Admin", ADMIN_EMAIL).await
    }

    async fn create_product(&self, admin_token: &str, name: &str, qty: u32) -> String {
        let (status, json) = self
            .request(
                "POST",
                "/products",
                Some(admin_token),
                Some(json!({
                    "name": name,
                    "description": format!("{name} description"),
                    "quantity_on_hand": qty
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create product failed: {json}");
        json["id"].as_str().unwrap().to_string()
    }

    async fn stock(&self, id: &str) -> u32 {
        let product_id = ProductId::parse(id).unwrap();
        self.state
            .products
            .get(product_id)
            .await
            .unwrap()
            .quantity_on_hand
    }
}

#[tokio::test]
async fn test_health_check() {
    let t = TestApp::new();

    let (status, json) = t.request("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["storage"], "memory");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = TestApp::new();

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_signup_returns_session_and_sends_welcome_mail() {
    let t = TestApp::new();

    let (status, json) = t
        .request(
            "POST",
            "/signup",
            None,
            Some(json!({ "name": "Ada", "email": "Ada@Shop.test", "password": "hunter22" })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["user"]["email"], "ada@shop.test");
    assert_eq!(json["user"]["roles"], json!(["customer"]));
    assert!(json["user"].get("password_hash").is_none());
    assert!(json["access_token"].as_str().is_some());

    let mut sent = Vec::new();
    for _ in 0..100 {
        sent = t.transport.sent().await;
        if !sent.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ada@shop.test");
    assert_eq!(sent[0].subject, "Welcome!");
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let t = TestApp::new();
    t.signup("Ada", "ada@shop.test").await;

    let (status, json) = t
        .request(
            "POST",
            "/signup",
            None,
            Some(json!({ "name": "Other", "email": "ada@shop.test", "password": "hunter22" })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "Email already exists");
}

#[tokio::test]
async fn test_login_and_logout() {
    let t = TestApp::new();
    t.signup("Ada", "ada@shop.test").await;

    let (status, _) = t
        .request(
            "POST",
            "/login",
            None,
            Some(json!({ "email": "ada@shop.test", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = t
        .request(
            "POST",
            "/login",
            None,
            Some(json!({ "email": "ada@shop.test", "password": "hunter22" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = json["access_token"].as_str().unwrap().to_string();

    let (status, _) = t.request("POST", "/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = t.request("GET", "/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_all_revokes_every_session() {
    let t = TestApp::new();
    let first = t.signup("Ada", "ada@shop.test").await;
    let (_, json) = t
        .request(
            "POST",
            "/login",
            None,
            Some(json!({ "email": "ada@shop.test", "password": "hunter22" })),
        )
        .await;
    let second = json["access_token"].as_str().unwrap().to_string();

    let (status, _) = t.request("POST", "/logout-all", Some(&second), None).await;
    assert_eq!(status, StatusCode::OK);

    for token in [&first, &second] {
        let (status, _) = t.request("GET", "/orders", Some(token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let t = TestApp::new();

    let (status, json) = t.request("GET", "/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Authentication required");

    let (status, _) = t.request("GET", "/products", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_update() {
    let t = TestApp::new();
    let token = t.signup("Ada", "ada@shop.test").await;

    let (status, json) = t
        .request(
            "PATCH",
            "/users/me",
            Some(&token),
            Some(json!({ "name": "Ada Lovelace" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Ada Lovelace");

    let (status, json) = t.request("GET", "/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Ada Lovelace");
}

#[tokio::test]
async fn test_user_administration_requires_admin() {
    let t = TestApp::new();
    let admin = t.admin().await;
    let customer = t.signup("Ada", "ada@shop.test").await;

    let (status, _) = t.request("GET", "/users", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = t.request("GET", "/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (status, _) = t
        .request("GET", "/users/not-a-uuid", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_catalog_management() {
    let t = TestApp::new();
    let admin = t.admin().await;
    let customer = t.signup("Ada", "ada@shop.test").await;

    let (status, _) = t
        .request(
            "POST",
            "/products",
            Some(&customer),
            Some(json!({ "name": "Lamp", "quantity_on_hand": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let lamp = t.create_product(&admin, "Lamp", 3).await;
    t.create_product(&admin, "Desk", 1).await;
    t.create_product(&admin, "Chair", 4).await;

    let (status, json) = t
        .request("GET", "/products?page=1&limit=2", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Chair", "Desk"]);

    let (status, json) = t
        .request(
            "PATCH",
            &format!("/products/{lamp}"),
            Some(&admin),
            Some(json!({ "name": "Floor Lamp" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Floor Lamp");

    let (status, json) = t
        .request(
            "POST",
            &format!("/products/{lamp}/restock"),
            Some(&admin),
            Some(json!({ "amount": 7 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["quantity_on_hand"], 10);

    let (status, _) = t
        .request("DELETE", &format!("/products/{lamp}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = t
        .request("GET", &format!("/products/{lamp}"), Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_place_order_and_read_history() {
    let t = TestApp::new();
    let admin = t.admin().await;
    let customer = t.signup("Ada", "ada@shop.test").await;
    let kettle = t.create_product(&admin, "Kettle", 8).await;

    let (status, placed) = t
        .request(
            "POST",
            "/orders",
            Some(&customer),
            Some(json!({ "items": [{ "product_id": kettle, "quantity": 3 }] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "place order failed: {placed}");
    assert_eq!(placed["items"][0]["ordered_quantity"], 3);
    assert_eq!(placed["items"][0]["product"]["name"], "Kettle");
    assert_eq!(t.stock(&kettle).await, 5);

    let (status, history) = t.request("GET", "/orders", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["id"], placed["id"]);
    assert_eq!(
        history[0]["items"][0]["product"]["description"],
        "Kettle description"
    );

    let (_, admin_history) = t.request("GET", "/orders", Some(&admin), None).await;
    assert!(admin_history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_order_rejections() {
    let t = TestApp::new();
    let admin = t.admin().await;
    let customer = t.signup("Ada", "ada@shop.test").await;
    let chair = t.create_product(&admin, "Chair", 10).await;
    let table = t.create_product(&admin, "Table", 5).await;

    let (status, json) = t
        .request(
            "POST",
            "/orders",
            Some(&customer),
            Some(json!({ "items": [
                { "product_id": chair, "quantity": 2 },
                { "product_id": table, "quantity": 1000 }
            ] })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        json["error"],
        format!("Insufficient stock for product {table}: requested 1000, available 5")
    );
    assert_eq!(t.stock(&chair).await, 10);
    assert_eq!(t.stock(&table).await, 5);

    let (status, _) = t
        .request("POST", "/orders", Some(&customer), Some(json!({ "items": [] })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .request(
            "POST",
            "/orders",
            Some(&customer),
            Some(json!({ "items": [{ "product_id": chair, "quantity": 0 }] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .request(
            "POST",
            "/orders",
            Some(&customer),
            Some(json!({ "items": [{ "product_id": ProductId::new(), "quantity": 1 }] })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, history) = t.request("GET", "/orders", Some(&customer), None).await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_orders_over_http_do_not_oversell() {
    let t = TestApp::new();
    let admin = t.admin().await;
    let first = t.signup("Ada", "ada@shop.test").await;
    let second = t.signup("Grace", "grace@shop.test").await;
    let lamp = t.create_product(&admin, "Lamp", 10).await;

    let body = json!({ "items": [{ "product_id": lamp, "quantity": 6 }] });
    let (a, b) = tokio::join!(
        t.request("POST", "/orders", Some(&first), Some(body.clone())),
        t.request("POST", "/orders", Some(&second), Some(body.clone())),
    );

    let mut statuses = vec![a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);
    assert_eq!(t.stock(&lamp).await, 4);
}
