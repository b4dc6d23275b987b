#![allow(dead_code)]

use chrono::Utc;
use quotation_service::config::{
    DatabaseBackend, DatabaseConfig, ListingConfig, NumberingConfig, QuotationConfig,
};
use quotation_service::models::{Customer, Product};
use quotation_service::services::{InMemoryStore, QuotationService};
use quotation_service::startup::Application;
use reqwest::{Client, Response};
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;

pub const TEST_USER_ID: &str = "test_user_123";
pub const CUSTOMER_ID: &str = "cust-asha";
pub const OTHER_CUSTOMER_ID: &str = "cust-ravi";
pub const LAPTOP_ID: &str = "prod-laptop";
pub const MOUSE_ID: &str = "prod-mouse";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: InMemoryStore,
    pub client: Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_page_size(100).await
    }

    pub async fn spawn_with_page_size(max_page_size: u64) -> Self {
        let store = InMemoryStore::new();
        seed(&store).await;

        let config = QuotationConfig {
            common: CoreConfig {
                port: 0, // Random port for testing
                log_level: "info".to_string(),
                otlp_endpoint: None,
            },
            database: DatabaseConfig {
                backend: DatabaseBackend::Memory,
                mongodb: None,
            },
            numbering: NumberingConfig {
                prefix: "QT".to_string(),
                max_attempts: 5,
            },
            listing: ListingConfig { max_page_size },
        };

        let service = QuotationService::with_backend(store.clone(), &config.numbering.prefix);
        let app = Application::build_with_service(config, service)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections
        let client = Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            store,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .header("X-User-ID", TEST_USER_ID)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .header("X-User-ID", TEST_USER_ID)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn create_quotation(&self, body: &Value) -> Response {
        self.post_json("/api/quotations", body).await
    }

    /// Create a quotation and return its JSON representation.
    pub async fn create_default(&self) -> Value {
        let response = self.create_quotation(&laptop_quotation()).await;
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.expect("Failed to parse response")
    }
}

async fn seed(store: &InMemoryStore) {
    let mut asha = Customer::new(CUSTOMER_ID, "Asha");
    asha.last_name = Some("Verma".to_string());
    asha.avatar = Some("avatars/asha.png".to_string());
    store.add_customer(asha).await;

    let mut ravi = Customer::new(OTHER_CUSTOMER_ID, "Ravi");
    ravi.last_name = Some("Kumar".to_string());
    store.add_customer(ravi).await;

    store.add_product(Product::new(LAPTOP_ID, "Laptop Pro 14")).await;
    store.add_product(Product::new(MOUSE_ID, "Wireless Mouse")).await;
}

/// `QT-YYYYMMDD-` for the current UTC day.
pub fn today_prefix() -> String {
    format!("QT-{}-", Utc::now().format("%Y%m%d"))
}

pub fn laptop_quotation() -> Value {
    json!({
        "customer_id": CUSTOMER_ID,
        "date": "2024-05-01",
        "validity": "2024-05-31",
        "reference": "RFQ-881",
        "items": [
            { "product_id": LAPTOP_ID, "qty": 1, "rate": 69999, "discount_percent": 0, "tax_percent": 18 }
        ]
    })
}
