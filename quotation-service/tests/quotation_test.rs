mod common;

use common::{
    laptop_quotation, today_prefix, TestApp, CUSTOMER_ID, LAPTOP_ID, MOUSE_ID, OTHER_CUSTOMER_ID,
};
use quotation_service::models::{Quotation, QuotationDraft, QuotationStatus, QuotationType};
use quotation_service::pricing::LineItem;
use quotation_service::services::QuotationStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::str::FromStr;

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("money is serialized as a string"))
        .expect("invalid decimal")
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn create_prices_numbers_and_enriches() {
    let app = TestApp::spawn().await;

    let response = app.create_quotation(&laptop_quotation()).await;
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(
        body["quotation_number"],
        format!("{}0001", today_prefix())
    );
    assert_eq!(body["subtotal"], "69999.00");
    assert_eq!(body["grand_total"], "82598.82");
    assert!(body["amount_in_words"]
        .as_str()
        .unwrap()
        .starts_with("Eighty Two Thousand Five Hundred Ninety"));
    assert!(body["amount_in_words"]
        .as_str()
        .unwrap()
        .ends_with("Rupees Only"));

    assert_eq!(body["status"], "Pending");
    assert_eq!(body["quotation_type"], "Intrastate");
    assert_eq!(body["customer_name"], "Asha Verma");
    assert_eq!(body["customer_avatar"], "avatars/asha.png");
    assert!(body["converted_document_ref"].is_null());

    let item = &body["items"][0];
    assert_eq!(item["product_name"], "Laptop Pro 14");
    assert_eq!(decimal(&item["unit_cost"]), dec!(69999));
    assert_eq!(item["tax_amount"], "12599.82");
    assert_eq!(item["total_cost"], "82598.82");
}

#[tokio::test]
async fn sequential_creates_get_gapless_numbers() {
    let app = TestApp::spawn().await;
    let prefix = today_prefix();

    for expected in 1..=3 {
        let body = app.create_default().await;
        assert_eq!(
            body["quotation_number"],
            format!("{}{:04}", prefix, expected)
        );
    }
}

#[tokio::test]
async fn concurrent_creates_get_distinct_gapless_numbers() {
    let app = TestApp::spawn().await;
    let body = laptop_quotation();

    let responses = futures::future::join_all((0..20).map(|_| app.create_quotation(&body))).await;

    let mut numbers = Vec::new();
    for response in responses {
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.expect("Failed to parse response");
        numbers.push(body["quotation_number"].as_str().unwrap().to_string());
    }
    numbers.sort();

    let prefix = today_prefix();
    let expected: Vec<String> = (1..=20).map(|n| format!("{}{:04}", prefix, n)).collect();
    assert_eq!(numbers, expected);
}

#[tokio::test]
async fn create_skips_numbers_taken_outside_the_counter() {
    let app = TestApp::spawn().await;
    let today = chrono::Utc::now().date_naive();

    // A quotation imported for today without touching the counter
    let draft = QuotationDraft {
        customer_id: CUSTOMER_ID.to_string(),
        date: today,
        validity: today,
        reference: String::new(),
        quotation_type: QuotationType::Intrastate,
        description: String::new(),
        status: QuotationStatus::Pending,
        items: vec![LineItem::new(LAPTOP_ID, 1, dec!(10))],
    };
    let imported = Quotation::from_draft(&draft, format!("{}0001", today_prefix()));
    app.store.insert(&imported).await.unwrap();

    let body = app.create_default().await;
    assert_eq!(body["quotation_number"], format!("{}0002", today_prefix()));
}

#[tokio::test]
async fn create_rejects_missing_fields() {
    let app = TestApp::spawn().await;

    let response = app
        .create_quotation(&json!({ "customer_id": CUSTOMER_ID, "items": [] }))
        .await;
    assert_eq!(response.status().as_u16(), 422);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Validation error");
    let details = body["details"].as_str().unwrap();
    assert!(details.contains("date"));
    assert!(details.contains("items"));
}

#[tokio::test]
async fn create_rejects_invalid_line_values() {
    let app = TestApp::spawn().await;

    for item in [
        json!({ "product_id": LAPTOP_ID, "qty": 0, "rate": 10 }),
        json!({ "product_id": LAPTOP_ID, "qty": 1, "rate": -10 }),
        json!({ "product_id": LAPTOP_ID, "qty": 1, "rate": 10, "discount_percent": 150 }),
    ] {
        let mut body = laptop_quotation();
        body["items"] = json!([item]);
        let response = app.create_quotation(&body).await;
        assert_eq!(response.status().as_u16(), 422, "accepted {}", item);
    }
}

#[tokio::test]
async fn oversized_line_lists_are_rejected_before_pricing() {
    let app = TestApp::spawn().await;
    let line = json!({
        "product_id": LAPTOP_ID,
        "qty": 4_294_967_295u32,
        "rate": "1000000000000000",
        "tax_percent": 1000
    });

    let response = app
        .post_json("/api/quotations/preview", &json!({ "items": vec![line; 2000] }))
        .await;
    assert_eq!(response.status().as_u16(), 422);

    let line = json!({ "product_id": LAPTOP_ID, "qty": 1, "rate": "10" });
    let mut body = laptop_quotation();
    body["items"] = json!(vec![line; 1001]);
    let response = app.create_quotation(&body).await;
    assert_eq!(response.status().as_u16(), 422);

    let app_still_up = app.get("/health").await;
    assert_eq!(app_still_up.status().as_u16(), 200);
}

#[tokio::test]
async fn create_rejects_unknown_customer() {
    let app = TestApp::spawn().await;

    let mut body = laptop_quotation();
    body["customer_id"] = json!("nobody");
    let response = app.create_quotation(&body).await;

    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Customer not found");
}

#[tokio::test]
async fn create_rejects_unknown_status() {
    let app = TestApp::spawn().await;

    let mut body = laptop_quotation();
    body["status"] = json!("Archived");
    let response = app.create_quotation(&body).await;

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn missing_product_degrades_to_empty_name() {
    let app = TestApp::spawn().await;

    let mut body = laptop_quotation();
    body["items"] = json!([{ "product_id": "discontinued", "qty": 1, "rate": 5 }]);
    let response = app.create_quotation(&body).await;
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["items"][0]["product_name"], "");
}

// =============================================================================
// Read / update / delete
// =============================================================================

#[tokio::test]
async fn get_returns_enriched_quotation() {
    let app = TestApp::spawn().await;
    let created = app.create_default().await;
    let id = created["id"].as_str().unwrap();

    let response = app.get(&format!("/api/quotations/{}", id)).await;
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["quotation_number"], created["quotation_number"]);
    assert_eq!(body["customer_name"], "Asha Verma");

    let missing = app.get("/api/quotations/does-not-exist").await;
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn update_with_empty_items_keeps_totals() {
    let app = TestApp::spawn().await;
    let created = app.create_default().await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .client
        .put(app.url(&format!("/api/quotations/{}", id)))
        .json(&json!({ "reference": "PO-2291", "items": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["reference"], "PO-2291");
    assert_eq!(body["grand_total"], "82598.82");
    assert_eq!(body["amount_in_words"], created["amount_in_words"]);
    assert_eq!(body["quotation_number"], created["quotation_number"]);
}

#[tokio::test]
async fn update_with_items_replaces_and_recomputes() {
    let app = TestApp::spawn().await;
    let created = app.create_default().await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .client
        .put(app.url(&format!("/api/quotations/{}", id)))
        .json(&json!({
            "customer_id": OTHER_CUSTOMER_ID,
            "items": [
                { "product_id": MOUSE_ID, "qty": 4, "rate": 250, "discount_percent": 10, "tax_percent": 5 }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["customer_name"], "Ravi Kumar");
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["product_name"], "Wireless Mouse");
    // 250 - 10% = 225; +5% tax = 236.25; x4
    assert_eq!(body["subtotal"], "900.00");
    assert_eq!(body["grand_total"], "945.00");
    assert_eq!(body["amount_in_words"], "Nine Hundred Forty Five Rupees Only");
}

#[tokio::test]
async fn update_rejects_unknown_customer() {
    let app = TestApp::spawn().await;
    let created = app.create_default().await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .client
        .put(app.url(&format!("/api/quotations/{}", id)))
        .json(&json!({ "customer_id": "nobody" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn delete_removes_quotation_without_reusing_number() {
    let app = TestApp::spawn().await;
    let first = app.create_default().await;
    let id = first["id"].as_str().unwrap();

    let response = app
        .client
        .delete(app.url(&format!("/api/quotations/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let again = app
        .client
        .delete(app.url(&format!("/api/quotations/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 404);

    let second = app.create_default().await;
    assert_eq!(
        second["quotation_number"],
        format!("{}0002", today_prefix())
    );
}

// =============================================================================
// Status and conversion
// =============================================================================

#[tokio::test]
async fn status_patch_accepts_only_known_statuses() {
    let app = TestApp::spawn().await;
    let created = app.create_default().await;
    let path = format!("/api/quotations/{}/status", created["id"].as_str().unwrap());

    let response = app
        .client
        .patch(app.url(&path))
        .json(&json!({ "status": "Sent" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "Sent");

    let response = app
        .client
        .patch(app.url(&path))
        .json(&json!({ "status": "Archived" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        "Status must be one of: Pending, Sent, Ordered, Converted"
    );
}

#[tokio::test]
async fn convert_succeeds_once() {
    let app = TestApp::spawn().await;
    let created = app.create_default().await;
    let id = created["id"].as_str().unwrap();
    let path = format!("/api/quotations/{}/convert", id);

    let response = app.post_json(&path, &json!({})).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "Converted");
    assert!(body["converted_document_ref"].is_null());

    let response = app.post_json(&path, &json!({})).await;
    assert_eq!(response.status().as_u16(), 409);

    let current: Value = app
        .get(&format!("/api/quotations/{}", id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(current["status"], "Converted");
}

#[tokio::test]
async fn convert_unknown_quotation_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json("/api/quotations/missing/convert", &json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 404);
}

// =============================================================================
// Bulk operations
// =============================================================================

#[tokio::test]
async fn bulk_update_and_delete() {
    let app = TestApp::spawn().await;
    let a = app.create_default().await;
    let b = app.create_default().await;
    let ids = json!([a["id"], b["id"]]);

    let response = app
        .post_json(
            "/api/quotations/bulk-update",
            &json!({ "ids": ids, "status": "Ordered" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["modified_count"], 2);

    let listed: Value = app
        .get("/api/quotations?status=Ordered")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed["total_records"], 2);

    let response = app
        .post_json("/api/quotations/bulk-delete", &json!({ "ids": ids }))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["deleted_count"], 2);
}

#[tokio::test]
async fn bulk_operations_require_ids() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json("/api/quotations/bulk-delete", &json!({ "ids": [] }))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .post_json(
            "/api/quotations/bulk-update",
            &json!({ "ids": [], "status": "Sent" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .post_json(
            "/api/quotations/bulk-update",
            &json!({ "ids": ["x"], "status": "Lost" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn list_paginates_with_defaults() {
    let app = TestApp::spawn().await;
    for _ in 0..12 {
        app.create_default().await;
    }

    let body: Value = app.get("/api/quotations").await.json().await.unwrap();
    assert_eq!(body["current_page"], 1);
    assert_eq!(body["total_records"], 12);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["quotations"].as_array().unwrap().len(), 10);

    let body: Value = app
        .get("/api/quotations?page=2&limit=10&sort_by=quotation_number&sort_order=asc")
        .await
        .json()
        .await
        .unwrap();
    let page = body["quotations"].as_array().unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(
        page[0]["quotation_number"],
        format!("{}0011", today_prefix())
    );
}

#[tokio::test]
async fn list_limit_is_capped() {
    let app = TestApp::spawn_with_page_size(3).await;
    for _ in 0..5 {
        app.create_default().await;
    }

    let body: Value = app
        .get("/api/quotations?limit=50")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["quotations"].as_array().unwrap().len(), 3);
    assert_eq!(body["total_pages"], 2);
}

#[tokio::test]
async fn list_past_the_last_page_is_empty() {
    let app = TestApp::spawn().await;
    app.create_default().await;

    let response = app.get(&format!("/api/quotations?page={}", u64::MAX)).await;
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total_records"], 1);
    assert!(body["quotations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn list_search_matches_number_reference_and_customer() {
    let app = TestApp::spawn().await;
    app.create_default().await;

    let mut ravi = laptop_quotation();
    ravi["customer_id"] = json!(OTHER_CUSTOMER_ID);
    ravi["reference"] = json!("TENDER-(7)");
    app.create_quotation(&ravi).await;

    let by_customer: Value = app
        .get("/api/quotations?search=kumar")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(by_customer["total_records"], 1);
    assert_eq!(by_customer["quotations"][0]["customer_name"], "Ravi Kumar");

    // Regex metacharacters are matched literally
    let by_reference: Value = app
        .get("/api/quotations?search=%287%29")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(by_reference["total_records"], 1);

    let by_number: Value = app
        .get(&format!("/api/quotations?search={}0002", today_prefix()))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(by_number["total_records"], 1);

    let by_customer_id: Value = app
        .get(&format!("/api/quotations?customer_id={}", CUSTOMER_ID))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(by_customer_id["total_records"], 1);

    let by_product: Value = app
        .get(&format!("/api/quotations?product_id={}", MOUSE_ID))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(by_product["total_records"], 0);
}

#[tokio::test]
async fn list_rejects_unknown_status_filter() {
    let app = TestApp::spawn().await;

    let response = app.get("/api/quotations?status=Lost").await;
    assert_eq!(response.status().as_u16(), 400);
}

// =============================================================================
// Preview and number generation
// =============================================================================

#[tokio::test]
async fn preview_prices_without_persisting() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json(
            "/api/quotations/preview",
            &json!({
                "items": [
                    { "product_id": LAPTOP_ID, "qty": 2, "rate": "100", "discount_percent": 10, "tax_percent": 18 },
                    { "product_id": MOUSE_ID, "qty": 1, "rate": "0.5" }
                ]
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["items"][0]["discount_amount"], "10.00");
    assert_eq!(body["items"][0]["unit_cost"], "90.00");
    assert_eq!(body["items"][0]["tax_amount"], "16.20");
    assert_eq!(body["items"][0]["total_cost"], "212.40");
    assert_eq!(body["subtotal"], "180.50");
    assert_eq!(body["grand_total"], "212.90");
    assert_eq!(body["amount_in_words"], "Two Hundred Thirteen Rupees Only");

    let listed: Value = app.get("/api/quotations").await.json().await.unwrap();
    assert_eq!(listed["total_records"], 0);
}

#[tokio::test]
async fn generate_number_previews_without_reserving() {
    let app = TestApp::spawn().await;
    let expected = format!("{}0001", today_prefix());

    for _ in 0..2 {
        let body: Value = app
            .get("/api/quotations/generate-number")
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(body["quotation_number"], expected);
    }

    let created = app.create_default().await;
    assert_eq!(created["quotation_number"], expected);

    let body: Value = app
        .get("/api/quotations/generate-number")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["quotation_number"], format!("{}0002", today_prefix()));
}
