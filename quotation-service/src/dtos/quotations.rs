use crate::models::{QuotationItem, QuotationStatus, QuotationType};
use crate::pricing::{LineItem, PricedLineItem, MONEY_SCALE};
use crate::services::{
    ListQuery, PricingPreview, QuotationPage, QuotationUpdate, QuotationView, SortField,
    SortOrder,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::borrow::Cow;
use validator::{Validate, ValidationError};

/// Rates above this cannot be priced without overflowing intermediate sums.
const MAX_RATE: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// With `MAX_RATE` and 1000% tax, `MAX_ITEMS` lines of `MAX_QTY` total about
/// 1.1e25, well inside `Decimal::MAX`.
pub const MAX_QTY: u32 = 1_000_000;
pub const MAX_ITEMS: u64 = 1_000;

fn range_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn validate_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if *rate < Decimal::ZERO {
        return Err(range_error("range", "Rate cannot be negative"));
    }
    if *rate > MAX_RATE {
        return Err(range_error("range", "Rate is too large"));
    }
    Ok(())
}

fn validate_discount(discount: &Decimal) -> Result<(), ValidationError> {
    if *discount < Decimal::ZERO || *discount > Decimal::ONE_HUNDRED {
        return Err(range_error(
            "range",
            "Discount percent must be between 0 and 100",
        ));
    }
    Ok(())
}

fn validate_tax(tax: &Decimal) -> Result<(), ValidationError> {
    if *tax < Decimal::ZERO || *tax > Decimal::ONE_THOUSAND {
        return Err(range_error("range", "Tax percent must be between 0 and 1000"));
    }
    Ok(())
}

fn parse_status(status: &str) -> Result<QuotationStatus, AppError> {
    status
        .parse()
        .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))
}

/// Stored money always carries two decimals on the wire.
fn money(mut value: Decimal) -> Decimal {
    value.rescale(MONEY_SCALE);
    value
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LineItemRequest {
    #[validate(length(min = 1, message = "Product is required"))]
    pub product_id: String,
    #[validate(range(
        min = 1,
        max = MAX_QTY,
        message = "Quantity must be between 1 and 1000000"
    ))]
    pub qty: u32,
    #[validate(custom(function = "validate_rate"))]
    pub rate: Decimal,
    #[serde(default)]
    #[validate(custom(function = "validate_discount"))]
    pub discount_percent: Decimal,
    #[serde(default)]
    #[validate(custom(function = "validate_tax"))]
    pub tax_percent: Decimal,
}

impl From<LineItemRequest> for LineItem {
    fn from(req: LineItemRequest) -> Self {
        LineItem::new(req.product_id, req.qty, req.rate)
            .with_discount(req.discount_percent)
            .with_tax(req.tax_percent)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuotationRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Customer is required"))]
    pub customer_id: String,
    #[validate(required(message = "Date is required"))]
    pub date: Option<NaiveDate>,
    #[validate(required(message = "Validity is required"))]
    pub validity: Option<NaiveDate>,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub quotation_type: QuotationType,
    #[serde(default)]
    pub description: String,
    pub status: Option<String>,
    #[serde(default)]
    #[validate(
        length(min = 1, max = MAX_ITEMS, message = "Between 1 and 1000 items are required"),
        nested
    )]
    pub items: Vec<LineItemRequest>,
}

impl CreateQuotationRequest {
    /// Call after `validate()`.
    pub fn into_draft(self) -> Result<crate::models::QuotationDraft, AppError> {
        let status = match self.status.as_deref() {
            Some(s) => parse_status(s)?,
            None => QuotationStatus::default(),
        };
        let date = self
            .date
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Date is required")))?;
        let validity = self
            .validity
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Validity is required")))?;

        Ok(crate::models::QuotationDraft {
            customer_id: self.customer_id,
            date,
            validity,
            reference: self.reference,
            quotation_type: self.quotation_type,
            description: self.description,
            status,
            items: self.items.into_iter().map(LineItem::from).collect(),
        })
    }
}

/// Every field is optional; an empty `items` list leaves the lines untouched.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuotationRequest {
    #[validate(length(min = 1, message = "Customer cannot be empty"))]
    pub customer_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub validity: Option<NaiveDate>,
    pub reference: Option<String>,
    pub quotation_type: Option<QuotationType>,
    pub description: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    #[validate(length(max = MAX_ITEMS, message = "At most 1000 items are allowed"), nested)]
    pub items: Vec<LineItemRequest>,
}

impl UpdateQuotationRequest {
    pub fn into_update(self) -> Result<QuotationUpdate, AppError> {
        let status = self.status.as_deref().map(parse_status).transpose()?;
        Ok(QuotationUpdate {
            customer_id: self.customer_id,
            date: self.date,
            validity: self.validity,
            reference: self.reference,
            quotation_type: self.quotation_type,
            description: self.description,
            status,
            items: Some(self.items.into_iter().map(LineItem::from).collect()),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PreviewRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, max = MAX_ITEMS, message = "Between 1 and 1000 items are required"),
        nested
    )]
    pub items: Vec<LineItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

impl StatusRequest {
    pub fn parse(&self) -> Result<QuotationStatus, AppError> {
        parse_status(&self.status)
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateRequest {
    #[serde(default)]
    pub ids: Vec<String>,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuotationsParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub customer_id: Option<String>,
    pub product_id: Option<String>,
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortOrder>,
}

impl ListQuotationsParams {
    pub fn into_query(self) -> Result<ListQuery, AppError> {
        let status = self
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(parse_status)
            .transpose()?;
        let defaults = ListQuery::default();

        Ok(ListQuery {
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
            search: self.search,
            status,
            customer_id: self.customer_id.filter(|s| !s.is_empty()),
            product_id: self.product_id.filter(|s| !s.is_empty()),
            sort: self.sort_by.unwrap_or(defaults.sort),
            order: self.sort_order.unwrap_or(defaults.order),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub qty: u32,
    pub rate: Decimal,
    pub discount_percent: Decimal,
    pub tax_percent: Decimal,
    pub unit_cost: Decimal,
    pub tax_amount: Decimal,
    pub total_cost: Decimal,
}

impl ItemResponse {
    fn from_item(item: QuotationItem, product_name: String) -> Self {
        let line = item.line;
        Self {
            id: item.id,
            product_id: line.product_id,
            product_name,
            qty: line.qty,
            rate: line.rate,
            discount_percent: line.discount_percent,
            tax_percent: line.tax_percent,
            unit_cost: money(line.unit_cost),
            tax_amount: money(line.tax_amount),
            total_cost: money(line.total_cost),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuotationResponse {
    pub id: String,
    pub quotation_number: String,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_avatar: Option<String>,
    pub date: NaiveDate,
    pub validity: NaiveDate,
    pub reference: String,
    pub quotation_type: QuotationType,
    pub items: Vec<ItemResponse>,
    pub subtotal: Decimal,
    pub grand_total: Decimal,
    pub amount_in_words: String,
    pub description: String,
    pub status: QuotationStatus,
    pub converted_document_ref: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<QuotationView> for QuotationResponse {
    fn from(view: QuotationView) -> Self {
        let customer_name = view.customer_name();
        let customer_avatar = view.customer.as_ref().and_then(|c| c.avatar.clone());
        let items = view
            .quotation
            .items
            .iter()
            .cloned()
            .map(|item| {
                let name = view.product_name(&item.line.product_id);
                ItemResponse::from_item(item, name)
            })
            .collect();
        let q = view.quotation;

        Self {
            id: q.id,
            quotation_number: q.quotation_number,
            customer_id: q.customer_id,
            customer_name,
            customer_avatar,
            date: q.date,
            validity: q.validity,
            reference: q.reference,
            quotation_type: q.quotation_type,
            items,
            subtotal: money(q.subtotal),
            grand_total: money(q.grand_total),
            amount_in_words: q.amount_in_words,
            description: q.description,
            status: q.status,
            converted_document_ref: q.converted_document_ref,
            created_at: q.created_at.to_rfc3339(),
            updated_at: q.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuotationListResponse {
    pub quotations: Vec<QuotationResponse>,
    pub current_page: u64,
    pub total_pages: u64,
    pub total_records: u64,
}

impl From<QuotationPage> for QuotationListResponse {
    fn from(page: QuotationPage) -> Self {
        Self {
            quotations: page
                .quotations
                .into_iter()
                .map(QuotationResponse::from)
                .collect(),
            current_page: page.current_page,
            total_pages: page.total_pages,
            total_records: page.total_records,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PreviewItemResponse {
    pub product_id: String,
    pub qty: u32,
    pub rate: Decimal,
    pub discount_percent: Decimal,
    pub tax_percent: Decimal,
    pub discount_amount: Decimal,
    pub unit_cost: Decimal,
    pub tax_amount: Decimal,
    pub total_cost: Decimal,
}

impl From<PricedLineItem> for PreviewItemResponse {
    fn from(line: PricedLineItem) -> Self {
        Self {
            discount_amount: money(line.discount_amount()),
            unit_cost: money(line.unit_cost),
            tax_amount: money(line.tax_amount),
            total_cost: money(line.total_cost),
            product_id: line.product_id,
            qty: line.qty,
            rate: line.rate,
            discount_percent: line.discount_percent,
            tax_percent: line.tax_percent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub items: Vec<PreviewItemResponse>,
    pub subtotal: Decimal,
    pub grand_total: Decimal,
    pub amount_in_words: String,
}

impl From<PricingPreview> for PreviewResponse {
    fn from(preview: PricingPreview) -> Self {
        Self {
            items: preview
                .items
                .into_iter()
                .map(PreviewItemResponse::from)
                .collect(),
            subtotal: money(preview.totals.subtotal),
            grand_total: money(preview.totals.grand_total),
            amount_in_words: preview.amount_in_words,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NumberResponse {
    pub quotation_number: String,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub id: String,
    pub quotation_number: String,
    pub status: QuotationStatus,
    pub converted_document_ref: Option<String>,
}

impl From<QuotationView> for ConvertResponse {
    fn from(view: QuotationView) -> Self {
        let q = view.quotation;
        Self {
            id: q.id,
            quotation_number: q.quotation_number,
            status: q.status,
            converted_document_ref: q.converted_document_ref,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted_count: u64,
}

#[derive(Debug, Serialize)]
pub struct BulkUpdateResponse {
    pub modified_count: u64,
}
