//! Persistence seams used by the quotation service.
//!
//! Each backend (MongoDB, in-memory) implements all four traits.

use super::QuotationError;
use crate::models::{Customer, Quotation, QuotationStatus};
use async_trait::async_trait;
use std::collections::HashMap;

/// Free-text search across quotation number, reference and customer.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub text: String,
    /// Customers whose name matched `text`.
    pub customer_ids: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct QuotationFilter {
    pub status: Option<QuotationStatus>,
    pub customer_id: Option<String>,
    pub product_id: Option<String>,
    pub search: Option<SearchFilter>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Date,
    Validity,
    QuotationNumber,
    Status,
}

impl SortField {
    pub fn field_name(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Date => "date",
            SortField::Validity => "validity",
            SortField::QuotationNumber => "quotation_number",
            SortField::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_i32(&self) -> i32 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub skip: u64,
    pub limit: u64,
    pub sort: SortField,
    pub order: SortOrder,
}

#[async_trait]
pub trait QuotationStore: Send + Sync {
    /// Fails with `DuplicateNumber` when the quotation number is taken.
    async fn insert(&self, quotation: &Quotation) -> Result<(), QuotationError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Quotation>, QuotationError>;

    /// Returns false when no quotation has this id.
    async fn replace(&self, quotation: &Quotation) -> Result<bool, QuotationError>;

    async fn set_status(
        &self,
        id: &str,
        status: QuotationStatus,
    ) -> Result<Option<Quotation>, QuotationError>;

    /// Move to `Converted` unless already there. Returns false when the
    /// quotation was already converted (or is gone).
    async fn mark_converted(
        &self,
        id: &str,
        document_ref: Option<String>,
    ) -> Result<bool, QuotationError>;

    async fn delete(&self, id: &str) -> Result<bool, QuotationError>;

    async fn delete_many(&self, ids: &[String]) -> Result<u64, QuotationError>;

    async fn update_status_many(
        &self,
        ids: &[String],
        status: QuotationStatus,
    ) -> Result<u64, QuotationError>;

    async fn count(&self, filter: &QuotationFilter) -> Result<u64, QuotationError>;

    async fn list(
        &self,
        filter: &QuotationFilter,
        page: &PageRequest,
    ) -> Result<Vec<Quotation>, QuotationError>;

    /// Greatest quotation number starting with `prefix`, if any. Suffixes
    /// widen past four digits, so a longer number always ranks higher.
    async fn last_number_with_prefix(&self, prefix: &str)
        -> Result<Option<String>, QuotationError>;

    async fn health_check(&self) -> Result<(), QuotationError>;
}

#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Atomically increment the counter for `key` and return the new value.
    /// A missing counter starts from zero.
    async fn increment(&self, key: &str) -> Result<u32, QuotationError>;

    async fn current(&self, key: &str) -> Result<Option<u32>, QuotationError>;

    /// Raise the counter to at least `floor`; never lowers it.
    async fn raise_to(&self, key: &str, floor: u32) -> Result<(), QuotationError>;
}

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Customer>, QuotationError>;

    async fn find_many(&self, ids: &[String]) -> Result<Vec<Customer>, QuotationError>;

    /// Ids of customers whose first or last name contains `text`, ignoring case.
    async fn search_ids(&self, text: &str) -> Result<Vec<String>, QuotationError>;
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Display names keyed by product id; unknown ids are simply absent.
    async fn names_for(&self, ids: &[String]) -> Result<HashMap<String, String>, QuotationError>;
}
