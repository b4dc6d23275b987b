//! Process-local backend used for development runs and the test suite.

use super::store::{
    CustomerDirectory, PageRequest, ProductCatalog, QuotationFilter, QuotationStore,
    SequenceStore, SortField, SortOrder,
};
use super::QuotationError;
use crate::models::{Customer, Product, Quotation, QuotationStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    quotations: RwLock<HashMap<String, Quotation>>,
    counters: RwLock<HashMap<String, u32>>,
    customers: RwLock<HashMap<String, Customer>>,
    products: RwLock<HashMap<String, Product>>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_customer(&self, customer: Customer) {
        self.inner
            .customers
            .write()
            .await
            .insert(customer.id.clone(), customer);
    }

    pub async fn add_product(&self, product: Product) {
        self.inner
            .products
            .write()
            .await
            .insert(product.id.clone(), product);
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches(filter: &QuotationFilter, q: &Quotation) -> bool {
    if filter.status.is_some_and(|s| s != q.status) {
        return false;
    }
    if filter
        .customer_id
        .as_ref()
        .is_some_and(|c| *c != q.customer_id)
    {
        return false;
    }
    if let Some(product_id) = &filter.product_id {
        if !q.items.iter().any(|i| i.line.product_id == *product_id) {
            return false;
        }
    }
    if let Some(search) = &filter.search {
        return contains_ignore_case(&q.quotation_number, &search.text)
            || contains_ignore_case(&q.reference, &search.text)
            || search.customer_ids.contains(&q.customer_id);
    }
    true
}

fn compare(field: SortField, a: &Quotation, b: &Quotation) -> Ordering {
    let ordering = match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::Date => a.date.cmp(&b.date),
        SortField::Validity => a.validity.cmp(&b.validity),
        SortField::QuotationNumber => a.quotation_number.cmp(&b.quotation_number),
        SortField::Status => a.status.as_str().cmp(b.status.as_str()),
    };
    ordering.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl QuotationStore for InMemoryStore {
    async fn insert(&self, quotation: &Quotation) -> Result<(), QuotationError> {
        let mut quotations = self.inner.quotations.write().await;
        if quotations
            .values()
            .any(|q| q.quotation_number == quotation.quotation_number)
        {
            return Err(QuotationError::DuplicateNumber(
                quotation.quotation_number.clone(),
            ));
        }
        quotations.insert(quotation.id.clone(), quotation.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Quotation>, QuotationError> {
        Ok(self.inner.quotations.read().await.get(id).cloned())
    }

    async fn replace(&self, quotation: &Quotation) -> Result<bool, QuotationError> {
        let mut quotations = self.inner.quotations.write().await;
        match quotations.get_mut(&quotation.id) {
            Some(existing) => {
                *existing = quotation.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_status(
        &self,
        id: &str,
        status: QuotationStatus,
    ) -> Result<Option<Quotation>, QuotationError> {
        let mut quotations = self.inner.quotations.write().await;
        Ok(quotations.get_mut(id).map(|q| {
            q.status = status;
            q.updated_at = Utc::now();
            q.clone()
        }))
    }

    async fn mark_converted(
        &self,
        id: &str,
        document_ref: Option<String>,
    ) -> Result<bool, QuotationError> {
        let mut quotations = self.inner.quotations.write().await;
        match quotations.get_mut(id) {
            Some(q) if !q.is_converted() => {
                q.status = QuotationStatus::Converted;
                q.converted_document_ref = document_ref;
                q.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, QuotationError> {
        Ok(self.inner.quotations.write().await.remove(id).is_some())
    }

    async fn delete_many(&self, ids: &[String]) -> Result<u64, QuotationError> {
        let mut quotations = self.inner.quotations.write().await;
        Ok(ids.iter().filter(|id| quotations.remove(*id).is_some()).count() as u64)
    }

    async fn update_status_many(
        &self,
        ids: &[String],
        status: QuotationStatus,
    ) -> Result<u64, QuotationError> {
        let mut quotations = self.inner.quotations.write().await;
        let now = Utc::now();
        let mut modified = 0;
        for id in ids {
            if let Some(q) = quotations.get_mut(id) {
                if q.status != status {
                    q.status = status;
                    q.updated_at = now;
                    modified += 1;
                }
            }
        }
        Ok(modified)
    }

    async fn count(&self, filter: &QuotationFilter) -> Result<u64, QuotationError> {
        let quotations = self.inner.quotations.read().await;
        Ok(quotations.values().filter(|q| matches(filter, q)).count() as u64)
    }

    async fn list(
        &self,
        filter: &QuotationFilter,
        page: &PageRequest,
    ) -> Result<Vec<Quotation>, QuotationError> {
        let quotations = self.inner.quotations.read().await;
        let mut selected: Vec<Quotation> = quotations
            .values()
            .filter(|q| matches(filter, q))
            .cloned()
            .collect();

        selected.sort_by(|a, b| match page.order {
            SortOrder::Asc => compare(page.sort, a, b),
            SortOrder::Desc => compare(page.sort, b, a),
        });

        Ok(selected
            .into_iter()
            .skip(page.skip as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn last_number_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<String>, QuotationError> {
        let quotations = self.inner.quotations.read().await;
        Ok(quotations
            .values()
            .map(|q| &q.quotation_number)
            .filter(|n| n.starts_with(prefix))
            .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
            .cloned())
    }

    async fn health_check(&self) -> Result<(), QuotationError> {
        Ok(())
    }
}

#[async_trait]
impl SequenceStore for InMemoryStore {
    async fn increment(&self, key: &str) -> Result<u32, QuotationError> {
        let mut counters = self.inner.counters.write().await;
        let seq = counters.entry(key.to_string()).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    async fn current(&self, key: &str) -> Result<Option<u32>, QuotationError> {
        Ok(self.inner.counters.read().await.get(key).copied())
    }

    async fn raise_to(&self, key: &str, floor: u32) -> Result<(), QuotationError> {
        let mut counters = self.inner.counters.write().await;
        let seq = counters.entry(key.to_string()).or_insert(0);
        *seq = (*seq).max(floor);
        Ok(())
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Customer>, QuotationError> {
        Ok(self.inner.customers.read().await.get(id).cloned())
    }

    async fn find_many(&self, ids: &[String]) -> Result<Vec<Customer>, QuotationError> {
        let customers = self.inner.customers.read().await;
        Ok(ids.iter().filter_map(|id| customers.get(id).cloned()).collect())
    }

    async fn search_ids(&self, text: &str) -> Result<Vec<String>, QuotationError> {
        let customers = self.inner.customers.read().await;
        Ok(customers
            .values()
            .filter(|c| {
                contains_ignore_case(&c.first_name, text)
                    || c
                        .last_name
                        .as_deref()
                        .is_some_and(|l| contains_ignore_case(l, text))
            })
            .map(|c| c.id.clone())
            .collect())
    }
}

#[async_trait]
impl ProductCatalog for InMemoryStore {
    async fn names_for(&self, ids: &[String]) -> Result<HashMap<String, String>, QuotationError> {
        let products = self.inner.products.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| products.get(id).map(|p| (id.clone(), p.name.clone())))
            .collect())
    }
}
