use super::metrics::{record_number_collision, record_quotation_converted, record_quotation_created};
use super::numbering::QuotationNumbering;
use super::store::{
    CustomerDirectory, PageRequest, ProductCatalog, QuotationFilter, QuotationStore,
    SearchFilter, SequenceStore, SortField, SortOrder,
};
use super::QuotationError;
use crate::models::{Customer, Quotation, QuotationDraft, QuotationStatus, QuotationType};
use crate::pricing::{aggregate, amount_in_words, price_all, LineItem, PricedLineItem, Totals};
use backoff::future::retry;
use backoff::ExponentialBackoff;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A quotation together with the display data looked up for it.
#[derive(Debug, Clone)]
pub struct QuotationView {
    pub quotation: Quotation,
    pub customer: Option<Customer>,
    pub product_names: HashMap<String, String>,
}

impl QuotationView {
    pub fn customer_name(&self) -> String {
        self.customer
            .as_ref()
            .map(Customer::display_name)
            .unwrap_or_default()
    }

    pub fn product_name(&self, product_id: &str) -> String {
        self.product_names
            .get(product_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// Fields a caller may change on an existing quotation. `None` leaves the
/// stored value alone; an empty `items` list does too.
#[derive(Debug, Clone, Default)]
pub struct QuotationUpdate {
    pub customer_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub validity: Option<NaiveDate>,
    pub reference: Option<String>,
    pub quotation_type: Option<QuotationType>,
    pub description: Option<String>,
    pub status: Option<QuotationStatus>,
    pub items: Option<Vec<LineItem>>,
}

#[derive(Debug, Clone)]
pub struct ListQuery {
    pub page: u64,
    pub limit: u64,
    pub search: Option<String>,
    pub status: Option<QuotationStatus>,
    pub customer_id: Option<String>,
    pub product_id: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: None,
            status: None,
            customer_id: None,
            product_id: None,
            sort: SortField::default(),
            order: SortOrder::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuotationPage {
    pub quotations: Vec<QuotationView>,
    pub current_page: u64,
    pub total_pages: u64,
    pub total_records: u64,
}

/// Priced lines and totals for an unsaved line list.
#[derive(Debug, Clone)]
pub struct PricingPreview {
    pub items: Vec<PricedLineItem>,
    pub totals: Totals,
    pub amount_in_words: String,
}

#[derive(Clone)]
pub struct QuotationService {
    quotations: Arc<dyn QuotationStore>,
    customers: Arc<dyn CustomerDirectory>,
    products: Arc<dyn ProductCatalog>,
    numbering: QuotationNumbering,
    max_attempts: u32,
    max_page_size: u64,
}

impl QuotationService {
    pub fn new(
        quotations: Arc<dyn QuotationStore>,
        sequences: Arc<dyn SequenceStore>,
        customers: Arc<dyn CustomerDirectory>,
        products: Arc<dyn ProductCatalog>,
        number_prefix: &str,
    ) -> Self {
        Self {
            numbering: QuotationNumbering::new(number_prefix, sequences, quotations.clone()),
            quotations,
            customers,
            products,
            max_attempts: 5,
            max_page_size: 100,
        }
    }

    /// Wire every seam to the same backend.
    pub fn with_backend<B>(backend: B, number_prefix: &str) -> Self
    where
        B: QuotationStore + SequenceStore + CustomerDirectory + ProductCatalog + Clone + 'static,
    {
        Self::new(
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
            Arc::new(backend),
            number_prefix,
        )
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: u64) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    pub fn numbering(&self) -> &QuotationNumbering {
        &self.numbering
    }

    pub async fn health_check(&self) -> Result<(), QuotationError> {
        self.quotations.health_check().await
    }

    /// Price, number and persist a new quotation.
    ///
    /// A duplicate number on insert resynchronises the day counter and
    /// retries, up to `max_attempts` allocations in total.
    pub async fn create(
        &self,
        draft: QuotationDraft,
        today: NaiveDate,
    ) -> Result<QuotationView, QuotationError> {
        if draft.items.is_empty() {
            return Err(QuotationError::Validation(
                "At least one item is required".to_string(),
            ));
        }
        let customer = self
            .customers
            .find_by_id(&draft.customer_id)
            .await?
            .ok_or(QuotationError::CustomerNotFound)?;

        let policy = ExponentialBackoff {
            initial_interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(100),
            max_elapsed_time: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let attempts = &AtomicU32::new(0);
        let draft = &draft;

        let result = retry(policy, move || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let number = self
                .numbering
                .allocate(today)
                .await
                .map_err(backoff::Error::permanent)?;
            let quotation = Quotation::from_draft(draft, number);

            match self.quotations.insert(&quotation).await {
                Ok(()) => Ok(quotation),
                Err(QuotationError::DuplicateNumber(number)) => {
                    record_number_collision();
                    tracing::warn!(
                        quotation_number = %number,
                        attempt,
                        "Quotation number already taken"
                    );
                    if attempt >= self.max_attempts {
                        return Err(backoff::Error::permanent(
                            QuotationError::NumberingExhausted(attempt),
                        ));
                    }
                    self.numbering
                        .resync(today)
                        .await
                        .map_err(backoff::Error::permanent)?;
                    Err(backoff::Error::transient(QuotationError::DuplicateNumber(
                        number,
                    )))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await;

        let quotation = match result {
            Ok(quotation) => quotation,
            Err(QuotationError::DuplicateNumber(_)) => {
                return Err(QuotationError::NumberingExhausted(
                    attempts.load(Ordering::SeqCst),
                ))
            }
            Err(e) => return Err(e),
        };

        record_quotation_created();
        tracing::info!(
            quotation_id = %quotation.id,
            quotation_number = %quotation.quotation_number,
            grand_total = %quotation.grand_total,
            "Quotation created"
        );

        let product_names = self.product_names(std::slice::from_ref(&quotation)).await?;
        Ok(QuotationView {
            quotation,
            customer: Some(customer),
            product_names,
        })
    }

    pub async fn get(&self, id: &str) -> Result<QuotationView, QuotationError> {
        let quotation = self
            .quotations
            .find_by_id(id)
            .await?
            .ok_or(QuotationError::QuotationNotFound)?;
        self.enrich(quotation).await
    }

    pub async fn list(&self, query: ListQuery) -> Result<QuotationPage, QuotationError> {
        let page = query.page.max(1);
        let limit = query.limit.clamp(1, self.max_page_size);

        let search = match query.search.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Some(SearchFilter {
                text: text.to_string(),
                customer_ids: self.customers.search_ids(text).await?,
            }),
            _ => None,
        };
        let filter = QuotationFilter {
            status: query.status,
            customer_id: query.customer_id,
            product_id: query.product_id,
            search,
        };

        let total_records = self.quotations.count(&filter).await?;
        let quotations = self
            .quotations
            .list(
                &filter,
                &PageRequest {
                    // MongoDB reads skip as a signed 64-bit value
                    skip: (page - 1).saturating_mul(limit).min(i64::MAX as u64),
                    limit,
                    sort: query.sort,
                    order: query.order,
                },
            )
            .await?;

        let customer_ids: Vec<String> = quotations
            .iter()
            .map(|q| q.customer_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let customers: HashMap<String, Customer> = self
            .customers
            .find_many(&customer_ids)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        let product_names = self.product_names(&quotations).await?;

        let quotations = quotations
            .into_iter()
            .map(|quotation| QuotationView {
                customer: customers.get(&quotation.customer_id).cloned(),
                product_names: product_names.clone(),
                quotation,
            })
            .collect();

        Ok(QuotationPage {
            quotations,
            current_page: page,
            total_pages: total_records.div_ceil(limit),
            total_records,
        })
    }

    pub async fn update(
        &self,
        id: &str,
        update: QuotationUpdate,
    ) -> Result<QuotationView, QuotationError> {
        let mut quotation = self
            .quotations
            .find_by_id(id)
            .await?
            .ok_or(QuotationError::QuotationNotFound)?;

        if let Some(customer_id) = update.customer_id {
            if self.customers.find_by_id(&customer_id).await?.is_none() {
                return Err(QuotationError::CustomerNotFound);
            }
            quotation.customer_id = customer_id;
        }
        if let Some(date) = update.date {
            quotation.date = date;
        }
        if let Some(validity) = update.validity {
            quotation.validity = validity;
        }
        if let Some(reference) = update.reference {
            quotation.reference = reference;
        }
        if let Some(quotation_type) = update.quotation_type {
            quotation.quotation_type = quotation_type;
        }
        if let Some(description) = update.description {
            quotation.description = description;
        }
        if let Some(status) = update.status {
            quotation.status = status;
        }
        if let Some(items) = update.items.filter(|items| !items.is_empty()) {
            quotation.replace_items(&items);
        }
        quotation.touch();

        if !self.quotations.replace(&quotation).await? {
            return Err(QuotationError::QuotationNotFound);
        }
        tracing::info!(quotation_id = %quotation.id, "Quotation updated");

        self.enrich(quotation).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), QuotationError> {
        if !self.quotations.delete(id).await? {
            return Err(QuotationError::QuotationNotFound);
        }
        tracing::info!(quotation_id = %id, "Quotation deleted");
        Ok(())
    }

    pub async fn set_status(
        &self,
        id: &str,
        status: QuotationStatus,
    ) -> Result<QuotationView, QuotationError> {
        let quotation = self
            .quotations
            .set_status(id, status)
            .await?
            .ok_or(QuotationError::QuotationNotFound)?;
        tracing::info!(quotation_id = %id, status = %status, "Quotation status changed");
        self.enrich(quotation).await
    }

    pub async fn bulk_delete(&self, ids: &[String]) -> Result<u64, QuotationError> {
        if ids.is_empty() {
            return Err(QuotationError::Validation(
                "Quotation IDs are required".to_string(),
            ));
        }
        let deleted = self.quotations.delete_many(ids).await?;
        tracing::info!(requested = ids.len(), deleted, "Quotations bulk deleted");
        Ok(deleted)
    }

    pub async fn bulk_update_status(
        &self,
        ids: &[String],
        status: QuotationStatus,
    ) -> Result<u64, QuotationError> {
        if ids.is_empty() {
            return Err(QuotationError::Validation(
                "Quotation IDs are required".to_string(),
            ));
        }
        let modified = self.quotations.update_status_many(ids, status).await?;
        tracing::info!(requested = ids.len(), modified, status = %status, "Quotations bulk updated");
        Ok(modified)
    }

    /// Mark a quotation as converted into a downstream order. Fails with
    /// `AlreadyConverted` on the second call.
    pub async fn convert(&self, id: &str) -> Result<QuotationView, QuotationError> {
        let quotation = self
            .quotations
            .find_by_id(id)
            .await?
            .ok_or(QuotationError::QuotationNotFound)?;
        if quotation.is_converted() {
            return Err(QuotationError::AlreadyConverted);
        }

        // No order subsystem yet, so the reference stays empty.
        if !self.quotations.mark_converted(id, None).await? {
            // Lost a race: either converted or deleted since the read.
            return match self.quotations.find_by_id(id).await? {
                Some(_) => Err(QuotationError::AlreadyConverted),
                None => Err(QuotationError::QuotationNotFound),
            };
        }
        record_quotation_converted();
        tracing::info!(
            quotation_id = %id,
            quotation_number = %quotation.quotation_number,
            "Quotation converted"
        );

        self.get(id).await
    }

    pub fn preview(&self, lines: &[LineItem]) -> PricingPreview {
        let items = price_all(lines);
        let totals = aggregate(&items);
        PricingPreview {
            amount_in_words: amount_in_words(totals.grand_total),
            items,
            totals,
        }
    }

    pub async fn peek_number(&self, today: NaiveDate) -> Result<String, QuotationError> {
        self.numbering.peek(today).await
    }

    async fn enrich(&self, quotation: Quotation) -> Result<QuotationView, QuotationError> {
        let customer = self.customers.find_by_id(&quotation.customer_id).await?;
        let product_names = self.product_names(std::slice::from_ref(&quotation)).await?;
        Ok(QuotationView {
            quotation,
            customer,
            product_names,
        })
    }

    async fn product_names(
        &self,
        quotations: &[Quotation],
    ) -> Result<HashMap<String, String>, QuotationError> {
        let ids: Vec<String> = quotations
            .iter()
            .flat_map(|q| q.items.iter().map(|i| i.line.product_id.clone()))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        self.products.names_for(&ids).await
    }
}
