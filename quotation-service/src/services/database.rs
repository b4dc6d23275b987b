use super::metrics::record_db_query;
use super::store::{
    CustomerDirectory, PageRequest, ProductCatalog, QuotationFilter, QuotationStore,
    SequenceStore,
};
use super::QuotationError;
use crate::models::{Customer, Product, Quotation, QuotationStatus, SequenceCounter};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, DateTime as BsonDateTime, Document},
    error::{ErrorKind, WriteFailure},
    options::{
        FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument,
        UpdateOptions,
    },
    Client as MongoClient, Collection, Database, IndexModel,
};
use std::collections::HashMap;
use std::time::Instant;

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, QuotationError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            QuotationError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), QuotationError> {
        tracing::info!("Creating MongoDB indexes for quotation-service");

        let quotations = self.quotations();

        // Backstop for concurrent number allocation
        let number_index = IndexModel::builder()
            .keys(doc! { "quotation_number": 1 })
            .options(
                IndexOptions::builder()
                    .name("quotation_number_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        quotations
            .create_index(number_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create quotation_number index: {}", e);
                QuotationError::from(e)
            })?;
        tracing::info!("Created unique index on quotations.quotation_number");

        let customer_index = IndexModel::builder()
            .keys(doc! { "customer_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("customer_lookup".to_string())
                    .build(),
            )
            .build();

        quotations
            .create_index(customer_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create customer index on quotations: {}", e);
                QuotationError::from(e)
            })?;
        tracing::info!("Created index on quotations.(customer_id, created_at)");

        let product_index = IndexModel::builder()
            .keys(doc! { "items.product_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("item_product_lookup".to_string())
                    .build(),
            )
            .build();

        quotations
            .create_index(product_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create items.product_id index: {}", e);
                QuotationError::from(e)
            })?;
        tracing::info!("Created index on quotations.items.product_id");

        Ok(())
    }

    pub fn quotations(&self) -> Collection<Quotation> {
        self.db.collection("quotations")
    }

    pub fn counters(&self) -> Collection<SequenceCounter> {
        self.db.collection("counters")
    }

    pub fn customers(&self) -> Collection<Customer> {
        self.db.collection("customers")
    }

    pub fn products(&self) -> Collection<Product> {
        self.db.collection("products")
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn raw(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Escape user text for use inside a `$regex`.
pub(crate) fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\.^$|?*+()[]{}/-".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) fn filter_document(filter: &QuotationFilter) -> Document {
    let mut query = doc! {};

    if let Some(status) = filter.status {
        query.insert("status", status.as_str());
    }
    if let Some(customer_id) = &filter.customer_id {
        query.insert("customer_id", customer_id.as_str());
    }
    if let Some(product_id) = &filter.product_id {
        query.insert("items.product_id", product_id.as_str());
    }
    if let Some(search) = &filter.search {
        let regex = doc! { "$regex": escape_regex(&search.text), "$options": "i" };
        let mut any_of = vec![
            doc! { "quotation_number": regex.clone() },
            doc! { "reference": regex },
        ];
        if !search.customer_ids.is_empty() {
            any_of.push(doc! { "customer_id": { "$in": search.customer_ids.clone() } });
        }
        query.insert("$or", any_of);
    }

    query
}

fn to_u32(seq: i64) -> Result<u32, QuotationError> {
    u32::try_from(seq)
        .map_err(|_| QuotationError::Database(anyhow::anyhow!("Counter value {} out of range", seq)))
}

#[async_trait]
impl QuotationStore for MongoDb {
    #[tracing::instrument(skip(self, quotation), fields(quotation_number = %quotation.quotation_number))]
    async fn insert(&self, quotation: &Quotation) -> Result<(), QuotationError> {
        let start = Instant::now();
        let result = self.quotations().insert_one(quotation, None).await;
        record_db_query("insert_quotation", start);

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(QuotationError::DuplicateNumber(
                quotation.quotation_number.clone(),
            )),
            Err(e) => {
                tracing::error!("Failed to insert quotation: {}", e);
                Err(e.into())
            }
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Quotation>, QuotationError> {
        let start = Instant::now();
        let quotation = self.quotations().find_one(doc! { "_id": id }, None).await?;
        record_db_query("find_quotation", start);
        Ok(quotation)
    }

    #[tracing::instrument(skip(self, quotation), fields(quotation_id = %quotation.id))]
    async fn replace(&self, quotation: &Quotation) -> Result<bool, QuotationError> {
        let start = Instant::now();
        let result = self
            .quotations()
            .replace_one(doc! { "_id": quotation.id.as_str() }, quotation, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to replace quotation: {}", e);
                QuotationError::from(e)
            })?;
        record_db_query("replace_quotation", start);
        Ok(result.matched_count > 0)
    }

    async fn set_status(
        &self,
        id: &str,
        status: QuotationStatus,
    ) -> Result<Option<Quotation>, QuotationError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let quotation = self
            .quotations()
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": { "status": status.as_str(), "updated_at": BsonDateTime::now() } },
                options,
            )
            .await?;
        Ok(quotation)
    }

    async fn mark_converted(
        &self,
        id: &str,
        document_ref: Option<String>,
    ) -> Result<bool, QuotationError> {
        let result = self
            .quotations()
            .update_one(
                doc! {
                    "_id": id,
                    "status": { "$ne": QuotationStatus::Converted.as_str() },
                },
                doc! {
                    "$set": {
                        "status": QuotationStatus::Converted.as_str(),
                        "converted_document_ref": Bson::from(document_ref),
                        "updated_at": BsonDateTime::now(),
                    }
                },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool, QuotationError> {
        let result = self
            .quotations()
            .delete_one(doc! { "_id": id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_many(&self, ids: &[String]) -> Result<u64, QuotationError> {
        let result = self
            .quotations()
            .delete_many(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await?;
        Ok(result.deleted_count)
    }

    async fn update_status_many(
        &self,
        ids: &[String],
        status: QuotationStatus,
    ) -> Result<u64, QuotationError> {
        let result = self
            .quotations()
            .update_many(
                doc! { "_id": { "$in": ids.to_vec() } },
                doc! { "$set": { "status": status.as_str(), "updated_at": BsonDateTime::now() } },
                None,
            )
            .await?;
        Ok(result.modified_count)
    }

    async fn count(&self, filter: &QuotationFilter) -> Result<u64, QuotationError> {
        let total = self
            .quotations()
            .count_documents(filter_document(filter), None)
            .await?;
        Ok(total)
    }

    async fn list(
        &self,
        filter: &QuotationFilter,
        page: &PageRequest,
    ) -> Result<Vec<Quotation>, QuotationError> {
        let start = Instant::now();
        let mut sort = Document::new();
        sort.insert(page.sort.field_name(), page.order.as_i32());
        sort.insert("_id", page.order.as_i32());

        let find_options = FindOptions::builder()
            .sort(sort)
            .skip(page.skip)
            .limit(page.limit as i64)
            .build();

        let cursor = self
            .quotations()
            .find(filter_document(filter), find_options)
            .await?;

        let quotations: Vec<Quotation> = cursor.try_collect().await.map_err(|e| {
            tracing::error!("Failed to collect quotations: {}", e);
            QuotationError::from(e)
        })?;
        record_db_query("list_quotations", start);

        Ok(quotations)
    }

    async fn last_number_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<String>, QuotationError> {
        let start = Instant::now();
        // Widened suffixes sort wrong as strings, so rank by length first
        let pipeline = vec![
            doc! { "$match": {
                "quotation_number": { "$regex": format!("^{}", escape_regex(prefix)) },
            } },
            doc! { "$project": {
                "quotation_number": 1,
                "number_length": { "$strLenCP": "$quotation_number" },
            } },
            doc! { "$sort": { "number_length": -1, "quotation_number": -1 } },
            doc! { "$limit": 1 },
        ];

        let mut cursor = self.raw("quotations").aggregate(pipeline, None).await?;
        let last = cursor.try_next().await?;
        record_db_query("last_quotation_number", start);

        Ok(last.and_then(|d| d.get_str("quotation_number").ok().map(str::to_string)))
    }

    async fn health_check(&self) -> Result<(), QuotationError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                QuotationError::from(e)
            })?;
        Ok(())
    }
}

#[async_trait]
impl SequenceStore for MongoDb {
    async fn increment(&self, key: &str) -> Result<u32, QuotationError> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        // Two first-of-day upserts can collide on `_id`; the loser retries once
        // and then finds the record in place.
        let mut last_err = None;
        for _ in 0..2 {
            let start = Instant::now();
            let result = self
                .counters()
                .find_one_and_update(
                    doc! { "_id": key },
                    doc! { "$inc": { "seq": 1_i64 } },
                    options.clone(),
                )
                .await;
            record_db_query("increment_counter", start);

            match result {
                Ok(Some(counter)) => return to_u32(counter.seq),
                Ok(None) => {
                    return Err(QuotationError::Database(anyhow::anyhow!(
                        "Counter upsert for {} returned no document",
                        key
                    )))
                }
                Err(e) if is_duplicate_key(&e) => last_err = Some(e),
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_err
            .map(QuotationError::from)
            .unwrap_or_else(|| QuotationError::Database(anyhow::anyhow!("Counter upsert failed"))))
    }

    async fn current(&self, key: &str) -> Result<Option<u32>, QuotationError> {
        let counter = self.counters().find_one(doc! { "_id": key }, None).await?;
        counter.map(|c| to_u32(c.seq)).transpose()
    }

    async fn raise_to(&self, key: &str, floor: u32) -> Result<(), QuotationError> {
        let options = UpdateOptions::builder().upsert(true).build();
        self.counters()
            .update_one(
                doc! { "_id": key },
                doc! { "$max": { "seq": i64::from(floor) } },
                options,
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CustomerDirectory for MongoDb {
    async fn find_by_id(&self, id: &str) -> Result<Option<Customer>, QuotationError> {
        let customer = self.customers().find_one(doc! { "_id": id }, None).await?;
        Ok(customer)
    }

    async fn find_many(&self, ids: &[String]) -> Result<Vec<Customer>, QuotationError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .customers()
            .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn search_ids(&self, text: &str) -> Result<Vec<String>, QuotationError> {
        let regex = doc! { "$regex": escape_regex(text), "$options": "i" };
        let options = FindOptions::builder().projection(doc! { "_id": 1 }).build();

        let cursor = self
            .raw("customers")
            .find(
                doc! { "$or": [ { "first_name": regex.clone() }, { "last_name": regex } ] },
                options,
            )
            .await?;
        let matches: Vec<Document> = cursor.try_collect().await?;

        Ok(matches
            .iter()
            .filter_map(|d| d.get_str("_id").ok().map(str::to_string))
            .collect())
    }
}

#[async_trait]
impl ProductCatalog for MongoDb {
    async fn names_for(&self, ids: &[String]) -> Result<HashMap<String, String>, QuotationError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let cursor = self
            .products()
            .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await?;
        let products: Vec<Product> = cursor.try_collect().await?;

        Ok(products.into_iter().map(|p| (p.id, p.name)).collect())
    }
}
