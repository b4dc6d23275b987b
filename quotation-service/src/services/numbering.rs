//! Day-scoped quotation numbers: `QT-YYYYMMDD-NNNN`.
//!
//! Allocation is an atomic increment on a per-day counter. The counter can
//! fall behind the persisted quotations (restored backups, a dropped
//! `counters` collection); `resync` lifts it back above the highest number
//! already stored for the day.

use super::store::{QuotationStore, SequenceStore};
use super::QuotationError;
use chrono::NaiveDate;
use std::sync::Arc;

#[derive(Clone)]
pub struct QuotationNumbering {
    prefix: String,
    sequences: Arc<dyn SequenceStore>,
    quotations: Arc<dyn QuotationStore>,
}

impl QuotationNumbering {
    pub fn new(
        prefix: impl Into<String>,
        sequences: Arc<dyn SequenceStore>,
        quotations: Arc<dyn QuotationStore>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            sequences,
            quotations,
        }
    }

    /// `QT-20240501-` for 2024-05-01. Doubles as the counter key.
    pub fn day_prefix(&self, today: NaiveDate) -> String {
        format!("{}-{}-", self.prefix, today.format("%Y%m%d"))
    }

    /// Zero-padded to four digits; wider sequences are kept intact.
    pub fn format_number(day_prefix: &str, seq: u32) -> String {
        format!("{}{:04}", day_prefix, seq)
    }

    pub fn parse_sequence(day_prefix: &str, number: &str) -> Option<u32> {
        number.strip_prefix(day_prefix)?.parse().ok()
    }

    /// Reserve the next number for `today`.
    pub async fn allocate(&self, today: NaiveDate) -> Result<String, QuotationError> {
        let key = self.day_prefix(today);
        let seq = self.sequences.increment(&key).await?;
        Ok(Self::format_number(&key, seq))
    }

    /// The number `allocate` would most likely hand out next. Nothing is
    /// reserved, so a concurrent create may take it first.
    pub async fn peek(&self, today: NaiveDate) -> Result<String, QuotationError> {
        let key = self.day_prefix(today);
        let counter = self.sequences.current(&key).await?.unwrap_or(0);
        let persisted = self.highest_persisted(&key).await?.unwrap_or(0);
        Ok(Self::format_number(&key, counter.max(persisted) + 1))
    }

    /// Raise today's counter to the highest persisted sequence.
    pub async fn resync(&self, today: NaiveDate) -> Result<(), QuotationError> {
        let key = self.day_prefix(today);
        if let Some(highest) = self.highest_persisted(&key).await? {
            tracing::info!(counter = %key, highest, "Resynchronising quotation counter");
            self.sequences.raise_to(&key, highest).await?;
        }
        Ok(())
    }

    async fn highest_persisted(&self, key: &str) -> Result<Option<u32>, QuotationError> {
        let last = self.quotations.last_number_with_prefix(key).await?;
        Ok(last.and_then(|n| Self::parse_sequence(key, &n)))
    }
}
