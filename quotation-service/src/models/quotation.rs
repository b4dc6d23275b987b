use crate::pricing::{aggregate, amount_in_words, price_all, LineItem, PricedLineItem};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QuotationStatus {
    #[default]
    Pending,
    Sent,
    Ordered,
    Converted,
}

impl QuotationStatus {
    pub const ALL: [QuotationStatus; 4] = [
        QuotationStatus::Pending,
        QuotationStatus::Sent,
        QuotationStatus::Ordered,
        QuotationStatus::Converted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuotationStatus::Pending => "Pending",
            QuotationStatus::Sent => "Sent",
            QuotationStatus::Ordered => "Ordered",
            QuotationStatus::Converted => "Converted",
        }
    }
}

impl fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuotationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuotationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Status must be one of: {}",
                    QuotationStatus::ALL.map(|s| s.as_str()).join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum QuotationType {
    Interstate,
    #[default]
    Intrastate,
    International,
}

impl fmt::Display for QuotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotationType::Interstate => write!(f, "Interstate"),
            QuotationType::Intrastate => write!(f, "Intrastate"),
            QuotationType::International => write!(f, "International"),
        }
    }
}

/// A priced line as stored, with its own identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuotationItem {
    pub id: String,
    #[serde(flatten)]
    pub line: PricedLineItem,
}

impl From<PricedLineItem> for QuotationItem {
    fn from(line: PricedLineItem) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            line,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quotation {
    #[serde(rename = "_id")]
    pub id: String,
    pub quotation_number: String,
    pub customer_id: String,
    pub date: NaiveDate,
    pub validity: NaiveDate,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub quotation_type: QuotationType,
    pub items: Vec<QuotationItem>,
    pub subtotal: Decimal,
    pub grand_total: Decimal,
    pub amount_in_words: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: QuotationStatus,
    #[serde(default)]
    pub converted_document_ref: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Everything a new quotation needs except its number.
#[derive(Debug, Clone)]
pub struct QuotationDraft {
    pub customer_id: String,
    pub date: NaiveDate,
    pub validity: NaiveDate,
    pub reference: String,
    pub quotation_type: QuotationType,
    pub description: String,
    pub status: QuotationStatus,
    pub items: Vec<LineItem>,
}

impl Quotation {
    /// Build a quotation from a draft, pricing its lines.
    pub fn from_draft(draft: &QuotationDraft, quotation_number: String) -> Self {
        let now = Utc::now();
        let mut quotation = Self {
            id: Uuid::new_v4().to_string(),
            quotation_number,
            customer_id: draft.customer_id.clone(),
            date: draft.date,
            validity: draft.validity,
            reference: draft.reference.clone(),
            quotation_type: draft.quotation_type,
            items: Vec::new(),
            subtotal: Decimal::ZERO,
            grand_total: Decimal::ZERO,
            amount_in_words: String::new(),
            description: draft.description.clone(),
            status: draft.status,
            converted_document_ref: None,
            created_at: now,
            updated_at: now,
        };
        quotation.replace_items(&draft.items);
        quotation
    }

    /// Replace the whole line list and recompute every derived total.
    pub fn replace_items(&mut self, lines: &[LineItem]) {
        let priced = price_all(lines);
        let totals = aggregate(&priced);

        self.items = priced.into_iter().map(QuotationItem::from).collect();
        self.subtotal = totals.subtotal;
        self.grand_total = totals.grand_total;
        self.amount_in_words = amount_in_words(totals.grand_total);
    }

    pub fn is_converted(&self) -> bool {
        self.status == QuotationStatus::Converted
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
