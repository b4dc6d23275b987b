use super::money::{non_negative, round_money, HUNDRED};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A raw quotation line as entered: pre-discount, pre-tax unit rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub qty: u32,
    pub rate: Decimal,
    #[serde(default)]
    pub discount_percent: Decimal,
    #[serde(default)]
    pub tax_percent: Decimal,
}

impl LineItem {
    pub fn new(product_id: impl Into<String>, qty: u32, rate: Decimal) -> Self {
        Self {
            product_id: product_id.into(),
            qty,
            rate,
            discount_percent: Decimal::ZERO,
            tax_percent: Decimal::ZERO,
        }
    }

    pub fn with_discount(mut self, discount_percent: Decimal) -> Self {
        self.discount_percent = discount_percent;
        self
    }

    pub fn with_tax(mut self, tax_percent: Decimal) -> Self {
        self.tax_percent = tax_percent;
        self
    }
}

/// A line with its derived money fields, each already rounded to 2 places.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLineItem {
    pub product_id: String,
    pub qty: u32,
    pub rate: Decimal,
    pub discount_percent: Decimal,
    pub tax_percent: Decimal,
    pub unit_cost: Decimal,
    pub tax_amount: Decimal,
    pub total_cost: Decimal,
}

impl PricedLineItem {
    /// Per-unit discount; derived on demand and never stored.
    pub fn discount_amount(&self) -> Decimal {
        round_money(self.rate * self.discount_percent / HUNDRED)
    }

    /// `unit_cost × qty` over the rounded unit cost.
    pub fn net_amount(&self) -> Decimal {
        self.unit_cost * Decimal::from(self.qty)
    }
}

/// Price a single line.
///
/// Negative rate, discount or tax are read as zero. A discount above 100%
/// is not clamped and yields a negative unit cost.
pub fn price(line: &LineItem) -> PricedLineItem {
    let rate = non_negative(line.rate);
    let discount_percent = non_negative(line.discount_percent);
    let tax_percent = non_negative(line.tax_percent);
    let qty = Decimal::from(line.qty);

    let discount_amount = rate * discount_percent / HUNDRED;
    let unit_cost = rate - discount_amount;
    let tax_amount = unit_cost * tax_percent / HUNDRED;
    let total_cost = (unit_cost + tax_amount) * qty;

    PricedLineItem {
        product_id: line.product_id.clone(),
        qty: line.qty,
        rate,
        discount_percent,
        tax_percent,
        unit_cost: round_money(unit_cost),
        tax_amount: round_money(tax_amount),
        total_cost: round_money(total_cost),
    }
}

/// Price every line, preserving input order.
pub fn price_all(lines: &[LineItem]) -> Vec<PricedLineItem> {
    lines.iter().map(price).collect()
}
