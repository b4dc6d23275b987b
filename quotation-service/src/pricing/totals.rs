use super::line_item::PricedLineItem;
use super::money::round_money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Document-level sums over already-priced lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub grand_total: Decimal,
}

impl Default for Totals {
    fn default() -> Self {
        Self {
            subtotal: Decimal::ZERO,
            grand_total: Decimal::ZERO,
        }
    }
}

/// Sum rounded line values. No minimum line count is imposed here.
pub fn aggregate(lines: &[PricedLineItem]) -> Totals {
    let (subtotal, grand_total) = lines
        .iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(sub, grand), line| {
            (sub + line.net_amount(), grand + line.total_cost)
        });

    Totals {
        subtotal: round_money(subtotal),
        grand_total: round_money(grand_total),
    }
}
