//! Pure quotation arithmetic: per-line pricing, document totals and the
//! spoken amount. Nothing in this module performs I/O.

pub mod line_item;
pub mod money;
pub mod totals;
pub mod words;

pub use line_item::{price, price_all, LineItem, PricedLineItem};
pub use money::{round_money, MONEY_SCALE};
pub use totals::{aggregate, Totals};
pub use words::amount_in_words;
