pub mod counter;
pub mod customer;
pub mod product;
pub mod quotation;

pub use counter::SequenceCounter;
pub use customer::Customer;
pub use product::Product;
pub use quotation::{Quotation, QuotationDraft, QuotationItem, QuotationStatus, QuotationType};
