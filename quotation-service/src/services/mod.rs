pub mod database;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod numbering;
pub mod quotations;
pub mod store;

pub use database::MongoDb;
pub use error::QuotationError;
pub use memory::InMemoryStore;
pub use self::metrics::{get_metrics, init_metrics};
pub use numbering::QuotationNumbering;
pub use quotations::{
    ListQuery, PricingPreview, QuotationPage, QuotationService, QuotationUpdate, QuotationView,
};
pub use store::{
    CustomerDirectory, ProductCatalog, QuotationFilter, QuotationStore, SequenceStore, SortField,
    SortOrder,
};
