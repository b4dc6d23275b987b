pub mod health;
pub mod quotations;

pub use health::{health_check, metrics_endpoint, readiness_check};
pub use quotations::{
    bulk_delete, bulk_update, convert_quotation, create_quotation, delete_quotation,
    generate_number, get_quotation, list_quotations, preview_quotation, update_quotation,
    update_status,
};
