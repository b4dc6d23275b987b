use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuotationError {
    #[error("{0}")]
    Validation(String),

    #[error("Customer not found")]
    CustomerNotFound,

    #[error("Quotation not found")]
    QuotationNotFound,

    #[error("Quotation number {0} already exists")]
    DuplicateNumber(String),

    #[error("Could not allocate a unique quotation number after {0} attempts")]
    NumberingExhausted(u32),

    #[error("Quotation has already been converted")]
    AlreadyConverted,

    #[error("Database error: {0}")]
    Database(anyhow::Error),
}

impl From<mongodb::error::Error> for QuotationError {
    fn from(err: mongodb::error::Error) -> Self {
        QuotationError::Database(anyhow::Error::new(err))
    }
}

impl From<QuotationError> for AppError {
    fn from(err: QuotationError) -> Self {
        match err {
            QuotationError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            e @ (QuotationError::CustomerNotFound | QuotationError::QuotationNotFound) => {
                AppError::NotFound(anyhow::anyhow!(e.to_string()))
            }
            e @ (QuotationError::DuplicateNumber(_)
            | QuotationError::NumberingExhausted(_)
            | QuotationError::AlreadyConverted) => {
                AppError::Conflict(anyhow::anyhow!(e.to_string()))
            }
            QuotationError::Database(e) => AppError::DatabaseError(e),
        }
    }
}
