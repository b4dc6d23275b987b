pub mod quotations;

pub use quotations::{
    BulkDeleteRequest, BulkDeleteResponse, BulkUpdateRequest, BulkUpdateResponse,
    ConvertResponse, CreateQuotationRequest, ListQuotationsParams, NumberResponse,
    PreviewRequest, PreviewResponse, QuotationListResponse, QuotationResponse, StatusRequest,
    UpdateQuotationRequest,
};
