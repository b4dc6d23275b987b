use crate::dtos::{
    BulkDeleteRequest, BulkDeleteResponse, BulkUpdateRequest, BulkUpdateResponse,
    ConvertResponse, CreateQuotationRequest, ListQuotationsParams, NumberResponse,
    PreviewRequest, PreviewResponse, QuotationListResponse, QuotationResponse, StatusRequest,
    UpdateQuotationRequest,
};
use crate::middleware::Actor;
use crate::pricing::LineItem;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use validator::Validate;

#[tracing::instrument(skip(state, params))]
pub async fn list_quotations(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<ListQuotationsParams>,
) -> Result<Json<QuotationListResponse>, AppError> {
    let query = params.into_query()?;
    let page = state.service.list(query).await?;
    Ok(Json(QuotationListResponse::from(page)))
}

#[tracing::instrument(skip(state, request))]
pub async fn create_quotation(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateQuotationRequest>,
) -> Result<(StatusCode, Json<QuotationResponse>), AppError> {
    request.validate()?;
    let draft = request.into_draft()?;

    let view = state
        .service
        .create(draft, Utc::now().date_naive())
        .await?;

    Ok((StatusCode::CREATED, Json(QuotationResponse::from(view))))
}

#[tracing::instrument(skip(state))]
pub async fn get_quotation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<QuotationResponse>, AppError> {
    let view = state.service.get(&id).await?;
    Ok(Json(QuotationResponse::from(view)))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_quotation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(request): Json<UpdateQuotationRequest>,
) -> Result<Json<QuotationResponse>, AppError> {
    request.validate()?;
    let update = request.into_update()?;

    let view = state.service.update(&id, update).await?;
    Ok(Json(QuotationResponse::from(view)))
}

#[tracing::instrument(skip(state))]
pub async fn delete_quotation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, request))]
pub async fn update_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<QuotationResponse>, AppError> {
    let status = request.parse()?;
    let view = state.service.set_status(&id, status).await?;
    Ok(Json(QuotationResponse::from(view)))
}

#[tracing::instrument(skip(state))]
pub async fn convert_quotation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<ConvertResponse>, AppError> {
    let view = state.service.convert(&id).await?;
    Ok(Json(ConvertResponse::from(view)))
}

#[tracing::instrument(skip(state, request), fields(count = request.ids.len()))]
pub async fn bulk_delete(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    let deleted_count = state.service.bulk_delete(&request.ids).await?;
    Ok(Json(BulkDeleteResponse { deleted_count }))
}

#[tracing::instrument(skip(state, request), fields(count = request.ids.len()))]
pub async fn bulk_update(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<BulkUpdateRequest>,
) -> Result<Json<BulkUpdateResponse>, AppError> {
    let status = request
        .status
        .parse()
        .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))?;
    let modified_count = state
        .service
        .bulk_update_status(&request.ids, status)
        .await?;
    Ok(Json(BulkUpdateResponse { modified_count }))
}

#[tracing::instrument(skip(state, request))]
pub async fn preview_quotation(
    State(state): State<AppState>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    request.validate()?;
    let lines: Vec<LineItem> = request.items.into_iter().map(LineItem::from).collect();
    Ok(Json(PreviewResponse::from(state.service.preview(&lines))))
}

#[tracing::instrument(skip(state))]
pub async fn generate_number(
    State(state): State<AppState>,
) -> Result<Json<NumberResponse>, AppError> {
    let quotation_number = state
        .service
        .peek_number(Utc::now().date_naive())
        .await?;
    Ok(Json(NumberResponse { quotation_number }))
}
