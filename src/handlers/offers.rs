// src/handlers/offers.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::{
        document::OfferDocumentView,
        offers::{
            CommercialTermsUpdate, LineItemInput, LineItemPatch, LineItemSeed, NewOffer, Offer,
            OfferDetail, OfferStatus, PricingConfigUpdate,
        },
        tiers::{TierInput, TierRef, TierUpdate},
    },
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOfferPayload {
    pub customer_id: Option<Uuid>,
    pub inquiry_id: Option<Uuid>,
    #[schema(value_type = Option<Object>)]
    pub customer_snapshot: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub inquiry_snapshot: Option<Value>,
    #[validate(length(equal = 3, message = "Código ISO de 3 letras"))]
    #[schema(example = "EUR")]
    pub currency: Option<String>,
    #[serde(default)]
    pub use_unit_prices: bool,
    #[validate(length(min = 1, message = "A oferta precisa de pelo menos um item"))]
    pub items: Vec<LineItemSeed>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceItemsPayload {
    #[validate(length(min = 1, message = "A oferta precisa de pelo menos um item"))]
    pub items: Vec<LineItemInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TogglePricingModePayload {
    #[schema(example = true)]
    pub use_unit_prices: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Pos\tMenge\tPreis\n1\t1000\t4,50\n1\t5000\t4,20")]
    pub raw_text: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportResponse {
    pub offer: OfferDetail,
    pub items_updated: Vec<Uuid>,
    pub tiers_imported: usize,
    pub rows_ignored: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionStatusPayload {
    #[schema(example = "SUBMITTED")]
    pub status: OfferStatus,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordDocumentPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "documents/OF-202610-0007.pdf")]
    pub document_reference: String,
}

// =============================================================================
//  ÁREA 1: OFERTA
// =============================================================================

// POST /api/offers
#[utoipa::path(
    post,
    path = "/api/offers",
    tag = "Offers",
    request_body = CreateOfferPayload,
    responses(
        (status = 201, description = "Oferta criada a partir da consulta", body = OfferDetail),
        (status = 400, description = "Dados inválidos")
    ),
    security(("tenant_header" = []))
)]
pub async fn create_offer(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Json(payload): Json<CreateOfferPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let new_offer = NewOffer {
        customer_id: payload.customer_id,
        inquiry_id: payload.inquiry_id,
        customer_snapshot: payload.customer_snapshot.unwrap_or_else(|| json!({})),
        inquiry_snapshot: payload.inquiry_snapshot.unwrap_or_else(|| json!({})),
        currency: payload.currency,
        use_unit_prices: payload.use_unit_prices,
        items: payload.items,
    };

    let offer = app_state
        .offer_service
        .create_offer(tenant.0, new_offer)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(offer)))
}

// GET /api/offers/{id}
#[utoipa::path(
    get,
    path = "/api/offers/{id}",
    tag = "Offers",
    params(("id" = Uuid, Path, description = "ID da oferta")),
    responses(
        (status = 200, description = "Oferta com itens", body = OfferDetail),
        (status = 404, description = "Oferta não encontrada")
    ),
    security(("tenant_header" = []))
)]
pub async fn get_offer(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let offer = app_state
        .offer_service
        .get_offer(tenant.0, offer_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(offer)))
}

// POST /api/offers/{id}/recalculate
#[utoipa::path(
    post,
    path = "/api/offers/{id}/recalculate",
    tag = "Offers",
    params(("id" = Uuid, Path, description = "ID da oferta")),
    responses(
        (status = 200, description = "Totais recalculados e gravados", body = OfferDetail),
        (status = 409, description = "Oferta aceita")
    ),
    security(("tenant_header" = []))
)]
pub async fn recalculate(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let offer = app_state
        .offer_service
        .recalculate(tenant.0, offer_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(offer)))
}

// PATCH /api/offers/{id}/pricing-config
#[utoipa::path(
    patch,
    path = "/api/offers/{id}/pricing-config",
    tag = "Offers",
    params(("id" = Uuid, Path, description = "ID da oferta")),
    request_body = PricingConfigUpdate,
    responses(
        (status = 200, description = "Configuração aplicada, faixas recalculadas", body = OfferDetail),
        (status = 400, description = "Dados inválidos"),
        (status = 422, description = "Casas decimais ou colunas fora do intervalo")
    ),
    security(("tenant_header" = []))
)]
pub async fn update_pricing_config(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(offer_id): Path<Uuid>,
    Json(payload): Json<PricingConfigUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let offer = app_state
        .offer_service
        .update_pricing_config(tenant.0, offer_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(offer)))
}

// PATCH /api/offers/{id}/commercial-terms
#[utoipa::path(
    patch,
    path = "/api/offers/{id}/commercial-terms",
    tag = "Offers",
    params(("id" = Uuid, Path, description = "ID da oferta")),
    request_body = CommercialTermsUpdate,
    responses(
        (status = 200, description = "Desconto, frete e imposto aplicados", body = OfferDetail),
        (status = 400, description = "Dados inválidos")
    ),
    security(("tenant_header" = []))
)]
pub async fn update_commercial_terms(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(offer_id): Path<Uuid>,
    Json(payload): Json<CommercialTermsUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let offer = app_state
        .offer_service
        .update_commercial_terms(tenant.0, offer_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(offer)))
}

// =============================================================================
//  ÁREA 2: ITENS
// =============================================================================

// PUT /api/offers/{id}/items
#[utoipa::path(
    put,
    path = "/api/offers/{id}/items",
    tag = "Offer Items",
    params(("id" = Uuid, Path, description = "ID da oferta")),
    request_body = ReplaceItemsPayload,
    responses(
        (status = 200, description = "Lista de itens substituída", body = OfferDetail),
        (status = 400, description = "Dados inválidos")
    ),
    security(("tenant_header" = []))
)]
pub async fn replace_line_items(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(offer_id): Path<Uuid>,
    Json(payload): Json<ReplaceItemsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let offer = app_state
        .offer_service
        .replace_line_items(tenant.0, offer_id, payload.items)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(offer)))
}

// PATCH /api/offers/{id}/items/{item_id}
#[utoipa::path(
    patch,
    path = "/api/offers/{id}/items/{item_id}",
    tag = "Offer Items",
    params(
        ("id" = Uuid, Path, description = "ID da oferta"),
        ("item_id" = Uuid, Path, description = "ID do item")
    ),
    request_body = LineItemPatch,
    responses(
        (status = 200, description = "Item atualizado", body = OfferDetail),
        (status = 404, description = "Item não encontrado")
    ),
    security(("tenant_header" = []))
)]
pub async fn update_line_item(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path((offer_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<LineItemPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let offer = app_state
        .offer_service
        .update_line_item(tenant.0, offer_id, item_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(offer)))
}

// =============================================================================
//  ÁREA 3: FAIXAS DE PREÇO
// =============================================================================

// POST /api/offers/{id}/items/{item_id}/tiers
#[utoipa::path(
    post,
    path = "/api/offers/{id}/items/{item_id}/tiers",
    tag = "Price Tiers",
    params(
        ("id" = Uuid, Path, description = "ID da oferta"),
        ("item_id" = Uuid, Path, description = "ID do item")
    ),
    request_body = TierInput,
    responses(
        (status = 201, description = "Faixa adicionada", body = OfferDetail),
        (status = 409, description = "Tipo de faixa não bate com o modo da oferta"),
        (status = 422, description = "Limite de colunas atingido")
    ),
    security(("tenant_header" = []))
)]
pub async fn add_tier(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path((offer_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<TierInput>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let offer = app_state
        .offer_service
        .add_tier(tenant.0, offer_id, item_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(offer)))
}

// PUT /api/offers/{id}/items/{item_id}/tiers/{tier}
#[utoipa::path(
    put,
    path = "/api/offers/{id}/items/{item_id}/tiers/{tier}",
    tag = "Price Tiers",
    params(
        ("id" = Uuid, Path, description = "ID da oferta"),
        ("item_id" = Uuid, Path, description = "ID do item"),
        ("tier" = usize, Path, description = "Índice da faixa no modo atual")
    ),
    request_body = TierUpdate,
    responses(
        (status = 200, description = "Faixa atualizada", body = OfferDetail),
        (status = 400, description = "Quantidade ou preço ausente"),
        (status = 422, description = "Índice fora do intervalo")
    ),
    security(("tenant_header" = []))
)]
pub async fn update_tier(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path((offer_id, item_id, index)): Path<(Uuid, Uuid, usize)>,
    Json(payload): Json<TierUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let offer = app_state
        .offer_service
        .update_tier(tenant.0, offer_id, item_id, index, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(offer)))
}

// DELETE /api/offers/{id}/items/{item_id}/tiers/{tier}
#[utoipa::path(
    delete,
    path = "/api/offers/{id}/items/{item_id}/tiers/{tier}",
    tag = "Price Tiers",
    params(
        ("id" = Uuid, Path, description = "ID da oferta"),
        ("item_id" = Uuid, Path, description = "ID do item"),
        ("tier" = String, Path, description = "ID da faixa unitária ou índice da faixa por quantidade")
    ),
    responses(
        (status = 200, description = "Faixa removida", body = OfferDetail),
        (status = 404, description = "Faixa não encontrada")
    ),
    security(("tenant_header" = []))
)]
pub async fn delete_tier(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path((offer_id, item_id, tier)): Path<(Uuid, Uuid, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let tier: TierRef = tier
        .parse()
        .map_err(|e: AppError| e.to_api_error(&locale, &app_state.i18n_store))?;

    let offer = app_state
        .offer_service
        .delete_tier(tenant.0, offer_id, item_id, tier)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(offer)))
}

// POST /api/offers/{id}/items/{item_id}/tiers/{tier}/activate
#[utoipa::path(
    post,
    path = "/api/offers/{id}/items/{item_id}/tiers/{tier}/activate",
    tag = "Price Tiers",
    params(
        ("id" = Uuid, Path, description = "ID da oferta"),
        ("item_id" = Uuid, Path, description = "ID do item"),
        ("tier" = usize, Path, description = "Índice da faixa no modo atual")
    ),
    responses(
        (status = 200, description = "Faixa ativa trocada", body = OfferDetail),
        (status = 422, description = "Índice fora do intervalo")
    ),
    security(("tenant_header" = []))
)]
pub async fn set_active_tier(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path((offer_id, item_id, index)): Path<(Uuid, Uuid, usize)>,
) -> Result<impl IntoResponse, ApiError> {
    let offer = app_state
        .offer_service
        .set_active_tier(tenant.0, offer_id, item_id, index)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(offer)))
}

// =============================================================================
//  ÁREA 4: MODO DE PREÇO E IMPORTAÇÃO
// =============================================================================

// PUT /api/offers/{id}/pricing-mode
#[utoipa::path(
    put,
    path = "/api/offers/{id}/pricing-mode",
    tag = "Offers",
    params(("id" = Uuid, Path, description = "ID da oferta")),
    request_body = TogglePricingModePayload,
    responses(
        (status = 200, description = "Modo trocado e totais recalculados", body = OfferDetail)
    ),
    security(("tenant_header" = []))
)]
pub async fn toggle_pricing_mode(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(offer_id): Path<Uuid>,
    Json(payload): Json<TogglePricingModePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let offer = app_state
        .offer_service
        .toggle_mode(tenant.0, offer_id, payload.use_unit_prices)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(offer)))
}

// POST /api/offers/{id}/default-unit-prices/sync
#[utoipa::path(
    post,
    path = "/api/offers/{id}/default-unit-prices/sync",
    tag = "Offers",
    params(("id" = Uuid, Path, description = "ID da oferta")),
    responses(
        (status = 200, description = "Modelo copiado para todos os itens", body = OfferDetail),
        (status = 409, description = "Oferta não está no modo unitário")
    ),
    security(("tenant_header" = []))
)]
pub async fn sync_default_unit_prices(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let offer = app_state
        .offer_service
        .sync_default_unit_prices(tenant.0, offer_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(offer)))
}

// POST /api/offers/{id}/bulk-import
#[utoipa::path(
    post,
    path = "/api/offers/{id}/bulk-import",
    tag = "Offers",
    params(("id" = Uuid, Path, description = "ID da oferta")),
    request_body = BulkImportPayload,
    responses(
        (status = 200, description = "Preços importados", body = BulkImportResponse),
        (status = 422, description = "Texto sem linhas aproveitáveis")
    ),
    security(("tenant_header" = []))
)]
pub async fn bulk_import(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(offer_id): Path<Uuid>,
    Json(payload): Json<BulkImportPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let (offer, summary) = app_state
        .offer_service
        .bulk_import(tenant.0, offer_id, payload.raw_text)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((
        StatusCode::OK,
        Json(BulkImportResponse {
            offer,
            items_updated: summary.items_updated,
            tiers_imported: summary.tiers_imported,
            rows_ignored: summary.rows_ignored,
        }),
    ))
}

// =============================================================================
//  ÁREA 5: REVISÃO, STATUS E DOCUMENTO
// =============================================================================

// POST /api/offers/{id}/revisions
#[utoipa::path(
    post,
    path = "/api/offers/{id}/revisions",
    tag = "Offers",
    params(("id" = Uuid, Path, description = "ID da oferta de origem")),
    responses(
        (status = 201, description = "Nova revisão criada", body = OfferDetail)
    ),
    security(("tenant_header" = []))
)]
pub async fn create_revision(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let offer = app_state
        .offer_service
        .create_revision(tenant.0, offer_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(offer)))
}

// POST /api/offers/{id}/status
#[utoipa::path(
    post,
    path = "/api/offers/{id}/status",
    tag = "Offers",
    params(("id" = Uuid, Path, description = "ID da oferta")),
    request_body = TransitionStatusPayload,
    responses(
        (status = 200, description = "Status alterado", body = OfferDetail),
        (status = 409, description = "Transição inválida")
    ),
    security(("tenant_header" = []))
)]
pub async fn transition_status(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(offer_id): Path<Uuid>,
    Json(payload): Json<TransitionStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let offer = app_state
        .offer_service
        .transition_status(tenant.0, offer_id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(offer)))
}

// GET /api/offers/{id}/document
#[utoipa::path(
    get,
    path = "/api/offers/{id}/document",
    tag = "Offers",
    params(("id" = Uuid, Path, description = "ID da oferta")),
    responses(
        (status = 200, description = "Dados prontos para o PDF", body = OfferDocumentView)
    ),
    security(("tenant_header" = []))
)]
pub async fn document_view(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .offer_service
        .document_view(tenant.0, offer_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(view)))
}

// POST /api/offers/{id}/document
#[utoipa::path(
    post,
    path = "/api/offers/{id}/document",
    tag = "Offers",
    params(("id" = Uuid, Path, description = "ID da oferta")),
    request_body = RecordDocumentPayload,
    responses(
        (status = 200, description = "Documento gerado registrado", body = Offer)
    ),
    security(("tenant_header" = []))
)]
pub async fn record_generated_document(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(offer_id): Path<Uuid>,
    Json(payload): Json<RecordDocumentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let offer = app_state
        .offer_service
        .record_generated_document(tenant.0, offer_id, payload.document_reference)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(offer)))
}
