// src/docs.rs

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;
use crate::pricing;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Offers ---
        handlers::offers::create_offer,
        handlers::offers::get_offer,
        handlers::offers::recalculate,
        handlers::offers::update_pricing_config,
        handlers::offers::update_commercial_terms,
        handlers::offers::toggle_pricing_mode,
        handlers::offers::sync_default_unit_prices,
        handlers::offers::bulk_import,
        handlers::offers::create_revision,
        handlers::offers::transition_status,
        handlers::offers::document_view,
        handlers::offers::record_generated_document,

        // --- Items ---
        handlers::offers::replace_line_items,
        handlers::offers::update_line_item,

        // --- Tiers ---
        handlers::offers::add_tier,
        handlers::offers::update_tier,
        handlers::offers::delete_tier,
        handlers::offers::set_active_tier,
    ),
    components(
        schemas(
            // --- Offers ---
            models::offers::PricingMode,
            models::offers::OfferStatus,
            models::offers::Offer,
            models::offers::LineItem,
            models::offers::OfferDetail,
            models::offers::LineItemSeed,
            models::offers::LineItemPatch,
            models::offers::LineItemInput,
            models::offers::PricingConfigUpdate,
            models::offers::CommercialTermsUpdate,

            // --- Tiers ---
            models::tiers::QuantityTier,
            models::tiers::UnitTier,
            models::tiers::TierInput,
            models::tiers::TierUpdate,

            // --- Document ---
            models::document::OfferDocumentView,
            models::document::DocumentLine,
            pricing::totals::OfferTotals,
            pricing::line_total::ActiveTierView,

            // --- Payloads ---
            handlers::offers::CreateOfferPayload,
            handlers::offers::ReplaceItemsPayload,
            handlers::offers::TogglePricingModePayload,
            handlers::offers::BulkImportPayload,
            handlers::offers::BulkImportResponse,
            handlers::offers::TransitionStatusPayload,
            handlers::offers::RecordDocumentPayload,
        )
    ),
    tags(
        (name = "Offers", description = "Ofertas: totais, modo de preço, revisões e documento"),
        (name = "Offer Items", description = "Itens da oferta"),
        (name = "Price Tiers", description = "Faixas de preço por quantidade e unitárias")
    ),
    modifiers(&TenantHeaderAddon)
)]
pub struct ApiDoc;

struct TenantHeaderAddon;

impl utoipa::Modify for TenantHeaderAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "tenant_header",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-tenant-id"))),
        );
    }
}
