// src/models/document.rs

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::offers::{OfferDetail, OfferStatus},
    pricing::{line_total::ActiveTierView, totals::OfferTotals},
};

/// O que o gerador de PDF recebe: números já arredondados e finitos.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfferDocumentView {
    pub offer_id: Uuid,
    pub offer_number: String,
    pub revision: i32,
    pub status: OfferStatus,
    pub currency: String,
    #[schema(value_type = Object)]
    pub customer_snapshot: Value,
    pub use_unit_prices: bool,
    pub shipping_cost: Decimal,
    pub tax_rate: Decimal,
    pub totals: OfferTotals,
    pub items: Vec<DocumentLine>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLine {
    pub position: i32,
    pub item_name: String,
    pub description: Option<String>,
    pub is_component: bool,
    pub line_total: Decimal,
    pub active_tier: Option<ActiveTierView>,
}

impl OfferDocumentView {
    /// Monta a partir de uma oferta já recalculada.
    pub fn build(detail: &OfferDetail, totals: OfferTotals) -> Self {
        let offer = &detail.header;
        let mode = offer.pricing_mode();

        let items = detail
            .line_items
            .iter()
            .map(|item| DocumentLine {
                position: item.position,
                item_name: item.item_name.clone(),
                description: item.description.clone(),
                is_component: item.is_component,
                line_total: item.line_total,
                active_tier: item.tiers(mode).effective_tier(),
            })
            .collect();

        Self {
            offer_id: offer.id,
            offer_number: offer.offer_number.clone(),
            revision: offer.revision,
            status: offer.status,
            currency: offer.currency.clone(),
            customer_snapshot: offer.customer_snapshot.clone(),
            use_unit_prices: offer.use_unit_prices,
            shipping_cost: offer.shipping_cost.max(Decimal::ZERO),
            tax_rate: offer.tax_rate,
            totals,
            items,
        }
    }
}
