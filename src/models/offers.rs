// src/models/offers.rs

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    models::tiers::{QuantityTier, UnitTier},
    pricing::{tier_set::{TierPrecision, TierSet}, totals::OfferTotals},
};

pub const DEFAULT_CURRENCY: &str = "EUR";
pub const MAX_UNIT_PRICE_COLUMNS: i32 = 10;

// Configuração de uma oferta nova
pub const DEFAULT_UNIT_PRICE_DECIMAL_PLACES: i32 = 3;
pub const DEFAULT_TOTAL_PRICE_DECIMAL_PLACES: i32 = 2;
pub const DEFAULT_MAX_UNIT_PRICE_COLUMNS: i32 = 3;

/// Alíquota padrão (fração, 0.19 = 19%).
pub fn default_tax_rate() -> Decimal {
    Decimal::new(19, 2)
}

// --- Enums ---

/// Qual array de faixas é o oficial da oferta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingMode {
    Quantity,
    Unit,
}

impl PricingMode {
    pub fn from_flag(use_unit_prices: bool) -> Self {
        if use_unit_prices {
            PricingMode::Unit
        } else {
            PricingMode::Quantity
        }
    }
}

impl fmt::Display for PricingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingMode::Quantity => write!(f, "QUANTITY"),
            PricingMode::Unit => write!(f, "UNIT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "offer_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    Draft,
    Submitted,
    Negotiation,
    Accepted,
    Rejected,
    Expired,
    Cancelled,
}

impl OfferStatus {
    /// Quem decide o fluxo é o chamador; a única trava é que `Accepted` é final.
    pub fn can_transition_to(self, next: OfferStatus) -> bool {
        self != OfferStatus::Accepted && self != next
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OfferStatus::Draft => "DRAFT",
            OfferStatus::Submitted => "SUBMITTED",
            OfferStatus::Negotiation => "NEGOTIATION",
            OfferStatus::Accepted => "ACCEPTED",
            OfferStatus::Rejected => "REJECTED",
            OfferStatus::Expired => "EXPIRED",
            OfferStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", name)
    }
}

/// Número de exibição: `OF-AAAAMM-NNNN`, sequência reinicia a cada mês.
pub fn format_offer_number(at: DateTime<Utc>, sequence: i32) -> String {
    format!("OF-{}{:02}-{:04}", at.year(), at.month(), sequence)
}

// --- Oferta (raiz do agregado) ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "OF-202610-0007")]
    pub offer_number: String,
    #[schema(example = 1)]
    pub revision: i32,
    pub previous_offer_number: Option<String>,
    pub status: OfferStatus,

    pub customer_id: Option<Uuid>,
    pub inquiry_id: Option<Uuid>,
    // Fotos do cliente/consulta no momento da criação. Nunca recalculadas.
    #[schema(value_type = Object)]
    pub customer_snapshot: Value,
    #[schema(value_type = Object)]
    pub inquiry_snapshot: Value,

    // Configuração de preço
    pub use_unit_prices: bool,
    #[schema(example = 3)]
    pub unit_price_decimal_places: i32,
    #[schema(example = 2)]
    pub total_price_decimal_places: i32,
    #[schema(example = 3)]
    pub max_unit_price_columns: i32,
    #[schema(value_type = Vec<UnitTier>)]
    pub default_unit_prices: TierSet<UnitTier>,

    // Entradas comerciais
    #[schema(example = "10")]
    pub discount_percentage: Decimal,
    #[schema(example = "0")]
    pub discount_amount: Decimal,
    #[schema(example = "100.00")]
    pub shipping_cost: Decimal,
    #[schema(example = "0.19")]
    pub tax_rate: Decimal,
    #[schema(example = "EUR")]
    pub currency: String,

    // Cache dos totais (só a calculadora escreve aqui)
    #[schema(example = "4500.00")]
    pub subtotal: Decimal,
    #[schema(example = "788.50")]
    pub tax_amount: Decimal,
    #[schema(example = "4938.50")]
    pub total_amount: Decimal,

    pub document_generated_at: Option<DateTime<Utc>>,
    pub document_reference: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    pub fn pricing_mode(&self) -> PricingMode {
        PricingMode::from_flag(self.use_unit_prices)
    }

    pub fn precision(&self) -> Result<TierPrecision, AppError> {
        TierPrecision::new(self.unit_price_decimal_places, self.total_price_decimal_places)
    }

    /// Limite de colunas de preço unitário; 0 = sem limite.
    pub fn unit_price_column_limit(&self) -> usize {
        self.max_unit_price_columns.clamp(0, MAX_UNIT_PRICE_COLUMNS) as usize
    }

    pub fn is_locked(&self) -> bool {
        self.status == OfferStatus::Accepted
    }

    pub fn apply_totals(&mut self, totals: &OfferTotals) {
        self.subtotal = totals.subtotal;
        self.discount_amount = totals.discount_amount;
        self.tax_amount = totals.tax_amount;
        self.total_amount = totals.total_amount;
        self.updated_at = Utc::now();
    }

    pub fn ensure_mode(&self, requested: PricingMode) -> Result<(), AppError> {
        let expected = self.pricing_mode();
        if expected == requested {
            Ok(())
        } else {
            Err(AppError::ModeMismatch {
                expected,
                requested,
            })
        }
    }
}

// --- Item da oferta ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: Uuid,
    pub offer_id: Uuid,
    #[schema(example = 1)]
    pub position: i32,

    #[schema(example = "Gehäuse Aluminium")]
    pub item_name: String,
    pub description: Option<String>,
    pub notes: Option<String>,

    // Componente de montagem: fica fora do subtotal
    pub is_component: bool,
    pub is_assembly_item: bool,
    pub parent_item_id: Option<Uuid>,

    #[schema(example = "4.50")]
    pub base_price: Option<Decimal>,
    #[schema(example = "1000")]
    pub base_quantity: Option<String>,

    #[schema(value_type = Vec<QuantityTier>)]
    pub quantity_prices: TierSet<QuantityTier>,
    #[schema(value_type = Vec<UnitTier>)]
    pub unit_prices: TierSet<UnitTier>,

    #[schema(example = "4500.00")]
    pub line_total: Decimal,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A oferta com os itens, na ordem de `position`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfferDetail {
    #[serde(flatten)]
    pub header: Offer,
    pub line_items: Vec<LineItem>,
}

impl OfferDetail {
    pub fn find_item(&self, item_id: Uuid) -> Result<&LineItem, AppError> {
        self.line_items
            .iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| AppError::ResourceNotFound(format!("Item {}", item_id)))
    }

    pub fn find_item_mut(&mut self, item_id: Uuid) -> Result<&mut LineItem, AppError> {
        self.line_items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| AppError::ResourceNotFound(format!("Item {}", item_id)))
    }

    pub fn sort_by_position(&mut self) {
        self.line_items.sort_by_key(|i| i.position);
    }
}

// --- Entradas vindas da consulta (inquiry) ---

/// Um item pedido na consulta. Componentes vêm logo depois do cabeçalho da montagem.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItemSeed {
    #[schema(example = "Gehäuse Aluminium")]
    pub item_name: String,
    pub description: Option<String>,
    #[schema(example = "1000")]
    pub base_quantity: Option<String>,
    #[serde(default, deserialize_with = "crate::common::numeric::deserialize_lenient_decimal_opt")]
    #[schema(value_type = Option<String>, example = "4.50")]
    pub base_price: Option<Decimal>,
    #[serde(default)]
    pub is_component: bool,
    #[serde(default)]
    pub is_assembly_item: bool,
}

/// Tudo o que a criação da oferta precisa saber da consulta e do cliente.
#[derive(Debug, Clone)]
pub struct NewOffer {
    pub customer_id: Option<Uuid>,
    pub inquiry_id: Option<Uuid>,
    pub customer_snapshot: Value,
    pub inquiry_snapshot: Value,
    pub currency: Option<String>,
    pub use_unit_prices: bool,
    pub items: Vec<LineItemSeed>,
}

impl Default for NewOffer {
    fn default() -> Self {
        Self {
            customer_id: None,
            inquiry_id: None,
            customer_snapshot: json!({}),
            inquiry_snapshot: json!({}),
            currency: None,
            use_unit_prices: false,
            items: Vec::new(),
        }
    }
}

/// Edição parcial de um item. Campos de texto nunca mexem nas faixas.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItemPatch {
    pub item_name: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "crate::common::numeric::deserialize_lenient_decimal_opt")]
    #[schema(value_type = Option<String>, example = "4.50")]
    pub base_price: Option<Decimal>,
    pub base_quantity: Option<String>,
}

/// Item completo numa substituição em bloco da lista.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    pub item_name: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_component: bool,
    #[serde(default)]
    pub is_assembly_item: bool,
    #[serde(default, deserialize_with = "crate::common::numeric::deserialize_lenient_decimal_opt")]
    #[schema(value_type = Option<String>)]
    pub base_price: Option<Decimal>,
    pub base_quantity: Option<String>,
    #[serde(default)]
    pub quantity_prices: Vec<QuantityTier>,
    #[serde(default)]
    pub unit_prices: Vec<UnitTier>,
}

// --- Edição da configuração e dos termos comerciais ---

/// Campos ausentes ficam como estão.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PricingConfigUpdate {
    #[validate(range(min = 2, max = 4, message = "Entre 2 e 4 casas decimais"))]
    #[schema(example = 3)]
    pub unit_price_decimal_places: Option<i32>,
    #[validate(range(min = 2, max = 4, message = "Entre 2 e 4 casas decimais"))]
    #[schema(example = 2)]
    pub total_price_decimal_places: Option<i32>,
    #[validate(range(min = 0, max = 10, message = "Entre 0 (sem limite) e 10 colunas"))]
    #[schema(example = 3)]
    pub max_unit_price_columns: Option<i32>,
    pub default_unit_prices: Option<Vec<UnitTier>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommercialTermsUpdate {
    #[serde(default, deserialize_with = "crate::common::numeric::deserialize_lenient_decimal_opt")]
    #[schema(value_type = Option<String>, example = "10")]
    pub discount_percentage: Option<Decimal>,
    #[serde(default, deserialize_with = "crate::common::numeric::deserialize_lenient_decimal_opt")]
    #[schema(value_type = Option<String>, example = "0")]
    pub discount_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "crate::common::numeric::deserialize_lenient_decimal_opt")]
    #[schema(value_type = Option<String>, example = "100.00")]
    pub shipping_cost: Option<Decimal>,
    #[serde(default, deserialize_with = "crate::common::numeric::deserialize_lenient_decimal_opt")]
    #[schema(value_type = Option<String>, example = "0.19")]
    pub tax_rate: Option<Decimal>,
    #[validate(length(equal = 3, message = "Código ISO de 3 letras"))]
    #[schema(example = "EUR")]
    pub currency: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn accepted_is_terminal() {
        assert!(OfferStatus::Draft.can_transition_to(OfferStatus::Submitted));
        assert!(OfferStatus::Negotiation.can_transition_to(OfferStatus::Accepted));
        assert!(OfferStatus::Rejected.can_transition_to(OfferStatus::Draft));
        assert!(!OfferStatus::Accepted.can_transition_to(OfferStatus::Negotiation));
        assert!(!OfferStatus::Draft.can_transition_to(OfferStatus::Draft));
    }

    #[test]
    fn offer_number_uses_year_month_sequence() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(format_offer_number(at, 7), "OF-202603-0007");
    }

    #[test]
    fn default_tax_rate_is_nineteen_percent() {
        assert_eq!(default_tax_rate(), Decimal::new(19, 2));
    }
}
