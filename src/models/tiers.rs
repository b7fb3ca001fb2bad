// src/models/tiers.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        numeric::{parse_quantity, round_money},
    },
    models::offers::PricingMode,
    pricing::tier_set::{PriceTier, TierPrecision},
};

/// `parse_quantity(quantity) × price`, arredondado. Quantidade ilegível ou overflow viram 0.
pub fn tier_total(quantity: &str, price: Decimal, decimal_places: u32) -> Decimal {
    let qty = parse_quantity(quantity).unwrap_or(Decimal::ZERO);
    let total = qty.checked_mul(price).unwrap_or(Decimal::ZERO);
    round_money(total, decimal_places)
}

// --- Faixa por quantidade (formato antigo) ---
// Não tem id: no JSON legado as faixas são endereçadas pela posição no array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuantityTier {
    #[schema(example = "1000 pcs")]
    pub quantity: String,
    #[schema(example = "4.50")]
    pub price: Decimal,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    #[schema(example = "4500.00")]
    pub total: Decimal,
}

impl QuantityTier {
    pub fn new(quantity: impl Into<String>, price: Decimal) -> Self {
        Self {
            quantity: quantity.into(),
            price,
            is_active: false,
            total: Decimal::ZERO,
        }
    }
}

impl PriceTier for QuantityTier {
    fn quantity(&self) -> &str {
        &self.quantity
    }

    fn price(&self) -> Decimal {
        self.price
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    fn total(&self) -> Decimal {
        self.total
    }

    fn set_terms(&mut self, quantity: String, price: Decimal) {
        self.quantity = quantity;
        self.price = price;
    }

    fn recompute_total(&mut self, precision: TierPrecision) {
        self.total = tier_total(&self.quantity, self.price, precision.total_price_dp());
    }
}

// --- Faixa de preço unitário (formato atual) ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnitTier {
    pub id: Uuid,
    #[schema(example = "1000")]
    pub quantity: String,
    #[schema(example = "4.500")]
    pub unit_price: Decimal,
    #[serde(default)]
    #[schema(example = "4500.00")]
    pub total_price: Decimal,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UnitTier {
    pub fn new(quantity: impl Into<String>, unit_price: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            quantity: quantity.into(),
            unit_price,
            total_price: Decimal::ZERO,
            is_active: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl PriceTier for UnitTier {
    fn quantity(&self) -> &str {
        &self.quantity
    }

    fn price(&self) -> Decimal {
        self.unit_price
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    fn total(&self) -> Decimal {
        self.total_price
    }

    fn set_terms(&mut self, quantity: String, price: Decimal) {
        self.quantity = quantity;
        self.unit_price = price;
        self.updated_at = Utc::now();
    }

    // O preço unitário é arredondado antes, para o total bater com o que aparece na tela.
    fn recompute_total(&mut self, precision: TierPrecision) {
        self.unit_price = round_money(self.unit_price, precision.unit_price_dp());
        self.total_price = tier_total(&self.quantity, self.unit_price, precision.total_price_dp());
    }
}

// --- Entradas de edição de faixas ---

/// Nova faixa. `kind` tem que bater com o modo da oferta.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TierInput {
    pub kind: PricingMode,
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "5000")]
    pub quantity: String,
    #[serde(deserialize_with = "crate::common::numeric::deserialize_lenient_decimal")]
    #[schema(value_type = String, example = "4.20")]
    pub price: Decimal,
    #[serde(default)]
    pub activate: bool,
}

/// Os dois campos são obrigatórios; `Option` só para a mensagem de erro dizer qual faltou.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TierUpdate {
    #[schema(example = "8000")]
    pub quantity: Option<String>,
    #[serde(default, deserialize_with = "crate::common::numeric::deserialize_lenient_decimal_opt")]
    #[schema(value_type = Option<String>, example = "4.10")]
    pub price: Option<Decimal>,
}

/// Faixas unitárias são apagadas pelo id; as antigas, pela posição no array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierRef {
    Id(Uuid),
    Index(usize),
}

impl std::str::FromStr for TierRef {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(id) = Uuid::parse_str(s) {
            return Ok(TierRef::Id(id));
        }
        s.parse::<usize>()
            .map(TierRef::Index)
            .map_err(|_| AppError::invalid_field("tier", "esperado um UUID ou um índice"))
    }
}
