// src/pricing/line_total.rs

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::numeric::{parse_quantity, round_money},
    models::{
        offers::{LineItem, LineItemSeed, PricingMode},
        tiers::{QuantityTier, UnitTier},
    },
    pricing::tier_set::{PriceTier, TierPrecision, TierSet},
};

/// Visão do array de faixas que vale para o modo da oferta.
pub enum PriceTiers<'a> {
    Quantity(&'a TierSet<QuantityTier>),
    Unit(&'a TierSet<UnitTier>),
}

impl PriceTiers<'_> {
    pub fn is_empty(&self) -> bool {
        match self {
            PriceTiers::Quantity(set) => set.is_empty(),
            PriceTiers::Unit(set) => set.is_empty(),
        }
    }

    /// Total da faixa ativa; sem nenhuma marcada, a primeira vale como ativa.
    pub fn effective_total(&self) -> Option<Decimal> {
        fn pick<T: PriceTier>(set: &TierSet<T>) -> Option<Decimal> {
            set.active_total().or_else(|| set.get(0).map(|t| t.total()))
        }
        match self {
            PriceTiers::Quantity(set) => pick(set),
            PriceTiers::Unit(set) => pick(set),
        }
    }

    pub fn effective_tier(&self) -> Option<ActiveTierView> {
        fn pick<T: PriceTier>(set: &TierSet<T>) -> Option<ActiveTierView> {
            let index = set.active_index().or(if set.is_empty() { None } else { Some(0) })?;
            let tier = set.get(index)?;
            Some(ActiveTierView {
                index,
                quantity: tier.quantity().to_string(),
                price: tier.price(),
                total: tier.total(),
            })
        }
        match self {
            PriceTiers::Quantity(set) => pick(set),
            PriceTiers::Unit(set) => pick(set),
        }
    }
}

/// A faixa ativa de um item, como o PDF mostra.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTierView {
    pub index: usize,
    pub quantity: String,
    pub price: Decimal,
    pub total: Decimal,
}

impl LineItem {
    /// Cria o item a partir da consulta. Faixas ficam vazias; o modo unitário
    /// recebe o modelo padrão depois, pelo migrador.
    pub fn from_seed(offer_id: Uuid, position: i32, seed: LineItemSeed) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            offer_id,
            position,
            item_name: seed.item_name,
            description: seed.description,
            notes: None,
            is_component: seed.is_component,
            is_assembly_item: seed.is_assembly_item,
            parent_item_id: None,
            base_price: seed.base_price,
            base_quantity: seed.base_quantity,
            quantity_prices: TierSet::new(),
            unit_prices: TierSet::new(),
            line_total: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn tiers(&self, mode: PricingMode) -> PriceTiers<'_> {
        match mode {
            PricingMode::Quantity => PriceTiers::Quantity(&self.quantity_prices),
            PricingMode::Unit => PriceTiers::Unit(&self.unit_prices),
        }
    }

    /// `preço base × quantidade base` (quantidade ausente = "1"). Sem preço base => 0.
    pub fn base_total(&self, precision: TierPrecision) -> Decimal {
        let Some(price) = self.base_price else {
            return Decimal::ZERO;
        };
        let qty = parse_quantity(self.base_quantity.as_deref().unwrap_or("1")).unwrap_or(Decimal::ZERO);
        let total = qty.checked_mul(price).unwrap_or(Decimal::ZERO);
        round_money(total, precision.total_price_dp())
    }

    pub fn compute_line_total(&self, use_unit_prices: bool, precision: TierPrecision) -> Decimal {
        let tiers = self.tiers(PricingMode::from_flag(use_unit_prices));
        if tiers.is_empty() {
            return self.base_total(precision);
        }
        tiers.effective_total().unwrap_or(Decimal::ZERO)
    }

    /// Reparo na leitura dos dois arrays + totais das faixas na precisão atual.
    /// Retorna `true` se o item mudou.
    pub fn normalize_tiers(&mut self, precision: TierPrecision) -> bool {
        let before_q = self.quantity_prices.clone();
        let before_u = self.unit_prices.clone();

        let mut repaired = self.quantity_prices.repair_active();
        repaired |= self.unit_prices.repair_active();
        if repaired {
            tracing::debug!(item_id = %self.id, "faixa ativa reparada na leitura");
        }

        self.quantity_prices.recompute_totals(precision);
        self.unit_prices.recompute_totals(precision);

        before_q != self.quantity_prices || before_u != self.unit_prices
    }

    /// Grava `line_total` se o valor derivado mudou.
    pub fn refresh_line_total(&mut self, use_unit_prices: bool, precision: TierPrecision) -> bool {
        let computed = self.compute_line_total(use_unit_prices, precision);
        if computed != self.line_total {
            self.line_total = computed;
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item() -> LineItem {
        LineItem::from_seed(
            Uuid::new_v4(),
            1,
            LineItemSeed {
                item_name: "Gehäuse".into(),
                base_quantity: Some("1000".into()),
                base_price: Some(dec!(4.5)),
                ..Default::default()
            },
        )
    }

    #[test]
    fn falls_back_to_base_price_without_tiers() {
        let precision = TierPrecision::default();
        assert_eq!(item().compute_line_total(false, precision), dec!(4500));
    }

    #[test]
    fn missing_base_quantity_counts_as_one() {
        let mut it = item();
        it.base_quantity = None;
        assert_eq!(it.compute_line_total(false, TierPrecision::default()), dec!(4.50));
    }

    #[test]
    fn no_price_at_all_is_zero() {
        let mut it = item();
        it.base_price = None;
        assert_eq!(it.compute_line_total(true, TierPrecision::default()), Decimal::ZERO);
    }

    #[test]
    fn uses_the_tier_set_of_the_offer_mode() {
        let precision = TierPrecision::new(3, 2).unwrap();
        let mut it = item();
        it.unit_prices.add_tier(UnitTier::new("5000", dec!(4.2)), true, precision);
        it.quantity_prices.add_tier(QuantityTier::new("100", dec!(9)), true, precision);

        assert_eq!(it.compute_line_total(true, precision), dec!(21000.00));
        assert_eq!(it.compute_line_total(false, precision), dec!(900.00));
    }

    #[test]
    fn first_tier_counts_as_active_until_repaired() {
        let precision = TierPrecision::new(3, 2).unwrap();
        let mut it = item();
        let mut a = UnitTier::new("1000", dec!(1));
        let mut b = UnitTier::new("2000", dec!(1));
        a.total_price = dec!(1000);
        b.total_price = dec!(2000);
        it.unit_prices = TierSet::from_vec(vec![a, b]);

        assert_eq!(it.compute_line_total(true, precision), dec!(1000));
        assert!(it.normalize_tiers(precision));
        assert_eq!(it.unit_prices.active_index(), Some(0));
        assert!(!it.normalize_tiers(precision));
    }
}
