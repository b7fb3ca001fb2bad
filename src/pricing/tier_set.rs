// src/pricing/tier_set.rs

//! Lista ordenada de faixas de preço de um item, com no máximo uma faixa ativa.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::{error::AppError, numeric::parse_quantity};

pub const MIN_DECIMAL_PLACES: i32 = 2;
pub const MAX_DECIMAL_PLACES: i32 = 4;

/// Contrato comum das duas variantes de faixa (`QuantityTier` e `UnitTier`).
pub trait PriceTier {
    fn quantity(&self) -> &str;
    fn price(&self) -> Decimal;
    fn is_active(&self) -> bool;
    fn set_active(&mut self, active: bool);
    fn total(&self) -> Decimal;
    /// Troca quantidade e preço. Quem chama recalcula o total logo depois.
    fn set_terms(&mut self, quantity: String, price: Decimal);
    fn recompute_total(&mut self, precision: TierPrecision);
}

/// Casas decimais já validadas (2..=4) para preço unitário e total da faixa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPrecision {
    unit_price_dp: u32,
    total_price_dp: u32,
}

impl TierPrecision {
    pub fn new(unit_price_dp: i32, total_price_dp: i32) -> Result<Self, AppError> {
        let check = |field: &str, value: i32| -> Result<u32, AppError> {
            if (MIN_DECIMAL_PLACES..=MAX_DECIMAL_PLACES).contains(&value) {
                Ok(value as u32)
            } else {
                Err(AppError::OutOfRange(format!(
                    "{} = {} (permitido {}..={})",
                    field, value, MIN_DECIMAL_PLACES, MAX_DECIMAL_PLACES
                )))
            }
        };

        Ok(Self {
            unit_price_dp: check("unitPriceDecimalPlaces", unit_price_dp)?,
            total_price_dp: check("totalPriceDecimalPlaces", total_price_dp)?,
        })
    }

    pub fn unit_price_dp(&self) -> u32 {
        self.unit_price_dp
    }

    pub fn total_price_dp(&self) -> u32 {
        self.total_price_dp
    }
}

impl Default for TierPrecision {
    fn default() -> Self {
        Self {
            unit_price_dp: MIN_DECIMAL_PLACES as u32,
            total_price_dp: MIN_DECIMAL_PLACES as u32,
        }
    }
}

/// Faixas de um item. No banco é só um array JSON; aqui os invariantes são mantidos:
/// ordenado pela quantidade numérica, e 0 ou 1 faixa ativa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierSet<T> {
    tiers: Vec<T>,
}

impl<T> Default for TierSet<T> {
    fn default() -> Self {
        Self { tiers: Vec::new() }
    }
}

// Quantidade ilegível vai para o fim da lista.
fn compare_quantities(a: &str, b: &str) -> Ordering {
    match (parse_quantity(a), parse_quantity(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl<T: PriceTier> TierSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monta a partir de dados já persistidos, sem reordenar nem reparar.
    pub fn from_vec(tiers: Vec<T>) -> Self {
        Self { tiers }
    }

    /// Monta a partir de entrada do usuário: ordena, recalcula totais e respeita
    /// o `is_active` de cada faixa (a última marcada vence; nenhuma => a primeira informada).
    pub fn from_unsorted(tiers: Vec<T>, precision: TierPrecision) -> Self {
        let mut set = Self::new();
        for tier in tiers {
            let activate = tier.is_active();
            set.add_tier(tier, activate, precision);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.tiers.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.tiers
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.tiers.get(index)
    }

    pub fn clear(&mut self) {
        self.tiers.clear();
    }

    pub fn into_vec(self) -> Vec<T> {
        self.tiers
    }

    pub fn active_count(&self) -> usize {
        self.tiers.iter().filter(|t| t.is_active()).count()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.tiers.iter().position(|t| t.is_active())
    }

    pub fn active(&self) -> Option<&T> {
        self.tiers.iter().find(|t| t.is_active())
    }

    /// Total da faixa ativa. `None` => usar o preço base do item.
    pub fn active_total(&self) -> Option<Decimal> {
        self.active().map(|t| t.total())
    }

    fn check_index(&self, index: usize) -> Result<(), AppError> {
        if index < self.tiers.len() {
            Ok(())
        } else {
            Err(AppError::OutOfRange(format!(
                "faixa {} (o item tem {} faixas)",
                index,
                self.tiers.len()
            )))
        }
    }

    pub fn set_active(&mut self, index: usize) -> Result<(), AppError> {
        self.check_index(index)?;
        for (i, tier) in self.tiers.iter_mut().enumerate() {
            tier.set_active(i == index);
        }
        Ok(())
    }

    /// Insere a faixa já com o total calculado e devolve o índice final (após ordenar).
    ///
    /// A nova faixa fica ativa se isso foi pedido ou se nenhuma outra estava ativa.
    pub fn add_tier(&mut self, mut tier: T, activate: bool, precision: TierPrecision) -> usize {
        tier.recompute_total(precision);

        let activate = activate || self.active_index().is_none();
        if activate {
            for existing in self.tiers.iter_mut() {
                existing.set_active(false);
            }
        }
        tier.set_active(activate);

        self.tiers.push(tier);
        let inserted = self.tiers.len() - 1;
        self.sort_tracking(inserted)
    }

    /// Atualiza quantidade e preço de uma faixa. Devolve o novo índice.
    pub fn update_tier(
        &mut self,
        index: usize,
        quantity: String,
        price: Decimal,
        precision: TierPrecision,
    ) -> Result<usize, AppError> {
        self.check_index(index)?;
        let tier = &mut self.tiers[index];
        tier.set_terms(quantity, price);
        tier.recompute_total(precision);
        Ok(self.sort_tracking(index))
    }

    pub fn delete_at(&mut self, index: usize) -> Result<T, AppError> {
        self.check_index(index)?;
        let removed = self.tiers.remove(index);
        if removed.is_active() {
            if let Some(first) = self.tiers.first_mut() {
                first.set_active(true);
            }
        }
        Ok(removed)
    }

    /// Reparo explícito na leitura: array não vazio sem faixa ativa promove a primeira;
    /// mais de uma ativa mantém só a primeira. Retorna `true` se algo mudou.
    pub fn repair_active(&mut self) -> bool {
        match self.active_count() {
            0 if !self.tiers.is_empty() => {
                self.tiers[0].set_active(true);
                true
            }
            n if n > 1 => {
                let keep = self.active_index();
                for (i, tier) in self.tiers.iter_mut().enumerate() {
                    tier.set_active(Some(i) == keep);
                }
                true
            }
            _ => false,
        }
    }

    /// Recalcula o total de todas as faixas (ex: mudou a precisão da oferta).
    pub fn recompute_totals(&mut self, precision: TierPrecision) {
        for tier in self.tiers.iter_mut() {
            tier.recompute_total(precision);
        }
    }

    /// Mantém no máximo `max` faixas (0 = sem limite). Se a ativa cair fora, a primeira assume.
    pub fn truncate(&mut self, max: usize) {
        if max == 0 || self.tiers.len() <= max {
            return;
        }
        self.tiers.truncate(max);
        self.repair_active();
    }

    // Ordenação estável por quantidade; devolve onde foi parar o elemento `tracked`.
    fn sort_tracking(&mut self, tracked: usize) -> usize {
        let mut indexed: Vec<(usize, T)> = self.tiers.drain(..).enumerate().collect();
        indexed.sort_by(|(_, a), (_, b)| compare_quantities(a.quantity(), b.quantity()));

        let mut new_index = 0;
        for (pos, (original, tier)) in indexed.into_iter().enumerate() {
            if original == tracked {
                new_index = pos;
            }
            self.tiers.push(tier);
        }
        new_index
    }
}

impl<T> FromIterator<T> for TierSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            tiers: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tiers::{QuantityTier, UnitTier};
    use rust_decimal_macros::dec;

    fn precision() -> TierPrecision {
        TierPrecision::new(3, 2).unwrap()
    }

    #[test]
    fn decimal_places_outside_two_to_four_are_rejected() {
        assert!(TierPrecision::new(2, 4).is_ok());
        assert!(matches!(TierPrecision::new(1, 2), Err(AppError::OutOfRange(_))));
        assert!(matches!(TierPrecision::new(2, 5), Err(AppError::OutOfRange(_))));
    }

    #[test]
    fn first_tier_added_becomes_active() {
        let mut set = TierSet::new();
        set.add_tier(UnitTier::new("1000", dec!(4.5)), false, precision());
        assert_eq!(set.active_index(), Some(0));
        assert_eq!(set.active_total(), Some(dec!(4500.00)));
    }

    #[test]
    fn tiers_are_sorted_by_numeric_quantity() {
        let mut set = TierSet::new();
        set.add_tier(QuantityTier::new("5000", dec!(4.2)), false, precision());
        set.add_tier(QuantityTier::new("500 pcs", dec!(5.0)), false, precision());
        let idx = set.add_tier(QuantityTier::new("1000", dec!(4.5)), false, precision());

        let quantities: Vec<&str> = set.iter().map(|t| t.quantity.as_str()).collect();
        assert_eq!(quantities, vec!["500 pcs", "1000", "5000"]);
        assert_eq!(idx, 1);
    }

    #[test]
    fn equal_quantities_keep_insertion_order() {
        let mut set = TierSet::new();
        set.add_tier(QuantityTier::new("100", dec!(1)), false, precision());
        set.add_tier(QuantityTier::new("100", dec!(2)), false, precision());
        let prices: Vec<Decimal> = set.iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![dec!(1), dec!(2)]);
    }

    #[test]
    fn activating_a_new_tier_deactivates_siblings() {
        let mut set = TierSet::new();
        set.add_tier(UnitTier::new("1000", dec!(4.5)), true, precision());
        let idx = set.add_tier(UnitTier::new("5000", dec!(4.2)), true, precision());
        assert_eq!(set.active_count(), 1);
        assert_eq!(set.active_index(), Some(idx));
    }

    #[test]
    fn set_active_out_of_range_fails() {
        let mut set: TierSet<UnitTier> = TierSet::new();
        set.add_tier(UnitTier::new("1", dec!(1)), false, precision());
        assert!(matches!(set.set_active(1), Err(AppError::OutOfRange(_))));
        assert_eq!(set.active_index(), Some(0));
    }

    #[test]
    fn deleting_the_active_tier_promotes_the_first() {
        let mut set = TierSet::new();
        set.add_tier(UnitTier::new("1000", dec!(4.5)), false, precision());
        set.add_tier(UnitTier::new("5000", dec!(4.2)), false, precision());
        set.add_tier(UnitTier::new("10000", dec!(4.0)), true, precision());

        set.delete_at(2).unwrap();
        assert_eq!(set.active_index(), Some(0));

        set.delete_at(0).unwrap();
        set.delete_at(0).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.active_total(), None);
    }

    #[test]
    fn repair_promotes_first_tier_when_none_is_active() {
        let mut set = TierSet::from_vec(vec![
            QuantityTier::new("10", dec!(1)),
            QuantityTier::new("20", dec!(1)),
        ]);
        assert_eq!(set.active_total(), None);
        assert!(set.repair_active());
        assert_eq!(set.active_index(), Some(0));
        assert!(!set.repair_active());
    }

    #[test]
    fn repair_keeps_only_the_first_of_several_active() {
        let mut a = QuantityTier::new("10", dec!(1));
        let mut b = QuantityTier::new("20", dec!(1));
        a.is_active = true;
        b.is_active = true;
        let mut set = TierSet::from_vec(vec![a, b]);
        assert!(set.repair_active());
        assert_eq!(set.active_count(), 1);
        assert_eq!(set.active_index(), Some(0));
    }

    #[test]
    fn update_rederives_total_and_resorts() {
        let mut set = TierSet::new();
        set.add_tier(UnitTier::new("1000", dec!(4.5)), true, precision());
        set.add_tier(UnitTier::new("5000", dec!(4.2)), false, precision());

        let idx = set.update_tier(0, "8000".into(), dec!(4.1), precision()).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(set.get(1).unwrap().total_price, dec!(32800.00));
        assert!(set.get(1).unwrap().is_active);
    }

    #[test]
    fn truncate_respects_column_limit() {
        let mut set = TierSet::new();
        for q in ["1", "2", "3", "4"] {
            set.add_tier(UnitTier::new(q, dec!(1)), false, precision());
        }
        set.set_active(3).unwrap();
        set.truncate(2);
        assert_eq!(set.len(), 2);
        assert_eq!(set.active_index(), Some(0));

        set.truncate(0);
        assert_eq!(set.len(), 2);
    }
}
