// src/pricing/mode_migrator.rs

//! Troca do modo de preço da oferta (faixas por quantidade <-> preço unitário).

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        offers::{LineItem, Offer},
        tiers::UnitTier,
    },
    pricing::tier_set::{TierPrecision, TierSet},
};

/// Quantidades do modelo padrão quando a oferta não tem um próprio.
pub const FALLBACK_TEMPLATE_QUANTITIES: [&str; 3] = ["1000", "5000", "10000"];

/// Modelo de faixas unitárias da oferta, já limitado ao número de colunas.
///
/// Cada chamada devolve faixas com ids novos, prontas para entrar num item.
pub fn default_unit_tiers(offer: &Offer, precision: TierPrecision) -> TierSet<UnitTier> {
    let now = Utc::now();

    let mut template: TierSet<UnitTier> = if offer.default_unit_prices.is_empty() {
        FALLBACK_TEMPLATE_QUANTITIES
            .iter()
            .enumerate()
            .map(|(i, q)| {
                let mut tier = UnitTier::new(*q, Decimal::ZERO);
                tier.is_active = i == 0;
                tier
            })
            .collect()
    } else {
        offer
            .default_unit_prices
            .iter()
            .map(|t| UnitTier {
                id: Uuid::new_v4(),
                created_at: now,
                updated_at: now,
                ..t.clone()
            })
            .collect()
    };

    template.truncate(offer.unit_price_column_limit());
    template.repair_active();
    template.recompute_totals(precision);
    template
}

/// Aplica o modo pedido à oferta e aos itens. Não recalcula totais; o serviço faz isso
/// logo em seguida, antes de salvar.
///
/// Ligar: itens (não componentes) sem faixas unitárias recebem o modelo padrão.
/// Desligar: faixas unitárias são descartadas, as faixas por quantidade ficam.
/// Devolve os ids dos itens alterados.
pub fn apply_mode(
    offer: &mut Offer,
    items: &mut [LineItem],
    use_unit_prices: bool,
) -> Result<Vec<Uuid>, AppError> {
    let precision = offer.precision()?;
    offer.use_unit_prices = use_unit_prices;

    let mut changed = Vec::new();
    for item in items.iter_mut().filter(|i| !i.is_component) {
        if use_unit_prices {
            if item.unit_prices.is_empty() {
                item.unit_prices = default_unit_tiers(offer, precision);
                changed.push(item.id);
            }
        } else if !item.unit_prices.is_empty() {
            item.unit_prices.clear();
            changed.push(item.id);
        }
    }

    tracing::debug!(
        offer_id = %offer.id,
        use_unit_prices,
        changed = changed.len(),
        "modo de preço aplicado"
    );
    Ok(changed)
}

/// Sobrescreve as faixas unitárias de todos os itens (não componentes) com o modelo.
pub fn sync_default_unit_prices(offer: &Offer, items: &mut [LineItem]) -> Result<usize, AppError> {
    let precision = offer.precision()?;
    let mut count = 0;
    for item in items.iter_mut().filter(|i| !i.is_component) {
        item.unit_prices = default_unit_tiers(offer, precision);
        item.updated_at = Utc::now();
        count += 1;
    }
    Ok(count)
}

/// Modelo padrão normalizado antes de ser guardado na oferta.
pub fn normalize_template(
    tiers: Vec<UnitTier>,
    column_limit: usize,
    precision: TierPrecision,
) -> TierSet<UnitTier> {
    let mut set = TierSet::from_unsorted(tiers, precision);
    set.truncate(column_limit);
    set
}
