// src/pricing/totals.rs

//! Cálculo dos totais da oferta. É o único caminho que escreve subtotal,
//! imposto e total; qualquer mutação termina chamando `calculate_totals`.

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        numeric::{round_money, OFFER_TOTAL_DECIMAL_PLACES},
    },
    models::offers::{LineItem, Offer},
};

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfferTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub after_discount: Decimal,
    pub before_tax: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

/// Resultado do cálculo: os totais e quais itens tiveram o cache alterado.
#[derive(Debug, Clone)]
pub struct TotalsOutcome {
    pub totals: OfferTotals,
    pub changed_items: Vec<Uuid>,
}

// Overflow (ou qualquer valor não representável) vira 0 em vez de derrubar o cálculo.
fn finite_or_zero(value: Option<Decimal>, field: &str) -> Decimal {
    match value {
        Some(v) => round_money(v, OFFER_TOTAL_DECIMAL_PLACES),
        None => {
            tracing::warn!(field, "valor não representável no cálculo da oferta, usando 0");
            round_money(Decimal::ZERO, OFFER_TOTAL_DECIMAL_PLACES)
        }
    }
}

/// Recalcula o `line_total` de cada item e os totais da oferta.
///
/// Itens alterados (reparo de faixa ativa, total de faixa ou `line_total`) vêm em
/// `changed_items` para o repositório salvar só eles. Componentes ficam fora da soma.
pub fn calculate_totals(offer: &Offer, items: &mut [LineItem]) -> Result<TotalsOutcome, AppError> {
    let precision = offer.precision()?;

    let mut changed_items = Vec::new();
    for item in items.iter_mut() {
        let mut dirty = item.normalize_tiers(precision);
        dirty |= item.refresh_line_total(offer.use_unit_prices, precision);
        if dirty {
            changed_items.push(item.id);
        }
    }

    let subtotal = items
        .iter()
        .filter(|i| !i.is_component)
        .try_fold(Decimal::ZERO, |acc, i| acc.checked_add(i.line_total));
    let subtotal = finite_or_zero(subtotal, "subtotal");

    // Percentual tem precedência e sobrescreve o desconto absoluto guardado
    let discount_amount = if offer.discount_percentage > Decimal::ZERO {
        subtotal
            .checked_mul(offer.discount_percentage)
            .and_then(|v| v.checked_div(ONE_HUNDRED))
    } else {
        Some(offer.discount_amount.max(Decimal::ZERO))
    };
    let discount_amount = finite_or_zero(discount_amount, "discount_amount");

    let after_discount = finite_or_zero(
        subtotal.checked_sub(discount_amount).map(|v| v.max(Decimal::ZERO)),
        "after_discount",
    );

    let before_tax = finite_or_zero(
        after_discount.checked_add(offer.shipping_cost.max(Decimal::ZERO)),
        "before_tax",
    );

    let tax_amount = finite_or_zero(
        before_tax.checked_mul(offer.tax_rate.max(Decimal::ZERO)),
        "tax_amount",
    );

    let total_amount = finite_or_zero(before_tax.checked_add(tax_amount), "total_amount");

    Ok(TotalsOutcome {
        totals: OfferTotals {
            subtotal,
            discount_amount,
            after_discount,
            before_tax,
            tax_amount,
            total_amount,
        },
        changed_items,
    })
}
