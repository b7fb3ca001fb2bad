// src/pricing/bulk_import.rs

//! Importação de preços colados de uma planilha.
//!
//! Formato: primeira linha é cabeçalho; cada linha seguinte é
//! `rótulo, quantidade1, preço1, quantidade2, preço2, ...` separada por TAB
//! (ou vírgula, se a linha não tiver TAB).

use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        numeric::{is_non_positive_quantity, parse_decimal_lenient},
    },
    models::{
        offers::{LineItem, Offer, PricingMode},
        tiers::{QuantityTier, UnitTier},
    },
    pricing::tier_set::TierSet,
};

/// Uma linha de dados já separada em pares válidos.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub label: String,
    pub pairs: Vec<(String, Decimal)>,
}

impl ImportRow {
    /// Rótulo numérico positivo = posição do item.
    fn position_label(&self) -> Option<i32> {
        self.label.parse::<i32>().ok().filter(|p| *p > 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub items_updated: Vec<Uuid>,
    pub tiers_imported: usize,
    pub rows_ignored: usize,
}

fn split_cells(line: &str) -> Vec<&str> {
    let separator = if line.contains('\t') { '\t' } else { ',' };
    line.split(separator).map(str::trim).collect()
}

fn accept_pair(quantity: &str, price: &str) -> Option<(String, Decimal)> {
    if quantity.is_empty() || is_non_positive_quantity(quantity) {
        return None;
    }
    let price = parse_decimal_lenient(price)?;
    (price > Decimal::ZERO).then(|| (quantity.to_string(), price))
}

/// Separa o texto em linhas de dados. Pares inválidos são descartados sem erro.
pub fn parse_rows(raw: &str) -> Result<Vec<ImportRow>, AppError> {
    let lines: Vec<&str> = raw
        .split('\n')
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.len() < 2 {
        return Err(AppError::ImportFormat(
            "esperado cabeçalho e pelo menos uma linha de dados".into(),
        ));
    }

    let rows = lines[1..]
        .iter()
        .map(|line| {
            let cells = split_cells(line);
            let label = cells.first().copied().unwrap_or_default().to_string();
            let pairs = cells
                .get(1..)
                .unwrap_or_default()
                .chunks(2)
                .filter_map(|pair| match pair {
                    [quantity, price] => accept_pair(quantity, price),
                    _ => None,
                })
                .collect();
            ImportRow { label, pairs }
        })
        .collect();

    Ok(rows)
}

/// Decide para qual item vai cada linha.
///
/// Se todo rótulo for a posição de um item que não é componente, o rótulo manda e linhas
/// com o mesmo rótulo se acumulam no mesmo item. Senão (texto, número de artigo como
/// "4711"), a linha i vai para o i-ésimo item que não é componente, na ordem de `position`.
fn route_rows(rows: &[ImportRow], items: &[LineItem]) -> (Vec<(Uuid, Vec<(String, Decimal)>)>, usize) {
    let mut targets: Vec<&LineItem> = items.iter().filter(|i| !i.is_component).collect();
    targets.sort_by_key(|i| i.position);

    let by_label = rows.iter().all(|r| {
        r.position_label()
            .is_some_and(|p| targets.iter().any(|t| t.position == p))
    });

    let mut routed: Vec<(Uuid, Vec<(String, Decimal)>)> = Vec::new();
    let mut slot: HashMap<Uuid, usize> = HashMap::new();
    let mut ignored = 0;

    for (i, row) in rows.iter().enumerate() {
        let target = if by_label {
            row.position_label()
                .and_then(|p| targets.iter().find(|t| t.position == p))
        } else {
            targets.get(i)
        };

        let Some(target) = target else {
            ignored += 1;
            continue;
        };

        let idx = *slot.entry(target.id).or_insert_with(|| {
            routed.push((target.id, Vec::new()));
            routed.len() - 1
        });
        routed[idx].1.extend(row.pairs.iter().cloned());
    }

    (routed, ignored)
}

/// Aplica o texto colado aos itens, no array de faixas do modo atual da oferta.
///
/// As faixas importadas substituem as que o item tinha. Totais da oferta ficam por
/// conta de quem chama.
pub fn import_prices(offer: &Offer, items: &mut [LineItem], raw: &str) -> Result<ImportSummary, AppError> {
    let precision = offer.precision()?;
    let rows = parse_rows(raw)?;
    let (routed, rows_ignored) = route_rows(&rows, items);

    let mut summary = ImportSummary {
        rows_ignored,
        ..Default::default()
    };

    for (item_id, pairs) in routed {
        if pairs.is_empty() {
            continue;
        }
        let Some(item) = items.iter_mut().find(|i| i.id == item_id) else {
            continue;
        };

        match offer.pricing_mode() {
            PricingMode::Unit => {
                let limit = match offer.unit_price_column_limit() {
                    0 => usize::MAX,
                    n => n,
                };
                let mut set = TierSet::new();
                for (i, (quantity, price)) in pairs.into_iter().take(limit).enumerate() {
                    set.add_tier(UnitTier::new(quantity, price), i == 0, precision);
                    summary.tiers_imported += 1;
                }
                item.unit_prices = set;
            }
            PricingMode::Quantity => {
                let mut set = TierSet::new();
                for (i, (quantity, price)) in pairs.into_iter().enumerate() {
                    set.add_tier(QuantityTier::new(quantity, price), i == 0, precision);
                    summary.tiers_imported += 1;
                }
                item.quantity_prices = set;
            }
        }
        summary.items_updated.push(item_id);
    }

    if summary.tiers_imported == 0 {
        return Err(AppError::ImportFormat("nenhum par quantidade/preço válido".into()));
    }

    tracing::debug!(
        offer_id = %offer.id,
        items = summary.items_updated.len(),
        tiers = summary.tiers_imported,
        ignored = summary.rows_ignored,
        "preços importados"
    );
    Ok(summary)
}
