// src/services/offer_service.rs

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{error::AppError, numeric::is_non_positive_quantity},
    db::OfferStore,
    models::{
        document::OfferDocumentView,
        offers::{
            CommercialTermsUpdate, LineItem, LineItemInput, LineItemPatch, LineItemSeed, NewOffer,
            Offer, OfferDetail, OfferStatus, PricingConfigUpdate, PricingMode, DEFAULT_CURRENCY,
            DEFAULT_MAX_UNIT_PRICE_COLUMNS, DEFAULT_TOTAL_PRICE_DECIMAL_PLACES,
            DEFAULT_UNIT_PRICE_DECIMAL_PLACES, MAX_UNIT_PRICE_COLUMNS, format_offer_number,
        },
        tiers::{QuantityTier, TierInput, TierRef, TierUpdate, UnitTier},
    },
    pricing::{
        bulk_import::{self, ImportSummary},
        calculate_totals, mode_migrator, revision,
        tier_set::{TierPrecision, TierSet},
        totals::TotalsOutcome,
    },
};

#[derive(Clone)]
pub struct OfferService {
    store: Arc<dyn OfferStore>,
    default_tax_rate: Decimal,
}

// Componentes apontam para o último cabeçalho de montagem que veio antes deles.
fn link_components(items: &mut [LineItem]) {
    let mut current_parent: Option<Uuid> = None;
    for item in items.iter_mut() {
        if item.is_component {
            item.parent_item_id = current_parent;
        } else {
            item.parent_item_id = None;
            current_parent = item.is_assembly_item.then_some(item.id);
        }
    }
}

fn ensure_unlocked(offer: &Offer) -> Result<(), AppError> {
    if offer.is_locked() {
        Err(AppError::OfferLocked(offer.offer_number.clone()))
    } else {
        Ok(())
    }
}

fn recalculate_in_place(detail: &mut OfferDetail) -> Result<TotalsOutcome, AppError> {
    let outcome = calculate_totals(&detail.header, &mut detail.line_items)?;
    detail.header.apply_totals(&outcome.totals);
    Ok(outcome)
}

fn non_negative(field: &str, value: Decimal) -> Result<Decimal, AppError> {
    if value < Decimal::ZERO {
        Err(AppError::invalid_field(field, "não pode ser negativo"))
    } else {
        Ok(value)
    }
}

// Quantidade obrigatória; se começar por número, ele tem que ser maior que zero.
fn tier_quantity(raw: &str) -> Result<(), AppError> {
    if raw.trim().is_empty() {
        return Err(AppError::invalid_field("quantity", "required"));
    }
    if is_non_positive_quantity(raw) {
        return Err(AppError::invalid_field("quantity", "tem que ser maior que zero"));
    }
    Ok(())
}

impl OfferService {
    pub fn new(store: Arc<dyn OfferStore>, default_tax_rate: Decimal) -> Self {
        Self {
            store,
            default_tax_rate,
        }
    }

    /// Carrega, aplica a alteração, recalcula e grava tudo numa transação.
    async fn mutate<F, R>(
        &self,
        tenant_id: Uuid,
        offer_id: Uuid,
        operation: &'static str,
        apply: F,
    ) -> Result<(OfferDetail, R), AppError>
    where
        F: FnOnce(&mut OfferDetail) -> Result<R, AppError> + Send,
        R: Send,
    {
        let mut detail = self.store.load_offer(tenant_id, offer_id).await?;
        ensure_unlocked(&detail.header)?;

        let result = apply(&mut detail)?;
        let outcome = recalculate_in_place(&mut detail)?;

        self.store.commit(&detail).await?;

        tracing::info!(
            offer_id = %offer_id,
            operation,
            changed_items = outcome.changed_items.len(),
            total = %detail.header.total_amount,
            "oferta atualizada"
        );
        Ok((detail, result))
    }

    // =========================================================================
    //  1. CRIAÇÃO E LEITURA
    // =========================================================================

    /// Cria a oferta a partir da consulta. Um item por pedido, ou cabeçalho de
    /// montagem seguido dos componentes; posições 1..N na ordem recebida.
    pub async fn create_offer(&self, tenant_id: Uuid, new_offer: NewOffer) -> Result<OfferDetail, AppError> {
        if new_offer.items.is_empty() {
            return Err(AppError::invalid_field("items", "a oferta precisa de pelo menos um item"));
        }
        if let Some(i) = new_offer.items.iter().position(|s| s.item_name.trim().is_empty()) {
            return Err(AppError::invalid_field(format!("items[{}].itemName", i), "required"));
        }

        let now = Utc::now();
        let sequence = self.store.next_offer_sequence(tenant_id, now).await?;

        let mut header = Offer {
            id: Uuid::new_v4(),
            tenant_id,
            offer_number: format_offer_number(now, sequence),
            revision: 1,
            previous_offer_number: None,
            status: OfferStatus::Draft,
            customer_id: new_offer.customer_id,
            inquiry_id: new_offer.inquiry_id,
            customer_snapshot: new_offer.customer_snapshot,
            inquiry_snapshot: new_offer.inquiry_snapshot,
            use_unit_prices: false,
            unit_price_decimal_places: DEFAULT_UNIT_PRICE_DECIMAL_PLACES,
            total_price_decimal_places: DEFAULT_TOTAL_PRICE_DECIMAL_PLACES,
            max_unit_price_columns: DEFAULT_MAX_UNIT_PRICE_COLUMNS,
            default_unit_prices: TierSet::new(),
            discount_percentage: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            shipping_cost: Decimal::ZERO,
            tax_rate: self.default_tax_rate,
            currency: new_offer
                .currency
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            document_generated_at: None,
            document_reference: None,
            created_at: now,
            updated_at: now,
        };

        let mut items: Vec<LineItem> = new_offer
            .items
            .into_iter()
            .enumerate()
            .map(|(i, seed)| LineItem::from_seed(header.id, i as i32 + 1, seed))
            .collect();
        link_components(&mut items);

        if new_offer.use_unit_prices {
            mode_migrator::apply_mode(&mut header, &mut items, true)?;
        }

        let mut detail = OfferDetail {
            header,
            line_items: items,
        };
        recalculate_in_place(&mut detail)?;

        self.store.insert_offer(&detail).await?;

        tracing::info!(
            offer_id = %detail.header.id,
            offer_number = %detail.header.offer_number,
            items = detail.line_items.len(),
            "oferta criada"
        );
        Ok(detail)
    }

    /// Leitura com reparo em memória (faixa ativa, totais). Nada é gravado aqui.
    pub async fn get_offer(&self, tenant_id: Uuid, offer_id: Uuid) -> Result<OfferDetail, AppError> {
        let mut detail = self.store.load_offer(tenant_id, offer_id).await?;
        let outcome = recalculate_in_place(&mut detail)?;
        if !outcome.changed_items.is_empty() {
            tracing::debug!(
                offer_id = %offer_id,
                items = outcome.changed_items.len(),
                "itens reparados na leitura (não gravados)"
            );
        }
        Ok(detail)
    }

    pub async fn recalculate(&self, tenant_id: Uuid, offer_id: Uuid) -> Result<OfferDetail, AppError> {
        let (detail, _) = self.mutate(tenant_id, offer_id, "recalculate", |_| Ok(())).await?;
        Ok(detail)
    }

    // =========================================================================
    //  2. CONFIGURAÇÃO E TERMOS COMERCIAIS
    // =========================================================================

    /// Muda casas decimais / colunas / modelo. Todas as faixas são recalculadas na
    /// precisão nova, e faixas unitárias acima do limite de colunas são cortadas.
    pub async fn update_pricing_config(
        &self,
        tenant_id: Uuid,
        offer_id: Uuid,
        update: PricingConfigUpdate,
    ) -> Result<OfferDetail, AppError> {
        let (detail, _) = self
            .mutate(tenant_id, offer_id, "update_pricing_config", move |detail| {
                let offer = &mut detail.header;
                let unit_dp = update.unit_price_decimal_places.unwrap_or(offer.unit_price_decimal_places);
                let total_dp = update.total_price_decimal_places.unwrap_or(offer.total_price_decimal_places);
                let precision = TierPrecision::new(unit_dp, total_dp)?;

                let columns = update.max_unit_price_columns.unwrap_or(offer.max_unit_price_columns);
                if !(0..=MAX_UNIT_PRICE_COLUMNS).contains(&columns) {
                    return Err(AppError::OutOfRange(format!(
                        "maxUnitPriceColumns = {} (permitido 0..={})",
                        columns, MAX_UNIT_PRICE_COLUMNS
                    )));
                }

                offer.unit_price_decimal_places = unit_dp;
                offer.total_price_decimal_places = total_dp;
                offer.max_unit_price_columns = columns;
                let limit = offer.unit_price_column_limit();

                offer.default_unit_prices = match update.default_unit_prices {
                    Some(template) => mode_migrator::normalize_template(template, limit, precision),
                    None => {
                        let mut current = std::mem::take(&mut offer.default_unit_prices);
                        current.truncate(limit);
                        current.recompute_totals(precision);
                        current
                    }
                };

                for item in detail.line_items.iter_mut() {
                    item.unit_prices.truncate(limit);
                }
                Ok(())
            })
            .await?;
        Ok(detail)
    }

    pub async fn update_commercial_terms(
        &self,
        tenant_id: Uuid,
        offer_id: Uuid,
        terms: CommercialTermsUpdate,
    ) -> Result<OfferDetail, AppError> {
        let (detail, _) = self
            .mutate(tenant_id, offer_id, "update_commercial_terms", move |detail| {
                let offer = &mut detail.header;

                if let Some(pct) = terms.discount_percentage {
                    if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
                        return Err(AppError::invalid_field("discountPercentage", "entre 0 e 100"));
                    }
                    offer.discount_percentage = pct;
                }
                if let Some(amount) = terms.discount_amount {
                    offer.discount_amount = non_negative("discountAmount", amount)?;
                }
                if let Some(shipping) = terms.shipping_cost {
                    offer.shipping_cost = non_negative("shippingCost", shipping)?;
                }
                if let Some(rate) = terms.tax_rate {
                    if rate < Decimal::ZERO || rate > Decimal::ONE {
                        return Err(AppError::invalid_field("taxRate", "fração entre 0 e 1 (0.19 = 19%)"));
                    }
                    offer.tax_rate = rate;
                }
                if let Some(currency) = terms.currency {
                    offer.currency = currency.to_uppercase();
                }
                Ok(())
            })
            .await?;
        Ok(detail)
    }

    // =========================================================================
    //  3. ITENS
    // =========================================================================

    /// Substitui a lista inteira de itens. Posições são renumeradas 1..N.
    pub async fn replace_line_items(
        &self,
        tenant_id: Uuid,
        offer_id: Uuid,
        inputs: Vec<LineItemInput>,
    ) -> Result<OfferDetail, AppError> {
        let mut detail = self.store.load_offer(tenant_id, offer_id).await?;
        ensure_unlocked(&detail.header)?;
        let precision = detail.header.precision()?;

        let mut items = Vec::with_capacity(inputs.len());
        for (i, input) in inputs.into_iter().enumerate() {
            if input.item_name.trim().is_empty() {
                return Err(AppError::invalid_field(format!("items[{}].itemName", i), "required"));
            }
            let mut item = LineItem::from_seed(
                offer_id,
                i as i32 + 1,
                LineItemSeed {
                    item_name: input.item_name,
                    description: input.description,
                    base_quantity: input.base_quantity,
                    base_price: input.base_price,
                    is_component: input.is_component,
                    is_assembly_item: input.is_assembly_item,
                },
            );
            item.notes = input.notes;
            item.quantity_prices = TierSet::from_unsorted(input.quantity_prices, precision);
            item.unit_prices = TierSet::from_unsorted(input.unit_prices, precision);
            items.push(item);
        }
        link_components(&mut items);

        detail.line_items = items;
        recalculate_in_place(&mut detail)?;
        self.store.replace_line_items(&detail).await?;

        tracing::info!(offer_id = %offer_id, items = detail.line_items.len(), "itens substituídos");
        Ok(detail)
    }

    /// Edita textos e o preço base. Faixas não são tocadas.
    pub async fn update_line_item(
        &self,
        tenant_id: Uuid,
        offer_id: Uuid,
        item_id: Uuid,
        patch: LineItemPatch,
    ) -> Result<OfferDetail, AppError> {
        let (detail, _) = self
            .mutate(tenant_id, offer_id, "update_line_item", move |detail| {
                let item = detail.find_item_mut(item_id)?;
                if let Some(name) = patch.item_name {
                    if name.trim().is_empty() {
                        return Err(AppError::invalid_field("itemName", "required"));
                    }
                    item.item_name = name;
                }
                if patch.description.is_some() {
                    item.description = patch.description;
                }
                if patch.notes.is_some() {
                    item.notes = patch.notes;
                }
                if let Some(price) = patch.base_price {
                    item.base_price = Some(non_negative("basePrice", price)?);
                }
                if patch.base_quantity.is_some() {
                    item.base_quantity = patch.base_quantity;
                }
                item.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        Ok(detail)
    }

    // =========================================================================
    //  4. FAIXAS DE PREÇO
    // =========================================================================

    pub async fn add_tier(
        &self,
        tenant_id: Uuid,
        offer_id: Uuid,
        item_id: Uuid,
        input: TierInput,
    ) -> Result<OfferDetail, AppError> {
        let (detail, _) = self
            .mutate(tenant_id, offer_id, "add_tier", move |detail| {
                detail.header.ensure_mode(input.kind)?;
                tier_quantity(&input.quantity)?;
                let price = non_negative("price", input.price)?;
                let precision = detail.header.precision()?;
                let limit = detail.header.unit_price_column_limit();

                let item = detail.find_item_mut(item_id)?;
                match input.kind {
                    PricingMode::Unit => {
                        if limit > 0 && item.unit_prices.len() >= limit {
                            return Err(AppError::OutOfRange(format!(
                                "máximo de {} colunas de preço unitário",
                                limit
                            )));
                        }
                        item.unit_prices
                            .add_tier(UnitTier::new(input.quantity, price), input.activate, precision);
                    }
                    PricingMode::Quantity => {
                        item.quantity_prices
                            .add_tier(QuantityTier::new(input.quantity, price), input.activate, precision);
                    }
                }
                item.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        Ok(detail)
    }

    /// Troca quantidade e preço de uma faixa (os dois são obrigatórios).
    pub async fn update_tier(
        &self,
        tenant_id: Uuid,
        offer_id: Uuid,
        item_id: Uuid,
        index: usize,
        update: TierUpdate,
    ) -> Result<OfferDetail, AppError> {
        let quantity = update
            .quantity
            .ok_or_else(|| AppError::invalid_field("quantity", "required"))?;
        tier_quantity(&quantity)?;
        let price = update
            .price
            .ok_or_else(|| AppError::invalid_field("price", "required"))?;
        let price = non_negative("price", price)?;

        let (detail, _) = self
            .mutate(tenant_id, offer_id, "update_tier", move |detail| {
                let precision = detail.header.precision()?;
                let mode = detail.header.pricing_mode();
                let item = detail.find_item_mut(item_id)?;
                match mode {
                    PricingMode::Unit => item.unit_prices.update_tier(index, quantity, price, precision)?,
                    PricingMode::Quantity => {
                        item.quantity_prices.update_tier(index, quantity, price, precision)?
                    }
                };
                item.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        Ok(detail)
    }

    pub async fn delete_tier(
        &self,
        tenant_id: Uuid,
        offer_id: Uuid,
        item_id: Uuid,
        tier: TierRef,
    ) -> Result<OfferDetail, AppError> {
        let (detail, _) = self
            .mutate(tenant_id, offer_id, "delete_tier", move |detail| {
                let mode = detail.header.pricing_mode();
                let item = detail.find_item_mut(item_id)?;
                match (mode, tier) {
                    (PricingMode::Unit, TierRef::Id(id)) => {
                        let index = item
                            .unit_prices
                            .iter()
                            .position(|t| t.id == id)
                            .ok_or_else(|| AppError::ResourceNotFound(format!("Faixa {}", id)))?;
                        item.unit_prices.delete_at(index)?;
                    }
                    (PricingMode::Unit, TierRef::Index(index)) => {
                        item.unit_prices.delete_at(index)?;
                    }
                    (PricingMode::Quantity, TierRef::Index(index)) => {
                        item.quantity_prices.delete_at(index)?;
                    }
                    (PricingMode::Quantity, TierRef::Id(_)) => {
                        return Err(AppError::invalid_field(
                            "tier",
                            "faixas por quantidade são endereçadas pela posição",
                        ));
                    }
                }
                item.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        Ok(detail)
    }

    pub async fn set_active_tier(
        &self,
        tenant_id: Uuid,
        offer_id: Uuid,
        item_id: Uuid,
        index: usize,
    ) -> Result<OfferDetail, AppError> {
        let (detail, _) = self
            .mutate(tenant_id, offer_id, "set_active_tier", move |detail| {
                let mode = detail.header.pricing_mode();
                let item = detail.find_item_mut(item_id)?;
                match mode {
                    PricingMode::Unit => item.unit_prices.set_active(index)?,
                    PricingMode::Quantity => item.quantity_prices.set_active(index)?,
                }
                item.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        Ok(detail)
    }

    // =========================================================================
    //  5. MODO DE PREÇO E IMPORTAÇÃO
    // =========================================================================

    pub async fn toggle_mode(
        &self,
        tenant_id: Uuid,
        offer_id: Uuid,
        use_unit_prices: bool,
    ) -> Result<OfferDetail, AppError> {
        let (detail, _) = self
            .mutate(tenant_id, offer_id, "toggle_mode", move |detail| {
                mode_migrator::apply_mode(&mut detail.header, &mut detail.line_items, use_unit_prices)
            })
            .await?;
        Ok(detail)
    }

    /// Copia o modelo padrão da oferta para todos os itens (só no modo unitário).
    pub async fn sync_default_unit_prices(&self, tenant_id: Uuid, offer_id: Uuid) -> Result<OfferDetail, AppError> {
        let (detail, _) = self
            .mutate(tenant_id, offer_id, "sync_default_unit_prices", |detail| {
                detail.header.ensure_mode(PricingMode::Unit)?;
                mode_migrator::sync_default_unit_prices(&detail.header, &mut detail.line_items)
            })
            .await?;
        Ok(detail)
    }

    pub async fn bulk_import(
        &self,
        tenant_id: Uuid,
        offer_id: Uuid,
        raw_text: String,
    ) -> Result<(OfferDetail, ImportSummary), AppError> {
        self.mutate(tenant_id, offer_id, "bulk_import", move |detail| {
            bulk_import::import_prices(&detail.header, &mut detail.line_items, &raw_text)
        })
        .await
    }

    // =========================================================================
    //  6. REVISÃO, STATUS E DOCUMENTO
    // =========================================================================

    /// Nova revisão. Funciona também em ofertas aceitas: é assim que elas mudam.
    pub async fn create_revision(&self, tenant_id: Uuid, offer_id: Uuid) -> Result<OfferDetail, AppError> {
        let source = self.store.load_offer(tenant_id, offer_id).await?;
        let now = Utc::now();
        let sequence = self.store.next_offer_sequence(tenant_id, now).await?;

        let detail = revision::create_revision(&source, sequence, now);
        self.store.insert_offer(&detail).await?;

        tracing::info!(
            offer_id = %detail.header.id,
            source_offer_id = %offer_id,
            revision = detail.header.revision,
            "revisão criada"
        );
        Ok(detail)
    }

    pub async fn transition_status(
        &self,
        tenant_id: Uuid,
        offer_id: Uuid,
        next: OfferStatus,
    ) -> Result<OfferDetail, AppError> {
        let mut detail = self.store.load_offer(tenant_id, offer_id).await?;
        let current = detail.header.status;
        if !current.can_transition_to(next) {
            return Err(AppError::InvalidStatusTransition {
                from: current,
                to: next,
            });
        }

        // Totais precisam estar em dia antes de a oferta possivelmente travar
        detail.header.status = next;
        recalculate_in_place(&mut detail)?;
        self.store.commit(&detail).await?;

        tracing::info!(offer_id = %offer_id, from = %current, to = %next, "status da oferta alterado");
        Ok(detail)
    }

    pub async fn document_view(&self, tenant_id: Uuid, offer_id: Uuid) -> Result<OfferDocumentView, AppError> {
        let mut detail = self.store.load_offer(tenant_id, offer_id).await?;
        let outcome = recalculate_in_place(&mut detail)?;
        Ok(OfferDocumentView::build(&detail, outcome.totals))
    }

    pub async fn record_generated_document(
        &self,
        tenant_id: Uuid,
        offer_id: Uuid,
        reference: String,
    ) -> Result<Offer, AppError> {
        if reference.trim().is_empty() {
            return Err(AppError::invalid_field("documentReference", "required"));
        }
        let mut detail = self.store.load_offer(tenant_id, offer_id).await?;
        let now = Utc::now();
        detail.header.document_generated_at = Some(now);
        detail.header.document_reference = Some(reference);
        detail.header.updated_at = now;
        self.store.save_offer(&detail.header).await?;

        tracing::info!(offer_id = %offer_id, "documento registrado");
        Ok(detail.header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::totals::tests::base_item;
    use rust_decimal_macros::dec;

    #[test]
    fn components_follow_the_last_assembly_header() {
        let offer_id = Uuid::new_v4();
        let mut assembly = base_item(offer_id, 1, dec!(10), "1");
        assembly.is_assembly_item = true;
        let mut c1 = base_item(offer_id, 2, dec!(1), "1");
        c1.is_component = true;
        let single = base_item(offer_id, 3, dec!(5), "1");
        let mut orphan = base_item(offer_id, 4, dec!(1), "1");
        orphan.is_component = true;
        let mut items = vec![assembly, c1, single, orphan];

        link_components(&mut items);
        assert_eq!(items[1].parent_item_id, Some(items[0].id));
        assert_eq!(items[2].parent_item_id, None);
        assert_eq!(items[3].parent_item_id, None);
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(non_negative("shippingCost", dec!(-1)).is_err());
        assert_eq!(non_negative("shippingCost", dec!(0)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn tier_quantity_must_be_positive() {
        assert!(tier_quantity("1000 pcs").is_ok());
        assert!(tier_quantity("auf Anfrage").is_ok());
        for bad in ["", "  ", "-1000", "0", "0 Stück"] {
            assert!(
                matches!(tier_quantity(bad), Err(AppError::InvalidField { ref field, .. }) if field == "quantity"),
                "{bad:?} deveria ser recusado"
            );
        }
    }
}
