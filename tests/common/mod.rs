//! Helpers compartilhados pelos testes de integração: um `OfferStore` em memória
//! e fixtures de oferta/itens.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use offer_backend::{
    common::error::AppError,
    db::OfferStore,
    models::offers::{
        default_tax_rate, LineItem, LineItemSeed, NewOffer, Offer, OfferDetail, OfferStatus,
    },
    pricing::TierSet,
    services::OfferService,
};

#[derive(Default)]
pub struct InMemoryOfferStore {
    offers: Mutex<HashMap<Uuid, OfferDetail>>,
    sequences: Mutex<HashMap<(Uuid, String), i32>>,
    pub commits: AtomicUsize,
    fail_commits: AtomicBool,
}

impl InMemoryOfferStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Faz o próximo `commit` falhar como se o banco tivesse caído.
    pub fn fail_next_commit(&self) {
        self.fail_commits.store(true, Ordering::SeqCst);
    }

    /// Grava direto, sem passar pelo serviço (simula dados antigos no banco).
    pub fn put(&self, detail: OfferDetail) {
        self.offers.lock().unwrap().insert(detail.header.id, detail);
    }

    pub fn stored(&self, offer_id: Uuid) -> Option<OfferDetail> {
        self.offers.lock().unwrap().get(&offer_id).cloned()
    }

    fn not_found(offer_id: Uuid) -> AppError {
        AppError::ResourceNotFound(format!("Oferta {}", offer_id))
    }
}

#[async_trait]
impl OfferStore for InMemoryOfferStore {
    async fn load_offer(&self, tenant_id: Uuid, offer_id: Uuid) -> Result<OfferDetail, AppError> {
        let offers = self.offers.lock().unwrap();
        let mut detail = offers
            .get(&offer_id)
            .filter(|d| d.header.tenant_id == tenant_id)
            .cloned()
            .ok_or_else(|| Self::not_found(offer_id))?;
        detail.sort_by_position();
        Ok(detail)
    }

    async fn save_offer(&self, offer: &Offer) -> Result<(), AppError> {
        let mut offers = self.offers.lock().unwrap();
        let stored = offers.get_mut(&offer.id).ok_or_else(|| Self::not_found(offer.id))?;
        stored.header = offer.clone();
        Ok(())
    }

    async fn save_line_items(&self, _tenant_id: Uuid, items: &[LineItem]) -> Result<(), AppError> {
        let mut offers = self.offers.lock().unwrap();
        for item in items {
            let stored = offers
                .get_mut(&item.offer_id)
                .ok_or_else(|| Self::not_found(item.offer_id))?;
            match stored.line_items.iter_mut().find(|i| i.id == item.id) {
                Some(existing) => *existing = item.clone(),
                None => stored.line_items.push(item.clone()),
            }
        }
        Ok(())
    }

    async fn commit(&self, detail: &OfferDetail) -> Result<(), AppError> {
        if self.fail_commits.swap(false, Ordering::SeqCst) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        let mut offers = self.offers.lock().unwrap();
        if !offers.contains_key(&detail.header.id) {
            return Err(Self::not_found(detail.header.id));
        }
        offers.insert(detail.header.id, detail.clone());
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn insert_offer(&self, detail: &OfferDetail) -> Result<(), AppError> {
        self.offers.lock().unwrap().insert(detail.header.id, detail.clone());
        Ok(())
    }

    async fn replace_line_items(&self, detail: &OfferDetail) -> Result<(), AppError> {
        self.commit(detail).await
    }

    async fn next_offer_sequence(&self, tenant_id: Uuid, at: DateTime<Utc>) -> Result<i32, AppError> {
        let period = format!("{}{:02}", at.year(), at.month());
        let mut sequences = self.sequences.lock().unwrap();
        let value = sequences.entry((tenant_id, period)).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}

pub fn service(store: &Arc<InMemoryOfferStore>) -> OfferService {
    OfferService::new(store.clone(), default_tax_rate())
}

pub fn seed(name: &str, price: Decimal, quantity: &str) -> LineItemSeed {
    LineItemSeed {
        item_name: name.to_string(),
        base_quantity: Some(quantity.to_string()),
        base_price: Some(price),
        ..Default::default()
    }
}

pub fn new_offer(items: Vec<LineItemSeed>, use_unit_prices: bool) -> NewOffer {
    NewOffer {
        customer_snapshot: json!({ "name": "Müller GmbH" }),
        use_unit_prices,
        items,
        ..Default::default()
    }
}

/// Oferta montada à mão, para testes que não passam pelo serviço.
pub fn bare_offer(use_unit_prices: bool) -> Offer {
    let now = Utc::now();
    Offer {
        id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        offer_number: "OF-202610-0001".into(),
        revision: 1,
        previous_offer_number: None,
        status: OfferStatus::Draft,
        customer_id: None,
        inquiry_id: None,
        customer_snapshot: json!({}),
        inquiry_snapshot: json!({}),
        use_unit_prices,
        unit_price_decimal_places: 3,
        total_price_decimal_places: 2,
        max_unit_price_columns: 0,
        default_unit_prices: TierSet::new(),
        discount_percentage: Decimal::ZERO,
        discount_amount: Decimal::ZERO,
        shipping_cost: Decimal::ZERO,
        tax_rate: default_tax_rate(),
        currency: "EUR".into(),
        subtotal: Decimal::ZERO,
        tax_amount: Decimal::ZERO,
        total_amount: Decimal::ZERO,
        document_generated_at: None,
        document_reference: None,
        created_at: now,
        updated_at: now,
    }
}
