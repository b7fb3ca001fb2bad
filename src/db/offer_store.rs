// src/db/offer_store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::offers::{LineItem, Offer, OfferDetail},
};

/// Persistência de ofertas. O serviço recebe isto injetado (`Arc<dyn OfferStore>`)
/// e nunca fala com o banco por outro caminho.
#[async_trait]
pub trait OfferStore: Send + Sync {
    /// Oferta + itens ordenados por `position`. `ResourceNotFound` se não existir no tenant.
    async fn load_offer(&self, tenant_id: Uuid, offer_id: Uuid) -> Result<OfferDetail, AppError>;

    async fn save_offer(&self, offer: &Offer) -> Result<(), AppError>;

    async fn save_line_items(&self, tenant_id: Uuid, items: &[LineItem]) -> Result<(), AppError>;

    /// Cabeçalho e itens juntos. Implementações com transação devem sobrescrever.
    async fn commit(&self, detail: &OfferDetail) -> Result<(), AppError> {
        self.save_offer(&detail.header).await?;
        self.save_line_items(detail.header.tenant_id, &detail.line_items).await
    }

    async fn insert_offer(&self, detail: &OfferDetail) -> Result<(), AppError>;

    /// Troca a lista inteira de itens (e salva o cabeçalho com os novos totais).
    async fn replace_line_items(&self, detail: &OfferDetail) -> Result<(), AppError>;

    /// Próximo número da sequência mensal do tenant (1, 2, ...).
    async fn next_offer_sequence(&self, tenant_id: Uuid, at: DateTime<Utc>) -> Result<i32, AppError>;
}
