// src/db/offers_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{Executor, FromRow, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_tenant_tx, error::AppError},
    db::{
        offer_store::OfferStore,
        tier_json::{quantity_tiers_from_json, tiers_to_json, unit_tiers_from_json},
    },
    models::offers::{LineItem, Offer, OfferDetail, OfferStatus},
};

// =========================================================================
//  LINHAS DO BANCO (convertidas para os modelos na fronteira)
// =========================================================================

#[derive(Debug, FromRow)]
struct OfferRow {
    id: Uuid,
    tenant_id: Uuid,
    offer_number: String,
    revision: i32,
    previous_offer_number: Option<String>,
    status: OfferStatus,
    customer_id: Option<Uuid>,
    inquiry_id: Option<Uuid>,
    customer_snapshot: Value,
    inquiry_snapshot: Value,
    use_unit_prices: bool,
    unit_price_decimal_places: i32,
    total_price_decimal_places: i32,
    max_unit_price_columns: i32,
    default_unit_prices: Value,
    discount_percentage: Option<Decimal>,
    discount_amount: Option<Decimal>,
    shipping_cost: Option<Decimal>,
    tax_rate: Option<Decimal>,
    currency: String,
    subtotal: Option<Decimal>,
    tax_amount: Option<Decimal>,
    total_amount: Option<Decimal>,
    document_generated_at: Option<DateTime<Utc>>,
    document_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OfferRow> for Offer {
    // Colunas numéricas nulas em linhas antigas viram 0
    fn from(row: OfferRow) -> Self {
        Offer {
            id: row.id,
            tenant_id: row.tenant_id,
            offer_number: row.offer_number,
            revision: row.revision,
            previous_offer_number: row.previous_offer_number,
            status: row.status,
            customer_id: row.customer_id,
            inquiry_id: row.inquiry_id,
            customer_snapshot: row.customer_snapshot,
            inquiry_snapshot: row.inquiry_snapshot,
            use_unit_prices: row.use_unit_prices,
            unit_price_decimal_places: row.unit_price_decimal_places,
            total_price_decimal_places: row.total_price_decimal_places,
            max_unit_price_columns: row.max_unit_price_columns,
            default_unit_prices: unit_tiers_from_json(&row.default_unit_prices),
            discount_percentage: row.discount_percentage.unwrap_or_default(),
            discount_amount: row.discount_amount.unwrap_or_default(),
            shipping_cost: row.shipping_cost.unwrap_or_default(),
            tax_rate: row.tax_rate.unwrap_or_default(),
            currency: row.currency,
            subtotal: row.subtotal.unwrap_or_default(),
            tax_amount: row.tax_amount.unwrap_or_default(),
            total_amount: row.total_amount.unwrap_or_default(),
            document_generated_at: row.document_generated_at,
            document_reference: row.document_reference,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct LineItemRow {
    id: Uuid,
    offer_id: Uuid,
    position: i32,
    item_name: String,
    description: Option<String>,
    notes: Option<String>,
    is_component: bool,
    is_assembly_item: bool,
    parent_item_id: Option<Uuid>,
    base_price: Option<Decimal>,
    base_quantity: Option<String>,
    quantity_prices: Value,
    unit_prices: Value,
    line_total: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LineItemRow> for LineItem {
    fn from(row: LineItemRow) -> Self {
        LineItem {
            id: row.id,
            offer_id: row.offer_id,
            position: row.position,
            item_name: row.item_name,
            description: row.description,
            notes: row.notes,
            is_component: row.is_component,
            is_assembly_item: row.is_assembly_item,
            parent_item_id: row.parent_item_id,
            base_price: row.base_price,
            base_quantity: row.base_quantity,
            quantity_prices: quantity_tiers_from_json(&row.quantity_prices),
            unit_prices: unit_tiers_from_json(&row.unit_prices),
            line_total: row.line_total.unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const OFFER_COLUMNS: &str = r#"
    id, tenant_id, offer_number, revision, previous_offer_number, status,
    customer_id, inquiry_id, customer_snapshot, inquiry_snapshot,
    use_unit_prices, unit_price_decimal_places, total_price_decimal_places,
    max_unit_price_columns, default_unit_prices,
    discount_percentage, discount_amount, shipping_cost, tax_rate, currency,
    subtotal, tax_amount, total_amount,
    document_generated_at, document_reference, created_at, updated_at
"#;

const LINE_ITEM_COLUMNS: &str = r#"
    id, offer_id, position, item_name, description, notes,
    is_component, is_assembly_item, parent_item_id,
    base_price, base_quantity, quantity_prices, unit_prices, line_total,
    created_at, updated_at
"#;

// =========================================================================
//  REPOSITÓRIO POSTGRES
// =========================================================================

#[derive(Clone)]
pub struct OfferRepository {
    pool: PgPool,
}

impl OfferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_offer<'e, E>(&self, executor: E, tenant_id: Uuid, offer_id: Uuid) -> Result<Offer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {} FROM offers WHERE id = $1 AND tenant_id = $2",
            OFFER_COLUMNS
        );
        let row = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(offer_id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Oferta {}", offer_id)))?;

        Ok(row.into())
    }

    async fn fetch_line_items<'e, E>(&self, executor: E, offer_id: Uuid) -> Result<Vec<LineItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {} FROM offer_line_items WHERE offer_id = $1 ORDER BY position ASC",
            LINE_ITEM_COLUMNS
        );
        let rows = sqlx::query_as::<_, LineItemRow>(&sql)
            .bind(offer_id)
            .fetch_all(executor)
            .await?;

        Ok(rows.into_iter().map(LineItem::from).collect())
    }

    async fn write_offer<'e, E>(&self, executor: E, offer: &Offer) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE offers SET
                status = $3,
                use_unit_prices = $4,
                unit_price_decimal_places = $5,
                total_price_decimal_places = $6,
                max_unit_price_columns = $7,
                default_unit_prices = $8,
                discount_percentage = $9,
                discount_amount = $10,
                shipping_cost = $11,
                tax_rate = $12,
                currency = $13,
                subtotal = $14,
                tax_amount = $15,
                total_amount = $16,
                document_generated_at = $17,
                document_reference = $18,
                updated_at = $19
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(offer.id)
        .bind(offer.tenant_id)
        .bind(offer.status)
        .bind(offer.use_unit_prices)
        .bind(offer.unit_price_decimal_places)
        .bind(offer.total_price_decimal_places)
        .bind(offer.max_unit_price_columns)
        .bind(tiers_to_json(&offer.default_unit_prices)?)
        .bind(offer.discount_percentage)
        .bind(offer.discount_amount)
        .bind(offer.shipping_cost)
        .bind(offer.tax_rate)
        .bind(&offer.currency)
        .bind(offer.subtotal)
        .bind(offer.tax_amount)
        .bind(offer.total_amount)
        .bind(offer.document_generated_at)
        .bind(&offer.document_reference)
        .bind(offer.updated_at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ResourceNotFound(format!("Oferta {}", offer.id)));
        }
        Ok(())
    }

    async fn create_offer_row<'e, E>(&self, executor: E, offer: &Offer) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO offers (
                id, tenant_id, offer_number, revision, previous_offer_number, status,
                customer_id, inquiry_id, customer_snapshot, inquiry_snapshot,
                use_unit_prices, unit_price_decimal_places, total_price_decimal_places,
                max_unit_price_columns, default_unit_prices,
                discount_percentage, discount_amount, shipping_cost, tax_rate, currency,
                subtotal, tax_amount, total_amount,
                document_generated_at, document_reference, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27)
            "#,
        )
        .bind(offer.id)
        .bind(offer.tenant_id)
        .bind(&offer.offer_number)
        .bind(offer.revision)
        .bind(&offer.previous_offer_number)
        .bind(offer.status)
        .bind(offer.customer_id)
        .bind(offer.inquiry_id)
        .bind(&offer.customer_snapshot)
        .bind(&offer.inquiry_snapshot)
        .bind(offer.use_unit_prices)
        .bind(offer.unit_price_decimal_places)
        .bind(offer.total_price_decimal_places)
        .bind(offer.max_unit_price_columns)
        .bind(tiers_to_json(&offer.default_unit_prices)?)
        .bind(offer.discount_percentage)
        .bind(offer.discount_amount)
        .bind(offer.shipping_cost)
        .bind(offer.tax_rate)
        .bind(&offer.currency)
        .bind(offer.subtotal)
        .bind(offer.tax_amount)
        .bind(offer.total_amount)
        .bind(offer.document_generated_at)
        .bind(&offer.document_reference)
        .bind(offer.created_at)
        .bind(offer.updated_at)
        .execute(executor)
        .await
        .map_err(|e| {
            // Número de oferta duplicado = corrida na sequência
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::InternalServerError(anyhow::anyhow!(
                        "número de oferta {} já existe",
                        offer.offer_number
                    ));
                }
            }
            e.into()
        })?;

        Ok(())
    }

    /// Upsert de um item; `offer_id` + `position` são únicos no banco.
    async fn upsert_line_item<'e, E>(&self, executor: E, item: &LineItem) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO offer_line_items (
                id, offer_id, position, item_name, description, notes,
                is_component, is_assembly_item, parent_item_id,
                base_price, base_quantity, quantity_prices, unit_prices, line_total,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (id) DO UPDATE SET
                position = EXCLUDED.position,
                item_name = EXCLUDED.item_name,
                description = EXCLUDED.description,
                notes = EXCLUDED.notes,
                is_component = EXCLUDED.is_component,
                is_assembly_item = EXCLUDED.is_assembly_item,
                parent_item_id = EXCLUDED.parent_item_id,
                base_price = EXCLUDED.base_price,
                base_quantity = EXCLUDED.base_quantity,
                quantity_prices = EXCLUDED.quantity_prices,
                unit_prices = EXCLUDED.unit_prices,
                line_total = EXCLUDED.line_total,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(item.id)
        .bind(item.offer_id)
        .bind(item.position)
        .bind(&item.item_name)
        .bind(&item.description)
        .bind(&item.notes)
        .bind(item.is_component)
        .bind(item.is_assembly_item)
        .bind(item.parent_item_id)
        .bind(item.base_price)
        .bind(&item.base_quantity)
        .bind(tiers_to_json(&item.quantity_prices)?)
        .bind(tiers_to_json(&item.unit_prices)?)
        .bind(item.line_total)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl OfferStore for OfferRepository {
    async fn load_offer(&self, tenant_id: Uuid, offer_id: Uuid) -> Result<OfferDetail, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id).await?;
        let header = self.fetch_offer(&mut *tx, tenant_id, offer_id).await?;
        let line_items = self.fetch_line_items(&mut *tx, offer_id).await?;
        tx.commit().await?;

        Ok(OfferDetail { header, line_items })
    }

    async fn save_offer(&self, offer: &Offer) -> Result<(), AppError> {
        let mut tx = begin_tenant_tx(&self.pool, offer.tenant_id).await?;
        self.write_offer(&mut *tx, offer).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_line_items(&self, tenant_id: Uuid, items: &[LineItem]) -> Result<(), AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id).await?;
        for item in items {
            self.upsert_line_item(&mut *tx, item).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    // Uma transação só: ou grava cabeçalho e itens, ou nada
    async fn commit(&self, detail: &OfferDetail) -> Result<(), AppError> {
        let mut tx = begin_tenant_tx(&self.pool, detail.header.tenant_id).await?;
        self.write_offer(&mut *tx, &detail.header).await?;
        for item in &detail.line_items {
            self.upsert_line_item(&mut *tx, item).await?;
        }
        tx.commit().await?;

        tracing::debug!(offer_id = %detail.header.id, items = detail.line_items.len(), "oferta gravada");
        Ok(())
    }

    async fn insert_offer(&self, detail: &OfferDetail) -> Result<(), AppError> {
        let mut tx = begin_tenant_tx(&self.pool, detail.header.tenant_id).await?;
        self.create_offer_row(&mut *tx, &detail.header).await?;
        for item in &detail.line_items {
            self.upsert_line_item(&mut *tx, item).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn replace_line_items(&self, detail: &OfferDetail) -> Result<(), AppError> {
        let mut tx = begin_tenant_tx(&self.pool, detail.header.tenant_id).await?;
        self.write_offer(&mut *tx, &detail.header).await?;

        sqlx::query("DELETE FROM offer_line_items WHERE offer_id = $1")
            .bind(detail.header.id)
            .execute(&mut *tx)
            .await?;

        for item in &detail.line_items {
            self.upsert_line_item(&mut *tx, item).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn next_offer_sequence(&self, tenant_id: Uuid, at: DateTime<Utc>) -> Result<i32, AppError> {
        let period = format!("{}{:02}", at.year(), at.month());
        let mut tx = begin_tenant_tx(&self.pool, tenant_id).await?;

        let (value,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO offer_sequences (tenant_id, period, last_value)
            VALUES ($1, $2, 1)
            ON CONFLICT (tenant_id, period)
            DO UPDATE SET last_value = offer_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(tenant_id)
        .bind(&period)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(value)
    }
}
