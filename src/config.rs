// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::OfferRepository,
    models::offers::default_tax_rate,
    services::OfferService,
};

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub default_tax_rate: Decimal,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let db_max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("DB_MAX_CONNECTIONS inválido: {}", raw))?,
            Err(_) => 5,
        };

        // Fração: 0.19 = 19%
        let default_tax_rate = match env::var("DEFAULT_TAX_RATE") {
            Ok(raw) => Decimal::from_str(raw.trim())
                .with_context(|| format!("DEFAULT_TAX_RATE inválido: {}", raw))?,
            Err(_) => default_tax_rate(),
        };
        if default_tax_rate < Decimal::ZERO || default_tax_rate > Decimal::ONE {
            anyhow::bail!("DEFAULT_TAX_RATE deve ser uma fração entre 0 e 1");
        }

        Ok(Self {
            database_url,
            bind_addr,
            db_max_connections,
            default_tax_rate,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub offer_service: OfferService,
    pub i18n_store: Arc<I18nStore>,
    pub config: AppConfig,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let offer_repo = OfferRepository::new(db_pool.clone());
        let offer_service = OfferService::new(Arc::new(offer_repo), config.default_tax_rate);

        Ok(Self {
            db_pool,
            offer_service,
            i18n_store: Arc::new(I18nStore::new()),
            config,
        })
    }
}
