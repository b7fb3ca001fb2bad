// src/main.rs

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use offer_backend::{
    config::{AppConfig, AppState},
    docs::ApiDoc,
    handlers,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = AppConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config).await?;

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Todas as rotas exigem o cabeçalho x-tenant-id (extrator TenantContext)
    let offer_routes = Router::new()
        .route("/", post(handlers::offers::create_offer))
        .route("/{id}", get(handlers::offers::get_offer))
        .route("/{id}/recalculate", post(handlers::offers::recalculate))
        .route(
            "/{id}/pricing-config",
            patch(handlers::offers::update_pricing_config),
        )
        .route(
            "/{id}/commercial-terms",
            patch(handlers::offers::update_commercial_terms),
        )
        .route("/{id}/pricing-mode", put(handlers::offers::toggle_pricing_mode))
        .route(
            "/{id}/default-unit-prices/sync",
            post(handlers::offers::sync_default_unit_prices),
        )
        .route("/{id}/bulk-import", post(handlers::offers::bulk_import))
        .route("/{id}/revisions", post(handlers::offers::create_revision))
        .route("/{id}/status", post(handlers::offers::transition_status))
        .route(
            "/{id}/document",
            get(handlers::offers::document_view).post(handlers::offers::record_generated_document),
        )
        // Itens
        .route("/{id}/items", put(handlers::offers::replace_line_items))
        .route(
            "/{id}/items/{item_id}",
            patch(handlers::offers::update_line_item),
        )
        // Faixas
        .route("/{id}/items/{item_id}/tiers", post(handlers::offers::add_tier))
        .route(
            "/{id}/items/{item_id}/tiers/{tier}",
            put(handlers::offers::update_tier).delete(handlers::offers::delete_tier),
        )
        .route(
            "/{id}/items/{item_id}/tiers/{tier}/activate",
            post(handlers::offers::set_active_tier),
        );

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/offers", offer_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
