// src/middleware/tenancy.rs

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use uuid::Uuid;

use crate::common::error::ApiError;

// Toda rota de ofertas é escopada pelo tenant deste cabeçalho
const TENANT_ID_HEADER: &str = "x-tenant-id";

#[derive(Debug, Clone, Copy)]
pub struct TenantContext(pub Uuid);

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(TENANT_ID_HEADER)
            .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "O cabeçalho X-Tenant-ID é obrigatório."))?;

        let value_str = value.to_str().map_err(|_| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "Cabeçalho X-Tenant-ID contém caracteres inválidos.",
            )
        })?;

        let tenant_id = Uuid::parse_str(value_str.trim()).map_err(|_| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "Cabeçalho X-Tenant-ID inválido (não é um UUID).",
            )
        })?;

        Ok(TenantContext(tenant_id))
    }
}
