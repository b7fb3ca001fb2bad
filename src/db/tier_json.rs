// src/db/tier_json.rs

//! Conversão das colunas JSONB de faixas. Linhas antigas podem ter números como
//! string ("4,50"), campos faltando ou lixo; aqui tudo vira tipo forte.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    common::{error::AppError, numeric::decimal_from_json},
    models::tiers::{QuantityTier, UnitTier},
    pricing::tier_set::{PriceTier, TierSet},
};

fn lenient_decimal(obj: &serde_json::Map<String, Value>, key: &str) -> Decimal {
    match obj.get(key) {
        None | Some(Value::Null) => Decimal::ZERO,
        Some(v) => decimal_from_json(v).unwrap_or_else(|| {
            tracing::warn!(field = key, value = %v, "número corrompido em faixa, usando 0");
            Decimal::ZERO
        }),
    }
}

fn lenient_bool(obj: &serde_json::Map<String, Value>, key: &str) -> bool {
    match obj.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

// Quantidade numérica antiga (1000) vira texto ("1000")
fn lenient_quantity(obj: &serde_json::Map<String, Value>) -> String {
    match obj.get("quantity") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn lenient_time(obj: &serde_json::Map<String, Value>, key: &str, fallback: DateTime<Utc>) -> DateTime<Utc> {
    obj.get(key)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(fallback)
}

fn elements(value: &Value, column: &str) -> Vec<serde_json::Map<String, Value>> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| match v {
                Value::Object(obj) => Some(obj.clone()),
                other => {
                    tracing::warn!(column, value = %other, "elemento de faixa descartado");
                    None
                }
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            tracing::warn!(column, value = %other, "coluna de faixas não é um array");
            Vec::new()
        }
    }
}

pub fn quantity_tiers_from_json(value: &Value) -> TierSet<QuantityTier> {
    elements(value, "quantity_prices")
        .iter()
        .map(|obj| QuantityTier {
            quantity: lenient_quantity(obj),
            price: lenient_decimal(obj, "price"),
            is_active: lenient_bool(obj, "isActive"),
            total: lenient_decimal(obj, "total"),
        })
        .collect()
}

pub fn unit_tiers_from_json(value: &Value) -> TierSet<UnitTier> {
    let now = Utc::now();
    elements(value, "unit_prices")
        .iter()
        .map(|obj| {
            let created_at = lenient_time(obj, "createdAt", now);
            UnitTier {
                id: obj
                    .get("id")
                    .and_then(Value::as_str)
                    .and_then(|s| Uuid::parse_str(s).ok())
                    .unwrap_or_else(Uuid::new_v4),
                quantity: lenient_quantity(obj),
                unit_price: lenient_decimal(obj, "unitPrice"),
                total_price: lenient_decimal(obj, "totalPrice"),
                is_active: lenient_bool(obj, "isActive"),
                created_at,
                updated_at: lenient_time(obj, "updatedAt", created_at),
            }
        })
        .collect()
}

pub fn tiers_to_json<T: PriceTier + serde::Serialize>(set: &TierSet<T>) -> Result<Value, AppError> {
    serde_json::to_value(set).map_err(|e| AppError::InternalServerError(e.into()))
}
