// src/common/numeric.rs

//! Parsing e arredondamento de valores numéricos vindos de fora (payloads,
//! colunas JSONB antigas, texto colado de planilhas).
//!
//! Toda aritmética de quantidade passa por [`parse_quantity`]; todo preço
//! digitado passa por [`parse_decimal_lenient`]. Não existe outro parser.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Casas decimais dos totais da oferta (subtotal, imposto, total).
pub const OFFER_TOTAL_DECIMAL_PLACES: u32 = 2;

/// Arredonda "meio para longe do zero" (4.125 -> 4.13), o que o cliente espera ver no PDF.
/// O resultado sai sempre com exatamente `decimal_places` casas (4500 -> 4500.00).
pub fn round_money(value: Decimal, decimal_places: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(decimal_places);
    rounded
}

/// Lê apenas o prefixo numérico de uma quantidade ("1000 pcs" -> 1000, "2,5 kg" -> 2.5).
///
/// Aceita um único separador decimal ('.' ou ','). O resto da string é ignorado,
/// ela continua sendo exibida como veio. Retorna `None` se não houver dígitos no início.
pub fn parse_quantity(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim_start();
    let mut normalized = String::with_capacity(trimmed.len());
    let mut seen_digit = false;
    let mut seen_separator = false;

    for (idx, ch) in trimmed.char_indices() {
        match ch {
            '0'..='9' => {
                seen_digit = true;
                normalized.push(ch);
            }
            '-' if idx == 0 => normalized.push(ch),
            '.' | ',' if !seen_separator => {
                // "1." ou "1,": o separador só conta se vier um dígito depois
                let next_is_digit = trimmed[idx + ch.len_utf8()..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_digit());
                if !next_is_digit {
                    break;
                }
                seen_separator = true;
                normalized.push('.');
            }
            _ => break,
        }
    }

    if !seen_digit {
        return None;
    }

    Decimal::from_str(&normalized).ok()
}

/// `true` quando o texto começa por um número ≤ 0 ("-1000", "0 Stück").
/// Texto livre sem número ("auf Anfrage") não entra aqui.
pub fn is_non_positive_quantity(raw: &str) -> bool {
    parse_quantity(raw).is_some_and(|q| q <= Decimal::ZERO)
}

// Símbolos aceitos antes ou depois do número num preço digitado.
const CURRENCY_SYMBOLS: [&str; 4] = ["R$", "€", "$", "£"];

// Tira um símbolo de moeda ou um código ISO ("EUR", "BRL") de uma ponta do texto.
fn strip_currency(text: &str, from_start: bool) -> &str {
    for symbol in CURRENCY_SYMBOLS {
        let stripped = if from_start {
            text.strip_prefix(symbol)
        } else {
            text.strip_suffix(symbol)
        };
        if let Some(rest) = stripped {
            return rest.trim();
        }
    }

    let bytes = text.as_bytes();
    if bytes.len() <= 3 {
        return text;
    }
    let cut = if from_start { 3 } else { bytes.len() - 3 };
    if !text.is_char_boundary(cut) {
        return text;
    }
    let (code, rest, boundary) = if from_start {
        (&text[..cut], &text[cut..], bytes[cut])
    } else {
        (&text[cut..], &text[..cut], bytes[cut - 1])
    };
    if code.bytes().all(|b| b.is_ascii_uppercase()) && !boundary.is_ascii_alphabetic() {
        rest.trim()
    } else {
        text
    }
}

/// Converte um preço digitado em qualquer formato comum para `Decimal`.
///
/// - `"4.50"`, `"4,50"` -> 4.5
/// - `"1.234,56"` (pt/de) e `"1,234.56"` (en) -> 1234.56
/// - `"€ 4,50"`, `"R$ 10"`, `"4,50 EUR"` -> moeda numa das pontas é descartada
///
/// O texto tem que ser um único número: qualquer outra coisa antes, depois ou no meio
/// (`"ca. 5"`, `"5 €/1000"`) dá `None`. Quando os dois separadores aparecem, o último
/// é o decimal. Quando só um aparece repetido ("1.234.567"), ele é separador de milhar.
pub fn parse_decimal_lenient(raw: &str) -> Option<Decimal> {
    let token = strip_currency(strip_currency(raw.trim(), true), false);

    let valid = !token.is_empty()
        && token
            .char_indices()
            .all(|(i, c)| c.is_ascii_digit() || matches!(c, '.' | ',') || (c == '-' && i == 0));
    if !valid || !token.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let cleaned = token;

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');

    let normalized = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) if dot > comma => cleaned.replace(',', ""),
        (Some(_), Some(_)) => cleaned.replace('.', "").replace(',', "."),
        (Some(_), None) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        (None, Some(_)) if cleaned.matches(',').count() > 1 => cleaned.replace(',', ""),
        (None, Some(_)) => cleaned.replace(',', "."),
        _ => cleaned.to_string(),
    };

    Decimal::from_str(&normalized).ok()
}

/// Converte um valor JSON arbitrário (número ou string) em `Decimal`.
pub fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(s) => parse_decimal_lenient(s),
        _ => None,
    }
}

/// Serde helper para payloads: aceita `4.5`, `"4.5"` ou `"4,50"`.
pub fn deserialize_lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    decimal_from_json(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("valor numérico inválido: {}", value)))
}

/// Variante opcional de [`deserialize_lenient_decimal`] (`null` -> `None`).
pub fn deserialize_lenient_decimal_opt<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => decimal_from_json(&v)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("valor numérico inválido: {}", v))),
    }
}
