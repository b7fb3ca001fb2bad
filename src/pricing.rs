// src/pricing.rs

//! Núcleo de cálculo: sem I/O, só transforma `Offer` + `LineItem` em memória.

pub mod bulk_import;
pub mod line_total;
pub mod mode_migrator;
pub mod revision;
pub mod tier_set;
pub mod totals;

pub use tier_set::{PriceTier, TierPrecision, TierSet};
pub use totals::{calculate_totals, OfferTotals, TotalsOutcome};
