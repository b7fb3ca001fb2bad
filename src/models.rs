pub mod document;
pub mod offers;
pub mod tiers;
