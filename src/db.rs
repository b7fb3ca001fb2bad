pub mod offer_store;
pub use offer_store::OfferStore;
pub mod offers_repo;
pub use offers_repo::OfferRepository;
pub mod tier_json;
