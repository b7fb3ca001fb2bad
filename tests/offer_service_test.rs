// tests/offer_service_test.rs
//
// Fluxos completos do serviço de ofertas contra o store em memória.

mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use offer_backend::{
    common::error::AppError,
    models::{
        offers::{
            CommercialTermsUpdate, LineItem, LineItemInput, LineItemSeed, OfferDetail, OfferStatus,
            PricingConfigUpdate, PricingMode,
        },
        tiers::{QuantityTier, TierInput, TierRef, TierUpdate, UnitTier},
    },
    pricing::TierSet,
};

use common::{bare_offer, new_offer, seed, service, InMemoryOfferStore};

fn scenario_b_terms() -> CommercialTermsUpdate {
    CommercialTermsUpdate {
        discount_percentage: Some(dec!(10)),
        shipping_cost: Some(dec!(100)),
        tax_rate: Some(dec!(0.19)),
        ..Default::default()
    }
}

fn quantity_tier(quantity: &str, price: Decimal) -> TierInput {
    TierInput {
        kind: PricingMode::Quantity,
        quantity: quantity.to_string(),
        price,
        activate: false,
    }
}

#[tokio::test]
async fn create_offer_prices_from_base_and_numbers_sequentially() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);
    let tenant = Uuid::new_v4();

    let first = svc
        .create_offer(tenant, new_offer(vec![seed("Gehäuse", dec!(4.5), "1000")], false))
        .await
        .unwrap();
    let second = svc
        .create_offer(tenant, new_offer(vec![seed("Deckel", dec!(1), "1")], false))
        .await
        .unwrap();

    assert!(first.header.offer_number.starts_with("OF-"));
    assert!(first.header.offer_number.ends_with("-0001"));
    assert!(second.header.offer_number.ends_with("-0002"));
    assert_eq!(first.header.status, OfferStatus::Draft);
    assert_eq!(first.header.revision, 1);
    assert_eq!(first.header.currency, "EUR");

    assert_eq!(first.line_items[0].line_total, dec!(4500.00));
    assert_eq!(first.header.subtotal, dec!(4500.00));
    assert_eq!(first.header.tax_amount, dec!(855.00));
    assert_eq!(first.header.total_amount, dec!(5355.00));

    let stored = store.stored(first.header.id).unwrap();
    assert_eq!(stored.header.total_amount, dec!(5355.00));
}

#[tokio::test]
async fn create_offer_requires_named_items() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);

    let err = svc.create_offer(Uuid::new_v4(), new_offer(vec![], false)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidField { .. }));

    let err = svc
        .create_offer(Uuid::new_v4(), new_offer(vec![seed("  ", dec!(1), "1")], false))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidField { .. }));
}

#[tokio::test]
async fn components_are_linked_and_left_out_of_the_subtotal() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);

    let assembly = LineItemSeed {
        is_assembly_item: true,
        ..seed("Baugruppe", dec!(10), "10")
    };
    let component = LineItemSeed {
        is_component: true,
        ..seed("Schraube", dec!(0.5), "40")
    };
    let detail = svc
        .create_offer(Uuid::new_v4(), new_offer(vec![assembly, component], false))
        .await
        .unwrap();

    assert_eq!(detail.line_items[1].parent_item_id, Some(detail.line_items[0].id));
    assert_eq!(detail.line_items[1].line_total, dec!(20.00));
    assert_eq!(detail.header.subtotal, dec!(100.00));
}

#[tokio::test]
async fn commercial_terms_give_the_documented_totals() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);
    let tenant = Uuid::new_v4();
    let created = svc
        .create_offer(tenant, new_offer(vec![seed("Gehäuse", dec!(4.5), "1000")], false))
        .await
        .unwrap();

    let detail = svc
        .update_commercial_terms(tenant, created.header.id, scenario_b_terms())
        .await
        .unwrap();

    assert_eq!(detail.header.subtotal, dec!(4500.00));
    assert_eq!(detail.header.discount_amount, dec!(450.00));
    assert_eq!(detail.header.tax_amount, dec!(788.50));
    assert_eq!(detail.header.total_amount, dec!(4938.50));

    let view = svc.document_view(tenant, created.header.id).await.unwrap();
    assert_eq!(view.totals.after_discount, dec!(4050.00));
    assert_eq!(view.totals.before_tax, dec!(4150.00));
    assert_eq!(view.totals.total_amount, dec!(4938.50));
    assert_eq!(view.items.len(), 1);
    assert!(view.items[0].active_tier.is_none());
}

#[tokio::test]
async fn commercial_terms_reject_out_of_range_values() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);
    let tenant = Uuid::new_v4();
    let created = svc
        .create_offer(tenant, new_offer(vec![seed("A", dec!(1), "1")], false))
        .await
        .unwrap();

    for terms in [
        CommercialTermsUpdate {
            discount_percentage: Some(dec!(101)),
            ..Default::default()
        },
        CommercialTermsUpdate {
            shipping_cost: Some(dec!(-5)),
            ..Default::default()
        },
        CommercialTermsUpdate {
            tax_rate: Some(dec!(19)),
            ..Default::default()
        },
    ] {
        let err = svc
            .update_commercial_terms(tenant, created.header.id, terms)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidField { .. }));
    }
}

#[tokio::test]
async fn unit_mode_offer_starts_from_the_template() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);

    let detail = svc
        .create_offer(Uuid::new_v4(), new_offer(vec![seed("Gehäuse", dec!(4.5), "1000")], true))
        .await
        .unwrap();

    let tiers = &detail.line_items[0].unit_prices;
    assert_eq!(tiers.len(), 3);
    assert_eq!(tiers.active_index(), Some(0));
    // Modelo zerado: a linha vale 0 até alguém preencher os preços
    assert_eq!(detail.line_items[0].line_total, Decimal::ZERO);
}

#[tokio::test]
async fn activating_a_unit_tier_moves_the_line_total() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);
    let tenant = Uuid::new_v4();
    let created = svc
        .create_offer(tenant, new_offer(vec![seed("Gehäuse", dec!(4.5), "1000")], true))
        .await
        .unwrap();

    let detail = svc
        .replace_line_items(
            tenant,
            created.header.id,
            vec![LineItemInput {
                item_name: "Gehäuse".into(),
                unit_prices: vec![
                    UnitTier::new("5000", dec!(4.2)),
                    UnitTier::new("1000", dec!(4.5)),
                ],
                ..Default::default()
            }],
        )
        .await
        .unwrap();

    let item = &detail.line_items[0];
    // Ordenadas pela quantidade; a primeira informada assumiu como ativa
    assert_eq!(item.unit_prices.get(0).unwrap().quantity, "1000");
    assert_eq!(item.unit_prices.active_index(), Some(1));
    assert_eq!(item.line_total, dec!(21000.00));

    let detail = svc.set_active_tier(tenant, created.header.id, item.id, 0).await.unwrap();
    assert_eq!(detail.line_items[0].line_total, dec!(4500.00));

    let detail = svc.set_active_tier(tenant, created.header.id, item.id, 1).await.unwrap();
    assert_eq!(detail.line_items[0].line_total, dec!(21000.00));
    assert_eq!(detail.header.subtotal, dec!(21000.00));

    let err = svc.set_active_tier(tenant, created.header.id, item.id, 2).await.unwrap_err();
    assert!(matches!(err, AppError::OutOfRange(_)));
}

#[tokio::test]
async fn tier_writes_must_match_the_offer_mode() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);
    let tenant = Uuid::new_v4();
    let created = svc
        .create_offer(tenant, new_offer(vec![seed("A", dec!(1), "1")], false))
        .await
        .unwrap();
    let item_id = created.line_items[0].id;

    let err = svc
        .add_tier(
            tenant,
            created.header.id,
            item_id,
            TierInput {
                kind: PricingMode::Unit,
                ..quantity_tier("1000", dec!(4.5))
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::ModeMismatch {
            expected: PricingMode::Quantity,
            requested: PricingMode::Unit
        }
    ));

    let err = svc.sync_default_unit_prices(tenant, created.header.id).await.unwrap_err();
    assert!(matches!(err, AppError::ModeMismatch { .. }));
}

#[tokio::test]
async fn unit_tier_columns_are_limited() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);
    let tenant = Uuid::new_v4();
    let created = svc
        .create_offer(tenant, new_offer(vec![seed("A", dec!(1), "1")], true))
        .await
        .unwrap();

    // O modelo padrão já ocupa as 3 colunas
    let err = svc
        .add_tier(
            tenant,
            created.header.id,
            created.line_items[0].id,
            TierInput {
                kind: PricingMode::Unit,
                ..quantity_tier("20000", dec!(3.9))
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OutOfRange(_)));
}

#[tokio::test]
async fn bulk_import_fills_unit_tiers() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);
    let tenant = Uuid::new_v4();
    let created = svc
        .create_offer(tenant, new_offer(vec![seed("Gehäuse", dec!(9), "1")], true))
        .await
        .unwrap();

    let (detail, summary) = svc
        .bulk_import(
            tenant,
            created.header.id,
            "Pos\tMenge 1\tPreis 1\tMenge 2\tPreis 2\n1\t1000\t4,50\t5000\t4,20".to_string(),
        )
        .await
        .unwrap();

    assert_eq!(summary.tiers_imported, 2);
    let item = &detail.line_items[0];
    assert_eq!(item.unit_prices.len(), 2);
    assert_eq!(item.unit_prices.active_index(), Some(0));
    assert_eq!(item.line_total, dec!(4500.00));

    let err = svc
        .bulk_import(tenant, created.header.id, "Pos\tMenge\tPreis".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ImportFormat(_)));
}

#[tokio::test]
async fn toggling_the_mode_keeps_quantity_tiers() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);
    let tenant = Uuid::new_v4();
    let created = svc
        .create_offer(tenant, new_offer(vec![seed("Gehäuse", dec!(9), "1")], false))
        .await
        .unwrap();
    let offer_id = created.header.id;
    let item_id = created.line_items[0].id;

    let before = svc
        .add_tier(tenant, offer_id, item_id, quantity_tier("1000", dec!(4.5)))
        .await
        .unwrap();
    assert_eq!(before.line_items[0].line_total, dec!(4500.00));

    let on = svc.toggle_mode(tenant, offer_id, true).await.unwrap();
    assert!(on.header.use_unit_prices);
    assert_eq!(on.line_items[0].unit_prices.len(), 3);
    assert_eq!(on.line_items[0].line_total, Decimal::ZERO);

    let off = svc.toggle_mode(tenant, offer_id, false).await.unwrap();
    assert!(off.line_items[0].unit_prices.is_empty());
    assert_eq!(off.line_items[0].quantity_prices, before.line_items[0].quantity_prices);
    assert_eq!(off.line_items[0].line_total, dec!(4500.00));
}

#[tokio::test]
async fn tier_update_and_delete_address_tiers_properly() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);
    let tenant = Uuid::new_v4();
    let created = svc
        .create_offer(tenant, new_offer(vec![seed("Gehäuse", dec!(4.5), "1000")], true))
        .await
        .unwrap();
    let offer_id = created.header.id;
    let item_id = created.line_items[0].id;

    let err = svc
        .update_tier(
            tenant,
            offer_id,
            item_id,
            0,
            TierUpdate {
                quantity: Some("1000".into()),
                price: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidField { ref field, .. } if field == "price"));

    let detail = svc
        .update_tier(
            tenant,
            offer_id,
            item_id,
            0,
            TierUpdate {
                quantity: Some("1000".into()),
                price: Some(dec!(4.5)),
            },
        )
        .await
        .unwrap();
    assert_eq!(detail.line_items[0].line_total, dec!(4500.00));

    let active_id = detail.line_items[0].unit_prices.get(0).unwrap().id;
    let detail = svc
        .delete_tier(tenant, offer_id, item_id, TierRef::Id(active_id))
        .await
        .unwrap();
    let tiers = &detail.line_items[0].unit_prices;
    assert_eq!(tiers.len(), 2);
    // A ativa foi apagada: a primeira restante assume
    assert_eq!(tiers.active_index(), Some(0));

    let err = svc
        .delete_tier(tenant, offer_id, item_id, TierRef::Id(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ResourceNotFound(_)));
}

#[tokio::test]
async fn tiers_refuse_zero_and_negative_quantities() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);
    let tenant = Uuid::new_v4();
    let created = svc
        .create_offer(tenant, new_offer(vec![seed("Gehäuse", dec!(4.5), "1000")], false))
        .await
        .unwrap();
    let (offer_id, item_id) = (created.header.id, created.line_items[0].id);

    for quantity in ["-1000", "0"] {
        let err = svc
            .add_tier(tenant, offer_id, item_id, quantity_tier(quantity, dec!(4.5)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidField { ref field, .. } if field == "quantity"));
    }

    svc.add_tier(tenant, offer_id, item_id, quantity_tier("1000", dec!(4.5)))
        .await
        .unwrap();
    let err = svc
        .update_tier(
            tenant,
            offer_id,
            item_id,
            0,
            TierUpdate {
                quantity: Some("-1000".into()),
                price: Some(dec!(4.5)),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidField { ref field, .. } if field == "quantity"));

    let stored = svc.get_offer(tenant, offer_id).await.unwrap();
    let tiers = &stored.line_items[0].quantity_prices;
    assert_eq!(tiers.len(), 1);
    assert_eq!(tiers.get(0).unwrap().quantity, "1000");
    assert_eq!(stored.header.subtotal, dec!(4500.00));
}

#[tokio::test]
async fn bulk_import_skips_negative_quantities() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);
    let tenant = Uuid::new_v4();
    let created = svc
        .create_offer(tenant, new_offer(vec![seed("Gehäuse", dec!(1), "1")], false))
        .await
        .unwrap();
    let offer_id = created.header.id;

    let err = svc
        .bulk_import(tenant, offer_id, "Art\tMenge\tPreis\nA\t-1000\t4.5".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ImportFormat(_)));

    let stored = svc.get_offer(tenant, offer_id).await.unwrap();
    assert!(stored.line_items[0].quantity_prices.is_empty());
    assert!(stored.header.subtotal >= Decimal::ZERO);
}

#[tokio::test]
async fn quantity_tiers_are_deleted_by_index_only() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);
    let tenant = Uuid::new_v4();
    let created = svc
        .create_offer(tenant, new_offer(vec![seed("A", dec!(1), "1")], false))
        .await
        .unwrap();
    let (offer_id, item_id) = (created.header.id, created.line_items[0].id);
    svc.add_tier(tenant, offer_id, item_id, quantity_tier("100", dec!(2)))
        .await
        .unwrap();

    let err = svc
        .delete_tier(tenant, offer_id, item_id, TierRef::Id(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidField { .. }));

    let detail = svc
        .delete_tier(tenant, offer_id, item_id, TierRef::Index(0))
        .await
        .unwrap();
    assert!(detail.line_items[0].quantity_prices.is_empty());
    // Sem faixas, volta para preço base × quantidade base
    assert_eq!(detail.line_items[0].line_total, dec!(1.00));
}

#[tokio::test]
async fn pricing_config_is_validated_and_rederives_tiers() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);
    let tenant = Uuid::new_v4();
    let created = svc
        .create_offer(tenant, new_offer(vec![seed("A", dec!(1), "1")], true))
        .await
        .unwrap();
    let offer_id = created.header.id;

    let err = svc
        .update_pricing_config(
            tenant,
            offer_id,
            PricingConfigUpdate {
                unit_price_decimal_places: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OutOfRange(_)));

    let detail = svc
        .update_pricing_config(
            tenant,
            offer_id,
            PricingConfigUpdate {
                max_unit_price_columns: Some(2),
                unit_price_decimal_places: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(detail.header.unit_price_decimal_places, 2);
    assert_eq!(detail.line_items[0].unit_prices.len(), 2);
}

#[tokio::test]
async fn accepted_offers_are_locked_but_can_be_revised() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);
    let tenant = Uuid::new_v4();
    let created = svc
        .create_offer(tenant, new_offer(vec![seed("Gehäuse", dec!(4.5), "1000")], false))
        .await
        .unwrap();
    let offer_id = created.header.id;

    let accepted = svc
        .transition_status(tenant, offer_id, OfferStatus::Accepted)
        .await
        .unwrap();
    assert_eq!(accepted.header.status, OfferStatus::Accepted);

    let err = svc
        .update_commercial_terms(tenant, offer_id, scenario_b_terms())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OfferLocked(_)));

    let err = svc
        .transition_status(tenant, offer_id, OfferStatus::Negotiation)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidStatusTransition {
            from: OfferStatus::Accepted,
            to: OfferStatus::Negotiation
        }
    ));

    let revision = svc.create_revision(tenant, offer_id).await.unwrap();
    assert_ne!(revision.header.id, offer_id);
    assert_eq!(revision.header.revision, 2);
    assert_eq!(revision.header.status, OfferStatus::Draft);
    assert_eq!(
        revision.header.previous_offer_number.as_deref(),
        Some(created.header.offer_number.as_str())
    );
    assert_ne!(revision.line_items[0].id, created.line_items[0].id);
    assert_eq!(revision.header.total_amount, created.header.total_amount);

    // A revisão é editável
    svc.update_commercial_terms(tenant, revision.header.id, scenario_b_terms())
        .await
        .unwrap();
}

#[tokio::test]
async fn reads_repair_in_memory_without_persisting() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);

    let header = bare_offer(false);
    let tenant = header.tenant_id;
    let offer_id = header.id;
    let mut item = LineItem::from_seed(offer_id, 1, seed("Legacy", dec!(1), "1"));
    // Dados antigos: faixas sem nenhuma ativa e totais zerados
    item.quantity_prices = TierSet::from_vec(vec![
        QuantityTier::new("1000", dec!(4.5)),
        QuantityTier::new("5000", dec!(4.2)),
    ]);
    store.put(OfferDetail {
        header,
        line_items: vec![item],
    });

    let detail = svc.get_offer(tenant, offer_id).await.unwrap();
    assert_eq!(detail.line_items[0].quantity_prices.active_index(), Some(0));
    assert_eq!(detail.line_items[0].line_total, dec!(4500.00));
    assert_eq!(detail.header.subtotal, dec!(4500.00));

    let stored = store.stored(offer_id).unwrap();
    assert_eq!(stored.line_items[0].quantity_prices.active_index(), None);
    assert_eq!(stored.header.subtotal, Decimal::ZERO);
    assert_eq!(store.commits.load(std::sync::atomic::Ordering::SeqCst), 0);

    // O recálculo explícito grava
    svc.recalculate(tenant, offer_id).await.unwrap();
    let stored = store.stored(offer_id).unwrap();
    assert_eq!(stored.line_items[0].quantity_prices.active_index(), Some(0));
    assert_eq!(stored.header.subtotal, dec!(4500.00));
}

#[tokio::test]
async fn offers_are_isolated_by_tenant() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);
    let created = svc
        .create_offer(Uuid::new_v4(), new_offer(vec![seed("A", dec!(1), "1")], false))
        .await
        .unwrap();

    let err = svc.get_offer(Uuid::new_v4(), created.header.id).await.unwrap_err();
    assert!(matches!(err, AppError::ResourceNotFound(_)));
}

#[tokio::test]
async fn failed_commit_leaves_the_stored_offer_untouched() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);
    let tenant = Uuid::new_v4();
    let created = svc
        .create_offer(tenant, new_offer(vec![seed("Gehäuse", dec!(4.5), "1000")], false))
        .await
        .unwrap();

    store.fail_next_commit();
    let err = svc
        .update_commercial_terms(tenant, created.header.id, scenario_b_terms())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DatabaseError(_)));

    let stored = store.stored(created.header.id).unwrap();
    assert_eq!(stored.header.discount_percentage, Decimal::ZERO);
    assert_eq!(stored.header.total_amount, dec!(5355.00));
}

#[tokio::test]
async fn generated_document_is_recorded_on_the_header() {
    let store = InMemoryOfferStore::new();
    let svc = service(&store);
    let tenant = Uuid::new_v4();
    let created = svc
        .create_offer(tenant, new_offer(vec![seed("A", dec!(1), "1")], false))
        .await
        .unwrap();

    let err = svc
        .record_generated_document(tenant, created.header.id, " ".into())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidField { .. }));

    let offer = svc
        .record_generated_document(tenant, created.header.id, "docs/OF-0001.pdf".into())
        .await
        .unwrap();
    assert_eq!(offer.document_reference.as_deref(), Some("docs/OF-0001.pdf"));
    assert!(store.stored(created.header.id).unwrap().header.document_generated_at.is_some());
}
