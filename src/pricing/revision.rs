// src/pricing/revision.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::offers::{LineItem, Offer, OfferDetail, OfferStatus, format_offer_number};

/// Cria a próxima revisão de uma oferta.
///
/// Configuração de preço, fotos e totais são copiados sem recalcular; os itens
/// ganham ids novos e os componentes passam a apontar para o pai clonado.
pub fn create_revision(source: &OfferDetail, sequence: i32, now: DateTime<Utc>) -> OfferDetail {
    let src = &source.header;
    let header = Offer {
        id: Uuid::new_v4(),
        offer_number: format_offer_number(now, sequence),
        revision: src.revision + 1,
        previous_offer_number: Some(src.offer_number.clone()),
        status: OfferStatus::Draft,
        document_generated_at: None,
        document_reference: None,
        created_at: now,
        updated_at: now,
        ..src.clone()
    };

    let id_map: HashMap<Uuid, Uuid> = source
        .line_items
        .iter()
        .map(|item| (item.id, Uuid::new_v4()))
        .collect();

    let line_items = source
        .line_items
        .iter()
        .map(|item| LineItem {
            id: id_map[&item.id],
            offer_id: header.id,
            // Pai fora da oferta de origem não deveria existir; nesse caso o vínculo cai
            parent_item_id: item.parent_item_id.and_then(|p| id_map.get(&p).copied()),
            created_at: now,
            updated_at: now,
            ..item.clone()
        })
        .collect();

    let mut detail = OfferDetail { header, line_items };
    detail.sort_by_position();
    detail
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::totals::tests::{base_item, offer};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn source() -> OfferDetail {
        let mut header = offer(false);
        header.status = OfferStatus::Negotiation;
        header.document_reference = Some("docs/OF-202610-0001.pdf".into());
        header.document_generated_at = Some(Utc::now());
        header.total_amount = dec!(4938.50);

        let parent = base_item(header.id, 1, dec!(100), "1");
        let mut component = base_item(header.id, 2, dec!(40), "1");
        component.is_component = true;
        component.parent_item_id = Some(parent.id);

        OfferDetail {
            header,
            line_items: vec![parent, component],
        }
    }

    #[test]
    fn revision_header_is_reset_but_pricing_is_kept() {
        let src = source();
        let now = Utc.with_ymd_and_hms(2026, 11, 2, 9, 0, 0).unwrap();
        let rev = create_revision(&src, 3, now);

        assert_ne!(rev.header.id, src.header.id);
        assert_eq!(rev.header.offer_number, "OF-202611-0003");
        assert_eq!(rev.header.revision, 2);
        assert_eq!(rev.header.previous_offer_number.as_deref(), Some("OF-202610-0001"));
        assert_eq!(rev.header.status, OfferStatus::Draft);
        assert!(rev.header.document_reference.is_none());
        assert!(rev.header.document_generated_at.is_none());
        assert_eq!(rev.header.total_amount, dec!(4938.50));
        assert_eq!(rev.header.unit_price_decimal_places, src.header.unit_price_decimal_places);
    }

    #[test]
    fn components_point_at_the_cloned_parent() {
        let src = source();
        let rev = create_revision(&src, 1, Utc::now());

        let parent = &rev.line_items[0];
        let component = &rev.line_items[1];
        assert_ne!(parent.id, src.line_items[0].id);
        assert_eq!(parent.offer_id, rev.header.id);
        assert_eq!(component.parent_item_id, Some(parent.id));
        assert_eq!(component.position, 2);
    }
}
