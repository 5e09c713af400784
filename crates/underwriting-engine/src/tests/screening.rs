use super::common::*;
use crate::eligibility::{screen_catalog, CarrierCatalog};
use crate::filtered::FilterRule;
use crate::ranking::candidates_from_screening;

fn catalog() -> CarrierCatalog {
    serde_json::from_value(catalog_json()).expect("catalog fixture parses")
}

#[test]
fn requested_product_type_limits_screening() {
    let screening = screen_catalog(&catalog(), &baseline_context());

    let surviving: Vec<&str> = screening
        .eligible
        .iter()
        .flat_map(|carrier| carrier.products.iter().map(|product| product.product_id.as_str()))
        .collect();
    assert_eq!(surviving, vec!["a-term-20"]);
    assert!(screening
        .filtered
        .entries()
        .iter()
        .all(|entry| entry.product_id.as_deref() != Some("a-whole")));
}

#[test]
fn carriers_without_surviving_products_are_dropped() {
    let screening = screen_catalog(&catalog(), &baseline_context());

    assert!(screening
        .eligible
        .iter()
        .all(|carrier| carrier.carrier_id != "carrier-b"));
    assert_eq!(
        screening.filtered.reasons_for("carrier-b"),
        vec![
            "age 45 below product minimum 50",
            "face amount $250,000 exceeds product maximum $100,000",
        ]
    );
    assert!(screening
        .filtered
        .entries()
        .iter()
        .all(|entry| entry.rule == FilterRule::ProductMetadata));
}

#[test]
fn age_tier_caps_face_amount() {
    let context = context_for(58, &[], 750_000.0);

    let screening = screen_catalog(&catalog(), &context);

    assert_eq!(
        screening.filtered.reasons_for("carrier-a"),
        vec!["face amount $750,000 exceeds maximum $500,000 for age 58"]
    );
}

#[test]
fn product_knockouts_are_screened() {
    let context = context_for(45, &["als"], 250_000.0);

    let screening = screen_catalog(&catalog(), &context);

    assert_eq!(
        screening.filtered.reasons_for("carrier-a"),
        vec!["knockout condition: als"]
    );
    assert!(screening.eligible.is_empty());
}

#[test]
fn minimum_face_amount_ignored_when_tier_applies() {
    let context = context_for(45, &[], 30_000.0);

    let screening = screen_catalog(&catalog(), &context);

    assert!(screening.filtered.reasons_for("carrier-a").is_empty());
    assert_eq!(screening.product_count(), 1);
}

#[test]
fn large_face_amount_flags_full_underwriting() {
    let screening = screen_catalog(&catalog(), &baseline_context());

    assert_eq!(screening.full_underwriting_required.len(), 1);
    let flag = &screening.full_underwriting_required[0];
    assert_eq!(flag.product_id, "a-term-20");
    assert_eq!(flag.threshold, 200_000.0);

    let candidates = candidates_from_screening(&screening, 0.6);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].confidence, 0.6);
}
