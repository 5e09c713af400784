//! Product catalog screening against carrier product metadata.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::EvaluationContext;
use crate::criteria::AgeTier;
use crate::filtered::{CriteriaFilteredProduct, FilterRule, FilteredProducts};
use crate::format::format_currency;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CarrierCatalog {
    #[serde(default)]
    pub carriers: Vec<CatalogCarrier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCarrier {
    pub carrier_id: String,
    pub carrier_name: String,
    #[serde(default)]
    pub products: Vec<ProductInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub product_id: String,
    pub product_name: String,
    pub product_type: String,
    #[serde(default)]
    pub min_age: Option<u32>,
    #[serde(default)]
    pub max_age: Option<u32>,
    #[serde(default)]
    pub min_face_amount: Option<f64>,
    #[serde(default)]
    pub max_face_amount: Option<f64>,
    #[serde(default)]
    pub metadata: ProductMetadata,
}

/// Underwriting constraints maintained alongside a product.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductMetadata {
    #[serde(default)]
    pub age_tiered_face_amounts: Vec<AgeTier>,
    #[serde(default)]
    pub knockout_conditions: Vec<String>,
    #[serde(default)]
    pub full_underwriting_threshold: Option<FullUnderwritingThreshold>,
}

/// Face amount above which the product requires full underwriting.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FullUnderwritingThreshold {
    #[serde(default)]
    pub face_amount_threshold: Option<f64>,
    #[serde(default)]
    pub age_bands: Vec<FullUnderwritingBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullUnderwritingBand {
    pub min_age: u32,
    pub max_age: u32,
    pub face_amount_threshold: f64,
}

impl FullUnderwritingThreshold {
    /// Threshold for `age`: a matching age band first, then the flat amount. Zero means unset.
    pub fn threshold_for(&self, age: u32) -> Option<f64> {
        self.age_bands
            .iter()
            .find(|band| age >= band.min_age && age <= band.max_age)
            .map(|band| band.face_amount_threshold)
            .or(self.face_amount_threshold)
            .filter(|threshold| *threshold > 0.0)
    }
}

/// A carrier with the products that survived screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibleCarrier {
    pub carrier_id: String,
    pub carrier_name: String,
    pub products: Vec<ProductInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullUnderwritingFlag {
    pub carrier_id: String,
    pub product_id: String,
    pub product_name: String,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatalogScreening {
    pub eligible: Vec<EligibleCarrier>,
    pub filtered: FilteredProducts,
    pub full_underwriting_required: Vec<FullUnderwritingFlag>,
}

impl CatalogScreening {
    pub fn product_count(&self) -> usize {
        self.eligible.iter().map(|carrier| carrier.products.len()).sum()
    }
}

/// Screen every product in the catalog against the applicant. Products of a type the applicant
/// did not ask for are skipped without a filtered entry.
pub fn screen_catalog(catalog: &CarrierCatalog, context: &EvaluationContext) -> CatalogScreening {
    let mut screening = CatalogScreening::default();

    for carrier in &catalog.carriers {
        let mut surviving = Vec::new();

        for product in &carrier.products {
            if !requested_type(product, context) {
                continue;
            }

            let reasons = product_reasons(product, context);
            if reasons.is_empty() {
                if let Some(threshold) = product
                    .metadata
                    .full_underwriting_threshold
                    .as_ref()
                    .and_then(|limits| limits.threshold_for(context.age()))
                    .filter(|threshold| context.face_amount() > *threshold)
                {
                    screening.full_underwriting_required.push(FullUnderwritingFlag {
                        carrier_id: carrier.carrier_id.clone(),
                        product_id: product.product_id.clone(),
                        product_name: product.product_name.clone(),
                        threshold,
                    });
                }
                surviving.push(product.clone());
                continue;
            }

            debug!(
                carrier = %carrier.carrier_id,
                product = %product.product_id,
                reasons = reasons.len(),
                "product screened out"
            );
            screening
                .filtered
                .extend(reasons.into_iter().map(|reason| CriteriaFilteredProduct {
                    carrier_id: carrier.carrier_id.clone(),
                    carrier_name: carrier.carrier_name.clone(),
                    product_id: Some(product.product_id.clone()),
                    product_name: Some(product.product_name.clone()),
                    rule: FilterRule::ProductMetadata,
                    reason,
                }));
        }

        if !surviving.is_empty() {
            screening.eligible.push(EligibleCarrier {
                carrier_id: carrier.carrier_id.clone(),
                carrier_name: carrier.carrier_name.clone(),
                products: surviving,
            });
        }
    }

    screening.filtered.dedup();
    screening
}

fn requested_type(product: &ProductInfo, context: &EvaluationContext) -> bool {
    let requested = context.product_types();
    requested.is_empty()
        || requested
            .iter()
            .any(|kind| kind.eq_ignore_ascii_case(product.product_type.trim()))
}

fn product_reasons(product: &ProductInfo, context: &EvaluationContext) -> Vec<String> {
    let mut reasons = Vec::new();
    let age = context.age();
    let face_amount = context.face_amount();

    if let Some(min) = product.min_age {
        if age < min {
            reasons.push(format!("age {age} below product minimum {min}"));
        }
    }
    if let Some(max) = product.max_age {
        if age > max {
            reasons.push(format!("age {age} above product maximum {max}"));
        }
    }

    let tier_max = product
        .metadata
        .age_tiered_face_amounts
        .iter()
        .filter(|tier| tier.contains(age))
        .map(|tier| tier.max_face_amount)
        .reduce(f64::min);

    match (tier_max, product.max_face_amount) {
        (Some(tier), flat) => {
            let maximum = flat.map_or(tier, |flat| flat.min(tier));
            if face_amount > maximum {
                reasons.push(format!(
                    "face amount {} exceeds maximum {} for age {age}",
                    format_currency(face_amount),
                    format_currency(maximum)
                ));
            }
        }
        (None, Some(maximum)) => {
            if face_amount > maximum {
                reasons.push(format!(
                    "face amount {} exceeds product maximum {}",
                    format_currency(face_amount),
                    format_currency(maximum)
                ));
            }
        }
        (None, None) => {}
    }

    for code in &product.metadata.knockout_conditions {
        let code = code.trim();
        if context.has_condition(code) {
            reasons.push(format!("knockout condition: {code}"));
        }
    }

    if tier_max.is_none() {
        if let Some(minimum) = product.min_face_amount {
            if face_amount < minimum {
                reasons.push(format!(
                    "face amount {} below product minimum {}",
                    format_currency(face_amount),
                    format_currency(minimum)
                ));
            }
        }
    }

    reasons
}
