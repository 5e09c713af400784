//! Final ordering of carrier/product candidates once criteria and tree results are known.

use serde::{Deserialize, Serialize};

use crate::eligibility::CatalogScreening;
use crate::tree::{calculate_tree_boost, is_tree_recommended, TreeEvaluationResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationCandidate {
    pub carrier_id: String,
    pub carrier_name: String,
    pub product_id: String,
    pub product_name: String,
    /// Confidence assigned before the tree boost, in `[0, 1]`.
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecommendation {
    pub carrier_id: String,
    pub carrier_name: String,
    pub product_id: String,
    pub product_name: String,
    pub confidence: f64,
    pub tree_boost: f64,
    pub final_score: f64,
    pub matched_rules: Vec<String>,
    pub tree_recommended: bool,
}

/// One candidate per screened product, all starting at `base_confidence`.
pub fn candidates_from_screening(
    screening: &CatalogScreening,
    base_confidence: f64,
) -> Vec<RecommendationCandidate> {
    screening
        .eligible
        .iter()
        .flat_map(|carrier| {
            carrier.products.iter().map(move |product| RecommendationCandidate {
                carrier_id: carrier.carrier_id.clone(),
                carrier_name: carrier.carrier_name.clone(),
                product_id: product.product_id.clone(),
                product_name: product.product_name.clone(),
                confidence: base_confidence,
            })
        })
        .collect()
}

/// Drop candidates from excluded carriers, add the tree boost, and sort by the clamped score.
/// Equal scores keep their input order.
pub fn rank_recommendations(
    candidates: &[RecommendationCandidate],
    tree_result: &TreeEvaluationResult,
    excluded_carriers: &[String],
) -> Vec<RankedRecommendation> {
    let mut ranked: Vec<RankedRecommendation> = candidates
        .iter()
        .filter(|candidate| !excluded_carriers.contains(&candidate.carrier_id))
        .map(|candidate| {
            let boost = calculate_tree_boost(&candidate.carrier_id, &candidate.product_id, tree_result);
            RankedRecommendation {
                carrier_id: candidate.carrier_id.clone(),
                carrier_name: candidate.carrier_name.clone(),
                product_id: candidate.product_id.clone(),
                product_name: candidate.product_name.clone(),
                confidence: candidate.confidence,
                tree_boost: boost.boost,
                final_score: (candidate.confidence + boost.boost).clamp(0.0, 1.0),
                matched_rules: boost.matched_rules,
                tree_recommended: is_tree_recommended(
                    &candidate.carrier_id,
                    &candidate.product_id,
                    tree_result,
                ),
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
    ranked
}
