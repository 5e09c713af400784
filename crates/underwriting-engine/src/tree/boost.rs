use serde::{Deserialize, Serialize};

use super::evaluator::TreeEvaluationResult;

/// Raw confidence adjustment for one carrier/product pair.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TreeBoost {
    pub boost: f64,
    pub matched_rules: Vec<String>,
}

/// Sum `weight × match_score` over matched rules routing to the carrier (and product, when the
/// rule is product scoped). The sum is not capped; callers clamp the combined confidence.
pub fn calculate_tree_boost(
    carrier_id: &str,
    product_id: &str,
    tree_result: &TreeEvaluationResult,
) -> TreeBoost {
    tree_result
        .matched_rules
        .iter()
        .filter(|matched| matched.routing.routes_to(carrier_id, product_id))
        .fold(TreeBoost::default(), |mut acc, matched| {
            acc.boost += matched.weight * matched.match_score;
            acc.matched_rules.push(matched.rule_name.clone());
            acc
        })
}

/// Whether the tree's primary routing names this carrier and, when the tree recommends specific
/// products, this product.
pub fn is_tree_recommended(
    carrier_id: &str,
    product_id: &str,
    tree_result: &TreeEvaluationResult,
) -> bool {
    if !tree_result
        .recommended_carrier_ids
        .iter()
        .any(|id| id == carrier_id)
    {
        return false;
    }

    tree_result.recommended_product_ids.is_empty()
        || tree_result
            .recommended_product_ids
            .iter()
            .any(|id| id == product_id)
}
