use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::condition::{ConditionNode, LegacyConditionGroup};
use crate::context::FactKey;
use crate::error::LoadIssue;

const DEFAULT_RULE_WEIGHT: f64 = 0.2;
const DEFAULT_RULE_PRIORITY: i32 = 999;
const PRIMARY_ROUTING_FACTS: [FactKey; 2] = [FactKey::Age, FactKey::FaceAmount];

/// Where a matched rule sends the applicant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Routing {
    #[serde(default)]
    pub carrier_ids: Vec<String>,
    /// Products the rule is scoped to; `None` or empty applies to every product of the carriers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_ids: Option<Vec<String>>,
    #[serde(default)]
    pub is_primary_routing: bool,
}

impl Routing {
    pub fn routes_to(&self, carrier_id: &str, product_id: &str) -> bool {
        if !self.carrier_ids.iter().any(|id| id == carrier_id) {
            return false;
        }

        match &self.product_ids {
            Some(products) if !products.is_empty() => products.iter().any(|id| id == product_id),
            _ => true,
        }
    }
}

/// Named decision-tree rule authored through the admin tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRule")]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub condition: ConditionNode,
    pub weight: f64,
    pub routing: Routing,
    pub priority: i32,
    pub is_active: bool,
}

/// Routing entry from the legacy `recommendations` array.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRecommendation {
    carrier_id: String,
    #[serde(default)]
    product_ids: Vec<String>,
    #[serde(default)]
    priority: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    id: String,
    name: String,
    #[serde(default)]
    condition: Option<ConditionNode>,
    #[serde(default)]
    conditions: Option<LegacyConditionGroup>,
    #[serde(default)]
    weight: Option<f64>,
    #[serde(default)]
    routing: Option<Routing>,
    #[serde(default)]
    recommendations: Vec<LegacyRecommendation>,
    #[serde(default)]
    priority: Option<i32>,
    #[serde(default, alias = "isActive")]
    is_active: Option<bool>,
}

impl TryFrom<RawRule> for Rule {
    type Error = String;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        if raw.id.trim().is_empty() {
            return Err("rule id must not be empty".to_string());
        }
        if raw.name.trim().is_empty() {
            return Err(format!("rule {} has an empty name", raw.id));
        }

        let condition = match (raw.condition, raw.conditions) {
            (Some(condition), _) => condition,
            (None, Some(group)) => ConditionNode::from(group),
            (None, None) => {
                return Err(format!("rule {} has no condition", raw.id));
            }
        };

        let weight = raw.weight.unwrap_or(DEFAULT_RULE_WEIGHT);
        if !weight.is_finite() {
            return Err(format!("rule {} has a non-finite weight", raw.id));
        }

        let legacy_priority = raw
            .recommendations
            .iter()
            .filter_map(|recommendation| recommendation.priority)
            .min();

        let routing = match raw.routing {
            Some(routing) => routing,
            None => legacy_routing(&raw.recommendations, &condition),
        };

        Ok(Rule {
            id: raw.id,
            name: raw.name,
            condition,
            weight,
            routing,
            priority: raw
                .priority
                .or(legacy_priority)
                .unwrap_or(DEFAULT_RULE_PRIORITY),
            is_active: raw.is_active.unwrap_or(true),
        })
    }
}

/// Legacy rules were primary routing whenever they keyed on age or face amount.
fn legacy_routing(recommendations: &[LegacyRecommendation], condition: &ConditionNode) -> Routing {
    let mut carrier_ids: Vec<String> = Vec::new();
    let mut product_ids: Vec<String> = Vec::new();

    for recommendation in recommendations {
        if !carrier_ids.contains(&recommendation.carrier_id) {
            carrier_ids.push(recommendation.carrier_id.clone());
        }
        for product in &recommendation.product_ids {
            if !product_ids.contains(product) {
                product_ids.push(product.clone());
            }
        }
    }

    Routing {
        carrier_ids,
        product_ids: if product_ids.is_empty() {
            None
        } else {
            Some(product_ids)
        },
        is_primary_routing: condition.references_any(&PRIMARY_ROUTING_FACTS),
    }
}

/// Versioned, ordered collection of rules.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub version: Option<String>,
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Load a rule set from either `{ "version": ..., "rules": [...] }` or a bare array.
    /// Entries that fail to parse are skipped and reported; the rest still load.
    pub fn from_json(document: &Value) -> (Self, Vec<LoadIssue>) {
        let mut issues = Vec::new();

        let (version, entries) = match document {
            Value::Array(entries) => (None, entries.as_slice()),
            Value::Object(map) => {
                let version = map.get("version").and_then(|value| match value {
                    Value::String(text) => Some(text.clone()),
                    Value::Number(number) => Some(number.to_string()),
                    _ => None,
                });
                match map.get("rules") {
                    Some(Value::Array(entries)) => (version, entries.as_slice()),
                    _ => {
                        issues.push(LoadIssue::new("rules", "expected a `rules` array"));
                        (version, &[][..])
                    }
                }
            }
            _ => {
                issues.push(LoadIssue::new(
                    "$",
                    "expected a rule array or an object with a `rules` array",
                ));
                (None, &[][..])
            }
        };

        let mut rules = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            match serde_json::from_value::<Rule>(entry.clone()) {
                Ok(rule) => rules.push(rule),
                Err(err) => {
                    let location = format!("rules[{index}]");
                    warn!(%location, error = %err, "skipping malformed decision tree rule");
                    issues.push(LoadIssue::new(location, err.to_string()));
                }
            }
        }

        (Self { version, rules }, issues)
    }
}
