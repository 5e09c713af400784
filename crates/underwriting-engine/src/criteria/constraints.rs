use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::build::BuildRequirements;
use super::medications::MedicationRestrictions;
use super::tobacco::TobaccoRules;
use crate::error::LoadIssue;

/// Carrier criteria keyed by carrier id, one entry per carrier. An entry's `product_id` labels
/// the products it filters; it does not allow a second entry for the same carrier. Ordered so
/// batch evaluation is reproducible.
pub type CriteriaByCarrier = BTreeMap<String, CarrierCriteriaEntry>;

/// Structural problems that make a carrier's criteria unusable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CriteriaError {
    #[error("{0} constraint declared more than once")]
    DuplicateConstraint(&'static str),
    #[error("minimum issue age {min} exceeds maximum issue age {max}")]
    InvertedAgeRange { min: u32, max: u32 },
    #[error("face amount {field} must be a non-negative number (found {value})")]
    InvalidFaceAmount { field: &'static str, value: f64 },
    #[error("minimum face amount {min} exceeds maximum {max}")]
    InvertedFaceRange { min: f64, max: f64 },
    #[error("age tier {index} spans {min_age}-{max_age}")]
    InvertedAgeTier {
        index: usize,
        min_age: u32,
        max_age: u32,
    },
    #[error("knockout list contains an empty condition code")]
    EmptyKnockoutCode,
    #[error("build threshold {field} must be a positive number (found {value})")]
    InvalidBuildThreshold { field: &'static str, value: f64 },
    #[error("build threshold {lower} exceeds {upper}")]
    BuildThresholdsOutOfOrder {
        lower: &'static str,
        upper: &'static str,
    },
    #[error("tobacco classification names must not be empty")]
    EmptyTobaccoClass,
    #[error("state list contains an empty state code")]
    EmptyStateCode,
}

/// The seven eligibility checks, in the order they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriteriaCheck {
    StateAvailability,
    AgeLimits,
    FaceAmountLimits,
    KnockoutConditions,
    BuildRequirements,
    TobaccoRules,
    MedicationRestrictions,
}

impl CriteriaCheck {
    pub const fn ordered() -> [CriteriaCheck; 7] {
        [
            CriteriaCheck::StateAvailability,
            CriteriaCheck::AgeLimits,
            CriteriaCheck::FaceAmountLimits,
            CriteriaCheck::KnockoutConditions,
            CriteriaCheck::BuildRequirements,
            CriteriaCheck::TobaccoRules,
            CriteriaCheck::MedicationRestrictions,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            CriteriaCheck::StateAvailability => "state_availability",
            CriteriaCheck::AgeLimits => "age_limits",
            CriteriaCheck::FaceAmountLimits => "face_amount_limits",
            CriteriaCheck::KnockoutConditions => "knockout_conditions",
            CriteriaCheck::BuildRequirements => "build_requirements",
            CriteriaCheck::TobaccoRules => "tobacco_rules",
            CriteriaCheck::MedicationRestrictions => "medication_restrictions",
        }
    }
}

/// Versioned carrier criteria: one tagged entry per constraint kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CriterionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    StateAvailability(StateAvailability),
    AgeLimits(AgeLimits),
    FaceAmountLimits(FaceAmountLimits),
    KnockoutConditions(KnockoutConditions),
    BuildRequirements(BuildRequirements),
    TobaccoRules(TobaccoRules),
    MedicationRestrictions(MedicationRestrictions),
}

impl Constraint {
    pub const fn check(&self) -> CriteriaCheck {
        match self {
            Constraint::StateAvailability(_) => CriteriaCheck::StateAvailability,
            Constraint::AgeLimits(_) => CriteriaCheck::AgeLimits,
            Constraint::FaceAmountLimits(_) => CriteriaCheck::FaceAmountLimits,
            Constraint::KnockoutConditions(_) => CriteriaCheck::KnockoutConditions,
            Constraint::BuildRequirements(_) => CriteriaCheck::BuildRequirements,
            Constraint::TobaccoRules(_) => CriteriaCheck::TobaccoRules,
            Constraint::MedicationRestrictions(_) => CriteriaCheck::MedicationRestrictions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateAvailability {
    /// When non-empty, the product is sold only in these states.
    #[serde(default)]
    pub available_states: Vec<String>,
    #[serde(default)]
    pub unavailable_states: Vec<String>,
}

/// Issue ages, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgeLimits {
    #[serde(default)]
    pub min_issue_age: Option<u32>,
    #[serde(default)]
    pub max_issue_age: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceAmountLimits {
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub age_tiers: Vec<AgeTier>,
}

impl FaceAmountLimits {
    /// Maximum that applies at `age`: the lowest matching tier, never above the flat maximum.
    /// Overlapping tiers resolve to the most restrictive one.
    pub fn applicable_maximum(&self, age: u32) -> (Option<f64>, bool) {
        let tier_max = self
            .age_tiers
            .iter()
            .filter(|tier| tier.contains(age))
            .map(|tier| tier.max_face_amount)
            .fold(None, |lowest: Option<f64>, amount| {
                Some(lowest.map_or(amount, |current| current.min(amount)))
            });

        match (tier_max, self.maximum) {
            (Some(tier), Some(flat)) => (Some(tier.min(flat)), true),
            (Some(tier), None) => (Some(tier), true),
            (None, flat) => (flat, false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeTier {
    pub min_age: u32,
    pub max_age: u32,
    pub max_face_amount: f64,
}

impl AgeTier {
    pub fn contains(&self, age: u32) -> bool {
        age >= self.min_age && age <= self.max_age
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KnockoutConditions {
    pub condition_codes: Vec<String>,
    #[serde(default)]
    pub descriptions: Vec<KnockoutDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnockoutDescription {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub severity: Option<String>,
}

impl KnockoutConditions {
    /// Friendly name published for `code`, if any.
    pub fn name_for(&self, code: &str) -> Option<&str> {
        self.descriptions
            .iter()
            .find(|description| description.code.trim() == code)
            .map(|description| description.name.trim())
            .filter(|name| !name.is_empty())
    }
}

impl CriterionSpec {
    pub fn constraints_for(&self, check: CriteriaCheck) -> impl Iterator<Item = &Constraint> {
        self.constraints
            .iter()
            .filter(move |constraint| constraint.check() == check)
    }

    /// Structural validation performed before a carrier's criteria are applied.
    pub fn validate(&self) -> Result<(), CriteriaError> {
        for check in CriteriaCheck::ordered() {
            if self.constraints_for(check).count() > 1 {
                return Err(CriteriaError::DuplicateConstraint(check.label()));
            }
        }

        for constraint in &self.constraints {
            match constraint {
                Constraint::StateAvailability(states) => {
                    if states
                        .available_states
                        .iter()
                        .chain(&states.unavailable_states)
                        .any(|state| state.trim().is_empty())
                    {
                        return Err(CriteriaError::EmptyStateCode);
                    }
                }
                Constraint::AgeLimits(limits) => {
                    if let (Some(min), Some(max)) = (limits.min_issue_age, limits.max_issue_age) {
                        if min > max {
                            return Err(CriteriaError::InvertedAgeRange { min, max });
                        }
                    }
                }
                Constraint::FaceAmountLimits(limits) => validate_face_limits(limits)?,
                Constraint::KnockoutConditions(knockouts) => {
                    if knockouts
                        .condition_codes
                        .iter()
                        .any(|code| code.trim().is_empty())
                    {
                        return Err(CriteriaError::EmptyKnockoutCode);
                    }
                }
                Constraint::BuildRequirements(build) => build.validate()?,
                Constraint::TobaccoRules(tobacco) => tobacco.validate()?,
                Constraint::MedicationRestrictions(_) => {}
            }
        }

        Ok(())
    }
}

fn validate_face_limits(limits: &FaceAmountLimits) -> Result<(), CriteriaError> {
    let checked = [("minimum", limits.minimum), ("maximum", limits.maximum)];
    for (field, value) in checked {
        if let Some(value) = value {
            if !value.is_finite() || value < 0.0 {
                return Err(CriteriaError::InvalidFaceAmount { field, value });
            }
        }
    }

    if let (Some(min), Some(max)) = (limits.minimum, limits.maximum) {
        if min > max {
            return Err(CriteriaError::InvertedFaceRange { min, max });
        }
    }

    for (index, tier) in limits.age_tiers.iter().enumerate() {
        if tier.min_age > tier.max_age {
            return Err(CriteriaError::InvertedAgeTier {
                index,
                min_age: tier.min_age,
                max_age: tier.max_age,
            });
        }
        if !tier.max_face_amount.is_finite() || tier.max_face_amount < 0.0 {
            return Err(CriteriaError::InvalidFaceAmount {
                field: "age_tiers.max_face_amount",
                value: tier.max_face_amount,
            });
        }
    }

    Ok(())
}

/// Active criteria for one carrier (optionally scoped to one product).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierCriteriaEntry {
    pub carrier_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub criteria: CriterionSpec,
}

fn default_active() -> bool {
    true
}

/// Load `{ "<carrier id>": { carrier_name, criteria, ... }, ... }`, skipping carriers whose
/// entry does not parse.
pub fn load_criteria_map(document: &Value) -> (CriteriaByCarrier, Vec<LoadIssue>) {
    let mut criteria = CriteriaByCarrier::new();
    let mut issues = Vec::new();

    let Value::Object(entries) = document else {
        issues.push(LoadIssue::new("$", "expected an object keyed by carrier id"));
        return (criteria, issues);
    };

    for (carrier_id, entry) in entries {
        if entry.is_array() {
            warn!(carrier = %carrier_id, "multiple criteria entries for one carrier; skipping");
            issues.push(LoadIssue::new(
                carrier_id.clone(),
                "expected one criteria entry per carrier, found a list",
            ));
            continue;
        }
        match serde_json::from_value::<CarrierCriteriaEntry>(entry.clone()) {
            Ok(parsed) => {
                criteria.insert(carrier_id.clone(), parsed);
            }
            Err(err) => {
                warn!(carrier = %carrier_id, error = %err, "skipping unparseable carrier criteria");
                issues.push(LoadIssue::new(carrier_id.clone(), err.to_string()));
            }
        }
    }

    (criteria, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overlapping_tiers_use_most_restrictive_maximum() {
        let limits = FaceAmountLimits {
            minimum: Some(25_000.0),
            maximum: Some(1_000_000.0),
            age_tiers: vec![
                AgeTier {
                    min_age: 18,
                    max_age: 70,
                    max_face_amount: 500_000.0,
                },
                AgeTier {
                    min_age: 60,
                    max_age: 70,
                    max_face_amount: 250_000.0,
                },
            ],
        };

        assert_eq!(limits.applicable_maximum(45), (Some(500_000.0), true));
        assert_eq!(limits.applicable_maximum(65), (Some(250_000.0), true));
        assert_eq!(limits.applicable_maximum(75), (Some(1_000_000.0), false));
    }

    #[test]
    fn duplicate_constraints_are_malformed() {
        let spec = CriterionSpec {
            version: None,
            constraints: vec![
                Constraint::AgeLimits(AgeLimits::default()),
                Constraint::AgeLimits(AgeLimits::default()),
            ],
        };
        assert_eq!(
            spec.validate(),
            Err(CriteriaError::DuplicateConstraint("age_limits"))
        );
    }

    #[test]
    fn inverted_age_range_is_malformed() {
        let spec = CriterionSpec {
            version: Some("2".to_string()),
            constraints: vec![Constraint::AgeLimits(AgeLimits {
                min_issue_age: Some(70),
                max_issue_age: Some(18),
            })],
        };
        assert!(matches!(
            spec.validate(),
            Err(CriteriaError::InvertedAgeRange { min: 70, max: 18 })
        ));
    }

    #[test]
    fn constraints_deserialize_from_tagged_json() {
        let spec: CriterionSpec = serde_json::from_value(json!({
            "version": "2025-01",
            "constraints": [
                {"kind": "age_limits", "min_issue_age": 18, "max_issue_age": 65},
                {"kind": "knockout_conditions", "condition_codes": ["copd", "als"]}
            ]
        }))
        .expect("criteria parse");

        assert_eq!(spec.constraints.len(), 2);
        assert_eq!(spec.constraints[1].check(), CriteriaCheck::KnockoutConditions);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn loader_skips_unparseable_carriers() {
        let document = json!({
            "carrier-a": {"carrier_name": "Alpha Life", "criteria": {"constraints": []}},
            "carrier-b": {"carrier_name": "Beta Mutual", "criteria": {"constraints": [{"kind": "teleport"}]}}
        });

        let (criteria, issues) = load_criteria_map(&document);

        assert!(criteria.contains_key("carrier-a"));
        assert!(!criteria.contains_key("carrier-b"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].location, "carrier-b");
    }

    #[test]
    fn product_scoped_entries_are_one_per_carrier() {
        let document = json!({
            "carrier-a": {
                "carrier_name": "Alpha Life",
                "product_id": "a-term-20",
                "criteria": {"constraints": []}
            },
            "carrier-b": [
                {"carrier_name": "Beta Mutual", "product_id": "b-term", "criteria": {"constraints": []}},
                {"carrier_name": "Beta Mutual", "product_id": "b-whole", "criteria": {"constraints": []}}
            ]
        });

        let (criteria, issues) = load_criteria_map(&document);

        assert_eq!(criteria["carrier-a"].product_id.as_deref(), Some("a-term-20"));
        assert!(!criteria.contains_key("carrier-b"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].location, "carrier-b");
        assert_eq!(
            issues[0].message,
            "expected one criteria entry per carrier, found a list"
        );
    }
}
