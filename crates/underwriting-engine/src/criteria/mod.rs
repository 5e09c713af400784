//! Carrier criteria: structured constraints per carrier and the fixed-order eligibility checks
//! applied to one applicant.

mod build;
mod constraints;
mod medications;
mod tobacco;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::EvaluationContext;
use crate::filtered::{CriteriaFilteredProduct, FilterRule, FilteredProducts};
use crate::format::format_currency;

pub use build::{
    BuildAssessment, BuildBasis, BuildRating, BuildRequirements, BuildThresholds, HeightWeightRow,
};
pub use constraints::{
    load_criteria_map, AgeLimits, AgeTier, CarrierCriteriaEntry, Constraint, CriteriaByCarrier,
    CriteriaCheck, CriteriaError, CriterionSpec, FaceAmountLimits, KnockoutConditions,
    KnockoutDescription, StateAvailability,
};
pub use medications::{MedicationAllowance, MedicationFindings, MedicationLimit, MedicationRestrictions};
pub use tobacco::{
    derive_tobacco_class, SmokingClassification, TobaccoAssessment, TobaccoRules,
    TobaccoTypeException, DEFAULT_NONSMOKER_CLEAN_MONTHS, NONSMOKER_CLASS, SMOKER_CLASS,
};

/// Outcome of one carrier's criteria for one applicant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CriteriaEvaluationResult {
    pub eligible: bool,
    pub reasons: Vec<String>,
    pub build_rating: Option<BuildRating>,
    pub tobacco_class: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// A carrier whose criteria could not be applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedCriteria {
    pub carrier_id: String,
    pub carrier_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CriteriaEvaluation {
    pub evaluation_results: BTreeMap<String, CriteriaEvaluationResult>,
    pub filtered_products: FilteredProducts,
    pub eligible_carrier_ids: Vec<String>,
    pub skipped: Vec<SkippedCriteria>,
}

impl CriteriaEvaluation {
    /// Carriers whose criteria were applied and failed.
    pub fn excluded_carrier_ids(&self) -> Vec<String> {
        self.evaluation_results
            .iter()
            .filter(|(_, result)| !result.eligible)
            .map(|(carrier_id, _)| carrier_id.clone())
            .collect()
    }

    pub fn is_excluded(&self, carrier_id: &str) -> bool {
        self.evaluation_results
            .get(carrier_id)
            .is_some_and(|result| !result.eligible)
    }
}

/// Validate the carrier's constraints, then apply them in check order.
pub fn evaluate_criteria(
    spec: &CriterionSpec,
    context: &EvaluationContext,
) -> Result<CriteriaEvaluationResult, CriteriaError> {
    spec.validate()?;
    Ok(apply_criteria(spec, context))
}

/// Apply every active carrier's criteria. Carriers with malformed criteria are reported in
/// `skipped` and stay eligible.
pub fn evaluate_criteria_for_carriers(
    criteria_by_carrier: &CriteriaByCarrier,
    context: &EvaluationContext,
) -> CriteriaEvaluation {
    let mut evaluation = CriteriaEvaluation::default();

    for (carrier_id, entry) in criteria_by_carrier {
        if !entry.is_active {
            debug!(carrier = %carrier_id, "criteria inactive; skipping");
            continue;
        }

        let result = match evaluate_criteria(&entry.criteria, context) {
            Ok(result) => result,
            Err(err) => {
                warn!(carrier = %carrier_id, error = %err, "malformed carrier criteria; failing open");
                evaluation.skipped.push(SkippedCriteria {
                    carrier_id: carrier_id.clone(),
                    carrier_name: entry.carrier_name.clone(),
                    reason: err.to_string(),
                });
                evaluation.eligible_carrier_ids.push(carrier_id.clone());
                continue;
            }
        };

        debug!(
            carrier = %carrier_id,
            eligible = result.eligible,
            reasons = result.reasons.len(),
            "carrier criteria evaluated"
        );

        if result.eligible {
            evaluation.eligible_carrier_ids.push(carrier_id.clone());
        } else {
            evaluation
                .filtered_products
                .extend(result.reasons.iter().map(|reason| CriteriaFilteredProduct {
                    carrier_id: carrier_id.clone(),
                    carrier_name: entry.carrier_name.clone(),
                    product_id: entry.product_id.clone(),
                    product_name: entry.product_name.clone(),
                    rule: FilterRule::Criteria,
                    reason: reason.clone(),
                }));
        }

        evaluation.evaluation_results.insert(carrier_id.clone(), result);
    }

    evaluation.filtered_products.dedup();
    evaluation
}

#[derive(Default)]
struct Findings {
    reasons: Vec<String>,
    warnings: Vec<String>,
}

fn apply_criteria(spec: &CriterionSpec, context: &EvaluationContext) -> CriteriaEvaluationResult {
    let mut findings = Findings::default();
    let mut build_rating = None;
    let mut tobacco_class = None;

    for check in CriteriaCheck::ordered() {
        let constraint = spec.constraints_for(check).next();
        match (check, constraint) {
            (CriteriaCheck::StateAvailability, Some(Constraint::StateAvailability(states))) => {
                check_state(states, context, &mut findings);
            }
            (CriteriaCheck::AgeLimits, Some(Constraint::AgeLimits(limits))) => {
                check_age(limits, context, &mut findings);
            }
            (CriteriaCheck::FaceAmountLimits, constraint) => {
                let limits = match constraint {
                    Some(Constraint::FaceAmountLimits(limits)) => Some(limits),
                    _ => None,
                };
                check_face_amount(limits, context, &mut findings);
            }
            (CriteriaCheck::KnockoutConditions, Some(Constraint::KnockoutConditions(knockouts))) => {
                check_knockouts(knockouts, context, &mut findings);
            }
            (CriteriaCheck::BuildRequirements, constraint) => {
                let default_requirements;
                let requirements = match constraint {
                    Some(Constraint::BuildRequirements(requirements)) => requirements,
                    _ => {
                        default_requirements = BuildRequirements::default();
                        &default_requirements
                    }
                };
                let assessment = requirements.assess(context);
                findings.reasons.extend(assessment.reason);
                findings.warnings.extend(assessment.warning);
                build_rating = assessment.rating;
            }
            (CriteriaCheck::TobaccoRules, constraint) => {
                let rules = match constraint {
                    Some(Constraint::TobaccoRules(rules)) => Some(rules),
                    _ => None,
                };
                tobacco_class = Some(check_tobacco(rules, context, &mut findings));
            }
            (CriteriaCheck::MedicationRestrictions, Some(Constraint::MedicationRestrictions(restrictions))) => {
                let medication = restrictions.assess(context.medications());
                findings.reasons.extend(medication.reasons);
                findings.warnings.extend(medication.warnings);
            }
            _ => {}
        }
    }

    CriteriaEvaluationResult {
        eligible: findings.reasons.is_empty(),
        reasons: findings.reasons,
        build_rating,
        tobacco_class,
        warnings: findings.warnings,
    }
}

fn check_state(states: &StateAvailability, context: &EvaluationContext, findings: &mut Findings) {
    let state = context.state();
    if state.is_empty() {
        if !states.available_states.is_empty() {
            findings.reasons.push("state not provided".to_string());
        }
        return;
    }

    let listed = |list: &[String]| list.iter().any(|entry| entry.trim().eq_ignore_ascii_case(state));

    if listed(&states.unavailable_states)
        || (!states.available_states.is_empty() && !listed(&states.available_states))
    {
        findings.reasons.push(format!("not available in state: {state}"));
    }
}

fn check_age(limits: &AgeLimits, context: &EvaluationContext, findings: &mut Findings) {
    let age = context.age();
    if let Some(min) = limits.min_issue_age {
        if age < min {
            findings
                .reasons
                .push(format!("age {age} below minimum issue age {min}"));
        }
    }
    if let Some(max) = limits.max_issue_age {
        if age > max {
            findings
                .reasons
                .push(format!("age {age} above maximum issue age {max}"));
        }
    }
}

fn check_face_amount(
    limits: Option<&FaceAmountLimits>,
    context: &EvaluationContext,
    findings: &mut Findings,
) {
    let face_amount = context.face_amount();
    if !face_amount.is_finite() || face_amount <= 0.0 {
        findings
            .reasons
            .push(format!("invalid face amount: {}", format_currency(face_amount)));
        return;
    }

    let Some(limits) = limits else { return };

    if let Some(minimum) = limits.minimum {
        if face_amount < minimum {
            findings.reasons.push(format!(
                "face amount {} below minimum {}",
                format_currency(face_amount),
                format_currency(minimum)
            ));
        }
    }

    let age = context.age();
    if let (Some(maximum), tiered) = limits.applicable_maximum(age) {
        if face_amount > maximum {
            let scope = if tiered {
                format!(" for age {age}")
            } else {
                String::new()
            };
            findings.reasons.push(format!(
                "face amount {} exceeds maximum {}{scope}",
                format_currency(face_amount),
                format_currency(maximum)
            ));
        }
    }
}

fn check_knockouts(knockouts: &KnockoutConditions, context: &EvaluationContext, findings: &mut Findings) {
    for code in &knockouts.condition_codes {
        let code = code.trim();
        if !context.has_condition(code) {
            continue;
        }
        match knockouts.name_for(code) {
            Some(name) => findings
                .reasons
                .push(format!("knockout condition: {code} ({name})")),
            None => findings.reasons.push(format!("knockout condition: {code}")),
        }
    }
}

fn check_tobacco(
    rules: Option<&TobaccoRules>,
    context: &EvaluationContext,
    findings: &mut Findings,
) -> String {
    let assessment = derive_tobacco_class(rules, context.tobacco(), context.as_of());
    debug!(class = %assessment.class, detail = %assessment.detail, "tobacco class derived");

    if let Some(rules) = rules {
        if rules.disqualifies(&assessment.class) {
            findings
                .reasons
                .push(format!("tobacco class {} not accepted", assessment.class));
        }
        if !assessment.disclosed {
            findings
                .warnings
                .push(format!("tobacco history not provided; rated as {}", assessment.class));
        }
        if rules.nicotine_test_required {
            findings
                .warnings
                .push("carrier requires a nicotine test".to_string());
        }
    }

    assessment.class
}
