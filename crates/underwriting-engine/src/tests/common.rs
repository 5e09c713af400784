use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::context::{
    ClientInfo, ConditionResponse, CoverageRequest, EvaluationContext, HealthInfo, TobaccoInfo,
};
use crate::criteria::{
    AgeLimits, AgeTier, CarrierCriteriaEntry, Constraint, CriteriaByCarrier, CriterionSpec,
    FaceAmountLimits, KnockoutConditions,
};
use crate::tree::{ConditionNode, Operator, Routing, Rule};

pub(super) fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
}

pub(super) fn client(age: u32) -> ClientInfo {
    ClientInfo {
        age,
        gender: Some("female".to_string()),
        state: "tx".to_string(),
        bmi: Some(24.0),
        height_inches: None,
        weight_lbs: None,
    }
}

pub(super) fn coverage(face_amount: f64) -> CoverageRequest {
    CoverageRequest {
        face_amount,
        product_types: vec!["term".to_string()],
    }
}

pub(super) fn health_with_conditions(codes: &[&str]) -> HealthInfo {
    HealthInfo {
        conditions: codes
            .iter()
            .map(|code| ConditionResponse {
                code: code.to_string(),
                responses: Default::default(),
            })
            .collect(),
        tobacco: Some(TobaccoInfo::default()),
        ..HealthInfo::default()
    }
}

/// Scenario A applicant: age 45, BMI 24, no conditions, no tobacco, $250,000 term.
pub(super) fn baseline_context() -> EvaluationContext {
    EvaluationContext::build(&client(45), &health_with_conditions(&[]), &coverage(250_000.0), as_of())
}

pub(super) fn context_for(age: u32, codes: &[&str], face_amount: f64) -> EvaluationContext {
    EvaluationContext::build(
        &client(age),
        &health_with_conditions(codes),
        &coverage(face_amount),
        as_of(),
    )
}

pub(super) fn former_smoker_context(last_use: NaiveDate) -> EvaluationContext {
    let health = HealthInfo {
        tobacco: Some(TobaccoInfo {
            current_use: false,
            tobacco_type: Some("cigarettes".to_string()),
            frequency: None,
            last_use_date: Some(last_use),
        }),
        ..HealthInfo::default()
    };
    EvaluationContext::build(&client(45), &health, &coverage(250_000.0), as_of())
}

pub(super) fn leaf(fact: &str, operator: &str, value: Value) -> ConditionNode {
    ConditionNode::leaf(fact, Operator::parse(operator), value)
}

pub(super) fn rule(id: &str, name: &str, condition: ConditionNode, weight: f64) -> Rule {
    Rule {
        id: id.to_string(),
        name: name.to_string(),
        condition,
        weight,
        routing: Routing {
            carrier_ids: vec!["carrier-a".to_string()],
            product_ids: None,
            is_primary_routing: false,
        },
        priority: 100,
        is_active: true,
    }
}

/// Carrier criteria for ages 18-65 with a $500,000 tier covering ages 18-50.
pub(super) fn standard_criteria(knockouts: &[&str]) -> CriterionSpec {
    CriterionSpec {
        version: Some("2025-01".to_string()),
        constraints: vec![
            Constraint::AgeLimits(AgeLimits {
                min_issue_age: Some(18),
                max_issue_age: Some(65),
            }),
            Constraint::FaceAmountLimits(FaceAmountLimits {
                minimum: Some(25_000.0),
                maximum: Some(1_000_000.0),
                age_tiers: vec![AgeTier {
                    min_age: 18,
                    max_age: 50,
                    max_face_amount: 500_000.0,
                }],
            }),
            Constraint::KnockoutConditions(KnockoutConditions {
                condition_codes: knockouts.iter().map(|code| code.to_string()).collect(),
                descriptions: Vec::new(),
            }),
        ],
    }
}

pub(super) fn criteria_map(entries: Vec<(&str, CriterionSpec)>) -> CriteriaByCarrier {
    entries
        .into_iter()
        .map(|(carrier_id, criteria)| {
            (
                carrier_id.to_string(),
                CarrierCriteriaEntry {
                    carrier_name: format!("{carrier_id} Life"),
                    product_id: None,
                    product_name: None,
                    is_active: true,
                    criteria,
                },
            )
        })
        .collect()
}

pub(super) fn catalog_json() -> Value {
    json!({
        "carriers": [
            {
                "carrier_id": "carrier-a",
                "carrier_name": "Alpha Life",
                "products": [
                    {
                        "product_id": "a-term-20",
                        "product_name": "Alpha Term 20",
                        "product_type": "term",
                        "min_age": 18,
                        "max_age": 65,
                        "min_face_amount": 50000,
                        "max_face_amount": 2000000,
                        "metadata": {
                            "age_tiered_face_amounts": [
                                {"min_age": 18, "max_age": 50, "max_face_amount": 1000000},
                                {"min_age": 51, "max_age": 65, "max_face_amount": 500000}
                            ],
                            "knockout_conditions": ["als"],
                            "full_underwriting_threshold": {"face_amount_threshold": 200000}
                        }
                    },
                    {
                        "product_id": "a-whole",
                        "product_name": "Alpha Whole Life",
                        "product_type": "whole_life",
                        "min_age": 0,
                        "max_age": 85
                    }
                ]
            },
            {
                "carrier_id": "carrier-b",
                "carrier_name": "Beta Mutual",
                "products": [
                    {
                        "product_id": "b-term",
                        "product_name": "Beta Term",
                        "product_type": "term",
                        "min_age": 50,
                        "max_age": 80,
                        "min_face_amount": 10000,
                        "max_face_amount": 100000
                    }
                ]
            }
        ]
    })
}
