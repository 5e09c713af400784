//! Normalization of an inbound analysis request into the immutable fact set consumed by the
//! decision-tree and criteria evaluators.

pub mod domain;
mod facts;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

pub use domain::{
    AnalysisRequest, ClientInfo, ConditionResponse, CoverageRequest, HealthInfo, MedicationInfo,
    PainMedicationLevel, TobaccoInfo,
};
pub use facts::{completed_months_between, completed_years_between, FactKey, FactValue};

const BMI_IMPERIAL_FACTOR: f64 = 703.0;

/// Canonical, read-only view of one applicant. Built once per request and only ever borrowed
/// by the evaluators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationContext {
    as_of: NaiveDate,
    age: u32,
    gender: Option<String>,
    state: String,
    bmi: Option<f64>,
    height_inches: Option<f64>,
    weight_lbs: Option<f64>,
    tobacco: Option<TobaccoInfo>,
    condition_codes: Vec<String>,
    face_amount: f64,
    product_types: Vec<String>,
    medications: MedicationInfo,
    health_tier: Option<String>,
    facts: BTreeMap<FactKey, FactValue>,
}

impl EvaluationContext {
    /// Build the context from validated request sections. `as_of` anchors every
    /// "time since" computation so evaluation never consults the clock.
    pub fn build(
        client: &ClientInfo,
        health: &HealthInfo,
        coverage: &CoverageRequest,
        as_of: NaiveDate,
    ) -> Self {
        let state = client.state.trim().to_ascii_uppercase();
        let gender = normalized_text(client.gender.as_deref());
        let height_inches = client.height_inches.filter(|value| value.is_finite() && *value > 0.0);
        let weight_lbs = client.weight_lbs.filter(|value| value.is_finite() && *value > 0.0);
        let bmi = client
            .bmi
            .filter(|value| value.is_finite() && *value > 0.0)
            .or_else(|| derive_bmi(height_inches, weight_lbs));

        let mut condition_codes: Vec<String> = Vec::with_capacity(health.conditions.len());
        for condition in &health.conditions {
            let code = condition.code.trim();
            if !code.is_empty() && !condition_codes.iter().any(|existing| existing == code) {
                condition_codes.push(code.to_string());
            }
        }

        let product_types: Vec<String> = coverage
            .product_types
            .iter()
            .map(|kind| kind.trim().to_string())
            .filter(|kind| !kind.is_empty())
            .collect();

        let tobacco = health.tobacco.as_ref().map(|tobacco| TobaccoInfo {
            current_use: tobacco.current_use,
            tobacco_type: normalized_text(tobacco.tobacco_type.as_deref()),
            frequency: normalized_text(tobacco.frequency.as_deref()),
            last_use_date: tobacco.last_use_date,
        });
        let health_tier = normalized_text(health.health_tier.as_deref());

        let mut context = Self {
            as_of,
            age: client.age,
            gender,
            state,
            bmi,
            height_inches,
            weight_lbs,
            tobacco,
            condition_codes,
            face_amount: coverage.face_amount,
            product_types,
            medications: health.medications.clone(),
            health_tier,
            facts: BTreeMap::new(),
        };
        context.facts = context.collect_facts();
        context
    }

    pub fn from_request(request: &AnalysisRequest, as_of: NaiveDate) -> Self {
        Self::build(&request.client, &request.health, &request.coverage, as_of)
    }

    /// Second-pass variant carrying a health tier assigned after the first analysis.
    pub fn with_health_tier(self, tier: impl Into<String>) -> Self {
        let mut next = self;
        next.health_tier = normalized_text(Some(&tier.into()));
        next.facts = next.collect_facts();
        next
    }

    fn collect_facts(&self) -> BTreeMap<FactKey, FactValue> {
        let mut facts = BTreeMap::new();
        facts.insert(FactKey::Age, FactValue::Number(f64::from(self.age)));
        if !self.state.is_empty() {
            facts.insert(FactKey::State, FactValue::Text(self.state.clone()));
        }
        if let Some(gender) = &self.gender {
            facts.insert(FactKey::Gender, FactValue::Text(gender.clone()));
        }
        if let Some(bmi) = self.bmi {
            facts.insert(FactKey::Bmi, FactValue::Number(bmi));
        }
        if let Some(height) = self.height_inches {
            facts.insert(FactKey::HeightInches, FactValue::Number(height));
        }
        if let Some(weight) = self.weight_lbs {
            facts.insert(FactKey::WeightLbs, FactValue::Number(weight));
        }

        if let Some(tobacco) = &self.tobacco {
            facts.insert(FactKey::Tobacco, FactValue::Boolean(tobacco.current_use));
            if let Some(kind) = &tobacco.tobacco_type {
                facts.insert(FactKey::TobaccoType, FactValue::Text(kind.clone()));
            }
            if let Some(frequency) = &tobacco.frequency {
                facts.insert(FactKey::TobaccoFrequency, FactValue::Text(frequency.clone()));
            }
            if let Some(last_use) = tobacco.last_use_date {
                facts.insert(FactKey::TobaccoLastUse, FactValue::Date(last_use));
            }
        }

        facts.insert(FactKey::FaceAmount, FactValue::Number(self.face_amount));
        facts.insert(
            FactKey::Conditions,
            FactValue::List(self.condition_codes.clone()),
        );
        facts.insert(
            FactKey::ProductTypes,
            FactValue::List(self.product_types.clone()),
        );
        if let Some(tier) = &self.health_tier {
            facts.insert(FactKey::HealthTier, FactValue::Text(tier.clone()));
        }

        let meds = &self.medications;
        if let Some(count) = meds.bp_med_count {
            facts.insert(FactKey::BpMedCount, FactValue::Number(f64::from(count)));
        }
        if let Some(count) = meds.cholesterol_med_count {
            facts.insert(
                FactKey::CholesterolMedCount,
                FactValue::Number(f64::from(count)),
            );
        }
        if let Some(flag) = meds.insulin_use {
            facts.insert(FactKey::InsulinUse, FactValue::Boolean(flag));
        }
        if let Some(flag) = meds.blood_thinners {
            facts.insert(FactKey::BloodThinners, FactValue::Boolean(flag));
        }
        if let Some(flag) = meds.antidepressants {
            facts.insert(FactKey::Antidepressants, FactValue::Boolean(flag));
        }
        if let Some(level) = meds.pain_medications {
            facts.insert(
                FactKey::PainMedications,
                FactValue::Text(level.label().to_string()),
            );
        }

        facts
    }

    pub fn fact(&self, key: FactKey) -> Option<&FactValue> {
        self.facts.get(&key)
    }

    pub fn facts(&self) -> &BTreeMap<FactKey, FactValue> {
        &self.facts
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn gender(&self) -> Option<&str> {
        self.gender.as_deref()
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn bmi(&self) -> Option<f64> {
        self.bmi
    }

    pub fn height_inches(&self) -> Option<f64> {
        self.height_inches
    }

    pub fn weight_lbs(&self) -> Option<f64> {
        self.weight_lbs
    }

    /// `None` when tobacco history was not disclosed.
    pub fn tobacco(&self) -> Option<&TobaccoInfo> {
        self.tobacco.as_ref()
    }

    pub fn condition_codes(&self) -> &[String] {
        &self.condition_codes
    }

    pub fn has_condition(&self, code: &str) -> bool {
        self.condition_codes.iter().any(|existing| existing == code)
    }

    pub fn face_amount(&self) -> f64 {
        self.face_amount
    }

    pub fn product_types(&self) -> &[String] {
        &self.product_types
    }

    pub fn medications(&self) -> &MedicationInfo {
        &self.medications
    }

    pub fn health_tier(&self) -> Option<&str> {
        self.health_tier.as_deref()
    }
}

fn normalized_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn derive_bmi(height_inches: Option<f64>, weight_lbs: Option<f64>) -> Option<f64> {
    match (height_inches, weight_lbs) {
        (Some(height), Some(weight)) => Some(BMI_IMPERIAL_FACTOR * weight / (height * height)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
    }

    fn client() -> ClientInfo {
        ClientInfo {
            age: 52,
            gender: Some(" female ".to_string()),
            state: " tx".to_string(),
            bmi: None,
            height_inches: Some(65.0),
            weight_lbs: Some(150.0),
        }
    }

    #[test]
    fn normalizes_state_and_derives_bmi() {
        let coverage = CoverageRequest {
            face_amount: 100_000.0,
            product_types: vec!["term_life".to_string()],
        };
        let context = EvaluationContext::build(&client(), &HealthInfo::default(), &coverage, as_of());

        assert_eq!(context.state(), "TX");
        assert_eq!(context.gender(), Some("female"));
        let bmi = context.bmi().expect("bmi derived from height and weight");
        assert!((bmi - 24.96).abs() < 0.01);
        assert_eq!(context.fact(FactKey::Bmi), Some(&FactValue::Number(bmi)));
    }

    #[test]
    fn absent_optionals_stay_absent() {
        let coverage = CoverageRequest {
            face_amount: 100_000.0,
            product_types: Vec::new(),
        };
        let context = EvaluationContext::build(&client(), &HealthInfo::default(), &coverage, as_of());

        assert!(context.fact(FactKey::InsulinUse).is_none());
        assert!(context.fact(FactKey::TobaccoLastUse).is_none());
        assert!(context.fact(FactKey::HealthTier).is_none());
        assert!(context.fact(FactKey::Tobacco).is_none());
        assert!(context.tobacco().is_none());
    }

    #[test]
    fn disclosed_non_user_is_explicitly_false() {
        let coverage = CoverageRequest {
            face_amount: 100_000.0,
            product_types: Vec::new(),
        };
        let health = HealthInfo {
            tobacco: Some(TobaccoInfo::default()),
            ..HealthInfo::default()
        };
        let context = EvaluationContext::build(&client(), &health, &coverage, as_of());

        assert_eq!(context.fact(FactKey::Tobacco), Some(&FactValue::Boolean(false)));
    }

    #[test]
    fn condition_codes_are_deduplicated_in_order() {
        let health = HealthInfo {
            conditions: ["diabetes_type_2", " copd ", "diabetes_type_2", ""]
                .iter()
                .map(|code| ConditionResponse {
                    code: code.to_string(),
                    responses: BTreeMap::new(),
                })
                .collect(),
            ..HealthInfo::default()
        };
        let coverage = CoverageRequest {
            face_amount: 50_000.0,
            product_types: Vec::new(),
        };
        let context = EvaluationContext::build(&client(), &health, &coverage, as_of());

        assert_eq!(context.condition_codes(), ["diabetes_type_2", "copd"]);
    }

    #[test]
    fn health_tier_can_be_supplied_for_second_pass() {
        let coverage = CoverageRequest {
            face_amount: 50_000.0,
            product_types: Vec::new(),
        };
        let context = EvaluationContext::build(&client(), &HealthInfo::default(), &coverage, as_of())
            .with_health_tier("standard");

        assert_eq!(
            context.fact(FactKey::HealthTier),
            Some(&FactValue::Text("standard".to_string()))
        );
    }
}
