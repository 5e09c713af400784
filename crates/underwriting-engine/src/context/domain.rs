use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inbound analysis request mirroring the fields collected by the intake wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub client: ClientInfo,
    pub health: HealthInfo,
    pub coverage: CoverageRequest,
}

/// Client demographics. Required fields are validated upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub age: u32,
    #[serde(default)]
    pub gender: Option<String>,
    pub state: String,
    #[serde(default)]
    pub bmi: Option<f64>,
    #[serde(default)]
    pub height_inches: Option<f64>,
    #[serde(default)]
    pub weight_lbs: Option<f64>,
}

/// Disclosed health history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthInfo {
    #[serde(default)]
    pub conditions: Vec<ConditionResponse>,
    /// `None` when the intake never captured tobacco history.
    #[serde(default)]
    pub tobacco: Option<TobaccoInfo>,
    #[serde(default)]
    pub medications: MedicationInfo,
    /// Tier assigned by a previous analysis pass, if any.
    #[serde(default)]
    pub health_tier: Option<String>,
}

/// A disclosed condition and the follow-up answers captured for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionResponse {
    pub code: String,
    #[serde(default)]
    pub responses: BTreeMap<String, serde_json::Value>,
}

/// Nicotine usage history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TobaccoInfo {
    pub current_use: bool,
    #[serde(default, rename = "type")]
    pub tobacco_type: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub last_use_date: Option<NaiveDate>,
}

/// Medication disclosures. Every field is optional so "not asked" stays distinguishable from
/// "answered no".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MedicationInfo {
    #[serde(default)]
    pub bp_med_count: Option<u32>,
    #[serde(default)]
    pub cholesterol_med_count: Option<u32>,
    #[serde(default)]
    pub insulin_use: Option<bool>,
    #[serde(default)]
    pub blood_thinners: Option<bool>,
    #[serde(default)]
    pub antidepressants: Option<bool>,
    #[serde(default)]
    pub pain_medications: Option<PainMedicationLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PainMedicationLevel {
    None,
    OtcOnly,
    PrescribedNonOpioid,
    Opioid,
}

impl PainMedicationLevel {
    pub const fn label(self) -> &'static str {
        match self {
            PainMedicationLevel::None => "none",
            PainMedicationLevel::OtcOnly => "otc_only",
            PainMedicationLevel::PrescribedNonOpioid => "prescribed_non_opioid",
            PainMedicationLevel::Opioid => "opioid",
        }
    }
}

/// Requested coverage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRequest {
    pub face_amount: f64,
    #[serde(default)]
    pub product_types: Vec<String>,
}
