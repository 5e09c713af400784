use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Facts a decision-tree leaf may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKey {
    Age,
    Gender,
    State,
    Bmi,
    HeightInches,
    WeightLbs,
    Tobacco,
    TobaccoType,
    TobaccoFrequency,
    TobaccoLastUse,
    FaceAmount,
    Conditions,
    ProductTypes,
    HealthTier,
    BpMedCount,
    CholesterolMedCount,
    InsulinUse,
    BloodThinners,
    Antidepressants,
    PainMedications,
}

impl FactKey {
    pub const fn label(self) -> &'static str {
        match self {
            FactKey::Age => "age",
            FactKey::Gender => "gender",
            FactKey::State => "state",
            FactKey::Bmi => "bmi",
            FactKey::HeightInches => "height_inches",
            FactKey::WeightLbs => "weight_lbs",
            FactKey::Tobacco => "tobacco",
            FactKey::TobaccoType => "tobacco_type",
            FactKey::TobaccoFrequency => "tobacco_frequency",
            FactKey::TobaccoLastUse => "tobacco_last_use",
            FactKey::FaceAmount => "face_amount",
            FactKey::Conditions => "conditions",
            FactKey::ProductTypes => "product_types",
            FactKey::HealthTier => "health_tier",
            FactKey::BpMedCount => "bp_med_count",
            FactKey::CholesterolMedCount => "cholesterol_med_count",
            FactKey::InsulinUse => "insulin_use",
            FactKey::BloodThinners => "blood_thinners",
            FactKey::Antidepressants => "antidepressants",
            FactKey::PainMedications => "pain_medications",
        }
    }

    /// Resolve an authored fact name, accepting the legacy aliases used by older rule sets.
    pub fn from_name(name: &str) -> Option<Self> {
        let key = match snake_case(name.trim()).as_str() {
            "age" => FactKey::Age,
            "gender" => FactKey::Gender,
            "state" => FactKey::State,
            "bmi" => FactKey::Bmi,
            "height_inches" | "height" => FactKey::HeightInches,
            "weight_lbs" | "weight" => FactKey::WeightLbs,
            "tobacco" | "tobacco_use" => FactKey::Tobacco,
            "tobacco_type" => FactKey::TobaccoType,
            "tobacco_frequency" => FactKey::TobaccoFrequency,
            "tobacco_last_use" | "tobacco_last_use_date" => FactKey::TobaccoLastUse,
            "face_amount" => FactKey::FaceAmount,
            "conditions" | "condition_codes" | "condition_present" => FactKey::Conditions,
            "product_types" | "product_type" => FactKey::ProductTypes,
            "health_tier" => FactKey::HealthTier,
            "bp_med_count" => FactKey::BpMedCount,
            "cholesterol_med_count" => FactKey::CholesterolMedCount,
            "insulin_use" => FactKey::InsulinUse,
            "blood_thinners" => FactKey::BloodThinners,
            "antidepressants" => FactKey::Antidepressants,
            "pain_medications" => FactKey::PainMedications,
            _ => return None,
        };
        Some(key)
    }
}

/// `faceAmount` and `face_amount` name the same fact.
fn snake_case(name: &str) -> String {
    if !name.chars().any(|ch| ch.is_ascii_lowercase()) {
        return name.to_ascii_lowercase();
    }

    let mut out = String::with_capacity(name.len() + 4);
    for (index, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if index > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Value representation for a fact so leaf operators can consume structured data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FactValue {
    Boolean(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
    Date(NaiveDate),
}

impl FactValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FactValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FactValue::Date(date) => Some(*date),
            _ => None,
        }
    }
}

/// Whole years elapsed between `from` and `to`; `None` when `from` lies in the future.
pub fn completed_years_between(from: NaiveDate, to: NaiveDate) -> Option<u32> {
    completed_months_between(from, to).map(|months| months / 12)
}

/// Whole calendar months elapsed between `from` and `to`; `None` when `from` lies in the future.
pub fn completed_months_between(from: NaiveDate, to: NaiveDate) -> Option<u32> {
    if from > to {
        return None;
    }

    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }

    u32::try_from(months.max(0)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn months_count_only_completed_periods() {
        assert_eq!(completed_months_between(date(2024, 1, 15), date(2024, 3, 14)), Some(1));
        assert_eq!(completed_months_between(date(2024, 1, 15), date(2024, 3, 15)), Some(2));
        assert_eq!(completed_months_between(date(2024, 3, 15), date(2024, 1, 15)), None);
    }

    #[test]
    fn years_respect_anniversary() {
        assert_eq!(completed_years_between(date(2020, 6, 1), date(2023, 5, 31)), Some(2));
        assert_eq!(completed_years_between(date(2020, 6, 1), date(2023, 6, 1)), Some(3));
    }

    #[test]
    fn legacy_aliases_resolve() {
        assert_eq!(FactKey::from_name("condition_present"), Some(FactKey::Conditions));
        assert_eq!(FactKey::from_name(" Face_Amount "), Some(FactKey::FaceAmount));
        assert_eq!(FactKey::from_name("faceAmount"), Some(FactKey::FaceAmount));
        assert_eq!(FactKey::from_name("BMI"), Some(FactKey::Bmi));
        assert_eq!(FactKey::from_name("credit_score"), None);
    }
}
