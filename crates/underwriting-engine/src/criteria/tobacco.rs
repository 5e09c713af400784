use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::constraints::CriteriaError;
use crate::context::{completed_months_between, TobaccoInfo};

pub const SMOKER_CLASS: &str = "smoker";
pub const NONSMOKER_CLASS: &str = "nonsmoker";

/// Clean months required for non-smoker rates when a carrier publishes no tobacco rules.
pub const DEFAULT_NONSMOKER_CLEAN_MONTHS: u32 = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmokingClassification {
    pub classification: String,
    #[serde(default)]
    pub requires_clean_months: u32,
}

/// Product-specific treatment, e.g. occasional cigars rated as non-smoker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TobaccoTypeException {
    pub tobacco_type: String,
    #[serde(default)]
    pub frequency: Option<String>,
    pub classification: String,
}

impl TobaccoTypeException {
    fn applies_to(&self, tobacco: &TobaccoInfo) -> bool {
        let type_matches = tobacco
            .tobacco_type
            .as_deref()
            .is_some_and(|kind| kind.trim().eq_ignore_ascii_case(self.tobacco_type.trim()));
        let frequency_matches = match self.frequency.as_deref() {
            None => true,
            Some(expected) => tobacco
                .frequency
                .as_deref()
                .is_some_and(|actual| actual.trim().eq_ignore_ascii_case(expected.trim())),
        };
        type_matches && frequency_matches
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TobaccoRules {
    #[serde(default)]
    pub smoking_classifications: Vec<SmokingClassification>,
    #[serde(default)]
    pub nicotine_test_required: bool,
    #[serde(default)]
    pub type_exceptions: Vec<TobaccoTypeException>,
    /// Classes the carrier will not write at all.
    #[serde(default)]
    pub disqualifying_classes: Vec<String>,
}

impl TobaccoRules {
    pub(crate) fn validate(&self) -> Result<(), CriteriaError> {
        let names = self
            .smoking_classifications
            .iter()
            .map(|class| class.classification.as_str())
            .chain(self.type_exceptions.iter().map(|ex| ex.classification.as_str()))
            .chain(self.type_exceptions.iter().map(|ex| ex.tobacco_type.as_str()))
            .chain(self.disqualifying_classes.iter().map(String::as_str));

        for name in names {
            if name.trim().is_empty() {
                return Err(CriteriaError::EmptyTobaccoClass);
            }
        }
        Ok(())
    }

    pub fn disqualifies(&self, class: &str) -> bool {
        self.disqualifying_classes
            .iter()
            .any(|candidate| candidate.trim().eq_ignore_ascii_case(class))
    }

    fn fallback() -> Self {
        Self {
            smoking_classifications: vec![SmokingClassification {
                classification: NONSMOKER_CLASS.to_string(),
                requires_clean_months: DEFAULT_NONSMOKER_CLEAN_MONTHS,
            }],
            ..Self::default()
        }
    }
}

/// Derived tobacco class for one applicant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TobaccoAssessment {
    pub class: String,
    pub detail: String,
    pub disclosed: bool,
}

/// Derive the applicant's tobacco class.
///
/// Current users get a matching type exception or the smoker class. Former users qualify for the
/// strictest classification whose clean-month requirement they meet. Applicants with no history
/// get a zero-month classification when one exists, otherwise the non-smoker class. Undisclosed
/// history is classed like no history and flagged through `disclosed`.
pub fn derive_tobacco_class(
    rules: Option<&TobaccoRules>,
    tobacco: Option<&TobaccoInfo>,
    as_of: NaiveDate,
) -> TobaccoAssessment {
    let fallback;
    let rules = match rules {
        Some(rules) => rules,
        None => {
            fallback = TobaccoRules::fallback();
            &fallback
        }
    };

    let Some(tobacco) = tobacco else {
        return TobaccoAssessment {
            class: no_history_class(rules),
            detail: "tobacco history not provided".to_string(),
            disclosed: false,
        };
    };

    if tobacco.current_use {
        if let Some(exception) = rules
            .type_exceptions
            .iter()
            .find(|exception| exception.applies_to(tobacco))
        {
            return TobaccoAssessment {
                class: exception.classification.clone(),
                detail: format!("current {} use", exception.tobacco_type),
                disclosed: true,
            };
        }
        return TobaccoAssessment {
            class: SMOKER_CLASS.to_string(),
            detail: "current tobacco use".to_string(),
            disclosed: true,
        };
    }

    match tobacco.last_use_date {
        Some(last_use) => {
            let months_clean = completed_months_between(last_use, as_of).unwrap_or(0);
            let class = by_strictness(rules)
                .into_iter()
                .find(|class| months_clean >= class.requires_clean_months)
                .map(|class| class.classification.clone())
                .unwrap_or_else(|| SMOKER_CLASS.to_string());
            TobaccoAssessment {
                class,
                detail: format!("{months_clean} months since last tobacco use"),
                disclosed: true,
            }
        }
        None => TobaccoAssessment {
            class: no_history_class(rules),
            detail: "no tobacco history".to_string(),
            disclosed: true,
        },
    }
}

fn by_strictness(rules: &TobaccoRules) -> Vec<&SmokingClassification> {
    let mut classes: Vec<&SmokingClassification> = rules.smoking_classifications.iter().collect();
    classes.sort_by(|a, b| b.requires_clean_months.cmp(&a.requires_clean_months));
    classes
}

fn no_history_class(rules: &TobaccoRules) -> String {
    by_strictness(rules)
        .into_iter()
        .find(|class| class.requires_clean_months == 0)
        .map(|class| class.classification.clone())
        .unwrap_or_else(|| NONSMOKER_CLASS.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn tiered_rules() -> TobaccoRules {
        TobaccoRules {
            smoking_classifications: vec![
                SmokingClassification {
                    classification: "preferred_nonsmoker".to_string(),
                    requires_clean_months: 36,
                },
                SmokingClassification {
                    classification: "nonsmoker".to_string(),
                    requires_clean_months: 12,
                },
            ],
            nicotine_test_required: true,
            type_exceptions: vec![TobaccoTypeException {
                tobacco_type: "cigar".to_string(),
                frequency: Some("occasional".to_string()),
                classification: "nonsmoker".to_string(),
            }],
            disqualifying_classes: vec!["smoker".to_string()],
        }
    }

    #[test]
    fn former_user_gets_strictest_class_met() {
        let tobacco = TobaccoInfo {
            current_use: false,
            last_use_date: Some(date(2021, 6, 1)),
            ..TobaccoInfo::default()
        };

        let assessment = derive_tobacco_class(Some(&tiered_rules()), Some(&tobacco), date(2025, 1, 1));
        assert_eq!(assessment.class, "preferred_nonsmoker");

        let assessment = derive_tobacco_class(Some(&tiered_rules()), Some(&tobacco), date(2023, 1, 1));
        assert_eq!(assessment.class, "nonsmoker");

        let assessment = derive_tobacco_class(Some(&tiered_rules()), Some(&tobacco), date(2021, 12, 1));
        assert_eq!(assessment.class, SMOKER_CLASS);
    }

    #[test]
    fn occasional_cigar_exception_applies_to_current_user() {
        let tobacco = TobaccoInfo {
            current_use: true,
            tobacco_type: Some("Cigar".to_string()),
            frequency: Some("occasional".to_string()),
            last_use_date: None,
        };

        let assessment = derive_tobacco_class(Some(&tiered_rules()), Some(&tobacco), date(2025, 1, 1));
        assert_eq!(assessment.class, "nonsmoker");

        let daily = TobaccoInfo {
            frequency: Some("daily".to_string()),
            ..tobacco
        };
        let assessment = derive_tobacco_class(Some(&tiered_rules()), Some(&daily), date(2025, 1, 1));
        assert_eq!(assessment.class, SMOKER_CLASS);
    }

    #[test]
    fn no_rules_and_no_history_is_nonsmoker() {
        let assessment =
            derive_tobacco_class(None, Some(&TobaccoInfo::default()), date(2025, 1, 1));
        assert_eq!(assessment.class, NONSMOKER_CLASS);
        assert!(assessment.disclosed);
    }

    #[test]
    fn undisclosed_history_is_classed_as_no_history_but_flagged() {
        let mut rules = tiered_rules();
        rules.smoking_classifications.push(SmokingClassification {
            classification: "standard_nonsmoker".to_string(),
            requires_clean_months: 0,
        });

        let assessment = derive_tobacco_class(Some(&rules), None, date(2025, 1, 1));
        assert_eq!(assessment.class, "standard_nonsmoker");
        assert!(!assessment.disclosed);
        assert_eq!(assessment.detail, "tobacco history not provided");
    }

    #[test]
    fn disqualifying_classes_ignore_case() {
        assert!(tiered_rules().disqualifies("smoker"));
        assert!(!tiered_rules().disqualifies("nonsmoker"));
    }
}
