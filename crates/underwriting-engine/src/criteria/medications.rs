use serde::{Deserialize, Serialize};

use crate::context::{MedicationInfo, PainMedicationLevel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationAllowance {
    pub allowed: bool,
    #[serde(default)]
    pub rating_impact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationLimit {
    pub max_count: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MedicationRestrictions {
    #[serde(default)]
    pub insulin: Option<MedicationAllowance>,
    #[serde(default)]
    pub blood_thinners: Option<MedicationAllowance>,
    #[serde(default)]
    pub opioids: Option<MedicationAllowance>,
    #[serde(default)]
    pub antidepressants: Option<MedicationAllowance>,
    #[serde(default)]
    pub bp_medications: Option<MedicationLimit>,
    #[serde(default)]
    pub cholesterol_medications: Option<MedicationLimit>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MedicationFindings {
    pub reasons: Vec<String>,
    pub warnings: Vec<String>,
}

impl MedicationRestrictions {
    /// Disallowed medications become reasons; rating impacts and count overruns become warnings.
    /// Antidepressants only ever warn.
    pub fn assess(&self, medications: &MedicationInfo) -> MedicationFindings {
        let mut findings = MedicationFindings::default();

        let opioid_use = medications
            .pain_medications
            .map(|level| level == PainMedicationLevel::Opioid);
        let disclosures = [
            ("insulin use", &self.insulin, medications.insulin_use, true),
            ("blood thinner use", &self.blood_thinners, medications.blood_thinners, true),
            ("opioid use", &self.opioids, opioid_use, true),
            ("antidepressant use", &self.antidepressants, medications.antidepressants, false),
        ];

        for (label, allowance, disclosed, excludes) in disclosures {
            let (Some(allowance), Some(true)) = (allowance, disclosed) else {
                continue;
            };
            if !allowance.allowed {
                if excludes {
                    findings.reasons.push(format!("{label} not allowed"));
                } else {
                    findings.warnings.push(format!("{label} may affect rating"));
                }
            } else if let Some(impact) = &allowance.rating_impact {
                findings.warnings.push(format!("{label}: {impact}"));
            }
        }

        let counts = [
            ("blood pressure medications", &self.bp_medications, medications.bp_med_count),
            (
                "cholesterol medications",
                &self.cholesterol_medications,
                medications.cholesterol_med_count,
            ),
        ];
        for (label, limit, count) in counts {
            if let (Some(limit), Some(count)) = (limit, count) {
                if count > limit.max_count {
                    findings.warnings.push(format!(
                        "{count} {label} exceeds preferred limit of {}",
                        limit.max_count
                    ));
                }
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restrictions() -> MedicationRestrictions {
        MedicationRestrictions {
            insulin: Some(MedicationAllowance {
                allowed: false,
                rating_impact: None,
            }),
            blood_thinners: Some(MedicationAllowance {
                allowed: true,
                rating_impact: Some("table 2".to_string()),
            }),
            opioids: Some(MedicationAllowance {
                allowed: false,
                rating_impact: None,
            }),
            antidepressants: Some(MedicationAllowance {
                allowed: false,
                rating_impact: None,
            }),
            bp_medications: Some(MedicationLimit { max_count: 2 }),
            cholesterol_medications: None,
        }
    }

    #[test]
    fn disallowed_medications_become_reasons() {
        let medications = MedicationInfo {
            insulin_use: Some(true),
            pain_medications: Some(PainMedicationLevel::Opioid),
            ..MedicationInfo::default()
        };

        let findings = restrictions().assess(&medications);
        assert_eq!(
            findings.reasons,
            vec!["insulin use not allowed", "opioid use not allowed"]
        );
        assert!(findings.warnings.is_empty());
    }

    #[test]
    fn antidepressants_and_counts_only_warn() {
        let medications = MedicationInfo {
            antidepressants: Some(true),
            blood_thinners: Some(true),
            bp_med_count: Some(3),
            ..MedicationInfo::default()
        };

        let findings = restrictions().assess(&medications);
        assert!(findings.reasons.is_empty());
        assert_eq!(
            findings.warnings,
            vec![
                "blood thinner use: table 2",
                "antidepressant use may affect rating",
                "3 blood pressure medications exceeds preferred limit of 2",
            ]
        );
    }

    #[test]
    fn unanswered_questions_never_exclude() {
        let findings = restrictions().assess(&MedicationInfo::default());
        assert_eq!(findings, MedicationFindings::default());
    }
}
