use serde::{Deserialize, Serialize};

use super::constraints::CriteriaError;
use crate::context::EvaluationContext;
use crate::format::format_number;

/// Build classification, best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildRating {
    PreferredPlus,
    Preferred,
    Standard,
    TableRated,
    Decline,
}

impl BuildRating {
    pub const fn label(self) -> &'static str {
        match self {
            BuildRating::PreferredPlus => "preferred_plus",
            BuildRating::Preferred => "preferred",
            BuildRating::Standard => "standard",
            BuildRating::TableRated => "table_rated",
            BuildRating::Decline => "decline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildBasis {
    #[default]
    Bmi,
    HeightWeight,
}

/// Upper bounds per rating band. A missing bound means the band has no ceiling.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BuildThresholds {
    #[serde(default)]
    pub preferred_plus_max: Option<f64>,
    #[serde(default)]
    pub preferred_max: Option<f64>,
    #[serde(default)]
    pub standard_max: Option<f64>,
    /// Values above this bound decline.
    #[serde(default)]
    pub table_rated_max: Option<f64>,
}

impl BuildThresholds {
    fn bounds(&self) -> [(&'static str, Option<f64>); 4] {
        [
            ("preferred_plus_max", self.preferred_plus_max),
            ("preferred_max", self.preferred_max),
            ("standard_max", self.standard_max),
            ("table_rated_max", self.table_rated_max),
        ]
    }

    fn validate(&self) -> Result<(), CriteriaError> {
        let mut previous: Option<(&'static str, f64)> = None;
        for (field, bound) in self.bounds() {
            let Some(value) = bound else { continue };
            if !value.is_finite() || value <= 0.0 {
                return Err(CriteriaError::InvalidBuildThreshold { field, value });
            }
            if let Some((lower, lower_value)) = previous {
                if lower_value > value {
                    return Err(CriteriaError::BuildThresholdsOutOfOrder { lower, upper: field });
                }
            }
            previous = Some((field, value));
        }
        Ok(())
    }

    /// Worst band first: the first ceiling exceeded decides the rating.
    fn classify(&self, value: f64) -> Classification {
        let exceeds = |bound: Option<f64>| bound.filter(|max| value > *max);

        if let Some(max) = exceeds(self.table_rated_max) {
            Classification::new(BuildRating::Decline, Some(("table-rated maximum", max)))
        } else if let Some(max) = exceeds(self.standard_max) {
            Classification::new(BuildRating::TableRated, Some(("standard maximum", max)))
        } else if let Some(max) = exceeds(self.preferred_max) {
            Classification::new(BuildRating::Standard, Some(("preferred maximum", max)))
        } else if let Some(max) = exceeds(self.preferred_plus_max) {
            Classification::new(BuildRating::Preferred, Some(("preferred-plus maximum", max)))
        } else {
            Classification::new(BuildRating::PreferredPlus, None)
        }
    }
}

struct Classification {
    rating: BuildRating,
    exceeded: Option<(&'static str, f64)>,
}

impl Classification {
    fn new(rating: BuildRating, exceeded: Option<(&'static str, f64)>) -> Self {
        Self { rating, exceeded }
    }
}

/// Weight ceilings (lbs) for one height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightWeightRow {
    pub height_inches: u32,
    #[serde(flatten)]
    pub max_weight_lbs: BuildThresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRequirements {
    #[serde(default)]
    pub basis: BuildBasis,
    #[serde(flatten)]
    pub bmi: BuildThresholds,
    #[serde(default)]
    pub height_weight_table: Vec<HeightWeightRow>,
}

impl Default for BuildRequirements {
    /// Bands used for carriers that publish no build chart.
    fn default() -> Self {
        Self {
            basis: BuildBasis::Bmi,
            bmi: BuildThresholds {
                preferred_plus_max: Some(23.0),
                preferred_max: Some(28.0),
                standard_max: Some(33.0),
                table_rated_max: None,
            },
            height_weight_table: Vec::new(),
        }
    }
}

/// Rating plus whatever should be surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuildAssessment {
    pub rating: Option<BuildRating>,
    pub reason: Option<String>,
    pub warning: Option<String>,
}

impl BuildRequirements {
    pub(crate) fn validate(&self) -> Result<(), CriteriaError> {
        self.bmi.validate()?;
        for row in &self.height_weight_table {
            row.max_weight_lbs.validate()?;
        }
        Ok(())
    }

    fn row_for(&self, height_inches: f64) -> Option<&HeightWeightRow> {
        let rounded = height_inches.round();
        self.height_weight_table
            .iter()
            .find(|row| f64::from(row.height_inches) == rounded)
    }

    /// Rate the applicant's build. Height/weight charts are used when the carrier rates that
    /// way and a row exists for the applicant's height; otherwise BMI bands apply.
    pub fn assess(&self, context: &EvaluationContext) -> BuildAssessment {
        if self.basis == BuildBasis::HeightWeight {
            if let (Some(height), Some(weight)) = (context.height_inches(), context.weight_lbs()) {
                if let Some(row) = self.row_for(height) {
                    let classification = row.max_weight_lbs.classify(weight);
                    let subject = format!(
                        "weight {} lbs at {} in",
                        format_number(weight),
                        row.height_inches
                    );
                    return describe(classification, &subject);
                }
            }
        }

        match context.bmi() {
            Some(bmi) => {
                let subject = format!("BMI {:.1}", bmi);
                describe(self.bmi.classify(bmi), &subject)
            }
            None => BuildAssessment {
                rating: None,
                reason: None,
                warning: Some("build not provided; rating unavailable".to_string()),
            },
        }
    }
}

fn describe(classification: Classification, subject: &str) -> BuildAssessment {
    let detail = classification
        .exceeded
        .map(|(band, max)| format!("{subject} exceeds {band} {}", format_number(max)));

    match classification.rating {
        BuildRating::Decline => BuildAssessment {
            rating: Some(BuildRating::Decline),
            reason: detail.map(|detail| format!("build rating decline: {detail}")),
            warning: None,
        },
        BuildRating::TableRated => BuildAssessment {
            rating: Some(BuildRating::TableRated),
            reason: None,
            warning: detail.map(|detail| format!("build rating table_rated: {detail}")),
        },
        rating => BuildAssessment {
            rating: Some(rating),
            reason: None,
            warning: None,
        },
    }
}
