use chrono::{Local, NaiveDate};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use underwriting_engine::config::EvaluationConfig;
use underwriting_engine::context::AnalysisRequest;
use underwriting_engine::criteria::{load_criteria_map, CriteriaByCarrier};
use underwriting_engine::eligibility::CarrierCatalog;
use underwriting_engine::error::{AppError, LoadIssue};
use underwriting_engine::tree::RuleSet;

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Flag first, then `UW_AS_OF`, then today.
pub(crate) fn resolve_as_of(flag: Option<NaiveDate>, evaluation: &EvaluationConfig) -> NaiveDate {
    flag.unwrap_or_else(|| evaluation.resolve_as_of(Local::now().date_naive()))
}

fn read_json(path: &Path) -> Result<Value, AppError> {
    let raw = fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = raw.len(), "read input document");
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn load_request(path: &Path) -> Result<AnalysisRequest, AppError> {
    let document = read_json(path)?;
    serde_json::from_value(document).map_err(|err| {
        AppError::InvalidInput(format!("{} is not a valid analysis request: {err}", path.display()))
    })
}

/// Inputs shared by every subcommand, with every skipped entry recorded.
#[derive(Debug, Default)]
pub(crate) struct LoadedInputs {
    pub(crate) rules: RuleSet,
    pub(crate) criteria: CriteriaByCarrier,
    pub(crate) catalog: Option<CarrierCatalog>,
    pub(crate) issues: Vec<LoadIssue>,
}

pub(crate) fn load_inputs(
    rules: Option<&PathBuf>,
    criteria: Option<&PathBuf>,
    catalog: Option<&PathBuf>,
) -> Result<LoadedInputs, AppError> {
    let mut loaded = LoadedInputs::default();

    if let Some(path) = rules {
        let (rule_set, issues) = RuleSet::from_json(&read_json(path)?);
        loaded.rules = rule_set;
        loaded.issues.extend(prefixed(path, issues));
    }

    if let Some(path) = criteria {
        let (criteria, issues) = load_criteria_map(&read_json(path)?);
        loaded.criteria = criteria;
        loaded.issues.extend(prefixed(path, issues));
    }

    if let Some(path) = catalog {
        let catalog: CarrierCatalog = serde_json::from_value(read_json(path)?).map_err(|err| {
            AppError::InvalidInput(format!("{} is not a valid product catalog: {err}", path.display()))
        })?;
        loaded.catalog = Some(catalog);
    }

    for issue in &loaded.issues {
        warn!(location = %issue.location, message = %issue.message, "skipped malformed entry");
    }

    Ok(loaded)
}

fn prefixed(path: &Path, issues: Vec<LoadIssue>) -> impl Iterator<Item = LoadIssue> + '_ {
    issues.into_iter().map(move |issue| {
        LoadIssue::new(format!("{}:{}", path.display(), issue.location), issue.message)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_reports_offending_input() {
        let err = parse_date("06/01/2025").expect_err("slash dates rejected");
        assert!(err.contains("06/01/2025"));
        assert_eq!(
            parse_date(" 2025-06-01 "),
            Ok(NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date"))
        );
    }

    #[test]
    fn flag_wins_over_configured_as_of() {
        let flag = NaiveDate::from_ymd_opt(2025, 1, 1);
        let configured = EvaluationConfig {
            as_of: NaiveDate::from_ymd_opt(2024, 1, 1),
        };
        assert_eq!(resolve_as_of(flag, &configured), flag.expect("valid date"));
        assert_eq!(
            resolve_as_of(None, &configured),
            configured.as_of.expect("valid date")
        );
    }
}
