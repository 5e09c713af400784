use crate::infra::{load_inputs, load_request, resolve_as_of, LoadedInputs};
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::info;
use underwriting_engine::config::EngineConfig;
use underwriting_engine::context::EvaluationContext;
use underwriting_engine::criteria::{evaluate_criteria_for_carriers, CriteriaEvaluation};
use underwriting_engine::eligibility::{screen_catalog, CatalogScreening};
use underwriting_engine::error::{AppError, LoadIssue};
use underwriting_engine::filtered::FilteredProducts;
use underwriting_engine::format::format_currency;
use underwriting_engine::ranking::{
    candidates_from_screening, rank_recommendations, RankedRecommendation,
};
use underwriting_engine::tree::{evaluate_decision_tree, TreeEvaluationResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Analysis request JSON ({client, health, coverage})
    #[arg(long)]
    pub(crate) request: PathBuf,
    /// Decision-tree rule set JSON
    #[arg(long)]
    pub(crate) rules: Option<PathBuf>,
    /// Carrier criteria JSON keyed by carrier id
    #[arg(long)]
    pub(crate) criteria: Option<PathBuf>,
    /// Product catalog JSON used for screening and ranking
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Evaluation date (YYYY-MM-DD). Defaults to UW_AS_OF, then today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Confidence assigned to every screened product before the tree boost
    #[arg(long, default_value_t = 0.5)]
    pub(crate) base_confidence: f64,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,
}

#[derive(Args, Debug)]
pub(crate) struct FilteredArgs {
    /// Analysis request JSON ({client, health, coverage})
    #[arg(long)]
    pub(crate) request: PathBuf,
    /// Carrier criteria JSON keyed by carrier id
    #[arg(long)]
    pub(crate) criteria: Option<PathBuf>,
    /// Product catalog JSON
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Evaluation date (YYYY-MM-DD). Defaults to UW_AS_OF, then today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Write the CSV here instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Decision-tree rule set JSON
    #[arg(long)]
    pub(crate) rules: Option<PathBuf>,
    /// Carrier criteria JSON keyed by carrier id
    #[arg(long)]
    pub(crate) criteria: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct EvaluationReport {
    as_of: NaiveDate,
    tree: TreeEvaluationResult,
    criteria: CriteriaEvaluation,
    #[serde(skip_serializing_if = "Option::is_none")]
    screening: Option<CatalogScreening>,
    filtered_products: FilteredProducts,
    recommendations: Vec<RankedRecommendation>,
    load_issues: Vec<LoadIssue>,
}

pub(crate) fn run_evaluate(args: EvaluateArgs, config: &EngineConfig) -> Result<(), AppError> {
    let EvaluateArgs {
        request,
        rules,
        criteria,
        catalog,
        as_of,
        base_confidence,
        format,
    } = args;

    if !(0.0..=1.0).contains(&base_confidence) {
        return Err(AppError::InvalidInput(format!(
            "--base-confidence must be within [0, 1] (found {base_confidence})"
        )));
    }

    let as_of = resolve_as_of(as_of, &config.evaluation);
    let request = load_request(&request)?;
    let inputs = load_inputs(rules.as_ref(), criteria.as_ref(), catalog.as_ref())?;
    let context = EvaluationContext::from_request(&request, as_of);

    let report = build_report(&context, inputs, base_confidence);
    info!(
        matched_rules = report.tree.matched_rules.len(),
        excluded_carriers = report.criteria.excluded_carrier_ids().len(),
        recommendations = report.recommendations.len(),
        "evaluation complete"
    );

    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(io::stdout().lock(), &report)?;
            println!();
        }
        OutputFormat::Text => render_text(&context, &report),
    }

    Ok(())
}

fn build_report(context: &EvaluationContext, inputs: LoadedInputs, base_confidence: f64) -> EvaluationReport {
    let LoadedInputs {
        rules,
        criteria,
        catalog,
        issues,
    } = inputs;

    let tree = evaluate_decision_tree(&rules.rules, context);
    let criteria = evaluate_criteria_for_carriers(&criteria, context);
    let screening = catalog.as_ref().map(|catalog| screen_catalog(catalog, context));

    let mut filtered_products = criteria.filtered_products.clone();
    if let Some(screening) = &screening {
        filtered_products.merge(screening.filtered.clone());
    }

    let recommendations = screening
        .as_ref()
        .map(|screening| {
            let candidates = candidates_from_screening(screening, base_confidence);
            rank_recommendations(&candidates, &tree, &criteria.excluded_carrier_ids())
        })
        .unwrap_or_default();

    EvaluationReport {
        as_of: context.as_of(),
        tree,
        criteria,
        screening,
        filtered_products,
        recommendations,
        load_issues: issues,
    }
}

pub(crate) fn run_filtered(args: FilteredArgs, config: &EngineConfig) -> Result<(), AppError> {
    let FilteredArgs {
        request,
        criteria,
        catalog,
        as_of,
        output,
    } = args;

    let as_of = resolve_as_of(as_of, &config.evaluation);
    let request = load_request(&request)?;
    let inputs = load_inputs(None, criteria.as_ref(), catalog.as_ref())?;
    let context = EvaluationContext::from_request(&request, as_of);

    let mut filtered = evaluate_criteria_for_carriers(&inputs.criteria, &context).filtered_products;
    if let Some(catalog) = &inputs.catalog {
        filtered.merge(screen_catalog(catalog, &context).filtered);
    }

    match output {
        Some(path) => {
            filtered.write_csv(File::create(&path)?)?;
            info!(path = %path.display(), entries = filtered.len(), "wrote filtered products");
        }
        None => filtered.write_csv(io::stdout().lock())?,
    }

    Ok(())
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let ValidateArgs { rules, criteria } = args;
    if rules.is_none() && criteria.is_none() {
        return Err(AppError::InvalidInput(
            "pass --rules and/or --criteria to validate".to_string(),
        ));
    }

    let inputs = load_inputs(rules.as_ref(), criteria.as_ref(), None)?;

    let mut malformed = inputs.issues;
    for (carrier_id, entry) in &inputs.criteria {
        if let Err(err) = entry.criteria.validate() {
            malformed.push(LoadIssue::new(carrier_id.clone(), err.to_string()));
        }
    }

    println!(
        "Loaded {} rules and {} carrier criteria",
        inputs.rules.rules.len(),
        inputs.criteria.len()
    );
    if malformed.is_empty() {
        println!("No malformed entries found");
        return Ok(());
    }

    println!("Malformed entries:");
    for issue in &malformed {
        println!("- {issue}");
    }
    Err(AppError::InvalidInput(format!(
        "{} malformed entries",
        malformed.len()
    )))
}

fn render_text(context: &EvaluationContext, report: &EvaluationReport) {
    println!("Underwriting evaluation as of {}", report.as_of);
    println!(
        "Applicant: age {} | state {} | face amount {} | conditions: {}",
        context.age(),
        if context.state().is_empty() { "n/a" } else { context.state() },
        format_currency(context.face_amount()),
        if context.condition_codes().is_empty() {
            "none".to_string()
        } else {
            context.condition_codes().join(", ")
        }
    );

    println!(
        "\nDecision tree: {} of {} rules matched",
        report.tree.metadata.total_matches, report.tree.metadata.total_rules_evaluated
    );
    for matched in &report.tree.matched_rules {
        println!(
            "- [{}] {} | score {:.2} | weight {:.2} | {}",
            matched.priority,
            matched.rule_name,
            matched.match_score,
            matched.weight,
            matched.matched_conditions.join("; ")
        );
    }
    if !report.tree.recommended_carrier_ids.is_empty() {
        println!(
            "Primary routing: {}",
            report.tree.recommended_carrier_ids.join(", ")
        );
    }

    println!("\nCarrier criteria");
    for (carrier_id, result) in &report.criteria.evaluation_results {
        let status = if result.eligible { "eligible" } else { "excluded" };
        let build = result
            .build_rating
            .map(|rating| rating.label())
            .unwrap_or("n/a");
        let tobacco = result.tobacco_class.as_deref().unwrap_or("n/a");
        println!("- {carrier_id}: {status} | build {build} | tobacco {tobacco}");
        for reason in &result.reasons {
            println!("    reason: {reason}");
        }
        for warning in &result.warnings {
            println!("    warning: {warning}");
        }
    }
    for skipped in &report.criteria.skipped {
        println!(
            "- {}: criteria skipped ({})",
            skipped.carrier_id, skipped.reason
        );
    }

    if let Some(screening) = &report.screening {
        println!(
            "\nCatalog screening: {} products across {} carriers remain",
            screening.product_count(),
            screening.eligible.len()
        );
        for flag in &screening.full_underwriting_required {
            println!(
                "- {} requires full underwriting above {}",
                flag.product_name,
                format_currency(flag.threshold)
            );
        }
    }

    if !report.filtered_products.is_empty() {
        println!("\nFiltered products ({})", report.filtered_products.len());
        for entry in report.filtered_products.entries() {
            let product = entry.product_name.as_deref().unwrap_or("all products");
            println!(
                "- {} / {} [{}]: {}",
                entry.carrier_name,
                product,
                entry.rule.label(),
                entry.reason
            );
        }
    }

    if !report.recommendations.is_empty() {
        println!("\nRecommendations");
        for (rank, recommendation) in report.recommendations.iter().enumerate() {
            let marker = if recommendation.tree_recommended { " *" } else { "" };
            println!(
                "{}. {} {} | {:.0}% (base {:.0}% + tree {:.0}%){}",
                rank + 1,
                recommendation.carrier_name,
                recommendation.product_name,
                recommendation.final_score * 100.0,
                recommendation.confidence * 100.0,
                recommendation.tree_boost * 100.0,
                marker
            );
        }
    }

    if !report.load_issues.is_empty() {
        println!("\nSkipped input entries");
        for issue in &report.load_issues {
            println!("- {issue}");
        }
    }
}
