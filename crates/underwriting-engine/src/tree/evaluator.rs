use std::time::Instant;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::condition::{ConditionNode, LeafCondition, Operator};
use super::rules::{Routing, Rule};
use crate::context::{completed_years_between, EvaluationContext, FactKey, FactValue};

/// A rule whose root condition held for the applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub rule_id: String,
    pub rule_name: String,
    /// Share of leaves that contributed true, in `[0, 1]`.
    pub match_score: f64,
    pub matched_conditions: Vec<String>,
    pub weight: f64,
    pub priority: i32,
    pub routing: Routing,
}

/// Observability data gathered while walking the rules.
///
/// `evaluation_time_ms` is wall-clock and is ignored by `PartialEq`, so two evaluations of the
/// same input compare equal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeMetadata {
    pub total_rules_evaluated: usize,
    pub total_matches: usize,
    pub primary_routing_matches: Vec<String>,
    pub evaluation_time_ms: u64,
}

impl PartialEq for TreeMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.total_rules_evaluated == other.total_rules_evaluated
            && self.total_matches == other.total_matches
            && self.primary_routing_matches == other.primary_routing_matches
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TreeEvaluationResult {
    /// Matched rules in ascending priority, ties kept in rule order.
    pub matched_rules: Vec<MatchResult>,
    /// Carriers named by matched primary-routing rules, in priority order without duplicates.
    pub recommended_carrier_ids: Vec<String>,
    pub recommended_product_ids: Vec<String>,
    pub metadata: TreeMetadata,
}

impl TreeEvaluationResult {
    pub fn matched(&self, rule_name: &str) -> Option<&MatchResult> {
        self.matched_rules
            .iter()
            .find(|matched| matched.rule_name == rule_name)
    }
}

/// Full trace of one rule against one applicant, produced whether or not the rule matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleExplanation {
    pub rule_id: String,
    pub rule_name: String,
    pub matched: bool,
    pub score: f64,
    pub matched_conditions: Vec<String>,
    pub failed_conditions: Vec<String>,
}

#[derive(Default)]
struct ConditionTrail {
    contributed: Vec<String>,
    failed: Vec<String>,
}

impl ConditionTrail {
    /// Contributing leaves over all leaves; a tree without leaves is fully satisfied.
    fn leaf_ratio(&self) -> f64 {
        let total = self.contributed.len() + self.failed.len();
        if total == 0 {
            return 1.0;
        }
        self.contributed.len() as f64 / total as f64
    }
}

/// Evaluate every rule against the context.
pub fn evaluate_decision_tree(rules: &[Rule], context: &EvaluationContext) -> TreeEvaluationResult {
    let started = Instant::now();
    let mut matched_rules = Vec::new();

    for rule in rules {
        if !rule.is_active {
            debug!(rule = %rule.name, "skipping inactive rule");
            continue;
        }

        let explanation = explain_rule(rule, context);
        debug!(
            rule = %rule.name,
            matched = explanation.matched,
            score = explanation.score,
            "evaluated decision tree rule"
        );

        if explanation.matched {
            matched_rules.push(MatchResult {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                match_score: explanation.score,
                matched_conditions: explanation.matched_conditions,
                weight: rule.weight,
                priority: rule.priority,
                routing: rule.routing.clone(),
            });
        }
    }

    matched_rules.sort_by_key(|matched| matched.priority);

    let mut recommended_carrier_ids: Vec<String> = Vec::new();
    let mut recommended_product_ids: Vec<String> = Vec::new();
    let mut primary_routing_matches = Vec::new();

    for matched in matched_rules
        .iter()
        .filter(|matched| matched.routing.is_primary_routing)
    {
        primary_routing_matches.push(matched.rule_name.clone());
        for carrier in &matched.routing.carrier_ids {
            if !recommended_carrier_ids.contains(carrier) {
                recommended_carrier_ids.push(carrier.clone());
            }
        }
        for product in matched.routing.product_ids.iter().flatten() {
            if !recommended_product_ids.contains(product) {
                recommended_product_ids.push(product.clone());
            }
        }
    }

    let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let metadata = TreeMetadata {
        total_rules_evaluated: rules.len(),
        total_matches: matched_rules.len(),
        primary_routing_matches,
        evaluation_time_ms: elapsed,
    };

    debug!(
        total = metadata.total_rules_evaluated,
        matches = metadata.total_matches,
        elapsed_ms = metadata.evaluation_time_ms,
        "decision tree evaluated"
    );

    TreeEvaluationResult {
        matched_rules,
        recommended_carrier_ids,
        recommended_product_ids,
        metadata,
    }
}

/// Trace a single rule, including the conditions that failed. Inactive rules are traced as
/// written but never reported as matched.
pub fn explain_rule(rule: &Rule, context: &EvaluationContext) -> RuleExplanation {
    let mut trail = ConditionTrail::default();
    let holds = evaluate_node(&rule.condition, context, false, &mut trail);

    RuleExplanation {
        rule_id: rule.id.clone(),
        rule_name: rule.name.clone(),
        matched: rule.is_active && holds,
        score: trail.leaf_ratio(),
        matched_conditions: trail.contributed,
        failed_conditions: trail.failed,
    }
}

/// Evaluate a bare condition tree.
pub fn evaluate_condition(node: &ConditionNode, context: &EvaluationContext) -> bool {
    let mut trail = ConditionTrail::default();
    evaluate_node(node, context, false, &mut trail)
}

/// Every child is visited so the trail records each leaf, even once the outcome is settled.
fn evaluate_node(
    node: &ConditionNode,
    context: &EvaluationContext,
    negated: bool,
    trail: &mut ConditionTrail,
) -> bool {
    match node {
        ConditionNode::Leaf(leaf) => {
            let holds = evaluate_leaf(leaf, context);
            let description = if negated {
                format!("not ({leaf})")
            } else {
                leaf.to_string()
            };
            if holds != negated {
                trail.contributed.push(description);
            } else {
                trail.failed.push(description);
            }
            holds
        }
        ConditionNode::And(children) => children
            .iter()
            .map(|child| evaluate_node(child, context, negated, trail))
            .fold(true, |all, holds| all && holds),
        ConditionNode::Or(children) => children
            .iter()
            .map(|child| evaluate_node(child, context, negated, trail))
            .fold(false, |any, holds| any || holds),
        ConditionNode::Not(child) => !evaluate_node(child, context, !negated, trail),
    }
}

/// Absent facts, unknown facts, unknown operators and type mismatches all evaluate false.
fn evaluate_leaf(leaf: &LeafCondition, context: &EvaluationContext) -> bool {
    if let Operator::Unknown(raw) = &leaf.operator {
        warn!(fact = %leaf.fact, operator = %raw, "unknown operator in rule leaf; treating as false");
        return false;
    }

    let Some(key) = FactKey::from_name(&leaf.fact) else {
        debug!(fact = %leaf.fact, "rule references an unknown fact");
        return false;
    };

    let Some(actual) = context.fact(key) else {
        debug!(fact = %leaf.fact, "fact absent from context");
        return false;
    };

    apply_operator(&leaf.operator, actual, &leaf.value, context.as_of())
}

fn apply_operator(operator: &Operator, actual: &FactValue, expected: &Value, as_of: NaiveDate) -> bool {
    match operator {
        Operator::Eq => match actual {
            FactValue::List(items) => list_overlaps(items, expected),
            _ => scalar_equals(actual, expected).unwrap_or(false),
        },
        Operator::Neq => match actual {
            FactValue::List(items) => operand_strings(expected)
                .map(|wanted| !wanted.iter().any(|item| list_contains(items, item)))
                .unwrap_or(false),
            _ => scalar_equals(actual, expected)
                .map(|equal| !equal)
                .unwrap_or(false),
        },
        Operator::Gt => compare(actual, expected, |a, b| a > b),
        Operator::Gte => compare(actual, expected, |a, b| a >= b),
        Operator::Lt => compare(actual, expected, |a, b| a < b),
        Operator::Lte => compare(actual, expected, |a, b| a <= b),
        Operator::In => match (actual, expected) {
            (FactValue::List(items), Value::Array(_)) => list_overlaps(items, expected),
            (_, Value::Array(options)) => options
                .iter()
                .any(|option| scalar_equals(actual, option).unwrap_or(false)),
            _ => false,
        },
        Operator::NotIn => match (actual, expected) {
            (FactValue::List(items), Value::Array(_)) => !list_overlaps(items, expected),
            (_, Value::Array(options)) => !options
                .iter()
                .any(|option| scalar_equals(actual, option).unwrap_or(false)),
            _ => false,
        },
        Operator::IncludesAny => match actual {
            FactValue::List(items) => list_overlaps(items, expected),
            FactValue::Text(text) => operand_strings(expected)
                .map(|wanted| {
                    let haystack = text.to_lowercase();
                    wanted
                        .iter()
                        .any(|needle| haystack.contains(&needle.to_lowercase()))
                })
                .unwrap_or(false),
            _ => false,
        },
        Operator::IncludesAll => match actual {
            FactValue::List(items) => operand_strings(expected)
                .map(|wanted| wanted.iter().all(|item| list_contains(items, item)))
                .unwrap_or(false),
            _ => false,
        },
        Operator::IsEmpty => match actual {
            FactValue::List(items) => items.is_empty(),
            FactValue::Text(text) => text.is_empty(),
            _ => false,
        },
        Operator::IsNotEmpty => match actual {
            FactValue::List(items) => !items.is_empty(),
            FactValue::Text(text) => !text.is_empty(),
            _ => true,
        },
        Operator::YearsSinceGte => years_since(actual, expected, as_of, |years, bound| years >= bound),
        Operator::YearsSinceLte => years_since(actual, expected, as_of, |years, bound| years <= bound),
        Operator::Unknown(_) => false,
    }
}

/// `None` when the operand cannot be compared with the fact's type.
fn scalar_equals(actual: &FactValue, expected: &Value) -> Option<bool> {
    match (actual, expected) {
        (FactValue::Boolean(flag), Value::Bool(other)) => Some(flag == other),
        (FactValue::Boolean(flag), Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(*flag),
            "false" | "no" => Some(!*flag),
            _ => None,
        },
        (FactValue::Number(number), Value::Number(other)) => other.as_f64().map(|other| *number == other),
        (FactValue::Text(text), Value::String(other)) => Some(text.eq_ignore_ascii_case(other.trim())),
        (FactValue::Date(date), Value::String(other)) => parse_date(other).map(|other| *date == other),
        _ => None,
    }
}

fn compare(actual: &FactValue, expected: &Value, cmp: fn(f64, f64) -> bool) -> bool {
    match (actual, expected) {
        (FactValue::Number(number), Value::Number(other)) => {
            other.as_f64().map(|other| cmp(*number, other)).unwrap_or(false)
        }
        (FactValue::Date(date), Value::String(other)) => parse_date(other)
            .map(|other| cmp(day_number(*date), day_number(other)))
            .unwrap_or(false),
        _ => false,
    }
}

fn years_since(
    actual: &FactValue,
    expected: &Value,
    as_of: NaiveDate,
    cmp: fn(f64, f64) -> bool,
) -> bool {
    let (Some(date), Some(bound)) = (actual.as_date(), expected.as_f64()) else {
        return false;
    };

    completed_years_between(date, as_of)
        .map(|years| cmp(f64::from(years), bound))
        .unwrap_or(false)
}

/// Scalar or array operand as a list of strings; `None` for objects and nulls.
fn operand_strings(expected: &Value) -> Option<Vec<String>> {
    match expected {
        Value::Array(items) => Some(items.iter().filter_map(value_as_string).collect()),
        Value::Null | Value::Object(_) => None,
        other => value_as_string(other).map(|text| vec![text]),
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn list_contains(items: &[String], wanted: &str) -> bool {
    items.iter().any(|item| item.eq_ignore_ascii_case(wanted))
}

fn list_overlaps(items: &[String], expected: &Value) -> bool {
    operand_strings(expected)
        .map(|wanted| wanted.iter().any(|item| list_contains(items, item)))
        .unwrap_or(false)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn day_number(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}
