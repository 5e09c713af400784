use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::FactKey;
use crate::format::{format_currency, format_number};

/// Boolean condition tree attached to a decision-tree rule.
///
/// `And` over zero children is vacuously true and `Or` over zero children is false, so an
/// empty `And` acts as an "always matches" rule while an empty `Or` never matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionNode {
    Leaf(LeafCondition),
    And(Vec<ConditionNode>),
    Or(Vec<ConditionNode>),
    Not(Box<ConditionNode>),
}

impl ConditionNode {
    pub fn leaf(fact: impl Into<String>, operator: Operator, value: Value) -> Self {
        ConditionNode::Leaf(LeafCondition {
            fact: fact.into(),
            operator,
            value,
        })
    }

    pub fn negate(node: ConditionNode) -> Self {
        ConditionNode::Not(Box::new(node))
    }

    /// Every leaf in the tree, depth first.
    pub fn leaves(&self) -> Vec<&LeafCondition> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a LeafCondition>) {
        match self {
            ConditionNode::Leaf(leaf) => out.push(leaf),
            ConditionNode::And(children) | ConditionNode::Or(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
            ConditionNode::Not(child) => child.collect_leaves(out),
        }
    }

    /// Whether any leaf references one of the given facts.
    pub fn references_any(&self, keys: &[FactKey]) -> bool {
        self.leaves().into_iter().any(|leaf| {
            FactKey::from_name(&leaf.fact)
                .map(|key| keys.contains(&key))
                .unwrap_or(false)
        })
    }
}

/// Single comparison between a context fact and an authored operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafCondition {
    pub fact: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

impl fmt::Display for LeafCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let is_money = FactKey::from_name(&self.fact) == Some(FactKey::FaceAmount);
        match self.operator {
            Operator::IsEmpty | Operator::IsNotEmpty => {
                write!(f, "{} {}", self.fact, self.operator.symbol())
            }
            _ => write!(
                f,
                "{} {} {}",
                self.fact,
                self.operator.symbol(),
                describe_operand(&self.value, is_money)
            ),
        }
    }
}

fn describe_operand(value: &Value, is_money: bool) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => match number.as_f64() {
            Some(amount) if is_money => format_currency(amount),
            Some(amount) => format_number(amount),
            None => number.to_string(),
        },
        Value::String(text) => text.clone(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| describe_operand(item, is_money))
                .collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(_) => value.to_string(),
    }
}

/// Comparison operators available to rule authors.
///
/// Authored strings that do not name a known operator are kept as `Unknown` so the rule still
/// loads and round-trips; such leaves always evaluate false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    IncludesAny,
    IncludesAll,
    IsEmpty,
    IsNotEmpty,
    YearsSinceGte,
    YearsSinceLte,
    Unknown(String),
}

impl Operator {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "eq" | "==" | "=" => Operator::Eq,
            "neq" | "!=" | "<>" => Operator::Neq,
            "gt" | ">" => Operator::Gt,
            "gte" | ">=" => Operator::Gte,
            "lt" | "<" => Operator::Lt,
            "lte" | "<=" => Operator::Lte,
            "in" => Operator::In,
            "not_in" => Operator::NotIn,
            "includes_any" | "contains" => Operator::IncludesAny,
            "includes_all" => Operator::IncludesAll,
            "is_empty" => Operator::IsEmpty,
            "is_not_empty" => Operator::IsNotEmpty,
            "years_since_gte" => Operator::YearsSinceGte,
            "years_since_lte" => Operator::YearsSinceLte,
            _ => Operator::Unknown(raw.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::IncludesAny => "includes_any",
            Operator::IncludesAll => "includes_all",
            Operator::IsEmpty => "is_empty",
            Operator::IsNotEmpty => "is_not_empty",
            Operator::YearsSinceGte => "years_since_gte",
            Operator::YearsSinceLte => "years_since_lte",
            Operator::Unknown(raw) => raw,
        }
    }

    /// Compact form used in explanation strings.
    pub fn symbol(&self) -> &str {
        match self {
            Operator::Eq => "==",
            Operator::Neq => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::IncludesAny => "includes any of",
            Operator::IncludesAll => "includes all of",
            Operator::IsEmpty => "is empty",
            Operator::IsNotEmpty => "is not empty",
            Operator::YearsSinceGte => "years since >=",
            Operator::YearsSinceLte => "years since <=",
            Operator::Unknown(raw) => raw,
        }
    }
}

impl From<String> for Operator {
    fn from(value: String) -> Self {
        Operator::parse(&value)
    }
}

impl From<Operator> for String {
    fn from(value: Operator) -> Self {
        value.name().to_string()
    }
}

/// Legacy `{ all: [...], any: [...] }` condition group stored by earlier rule editors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LegacyConditionGroup {
    #[serde(default)]
    pub all: Vec<LegacyCondition>,
    #[serde(default)]
    pub any: Vec<LegacyCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyCondition {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

impl From<LegacyCondition> for ConditionNode {
    fn from(condition: LegacyCondition) -> Self {
        ConditionNode::Leaf(LeafCondition {
            fact: condition.field,
            operator: condition.operator,
            value: condition.value,
        })
    }
}

impl From<LegacyConditionGroup> for ConditionNode {
    fn from(group: LegacyConditionGroup) -> Self {
        let mut all: Vec<ConditionNode> = group.all.into_iter().map(ConditionNode::from).collect();
        let any: Vec<ConditionNode> = group.any.into_iter().map(ConditionNode::from).collect();

        match (all.is_empty(), any.is_empty()) {
            (_, true) => ConditionNode::And(all),
            (true, false) => ConditionNode::Or(any),
            (false, false) => {
                all.push(ConditionNode::Or(any));
                ConditionNode::And(all)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn symbolic_and_named_operators_parse_alike() {
        assert_eq!(Operator::parse(">="), Operator::Gte);
        assert_eq!(Operator::parse("GTE"), Operator::Gte);
        assert_eq!(Operator::parse("contains"), Operator::IncludesAny);
        assert_eq!(
            Operator::parse("roughly"),
            Operator::Unknown("roughly".to_string())
        );
    }

    #[test]
    fn unknown_operator_survives_serialization() {
        let node: ConditionNode =
            serde_json::from_value(json!({"leaf": {"fact": "age", "operator": "about", "value": 40}}))
                .expect("leaf parses");
        let encoded = serde_json::to_value(&node).expect("serializes");
        assert_eq!(encoded["leaf"]["operator"], json!("about"));
    }

    #[test]
    fn describes_face_amount_as_currency() {
        let leaf = LeafCondition {
            fact: "face_amount".to_string(),
            operator: Operator::Gt,
            value: json!(250000),
        };
        assert_eq!(leaf.to_string(), "face_amount > $250,000");
    }

    #[test]
    fn legacy_group_nests_any_under_all() {
        let group: LegacyConditionGroup = serde_json::from_value(json!({
            "all": [{"field": "age", "operator": ">=", "value": 50}],
            "any": [
                {"field": "tobacco", "operator": "==", "value": true},
                {"field": "bmi", "operator": ">", "value": 35}
            ]
        }))
        .expect("legacy group parses");

        match ConditionNode::from(group) {
            ConditionNode::And(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(&children[1], ConditionNode::Or(any) if any.len() == 2));
            }
            other => panic!("expected And root, got {other:?}"),
        }
    }
}
