//! Decision-tree rules: the condition language, rule loading, evaluation, and confidence boosts.

mod boost;
mod condition;
mod evaluator;
mod rules;

pub use boost::{calculate_tree_boost, is_tree_recommended, TreeBoost};
pub use condition::{ConditionNode, LeafCondition, LegacyCondition, LegacyConditionGroup, Operator};
pub use evaluator::{
    evaluate_condition, evaluate_decision_tree, explain_rule, MatchResult, RuleExplanation,
    TreeEvaluationResult, TreeMetadata,
};
pub use rules::{Routing, Rule, RuleSet};
