//! Deterministic underwriting evaluation: decision-tree rules, carrier criteria, catalog
//! screening, and recommendation ranking over one normalized applicant context.

pub mod config;
pub mod context;
pub mod criteria;
pub mod eligibility;
pub mod error;
pub mod filtered;
pub mod format;
pub mod ranking;
pub mod telemetry;
pub mod tree;

#[cfg(test)]
mod tests;
