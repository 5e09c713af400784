//! Unified record of every carrier or product removed from consideration, whichever stage
//! removed it.

use std::collections::HashSet;
use std::io;

use serde::{Deserialize, Serialize};

/// Stage that produced an exclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterRule {
    Criteria,
    ProductMetadata,
    DecisionTree,
}

impl FilterRule {
    pub const fn label(self) -> &'static str {
        match self {
            FilterRule::Criteria => "criteria",
            FilterRule::ProductMetadata => "product_metadata",
            FilterRule::DecisionTree => "decision_tree",
        }
    }
}

/// One exclusion and the reason presented to the end user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaFilteredProduct {
    pub carrier_id: String,
    pub carrier_name: String,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub rule: FilterRule,
    pub reason: String,
}

/// Accumulator shared by the criteria evaluator and catalog screening.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilteredProducts {
    entries: Vec<CriteriaFilteredProduct>,
}

impl FilteredProducts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: CriteriaFilteredProduct) {
        self.entries.push(entry);
    }

    pub fn extend<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = CriteriaFilteredProduct>,
    {
        self.entries.extend(entries);
    }

    /// Fold another accumulator in, then drop repeats.
    pub fn merge(&mut self, other: FilteredProducts) {
        self.entries.extend(other.entries);
        self.dedup();
    }

    /// Remove entries repeating an earlier (carrier, product, reason) triple; first one wins.
    pub fn dedup(&mut self) {
        let mut seen: HashSet<(String, Option<String>, String)> = HashSet::new();
        self.entries.retain(|entry| {
            seen.insert((
                entry.carrier_id.clone(),
                entry.product_id.clone(),
                entry.reason.clone(),
            ))
        });
    }

    pub fn entries(&self) -> &[CriteriaFilteredProduct] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<CriteriaFilteredProduct> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Carriers with at least one exclusion, in first-seen order.
    pub fn carrier_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for entry in &self.entries {
            if !ids.contains(&entry.carrier_id) {
                ids.push(entry.carrier_id.clone());
            }
        }
        ids
    }

    pub fn reasons_for(&self, carrier_id: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.carrier_id == carrier_id)
            .map(|entry| entry.reason.as_str())
            .collect()
    }

    /// Write the audit trail as CSV with a header row.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for entry in &self.entries {
            csv_writer.serialize(entry)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

impl FromIterator<CriteriaFilteredProduct> for FilteredProducts {
    fn from_iter<T: IntoIterator<Item = CriteriaFilteredProduct>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FilteredProducts {
    type Item = CriteriaFilteredProduct;
    type IntoIter = std::vec::IntoIter<CriteriaFilteredProduct>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(carrier: &str, product: Option<&str>, rule: FilterRule, reason: &str) -> CriteriaFilteredProduct {
        CriteriaFilteredProduct {
            carrier_id: carrier.to_string(),
            carrier_name: format!("{carrier} Life"),
            product_id: product.map(str::to_string),
            product_name: None,
            rule,
            reason: reason.to_string(),
        }
    }

    #[test]
    fn merge_keeps_first_occurrence_of_each_reason() {
        let mut filtered = FilteredProducts::new();
        filtered.push(entry("c-1", None, FilterRule::Criteria, "knockout condition: copd"));
        filtered.push(entry("c-2", Some("p-9"), FilterRule::ProductMetadata, "age 80 above maximum 75"));

        let mut other = FilteredProducts::new();
        other.push(entry("c-1", None, FilterRule::ProductMetadata, "knockout condition: copd"));
        other.push(entry("c-1", None, FilterRule::Criteria, "not available in state: NY"));
        filtered.merge(other);

        assert_eq!(filtered.len(), 3);
        assert_eq!(filtered.entries()[0].rule, FilterRule::Criteria);
        assert_eq!(filtered.carrier_ids(), vec!["c-1", "c-2"]);
        assert_eq!(
            filtered.reasons_for("c-1"),
            vec!["knockout condition: copd", "not available in state: NY"]
        );
    }

    #[test]
    fn csv_export_includes_header_and_rule_label() {
        let filtered: FilteredProducts =
            vec![entry("c-1", Some("p-1"), FilterRule::Criteria, "age 17 below minimum issue age 18")]
                .into_iter()
                .collect();

        let mut buffer = Vec::new();
        filtered.write_csv(&mut buffer).expect("csv written");
        let text = String::from_utf8(buffer).expect("utf8");

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("carrier_id,carrier_name,product_id,product_name,rule,reason")
        );
        assert_eq!(
            lines.next(),
            Some("c-1,c-1 Life,p-1,,criteria,age 17 below minimum issue age 18")
        );
    }
}
