//! Reduction of AQI rows into a per-country mean.

use crate::types::AqiRecord;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq)]
pub enum AggregateError {
    #[error("row {row}: AQI value '{raw}' for '{country}' is missing or not a number")]
    InvalidValue {
        row: usize,
        country: String,
        raw: String,
    },
}

/// What to do with a row whose AQI text did not parse.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvalidValuePolicy {
    /// Drop the row; it contributes neither to the total nor the count.
    #[default]
    Skip,
    /// Stop at the first bad row.
    Reject,
    /// Count the row as NaN, leaving the country's mean NaN. Blank cells
    /// are treated the same as any other text that does not parse.
    Propagate,
}

/// Canonical country name -> names the boundary data may use instead.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(transparent)]
pub struct AliasTable(BTreeMap<String, Vec<String>>);

impl Default for AliasTable {
    fn default() -> Self {
        let mut table = BTreeMap::new();
        table.insert("Russian Federation".to_string(), vec!["Russia".to_string()]);
        Self(table)
    }
}

impl AliasTable {
    #[cfg(test)]
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    #[cfg(test)]
    pub fn with(mut self, canonical: impl Into<String>, aliases: &[&str]) -> Self {
        self.0
            .entry(canonical.into())
            .or_default()
            .extend(aliases.iter().map(|a| a.to_string()));
        self
    }

    pub fn aliases_of(&self, canonical: &str) -> Option<&[String]> {
        self.0.get(canonical).map(|v| v.as_slice())
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    total: f64,
    count: u32,
}

/// Mean AQI per country. Frozen once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregate {
    means: HashMap<String, f64>,
}

impl Aggregate {
    /// Raw mean for `country`. May be NaN under [`InvalidValuePolicy::Propagate`].
    pub fn get(&self, country: &str) -> Option<f64> {
        self.means.get(country).copied()
    }

    /// Mean for `country`, treating NaN as absent.
    pub fn value(&self, country: &str) -> Option<f64> {
        self.get(country).filter(|v| !v.is_nan())
    }

    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }
}

pub struct Aggregator<'a> {
    policy: InvalidValuePolicy,
    aliases: &'a AliasTable,
    totals: HashMap<String, Accumulator>,
    rows: usize,
    blank_countries: usize,
    invalid_values: usize,
}

impl<'a> Aggregator<'a> {
    pub fn new(policy: InvalidValuePolicy, aliases: &'a AliasTable) -> Self {
        Self {
            policy,
            aliases,
            totals: HashMap::new(),
            rows: 0,
            blank_countries: 0,
            invalid_values: 0,
        }
    }

    pub fn push(&mut self, record: &AqiRecord) -> Result<(), AggregateError> {
        self.rows += 1;

        // Grouped by the label exactly as read; trimming only detects blanks.
        let country = record.country.as_str();
        if country.trim().is_empty() {
            self.blank_countries += 1;
            return Ok(());
        }

        let value = match (record.aqi, self.policy) {
            (Some(v), _) => v,
            (None, InvalidValuePolicy::Skip) => {
                self.invalid_values += 1;
                return Ok(());
            }
            (None, InvalidValuePolicy::Reject) => {
                return Err(AggregateError::InvalidValue {
                    row: self.rows,
                    country: country.to_string(),
                    raw: record.raw.clone(),
                });
            }
            (None, InvalidValuePolicy::Propagate) => {
                self.invalid_values += 1;
                f64::NAN
            }
        };

        let acc = self.totals.entry(country.to_string()).or_default();
        acc.total += value;
        acc.count += 1;
        Ok(())
    }

    pub fn finish(self) -> Aggregate {
        let mut means: HashMap<String, f64> = self
            .totals
            .iter()
            .map(|(country, acc)| (country.clone(), acc.total / acc.count as f64))
            .collect();

        for (canonical, aliases) in self.aliases.iter() {
            let Some(value) = means.get(canonical).copied() else {
                continue;
            };
            for alias in aliases {
                if means.contains_key(alias) {
                    debug!("Alias '{}' already has its own rows, keeping them", alias);
                    continue;
                }
                means.insert(alias.clone(), value);
            }
        }

        info!(
            "Aggregated {} rows into {} countries ({} blank country, {} invalid value)",
            self.rows,
            self.totals.len(),
            self.blank_countries,
            self.invalid_values
        );

        Aggregate { means }
    }
}

pub fn aggregate<'r>(
    records: impl IntoIterator<Item = &'r AqiRecord>,
    policy: InvalidValuePolicy,
    aliases: &AliasTable,
) -> Result<Aggregate, AggregateError> {
    let mut aggregator = Aggregator::new(policy, aliases);
    for record in records {
        aggregator.push(record)?;
    }
    Ok(aggregator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(country: &str, aqi: f64) -> AqiRecord {
        AqiRecord::from_raw(country, aqi.to_string())
    }

    fn run(records: &[AqiRecord], policy: InvalidValuePolicy) -> Result<Aggregate, AggregateError> {
        aggregate(records, policy, &AliasTable::default())
    }

    #[test]
    fn test_mean_per_country() {
        let records = vec![
            rec("France", 10.0),
            rec("France", 20.0),
            rec("France", 30.0),
            rec("Chad", 180.0),
        ];
        let agg = run(&records, InvalidValuePolicy::Skip).unwrap();
        assert_eq!(agg.len(), 2);
        assert_eq!(agg.get("France"), Some(20.0));
        assert_eq!(agg.get("Chad"), Some(180.0));
        assert_eq!(agg.get("Germany"), None);
    }

    #[test]
    fn test_russian_federation_is_copied_to_russia() {
        let records = vec![rec("Russian Federation", 50.0), rec("Russian Federation", 100.0)];
        let agg = run(&records, InvalidValuePolicy::Skip).unwrap();
        assert_eq!(agg.get("Russian Federation"), Some(75.0));
        assert_eq!(agg.get("Russia"), Some(75.0));
        assert_eq!(agg.len(), 2);
    }

    #[test]
    fn test_alias_does_not_override_own_rows() {
        let records = vec![rec("Russian Federation", 75.0), rec("Russia", 10.0)];
        let agg = run(&records, InvalidValuePolicy::Skip).unwrap();
        assert_eq!(agg.get("Russia"), Some(10.0));
    }

    #[test]
    fn test_custom_alias_table() {
        let aliases = AliasTable::empty().with("United States of America", &["USA", "United States"]);
        let records = vec![rec("United States of America", 42.0), rec("Russian Federation", 1.0)];
        let agg = aggregate(&records, InvalidValuePolicy::Skip, &aliases).unwrap();
        assert_eq!(agg.get("USA"), Some(42.0));
        assert_eq!(agg.get("United States"), Some(42.0));
        assert_eq!(agg.get("Russia"), None);
    }

    #[test]
    fn test_skip_policy_ignores_bad_rows() {
        let records = vec![
            rec("Peru", 40.0),
            AqiRecord::from_raw("Peru", "n/a"),
            rec("Peru", 60.0),
            AqiRecord::from_raw("Fiji", "n/a"),
        ];
        let agg = run(&records, InvalidValuePolicy::Skip).unwrap();
        assert_eq!(agg.get("Peru"), Some(50.0));
        assert_eq!(agg.get("Fiji"), None);
    }

    #[test]
    fn test_reject_policy_reports_row() {
        let records = vec![rec("Peru", 40.0), AqiRecord::from_raw("Peru", "n/a")];
        let err = run(&records, InvalidValuePolicy::Reject).unwrap_err();
        assert_eq!(
            err,
            AggregateError::InvalidValue {
                row: 2,
                country: "Peru".to_string(),
                raw: "n/a".to_string(),
            }
        );
        assert!(err.to_string().contains("'n/a'"));
    }

    #[test]
    fn test_propagate_policy_poisons_mean() {
        let records = vec![rec("Peru", 40.0), AqiRecord::from_raw("Peru", "n/a")];
        let agg = run(&records, InvalidValuePolicy::Propagate).unwrap();
        assert!(agg.get("Peru").unwrap().is_nan());
        assert_eq!(agg.value("Peru"), None);
    }

    #[test]
    fn test_blank_country_is_skipped() {
        let records = vec![rec("", 10.0), rec("  ", 20.0), rec("Peru", 30.0)];
        let agg = run(&records, InvalidValuePolicy::Reject).unwrap();
        assert_eq!(agg.len(), 1);
        assert_eq!(agg.get("Peru"), Some(30.0));
    }

    #[test]
    fn test_labels_differing_in_whitespace_stay_separate() {
        let records = vec![rec("Peru", 10.0), rec("Peru ", 30.0)];
        let agg = run(&records, InvalidValuePolicy::Skip).unwrap();
        assert_eq!(agg.len(), 2);
        assert_eq!(agg.get("Peru"), Some(10.0));
        assert_eq!(agg.get("Peru "), Some(30.0));
    }

    #[test]
    fn test_same_input_same_output() {
        let records = vec![rec("India", 150.0), rec("India", 170.0), rec("Russian Federation", 80.0)];
        let first = run(&records, InvalidValuePolicy::Skip).unwrap();
        let second = run(&records, InvalidValuePolicy::Skip).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_input() {
        let agg = run(&[], InvalidValuePolicy::Skip).unwrap();
        assert!(agg.is_empty());
    }
}
