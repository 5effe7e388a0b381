//! Immutable level tables
//!
//! A table partitions rows by category (a building, or a gear part) and keeps
//! each partition sorted by ordinal. Tables are built once and only read
//! afterwards.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{CalcError, Result};
use crate::models::{ResourceLedger, Row, RowCost};

/// Ordered rows for every category.
#[derive(Debug, Clone)]
pub struct Table<C> {
    categories: Vec<String>,
    rows: HashMap<String, Vec<Row<C>>>,
}

/// Building level -> construction seconds.
pub type TimeTable = Table<u64>;

/// Gear tier -> resource cost of upgrading into that tier.
pub type GearTable = Table<ResourceLedger>;

impl<C: RowCost> Table<C> {
    /// Build a table from unordered rows.
    ///
    /// Rows repeating the same (category, ordinal, label) are merged by summing
    /// their costs. `origin` names the source in error messages.
    pub fn from_rows(origin: &str, rows: impl IntoIterator<Item = Row<C>>) -> Result<Self> {
        let mut categories = Vec::new();
        let mut grouped: HashMap<String, Vec<Row<C>>> = HashMap::new();

        for row in rows {
            if !grouped.contains_key(&row.category) {
                categories.push(row.category.clone());
            }
            grouped.entry(row.category.clone()).or_default().push(row);
        }

        let mut merged_rows = HashMap::with_capacity(grouped.len());
        for (category, mut rows) in grouped {
            rows.sort_by_key(|r| r.ordinal);

            let mut merged: Vec<Row<C>> = Vec::with_capacity(rows.len());
            for row in rows {
                match merged.last_mut() {
                    Some(last) if last.ordinal == row.ordinal => {
                        if last.label != row.label {
                            return Err(CalcError::data_load(
                                origin,
                                format!(
                                    "{}: ordinal {} is labelled both '{}' and '{}'",
                                    category, row.ordinal, last.label, row.label
                                ),
                            ));
                        }
                        last.cost.accumulate(&row.cost);
                    }
                    _ => merged.push(row),
                }
            }

            let mut seen = HashSet::new();
            for row in &merged {
                if !seen.insert(row.label.as_str()) {
                    return Err(CalcError::data_load(
                        origin,
                        format!("{}: label '{}' appears at more than one ordinal", category, row.label),
                    ));
                }
            }

            merged_rows.insert(category, merged);
        }

        debug!(
            "Built table from {}: {} categories, {} rows",
            origin,
            categories.len(),
            merged_rows.values().map(Vec::len).sum::<usize>()
        );

        Ok(Self {
            categories,
            rows: merged_rows,
        })
    }

    /// Build a table from rows grouped by the sheet they came from.
    ///
    /// Duplicate rows are merged only within one source. Two sources that
    /// both define the same (category, ordinal) are a `DataLoad` error.
    pub fn from_sources(origin: &str, sources: impl IntoIterator<Item = (String, Vec<Row<C>>)>) -> Result<Self> {
        let mut owners: HashMap<(String, i64), String> = HashMap::new();
        let mut combined = Vec::new();

        for (source, rows) in sources {
            let table = Table::from_rows(&source, rows)?;
            for category in &table.categories {
                for row in &table.rows[category] {
                    let key = (category.clone(), row.ordinal);
                    if let Some(owner) = owners.get(&key) {
                        return Err(CalcError::data_load(
                            origin,
                            format!(
                                "{} level '{}' is defined by both {} and {}",
                                category, row.label, owner, source
                            ),
                        ));
                    }
                    owners.insert(key, source.clone());
                }
            }
            for category in &table.categories {
                combined.extend(table.rows[category].iter().cloned());
            }
        }

        Table::from_rows(origin, combined)
    }

    /// Categories in the order they first appeared in the source.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.rows.contains_key(category)
    }

    /// All rows of a category, ascending by ordinal.
    pub fn rows(&self, category: &str) -> Result<&[Row<C>]> {
        self.rows
            .get(category)
            .map(Vec::as_slice)
            .ok_or_else(|| CalcError::UnknownCategory(category.to_string()))
    }

    /// Labels of a category, ascending by ordinal.
    pub fn labels(&self, category: &str) -> Result<Vec<&str>> {
        Ok(self.rows(category)?.iter().map(|r| r.label.as_str()).collect())
    }

    /// Ordinal of `label` within `category`.
    pub fn resolve(&self, category: &str, label: &str) -> Result<i64> {
        self.rows(category)?
            .iter()
            .find(|r| r.label == label)
            .map(|r| r.ordinal)
            .ok_or_else(|| CalcError::UnknownLabel {
                category: category.to_string(),
                label: label.to_string(),
            })
    }

    /// Rows whose ordinal lies between `low` and `high`, ascending.
    ///
    /// Each bound is inclusive or exclusive per its flag. No qualifying rows
    /// gives an empty vector.
    pub fn rows_in_range(
        &self,
        category: &str,
        low: i64,
        high: i64,
        inclusive_low: bool,
        inclusive_high: bool,
    ) -> Result<Vec<&Row<C>>> {
        Ok(self
            .rows(category)?
            .iter()
            .filter(|r| if inclusive_low { r.ordinal >= low } else { r.ordinal > low })
            .filter(|r| if inclusive_high { r.ordinal <= high } else { r.ordinal < high })
            .collect())
    }

    /// Total number of rows across all categories.
    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GearTable {
    /// Every resource named by any row, each at zero.
    pub fn resource_names(&self) -> ResourceLedger {
        let mut names = ResourceLedger::new();
        for rows in self.rows.values() {
            for row in rows {
                for resource in row.cost.resources() {
                    names.touch(resource);
                }
            }
        }
        names
    }
}
