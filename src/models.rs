//! Data models for level tables, selections and resource ledgers

use std::collections::BTreeMap;
use std::fmt;

/// A cost that can be summed across table rows.
///
/// `Default` is the additive zero.
pub trait RowCost: Clone + Default + fmt::Debug {
    fn accumulate(&mut self, other: &Self);
}

/// Whole seconds. Integer accumulation keeps totals exact to the second;
/// totals saturate at `u64::MAX`.
impl RowCost for u64 {
    fn accumulate(&mut self, other: &Self) {
        *self = self.saturating_add(*other);
    }
}

impl RowCost for ResourceLedger {
    fn accumulate(&mut self, other: &Self) {
        self.merge(other);
    }
}

/// One level (or tier) of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<C> {
    pub category: String,
    pub label: String,
    pub ordinal: i64,
    pub cost: C,
}

/// Resource name -> quantity. Names are kept in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceLedger(BTreeMap<String, u64>);

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quantity for `resource`; absent resources count as zero.
    pub fn get(&self, resource: &str) -> u64 {
        self.0.get(resource).copied().unwrap_or(0)
    }

    /// Add to `resource`, saturating at `u64::MAX`.
    pub fn add(&mut self, resource: &str, amount: u64) {
        let total = self.0.entry(resource.to_string()).or_default();
        *total = total.saturating_add(amount);
    }

    /// Make sure `resource` has a row, without changing its quantity.
    pub fn touch(&mut self, resource: &str) {
        self.0.entry(resource.to_string()).or_default();
    }

    pub fn merge(&mut self, other: &ResourceLedger) {
        for (resource, amount) in &other.0 {
            self.add(resource, *amount);
        }
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.0.contains_key(resource)
    }

    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for ResourceLedger {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut ledger = ResourceLedger::new();
        for (resource, amount) in iter {
            ledger.add(&resource.into(), amount);
        }
        ledger
    }
}

impl fmt::Display for ResourceLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(r, a)| format!("{}={}", r, a)).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// A start/end pair within one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub category: String,
    pub start: String,
    pub end: String,
}

impl Selection {
    pub fn new(category: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            start: start.into(),
            end: end.into(),
        }
    }
}

/// Upgrade of one gear part from its current tier to a target tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GearSelection {
    pub part: String,
    pub current: String,
    pub target: String,
}

impl GearSelection {
    pub fn new(part: impl Into<String>, current: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            part: part.into(),
            current: current.into(),
            target: target.into(),
        }
    }
}

/// A number of bundles bought at one price tier of one bundle category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePurchase {
    pub category: String,
    pub package: String,
    pub count: u32,
}

/// One resource line of a purchasable bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    pub category: String,
    pub package: String,
    pub resource: String,
    pub amount: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_missing_resource_is_zero() {
        let ledger: ResourceLedger = [("Alloy", 10)].into_iter().collect();
        assert_eq!(ledger.get("Alloy"), 10);
        assert_eq!(ledger.get("Amber"), 0);
        assert!(!ledger.contains("Amber"));
    }

    #[test]
    fn test_ledger_merge_sums_per_resource() {
        let mut a: ResourceLedger = [("Alloy", 10), ("Polish", 2)].into_iter().collect();
        let b: ResourceLedger = [("Alloy", 5), ("Design", 1)].into_iter().collect();
        a.merge(&b);

        assert_eq!(a.get("Alloy"), 15);
        assert_eq!(a.get("Polish"), 2);
        assert_eq!(a.get("Design"), 1);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_sums_saturate_instead_of_overflowing() {
        let mut secs = u64::MAX - 1;
        secs.accumulate(&10);
        assert_eq!(secs, u64::MAX);

        let mut ledger: ResourceLedger = [("Alloy", u64::MAX)].into_iter().collect();
        ledger.add("Alloy", 1);
        assert_eq!(ledger.get("Alloy"), u64::MAX);
    }

    #[test]
    fn test_ledger_touch_keeps_quantity() {
        let mut ledger: ResourceLedger = [("Alloy", 3)].into_iter().collect();
        ledger.touch("Alloy");
        ledger.touch("Amber");
        assert_eq!(ledger.get("Alloy"), 3);
        assert!(ledger.contains("Amber"));
        assert_eq!(ledger.to_string(), "Alloy=3, Amber=0");
    }
}
