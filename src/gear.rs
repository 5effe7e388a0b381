//! Chief gear resource shortage
//!
//! Sums the crafting resources needed to take each gear part from its current
//! tier to a target tier, then nets out what the player owns and what the
//! bundles they plan to buy would supply.

use std::fmt;

use tracing::{debug, info};

use crate::calculator::{BoundaryPolicy, compute_interval};
use crate::error::{CalcError, Result};
use crate::models::{BundlePurchase, GearSelection, PackageEntry, ResourceLedger};
use crate::table::GearTable;

/// Category used by sheets that list one tier ladder for every part.
pub const SHARED_GEAR_CATEGORY: &str = "All";

/// A chief gear slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GearPart {
    pub name: &'static str,
    pub korean: &'static str,
    pub troop: &'static str,
}

/// The six chief gear slots, grouped by the troop type they buff.
pub const GEAR_PARTS: [GearPart; 6] = [
    GearPart { name: "Coat", korean: "상의", troop: "Infantry" },
    GearPart { name: "Pants", korean: "하의", troop: "Infantry" },
    GearPart { name: "Ring", korean: "반지", troop: "Marksman" },
    GearPart { name: "Cudgel", korean: "지팡이", troop: "Marksman" },
    GearPart { name: "Hat", korean: "모자", troop: "Lancer" },
    GearPart { name: "Watch", korean: "시계", troop: "Lancer" },
];

/// Bundle price tiers with their Korean store prices.
pub const PRICE_TIERS: [(&str, &str); 5] = [
    ("$5", "7,500원"),
    ("$10", "15,000원"),
    ("$20", "30,000원"),
    ("$50", "79,000원"),
    ("$100", "149,000원"),
];

pub fn find_part(name: &str) -> Option<&'static GearPart> {
    GEAR_PARTS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Purchasable bundles: one entry per (category, package, resource).
#[derive(Debug, Clone, Default)]
pub struct PackageCatalog {
    entries: Vec<PackageEntry>,
}

impl PackageCatalog {
    pub fn new(entries: Vec<PackageEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[PackageEntry] {
        &self.entries
    }

    /// Resource lines of one package.
    pub fn package(&self, category: &str, package: &str) -> impl Iterator<Item = &PackageEntry> {
        self.entries
            .iter()
            .filter(move |e| e.category == category && e.package == package)
    }

    /// Bundle categories in catalog order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !seen.contains(&entry.category.as_str()) {
                seen.push(&entry.category);
            }
        }
        seen
    }

    /// Price tiers of one category in catalog order.
    pub fn packages(&self, category: &str) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for entry in self.entries.iter().filter(|e| e.category == category) {
            if !seen.contains(&entry.package.as_str()) {
                seen.push(&entry.package);
            }
        }
        seen
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One line of the shortage table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortageLine {
    pub resource: String,
    pub needed: u64,
    pub owned: u64,
    pub shortage: u64,
}

/// Needed, supplied and missing resources for a set of gear upgrades.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortageReport {
    pub needed: ResourceLedger,
    pub supplied: ResourceLedger,
    pub total_owned: ResourceLedger,
    pub shortage: ResourceLedger,
}

impl ShortageReport {
    /// One line per needed resource, zero shortages included.
    pub fn lines(&self) -> Vec<ShortageLine> {
        self.needed
            .iter()
            .map(|(resource, needed)| ShortageLine {
                resource: resource.to_string(),
                needed,
                owned: self.total_owned.get(resource),
                shortage: self.shortage.get(resource),
            })
            .collect()
    }
}

impl fmt::Display for ShortageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<12} {:>12} {:>12} {:>12}", "Resource", "Needed", "Owned", "Shortage")?;
        writeln!(f, "{}", "-".repeat(51))?;
        for line in self.lines() {
            writeln!(
                f,
                "{:<12} {:>12} {:>12} {:>12}",
                line.resource, line.needed, line.owned, line.shortage
            )?;
        }
        Ok(())
    }
}

/// Category holding the tiers of `part`.
///
/// Only the known gear slots may use the shared tier ladder.
fn part_category<'a>(table: &GearTable, part: &'a str) -> Result<&'a str> {
    if table.contains_category(part) {
        Ok(part)
    } else if find_part(part).is_some() && table.contains_category(SHARED_GEAR_CATEGORY) {
        Ok(SHARED_GEAR_CATEGORY)
    } else {
        Err(CalcError::UnknownCategory(part.to_string()))
    }
}

/// Resources supplied by the bundles in `purchases`.
pub fn bundle_supply(purchases: &[BundlePurchase], catalog: &PackageCatalog) -> Result<ResourceLedger> {
    let mut supplied = ResourceLedger::new();

    for purchase in purchases.iter().filter(|p| p.count > 0) {
        let mut found = false;
        for entry in catalog.package(&purchase.category, &purchase.package) {
            supplied.add(&entry.resource, entry.amount.saturating_mul(u64::from(purchase.count)));
            found = true;
        }
        if !found {
            return Err(CalcError::UnknownPackage {
                category: purchase.category.clone(),
                package: purchase.package.clone(),
            });
        }
    }

    Ok(supplied)
}

/// Work out what is still missing after owned resources and bundle purchases.
///
/// Upgrading from `current` to `target` costs every tier in `(current, target]`.
/// Parts already at or past their target cost nothing.
pub fn compute_shortage(
    table: &GearTable,
    selections: &[GearSelection],
    owned: &ResourceLedger,
    purchases: &[BundlePurchase],
    catalog: &PackageCatalog,
) -> Result<ShortageReport> {
    let mut needed = table.resource_names();

    for selection in selections {
        let category = part_category(table, &selection.part)?;
        let interval = compute_interval(
            table,
            category,
            &selection.current,
            &selection.target,
            BoundaryPolicy::ExclusiveLow,
        )?;
        if interval.is_empty() {
            info!("{}: {} -> {} needs nothing", selection.part, selection.current, selection.target);
            continue;
        }
        debug!("{}: {} -> {} needs {}", selection.part, selection.current, selection.target, interval.subtotal);
        needed.merge(&interval.subtotal);
    }

    let supplied = bundle_supply(purchases, catalog)?;

    let mut total_owned = owned.clone();
    total_owned.merge(&supplied);

    let shortage = needed
        .iter()
        .map(|(resource, amount)| (resource, amount.saturating_sub(total_owned.get(resource))))
        .collect();

    Ok(ShortageReport {
        needed,
        supplied,
        total_owned,
        shortage,
    })
}
