//! Interval cost calculation over level tables

use clap::ValueEnum;
use tracing::{debug, info};

use crate::bonus::{self, BonusFormula, BonusSet};
use crate::duration::{DurationDisplay, format_duration};
use crate::error::Result;
use crate::models::{Row, RowCost, Selection};
use crate::table::{Table, TimeTable};

/// Which rows between the start and end levels are charged.
///
/// A selection whose start is at or past its end charges nothing under every
/// policy; the bounds are never swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BoundaryPolicy {
    /// `start <= ordinal <= end`, for `start < end`.
    #[default]
    #[value(name = "inclusive")]
    InclusiveBoth,
    /// `start < ordinal <= end`
    #[value(name = "exclusive-low")]
    ExclusiveLow,
    /// `ordinal <= end`, for sheets holding cumulative costs.
    #[value(name = "target-only")]
    TargetOnly,
}

/// Rows charged for one selection and their summed cost.
#[derive(Debug, Clone)]
pub struct Interval<'a, C> {
    pub rows: Vec<&'a Row<C>>,
    pub subtotal: C,
}

impl<C: RowCost> Interval<'_, C> {
    fn empty() -> Self {
        Interval {
            rows: Vec::new(),
            subtotal: C::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Sum the rows of `category` between the `start` and `end` labels.
///
/// A selection whose start is at or past its end charges nothing under every
/// policy. Unknown labels are errors.
pub fn compute_interval<'a, C: RowCost>(
    table: &'a Table<C>,
    category: &str,
    start: &str,
    end: &str,
    policy: BoundaryPolicy,
) -> Result<Interval<'a, C>> {
    let start_ord = table.resolve(category, start)?;
    let end_ord = table.resolve(category, end)?;

    if start_ord >= end_ord {
        info!("{}: {} -> {} selects nothing", category, start, end);
        return Ok(Interval::empty());
    }

    let rows = match policy {
        BoundaryPolicy::InclusiveBoth => table.rows_in_range(category, start_ord, end_ord, true, true)?,
        BoundaryPolicy::ExclusiveLow => table.rows_in_range(category, start_ord, end_ord, false, true)?,
        BoundaryPolicy::TargetOnly => table
            .rows(category)?
            .iter()
            .filter(|r| r.ordinal <= end_ord)
            .collect(),
    };

    let mut subtotal = C::default();
    for row in &rows {
        subtotal.accumulate(&row.cost);
    }

    debug!(
        "{}: {} -> {} ({:?}) charges {} rows",
        category,
        start,
        end,
        policy,
        rows.len()
    );

    Ok(Interval { rows, subtotal })
}

/// One building of a multi-building plan.
#[derive(Debug, Clone)]
pub struct PlanEntry<'a> {
    pub selection: Selection,
    pub interval: Interval<'a, u64>,
}

/// Construction time for several buildings at once.
#[derive(Debug, Clone)]
pub struct Plan<'a> {
    pub entries: Vec<PlanEntry<'a>>,
    pub total: u64,
}

/// Sum the intervals of several buildings. Selections that charge nothing
/// are left out of the plan.
pub fn compute_plan<'a>(table: &'a TimeTable, selections: &[Selection], policy: BoundaryPolicy) -> Result<Plan<'a>> {
    let mut entries = Vec::new();
    let mut total = 0u64;

    for selection in selections {
        let interval = compute_interval(table, &selection.category, &selection.start, &selection.end, policy)?;
        if interval.is_empty() {
            continue;
        }
        total = total.saturating_add(interval.subtotal);
        entries.push(PlanEntry {
            selection: selection.clone(),
            interval,
        });
    }

    Ok(Plan { entries, total })
}

/// Per-row breakdown of an interval, one line per level.
pub fn format_interval(interval: &Interval<'_, u64>, indent: usize) -> String {
    let prefix = "  ".repeat(indent);
    let mut output = String::new();
    for row in &interval.rows {
        output.push_str(&format!("{}{:<8} {}\n", prefix, row.label, DurationDisplay(row.cost)));
    }
    output
}

/// Result of a construction time calculation
#[derive(Debug)]
pub struct BuildSummary {
    pub buildings: Vec<(String, u64)>,
    pub raw_seconds: u64,
    pub adjusted_seconds: f64,
    pub adjusted: String,
    pub reduction_percent: f64,
    pub formula: BonusFormula,
}

/// Apply bonuses to a plan's total.
///
/// Fails with `InvalidDuration` if the bonuses push the adjusted time below
/// zero.
pub fn summarize_plan(plan: &Plan<'_>, bonuses: &BonusSet, formula: BonusFormula) -> Result<BuildSummary> {
    let adjusted_seconds = bonus::normalize(plan.total, bonuses, formula);
    let adjusted = format_duration(adjusted_seconds)?;

    Ok(BuildSummary {
        buildings: plan
            .entries
            .iter()
            .map(|e| (e.selection.category.clone(), e.interval.subtotal))
            .collect(),
        raw_seconds: plan.total,
        adjusted_seconds,
        adjusted,
        reduction_percent: bonus::reduction_percent(plan.total, adjusted_seconds),
        formula,
    })
}

impl std::fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Construction Summary ===")?;
        writeln!(f)?;

        writeln!(f, "Unboosted time:")?;
        for (name, secs) in &self.buildings {
            writeln!(f, "  {:<20} {}", name, DurationDisplay(*secs))?;
        }
        writeln!(f, "  {:<20} {}", "Total", DurationDisplay(self.raw_seconds))?;
        writeln!(f)?;

        writeln!(f, "Adjusted time ({:?}):", self.formula)?;
        writeln!(f, "  {}", self.adjusted)?;
        writeln!(f, "  Reduction: {:.2}%", self.reduction_percent)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonus::BonusKind;
    use crate::error::CalcError;
    use crate::models::ResourceLedger;

    fn row(category: &str, label: &str, ordinal: i64, cost: u64) -> Row<u64> {
        Row {
            category: category.to_string(),
            label: label.to_string(),
            ordinal,
            cost,
        }
    }

    fn table() -> TimeTable {
        Table::from_rows(
            "test",
            vec![
                row("Furnace", "28", 28, 10),
                row("Furnace", "29", 29, 20),
                row("Furnace", "30", 30, 40),
                row("Furnace", "30-1", 31, 80),
                row("Furnace", "FC1", 35, 160),
                row("Embassy", "29", 29, 5),
                row("Embassy", "30", 30, 7),
            ],
        )
        .unwrap()
    }

    const POLICIES: [BoundaryPolicy; 3] = [
        BoundaryPolicy::InclusiveBoth,
        BoundaryPolicy::ExclusiveLow,
        BoundaryPolicy::TargetOnly,
    ];

    #[test]
    fn test_inclusive_both() {
        let table = table();
        let interval = compute_interval(&table, "Furnace", "29", "30-1", BoundaryPolicy::InclusiveBoth).unwrap();
        assert_eq!(interval.rows.len(), 3);
        assert_eq!(interval.subtotal, 140);
    }

    #[test]
    fn test_exclusive_low() {
        let table = table();
        let interval = compute_interval(&table, "Furnace", "29", "30-1", BoundaryPolicy::ExclusiveLow).unwrap();
        let labels: Vec<&str> = interval.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["30", "30-1"]);
        assert_eq!(interval.subtotal, 120);
    }

    #[test]
    fn test_target_only_ignores_start() {
        let table = table();
        let interval = compute_interval(&table, "Furnace", "30", "30-1", BoundaryPolicy::TargetOnly).unwrap();
        assert_eq!(interval.rows.len(), 4);
        assert_eq!(interval.subtotal, 150);
    }

    #[test]
    fn test_gap_in_ordinals_is_not_charged() {
        let table = table();
        let interval = compute_interval(&table, "Furnace", "30-1", "FC1", BoundaryPolicy::ExclusiveLow).unwrap();
        assert_eq!(interval.rows.len(), 1);
        assert_eq!(interval.subtotal, 160);
    }

    #[test]
    fn test_same_or_reversed_labels_charge_nothing() {
        let table = table();
        for policy in POLICIES {
            let same = compute_interval(&table, "Furnace", "30", "30", policy).unwrap();
            assert!(same.is_empty());
            assert_eq!(same.subtotal, 0);

            let reversed = compute_interval(&table, "Furnace", "FC1", "29", policy).unwrap();
            assert!(reversed.is_empty());
            assert_eq!(reversed.subtotal, 0);
        }
    }

    #[test]
    fn test_unknown_label_is_error() {
        let table = table();
        let err = compute_interval(&table, "Furnace", "29", "FC9", BoundaryPolicy::InclusiveBoth).unwrap_err();
        assert!(matches!(err, CalcError::UnknownLabel { ref label, .. } if label == "FC9"));

        let err = compute_interval(&table, "Stable", "29", "30", BoundaryPolicy::InclusiveBoth).unwrap_err();
        assert!(matches!(err, CalcError::UnknownCategory(_)));
    }

    #[test]
    fn test_ledger_costs_sum_per_resource() {
        let gear = Table::from_rows(
            "test",
            vec![
                Row {
                    category: "gear".to_string(),
                    label: "Gold".to_string(),
                    ordinal: 0,
                    cost: [("Alloy", 100)].into_iter().collect::<ResourceLedger>(),
                },
                Row {
                    category: "gear".to_string(),
                    label: "Gold 1*".to_string(),
                    ordinal: 1,
                    cost: [("Alloy", 20), ("Polish", 3)].into_iter().collect(),
                },
                Row {
                    category: "gear".to_string(),
                    label: "Gold 2*".to_string(),
                    ordinal: 2,
                    cost: [("Alloy", 30), ("Polish", 4)].into_iter().collect(),
                },
            ],
        )
        .unwrap();

        let interval = compute_interval(&gear, "gear", "Gold", "Gold 2*", BoundaryPolicy::ExclusiveLow).unwrap();
        assert_eq!(interval.subtotal.get("Alloy"), 50);
        assert_eq!(interval.subtotal.get("Polish"), 7);
    }

    #[test]
    fn test_plan_sums_buildings_and_skips_noops() {
        let table = table();
        let selections = vec![
            Selection::new("Furnace", "29", "30"),
            Selection::new("Embassy", "30", "30"),
            Selection::new("Embassy", "29", "30"),
        ];
        let plan = compute_plan(&table, &selections, BoundaryPolicy::ExclusiveLow).unwrap();

        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.entries[0].selection.category, "Furnace");
        assert_eq!(plan.entries[0].interval.subtotal, 40);
        assert_eq!(plan.entries[1].interval.subtotal, 7);
        assert_eq!(plan.total, 47);
    }

    #[test]
    fn test_summary() {
        let table = Table::from_rows("test", vec![row("Furnace", "1", 1, 0), row("Furnace", "2", 2, 230_000)]).unwrap();
        let plan = compute_plan(&table, &[Selection::new("Furnace", "1", "2")], BoundaryPolicy::ExclusiveLow).unwrap();
        let bonuses = BonusSet::new()
            .with(BonusKind::BaseSpeed, 85.0)
            .with(BonusKind::DoubleTime, 20.0)
            .with(BonusKind::VpBonus, 10.0)
            .with(BonusKind::PetBonus, 15.0);

        let summary = summarize_plan(&plan, &bonuses, BonusFormula::AdditiveDenominator).unwrap();
        assert_eq!(summary.raw_seconds, 230_000);
        assert_eq!(summary.adjusted, "1d 3:46:40");
        assert!((summary.reduction_percent - 56.521739).abs() < 1e-4);

        let text = summary.to_string();
        assert!(text.contains("2d 15:53:20"));
        assert!(text.contains("1d 3:46:40"));
    }

    #[test]
    fn test_summary_rejects_negative_adjusted_time() {
        let table = Table::from_rows("test", vec![row("Furnace", "1", 1, 0), row("Furnace", "2", 2, 1000)]).unwrap();
        let plan = compute_plan(&table, &[Selection::new("Furnace", "1", "2")], BoundaryPolicy::InclusiveBoth).unwrap();
        let bonuses = BonusSet::new().with(BonusKind::DoubleTime, 150.0);

        let err = summarize_plan(&plan, &bonuses, BonusFormula::DenominatorThenFactor).unwrap_err();
        assert!(matches!(err, CalcError::InvalidDuration(_)));
    }

    #[test]
    fn test_format_interval() {
        let table = table();
        let interval = compute_interval(&table, "Embassy", "29", "30", BoundaryPolicy::InclusiveBoth).unwrap();
        assert_eq!(format_interval(&interval, 1), "  29       0d 0:00:05\n  30       0d 0:00:07\n");
    }
}
