//! Upgrade Calculator
//!
//! Construction time and chief gear resource calculator for Whiteout Survival.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use upgrade_calculator::bonus::{BonusFormula, BonusKind, BonusSet};
use upgrade_calculator::calculator::{self, BoundaryPolicy};
use upgrade_calculator::db;
use upgrade_calculator::duration::DurationDisplay;
use upgrade_calculator::gear::{self, PRICE_TIERS};
use upgrade_calculator::import;
use upgrade_calculator::labels::{fc_label, gear_tier_korean};
use upgrade_calculator::models::{BundlePurchase, GearSelection, PackageEntry, ResourceLedger, Row, Selection};

#[derive(Parser)]
#[command(name = "upgrade-calculator")]
#[command(about = "Construction time and gear resource calculator for Whiteout Survival")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, env = "UPGRADE_CALC_DB", default_value = "upgrade_data.db")]
    database: PathBuf,

    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BonusArgs {
    /// Base construction speed (%)
    #[arg(long, default_value_t = 85.0, allow_negative_numbers = true)]
    speed: f64,

    /// Double Time boost (%), 0 to disable
    #[arg(long, default_value_t = 20.0, allow_negative_numbers = true)]
    double_time: f64,

    /// VP bonus (%), 0 to disable
    #[arg(long, default_value_t = 10.0, allow_negative_numbers = true)]
    vp: f64,

    /// Builder's Aide pet bonus (%)
    #[arg(long, default_value_t = 15.0, allow_negative_numbers = true)]
    pet: f64,

    /// Mercantilism bonus (%)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    mercantilism: f64,

    /// How the bonuses combine
    #[arg(long, value_enum, default_value_t)]
    formula: BonusFormula,
}

impl BonusArgs {
    fn bonus_set(&self) -> BonusSet {
        BonusSet::new()
            .with(BonusKind::BaseSpeed, self.speed)
            .with(BonusKind::DoubleTime, self.double_time)
            .with(BonusKind::VpBonus, self.vp)
            .with(BonusKind::PetBonus, self.pet)
            .with(BonusKind::Mercantilism, self.mercantilism)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Import level, gear and bundle CSV sheets from a directory
    Import {
        /// Directory searched recursively for *.csv
        data_dir: PathBuf,

        /// Clear existing data before import
        #[arg(long)]
        clear: bool,
    },

    /// Load sample data for testing (without data sheets)
    LoadSample,

    /// List all buildings in the database
    ListBuildings,

    /// Show the levels of one building
    Levels {
        /// Building name (e.g., "Furnace")
        building: String,
    },

    /// Show the gear tier ladder
    Tiers {
        /// Show Korean tier names
        #[arg(long)]
        korean: bool,
    },

    /// Show bundle contents
    Packages {
        /// Only this bundle category (e.g., "Sublime")
        category: Option<String>,
    },

    /// Construction time for one building
    Build {
        /// Building name
        building: String,

        /// Current level label (e.g., "FC3")
        start: String,

        /// Target level label (e.g., "FC4")
        end: String,

        /// Which levels between start and end are charged
        #[arg(long, value_enum, default_value_t)]
        policy: BoundaryPolicy,

        #[command(flatten)]
        bonuses: BonusArgs,

        /// Show the time of every charged level
        #[arg(short, long)]
        breakdown: bool,
    },

    /// Construction time for several buildings
    Plan {
        /// Targets as Building=START:END (e.g., "Furnace=FC3:FC4")
        #[arg(required = true, value_parser = parse_target)]
        targets: Vec<Selection>,

        /// Which levels between start and end are charged
        #[arg(long, value_enum, default_value_t)]
        policy: BoundaryPolicy,

        #[command(flatten)]
        bonuses: BonusArgs,

        /// Show the time of every charged level
        #[arg(short, long)]
        breakdown: bool,
    },

    /// Resource shortage for chief gear upgrades
    Gear {
        /// Upgrade as Part=CURRENT:TARGET (e.g., "Hat=Gold:Gold T1")
        #[arg(long = "part", required = true, value_parser = parse_gear)]
        parts: Vec<GearSelection>,

        /// Owned resources as Resource=AMOUNT
        #[arg(long = "owned", value_parser = parse_owned)]
        owned: Vec<(String, u64)>,

        /// Bundles to buy as Category:Package=COUNT (e.g., "Sublime:$5=2")
        #[arg(long = "buy", value_parser = parse_purchase)]
        purchases: Vec<BundlePurchase>,

        /// Show Korean tier names
        #[arg(long)]
        korean: bool,
    },
}

fn parse_target(s: &str) -> std::result::Result<Selection, String> {
    let (building, range) = s.split_once('=').ok_or("expected Building=START:END")?;
    let (start, end) = range.split_once(':').ok_or("expected Building=START:END")?;
    Ok(Selection::new(building.trim(), start.trim(), end.trim()))
}

fn parse_gear(s: &str) -> std::result::Result<GearSelection, String> {
    let (part, range) = s.split_once('=').ok_or("expected Part=CURRENT:TARGET")?;
    let (current, target) = range.split_once(':').ok_or("expected Part=CURRENT:TARGET")?;
    let part = gear::find_part(part.trim()).map_or(part.trim(), |p| p.name);
    Ok(GearSelection::new(part, current.trim(), target.trim()))
}

fn parse_owned(s: &str) -> std::result::Result<(String, u64), String> {
    let (resource, amount) = s.split_once('=').ok_or("expected Resource=AMOUNT")?;
    let amount = amount.trim().parse().map_err(|e| format!("bad amount '{}': {}", amount, e))?;
    Ok((resource.trim().to_string(), amount))
}

fn parse_purchase(s: &str) -> std::result::Result<BundlePurchase, String> {
    let (bundle, count) = s.rsplit_once('=').ok_or("expected Category:Package=COUNT")?;
    let (category, package) = bundle.split_once(':').ok_or("expected Category:Package=COUNT")?;
    let count = count.trim().parse().map_err(|e| format!("bad count '{}': {}", count, e))?;
    Ok(BundlePurchase {
        category: category.trim().to_string(),
        package: package.trim().to_string(),
        count,
    })
}

fn setup_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open database {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::Import { data_dir, clear } => {
            if clear {
                println!("Clearing existing data...");
                db::clear_data(&conn)?;
            }

            let stats = import::import_to_database(&conn, &data_dir)?;
            println!("{}", stats);
        }

        Commands::LoadSample => {
            load_sample_data(&conn)?;
            println!("Sample data loaded successfully!");
        }

        Commands::ListBuildings => {
            let table = db::load_time_table(&conn).context("Failed to load construction table")?;
            if table.is_empty() {
                println!("No buildings in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<20} {:>7} {:>8} {:>8}", "Building", "Levels", "From", "To");
                println!("{}", "-".repeat(46));
                for building in table.categories() {
                    let rows = table.rows(building)?;
                    let first = rows.first().map_or("", |r| r.label.as_str());
                    let last = rows.last().map_or("", |r| r.label.as_str());
                    println!("{:<20} {:>7} {:>8} {:>8}", building, rows.len(), first, last);
                }
            }
        }

        Commands::Levels { building } => {
            let table = db::load_time_table(&conn).context("Failed to load construction table")?;
            println!("{}:", building);
            for row in table.rows(&building)? {
                println!("  {:<8} {:>4}  {}", row.label, row.ordinal, DurationDisplay(row.cost));
            }
        }

        Commands::Tiers { korean } => {
            let table = db::load_gear_table(&conn).context("Failed to load gear table")?;
            if table.is_empty() {
                println!("No gear tiers in database. Run 'import' or 'load-sample' first.");
            }
            for category in table.categories() {
                println!("{}:", category);
                for row in table.rows(category)? {
                    let label = if korean { gear_tier_korean(&row.label) } else { row.label.clone() };
                    println!("  {:<18} {}", label, row.cost);
                }
            }
        }

        Commands::Packages { category } => {
            let catalog = db::load_catalog(&conn).context("Failed to load bundle catalog")?;
            let categories: Vec<&str> = match &category {
                Some(c) => vec![c.as_str()],
                None => catalog.categories(),
            };
            for cat in categories {
                println!("{}:", cat);
                for package in catalog.packages(cat) {
                    let krw = PRICE_TIERS.iter().find(|(p, _)| *p == package).map_or("", |(_, k)| *k);
                    println!("  {} {}", package, krw);
                    for entry in catalog.package(cat, package) {
                        println!("    {}: {}", entry.resource, entry.amount);
                    }
                }
            }
        }

        Commands::Build {
            building,
            start,
            end,
            policy,
            bonuses,
            breakdown,
        } => {
            let table = db::load_time_table(&conn).context("Failed to load construction table")?;
            run_plan(&table, &[Selection::new(building, start, end)], policy, &bonuses, breakdown)?;
        }

        Commands::Plan {
            targets,
            policy,
            bonuses,
            breakdown,
        } => {
            let table = db::load_time_table(&conn).context("Failed to load construction table")?;
            run_plan(&table, &targets, policy, &bonuses, breakdown)?;
        }

        Commands::Gear {
            parts,
            owned,
            purchases,
            korean,
        } => {
            let table = db::load_gear_table(&conn).context("Failed to load gear table")?;
            let catalog = db::load_catalog(&conn).context("Failed to load bundle catalog")?;
            let owned: ResourceLedger = owned.into_iter().collect();

            let tier = |label: &str| if korean { gear_tier_korean(label) } else { label.to_string() };
            for selection in &parts {
                let name = match gear::find_part(&selection.part) {
                    Some(part) if korean => format!("{} ({})", part.korean, part.troop),
                    Some(part) => format!("{} ({})", part.name, part.troop),
                    None => selection.part.clone(),
                };
                println!("{}: {} -> {}", name, tier(&selection.current), tier(&selection.target));
            }
            println!();

            let report = gear::compute_shortage(&table, &parts, &owned, &purchases, &catalog)?;
            if !report.supplied.is_empty() {
                println!("From bundles: {}", report.supplied);
                println!();
            }
            print!("{}", report);
        }
    }

    Ok(())
}

fn run_plan(
    table: &upgrade_calculator::table::TimeTable,
    selections: &[Selection],
    policy: BoundaryPolicy,
    bonuses: &BonusArgs,
    breakdown: bool,
) -> Result<()> {
    if table.is_empty() {
        return Err(anyhow!("No buildings in database. Run 'import' or 'load-sample' first."));
    }

    let plan = calculator::compute_plan(table, selections, policy)?;
    if plan.entries.is_empty() {
        println!("Nothing to build: every target is at or below its current level.");
        return Ok(());
    }

    if breakdown {
        for entry in &plan.entries {
            println!("{} ({} -> {}):", entry.selection.category, entry.selection.start, entry.selection.end);
            print!("{}", calculator::format_interval(&entry.interval, 1));
        }
        println!();
    }

    let summary = calculator::summarize_plan(&plan, &bonuses.bonus_set(), bonuses.formula)?;
    print!("{}", summary);
    Ok(())
}

/// Load sample construction, gear and bundle data for testing without sheets
fn load_sample_data(conn: &Connection) -> Result<()> {
    db::clear_data(conn)?;

    // Furnace 25 through FC5, the others a little cheaper.
    let buildings = [("Furnace", 1.0), ("Embassy", 0.45), ("Command Center", 0.4), ("Infantry Camp", 0.6)];
    for (building, scale) in buildings {
        for ordinal in 25..=55 {
            let Some(label) = fc_label(ordinal) else { continue };
            let base = 3_600.0 * 1.18f64.powi((ordinal - 24) as i32) * 10.0;
            let row = Row {
                category: building.to_string(),
                label,
                ordinal,
                cost: (base * scale).round() as u64,
            };
            db::insert_level_cost(conn, "sample", &row)?;
        }
    }

    let tiers: [(&str, [u64; 4]); 8] = [
        ("Gold", [0, 0, 0, 0]),
        ("Gold 1*", [1_500, 15, 0, 0]),
        ("Gold 2*", [3_800, 40, 0, 0]),
        ("Gold 3*", [7_000, 70, 0, 0]),
        ("Gold T1", [9_700, 95, 45, 0]),
        ("Gold T1 1*", [1_000, 10, 50, 0]),
        ("Gold T1 2*", [1_000, 10, 52, 0]),
        ("Gold T1 3*", [1_100, 10, 55, 0]),
    ];
    for (ordinal, (label, amounts)) in tiers.iter().enumerate() {
        let cost: ResourceLedger = ["Alloy", "Polish", "Design", "Amber"]
            .into_iter()
            .zip(amounts.iter().copied())
            .collect();
        let row = Row {
            category: gear::SHARED_GEAR_CATEGORY.to_string(),
            label: label.to_string(),
            ordinal: ordinal as i64,
            cost,
        };
        db::insert_gear_cost(conn, "sample", &row)?;
    }

    let packages = [
        ("Sublime", "$5", "Alloy", 500),
        ("Sublime", "$5", "Polish", 5),
        ("Sublime", "$10", "Alloy", 1_200),
        ("Sublime", "$10", "Polish", 12),
        ("Exquisite", "$5", "Alloy", 300),
        ("Classic", "$5", "Alloy", 150),
        ("DawnMarket", "$5", "Design", 10),
        ("DawnMarket", "$10", "Design", 25),
    ];
    for (category, package, resource, amount) in packages {
        let entry = PackageEntry {
            category: category.to_string(),
            package: package.to_string(),
            resource: resource.to_string(),
            amount,
        };
        db::insert_package(conn, "sample", &entry)?;
    }

    println!(
        "Loaded {} sample buildings, {} gear tiers, {} bundle lines",
        buildings.len(),
        tiers.len(),
        packages.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        let sel = parse_target(" Command Center = FC3 : 30-1 ").unwrap();
        assert_eq!(sel.category, "Command Center");
        assert_eq!(sel.start, "FC3");
        assert_eq!(sel.end, "30-1");

        assert!(parse_target("Furnace FC3:FC4").is_err());
        assert!(parse_target("Furnace=FC3").is_err());
    }

    #[test]
    fn test_parse_gear_normalizes_part() {
        let sel = parse_gear("hat=Gold:Gold T1").unwrap();
        assert_eq!(sel.part, "Hat");
        assert_eq!(sel.current, "Gold");
        assert_eq!(sel.target, "Gold T1");

        // Unknown parts pass through; the calculator reports them.
        assert_eq!(parse_gear("Boots=Gold:Gold T1").unwrap().part, "Boots");
        assert!(parse_gear("Hat=Gold").is_err());
        assert!(parse_gear("Hat:Gold:Gold T1").is_err());
    }

    #[test]
    fn test_parse_owned() {
        assert_eq!(parse_owned("Alloy = 100").unwrap(), ("Alloy".to_string(), 100));
        assert!(parse_owned("Alloy=abc").unwrap_err().contains("bad amount"));
        assert!(parse_owned("Alloy=-5").is_err());
        assert!(parse_owned("Alloy").is_err());
    }

    #[test]
    fn test_parse_purchase() {
        let purchase = parse_purchase("Sublime:$5=2").unwrap();
        assert_eq!(purchase.category, "Sublime");
        assert_eq!(purchase.package, "$5");
        assert_eq!(purchase.count, 2);

        // The count follows the last '='.
        let purchase = parse_purchase("Daily:a=b=3").unwrap();
        assert_eq!(purchase.package, "a=b");
        assert_eq!(purchase.count, 3);

        assert!(parse_purchase("Sublime:$5=x").unwrap_err().contains("bad count"));
        assert!(parse_purchase("Sublime$5=2").is_err());
        assert!(parse_purchase("Sublime:$5").is_err());
    }
}
