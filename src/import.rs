//! CSV sheet import
//!
//! Finds level, gear and bundle sheets under a data directory, parses them
//! into table rows and stores them in the database. The same parsers back the
//! direct `load_*_csv` loaders.

use std::fmt;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use rusqlite::Connection;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::db;
use crate::error::{CalcError, Result};
use crate::gear::{PackageCatalog, SHARED_GEAR_CATEGORY};
use crate::labels::fc_label;
use crate::models::{PackageEntry, ResourceLedger, Row};
use crate::table::{GearTable, Table, TimeTable};

/// What a sheet holds, judged from its header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    Construction,
    Gear,
    Packages,
}

/// A parsed CSV file.
struct Sheet {
    origin: String,
    headers: StringRecord,
    records: Vec<StringRecord>,
}

impl Sheet {
    fn read(path: &Path) -> Result<Self> {
        let origin = path.display().to_string();
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .from_path(path)
            .map_err(|e| CalcError::data_load(&origin, e))?;

        let headers = reader.headers().map_err(|e| CalcError::data_load(&origin, e))?.clone();
        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| CalcError::data_load(&origin, e))?;

        Ok(Self {
            origin,
            headers,
            records,
        })
    }

    /// Index of the first header matching any of `names`, ignoring case.
    fn column(&self, names: &[&str]) -> Option<usize> {
        self.headers.iter().position(|h| {
            let h = h.trim_start_matches('\u{feff}');
            names.iter().any(|n| h.eq_ignore_ascii_case(n))
        })
    }

    fn require(&self, names: &[&str]) -> Result<usize> {
        self.column(names).ok_or_else(|| {
            CalcError::data_load(&self.origin, format!("missing required column '{}'", names[0]))
        })
    }

    fn kind(&self) -> Option<SheetKind> {
        let has = |names: &[&str]| self.column(names).is_some();

        if has(&["Category"]) && has(&["Package"]) && has(&["Resource"]) && has(&["Amount"]) {
            Some(SheetKind::Packages)
        } else if has(BUILDING_COLUMNS) && has(SECONDS_COLUMNS) {
            Some(SheetKind::Construction)
        } else if has(&["Level"]) && !has(BUILDING_COLUMNS) {
            Some(SheetKind::Gear)
        } else {
            None
        }
    }

    fn error(&self, line: usize, reason: impl fmt::Display) -> CalcError {
        // +2: header row, 1-based lines
        CalcError::data_load(&self.origin, format!("line {}: {}", line + 2, reason))
    }
}

const BUILDING_COLUMNS: &[&str] = &["Building", "Category"];
const SECONDS_COLUMNS: &[&str] = &["Total", "Seconds", "Cost"];
const ORDINAL_COLUMNS: &[&str] = &["numerical", "Ordinal"];
const LABEL_COLUMNS: &[&str] = &["Label", "fc_level"];
const PART_COLUMNS: &[&str] = &["Part", "Slot"];

/// Non-negative whole number, also accepting float spellings like `3600.0`.
fn parse_amount(field: &str) -> Option<u64> {
    if let Ok(n) = field.parse::<u64>() {
        return Some(n);
    }
    let f: f64 = field.parse().ok()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0).then_some(f as u64)
}

fn parse_ordinal(field: &str) -> Option<i64> {
    if let Ok(n) = field.parse::<i64>() {
        return Some(n);
    }
    let f: f64 = field.parse().ok()?;
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

fn parse_time_sheet(sheet: &Sheet) -> Result<Vec<Row<u64>>> {
    let building_col = sheet.require(BUILDING_COLUMNS)?;
    let seconds_col = sheet.require(SECONDS_COLUMNS)?;
    let ordinal_col = sheet.column(ORDINAL_COLUMNS);
    let level_col = sheet.column(&["Level"]);
    let label_col = sheet.column(LABEL_COLUMNS).or(level_col);
    let ordinal_col = ordinal_col
        .or(level_col)
        .ok_or_else(|| CalcError::data_load(&sheet.origin, "missing required column 'Level' or 'numerical'"))?;

    let mut rows = Vec::with_capacity(sheet.records.len());
    for (line, record) in sheet.records.iter().enumerate() {
        let ordinal_field = record.get(ordinal_col).unwrap_or("");
        if ordinal_field.is_empty() {
            debug!("{}: skipping line {} with no level", sheet.origin, line + 2);
            continue;
        }
        let ordinal = parse_ordinal(ordinal_field)
            .ok_or_else(|| sheet.error(line, format!("bad level '{}'", ordinal_field)))?;

        let label = match label_col {
            Some(col) if col != ordinal_col => record.get(col).unwrap_or("").to_string(),
            // Level doubles as the ordinal; normalize spellings like "22.0".
            Some(_) => ordinal.to_string(),
            None => match fc_label(ordinal) {
                Some(label) => label,
                None => {
                    debug!("{}: skipping level {} with no in-game label", sheet.origin, ordinal);
                    continue;
                }
            },
        };
        let label = if label.is_empty() { ordinal.to_string() } else { label };

        let seconds_field = record.get(seconds_col).unwrap_or("");
        let seconds = parse_amount(seconds_field)
            .ok_or_else(|| sheet.error(line, format!("bad duration '{}'", seconds_field)))?;

        rows.push(Row {
            category: record.get(building_col).unwrap_or("").to_string(),
            label,
            ordinal,
            cost: seconds,
        });
    }
    Ok(rows)
}

fn parse_gear_sheet(sheet: &Sheet) -> Result<Vec<Row<ResourceLedger>>> {
    let level_col = sheet.require(&["Level"])?;
    let ordinal_col = sheet.column(&["Ordinal"]);
    let part_col = sheet.column(PART_COLUMNS);

    let resource_cols: Vec<(usize, String)> = sheet
        .headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != level_col && Some(*i) != ordinal_col && Some(*i) != part_col)
        .map(|(i, h)| (i, h.to_string()))
        .collect();
    if resource_cols.is_empty() {
        return Err(CalcError::data_load(&sheet.origin, "no resource columns"));
    }

    let mut next_ordinal: std::collections::HashMap<String, i64> = std::collections::HashMap::new();
    let mut rows = Vec::with_capacity(sheet.records.len());
    for (line, record) in sheet.records.iter().enumerate() {
        let label = record.get(level_col).unwrap_or("");
        if label.is_empty() {
            continue;
        }
        let category = part_col
            .and_then(|col| record.get(col))
            .filter(|p| !p.is_empty())
            .unwrap_or(SHARED_GEAR_CATEGORY)
            .to_string();

        let counter = next_ordinal.entry(category.clone()).or_default();
        let ordinal = match ordinal_col {
            Some(col) => {
                let field = record.get(col).unwrap_or("");
                parse_ordinal(field).ok_or_else(|| sheet.error(line, format!("bad ordinal '{}'", field)))?
            }
            None => *counter,
        };
        *counter += 1;

        let mut cost = ResourceLedger::new();
        for (col, resource) in &resource_cols {
            let field = record.get(*col).unwrap_or("");
            let amount = if field.is_empty() {
                0
            } else {
                parse_amount(field).ok_or_else(|| sheet.error(line, format!("bad {} '{}'", resource, field)))?
            };
            cost.add(resource, amount);
        }

        rows.push(Row {
            category,
            label: label.to_string(),
            ordinal,
            cost,
        });
    }
    Ok(rows)
}

fn parse_package_sheet(sheet: &Sheet) -> Result<Vec<PackageEntry>> {
    let category_col = sheet.require(&["Category"])?;
    let package_col = sheet.require(&["Package"])?;
    let resource_col = sheet.require(&["Resource"])?;
    let amount_col = sheet.require(&["Amount"])?;

    sheet
        .records
        .iter()
        .enumerate()
        .map(|(line, record)| {
            let amount_field = record.get(amount_col).unwrap_or("");
            Ok(PackageEntry {
                category: record.get(category_col).unwrap_or("").to_string(),
                package: record.get(package_col).unwrap_or("").to_string(),
                resource: record.get(resource_col).unwrap_or("").to_string(),
                amount: parse_amount(amount_field)
                    .ok_or_else(|| sheet.error(line, format!("bad amount '{}'", amount_field)))?,
            })
        })
        .collect()
}

/// Load a construction time sheet.
pub fn load_time_csv(path: &Path) -> Result<TimeTable> {
    let sheet = Sheet::read(path)?;
    Table::from_rows(&sheet.origin, parse_time_sheet(&sheet)?)
}

/// Load a gear tier sheet.
pub fn load_gear_csv(path: &Path) -> Result<GearTable> {
    let sheet = Sheet::read(path)?;
    Table::from_rows(&sheet.origin, parse_gear_sheet(&sheet)?)
}

/// Load a bundle catalog sheet.
pub fn load_catalog_csv(path: &Path) -> Result<PackageCatalog> {
    let sheet = Sheet::read(path)?;
    Ok(PackageCatalog::new(parse_package_sheet(&sheet)?))
}

/// Find all CSV files under `data_dir`, in a stable order.
pub fn find_sheets(data_dir: &Path) -> Result<Vec<PathBuf>> {
    if !data_dir.is_dir() {
        return Err(CalcError::data_load(data_dir.display().to_string(), "not a directory"));
    }

    let mut sheets = Vec::new();
    for entry in WalkDir::new(data_dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")) {
            sheets.push(path.to_path_buf());
        }
    }
    Ok(sheets)
}

/// Parse one sheet and store it, replacing anything stored from the same file.
fn import_sheet(conn: &Connection, path: &Path, source: &str, stats: &mut ImportStats) -> Result<Option<SheetKind>> {
    let sheet = Sheet::read(path)?;
    let Some(kind) = sheet.kind() else {
        return Ok(None);
    };

    let tx = conn.unchecked_transaction()?;
    db::delete_source(&tx, source)?;

    match kind {
        SheetKind::Construction => {
            let rows = parse_time_sheet(&sheet)?;
            // Reject sheets that would not form a valid table.
            Table::from_rows(&sheet.origin, rows.clone())?;
            for row in &rows {
                db::insert_level_cost(&tx, source, row)?;
            }
            stats.levels += rows.len();
        }
        SheetKind::Gear => {
            let rows = parse_gear_sheet(&sheet)?;
            Table::from_rows(&sheet.origin, rows.clone())?;
            for row in &rows {
                db::insert_gear_cost(&tx, source, row)?;
            }
            stats.tiers += rows.len();
        }
        SheetKind::Packages => {
            let entries = parse_package_sheet(&sheet)?;
            for entry in &entries {
                db::insert_package(&tx, source, entry)?;
            }
            stats.packages += entries.len();
        }
    }

    tx.commit()?;
    Ok(Some(kind))
}

/// Import every recognizable sheet under `data_dir` into the database.
pub fn import_to_database(conn: &Connection, data_dir: &Path) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    info!("Scanning {} for sheets", data_dir.display());
    let sheets = find_sheets(data_dir)?;
    info!("Found {} CSV files", sheets.len());

    for path in &sheets {
        // Sheets are keyed by their path under the data directory.
        let source = path.strip_prefix(data_dir).unwrap_or(path).display().to_string();
        match import_sheet(conn, path, &source, &mut stats) {
            Ok(Some(kind)) => {
                stats.sheets += 1;
                info!("  Imported {} ({:?})", path.display(), kind);
            }
            Ok(None) => {
                debug!("  Skipped {}: unrecognized header", path.display());
                stats.skipped += 1;
            }
            Err(e) => {
                warn!("  Error importing {}: {}", path.display(), e);
                stats.errors += 1;
            }
        }
    }

    Ok(stats)
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub sheets: usize,
    pub levels: usize,
    pub tiers: usize,
    pub packages: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Imported {} sheets ({} levels, {} gear tiers, {} package lines). Skipped: {}, Errors: {}",
            self.sheets, self.levels, self.tiers, self.packages, self.skipped, self.errors
        )
    }
}
