//! Database schema and operations

use rusqlite::Connection;
use tracing::debug;

use crate::error::{CalcError, Result};
use crate::gear::PackageCatalog;
use crate::models::{PackageEntry, ResourceLedger, Row};
use crate::table::{GearTable, Table, TimeTable};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Construction seconds per building level
        CREATE TABLE IF NOT EXISTS level_costs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            building TEXT NOT NULL,
            label TEXT NOT NULL,
            ordinal INTEGER NOT NULL,
            seconds INTEGER NOT NULL
        );

        -- Resource cost of upgrading into a gear tier, one row per resource
        CREATE TABLE IF NOT EXISTS gear_costs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            part TEXT NOT NULL,
            label TEXT NOT NULL,
            ordinal INTEGER NOT NULL,
            resource TEXT NOT NULL,
            amount INTEGER NOT NULL
        );

        -- Bundle contents, one row per resource
        CREATE TABLE IF NOT EXISTS packages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            category TEXT NOT NULL,
            package TEXT NOT NULL,
            resource TEXT NOT NULL,
            amount INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_level_costs_source ON level_costs(source);
        CREATE INDEX IF NOT EXISTS idx_gear_costs_source ON gear_costs(source);
        CREATE INDEX IF NOT EXISTS idx_packages_source ON packages(source);
        "#,
    )?;
    Ok(())
}

fn to_sql_amount(amount: u64) -> Result<i64> {
    i64::try_from(amount).map_err(|_| CalcError::data_load("database", format!("amount {} out of range", amount)))
}

fn from_sql_amount(amount: i64) -> Result<u64> {
    u64::try_from(amount).map_err(|_| CalcError::data_load("database", format!("negative amount {}", amount)))
}

/// Insert a building level
pub fn insert_level_cost(conn: &Connection, source: &str, row: &Row<u64>) -> Result<()> {
    conn.execute(
        "INSERT INTO level_costs (source, building, label, ordinal, seconds)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (source, &row.category, &row.label, row.ordinal, to_sql_amount(row.cost)?),
    )?;
    Ok(())
}

/// Insert a gear tier, one database row per resource
pub fn insert_gear_cost(conn: &Connection, source: &str, row: &Row<ResourceLedger>) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO gear_costs (source, part, label, ordinal, resource, amount)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for (resource, amount) in row.cost.iter() {
        stmt.execute((source, &row.category, &row.label, row.ordinal, resource, to_sql_amount(amount)?))?;
    }
    Ok(())
}

/// Insert one resource line of a bundle
pub fn insert_package(conn: &Connection, source: &str, entry: &PackageEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO packages (source, category, package, resource, amount)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            source,
            &entry.category,
            &entry.package,
            &entry.resource,
            to_sql_amount(entry.amount)?,
        ),
    )?;
    Ok(())
}

/// Remove everything previously imported from `source`
pub fn delete_source(conn: &Connection, source: &str) -> Result<()> {
    for table in ["level_costs", "gear_costs", "packages"] {
        conn.execute(&format!("DELETE FROM {} WHERE source = ?1", table), [source])?;
    }
    Ok(())
}

/// Clear all imported data (for re-import)
pub fn clear_data(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM level_costs;
        DELETE FROM gear_costs;
        DELETE FROM packages;
        "#,
    )?;
    Ok(())
}

/// Append `row` to the group of `source`, keeping sources in first-seen order.
fn push_to_source<C>(groups: &mut Vec<(String, Vec<Row<C>>)>, source: String, row: Row<C>) {
    match groups.iter_mut().find(|(s, _)| *s == source) {
        Some((_, rows)) => rows.push(row),
        None => groups.push((source, vec![row])),
    }
}

/// Load every building level as an immutable table
pub fn load_time_table(conn: &Connection) -> Result<TimeTable> {
    let mut stmt = conn.prepare("SELECT source, building, label, ordinal, seconds FROM level_costs ORDER BY id")?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, i64>(4)?,
        ))
    })?;

    let mut groups = Vec::new();
    let mut count = 0;
    for row in rows {
        let (source, category, label, ordinal, seconds) = row?;
        let row = Row {
            category,
            label,
            ordinal,
            cost: from_sql_amount(seconds)?,
        };
        push_to_source(&mut groups, source, row);
        count += 1;
    }

    debug!("Loaded {} level rows from {} sources", count, groups.len());
    Table::from_sources("database", groups)
}

/// Load every gear tier as an immutable table
pub fn load_gear_table(conn: &Connection) -> Result<GearTable> {
    let mut stmt =
        conn.prepare("SELECT source, part, label, ordinal, resource, amount FROM gear_costs ORDER BY id")?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, i64>(5)?,
        ))
    })?;

    // One row per resource here; each source's table merges them back into tiers.
    let mut groups = Vec::new();
    let mut count = 0;
    for row in rows {
        let (source, category, label, ordinal, resource, amount) = row?;
        let mut cost = ResourceLedger::new();
        cost.add(&resource, from_sql_amount(amount)?);
        let row = Row {
            category,
            label,
            ordinal,
            cost,
        };
        push_to_source(&mut groups, source, row);
        count += 1;
    }

    debug!("Loaded {} gear cost rows from {} sources", count, groups.len());
    Table::from_sources("database", groups)
}

/// Load the bundle catalog
pub fn load_catalog(conn: &Connection) -> Result<PackageCatalog> {
    let mut stmt = conn.prepare("SELECT category, package, resource, amount FROM packages ORDER BY id")?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
        ))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (category, package, resource, amount) = row?;
        results.push(PackageEntry {
            category,
            package,
            resource,
            amount: from_sql_amount(amount)?,
        });
    }
    Ok(PackageCatalog::new(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn level(category: &str, label: &str, ordinal: i64, cost: u64) -> Row<u64> {
        Row {
            category: category.to_string(),
            label: label.to_string(),
            ordinal,
            cost,
        }
    }

    #[test]
    fn test_level_costs_round_trip_through_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.db");

        {
            let conn = Connection::open(&path).unwrap();
            init_schema(&conn).unwrap();
            insert_level_cost(&conn, "a.csv", &level("Furnace", "FC1", 35, 500)).unwrap();
            insert_level_cost(&conn, "a.csv", &level("Furnace", "30", 30, 100)).unwrap();
            insert_level_cost(&conn, "a.csv", &level("Embassy", "30", 30, 7)).unwrap();
        }

        let conn = Connection::open(&path).unwrap();
        let table = load_time_table(&conn).unwrap();
        assert_eq!(table.categories(), &["Furnace".to_string(), "Embassy".to_string()]);
        assert_eq!(table.labels("Furnace").unwrap(), vec!["30", "FC1"]);
        assert_eq!(table.rows("Furnace").unwrap()[1].cost, 500);
    }

    #[test]
    fn test_gear_rows_merge_into_tiers() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tier = Row {
            category: "All".to_string(),
            label: "Gold 1*".to_string(),
            ordinal: 1,
            cost: [("Alloy", 1500), ("Polish", 15), ("Amber", 0)].into_iter().collect::<ResourceLedger>(),
        };
        insert_gear_cost(&conn, "gear.csv", &tier).unwrap();

        let table = load_gear_table(&conn).unwrap();
        let rows = table.rows("All").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cost, tier.cost);
    }

    #[test]
    fn test_delete_source_only_touches_that_source() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        insert_level_cost(&conn, "a.csv", &level("Furnace", "1", 1, 10)).unwrap();
        insert_level_cost(&conn, "b.csv", &level("Embassy", "1", 1, 20)).unwrap();
        insert_package(
            &conn,
            "a.csv",
            &PackageEntry {
                category: "Sublime".to_string(),
                package: "$5".to_string(),
                resource: "Alloy".to_string(),
                amount: 500,
            },
        )
        .unwrap();

        delete_source(&conn, "a.csv").unwrap();

        let table = load_time_table(&conn).unwrap();
        assert!(!table.contains_category("Furnace"));
        assert!(table.contains_category("Embassy"));
        assert!(load_catalog(&conn).unwrap().is_empty());

        clear_data(&conn).unwrap();
        assert!(load_time_table(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_missing_schema_is_data_load_error() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(load_time_table(&conn), Err(CalcError::DataLoad { .. })));
    }
}
