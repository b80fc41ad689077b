//! Schema migrations: the `sqlx` baseline plus the additive column
//! migrations for `users`.
//!
//! Nothing here takes a lock on the schema, so two runs against the same
//! database at once are not guarded against.

pub mod columns;

pub use columns::{ColumnMigration, ColumnSpec, MigrationReport};

use crate::db::Database;
use crate::errors::AppError;

/// `users.role`, defaulting to `'user'`.
pub const ADD_ROLE_COLUMN: ColumnMigration = ColumnMigration {
    name: "add_role_column",
    table: "users",
    columns: &[ColumnSpec {
        name: "role",
        sql_type: "VARCHAR(20)",
        default: Some("'user'"),
        backfill: Some("'user'"),
        not_null: true,
    }],
};

/// Profile names shown on the restaurateur dashboard.
pub const ADD_NAME_COLUMNS: ColumnMigration = ColumnMigration {
    name: "add_name_columns",
    table: "users",
    columns: &[
        ColumnSpec {
            name: "first_name",
            sql_type: "VARCHAR(100)",
            default: None,
            backfill: Some("''"),
            not_null: true,
        },
        ColumnSpec {
            name: "last_name",
            sql_type: "VARCHAR(100)",
            default: None,
            backfill: Some("''"),
            not_null: true,
        },
        ColumnSpec {
            name: "restaurant_name",
            sql_type: "VARCHAR(255)",
            default: None,
            backfill: Some("''"),
            not_null: true,
        },
    ],
};

static REGISTRY: &[ColumnMigration] = &[ADD_ROLE_COLUMN, ADD_NAME_COLUMNS];

/// Registered column migrations in run order.
pub fn all() -> &'static [ColumnMigration] {
    REGISTRY
}

pub fn find(name: &str) -> Option<&'static ColumnMigration> {
    REGISTRY.iter().find(|m| m.name == name)
}

/// Map names to migrations, keeping registry order. An empty selection
/// means every migration. Unknown names are rejected before anything runs.
pub fn resolve(names: &[String]) -> Result<Vec<&'static ColumnMigration>, AppError> {
    if names.is_empty() {
        return Ok(REGISTRY.iter().collect());
    }

    if let Some(unknown) = names.iter().find(|n| find(n).is_none()) {
        return Err(AppError::Validation(format!(
            "Unknown migration '{unknown}'"
        )));
    }

    Ok(REGISTRY
        .iter()
        .filter(|m| names.iter().any(|n| n == m.name))
        .collect())
}

/// Create the base tables if they do not exist yet.
pub async fn run_baseline(db: &Database) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(db.pool()).await?;
    tracing::info!("Baseline schema up to date");
    Ok(())
}

/// Run the given column migrations one after another, stopping at the first
/// failure.
pub async fn run_all(
    db: &Database,
    selected: &[&'static ColumnMigration],
) -> Result<Vec<MigrationReport>, AppError> {
    let mut reports = Vec::with_capacity(selected.len());
    for migration in selected {
        tracing::info!(migration = migration.name, "Running migration");
        let report = migration.run(db).await?;
        tracing::info!(
            migration = migration.name,
            added = report.added.len(),
            skipped = report.skipped.len(),
            "Migration complete"
        );
        reports.push(report);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn registry_names_are_unique() {
        let names: HashSet<_> = all().iter().map(|m| m.name).collect();
        assert_eq!(names.len(), all().len());
    }

    #[test]
    fn role_column_statement() {
        assert_eq!(
            ADD_ROLE_COLUMN.columns[0].add_column_sql("users"),
            "ALTER TABLE users ADD COLUMN role VARCHAR(20) DEFAULT 'user'"
        );
        assert_eq!(
            ADD_ROLE_COLUMN.columns[0].backfill_sql("users").as_deref(),
            Some("UPDATE users SET role = 'user' WHERE role IS NULL")
        );
    }

    #[test]
    fn name_columns_backfill_empty_string() {
        for column in ADD_NAME_COLUMNS.columns {
            assert_eq!(column.backfill, Some("''"));
            assert!(column.not_null);
            assert!(column.default.is_none());
        }
    }

    #[test]
    fn find_by_name() {
        assert_eq!(find("add_name_columns").map(|m| m.table), Some("users"));
        assert!(find("drop_everything").is_none());
    }

    #[test]
    fn resolve_defaults_to_all() {
        let selected = resolve(&[]).unwrap();
        assert_eq!(selected.len(), all().len());
    }

    #[test]
    fn resolve_keeps_registry_order() {
        let selected = resolve(&["add_name_columns".to_string(), "add_role_column".to_string()])
            .unwrap();
        let names: Vec<_> = selected.iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["add_role_column", "add_name_columns"]);
    }

    #[test]
    fn resolve_rejects_unknown() {
        let err = resolve(&["add_role_column".to_string(), "nope".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Unknown migration 'nope'");
    }
}
