//! Additive column migrations driven by `information_schema.columns`.

use std::collections::HashSet;

use crate::db::{Database, Param, PooledClient};
use crate::errors::AppError;

/// One column a migration guarantees exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub sql_type: &'static str,
    /// SQL literal used as the column default, if any.
    pub default: Option<&'static str>,
    /// SQL literal written into rows that are still NULL after the add.
    pub backfill: Option<&'static str>,
    pub not_null: bool,
}

impl ColumnSpec {
    pub fn add_column_sql(&self, table: &str) -> String {
        match self.default {
            Some(default) => format!(
                "ALTER TABLE {table} ADD COLUMN {} {} DEFAULT {default}",
                self.name, self.sql_type
            ),
            None => format!("ALTER TABLE {table} ADD COLUMN {} {}", self.name, self.sql_type),
        }
    }

    pub fn backfill_sql(&self, table: &str) -> Option<String> {
        self.backfill.map(|value| {
            format!(
                "UPDATE {table} SET {col} = {value} WHERE {col} IS NULL",
                col = self.name
            )
        })
    }

    pub fn set_not_null_sql(&self, table: &str) -> Option<String> {
        self.not_null
            .then(|| format!("ALTER TABLE {table} ALTER COLUMN {} SET NOT NULL", self.name))
    }

    /// Every statement that adds this column, in execution order.
    pub fn statements(&self, table: &str) -> Vec<String> {
        let mut statements = vec![self.add_column_sql(table)];
        statements.extend(self.backfill_sql(table));
        statements.extend(self.set_not_null_sql(table));
        statements
    }
}

/// Outcome of one migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub migration: String,
    pub added: Vec<String>,
    pub skipped: Vec<String>,
}

impl MigrationReport {
    /// True when every target column already existed.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty()
    }
}

/// An idempotent migration that adds whichever of its columns are missing.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMigration {
    pub name: &'static str,
    pub table: &'static str,
    pub columns: &'static [ColumnSpec],
}

impl ColumnMigration {
    /// Target columns absent from `existing`, in declaration order. Names are
    /// compared exactly, so `Role` does not satisfy `role`.
    pub fn plan(&self, existing: &HashSet<String>) -> Vec<&'static ColumnSpec> {
        self.columns
            .iter()
            .filter(|column| !existing.contains(column.name))
            .collect()
    }

    /// Lease a client, add the missing columns one statement at a time, and
    /// release the client whatever the outcome.
    pub async fn run(&self, db: &Database) -> Result<MigrationReport, AppError> {
        let mut client = db.get_client().await.map_err(|e| {
            tracing::error!(migration = self.name, error = %e, "Could not acquire a connection");
            AppError::migration(self.name, e)
        })?;

        let result = self.apply(&mut client).await;

        if let Err(e) = client.release() {
            tracing::warn!(migration = self.name, error = %e, "Client release failed");
        }
        result
    }

    async fn apply(&self, client: &mut PooledClient) -> Result<MigrationReport, AppError> {
        let existing = existing_columns(client, self.table)
            .await
            .map_err(|e| self.failed(None, e))?;

        let mut report = MigrationReport {
            migration: self.name.to_string(),
            ..MigrationReport::default()
        };

        let missing = self.plan(&existing);
        for column in self.columns {
            if !missing.contains(&column) {
                tracing::info!(
                    migration = self.name,
                    table = self.table,
                    column = column.name,
                    "Column already exists"
                );
                report.skipped.push(column.name.to_string());
            }
        }

        for column in missing {
            for statement in column.statements(self.table) {
                client
                    .execute(&statement, &[])
                    .await
                    .map_err(|e| self.failed(Some(column.name), e))?;
            }
            tracing::info!(
                migration = self.name,
                table = self.table,
                column = column.name,
                "Column added"
            );
            report.added.push(column.name.to_string());
        }

        Ok(report)
    }

    fn failed(&self, column: Option<&str>, e: AppError) -> AppError {
        tracing::error!(
            migration = self.name,
            table = self.table,
            column = column.unwrap_or("-"),
            error = %e,
            "Migration step failed"
        );
        AppError::migration(self.name, e)
    }
}

async fn existing_columns(
    client: &mut PooledClient,
    table: &str,
) -> Result<HashSet<String>, AppError> {
    let rows: Vec<(String,)> = client
        .query_as(
            "SELECT column_name::text FROM information_schema.columns
             WHERE table_schema = current_schema() AND table_name = $1",
            &[Param::from(table)],
        )
        .await?;
    Ok(rows.into_iter().map(|(name,)| name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: ColumnMigration = ColumnMigration {
        name: "names",
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

    fn existing(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn plan_all_missing() {
        let planned: Vec<_> = NAMES.plan(&existing(&["id", "email"])).iter().map(|c| c.name).collect();
        assert_eq!(planned, vec!["first_name", "last_name", "restaurant_name"]);
    }

    #[test]
    fn plan_skips_existing_subset() {
        let planned: Vec<_> = NAMES
            .plan(&existing(&["id", "last_name"]))
            .iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(planned, vec!["first_name", "restaurant_name"]);
    }

    #[test]
    fn plan_empty_when_complete() {
        let all = existing(&["first_name", "last_name", "restaurant_name"]);
        assert!(NAMES.plan(&all).is_empty());
    }

    #[test]
    fn plan_is_case_sensitive() {
        let planned = NAMES.plan(&existing(&["First_Name", "LAST_NAME", "restaurant_name"]));
        assert_eq!(planned.len(), 2);
    }

    #[test]
    fn column_statements_in_order() {
        let statements = NAMES.columns[0].statements("users");
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE users ADD COLUMN first_name VARCHAR(100)".to_string(),
                "UPDATE users SET first_name = '' WHERE first_name IS NULL".to_string(),
                "ALTER TABLE users ALTER COLUMN first_name SET NOT NULL".to_string(),
            ]
        );
    }

    #[test]
    fn optional_steps_are_skipped() {
        let column = ColumnSpec {
            name: "notes",
            sql_type: "TEXT",
            default: None,
            backfill: None,
            not_null: false,
        };
        assert_eq!(
            column.statements("tables"),
            vec!["ALTER TABLE tables ADD COLUMN notes TEXT".to_string()]
        );
    }

    #[test]
    fn report_noop() {
        let report = MigrationReport {
            migration: "names".to_string(),
            added: vec![],
            skipped: vec!["first_name".to_string()],
        };
        assert!(report.is_noop());
    }
}
