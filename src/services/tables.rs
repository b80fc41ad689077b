//! Table service: list, create, rename and delete restaurant tables.

use crate::db::Database;
use crate::errors::AppError;
use crate::models::table::{CreateTable, Table};

/// Longest accepted table name, matching the `tables.name` column.
const MAX_NAME_LEN: usize = 100;

/// Trim a provided name and check it fits the column.
fn normalize_name(name: Option<&str>) -> Result<Option<String>, AppError> {
    match name {
        None => Ok(None),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(AppError::Validation("Table name cannot be blank".to_string()));
            }
            if trimmed.chars().count() > MAX_NAME_LEN {
                return Err(AppError::Validation(format!(
                    "Table name exceeds {MAX_NAME_LEN} characters"
                )));
            }
            Ok(Some(trimmed.to_string()))
        }
    }
}

/// All tables of a place, oldest first.
pub async fn list_for_place(db: &Database, place_id: i32) -> Result<Vec<Table>, AppError> {
    db.query_as::<Table>(
        "SELECT id, place_id, name, created_at FROM tables WHERE place_id = $1 ORDER BY id",
        &[place_id.into()],
    )
    .await
}

pub async fn find(db: &Database, id: i32) -> Result<Table, AppError> {
    db.query_optional_as::<Table>(
        "SELECT id, place_id, name, created_at FROM tables WHERE id = $1",
        &[id.into()],
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Table {id} not found")))
}

pub async fn create(db: &Database, input: &CreateTable) -> Result<Table, AppError> {
    let name = normalize_name(input.name.as_deref())?;

    let table = db
        .query_optional_as::<Table>(
            r#"
            INSERT INTO tables (place_id, name)
            VALUES ($1, $2)
            RETURNING id, place_id, name, created_at
            "#,
            &[input.place_id.into(), name.into()],
        )
        .await
        .map_err(|e| match e {
            AppError::Database(sqlx::Error::Database(ref db_err))
                if db_err.is_foreign_key_violation() =>
            {
                AppError::NotFound(format!("Place {} not found", input.place_id))
            }
            other => other,
        })?
        .ok_or_else(|| AppError::Internal("Insert returned no row".to_string()))?;

    tracing::info!(table_id = table.id, place_id = table.place_id, "Table created");
    Ok(table)
}

pub async fn rename(db: &Database, id: i32, name: Option<&str>) -> Result<Table, AppError> {
    let name = normalize_name(name)?;

    db.query_optional_as::<Table>(
        "UPDATE tables SET name = $1 WHERE id = $2 RETURNING id, place_id, name, created_at",
        &[name.into(), id.into()],
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Table {id} not found")))
}

pub async fn delete(db: &Database, id: i32) -> Result<(), AppError> {
    let deleted = db
        .execute("DELETE FROM tables WHERE id = $1", &[id.into()])
        .await?;
    if deleted == 0 {
        return Err(AppError::NotFound(format!("Table {id} not found")));
    }
    tracing::info!(table_id = id, "Table deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_trimmed() {
        assert_eq!(
            normalize_name(Some("  Window 4 ")).unwrap(),
            Some("Window 4".to_string())
        );
    }

    #[test]
    fn missing_name_is_allowed() {
        assert_eq!(normalize_name(None).unwrap(), None);
    }

    #[test]
    fn blank_name_rejected() {
        let err = normalize_name(Some("   ")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn long_name_rejected() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(normalize_name(Some(&long)).is_err());
        let exact = "é".repeat(MAX_NAME_LEN);
        assert!(normalize_name(Some(&exact)).is_ok());
    }
}
