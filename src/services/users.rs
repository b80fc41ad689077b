//! Profile lookups and updates on `users`.

use crate::db::Database;
use crate::errors::AppError;
use crate::models::user::{UpdateProfile, UserProfile};

const PROFILE_COLUMNS: &str =
    "id, email, role, first_name, last_name, restaurant_name, created_at";

pub async fn find_profile(db: &Database, id: i32) -> Result<UserProfile, AppError> {
    db.query_optional_as::<UserProfile>(
        &format!("SELECT {PROFILE_COLUMNS} FROM users WHERE id = $1"),
        &[id.into()],
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
}

/// Apply the provided fields. Values are trimmed; the name columns are
/// NOT NULL, so clearing a field stores an empty string.
pub async fn update_profile(
    db: &Database,
    id: i32,
    input: &UpdateProfile,
) -> Result<UserProfile, AppError> {
    let trim = |v: &Option<String>| v.as_deref().map(|s| s.trim().to_string());

    db.query_optional_as::<UserProfile>(
        &format!(
            "UPDATE users SET
                first_name = COALESCE($1, first_name),
                last_name = COALESCE($2, last_name),
                restaurant_name = COALESCE($3, restaurant_name)
             WHERE id = $4
             RETURNING {PROFILE_COLUMNS}"
        ),
        &[
            trim(&input.first_name).into(),
            trim(&input.last_name).into(),
            trim(&input.restaurant_name).into(),
            id.into(),
        ],
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
}
