//! Restaurateur account profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Profile columns of a `users` row. Credentials are never selected.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct UserProfile {
    pub id: i32,
    pub email: String,
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    pub restaurant_name: String,
    pub created_at: DateTime<Utc>,
}

/// Partial profile update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub restaurant_name: Option<String>,
}
