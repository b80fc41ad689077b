//! Database models and DTOs.

pub mod table;
pub mod user;
