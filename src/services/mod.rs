//! Data access façade consumed by request handlers.

pub mod tables;
pub mod users;
