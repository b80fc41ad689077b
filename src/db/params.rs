//! Positional statement parameters.

use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::{Query, QueryAs};

/// A value bound to a `$n` placeholder. Every variant is nullable so a
/// `NULL` still carries the Postgres type it is compared or stored as.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Bool(Option<bool>),
    Int(Option<i32>),
    BigInt(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
}

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Bool(Some(v))
    }
}

impl From<i32> for Param {
    fn from(v: i32) -> Self {
        Param::Int(Some(v))
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::BigInt(Some(v))
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Float(Some(v))
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(Some(v.to_string()))
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(Some(v))
    }
}

impl From<Option<i32>> for Param {
    fn from(v: Option<i32>) -> Self {
        Param::Int(v)
    }
}

impl From<Option<&str>> for Param {
    fn from(v: Option<&str>) -> Self {
        Param::Text(v.map(str::to_string))
    }
}

impl From<Option<String>> for Param {
    fn from(v: Option<String>) -> Self {
        Param::Text(v)
    }
}

pub(crate) fn bind<'q>(
    query: Query<'q, Postgres, PgArguments>,
    param: &'q Param,
) -> Query<'q, Postgres, PgArguments> {
    match param {
        Param::Bool(v) => query.bind(*v),
        Param::Int(v) => query.bind(*v),
        Param::BigInt(v) => query.bind(*v),
        Param::Float(v) => query.bind(*v),
        Param::Text(v) => query.bind(v.as_deref()),
    }
}

pub(crate) fn bind_as<'q, T>(
    query: QueryAs<'q, Postgres, T, PgArguments>,
    param: &'q Param,
) -> QueryAs<'q, Postgres, T, PgArguments> {
    match param {
        Param::Bool(v) => query.bind(*v),
        Param::Int(v) => query.bind(*v),
        Param::BigInt(v) => query.bind(*v),
        Param::Float(v) => query.bind(*v),
        Param::Text(v) => query.bind(v.as_deref()),
    }
}

/// Build a query with every parameter bound in order.
pub(crate) fn prepare<'q>(sql: &'q str, params: &'q [Param]) -> Query<'q, Postgres, PgArguments> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, param| bind(query, param))
}

pub(crate) fn prepare_as<'q, T>(
    sql: &'q str,
    params: &'q [Param],
) -> QueryAs<'q, Postgres, T, PgArguments>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow>,
{
    params
        .iter()
        .fold(sqlx::query_as::<_, T>(sql), |query, param| bind_as(query, param))
}
