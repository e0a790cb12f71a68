//! PostgreSQL fixtures for tests that need a live database.
//!
//! Set `SOLAR_TEST_DATABASE_URL` to run them; without it they return early.
//! They share one `solar_installations` table, so a lock serializes them.

use once_cell::sync::Lazy;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::{Mutex, MutexGuard};

pub const DATABASE_URL_VAR: &str = "SOLAR_TEST_DATABASE_URL";

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const SCHEMA: &str = include_str!("../sql/schema/01_solar_installations.sql");

/// An emptied `solar_installations`, or `None` when no database is configured.
pub async fn empty_database() -> Option<(MutexGuard<'static, ()>, PgPool)> {
    let url = std::env::var(DATABASE_URL_VAR).ok()?;
    let guard = DB_LOCK.lock().await;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::raw_sql(SCHEMA)
        .execute(&pool)
        .await
        .expect("apply schema");
    sqlx::query("TRUNCATE TABLE solar_installations")
        .execute(&pool)
        .await
        .expect("clear table");

    Some((guard, pool))
}

pub async fn stored_ids(pool: &PgPool) -> Vec<i64> {
    sqlx::query_scalar("SELECT case_id FROM solar_installations ORDER BY case_id")
        .fetch_all(pool)
        .await
        .expect("read case ids")
}
