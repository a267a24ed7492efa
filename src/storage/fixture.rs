//! Seeded PostgreSQL schema for tests that run statements against data.
//!
//! Each call creates its own schema from `DATABASE_URL` and loads
//! `fixtures/tracking.sql` into it. Without `DATABASE_URL` there is nothing
//! to connect to and [`seed`] returns `None`.

use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::Database;

const TRACKING_FIXTURE: &str = include_str!("fixtures/tracking.sql");

static NEXT_SCHEMA: AtomicUsize = AtomicUsize::new(0);

pub struct SeededDatabase {
    pub db: Database,
    admin: PgConnectOptions,
    schema: String,
}

/// Create and populate a fresh schema, or `None` when no test database is configured.
pub async fn seed() -> Option<SeededDatabase> {
    let url = std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
    let Some(url) = url else {
        eprintln!("DATABASE_URL not set, skipping database-backed test");
        return None;
    };

    let admin = PgConnectOptions::from_str(&url).expect("DATABASE_URL is not a valid postgres URL");
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    let schema = format!(
        "nfl_test_{}_{}_{}",
        std::process::id(),
        NEXT_SCHEMA.fetch_add(1, Ordering::Relaxed),
        nanos
    );

    let mut conn = PgConnection::connect_with(&admin)
        .await
        .expect("connect to DATABASE_URL");
    let setup = format!(
        "CREATE SCHEMA {0}; SET search_path TO {0}; {1}",
        schema, TRACKING_FIXTURE
    );
    sqlx::raw_sql(&setup)
        .execute(&mut conn)
        .await
        .expect("load tracking fixture");
    conn.close().await.expect("close setup connection");

    let options = admin.clone().options([("search_path", schema.as_str())]);
    Some(SeededDatabase {
        db: Database::from_options(options, Duration::from_secs(10)),
        admin,
        schema,
    })
}

impl SeededDatabase {
    pub async fn connection(&self) -> PgConnection {
        self.db.acquire().await.expect("connect to seeded schema")
    }

    pub async fn drop_schema(self) {
        let mut conn = PgConnection::connect_with(&self.admin)
            .await
            .expect("connect to DATABASE_URL");
        sqlx::raw_sql(&format!("DROP SCHEMA {} CASCADE", self.schema))
            .execute(&mut conn)
            .await
            .expect("drop test schema");
        conn.close().await.expect("close teardown connection");
    }
}
