//! Per-request PostgreSQL connections.
//!
//! Every request opens its own connection and closes it before the handler
//! returns. No pool is kept.

use futures::future::BoxFuture;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::{Connection, PgConnection};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::DatabaseConfig;

/// Errors raised by the storage layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("database connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("{0}")]
    Query(#[from] sqlx::Error),
}

/// Connection provider for the tracking database
#[derive(Debug, Clone)]
pub struct Database {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl Database {
    /// Build connect options from configuration. Does not connect.
    pub fn new(config: &DatabaseConfig) -> Self {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .ssl_mode(ssl_mode_for(config.production))
            .application_name(env!("CARGO_PKG_NAME"));

        if let Some(ref name) = config.name {
            options = options.database(name);
        }
        if let Some(ref user) = config.user {
            options = options.username(user);
        }
        if let Some(ref password) = config.password {
            options = options.password(password);
        }

        Self {
            options,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_options(options: PgConnectOptions, connect_timeout: Duration) -> Self {
        Self {
            options,
            connect_timeout,
        }
    }

    /// Open a new connection, failing fast if the server does not answer.
    pub async fn acquire(&self) -> Result<PgConnection, StoreError> {
        match tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&self.options))
            .await
        {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(StoreError::Connect(e)),
            Err(_) => Err(StoreError::ConnectTimeout(self.connect_timeout)),
        }
    }

    /// Run `work` on a fresh connection and close it afterwards.
    ///
    /// The connection is closed whether `work` succeeds or fails; a failure
    /// to close is logged and does not replace the result of `work`.
    pub async fn with_connection<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, sqlx::Error>>,
    {
        let mut conn = self.acquire().await?;
        let result = work(&mut conn).await;

        if let Err(e) = conn.close().await {
            debug!("Error closing database connection: {}", e);
        }

        result.map_err(StoreError::Query)
    }

    /// Round-trip a trivial statement to verify connectivity.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.with_connection(|conn| {
            Box::pin(async move {
                sqlx::query("SELECT 1")
                    .execute(&mut *conn)
                    .await
                    .map(|_| ())
            })
        })
        .await
    }

    pub fn ssl_mode(&self) -> PgSslMode {
        self.options.get_ssl_mode()
    }
}

fn ssl_mode_for(production: bool) -> PgSslMode {
    if production {
        PgSslMode::Require
    } else {
        PgSslMode::Prefer
    }
}
