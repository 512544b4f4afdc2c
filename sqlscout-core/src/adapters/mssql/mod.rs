//! SQL Server catalog source over native TDS.
//!
//! # Security
//! - Only the fixed catalog and aggregate queries are executed
//! - Parameters are bound (`@P1`, `@P2`), never interpolated
//! - Credentials are consumed by the login and never logged

mod connection;
mod value_mapping;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use self::connection::{TdsClient, build_config, open_client};
use super::config::ConnectionParams;
use super::{CatalogSource, SqlRow};
use crate::error::{Result, ScoutError};

/// Pooled SQL Server session.
///
/// Holds `max_connections` TDS clients; each query takes the next client in
/// round-robin order and holds it for the duration of the query.
pub struct SqlServerSession {
    clients: Vec<Mutex<Option<TdsClient>>>,
    next: AtomicUsize,
    description: String,
}

impl std::fmt::Debug for SqlServerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlServerSession")
            .field("target", &self.description)
            .field("pool_size", &self.clients.len())
            .finish()
    }
}

impl SqlServerSession {
    /// Opens the session pool.
    ///
    /// # Errors
    /// Returns `ScoutError::Configuration` for invalid parameters and
    /// `ScoutError::Connection` if any client fails to connect in time.
    pub async fn connect(params: &ConnectionParams) -> Result<Self> {
        params.validate()?;
        let config = build_config(params)?;

        tracing::info!(
            "Connecting to SQL Server {} ({} connection{}, encrypt={})",
            params,
            params.max_connections,
            if params.max_connections == 1 { "" } else { "s" },
            params.encrypt
        );

        let mut clients = Vec::with_capacity(params.max_connections as usize);
        for _ in 0..params.max_connections {
            let client = open_client(params, config.clone()).await?;
            clients.push(Mutex::new(Some(client)));
        }

        tracing::debug!("Connected to {}", params);
        Ok(Self {
            clients,
            next: AtomicUsize::new(0),
            description: format!("SQL Server {}", params),
        })
    }

    /// Number of pooled clients.
    pub fn pool_size(&self) -> usize {
        self.clients.len()
    }
}

#[async_trait]
impl CatalogSource for SqlServerSession {
    async fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<SqlRow>> {
        let slot = self.next.fetch_add(1, Ordering::Relaxed) % self.clients.len().max(1);
        let client_slot = self.clients.get(slot).ok_or(ScoutError::NotConnected)?;
        let mut guard = client_slot.lock().await;
        let client = guard.as_mut().ok_or(ScoutError::NotConnected)?;

        let bound: Vec<&dyn tiberius::ToSql> =
            params.iter().map(|p| p as &dyn tiberius::ToSql).collect();

        tracing::trace!("Executing on client {}: {}", slot, sql);
        let stream = client
            .query(sql, &bound)
            .await
            .map_err(|e| ScoutError::query_failed(format!("statement rejected by server: {}", e), e))?;
        let rows = stream
            .into_first_result()
            .await
            .map_err(|e| ScoutError::query_failed(format!("failed reading result set: {}", e), e))?;

        Ok(rows.iter().map(value_mapping::to_sql_row).collect())
    }

    async fn close(&self) -> Result<()> {
        for slot in &self.clients {
            if let Some(client) = slot.lock().await.take()
                && let Err(e) = client.close().await
            {
                tracing::debug!("Error while closing SQL Server connection: {}", e);
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}
