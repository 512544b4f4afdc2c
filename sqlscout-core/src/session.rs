//! Connection manager holding at most one active catalog source.
//!
//! The manager is an ordinary value passed to whoever needs it; there is no
//! process-wide connection.

use std::sync::Arc;

use crate::adapters::{CatalogSource, ConnectionParams};
use crate::error::{Result, ScoutError};

/// Owns the active catalog source.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use sqlscout_core::adapters::ScriptedCatalog;
/// use sqlscout_core::session::ConnectionManager;
///
/// # async fn example() -> sqlscout_core::Result<()> {
/// let mut manager = ConnectionManager::new();
/// assert!(manager.active().is_err());
///
/// manager.attach(Arc::new(ScriptedCatalog::new("fixture"))).await?;
/// assert!(manager.active().is_ok());
///
/// manager.close().await?;
/// manager.close().await?; // idempotent
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ConnectionManager {
    active: Option<Arc<dyn CatalogSource>>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("active", &self.active.as_ref().map(|s| s.describe()))
            .finish()
    }
}

impl ConnectionManager {
    /// Creates a manager with nothing connected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects to SQL Server and makes the session active.
    ///
    /// A previous session, if any, is closed first.
    ///
    /// # Errors
    /// Returns `ScoutError::Connection` when the server is unreachable, the
    /// connect timeout elapses or the login is rejected.
    #[cfg(feature = "mssql")]
    pub async fn connect(&mut self, params: &ConnectionParams) -> Result<Arc<dyn CatalogSource>> {
        let session = crate::adapters::SqlServerSession::connect(params).await?;
        self.attach(Arc::new(session)).await
    }

    /// Connecting needs the `mssql` feature.
    ///
    /// # Errors
    /// Always returns a configuration error.
    #[cfg(not(feature = "mssql"))]
    pub async fn connect(&mut self, _params: &ConnectionParams) -> Result<Arc<dyn CatalogSource>> {
        Err(ScoutError::configuration(
            "SQL Server support not compiled in; build with --features mssql",
        ))
    }

    /// Installs an already-built source as the active one.
    ///
    /// # Errors
    /// Propagates a failure to close the previous source.
    pub async fn attach(&mut self, source: Arc<dyn CatalogSource>) -> Result<Arc<dyn CatalogSource>> {
        self.close().await?;
        tracing::debug!("Active catalog source: {}", source.describe());
        self.active = Some(Arc::clone(&source));
        Ok(source)
    }

    /// Returns the active source.
    ///
    /// # Errors
    /// Returns `ScoutError::NotConnected` if nothing has been connected.
    pub fn active(&self) -> Result<Arc<dyn CatalogSource>> {
        self.active.clone().ok_or(ScoutError::NotConnected)
    }

    /// Returns true when a source is active.
    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    /// Releases the active source. Calling it with nothing active is a no-op.
    ///
    /// # Errors
    /// Propagates the source's close error; the source is dropped either way.
    pub async fn close(&mut self) -> Result<()> {
        match self.active.take() {
            Some(source) => {
                tracing::debug!("Closing {}", source.describe());
                source.close().await
            }
            None => Ok(()),
        }
    }
}
