//! Scripted in-memory catalog for tests and offline runs.
//!
//! Responses are matched by SQL substring (and optionally by bound
//! parameters). Every issued query is recorded so tests can assert exactly
//! which catalog views were touched.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;

use super::{CatalogSource, SqlRow};
use crate::error::{Result, ScoutError};

/// Error returned for scripted failures and unmatched queries.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ScriptedFailure(String);

#[derive(Debug, Clone)]
enum Response {
    Rows(Vec<SqlRow>),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Rule {
    fragment: String,
    params: Option<Vec<String>>,
    response: Response,
}

/// A query seen by a [`ScriptedCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedQuery {
    /// Statement text as sent
    pub sql: String,
    /// Bound parameters in `@P1..@Pn` order
    pub params: Vec<String>,
}

/// Catalog source that answers from a script.
///
/// Rules are checked in registration order and the first match wins, so
/// register parameter-specific rules before broad ones.
///
/// # Example
/// ```rust
/// use sqlscout_core::adapters::{CatalogSource, ScriptedCatalog, SqlRow};
///
/// # async fn example() -> sqlscout_core::Result<()> {
/// let catalog = ScriptedCatalog::new("test")
///     .on("@@VERSION", vec![SqlRow::new().with("Version", "SQL Server 2022")]);
///
/// let rows = catalog.query("SELECT @@VERSION AS Version", &[]).await?;
/// assert_eq!(rows.len(), 1);
/// assert_eq!(catalog.issued().len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ScriptedCatalog {
    name: String,
    rules: Vec<Rule>,
    issued: Mutex<Vec<IssuedQuery>>,
    closed: AtomicBool,
    close_failure: Option<String>,
}

impl ScriptedCatalog {
    /// Creates a catalog with no rules.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            issued: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            close_failure: None,
        }
    }

    /// Makes `close` report a connection error after releasing.
    pub fn fail_close(mut self, message: impl Into<String>) -> Self {
        self.close_failure = Some(message.into());
        self
    }

    /// Answers any query containing `fragment` with `rows`.
    pub fn on(mut self, fragment: impl Into<String>, rows: Vec<SqlRow>) -> Self {
        self.rules.push(Rule {
            fragment: fragment.into(),
            params: None,
            response: Response::Rows(rows),
        });
        self
    }

    /// Answers queries containing `fragment` and bound to exactly `params`.
    pub fn on_params(
        mut self,
        fragment: impl Into<String>,
        params: &[&str],
        rows: Vec<SqlRow>,
    ) -> Self {
        self.rules.push(Rule {
            fragment: fragment.into(),
            params: Some(params.iter().map(|p| (*p).to_string()).collect()),
            response: Response::Rows(rows),
        });
        self
    }

    /// Fails any query containing `fragment` with a query error.
    pub fn fail_on(mut self, fragment: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push(Rule {
            fragment: fragment.into(),
            params: None,
            response: Response::Fail(message.into()),
        });
        self
    }

    /// Fails queries containing `fragment` bound to exactly `params`.
    pub fn fail_on_params(
        mut self,
        fragment: impl Into<String>,
        params: &[&str],
        message: impl Into<String>,
    ) -> Self {
        self.rules.push(Rule {
            fragment: fragment.into(),
            params: Some(params.iter().map(|p| (*p).to_string()).collect()),
            response: Response::Fail(message.into()),
        });
        self
    }

    /// Every query issued so far, in order.
    pub fn issued(&self) -> Vec<IssuedQuery> {
        self.issued
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn find(&self, sql: &str, params: &[&str]) -> Option<&Rule> {
        self.rules.iter().find(|rule| {
            sql.contains(&rule.fragment)
                && rule.params.as_ref().is_none_or(|expected| {
                    expected.len() == params.len()
                        && expected.iter().zip(params).all(|(e, p)| e == p)
                })
        })
    }
}

#[async_trait]
impl CatalogSource for ScriptedCatalog {
    async fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<SqlRow>> {
        if self.is_closed() {
            return Err(ScoutError::NotConnected);
        }

        self.issued
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(IssuedQuery {
                sql: sql.to_string(),
                params: params.iter().map(|p| (*p).to_string()).collect(),
            });

        match self.find(sql, params).map(|rule| &rule.response) {
            Some(Response::Rows(rows)) => Ok(rows.clone()),
            Some(Response::Fail(message)) => Err(ScoutError::query_failed(
                message.clone(),
                ScriptedFailure(message.clone()),
            )),
            None => Err(ScoutError::query_failed(
                "no scripted response",
                ScriptedFailure(format!("unmatched query: {}", sql.trim())),
            )),
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        match &self.close_failure {
            Some(message) => Err(ScoutError::connection_failed(
                message.clone(),
                ScriptedFailure(message.clone()),
            )),
            None => Ok(()),
        }
    }

    fn describe(&self) -> String {
        format!("scripted catalog '{}'", self.name)
    }
}
