//! SQL Server connection parameters.
//!
//! Accepts the server notations SQL Server tooling uses (`host`,
//! `host\instance`, `host,port`, optional `tcp:` prefix) as well as
//! `mssql://` connection URLs.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ScoutError;
use crate::security::{Credentials, parse_connection_string};

/// Default SQL Server TCP port
pub const DEFAULT_PORT: u16 = 1433;

/// Upper bound for `max_connections`
pub const MAX_POOL_SIZE: u32 = 32;

/// TLS negotiation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptMode {
    /// Encrypt the login packet only
    Off,
    /// Encrypt when the server supports it
    #[default]
    On,
    /// Fail unless the whole session is encrypted
    Required,
}

impl FromStr for EncryptMode {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "false" | "no" | "optional" => Ok(Self::Off),
            "on" | "true" | "yes" => Ok(Self::On),
            "required" | "strict" | "mandatory" => Ok(Self::Required),
            other => Err(ScoutError::configuration(format!(
                "Invalid encrypt mode '{}'; expected off, on or required",
                other
            ))),
        }
    }
}

impl std::fmt::Display for EncryptMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Off => "off",
            Self::On => "on",
            Self::Required => "required",
        };
        f.write_str(label)
    }
}

/// Parses a boolean flag the way connection strings spell them.
pub fn parse_flag(value: &str) -> crate::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ScoutError::configuration(format!(
            "Invalid boolean value '{}'",
            other
        ))),
    }
}

/// Connection settings for one SQL Server database.
///
/// # Security
/// Credentials live in a zeroizing container; neither `Debug` nor `Display`
/// prints the password, and `Display` omits the username too.
///
/// # Example
/// ```rust
/// use sqlscout_core::adapters::ConnectionParams;
///
/// let params = ConnectionParams::from_server(r"db01\SQLEXPRESS")?
///     .with_database("MovieReviews");
///
/// assert_eq!(params.host, "db01");
/// assert_eq!(params.instance.as_deref(), Some("SQLEXPRESS"));
/// assert!(params.validate().is_ok());
/// # Ok::<(), sqlscout_core::ScoutError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    /// Server host name or address, without the instance suffix
    pub host: String,
    /// Explicit port; `None` means 1433, or SQL Browser lookup for named instances
    pub port: Option<u16>,
    /// Named instance, e.g. `SQLEXPRESS`
    pub instance: Option<String>,
    /// Database to survey
    pub database: String,
    /// SQL login; `None` selects Windows integrated authentication
    pub credentials: Option<Credentials>,
    /// TLS negotiation mode
    pub encrypt: EncryptMode,
    /// Accept the server certificate without chain validation
    pub trust_server_certificate: bool,
    /// Reported to the server as the client application
    pub application_name: String,
    /// Upper bound on establishing one session
    pub connect_timeout: Duration,
    /// Number of pooled sessions
    pub max_connections: u32,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            instance: None,
            database: String::new(),
            credentials: None,
            encrypt: EncryptMode::default(),
            trust_server_certificate: true,
            application_name: concat!("sqlscout/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: Duration::from_secs(30),
            max_connections: 1,
        }
    }
}

impl std::fmt::Display for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.host)?;
        if let Some(instance) = &self.instance {
            write!(f, "\\{}", instance)?;
        }
        if let Some(port) = self.port {
            write!(f, ",{}", port)?;
        }
        write!(f, "/{}", self.database)
        // Intentionally omit username and never include credentials
    }
}

impl ConnectionParams {
    /// Parses a server string: `host`, `host\instance`, `host,port`,
    /// `host\instance,port`, optionally prefixed with `tcp:`.
    ///
    /// `.` and `(local)` mean `localhost`.
    ///
    /// # Errors
    /// Returns a configuration error for an empty host or a non-numeric port.
    pub fn from_server(server: &str) -> crate::Result<Self> {
        let trimmed = server.trim();
        let trimmed = trimmed
            .strip_prefix("tcp:")
            .or_else(|| trimmed.strip_prefix("TCP:"))
            .unwrap_or(trimmed);

        let (address, port) = match trimmed.split_once(',') {
            Some((address, port)) => {
                let port = port.trim().parse::<u16>().map_err(|_| {
                    ScoutError::configuration(format!("Invalid port '{}' in server", port.trim()))
                })?;
                (address, Some(port))
            }
            None => (trimmed, None),
        };

        let (host, instance) = match address.split_once('\\') {
            Some((host, instance)) => (host, Some(instance.trim().to_string())),
            None => (address, None),
        };

        let host = match host.trim() {
            "" => return Err(ScoutError::configuration("server cannot be empty")),
            "." | "(local)" => "localhost".to_string(),
            other => other.to_string(),
        };

        Ok(Self {
            host,
            port,
            instance: instance.filter(|i| !i.is_empty()),
            ..Default::default()
        })
    }

    /// Builds parameters from an `mssql://` or `sqlserver://` URL.
    ///
    /// Recognized query keys: `instance`, `encrypt`, `trust_cert`
    /// (or `trustservercertificate`), `app_name`.
    ///
    /// # Errors
    /// Returns a configuration error for malformed URLs or option values.
    pub fn from_url(database_url: &str) -> crate::Result<Self> {
        let (info, credentials) = parse_connection_string(database_url)?;

        let mut params = Self {
            host: info.host.clone(),
            port: info.port,
            instance: info.instance.clone(),
            database: info.database.clone().unwrap_or_default(),
            credentials: Some(credentials).filter(|c| !c.is_empty()),
            ..Default::default()
        };

        if let Some(encrypt) = info.param("encrypt") {
            params.encrypt = encrypt.parse()?;
        }
        if let Some(trust) = info
            .param("trust_cert")
            .or_else(|| info.param("trustservercertificate"))
        {
            params.trust_server_certificate = parse_flag(trust)?;
        }
        if let Some(app) = info.param("app_name") {
            params.application_name = app.to_string();
        }

        Ok(params)
    }

    /// Validates connection parameters.
    ///
    /// # Errors
    /// Returns error if configuration values are invalid or unsafe
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.trim().is_empty() {
            return Err(ScoutError::configuration("server cannot be empty"));
        }

        if self.database.trim().is_empty() {
            return Err(ScoutError::configuration("database name cannot be empty"));
        }

        if self.port == Some(0) {
            return Err(ScoutError::configuration("port must be greater than 0"));
        }

        if self.max_connections == 0 {
            return Err(ScoutError::configuration(
                "max_connections must be greater than 0",
            ));
        }

        if self.max_connections > MAX_POOL_SIZE {
            return Err(ScoutError::configuration(format!(
                "max_connections should not exceed {}",
                MAX_POOL_SIZE
            )));
        }

        if self.connect_timeout.is_zero() {
            return Err(ScoutError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        if let Some(creds) = &self.credentials
            && !creds.has_password()
        {
            return Err(ScoutError::configuration(format!(
                "no password supplied for SQL login '{}'",
                creds.username()
            )));
        }

        Ok(())
    }

    /// Returns true when Windows integrated authentication will be used.
    pub fn uses_integrated_auth(&self) -> bool {
        self.credentials.is_none()
    }

    /// Builder method to set the database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Builder method to set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builder method to set a SQL login.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Builder method to set the encryption mode.
    pub fn with_encrypt(mut self, encrypt: EncryptMode) -> Self {
        self.encrypt = encrypt;
        self
    }

    /// Builder method to set certificate trust.
    pub fn with_trust_server_certificate(mut self, trust: bool) -> Self {
        self.trust_server_certificate = trust;
        self
    }

    /// Builder method to set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builder method to set the pool size.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_params_default() {
        let params = ConnectionParams::default();
        assert_eq!(params.host, "localhost");
        assert_eq!(params.port, None);
        assert_eq!(params.max_connections, 1);
        assert_eq!(params.connect_timeout, Duration::from_secs(30));
        assert_eq!(params.encrypt, EncryptMode::On);
        assert!(params.trust_server_certificate);
        assert!(params.uses_integrated_auth());
    }

    #[test]
    fn test_server_string_forms() {
        let plain = ConnectionParams::from_server("db01").unwrap();
        assert_eq!((plain.host.as_str(), plain.port, plain.instance), ("db01", None, None));

        let named = ConnectionParams::from_server(r"db01\SQLEXPRESS").unwrap();
        assert_eq!(named.host, "db01");
        assert_eq!(named.instance.as_deref(), Some("SQLEXPRESS"));

        let with_port = ConnectionParams::from_server("tcp:db01,14330").unwrap();
        assert_eq!(with_port.host, "db01");
        assert_eq!(with_port.port, Some(14330));

        let both = ConnectionParams::from_server(r"db01\SQL2019,1500").unwrap();
        assert_eq!(both.instance.as_deref(), Some("SQL2019"));
        assert_eq!(both.port, Some(1500));

        let local = ConnectionParams::from_server(r".\SQLEXPRESS").unwrap();
        assert_eq!(local.host, "localhost");
    }

    #[test]
    fn test_server_string_errors() {
        assert!(ConnectionParams::from_server("").is_err());
        assert!(ConnectionParams::from_server(r"\SQLEXPRESS").is_err());
        assert!(ConnectionParams::from_server("db01,notaport").is_err());
    }

    #[test]
    fn test_from_url_options() {
        let params = ConnectionParams::from_url(
            "mssql://sa:pw@db01:1500/MovieReviews?encrypt=required&trust_cert=false&app_name=nightly",
        )
        .unwrap();

        assert_eq!(params.host, "db01");
        assert_eq!(params.port, Some(1500));
        assert_eq!(params.database, "MovieReviews");
        assert_eq!(params.encrypt, EncryptMode::Required);
        assert!(!params.trust_server_certificate);
        assert_eq!(params.application_name, "nightly");
        assert!(!params.uses_integrated_auth());
    }

    #[test]
    fn test_from_url_without_user_is_integrated() {
        let params = ConnectionParams::from_url("sqlserver://db01/Movies").unwrap();
        assert!(params.uses_integrated_auth());
    }

    #[test]
    fn test_from_url_bad_option() {
        assert!(ConnectionParams::from_url("mssql://db01/Movies?encrypt=maybe").is_err());
    }

    #[test]
    fn test_connection_params_validation() {
        let valid = ConnectionParams::from_server("db01")
            .unwrap()
            .with_database("Movies");
        assert!(valid.validate().is_ok());

        let no_db = ConnectionParams::from_server("db01").unwrap();
        assert!(no_db.validate().is_err());

        let zero_pool = valid.clone().with_max_connections(0);
        assert!(zero_pool.validate().is_err());

        let huge_pool = valid.clone().with_max_connections(MAX_POOL_SIZE + 1);
        assert!(huge_pool.validate().is_err());

        let zero_timeout = valid.clone().with_connect_timeout(Duration::ZERO);
        assert!(zero_timeout.validate().is_err());

        let no_password = valid.with_credentials(Credentials::new("sa".to_string(), None));
        assert!(no_password.validate().is_err());
    }

    #[test]
    fn test_display_no_credentials() {
        let params = ConnectionParams::from_server(r"db01\SQLEXPRESS,1500")
            .unwrap()
            .with_database("Movies")
            .with_credentials(Credentials::new(
                "reporter".to_string(),
                Some("hunter2".to_string()),
            ));

        let display = params.to_string();
        assert_eq!(display, r"db01\SQLEXPRESS,1500/Movies");
        assert!(!display.contains("reporter"));
        assert!(!format!("{:?}", params).contains("hunter2"));
    }

    #[test]
    fn test_encrypt_mode_parse() {
        assert_eq!("OFF".parse::<EncryptMode>().unwrap(), EncryptMode::Off);
        assert_eq!("yes".parse::<EncryptMode>().unwrap(), EncryptMode::On);
        assert_eq!("strict".parse::<EncryptMode>().unwrap(), EncryptMode::Required);
        assert!("sometimes".parse::<EncryptMode>().is_err());
    }
}
