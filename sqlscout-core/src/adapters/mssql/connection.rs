//! TDS client construction for SQL Server.

use tiberius::{AuthMethod, Client, Config, EncryptionLevel, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::adapters::config::{ConnectionParams, DEFAULT_PORT, EncryptMode};
use crate::error::{Result, ScoutError};

/// Connected TDS client over a tokio TCP stream
pub(crate) type TdsClient = Client<Compat<TcpStream>>;

/// Builds the driver configuration from validated parameters.
///
/// # Errors
/// Returns a configuration error when integrated authentication is requested
/// on a platform that does not support it.
pub(crate) fn build_config(params: &ConnectionParams) -> Result<Config> {
    let mut config = Config::new();
    config.host(&params.host);
    config.database(&params.database);
    config.application_name(&params.application_name);

    match (&params.instance, params.port) {
        (Some(instance), port) => {
            config.instance_name(instance);
            // SQL Browser resolves the port unless one was given
            if let Some(port) = port {
                config.port(port);
            }
        }
        (None, port) => config.port(port.unwrap_or(DEFAULT_PORT)),
    }

    config.encryption(match params.encrypt {
        EncryptMode::Off => EncryptionLevel::Off,
        EncryptMode::On => EncryptionLevel::On,
        EncryptMode::Required => EncryptionLevel::Required,
    });

    if params.trust_server_certificate {
        config.trust_cert();
    }

    config.authentication(authentication(params)?);

    Ok(config)
}

fn authentication(params: &ConnectionParams) -> Result<AuthMethod> {
    match &params.credentials {
        Some(creds) => Ok(AuthMethod::sql_server(
            creds.username(),
            creds.password().unwrap_or_default(),
        )),
        None => integrated_auth(),
    }
}

#[cfg(windows)]
fn integrated_auth() -> Result<AuthMethod> {
    Ok(AuthMethod::Integrated)
}

#[cfg(not(windows))]
fn integrated_auth() -> Result<AuthMethod> {
    Err(ScoutError::configuration(
        "Windows integrated authentication is only available on Windows builds; supply a SQL login",
    ))
}

/// Opens one TDS connection, bounded by the connect timeout.
///
/// # Errors
/// Returns `ScoutError::Connection` on timeout, unreachable host, TLS or
/// login failure. Messages name the server but never the credentials.
pub(crate) async fn open_client(params: &ConnectionParams, config: Config) -> Result<TdsClient> {
    let target = params.to_string();
    let attempt = async {
        let tcp = if params.instance.is_some() {
            TcpStream::connect_named(&config).await.map_err(|e| {
                ScoutError::connection_failed(format!("SQL Browser lookup for {} failed", target), e)
            })?
        } else {
            TcpStream::connect(config.get_addr()).await.map_err(|e| {
                ScoutError::connection_failed(format!("cannot reach {}", target), e)
            })?
        };

        tcp.set_nodelay(true)
            .map_err(|e| ScoutError::connection_failed(format!("socket setup for {}", target), e))?;

        Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| ScoutError::connection_failed(format!("login to {} failed", target), e))
    };

    tokio::time::timeout(params.connect_timeout, attempt)
        .await
        .map_err(|e| {
            ScoutError::connection_failed(
                format!(
                    "connecting to {} timed out after {}s",
                    target,
                    params.connect_timeout.as_secs()
                ),
                e,
            )
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::Credentials;

    fn sql_login() -> Credentials {
        Credentials::new("reporter".to_string(), Some("pw".to_string()))
    }

    #[test]
    fn test_default_port_address() {
        let params = ConnectionParams::from_server("db01")
            .unwrap()
            .with_database("Movies")
            .with_credentials(sql_login());
        let config = build_config(&params).unwrap();
        assert_eq!(config.get_addr(), "db01:1433");
    }

    #[test]
    fn test_explicit_port_address() {
        let params = ConnectionParams::from_server("db01,14330")
            .unwrap()
            .with_database("Movies")
            .with_credentials(sql_login());
        let config = build_config(&params).unwrap();
        assert_eq!(config.get_addr(), "db01:14330");
    }

    #[cfg(not(windows))]
    #[test]
    fn test_integrated_auth_rejected_off_windows() {
        let params = ConnectionParams::from_server("db01")
            .unwrap()
            .with_database("Movies");
        let err = build_config(&params).unwrap_err();
        assert!(matches!(err, ScoutError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        // Port 1 on localhost refuses immediately on any sane host
        let params = ConnectionParams::from_server("127.0.0.1,1")
            .unwrap()
            .with_database("Movies")
            .with_credentials(sql_login())
            .with_connect_timeout(std::time::Duration::from_secs(5));
        let config = build_config(&params).unwrap();

        let err = open_client(&params, config).await.err().unwrap();
        assert!(matches!(err, ScoutError::Connection { .. }));
        assert!(!err.to_string().contains("pw"));
    }
}
