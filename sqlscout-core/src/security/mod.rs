//! Credential protection and connection URL parsing.
//!
//! # Security Guarantees
//! - Credentials are stored in `Zeroizing` containers for automatic memory clearing
//! - Connection URLs are split into a loggable part and a credential part
//! - Passwords never appear in `Debug` or `Display` output
//!
//! # Module Structure
//! - `credentials`: Secure credential container with automatic memory zeroing
//! - `connection`: `mssql://` / `sqlserver://` URL parsing

mod connection;
mod credentials;

pub use connection::{ConnectionInfo, parse_connection_string};
pub use credentials::Credentials;
