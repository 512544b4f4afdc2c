//! Secure credential container with automatic memory zeroing.
//!
//! # Security
//! - Credentials are stored in `Zeroizing<T>` containers
//! - Memory is automatically cleared when credentials go out of scope
//! - Passwords are never exposed in debug output or logs

use zeroize::Zeroizing;

/// SQL Server login credentials, zeroed on drop.
///
/// Both fields are `Zeroizing`, so every clone clears its own copy.
///
/// # Example
///
/// ```rust
/// use sqlscout_core::security::Credentials;
///
/// let creds = Credentials::new("sa".to_string(), Some("secret".to_string()));
/// assert_eq!(creds.username(), "sa");
/// assert!(creds.has_password());
/// assert!(!format!("{:?}", creds).contains("secret"));
/// ```
#[derive(Clone)]
pub struct Credentials {
    username: Zeroizing<String>,
    password: Zeroizing<Option<String>>,
}

impl Credentials {
    /// Creates new credentials with automatic memory zeroing.
    pub fn new(username: String, password: Option<String>) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password),
        }
    }

    /// Gets the username (still protected by Zeroizing).
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Checks if password is present without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Exposes the password for handing to the driver's login packet.
    ///
    /// Never log or format the returned value.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Returns true when there is no username, meaning integrated auth.
    pub fn is_empty(&self) -> bool {
        self.username.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username.as_str())
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}
