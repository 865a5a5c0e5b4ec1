//! Administrator account submitted with the setup form.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::InstallError;

/// Identity assigned to the first administrator account.
pub const ADMIN_USER_ID: u64 = 1;

/// Shortest accepted administrator password.
pub const MIN_PASSWORD_LEN: usize = 8;

static USERNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_-]+$").expect("username pattern should be valid")
});

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("email pattern should be valid"));

/// Validated administrator credentials.
///
/// The password is kept in plaintext until the account is created; it is
/// hashed by the step that writes the account.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminUser {
    username: String,
    password: String,
    email: String,
}

impl AdminUser {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<Self, InstallError> {
        let user = Self {
            username: username.into(),
            password: password.into(),
            email: email.into(),
        };
        user.validate()?;
        Ok(user)
    }

    /// Builds the user after checking that `password` equals `confirmation`.
    ///
    /// The comparison is byte-for-byte and happens before any other check.
    pub fn confirmed(
        username: impl Into<String>,
        password: &str,
        confirmation: &str,
        email: impl Into<String>,
    ) -> Result<Self, InstallError> {
        if password.as_bytes() != confirmation.as_bytes() {
            return Err(InstallError::validation(
                "The admin password did not match its confirmation.",
            ));
        }
        Self::new(username, password, email)
    }

    fn validate(&self) -> Result<(), InstallError> {
        if !USERNAME_PATTERN.is_match(&self.username) {
            return Err(InstallError::validation(
                "Username can only contain letters, numbers, underscores, and dashes.",
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(InstallError::validation(format!(
                "Password must be at least {} characters.",
                MIN_PASSWORD_LEN
            )));
        }
        if !EMAIL_PATTERN.is_match(&self.email) {
            return Err(InstallError::validation("You must enter a valid email."));
        }
        Ok(())
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

impl fmt::Debug for AdminUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}
