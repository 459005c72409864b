//! Core user domain types.

use std::{fmt::Display, str::FromStr};

use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, user::PasswordHash};

/// Database identifier for a user.
pub type UserId = i64;

/// The color theme a user sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Dark backgrounds, the default.
    Dark,
    /// Light backgrounds.
    Light,
}

impl Theme {
    /// The theme's stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    /// The other theme.
    pub fn toggled(&self) -> Theme {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            // Unknown values fall back to the default rather than failing a
            // whole row read over display metadata.
            _ => Ok(Theme::Dark),
        }
    }
}

impl Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered user. Every other entity in the store hangs off a [UserId].
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The ID of the user.
    pub id: UserId,
    /// The user's display name.
    pub name: String,
    /// The user's unique email address.
    pub email: EmailAddress,
    /// The user's salted and hashed password.
    pub password_hash: PasswordHash,
    /// The color theme the user selected.
    pub theme: Theme,
    /// When the user registered.
    pub created_at: OffsetDateTime,
}

/// Parse an email address from a user-supplied string.
///
/// # Errors
/// Returns [Error::InvalidEmail] if `text` is not a well-formed address.
pub(crate) fn parse_email(text: &str) -> Result<EmailAddress, Error> {
    text.trim()
        .parse()
        .map_err(|_| Error::InvalidEmail(text.to_owned()))
}
