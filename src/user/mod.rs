//! User accounts: registration, login, profile and theme updates.
//!
//! Registering a user also seeds the default category set and a wallet
//! account in the same store transaction, so a fresh user is immediately
//! usable.

mod db;
mod domain;
mod password;

pub use db::{
    authenticate, change_password, create_user_table, delete_user, get_user, get_user_by_email,
    register_user, toggle_theme, update_profile,
};
pub use domain::{Theme, User, UserId};
pub use password::{MIN_PASSWORD_LENGTH, PasswordHash, ValidatedPassword};
