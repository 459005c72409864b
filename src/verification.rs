//! One-time login codes delivered by email.
//!
//! The crate generates and checks the codes and their expiry window;
//! actually delivering the email is behind the [VerificationMailer] trait
//! so transports stay outside the ledger.

use email_address::EmailAddress;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use crate::{
    Clock, Error,
    user::{User, get_user_by_email},
};

/// How long an issued code stays valid.
pub const CODE_TTL: Duration = Duration::minutes(10);

/// Delivers a verification code to an address.
///
/// Implementations talk to an external mail service; failures are theirs to
/// describe and the caller's to surface.
pub trait VerificationMailer {
    /// Send `code` to `to`.
    ///
    /// # Errors
    /// Returns [Error::CodeDelivery] if the message could not be sent.
    fn send_code(&self, to: &EmailAddress, code: &str) -> Result<(), Error>;
}

/// Issue a fresh 6-digit code for the user with `email` and stamp its
/// expiry, replacing any previously issued code.
///
/// The code is returned so the caller can hand it to a
/// [VerificationMailer]; see [request_login_code] for the combined flow.
///
/// # Errors
/// Returns [Error::NotFound] if no user has the address.
pub fn issue_verification_code(
    email: &str,
    clock: &impl Clock,
    connection: &Connection,
) -> Result<String, Error> {
    let user = get_user_by_email(email, connection)?;

    // SQLite's RANDOM() is seeded from OS entropy, which keeps the store
    // the only stateful collaborator here.
    let code: i64 = connection.query_row("SELECT ABS(RANDOM() % 900000) + 100000", [], |row| {
        row.get(0)
    })?;
    let code = code.to_string();
    let expires_at = clock.now() + CODE_TTL;

    connection.execute(
        "UPDATE user SET verification_code = ?1, code_expires_at = ?2 WHERE id = ?3",
        (&code, expires_at, user.id),
    )?;

    Ok(code)
}

/// Check a submitted code and log the user in.
///
/// A successful check clears the stored code, so each code works once.
///
/// # Errors
/// This function will return an:
/// - [Error::NotFound] if no user has the address,
/// - [Error::CodeMissing] if no code was issued,
/// - [Error::CodeMismatch] if the code does not match,
/// - [Error::CodeExpired] if the code is older than [CODE_TTL].
pub fn verify_code(
    email: &str,
    code: &str,
    clock: &impl Clock,
    connection: &Connection,
) -> Result<User, Error> {
    let user = get_user_by_email(email, connection)?;

    let (stored_code, expires_at): (Option<String>, Option<OffsetDateTime>) = connection
        .query_row(
            "SELECT verification_code, code_expires_at FROM user WHERE id = :id",
            &[(":id", &user.id)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

    let (Some(stored_code), Some(expires_at)) = (stored_code, expires_at) else {
        return Err(Error::CodeMissing);
    };

    if stored_code != code.trim() {
        return Err(Error::CodeMismatch);
    }

    if clock.now() > expires_at {
        return Err(Error::CodeExpired);
    }

    connection.execute(
        "UPDATE user SET verification_code = NULL, code_expires_at = NULL WHERE id = ?1",
        [user.id],
    )?;

    Ok(user)
}

/// Issue a code and hand it to the mailer.
///
/// A delivery failure is logged and surfaced to the caller; it is never
/// swallowed and never retried here. The stored code stays in place, so a
/// later request simply replaces it.
///
/// # Errors
/// Returns [Error::NotFound] for an unknown address or [Error::CodeDelivery]
/// if the mailer fails.
pub fn request_login_code(
    email: &str,
    clock: &impl Clock,
    mailer: &impl VerificationMailer,
    connection: &Connection,
) -> Result<(), Error> {
    let user = get_user_by_email(email, connection)?;
    let code = issue_verification_code(email, clock, connection)?;

    mailer.send_code(&user.email, &code).inspect_err(|error| {
        tracing::error!("could not deliver verification code to {}: {error}", user.email);
    })
}

#[cfg(test)]
mod verification_tests {
    use std::cell::RefCell;

    use email_address::EmailAddress;
    use time::Duration;

    use crate::{
        Error,
        test_utils::{FixedClock, NOW, create_test_user, get_test_connection, test_clock},
    };

    use super::{CODE_TTL, VerificationMailer, issue_verification_code, request_login_code, verify_code};

    #[test]
    fn issue_produces_a_six_digit_code() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let code = issue_verification_code(user.email.as_str(), &test_clock(), &conn).unwrap();

        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn issue_rejects_unknown_email() {
        let conn = get_test_connection();

        let result = issue_verification_code("ghost@example.com", &test_clock(), &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn verify_accepts_the_issued_code_once() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let code = issue_verification_code(user.email.as_str(), &test_clock(), &conn).unwrap();

        let verified = verify_code(user.email.as_str(), &code, &test_clock(), &conn).unwrap();

        assert_eq!(verified.id, user.id);

        // The code was cleared, so a second attempt has nothing to match.
        let second = verify_code(user.email.as_str(), &code, &test_clock(), &conn);
        assert_eq!(second, Err(Error::CodeMissing));
    }

    #[test]
    fn verify_rejects_wrong_code() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let code = issue_verification_code(user.email.as_str(), &test_clock(), &conn).unwrap();
        let wrong = if code == "123456" { "654321" } else { "123456" };

        let result = verify_code(user.email.as_str(), wrong, &test_clock(), &conn);

        assert_eq!(result, Err(Error::CodeMismatch));
    }

    #[test]
    fn verify_rejects_code_after_ten_minutes() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let code = issue_verification_code(user.email.as_str(), &test_clock(), &conn).unwrap();

        let late = FixedClock(NOW + CODE_TTL + Duration::seconds(1));
        let result = verify_code(user.email.as_str(), &code, &late, &conn);

        assert_eq!(result, Err(Error::CodeExpired));
    }

    #[test]
    fn verify_without_issued_code_is_missing() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let result = verify_code(user.email.as_str(), "123456", &test_clock(), &conn);

        assert_eq!(result, Err(Error::CodeMissing));
    }

    struct RecordingMailer {
        sent: RefCell<Vec<(String, String)>>,
    }

    impl VerificationMailer for RecordingMailer {
        fn send_code(&self, to: &EmailAddress, code: &str) -> Result<(), Error> {
            self.sent
                .borrow_mut()
                .push((to.to_string(), code.to_string()));
            Ok(())
        }
    }

    struct FailingMailer;

    impl VerificationMailer for FailingMailer {
        fn send_code(&self, _: &EmailAddress, _: &str) -> Result<(), Error> {
            Err(Error::CodeDelivery("SMTP timeout".to_owned()))
        }
    }

    #[test]
    fn request_login_code_hands_the_code_to_the_mailer() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let mailer = RecordingMailer {
            sent: RefCell::new(Vec::new()),
        };

        request_login_code(user.email.as_str(), &test_clock(), &mailer, &conn).unwrap();

        let sent = mailer.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, user.email.to_string());

        // The mailed code is the one that verifies.
        let verified = verify_code(user.email.as_str(), &sent[0].1, &test_clock(), &conn);
        assert!(verified.is_ok());
    }

    #[test]
    fn delivery_failure_is_surfaced_not_swallowed() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let result = request_login_code(user.email.as_str(), &test_clock(), &FailingMailer, &conn);

        assert_eq!(result, Err(Error::CodeDelivery("SMTP timeout".to_owned())));
    }
}
