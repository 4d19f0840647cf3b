//! OTP / 2FA login flow on top of a client handle.
//!
//! State machine: `Unauthenticated -> CodeSent -> (AwaitingPassword | Authenticated)`.
//! The pending-code bookkeeping lives inside the client handle; these
//! functions only order the calls.

use crate::{
    client::{TelegramClient, UserProfile},
    error::TelegramError,
};

/// Request an OTP for the phone number. Returns the correlation token
/// (`phone_code_hash`) the caller must echo back on `verify_code`.
pub async fn send_code(
    client: &dyn TelegramClient,
    phone: &str,
) -> Result<String, TelegramError> {
    client.request_login_code(phone).await
}

/// Sign in with the OTP, completing the 2FA step when a password is given.
///
/// On a 2FA-enabled account with no password supplied this reports
/// `PasswordRequired` and leaves the session unauthenticated; the follow-up
/// call with a password goes straight to the password check, never consuming
/// the code a second time.
pub async fn verify_code(
    client: &dyn TelegramClient,
    code: &str,
    phone_code_hash: &str,
    password: Option<&str>,
) -> Result<UserProfile, TelegramError> {
    match client.sign_in(code, phone_code_hash).await {
        Err(TelegramError::PasswordRequired) => match password {
            Some(password) => client.check_password(password).await,
            None => Err(TelegramError::PasswordRequired),
        },
        other => other,
    }
}

/// Report whether the handle is authorized, with the profile when it is.
pub async fn check_session(
    client: &dyn TelegramClient,
) -> Result<Option<UserProfile>, TelegramError> {
    if !client.is_authorized().await? {
        return Ok(None);
    }
    Ok(Some(client.me().await?))
}
