use std::{path::Path, sync::Arc};

use {async_trait::async_trait, serde::Serialize};

use crate::error::TelegramError;

/// Public profile fields of the signed-in account, returned to the caller
/// after login and on session checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
}

/// One message out of a conversation's recent history, newest first.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: i32,
    /// True when we sent this message ourselves.
    pub outgoing: bool,
    pub text: String,
}

/// The protocol-client boundary.
///
/// One instance per live session handle. The wire protocol, encryption and
/// credential file format all live behind this trait; the implementation
/// also owns the pending login state (OTP token, 2FA password token) so a
/// `requires_2fa` round trip never consumes the code twice.
#[async_trait]
pub trait TelegramClient: Send + Sync {
    /// Whether the underlying transport is still usable. A handle that
    /// reports false is discarded and rebuilt by the registry.
    async fn is_connected(&self) -> bool;

    async fn is_authorized(&self) -> Result<bool, TelegramError>;

    /// Request an OTP for `phone`. Returns the opaque correlation token the
    /// caller must echo back on [`TelegramClient::sign_in`].
    async fn request_login_code(&self, phone: &str) -> Result<String, TelegramError>;

    /// Sign in with the received code. `phone_code_hash` must match the
    /// token returned by the preceding `request_login_code`; a stale or
    /// unknown token reports `ExpiredCode`. Accounts with 2FA report
    /// `PasswordRequired` and keep the code pending for
    /// [`TelegramClient::check_password`].
    async fn sign_in(&self, code: &str, phone_code_hash: &str)
    -> Result<UserProfile, TelegramError>;

    /// Complete a 2FA sign-in started by [`TelegramClient::sign_in`].
    async fn check_password(&self, password: &str) -> Result<UserProfile, TelegramError>;

    async fn me(&self) -> Result<UserProfile, TelegramError>;

    /// Send a text message to the named peer (without the leading `@`).
    async fn send_message(&self, peer: &str, text: &str) -> Result<(), TelegramError>;

    /// The `limit` most recent messages of the conversation, newest first.
    async fn recent_messages(
        &self,
        peer: &str,
        limit: usize,
    ) -> Result<Vec<InboundMessage>, TelegramError>;

    /// Protocol-level logout, invalidating the stored credentials.
    async fn sign_out(&self) -> Result<(), TelegramError>;

    /// Release the transport. Best-effort; never fails.
    async fn disconnect(&self);
}

/// Constructs connected client handles bound to an on-disk credential file.
/// Injected into the registry so tests can substitute doubles.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn open(&self, session_path: &Path) -> Result<Arc<dyn TelegramClient>, TelegramError>;
}
