use thiserror::Error;

/// Every named failure a session or BotFather operation can report.
///
/// Each variant has a stable machine-readable tag (see [`TelegramError::tag`])
/// that the HTTP layer forwards to the caller; the `Display` text is the
/// human-readable half of the payload.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("verification code is invalid")]
    InvalidCode,

    #[error("verification code has expired, request a new one")]
    ExpiredCode,

    #[error("account has 2FA enabled, a password is required")]
    PasswordRequired,

    #[error("2FA password is incorrect")]
    InvalidPassword,

    #[error("session is not authorized, log in again")]
    NotAuthorized,

    #[error("username @{0} is already taken, pick another one")]
    UsernameTaken(String),

    #[error("no bot token found in the BotFather reply")]
    TokenNotFound { last_response: String },

    #[error("no reply from @{peer} within {timeout_secs}s")]
    NoReply { peer: String, timeout_secs: u64 },

    #[error("could not resolve @{0}")]
    UnknownPeer(String),

    #[error("session id may only contain letters, digits, '-' and '_'")]
    InvalidSessionId,

    #[error("telegram error: {0}")]
    Transport(String),
}

impl TelegramError {
    /// Stable machine-readable tag for the REST payload.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::InvalidCode => "invalid_code",
            Self::ExpiredCode => "expired_code",
            Self::PasswordRequired => "requires_2fa",
            Self::InvalidPassword => "invalid_password",
            Self::NotAuthorized => "not_authorized",
            Self::UsernameTaken(_) => "username_taken",
            Self::TokenNotFound { .. } => "token_not_found",
            Self::NoReply { .. } => "no_reply",
            Self::UnknownPeer(_) => "unknown_peer",
            Self::InvalidSessionId => "invalid_session_id",
            Self::Transport(_) => "error",
        }
    }

    pub(crate) fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}
