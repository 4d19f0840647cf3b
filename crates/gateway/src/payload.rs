//! Request bodies and the `{success, ...}` response convention.

use {
    serde::Deserialize,
    serde_json::{Value, json},
};

use botforge_telegram::TelegramError;

// ── Request bodies ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    pub session_id: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub session_id: String,
    /// Accepted for wire compatibility; the pending login is keyed by
    /// `session_id` and `phone_code_hash`, not the phone number.
    pub phone: String,
    pub code: String,
    pub phone_code_hash: String,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBotRequest {
    pub session_id: String,
    pub bot_name: String,
    pub bot_username: String,
}

#[derive(Debug, Deserialize)]
pub struct GetTokenRequest {
    pub session_id: String,
    pub bot_username: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub session_id: String,
}

// ── Response bodies ──────────────────────────────────────────────────────────

/// Failure payload for a named error. Always paired with HTTP 200; the
/// caller dispatches on `error` (or `requires_2fa`), not on status codes.
pub fn failure(err: &TelegramError) -> Value {
    match err {
        TelegramError::PasswordRequired => json!({
            "success": false,
            "requires_2fa": true,
            "message": err.to_string(),
        }),
        TelegramError::TokenNotFound { last_response } => json!({
            "success": false,
            "error": err.tag(),
            "message": err.to_string(),
            "last_response": last_response,
        }),
        _ => json!({
            "success": false,
            "error": err.tag(),
            "message": err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_2fa_shape() {
        let body = failure(&TelegramError::PasswordRequired);
        assert_eq!(body["success"], false);
        assert_eq!(body["requires_2fa"], true);
        assert!(body.get("error").is_none());
    }

    #[test]
    fn token_not_found_carries_last_response() {
        let body = failure(&TelegramError::TokenNotFound {
            last_response: "Sorry, try again.".into(),
        });
        assert_eq!(body["error"], "token_not_found");
        assert_eq!(body["last_response"], "Sorry, try again.");
    }

    #[test]
    fn named_errors_carry_their_tag() {
        let body = failure(&TelegramError::NotAuthorized);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "not_authorized");
    }
}
