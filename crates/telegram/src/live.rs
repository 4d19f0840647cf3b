//! Live [`TelegramClient`] backed by grammers (MTProto user-account client).

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    async_trait::async_trait,
    grammers_client::{
        Client, Config, InitParams, SignInError,
        types::{Chat, LoginToken, PasswordToken, User},
    },
    grammers_session::Session,
    tokio::sync::Mutex,
    tracing::debug,
};

use crate::{
    client::{ClientFactory, InboundMessage, TelegramClient, UserProfile},
    error::TelegramError,
};

/// Opens grammers clients bound to per-session credential files.
pub struct GrammersFactory {
    api_id: i32,
    api_hash: String,
}

impl GrammersFactory {
    pub fn new(api_id: i32, api_hash: impl Into<String>) -> Self {
        Self {
            api_id,
            api_hash: api_hash.into(),
        }
    }
}

#[async_trait]
impl ClientFactory for GrammersFactory {
    async fn open(&self, session_path: &Path) -> Result<Arc<dyn TelegramClient>, TelegramError> {
        let session =
            Session::load_file_or_create(session_path).map_err(TelegramError::transport)?;
        let client = Client::connect(Config {
            session,
            api_id: self.api_id,
            api_hash: self.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(TelegramError::transport)?;
        debug!(path = %session_path.display(), "connected telegram client");

        Ok(Arc::new(GrammersClient {
            client,
            session_path: session_path.to_path_buf(),
            state: Mutex::new(LoginState::default()),
        }))
    }
}

/// Pending login artifacts and resolved peers for one handle.
#[derive(Default)]
struct LoginState {
    /// Outstanding OTP: correlation token handed to the caller, plus the
    /// grammers token needed to redeem the code.
    code: Option<(String, LoginToken)>,
    /// Outstanding 2FA challenge from a previous sign-in attempt.
    password: Option<PasswordToken>,
    /// Username -> chat cache so scripted flows resolve BotFather once.
    peers: HashMap<String, Chat>,
}

pub struct GrammersClient {
    client: Client,
    session_path: PathBuf,
    state: Mutex<LoginState>,
}

impl GrammersClient {
    async fn resolve(&self, peer: &str) -> Result<Chat, TelegramError> {
        let mut state = self.state.lock().await;
        if let Some(chat) = state.peers.get(peer) {
            return Ok(chat.clone());
        }
        let chat = self
            .client
            .resolve_username(peer)
            .await
            .map_err(TelegramError::transport)?
            .ok_or_else(|| TelegramError::UnknownPeer(peer.to_string()))?;
        state.peers.insert(peer.to_string(), chat.clone());
        Ok(chat)
    }

    fn persist_session(&self) {
        // Credential blob format is grammers-owned; we only pick the path.
        if let Err(e) = self.client.session().save_to_file(&self.session_path) {
            debug!(path = %self.session_path.display(), error = %e, "failed to save session file");
        }
    }
}

fn profile(user: &User) -> UserProfile {
    UserProfile {
        id: user.id(),
        first_name: Some(user.first_name().to_string()).filter(|n| !n.is_empty()),
        last_name: user.last_name().map(str::to_string),
        username: user.username().map(str::to_string),
        phone: user.phone().map(str::to_string),
    }
}

/// Opaque correlation token for an outstanding OTP. grammers keeps the real
/// `phone_code_hash` inside its `LoginToken`, so the REST contract gets a
/// random stand-in that we match on the way back.
fn correlation_token() -> String {
    format!("{:032x}", rand::random::<u128>())
}

#[async_trait]
impl TelegramClient for GrammersClient {
    async fn is_connected(&self) -> bool {
        // The handle owns its transport; it stays usable until dropped.
        true
    }

    async fn is_authorized(&self) -> Result<bool, TelegramError> {
        self.client
            .is_authorized()
            .await
            .map_err(TelegramError::transport)
    }

    async fn request_login_code(&self, phone: &str) -> Result<String, TelegramError> {
        let token = self
            .client
            .request_login_code(phone)
            .await
            .map_err(TelegramError::transport)?;
        let hash = correlation_token();
        let mut state = self.state.lock().await;
        state.code = Some((hash.clone(), token));
        state.password = None;
        Ok(hash)
    }

    async fn sign_in(
        &self,
        code: &str,
        phone_code_hash: &str,
    ) -> Result<UserProfile, TelegramError> {
        let mut state = self.state.lock().await;

        // A pending 2FA challenge means the code was already accepted;
        // don't burn it a second time.
        if state.password.is_some() {
            return Err(TelegramError::PasswordRequired);
        }

        let Some((hash, token)) = state.code.as_ref() else {
            return Err(TelegramError::ExpiredCode);
        };
        if hash.as_str() != phone_code_hash {
            return Err(TelegramError::ExpiredCode);
        }

        match self.client.sign_in(token, code).await {
            Ok(user) => {
                state.code = None;
                drop(state);
                self.persist_session();
                Ok(profile(&user))
            },
            Err(SignInError::InvalidCode) => Err(TelegramError::InvalidCode),
            Err(SignInError::PasswordRequired(password_token)) => {
                state.password = Some(password_token);
                state.code = None;
                Err(TelegramError::PasswordRequired)
            },
            Err(SignInError::SignUpRequired { .. }) => Err(TelegramError::Transport(
                "phone number has no Telegram account".into(),
            )),
            Err(SignInError::InvalidPassword) => Err(TelegramError::InvalidPassword),
            Err(SignInError::Other(e)) => {
                let text = e.to_string();
                if text.contains("PHONE_CODE_EXPIRED") {
                    state.code = None;
                    Err(TelegramError::ExpiredCode)
                } else {
                    Err(TelegramError::Transport(text))
                }
            },
        }
    }

    async fn check_password(&self, password: &str) -> Result<UserProfile, TelegramError> {
        let token = {
            let mut state = self.state.lock().await;
            state
                .password
                .take()
                .ok_or(TelegramError::PasswordRequired)?
        };
        match self.client.check_password(token, password).await {
            Ok(user) => {
                self.persist_session();
                Ok(profile(&user))
            },
            Err(SignInError::InvalidPassword) => Err(TelegramError::InvalidPassword),
            Err(e) => Err(TelegramError::transport(e)),
        }
    }

    async fn me(&self) -> Result<UserProfile, TelegramError> {
        let user = self.client.get_me().await.map_err(TelegramError::transport)?;
        Ok(profile(&user))
    }

    async fn send_message(&self, peer: &str, text: &str) -> Result<(), TelegramError> {
        let chat = self.resolve(peer).await?;
        self.client
            .send_message(&chat, text)
            .await
            .map_err(TelegramError::transport)?;
        Ok(())
    }

    async fn recent_messages(
        &self,
        peer: &str,
        limit: usize,
    ) -> Result<Vec<InboundMessage>, TelegramError> {
        let chat = self.resolve(peer).await?;
        let mut iter = self.client.iter_messages(&chat).limit(limit);
        let mut messages = Vec::with_capacity(limit);
        while let Some(message) = iter.next().await.map_err(TelegramError::transport)? {
            messages.push(InboundMessage {
                id: message.id(),
                outgoing: message.outgoing(),
                text: message.text().to_string(),
            });
        }
        Ok(messages)
    }

    async fn sign_out(&self) -> Result<(), TelegramError> {
        self.client
            .sign_out()
            .await
            .map_err(TelegramError::transport)?;
        Ok(())
    }

    async fn disconnect(&self) {
        // grammers tears the transport down on drop; just flush credentials
        // so a reconnect can pick them up.
        self.persist_session();
    }
}
