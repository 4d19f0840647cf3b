//! Test doubles for the protocol-client boundary.
//!
//! `MockClient` mirrors the observable behavior of the live grammers handle:
//! OTP correlation tokens, the 2FA short-circuit, and a scripted BotFather
//! conversation where every send pops the next canned reply.

use std::{
    collections::{HashMap, VecDeque},
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;

use crate::{
    client::{ClientFactory, InboundMessage, TelegramClient, UserProfile},
    error::TelegramError,
};

/// The code every `MockClient` accepts.
pub const MOCK_CODE: &str = "12345";

fn mock_profile() -> UserProfile {
    UserProfile {
        id: 777_000,
        first_name: Some("Test".into()),
        last_name: None,
        username: Some("testuser".into()),
        phone: Some("+6281234567890".into()),
    }
}

#[derive(Default)]
struct Inner {
    connected: bool,
    authorized: bool,
    two_factor: Option<String>,
    pending_hash: Option<String>,
    password_pending: bool,
    hash_counter: u32,
    sign_in_attempts: usize,
    signed_out: bool,
    fail_sign_out: bool,
    replies: VecDeque<String>,
    sent: Vec<String>,
    messages: Vec<InboundMessage>,
    next_message_id: i32,
}

/// Shared-state mock; clones observe the same session.
#[derive(Clone)]
pub struct MockClient {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                connected: true,
                ..Inner::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start the session already signed in.
    pub fn pre_authorized(self) -> Self {
        self.lock().authorized = true;
        self
    }

    /// Require this 2FA password at sign-in.
    pub fn with_two_factor(self, password: &str) -> Self {
        self.lock().two_factor = Some(password.to_string());
        self
    }

    /// Queue canned BotFather replies, popped one per outgoing message.
    pub fn with_replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().replies.extend(replies.into_iter().map(Into::into));
        self
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    pub fn fail_sign_out(&self) {
        self.lock().fail_sign_out = true;
    }

    pub fn signed_out(&self) -> bool {
        self.lock().signed_out
    }

    pub fn sign_in_attempts(&self) -> usize {
        self.lock().sign_in_attempts
    }

    pub fn sent_messages(&self) -> Vec<String> {
        self.lock().sent.clone()
    }
}

#[async_trait]
impl TelegramClient for MockClient {
    async fn is_connected(&self) -> bool {
        self.lock().connected
    }

    async fn is_authorized(&self) -> Result<bool, TelegramError> {
        Ok(self.lock().authorized)
    }

    async fn request_login_code(&self, _phone: &str) -> Result<String, TelegramError> {
        let mut inner = self.lock();
        inner.hash_counter += 1;
        let hash = format!("hash-{}", inner.hash_counter);
        inner.pending_hash = Some(hash.clone());
        inner.password_pending = false;
        Ok(hash)
    }

    async fn sign_in(
        &self,
        code: &str,
        phone_code_hash: &str,
    ) -> Result<UserProfile, TelegramError> {
        let mut inner = self.lock();
        if inner.password_pending {
            return Err(TelegramError::PasswordRequired);
        }
        match inner.pending_hash.as_deref() {
            Some(hash) if hash == phone_code_hash => {},
            _ => return Err(TelegramError::ExpiredCode),
        }
        inner.sign_in_attempts += 1;
        if code != MOCK_CODE {
            return Err(TelegramError::InvalidCode);
        }
        inner.pending_hash = None;
        if inner.two_factor.is_some() {
            inner.password_pending = true;
            return Err(TelegramError::PasswordRequired);
        }
        inner.authorized = true;
        Ok(mock_profile())
    }

    async fn check_password(&self, password: &str) -> Result<UserProfile, TelegramError> {
        let mut inner = self.lock();
        if !inner.password_pending {
            return Err(TelegramError::PasswordRequired);
        }
        inner.password_pending = false;
        if inner.two_factor.as_deref() != Some(password) {
            return Err(TelegramError::InvalidPassword);
        }
        inner.authorized = true;
        Ok(mock_profile())
    }

    async fn me(&self) -> Result<UserProfile, TelegramError> {
        Ok(mock_profile())
    }

    async fn send_message(&self, _peer: &str, text: &str) -> Result<(), TelegramError> {
        let mut inner = self.lock();
        inner.sent.push(text.to_string());
        inner.next_message_id += 1;
        let outgoing_id = inner.next_message_id;
        inner.messages.push(InboundMessage {
            id: outgoing_id,
            outgoing: true,
            text: text.to_string(),
        });
        if let Some(reply) = inner.replies.pop_front() {
            inner.next_message_id += 1;
            let reply_id = inner.next_message_id;
            inner.messages.push(InboundMessage {
                id: reply_id,
                outgoing: false,
                text: reply,
            });
        }
        Ok(())
    }

    async fn recent_messages(
        &self,
        _peer: &str,
        limit: usize,
    ) -> Result<Vec<InboundMessage>, TelegramError> {
        let inner = self.lock();
        Ok(inner.messages.iter().rev().take(limit).cloned().collect())
    }

    async fn sign_out(&self) -> Result<(), TelegramError> {
        let mut inner = self.lock();
        if inner.fail_sign_out {
            return Err(TelegramError::Transport("AUTH_KEY_UNREGISTERED".into()));
        }
        inner.signed_out = true;
        inner.authorized = false;
        Ok(())
    }

    async fn disconnect(&self) {
        self.lock().connected = false;
    }
}

/// Factory handing out `MockClient`s, keyed by the session id embedded in
/// the credential path.
#[derive(Default)]
pub struct MockFactory {
    clients: Mutex<HashMap<String, MockClient>>,
    opened: Mutex<usize>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many handles have been constructed.
    pub fn open_count(&self) -> usize {
        *self.opened.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The client for a session id, creating it eagerly so tests can stage
    /// state (replies, authorization) before the registry connects.
    pub fn client(&self, session_id: &str) -> MockClient {
        self.clients
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(session_id.to_string())
            .or_insert_with(MockClient::new)
            .clone()
    }
}

#[async_trait]
impl ClientFactory for MockFactory {
    async fn open(&self, session_path: &Path) -> Result<Arc<dyn TelegramClient>, TelegramError> {
        let session_id = session_path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix("session_"))
            .unwrap_or_default()
            .to_string();
        *self.opened.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        let client = self.client(&session_id);
        client.set_connected(true);
        Ok(Arc::new(client))
    }
}
