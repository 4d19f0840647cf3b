//! Session registry: the owned, injectable `session_id -> handle` map.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    tokio::sync::{Mutex, RwLock},
    tracing::{debug, info},
};

use crate::{
    client::{ClientFactory, TelegramClient},
    error::TelegramError,
};

/// A live handle plus the lock serializing scripted conversations on it.
///
/// Two concurrent bot-creation requests for the same session would otherwise
/// interleave their message sends into one BotFather dialog.
pub struct SessionHandle {
    pub client: Arc<dyn TelegramClient>,
    pub conversation: Mutex<()>,
}

/// Per-session slot. Its mutex is the creation lock: connecting a handle
/// happens under it, so the at-most-one-handle invariant holds without
/// pinning the registry map across the connect.
struct SessionSlot {
    handle: Mutex<Option<Arc<SessionHandle>>>,
}

/// Maps opaque caller-supplied session ids to live client handles and
/// on-disk credential files.
///
/// Invariant: at most one live handle per session id. The map lock is only
/// ever held for lookups and inserts, never across a network call; a hung
/// connect or sign-out stalls its own session id, nothing else.
pub struct SessionRegistry {
    sessions_dir: PathBuf,
    factory: Arc<dyn ClientFactory>,
    slots: RwLock<HashMap<String, Arc<SessionSlot>>>,
}

impl SessionRegistry {
    pub fn new(sessions_dir: impl Into<PathBuf>, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
            factory,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Deterministic credential file path for a session id.
    ///
    /// Ids are restricted to `[A-Za-z0-9_-]` so a caller-supplied id cannot
    /// point outside the sessions directory.
    pub fn session_path(&self, session_id: &str) -> Result<PathBuf, TelegramError> {
        if !valid_session_id(session_id) {
            return Err(TelegramError::InvalidSessionId);
        }
        Ok(self.sessions_dir.join(format!("session_{session_id}")))
    }

    /// Return the connected handle for `session_id`, constructing and
    /// connecting a fresh one if none exists.
    pub async fn get_or_create(
        &self,
        session_id: &str,
    ) -> Result<Arc<SessionHandle>, TelegramError> {
        let path = self.session_path(session_id)?;
        let slot = self.slot(session_id).await;

        // Per-session creation lock; racing callers for one id converge on
        // a single handle while other ids stay unaffected.
        let mut handle = slot.handle.lock().await;
        if let Some(existing) = handle.as_ref() {
            if existing.client.is_connected().await {
                return Ok(Arc::clone(existing));
            }
        }

        std::fs::create_dir_all(&self.sessions_dir).map_err(TelegramError::transport)?;
        let client = self.factory.open(&path).await?;
        let created = Arc::new(SessionHandle {
            client,
            conversation: Mutex::new(()),
        });
        *handle = Some(Arc::clone(&created));
        debug!(session_id, "created session handle");
        Ok(created)
    }

    /// Protocol-level logout, then teardown of the handle and every on-disk
    /// artifact. Logout and disconnect failures are swallowed: the files are
    /// removed regardless.
    pub async fn logout(&self, session_id: &str) -> Result<(), TelegramError> {
        let path = self.session_path(session_id)?;
        if let Some(handle) = self.take_handle(session_id).await {
            if let Err(e) = handle.client.sign_out().await {
                debug!(session_id, error = %e, "sign-out failed, removing session anyway");
            }
            handle.client.disconnect().await;
        }
        delete_session_files(&path);
        info!(session_id, "logged out, session removed");
        Ok(())
    }

    /// Teardown without the protocol-level logout, for sessions that may
    /// already be invalid upstream.
    pub async fn delete(&self, session_id: &str) -> Result<(), TelegramError> {
        let path = self.session_path(session_id)?;
        if let Some(handle) = self.take_handle(session_id).await {
            handle.client.disconnect().await;
        }
        delete_session_files(&path);
        info!(session_id, "session removed");
        Ok(())
    }

    /// The slot for a session id, inserting an empty one if needed. Both
    /// map guards are released before this returns.
    async fn slot(&self, session_id: &str) -> Arc<SessionSlot> {
        if let Some(slot) = self.slots.read().await.get(session_id) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().await;
        Arc::clone(
            slots
                .entry(session_id.to_string())
                .or_insert_with(|| {
                    Arc::new(SessionSlot {
                        handle: Mutex::new(None),
                    })
                }),
        )
    }

    /// Remove the slot from the map (brief write lock), then extract its
    /// handle. Any awaiting happens on the per-session lock only.
    async fn take_handle(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        let slot = self.slots.write().await.remove(session_id)?;
        let mut handle = slot.handle.lock().await;
        handle.take()
    }
}

fn valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Best-effort removal of the credential file plus any auxiliary files
/// sharing its name prefix (journals etc). Failures are swallowed.
pub fn delete_session_files(session_path: &Path) {
    let Some(dir) = session_path.parent() else {
        return;
    };
    let Some(prefix) = session_path.file_name().and_then(|n| n.to_str()) else {
        return;
    };
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with(prefix) {
            let _ = std::fs::remove_file(entry.path());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::testing::{MockClient, MockFactory};

    fn registry(dir: &Path) -> (SessionRegistry, Arc<MockFactory>) {
        let factory = Arc::new(MockFactory::new());
        (
            SessionRegistry::new(dir, Arc::clone(&factory) as Arc<dyn ClientFactory>),
            factory,
        )
    }

    /// Factory whose connect for the "stuck" session never completes.
    struct StuckFactory;

    #[async_trait]
    impl ClientFactory for StuckFactory {
        async fn open(
            &self,
            session_path: &Path,
        ) -> Result<Arc<dyn TelegramClient>, TelegramError> {
            if session_path.file_name().is_some_and(|n| n == "session_stuck") {
                std::future::pending::<()>().await;
            }
            Ok(Arc::new(MockClient::new()))
        }
    }

    #[tokio::test]
    async fn accessor_reuses_the_same_handle() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, factory) = registry(dir.path());

        let first = registry.get_or_create("alice").await.unwrap();
        let second = registry.get_or_create("alice").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.open_count(), 1);
    }

    #[tokio::test]
    async fn distinct_ids_get_distinct_handles() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, factory) = registry(dir.path());

        let a = registry.get_or_create("alice").await.unwrap();
        let b = registry.get_or_create("bob").await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(factory.open_count(), 2);
    }

    #[tokio::test]
    async fn disconnected_handle_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, factory) = registry(dir.path());

        let first = registry.get_or_create("alice").await.unwrap();
        factory.client("alice").set_connected(false);
        let second = registry.get_or_create("alice").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(factory.open_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_connect_does_not_block_other_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(SessionRegistry::new(
            dir.path(),
            Arc::new(StuckFactory) as Arc<dyn ClientFactory>,
        ));

        let stuck = Arc::clone(&registry);
        tokio::spawn(async move {
            let _ = stuck.get_or_create("stuck").await;
        });
        // Let the stuck connect claim its per-session lock first.
        tokio::task::yield_now().await;

        let other = tokio::time::timeout(
            Duration::from_secs(30),
            registry.get_or_create("other"),
        )
        .await
        .expect("other session must not wait on the stuck connect");
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn logout_removes_files_even_when_sign_out_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, factory) = registry(dir.path());

        registry.get_or_create("alice").await.unwrap();
        let base = dir.path().join("session_alice");
        std::fs::write(&base, b"creds").unwrap();
        std::fs::write(dir.path().join("session_alice-journal"), b"wal").unwrap();
        std::fs::write(dir.path().join("session_bob"), b"other").unwrap();

        factory.client("alice").fail_sign_out();
        registry.logout("alice").await.unwrap();

        assert!(!base.exists());
        assert!(!dir.path().join("session_alice-journal").exists());
        assert!(dir.path().join("session_bob").exists());
    }

    #[tokio::test]
    async fn delete_skips_protocol_logout() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, factory) = registry(dir.path());

        registry.get_or_create("alice").await.unwrap();
        let client = factory.client("alice");
        std::fs::write(dir.path().join("session_alice"), b"creds").unwrap();

        registry.delete("alice").await.unwrap();
        assert!(!client.signed_out());
        assert!(!dir.path().join("session_alice").exists());
    }

    #[tokio::test]
    async fn logout_without_live_handle_still_deletes_files() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _factory) = registry(dir.path());

        std::fs::write(dir.path().join("session_ghost"), b"stale").unwrap();
        registry.logout("ghost").await.unwrap();
        assert!(!dir.path().join("session_ghost").exists());
    }

    #[tokio::test]
    async fn rejects_path_escaping_ids() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _factory) = registry(dir.path());

        for bad in ["../etc", "a/b", "", "a b"] {
            assert!(matches!(
                registry.get_or_create(bad).await,
                Err(TelegramError::InvalidSessionId)
            ));
        }
    }
}
