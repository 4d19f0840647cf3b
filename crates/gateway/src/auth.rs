use botforge_config::schema::AuthConfig;

// ── Types ────────────────────────────────────────────────────────────────────

/// Resolved gateway auth configuration. `api_key: None` only ever means the
/// operator explicitly opted in to an unauthenticated service.
#[derive(Debug, Clone)]
pub struct ResolvedAuth {
    pub api_key: Option<String>,
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Constant-time string comparison (prevents timing attacks).
fn safe_equal(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    // XOR each byte and accumulate; any difference makes result non-zero.
    let diff = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}

// ── Auth logic ───────────────────────────────────────────────────────────────

/// Resolve auth from config. Running without a key requires
/// `auth.allow_unauthenticated = true`; a missing secret never silently
/// disables auth.
pub fn resolve_auth(config: &AuthConfig) -> anyhow::Result<ResolvedAuth> {
    match config.api_key() {
        Some(key) => Ok(ResolvedAuth {
            api_key: Some(key.to_string()),
        }),
        None if config.allow_unauthenticated => {
            tracing::warn!("no API key configured, serving unauthenticated (explicit opt-in)");
            Ok(ResolvedAuth { api_key: None })
        },
        None => anyhow::bail!(
            "no API key configured; set LARAVEL_SECRET_KEY (or auth.api_key) \
             or opt in with auth.allow_unauthenticated = true"
        ),
    }
}

/// Authenticate one request's `X-Api-Key` header value.
pub fn authorize(auth: &ResolvedAuth, provided: Option<&str>) -> bool {
    match auth.api_key.as_deref() {
        None => true,
        Some(expected) => provided.is_some_and(|given| safe_equal(given, expected)),
    }
}
