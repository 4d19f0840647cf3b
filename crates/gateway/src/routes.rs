use std::sync::Arc;

use {
    axum::{
        Json,
        extract::{Request, State},
        http::StatusCode,
        middleware::Next,
        response::{IntoResponse, Response},
    },
    serde_json::{Value, json},
    tracing::warn,
};

use botforge_telegram::{TelegramError, botfather, login, registry::SessionHandle};

use crate::{
    auth,
    payload::{
        self, CreateBotRequest, GetTokenRequest, SendCodeRequest, SessionRequest,
        VerifyCodeRequest,
    },
    state::GatewayState,
};

// ── Middleware ───────────────────────────────────────────────────────────────

/// Reject requests without a valid `X-Api-Key` before any session logic runs.
pub async fn require_api_key(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());
    if auth::authorize(&state.auth, provided) {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid API key"})),
        )
            .into_response()
    }
}

// ── Public routes ────────────────────────────────────────────────────────────

pub async fn root(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    Json(json!({
        "service": "Telegram Bot Creator",
        "status": "running",
        "version": state.version,
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

// ── Session / login routes ───────────────────────────────────────────────────

pub async fn send_code(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<SendCodeRequest>,
) -> Json<Value> {
    let result = async {
        let session = state.registry.get_or_create(&req.session_id).await?;
        login::send_code(session.client.as_ref(), &req.phone).await
    }
    .await;

    match result {
        Ok(phone_code_hash) => Json(json!({
            "success": true,
            "phone_code_hash": phone_code_hash,
            "message": "verification code sent to your Telegram app",
        })),
        Err(err) => fail("send-code", &req.session_id, err),
    }
}

pub async fn verify_code(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<VerifyCodeRequest>,
) -> Json<Value> {
    let result = async {
        let session = state.registry.get_or_create(&req.session_id).await?;
        login::verify_code(
            session.client.as_ref(),
            &req.code,
            &req.phone_code_hash,
            req.password.as_deref(),
        )
        .await
    }
    .await;

    match result {
        Ok(user) => Json(json!({
            "success": true,
            "user": user,
            "message": "login successful",
        })),
        Err(err) => fail("verify-code", &req.session_id, err),
    }
}

pub async fn check_session(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<SessionRequest>,
) -> Json<Value> {
    let result = async {
        let session = state.registry.get_or_create(&req.session_id).await?;
        login::check_session(session.client.as_ref()).await
    }
    .await;

    match result {
        Ok(Some(user)) => Json(json!({"success": true, "authorized": true, "user": user})),
        Ok(None) => Json(json!({"success": true, "authorized": false})),
        Err(err) => fail("check-session", &req.session_id, err),
    }
}

pub async fn logout(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<SessionRequest>,
) -> Json<Value> {
    match state.registry.logout(&req.session_id).await {
        Ok(()) => Json(json!({"success": true, "message": "logged out, session removed"})),
        Err(err) => fail("logout", &req.session_id, err),
    }
}

pub async fn delete_session(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<SessionRequest>,
) -> Json<Value> {
    match state.registry.delete(&req.session_id).await {
        Ok(()) => Json(json!({"success": true, "message": "session removed"})),
        Err(err) => fail("delete-session", &req.session_id, err),
    }
}

// ── BotFather routes ─────────────────────────────────────────────────────────

pub async fn create_bot(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<CreateBotRequest>,
) -> Json<Value> {
    let result = async {
        let session = state.registry.get_or_create(&req.session_id).await?;
        let _conversation = conversation(&session).await;
        botfather::create_bot(session.client.as_ref(), &req.bot_name, &req.bot_username).await
    }
    .await;

    match result {
        Ok(bot) => {
            let message = format!("Bot @{} created", bot.username);
            Json(json!({"success": true, "bot": bot, "message": message}))
        },
        Err(err) => fail("create-bot", &req.session_id, err),
    }
}

pub async fn get_my_bots(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<SessionRequest>,
) -> Json<Value> {
    let result = async {
        let session = state.registry.get_or_create(&req.session_id).await?;
        let _conversation = conversation(&session).await;
        botfather::list_bots(session.client.as_ref()).await
    }
    .await;

    match result {
        Ok(response) => Json(json!({"success": true, "response": response})),
        Err(err) => fail("get-my-bots", &req.session_id, err),
    }
}

pub async fn get_bot_token(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<GetTokenRequest>,
) -> Json<Value> {
    let result = async {
        let session = state.registry.get_or_create(&req.session_id).await?;
        let _conversation = conversation(&session).await;
        botfather::bot_token(session.client.as_ref(), &req.bot_username).await
    }
    .await;

    match result {
        Ok(token) => Json(json!({"success": true, "token": token})),
        Err(err) => fail("get-bot-token", &req.session_id, err),
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Hold the per-session conversation lock so concurrent scripted flows for
/// one session cannot interleave their sends.
async fn conversation(session: &Arc<SessionHandle>) -> tokio::sync::MutexGuard<'_, ()> {
    session.conversation.lock().await
}

fn fail(operation: &str, session_id: &str, err: TelegramError) -> Json<Value> {
    warn!(operation, session_id, error = %err, tag = err.tag(), "request failed");
    Json(payload::failure(&err))
}
