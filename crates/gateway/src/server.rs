use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router, middleware,
        routing::{get, post},
    },
    tower_http::cors::{Any, CorsLayer},
    tracing::info,
};

use {
    botforge_config::BotforgeConfig,
    botforge_telegram::{SessionRegistry, client::ClientFactory, live::GrammersFactory},
};

use crate::{auth, routes, state::GatewayState};

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let guarded = Router::new()
        .route("/send-code", post(routes::send_code))
        .route("/verify-code", post(routes::verify_code))
        .route("/check-session", post(routes::check_session))
        .route("/create-bot", post(routes::create_bot))
        .route("/get-my-bots", post(routes::get_my_bots))
        .route("/get-bot-token", post(routes::get_bot_token))
        .route("/logout", post(routes::logout))
        .route("/delete-session", post(routes::delete_session))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            routes::require_api_key,
        ));

    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .merge(guarded)
        .layer(cors)
        .with_state(state)
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Start the HTTP service with the live grammers client factory.
pub async fn start_gateway(config: BotforgeConfig) -> anyhow::Result<()> {
    if config.telegram.api_id == 0 || config.telegram.api_hash.is_empty() {
        anyhow::bail!(
            "telegram API credentials missing; set TELEGRAM_API_ID and TELEGRAM_API_HASH"
        );
    }
    let resolved_auth = auth::resolve_auth(&config.auth)?;

    let factory: Arc<dyn ClientFactory> = Arc::new(GrammersFactory::new(
        config.telegram.api_id,
        config.telegram.api_hash.clone(),
    ));
    let registry = Arc::new(SessionRegistry::new(&config.sessions.dir, factory));
    let state = GatewayState::new(resolved_auth, registry);

    let app = build_app(Arc::clone(&state));

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Startup banner.
    let lines = [
        format!("botforge gateway v{}", state.version),
        format!("listening on {addr}"),
        format!(
            "auth: {}",
            if state.auth.api_key.is_some() {
                "X-Api-Key"
            } else {
                "disabled (explicit opt-in)"
            }
        ),
        format!("sessions: {}", config.sessions.dir.display()),
    ];
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    axum::serve(listener, app).await?;
    Ok(())
}
