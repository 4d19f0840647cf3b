//! Scripted BotFather conversations: create a bot, list bots, fetch a token.
//!
//! BotFather is a conversational peer, not an API, so each operation sends a
//! command and waits for the next inbound message newer than a recorded
//! watermark, with an overall timeout. The reply text is then scraped with a
//! token pattern.

use std::time::Duration;

use {
    lazy_regex::lazy_regex,
    serde::Serialize,
    tracing::{debug, info},
};

use crate::{
    client::{InboundMessage, TelegramClient},
    error::TelegramError,
};

/// Username of the official bot-management account.
pub const BOTFATHER: &str = "BotFather";

/// How long to wait for BotFather to answer one prompt.
const REPLY_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(400);

/// How many trailing messages to scan for a freshly issued token.
const TOKEN_SCAN_DEPTH: usize = 3;

static TOKEN_RE: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"\d+:[A-Za-z0-9_-]+");

/// Result of a successful bot-creation flow. Not persisted here; the caller
/// owns bot metadata.
#[derive(Debug, Clone, Serialize)]
pub struct BotRecord {
    pub token: String,
    pub bot_id: String,
    pub username: String,
    pub name: String,
}

/// Append `_bot` unless the requested handle already ends in a
/// case-insensitive "bot" suffix, which BotFather requires.
pub fn normalize_bot_username(requested: &str) -> String {
    if requested.to_ascii_lowercase().ends_with("bot") {
        requested.to_string()
    } else {
        format!("{requested}_bot")
    }
}

/// First `<digits>:<alnum/underscore/hyphen>` match in the text, if any.
pub fn extract_token(text: &str) -> Option<&str> {
    TOKEN_RE.find(text).map(|m| m.as_str())
}

fn is_username_taken(text: &str) -> bool {
    let text = text.to_lowercase();
    text.contains("already taken") || text.contains("sudah digunakan")
}

async fn ensure_authorized(client: &dyn TelegramClient) -> Result<(), TelegramError> {
    if !client.is_authorized().await? {
        return Err(TelegramError::NotAuthorized);
    }
    Ok(())
}

async fn latest_message_id(
    client: &dyn TelegramClient,
    peer: &str,
) -> Result<i32, TelegramError> {
    Ok(client
        .recent_messages(peer, 1)
        .await?
        .first()
        .map(|m| m.id)
        .unwrap_or(0))
}

/// Wait for the next inbound message newer than `after_id`.
async fn await_reply(
    client: &dyn TelegramClient,
    peer: &str,
    after_id: i32,
) -> Result<InboundMessage, TelegramError> {
    let deadline = tokio::time::Instant::now() + REPLY_TIMEOUT;
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        for message in client.recent_messages(peer, 1).await? {
            if message.id > after_id && !message.outgoing {
                return Ok(message);
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(TelegramError::NoReply {
                peer: peer.to_string(),
                timeout_secs: REPLY_TIMEOUT.as_secs(),
            });
        }
    }
}

/// Send a prompt and wait for BotFather's answer.
async fn prompt(
    client: &dyn TelegramClient,
    text: &str,
    after_id: i32,
) -> Result<InboundMessage, TelegramError> {
    client.send_message(BOTFATHER, text).await?;
    await_reply(client, BOTFATHER, after_id).await
}

/// Drive the `/newbot` dialog and scrape the issued token.
pub async fn create_bot(
    client: &dyn TelegramClient,
    bot_name: &str,
    bot_username: &str,
) -> Result<BotRecord, TelegramError> {
    ensure_authorized(client).await?;
    let username = normalize_bot_username(bot_username);

    let watermark = latest_message_id(client, BOTFATHER).await?;
    let reply = prompt(client, "/newbot", watermark).await?;
    let reply = prompt(client, bot_name, reply.id).await?;
    let reply = prompt(client, &username, reply.id).await?;

    // The congratulation message sometimes arrives in more than one chunk;
    // scan a few trailing messages, first token wins.
    for message in client.recent_messages(BOTFATHER, TOKEN_SCAN_DEPTH).await? {
        if let Some(token) = extract_token(&message.text) {
            let bot_id = token.split(':').next().unwrap_or_default().to_string();
            info!(bot = %username, "bot created");
            return Ok(BotRecord {
                token: token.to_string(),
                bot_id,
                username,
                name: bot_name.to_string(),
            });
        }
    }

    if is_username_taken(&reply.text) {
        return Err(TelegramError::UsernameTaken(username));
    }
    debug!(last_response = %reply.text, "no token in BotFather reply");
    Err(TelegramError::TokenNotFound {
        last_response: reply.text,
    })
}

/// Send `/mybots` and return the reply text verbatim.
pub async fn list_bots(client: &dyn TelegramClient) -> Result<String, TelegramError> {
    ensure_authorized(client).await?;
    let watermark = latest_message_id(client, BOTFATHER).await?;
    let reply = prompt(client, "/mybots", watermark).await?;
    Ok(reply.text)
}

/// Fetch the token of an existing bot via the `/token` dialog.
pub async fn bot_token(
    client: &dyn TelegramClient,
    bot_username: &str,
) -> Result<String, TelegramError> {
    ensure_authorized(client).await?;
    let handle = format!("@{}", bot_username.trim_start_matches('@'));

    let watermark = latest_message_id(client, BOTFATHER).await?;
    let reply = prompt(client, "/token", watermark).await?;
    let reply = prompt(client, &handle, reply.id).await?;

    match extract_token(&reply.text) {
        Some(token) => Ok(token.to_string()),
        None => Err(TelegramError::TokenNotFound {
            last_response: reply.text,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockClient;

    const DONE: &str = "Done! Congratulations on your new bot. \
        Use this token to access the HTTP API: 123456789:ABCdefGhIJKlmNoPQRstuVWXyz";

    fn authorized_client() -> MockClient {
        MockClient::new().pre_authorized()
    }

    #[test]
    fn username_normalization() {
        assert_eq!(normalize_bot_username("myshop"), "myshop_bot");
        assert_eq!(normalize_bot_username("myshopBot"), "myshopBot");
        assert_eq!(normalize_bot_username("myshop_Bot"), "myshop_Bot");
        assert_eq!(normalize_bot_username("myshop_bot"), "myshop_bot");
    }

    #[test]
    fn token_extraction() {
        assert_eq!(
            extract_token(DONE),
            Some("123456789:ABCdefGhIJKlmNoPQRstuVWXyz")
        );
        assert_eq!(extract_token("no token here"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn create_bot_happy_path() {
        let client = authorized_client().with_replies([
            "Alright, a new bot. How are we going to call it?",
            "Good. Now let's choose a username for your bot.",
            DONE,
        ]);

        let bot = create_bot(&client, "My Shop", "myshop").await.unwrap();
        assert_eq!(bot.token, "123456789:ABCdefGhIJKlmNoPQRstuVWXyz");
        assert_eq!(bot.bot_id, "123456789");
        assert_eq!(bot.username, "myshop_bot");
        assert_eq!(bot.name, "My Shop");
        assert_eq!(
            client.sent_messages(),
            vec!["/newbot".to_string(), "My Shop".into(), "myshop_bot".into()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn create_bot_unauthorized_sends_nothing() {
        let client = MockClient::new();
        let result = create_bot(&client, "My Shop", "myshop").await;
        assert!(matches!(result, Err(TelegramError::NotAuthorized)));
        assert!(client.sent_messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn create_bot_username_taken() {
        let client = authorized_client().with_replies([
            "Alright, a new bot. How are we going to call it?",
            "Good. Now let's choose a username for your bot.",
            "Sorry, this username is already taken. Please try something different.",
        ]);

        let result = create_bot(&client, "My Shop", "myshop").await;
        match result {
            Err(TelegramError::UsernameTaken(username)) => assert_eq!(username, "myshop_bot"),
            other => panic!("expected username_taken, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn create_bot_token_not_found_carries_reply() {
        let client = authorized_client().with_replies([
            "Alright, a new bot. How are we going to call it?",
            "Good. Now let's choose a username for your bot.",
            "Sorry, too many attempts. Please try again later.",
        ]);

        let result = create_bot(&client, "My Shop", "myshop").await;
        match result {
            Err(TelegramError::TokenNotFound { last_response }) => {
                assert!(last_response.contains("too many attempts"));
            },
            other => panic!("expected token_not_found, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn create_bot_times_out_without_reply() {
        let client = authorized_client();
        let result = create_bot(&client, "My Shop", "myshop").await;
        assert!(matches!(result, Err(TelegramError::NoReply { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn list_bots_returns_reply_verbatim() {
        let client = authorized_client().with_replies(["Choose a bot from the list below:"]);
        let text = list_bots(&client).await.unwrap();
        assert_eq!(text, "Choose a bot from the list below:");
        assert_eq!(client.sent_messages(), vec!["/mybots".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn bot_token_happy_path() {
        let client = authorized_client().with_replies([
            "Choose a bot to generate a new token.",
            "You can use this token: 987654321:zyxWVUtsRQponMLkjIHgfeDCba",
        ]);

        let token = bot_token(&client, "myshop_bot").await.unwrap();
        assert_eq!(token, "987654321:zyxWVUtsRQponMLkjIHgfeDCba");
        assert_eq!(
            client.sent_messages(),
            vec!["/token".to_string(), "@myshop_bot".into()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn bot_token_not_found() {
        let client = authorized_client().with_replies([
            "Choose a bot to generate a new token.",
            "Invalid bot selected.",
        ]);

        let result = bot_token(&client, "@nosuchbot").await;
        assert!(matches!(result, Err(TelegramError::TokenNotFound { .. })));
    }
}
