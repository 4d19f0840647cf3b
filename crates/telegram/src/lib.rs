//! Telegram session management and BotFather automation.
//!
//! Lifecycle of a session:
//! 1. `/send-code` creates (or reuses) a connected client handle and
//!    requests an OTP for the phone number
//! 2. `/verify-code` signs in with the code (and the 2FA password when the
//!    account has one), persisting credentials to disk
//! 3. Bot provisioning drives a scripted conversation with @BotFather over
//!    the authorized handle
//! 4. `/logout` / `/delete-session` tear the handle down and remove every
//!    on-disk artifact
//!
//! The MTProto transport itself (grammers) stays behind the
//! [`client::TelegramClient`] trait; everything above it is glue.

pub mod botfather;
pub mod client;
pub mod error;
pub mod live;
pub mod login;
pub mod registry;
pub mod testing;

pub use {
    client::{ClientFactory, InboundMessage, TelegramClient, UserProfile},
    error::TelegramError,
    registry::SessionRegistry,
};
