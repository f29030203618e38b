//! Slack transport for slashspot
//!
//! This crate turns `/spot` slash commands into registry calls:
//! - **Signatures** (`signature`) - `X-Slack-Signature` v0 verification
//! - **Slash Commands** (`commands`) - `/spot find`, `/spot reg B1`, `/spot drop all`, ...
//! - **Messages** (`messages`) - the plain-text reply catalogue
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Add a `/spot` slash command whose request URL points at `POST /command`
//! 3. Set `SLASHSPOT_SLACK_SIGNING_SECRET` from the app's Basic Information page
//!
//! # Architecture
//!
//! ```text
//! POST /command → SignatureVerifier → normalize_spot_command → CommandRouter
//!                                                                 ↓
//!                         plain-text reply ← messages ← Registry (blocking pool)
//! ```
//!
//! # Key Types
//!
//! - `SignatureVerifier` - HMAC-SHA256 request verification with a replay window
//! - `CommandRouter` - Classifies command text and renders the reply
//! - `SpotCommandService` - Trait for executing engine requests

pub mod commands;
pub mod messages;
pub mod signature;

pub use commands::{
    normalize_spot_command, parse_spot_command, CommandEnvelope, CommandParseError,
    CommandRouteError, CommandRouter, RegistryCommandService, SlashCommandPayload, SpotCommand,
    SpotCommandService, SPOT_COMMAND,
};
pub use signature::{SignatureError, SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};
