use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use slashspot_core::{execute, ErrorKind, Registry, SpotRequest, SpotResponse};
use thiserror::Error;
use tracing::{debug, warn};

use crate::messages;

pub const SPOT_COMMAND: &str = "/spot";

/// Form fields Slack posts for a slash command invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub team_id: String,
    pub channel_id: String,
    pub user_id: String,
    pub user_name: String,
    pub response_url: String,
    pub trigger_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub command: String,
    pub verb: String,
    pub args: Vec<String>,
    /// Identity recorded on registrations: the Slack user name, else the user id.
    pub user: String,
    pub user_id: String,
    pub channel_id: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpotCommand {
    Find,
    Register { id: String, date: Option<String> },
    Claim { id: String },
    Drop { id: String },
    DropAll,
    Help,
    Blank,
    Unknown { verb: String },
    MissingArgument { verb: String },
}

impl SpotCommand {
    /// The engine request this command maps to; `None` for replies the
    /// transport answers on its own.
    pub fn to_request(&self, user: &str) -> Option<SpotRequest> {
        match self {
            Self::Find => Some(SpotRequest::find(user)),
            Self::Register { id, date } => Some(SpotRequest::register(id, user, date.clone())),
            Self::Claim { id } => Some(SpotRequest::claim(id, user)),
            Self::Drop { id } => Some(SpotRequest::drop_one(id, user)),
            Self::DropAll => Some(SpotRequest::drop_all(user)),
            Self::Help | Self::Blank | Self::Unknown { .. } | Self::MissingArgument { .. } => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
    #[error("slash command payload has no user")]
    MissingUser,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

pub fn normalize_spot_command(
    payload: SlashCommandPayload,
    expected_command: &str,
) -> Result<CommandEnvelope, CommandParseError> {
    if payload.command != expected_command {
        return Err(CommandParseError::UnsupportedCommand(payload.command));
    }

    let user = [payload.user_name.trim(), payload.user_id.trim()]
        .into_iter()
        .find(|candidate| !candidate.is_empty())
        .ok_or(CommandParseError::MissingUser)?
        .to_owned();

    let mut parts = payload.text.split_whitespace();
    let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
    let args = parts.map(str::to_owned).collect();

    Ok(CommandEnvelope {
        command: expected_command.trim_start_matches('/').to_owned(),
        verb,
        args,
        user,
        user_id: payload.user_id,
        channel_id: payload.channel_id,
        request_id: payload.trigger_id,
    })
}

pub fn parse_spot_command(input: &str) -> SpotCommand {
    let mut parts = input.split_whitespace();
    let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<String> = parts.map(str::to_owned).collect();
    classify_spot_command(&verb, &args)
}

fn classify_spot_command(verb: &str, args: &[String]) -> SpotCommand {
    let first = args.first().cloned();
    let missing = || SpotCommand::MissingArgument { verb: verb.to_owned() };

    match verb {
        "" => SpotCommand::Blank,
        "help" => SpotCommand::Help,
        "find" | "open" => SpotCommand::Find,
        "reg" | "register" | "set" => match first {
            Some(id) => SpotCommand::Register { id, date: args.get(1).cloned() },
            None => missing(),
        },
        "claim" | "take" | "reserve" => match first {
            Some(id) => SpotCommand::Claim { id },
            None => missing(),
        },
        "drop" => match first {
            Some(target) if target.eq_ignore_ascii_case("all") => SpotCommand::DropAll,
            Some(id) => SpotCommand::Drop { id },
            None => missing(),
        },
        _ => SpotCommand::Unknown { verb: verb.to_owned() },
    }
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: SpotCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Resolves an envelope to the single line of text sent back to Slack.
    pub async fn route(&self, envelope: CommandEnvelope) -> Result<String, CommandRouteError> {
        let command = classify_spot_command(&envelope.verb, &envelope.args);
        debug!(
            event_name = "slack.command.received",
            request_id = %envelope.request_id,
            user_id = %envelope.user_id,
            verb = %envelope.verb,
            "spot command received"
        );

        let Some(request) = command.to_request(&envelope.user) else {
            return Ok(local_reply(&command));
        };

        let response = self.service.execute(request, &envelope).await?;
        Ok(describe(&command, &response, &envelope))
    }
}

#[async_trait]
pub trait SpotCommandService: Send + Sync {
    async fn execute(
        &self,
        request: SpotRequest,
        envelope: &CommandEnvelope,
    ) -> Result<SpotResponse, CommandRouteError>;
}

/// Runs requests against a shared registry on the blocking pool.
#[derive(Clone, Debug)]
pub struct RegistryCommandService {
    registry: Arc<Registry>,
}

impl RegistryCommandService {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl SpotCommandService for RegistryCommandService {
    async fn execute(
        &self,
        request: SpotRequest,
        _envelope: &CommandEnvelope,
    ) -> Result<SpotResponse, CommandRouteError> {
        let registry = Arc::clone(&self.registry);
        tokio::task::spawn_blocking(move || execute(&registry, request))
            .await
            .map_err(|error| CommandRouteError::Service(error.to_string()))
    }
}

fn local_reply(command: &SpotCommand) -> String {
    match command {
        SpotCommand::Help => messages::HELP_TEXT.to_owned(),
        SpotCommand::Unknown { verb } => messages::unknown_verb(verb),
        _ => messages::IDK_BLANK.to_owned(),
    }
}

fn describe(command: &SpotCommand, response: &SpotResponse, envelope: &CommandEnvelope) -> String {
    if let SpotResponse::Error { kind, .. } = response {
        if kind.is_persistence() {
            return messages::STORAGE_UNAVAILABLE.to_owned();
        }
    }

    match (command, response) {
        (SpotCommand::Find, SpotResponse::Spots(spots)) if !spots.is_empty() => {
            messages::open_spots(spots)
        }
        (SpotCommand::Find, _) => messages::NO_SPOTS_AVAILABLE.to_owned(),
        (SpotCommand::Register { .. }, SpotResponse::Spot(spot)) => messages::registered(&spot.id),
        (SpotCommand::Register { id, date }, SpotResponse::Error { kind, detail, spot }) => {
            let input = detail.clone().or_else(|| date.clone()).unwrap_or_default();
            match kind {
                ErrorKind::Duplicate => {
                    let holder = spot
                        .as_ref()
                        .map(|existing| existing.registered_by.clone())
                        .unwrap_or(input);
                    messages::duplicate_registration(id, &holder)
                }
                ErrorKind::PastDate => messages::past_date(&input),
                ErrorKind::BadDate => messages::bad_date(&input),
                _ => unexpected(command, response),
            }
        }
        (SpotCommand::Claim { .. }, SpotResponse::Spot(spot)) => messages::claimed(&spot.id),
        (SpotCommand::Claim { id }, SpotResponse::Error { .. }) => messages::claim_unavailable(id),
        (SpotCommand::Drop { id }, SpotResponse::Dropped { .. }) => messages::dropped(id),
        (SpotCommand::Drop { id }, SpotResponse::Error { .. }) => messages::drop_denied(id),
        (SpotCommand::DropAll, SpotResponse::Count(count)) => {
            messages::all_dropped(&envelope.user, *count)
        }
        _ => unexpected(command, response),
    }
}

fn unexpected(command: &SpotCommand, response: &SpotResponse) -> String {
    warn!(
        event_name = "slack.command.unexpected_response",
        command = ?command,
        response = ?response,
        "no reply template for response"
    );
    messages::IDK_BLANK.to_owned()
}
