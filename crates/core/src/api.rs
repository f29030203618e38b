//! Request and response records exchanged with the transport layer.

use serde::{Deserialize, Serialize};

use crate::clock::parse_day;
use crate::domain::spot::Spot;
use crate::errors::{ErrorKind, RegistryError};
use crate::registry::Registry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotVerb {
    Find,
    Claim,
    Register,
    DropOne,
    DropAll,
}

impl SpotVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::Claim => "claim",
            Self::Register => "register",
            Self::DropOne => "drop_one",
            Self::DropAll => "drop_all",
        }
    }

    pub fn requires_id(&self) -> bool {
        matches!(self, Self::Claim | Self::Register | Self::DropOne)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotRequest {
    pub verb: SpotVerb,
    pub id: Option<String>,
    pub user: String,
    pub open_date: Option<String>,
}

impl SpotRequest {
    pub fn find(user: impl Into<String>) -> Self {
        Self { verb: SpotVerb::Find, id: None, user: user.into(), open_date: None }
    }

    pub fn claim(id: impl Into<String>, user: impl Into<String>) -> Self {
        Self { verb: SpotVerb::Claim, id: Some(id.into()), user: user.into(), open_date: None }
    }

    pub fn register(
        id: impl Into<String>,
        user: impl Into<String>,
        open_date: Option<String>,
    ) -> Self {
        Self { verb: SpotVerb::Register, id: Some(id.into()), user: user.into(), open_date }
    }

    pub fn drop_one(id: impl Into<String>, user: impl Into<String>) -> Self {
        Self { verb: SpotVerb::DropOne, id: Some(id.into()), user: user.into(), open_date: None }
    }

    pub fn drop_all(user: impl Into<String>) -> Self {
        Self { verb: SpotVerb::DropAll, id: None, user: user.into(), open_date: None }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpotResponse {
    /// Today's open spots, sorted by id.
    Spots(Vec<Spot>),
    Spot(Spot),
    Dropped { id: String },
    Count(usize),
    Error { kind: ErrorKind, detail: Option<String>, spot: Option<Spot> },
}

impl SpotResponse {
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<RegistryError> for SpotResponse {
    fn from(error: RegistryError) -> Self {
        Self::Error { kind: error.kind(), detail: error.detail(), spot: error.spot() }
    }
}

/// Runs one request against the registry.
///
/// Blocks on the registry lock and on file I/O; async callers should run it on
/// a blocking thread.
pub fn execute(registry: &Registry, request: SpotRequest) -> SpotResponse {
    match dispatch(registry, request) {
        Ok(response) => response,
        Err(error) => {
            if error.kind().is_persistence() {
                tracing::error!(
                    event_name = "spot.api.persistence_failed",
                    error_kind = %error.kind(),
                    error = %error,
                    "spot store unavailable"
                );
            }
            error.into()
        }
    }
}

fn dispatch(registry: &Registry, request: SpotRequest) -> Result<SpotResponse, RegistryError> {
    let SpotRequest { verb, id, user, open_date } = request;
    let id = match (verb.requires_id(), id) {
        (true, Some(id)) if !id.trim().is_empty() => id,
        (true, _) => return Err(RegistryError::MissingSpotId { verb: verb.as_str().to_owned() }),
        (false, _) => String::new(),
    };

    match verb {
        SpotVerb::Find => registry.find_sorted().map(SpotResponse::Spots),
        SpotVerb::Claim => registry.claim(&id, &user).map(SpotResponse::Spot),
        SpotVerb::Register => {
            let open_date = open_date.as_deref().map(parse_day).transpose()?;
            registry.register(&id, &user, open_date).map(SpotResponse::Spot)
        }
        SpotVerb::DropOne => registry.drop_one(&id, &user).map(|()| SpotResponse::Dropped { id }),
        SpotVerb::DropAll => registry.drop_all(&user).map(SpotResponse::Count),
    }
}
