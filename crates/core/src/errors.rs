use std::path::PathBuf;

use thiserror::Error;

use crate::domain::spot::Spot;

/// Stable error tags surfaced to the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoSpots,
    NotAvailable,
    Duplicate,
    PastDate,
    BadDate,
    DropDenied,
    MissingSpotId,
    StoreCorrupt,
    StoreIo,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSpots => "no_spots",
            Self::NotAvailable => "not_available",
            Self::Duplicate => "duplicate",
            Self::PastDate => "past_date",
            Self::BadDate => "bad_date",
            Self::DropDenied => "drop_denied",
            Self::MissingSpotId => "missing_spot_id",
            Self::StoreCorrupt => "store_corrupt",
            Self::StoreIo => "store_io",
        }
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::StoreCorrupt | Self::StoreIo)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no spots available today")]
    NoSpots,
    #[error("spot `{id}` is not available today")]
    NotAvailable { id: String },
    #[error(
        "spot `{}` is already registered for {} by {}",
        .existing.id,
        .existing.open_date,
        .existing.registered_by
    )]
    Duplicate { existing: Spot },
    #[error("open date {date} is in the past")]
    PastDate { date: String },
    #[error("`{input}` is not a valid YYYY-MM-DD date")]
    BadDate { input: String },
    #[error("registration `{id}` could not be dropped")]
    DropDenied { id: String },
    #[error("`{verb}` requires a spot id")]
    MissingSpotId { verb: String },
    #[error("spot store `{path}` could not be decoded: {detail}")]
    StoreCorrupt { path: PathBuf, detail: String },
    #[error("spot store `{path}` i/o failure: {detail}")]
    StoreIo { path: PathBuf, detail: String },
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoSpots => ErrorKind::NoSpots,
            Self::NotAvailable { .. } => ErrorKind::NotAvailable,
            Self::Duplicate { .. } => ErrorKind::Duplicate,
            Self::PastDate { .. } => ErrorKind::PastDate,
            Self::BadDate { .. } => ErrorKind::BadDate,
            Self::DropDenied { .. } => ErrorKind::DropDenied,
            Self::MissingSpotId { .. } => ErrorKind::MissingSpotId,
            Self::StoreCorrupt { .. } => ErrorKind::StoreCorrupt,
            Self::StoreIo { .. } => ErrorKind::StoreIo,
        }
    }

    /// The registration a caller should see alongside the error, if any.
    ///
    /// Duplicates name the current holder; a failed claim yields the `N/A` sentinel.
    pub fn spot(&self) -> Option<Spot> {
        match self {
            Self::Duplicate { existing } => Some(existing.clone()),
            Self::NotAvailable { .. } => Some(Spot::not_available()),
            _ => None,
        }
    }

    /// Short, user-safe detail for the transport. Persistence paths are withheld.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::NoSpots => None,
            Self::NotAvailable { id } | Self::DropDenied { id } => Some(id.clone()),
            Self::Duplicate { existing } => Some(existing.registered_by.clone()),
            Self::PastDate { date } => Some(date.clone()),
            Self::BadDate { input } => Some(input.clone()),
            Self::MissingSpotId { verb } => Some(verb.clone()),
            Self::StoreCorrupt { .. } | Self::StoreIo { .. } => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::StoreIo { path: path.into(), detail: error.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::domain::spot::{Spot, NOT_AVAILABLE};
    use crate::errors::{ErrorKind, RegistryError};

    fn held_spot() -> Spot {
        Spot {
            id: "A1".to_owned(),
            open_date: "2024-03-15".to_owned(),
            reg_date: "2024-03-14".to_owned(),
            registered_by: "alice".to_owned(),
        }
    }

    #[test]
    fn duplicate_carries_current_holder() {
        let error = RegistryError::Duplicate { existing: held_spot() };

        assert_eq!(error.kind(), ErrorKind::Duplicate);
        assert_eq!(error.spot().map(|spot| spot.registered_by).as_deref(), Some("alice"));
        assert_eq!(error.detail().as_deref(), Some("alice"));
        assert!(error.to_string().contains("alice"));
    }

    #[test]
    fn not_available_yields_sentinel_spot() {
        let error = RegistryError::NotAvailable { id: "B3".to_owned() };

        assert_eq!(error.kind().as_str(), "not_available");
        assert_eq!(error.spot().map(|spot| spot.id).as_deref(), Some(NOT_AVAILABLE));
    }

    #[test]
    fn persistence_errors_hide_paths_from_detail() {
        let error = RegistryError::StoreIo {
            path: PathBuf::from("/var/lib/slashspot/spots.json"),
            detail: "permission denied".to_owned(),
        };

        assert!(error.kind().is_persistence());
        assert_eq!(error.detail(), None);
        assert!(error.to_string().contains("permission denied"));
    }

    #[test]
    fn business_kinds_are_not_persistence_failures() {
        for kind in [
            ErrorKind::NoSpots,
            ErrorKind::NotAvailable,
            ErrorKind::Duplicate,
            ErrorKind::PastDate,
            ErrorKind::BadDate,
            ErrorKind::DropDenied,
            ErrorKind::MissingSpotId,
        ] {
            assert!(!kind.is_persistence(), "{kind} should be a business error");
        }
    }
}
