use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::clock::format_day;

/// Id carried by the placeholder returned when a claim misses.
pub const NOT_AVAILABLE: &str = "N/A";

/// A registration asserting that a spot is free on one calendar day.
///
/// Field names and order are the on-disk contract; existing store files must
/// keep loading, so missing fields fall back to empty strings and unknown ones
/// are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Spot {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "OpenDate")]
    pub open_date: String,
    #[serde(rename = "RegDate")]
    pub reg_date: String,
    #[serde(rename = "RegisteredBy")]
    pub registered_by: String,
}

impl Spot {
    pub fn new(
        id: impl Into<String>,
        registered_by: impl Into<String>,
        open_date: NaiveDate,
        reg_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            open_date: format_day(open_date),
            reg_date: format_day(reg_date),
            registered_by: registered_by.into(),
        }
    }

    pub fn not_available() -> Self {
        Self { id: NOT_AVAILABLE.to_owned(), ..Self::default() }
    }

    pub fn key(&self) -> String {
        composite_key(&self.id, &self.open_date)
    }

    pub fn is_owned_by(&self, user: &str) -> bool {
        self.registered_by == user
    }

    pub fn is_zero_value(&self) -> bool {
        self.id.is_empty()
            && self.open_date.is_empty()
            && self.reg_date.is_empty()
            && self.registered_by.is_empty()
    }
}

pub fn composite_key(id: &str, open_date: &str) -> String {
    format!("{id}-{open_date}")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{composite_key, Spot, NOT_AVAILABLE};

    #[test]
    fn key_joins_id_and_open_date() {
        let spot = Spot {
            id: "T1".to_owned(),
            open_date: "2020-01-01".to_owned(),
            reg_date: "2020-01-01".to_owned(),
            registered_by: "SuperFuzz".to_owned(),
        };

        assert_eq!(spot.key(), "T1-2020-01-01");
        assert_eq!(composite_key("B11", "2024-03-15"), "B11-2024-03-15");
    }

    #[test]
    fn new_formats_dates_as_days() {
        let open = NaiveDate::from_ymd_opt(2024, 3, 16).expect("valid");
        let reg = NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid");
        let spot = Spot::new("11", "jjrambo", open, reg);

        assert_eq!(spot.open_date, "2024-03-16");
        assert_eq!(spot.reg_date, "2024-03-15");
        assert_eq!(spot.key(), "11-2024-03-16");
        assert!(spot.is_owned_by("jjrambo"));
        assert!(!spot.is_owned_by("JJRambo"));
    }

    #[test]
    fn serializes_with_stable_field_names_in_order() {
        let spot = Spot {
            id: "B1".to_owned(),
            open_date: "2020-01-05".to_owned(),
            reg_date: "2020-01-04".to_owned(),
            registered_by: "alice".to_owned(),
        };

        let encoded = serde_json::to_string(&spot).expect("encode");
        assert_eq!(
            encoded,
            r#"{"ID":"B1","OpenDate":"2020-01-05","RegDate":"2020-01-04","RegisteredBy":"alice"}"#
        );
    }

    #[test]
    fn decoding_tolerates_missing_and_unknown_fields() {
        let spot: Spot =
            serde_json::from_str(r#"{"ID":"B2","Floor":3,"RegisteredBy":"bob"}"#).expect("decode");

        assert_eq!(spot.id, "B2");
        assert_eq!(spot.open_date, "");
        assert_eq!(spot.reg_date, "");
        assert_eq!(spot.registered_by, "bob");
    }

    #[test]
    fn sentinel_is_only_an_id() {
        let sentinel = Spot::not_available();
        assert_eq!(sentinel.id, NOT_AVAILABLE);
        assert!(!sentinel.is_zero_value());
        assert!(Spot::default().is_zero_value());
    }
}
