use serde::Serialize;
use slashspot_core::config::{AppConfig, LoadOptions};
use slashspot_core::store::read_snapshot;
use slashspot_core::{Spot, SpotMap};

use super::{CommandResult, EXIT_CONFIG};

/// Exit code when the store file cannot be read or decoded.
pub const EXIT_STORE: u8 = 3;

#[derive(Debug, Serialize)]
struct SpotListing<'a> {
    path: String,
    count: usize,
    spots: Vec<&'a Spot>,
}

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "spots",
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };

    let path = config.storage.file_path();
    let spots = match read_snapshot(&path) {
        Ok(spots) => spots,
        Err(error) => {
            let class = error.kind().as_str();
            return CommandResult::failure("spots", class, error.to_string(), EXIT_STORE);
        }
    };

    let output = if json_output {
        render_json(&path.display().to_string(), &spots)
    } else {
        render_table(&path.display().to_string(), &spots)
    };
    CommandResult::text(0, output)
}

/// Registrations in key order: by id, then open date.
fn render_table(path: &str, spots: &SpotMap) -> String {
    if spots.is_empty() {
        return format!("no registrations in `{path}`");
    }

    let mut lines = vec![format!("{} registration(s) in `{path}`:", spots.len())];
    lines.push(format!("{:<12} {:<10} {:<10} {}", "ID", "OPEN", "REGISTERED", "BY"));
    for spot in spots.values() {
        lines.push(format!(
            "{:<12} {:<10} {:<10} {}",
            spot.id, spot.open_date, spot.reg_date, spot.registered_by
        ));
    }
    lines.join("\n")
}

fn render_json(path: &str, spots: &SpotMap) -> String {
    let listing =
        SpotListing { path: path.to_string(), count: spots.len(), spots: spots.values().collect() };
    serde_json::to_string_pretty(&listing).unwrap_or_else(|error| {
        CommandResult::failure("spots", "serialization", error.to_string(), 1).output
    })
}

#[cfg(test)]
mod tests {
    use slashspot_core::{Spot, SpotMap};

    use super::{render_json, render_table};

    fn spots() -> SpotMap {
        [("B2", "2024-03-16", "bob"), ("B1", "2024-03-15", "alice")]
            .into_iter()
            .map(|(id, open_date, user)| {
                let spot = Spot {
                    id: id.to_string(),
                    open_date: open_date.to_string(),
                    reg_date: "2024-03-14".to_string(),
                    registered_by: user.to_string(),
                };
                (spot.key(), spot)
            })
            .collect()
    }

    #[test]
    fn table_lists_spots_in_key_order() {
        let output = render_table("data/spots.json", &spots());
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "2 registration(s) in `data/spots.json`:");
        assert!(lines[2].starts_with("B1 "));
        assert!(lines[3].starts_with("B2 "));
        assert!(lines[3].ends_with("bob"));
    }

    #[test]
    fn empty_store_says_so() {
        assert_eq!(render_table("x.json", &SpotMap::new()), "no registrations in `x.json`");
    }

    #[test]
    fn json_uses_store_field_names() {
        let value: serde_json::Value =
            serde_json::from_str(&render_json("x.json", &spots())).expect("json");

        assert_eq!(value["count"], 2);
        assert_eq!(value["spots"][0]["ID"], "B1");
        assert_eq!(value["spots"][1]["RegisteredBy"], "bob");
    }
}
