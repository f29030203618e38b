//! Plain-text replies for `/spot`.

use slashspot_core::Spot;

pub const HELP_TEXT: &str = "*Slash-Spot Help*:
With Slash-Spot you can find, reserve and register parking spots.

*/spot find* or *open* - lists the spots available today
*/spot claim* or *take* or *reserve* `<spot-id>` - claims today's registration for a spot
*/spot reg* or *register* or *set* `<spot-id> [YYYY-MM-DD]` - makes a spot available for today, or for the given date if it is not in the past
*/spot drop* `<spot-id>` - drops a registration you made
*/spot drop all* - drops every registration you made";

pub const IDK_BLANK: &str = "I don't know what you mean, use `/spot help` for some...help.";

pub const NO_SPOTS_AVAILABLE: &str = "There are currently no available registered spots.";

pub const STORAGE_UNAVAILABLE: &str =
    "Spot storage is unavailable right now, please try again in a little while.";

pub fn unknown_verb(verb: &str) -> String {
    format!("I don't know what '{verb}' means, use `/spot help` for some...help.")
}

/// Lists spot ids in ascending order, comma separated.
pub fn open_spots(spots: &[Spot]) -> String {
    let mut ids: Vec<&str> = spots.iter().map(|spot| spot.id.as_str()).collect();
    ids.sort_unstable();
    format!("The following spots are available today: {}", ids.join(","))
}

pub fn claimed(id: &str) -> String {
    format!("You have claimed spot: {id}")
}

pub fn claim_unavailable(id: &str) -> String {
    format!("The spot {id} is not available today or has not been registered as available")
}

pub fn registered(id: &str) -> String {
    format!("You have registered spot {id}. Thank you for sharing")
}

pub fn duplicate_registration(id: &str, holder: &str) -> String {
    format!("The spot {id} has already been registered by {holder}")
}

pub fn bad_date(input: &str) -> String {
    format!("The date provided: {input} is invalid, please use format YYYY-MM-DD")
}

pub fn past_date(input: &str) -> String {
    format!("The date provided: {input} is in the past, please pick today or a later date")
}

pub fn dropped(id: &str) -> String {
    format!("Registration for spot {id} has been dropped")
}

pub fn drop_denied(id: &str) -> String {
    format!(
        "Unable to drop registration {id}. The registration has been claimed or you did not create this registration."
    )
}

pub fn all_dropped(user: &str, count: usize) -> String {
    match count {
        0 => format!("There were no spots registered by {user} to drop"),
        1 => format!("Dropped 1 spot registered by {user}"),
        count => format!("Dropped all {count} spots registered by {user}"),
    }
}
