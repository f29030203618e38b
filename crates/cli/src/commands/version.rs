use super::CommandResult;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const UNDEFINED: &str = "undefined";

/// Build metadata injected at compile time through `SLASHSPOT_GIT_HASH` and
/// `SLASHSPOT_BUILD_TIME`.
pub fn git_hash() -> &'static str {
    option_env!("SLASHSPOT_GIT_HASH").unwrap_or(UNDEFINED)
}

pub fn build_time() -> &'static str {
    option_env!("SLASHSPOT_BUILD_TIME").unwrap_or(UNDEFINED)
}

pub fn run() -> CommandResult {
    CommandResult::text(
        0,
        format!("slashspot {VERSION} (git hash: {}, built: {})", git_hash(), build_time()),
    )
}
