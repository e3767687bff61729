use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://www.speedrun.com/api/v1";
pub const GAMES_PAGE_SIZE: usize = 10;
pub const LEADERBOARD_TOP: usize = 10;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub fn api_base() -> String {
    env::var("SPEEDRUN_API_BASE")
        .ok()
        .map(|val| val.trim().trim_end_matches('/').to_string())
        .filter(|val| !val.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
}

pub fn request_timeout() -> Duration {
    let secs = env::var("SPEEDRUN_TIMEOUT_SECS")
        .ok()
        .and_then(|val| val.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS)
        .clamp(2, 60);
    Duration::from_secs(secs)
}

pub fn user_agent() -> String {
    env::var("SPEEDRUN_USER_AGENT")
        .ok()
        .filter(|val| !val.trim().is_empty())
        .unwrap_or_else(|| format!("speedrun_terminal/{}", env!("CARGO_PKG_VERSION")))
}
