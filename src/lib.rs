pub mod chart;
pub mod config;
pub mod error;
pub mod http_client;
pub mod leaderboard;
pub mod participants;
pub mod provider;
pub mod speedrun_fetch;
pub mod state;
pub mod time_format;
