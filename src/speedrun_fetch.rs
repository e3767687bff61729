use anyhow::{Context, Result};
use chrono::DateTime;
use serde::Deserialize;

use crate::config::{self, GAMES_PAGE_SIZE, LEADERBOARD_TOP};
use crate::error::LookupError;
use crate::http_client::http_client;
use crate::state::{
    Category, CategoryScope, EmbeddedParticipant, EmbeddedParticipants, Game, LeaderboardPayload,
    ParticipantRef, Query, RawRunEntry,
};

pub fn fetch_games(query: &Query) -> Result<Vec<Game>, LookupError> {
    let url = format!("{}/games", config::api_base());
    let params = [
        ("name", query.as_str().to_string()),
        ("max", GAMES_PAGE_SIZE.to_string()),
    ];
    let body = get_body(&url, &params)?;
    parse_games_json(&body).map_err(|err| LookupError::unexpected(&err))
}

/// Returns every category of the game, per-level ones included.
pub fn fetch_categories(game_id: &str) -> Result<Vec<Category>, LookupError> {
    let url = format!("{}/games/{}/categories", config::api_base(), game_id);
    let body = get_body(&url, &[])?;
    parse_categories_json(&body).map_err(|err| LookupError::unexpected(&err))
}

pub fn fetch_leaderboard(
    game_id: &str,
    category_id: &str,
) -> Result<LeaderboardPayload, LookupError> {
    let url = format!(
        "{}/leaderboards/{}/category/{}",
        config::api_base(),
        game_id,
        category_id
    );
    let params = [
        ("top", LEADERBOARD_TOP.to_string()),
        ("embed", "players".to_string()),
    ];
    let body = get_body(&url, &params)?;
    parse_leaderboard_json(&body).map_err(|err| LookupError::unexpected(&err))
}

fn get_body(url: &str, params: &[(&str, String)]) -> Result<String, LookupError> {
    let client = http_client().map_err(|err| LookupError::unexpected(&err))?;
    let resp = client
        .get(url)
        .query(params)
        .send()
        .context("request failed")
        .map_err(|err| LookupError::unexpected(&err))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(LookupError::from_status(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
        ));
    }
    resp.text()
        .context("failed reading body")
        .map_err(|err| LookupError::unexpected(&err))
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct WireGame {
    id: Option<String>,
    names: Option<WireNames>,
    released: Option<i64>,
    #[serde(rename = "release-date")]
    release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireNames {
    international: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireCategory {
    id: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireLeaderboard {
    runs: Option<Vec<WirePlacedRun>>,
    players: Option<Envelope<Vec<WireEmbeddedPlayer>>>,
}

#[derive(Debug, Deserialize)]
struct WirePlacedRun {
    place: Option<u32>,
    run: Option<WireRun>,
}

#[derive(Debug, Deserialize)]
struct WireRun {
    players: Option<Vec<WirePlayerRef>>,
    times: Option<WireTimes>,
    date: Option<String>,
    submitted: Option<String>,
    videos: Option<WireVideos>,
    weblink: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePlayerRef {
    rel: Option<String>,
    id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireTimes {
    primary_t: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireVideos {
    links: Option<Vec<WireLink>>,
}

#[derive(Debug, Deserialize)]
struct WireLink {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireEmbeddedPlayer {
    id: Option<String>,
    names: Option<WireNames>,
    name: Option<String>,
}

pub fn parse_games_json(raw: &str) -> Result<Vec<Game>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let envelope: Envelope<Vec<WireGame>> =
        serde_json::from_str(trimmed).context("invalid games json")?;

    let games = envelope
        .data
        .unwrap_or_default()
        .into_iter()
        .filter_map(|game| {
            let id = game.id.and_then(non_empty)?;
            let display_name = game
                .names
                .and_then(|n| n.international)
                .and_then(non_empty)
                .unwrap_or_else(|| id.clone());
            let release_date = game
                .release_date
                .and_then(non_empty)
                .or_else(|| game.released.map(|year| year.to_string()));
            Some(Game {
                id,
                display_name,
                release_date,
            })
        })
        .collect();
    Ok(games)
}

pub fn parse_categories_json(raw: &str) -> Result<Vec<Category>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let envelope: Envelope<Vec<WireCategory>> =
        serde_json::from_str(trimmed).context("invalid categories json")?;

    let categories = envelope
        .data
        .unwrap_or_default()
        .into_iter()
        .filter_map(|category| {
            let id = category.id.and_then(non_empty)?;
            let scope = CategoryScope::parse(category.kind.as_deref()?)?;
            let name = category
                .name
                .and_then(non_empty)
                .unwrap_or_else(|| id.clone());
            Some(Category { id, name, scope })
        })
        .collect();
    Ok(categories)
}

pub fn parse_leaderboard_json(raw: &str) -> Result<LeaderboardPayload> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(LeaderboardPayload::default());
    }
    let envelope: Envelope<WireLeaderboard> =
        serde_json::from_str(trimmed).context("invalid leaderboard json")?;
    let Some(board) = envelope.data else {
        return Ok(LeaderboardPayload::default());
    };

    let runs = board
        .runs
        .unwrap_or_default()
        .into_iter()
        .map(build_run_entry)
        .collect();

    let mut participants = EmbeddedParticipants::new();
    let embedded = board.players.and_then(|p| p.data).unwrap_or_default();
    for player in embedded {
        let Some(id) = player.id.and_then(non_empty) else {
            continue;
        };
        participants.insert(
            id,
            EmbeddedParticipant {
                international: player.names.and_then(|n| n.international),
                name: player.name,
            },
        );
    }

    Ok(LeaderboardPayload { runs, participants })
}

fn build_run_entry(placed: WirePlacedRun) -> RawRunEntry {
    let Some(run) = placed.run else {
        return RawRunEntry {
            rank: placed.place,
            ..RawRunEntry::default()
        };
    };

    let participants = run
        .players
        .unwrap_or_default()
        .into_iter()
        .map(parse_participant)
        .collect();
    let video_uri = run
        .videos
        .and_then(|v| v.links)
        .unwrap_or_default()
        .into_iter()
        .find_map(|link| link.uri.and_then(non_empty));
    let recorded_date = run
        .date
        .and_then(non_empty)
        .or_else(|| run.submitted.as_deref().and_then(submitted_day));

    RawRunEntry {
        rank: placed.place,
        participants,
        duration_seconds: run.times.and_then(|t| t.primary_t),
        recorded_date,
        video_uri,
        weblink_uri: run.weblink.and_then(non_empty),
    }
}

fn parse_participant(player: WirePlayerRef) -> ParticipantRef {
    match player.rel.as_deref() {
        Some("guest") => ParticipantRef::Guest { name: player.name },
        Some("user") => ParticipantRef::Registered {
            ref_id: player.id.unwrap_or_default(),
        },
        _ => ParticipantRef::Unrecognized,
    }
}

fn submitted_day(raw: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
