use std::cmp::Ordering;

use crate::participants;
use crate::state::{EmbeddedParticipants, LeaderboardPayload, LeaderboardRow, RawRunEntry};

pub const NO_DATE: &str = "n/a";

/// Maps raw runs to display rows, one row per run in arrival order. Co-runners
/// beyond the first participant are not surfaced.
pub fn normalize_runs(runs: &[RawRunEntry], table: &EmbeddedParticipants) -> Vec<LeaderboardRow> {
    runs.iter().map(|run| normalize_run(run, table)).collect()
}

fn normalize_run(run: &RawRunEntry, table: &EmbeddedParticipants) -> LeaderboardRow {
    let runner_name = participants::resolve(run.participants.first(), table);
    let video_link = run
        .video_uri
        .as_deref()
        .and_then(non_empty)
        .or_else(|| run.weblink_uri.as_deref().and_then(non_empty))
        .unwrap_or_default()
        .to_string();
    let date = run
        .recorded_date
        .as_deref()
        .and_then(non_empty)
        .unwrap_or(NO_DATE)
        .to_string();

    LeaderboardRow {
        runner_name,
        seconds: run.duration_seconds.filter(|s| s.is_finite()),
        date,
        video_link,
        server_rank: run.rank,
    }
}

/// Stable ascending sort by time; rows without a time keep their arrival order
/// after every timed row. Server ranks are ignored since they misplace repeat
/// runners.
pub fn rank_rows(rows: &[LeaderboardRow]) -> Vec<LeaderboardRow> {
    let mut ranked = rows.to_vec();
    ranked.sort_by(|a, b| compare_times(a.seconds, b.seconds));
    ranked
}

pub fn build_leaderboard(payload: &LeaderboardPayload) -> Vec<LeaderboardRow> {
    rank_rows(&normalize_runs(&payload.runs, &payload.participants))
}

fn compare_times(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
