use crate::state::LeaderboardRow;

pub const MIN_CHART_ROWS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// Labels carry the recomputed position so repeat runners stay distinct on the axis.
pub fn chart_series(ranked: &[LeaderboardRow]) -> Option<Vec<ChartPoint>> {
    if ranked.len() < MIN_CHART_ROWS {
        return None;
    }
    let points = ranked
        .iter()
        .enumerate()
        .map(|(idx, row)| ChartPoint {
            label: format!("{}. {}", idx + 1, row.runner_name),
            value: row.seconds.unwrap_or(0.0),
        })
        .collect();
    Some(points)
}
