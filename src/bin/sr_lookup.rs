use anyhow::{anyhow, bail, Result};

use speedrun_terminal::provider::{run_command, SpeedrunCatalog};
use speedrun_terminal::state::{apply_delta, AppState, ProviderCommand};
use speedrun_terminal::time_format::format_time;

// Drives the same state machine as the terminal UI, one lookup at a time.
fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let mut args = std::env::args().skip(1);
    let Some(game_query) = args.next() else {
        bail!("usage: sr_lookup <game query> [category name]");
    };
    let category_name = args.next();

    let catalog = SpeedrunCatalog;
    let mut state = AppState::new();

    let cmd = state
        .submit_search_text(&game_query)
        .ok_or_else(|| anyhow!("game query is empty"))?;
    settle(&mut state, &catalog, cmd)?;

    let game = state
        .games()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("no games found for \"{game_query}\""))?;
    println!("Game: {} ({})", game.display_name, game.id);

    if let Some(cmd) = state.select_game(&game) {
        settle(&mut state, &catalog, cmd)?;
    }

    let category = match category_name.as_deref() {
        Some(name) => state
            .categories()
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
            .cloned()
            .ok_or_else(|| anyhow!("no full-game category named \"{name}\""))?,
        None => state
            .categories()
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("{} has no full-game categories", game.display_name))?,
    };
    println!("Category: {}", category.name);

    if let Some(cmd) = state.select_category(&category) {
        settle(&mut state, &catalog, cmd)?;
    }

    if state.leaderboard_rows().is_empty() {
        println!("No runs recorded");
        return Ok(());
    }
    for (idx, row) in state.leaderboard_rows().iter().enumerate() {
        println!(
            "{:>3}. {:<24} {:>12}  {:<10}  {}",
            idx + 1,
            row.runner_name,
            format_time(row.seconds),
            row.date,
            row.video_link
        );
    }

    if let Some(series) = state.chart_series() {
        println!();
        for point in series {
            println!("{:<28} {:.3}", point.label, point.value);
        }
    }

    Ok(())
}

fn settle(state: &mut AppState, catalog: &SpeedrunCatalog, cmd: ProviderCommand) -> Result<()> {
    let delta = run_command(catalog, cmd);
    apply_delta(state, delta);
    if let Some(msg) = state.error_message() {
        bail!(msg);
    }
    Ok(())
}
