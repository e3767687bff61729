use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::error::{LookupError, Stage};
use crate::speedrun_fetch;
use crate::state::{Category, Delta, Game, LeaderboardPayload, ProviderCommand, Query};

/// The three remote lookups the orchestrator depends on.
pub trait Catalog: Send + 'static {
    fn games(&self, query: &Query) -> Result<Vec<Game>, LookupError>;
    fn categories(&self, game_id: &str) -> Result<Vec<Category>, LookupError>;
    fn leaderboard(
        &self,
        game_id: &str,
        category_id: &str,
    ) -> Result<LeaderboardPayload, LookupError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpeedrunCatalog;

impl Catalog for SpeedrunCatalog {
    fn games(&self, query: &Query) -> Result<Vec<Game>, LookupError> {
        speedrun_fetch::fetch_games(query)
    }

    fn categories(&self, game_id: &str) -> Result<Vec<Category>, LookupError> {
        speedrun_fetch::fetch_categories(game_id)
    }

    fn leaderboard(
        &self,
        game_id: &str,
        category_id: &str,
    ) -> Result<LeaderboardPayload, LookupError> {
        speedrun_fetch::fetch_leaderboard(game_id, category_id)
    }
}

/// Runs lookups off the UI thread. Each lookup yields a `Delta::Log` timing line
/// followed by its result. Exits once the command sender is dropped or the delta
/// receiver goes away.
pub fn spawn_provider<C: Catalog>(
    catalog: C,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            let stage = cmd.stage();
            let started = Instant::now();
            let delta = run_command(&catalog, cmd);
            let _ = tx.send(Delta::Log(format!(
                "[INFO] {} lookup finished in {} ms",
                stage.label(),
                started.elapsed().as_millis()
            )));
            if tx.send(delta).is_err() {
                break;
            }
        }
    })
}

pub fn run_command<C: Catalog + ?Sized>(catalog: &C, cmd: ProviderCommand) -> Delta {
    match cmd {
        ProviderCommand::FetchGames { ticket, query } => match catalog.games(&query) {
            Ok(games) => Delta::GamesLoaded { ticket, games },
            Err(error) => Delta::LookupFailed {
                ticket,
                stage: Stage::Search,
                error,
            },
        },
        ProviderCommand::FetchCategories { ticket, game_id } => {
            match catalog.categories(&game_id) {
                Ok(categories) => Delta::CategoriesLoaded { ticket, categories },
                Err(error) => Delta::LookupFailed {
                    ticket,
                    stage: Stage::Categories,
                    error,
                },
            }
        }
        ProviderCommand::FetchLeaderboard {
            ticket,
            game_id,
            category_id,
        } => match catalog.leaderboard(&game_id, &category_id) {
            Ok(payload) => Delta::LeaderboardLoaded { ticket, payload },
            Err(error) => Delta::LookupFailed {
                ticket,
                stage: Stage::Leaderboard,
                error,
            },
        },
    }
}
