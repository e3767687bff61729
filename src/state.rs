use std::collections::{HashMap, VecDeque};

use crate::chart::{self, ChartPoint};
use crate::error::{LookupError, Stage, StageError};
use crate::leaderboard;

const MAX_LOGS: usize = 200;

/// Trimmed, non-empty search text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    pub fn parse(raw: &str) -> Result<Self, LookupError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LookupError::InvalidInput);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub id: String,
    pub display_name: String,
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryScope {
    PerGame,
    PerLevel,
}

impl CategoryScope {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "per-game" => Some(CategoryScope::PerGame),
            "per-level" => Some(CategoryScope::PerLevel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub scope: CategoryScope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantRef {
    Guest { name: Option<String> },
    Registered { ref_id: String },
    /// Any other `rel`. Kept so participant order is preserved.
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmbeddedParticipant {
    pub international: Option<String>,
    pub name: Option<String>,
}

pub type EmbeddedParticipants = HashMap<String, EmbeddedParticipant>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRunEntry {
    /// Server-side place. Informational only.
    pub rank: Option<u32>,
    pub participants: Vec<ParticipantRef>,
    pub duration_seconds: Option<f64>,
    pub recorded_date: Option<String>,
    pub video_uri: Option<String>,
    pub weblink_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LeaderboardPayload {
    pub runs: Vec<RawRunEntry>,
    pub participants: EmbeddedParticipants,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRow {
    pub runner_name: String,
    pub seconds: Option<f64>,
    pub date: String,
    pub video_link: String,
    pub server_rank: Option<u32>,
}

/// A category only ever exists alongside the game it was fetched for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Game(Game),
    GameCategory { game: Game, category: Category },
}

impl Selection {
    pub fn game(&self) -> Option<&Game> {
        match self {
            Selection::None => None,
            Selection::Game(game) | Selection::GameCategory { game, .. } => Some(game),
        }
    }

    pub fn category(&self) -> Option<&Category> {
        match self {
            Selection::GameCategory { category, .. } => Some(category),
            _ => None,
        }
    }

    fn pair_key(&self) -> Option<(String, String)> {
        match self {
            Selection::GameCategory { game, category } => {
                Some((game.id.clone(), category.id.clone()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    InFlight,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Search,
    Games,
    Categories,
    Leaderboard,
}

/// Ticket of the outstanding lookup per stage. `None` means nothing is in
/// flight, or the last request was superseded.
#[derive(Debug, Clone, Copy, Default)]
struct Pending {
    search: Option<u64>,
    categories: Option<u64>,
    leaderboard: Option<u64>,
}

impl Pending {
    fn slot(&mut self, stage: Stage) -> &mut Option<u64> {
        match stage {
            Stage::Search => &mut self.search,
            Stage::Categories => &mut self.categories,
            Stage::Leaderboard => &mut self.leaderboard,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub focus: Focus,
    pub query: String,
    pub game_cursor: usize,
    pub category_cursor: usize,
    pub leaderboard_scroll: usize,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    has_searched: bool,
    games: Vec<Game>,
    selection: Selection,
    categories: Vec<Category>,
    leaderboard: Vec<LeaderboardRow>,
    leaderboard_pair: Option<(String, String)>,
    error: Option<StageError>,
    pending: Pending,
    next_ticket: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            focus: Focus::Search,
            query: String::new(),
            game_cursor: 0,
            category_cursor: 0,
            leaderboard_scroll: 0,
            logs: VecDeque::with_capacity(MAX_LOGS),
            help_overlay: false,
            has_searched: false,
            games: Vec::new(),
            selection: Selection::None,
            categories: Vec::new(),
            leaderboard: Vec::new(),
            leaderboard_pair: None,
            error: None,
            pending: Pending::default(),
            next_ticket: 1,
        }
    }

    pub fn search_phase(&self) -> SearchPhase {
        if self.pending.search.is_some() {
            SearchPhase::InFlight
        } else if self.has_searched {
            SearchPhase::Resolved
        } else {
            SearchPhase::Idle
        }
    }

    pub fn is_searching(&self) -> bool {
        self.pending.search.is_some()
    }

    pub fn has_searched(&self) -> bool {
        self.has_searched
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_game(&self) -> Option<&Game> {
        self.selection.game()
    }

    pub fn selected_category(&self) -> Option<&Category> {
        self.selection.category()
    }

    /// Per-game categories of the selected game.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn categories_loading(&self) -> bool {
        self.pending.categories.is_some()
    }

    /// Rows already ranked by time.
    pub fn leaderboard_rows(&self) -> &[LeaderboardRow] {
        &self.leaderboard
    }

    pub fn leaderboard_loading(&self) -> bool {
        self.pending.leaderboard.is_some()
    }

    pub fn chart_series(&self) -> Option<Vec<ChartPoint>> {
        chart::chart_series(&self.leaderboard)
    }

    pub fn error(&self) -> Option<&StageError> {
        self.error.as_ref()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|err| err.to_string())
    }

    pub fn no_results(&self) -> bool {
        self.has_searched && !self.is_searching() && self.error.is_none() && self.games.is_empty()
    }

    pub fn submit_search(&mut self) -> Option<ProviderCommand> {
        let text = self.query.clone();
        self.submit_search_text(&text)
    }

    /// Starts a new games lookup. Blank text leaves every field untouched.
    pub fn submit_search_text(&mut self, text: &str) -> Option<ProviderCommand> {
        let query = Query::parse(text).ok()?;
        self.query = query.as_str().to_string();

        self.games.clear();
        self.game_cursor = 0;
        self.reset_selection();
        let _ = self.sync_leaderboard();

        let ticket = self.issue(Stage::Search);
        self.push_log(format!("[INFO] Searching games for \"{}\"", query.as_str()));
        Some(ProviderCommand::FetchGames { ticket, query })
    }

    /// Picks a game from the current result list. Picking the selected game
    /// again deselects it.
    pub fn select_game(&mut self, game: &Game) -> Option<ProviderCommand> {
        if self.selected_game().is_some_and(|g| g.id == game.id) {
            self.reset_selection();
            let _ = self.sync_leaderboard();
            self.clear_errors_from(Stage::Categories);
            self.push_log(format!("[INFO] Deselected {}", game.display_name));
            return None;
        }
        if !self.games.iter().any(|g| g.id == game.id) {
            self.push_log(format!(
                "[WARN] {} is not in the current results",
                game.display_name
            ));
            return None;
        }

        self.reset_selection();
        self.selection = Selection::Game(game.clone());
        let _ = self.sync_leaderboard();

        let ticket = self.issue(Stage::Categories);
        self.push_log(format!("[INFO] Loading categories for {}", game.display_name));
        Some(ProviderCommand::FetchCategories {
            ticket,
            game_id: game.id.clone(),
        })
    }

    /// Sets the category of the selected game. This is the only path that
    /// leads to a leaderboard lookup.
    pub fn select_category(&mut self, category: &Category) -> Option<ProviderCommand> {
        let Some(game) = self.selected_game().cloned() else {
            self.push_log("[WARN] Pick a game before a category");
            return None;
        };
        if !self.categories.iter().any(|c| c.id == category.id) {
            self.push_log(format!(
                "[WARN] {} is not a category of {}",
                category.name, game.display_name
            ));
            return None;
        }

        self.selection = Selection::GameCategory {
            game,
            category: category.clone(),
        };
        self.sync_leaderboard()
    }

    /// Leaderboard rule, run after every selection change: entering a new
    /// complete pair fetches, losing the pair clears.
    fn sync_leaderboard(&mut self) -> Option<ProviderCommand> {
        let pair = self.selection.pair_key();
        if pair == self.leaderboard_pair {
            return None;
        }
        self.leaderboard_pair = pair.clone();
        self.leaderboard.clear();
        self.leaderboard_scroll = 0;
        self.pending.leaderboard = None;

        let Some((game_id, category_id)) = pair else {
            self.clear_errors_from(Stage::Leaderboard);
            return None;
        };
        let ticket = self.issue(Stage::Leaderboard);
        self.push_log("[INFO] Loading leaderboard");
        Some(ProviderCommand::FetchLeaderboard {
            ticket,
            game_id,
            category_id,
        })
    }

    fn reset_selection(&mut self) {
        self.selection = Selection::None;
        self.categories.clear();
        self.category_cursor = 0;
        self.pending.categories = None;
    }

    fn issue(&mut self, stage: Stage) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        *self.pending.slot(stage) = Some(ticket);
        self.clear_errors_from(stage);
        ticket
    }

    /// Consumes the ticket if it is still the outstanding one for the stage.
    fn complete(&mut self, stage: Stage, ticket: u64) -> bool {
        let slot = self.pending.slot(stage);
        if *slot == Some(ticket) {
            *slot = None;
            true
        } else {
            false
        }
    }

    fn clear_errors_from(&mut self, stage: Stage) {
        if self.error.as_ref().is_some_and(|err| err.stage >= stage) {
            self.error = None;
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn cycle_focus_next(&mut self) {
        self.focus = match self.focus {
            Focus::Search => Focus::Games,
            Focus::Games => Focus::Categories,
            Focus::Categories => Focus::Leaderboard,
            Focus::Leaderboard => Focus::Search,
        };
    }

    pub fn cycle_focus_prev(&mut self) {
        self.focus = match self.focus {
            Focus::Search => Focus::Leaderboard,
            Focus::Games => Focus::Search,
            Focus::Categories => Focus::Games,
            Focus::Leaderboard => Focus::Categories,
        };
    }

    pub fn select_next(&mut self) {
        match self.focus {
            Focus::Search => {}
            Focus::Games => self.game_cursor = step_next(self.game_cursor, self.games.len()),
            Focus::Categories => {
                self.category_cursor = step_next(self.category_cursor, self.categories.len())
            }
            Focus::Leaderboard => {
                let max = self.leaderboard.len().saturating_sub(1);
                self.leaderboard_scroll = (self.leaderboard_scroll + 1).min(max);
            }
        }
    }

    pub fn select_prev(&mut self) {
        match self.focus {
            Focus::Search => {}
            Focus::Games => self.game_cursor = step_prev(self.game_cursor, self.games.len()),
            Focus::Categories => {
                self.category_cursor = step_prev(self.category_cursor, self.categories.len())
            }
            Focus::Leaderboard => {
                self.leaderboard_scroll = self.leaderboard_scroll.saturating_sub(1);
            }
        }
    }

    /// Enter on the focused pane.
    pub fn activate(&mut self) -> Option<ProviderCommand> {
        match self.focus {
            Focus::Search => {
                let cmd = self.submit_search();
                if cmd.is_some() {
                    self.focus = Focus::Games;
                }
                cmd
            }
            Focus::Games => {
                let game = self.games.get(self.game_cursor).cloned()?;
                let cmd = self.select_game(&game);
                if cmd.is_some() {
                    self.focus = Focus::Categories;
                }
                cmd
            }
            Focus::Categories => {
                let category = self.categories.get(self.category_cursor).cloned()?;
                let cmd = self.select_category(&category);
                if cmd.is_some() {
                    self.focus = Focus::Leaderboard;
                }
                cmd
            }
            Focus::Leaderboard => None,
        }
    }
}

fn step_next(current: usize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    (current + 1) % total
}

fn step_prev(current: usize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    if current == 0 { total - 1 } else { current - 1 }
}

pub fn per_game_only(categories: Vec<Category>) -> Vec<Category> {
    categories
        .into_iter()
        .filter(|c| c.scope == CategoryScope::PerGame)
        .collect()
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    FetchGames {
        ticket: u64,
        query: Query,
    },
    FetchCategories {
        ticket: u64,
        game_id: String,
    },
    FetchLeaderboard {
        ticket: u64,
        game_id: String,
        category_id: String,
    },
}

impl ProviderCommand {
    pub fn ticket(&self) -> u64 {
        match self {
            ProviderCommand::FetchGames { ticket, .. }
            | ProviderCommand::FetchCategories { ticket, .. }
            | ProviderCommand::FetchLeaderboard { ticket, .. } => *ticket,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            ProviderCommand::FetchGames { .. } => Stage::Search,
            ProviderCommand::FetchCategories { .. } => Stage::Categories,
            ProviderCommand::FetchLeaderboard { .. } => Stage::Leaderboard,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    GamesLoaded {
        ticket: u64,
        games: Vec<Game>,
    },
    CategoriesLoaded {
        ticket: u64,
        categories: Vec<Category>,
    },
    LeaderboardLoaded {
        ticket: u64,
        payload: LeaderboardPayload,
    },
    LookupFailed {
        ticket: u64,
        stage: Stage,
        error: LookupError,
    },
    Log(String),
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::GamesLoaded { ticket, games } => {
            if !state.complete(Stage::Search, ticket) {
                state.push_log("[INFO] Dropped stale games response");
                return;
            }
            state.has_searched = true;
            state.games = games;
            state.game_cursor = 0;
            state.push_log(format!("[INFO] {} games found", state.games.len()));
        }
        Delta::CategoriesLoaded { ticket, categories } => {
            if !state.complete(Stage::Categories, ticket) {
                state.push_log("[INFO] Dropped stale categories response");
                return;
            }
            let total = categories.len();
            state.categories = per_game_only(categories);
            state.category_cursor = 0;
            state.push_log(format!(
                "[INFO] {} categories ({} per-level hidden)",
                state.categories.len(),
                total - state.categories.len()
            ));
        }
        Delta::LeaderboardLoaded { ticket, payload } => {
            if !state.complete(Stage::Leaderboard, ticket) {
                state.push_log("[INFO] Dropped stale leaderboard response");
                return;
            }
            state.leaderboard = leaderboard::build_leaderboard(&payload);
            state.leaderboard_scroll = 0;
            state.push_log(format!("[INFO] {} runs loaded", state.leaderboard.len()));
        }
        Delta::LookupFailed {
            ticket,
            stage,
            error,
        } => {
            if !state.complete(stage, ticket) {
                state.push_log(format!("[INFO] Dropped stale {} failure", stage.label()));
                return;
            }
            match stage {
                Stage::Search => {
                    state.has_searched = true;
                    state.games.clear();
                    state.game_cursor = 0;
                }
                Stage::Categories => {
                    state.categories.clear();
                    state.category_cursor = 0;
                }
                Stage::Leaderboard => {
                    state.leaderboard.clear();
                    state.leaderboard_scroll = 0;
                    // Picking the same category again must refetch.
                    state.leaderboard_pair = None;
                }
            }
            let err = StageError { stage, error };
            state.push_log(format!("[WARN] {err}"));
            state.error = Some(err);
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
