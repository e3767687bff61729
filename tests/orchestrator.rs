use speedrun_terminal::error::{LookupError, Stage};
use speedrun_terminal::state::{
    AppState, Category, CategoryScope, Delta, Game, LeaderboardPayload, ParticipantRef,
    ProviderCommand, RawRunEntry, SearchPhase, Selection, apply_delta,
};

fn game(id: &str) -> Game {
    Game {
        id: id.to_string(),
        display_name: format!("Game {id}"),
        release_date: None,
    }
}

fn category(id: &str, scope: CategoryScope) -> Category {
    Category {
        id: id.to_string(),
        name: format!("Category {id}"),
        scope,
    }
}

fn guest_run(name: &str, seconds: Option<f64>) -> RawRunEntry {
    RawRunEntry {
        participants: vec![ParticipantRef::Guest {
            name: Some(name.to_string()),
        }],
        duration_seconds: seconds,
        ..RawRunEntry::default()
    }
}

fn payload(runs: Vec<RawRunEntry>) -> LeaderboardPayload {
    LeaderboardPayload {
        runs,
        ..LeaderboardPayload::default()
    }
}

fn search(state: &mut AppState, text: &str, games: Vec<Game>) {
    let cmd = state.submit_search_text(text).expect("search should be issued");
    apply_delta(
        state,
        Delta::GamesLoaded {
            ticket: cmd.ticket(),
            games,
        },
    );
}

fn pick_game(state: &mut AppState, game: &Game, categories: Vec<Category>) -> u64 {
    let cmd = state.select_game(game).expect("categories lookup");
    let ticket = cmd.ticket();
    apply_delta(state, Delta::CategoriesLoaded { ticket, categories });
    ticket
}

fn pick_category(state: &mut AppState, category: &Category) -> ProviderCommand {
    state
        .select_category(category)
        .expect("leaderboard lookup should be issued")
}

#[test]
fn blank_queries_do_nothing() {
    let mut state = AppState::new();
    search(&mut state, "mario", vec![game("g1")]);
    let before_games = state.games().to_vec();

    for blank in ["", "   ", "\t\n"] {
        assert!(state.submit_search_text(blank).is_none());
    }
    assert_eq!(state.games(), before_games.as_slice());
    assert_eq!(state.search_phase(), SearchPhase::Resolved);
    assert!(state.error().is_none());
}

#[test]
fn search_issues_trimmed_query() {
    let mut state = AppState::new();
    state.query = "  zelda  ".to_string();
    let cmd = state.submit_search().expect("search issued");
    match cmd {
        ProviderCommand::FetchGames { query, .. } => assert_eq!(query.as_str(), "zelda"),
        other => panic!("unexpected command {other:?}"),
    }
    assert_eq!(state.search_phase(), SearchPhase::InFlight);
    assert!(state.is_searching());
}

#[test]
fn empty_search_result_still_counts_as_searched() {
    let mut state = AppState::new();
    assert_eq!(state.search_phase(), SearchPhase::Idle);
    assert!(!state.has_searched());

    search(&mut state, "nothing matches", Vec::new());
    assert!(state.has_searched());
    assert!(!state.is_searching());
    assert_eq!(state.search_phase(), SearchPhase::Resolved);
    assert!(state.no_results());
}

#[test]
fn new_search_clears_everything_downstream() {
    let mut state = AppState::new();
    search(&mut state, "mario", vec![game("g1")]);
    let any = category("c1", CategoryScope::PerGame);
    pick_game(&mut state, &game("g1"), vec![any.clone()]);
    let cmd = pick_category(&mut state, &any);
    apply_delta(
        &mut state,
        Delta::LeaderboardLoaded {
            ticket: cmd.ticket(),
            payload: payload(vec![guest_run("A", Some(1.0))]),
        },
    );
    assert_eq!(state.leaderboard_rows().len(), 1);

    state.submit_search_text("zelda").expect("search issued");
    assert!(state.games().is_empty());
    assert_eq!(state.selection(), &Selection::None);
    assert!(state.categories().is_empty());
    assert!(state.leaderboard_rows().is_empty());
    assert!(!state.leaderboard_loading());
}

#[test]
fn search_failure_settles_loading_and_records_error() {
    let mut state = AppState::new();
    let cmd = state.submit_search_text("mario").expect("search issued");
    apply_delta(
        &mut state,
        Delta::LookupFailed {
            ticket: cmd.ticket(),
            stage: Stage::Search,
            error: LookupError::from_status(420, ""),
        },
    );
    assert!(!state.is_searching());
    assert!(state.games().is_empty());
    assert!(!state.no_results());
    assert_eq!(
        state.error_message().as_deref(),
        Some("Failed to fetch games: Too many requests - please wait a moment before trying again.")
    );

    // Retrying clears the error as soon as the lookup is issued.
    state.submit_search_text("mario").expect("retry issued");
    assert!(state.error().is_none());
}

#[test]
fn selecting_same_game_twice_deselects() {
    let mut state = AppState::new();
    let g1 = game("g1");
    search(&mut state, "mario", vec![g1.clone()]);
    let any = category("c1", CategoryScope::PerGame);
    pick_game(&mut state, &g1, vec![any.clone()]);
    pick_category(&mut state, &any);
    assert!(state.leaderboard_loading());

    assert!(state.select_game(&g1).is_none());
    assert_eq!(state.selection(), &Selection::None);
    assert!(state.categories().is_empty());
    assert!(!state.categories_loading());
    assert!(state.leaderboard_rows().is_empty());
    assert!(!state.leaderboard_loading());
}

#[test]
fn category_loading_flag_tracks_outstanding_lookup() {
    let mut state = AppState::new();
    let g1 = game("g1");
    search(&mut state, "mario", vec![g1.clone()]);

    let cmd = state.select_game(&g1).expect("categories lookup");
    assert!(state.categories_loading());
    assert_eq!(state.selected_game(), Some(&g1));

    apply_delta(
        &mut state,
        Delta::LookupFailed {
            ticket: cmd.ticket(),
            stage: Stage::Categories,
            error: LookupError::from_status(500, "Internal Server Error"),
        },
    );
    assert!(!state.categories_loading());
    assert!(state.categories().is_empty());
    assert_eq!(
        state.error_message().as_deref(),
        Some("Failed to fetch categories: Request failed with status 500 Internal Server Error")
    );
}

#[test]
fn per_level_categories_are_never_offered() {
    let mut state = AppState::new();
    let g1 = game("g1");
    search(&mut state, "mario", vec![g1.clone()]);
    pick_game(
        &mut state,
        &g1,
        vec![
            category("lvl1", CategoryScope::PerLevel),
            category("full", CategoryScope::PerGame),
            category("lvl2", CategoryScope::PerLevel),
            category("low", CategoryScope::PerGame),
        ],
    );
    let ids: Vec<&str> = state.categories().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["full", "low"]);

    let hidden = category("lvl1", CategoryScope::PerLevel);
    assert!(state.select_category(&hidden).is_none());
    assert!(state.selected_category().is_none());
}

#[test]
fn category_requires_selected_game() {
    let mut state = AppState::new();
    search(&mut state, "mario", vec![game("g1")]);
    let any = category("c1", CategoryScope::PerGame);
    assert!(state.select_category(&any).is_none());
    assert_eq!(state.selection(), &Selection::None);
}

#[test]
fn switching_games_drops_old_category_immediately() {
    let mut state = AppState::new();
    let (g1, g2) = (game("g1"), game("g2"));
    search(&mut state, "mario", vec![g1.clone(), g2.clone()]);
    let any = category("c1", CategoryScope::PerGame);
    pick_game(&mut state, &g1, vec![any.clone()]);
    let cmd = pick_category(&mut state, &any);
    apply_delta(
        &mut state,
        Delta::LeaderboardLoaded {
            ticket: cmd.ticket(),
            payload: payload(vec![guest_run("A", Some(10.0)), guest_run("B", Some(9.0))]),
        },
    );
    assert_eq!(state.leaderboard_rows().len(), 2);

    state.select_game(&g2).expect("categories lookup");
    assert_eq!(state.selection(), &Selection::Game(g2.clone()));
    assert!(state.selected_category().is_none());
    assert!(state.leaderboard_rows().is_empty());
    assert!(state.categories().is_empty());

    // The category of the previous game is not offered under the new one.
    assert!(state.select_category(&any).is_none());
}

#[test]
fn stale_leaderboard_response_never_populates_rows() {
    let mut state = AppState::new();
    let g1 = game("g1");
    search(&mut state, "mario", vec![g1.clone()]);
    let (c1, c2) = (
        category("c1", CategoryScope::PerGame),
        category("c2", CategoryScope::PerGame),
    );
    pick_game(&mut state, &g1, vec![c1.clone(), c2.clone()]);

    let first = pick_category(&mut state, &c1);
    let second = pick_category(&mut state, &c2);
    assert_ne!(first.ticket(), second.ticket());

    apply_delta(
        &mut state,
        Delta::LeaderboardLoaded {
            ticket: first.ticket(),
            payload: payload(vec![guest_run("Stale", Some(1.0))]),
        },
    );
    assert!(state.leaderboard_rows().is_empty());
    assert!(state.leaderboard_loading());

    apply_delta(
        &mut state,
        Delta::LeaderboardLoaded {
            ticket: second.ticket(),
            payload: payload(vec![guest_run("Fresh", Some(2.0))]),
        },
    );
    assert!(!state.leaderboard_loading());
    let names: Vec<&str> = state
        .leaderboard_rows()
        .iter()
        .map(|r| r.runner_name.as_str())
        .collect();
    assert_eq!(names, ["Fresh"]);
}

#[test]
fn stale_categories_response_is_ignored_after_game_switch() {
    let mut state = AppState::new();
    let (g1, g2) = (game("g1"), game("g2"));
    search(&mut state, "mario", vec![g1.clone(), g2.clone()]);

    let old = state.select_game(&g1).expect("categories lookup");
    let new = state.select_game(&g2).expect("categories lookup");
    apply_delta(
        &mut state,
        Delta::CategoriesLoaded {
            ticket: old.ticket(),
            categories: vec![category("g1-any", CategoryScope::PerGame)],
        },
    );
    assert!(state.categories().is_empty());
    assert!(state.categories_loading());

    apply_delta(
        &mut state,
        Delta::CategoriesLoaded {
            ticket: new.ticket(),
            categories: vec![category("g2-any", CategoryScope::PerGame)],
        },
    );
    assert_eq!(state.categories()[0].id, "g2-any");
}

#[test]
fn stale_games_response_is_ignored_after_new_search() {
    let mut state = AppState::new();
    let old = state.submit_search_text("mario").expect("search issued");
    let new = state.submit_search_text("zelda").expect("search issued");
    apply_delta(
        &mut state,
        Delta::GamesLoaded {
            ticket: old.ticket(),
            games: vec![game("mario")],
        },
    );
    assert!(state.games().is_empty());
    assert!(state.is_searching());

    apply_delta(
        &mut state,
        Delta::GamesLoaded {
            ticket: new.ticket(),
            games: vec![game("zelda")],
        },
    );
    assert_eq!(state.games()[0].id, "zelda");
}

#[test]
fn stale_failure_does_not_overwrite_error_slot() {
    let mut state = AppState::new();
    let g1 = game("g1");
    search(&mut state, "mario", vec![g1.clone()]);
    let (c1, c2) = (
        category("c1", CategoryScope::PerGame),
        category("c2", CategoryScope::PerGame),
    );
    pick_game(&mut state, &g1, vec![c1.clone(), c2.clone()]);
    let first = pick_category(&mut state, &c1);
    pick_category(&mut state, &c2);

    apply_delta(
        &mut state,
        Delta::LookupFailed {
            ticket: first.ticket(),
            stage: Stage::Leaderboard,
            error: LookupError::Unexpected("timed out".to_string()),
        },
    );
    assert!(state.error().is_none());
    assert!(state.leaderboard_loading());
}

#[test]
fn returning_to_a_pair_fetches_again() {
    let mut state = AppState::new();
    let g1 = game("g1");
    search(&mut state, "mario", vec![g1.clone()]);
    let (c1, c2) = (
        category("c1", CategoryScope::PerGame),
        category("c2", CategoryScope::PerGame),
    );
    pick_game(&mut state, &g1, vec![c1.clone(), c2.clone()]);

    let first = pick_category(&mut state, &c1);
    // Same pair again is not a change.
    assert!(state.select_category(&c1).is_none());
    assert!(state.leaderboard_loading());

    pick_category(&mut state, &c2);
    let again = pick_category(&mut state, &c1);
    match again {
        ProviderCommand::FetchLeaderboard {
            ticket,
            game_id,
            category_id,
        } => {
            assert_ne!(ticket, first.ticket());
            assert_eq!(game_id, "g1");
            assert_eq!(category_id, "c1");
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn leaderboard_rows_are_ranked_and_charted() {
    let mut state = AppState::new();
    let g1 = game("g1");
    search(&mut state, "mario", vec![g1.clone()]);
    let any = category("c1", CategoryScope::PerGame);
    pick_game(&mut state, &g1, vec![any.clone()]);
    let cmd = pick_category(&mut state, &any);

    let mut runs = vec![
        guest_run("A", Some(125.0)),
        guest_run("B", Some(125.0)),
        guest_run("C", None),
    ];
    runs[0].rank = Some(1);
    runs[1].rank = Some(2);
    runs[2].rank = Some(5);
    apply_delta(
        &mut state,
        Delta::LeaderboardLoaded {
            ticket: cmd.ticket(),
            payload: payload(runs),
        },
    );

    let names: Vec<&str> = state
        .leaderboard_rows()
        .iter()
        .map(|r| r.runner_name.as_str())
        .collect();
    assert_eq!(names, ["A", "B", "C"]);
    let labels: Vec<String> = state
        .chart_series()
        .expect("three rows chart")
        .into_iter()
        .map(|p| p.label)
        .collect();
    assert_eq!(labels, ["1. A", "2. B", "3. C"]);
}

#[test]
fn leaderboard_failure_keeps_selection_and_allows_retry() {
    let mut state = AppState::new();
    let g1 = game("g1");
    search(&mut state, "mario", vec![g1.clone()]);
    let (c1, c2) = (
        category("c1", CategoryScope::PerGame),
        category("c2", CategoryScope::PerGame),
    );
    pick_game(&mut state, &g1, vec![c1.clone(), c2.clone()]);
    let cmd = pick_category(&mut state, &c1);
    apply_delta(
        &mut state,
        Delta::LookupFailed {
            ticket: cmd.ticket(),
            stage: Stage::Leaderboard,
            error: LookupError::RateLimited,
        },
    );
    assert!(!state.leaderboard_loading());
    assert_eq!(state.selected_category(), Some(&c1));
    assert!(state.error().is_some());

    pick_category(&mut state, &c2);
    assert!(state.error().is_none());
}

#[test]
fn failed_leaderboard_can_be_retried_with_same_category() {
    let mut state = AppState::new();
    let g1 = game("g1");
    search(&mut state, "mario", vec![g1.clone()]);
    let c1 = category("c1", CategoryScope::PerGame);
    pick_game(&mut state, &g1, vec![c1.clone()]);

    let cmd = pick_category(&mut state, &c1);
    apply_delta(
        &mut state,
        Delta::LookupFailed {
            ticket: cmd.ticket(),
            stage: Stage::Leaderboard,
            error: LookupError::RateLimited,
        },
    );
    assert!(state.error().is_some());

    let retry = pick_category(&mut state, &c1);
    assert!(matches!(retry, ProviderCommand::FetchLeaderboard { .. }));
    assert!(state.leaderboard_loading());
    assert!(state.error().is_none());

    apply_delta(
        &mut state,
        Delta::LeaderboardLoaded {
            ticket: retry.ticket(),
            payload: payload(vec![guest_run("A", Some(10.0))]),
        },
    );
    assert_eq!(state.leaderboard_rows().len(), 1);
    // A successful board is not refetched on reselect.
    assert!(state.select_category(&c1).is_none());
}

#[test]
fn activate_walks_the_panes() {
    let mut state = AppState::new();
    state.query = "mario".to_string();
    let cmd = state.activate().expect("search issued");
    apply_delta(
        &mut state,
        Delta::GamesLoaded {
            ticket: cmd.ticket(),
            games: vec![game("g1"), game("g2")],
        },
    );

    state.select_next();
    let cmd = state.activate().expect("categories lookup");
    match &cmd {
        ProviderCommand::FetchCategories { game_id, .. } => assert_eq!(game_id, "g2"),
        other => panic!("unexpected command {other:?}"),
    }
    apply_delta(
        &mut state,
        Delta::CategoriesLoaded {
            ticket: cmd.ticket(),
            categories: vec![category("c1", CategoryScope::PerGame)],
        },
    );

    let cmd = state.activate().expect("leaderboard lookup");
    assert!(matches!(cmd, ProviderCommand::FetchLeaderboard { .. }));
    assert_eq!(
        state.selected_category().map(|c| c.id.as_str()),
        Some("c1")
    );
}

#[test]
fn stale_and_failed_lookups_are_logged() {
    let mut state = AppState::new();
    let first = state.submit_search_text("zelda").expect("search issued");
    search(&mut state, "mario", vec![game("g1")]);
    apply_delta(
        &mut state,
        Delta::GamesLoaded {
            ticket: first.ticket(),
            games: vec![game("stale")],
        },
    );
    assert!(
        state
            .logs
            .back()
            .is_some_and(|line| line == "[INFO] Dropped stale games response")
    );

    let g1 = game("g1");
    let cmd = state.select_game(&g1).expect("categories lookup");
    apply_delta(
        &mut state,
        Delta::LookupFailed {
            ticket: cmd.ticket(),
            stage: Stage::Categories,
            error: LookupError::from_status(500, "Internal Server Error"),
        },
    );
    let last = state.logs.back().expect("failure logged");
    assert!(last.starts_with("[WARN] Failed to fetch categories: Request failed with status 500"));
}

#[test]
fn log_ring_keeps_latest_entries() {
    let mut state = AppState::new();
    for idx in 0..250 {
        state.push_log(format!("line {idx}"));
    }
    assert_eq!(state.logs.len(), 200);
    assert_eq!(state.logs.front().map(String::as_str), Some("line 50"));
    assert_eq!(state.logs.back().map(String::as_str), Some("line 249"));
}
