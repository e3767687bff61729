use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph};

use speedrun_terminal::error::LookupError;
use speedrun_terminal::provider::{spawn_provider, SpeedrunCatalog};
use speedrun_terminal::state::{self, apply_delta, AppState, Focus, SearchPhase};
use speedrun_terminal::time_format::format_time;

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<state::ProviderCommand>>,
}

impl App {
    fn new(cmd_tx: Option<mpsc::Sender<state::ProviderCommand>>) -> Self {
        Self {
            state: AppState::new(),
            should_quit: false,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.state.help_overlay {
            if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc) {
                self.state.help_overlay = false;
            }
            return;
        }

        if self.state.focus == Focus::Search {
            match key.code {
                KeyCode::Enter => {
                    let cmd = self.state.activate();
                    self.dispatch(cmd);
                }
                KeyCode::Backspace => {
                    self.state.query.pop();
                }
                KeyCode::Tab | KeyCode::Down => self.state.cycle_focus_next(),
                KeyCode::BackTab => self.state.cycle_focus_prev(),
                KeyCode::Esc => self.state.query.clear(),
                KeyCode::Char(c) => self.state.query.push(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = true,
            KeyCode::Char('/') => self.state.focus = Focus::Search,
            KeyCode::Tab => self.state.cycle_focus_next(),
            KeyCode::BackTab | KeyCode::Esc | KeyCode::Char('b') => self.state.cycle_focus_prev(),
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Enter => {
                let cmd = self.state.activate();
                self.dispatch(cmd);
            }
            _ => {}
        }
    }

    fn dispatch(&mut self, cmd: Option<state::ProviderCommand>) {
        let Some(cmd) = cmd else {
            return;
        };
        let ticket = cmd.ticket();
        let stage = cmd.stage();
        let sent = self
            .cmd_tx
            .as_ref()
            .is_some_and(|tx| tx.send(cmd).is_ok());
        if !sent {
            // Settle the stage so it does not stay loading forever.
            apply_delta(
                &mut self.state,
                state::Delta::LookupFailed {
                    ticket,
                    stage,
                    error: LookupError::Unexpected("lookup worker unavailable".to_string()),
                },
            );
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let _provider = spawn_provider(SpeedrunCatalog, tx, cmd_rx);

    let mut app = App::new(Some(cmd_tx));
    app.state
        .push_log("[INFO] Type a game name and press Enter to search");
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<state::Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let state = &app.state;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(8),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    render_search(frame, chunks[1], state);
    render_status_line(frame, chunks[2], state);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(chunks[3]);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(columns[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(14)])
        .split(columns[1]);

    let games = Paragraph::new(games_text(state))
        .block(pane_block("Games", state.focus == Focus::Games));
    frame.render_widget(games, left[0]);

    let categories = Paragraph::new(categories_text(state))
        .block(pane_block("Categories", state.focus == Focus::Categories));
    frame.render_widget(categories, left[1]);

    let board = Paragraph::new(leaderboard_text(state))
        .block(pane_block("Leaderboard", state.focus == Focus::Leaderboard))
        .scroll((state.leaderboard_scroll as u16, 0));
    frame.render_widget(board, right[0]);

    render_chart(frame, right[1], state);

    let console = Paragraph::new(console_text(state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[4]);

    let footer = Paragraph::new(footer_text(state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[5]);

    if state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn pane_block(title: &str, focused: bool) -> Block<'_> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(style)
}

fn header_text(state: &AppState) -> String {
    let phase = match state.search_phase() {
        SearchPhase::Idle => "IDLE",
        SearchPhase::InFlight => "SEARCHING",
        SearchPhase::Resolved => "READY",
    };
    let selection = match (state.selected_game(), state.selected_category()) {
        (Some(game), Some(category)) => format!("{} / {}", game.display_name, category.name),
        (Some(game), None) => game.display_name.clone(),
        _ => "no game selected".to_string(),
    };
    format!("  SPEEDRUN RECORDS | {phase} | {selection}")
}

fn render_search(frame: &mut Frame, area: Rect, state: &AppState) {
    let focused = state.focus == Focus::Search;
    let title = if state.is_searching() {
        "Search (searching...)"
    } else {
        "Search"
    };
    let text = if state.query.is_empty() && !focused {
        "Search for a game".to_string()
    } else if focused {
        format!("{}_", state.query)
    } else {
        state.query.clone()
    };
    let style = if state.query.is_empty() && !focused {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    let input = Paragraph::new(text)
        .style(style)
        .block(pane_block(title, focused));
    frame.render_widget(input, area);
}

fn render_status_line(frame: &mut Frame, area: Rect, state: &AppState) {
    let (text, style) = if let Some(msg) = state.error_message() {
        (msg, Style::default().fg(Color::Red))
    } else if state.no_results() {
        (
            "No games found. Try a different search.".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (String::new(), Style::default())
    };
    frame.render_widget(Paragraph::new(text).style(style), area);
}

fn games_text(state: &AppState) -> String {
    if state.is_searching() {
        return "Searching...".to_string();
    }
    if state.games().is_empty() {
        return if state.has_searched() {
            "No games".to_string()
        } else {
            "Nothing searched yet".to_string()
        };
    }

    let selected_id = state.selected_game().map(|g| g.id.as_str());
    state
        .games()
        .iter()
        .enumerate()
        .map(|(idx, game)| {
            let cursor = if state.focus == Focus::Games && idx == state.game_cursor {
                ">"
            } else {
                " "
            };
            let mark = if selected_id == Some(game.id.as_str()) {
                "*"
            } else {
                " "
            };
            let released = game.release_date.as_deref().unwrap_or("n/a");
            format!("{cursor}{mark} {} (Released: {released})", game.display_name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn categories_text(state: &AppState) -> String {
    if state.selected_game().is_none() {
        return "Pick a game".to_string();
    }
    if state.categories_loading() {
        return "Loading categories...".to_string();
    }
    if state.categories().is_empty() {
        return "No full-game categories".to_string();
    }

    let selected_id = state.selected_category().map(|c| c.id.as_str());
    state
        .categories()
        .iter()
        .enumerate()
        .map(|(idx, category)| {
            let cursor = if state.focus == Focus::Categories && idx == state.category_cursor {
                ">"
            } else {
                " "
            };
            let mark = if selected_id == Some(category.id.as_str()) {
                "[x]"
            } else {
                "[ ]"
            };
            format!("{cursor}{mark} {}", category.name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn leaderboard_text(state: &AppState) -> String {
    if state.selected_category().is_none() {
        return "Pick a category".to_string();
    }
    if state.leaderboard_loading() {
        return "Loading leaderboard...".to_string();
    }
    let rows = state.leaderboard_rows();
    if rows.is_empty() {
        return "No runs recorded".to_string();
    }

    let mut lines = vec![format!(
        "{:>3}  {:<20} {:>12}  {:<10}  {:>4}  Video",
        "#", "Runner", "Time", "Date", "Srv"
    )];
    for (idx, row) in rows.iter().enumerate() {
        let server_rank = row
            .server_rank
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        let video = if row.video_link.is_empty() {
            "-"
        } else {
            row.video_link.as_str()
        };
        lines.push(format!(
            "{:>3}  {:<20} {:>12}  {:<10}  {:>4}  {}",
            idx + 1,
            truncate(&row.runner_name, 20),
            format_time(row.seconds),
            row.date,
            server_rank,
            video
        ));
    }
    lines.join("\n")
}

fn render_chart(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Times").borders(Borders::ALL);
    let Some(series) = state.chart_series() else {
        let text = if state.leaderboard_rows().len() == 1 {
            "Chart needs at least two runs"
        } else {
            ""
        };
        let empty = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let max = series
        .iter()
        .map(|p| p.value.ceil() as u64)
        .max()
        .unwrap_or(1)
        .max(1);
    let bars: Vec<Bar> = series
        .iter()
        .map(|point| {
            Bar::default()
                .label(Line::from(truncate(&point.label, 18)))
                .value(point.value.round() as u64)
                .text_value(format_time(Some(point.value)))
                .style(Style::default().fg(Color::Cyan))
        })
        .collect();

    let chart = BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .max(max);
    frame.render_widget(chart, area);
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn footer_text(state: &AppState) -> String {
    match state.focus {
        Focus::Search => "Type to edit | Enter Search | Tab Next pane | Esc Clear | Ctrl-C Quit"
            .to_string(),
        Focus::Games | Focus::Categories => {
            "j/k/↑/↓ Move | Enter Pick | Tab/Esc Panes | / Search | ? Help | q Quit".to_string()
        }
        Focus::Leaderboard => {
            "j/k/↑/↓ Scroll | Tab/Esc Panes | / Search | ? Help | q Quit".to_string()
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Speedrun Records - Help",
        "",
        "Search box:",
        "  type         Edit query",
        "  Enter        Search (top 10 games)",
        "  Esc          Clear query",
        "",
        "Panes:",
        "  Tab / S-Tab  Next / previous pane",
        "  j/k or ↑/↓   Move",
        "  Enter        Pick game or category",
        "               (pick the same game again to deselect)",
        "  /            Jump to search",
        "  ?            Toggle help",
        "  q / Ctrl-C   Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
