//! Application state and key handling.

use crossterm::event::KeyCode;
use tracing::{debug, instrument};

use super::input::{digit_column, move_cursor};
use crate::client::{LiveSession, SessionEvent};
use crate::db::ReplaySession;
use crate::games::connect_four::GameResult;

/// Something the event loop must do in response to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing to do.
    None,
    /// Leave the application.
    Quit,
    /// Submit a move into this column.
    Drop(usize),
    /// Show the local replay list.
    OpenPicker,
    /// Play this local session.
    PlaySession(i32),
}

/// List of local sessions to choose a replay from.
#[derive(Debug, Clone)]
pub struct Picker {
    sessions: Vec<ReplaySession>,
    selected: usize,
}

impl Picker {
    /// Creates a picker over `sessions`, most recent first.
    pub fn new(sessions: Vec<ReplaySession>) -> Self {
        Self {
            sessions,
            selected: 0,
        }
    }

    /// Listed sessions.
    pub fn sessions(&self) -> &[ReplaySession] {
        &self.sessions
    }

    /// Highlighted index.
    pub fn selected(&self) -> usize {
        self.selected
    }
}

/// Main application state.
#[derive(Debug)]
pub struct App {
    session: LiveSession,
    cursor: usize,
    status: String,
    picker: Option<Picker>,
}

impl App {
    /// Creates the app around a live session.
    pub fn new(session: LiveSession) -> Self {
        let status = if session.game_id().is_some() {
            "Your move: ←/→ or 1-7, Enter to drop, r for replays, q to quit".to_string()
        } else {
            "Replay mode: r for replays, q to quit".to_string()
        };
        Self {
            session,
            cursor: 3,
            status,
            picker: None,
        }
    }

    /// The live session.
    pub fn session(&self) -> &LiveSession {
        &self.session
    }

    /// Mutable access to the live session.
    pub fn session_mut(&mut self) -> &mut LiveSession {
        &mut self.session
    }

    /// Column under the cursor.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Status line.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Replaces the status line.
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Open replay picker, if any.
    pub fn picker(&self) -> Option<&Picker> {
        self.picker.as_ref()
    }

    /// Shows the replay picker.
    pub fn open_picker(&mut self, sessions: Vec<ReplaySession>) {
        if sessions.is_empty() {
            self.status = "No local replays yet".to_string();
            return;
        }
        self.picker = Some(Picker::new(sessions));
    }

    /// Maps a key press to an action.
    #[instrument(skip(self))]
    pub fn handle_key(&mut self, key: KeyCode) -> Action {
        if let Some(picker) = self.picker.as_mut() {
            return match key {
                KeyCode::Up => {
                    picker.selected = picker.selected.saturating_sub(1);
                    Action::None
                }
                KeyCode::Down => {
                    let last = picker.sessions.len().saturating_sub(1);
                    picker.selected = (picker.selected + 1).min(last);
                    Action::None
                }
                KeyCode::Enter => {
                    let id = picker.sessions.get(picker.selected).map(|s| *s.id());
                    self.picker = None;
                    id.map_or(Action::None, Action::PlaySession)
                }
                KeyCode::Esc => {
                    self.picker = None;
                    Action::None
                }
                KeyCode::Char('q') => Action::Quit,
                _ => Action::None,
            };
        }

        match key {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('r') if self.session.can_start_replay() => Action::OpenPicker,
            KeyCode::Enter | KeyCode::Char(' ') => self.drop_action(self.cursor),
            KeyCode::Char(c) => match digit_column(c) {
                Some(column) => {
                    self.cursor = column;
                    self.drop_action(column)
                }
                None => Action::None,
            },
            other => {
                self.cursor = move_cursor(self.cursor, other);
                Action::None
            }
        }
    }

    fn drop_action(&self, column: usize) -> Action {
        if self.session.accepts_input() {
            Action::Drop(column)
        } else {
            debug!(column, "Drop ignored while input is locked");
            Action::None
        }
    }

    /// Updates the status line for a session event.
    pub fn on_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::GameOver { result } => {
                self.status = format!("Game over: {}. r for replays, q to quit", describe(result));
            }
            SessionEvent::ReplayFinished { result } => {
                self.status = match result {
                    Some(result) => format!("Replay finished. Result: {}", describe(result)),
                    None => "Replay finished.".to_string(),
                };
            }
            SessionEvent::Idle | SessionEvent::Animating => {}
        }
    }
}

fn describe(result: GameResult) -> &'static str {
    match result {
        GameResult::PlayerWin => "you win",
        GameResult::ComputerWin => "the computer wins",
        GameResult::Draw => "draw",
        GameResult::InProgress => "unfinished",
    }
}
