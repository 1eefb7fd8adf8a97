//! Stateless UI rendering for connect four.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use super::app::{App, Picker};
use crate::client::{BoardGeometry, FallingPiece};
use crate::games::connect_four::{COLUMNS, Mover, ROWS, Square};

const CELL: &str = " ● ";
const EMPTY: &str = " · ";

/// Renders the whole screen.
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Title
            Constraint::Min(10),    // Board
            Constraint::Length(3),  // Status
        ])
        .split(area);

    let title = match (app.session().game_id(), app.session().is_replaying()) {
        (_, true) => "Drop Four - Replay".to_string(),
        (Some(id), false) => format!("Drop Four - Game #{}", id),
        (None, false) => "Drop Four".to_string(),
    };
    let title = Paragraph::new(title)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    frame.render_widget(title, chunks[0]);

    match app.picker() {
        Some(picker) => draw_picker(frame, chunks[1], picker),
        None => draw_board(frame, chunks[1], app),
    }

    let status = Paragraph::new(app.status())
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, chunks[2]);
}

fn mover_style(mover: Mover) -> Style {
    match mover {
        Mover::Player => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        Mover::Opponent => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    }
}

/// Terminal row of a falling piece: `None` above the board, else a board row.
fn falling_row(geometry: &BoardGeometry, piece: &FallingPiece) -> Option<usize> {
    let top = f64::from(geometry.margin + geometry.piece_padding);
    if piece.y < top {
        return None;
    }
    let row = ((piece.y - top) / f64::from(geometry.cell_size.max(1))) as usize;
    Some(row.min(ROWS - 1))
}

fn draw_board(frame: &mut Frame, area: Rect, app: &App) {
    let scheduler = app.session().scheduler();
    let board = scheduler.board();
    let falling = scheduler
        .active()
        .map(|piece| (piece, falling_row(scheduler.geometry(), piece)));

    let mut lines = Vec::with_capacity(ROWS + 3);

    let mut header = vec![Span::raw(" ")];
    for column in 0..COLUMNS {
        match falling {
            Some((piece, None)) if piece.placement.column == column => {
                header.push(Span::styled(CELL, mover_style(piece.placement.mover)));
            }
            _ if column == app.cursor() && app.session().accepts_input() => {
                header.push(Span::styled(" ▼ ", Style::default().fg(Color::White)));
            }
            _ => header.push(Span::raw("   ")),
        }
    }
    lines.push(Line::from(header));

    for (row, cells) in board.grid().rows().iter().enumerate() {
        let mut spans = vec![Span::styled("│", Style::default().fg(Color::Blue))];
        for (column, square) in cells.iter().enumerate() {
            let span = match (square, falling) {
                (Square::Empty, Some((piece, Some(r))))
                    if r == row && piece.placement.column == column =>
                {
                    Span::styled(CELL, mover_style(piece.placement.mover))
                }
                (Square::Empty, _) => Span::styled(EMPTY, Style::default().fg(Color::DarkGray)),
                (Square::Occupied(mover), _) => Span::styled(CELL, mover_style(*mover)),
            };
            spans.push(span);
        }
        spans.push(Span::styled("│", Style::default().fg(Color::Blue)));
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(Span::styled(
        format!("└{}┘", "─".repeat(COLUMNS * 3)),
        Style::default().fg(Color::Blue),
    )));
    let labels: String = (1..=COLUMNS).map(|c| format!(" {} ", c)).collect();
    lines.push(Line::from(format!(" {}", labels)));

    let width = (COLUMNS * 3 + 2) as u16;
    let height = lines.len() as u16;
    let paragraph = Paragraph::new(lines);
    frame.render_widget(paragraph, center_rect(area, width, height));
}

fn draw_picker(frame: &mut Frame, area: Rect, picker: &Picker) {
    let items: Vec<ListItem> = picker
        .sessions()
        .iter()
        .map(|session| {
            let result = session.result().as_deref().unwrap_or("unfinished");
            let game = session
                .linked_game_id()
                .map_or_else(|| "local".to_string(), |id| format!("game #{}", id));
            ListItem::new(format!(
                "#{:<5} {}  {:<10} {}",
                session.id(),
                session.started_at().format("%Y-%m-%d %H:%M"),
                game,
                result
            ))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title("Local replays (Enter to play, Esc to close)")
                .borders(Borders::ALL),
        )
        .highlight_style(Style::default().bg(Color::White).fg(Color::Black));
    let mut state = ListState::default();
    state.select(Some(picker.selected()));
    frame.render_stateful_widget(list, center_rect(area, 60, 14), &mut state);
}

fn center_rect(area: Rect, width: u16, height: u16) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Length((area.height.saturating_sub(height)) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((area.width.saturating_sub(width)) / 2),
            Constraint::Length(width),
            Constraint::Length((area.width.saturating_sub(width)) / 2),
        ])
        .split(vert[1])[1]
}
