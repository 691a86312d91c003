use std::{io, time::Duration};

use color_eyre::Result;
use crossterm::{
    event::{self, DisableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph},
    Terminal,
};
use strongbox_core::record::SecureFileRecord;

use crate::files::describe;

/// Read-only browser over the caller's records, newest first.
/// Arrow keys move the selection; `q` or `Esc` exits.
pub fn launch(owner: &str, records: &[SecureFileRecord]) -> Result<()> {
    let _guard = TerminalGuard::enter()?;
    let mut terminal = _guard.terminal()?;
    let mut state = ListState::default();
    if !records.is_empty() {
        state.select(Some(0));
    }

    loop {
        terminal.draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Min(1),
                    Constraint::Length(5),
                    Constraint::Length(3),
                ])
                .split(frame.area());

            let header = Paragraph::new(Line::from(vec![
                Span::styled(
                    "Strongbox",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("  signed in as {owner}")),
            ]))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            );
            frame.render_widget(header, chunks[0]);

            let items: Vec<ListItem> = if records.is_empty() {
                vec![ListItem::new(Line::from(Span::styled(
                    "No files yet. Add one with `strongbox put <path>`.",
                    Style::default().fg(Color::DarkGray),
                )))]
            } else {
                records
                    .iter()
                    .map(|r| ListItem::new(Line::from(describe(r))))
                    .collect()
            };
            let body = List::new(items)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(format!("Files ({})", records.len())),
                )
                .highlight_style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol("> ");
            frame.render_stateful_widget(body, chunks[1], &mut state);

            let details = state
                .selected()
                .and_then(|i| records.get(i))
                .map(detail_lines)
                .unwrap_or_default();
            let detail = Paragraph::new(details)
                .block(Block::default().borders(Borders::ALL).title("Details"));
            frame.render_widget(detail, chunks[2]);

            let footer = Paragraph::new(Line::from(vec![
                Span::styled("Up/Down", Style::default().fg(Color::Cyan)),
                Span::raw(" select, "),
                Span::styled("q", Style::default().fg(Color::Cyan)),
                Span::raw(" or "),
                Span::styled("Esc", Style::default().fg(Color::Cyan)),
                Span::raw(" to quit."),
            ]))
            .block(Block::default().borders(Borders::ALL).title("Controls"));
            frame.render_widget(footer, chunks[3]);
        })?;

        if event::poll(Duration::from_millis(150))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Down | KeyCode::Char('j') => {
                        state.select(step(state.selected(), records.len(), 1));
                    }
                    KeyCode::Up | KeyCode::Char('k') => {
                        state.select(step(state.selected(), records.len(), -1));
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(())
}

fn detail_lines(record: &SecureFileRecord) -> Vec<Line<'static>> {
    vec![
        Line::from(vec![
            Span::styled("name: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(record.display_name.clone()),
        ]),
        Line::from(vec![
            Span::styled("key:  ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(record.storage_key.clone()),
        ]),
        Line::from(vec![
            Span::styled("size: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("{} bytes", record.plaintext_size)),
        ]),
    ]
}

/// Clamped selection movement; `None` only when there is nothing to select.
fn step(current: Option<usize>, len: usize, delta: isize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let current = current.unwrap_or(0) as isize;
    Some((current + delta).clamp(0, len as isize - 1) as usize)
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self)
    }

    fn terminal(&self) -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
        let backend = CrosstermBackend::new(io::stdout());
        Ok(Terminal::new(backend)?)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Errors can't propagate out of Drop.
        if let Err(err) = disable_raw_mode() {
            eprintln!("failed to disable raw mode: {err}");
        }
        if let Err(err) = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture) {
            eprintln!("failed to restore terminal: {err}");
        }
    }
}
