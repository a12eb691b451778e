//! Ratatui-based status screen
//!
//! Shows volume, pause state, elapsed/total/remaining time and a completion
//! gauge. Owns the terminal: raw mode and the alternate screen are entered on
//! construction and left on drop, or from a panic hook.

use crate::display::{format_clock, Renderer, StatusView};
use crate::error::{PlayerError, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame, Terminal,
};
use std::io::{self, stdout, Stdout};
use tracing::warn;

const BACKGROUND: Color = Color::Rgb(71, 52, 55);
const FOREGROUND: Color = Color::Rgb(215, 216, 162);
const HIGHLIGHT: Color = Color::Rgb(221, 216, 16);

fn main_style() -> Style {
    Style::default().bg(BACKGROUND).fg(FOREGROUND)
}

fn status_style() -> Style {
    main_style().fg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

/// Restore terminal to normal state.
///
/// Safe to call multiple times.
fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

/// Terminal-backed renderer
pub struct TerminalRenderer {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    title: String,
}

impl TerminalRenderer {
    /// Take over the terminal. `title` is shown in the frame border.
    pub fn new(title: impl Into<String>) -> Result<Self> {
        enable_raw_mode().map_err(PlayerError::DisplayInit)?;
        let mut out = stdout();
        if let Err(e) = execute!(out, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(PlayerError::DisplayInit(e));
        }

        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            restore_terminal();
            original_hook(panic_info);
        }));

        let terminal = match Terminal::new(CrosstermBackend::new(out)) {
            Ok(terminal) => terminal,
            Err(e) => {
                restore_terminal();
                return Err(PlayerError::DisplayInit(e));
            }
        };

        Ok(Self {
            terminal,
            title: title.into(),
        })
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, view: &StatusView) {
        let title = self.title.as_str();
        if let Err(e) = self.terminal.draw(|f| draw_ui(f, title, view)) {
            warn!("Failed to draw status screen: {e}");
        }
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        restore_terminal();
    }
}

/// Draw the main UI
fn draw_ui(f: &mut Frame, title: &str, view: &StatusView) {
    let area = f.area();
    f.render_widget(Block::default().style(main_style()), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Status values
            Constraint::Length(3), // Time
            Constraint::Length(3), // Progress
            Constraint::Min(0),
            Constraint::Length(3), // Footer
        ])
        .split(area);

    draw_status(f, chunks[0], title, view);
    draw_time(f, chunks[1], view);
    draw_progress(f, chunks[2], view);
    draw_footer(f, chunks[4]);
}

fn labelled(label: &str, value: String) -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled(label.to_string(), main_style())),
        Line::from(Span::styled(value, status_style())),
    ]
}

fn draw_status(f: &mut Frame, area: Rect, title: &str, view: &StatusView) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {title} "))
        .style(main_style());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(30),
            Constraint::Percentage(40),
        ])
        .split(inner);

    let volume = labelled("current volume", format!("{}%", view.volume_percent));
    let paused = labelled("paused", view.paused.to_string());
    let completed = labelled(
        "percentage completed",
        format!("{}", view.completion_percent as u64),
    );

    f.render_widget(Paragraph::new(volume), columns[0]);
    f.render_widget(Paragraph::new(paused), columns[1]);
    f.render_widget(Paragraph::new(completed), columns[2]);
}

fn draw_time(f: &mut Frame, area: Rect, view: &StatusView) {
    let line = Line::from(vec![
        Span::styled(
            format!(
                "[{} / {}]",
                format_clock(view.elapsed_secs),
                format_clock(view.total_secs)
            ),
            main_style(),
        ),
        Span::styled(
            format!("  -{}", format_clock(view.remaining_secs)),
            main_style().add_modifier(Modifier::DIM),
        ),
    ]);
    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Time ")
            .style(main_style()),
    );
    f.render_widget(paragraph, area);
}

fn draw_progress(f: &mut Frame, area: Rect, view: &StatusView) {
    let ratio = (view.completion_percent / 100.0).clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).style(main_style()))
        .gauge_style(Style::default().fg(HIGHLIGHT).bg(BACKGROUND))
        .ratio(ratio)
        .label(format!("{}%", view.completion_percent as u64));
    f.render_widget(gauge, area);
}

/// Draw footer with controls help
fn draw_footer(f: &mut Frame, area: Rect) {
    let controls = "[a/↑] Vol+  [d/↓] Vol-  [p/Space] Pause  [b/←] Back  [n/→] Forward  [q/Esc] Quit";
    let footer = Paragraph::new(Line::from(Span::styled(
        controls,
        main_style().add_modifier(Modifier::DIM),
    )))
    .block(Block::default().borders(Borders::ALL).style(main_style()));
    f.render_widget(footer, area);
}
