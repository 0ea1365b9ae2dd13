//! Terminal rendering and input dispatch. No business logic lives here;
//! every gesture maps onto a shell call and every widget reads a view
//! model built by the layers below.

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind,
        KeyModifiers, MouseButton, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame, Terminal,
};

use crate::shell::AppShell;
use crate::store::Cid;

const CHECKBOX_WIDTH: u16 = 4;
const DATE_WIDTH: u16 = 16;
const DESTROY_WIDTH: u16 = 4;
const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);
const INPUT_PLACEHOLDER: &str = "What needs to be done?";
const CLEAR_LABEL: &str = "clear completed";

/// Column bands inside a list row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowZone {
    Checkbox,
    Content,
    Date,
    Destroy,
}

/// Screen regions from the most recent draw, used to resolve clicks.
#[derive(Debug, Clone, Copy, Default)]
struct ScreenZones {
    toggle_all: Rect,
    list: Rect,
    clear_completed: Rect,
}

/// Remembers the previous click so two on the same row and zone within
/// the window count as a double.
struct ClickTracker {
    last: Option<(Cid, RowZone, Instant)>,
}

impl ClickTracker {
    fn new() -> Self {
        Self { last: None }
    }

    fn observe(&mut self, cid: Cid, zone: RowZone, at: Instant) -> bool {
        let double = matches!(
            self.last,
            Some((c, z, t)) if c == cid && z == zone && at.duration_since(t) <= DOUBLE_CLICK_WINDOW
        );
        // A completed double does not seed a triple.
        self.last = if double { None } else { Some((cid, zone, at)) };
        double
    }
}

/// Raw mode, alternate screen, and mouse capture, undone on drop.
struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
    }
}

/// Runs the interactive loop until the user quits.
pub fn run(shell: &mut AppShell) -> io::Result<()> {
    let mut tui = Tui::new()?;
    let mut clicks = ClickTracker::new();
    let mut zones = ScreenZones::default();

    loop {
        tui.terminal.draw(|frame| zones = draw(frame, shell))?;

        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                KeyCode::Char('q') if idle(shell) => break,
                KeyCode::Char(c) => shell.on_char(c),
                KeyCode::Backspace => shell.on_backspace(),
                KeyCode::Enter => shell.on_enter(),
                KeyCode::Esc => shell.on_escape(),
                KeyCode::Tab => shell.on_tab(),
                _ => {}
            },
            Event::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
                dispatch_click(
                    shell,
                    &mut clicks,
                    &zones,
                    mouse.column,
                    mouse.row,
                    Instant::now(),
                );
            }
            _ => {}
        }
    }
    Ok(())
}

/// `q` only quits while nothing would swallow it as text.
fn idle(shell: &AppShell) -> bool {
    shell.input().is_empty() && !shell.presenters().iter().any(|p| p.is_editing())
}

fn dispatch_click(
    shell: &mut AppShell,
    clicks: &mut ClickTracker,
    zones: &ScreenZones,
    column: u16,
    row: u16,
    at: Instant,
) {
    let position = Position::new(column, row);
    if zones.toggle_all.contains(position) {
        shell.on_toggle_all();
        return;
    }
    if zones.clear_completed.contains(position) {
        shell.on_clear_completed();
        return;
    }
    if zones.list.contains(position) {
        let index = (row - zones.list.y) as usize;
        if let Some(presenter) = shell.presenters().get(index) {
            let cid = presenter.cid();
            match hit_zone(zones.list, column) {
                RowZone::Checkbox => shell.on_toggle_click(cid),
                RowZone::Destroy => shell.on_destroy_click(cid),
                RowZone::Content => {
                    if clicks.observe(cid, RowZone::Content, at) {
                        shell.on_edit_content(cid);
                    } else {
                        shell.on_blur();
                    }
                }
                RowZone::Date => {
                    if clicks.observe(cid, RowZone::Date, at) {
                        shell.on_edit_date(cid);
                    } else {
                        shell.on_blur();
                    }
                }
            }
            return;
        }
    }
    // Clicks on empty space defocus whatever was being edited.
    shell.on_blur();
}

/// Maps a column inside the list area onto its row band.
fn hit_zone(list: Rect, column: u16) -> RowZone {
    let offset = column.saturating_sub(list.x);
    if offset < CHECKBOX_WIDTH {
        RowZone::Checkbox
    } else if offset >= list.width.saturating_sub(DESTROY_WIDTH) {
        RowZone::Destroy
    } else if offset >= list.width.saturating_sub(DESTROY_WIDTH + DATE_WIDTH) {
        RowZone::Date
    } else {
        RowZone::Content
    }
}

fn draw(frame: &mut Frame, shell: &AppShell) -> ScreenZones {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Length(3), // new-todo input
            Constraint::Min(0),    // list
            Constraint::Length(1), // footer
            Constraint::Length(1), // status
        ])
        .split(frame.area());

    let summary = shell.summary();

    let indicator = if summary.toggle_all_checked {
        "[x] "
    } else {
        "[ ] "
    };
    let header = Line::from(vec![
        Span::styled(indicator, Style::default().fg(Color::DarkGray)),
        Span::styled("todos", Style::default().add_modifier(Modifier::BOLD)),
    ]);
    frame.render_widget(Paragraph::new(header), chunks[0]);

    let input = if shell.input().is_empty() {
        Span::styled(INPUT_PLACEHOLDER, Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(shell.input())
    };
    frame.render_widget(
        Paragraph::new(Line::from(input)).block(Block::default().borders(Borders::ALL)),
        chunks[1],
    );

    let mut clear_completed = Rect::default();
    if !shell.presenters().is_empty() {
        let items: Vec<ListItem> = shell
            .presenters()
            .iter()
            .map(|presenter| ListItem::new(render_row(presenter, chunks[2].width)))
            .collect();
        frame.render_widget(List::new(items), chunks[2]);

        if let Some(text) = &summary.footer {
            let footer = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Min(0),
                    Constraint::Length(CLEAR_LABEL.len() as u16),
                ])
                .split(chunks[3]);
            frame.render_widget(
                Paragraph::new(text.as_str()).style(Style::default().fg(Color::DarkGray)),
                footer[0],
            );
            if summary.done > 0 {
                frame.render_widget(
                    Paragraph::new(CLEAR_LABEL)
                        .style(Style::default().add_modifier(Modifier::UNDERLINED)),
                    footer[1],
                );
                clear_completed = footer[1];
            }
        }
    }

    render_status(frame, shell, chunks[4]);

    ScreenZones {
        toggle_all: Rect::new(chunks[0].x, chunks[0].y, CHECKBOX_WIDTH, 1),
        list: chunks[2],
        clear_completed,
    }
}

fn render_status(frame: &mut Frame, shell: &AppShell, area: Rect) {
    let line = match shell.status() {
        Some(status) => Span::styled(status.to_string(), Style::default().fg(Color::Red)),
        None => Span::styled(
            "enter commits · esc blurs · tab hops · q quits",
            Style::default().fg(Color::DarkGray),
        ),
    };
    frame.render_widget(Paragraph::new(Line::from(line)), area);
}

fn render_row(presenter: &crate::presenter::ItemPresenter, width: u16) -> Line<'static> {
    let view = presenter.view();
    let content_width = width.saturating_sub(CHECKBOX_WIDTH + DATE_WIDTH + DESTROY_WIDTH) as usize;

    let checkbox = if view.done { "[x] " } else { "[ ] " };

    let (content, content_style) = match presenter.content_buffer() {
        Some(buffer) => (
            format!("{buffer}▌"),
            Style::default().add_modifier(Modifier::UNDERLINED),
        ),
        None if view.done => (
            view.content.clone(),
            Style::default()
                .add_modifier(Modifier::DIM)
                .add_modifier(Modifier::CROSSED_OUT),
        ),
        None => (view.content.clone(), Style::default()),
    };

    let (date, date_style) = match presenter.date_buffer() {
        Some(buffer) => (
            format!("{buffer}▌"),
            Style::default().add_modifier(Modifier::UNDERLINED),
        ),
        None => (
            view.formatted_date.clone(),
            Style::default().fg(Color::DarkGray),
        ),
    };

    Line::from(vec![
        Span::raw(checkbox),
        Span::styled(pad(&content, content_width), content_style),
        Span::styled(pad(&date, DATE_WIDTH as usize), date_style),
        Span::styled(" ✕ ", Style::default().fg(Color::Red)),
    ])
}

/// Truncates or pads to exactly `width` characters so the date and
/// destroy columns line up across rows.
fn pad(text: &str, width: usize) -> String {
    let truncated: String = text.chars().take(width).collect();
    format!("{truncated:<width$}")
}
