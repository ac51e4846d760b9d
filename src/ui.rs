use crate::capabilities::Dialogs;
use crate::diary_entry::DiaryEntry;
use crate::search_page::{ResultsView, SearchPage};
use color_eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::{
    io::{stdout, Stdout},
    time::{Duration, Instant},
};
use tracing::warn;
use unicode_width::UnicodeWidthChar;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Submit,
    Delete(String),
    Share(String),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Input,
    Results,
}

/// Terminal-side state that is not part of the page itself.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub focus: Focus,
    pub selected: usize,
    /// Cursor position in the search field, counted in chars.
    pub cursor_position: usize,
    pub cursor_visible: bool,
}

fn results_shown(page: &SearchPage) -> bool {
    matches!(page.view(), ResultsView::Results { .. })
}

impl ViewState {
    /// Keeps focus and selection valid for what the page currently shows.
    pub fn sync_with(&mut self, page: &SearchPage) {
        if !results_shown(page) {
            self.focus = Focus::Input;
        }
        self.selected = self.selected.min(page.entries().len().saturating_sub(1));
        self.cursor_position = self.cursor_position.min(page.query.chars().count());
    }

    pub fn handle_key(&mut self, key: KeyEvent, page: &mut SearchPage) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Action::Quit);
        }
        self.sync_with(page);
        match self.focus {
            Focus::Input => self.handle_input_key(key, page),
            Focus::Results => self.handle_results_key(key, page),
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent, page: &mut SearchPage) -> Option<Action> {
        let len = page.query.chars().count();
        self.cursor_visible = true;

        match key.code {
            KeyCode::Enter => return Some(Action::Submit),
            KeyCode::Esc => return Some(Action::Quit),
            KeyCode::Tab | KeyCode::Down => {
                if results_shown(page) {
                    self.focus = Focus::Results;
                }
            }
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                let at = byte_offset(&page.query, self.cursor_position);
                page.query.insert(at, c);
                self.cursor_position += 1;
            }
            KeyCode::Backspace => {
                if self.cursor_position > 0 {
                    let at = byte_offset(&page.query, self.cursor_position - 1);
                    page.query.remove(at);
                    self.cursor_position -= 1;
                }
            }
            KeyCode::Delete => {
                if self.cursor_position < len {
                    let at = byte_offset(&page.query, self.cursor_position);
                    page.query.remove(at);
                }
            }
            KeyCode::Left => self.cursor_position = self.cursor_position.saturating_sub(1),
            KeyCode::Right => {
                if self.cursor_position < len {
                    self.cursor_position += 1;
                }
            }
            KeyCode::Home => self.cursor_position = 0,
            KeyCode::End => self.cursor_position = len,
            _ => {}
        }
        None
    }

    fn handle_results_key(&mut self, key: KeyEvent, page: &SearchPage) -> Option<Action> {
        let entries = match page.view() {
            ResultsView::Results { entries, .. } => entries,
            _ => {
                self.focus = Focus::Input;
                return None;
            }
        };
        let selected = self.selected.min(entries.len() - 1);

        match key.code {
            KeyCode::Up => self.selected = selected.saturating_sub(1),
            KeyCode::Down => {
                if selected < entries.len() - 1 {
                    self.selected = selected + 1;
                }
            }
            KeyCode::Char('d') => return Some(Action::Delete(entries[selected].id.clone())),
            KeyCode::Char('s') => return Some(Action::Share(entries[selected].id.clone())),
            KeyCode::Char('q') => return Some(Action::Quit),
            KeyCode::Esc | KeyCode::Tab => self.focus = Focus::Input,
            _ => {}
        }
        None
    }
}

/// Answer to a confirmation prompt, or `None` for keys the prompt ignores.
fn confirm_answer(key: &KeyEvent) -> Option<bool> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(true),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(false),
        _ => None,
    }
}

pub struct UI {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    view: ViewState,
    last_cursor_update: Instant,
    backdrop: Option<Buffer>,
}

impl UI {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(UI {
            terminal,
            view: ViewState {
                cursor_visible: true,
                ..ViewState::default()
            },
            last_cursor_update: Instant::now(),
            backdrop: None,
        })
    }

    /// Places the cursor after text that was put in the field from outside,
    /// e.g. the startup keyword.
    pub fn move_cursor_to_end(&mut self, page: &SearchPage) {
        self.view.cursor_position = page.query.chars().count();
    }

    pub fn display(&mut self, page: &SearchPage) -> Result<()> {
        let now = Instant::now();
        if now.duration_since(self.last_cursor_update) >= Duration::from_millis(500) {
            self.view.cursor_visible = !self.view.cursor_visible;
            self.last_cursor_update = now;
        }
        self.view.sync_with(page);

        let view = &self.view;
        let frame = self.terminal.draw(|f| draw_page(f, page, view))?;
        self.backdrop = Some(frame.buffer.clone());
        Ok(())
    }

    pub fn handle_input(&mut self, page: &mut SearchPage) -> Result<Option<Action>> {
        if !event::poll(Duration::from_millis(50))? {
            return Ok(None);
        }
        let key = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => key,
            _ => return Ok(None),
        };
        if self.view.focus == Focus::Input {
            self.last_cursor_update = Instant::now();
        }
        Ok(self.view.handle_key(key, page))
    }

    fn draw_dialog(&mut self, title: &str, message: &str, hint: &str) -> Result<()> {
        let backdrop = &self.backdrop;
        self.terminal.draw(|f| {
            if let Some(backdrop) = backdrop {
                if backdrop.area == f.area() {
                    f.buffer_mut().merge(backdrop);
                }
            }

            let area = centered_rect(60, 7, f.area());
            f.render_widget(Clear, area);

            let text = vec![
                Line::from(Span::raw(message.to_string())),
                Line::from(""),
                Line::from(Span::styled(
                    hint.to_string(),
                    Style::default().fg(Color::Yellow),
                )),
            ];
            let dialog = Paragraph::new(text)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(title.to_string())
                        .style(Style::default().add_modifier(Modifier::BOLD)),
                )
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            f.render_widget(dialog, area);
        })?;
        Ok(())
    }
}

impl Dialogs for UI {
    fn confirm(&mut self, message: &str) -> bool {
        loop {
            if let Err(e) = self.draw_dialog("Confirm", message, "y: Yes, n: No") {
                warn!("failed to draw confirmation: {}", e);
                return false;
            }
            match event::read() {
                Ok(Event::Key(key)) => {
                    if let Some(answer) = confirm_answer(&key) {
                        return answer;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("failed to read confirmation: {}", e);
                    return false;
                }
            }
        }
    }

    fn notify(&mut self, message: &str) {
        loop {
            if let Err(e) = self.draw_dialog("Notice", message, "Press any key") {
                warn!("failed to draw notice: {}", e);
                return;
            }
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => return,
                Ok(_) => {}
                Err(e) => {
                    warn!("failed to read key: {}", e);
                    return;
                }
            }
        }
    }
}

impl Drop for UI {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

pub fn draw_page(f: &mut Frame, page: &SearchPage, view: &ViewState) {
    let mut constraints = vec![Constraint::Length(3), Constraint::Length(3)];
    if page.error().is_some() {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Min(3));
    constraints.push(Constraint::Length(1));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(constraints.as_slice())
        .split(f.area());

    let title = Paragraph::new("Search Diaries")
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let input_width = chunks[1].width.saturating_sub(2) as usize;
    let show_cursor = view.focus == Focus::Input && view.cursor_visible;
    let input_text = if page.query.is_empty() && !show_cursor {
        Span::styled("Enter a keyword...", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(visible_input(
            &page.query,
            view.cursor_position,
            input_width,
            show_cursor,
        ))
    };
    let input_style = if view.focus == Focus::Input {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let search_input = Paragraph::new(Line::from(input_text)).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Keyword")
            .border_style(input_style),
    );
    f.render_widget(search_input, chunks[1]);

    let mut next = 2;
    if let Some(error) = page.error() {
        let banner = Paragraph::new(error.to_string())
            .style(Style::default().fg(Color::Red))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red)),
            );
        f.render_widget(banner, chunks[next]);
        next += 1;
    }

    let body = chunks[next];
    match page.view() {
        ResultsView::Loading => render_notice(f, body, "Searching..."),
        ResultsView::NotSearched => render_notice(
            f,
            body,
            "Search by keywords contained in diary titles or content.",
        ),
        ResultsView::NoMatches { query } => {
            render_notice(f, body, &format!("No diaries matched '{}'.", query))
        }
        ResultsView::Results { query, entries } => {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Min(1)].as_ref())
                .split(body);

            let summary = Paragraph::new(format!("Results for '{}': {}", query, entries.len()))
                .style(Style::default().fg(Color::Gray));
            f.render_widget(summary, parts[0]);

            let selected = (view.focus == Focus::Results)
                .then(|| view.selected.min(entries.len().saturating_sub(1)));
            f.render_stateful_widget(
                results_list(entries),
                parts[1],
                &mut ListState::default().with_selected(selected),
            );
        }
    }

    let controls = match view.focus {
        Focus::Input => "Enter: Search, Tab: Results, Esc: Quit",
        Focus::Results => "Up/Down: Navigate, d: Delete, s: Share, Esc: Back",
    };
    let controls_paragraph = Paragraph::new(controls)
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center);
    f.render_widget(controls_paragraph, chunks[next + 1]);
}

fn render_notice(f: &mut Frame, area: Rect, text: &str) {
    let notice = Paragraph::new(text.to_string())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(notice, area);
}

fn results_list(entries: &[DiaryEntry]) -> List<'static> {
    let items: Vec<ListItem> = entries
        .iter()
        .map(|e| {
            ListItem::new(vec![
                Line::from(Span::raw(format!(
                    "[{}] {}",
                    DiaryEntry::display_timestamp(&e.created_at),
                    e.title
                ))),
                Line::from(Span::styled(
                    format!(
                        "  {} | updated {}",
                        e.visibility().label(),
                        DiaryEntry::display_timestamp(&e.updated_at)
                    ),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Diaries"))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol("> ")
}

fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// The slice of the field that fits in `width` columns while keeping the
/// cursor on screen, with a `|` marking the cursor when shown.
fn visible_input(text: &str, cursor: usize, width: usize, show_cursor: bool) -> String {
    let mut shown: Vec<char> = text.chars().collect();
    let cursor = cursor.min(shown.len());
    if show_cursor {
        shown.insert(cursor, '|');
    }
    if shown.is_empty() {
        return String::new();
    }

    let col = |c: &char| c.width().unwrap_or(0);
    let mut start = 0;
    let mut used: usize = shown[..=cursor.min(shown.len().saturating_sub(1))]
        .iter()
        .map(col)
        .sum();
    while used > width && start < cursor {
        used -= col(&shown[start]);
        start += 1;
    }

    let mut out = String::new();
    let mut total = 0;
    for c in &shown[start..] {
        let w = col(c);
        if total + w > width {
            break;
        }
        total += w;
        out.push(*c);
    }
    out
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(0),
                Constraint::Length(height),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(vertical[1])[1]
}
