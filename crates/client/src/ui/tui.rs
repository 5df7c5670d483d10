//! Terminal user interface for browsing a bucket.
//!
//! The screen shows the breadcrumb trail, an error banner when an action has
//! failed, the folders and files under the cursor, and a status bar. Key
//! handling is kept apart from the terminal so it can be driven in tests.

use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use namespace::{format_date, format_file_size, Entry};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};

use crate::files::FileBrowser;
use crate::platform::{Identity, Platform};
use crate::session::{KeychainBackend, SessionContext};

/// One row of the listing pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Folder(String),
    File {
        id: String,
        name: String,
        size: u64,
        created: String,
    },
}

impl Row {
    pub fn name(&self) -> &str {
        match self {
            Row::Folder(name) => name,
            Row::File { name, .. } => name,
        }
    }
}

/// Snapshot of everything the screen shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserView {
    /// Cursor shown as an absolute path (`/a/b`).
    pub location: String,
    /// Breadcrumb names, first segment first.
    pub breadcrumbs: Vec<String>,
    /// Folders first, then files.
    pub rows: Vec<Row>,
    pub busy: bool,
    /// Error banner text.
    pub banner: Option<String>,
    /// Email of the logged-in account.
    pub identity: Option<String>,
}

impl BrowserView {
    /// Capture the state of a browser.
    pub fn capture<P: Platform>(browser: &FileBrowser<P>, identity: Option<&Identity>) -> Self {
        let rows = browser
            .listing()
            .entries()
            .map(|entry| match entry {
                Entry::Folder(name) => Row::Folder(name.to_string()),
                Entry::File(object) => Row::File {
                    id: object.id.clone(),
                    name: object.display_name().to_string(),
                    size: object.size_bytes,
                    created: format_date(&object.created_at),
                },
            })
            .collect();

        Self {
            location: browser.cursor().to_string(),
            breadcrumbs: browser
                .cursor()
                .breadcrumbs()
                .into_iter()
                .map(|crumb| crumb.name)
                .collect(),
            rows,
            busy: browser.is_busy(),
            banner: browser.error().map(|e| e.to_string()),
            identity: identity.map(|i| i.email.clone()),
        }
    }
}

/// What a text prompt is collecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    UploadFile,
    UploadFolder,
    /// Destination for downloading the object with this id.
    Download { id: String },
}

impl PromptKind {
    fn title(&self) -> &'static str {
        match self {
            PromptKind::UploadFile => " Upload file ",
            PromptKind::UploadFolder => " Upload folder ",
            PromptKind::Download { .. } => " Save to ",
        }
    }
}

/// Input mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    ConfirmDelete { id: String, name: String },
    Prompt { kind: PromptKind, input: String },
}

/// An action requested from the keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Refresh,
    Open(String),
    Back,
    Home,
    Jump(usize),
    UploadFile(PathBuf),
    UploadFolder(PathBuf),
    Download { id: String, dest: PathBuf },
    Delete(String),
    DismissError,
    Logout,
}

impl Command {
    /// Navigation changes the cursor and is followed by a refetch.
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Command::Open(_) | Command::Back | Command::Home | Command::Jump(_)
        )
    }
}

/// Keyboard and selection state.
#[derive(Debug)]
pub struct TuiState {
    mode: Mode,
    list_state: ListState,
    status: Option<String>,
    should_quit: bool,
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiState {
    pub fn new() -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            mode: Mode::Normal,
            list_state,
            status: None,
            should_quit: false,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn selected(&self) -> Option<usize> {
        self.list_state.selected()
    }

    /// Informational message shown in the status bar.
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Move the selection back to the first row.
    pub fn reset_selection(&mut self) {
        self.list_state.select(Some(0));
    }

    fn select_next(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    fn select_prev(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    fn selected_row<'v>(&self, view: &'v BrowserView) -> Option<&'v Row> {
        self.list_state.selected().and_then(|i| view.rows.get(i))
    }

    fn selected_file(&self, view: &BrowserView) -> Option<(String, String)> {
        match self.selected_row(view) {
            Some(Row::File { id, name, .. }) => Some((id.clone(), name.clone())),
            _ => None,
        }
    }

    fn prompt(&mut self, kind: PromptKind, input: String) {
        self.mode = Mode::Prompt { kind, input };
    }

    /// Handle a key press against the view it was pressed on.
    pub fn handle_key(&mut self, key: KeyEvent, view: &BrowserView) -> Option<Command> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return None;
        }

        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Normal => self.handle_normal_key(key, view),
            Mode::ConfirmDelete { id, name } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(Command::Delete(id)),
                _ => {
                    self.set_status(format!("Kept {}", name));
                    None
                }
            },
            Mode::Prompt { kind, mut input } => match key.code {
                KeyCode::Esc => None,
                KeyCode::Enter => {
                    let input = input.trim();
                    if input.is_empty() {
                        return None;
                    }
                    let path = PathBuf::from(input);
                    Some(match kind {
                        PromptKind::UploadFile => Command::UploadFile(path),
                        PromptKind::UploadFolder => Command::UploadFolder(path),
                        PromptKind::Download { id } => Command::Download { id, dest: path },
                    })
                }
                KeyCode::Backspace => {
                    input.pop();
                    self.prompt(kind, input);
                    None
                }
                KeyCode::Char(c) => {
                    input.push(c);
                    self.prompt(kind, input);
                    None
                }
                _ => {
                    self.prompt(kind, input);
                    None
                }
            },
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent, view: &BrowserView) -> Option<Command> {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                None
            }
            KeyCode::Esc => {
                if view.banner.is_some() {
                    Some(Command::DismissError)
                } else {
                    self.should_quit = true;
                    None
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.select_next(view.rows.len());
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.select_prev(view.rows.len());
                None
            }
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
                match self.selected_row(view)? {
                    Row::Folder(name) => Some(Command::Open(name.clone())),
                    Row::File { id, name, .. } => {
                        self.prompt(PromptKind::Download { id: id.clone() }, name.clone());
                        None
                    }
                }
            }
            KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') => Some(Command::Back),
            KeyCode::Char('0') | KeyCode::Char('~') => Some(Command::Home),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                (index < view.breadcrumbs.len()).then_some(Command::Jump(index))
            }
            KeyCode::Char('r') => Some(Command::Refresh),
            KeyCode::Char('u') => {
                self.prompt(PromptKind::UploadFile, String::new());
                None
            }
            KeyCode::Char('f') => {
                self.prompt(PromptKind::UploadFolder, String::new());
                None
            }
            KeyCode::Char('d') => {
                let (id, name) = self.selected_file(view)?;
                self.prompt(PromptKind::Download { id }, name);
                None
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                let (id, name) = self.selected_file(view)?;
                self.mode = Mode::ConfirmDelete { id, name };
                None
            }
            KeyCode::Char('L') => Some(Command::Logout),
            _ => None,
        }
    }

    /// Keep the selection inside the row range.
    fn clamp_selection(&mut self, len: usize) {
        match self.list_state.selected() {
            _ if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            None => self.list_state.select(Some(0)),
            _ => {}
        }
    }
}

/// Render the whole screen.
pub fn render(frame: &mut Frame, view: &BrowserView, state: &mut TuiState) {
    state.clamp_selection(view.rows.len());

    let banner_height = if view.banner.is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),             // Breadcrumbs
            Constraint::Length(banner_height), // Error banner
            Constraint::Min(0),                // Listing
            Constraint::Length(3),             // Status bar or prompt
        ])
        .split(frame.area());

    render_header(frame, chunks[0], view);
    if let Some(banner) = &view.banner {
        render_banner(frame, chunks[1], banner);
    }
    render_listing(frame, chunks[2], view, &mut state.list_state);
    render_footer(frame, chunks[3], view, state);
}

fn render_header(frame: &mut Frame, area: Rect, view: &BrowserView) {
    let mut spans = vec![Span::styled(
        " 0:/ ",
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    )];
    for (i, crumb) in view.breadcrumbs.iter().enumerate() {
        spans.push(Span::styled("> ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(
            format!("{}:{} ", i + 1, crumb),
            Style::default().fg(Color::Yellow),
        ));
    }

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(" Shelf "));
    frame.render_widget(header, area);
}

fn render_banner(frame: &mut Frame, area: Rect, banner: &str) {
    let paragraph = Paragraph::new(Line::from(vec![
        Span::styled(format!(" {} ", banner), Style::default().fg(Color::White)),
        Span::styled("(Esc to dismiss)", Style::default().fg(Color::Gray)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    )
    .style(Style::default().bg(Color::Red));
    frame.render_widget(paragraph, area);
}

fn render_listing(frame: &mut Frame, area: Rect, view: &BrowserView, list_state: &mut ListState) {
    let title = format!(" {} ({} items) ", view.location, view.rows.len());
    let block = Block::default().borders(Borders::ALL).title(title);

    if view.rows.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            " This folder is empty. Press 'u' to upload a file.",
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = view
        .rows
        .iter()
        .map(|row| match row {
            Row::Folder(name) => ListItem::new(Line::from(vec![Span::styled(
                format!("{}/", name),
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            )])),
            Row::File {
                name,
                size,
                created,
                ..
            } => ListItem::new(Line::from(vec![
                Span::raw(format!("{:<40}", name)),
                Span::styled(
                    format!("{:>12}  ", format_file_size(*size)),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(created.clone(), Style::default().fg(Color::Gray)),
            ])),
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, list_state);
}

fn render_footer(frame: &mut Frame, area: Rect, view: &BrowserView, state: &TuiState) {
    let paragraph = match &state.mode {
        Mode::Prompt { kind, input } => Paragraph::new(Line::from(vec![
            Span::raw(format!(" {}", input)),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]))
        .block(Block::default().borders(Borders::ALL).title(kind.title())),
        Mode::ConfirmDelete { name, .. } => Paragraph::new(Line::from(Span::styled(
            format!(" Delete {}? (y/n)", name),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )))
        .block(Block::default().borders(Borders::ALL)),
        Mode::Normal => {
            let mut spans = Vec::new();
            if view.busy {
                spans.push(Span::styled(" Working... ", Style::default().fg(Color::Yellow)));
            } else if let Some(status) = &state.status {
                spans.push(Span::styled(
                    format!(" {} ", status),
                    Style::default().fg(Color::Green),
                ));
            }
            if let Some(identity) = &view.identity {
                spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
                spans.push(Span::styled(identity.clone(), Style::default().fg(Color::Cyan)));
            }
            spans.push(Span::styled(
                " | u upload  f folder  d download  x delete  r refresh  L logout  q quit ",
                Style::default().fg(Color::DarkGray),
            ));
            Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL))
        }
    };
    frame.render_widget(paragraph, area);
}

/// The terminal application.
pub struct TuiApp {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    state: TuiState,
}

impl TuiApp {
    /// Take over the terminal.
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            state: TuiState::new(),
        })
    }

    pub fn draw(&mut self, view: &BrowserView) -> io::Result<()> {
        let state = &mut self.state;
        self.terminal.draw(|frame| render(frame, view, state))?;
        Ok(())
    }

    /// Run the event loop until the user quits or logs out.
    pub async fn run<P: Platform, B: KeychainBackend>(
        &mut self,
        browser: &mut FileBrowser<P>,
        session: &SessionContext<P, B>,
    ) -> io::Result<()> {
        let tick_rate = Duration::from_millis(250);

        let mut view = BrowserView::capture(browser, session.identity().as_ref());
        view.busy = true;
        self.draw(&view)?;
        let _ = browser.refresh().await;

        loop {
            let view = BrowserView::capture(browser, session.identity().as_ref());
            self.draw(&view)?;

            if event::poll(tick_rate)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        if let Some(command) = self.state.handle_key(key, &view) {
                            let mut pending = view.clone();
                            pending.busy = true;
                            self.draw(&pending)?;
                            self.execute(command, browser, session).await;
                        }
                    }
                }
            }

            if self.state.should_quit() {
                break;
            }
        }

        Ok(())
    }

    async fn execute<P: Platform, B: KeychainBackend>(
        &mut self,
        command: Command,
        browser: &mut FileBrowser<P>,
        session: &SessionContext<P, B>,
    ) {
        tracing::debug!("Executing {:?}", command);
        self.state.status = None;

        let navigated = command.is_navigation();
        match command {
            Command::Refresh => {
                let _ = browser.refresh().await;
            }
            Command::Open(name) => {
                if let Err(e) = browser.open_folder(&name) {
                    tracing::warn!("Cannot open {}: {}", name, e);
                }
            }
            Command::Back => browser.back(),
            Command::Home => browser.home(),
            Command::Jump(index) => {
                if let Err(e) = browser.jump(index) {
                    tracing::warn!("Cannot jump to breadcrumb {}: {}", index, e);
                }
            }
            Command::UploadFile(path) => {
                if let Ok(object) = browser.upload_file(&path).await {
                    self.state.set_status(format!("Uploaded {}", object.key));
                }
            }
            Command::UploadFolder(path) => {
                if let Ok(objects) = browser.upload_folder(&path).await {
                    self.state
                        .set_status(format!("Uploaded {} files", objects.len()));
                }
            }
            Command::Download { id, dest } => {
                if let Ok(written) = browser.download_to(&id, &dest).await {
                    self.state.set_status(format!(
                        "Saved {} to {}",
                        format_file_size(written),
                        dest.display()
                    ));
                }
            }
            Command::Delete(id) => {
                if browser.delete(&id).await.is_ok() {
                    self.state.set_status("Deleted");
                }
            }
            Command::DismissError => browser.dismiss_error(),
            Command::Logout => match session.logout().await {
                Ok(()) => self.state.quit(),
                Err(e) => browser.show_error(e),
            },
        }

        if navigated {
            self.state.reset_selection();
            let _ = browser.refresh().await;
        }
    }

    /// Restores the terminal to its original state.
    pub fn restore(&mut self) -> io::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for TuiApp {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}
