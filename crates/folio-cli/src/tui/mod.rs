//! Interactive TUI (Terminal User Interface) for Folio.
//!
//! Provides a browsing interface with:
//! - Search as you type, committed after a short pause in typing
//! - A collection pane to narrow the view to a subtree
//! - Sort switching, paging or virtual scrolling depending on library size
//! - The shareable state encoding of the current view

use crate::app::App;
use crate::commands::query::summary_line;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use folio_core::{
    CollectionForest, CollectionId, Config, FilterCoordinator, SortKey, SortSpec, ViewMode,
};
use ratatui::{prelude::*, widgets::*};
use std::io;
use std::time::{Duration, Instant};

/// Pause in typing after which the search text is committed.
const COMMIT_DELAY: Duration = Duration::from_millis(250);

/// TUI application state.
struct TuiApp {
    /// The loaded library
    app: App,

    /// The view state owner
    view: FilterCoordinator,

    /// Search text as typed (not yet committed while `typed_at` is set)
    query_string: String,

    /// Time of the last uncommitted keystroke
    typed_at: Option<Instant>,

    /// Collection pane entries: none for the whole library, then pre-order
    collections: Vec<(Option<CollectionId>, String)>,

    /// Highlighted collection pane entry
    collection_cursor: usize,

    /// Selected row, as an index into the visible set
    selected: usize,

    /// Result rows that fit on screen
    list_rows: usize,

    /// Whether we should quit
    should_quit: bool,

    /// Last recomputation time
    last_update_time: Duration,

    /// Status message
    status_message: Option<String>,
}

impl TuiApp {
    fn new(app: App, initial_state: Option<&str>) -> Self {
        let mut view = app.coordinator();
        if let Some(encoded) = initial_state {
            view.apply_encoded(encoded);
        }

        let collections = collection_entries(app.store.forest());
        let collection_cursor = collections
            .iter()
            .position(|(id, _)| *id == view.state().collection)
            .unwrap_or(0);

        TuiApp {
            query_string: view.state().query.clone(),
            view,
            app,
            typed_at: None,
            collections,
            collection_cursor,
            selected: 0,
            list_rows: 0,
            should_quit: false,
            last_update_time: Duration::ZERO,
            status_message: None,
        }
    }

    /// Run a coordinator operation, timing it and resetting the selection.
    fn apply(&mut self, op: impl FnOnce(&mut FilterCoordinator)) {
        let start = Instant::now();
        op(&mut self.view);
        self.last_update_time = start.elapsed();
        self.selected = 0;
        self.status_message = None;
    }

    /// Handle input character.
    fn on_char(&mut self, c: char) {
        self.query_string.push(c);
        self.typed_at = Some(Instant::now());
    }

    /// Handle backspace.
    fn on_backspace(&mut self) {
        self.query_string.pop();
        self.typed_at = Some(Instant::now());
    }

    /// Commit the typed search text once typing has paused.
    fn commit_if_idle(&mut self) {
        if self.typed_at.is_some_and(|t| t.elapsed() >= COMMIT_DELAY) {
            self.commit_query();
        }
    }

    /// Commit the typed search text now.
    fn commit_query(&mut self) {
        self.typed_at = None;
        let text = self.query_string.clone();
        self.apply(|view| {
            view.set_search_text(&text);
        });
    }

    /// Select the collection under the pane cursor.
    fn select_collection(&mut self, cursor: usize) {
        if let Some((id, _)) = self.collections.get(cursor) {
            self.collection_cursor = cursor;
            let id = id.clone();
            self.apply(|view| {
                view.select_collection(id);
            });
        }
    }

    fn previous_collection(&mut self) {
        let count = self.collections.len();
        if count > 0 {
            self.select_collection((self.collection_cursor + count - 1) % count);
        }
    }

    fn next_collection(&mut self) {
        let count = self.collections.len();
        if count > 0 {
            self.select_collection((self.collection_cursor + 1) % count);
        }
    }

    /// Cycle through the sort keys.
    fn cycle_sort_key(&mut self) {
        let current = self.view.state().sort;
        let position = SortKey::ALL
            .iter()
            .position(|k| *k == current.key)
            .unwrap_or(0);
        let key = SortKey::ALL[(position + 1) % SortKey::ALL.len()];
        self.apply(|view| {
            view.set_sort(SortSpec::new(key, current.direction));
        });
    }

    /// Flip the sort direction.
    fn toggle_direction(&mut self) {
        let current = self.view.state().sort;
        self.apply(|view| {
            view.set_sort(SortSpec::new(current.key, current.direction.reversed()));
        });
    }

    /// Reset search, collection, sort and position.
    fn clear_all(&mut self) {
        self.query_string.clear();
        self.typed_at = None;
        self.collection_cursor = 0;
        self.apply(|view| {
            view.clear_all();
        });
    }

    /// Show the shareable encoding of the current view.
    fn show_share_link(&mut self) {
        let encoded = self.view.encoded_state();
        self.status_message = Some(if encoded.is_empty() {
            "Default view (nothing to share)".to_string()
        } else {
            format!("Share: ?{}", encoded)
        });
    }

    /// Move the selection by `delta` rows and keep it in the window.
    fn move_selection(&mut self, delta: isize) {
        let count = self.view.visible_count();
        if count == 0 {
            return;
        }
        let target = self.selected as isize + delta;
        self.selected = target.clamp(0, count as isize - 1) as usize;
        self.follow_selection();
    }

    fn select_first(&mut self) {
        self.selected = 0;
        self.follow_selection();
    }

    fn select_last(&mut self) {
        self.selected = self.view.visible_count().saturating_sub(1);
        self.follow_selection();
    }

    /// Move the view's position so the selected row is in the window.
    fn follow_selection(&mut self) {
        match self.view.mode() {
            ViewMode::Paged { page_size } => {
                let page = self.selected / page_size + 1;
                if self.view.state().position.page() != Some(page) {
                    self.view.set_page(page);
                }
            }
            ViewMode::Virtual(layout) => {
                let row_height = u64::from(layout.row_height);
                let rows = self.list_rows.max(1) as u64;
                let top = self.view.state().position.offset().unwrap_or(0) / row_height;
                let selected = self.selected as u64;

                let new_top = if selected < top {
                    selected
                } else if selected >= top + rows {
                    selected + 1 - rows
                } else {
                    top
                };
                if new_top != top {
                    self.view.set_scroll_offset(new_top * row_height);
                }
            }
        }
    }

    /// Rows one page or one screen down/up.
    fn page_rows(&self) -> isize {
        match self.view.mode() {
            ViewMode::Paged { page_size } => page_size as isize,
            ViewMode::Virtual(_) => self.list_rows.max(1) as isize,
        }
    }

    /// Tell the coordinator how tall the list is (virtual mode).
    fn sync_viewport(&mut self, rows: usize) {
        if rows == self.list_rows {
            return;
        }
        self.list_rows = rows;
        if let ViewMode::Virtual(layout) = self.view.mode() {
            let height = (rows as u32).saturating_mul(layout.row_height);
            self.view.set_viewport_height(height);
            self.follow_selection();
        }
    }

    /// The row of the window at the top of the screen.
    fn first_screen_row(&self) -> usize {
        match self.view.mode() {
            ViewMode::Paged { .. } => 0,
            ViewMode::Virtual(layout) => {
                let offset = self.view.state().position.offset().unwrap_or(0);
                let top = (offset / u64::from(layout.row_height)) as usize;
                top.saturating_sub(self.view.window().start)
            }
        }
    }
}

/// Collection pane entries with indentation by depth.
fn collection_entries(forest: &CollectionForest) -> Vec<(Option<CollectionId>, String)> {
    let mut entries = vec![(None, "All records".to_string())];
    for root in forest.roots() {
        for id in forest.subtree(root) {
            if let Some(node) = forest.get(&id) {
                let indent = "  ".repeat(forest.depth(&id).saturating_sub(1));
                let label = format!("{}{} ({})", indent, node.title, forest.item_count(&id));
                entries.push((Some(id), label));
            }
        }
    }
    entries
}

/// Run the TUI application.
pub fn run(config: Config, initial_state: Option<&str>) -> anyhow::Result<()> {
    let app = App::new(config)?;

    if app.store.is_empty() {
        eprintln!("The item dataset is empty, nothing to browse.");
        return Ok(());
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut tui_app = TuiApp::new(app, initial_state);

    // Main loop
    let result = run_loop(&mut terminal, &mut tui_app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Main event loop.
fn run_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut TuiApp) -> anyhow::Result<()> {
    loop {
        let mut rows = app.list_rows;
        terminal.draw(|f| rows = ui::draw(f, app))?;
        app.sync_viewport(rows);

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Esc => {
                            app.should_quit = true;
                        }
                        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                            app.should_quit = true;
                        }
                        KeyCode::Char(c) => {
                            if key.modifiers.contains(KeyModifiers::CONTROL) {
                                match c {
                                    'l' => app.clear_all(),
                                    's' => app.show_share_link(),
                                    _ => {}
                                }
                            } else {
                                app.on_char(c);
                            }
                        }
                        KeyCode::Backspace => {
                            app.on_backspace();
                        }
                        KeyCode::Enter => {
                            app.commit_query();
                        }
                        KeyCode::Up => {
                            app.move_selection(-1);
                        }
                        KeyCode::Down => {
                            app.move_selection(1);
                        }
                        KeyCode::PageUp => {
                            app.move_selection(-app.page_rows());
                        }
                        KeyCode::PageDown => {
                            app.move_selection(app.page_rows());
                        }
                        KeyCode::Home => {
                            app.select_first();
                        }
                        KeyCode::End => {
                            app.select_last();
                        }
                        KeyCode::Left => {
                            app.previous_collection();
                        }
                        KeyCode::Right => {
                            app.next_collection();
                        }
                        KeyCode::F(2) => {
                            app.cycle_sort_key();
                        }
                        KeyCode::F(3) => {
                            app.toggle_direction();
                        }
                        _ => {}
                    }
                }
            }
        }

        app.commit_if_idle();

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

mod ui {
    use super::*;

    /// Draw the UI. Returns the number of result rows that fit.
    pub fn draw(f: &mut Frame, app: &TuiApp) -> usize {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Search box
                Constraint::Min(10),   // Collections and results
                Constraint::Length(2), // Status bar
            ])
            .split(f.area());

        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(28), Constraint::Percentage(72)])
            .split(chunks[1]);

        draw_search_box(f, app, chunks[0]);
        draw_collections(f, app, panes[0]);
        let rows = draw_results(f, app, panes[1]);
        draw_status_bar(f, app, chunks[2]);
        rows
    }

    /// Draw the search input box.
    fn draw_search_box(f: &mut Frame, app: &TuiApp, area: Rect) {
        let title = if app.view.is_ready() {
            " Search (type to filter, Enter to apply now) "
        } else {
            " Search (index not ready) "
        };
        let input = Paragraph::new(app.query_string.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(input, area);

        // Show cursor
        f.set_cursor_position(Position::new(
            area.x + app.query_string.chars().count() as u16 + 1,
            area.y + 1,
        ));
    }

    /// Draw the collection pane.
    fn draw_collections(f: &mut Frame, app: &TuiApp, area: Rect) {
        let items: Vec<ListItem> = app
            .collections
            .iter()
            .map(|(_, label)| ListItem::new(label.as_str()))
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Collections (←/→) "),
            )
            .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

        let mut state = ListState::default().with_selected(Some(app.collection_cursor));
        f.render_stateful_widget(list, area, &mut state);
    }

    /// Draw the results list. Returns the number of rows that fit.
    fn draw_results(f: &mut Frame, app: &TuiApp, area: Rect) -> usize {
        let rows = area.height.saturating_sub(2) as usize;
        let window = app.view.window();

        let items: Vec<ListItem> = app
            .view
            .window_items()
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                ListItem::new(format!("{:>5}. {}", window.start + i + 1, summary_line(item)))
            })
            .collect();

        let selected = app
            .selected
            .checked_sub(window.start)
            .filter(|i| *i < window.items.len());

        let title = format!(
            " Results ({} of {} in {:.1}ms) ",
            app.view.visible_count(),
            app.app.store.len(),
            app.last_update_time.as_secs_f64() * 1000.0
        );

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            );

        let mut state = ListState::default()
            .with_offset(app.first_screen_row())
            .with_selected(selected);
        f.render_stateful_widget(list, area, &mut state);

        rows
    }

    /// Draw the status bar.
    fn draw_status_bar(f: &mut Frame, app: &TuiApp, area: Rect) {
        let sort = app.view.state().sort;
        let window = app.view.window();

        let position = match window.page {
            Some(page) => format!("Page {}/{}", page.page, page.page_count.max(1)),
            None => format!(
                "Rows {}-{}",
                (window.start + 1).min(window.total),
                window.start + window.items.len()
            ),
        };

        let status = if let Some(ref msg) = app.status_message {
            msg.clone()
        } else {
            format!(
                "{} | Sort: {} {} | ↑↓:Navigate ←→:Collection F2:Sort F3:Direction Ctrl+S:Share Ctrl+L:Clear Esc:Quit",
                position, sort.key, sort.direction
            )
        };

        let status_bar = Paragraph::new(status).style(Style::default().fg(Color::Gray));

        f.render_widget(status_bar, area);
    }
}
