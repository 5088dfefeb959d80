use std::io::stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use super::fetcher::{FetchConfig, UserListFetcher, UserSource};
use super::query::Sort;
use super::render::{Theme, draw};
use super::view::{PAGE_TITLE, UserListView, ViewAction};
use crate::api::PanelClient;
use crate::config::AppConfig;

/// Longest wait for input before finished fetches are picked up
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Open the interactive users list against the configured panel.
///
/// Fetches are spawned onto the ambient tokio runtime, so this must run on a
/// thread that has entered one (e.g. inside `block_in_place`).
pub fn run_users_tui(config: &AppConfig, search: Option<String>, sort: Option<Sort>) -> Result<()> {
    let client = PanelClient::new(config).context("Failed to create panel client")?;
    let fetcher = UserListFetcher::new(Arc::new(client), FetchConfig::from(config));
    let view = UserListView::new(fetcher, config.search_debounce())
        .with_search(search.unwrap_or_default())
        .with_sort(sort);

    let mut app = UsersApp::new(view, config.nerd_font_icons)?;
    let result = app.run();
    app.cleanup()?;
    result
}

struct UsersApp<S> {
    terminal: Terminal<CrosstermBackend<std::io::Stdout>>,
    view: UserListView<S>,
    theme: Theme,
    icons: bool,
    cleaned_up: bool,
}

impl<S: UserSource> UsersApp<S> {
    fn new(view: UserListView<S>, icons: bool) -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen, SetTitle(PAGE_TITLE))?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;

        Ok(Self {
            terminal,
            view,
            theme: Theme::default(),
            icons,
            cleaned_up: false,
        })
    }

    fn run(&mut self) -> Result<()> {
        self.view.mount(Instant::now());
        let mut dirty = true;

        loop {
            let now = Instant::now();
            dirty |= self.view.tick(now);
            if dirty {
                self.draw(now)?;
                dirty = false;
            }

            let timeout = self
                .view
                .next_deadline(now)
                .map_or(IDLE_POLL, |deadline| deadline.saturating_duration_since(now))
                .min(IDLE_POLL);
            if !event::poll(timeout)? {
                continue;
            }

            match event::read()? {
                Event::Key(key_event) => {
                    if self.view.handle_key(key_event, Instant::now()) == ViewAction::Quit {
                        return Ok(());
                    }
                    dirty = true;
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }
    }

    fn draw(&mut self, now: Instant) -> Result<()> {
        let view = &self.view;
        let theme = &self.theme;
        let icons = self.icons;
        self.terminal
            .draw(|frame| draw(frame, view, theme, icons, now))?;
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.cleaned_up {
            return Ok(());
        }

        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        self.cleaned_up = true;
        Ok(())
    }
}

impl<S> Drop for UsersApp<S> {
    fn drop(&mut self) {
        if self.cleaned_up {
            return;
        }
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}
