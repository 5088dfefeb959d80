use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use uuid::Uuid;

use super::debounce::Debouncer;
use super::fade::Fade;
use super::fetcher::{FetchResponse, UserListFetcher, UserSource};
use super::filters::parse_filters;
use super::query::{QueryParams, Sort};
use super::selection::{HeaderCheckbox, Selection};

/// Terminal title while the users list is open
pub const PAGE_TITLE: &str = "Admin | Users";

const TOOLBAR_FADE: Duration = Duration::from_millis(100);
/// Redraw interval while the toolbar is mid-fade
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
    Continue,
    Quit,
}

/// State of the admin users list: search box, paging, cursor and selection.
///
/// Typed text only reaches the fetcher after the debounce delay. The pending
/// search lives inside the view, so dropping the view discards it.
pub struct UserListView<S> {
    fetcher: UserListFetcher<S>,
    input: String,
    search: String,
    search_focused: bool,
    debounce: Debouncer<String>,
    selection: Selection,
    toolbar: Fade,
    cursor: usize,
    page: u32,
    sort: Option<Sort>,
}

impl<S: UserSource> UserListView<S> {
    pub fn new(fetcher: UserListFetcher<S>, debounce: Duration) -> Self {
        Self {
            fetcher,
            input: String::new(),
            search: String::new(),
            search_focused: false,
            debounce: Debouncer::new(debounce),
            selection: Selection::new(),
            toolbar: Fade::new(TOOLBAR_FADE),
            cursor: 0,
            page: 1,
            sort: None,
        }
    }

    /// Start with `search` already applied, as if it had been typed and settled
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self.input = self.search.clone();
        self
    }

    pub fn with_sort(mut self, sort: Option<Sort>) -> Self {
        self.sort = sort;
        self
    }

    /// Issue the initial fetch
    pub fn mount(&mut self, now: Instant) {
        self.request(now);
    }

    /// Parameters for the page currently asked for
    pub fn query(&self) -> QueryParams {
        parse_filters(&self.search)
            .with_page(self.page)
            .with_sort(self.sort)
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Search text the current query was built from
    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn is_search_focused(&self) -> bool {
        self.search_focused
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn response(&self) -> FetchResponse {
        self.fetcher.response()
    }

    pub fn set_input(&mut self, text: impl Into<String>, now: Instant) {
        self.input = text.into();
        self.debounce.push(self.input.clone(), now);
    }

    pub fn push_char(&mut self, c: char, now: Instant) {
        let mut text = std::mem::take(&mut self.input);
        text.push(c);
        self.set_input(text, now);
    }

    pub fn pop_char(&mut self, now: Instant) {
        let mut text = std::mem::take(&mut self.input);
        text.pop();
        self.set_input(text, now);
    }

    /// Advance timers and absorb finished fetches. Returns whether a redraw is needed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;

        if let Some(search) = self.debounce.poll(now) {
            self.apply_search(search, now);
            changed = true;
        }
        if self.fetcher.poll(now) {
            changed = true;
        }

        self.clamp_cursor();
        self.toolbar.set_visible(!self.selection.is_empty(), now);
        changed || self.toolbar.is_animating(now)
    }

    /// UUIDs of the rows on screen, `None` before anything has loaded
    pub fn loaded_uuids(&self) -> Option<Vec<Uuid>> {
        let response = self.fetcher.response();
        response
            .data
            .as_ref()
            .map(|page| page.items.iter().map(|user| user.uuid).collect())
    }

    pub fn header_checkbox(&self) -> HeaderCheckbox {
        let loaded = self.loaded_uuids();
        self.selection.header_state(loaded.as_deref())
    }

    /// Footer text, only once a page is available
    pub fn footer_label(&self) -> Option<String> {
        self.fetcher.response().pagination().map(|page| page.label())
    }

    pub fn toggle_row(&mut self, uuid: Uuid, checked: bool) {
        self.selection.set_row(uuid, checked);
    }

    pub fn toggle_cursor_row(&mut self) {
        let response = self.fetcher.response();
        if let Some(user) = response.items().get(self.cursor) {
            self.selection.toggle_row(user.uuid);
        }
    }

    pub fn toggle_all(&mut self) {
        let loaded = self.loaded_uuids().unwrap_or_default();
        self.selection.toggle_all(&loaded);
    }

    /// Toolbar opacity in `0.0..=1.0`
    pub fn toolbar_opacity(&self, now: Instant) -> f32 {
        self.toolbar.opacity(now)
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let rows = self.fetcher.response().items().len();
        if rows == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = self.cursor.saturating_add_signed(delta).min(rows - 1);
    }

    pub fn next_page(&mut self, now: Instant) {
        let has_next = self
            .fetcher
            .response()
            .pagination()
            .is_some_and(|page| page.has_next_page());
        if has_next {
            self.go_to_page(self.page.saturating_add(1), now);
        }
    }

    pub fn prev_page(&mut self, now: Instant) {
        if self.page > 1 {
            self.go_to_page(self.page - 1, now);
        }
    }

    pub fn refresh(&mut self, now: Instant) {
        self.fetcher.refresh(now);
    }

    /// Earliest moment something changes without user input
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        let animating = self
            .toolbar
            .is_animating(now)
            .then(|| now + FRAME_INTERVAL);

        [self.debounce.deadline(), self.fetcher.next_retry_at(), animating]
            .into_iter()
            .flatten()
            .min()
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> ViewAction {
        if key.kind != KeyEventKind::Press {
            return ViewAction::Continue;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return ViewAction::Quit;
        }

        if self.search_focused {
            self.handle_search_key(key, now);
            return ViewAction::Continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Quit,
            KeyCode::Char('/') => self.search_focused = true,
            KeyCode::Char(' ') => self.toggle_cursor_row(),
            KeyCode::Char('a') => self.toggle_all(),
            KeyCode::Char('r') => self.refresh(now),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::PageDown | KeyCode::Char('n') => self.next_page(now),
            KeyCode::PageUp | KeyCode::Char('p') => self.prev_page(now),
            _ => {}
        }
        ViewAction::Continue
    }

    /// Wait for the next fetch to land. Callers outside an event loop use this
    /// in place of polling.
    pub async fn next_completion(&mut self) {
        self.fetcher.next_completion().await;
        self.clamp_cursor();
    }

    fn handle_search_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Esc => self.search_focused = false,
            KeyCode::Enter => {
                self.search_focused = false;
                if let Some(search) = self.debounce.flush() {
                    self.apply_search(search, now);
                }
            }
            KeyCode::Backspace => self.pop_char(now),
            KeyCode::Char(c) => self.push_char(c, now),
            KeyCode::Up => self.move_cursor(-1),
            KeyCode::Down => self.move_cursor(1),
            KeyCode::PageDown => self.next_page(now),
            KeyCode::PageUp => self.prev_page(now),
            _ => {}
        }
    }

    fn apply_search(&mut self, search: String, now: Instant) {
        if search == self.search {
            return;
        }
        self.search = search;
        self.go_to_page(1, now);
    }

    fn go_to_page(&mut self, page: u32, now: Instant) {
        self.page = page.max(1);
        self.cursor = 0;
        self.request(now);
    }

    fn request(&mut self, now: Instant) {
        let query = self.query();
        self.fetcher.request(query, now);
    }

    fn clamp_cursor(&mut self) {
        let rows = self.fetcher.response().items().len();
        self.cursor = self.cursor.min(rows.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::fetcher::FetchConfig;
    use crate::users::filters::{FilterField, FilterValue};
    use crate::users::testing::StubSource;
    use std::sync::Arc;

    const DEBOUNCE: Duration = Duration::from_millis(200);

    fn view(count: u64, per_page: u64) -> (Arc<StubSource>, UserListView<StubSource>) {
        let source = Arc::new(StubSource::new(count, per_page));
        let fetcher = UserListFetcher::new(Arc::clone(&source), FetchConfig::default());
        (source, UserListView::new(fetcher, DEBOUNCE))
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_is_debounced() {
        let (source, mut view) = view(3, 10);
        let t0 = Instant::now();
        view.mount(t0);
        view.next_completion().await;

        for (i, c) in "username:user2".chars().enumerate() {
            view.push_char(c, t0 + Duration::from_millis(10 * i as u64));
        }
        let last = t0 + Duration::from_millis(10 * 13);

        view.tick(last + Duration::from_millis(150));
        assert_eq!(view.search(), "");
        assert_eq!(source.calls().len(), 1);

        assert!(view.tick(last + DEBOUNCE));
        assert_eq!(view.search(), "username:user2");
        view.next_completion().await;

        let calls = source.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1].filters[&FilterField::Username],
            FilterValue::AnyOf(vec!["user2".to_string()])
        );
        assert_eq!(view.response().items().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_search_resets_page() {
        let (_source, mut view) = view(120, 50);
        let now = Instant::now();
        view.mount(now);
        view.next_completion().await;

        view.next_page(now);
        assert_eq!(view.page(), 2);
        view.next_completion().await;
        assert_eq!(
            view.footer_label().as_deref(),
            Some("Showing 50 to 100 of 120 results.")
        );

        view.set_input("username:user1", now);
        view.tick(now + DEBOUNCE);
        assert_eq!(view.page(), 1);
        assert_eq!(view.query().page, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paging_stops_at_bounds() {
        let (source, mut view) = view(20, 10);
        let now = Instant::now();
        view.mount(now);

        // No descriptor yet, so there is nothing to page to
        view.next_page(now);
        assert_eq!(view.page(), 1);
        view.next_completion().await;

        view.prev_page(now);
        assert_eq!(view.page(), 1);

        view.next_page(now);
        view.next_completion().await;
        view.next_page(now);
        assert_eq!(view.page(), 2);
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_header_checkbox_tracks_loaded_rows() {
        let (_source, mut view) = view(3, 10);
        let now = Instant::now();
        view.mount(now);
        assert!(view.header_checkbox().indeterminate);
        assert_eq!(view.footer_label(), None);

        // Nothing selected out of three loaded rows still counts as a partial state
        view.next_completion().await;
        assert_eq!(view.header_checkbox().glyph(), "[-]");

        view.toggle_all();
        assert_eq!(view.selection().len(), 3);
        assert_eq!(view.header_checkbox().glyph(), "[x]");

        view.toggle_cursor_row();
        assert_eq!(view.header_checkbox().glyph(), "[-]");

        view.toggle_all();
        assert!(view.selection().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_survives_search() {
        let (_source, mut view) = view(3, 10);
        let now = Instant::now();
        view.mount(now);
        view.next_completion().await;

        let first = view.response().items()[0].uuid;
        view.toggle_row(first, true);

        view.set_input("username:user3", now);
        view.tick(now + DEBOUNCE);
        view.next_completion().await;

        assert!(view.selection().contains(&first));
        let state = view.header_checkbox();
        assert!(!state.checked);
        assert!(!state.indeterminate);
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_handling() {
        let (_source, mut view) = view(3, 10);
        let now = Instant::now();
        view.mount(now);
        view.next_completion().await;

        assert_eq!(view.handle_key(key(KeyCode::Char('j')), now), ViewAction::Continue);
        assert_eq!(view.cursor(), 1);
        view.handle_key(key(KeyCode::Char(' ')), now);
        assert_eq!(view.selection().len(), 1);

        view.handle_key(key(KeyCode::Char('/')), now);
        assert!(view.is_search_focused());
        assert_eq!(view.handle_key(key(KeyCode::Char('q')), now), ViewAction::Continue);
        view.handle_key(key(KeyCode::Char('x')), now);
        view.handle_key(key(KeyCode::Backspace), now);
        assert_eq!(view.input(), "q");

        view.handle_key(key(KeyCode::Enter), now);
        assert!(!view.is_search_focused());
        assert_eq!(view.search(), "q");

        assert_eq!(view.handle_key(key(KeyCode::Char('q')), now), ViewAction::Quit);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(view.handle_key(ctrl_c, now), ViewAction::Quit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toolbar_fades_with_selection() {
        let (_source, mut view) = view(3, 10);
        let now = Instant::now();
        view.mount(now);
        view.next_completion().await;

        view.tick(now);
        assert_eq!(view.toolbar_opacity(now), 0.0);

        view.toggle_cursor_row();
        assert!(view.tick(now));
        assert!(view.next_deadline(now).is_some());
        assert_eq!(view.toolbar_opacity(now + TOOLBAR_FADE), 1.0);

        let later = now + Duration::from_secs(1);
        view.toggle_all();
        view.tick(later);
        assert_eq!(view.toolbar_opacity(later + TOOLBAR_FADE), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_deadline_follows_pending_search() {
        let (_source, mut view) = view(3, 10);
        let now = Instant::now();
        assert_eq!(view.next_deadline(now), None);

        view.set_input("a", now);
        assert_eq!(view.next_deadline(now), Some(now + DEBOUNCE));
    }
}
