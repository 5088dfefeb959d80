use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table};

use super::fetcher::UserSource;
use super::selection::row_glyph;
use super::view::UserListView;
use crate::api::User;
use crate::ui::catppuccin::{blend, color, colors};
use crate::ui::nerd_font::NerdFont;

const SEARCH_PLACEHOLDER: &str = "Begin typing to filter...";

/// Colors for the users console, taken from Catppuccin Mocha
#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,
    pub text: Color,
    pub muted: Color,
    pub border: Color,
    pub border_focused: Color,
    pub cursor_bg: Color,
    pub admin: Color,
    pub totp_on: Color,
    pub totp_off: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: color(colors::MAUVE),
            text: color(colors::TEXT),
            muted: color(colors::OVERLAY1),
            border: color(colors::SURFACE2),
            border_focused: color(colors::LAVENDER),
            cursor_bg: color(colors::SURFACE0),
            admin: color(colors::PEACH),
            totp_on: color(colors::GREEN),
            totp_off: color(colors::SUBTEXT0),
            error: color(colors::RED),
        }
    }
}

/// Draw the whole users console into `frame`
pub fn draw<S: UserSource>(
    frame: &mut Frame,
    view: &UserListView<S>,
    theme: &Theme,
    icons: bool,
    now: Instant,
) {
    let area = frame.area();
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    draw_title(frame, vertical[0], theme, icons);
    draw_search(frame, vertical[1], view, theme, icons, now);
    draw_table(frame, vertical[2], view, theme, icons);
    draw_status(frame, vertical[3], view, theme, icons);
    draw_help(frame, vertical[4], theme);
}

fn draw_title(frame: &mut Frame, area: Rect, theme: &Theme, icons: bool) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(16)])
        .split(area);

    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("{} ", NerdFont::Users.render(icons)),
            Style::default().fg(theme.accent),
        ),
        Span::styled(
            "Users",
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "  All users that have access to the system.",
            Style::default().fg(theme.muted),
        ),
    ]));

    let add_user = Paragraph::new(Span::styled(
        format!("{} Add User", NerdFont::UserPlus.render(icons)),
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Right);

    frame.render_widget(title, halves[0]);
    frame.render_widget(add_user, halves[1]);
}

fn draw_search<S: UserSource>(
    frame: &mut Frame,
    area: Rect,
    view: &UserListView<S>,
    theme: &Theme,
    icons: bool,
    now: Instant,
) {
    let border = if view.is_search_focused() {
        theme.border_focused
    } else {
        theme.border
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let toolbar = toolbar_line(view.toolbar_opacity(now), icons);
    let toolbar_width = toolbar
        .as_ref()
        .map_or(0, |line| u16::try_from(line.width()).unwrap_or(u16::MAX));
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(toolbar_width)])
        .split(inner);

    let input = if view.input().is_empty() && !view.is_search_focused() {
        Span::styled(SEARCH_PLACEHOLDER, Style::default().fg(theme.muted))
    } else {
        Span::styled(view.input().to_string(), Style::default().fg(theme.text))
    };
    let mut spans = vec![
        Span::styled(
            format!("{} ", view.header_checkbox().glyph()),
            Style::default().fg(theme.accent),
        ),
        Span::styled(
            format!("{} ", NerdFont::Search.render(icons)),
            Style::default().fg(theme.muted),
        ),
        input,
    ];
    if view.is_search_focused() {
        spans.push(Span::styled("_", Style::default().fg(theme.accent)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), columns[0]);

    if let Some(toolbar) = toolbar {
        frame.render_widget(
            Paragraph::new(toolbar).alignment(Alignment::Right),
            columns[1],
        );
    }
}

/// Bulk actions, blended into the background by `opacity`. `None` once fully faded out.
fn toolbar_line(opacity: f32, icons: bool) -> Option<Line<'static>> {
    if opacity <= 0.0 {
        return None;
    }

    let actions = [
        (NerdFont::Ban, colors::YELLOW),
        (NerdFont::Unlock, colors::TEAL),
        (NerdFont::Trash, colors::RED),
    ];
    let mut spans = Vec::new();
    for (icon, hex) in actions {
        spans.push(Span::styled(
            format!(" {} ", icon.render(icons)),
            Style::default().fg(blend(colors::BASE, hex, opacity)),
        ));
    }
    Some(Line::from(spans))
}

fn draw_table<S: UserSource>(
    frame: &mut Frame,
    area: Rect,
    view: &UserListView<S>,
    theme: &Theme,
    icons: bool,
) {
    let response = view.response();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border));

    if response.data.is_some() && response.items().is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No users found.",
            Style::default().fg(theme.muted),
        ))
        .alignment(Alignment::Center)
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let rows: Vec<Row> = response
        .items()
        .iter()
        .enumerate()
        .map(|(index, user)| {
            let selected = view.selection().contains(&user.uuid);
            let row = user_row(user, selected, theme, icons);
            if index == view.cursor() {
                row.style(Style::default().bg(theme.cursor_bg))
            } else {
                row
            }
        })
        .collect();

    let header = Row::new(vec!["", "Email", "Role", "2FA"])
        .style(Style::default().fg(theme.muted).add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Min(20),
            Constraint::Length(10),
            Constraint::Length(14),
        ],
    )
    .header(header)
    .block(block);

    frame.render_widget(table, area);
}

fn user_row(user: &User, selected: bool, theme: &Theme, icons: bool) -> Row<'static> {
    let checkbox = Span::styled(row_glyph(selected), Style::default().fg(theme.accent));

    let identity = Line::from(vec![
        Span::styled(user.email.clone(), Style::default().fg(theme.text)),
        Span::styled(
            format!("  {}", user.username),
            Style::default().fg(theme.muted),
        ),
    ]);

    let role = if user.root_admin {
        Span::styled(
            format!("{} {}", NerdFont::Shield.render(icons), user.role_label()),
            Style::default().fg(theme.admin),
        )
    } else {
        Span::styled(user.role_label(), Style::default().fg(theme.muted))
    };

    let totp_color = if user.use_totp {
        theme.totp_on
    } else {
        theme.totp_off
    };
    let totp = Span::styled(user.totp_label(), Style::default().fg(totp_color));

    Row::new(vec![
        Line::from(checkbox),
        identity,
        Line::from(role),
        Line::from(totp),
    ])
}

fn draw_status<S: UserSource>(
    frame: &mut Frame,
    area: Rect,
    view: &UserListView<S>,
    theme: &Theme,
    icons: bool,
) {
    let response = view.response();

    let line = if let Some(err) = response.error.as_deref()
        && response.data.is_none()
    {
        Line::from(Span::styled(
            format!("{} {err}", NerdFont::Warning.render(icons)),
            Style::default().fg(theme.error),
        ))
    } else if let Some(label) = view.footer_label() {
        let mut spans = vec![Span::styled(label, Style::default().fg(theme.muted))];
        if response.is_validating {
            spans.push(Span::styled(
                format!("  {}", NerdFont::Refresh.render(icons)),
                Style::default().fg(theme.accent),
            ));
        }
        if !view.selection().is_empty() {
            spans.push(Span::styled(
                format!("  {} selected", view.selection().len()),
                Style::default().fg(theme.accent),
            ));
        }
        Line::from(spans)
    } else if response.is_validating {
        Line::from(Span::styled(
            "Loading users...",
            Style::default().fg(theme.muted),
        ))
    } else {
        Line::default()
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn draw_help(frame: &mut Frame, area: Rect, theme: &Theme) {
    let key = Style::default().fg(theme.accent);
    let help = Line::from(vec![
        Span::styled("/", key),
        Span::raw(" search  "),
        Span::styled("Space", key),
        Span::raw(" select  "),
        Span::styled("a", key),
        Span::raw(" all  "),
        Span::styled("n/p", key),
        Span::raw(" page  "),
        Span::styled("r", key),
        Span::raw(" refresh  "),
        Span::styled("q", key),
        Span::raw(" quit"),
    ]);

    frame.render_widget(
        Paragraph::new(help)
            .alignment(Alignment::Center)
            .style(Style::default().fg(theme.muted)),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::users::fetcher::{FetchConfig, UserListFetcher, UserPage};
    use crate::users::query::QueryParams;
    use crate::users::testing::StubSource;
    use async_trait::async_trait;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;
    use std::time::Duration;

    struct RejectingSource;

    #[async_trait]
    impl UserSource for RejectingSource {
        async fn list_users(&self, _params: &QueryParams) -> Result<UserPage, ApiError> {
            Err(ApiError::Unauthorized)
        }
    }

    fn view_over<S: UserSource>(source: S) -> UserListView<S> {
        let fetcher = UserListFetcher::new(Arc::new(source), FetchConfig::default());
        UserListView::new(fetcher, Duration::from_millis(200))
    }

    fn render<S: UserSource>(view: &UserListView<S>, now: Instant) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 16)).unwrap();
        terminal
            .draw(|frame| draw(frame, view, &Theme::default(), false, now))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_state() {
        let mut view = view_over(StubSource::new(3, 10));
        let now = Instant::now();
        view.mount(now);

        let screen = render(&view, now);
        assert!(screen.contains("Add User"));
        assert!(screen.contains(SEARCH_PLACEHOLDER));
        assert!(screen.contains("[-]"));
        assert!(screen.contains("Loading users..."));
        assert!(!screen.contains("Showing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loaded_rows_and_footer() {
        let mut view = view_over(StubSource::new(3, 10));
        let now = Instant::now();
        view.mount(now);
        view.next_completion().await;

        let screen = render(&view, now);
        assert!(screen.contains("user1@example.com"));
        assert!(screen.contains("user3@example.com"));
        assert!(screen.contains("Admin"));
        assert!(screen.contains("2FA Enabled"));
        assert!(screen.contains("2FA Disabled"));
        assert!(screen.contains("Showing 1 to 3 of 3 results."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_hides_rows_and_footer() {
        let mut view = view_over(RejectingSource);
        let now = Instant::now();
        view.mount(now);
        view.next_completion().await;

        let screen = render(&view, now);
        assert!(screen.contains("rejected the configured API key"));
        assert!(!screen.contains("Showing"));
        assert!(!screen.contains("@example.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_toolbar_appears_with_selection() {
        let mut view = view_over(StubSource::new(3, 10));
        let now = Instant::now();
        view.mount(now);
        view.next_completion().await;
        view.tick(now);
        assert!(!render(&view, now).contains("Suspend"));

        view.toggle_all();
        view.tick(now);
        let settled = now + Duration::from_millis(100);
        let screen = render(&view, settled);
        assert!(screen.contains("Suspend"));
        assert!(screen.contains("Delete"));
        assert!(screen.contains("[x]"));
        assert!(screen.contains("3 selected"));
    }
}
