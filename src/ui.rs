use crate::app::{App, DashboardMode, EDIT_FIELD_LABELS, EditForm};
use crate::audio::AudioEngine;
use crate::model::{SidebarView, Track};
use crate::nav::View;
use crate::session::SessionState;
use ratatui::prelude::*;
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState,
    Wrap,
};
use std::rc::Rc;

const APP_TITLE_WITH_VERSION: &str = "Musikipri v0.1.0  ";
const SIDEBAR_WIDTH: u16 = 20;

#[derive(Clone, Copy)]
struct Palette {
    bg: Color,
    panel_bg: Color,
    panel_alt_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
    liked: Color,
    selected_bg: Color,
    popup_bg: Color,
}

const COLORS: Palette = Palette {
    bg: Color::Rgb(10, 15, 24),
    panel_bg: Color::Rgb(19, 29, 43),
    panel_alt_bg: Color::Rgb(24, 38, 58),
    border: Color::Rgb(69, 121, 176),
    text: Color::Rgb(214, 228, 248),
    muted: Color::Rgb(149, 173, 204),
    accent: Color::Rgb(100, 203, 184),
    alert: Color::Rgb(249, 174, 88),
    liked: Color::Rgb(255, 122, 165),
    selected_bg: Color::Rgb(34, 55, 82),
    popup_bg: Color::Rgb(22, 33, 51),
};

fn screen_chunks(area: Rect) -> Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area)
}

fn player_body(area: Rect) -> Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(SIDEBAR_WIDTH),
            Constraint::Min(30),
            Constraint::Percentage(30),
        ])
        .split(area)
}

/// Screen area of the player's track list, for mouse hit-testing.
pub fn track_list_rect(area: Rect) -> Rect {
    player_body(screen_chunks(area)[1])[1]
}

pub fn draw(frame: &mut Frame, app: &App, audio: &dyn AudioEngine) {
    frame.render_widget(
        Block::default().style(Style::default().bg(COLORS.bg)),
        frame.area(),
    );

    let vertical = screen_chunks(frame.area());
    draw_header(frame, app, vertical[0]);

    match app.nav.view() {
        View::Player => {
            draw_player(frame, app, vertical[1]);
            draw_timeline(frame, app, audio, vertical[2]);
        }
        View::AdminLogin => {
            draw_login(frame, app, vertical[1].union(vertical[2]));
        }
        View::AdminDashboard => {
            draw_dashboard(frame, app, vertical[1].union(vertical[2]));
        }
    }

    draw_footer(frame, app, vertical[3]);

    if let Some(message) = app.session.toast.visible_message() {
        draw_toast(frame, message);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    frame.render_widget(
        panel_block("Status", COLORS.panel_bg, COLORS.text, COLORS.border),
        area,
    );

    let inner = area.inner(Margin {
        vertical: 1,
        horizontal: 1,
    });
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(inner);

    let view_label = match app.nav.view() {
        View::Player => app.sidebar.label(),
        View::AdminLogin => "Admin Login",
        View::AdminDashboard => "Admin Dashboard",
    };
    let left = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE_WITH_VERSION,
            Style::default()
                .fg(COLORS.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("Tracks {}", app.catalog.len()),
            Style::default().fg(COLORS.text),
        ),
        Span::styled("  |  ", Style::default().fg(COLORS.muted)),
        Span::styled(view_label, Style::default().fg(COLORS.alert)),
    ]));
    frame.render_widget(left, chunks[0]);

    let search_style = if app.searching {
        Style::default()
            .fg(COLORS.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(COLORS.muted)
    };
    let search_text = match (app.searching, app.search.is_empty()) {
        (true, _) => format!("Search: {}_", app.search),
        (false, true) => String::from("Press / to search songs or artists"),
        (false, false) => format!("Search: {}", app.search),
    };
    let right = Paragraph::new(Span::styled(search_text, search_style)).alignment(Alignment::Right);
    frame.render_widget(right, chunks[1]);
}

fn draw_player(frame: &mut Frame, app: &App, area: Rect) {
    let body = player_body(area);
    draw_sidebar(frame, app.sidebar, body[0]);
    draw_track_list(frame, app, body[1]);
    draw_song_info(frame, app, body[2]);
}

fn draw_sidebar(frame: &mut Frame, current: SidebarView, area: Rect) {
    let items: Vec<ListItem> = SidebarView::ALL
        .iter()
        .map(|view| {
            let color = if *view == SidebarView::LikedSongs {
                COLORS.liked
            } else {
                COLORS.text
            };
            ListItem::new(Span::styled(view.label(), Style::default().fg(color)))
        })
        .collect();

    let mut state = ListState::default();
    state.select(SidebarView::ALL.iter().position(|view| *view == current));

    let list = List::new(items)
        .block(panel_block(
            "Browse",
            COLORS.panel_alt_bg,
            COLORS.text,
            COLORS.border,
        ))
        .highlight_style(
            Style::default()
                .fg(COLORS.accent)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_track_list(frame: &mut Frame, app: &App, area: Rect) {
    let current = app.session.current_track_id(&app.catalog);
    let tracks = app.visible_tracks();

    let items: Vec<ListItem> = tracks
        .iter()
        .map(|track| {
            let marker = if Some(track.id) == current {
                "  > "
            } else {
                "    "
            };
            let heart = if app.session.is_liked(track.id) {
                " <3"
            } else {
                ""
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(COLORS.accent)),
                Span::styled(track.title.as_str(), Style::default().fg(COLORS.text)),
                Span::styled(
                    format!("  {}", track.artist),
                    Style::default().fg(COLORS.muted),
                ),
                Span::styled(
                    format!("  {}", format_seconds(track.duration_seconds)),
                    Style::default().fg(COLORS.muted),
                ),
                Span::styled(heart, Style::default().fg(COLORS.liked)),
            ]))
        })
        .collect();

    let title = if app.search.trim().is_empty() {
        app.sidebar.label().to_string()
    } else {
        format!("Results for \"{}\"", app.search.trim())
    };

    if items.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No songs here yet",
            Style::default().fg(COLORS.muted),
        ))
        .block(panel_block(
            &title,
            COLORS.panel_bg,
            COLORS.text,
            COLORS.border,
        ));
        frame.render_widget(empty, area);
        return;
    }

    let mut state = ListState::default();
    state.select(Some(app.selected.min(items.len() - 1)));

    let list = List::new(items)
        .block(panel_block(
            &title,
            COLORS.panel_bg,
            COLORS.text,
            COLORS.border,
        ))
        .highlight_style(
            Style::default()
                .bg(COLORS.selected_bg)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("-> ");
    frame.render_stateful_widget(list, area, &mut state);
}

fn track_lines<'a>(label: &'a str, track: Option<&'a Track>) -> Vec<Line<'a>> {
    let field = |value: Option<&'a str>| value.unwrap_or("-");
    vec![
        Line::from(vec![
            Span::styled(
                label,
                Style::default()
                    .fg(COLORS.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", field(track.map(|t| t.title.as_str()))),
                Style::default().fg(COLORS.text),
            ),
        ]),
        Line::from(Span::styled(
            format!("Artist  {}", field(track.map(|t| t.artist.as_str()))),
            Style::default().fg(COLORS.muted),
        )),
        Line::from(Span::styled(
            format!("Album   {}", field(track.map(|t| t.album.as_str()))),
            Style::default().fg(COLORS.muted),
        )),
    ]
}

fn draw_song_info(frame: &mut Frame, app: &App, area: Rect) {
    let now_playing = app.session.current_track(&app.catalog);
    let queue_position = app
        .session
        .current_index()
        .map(|idx| format!("{}/{}", idx + 1, app.session.queue().len()))
        .unwrap_or_else(|| format!("-/{}", app.session.queue().len()));
    let cover = now_playing
        .map(|track| track.cover_art.to_string())
        .unwrap_or_else(|| String::from("-"));

    let mut lines = track_lines("Now", now_playing);
    lines.push(Line::from(Span::styled(
        format!("Queue   {queue_position}"),
        Style::default().fg(COLORS.alert),
    )));
    lines.push(Line::from(Span::styled(
        format!("Cover   {cover}"),
        Style::default().fg(COLORS.muted),
    )));
    lines.push(Line::from(""));
    lines.extend(track_lines("Selected", app.selected_track()));

    let info = Paragraph::new(lines)
        .block(panel_block(
            "Song Info",
            COLORS.panel_alt_bg,
            COLORS.text,
            COLORS.border,
        ))
        .wrap(Wrap { trim: true });
    frame.render_widget(info, area);
}

fn draw_timeline(frame: &mut Frame, app: &App, audio: &dyn AudioEngine, area: Rect) {
    let state = match app.session.state(&app.catalog) {
        SessionState::Idle => "Stopped",
        SessionState::Paused => "Paused",
        SessionState::Playing => "Playing",
    };
    let text = format!(
        "{state:<8} {}  |  Shuffle {}  Repeat {}  |  Out {}",
        timeline_line(
            app.session.position_seconds,
            app.session.duration_seconds,
            app.session.volume(),
            26,
            14,
        ),
        on_off(app.session.shuffle),
        on_off(app.session.repeat),
        audio.output_name().unwrap_or_else(|| String::from("-")),
    );
    let timeline = Paragraph::new(Span::styled(text, Style::default().fg(COLORS.text)))
        .block(panel_block(
            "Timeline",
            COLORS.panel_bg,
            COLORS.text,
            COLORS.border,
        ))
        .wrap(Wrap { trim: true });
    frame.render_widget(timeline, area);
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let keys = match (app.nav.view(), &app.dashboard_mode) {
        (View::Player, _) if app.searching => "Type to search, Enter keep, Esc clear",
        (View::Player, _) => {
            "Enter play, Space pause, n/b next/prev, arrows seek, +/- vol, m mute, s shuffle, r repeat, l/L like row/playing, Tab view, a admin, q quit"
        }
        (View::AdminLogin, _) => "Type password, Enter sign in, Esc back",
        (View::AdminDashboard, DashboardMode::Browse) => {
            "a add files, e edit, d delete, Esc player, o log out, Ctrl+C quit"
        }
        (View::AdminDashboard, DashboardMode::AddPrompt(_)) => "Enter import, Esc cancel",
        (View::AdminDashboard, DashboardMode::Edit(_)) => "Tab next field, Enter save, Esc cancel",
        (View::AdminDashboard, DashboardMode::ConfirmDelete(_)) => "y delete, n keep",
    };

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(keys, Style::default().fg(COLORS.muted)),
        Span::styled("  |  ", Style::default().fg(COLORS.muted)),
        Span::styled(app.status.as_str(), Style::default().fg(COLORS.text)),
    ]))
    .block(panel_block(
        "Message",
        COLORS.panel_bg,
        COLORS.text,
        COLORS.border,
    ));
    frame.render_widget(footer, area);
}

fn draw_login(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect(area, 50, 60);
    frame.render_widget(Clear, popup);

    let mut lines = vec![
        Line::from(Span::styled(
            "Sign in to manage the catalog",
            Style::default().fg(COLORS.muted),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Password  ", Style::default().fg(COLORS.accent)),
            Span::styled(
                format!("{}_", "*".repeat(app.login.password.chars().count())),
                Style::default().fg(COLORS.text),
            ),
        ]),
    ];
    if let Some(error) = &app.login.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            error.as_str(),
            Style::default()
                .fg(COLORS.alert)
                .add_modifier(Modifier::BOLD),
        )));
    }

    let form = Paragraph::new(lines)
        .block(panel_block(
            "Admin Login",
            COLORS.popup_bg,
            COLORS.text,
            COLORS.border,
        ))
        .wrap(Wrap { trim: true });
    frame.render_widget(form, popup);
}

fn draw_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(["#", "Title / Artist", "Album", "Duration"]).style(
        Style::default()
            .fg(COLORS.accent)
            .add_modifier(Modifier::BOLD),
    );
    let rows: Vec<Row> = app
        .catalog
        .list()
        .iter()
        .enumerate()
        .map(|(idx, track)| {
            Row::new(vec![
                Cell::from((idx + 1).to_string()),
                Cell::from(Line::from(vec![
                    Span::styled(track.title.as_str(), Style::default().fg(COLORS.text)),
                    Span::styled(
                        format!("  {}", track.artist),
                        Style::default().fg(COLORS.muted),
                    ),
                ])),
                Cell::from(track.album.as_str()),
                Cell::from(format_seconds(track.duration_seconds)),
            ])
            .style(Style::default().fg(COLORS.text))
        })
        .collect();

    let title = if app.is_importing() {
        String::from("Manage Songs (Processing...)")
    } else {
        String::from("Manage Songs")
    };
    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Percentage(50),
            Constraint::Percentage(30),
            Constraint::Length(9),
        ],
    )
    .header(header)
    .block(panel_block(
        &title,
        COLORS.panel_bg,
        COLORS.text,
        COLORS.border,
    ))
    .row_highlight_style(
        Style::default()
            .bg(COLORS.selected_bg)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("-> ");

    let mut state = TableState::default();
    if !app.catalog.is_empty() {
        state.select(Some(app.dashboard_selected.min(app.catalog.len() - 1)));
    }
    frame.render_stateful_widget(table, area, &mut state);

    match &app.dashboard_mode {
        DashboardMode::Browse => {}
        DashboardMode::AddPrompt(input) => draw_add_prompt(frame, input, area),
        DashboardMode::Edit(form) => draw_edit_form(frame, form, area),
        DashboardMode::ConfirmDelete(id) => {
            let title = app
                .catalog
                .get(*id)
                .map_or("this song", |track| track.title.as_str());
            draw_confirm(frame, title, area);
        }
    }
}

fn draw_add_prompt(frame: &mut Frame, input: &str, area: Rect) {
    let popup = centered_rect(area, 70, 40);
    frame.render_widget(Clear, popup);

    let prompt = Paragraph::new(vec![
        Line::from(Span::styled(
            "Audio files or folders, quote paths that contain spaces",
            Style::default().fg(COLORS.muted),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("{input}_"),
            Style::default().fg(COLORS.text),
        )),
    ])
    .block(panel_block(
        "Add Songs",
        COLORS.popup_bg,
        COLORS.text,
        COLORS.border,
    ))
    .wrap(Wrap { trim: false });
    frame.render_widget(prompt, popup);
}

fn draw_edit_form(frame: &mut Frame, form: &EditForm, area: Rect) {
    let popup = centered_rect(area, 60, 50);
    frame.render_widget(Clear, popup);

    let lines: Vec<Line> = EDIT_FIELD_LABELS
        .iter()
        .zip(form.fields.iter())
        .enumerate()
        .map(|(idx, (label, value))| {
            let focused = idx == form.focus;
            let label_style = if focused {
                Style::default()
                    .fg(COLORS.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(COLORS.muted)
            };
            let cursor = if focused { "_" } else { "" };
            Line::from(vec![
                Span::styled(format!("{label:<8}"), label_style),
                Span::styled(format!("{value}{cursor}"), Style::default().fg(COLORS.text)),
            ])
        })
        .collect();

    let modal = Paragraph::new(lines).block(panel_block(
        "Edit Song",
        COLORS.popup_bg,
        COLORS.text,
        COLORS.border,
    ));
    frame.render_widget(modal, popup);
}

fn draw_confirm(frame: &mut Frame, title: &str, area: Rect) {
    let popup = centered_rect(area, 60, 30);
    frame.render_widget(Clear, popup);

    let dialog = Paragraph::new(Span::styled(
        format!("Delete {title}? This cannot be undone. (y/n)"),
        Style::default()
            .fg(COLORS.alert)
            .add_modifier(Modifier::BOLD),
    ))
    .block(panel_block(
        "Confirm",
        COLORS.popup_bg,
        COLORS.text,
        COLORS.border,
    ))
    .wrap(Wrap { trim: true });
    frame.render_widget(dialog, popup);
}

fn draw_toast(frame: &mut Frame, message: &str) {
    let area = frame.area();
    let width = (message.chars().count() as u16)
        .saturating_add(4)
        .min(area.width);
    let toast = Rect {
        x: area.x + area.width.saturating_sub(width + 1),
        y: area.y.saturating_add(1),
        width,
        height: 3.min(area.height),
    };
    frame.render_widget(Clear, toast);
    frame.render_widget(
        Paragraph::new(Span::styled(message, Style::default().fg(COLORS.text))).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(COLORS.accent))
                .style(Style::default().bg(COLORS.popup_bg)),
        ),
        toast,
    );
}

fn panel_block(title: &str, bg: Color, text: Color, border: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(bg))
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

/// `m:ss`, the way track lengths are listed.
pub fn format_seconds(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

fn progress_bar(ratio: Option<f64>, width: usize) -> String {
    let clamped = ratio.unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = (clamped * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&"-".repeat(width.saturating_sub(filled)));
    bar.push(']');
    bar
}

fn timeline_line(
    position: f64,
    duration: f64,
    volume: f32,
    timeline_bar_width: usize,
    volume_bar_width: usize,
) -> String {
    let ratio = (duration > 0.0).then(|| (position / duration).clamp(0.0, 1.0));
    let total = if duration > 0.0 {
        format_seconds(duration)
    } else {
        String::from("-:--")
    };

    format!(
        "{} / {} {}  |  Vol {} {:>3}%",
        format_seconds(position),
        total,
        progress_bar(ratio, timeline_bar_width),
        progress_bar(Some(f64::from(volume)), volume_bar_width),
        (volume * 100.0).round() as u16
    )
}
