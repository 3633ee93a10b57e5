//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, freshness banner, status
//! bar, and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, View};
use crate::data::duration::{format_age, format_hours};
use crate::data::Freshness;

/// Render the header bar with the channel overview.
///
/// Displays: freshness dot, channel name, reading and retry counts.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let title = Span::styled(" FEEDWATCH ", Style::default().add_modifier(Modifier::BOLD));

    let Some(ref data) = app.data else {
        let status = if app.load_error.is_some() { "| No data" } else { "| Loading..." };
        frame.render_widget(Paragraph::new(Line::from(vec![title, Span::raw(status)])), area);
        return;
    };

    let freshness = data.freshness();
    let retries = data.stats.retry_count;

    let line = Line::from(vec![
        Span::styled(" ● ", app.theme.freshness_style(freshness.state)),
        Span::styled(
            format!("{} ", data.channel_title()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("│ "),
        Span::styled(
            data.stats.total_readings.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" readings │ "),
        if retries > 0 {
            Span::styled(retries.to_string(), Style::default().fg(app.theme.critical))
        } else {
            Span::styled("0", Style::default().add_modifier(Modifier::DIM))
        },
        Span::raw(" retries │ every "),
        Span::raw(format_hours(data.expected_interval_hours)),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the tab bar showing available views.
///
/// Highlights the currently active view.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = View::ALL
        .iter()
        .enumerate()
        .map(|(i, view)| Line::from(format!("{} {}", i + 1, view.label())))
        .collect();

    let tabs = Tabs::new(titles)
        .select(app.current_view.index())
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("│");

    frame.render_widget(tabs, area);
}

/// Render the freshness banner for the latest reading.
pub fn render_banner(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref data) = app.data else {
        return;
    };

    let freshness = data.freshness();
    let mut style = app.theme.freshness_style(freshness.state);
    if freshness.state != Freshness::Normal {
        style = style.add_modifier(Modifier::REVERSED);
    }

    let line = Line::from(Span::styled(
        format!(" {} {} ", freshness.state.symbol(), freshness.message),
        style,
    ));
    frame.render_widget(Paragraph::new(line), area);
}

/// Render the status bar at the bottom.
///
/// Shows: source, time since last update, refresh mode, available controls.
/// Also displays temporary status messages and errors.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    // A failed refresh keeps the old data on screen; say so
    if let Some(ref err) = app.load_error {
        let paragraph = Paragraph::new(format!(" Error: {} | r:retry q:quit", err))
            .style(Style::default().fg(app.theme.critical));
        frame.render_widget(paragraph, area);
        return;
    }

    let status = if let Some(ref data) = app.data {
        let refresh = match app.auto_refresh {
            Some(interval) => format!("auto {}", format_age(interval)),
            None => "manual".to_string(),
        };

        let controls = match app.current_view {
            View::Readings => "↑↓:select Enter:detail r:refresh e:export ?:help q:quit",
            _ => "Tab:switch r:refresh e:export ?:help q:quit",
        };

        format!(
            " {} | Updated {} ago ({}) | {}",
            app.source_description(),
            format_age(data.last_updated.elapsed()),
            refresh,
            controls,
        )
    } else {
        format!(" {} | Loading... | q:quit", app.source_description())
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(title, Style::default().add_modifier(Modifier::BOLD))])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Navigation"),
        Line::from("  Tab ←/→ h/l Switch views"),
        Line::from("  1 2 3       Overview/Charts/Readings"),
        Line::from("  ↑/↓ j/k     Select reading"),
        Line::from("  PgUp/PgDn   Jump 10 readings"),
        Line::from("  Home/End    Newest/oldest"),
        Line::from("  Enter       Reading detail"),
        Line::from("  Esc         Go back"),
        Line::from(""),
        section(" General"),
        Line::from("  r         Refresh now"),
        Line::from("  e         Export CSV"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    let help_width = 44u16.min(area.width.saturating_sub(4));
    let help_height = 20u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}

/// Format an optional measurement, "-" when absent.
pub fn format_value(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "-".to_string(),
    }
}

/// Placeholder for views that have nothing to show yet.
pub fn render_placeholder(frame: &mut Frame, app: &App, area: Rect, title: &str) {
    let text = match (&app.data, &app.load_error) {
        (Some(_), _) => "No data available",
        (None, Some(_)) => "No data loaded. Press r to retry.",
        (None, None) => "Loading...",
    };

    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));
    let paragraph = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(format!("  {}", text), Style::default().add_modifier(Modifier::DIM))),
    ])
    .block(block);
    frame.render_widget(paragraph, area);
}
