//! Overview view rendering.
//!
//! Five metric cards on top, channel information and the most recent
//! reading's log line below.

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::common::{format_value, render_placeholder};
use crate::app::App;
use crate::data::status::latest;
use crate::data::{DashboardData, DerivedSignal, LOW_BATTERY_VOLTS};

/// Render the Overview view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref data) = app.data else {
        render_placeholder(frame, app, area, "Overview");
        return;
    };

    let chunks = Layout::vertical([
        Constraint::Length(5), // Metric cards
        Constraint::Min(4),    // Channel info + latest reading
    ])
    .split(area);

    render_cards(frame, app, data, chunks[0]);

    let lower = Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[1]);
    render_channel_info(frame, app, data, lower[0]);
    render_latest(frame, app, data, lower[1]);
}

fn render_cards(frame: &mut Frame, app: &App, data: &DashboardData, area: Rect) {
    let stats = &data.stats;
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let battery_style = if stats.low_battery {
        Style::default().fg(app.theme.warning).add_modifier(Modifier::BOLD)
    } else {
        bold
    };
    let battery_note = if stats.low_battery {
        format!("below {:.1} V", LOW_BATTERY_VOLTS)
    } else {
        String::new()
    };

    let retry_style = if stats.retry_count > 0 {
        Style::default().fg(app.theme.critical).add_modifier(Modifier::BOLD)
    } else {
        bold
    };

    let cards = [
        ("Moisture", format!("{:.1}%", stats.current_moisture), bold, String::new()),
        ("Battery", format!("{:.2} V", stats.current_battery), battery_style, battery_note),
        ("Avg Moisture", format!("{:.1}%", stats.average_moisture), bold, String::new()),
        ("Retries", stats.retry_count.to_string(), retry_style, String::new()),
        ("Readings", stats.total_readings.to_string(), bold, String::new()),
    ];

    let areas = Layout::horizontal([Constraint::Ratio(1, 5); 5]).split(area);
    for ((title, value, style, note), card_area) in cards.into_iter().zip(areas.iter()) {
        let block = Block::default()
            .title(format!(" {} ", title))
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(Style::default().fg(app.theme.border));

        let lines = vec![
            Line::from(Span::styled(value, style)),
            Line::from(Span::styled(note, Style::default().fg(app.theme.warning))),
        ];
        let card = Paragraph::new(lines).alignment(Alignment::Center).block(block);
        frame.render_widget(card, *card_area);
    }
}

fn render_channel_info(frame: &mut Frame, app: &App, data: &DashboardData, area: Rect) {
    let dim = Style::default().add_modifier(Modifier::DIM);
    let field = |label: &'static str, value: String| {
        Line::from(vec![Span::styled(format!(" {:<12}", label), dim), Span::raw(value)])
    };

    let channel = data.channel.as_ref();
    let text = |value: Option<&String>| value.cloned().unwrap_or_else(|| "-".to_string());

    let mut lines = vec![
        Line::from(Span::styled(
            format!(" {}", data.channel_title()),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        field("Channel id", channel.and_then(|c| c.id).map_or("-".into(), |id| id.to_string())),
        field("Description", text(channel.and_then(|c| c.description.as_ref()))),
        field("Created", text(channel.and_then(|c| c.created_at.as_ref()))),
        field(
            "Last entry",
            channel.and_then(|c| c.last_entry_id).map_or("-".into(), |id| id.to_string()),
        ),
        field("Loaded", data.loaded_at.format("%Y-%m-%d %H:%M:%S").to_string()),
        field("Source", app.source_description().to_string()),
    ];

    let labels: Vec<String> = (1..=8)
        .filter_map(|n| data.field_label(n).map(|label| format!("{}={}", n, label)))
        .collect();
    if !labels.is_empty() {
        lines.push(field("Fields", labels.join(" ")));
    }

    let block = Block::default()
        .title(" Channel ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_latest(frame: &mut Frame, app: &App, data: &DashboardData, area: Rect) {
    let Some(record) = latest(&data.records) else {
        render_placeholder(frame, app, area, "Latest Reading");
        return;
    };
    let signal = DerivedSignal::from_record(record);
    let dim = Style::default().add_modifier(Modifier::DIM);

    let signal_text = match signal.signal_dbm {
        Some(dbm) => format!("{} dBm", dbm),
        None => "-".to_string(),
    };
    let log = if record.signal_text.is_empty() {
        Span::styled("(no log message)", dim)
    } else {
        Span::raw(record.signal_text.clone())
    };

    let block = Block::default()
        .title(" Latest Reading ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let lines = vec![
        Line::from(vec![
            Span::styled(" Time     ", dim),
            Span::raw(record.timestamp.display()),
        ]),
        Line::from(vec![
            Span::styled(" Status   ", dim),
            Span::styled(
                signal.attempts.label.clone(),
                app.theme.attempt_style(signal.attempts.class),
            ),
            Span::raw(format!("  ({} attempt(s))", signal.attempts.count)),
        ]),
        Line::from(vec![
            Span::styled(" Moisture ", dim),
            Span::raw(format_value(record.moisture, 1)),
            Span::styled("  Battery ", dim),
            Span::raw(format_value(record.battery_voltage, 2)),
            Span::styled("  Signal ", dim),
            Span::styled(signal_text, Style::default().fg(app.theme.signal)),
        ]),
        Line::from(""),
        Line::from(Span::styled(" Log", dim)),
        Line::from(vec![Span::raw(" "), log]),
    ];

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}
