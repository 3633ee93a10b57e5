//! Detail overlay rendering.
//!
//! Displays a modal overlay with every field of the selected reading.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::common::format_value;
use crate::app::App;
use crate::data::LOW_BATTERY_VOLTS;

/// Minimum width required for the detail overlay to render properly.
const MIN_OVERLAY_WIDTH: u16 = 50;
/// Minimum height required for the detail overlay to render properly.
const MIN_OVERLAY_HEIGHT: u16 = 16;

/// Render the selected reading as a modal overlay.
pub fn render_overlay(frame: &mut Frame, app: &App, area: Rect) {
    if area.width < MIN_OVERLAY_WIDTH || area.height < MIN_OVERLAY_HEIGHT {
        return;
    }

    let Some(ref data) = app.data else {
        return;
    };
    let Some((record, signal)) = app.selected_reading() else {
        return;
    };

    let overlay_width = (area.width * 80 / 100).clamp(MIN_OVERLAY_WIDTH, 90);
    let overlay_height = (area.height * 80 / 100).clamp(MIN_OVERLAY_HEIGHT, 26);
    let x = area.x + (area.width.saturating_sub(overlay_width)) / 2;
    let y = area.y + (area.height.saturating_sub(overlay_height)) / 2;
    let overlay_area = Rect::new(x, y, overlay_width, overlay_height);

    frame.render_widget(Clear, overlay_area);

    let dim = Style::default().add_modifier(Modifier::DIM);
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let field = |label: String, value: Span<'static>| {
        Line::from(vec![Span::styled(format!(" {:<16}", label), dim), value])
    };

    let battery_style = match record.battery_voltage {
        Some(v) if v < LOW_BATTERY_VOLTS => Style::default().fg(app.theme.warning),
        _ => Style::default(),
    };
    let code = record.status_code.map_or_else(|| "-".to_string(), |c| c.to_string());
    let dbm = signal.signal_dbm.map_or_else(|| "-".to_string(), |d| format!("{} dBm", d));

    let mut lines = vec![
        Line::from(Span::styled(format!(" {}", record.timestamp.display()), bold)),
        Line::from(""),
        field(
            "Entry id".into(),
            Span::raw(record.entry_id.map_or_else(|| "-".to_string(), |id| id.to_string())),
        ),
        field("Timestamp".into(), Span::raw(record.timestamp.to_export_string())),
        field("Moisture".into(), Span::raw(format_value(record.moisture, 1))),
        field("ADC".into(), Span::raw(format_value(record.adc, 0))),
        field(
            "Battery (V)".into(),
            Span::styled(format_value(record.battery_voltage, 2), battery_style),
        ),
        field("Status code".into(), Span::raw(code)),
        field(
            "Status".into(),
            Span::styled(
                signal.attempts.label.clone(),
                app.theme.attempt_style(signal.attempts.class),
            ),
        ),
        field(
            "Attempts".into(),
            Span::raw(format!("{} ({})", signal.attempts.count, signal.attempts.class.as_str())),
        ),
        field("WiFi signal".into(), Span::styled(dbm, Style::default().fg(app.theme.signal))),
    ];

    for (i, value) in record.aux.iter().enumerate() {
        let n = i + 5;
        let label = match data.field_label(n) {
            Some(label) => label.to_string(),
            None => format!("Field {}", n),
        };
        lines.push(field(label, Span::raw(format_value(*value, 2))));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(" Log message", dim)));
    lines.push(if record.signal_text.is_empty() {
        Line::from(Span::styled(" (none)", dim))
    } else {
        Line::from(format!(" {}", record.signal_text))
    });

    let block = Block::default()
        .title(format!(
            " Reading {}/{} ",
            app.selected_row + 1,
            data.records.len()
        ))
        .title_bottom(Line::from(" ↑↓:prev/next  Esc:close ").right_aligned())
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, overlay_area);
}
