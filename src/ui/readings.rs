//! Readings view rendering.
//!
//! Displays every reading newest first, with the selected row opening the
//! detail overlay.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};

use super::common::{format_value, render_placeholder};
use crate::app::App;
use crate::data::LOW_BATTERY_VOLTS;

/// Render the Readings view as a selectable table.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref data) = app.data else {
        render_placeholder(frame, app, area, "Readings");
        return;
    };
    if data.is_empty() {
        render_placeholder(frame, app, area, "Readings");
        return;
    }

    let header = Row::new(vec![
        Cell::from("Time"),
        Cell::from("Moisture"),
        Cell::from("ADC"),
        Cell::from("Battery"),
        Cell::from("Status"),
        Cell::from("Signal"),
        Cell::from("Log"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = data
        .newest_first()
        .map(|(record, signal)| {
            let battery_style = match record.battery_voltage {
                Some(v) if v < LOW_BATTERY_VOLTS => Style::default().fg(app.theme.warning),
                _ => Style::default(),
            };
            let status_style = app.theme.attempt_style(signal.attempts.class);
            let dbm = signal.signal_dbm.map_or_else(|| "-".to_string(), |d| d.to_string());

            Row::new(vec![
                Cell::from(record.timestamp.display()),
                Cell::from(format_value(record.moisture, 1)),
                Cell::from(format_value(record.adc, 0)),
                Cell::from(format_value(record.battery_voltage, 2)).style(battery_style),
                Cell::from(signal.attempts.label.clone()).style(status_style),
                Cell::from(dbm),
                Cell::from(record.signal_text.clone())
                    .style(Style::default().add_modifier(Modifier::DIM)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(19), // Time
        Constraint::Length(8),  // Moisture
        Constraint::Length(6),  // ADC
        Constraint::Length(7),  // Battery
        Constraint::Length(20), // Status
        Constraint::Length(6),  // Signal
        Constraint::Fill(1),    // Log
    ];

    let total = data.records.len();
    let selected = app.selected_row.min(total.saturating_sub(1));
    let title = format!(" Readings ({}) [{}/{}] ", total, selected + 1, total);

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(selected));

    frame.render_stateful_widget(table, area, &mut state);
}
