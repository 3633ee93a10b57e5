//! Charts view rendering.
//!
//! Line charts for moisture, raw ADC, battery voltage and WiFi signal
//! against time, plus a bar per reading showing its connection attempts.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    symbols::Marker,
    text::Line,
    widgets::{Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

use super::common::render_placeholder;
use crate::app::App;
use crate::data::{DashboardData, Record, LOW_BATTERY_VOLTS};

const MOISTURE_BOUNDS: [f64; 2] = [0.0, 100.0];
const SIGNAL_BOUNDS: [f64; 2] = [-90.0, -40.0];

/// Width of one attempts bar ("HH:MM" labels) plus the gap after it.
const BAR_WIDTH: u16 = 5;
const BAR_GAP: u16 = 1;

type Series = Vec<(f64, f64)>;

/// Render the Charts view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref data) = app.data else {
        render_placeholder(frame, app, area, "Charts");
        return;
    };
    if data.is_empty() {
        render_placeholder(frame, app, area, "Charts");
        return;
    }

    let rows = Layout::vertical([
        Constraint::Percentage(37),
        Constraint::Percentage(37),
        Constraint::Percentage(26),
    ])
    .split(area);
    let top = Layout::horizontal([Constraint::Percentage(50); 2]).split(rows[0]);

    let moisture = series(&data.records, |r| r.moisture);
    let adc = series(&data.records, |r| r.adc);
    let battery = series(&data.records, |r| r.battery_voltage);
    let signal = signal_series(data);
    let x_bounds = time_bounds(data);
    let x_labels = time_labels(data);

    render_line_chart(
        frame,
        app,
        top[0],
        LineChart {
            title: "Moisture (%)",
            data: &moisture,
            color: app.theme.moisture,
            x_bounds,
            x_labels: x_labels.clone(),
            y_bounds: MOISTURE_BOUNDS,
            threshold: None,
        },
    );
    render_line_chart(
        frame,
        app,
        top[1],
        LineChart {
            title: "Raw ADC",
            data: &adc,
            color: app.theme.adc,
            x_bounds,
            x_labels: x_labels.clone(),
            y_bounds: padded_bounds(&adc, None),
            threshold: None,
        },
    );

    // The signal chart only appears when some reading carries a signal value
    let middle = if signal.is_empty() {
        Layout::horizontal([Constraint::Percentage(100)]).split(rows[1])
    } else {
        Layout::horizontal([Constraint::Percentage(50); 2]).split(rows[1])
    };

    render_line_chart(
        frame,
        app,
        middle[0],
        LineChart {
            title: "Battery (V)",
            data: &battery,
            color: app.theme.battery,
            x_bounds,
            x_labels: x_labels.clone(),
            y_bounds: padded_bounds(&battery, Some(LOW_BATTERY_VOLTS)),
            threshold: Some(LOW_BATTERY_VOLTS),
        },
    );
    if !signal.is_empty() {
        render_line_chart(
            frame,
            app,
            middle[1],
            LineChart {
                title: "WiFi Signal (dBm)",
                data: &signal,
                color: app.theme.signal,
                x_bounds,
                x_labels,
                y_bounds: SIGNAL_BOUNDS,
                threshold: None,
            },
        );
    }

    render_attempts(frame, app, data, rows[2]);
}

/// Parameters for one time series chart.
struct LineChart<'a> {
    title: &'a str,
    data: &'a [(f64, f64)],
    color: Color,
    x_bounds: [f64; 2],
    x_labels: Vec<String>,
    y_bounds: [f64; 2],
    /// Horizontal reference line, drawn in the warning color.
    threshold: Option<f64>,
}

fn render_line_chart(frame: &mut Frame, app: &App, area: Rect, chart: LineChart) {
    let threshold_line: Series = chart
        .threshold
        .map(|y| vec![(chart.x_bounds[0], y), (chart.x_bounds[1], y)])
        .unwrap_or_default();

    let mut datasets = vec![Dataset::default()
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(chart.color))
        .data(chart.data)];
    if !threshold_line.is_empty() {
        datasets.push(
            Dataset::default()
                .marker(Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(app.theme.warning))
                .data(&threshold_line),
        );
    }

    let title = if chart.data.is_empty() {
        format!(" {} (no data) ", chart.title)
    } else {
        format!(" {} ", chart.title)
    };

    let [y_min, y_max] = chart.y_bounds;
    let widget = Chart::new(datasets)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .x_axis(
            Axis::default()
                .bounds(chart.x_bounds)
                .labels(chart.x_labels)
                .style(Style::default().fg(app.theme.border)),
        )
        .y_axis(
            Axis::default()
                .bounds(chart.y_bounds)
                .labels([axis_label(y_min), axis_label(y_max)])
                .style(Style::default().fg(app.theme.border)),
        );

    frame.render_widget(widget, area);
}

/// One bar per reading, most recent on the right, colored by attempt class.
fn render_attempts(frame: &mut Frame, app: &App, data: &DashboardData, area: Rect) {
    let capacity = (area.width.saturating_sub(2) / (BAR_WIDTH + BAR_GAP)).max(1) as usize;
    let skip = data.records.len().saturating_sub(capacity);

    let bars: Vec<Bar> = data
        .records
        .iter()
        .zip(&data.signals)
        .skip(skip)
        .map(|(record, signal)| {
            let color = app.theme.attempt_color(signal.attempts.class);
            Bar::default()
                .value(u64::from(signal.attempts.count))
                .label(Line::from(short_time(record)))
                .style(Style::default().fg(color))
                .value_style(Style::default().fg(Color::Black).bg(color))
        })
        .collect();

    let title = format!(
        " Connection Attempts (last {}, red = retry) ",
        bars.len()
    );
    let chart = BarChart::default()
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(BAR_WIDTH)
        .bar_gap(BAR_GAP)
        .max(2);

    frame.render_widget(chart, area);
}

/// Time axis value for a record: seconds since the epoch.
fn x_of(record: &Record) -> f64 {
    record.timestamp.to_utc().timestamp() as f64
}

/// Points for the records where `value` is present, in time order.
fn series(records: &[Record], value: impl Fn(&Record) -> Option<f64>) -> Series {
    let mut points: Series =
        records.iter().filter_map(|r| value(r).map(|v| (x_of(r), v))).collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    points
}

fn signal_series(data: &DashboardData) -> Series {
    let mut points: Series = data
        .records
        .iter()
        .zip(&data.signals)
        .filter_map(|(r, s)| s.signal_dbm.map(|dbm| (x_of(r), dbm as f64)))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    points
}

fn time_bounds(data: &DashboardData) -> [f64; 2] {
    let xs = data.records.iter().map(x_of);
    let min = xs.clone().fold(f64::INFINITY, f64::min);
    let max = xs.fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return [0.0, 1.0];
    }
    if max - min < 1.0 {
        // A single reading still needs a non-empty axis
        return [min - 1800.0, max + 1800.0];
    }
    [min, max]
}

fn time_labels(data: &DashboardData) -> Vec<String> {
    let mut records: Vec<&Record> = data.records.iter().collect();
    records.sort_by_key(|r| r.timestamp.to_utc());
    match (records.first(), records.last()) {
        (Some(first), Some(last)) => vec![label_time(first), label_time(last)],
        _ => Vec::new(),
    }
}

/// "MM-DD HH:MM" from the record's display time.
fn label_time(record: &Record) -> String {
    let display = record.timestamp.display();
    display.get(5..16).unwrap_or(&display).to_string()
}

/// "HH:MM" from the record's display time.
fn short_time(record: &Record) -> String {
    let display = record.timestamp.display();
    display.get(11..16).unwrap_or(&display).to_string()
}

/// Bounds around the data with some headroom, always including `include`.
fn padded_bounds(points: &[(f64, f64)], include: Option<f64>) -> [f64; 2] {
    let values = points.iter().map(|p| p.1).chain(include);
    let min = values.clone().fold(f64::INFINITY, f64::min);
    let max = values.fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return [0.0, 1.0];
    }
    let pad = ((max - min) * 0.1).max(0.1);
    [min - pad, max + pad]
}

fn axis_label(value: f64) -> String {
    if value.abs() >= 100.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}
