//! Terminal UI rendering using ratatui.
//!
//! Each view is implemented in its own submodule with a `render` function.
//!
//! ## Submodules
//!
//! - [`overview`]: Metric cards, channel info and the latest log line
//! - [`charts`]: Moisture, ADC, battery, signal and attempt charts
//! - [`readings`]: Newest-first table of individual readings
//! - [`detail`]: Modal overlay showing every field of one reading
//! - [`common`]: Shared components (header, tabs, freshness banner, status bar, help)
//! - [`theme`]: Light/dark theme support with terminal auto-detection
//!
//! ## Rendering Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! ├──────────────────────────────────────┤
//! │ Tabs (common::render_tabs)           │
//! ├──────────────────────────────────────┤
//! │ Freshness (common::render_banner)    │
//! ├──────────────────────────────────────┤
//! │                                      │
//! │ View Content                         │
//! │ (overview/charts/readings::render)   │
//! │                                      │
//! ├──────────────────────────────────────┤
//! │ Status Bar (common::render_status)   │
//! └──────────────────────────────────────┘
//!         ↑
//!    Overlays rendered on top:
//!    - detail::render_overlay
//!    - common::render_help
//! ```

pub mod charts;
pub mod common;
pub mod detail;
pub mod overview;
pub mod readings;
pub mod theme;

pub use theme::Theme;

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::Frame;

use crate::app::{App, View};

/// Draw one full frame: chrome, the current view and any overlays.
pub fn draw(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::vertical([
        Constraint::Length(1), // Header bar
        Constraint::Length(1), // Tabs
        Constraint::Length(1), // Freshness banner
        Constraint::Min(8),    // Content
        Constraint::Length(1), // Status bar
    ])
    .split(area);

    common::render_header(frame, app, chunks[0]);
    common::render_tabs(frame, app, chunks[1]);
    common::render_banner(frame, app, chunks[2]);

    match app.current_view {
        View::Overview => overview::render(frame, app, chunks[3]),
        View::Charts => charts::render(frame, app, chunks[3]),
        View::Readings => readings::render(frame, app, chunks[3]),
    }

    common::render_status_bar(frame, app, chunks[4]);

    if app.show_detail_overlay {
        detail::render_overlay(frame, app, area);
    }
    if app.show_help {
        common::render_help(frame, app, area);
    }
}
