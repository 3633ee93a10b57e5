//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::{AttemptClass, Freshness};

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Color for overdue updates and low battery.
    pub warning: Color,
    /// Color for missed updates and retries.
    pub critical: Color,
    /// Color for normal status.
    pub healthy: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Line colors for the moisture, ADC, battery and signal charts.
    pub moisture: Color,
    pub adc: Color,
    pub battery: Color,
    pub signal: Color,
    /// Style for header rows in tables.
    pub header: Style,
    /// Style for selected/highlighted rows.
    pub selected: Style,
    /// Style for the active tab.
    pub tab_active: Style,
    /// Style for inactive tabs.
    pub tab_inactive: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            border: Color::Gray,
            moisture: Color::Green,
            adc: Color::Cyan,
            battery: Color::Yellow,
            signal: Color::Magenta,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::Gray),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            warning: Color::Rgb(191, 140, 0),
            critical: Color::Red,
            healthy: Color::Green,
            border: Color::DarkGray,
            moisture: Color::Green,
            adc: Color::Blue,
            battery: Color::Rgb(191, 140, 0),
            signal: Color::Magenta,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::DarkGray),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        // Use terminal-light crate to detect background luminance
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Get style for a freshness state
    pub fn freshness_style(&self, state: Freshness) -> Style {
        match state {
            Freshness::Normal => Style::default().fg(self.healthy),
            Freshness::Overdue => Style::default().fg(self.warning),
            Freshness::Missed => Style::default().fg(self.critical).add_modifier(Modifier::BOLD),
        }
    }

    /// Get style for a record's attempt class
    pub fn attempt_style(&self, class: AttemptClass) -> Style {
        match class {
            AttemptClass::Retry => Style::default().fg(self.critical),
            AttemptClass::Normal => Style::default().fg(self.healthy),
            AttemptClass::Unknown => Style::default().fg(self.highlight),
        }
    }

    /// Color for an attempt bar
    pub fn attempt_color(&self, class: AttemptClass) -> Color {
        match class {
            AttemptClass::Retry => self.critical,
            AttemptClass::Normal => self.healthy,
            AttemptClass::Unknown => self.highlight,
        }
    }
}
