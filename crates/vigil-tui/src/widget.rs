//! Custom widgets for the Vigil TUI.
//!
//! Provides reusable widget components for the dashboard.

use std::time::Instant;

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, Clear, Paragraph, Row, StatefulWidget, Table, TableState, Widget,
        Wrap,
    },
};
use vigil_core::{AlertRecord, SeverityBucket};
use vigil_stream::StreamStatus;

use crate::surface::{AlertTable, Counter, SeverityChart, format_thousands};
use crate::theme::Theme;
use crate::toast::{Toast, ToastKind};

/// Text shown where a surface has not been mounted yet.
pub const LOADING: &str = "Loading...";

fn panel_block<'a>(title: &'a str, theme: &Theme, focused: bool) -> Block<'a> {
    let color = if focused {
        theme.colors.header
    } else {
        theme.colors.border_dim
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(Span::styled(
            format!(" {} ", title),
            Style::default().fg(theme.colors.header).add_modifier(Modifier::BOLD),
        ))
}

/// A stat card showing one counter.
#[derive(Debug)]
pub struct CounterCard<'a> {
    title: &'a str,
    counter: Option<&'a Counter>,
    now: Instant,
    color: Color,
    theme: &'a Theme,
}

impl<'a> CounterCard<'a> {
    pub fn new(
        title: &'a str,
        counter: Option<&'a Counter>,
        theme: &'a Theme,
        now: Instant,
    ) -> Self {
        Self {
            title,
            counter,
            now,
            color: theme.colors.text,
            theme,
        }
    }

    /// Set the value color.
    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn value_text(&self) -> String {
        self.counter
            .map_or_else(|| LOADING.to_string(), |c| c.display_text(self.now))
    }
}

impl Widget for CounterCard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = match self.counter {
            None => Style::default().fg(self.theme.colors.text_dim),
            Some(c) if c.value() == crate::surface::CounterValue::Error => {
                Style::default().fg(self.theme.colors.status_error)
            }
            Some(_) => Style::default().fg(self.color).add_modifier(Modifier::BOLD),
        };
        Paragraph::new(Line::from(Span::styled(self.value_text(), style)))
            .block(panel_block(self.title, self.theme, false))
            .render(area, buf);
    }
}

/// Horizontal bars, one per severity bucket.
#[derive(Debug)]
pub struct SeverityBars<'a> {
    chart: Option<&'a SeverityChart>,
    theme: &'a Theme,
    now: Instant,
}

impl<'a> SeverityBars<'a> {
    pub fn new(chart: Option<&'a SeverityChart>, theme: &'a Theme, now: Instant) -> Self {
        Self { chart, theme, now }
    }

    /// One line per bucket, bars scaled to `width` cells.
    pub fn lines(&self, width: usize) -> Vec<Line<'static>> {
        let Some(chart) = self.chart else {
            return vec![Line::from(Span::styled(
                LOADING,
                Style::default().fg(self.theme.colors.text_dim),
            ))];
        };
        let points = chart.display_points(self.now);
        let max = points.iter().copied().max().unwrap_or(0);

        // "Critical " label plus " 12345" value leave the rest to the bar.
        let bar_width = width.saturating_sub(9 + 8);
        SeverityBucket::ALL
            .iter()
            .map(|bucket| {
                let value = points[bucket.index()];
                Line::from(vec![
                    Span::styled(
                        format!("{:<9}", bucket.label()),
                        Style::default().fg(self.theme.colors.text),
                    ),
                    Span::styled(
                        bar(value, max, bar_width),
                        Style::default().fg(self.theme.severity_color(Some(*bucket))),
                    ),
                    Span::styled(
                        format!(" {}", format_thousands(value)),
                        Style::default().fg(self.theme.colors.text_dim),
                    ),
                ])
            })
            .collect()
    }
}

impl Widget for SeverityBars<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_width = area.width.saturating_sub(2) as usize;
        Paragraph::new(self.lines(inner_width))
            .block(panel_block("Severity Distribution", self.theme, false))
            .render(area, buf);
    }
}

/// A bar of `value / max` of `width` cells, with eighth-block resolution.
pub fn bar(value: u64, max: u64, width: usize) -> String {
    const PARTIAL: [char; 8] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉'];
    if max == 0 || width == 0 {
        return String::new();
    }
    let eighths = ((value as f64 / max as f64) * (width * 8) as f64).round() as usize;
    let full = eighths / 8;
    let mut out = "█".repeat(full.min(width));
    if full < width && eighths % 8 > 0 {
        out.push(PARTIAL[eighths % 8]);
    }
    out
}

/// Sparkline widget for displaying trend data using Unicode block characters.
///
/// Uses 8-level Unicode blocks (▁▂▃▄▅▆▇█) to render compact trend visualizations.
/// Automatically scales values to fit the display area.
#[derive(Debug, Clone)]
pub struct SparklineWidget<'a> {
    /// Data values to render
    data: &'a [u64],
    style: Style,
    label: Option<&'a str>,
    /// Whether to show min/max values
    show_range: bool,
}

impl<'a> SparklineWidget<'a> {
    pub fn new(data: &'a [u64]) -> Self {
        Self {
            data,
            style: Style::default().fg(Color::Green),
            label: None,
            show_range: false,
        }
    }

    /// Set the foreground color.
    pub fn color(mut self, color: Color) -> Self {
        self.style = self.style.fg(color);
        self
    }

    pub fn label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    pub fn show_range(mut self, show: bool) -> Self {
        self.show_range = show;
        self
    }

    /// Render the sparkline as a string of `width` cells.
    ///
    /// Values are scaled from zero, so a flat non-zero series shows as a
    /// flat line at its height rather than at the floor.
    pub fn render_string(&self, width: usize) -> String {
        const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

        if self.data.is_empty() {
            return " ".repeat(width);
        }

        let max_val = self.data.iter().copied().max().unwrap_or(0).max(1);
        let step = self.data.len() as f64 / width.max(1) as f64;

        (0..width)
            .map(|i| {
                let idx = ((i as f64) * step).floor() as usize;
                let val = self.data[idx.min(self.data.len() - 1)];
                let level = ((val as f64 / max_val as f64) * 7.0).round() as usize;
                BLOCKS[level.min(7)]
            })
            .collect()
    }

    /// Get the range (min, max) of the data.
    pub fn range(&self) -> (u64, u64) {
        let min = self.data.iter().copied().min().unwrap_or(0);
        let max = self.data.iter().copied().max().unwrap_or(0);
        (min, max)
    }
}

impl Widget for SparklineWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 2 || area.height == 0 {
            return;
        }

        let sparkline = self.render_string(area.width as usize);
        let mut lines = Vec::new();
        if let Some(label) = self.label {
            lines.push(Line::from(Span::styled(
                label,
                Style::default().add_modifier(Modifier::BOLD),
            )));
        }
        lines.push(Line::from(Span::styled(sparkline, self.style)));

        if self.show_range && !self.data.is_empty() {
            let (min, max) = self.range();
            lines.push(Line::from(vec![
                Span::styled(format!("{}", min), Style::default().fg(Color::DarkGray)),
                Span::raw(" - "),
                Span::raw(format!("{}", max)),
            ]));
        }

        Paragraph::new(lines).render(area, buf);
    }
}

/// Header indicator for the alert stream.
pub fn stream_indicator(status: StreamStatus, theme: &Theme) -> Span<'static> {
    match status {
        StreamStatus::Connected => {
            Span::styled("● live", Style::default().fg(theme.colors.status_healthy))
        }
        StreamStatus::Connecting => {
            Span::styled(
                "○ connecting",
                Style::default().fg(theme.colors.status_warning),
            )
        }
        StreamStatus::Disconnected => {
            Span::styled(
                "○ reconnecting",
                Style::default().fg(theme.colors.status_error),
            )
        }
    }
}

/// A hotkey hint line for the footer.
#[derive(Debug, Default)]
pub struct HotkeyHints {
    hints: Vec<(String, String)>,
}

impl HotkeyHints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hint.
    pub fn hint(mut self, key: impl Into<String>, description: impl Into<String>) -> Self {
        self.hints.push((key.into(), description.into()));
        self
    }

    /// Render as a line of spans.
    pub fn as_line(&self, theme: &Theme) -> Line<'static> {
        let mut spans = Vec::new();
        for (key, desc) in &self.hints {
            spans.push(Span::styled(
                format!("[{}]", key),
                Style::default().fg(theme.colors.hotkey),
            ));
            spans.push(Span::styled(
                format!("{} ", desc),
                Style::default().fg(theme.colors.text_dim),
            ));
        }
        Line::from(spans)
    }
}

/// Which columns an alert table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertColumns {
    /// Time of day, source, signature, severity
    Compact,
    /// Full timestamp, both endpoints, category
    Full,
}

/// An alert table surface, or its placeholder.
#[derive(Debug)]
pub struct AlertTableWidget<'a> {
    title: &'a str,
    table: Option<&'a AlertTable>,
    columns: AlertColumns,
    theme: &'a Theme,
    focused: bool,
}

impl<'a> AlertTableWidget<'a> {
    pub fn new(title: &'a str, table: Option<&'a AlertTable>, theme: &'a Theme) -> Self {
        Self {
            title,
            table,
            columns: AlertColumns::Compact,
            theme,
            focused: false,
        }
    }

    pub fn columns(mut self, columns: AlertColumns) -> Self {
        self.columns = columns;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    fn row(&self, alert: &AlertRecord) -> Row<'static> {
        let severity = Cell::from(Span::styled(
            alert.severity_display(),
            Style::default()
                .fg(self.theme.severity_color(alert.bucket()))
                .add_modifier(Modifier::BOLD),
        ));
        let cells = match self.columns {
            AlertColumns::Compact => vec![
                Cell::from(alert.timestamp.time_of_day()),
                Cell::from(alert.src_ip_display().to_string()),
                Cell::from(alert.signature_display().to_string()),
                severity,
            ],
            AlertColumns::Full => vec![
                Cell::from(alert.timestamp.date_time()),
                Cell::from(alert.src_ip_display().to_string()),
                Cell::from(alert.dest_ip_display().to_string()),
                Cell::from(alert.signature_display().to_string()),
                Cell::from(alert.category.clone().unwrap_or_default()),
                severity,
            ],
        };
        Row::new(cells).style(Style::default().fg(self.theme.colors.text))
    }
}

impl Widget for AlertTableWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = panel_block(self.title, self.theme, self.focused);
        let dim = Style::default().fg(self.theme.colors.text_dim);

        let Some(table) = self.table else {
            Paragraph::new(Span::styled(LOADING, dim)).block(block).render(area, buf);
            return;
        };
        if let Some(placeholder) = table.placeholder() {
            Paragraph::new(Span::styled(placeholder.to_string(), dim))
                .block(block)
                .render(area, buf);
            return;
        }

        let (header, widths): (Vec<&str>, Vec<Constraint>) = match self.columns {
            AlertColumns::Compact => (
                vec!["Time", "Source", "Signature", "Severity"],
                vec![
                    Constraint::Length(10),
                    Constraint::Length(16),
                    Constraint::Min(20),
                    Constraint::Length(10),
                ],
            ),
            AlertColumns::Full => (
                vec!["Timestamp", "Source", "Destination", "Signature", "Category", "Severity"],
                vec![
                    Constraint::Length(20),
                    Constraint::Length(16),
                    Constraint::Length(16),
                    Constraint::Min(20),
                    Constraint::Length(18),
                    Constraint::Length(10),
                ],
            ),
        };

        let rows: Vec<Row> = table.rows().iter().map(|a| self.row(a)).collect();
        let header_style = Style::default().fg(self.theme.colors.header);
        let widget = Table::new(rows, widths)
            .header(Row::new(header).style(header_style))
            .row_highlight_style(Style::default().bg(self.theme.colors.selection))
            .block(block);

        let mut state = TableState::default();
        if self.focused {
            state.select(Some(table.selected_index()));
        }
        StatefulWidget::render(widget, area, buf, &mut state);
    }
}

/// The current notification, drawn in the bottom-right corner.
#[derive(Debug)]
pub struct ToastWidget<'a> {
    toast: &'a Toast,
    theme: &'a Theme,
}

impl<'a> ToastWidget<'a> {
    pub fn new(toast: &'a Toast, theme: &'a Theme) -> Self {
        Self { toast, theme }
    }

    /// Where the toast goes inside `area`.
    pub fn area(&self, area: Rect) -> Rect {
        let width = (self.toast.format().chars().count() as u16 + 4).min(area.width);
        let height = 3.min(area.height);
        Rect {
            x: area.x + area.width - width,
            y: area.y + area.height - height,
            width,
            height,
        }
    }
}

impl Widget for ToastWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let color = match self.toast.kind {
            ToastKind::Success => self.theme.colors.status_healthy,
            ToastKind::Error => self.theme.colors.status_error,
        };
        let target = self.area(area);
        Clear.render(target, buf);
        Paragraph::new(Span::styled(self.toast.format(), Style::default().fg(color)))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color)),
            )
            .render(target, buf);
    }
}

/// A centered popup with scrollable text.
#[derive(Debug)]
pub struct Popup<'a> {
    title: &'a str,
    body: &'a str,
    theme: &'a Theme,
    scroll: u16,
}

impl<'a> Popup<'a> {
    pub fn new(title: &'a str, body: &'a str, theme: &'a Theme) -> Self {
        Self {
            title,
            body,
            theme,
            scroll: 0,
        }
    }

    pub fn scroll(mut self, scroll: u16) -> Self {
        self.scroll = scroll;
        self
    }
}

impl Widget for Popup<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let target = centered_rect(80, 70, area);
        Clear.render(target, buf);
        Paragraph::new(self.body)
            .style(Style::default().fg(self.theme.colors.text))
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .block(panel_block(self.title, self.theme, true))
            .render(target, buf);
    }
}

/// A rect of `percent_x` by `percent_y` centered in `area`.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(area);
    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(vertical[1])[1]
}
