use std::path::PathBuf;
use std::time::{Duration, Instant};

use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Axis, Block, Cell, Chart, Clear, Dataset, GraphType, Paragraph, Row, Table, Wrap,
};
use tokio::sync::mpsc;

use crate::chart::PredictionChart;
use crate::command::Command;
use crate::display::{Content, PredictionTable};
use crate::error::{FetchError, RenderError};
use crate::format::to_fixed;
use crate::model::PredictionResponse;
use crate::view::PredictionView;

const LOADING_SPINNER_FRAMES: [char; 4] = ['|', '/', '-', '\\'];
const CHART_HEIGHT_PERCENT: u16 = 55;
const STATUS_HEIGHT: u16 = 3;

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Spinner {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn tick(&mut self) -> bool {
        let interval = Duration::from_millis(120);
        if self.last_tick.elapsed() < interval {
            return false;
        }
        self.index = (self.index + 1) % LOADING_SPINNER_FRAMES.len();
        self.last_tick = Instant::now();
        true
    }

    fn frame(&self) -> char {
        LOADING_SPINNER_FRAMES[self.index % LOADING_SPINNER_FRAMES.len()]
    }
}

struct ScreenLayout {
    chart: Rect,
    content: Rect,
    status: Rect,
}

pub struct TuiApp {
    view: PredictionView,
    html_out: Option<PathBuf>,
    spinner: Spinner,
    last_draw: Instant,
    min_redraw_gap: Duration,
    status_message: Option<String>,
    status_visible_until: Option<Instant>,
    status_is_error: bool,
    fetch_done: bool,
}

impl TuiApp {
    fn is_exit_key(key: &KeyEvent) -> bool {
        matches!(
            key.code,
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc
        ) || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
    }

    pub fn new(mut view: PredictionView, html_out: Option<PathBuf>) -> TuiApp {
        let min_redraw_gap = Duration::from_millis(100);
        view.begin_loading();
        let mut app = TuiApp {
            view,
            html_out,
            spinner: Spinner::new(),
            last_draw: Instant::now() - min_redraw_gap,
            min_redraw_gap,
            status_message: None,
            status_visible_until: None,
            status_is_error: false,
            fetch_done: false,
        };
        app.export_html();
        app
    }

    pub fn view(&self) -> &PredictionView {
        &self.view
    }

    pub fn dispose(&self) {
        ratatui::restore();
    }

    pub async fn run(&mut self, rx: &mut mpsc::Receiver<Command>) -> Result<()> {
        color_eyre::install()?;
        let mut terminal = ratatui::init();
        let size = terminal.size()?;
        self.on_resize(size.width, size.height);
        let mut input_tick = tokio::time::interval(self.min_redraw_gap);
        terminal.draw(|frame| self.render(frame))?;
        self.last_draw = Instant::now();
        loop {
            tokio::select! {
                biased;
                _ = input_tick.tick() => {
                    let mut should_redraw = self.clear_status_if_allowed();
                    if self.view.region().is_loading() && self.spinner.tick() {
                        should_redraw = true;
                    }
                    match self.poll_input()? {
                        InputOutcome::Exit => return Ok(()),
                        InputOutcome::Redraw => should_redraw = true,
                        InputOutcome::Idle => {}
                    }
                    if should_redraw && self.last_draw.elapsed() >= self.min_redraw_gap {
                        terminal.draw(|frame| self.render(frame))?;
                        self.last_draw = Instant::now();
                    }
                }
                message = rx.recv(), if !self.fetch_done => {
                    match message {
                        Some(Command::PredictionsFetched(result)) => self.on_fetched(result),
                        None => self.fetch_done = true,
                    }
                    terminal.draw(|frame| self.render(frame))?;
                    self.last_draw = Instant::now();
                }
            }
        }
    }

    pub fn on_fetched(&mut self, result: Result<PredictionResponse, FetchError>) {
        self.fetch_done = true;
        match self.view.complete(result) {
            Ok(()) => {
                if let Some(message) = self.view.last_error().map(str::to_string) {
                    self.set_error_status_message(message);
                } else {
                    self.set_status_message("Predictions loaded · ←/→ inspect dates · q quit");
                }
            }
            Err(err) => self.on_render_error(&err),
        }
        self.export_html();
    }

    pub fn on_resize(&mut self, width: u16, height: u16) {
        let layout = Self::screen_layout(Rect::new(0, 0, width, height));
        self.view.on_resize(Self::chart_container(layout.chart));
    }

    fn on_render_error(&mut self, err: &RenderError) {
        self.view.record_render_error(err);
        let message = self
            .view
            .last_error()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        self.set_error_status_message(message);
    }

    fn export_html(&mut self) {
        let Some(path) = self.html_out.clone() else {
            return;
        };
        if let Err(err) = std::fs::write(&path, self.view.region().to_html()) {
            self.set_error_status_message(format!(
                "failed to write {}: {err}",
                path.display()
            ));
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_visible_until = Some(Instant::now() + Duration::from_secs(5));
        self.status_is_error = false;
    }

    fn set_error_status_message(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_visible_until = None;
        self.status_is_error = true;
    }

    fn clear_status_if_allowed(&mut self) -> bool {
        let Some(visible_until) = self.status_visible_until else {
            return false;
        };
        if Instant::now() < visible_until {
            return false;
        }
        self.status_message = None;
        self.status_visible_until = None;
        self.status_is_error = false;
        true
    }

    fn poll_input(&mut self) -> Result<InputOutcome> {
        let mut outcome = InputOutcome::Idle;
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if Self::is_exit_key(&key) {
                        return Ok(InputOutcome::Exit);
                    }
                    if self.handle_key_event(key) {
                        outcome = InputOutcome::Redraw;
                    }
                }
                Event::Resize(width, height) => {
                    self.on_resize(width, height);
                    outcome = InputOutcome::Redraw;
                }
                _ => {}
            }
        }
        Ok(outcome)
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        let Some(chart) = self.view.chart_mut().current_mut() else {
            return false;
        };
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => chart.move_cursor(-1),
            KeyCode::Right | KeyCode::Char('l') => chart.move_cursor(1),
            KeyCode::Home => chart.cursor_to_start(),
            KeyCode::End => chart.cursor_to_end(),
            _ => return false,
        }
        true
    }

    fn screen_layout(area: Rect) -> ScreenLayout {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(CHART_HEIGHT_PERCENT),
                Constraint::Min(STATUS_HEIGHT + 3),
            ])
            .split(area);
        let body = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(STATUS_HEIGHT)])
            .split(chunks[1]);
        ScreenLayout {
            chart: chunks[0],
            content: body[0],
            status: body[1],
        }
    }

    fn chart_container(area: Rect) -> Rect {
        Block::bordered().inner(area)
    }

    fn render(&self, frame: &mut Frame) {
        let layout = Self::screen_layout(frame.area());
        self.render_chart_panel(frame, layout.chart);
        let content_area = if self.status_message.is_some() {
            layout.content
        } else {
            layout.content.union(layout.status)
        };
        self.render_region(frame, content_area);
        if self.status_message.is_some() {
            self.render_status(frame, layout.status);
        }
    }

    fn render_chart_panel(&self, frame: &mut Frame, area: Rect) {
        let chart = self.view.chart().current();
        let title = match chart.and_then(|chart| chart.spec().title.as_deref()) {
            Some(current) => format!("Predicted Prices · current {current}"),
            None => "Predicted Prices".to_string(),
        };
        let block = Block::bordered().title(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let Some(chart) = chart else {
            let placeholder = Paragraph::new("No chart yet")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(placeholder, area);
            return;
        };
        frame.render_widget(block, area);
        self.render_chart(frame, chart);
    }

    fn render_chart(&self, frame: &mut Frame, chart: &PredictionChart) {
        let layout = chart.layout();
        let spec = chart.spec();
        let legend = Line::from(
            spec.datasets
                .iter()
                .flat_map(|dataset| {
                    [
                        Span::styled("━━ ", Style::default().fg(dataset.color)),
                        Span::raw(format!("{}  ", dataset.label)),
                    ]
                })
                .collect::<Vec<_>>(),
        )
        .alignment(Alignment::Center);
        frame.render_widget(Paragraph::new(legend), layout.legend);

        let [y_min, y_max] = layout.y_bounds;
        let y_labels = vec![
            Span::styled(
                to_fixed(y_min, 2),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(to_fixed(f64::midpoint(y_min, y_max), 2)),
            Span::styled(
                to_fixed(y_max, 2),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ];
        let x_labels: Vec<Span> = layout
            .x_ticks
            .iter()
            .filter_map(|idx| spec.labels.get(*idx))
            .map(|label| Span::raw(label.clone()))
            .collect();

        let cursor_line = chart
            .cursor()
            .map(|idx| vec![(idx as f64, y_min), (idx as f64, y_max)]);
        let mut datasets: Vec<Dataset> = Vec::new();
        if let Some(points) = cursor_line.as_ref() {
            datasets.push(
                Dataset::default()
                    .marker(symbols::Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(Color::DarkGray))
                    .data(points),
            );
        }
        for (dataset, runs) in spec.datasets.iter().zip(layout.lines.iter()) {
            for run in runs {
                let graph_type = if run.len() == 1 {
                    GraphType::Scatter
                } else {
                    GraphType::Line
                };
                datasets.push(
                    Dataset::default()
                        .marker(symbols::Marker::Braille)
                        .graph_type(graph_type)
                        .style(Style::default().fg(dataset.color))
                        .data(run),
                );
            }
        }
        let widget = Chart::new(datasets)
            .x_axis(
                Axis::default()
                    .title(spec.config.x_axis.title.as_str())
                    .style(Style::default().fg(Color::Gray))
                    .labels(x_labels)
                    .labels_alignment(Alignment::Left)
                    .bounds(layout.x_bounds),
            )
            .y_axis(
                Axis::default()
                    .title(spec.config.y_axis.title.as_str())
                    .style(Style::default().fg(Color::Gray))
                    .labels(y_labels)
                    .bounds(layout.y_bounds),
            );
        frame.render_widget(widget, layout.plot);
        self.render_tooltip(frame, chart);
    }

    fn render_tooltip(&self, frame: &mut Frame, chart: &PredictionChart) {
        let Some(tooltip) = chart.tooltip() else {
            return;
        };
        let plot = chart.layout().plot;
        let mut lines = vec![Line::from(Span::styled(
            tooltip.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        for item in &tooltip.items {
            lines.push(Line::from(vec![
                Span::styled("■ ", Style::default().fg(item.color)),
                Span::raw(format!("{}: {}", item.label, to_fixed(item.value, 2))),
            ]));
        }
        let width = lines
            .iter()
            .map(|line| line.width() as u16)
            .max()
            .unwrap_or(0)
            .saturating_add(2);
        let height = lines.len() as u16 + 2;
        if plot.width < width || plot.height < height {
            return;
        }
        let popup = Rect::new(plot.x + plot.width - width, plot.y, width, height);
        frame.render_widget(Clear, popup);
        frame.render_widget(Paragraph::new(lines).block(Block::bordered()), popup);
    }

    fn render_region(&self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered().title(format!("#{}", self.view.region().id()));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut lines: Vec<Line> = Vec::new();
        let mut table: Option<&PredictionTable> = None;
        for content in self.view.region().contents() {
            match content {
                Content::Loading {
                    message,
                    spinner_label,
                } => {
                    lines.push(Line::from(message.as_str()));
                    lines.push(Line::from(Span::styled(
                        format!("{} {}", self.spinner.frame(), spinner_label),
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    )));
                }
                Content::Paragraph(text) => lines.push(Line::from(text.as_str())),
                Content::Heading { level, text } => {
                    let style = if *level <= 2 {
                        Style::default()
                            .fg(Color::LightGreen)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().add_modifier(Modifier::BOLD)
                    };
                    lines.push(Line::from(Span::styled(text.as_str(), style)));
                }
                Content::Table(found) => table = Some(found),
            }
        }

        let Some(table) = table else {
            let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
            frame.render_widget(paragraph, inner);
            return;
        };
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(inner);
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), chunks[0]);
        self.render_table(frame, chunks[1], table);
    }

    fn render_table(&self, frame: &mut Frame, area: Rect, table: &PredictionTable) {
        let header_style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        let header = Row::new(
            table
                .headers
                .iter()
                .map(|header| Cell::from(header.as_str()))
                .collect::<Vec<_>>(),
        )
        .style(header_style);
        let cursor = self
            .view
            .chart()
            .current()
            .and_then(|chart| chart.cursor());
        let skip = match cursor {
            Some(idx) => (idx + 2).saturating_sub(area.height as usize),
            None => 0,
        };
        let rows: Vec<Row> = table
            .rows
            .iter()
            .enumerate()
            .skip(skip)
            .map(|(idx, row)| {
                let style = if Some(idx) == cursor {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                };
                Row::new(vec![
                    Cell::from(row.date.as_str()),
                    Cell::from(row.price.as_str()),
                ])
                .style(style)
            })
            .collect();
        let widget = Table::new(
            rows,
            [Constraint::Percentage(50), Constraint::Percentage(50)],
        )
        .header(header);
        frame.render_widget(widget, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        if let Some(message) = &self.status_message {
            let color = if self.status_is_error {
                Color::Red
            } else {
                Color::Yellow
            };
            let block = Block::bordered().title("Status");
            let status = Paragraph::new(message.as_str())
                .style(Style::default().fg(color))
                .alignment(Alignment::Left)
                .block(block);
            frame.render_widget(status, area);
        }
    }
}

enum InputOutcome {
    Idle,
    Redraw,
    Exit,
}

#[cfg(test)]
mod tests {
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use serde_json::json;

    use super::*;
    use crate::error_log::{ErrorLogStore, temp_log_path};
    use crate::model::PredictionPoint;

    fn app(name: &str) -> TuiApp {
        TuiApp::new(
            PredictionView::new(ErrorLogStore::new(temp_log_path(name))),
            None,
        )
    }

    fn sample() -> PredictionResponse {
        PredictionResponse {
            predictions: vec![
                PredictionPoint::new("2024-01-01", 100.456),
                PredictionPoint::new("2024-01-02", 101.2),
                PredictionPoint::new("2024-01-03", 99.8),
            ],
            advice: Some(json!("Buy")),
            absolute_mean: Some(1.005),
            mae: Some(0.123),
            mse: Some(0.456),
            target_price: Some(json!(105)),
            current_price: None,
            predicted_trend: None,
        }
    }

    fn draw(app: &TuiApp, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        let buffer = terminal.backend().buffer();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_starts_in_loading_state() {
        let app = app("tui-loading");
        assert!(app.view().region().is_loading());
        let screen = draw(&app, 100, 30);
        assert!(screen.contains("Loading predictions..."));
        assert!(screen.contains("Loading..."));
        assert!(screen.contains("No chart yet"));
    }

    #[test]
    fn test_renders_results() {
        let mut app = app("tui-results");
        app.on_resize(120, 40);
        app.on_fetched(Ok(sample()));
        let screen = draw(&app, 120, 40);
        assert!(screen.contains("Advice: Buy"));
        assert!(screen.contains("Mean Squared Error: 0.46"));
        assert!(screen.contains("Predicted Price ($)"));
        assert!(screen.contains("100.46"));
        assert!(screen.contains("Price ($)"));
    }

    #[test]
    fn test_renders_error() {
        let mut app = app("tui-error");
        app.on_resize(140, 40);
        app.on_fetched(Err(FetchError::Network { status: 500 }));
        let screen = draw(&app, 140, 40);
        assert!(screen.contains("Status: 500"));
        assert!(!screen.contains("Predicted Price ($)"));
        assert!(app.status_is_error);
    }

    #[test]
    fn test_resize_relays_out_chart() {
        let mut app = app("tui-resize");
        app.on_resize(80, 24);
        app.on_fetched(Ok(sample()));
        let before = app.view().chart().current().unwrap().layout().area;
        app.on_resize(160, 48);
        let chart = app.view().chart().current().unwrap();
        assert_ne!(chart.layout().area, before);
        assert_eq!(chart.layout().area, TuiApp::chart_container(TuiApp::screen_layout(Rect::new(0, 0, 160, 48)).chart));
        assert_eq!(chart.resize_count(), 1);
    }

    #[test]
    fn test_cursor_keys_show_tooltip() {
        let mut app = app("tui-cursor");
        app.on_resize(120, 40);
        app.on_fetched(Ok(sample()));
        let key = KeyEvent::new(KeyCode::End, KeyModifiers::NONE);
        assert!(app.handle_key_event(key));
        let screen = draw(&app, 120, 40);
        assert!(screen.contains("Predicted Prices: 99.80"));
    }

    #[test]
    fn test_missing_price_reports_render_error() {
        let mut app = app("tui-render-error");
        let mut data = sample();
        data.predictions[1].predicted_price = None;
        app.on_fetched(Ok(data));
        assert!(app.status_is_error);
        assert!(
            app.status_message
                .as_deref()
                .unwrap()
                .contains("prediction #1 has no `Predicted Price`")
        );
        assert_eq!(app.view().region().tables().count(), 0);
    }
}
