use ratatui::layout::Rect;
use ratatui::style::Color;
use unicode_width::UnicodeWidthStr;

use crate::error::ChartError;

pub const CANVAS_ID: &str = "predictionsChart";
const Y_PADDING_RATIO: f64 = 0.05;
const LEGEND_HEIGHT: u16 = 1;
// braille markers pack two columns per cell
const DOTS_PER_CELL: f64 = 2.0;

#[derive(Clone, Debug, PartialEq)]
pub struct AxisConfig {
    pub title: String,
    pub begin_at_zero: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChartConfig {
    pub x_axis: AxisConfig,
    pub y_axis: AxisConfig,
}

impl ChartConfig {
    pub fn predictions() -> Self {
        ChartConfig {
            x_axis: AxisConfig {
                title: "Date".to_string(),
                begin_at_zero: false,
            },
            y_axis: AxisConfig {
                title: "Price ($)".to_string(),
                begin_at_zero: false,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LineDataset {
    pub label: String,
    pub color: Color,
    pub tension: f64,
    pub data: Vec<Option<f64>>,
}

impl LineDataset {
    pub fn predicted_prices(data: Vec<Option<f64>>) -> Self {
        LineDataset {
            label: "Predicted Prices".to_string(),
            // rgba(75, 192, 192, 1)
            color: Color::Rgb(75, 192, 192),
            tension: 0.1,
            data,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChartSpec {
    pub title: Option<String>,
    pub labels: Vec<String>,
    pub datasets: Vec<LineDataset>,
    pub config: ChartConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TooltipItem {
    pub label: String,
    pub color: Color,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tooltip {
    pub title: String,
    pub items: Vec<TooltipItem>,
}

/// Drawing surface a chart binds to. Only one chart may hold it at a time.
#[derive(Clone, Debug)]
pub struct Canvas {
    id: String,
    container: Rect,
    bound_chart: Option<u64>,
    next_chart_id: u64,
}

impl Canvas {
    pub fn new(id: impl Into<String>) -> Self {
        Canvas {
            id: id.into(),
            container: Rect::default(),
            bound_chart: None,
            next_chart_id: 1,
        }
    }

    pub fn container(&self) -> Rect {
        self.container
    }

    pub fn set_container(&mut self, area: Rect) {
        self.container = area;
    }

    #[cfg(test)]
    pub fn bound_chart(&self) -> Option<u64> {
        self.bound_chart
    }

    fn acquire(&mut self) -> Result<u64, ChartError> {
        if let Some(chart_id) = self.bound_chart {
            return Err(ChartError::CanvasInUse {
                canvas_id: self.id.clone(),
                chart_id,
            });
        }
        let chart_id = self.next_chart_id;
        self.next_chart_id += 1;
        self.bound_chart = Some(chart_id);
        Ok(chart_id)
    }

    fn release(&mut self, chart_id: u64) {
        if self.bound_chart == Some(chart_id) {
            self.bound_chart = None;
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChartLayout {
    pub area: Rect,
    pub legend: Rect,
    pub plot: Rect,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    /// Category indices whose labels fit along the x axis.
    pub x_ticks: Vec<usize>,
    /// Smoothed polylines per dataset; a gap in the data starts a new run.
    pub lines: Vec<Vec<Vec<(f64, f64)>>>,
}

/// A live line chart bound to a canvas.
#[derive(Clone, Debug)]
pub struct PredictionChart {
    id: u64,
    spec: ChartSpec,
    layout: ChartLayout,
    cursor: Option<usize>,
    resize_count: usize,
}

impl PredictionChart {
    pub fn bind(canvas: &mut Canvas, spec: ChartSpec) -> Result<Self, ChartError> {
        let id = canvas.acquire()?;
        let mut chart = PredictionChart {
            id,
            spec,
            layout: ChartLayout::default(),
            cursor: None,
            resize_count: 0,
        };
        chart.layout = chart.compute_layout(canvas.container());
        Ok(chart)
    }

    pub fn destroy(self, canvas: &mut Canvas) {
        canvas.release(self.id);
    }

    #[cfg(test)]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn spec(&self) -> &ChartSpec {
        &self.spec
    }

    pub fn layout(&self) -> &ChartLayout {
        &self.layout
    }

    #[cfg(test)]
    pub fn resize_count(&self) -> usize {
        self.resize_count
    }

    pub fn resize(&mut self, area: Rect) {
        self.layout = self.compute_layout(area);
        self.resize_count += 1;
    }

    pub fn category_count(&self) -> usize {
        self.spec.labels.len()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.category_count();
        if len == 0 {
            self.cursor = None;
            return;
        }
        let current = match self.cursor {
            Some(idx) => idx as isize,
            None if delta >= 0 => -1,
            None => len as isize,
        };
        let next = (current + delta).clamp(0, len as isize - 1);
        self.cursor = Some(next as usize);
    }

    pub fn cursor_to_start(&mut self) {
        if self.category_count() > 0 {
            self.cursor = Some(0);
        }
    }

    pub fn cursor_to_end(&mut self) {
        let len = self.category_count();
        if len > 0 {
            self.cursor = Some(len - 1);
        }
    }

    pub fn tooltip(&self) -> Option<Tooltip> {
        self.tooltip_at(self.cursor?)
    }

    /// Every dataset's value at category `index`, whether or not the cursor
    /// sits on a drawn point.
    pub fn tooltip_at(&self, index: usize) -> Option<Tooltip> {
        let title = self.spec.labels.get(index)?.clone();
        let items: Vec<TooltipItem> = self
            .spec
            .datasets
            .iter()
            .filter_map(|dataset| tooltip_item(dataset, index))
            .collect();
        if items.is_empty() {
            return None;
        }
        Some(Tooltip { title, items })
    }

    fn compute_layout(&self, area: Rect) -> ChartLayout {
        let legend_height = LEGEND_HEIGHT.min(area.height);
        // legend sits above the plot
        let legend = Rect::new(area.x, area.y, area.width, legend_height);
        let plot = Rect::new(
            area.x,
            area.y + legend_height,
            area.width,
            area.height - legend_height,
        );
        let len = self.category_count();
        let x_bounds = if len > 1 {
            [0.0, (len - 1) as f64]
        } else {
            [-0.5, 0.5]
        };
        let y_bounds = self.value_bounds();
        let segments = len.saturating_sub(1).max(1) as f64;
        let samples = ((plot.width as f64 * DOTS_PER_CELL) / segments).ceil() as usize;
        let samples = samples.clamp(1, 32);
        let lines = self
            .spec
            .datasets
            .iter()
            .map(|dataset| {
                contiguous_runs(&dataset.data)
                    .into_iter()
                    .map(|run| smooth_run(&run, dataset.tension, samples, x_bounds, y_bounds))
                    .collect()
            })
            .collect();
        ChartLayout {
            area,
            legend,
            plot,
            x_bounds,
            y_bounds,
            x_ticks: self.x_ticks(plot.width),
            lines,
        }
    }

    fn value_bounds(&self) -> [f64; 2] {
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for dataset in &self.spec.datasets {
            for value in dataset.data.iter().flatten() {
                if value.is_finite() {
                    min_y = min_y.min(*value);
                    max_y = max_y.max(*value);
                }
            }
        }
        if !min_y.is_finite() || !max_y.is_finite() {
            return [0.0, 1.0];
        }
        if self.spec.config.y_axis.begin_at_zero {
            min_y = min_y.min(0.0);
            max_y = max_y.max(0.0);
        }
        let padding = if (max_y - min_y).abs() < f64::EPSILON {
            (max_y.abs() * Y_PADDING_RATIO).max(1.0)
        } else {
            (max_y - min_y) * Y_PADDING_RATIO
        };
        let mut lower = min_y - padding;
        let upper = max_y + padding;
        if !self.spec.config.y_axis.begin_at_zero && min_y >= 0.0 && lower < 0.0 {
            // padding alone must not drag a positive series down to zero
            lower = min_y - (min_y * Y_PADDING_RATIO).min(padding);
        }
        [lower, upper]
    }

    fn x_ticks(&self, plot_width: u16) -> Vec<usize> {
        let len = self.category_count();
        if len == 0 {
            return Vec::new();
        }
        let widest = self
            .spec
            .labels
            .iter()
            .map(|label| label.width())
            .max()
            .unwrap_or(0)
            .max(1);
        let fit = (plot_width as usize / (widest + 2)).max(2).min(len);
        if fit >= len {
            return (0..len).collect();
        }
        let step = (len - 1) as f64 / (fit - 1) as f64;
        let mut ticks: Vec<usize> = (0..fit)
            .map(|slot| (slot as f64 * step).round() as usize)
            .collect();
        ticks.dedup();
        ticks
    }
}

fn tooltip_item(dataset: &LineDataset, index: usize) -> Option<TooltipItem> {
    let value = (*dataset.data.get(index)?)?;
    Some(TooltipItem {
        label: dataset.label.clone(),
        color: dataset.color,
        value,
    })
}

fn contiguous_runs(data: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    for (idx, value) in data.iter().enumerate() {
        match value {
            Some(y) if y.is_finite() => current.push((idx as f64, *y)),
            _ => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Cubic Bézier interpolation through every point of a run. Control points
/// follow the neighbour-weighted spline used by web charting libraries, with
/// distances measured after normalising both axes to their bounds.
fn smooth_run(
    run: &[(f64, f64)],
    tension: f64,
    samples: usize,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) -> Vec<(f64, f64)> {
    if run.len() < 2 || tension <= 0.0 {
        return run.to_vec();
    }
    let x_span = (x_bounds[1] - x_bounds[0]).max(f64::EPSILON);
    let y_span = (y_bounds[1] - y_bounds[0]).max(f64::EPSILON);
    let norm = |(x, y): (f64, f64)| ((x - x_bounds[0]) / x_span, (y - y_bounds[0]) / y_span);
    let denorm = |(x, y): (f64, f64)| (x * x_span + x_bounds[0], y * y_span + y_bounds[0]);
    let points: Vec<(f64, f64)> = run.iter().copied().map(norm).collect();

    let mut controls = Vec::with_capacity(points.len());
    for idx in 0..points.len() {
        let current = points[idx];
        let previous = if idx == 0 { current } else { points[idx - 1] };
        let next = points.get(idx + 1).copied().unwrap_or(current);
        controls.push(spline_controls(previous, current, next, tension));
    }

    let mut out = Vec::with_capacity((points.len() - 1) * samples + 1);
    out.push(run[0]);
    for idx in 0..points.len() - 1 {
        let p0 = points[idx];
        let p1 = controls[idx].1;
        let p2 = controls[idx + 1].0;
        let p3 = points[idx + 1];
        for step in 1..=samples {
            let t = step as f64 / samples as f64;
            let (x, y) = cubic_bezier(p0, p1, p2, p3, t);
            let (x, y) = denorm((x, y.clamp(0.0, 1.0)));
            out.push((x, y));
        }
    }
    out
}

fn spline_controls(
    previous: (f64, f64),
    current: (f64, f64),
    next: (f64, f64),
    tension: f64,
) -> ((f64, f64), (f64, f64)) {
    let d01 = distance(previous, current);
    let d12 = distance(current, next);
    let total = d01 + d12;
    let (s01, s12) = if total > 0.0 {
        (d01 / total, d12 / total)
    } else {
        (0.0, 0.0)
    };
    let fa = tension * s01;
    let fb = tension * s12;
    let dx = next.0 - previous.0;
    let dy = next.1 - previous.1;
    (
        (current.0 - fa * dx, current.1 - fa * dy),
        (current.0 + fb * dx, current.1 + fb * dy),
    )
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

fn cubic_bezier(
    p0: (f64, f64),
    p1: (f64, f64),
    p2: (f64, f64),
    p3: (f64, f64),
    t: f64,
) -> (f64, f64) {
    let u = 1.0 - t;
    let a = u * u * u;
    let b = 3.0 * u * u * t;
    let c = 3.0 * u * t * t;
    let d = t * t * t;
    (
        a * p0.0 + b * p1.0 + c * p2.0 + d * p3.0,
        a * p0.1 + b * p1.1 + c * p2.1 + d * p3.1,
    )
}

/// Owner of the chart currently shown on the canvas.
#[derive(Debug)]
pub struct ChartHandle {
    canvas: Canvas,
    chart: Option<PredictionChart>,
}

impl ChartHandle {
    pub fn new(canvas: Canvas) -> Self {
        ChartHandle {
            canvas,
            chart: None,
        }
    }

    #[cfg(test)]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn current(&self) -> Option<&PredictionChart> {
        self.chart.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut PredictionChart> {
        self.chart.as_mut()
    }

    #[cfg(test)]
    pub fn is_present(&self) -> bool {
        self.chart.is_some()
    }

    /// Destroys the current chart, then binds a new one built from `spec`.
    pub fn replace(&mut self, spec: ChartSpec) -> Result<&mut PredictionChart, ChartError> {
        self.dispose_if_present();
        let chart = PredictionChart::bind(&mut self.canvas, spec)?;
        Ok(self.chart.insert(chart))
    }

    pub fn dispose_if_present(&mut self) -> bool {
        match self.chart.take() {
            Some(chart) => {
                chart.destroy(&mut self.canvas);
                true
            }
            None => false,
        }
    }

    /// The canvas follows its container either way; only a live chart relays out.
    pub fn resize_if_present(&mut self, area: Rect) -> bool {
        self.canvas.set_container(area);
        match self.chart.as_mut() {
            Some(chart) => {
                chart.resize(area);
                true
            }
            None => false,
        }
    }
}
