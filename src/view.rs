use ratatui::layout::Rect;

use crate::chart::{CANVAS_ID, Canvas, ChartConfig, ChartHandle, ChartSpec, LineDataset};
use crate::display::{Content, DisplayRegion, PredictionTable, TableRow};
use crate::error::{FetchError, RenderError};
use crate::error_log::ErrorLogStore;
use crate::format::{format_json_verbatim, to_fixed};
use crate::model::PredictionResponse;
use crate::predict::PredictionClient;

const METRIC_DIGITS: usize = 2;

/// Loading, error and result states of the prediction page, plus the chart
/// drawn next to them.
pub struct PredictionView {
    region: DisplayRegion,
    chart: ChartHandle,
    error_log: ErrorLogStore,
    last_error: Option<String>,
}

impl PredictionView {
    pub fn new(error_log: ErrorLogStore) -> Self {
        PredictionView {
            region: DisplayRegion::default(),
            chart: ChartHandle::new(Canvas::new(CANVAS_ID)),
            error_log,
            last_error: None,
        }
    }

    pub fn region(&self) -> &DisplayRegion {
        &self.region
    }

    pub fn chart(&self) -> &ChartHandle {
        &self.chart
    }

    pub fn chart_mut(&mut self) -> &mut ChartHandle {
        &mut self.chart
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn begin_loading(&mut self) {
        self.region.set_loading();
    }

    /// Fetches once and renders whatever came back.
    pub async fn load_and_render(&mut self, client: &PredictionClient) -> Result<(), RenderError> {
        self.begin_loading();
        let result = client.fetch_predictions().await;
        self.complete(result)
    }

    pub fn complete(
        &mut self,
        result: Result<PredictionResponse, FetchError>,
    ) -> Result<(), RenderError> {
        match result {
            Ok(data) => self.render_results(&data),
            Err(err) => {
                self.show_fetch_error(&err);
                Ok(())
            }
        }
    }

    /// Rebuilds chart, summary and table from `data`. A metric that is not a
    /// number stops the summary at that line; a point without a price aborts
    /// after the summary. Either way the region stays partly rendered.
    pub fn render_results(&mut self, data: &PredictionResponse) -> Result<(), RenderError> {
        self.region.clear();

        let labels: Vec<String> = data
            .date_labels()
            .into_iter()
            .map(|label| label.unwrap_or_default().to_string())
            .collect();
        let prices = data.prices();
        self.chart.replace(ChartSpec {
            title: data.current_price.clone(),
            labels,
            datasets: vec![LineDataset::predicted_prices(prices)],
            config: ChartConfig::predictions(),
        })?;

        self.push_heading(
            2,
            format!("Advice: {}", format_json_verbatim(data.advice.as_ref())),
        );
        let absolute_mean = metric(data.absolute_mean, "absolute_mean")?;
        self.push_heading(3, format!("Absolute Mean of Predictions: {absolute_mean}"));
        let mae = metric(data.mae, "mae")?;
        self.push_heading(3, format!("Mean Absolute Error: {mae}"));
        let mse = metric(data.mse, "mse")?;
        self.push_heading(3, format!("Mean Squared Error: {mse}"));
        self.push_heading(
            3,
            format!(
                "Target Price: {}",
                format_json_verbatim(data.target_price.as_ref())
            ),
        );
        if let Some(current_price) = &data.current_price {
            self.push_heading(3, format!("Current Price: {current_price}"));
        }
        if let Some(trend) = &data.predicted_trend {
            self.push_heading(3, format!("Predicted Trend: {trend}"));
        }

        let mut rows = Vec::with_capacity(data.predictions.len());
        for (index, point) in data.predictions.iter().enumerate() {
            let price = point.predicted_price.ok_or(RenderError::MalformedPoint {
                index,
                field: "Predicted Price",
            })?;
            rows.push(TableRow {
                date: point.date.clone().unwrap_or_default(),
                price: to_fixed(price, METRIC_DIGITS),
            });
        }
        self.region.push(Content::Table(PredictionTable::new(rows)));
        self.last_error = None;
        Ok(())
    }

    /// Relays out the chart for a new container; no-op until a chart exists.
    pub fn on_resize(&mut self, area: Rect) -> bool {
        self.chart.resize_if_present(area)
    }

    pub fn record_render_error(&mut self, err: &RenderError) {
        self.log_error("render", format!("Error rendering predictions: {err}"));
    }

    fn show_fetch_error(&mut self, err: &FetchError) {
        self.log_error(err.kind(), format!("Error fetching predictions: {err}"));
        self.region.set_paragraph(format!(
            "Error fetching predictions: {err}. Please try again later."
        ));
    }

    fn log_error(&mut self, kind: &str, message: String) {
        // A broken log file must not hide the failure from the screen.
        if let Err(log_err) = self.error_log.append_message(kind, message.clone()) {
            self.last_error = Some(format!(
                "{message} (cannot write {}: {log_err})",
                self.error_log.path().display()
            ));
            return;
        }
        self.last_error = Some(message);
    }

    fn push_heading(&mut self, level: u8, text: String) {
        self.region.push(Content::Heading { level, text });
    }
}

fn metric(value: Option<f64>, field: &'static str) -> Result<String, RenderError> {
    value
        .map(|value| to_fixed(value, METRIC_DIGITS))
        .ok_or(RenderError::MissingMetric { field })
}
