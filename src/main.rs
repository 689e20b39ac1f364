mod chart;
mod command;
mod config;
mod display;
mod error;
mod error_log;
mod format;
mod model;
mod predict;
mod tui;
mod view;

use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::task;

use crate::command::Command;
use crate::error_log::ErrorLogStore;
use crate::predict::PredictionClient;
use crate::tui::TuiApp;
use crate::view::PredictionView;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let param = config::CliParams::parse();
    let client = PredictionClient::new(param.endpoint(), param.request_timeout())?;
    let view = PredictionView::new(ErrorLogStore::new(param.error_log.clone()));

    if param.headless {
        return run_headless(view, &client, param.html_out.as_deref()).await;
    }

    let (tx, mut rx) = mpsc::channel::<Command>(1);
    let mut app = TuiApp::new(view, param.html_out.clone());
    task::spawn(async move {
        let result = client.fetch_predictions().await;
        let _ = tx.send(Command::PredictionsFetched(result)).await;
    });

    let app_result = tokio::select! {
        result = app.run(&mut rx) => result,
        _ = tokio::signal::ctrl_c() => Ok(()),
    };
    app.dispose();
    app_result.map_err(|err| anyhow!(err.to_string()))?;
    Ok(())
}

async fn run_headless(
    mut view: PredictionView,
    client: &PredictionClient,
    html_out: Option<&Path>,
) -> Result<(), anyhow::Error> {
    let report = render_headless(&mut view, client).await;
    match html_out {
        Some(path) => fs::write(path, &report.html)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", report.html),
    }
    match report.failure {
        Some(message) => Err(anyhow!(message)),
        None => Ok(()),
    }
}

/// Region markup after one fetch, and the failure that should fail the run.
struct HeadlessReport {
    html: String,
    failure: Option<String>,
}

async fn render_headless(view: &mut PredictionView, client: &PredictionClient) -> HeadlessReport {
    if let Err(err) = view.load_and_render(client).await {
        view.record_render_error(&err);
    }
    HeadlessReport {
        html: view.region().to_html(),
        failure: view.last_error().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::error_log::temp_log_path;
    use crate::predict::testing::{sample_payload, serve_json, serve_status};

    async fn report_for(endpoint: String, name: &str) -> HeadlessReport {
        let client = PredictionClient::new(endpoint, None).unwrap();
        let mut view = PredictionView::new(ErrorLogStore::new(temp_log_path(name)));
        render_headless(&mut view, &client).await
    }

    #[tokio::test]
    async fn test_headless_success_prints_table() {
        let report = report_for(serve_json(sample_payload()).await, "headless-ok").await;
        assert!(report.failure.is_none());
        assert!(report.html.starts_with("<h2>Advice: Buy</h2>"));
        assert!(report.html.contains("<td>2024-01-01</td><td>100.46</td>"));
        assert!(!report.html.contains("Loading predictions..."));
    }

    #[tokio::test]
    async fn test_headless_fetch_error_fails_run() {
        let endpoint = serve_status(StatusCode::INTERNAL_SERVER_ERROR).await;
        let report = report_for(endpoint, "headless-500").await;
        assert_eq!(
            report.html,
            "<p>Error fetching predictions: Network response was not ok. Status: 500. Please try again later.</p>"
        );
        assert!(report.failure.unwrap().contains("Status: 500"));
    }

    #[tokio::test]
    async fn test_headless_render_fault_fails_run() {
        let mut payload = sample_payload();
        payload["predictions"] = json!([{"Date": "2024-01-01"}]);
        let report = report_for(serve_json(payload).await, "headless-fault").await;
        assert!(report.html.contains("<h3>Target Price: 105</h3>"));
        assert!(!report.html.contains("<table"));
        assert!(
            report
                .failure
                .unwrap()
                .starts_with("Error rendering predictions: prediction #0")
        );
    }
}
