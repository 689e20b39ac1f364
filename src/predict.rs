use std::time::Duration;

use anyhow::Result as AnyResult;
use reqwest::{Client, ClientBuilder};
use serde_json::Value;

use crate::error::FetchError;
use crate::model::PredictionResponse;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/predict";

pub struct PredictionClient {
    client: Client,
    endpoint: String,
}

impl PredictionClient {
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> AnyResult<Self> {
        Ok(PredictionClient {
            client: build_http_client(timeout)?,
            endpoint: endpoint.into(),
        })
    }

    /// One GET against the prediction endpoint. No retry.
    pub async fn fetch_predictions(&self) -> Result<PredictionResponse, FetchError> {
        let response = self.client.get(&self.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network {
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        parse_predictions(&body)
    }
}

pub fn parse_predictions(body: &[u8]) -> Result<PredictionResponse, FetchError> {
    let payload: Value = serde_json::from_slice(body)?;
    if !matches!(payload.get("predictions"), Some(Value::Array(_))) {
        return Err(FetchError::Validation(
            "predictions missing or not an array.".to_string(),
        ));
    }
    serde_json::from_value(payload).map_err(|err| FetchError::Validation(format!("{err}.")))
}

fn build_http_client(timeout: Option<Duration>) -> AnyResult<Client> {
    let mut builder = ClientBuilder::new();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;
    use serde_json::{Value, json};

    pub fn sample_payload() -> Value {
        json!({
            "predictions": [{"Date": "2024-01-01", "Predicted Price": 100.456}],
            "advice": "Buy",
            "absolute_mean": 1.005,
            "mae": 0.123,
            "mse": 0.456,
            "target_price": 105
        })
    }

    pub async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/predict")
    }

    pub async fn serve_json(payload: Value) -> String {
        let body = payload.to_string();
        serve(Router::new().route(
            "/predict",
            get(move || {
                let body = body.clone();
                async move { ([("content-type", "application/json")], body) }
            }),
        ))
        .await
    }

    pub async fn serve_status(status: StatusCode) -> String {
        serve(Router::new().route("/predict", get(move || async move { (status, "boom") }))).await
    }

    pub async fn serve_text(body: &'static str) -> String {
        serve(Router::new().route("/predict", get(move || async move { body }))).await
    }
}
