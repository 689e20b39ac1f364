use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Payload of the prediction service. Only `predictions` is checked up front;
/// everything else is taken as sent and may fail later, when it is rendered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PredictionResponse {
    #[serde(deserialize_with = "lenient_points")]
    pub predictions: Vec<PredictionPoint>,
    /// Shown verbatim, whatever its JSON type.
    #[serde(default)]
    pub advice: Option<Value>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub absolute_mean: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub mae: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub mse: Option<f64>,
    #[serde(default)]
    pub target_price: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub current_price: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub predicted_trend: Option<String>,
}

/// One entry of `predictions`. Fields stay optional so that a malformed point
/// only fails once it is rendered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PredictionPoint {
    #[serde(rename = "Date", default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(rename = "Predicted Price", default, deserialize_with = "lenient_number")]
    pub predicted_price: Option<f64>,
    #[serde(
        rename = "Percentage Change (%)",
        default,
        deserialize_with = "lenient_number"
    )]
    pub percentage_change: Option<f64>,
    #[serde(rename = "Volatility", default, deserialize_with = "lenient_number")]
    pub volatility: Option<f64>,
}

impl PredictionPoint {
    #[cfg(test)]
    pub fn new(date: impl Into<String>, predicted_price: f64) -> Self {
        PredictionPoint {
            date: Some(date.into()),
            predicted_price: Some(predicted_price),
            ..PredictionPoint::default()
        }
    }
}

impl PredictionResponse {
    pub fn date_labels(&self) -> Vec<Option<&str>> {
        self.predictions
            .iter()
            .map(|point| point.date.as_deref())
            .collect()
    }

    pub fn prices(&self) -> Vec<Option<f64>> {
        self.predictions
            .iter()
            .map(|point| point.predicted_price)
            .collect()
    }
}

// A non-object entry (null, a bare number) becomes an empty point.
fn lenient_points<'de, D>(deserializer: D) -> Result<Vec<PredictionPoint>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<Value>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            Value::Object(_) => serde_json::from_value(entry).unwrap_or_default(),
            _ => PredictionPoint::default(),
        })
        .collect())
}

// Dates arrive however the service's dataframe library writes them: strings,
// epoch millis, occasionally null.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_service_payload() {
        let body = r#"{
            "current_price": "$64250.12 USD",
            "predictions": [
                {"Date": "2024-01-01", "Predicted Price": 100.456, "Percentage Change (%)": 1.5, "Volatility": 3.2},
                {"Date": 1704153600000, "Predicted Price": 101.0}
            ],
            "advice": "Buy: Prices are predicted to rise.",
            "absolute_mean": 1.005,
            "mae": 0.123,
            "mse": 0.456,
            "predicted_trend": "upward",
            "target_price": 105,
            "long_term_predictions": [],
            "historical_prices": []
        }"#;
        let response: PredictionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.predictions.len(), 2);
        assert_eq!(response.predictions[0].date.as_deref(), Some("2024-01-01"));
        assert_eq!(response.predictions[0].volatility, Some(3.2));
        assert_eq!(response.predictions[1].date.as_deref(), Some("1704153600000"));
        assert_eq!(response.target_price, Some(serde_json::json!(105)));
        assert_eq!(response.mae, Some(0.123));
        assert_eq!(response.predicted_trend.as_deref(), Some("upward"));
    }

    #[test]
    fn test_point_without_price_still_deserializes() {
        let point: PredictionPoint = serde_json::from_str(r#"{"Date": "2024-01-01"}"#).unwrap();
        assert_eq!(point.date.as_deref(), Some("2024-01-01"));
        assert_eq!(point.predicted_price, None);
    }

    #[test]
    fn test_wrongly_typed_point_fields_become_absent() {
        let body = r#"{
            "predictions": [
                {"Date": "2024-01-01", "Predicted Price": "100.5"},
                null,
                7
            ]
        }"#;
        let response: PredictionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.predictions.len(), 3);
        assert_eq!(response.predictions[0].date.as_deref(), Some("2024-01-01"));
        assert_eq!(response.predictions[0].predicted_price, None);
        assert_eq!(response.predictions[1], PredictionPoint::default());
        assert_eq!(response.predictions[2], PredictionPoint::default());
    }

    #[test]
    fn test_summary_fields_may_be_missing_or_mistyped() {
        let body = r#"{"predictions": [], "mae": "0.5", "target_price": "110", "advice": 3}"#;
        let response: PredictionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.advice, Some(serde_json::json!(3)));
        assert_eq!(response.absolute_mean, None);
        assert_eq!(response.mae, None);
        assert_eq!(response.target_price, Some(serde_json::json!("110")));
    }

    #[test]
    fn test_projection_keeps_input_order() {
        let response = PredictionResponse {
            predictions: vec![
                PredictionPoint::new("2024-01-03", 3.0),
                PredictionPoint::new("2024-01-01", 1.0),
                PredictionPoint::new("2024-01-02", 2.0),
            ],
            ..PredictionResponse::default()
        };
        assert_eq!(
            response.date_labels(),
            vec![Some("2024-01-03"), Some("2024-01-01"), Some("2024-01-02")]
        );
        assert_eq!(response.prices(), vec![Some(3.0), Some(1.0), Some(2.0)]);
    }
}
