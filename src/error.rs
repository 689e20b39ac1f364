use thiserror::Error;

/// Why a prediction fetch failed. The view shows all of these the same way.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network response was not ok. Status: {status}")]
    Network { status: u16 },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid data format: {0}")]
    Validation(String),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network { .. } => "network",
            FetchError::Transport(_) => "transport",
            FetchError::Parse(_) => "parse",
            FetchError::Validation(_) => "validation",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChartError {
    #[error("Canvas is already in use. Chart #{chart_id} must be destroyed before canvas `{canvas_id}` can be reused.")]
    CanvasInUse { canvas_id: String, chart_id: u64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("prediction #{index} has no `{field}`")]
    MalformedPoint { index: usize, field: &'static str },

    #[error("`{field}` is missing or not a number")]
    MissingMetric { field: &'static str },

    #[error(transparent)]
    Chart(#[from] ChartError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_message_carries_status() {
        let err = FetchError::Network { status: 500 };
        assert_eq!(err.to_string(), "Network response was not ok. Status: 500");
        assert_eq!(err.kind(), "network");
    }

    #[test]
    fn test_validation_message() {
        let err = FetchError::Validation("predictions missing or not an array.".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid data format: predictions missing or not an array."
        );
    }

    #[test]
    fn test_render_error_messages() {
        let err = RenderError::MissingMetric { field: "mae" };
        assert_eq!(err.to_string(), "`mae` is missing or not a number");
        let err = RenderError::MalformedPoint {
            index: 2,
            field: "Predicted Price",
        };
        assert_eq!(err.to_string(), "prediction #2 has no `Predicted Price`");
    }
}
