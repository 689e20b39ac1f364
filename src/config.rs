use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

use crate::error_log::ErrorLogStore;
use crate::predict::DEFAULT_ENDPOINT;

#[derive(Parser, Clone, Debug)]
#[clap(about = "Fetch stock price predictions and chart them in the terminal")]
pub struct CliParams {
    /// Prediction endpoint queried once at start-up
    #[clap(
        long = "endpoint",
        env = "PREDICTION_ENDPOINT",
        default_value = DEFAULT_ENDPOINT
    )]
    pub endpoint: String,

    /// Give up on the request after this long (e.g., 30s, 2m); waits forever when unset
    #[clap(long = "timeout", env = "PREDICTION_TIMEOUT", value_name = "DURATION")]
    pub timeout: Option<DurationSpec>,

    /// Also write the rendered region as an HTML fragment to this file
    #[clap(long = "html-out", env = "PREDICTION_HTML_OUT", value_name = "PATH")]
    pub html_out: Option<PathBuf>,

    /// Skip the terminal UI and print the HTML fragment to stdout
    #[clap(long = "headless", env = "PREDICTION_HEADLESS")]
    pub headless: bool,

    /// File that receives fetch and render failures as JSON lines
    #[clap(
        long = "error-log",
        env = "PREDICTION_ERROR_LOG",
        value_name = "PATH",
        default_value_os_t = ErrorLogStore::default_path()
    )]
    pub error_log: PathBuf,
}

impl CliParams {
    pub fn endpoint(&self) -> String {
        normalize_endpoint(&self.endpoint)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout.map(|spec| spec.as_duration())
    }
}

#[derive(Copy, Clone, Debug)]
pub struct DurationSpec(Duration);

impl DurationSpec {
    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl FromStr for DurationSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let duration = parse_duration_spec(s)?;
        Ok(DurationSpec(duration))
    }
}

// unit spellings and their length in milliseconds
const DURATION_UNITS: &[(&[&str], f64)] = &[
    (&["ms", "millis"], 1.0),
    (&["s", "sec", "secs"], 1_000.0),
    (&["m", "min", "mins"], 60_000.0),
    (&["h", "hr", "hrs"], 3_600_000.0),
];

// "<number><unit>", e.g. 250ms, 1.5s, 2m
fn parse_duration_spec(input: &str) -> Result<Duration, String> {
    let text = input.trim();
    let unit = text.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.');
    let number = &text[..text.len() - unit.len()];
    if number.is_empty() || unit.is_empty() {
        return Err(format!("expected a number followed by ms, s, m or h, got `{text}`"));
    }
    let value: f64 = number
        .parse()
        .map_err(|_| format!("`{number}` is not a number"))?;
    let unit = unit.trim().to_ascii_lowercase();
    let (_, unit_millis) = DURATION_UNITS
        .iter()
        .find(|(names, _)| names.contains(&unit.as_str()))
        .ok_or_else(|| format!("unknown duration unit `{unit}`"))?;
    Duration::try_from_secs_f64(value * unit_millis / 1_000.0)
        .ok()
        .filter(|duration| !duration.is_zero())
        .ok_or_else(|| format!("duration `{text}` must be positive"))
}

fn normalize_endpoint(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        DEFAULT_ENDPOINT.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = CliParams::try_parse_from(["prediction-view"]).unwrap();
        assert_eq!(params.endpoint(), "http://127.0.0.1:5000/predict");
        assert_eq!(params.request_timeout(), None);
        assert!(!params.headless);
        assert_eq!(params.error_log, PathBuf::from("error_logs.jsonl"));
    }

    #[test]
    fn test_overrides() {
        let params = CliParams::try_parse_from([
            "prediction-view",
            "--endpoint",
            " http://localhost:8080/predict ",
            "--timeout",
            "1.5s",
            "--headless",
            "--html-out",
            "out.html",
        ])
        .unwrap();
        assert_eq!(params.endpoint(), "http://localhost:8080/predict");
        assert_eq!(params.request_timeout(), Some(Duration::from_millis(1500)));
        assert!(params.headless);
        assert_eq!(params.html_out, Some(PathBuf::from("out.html")));
    }

    #[test]
    fn test_duration_spec_errors() {
        assert!("".parse::<DurationSpec>().is_err());
        assert!("s".parse::<DurationSpec>().is_err());
        assert!("10".parse::<DurationSpec>().is_err());
        assert!("0s".parse::<DurationSpec>().is_err());
        assert!("3d".parse::<DurationSpec>().is_err());
        assert!("1..5s".parse::<DurationSpec>().is_err());
        assert_eq!(
            "250ms".parse::<DurationSpec>().unwrap().as_duration(),
            Duration::from_millis(250)
        );
        assert_eq!(
            "2 MIN".parse::<DurationSpec>().unwrap().as_duration(),
            Duration::from_secs(120)
        );
    }
}
