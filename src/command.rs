use crate::error::FetchError;
use crate::model::PredictionResponse;

/// Messages delivered to the UI loop from background tasks.
#[derive(Debug)]
pub enum Command {
    PredictionsFetched(Result<PredictionResponse, FetchError>),
}
