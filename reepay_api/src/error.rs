use thiserror::Error;

/// The processor reports a double-settlement attempt with this message. Callers treat it as a success-equivalent
/// outcome rather than a failure (double-submission race shim).
const ALREADY_SETTLED_MARKER: &str = "Invoice already settled";

#[derive(Debug, Error)]
pub enum ReepayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The processor returned an empty response")]
    EmptyResponse,
}

impl ReepayApiError {
    /// True when the processor rejected a charge because the invoice was settled already.
    pub fn is_already_settled(&self) -> bool {
        matches!(self, ReepayApiError::QueryError { message, .. } if message.contains(ALREADY_SETTLED_MARKER))
    }
}
