use thiserror::Error;

/// Failures raised by the merge engine itself.
///
/// Malformed input rows never produce one of these: they are truncated,
/// defaulted or counted as skipped. Only a broken precondition does.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("existing record #{index} is invalid: {reason}")]
    InvalidExisting { index: usize, reason: String },

    #[error("candidate record is invalid: {0}")]
    InvalidRecord(String),

    #[error("defaults policy is invalid: {0}")]
    InvalidPolicy(String),

    #[error("no candidate ids left: the largest allowed id is already in use")]
    IdsExhausted,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CsvError {
    #[error("CSV input is empty; a header row is required")]
    EmptyInput,

    #[error("CSV input has a header row but no data rows")]
    NoDataRows,
}
