use thiserror::Error;

/// Errors raised while turning a transaction export into a report.
///
/// `Schema` and `Parse` abort the whole analysis: a financial report built
/// from partially-read data is worse than no report. `SourceNotRecognized`
/// is a normal terminal outcome, not a crash.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The column mapping is inconsistent or a mapped column is missing
    /// from a row.
    #[error("column mapping error: {0}")]
    Schema(String),

    /// A row's amount or date could not be parsed.
    #[error("failed to parse row value: {0}")]
    Parse(String),

    /// No adapter's file pattern matched the input.
    #[error("'{0}' was not recognized by any configured bank")]
    SourceNotRecognized(String),
}
