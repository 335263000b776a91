//! REST API types.
//!
//! Success bodies follow the restructure contract (`summary` +
//! `download_url`); every error body is `{"detail": "..."}` with the HTTP
//! status carrying the category.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{PipelineError, ReadError, ServerError};
use crate::pipeline::RestructureOutcome;

/// Response to a successful `POST /restructure`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestructureResponse {
    /// Human-readable change summary, one line per target column.
    pub summary: String,
    /// Relative URL the generated file can be fetched from.
    pub download_url: String,
}

impl From<RestructureOutcome> for RestructureResponse {
    fn from(outcome: RestructureOutcome) -> Self {
        Self {
            summary: outcome.summary,
            download_url: format!("/download/{}", outcome.file_id),
        }
    }
}

/// Error body for every failed request.
pub fn error_response(detail: &str) -> Value {
    json!({ "detail": detail })
}

/// HTTP status for a server error: client mistakes are 400, everything
/// else is 500.
pub fn status_for(err: &ServerError) -> u16 {
    match err {
        ServerError::BadRequest(_) => 400,
        ServerError::Pipeline(PipelineError::Read(ReadError::UnsupportedFormat(_)))
        | ServerError::Pipeline(PipelineError::Read(ReadError::EmptyFile))
        | ServerError::Pipeline(PipelineError::Read(ReadError::NoHeaders))
        | ServerError::Pipeline(PipelineError::Read(ReadError::ParseError(_)))
        | ServerError::Pipeline(PipelineError::Read(ReadError::EncodingError(_)))
        | ServerError::Pipeline(PipelineError::EmptyInput) => 400,
        _ => 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::ChangeLog;

    #[test]
    fn test_response_from_outcome() {
        let outcome = RestructureOutcome {
            summary: "Mapped 2 target column(s) over 1 row(s):".to_string(),
            file_id: "restructured_abc.xlsx".to_string(),
            changelog: ChangeLog::new(1),
        };
        let response = RestructureResponse::from(outcome);
        assert_eq!(response.download_url, "/download/restructured_abc.xlsx");
        assert!(response.summary.starts_with("Mapped"));
    }

    #[test]
    fn test_error_body_shape() {
        let body = error_response("source_file field is required");
        assert_eq!(body["detail"], "source_file field is required");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&ServerError::BadRequest("missing field".into())),
            400
        );
        assert_eq!(
            status_for(&ServerError::Pipeline(PipelineError::EmptyInput)),
            400
        );
        assert_eq!(
            status_for(&ServerError::Pipeline(PipelineError::Timeout)),
            500
        );
        assert_eq!(status_for(&ServerError::Internal("boom".into())), 500);
    }
}
