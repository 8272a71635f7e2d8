//! Error types for the portal client.

/// Errors that can occur while talking to the ESO portal.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Network failure, timeout, or an unreadable response body.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The login submission came back with a non-success status.
    #[error("login rejected with status {status}")]
    Auth { status: u16 },
    /// A portal page returned a non-success status with a body snippet.
    #[error("request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// The expected `<form>` is not on the page (usually a login redirect).
    #[error("form `{form_id}` not found in page")]
    FormNotFound { form_id: String },
    /// No `<option>` text contains the configured display name.
    #[error("no object matching `{display_name}` in the consumption form")]
    SelectorNotFound { display_name: String },
    /// Several options tie for the configured display name.
    #[error("`{display_name}` matches several objects: {}", .candidates.join(", "))]
    AmbiguousSelector {
        display_name: String,
        candidates: Vec<String>,
    },
    /// The report response carries no consumption history settings block.
    #[error("report response has no consumption dataset")]
    DatasetMissing,
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// True for failures that an expired session typically produces: the
    /// portal answers with the login page or an error status instead of the
    /// requested form or report.
    pub fn may_be_stale_session(&self) -> bool {
        matches!(
            self,
            Self::HttpStatus { .. } | Self::FormNotFound { .. } | Self::DatasetMissing | Self::Json(_)
        )
    }
}
