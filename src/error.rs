use thiserror::Error;

/// Failures the command layer knows how to classify.
///
/// `NotFound`, `Validation` and `Config` are reported to the user as a plain
/// message with exit code 1. The rest propagate out of `main` with their
/// full cause chain.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Config(String),

    #[error("LLM request failed: {0}")]
    Upstream(String),

    #[error("Model response was not valid CV JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("PDF rendering failed: {0}")]
    Render(String),
}

impl AppError {
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_) | AppError::Validation(_) | AppError::Config(_)
        )
    }
}

/// Finds the first `AppError` in an error chain, if any.
pub fn classify(err: &anyhow::Error) -> Option<&AppError> {
    err.chain().find_map(|cause| cause.downcast_ref::<AppError>())
}
