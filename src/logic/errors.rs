use anyhow::Error;

/// Failure of a single remote call
///
/// Per-item failures are accumulated by the orchestrator and never abort a batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),
    #[error("rejected by remote store: {0}")]
    RemoteRejected(String),
    #[error("cancelled")]
    Cancelled,
}

/// Structural precondition violations, raised before a batch starts
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("a batch is already running on this orchestrator")]
    BatchInProgress,
    #[error("move requires a destination path")]
    MissingDestination,
}

/// Classify an error based on its type and error chain
pub fn classify_error(error: &Error) -> StoreError {
    // Already classified somewhere down the chain
    if let Some(store_err) = error.chain().find_map(|e| e.downcast_ref::<StoreError>()) {
        return store_err.clone();
    }

    // Check for HTTP status codes and transport failures (via reqwest error chain)
    if let Some(reqwest_err) = error.chain().find_map(|e| e.downcast_ref::<reqwest::Error>()) {
        if let Some(status) = reqwest_err.status() {
            return StoreError::RemoteRejected(status.to_string());
        }
        if reqwest_err.is_connect() || reqwest_err.is_timeout() || reqwest_err.is_request() {
            return StoreError::NetworkUnreachable(reqwest_err.to_string());
        }
    }

    let error_msg = format!("{:#}", error).to_lowercase();
    if error_msg.contains("connection refused")
        || error_msg.contains("timeout")
        || error_msg.contains("timed out")
        || error_msg.contains("dns")
        || error_msg.contains("network")
    {
        return StoreError::NetworkUnreachable(format_error_message(error));
    }

    StoreError::RemoteRejected(format_error_message(error))
}

/// Format error message for tech-savvy audience - show raw error details
pub fn format_error_message(error: &Error) -> String {
    // Walk the error chain to find reqwest::Error (most informative for network errors)
    let mut current: Option<&dyn std::error::Error> = Some(error.as_ref());

    while let Some(err) = current {
        if let Some(reqwest_err) = err.downcast_ref::<reqwest::Error>() {
            return reqwest_err.to_string();
        }
        current = err.source();
    }

    // If no reqwest error found, walk the chain to get the deepest (root cause) error
    let mut source = error.source();
    let mut deepest = error.to_string();

    while let Some(err) = source {
        deepest = err.to_string();
        source = err.source();
    }

    deepest
}
