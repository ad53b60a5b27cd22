//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::tools::{ToolError, ToolErrorKind};

/// Wrap a tool future with a hard deadline. Expiry drops the future.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, ToolError>>,
) -> Result<T, ToolError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(ToolError::new(
            ToolErrorKind::Timeout,
            format!("tool timed out after {}ms", duration.as_millis()),
        )),
    }
}
