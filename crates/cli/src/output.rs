use eyre::{bail, Result};
use tokenlease_backend::Response;

/// Render a response for stdout.
///
/// Error responses become an `Err` so the process exits non-zero; warnings
/// are logged. An empty response renders nothing.
pub fn render(response: &Response) -> Result<Option<String>> {
    for warning in &response.warnings {
        tracing::warn!("{warning}");
    }
    if let Some(message) = response.error_message() {
        bail!("{message}");
    }
    if response.data.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string_pretty(&response.data)?))
}
