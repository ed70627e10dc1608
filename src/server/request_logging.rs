use crate::error::UpstreamError;

/// Server-side record of an upstream failure. Only the operation name and the
/// provider's own status/message are logged; request payloads never are.
pub(crate) fn log_upstream_failure(operation: &'static str, err: &UpstreamError) {
    tracing::error!(
        operation,
        upstream_status = ?err.status(),
        timeout = err.is_timeout(),
        error = %err,
        "Upstream call failed"
    );
}
