use http::StatusCode;

/// Error that knows how it is reported over the management API
///
/// Matrix, registry and health errors implement this; each router turns
/// it into `{"error": {"type": ..., "message": ...}}`.
pub trait HttpError: std::error::Error {
    fn status_code(&self) -> StatusCode;

    /// Stable snake_case kind, e.g. `not_found` or `conflict`
    fn error_type(&self) -> &str;

    /// Message shown to API callers; never leaks backend details
    fn client_message(&self) -> String;
}
