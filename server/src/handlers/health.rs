//! Liveness endpoint.

use axum::http::StatusCode;

/// Returns 200 OK while the process is serving requests. Dependencies are
/// not checked.
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_ok() {
        assert_eq!(health_check().await, (StatusCode::OK, "ok"));
    }
}
