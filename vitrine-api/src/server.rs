//! HTTP server lifecycle.

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;

use crate::error::{ApiError, ApiResult};

/// Serve `app` until `shutdown` resolves, then stop accepting connections
/// and wait for in-flight requests to finish.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> ApiResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))
}

/// Resolves on Ctrl-C. A failure to install the handler is logged and the
/// server then runs until killed.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn slow_ok() -> &'static str {
        tokio::time::sleep(Duration::from_millis(200)).await;
        "done"
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_request() {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind should succeed");
        let addr = listener.local_addr().expect("local addr should exist");
        let app = Router::new().route("/slow", axum::routing::get(slow_ok));

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, app, async {
            let _ = stop_rx.await;
        }));

        let mut stream = TcpStream::connect(addr).await.expect("connect should succeed");
        stream
            .write_all(b"GET /slow HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .expect("write should succeed");
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop_tx.send(()).expect("server should be listening for shutdown");

        let mut response = String::new();
        stream
            .read_to_string(&mut response)
            .await
            .expect("read should succeed");
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("done"));

        let result = server.await.expect("server task should not panic");
        assert!(result.is_ok());
    }
}
