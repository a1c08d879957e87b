//! Serving with a bounded graceful shutdown

use std::future::{Future, IntoFuture};
use std::time::Duration;

use axum::Router;
use tokio::{net::TcpListener, sync::oneshot};
use tracing::{info, warn};

/// Serve `app` until `signal` resolves, then give open connections at most
/// `drain` to finish before returning
pub async fn serve_with_drain_timeout<F>(
    listener: TcpListener,
    app: Router,
    signal: F,
    drain: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (fired_tx, fired_rx) = oneshot::channel();
    let signal = async move {
        signal.await;
        let _ = fired_tx.send(());
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        biased;
        result = &mut server => return result,
        Ok(()) = fired_rx => {},
    }

    info!("Waiting up to {:?} for connections to close", drain);
    if let Ok(result) = tokio::time::timeout(drain, server).await {
        result
    } else {
        warn!("Connections still open after {:?}, shutting down anyway", drain);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn start(
        drain: Duration,
    ) -> (
        std::net::SocketAddr,
        oneshot::Sender<()>,
        tokio::task::JoinHandle<std::io::Result<()>>,
    ) {
        let app = Router::new()
            .route("/hang", get(|| std::future::pending::<&'static str>()))
            .route("/quick", get(|| async { "done" }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve_with_drain_timeout(
            listener,
            app,
            async move {
                let _ = stop_rx.await;
            },
            drain,
        ));
        (addr, stop_tx, handle)
    }

    async fn send_get(addr: std::net::SocketAddr, path: &str) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        stream
    }

    #[tokio::test]
    async fn stuck_request_does_not_outlive_drain_timeout() {
        let (addr, stop, handle) = start(Duration::from_millis(200)).await;
        let _client = send_get(addr, "/hang").await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        stop.send(()).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server kept waiting on the stuck request");
        assert!(result.unwrap().is_ok());
    }

    #[tokio::test]
    async fn idle_server_stops_promptly() {
        let (addr, stop, handle) = start(Duration::from_secs(30)).await;
        let mut client = send_get(addr, "/quick").await;
        let mut buf = vec![0u8; 512];
        let n = client.read(&mut buf).await.unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 200"));
        drop(client);

        stop.send(()).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("idle server did not stop");
        assert!(result.unwrap().is_ok());
    }
}
