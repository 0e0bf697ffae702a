// Connection handling module
// Accepts a single TCP connection and serves it over HTTP/1.1

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Accept and process a connection, checking limits and logging.
///
/// Returns `false` when the connection was rejected because
/// `max_connections` was reached.
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
) -> bool {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return false;
        }
    }

    logger::log_connection_accepted(&peer_addr);

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(conn_counter),
    );
    true
}

/// Serve one connection in a local task.
///
/// Keep-alive follows `keep_alive_timeout`; the whole connection is bounded
/// by the larger of the read and write timeouts. The connection counter is
/// decremented when the task ends.
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::task::spawn_local(async move {
        let io = TokioIo::new(stream);

        let performance = &state.config.performance;
        let keep_alive = performance.keep_alive_timeout > 0;
        let timeout_duration = Duration::from_secs(std::cmp::max(
            performance.read_timeout,
            performance.write_timeout,
        ));

        let mut builder = http1::Builder::new();
        builder.keep_alive(keep_alive);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                handler::handle_request(req, Arc::clone(&service_state), peer_addr)
            }),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} timed out after {} seconds",
                    timeout_duration.as_secs()
                ));
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::create_reusable_listener;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn test_state(dir: &TempDir, max_connections: Option<u64>) -> Arc<AppState> {
        let mut config = Config::load_from(dir.path().join("none").to_str().unwrap()).unwrap();
        config.resources.root = dir.path().to_str().unwrap().to_string();
        config.logging.access_log = false;
        config.performance.max_connections = max_connections;
        Arc::new(AppState::new(&config).unwrap())
    }

    #[tokio::test]
    async fn test_serves_http_over_tcp() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "abcdef").unwrap();
        let state = test_state(&dir, None);
        let counter = Arc::new(AtomicUsize::new(0));

        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = listener.local_addr().unwrap();

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async move {
                let client = tokio::task::spawn_local(async move {
                    let mut stream = TcpStream::connect(addr).await.unwrap();
                    stream
                        .write_all(
                            b"GET /a.txt HTTP/1.1\r\nHost: x\r\nRange: bytes=2-3\r\nConnection: close\r\n\r\n",
                        )
                        .await
                        .unwrap();
                    let mut out = String::new();
                    stream.read_to_string(&mut out).await.unwrap();
                    out
                });

                let (stream, peer) = listener.accept().await.unwrap();
                assert!(accept_connection(stream, peer, &state, &counter));

                let out = client.await.unwrap();
                assert!(out.starts_with("HTTP/1.1 206"));
                assert!(out.to_ascii_lowercase().contains("content-range: bytes 2-3/6"));
                assert!(out.ends_with("cd"));
            })
            .await;
    }

    #[tokio::test]
    async fn test_rejects_over_limit() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, Some(1));
        let counter = Arc::new(AtomicUsize::new(1));

        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = TcpStream::connect(addr).await.unwrap();
        let (stream, peer) = listener.accept().await.unwrap();

        assert!(!accept_connection(stream, peer, &state, &counter));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
