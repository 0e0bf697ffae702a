// Server loop module
// Accepts connections until the process receives Ctrl+C

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Run the accept loop on `listener`
///
/// Must be called inside a `LocalSet`, since connections are served with
/// `spawn_local`. Returns after a shutdown signal; connections already
/// accepted finish in their own tasks.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            result = &mut shutdown => {
                result?;
                logger::log_info("Shutdown signal received, no longer accepting connections");
                return Ok(());
            }
        }
    }
}
