use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use rust_fileserver::config::{AppState, Config};
use rust_fileserver::{logger, server};

/// Pending connection queue of the listening socket
const LISTEN_BACKLOG: i32 = 1024;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;
    logger::init(&cfg)?;

    // Build the Tokio runtime, honouring the configured worker count
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr, LISTEN_BACKLOG)?;

    let state = Arc::new(AppState::new(&cfg)?);
    let connections = Arc::new(AtomicUsize::new(0));

    logger::log_server_start(&addr, &cfg);

    // Use LocalSet for spawn_local support
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::start_server_loop(listener, state, connections))
        .await
}
