//! Shared utilities for integration and load testing.

use std::net::SocketAddr;

use routeman::{Router, Shutdown};
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral local port.
///
/// The listener is bound before this returns, so requests can be sent immediately.
pub async fn start_router(router: Router) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let stop = shutdown.signalled();

    tokio::spawn(async move {
        if let Err(e) = router.serve(listener, stop).await {
            eprintln!("test server failed: {}", e);
        }
    });

    (addr, shutdown)
}

/// Base URL for a server started with [`start_router`].
#[allow(dead_code)]
pub fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{}{}", addr, path)
}
