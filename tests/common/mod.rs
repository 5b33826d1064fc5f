//! Common utilities for integration tests
//!
//! Starts a real registry server on an ephemeral port so tests can talk to it
//! over HTTP and WebSocket.

use device_registry::api::server::{AppState, DeviceServer};
use device_registry::config::ServerConfig;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A registry server running in the background for the duration of a test
pub struct TestServer {
    pub addr: SocketAddr,
    #[allow(dead_code)] // Not all test files inspect state directly
    pub state: AppState,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let config = ServerConfig::default().with_overrides(Some("127.0.0.1".into()), Some(0), None);
        let server = DeviceServer::new(config);
        let state = server.state().clone();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            server
                .serve(listener, std::future::pending::<()>())
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    #[allow(dead_code)]
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
