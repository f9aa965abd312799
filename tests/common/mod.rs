//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use erpc::lifecycle::Shutdown;
use erpc::{App, Server, ServerConfig};
use tokio::net::TcpListener;

/// A server running on an ephemeral port.
pub struct Running {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl Running {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config suited to tests: loopback, quiet.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config
}

/// Activate `server` and serve it in the background.
pub async fn spawn(server: Server) -> Running {
    let app = server.into_app().expect("routes compile");
    spawn_app(app).await
}

#[allow(dead_code)]
pub async fn spawn_app(app: App) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = app.serve(listener, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    Running { addr, shutdown }
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
