//! Shared utilities for integration testing.

#![allow(dead_code)]

use async_trait::async_trait;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use kitsvc::config::ServiceConfig;
use kitsvc::discovery::{RegistryError, ServiceIdentity, ServiceRegistry};

pub const PROBE_INTERVAL: Duration = Duration::from_millis(20);

/// Bind an ephemeral port on localhost.
pub async fn ephemeral_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Config for a service bound at `addr` with a fast probe.
pub fn test_config(addr: SocketAddr) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.service.name = "user".into();
    config.service.addr = addr.to_string();
    config.service.url = format!("http://{addr}");
    config.probe.max_attempts = 5;
    config.probe.interval_ms = PROBE_INTERVAL.as_millis() as u64;
    config.probe.timeout_ms = 500;
    config.timeouts.shutdown_secs = 2;
    config.observability.metrics_enabled = false;
    config
}

/// Start a programmable backend. `f` is called once per connection and
/// returns the status code and body to answer with.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let (listener, addr) = ephemeral_listener().await;
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let _ = socket.read(&mut buf).await;
                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK".to_string(),
                            404 => "404 Not Found".to_string(),
                            500 => "500 Internal Server Error".to_string(),
                            503 => "503 Service Unavailable".to_string(),
                            other => format!("{other} Unknown"),
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Registry that records calls instead of talking to an agent.
#[derive(Default)]
pub struct RecordingRegistry {
    pub registered: AtomicUsize,
    pub deregistered: AtomicUsize,
    pub reject: bool,
    pub last: Mutex<Option<ServiceIdentity>>,
}

impl RecordingRegistry {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }

    pub fn registrations(&self) -> usize {
        self.registered.load(Ordering::SeqCst)
    }

    pub fn deregistrations(&self) -> usize {
        self.deregistered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceRegistry for RecordingRegistry {
    async fn register(&self, identity: &ServiceIdentity) -> Result<(), RegistryError> {
        self.registered.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(identity.clone());
        if self.reject {
            return Err(RegistryError::Rejected {
                status: 500,
                body: "consul unavailable".into(),
            });
        }
        Ok(())
    }

    async fn deregister(&self, _identity: &ServiceIdentity) -> Result<(), RegistryError> {
        self.deregistered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub async fn wait_until<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
