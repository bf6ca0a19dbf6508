//! TCP front end: accept loop, connection fan-out and shutdown coordination.
//!
//! ```text
//! LISTENING -> ACCEPTING -> SHUTTING_DOWN -> CLOSED
//! ```
//!
//! Shutdown stops accepting and closes the listener. Connections already in
//! flight keep running; they are neither cancelled nor waited for.

use crate::config::ServerConfig;
use crate::error::{IndexerError, Result};
use crate::protocol::dispatcher::Dispatcher;
use crate::registry::Registry;
use crate::service::connection::{serve_connection, ConnectionContext};
use crate::service::reporter::ErrorReporter;
use crate::utils::metrics::Metrics;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, instrument};

/// Package index server bound to a listening socket
pub struct Server {
    listener: TcpListener,
    registry: Arc<Registry>,
    metrics: Arc<Metrics>,
    config: ServerConfig,
}

impl Server {
    /// Bind to `config.address` with a fresh, empty registry
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        Self::bind_with_registry(config, Arc::new(Registry::new())).await
    }

    /// Bind to `config.address`, serving an existing registry
    #[instrument(skip(config, registry), fields(address = %config.address))]
    pub async fn bind_with_registry(config: ServerConfig, registry: Arc<Registry>) -> Result<Self> {
        let listener = TcpListener::bind(&config.address).await?;
        info!(address = %listener.local_addr()?, "Listening");

        Ok(Self {
            listener,
            registry,
            metrics: Arc::new(Metrics::new()),
            config,
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared handle to the registry this server mutates
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Serve until CTRL+C is received
    pub async fn run(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received CTRL+C signal");
                    let _ = shutdown_tx.send(()).await;
                }
                Err(e) => error!(error = %e, "Failed to listen for CTRL+C"),
            }
        });

        self.run_until(shutdown_rx).await
    }

    /// Serve until a message arrives on `shutdown_rx`.
    ///
    /// Returns once the listener is closed. Dropping every sender of
    /// `shutdown_rx` without sending does not stop the server.
    #[instrument(skip_all)]
    pub async fn run_until(self, shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        let Server {
            listener,
            registry,
            metrics,
            config,
        } = self;

        let (reporter, errors_rx) = ErrorReporter::channel(config.error_backlog);
        let (stop_tx, mut stop_rx) = watch::channel(false);
        tokio::spawn(watch_shutdown(shutdown_rx, errors_rx, stop_tx));

        let ctx = ConnectionContext {
            dispatcher: Arc::new(Dispatcher::new(registry)),
            reporter,
            metrics: Arc::clone(&metrics),
            max_line_length: config.max_line_length,
        };

        loop {
            tokio::select! {
                // A closed watch channel also ends the loop
                _ = stop_rx.changed() => break,

                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            info!(peer = %peer, "Connection accepted");
                            tokio::spawn(serve_connection(stream, peer.to_string(), ctx.clone()));
                        }
                        Err(e) => {
                            metrics.transport_error();
                            error!(error = %e, "Error accepting connection");
                        }
                    }
                }
            }
        }

        drop(listener);
        info!("Listener closed");
        metrics.log_metrics();
        Ok(())
    }
}

/// Waits for either an interrupt or a reported error.
///
/// Errors are logged as they arrive. The first interrupt flips `stop_tx`,
/// after which errors from connections still in flight keep being logged
/// until every reporter is gone.
async fn watch_shutdown(
    mut shutdown_rx: mpsc::Receiver<()>,
    mut errors_rx: mpsc::Receiver<IndexerError>,
    stop_tx: watch::Sender<bool>,
) {
    let mut accepting = true;

    loop {
        tokio::select! {
            signal = shutdown_rx.recv(), if accepting => {
                accepting = false;
                if signal.is_some() {
                    info!("Shutting down server");
                    let _ = stop_tx.send(true);
                }
            }
            Some(err) = errors_rx.recv() => {
                error!(error = %err, "Error in connection handler");
            }
            else => break,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::io;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpStream;

    /// Log sink shared between the subscriber and the test body
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn local_config() -> ServerConfig {
        ServerConfig {
            address: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn shutdown_stops_accepting() {
        let server = Server::bind(local_config()).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(server.run_until(rx));

        tx.send(()).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();

        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn in_flight_connection_survives_shutdown() {
        let server = Server::bind(local_config()).await.unwrap();
        let addr = server.local_addr().unwrap();
        let registry = server.registry();
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(server.run_until(rx));

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        write_half.write_all(b"INDEX|zlib|\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("OK"));

        tx.send(()).await.unwrap();
        handle.await.unwrap().unwrap();

        write_half.write_all(b"QUERY|zlib|\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("OK"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn dropping_shutdown_sender_keeps_serving() {
        let server = Server::bind(local_config()).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (tx, rx) = mpsc::channel::<()>(1);
        let handle = tokio::spawn(server.run_until(rx));
        drop(tx);

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();
        write_half.write_all(b"QUERY|zlib|\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("FAIL"));

        assert!(!handle.is_finished());
        handle.abort();
    }

    #[tokio::test]
    async fn watcher_logs_errors_and_interrupt() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (reporter, errors_rx) = ErrorReporter::channel(4);
        let (stop_tx, stop_rx) = watch::channel(false);

        reporter
            .report(IndexerError::UnknownCommand("PING".into()))
            .await;
        shutdown_tx.send(()).await.unwrap();
        drop(reporter);

        tokio::time::timeout(
            Duration::from_secs(5),
            watch_shutdown(shutdown_rx, errors_rx, stop_tx),
        )
        .await
        .expect("watcher did not finish");

        assert!(*stop_rx.borrow());
        let output = logs.contents();
        assert!(output.contains("Error in connection handler"), "{output}");
        assert!(output.contains("Unknown command: PING"), "{output}");
        assert!(output.contains("Shutting down server"), "{output}");
    }
}
