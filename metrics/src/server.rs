/// Prometheus scrape endpoint.
///
/// The listener is bound before serving so callers learn the actual address
/// (port 0 picks a free one). Serving ends when the shutdown future resolves,
/// after in-flight scrapes have been answered.
use crate::Metrics;
use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Router};
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Clone, Debug)]
pub struct MetricsServerConfig {
    pub metrics_address: IpAddr,
    pub metrics_port: u16,
}

impl MetricsServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.metrics_address, self.metrics_port))
    }
}

async fn prometheus_metrics_handler(State(metrics): State<Arc<Metrics>>) -> String {
    metrics.gather()
}

pub struct MetricsServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl MetricsServer {
    pub async fn bind(config: &MetricsServerConfig) -> Result<Self> {
        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding metrics server to {addr}"))?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve `/metrics` until `shutdown` resolves.
    pub async fn serve(
        self,
        metrics: Arc<Metrics>,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let router = Router::new()
            .route("/metrics", get(prometheus_metrics_handler))
            .with_state(metrics);

        info!(addr = %self.local_addr, "Metrics server listening");
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!(addr = %self.local_addr, "Metrics server stopped");

        Ok(())
    }
}

pub async fn run_metrics_server(
    config: MetricsServerConfig,
    metrics: Arc<Metrics>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    MetricsServer::bind(&config)
        .await?
        .serve(metrics, shutdown)
        .await
}
