//! The `/metrics` endpoint.
//!
//! Renders the installed Prometheus recorder on every scrape and drains
//! in-flight scrapes before stopping on shutdown.

use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, warn};

const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

async fn scrape(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], handle.render())
}

pub struct MetricsServer {
    listener: TcpListener,
    router: Router,
    shutdown_rx: watch::Receiver<bool>,
}

impl MetricsServer {
    /// Wraps an already bound listener. Nothing is served until [`run`](Self::run).
    pub fn new(
        listener: TcpListener,
        handle: PrometheusHandle,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let router = Router::new().route("/metrics", get(scrape)).with_state(handle);
        Self {
            listener,
            router,
            shutdown_rx,
        }
    }

    /// Serves scrapes until shutdown is signalled or the sender is dropped.
    pub async fn run(self) {
        let mut shutdown_rx = self.shutdown_rx;
        let stop = async move {
            while !*shutdown_rx.borrow() {
                if shutdown_rx.changed().await.is_err() {
                    break;
                }
            }
            debug!("Metrics endpoint shutting down");
        };

        if let Err(e) = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(stop)
            .await
        {
            warn!(error = %e, "Metrics endpoint stopped with an error");
        }
    }
}
