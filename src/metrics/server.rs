//! Prometheus scrape endpoint.
//!
//! Every scrape of the metrics path runs one export cycle per configured
//! target before encoding, so readings are as fresh as the scrape interval.

use crate::exporter::ExporterSet;
use crate::metrics::MetricsRegistry;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

const OPENMETRICS_FORMAT: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Shared state for request handlers.
struct ScrapeContext {
    path: String,
    registry: MetricsRegistry,
    exporters: ExporterSet,
}

/// Prometheus metrics HTTP server.
pub struct MetricsServer {
    /// Address to bind.
    address: SocketAddr,
    context: Arc<ScrapeContext>,
}

impl MetricsServer {
    /// Create a new metrics server.
    pub fn new(
        address: SocketAddr,
        path: String,
        registry: MetricsRegistry,
        exporters: ExporterSet,
    ) -> Self {
        Self {
            address,
            context: Arc::new(ScrapeContext {
                path,
                registry,
                exporters,
            }),
        }
    }

    /// Bind the listener. Split from [`serve`] so callers learn about bind
    /// failures and the bound address up front.
    ///
    /// [`serve`]: MetricsServer::serve
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind(self.address).await
    }

    /// Bind and serve until shutdown.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) -> std::io::Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await;
        Ok(())
    }

    /// Serve scrapes on an already bound listener until shutdown.
    pub async fn serve(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) {
        let address = listener.local_addr().unwrap_or(self.address);
        info!(
            address = %address,
            path = %self.context.path,
            exporters = self.context.exporters.len(),
            "metrics server started"
        );

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, _addr)) => {
                            let context = Arc::clone(&self.context);

                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req| {
                                    let context = Arc::clone(&context);
                                    async move { handle_request(req, &context).await }
                                });

                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    debug!(error = %e, "metrics connection error");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept metrics connection");
                        }
                    }
                }

                _ = shutdown.recv() => {
                    info!("metrics server shutting down");
                    break;
                }
            }
        }
    }
}

/// Handle an incoming metrics request.
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    context: &ScrapeContext,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path();
    let method = req.method();

    debug!(path = %path, method = %method, "metrics request");

    if method != Method::GET {
        return Ok(text_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed\n"));
    }

    if path == context.path {
        let summary = context.exporters.export_all().await;
        if !summary.is_success() {
            warn!(
                failed = summary.failed.len(),
                "serving scrape with stale values for failed exporters"
            );
        }

        match context.registry.encode() {
            Ok(buffer) => {
                let mut response = text_response(StatusCode::OK, buffer);
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(OPENMETRICS_FORMAT));
                Ok(response)
            }
            Err(e) => {
                error!(error = %e, "failed to encode metrics");
                Ok(text_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to encode metrics\n",
                ))
            }
        }
    } else if path == "/health" || path == "/healthz" {
        Ok(text_response(StatusCode::OK, "OK\n"))
    } else if path == "/" {
        let body = format!(
            "rustexporter\n\nEndpoints:\n  {} - Prometheus metrics\n  /health - Health check\n",
            context.path
        );
        Ok(text_response(StatusCode::OK, body))
    } else {
        Ok(text_response(StatusCode::NOT_FOUND, "Not found\n"))
    }
}

fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}
