//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the single proxy handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Accept connections and serve each one in a tracked task
//! - Dispatch requests to the route table
//! - Forward matched requests through the remote descriptor
//! - Drain in-flight requests on shutdown, up to a deadline

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use arc_swap::ArcSwap;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
    service::TowerToHyperService,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tower_http::{
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{LimitsConfig, TimeoutConfig};
use crate::http::forward::forward;
use crate::http::request::{
    propagate_request_id_layer, request_id, request_span, set_request_id_layer,
};
use crate::http::response::ProxyError;
use crate::observability::metrics;
use crate::remote::RemoteDescriptor;
use crate::routing::RouteTable;

/// Shared handle to the active route table.
pub type SharedRoutes = Arc<ArcSwap<RouteTable>>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("in-flight requests still running after {0:?} shutdown grace period")]
    ShutdownTimeout(Duration),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: SharedRoutes,
    pub descriptor: Arc<dyn RemoteDescriptor>,
    pub limits: LimitsConfig,
}

impl AppState {
    pub fn new(routes: SharedRoutes, descriptor: Arc<dyn RemoteDescriptor>, limits: LimitsConfig) -> Self {
        Self {
            routes,
            descriptor,
            limits,
        }
    }
}

/// HTTP server for the bridge.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server around the given state.
    pub fn new(state: AppState, timeouts: &TimeoutConfig) -> Self {
        let router = Self::build_router(state, Duration::from_secs(timeouts.request_secs));
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(request_span::<Body>))
            .layer(set_request_id_layer())
    }

    /// Run the server until `shutdown` fires, then drain for at most `grace`.
    ///
    /// Connections still open at the deadline are aborted.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
        grace: Duration,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let (drain_tx, drain_rx) = watch::channel(false);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(serve_connection(
                            self.router.clone(),
                            stream,
                            peer,
                            drain_rx.clone(),
                        ));
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to accept connection"),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = shutdown.recv() => break,
            }
        }

        drop(listener);
        tracing::info!(
            grace_ms = grace.as_millis() as u64,
            connections = connections.len(),
            "Shutdown started, no longer accepting connections"
        );
        let _ = drain_tx.send(true);

        let drained = tokio::time::timeout(grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        match drained {
            Ok(()) => {
                tracing::info!("HTTP server stopped");
                Ok(())
            }
            Err(_) => {
                tracing::warn!(
                    grace_ms = grace.as_millis() as u64,
                    connections = connections.len(),
                    "Shutdown deadline elapsed, closing remaining connections"
                );
                connections.abort_all();
                while connections.join_next().await.is_some() {}
                Err(ServerError::ShutdownTimeout(grace))
            }
        }
    }
}

/// Serve one connection; on drain, finish the in-flight request and close.
async fn serve_connection(
    router: Router,
    stream: TcpStream,
    peer: SocketAddr,
    mut drain: watch::Receiver<bool>,
) {
    let builder = auto::Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection(TokioIo::new(stream), TowerToHyperService::new(router));
    tokio::pin!(conn);

    tokio::select! {
        result = &mut conn => {
            if let Err(e) = result {
                tracing::debug!(peer = %peer, error = %e, "Connection closed with error");
            }
            return;
        }
        _ = drain.changed() => conn.as_mut().graceful_shutdown(),
    }

    if let Err(e) = conn.await {
        tracing::debug!(peer = %peer, error = %e, "Connection closed with error during drain");
    }
}

/// Main proxy handler.
/// Looks up the route and forwards the request through the remote API.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Proxying request"
    );

    // Snapshot: a reload mid-request doesn't affect this request.
    let table = state.routes.load_full();
    let route = match table.lookup(&method, &path) {
        Ok(route) => route,
        Err(e) => {
            let error = ProxyError::from(e);
            tracing::warn!(
                request_id = %request_id,
                method = %method,
                path = %path,
                kind = error.kind(),
                error = %error,
                "Request not routed"
            );
            metrics::record_request(&method, error.status_code().as_u16(), "none", start_time);
            return error.into_response();
        }
    };
    let template = route.entry.effective_path.as_str();

    match forward(state.descriptor.as_ref(), route, request, state.limits.max_body_bytes).await {
        Ok(response) => {
            let status = response.status().as_u16();
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                route = %template,
                status_code = status,
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Request forwarded"
            );
            metrics::record_request(&method, status, template, start_time);
            response
        }
        Err(error) => {
            tracing::error!(
                request_id = %request_id,
                method = %method,
                path = %path,
                route = %template,
                kind = error.kind(),
                error = %error,
                "Request failed"
            );
            metrics::record_request(&method, error.status_code().as_u16(), template, start_time);
            error.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::remote::{
        ConnectionContext, DescriptorError, Identity, Invocation, InvocationResult, Resource,
        Variant,
    };
    use crate::routing::RouteTableBuilder;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Bytes};
    use axum::http::StatusCode;
    use std::collections::{BTreeMap, BTreeSet};
    use tower::ServiceExt;
    use url::Url;

    /// One resource, `/items/{id}` on GET; invoke echoes the path.
    struct EchoDescriptor;

    #[async_trait]
    impl RemoteDescriptor for EchoDescriptor {
        async fn connect(&self, _gateway: &GatewayConfig) -> Result<ConnectionContext, DescriptorError> {
            Ok(ConnectionContext {
                profile: None,
                region: "us-east-1".to_string(),
                endpoint: Url::parse("http://localhost:4566").map_err(|e| DescriptorError::InvalidEndpoint(e.to_string()))?,
            })
        }

        async fn list_resources(
            &self,
            _ctx: &ConnectionContext,
            _rest_api_id: &str,
        ) -> Result<Vec<Resource>, DescriptorError> {
            Ok(vec![Resource {
                id: "item".to_string(),
                path: "/items/{id}".to_string(),
                methods: BTreeSet::from(["GET".to_string()]),
            }])
        }

        async fn describe_variant(
            &self,
            _ctx: &ConnectionContext,
            _rest_api_id: &str,
            stage: &str,
        ) -> Result<Variant, DescriptorError> {
            Ok(Variant {
                name: stage.to_string(),
                variables: BTreeMap::new(),
            })
        }

        async fn invoke(
            &self,
            _ctx: &ConnectionContext,
            invocation: Invocation,
        ) -> Result<InvocationResult, DescriptorError> {
            Ok(InvocationResult {
                status: 200,
                headers: BTreeMap::new(),
                body: Bytes::from(invocation.path_with_query),
            })
        }

        async fn identity(&self, _ctx: &ConnectionContext) -> Result<Identity, DescriptorError> {
            Err(DescriptorError::Decode("unused".to_string()))
        }
    }

    async fn router(max_body_bytes: usize) -> Router {
        let descriptor: Arc<dyn RemoteDescriptor> = Arc::new(EchoDescriptor);
        let table = RouteTableBuilder::new(descriptor.clone())
            .build(&[GatewayConfig::new("api")])
            .await
            .unwrap();
        let state = AppState::new(
            Arc::new(ArcSwap::from_pointee(table)),
            descriptor,
            LimitsConfig { max_body_bytes },
        );
        HttpServer::build_router(state, Duration::from_secs(5))
    }

    fn request(method: &str, uri: &str, body: Body) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(body).unwrap()
    }

    #[tokio::test]
    async fn matched_request_is_forwarded() {
        let response = router(1024)
            .await
            .oneshot(request("GET", "/items/5?full=1", Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"/items/5?full=1");
    }

    #[tokio::test]
    async fn root_without_resource_is_not_found() {
        let response = router(1024)
            .await
            .oneshot(request("GET", "/", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn client_request_id_is_kept() {
        let mut req = request("GET", "/items/1", Body::empty());
        req.headers_mut()
            .insert("x-request-id", axum::http::HeaderValue::from_static("req-123"));
        let response = router(1024).await.oneshot(req).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-123");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut req = request("GET", "/items/1", Body::from(vec![b'x'; 64]));
        req.headers_mut()
            .insert("content-length", axum::http::HeaderValue::from_static("64"));
        let response = router(16).await.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        // Without a declared length the read itself hits the limit.
        let req = request("GET", "/items/1", Body::from(vec![b'x'; 64]));
        let response = router(16).await.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["kind"], "body_too_large");
    }
}
