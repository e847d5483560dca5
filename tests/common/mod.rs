//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use axum::body::Bytes;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use gateway_bridge::config::{GatewayConfig, LimitsConfig, TimeoutConfig};
use gateway_bridge::http::{AppState, HttpServer, ServerError, SharedRoutes};
use gateway_bridge::lifecycle::Shutdown;
use gateway_bridge::remote::{
    ConnectionContext, DescriptorError, Identity, Invocation, InvocationResult, RemoteDescriptor,
    Resource, Variant,
};
use gateway_bridge::routing::RouteTableBuilder;

pub fn resource(id: &str, path: &str, methods: &[&str]) -> Resource {
    Resource {
        id: id.to_string(),
        path: path.to_string(),
        methods: methods.iter().map(|m| m.to_string()).collect::<BTreeSet<_>>(),
    }
}

/// In-memory remote API with a canned invoke response.
pub struct FakeDescriptor {
    apis: HashMap<String, Vec<Resource>>,
    stages: HashMap<(String, String), BTreeMap<String, String>>,
    response: InvocationResult,
    delay: Option<Duration>,
    invocations: Mutex<Vec<Invocation>>,
    cancelled: AtomicUsize,
}

/// Counts invoke futures dropped before they finished.
struct CancelGuard<'a> {
    cancelled: &'a AtomicUsize,
    finished: bool,
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl FakeDescriptor {
    pub fn new() -> Self {
        Self {
            apis: HashMap::new(),
            stages: HashMap::new(),
            response: InvocationResult {
                status: 200,
                headers: BTreeMap::new(),
                body: Bytes::from_static(b"ok"),
            },
            delay: None,
            invocations: Mutex::new(Vec::new()),
            cancelled: AtomicUsize::new(0),
        }
    }

    pub fn with_api(mut self, rest_api_id: &str, resources: Vec<Resource>) -> Self {
        self.apis.insert(rest_api_id.to_string(), resources);
        self
    }

    pub fn with_stage(mut self, rest_api_id: &str, stage: &str, variables: &[(&str, &str)]) -> Self {
        let variables = variables
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.stages
            .insert((rest_api_id.to_string(), stage.to_string()), variables);
        self
    }

    pub fn with_response(mut self, status: u16, headers: &[(&str, &str)], body: &'static [u8]) -> Self {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in headers {
            map.entry(name.to_string()).or_default().push(value.to_string());
        }
        self.response = InvocationResult {
            status,
            headers: map,
            body: Bytes::from_static(body),
        };
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Invoke calls abandoned before returning.
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteDescriptor for FakeDescriptor {
    async fn connect(&self, gateway: &GatewayConfig) -> Result<ConnectionContext, DescriptorError> {
        Ok(ConnectionContext {
            profile: gateway.profile_name.clone(),
            region: gateway.region.clone().unwrap_or_else(|| "us-east-1".to_string()),
            endpoint: Url::parse("http://fake.invalid").unwrap(),
        })
    }

    async fn list_resources(
        &self,
        _ctx: &ConnectionContext,
        rest_api_id: &str,
    ) -> Result<Vec<Resource>, DescriptorError> {
        self.apis.get(rest_api_id).cloned().ok_or(DescriptorError::Status {
            status: 404,
            body: format!("no api {rest_api_id}"),
        })
    }

    async fn describe_variant(
        &self,
        _ctx: &ConnectionContext,
        rest_api_id: &str,
        stage: &str,
    ) -> Result<Variant, DescriptorError> {
        let variables = self
            .stages
            .get(&(rest_api_id.to_string(), stage.to_string()))
            .cloned()
            .ok_or(DescriptorError::Status {
                status: 404,
                body: format!("no stage {stage}"),
            })?;
        Ok(Variant {
            name: stage.to_string(),
            variables,
        })
    }

    async fn invoke(
        &self,
        _ctx: &ConnectionContext,
        invocation: Invocation,
    ) -> Result<InvocationResult, DescriptorError> {
        self.invocations.lock().unwrap().push(invocation);
        let mut guard = CancelGuard {
            cancelled: &self.cancelled,
            finished: false,
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        guard.finished = true;
        Ok(self.response.clone())
    }

    async fn identity(&self, ctx: &ConnectionContext) -> Result<Identity, DescriptorError> {
        Ok(Identity {
            account_id: "123456789012".to_string(),
            principal: format!("arn:fake:{}", ctx.region),
        })
    }
}

/// A bridge serving on an ephemeral port.
pub struct RunningBridge {
    pub addr: SocketAddr,
    pub routes: SharedRoutes,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ServerError>>,
}

impl RunningBridge {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Build the table for `gateways` and start serving it.
pub async fn start_bridge(
    descriptor: Arc<dyn RemoteDescriptor>,
    gateways: &[GatewayConfig],
    grace: Duration,
) -> RunningBridge {
    let table = RouteTableBuilder::new(descriptor.clone())
        .build(gateways)
        .await
        .unwrap();
    let routes: SharedRoutes = Arc::new(ArcSwap::from_pointee(table));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let state = AppState::new(routes.clone(), descriptor, LimitsConfig::default());
    let server = HttpServer::new(state, &TimeoutConfig::default());
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe(), grace));

    RunningBridge {
        addr,
        routes,
        shutdown,
        handle,
    }
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
