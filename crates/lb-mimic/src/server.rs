//! HTTP front end
//!
//! Exposes [`LoadBalancerService`] over the same URL layout as the real API:
//!
//! ```text
//! POST   /v1.0/{tenant}/loadbalancers
//! GET    /v1.0/{tenant}/loadbalancers
//! GET    /v1.0/{tenant}/loadbalancers/{id}
//! DELETE /v1.0/{tenant}/loadbalancers/{id}
//! POST   /v1.0/{tenant}/loadbalancers/{id}/nodes
//! GET    /v1.0/{tenant}/loadbalancers/{id}/nodes
//! GET    /v1.0/{tenant}/loadbalancers/{id}/nodes/{node_id}
//! DELETE /v1.0/{tenant}/loadbalancers/{id}/nodes/{node_id}
//! GET    /v1.0/{tenant}/loadbalancers/{id}/metadata
//! GET    /presets
//! ```

use crate::error::{LoadBalancerError, Result};
use crate::model::LoadBalancerSpec;
use crate::node::NodeSpec;
use crate::presets::presets;
use crate::view::{
    Fault, LoadBalancerEnvelope, LoadBalancerListEnvelope, MetadataListEnvelope, NodeEnvelope,
    NodeListEnvelope, Reply,
};
use crate::LoadBalancerService;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Create load balancer request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoadBalancerRequest {
    pub load_balancer: LoadBalancerSpec,
}

/// Add nodes request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddNodesRequest {
    pub nodes: Vec<NodeSpec>,
}

/// Load balancer simulator HTTP server
#[derive(Debug)]
pub struct LoadBalancerServer {
    listener: TcpListener,
    service: LoadBalancerService,
}

impl LoadBalancerServer {
    /// Bind the server to an address
    pub async fn bind(addr: impl ToSocketAddrs, service: LoadBalancerService) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, service })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve connections until `shutdown` resolves
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        info!("Load balancer simulator listening on {}", self.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Load balancer simulator stopped");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(err) => {
                            warn!("Failed to accept connection: {}", err);
                            continue;
                        }
                    };

                    let io = TokioIo::new(stream);
                    let service = self.service.clone();

                    tokio::task::spawn(async move {
                        let handler = service_fn(move |req| handle_request(service.clone(), req));
                        if let Err(err) = http1::Builder::new().serve_connection(io, handler).await {
                            debug!(%peer, "Error serving connection: {}", err);
                        }
                    });
                }
            }
        }
    }

    /// Serve connections forever
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server on a background task
    pub fn spawn(self) -> Result<ServerHandle> {
        let addr = self.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run_until(async {
            shutdown_rx.await.ok();
        }));

        Ok(ServerHandle {
            addr,
            shutdown_tx: Some(shutdown_tx),
            task,
        })
    }
}

/// Handle to a server started with [`LoadBalancerServer::spawn`]
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL, e.g. `http://127.0.0.1:8900`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the server and wait for the accept loop to exit
    pub async fn stop(mut self) -> Result<()> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        self.task
            .await
            .map_err(|e| LoadBalancerError::Internal(format!("Server task failed: {}", e)))?
    }
}

async fn handle_request(
    service: LoadBalancerService,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            return Ok(fault_response(&LoadBalancerError::BadRequest(format!(
                "Failed to read request body: {}",
                err
            ))))
        }
    };

    debug!(method = %parts.method, path = parts.uri.path(), "Handling request");
    Ok(route(&service, &parts.method, parts.uri.path(), &body))
}

/// Dispatch a request to the matching service operation
pub fn route(
    service: &LoadBalancerService,
    method: &Method,
    path: &str,
    body: &[u8],
) -> Response<Full<Bytes>> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let result = match (method, segments.as_slice()) {
        (&Method::GET, ["presets"]) => Ok(json_response(200, &presets())),
        (&Method::POST, [_, tenant, "loadbalancers"]) => {
            serde_json::from_slice::<CreateLoadBalancerRequest>(body)
                .map_err(LoadBalancerError::from)
                .and_then(|req| service.create_load_balancer(tenant, req.load_balancer))
                .map(|reply| {
                    envelope(reply, |load_balancer| LoadBalancerEnvelope { load_balancer })
                })
        }
        (&Method::GET, [_, tenant, "loadbalancers"]) => Ok(envelope(
            service.list_load_balancers(tenant),
            |load_balancers| LoadBalancerListEnvelope { load_balancers },
        )),
        (&Method::GET, [_, _, "loadbalancers", lb_id]) => parse_id(lb_id)
            .and_then(|lb_id| service.get_load_balancer(lb_id))
            .map(|reply| envelope(reply, |load_balancer| LoadBalancerEnvelope { load_balancer })),
        (&Method::DELETE, [_, _, "loadbalancers", lb_id]) => parse_id(lb_id)
            .and_then(|lb_id| service.delete_load_balancer(lb_id))
            .map(empty_response),
        (&Method::POST, [_, _, "loadbalancers", lb_id, "nodes"]) => parse_id(lb_id)
            .and_then(|lb_id| {
                let req = serde_json::from_slice::<AddNodesRequest>(body)?;
                service.add_nodes(lb_id, req.nodes)
            })
            .map(|reply| envelope(reply, |nodes| NodeListEnvelope { nodes })),
        (&Method::GET, [_, _, "loadbalancers", lb_id, "nodes"]) => parse_id(lb_id)
            .and_then(|lb_id| service.list_nodes(lb_id))
            .map(|reply| envelope(reply, |nodes| NodeListEnvelope { nodes })),
        (&Method::GET, [_, _, "loadbalancers", lb_id, "nodes", node_id]) => parse_id(lb_id)
            .and_then(|lb_id| service.get_node(lb_id, parse_id(node_id)?))
            .map(|reply| envelope(reply, |node| NodeEnvelope { node })),
        (&Method::DELETE, [_, _, "loadbalancers", lb_id, "nodes", node_id]) => parse_id(lb_id)
            .and_then(|lb_id| service.delete_node(lb_id, parse_id(node_id)?))
            .map(empty_response),
        (&Method::GET, [_, _, "loadbalancers", lb_id, "metadata"]) => parse_id(lb_id)
            .and_then(|lb_id| service.list_metadata(lb_id))
            .map(|reply| envelope(reply, |metadata| MetadataListEnvelope { metadata })),
        _ => Ok(json_response(
            404,
            &Fault {
                message: format!("No route for {} {}", method, path),
                code: 404,
            },
        )),
    };

    result.unwrap_or_else(|err| fault_response(&err))
}

fn parse_id(segment: &str) -> Result<u64> {
    segment
        .parse()
        .map_err(|_| LoadBalancerError::BadRequest(format!("Invalid id: {}", segment)))
}

fn envelope<T, E: Serialize>(reply: Reply<T>, wrap: impl FnOnce(T) -> E) -> Response<Full<Bytes>> {
    json_response(reply.code, &wrap(reply.body))
}

fn empty_response(reply: Reply<()>) -> Response<Full<Bytes>> {
    response(reply.code, Bytes::new())
}

fn fault_response(err: &LoadBalancerError) -> Response<Full<Bytes>> {
    if err.status_code() >= 500 {
        warn!(category = err.category(), "Request failed: {}", err);
    }
    json_response(err.status_code(), &Fault::from(err))
}

fn json_response(code: u16, body: &impl Serialize) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(bytes) => {
            let mut response = response(code, Bytes::from(bytes));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(err) => {
            warn!("Failed to serialize response: {}", err);
            response(500, Bytes::from_static(b"Internal Server Error"))
        }
    }
}

fn response(code: u16, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response
}
