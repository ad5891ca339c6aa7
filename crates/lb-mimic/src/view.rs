//! Caller-facing representations
//!
//! Views are built by copying out of a [`LoadBalancerRecord`]; they share no
//! structure with the store and carry no tenant linkage.

use crate::error::LoadBalancerError;
use crate::lifecycle::LoadBalancerStatus;
use crate::model::{Metadata, SourceAddresses, Toggle, VirtualIp};
use crate::node::Node;
use crate::store::LoadBalancerRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status code paired with a response body
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    pub body: T,
    pub code: u16,
}

impl<T> Reply<T> {
    /// 200 OK
    pub fn ok(body: T) -> Self {
        Self { body, code: 200 }
    }

    /// 202 Accepted
    pub fn accepted(body: T) -> Self {
        Self { body, code: 202 }
    }
}

/// `{"time": "..."}` timestamp wrapper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub time: String,
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(time: DateTime<Utc>) -> Self {
        Self {
            time: format_timestamp(time),
        }
    }
}

/// `{"name": "..."}` cluster wrapper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
}

/// Load balancer as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerView {
    pub name: String,
    pub id: u64,
    pub protocol: String,
    pub port: u16,
    pub algorithm: String,
    pub status: LoadBalancerStatus,
    pub cluster: Cluster,
    pub timeout: u32,
    pub created: Timestamp,
    pub virtual_ips: Vec<VirtualIp>,
    pub source_addresses: SourceAddresses,
    pub https_redirect: bool,
    pub updated: Timestamp,
    pub half_closed: bool,
    pub connection_logging: Toggle,
    pub content_caching: Toggle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Vec<Metadata>>,
}

impl From<&LoadBalancerRecord> for LoadBalancerView {
    fn from(record: &LoadBalancerRecord) -> Self {
        Self {
            name: record.name.clone(),
            id: record.id,
            protocol: record.protocol.clone(),
            port: record.port,
            algorithm: record.algorithm.clone(),
            status: record.status,
            cluster: Cluster {
                name: record.cluster_name.clone(),
            },
            timeout: record.timeout,
            created: record.created_at.into(),
            virtual_ips: record.virtual_ips.clone(),
            source_addresses: record.source_addresses.clone(),
            https_redirect: record.https_redirect,
            updated: record.updated_at.into(),
            half_closed: record.half_closed,
            connection_logging: record.connection_logging,
            content_caching: record.content_caching,
            nodes: record.nodes.clone(),
            metadata: record.metadata.clone(),
        }
    }
}

/// `{"loadBalancer": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerEnvelope {
    pub load_balancer: LoadBalancerView,
}

/// `{"loadBalancers": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerListEnvelope {
    pub load_balancers: Vec<LoadBalancerView>,
}

/// `{"nodes": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeListEnvelope {
    pub nodes: Vec<Node>,
}

/// `{"node": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEnvelope {
    pub node: Node,
}

/// `{"metadata": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataListEnvelope {
    pub metadata: Vec<Metadata>,
}

/// Fault body returned with every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub message: String,
    pub code: u16,
}

impl From<&LoadBalancerError> for Fault {
    fn from(err: &LoadBalancerError) -> Self {
        Self {
            message: err.to_string(),
            code: err.status_code(),
        }
    }
}

/// Render a timestamp the way the real API does, e.g.
/// `2024-01-01 00:00:00.000000+0000`
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S%.6f+0000").to_string()
}
