//! Request bodies and fixed example values

use crate::node::NodeSpec;
use serde::{Deserialize, Serialize};

/// Create load balancer request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerSpec {
    pub name: String,
    pub protocol: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub timeout: Option<u32>,
    #[serde(default)]
    pub https_redirect: Option<bool>,
    #[serde(default)]
    pub half_closed: Option<bool>,
    #[serde(default)]
    pub connection_logging: Option<Toggle>,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub metadata: Vec<MetadataSpec>,
}

impl LoadBalancerSpec {
    pub fn new(name: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            protocol: protocol.into(),
            port: None,
            algorithm: None,
            timeout: None,
            https_redirect: None,
            half_closed: None,
            connection_logging: None,
            nodes: Vec::new(),
            metadata: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: NodeSpec) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.push(MetadataSpec {
            key: key.into(),
            value,
        });
        self
    }
}

/// Metadata entry as supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataSpec {
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Stored metadata entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub id: u64,
    pub key: String,
    pub value: serde_json::Value,
}

/// `{"enabled": bool}` feature flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggle {
    pub enabled: bool,
}

/// Virtual IP attached to a load balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualIp {
    pub address: String,
    pub id: u64,
    #[serde(rename = "type")]
    pub ip_type: String,
    pub ip_version: String,
}

/// Source addresses of a load balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAddresses {
    pub ipv6_public: String,
    pub ipv4_servicenet: String,
    pub ipv4_public: String,
}

impl Default for SourceAddresses {
    fn default() -> Self {
        Self {
            ipv6_public: "0000:0001:0002::00/00".to_string(),
            ipv4_servicenet: "127.0.0.1".to_string(),
            ipv4_public: "127.0.0.1".to_string(),
        }
    }
}

/// The two example virtual IPs every simulated load balancer reports
pub fn example_virtual_ips() -> Vec<VirtualIp> {
    vec![
        VirtualIp {
            address: "127.0.0.1".to_string(),
            id: 1111,
            ip_type: "PUBLIC".to_string(),
            ip_version: "IPV4".to_string(),
        },
        VirtualIp {
            address: "0000:0000:0000:0000:1111:111b:0000:0000".to_string(),
            id: 1111,
            ip_type: "PUBLIC".to_string(),
            ip_version: "IPV6".to_string(),
        },
    ]
}
