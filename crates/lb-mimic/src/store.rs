//! Load balancer record store
//!
//! [`SimulatorState`] owns the record store and the directive store and is the
//! only caller of [`lifecycle::advance`]; every status-sensitive operation goes
//! through [`SimulatorState::refresh`] first.

use crate::config::DefaultsConfig;
use crate::directives::{ControlDirectives, DirectiveStore};
use crate::lifecycle::{self, Holds, LoadBalancerStatus, Transition};
use crate::model::{example_virtual_ips, LoadBalancerSpec, Metadata, SourceAddresses, Toggle, VirtualIp};
use crate::node::Node;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Internal representation of a simulated load balancer
#[derive(Debug, Clone, PartialEq)]
pub struct LoadBalancerRecord {
    pub id: u64,
    /// Owning tenant, never exposed to callers
    pub tenant_id: String,
    pub name: String,
    pub protocol: String,
    pub port: u16,
    pub algorithm: String,
    pub timeout: u32,
    pub status: LoadBalancerStatus,
    pub cluster_name: String,
    pub virtual_ips: Vec<VirtualIp>,
    pub source_addresses: SourceAddresses,
    pub https_redirect: bool,
    pub half_closed: bool,
    pub connection_logging: Toggle,
    pub content_caching: Toggle,
    pub created_at: DateTime<Utc>,
    /// Anchor for all elapsed-time calculations
    pub updated_at: DateTime<Utc>,
    pub nodes: Option<Vec<Node>>,
    pub metadata: Option<Vec<Metadata>>,
}

impl LoadBalancerRecord {
    /// Build a record from a create request, filling in example values
    pub fn from_spec(
        id: u64,
        tenant_id: &str,
        spec: &LoadBalancerSpec,
        status: LoadBalancerStatus,
        now: DateTime<Utc>,
        defaults: &DefaultsConfig,
    ) -> Self {
        Self {
            id,
            tenant_id: tenant_id.to_string(),
            name: spec.name.clone(),
            protocol: spec.protocol.clone(),
            port: spec.port.unwrap_or(defaults.port),
            algorithm: spec
                .algorithm
                .clone()
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| defaults.algorithm.clone()),
            timeout: spec.timeout.unwrap_or(defaults.timeout),
            status,
            cluster_name: defaults.cluster_name.clone(),
            virtual_ips: example_virtual_ips(),
            source_addresses: SourceAddresses::default(),
            https_redirect: spec.https_redirect.unwrap_or(false),
            half_closed: spec.half_closed.unwrap_or(false),
            connection_logging: spec.connection_logging.unwrap_or_default(),
            content_caching: Toggle::default(),
            created_at: now,
            updated_at: now,
            nodes: None,
            metadata: None,
        }
    }

    pub fn node_list(&self) -> &[Node] {
        self.nodes.as_deref().unwrap_or_default()
    }
}

/// Records keyed by load balancer id
#[derive(Debug, Default)]
pub struct RecordStore {
    records: BTreeMap<u64, LoadBalancerRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: LoadBalancerRecord) {
        self.records.insert(record.id, record);
    }

    pub fn get(&self, lb_id: u64) -> Option<&LoadBalancerRecord> {
        self.records.get(&lb_id)
    }

    pub fn get_mut(&mut self, lb_id: u64) -> Option<&mut LoadBalancerRecord> {
        self.records.get_mut(&lb_id)
    }

    pub fn remove(&mut self, lb_id: u64) -> Option<LoadBalancerRecord> {
        self.records.remove(&lb_id)
    }

    pub fn contains(&self, lb_id: u64) -> bool {
        self.records.contains_key(&lb_id)
    }

    /// Ids of all records owned by a tenant, in id order
    pub fn ids_for_tenant(&self, tenant_id: &str) -> Vec<u64> {
        self.records
            .values()
            .filter(|r| r.tenant_id == tenant_id)
            .map(|r| r.id)
            .collect()
    }

    /// All records owned by a tenant, in id order
    pub fn list_by_tenant<'a>(
        &'a self,
        tenant_id: &'a str,
    ) -> impl Iterator<Item = &'a LoadBalancerRecord> + 'a {
        self.records.values().filter(move |r| r.tenant_id == tenant_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Records plus their control directives
#[derive(Debug, Default)]
pub struct SimulatorState {
    pub records: RecordStore,
    pub directives: DirectiveStore,
}

impl SimulatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: LoadBalancerRecord, directives: ControlDirectives) {
        self.directives.insert(record.id, directives);
        self.records.insert(record);
    }

    /// Remove a record together with its directives
    pub fn remove(&mut self, lb_id: u64) -> Option<LoadBalancerRecord> {
        self.directives.remove(lb_id);
        self.records.remove(lb_id)
    }

    /// Bring a record's status up to date
    ///
    /// Returns the current status, or `None` if the record does not exist or
    /// was expunged by this call.
    pub fn refresh(
        &mut self,
        lb_id: u64,
        side_effecting: bool,
        now: DateTime<Utc>,
        holds: &Holds,
    ) -> Option<LoadBalancerStatus> {
        let record = self.records.get_mut(lb_id)?;
        let directives = self.directives.entry(lb_id);

        match lifecycle::advance(
            record.status,
            record.updated_at,
            directives,
            now,
            side_effecting,
            holds,
        ) {
            Transition::Stay => Some(record.status),
            Transition::Enter(next) => {
                debug!(
                    lb_id,
                    from = %record.status,
                    to = %next,
                    side_effecting,
                    "Load balancer status changed"
                );
                record.status = next;
                record.updated_at = now;
                Some(next)
            }
            Transition::Expunge => {
                info!(lb_id, "Expunging deleted load balancer");
                self.remove(lb_id);
                None
            }
        }
    }
}
