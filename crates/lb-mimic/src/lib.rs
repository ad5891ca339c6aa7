/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs Ltd <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! # lb-mimic
//!
//! Stateful stand-in for a cloud load balancer management API, for use in
//! integration tests. Callers create, read, list and delete load balancers and
//! their nodes exactly as against the real service, and get back structurally
//! faithful responses.
//!
//! - Asynchronous lifecycle: BUILD, ACTIVE, PENDING-UPDATE, PENDING-DELETE,
//!   DELETED and ERROR, aged lazily on every access
//! - Control directives smuggled in through creation-time metadata
//!   (`lb_building`, `lb_pending_update`, `lb_pending_delete`,
//!   `lb_error_state`) to steer that lifecycle deterministically
//! - Node sub-resources gated on the load balancer's status
//! - Optional HTTP front end, see [`server`]

pub mod clock;
pub mod config;
pub mod directives;
pub mod error;
pub mod ids;
pub mod lifecycle;
pub mod model;
pub mod node;
pub mod presets;
pub mod server;
pub mod store;
pub mod view;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DefaultsConfig, LifecycleConfig, ServerConfig, SimulatorConfig};
pub use directives::{ControlDirectives, Directive};
pub use error::{LoadBalancerError, Result};
pub use ids::{IdGenerator, RandomIds, SequentialIds};
pub use lifecycle::{Holds, LoadBalancerStatus};
pub use model::{LoadBalancerSpec, Metadata, MetadataSpec};
pub use node::{Node, NodeCondition, NodeSpec, NodeStatus, NodeType};
pub use server::LoadBalancerServer;
pub use view::{LoadBalancerView, Reply};

use ids::draw_unique;
use parking_lot::Mutex;
use std::sync::Arc;
use store::{LoadBalancerRecord, SimulatorState};
use tracing::{info, warn};

/// Load balancer simulator service
///
/// Cheap to clone; clones share the same state. Every operation takes the
/// state lock once and runs to completion, so concurrent callers never see a
/// half-applied transition.
#[derive(Debug, Clone)]
pub struct LoadBalancerService {
    inner: Arc<LoadBalancerServiceInner>,
}

#[derive(Debug)]
struct LoadBalancerServiceInner {
    config: SimulatorConfig,
    holds: Holds,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    state: Mutex<SimulatorState>,
}

impl LoadBalancerService {
    /// Create a new service using the wall clock and random identifiers
    pub fn new(config: SimulatorConfig) -> Result<Self> {
        Self::with_collaborators(config, Arc::new(SystemClock), Arc::new(RandomIds))
    }

    /// Create a new service with explicit clock and id source
    pub fn with_collaborators(
        config: SimulatorConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        config.validate()?;
        info!("Initializing load balancer simulator");

        Ok(Self {
            inner: Arc::new(LoadBalancerServiceInner {
                holds: Holds::from(&config.lifecycle),
                config,
                clock,
                ids,
                state: Mutex::new(SimulatorState::new()),
            }),
        })
    }

    /// Get the active configuration
    pub fn config(&self) -> &SimulatorConfig {
        &self.inner.config
    }

    /// Create a load balancer
    ///
    /// Starts in BUILD when the `lb_building` directive is present, ACTIVE
    /// otherwise.
    pub fn create_load_balancer(
        &self,
        tenant_id: &str,
        spec: LoadBalancerSpec,
    ) -> Result<Reply<LoadBalancerView>> {
        let now = self.inner.clock.now();
        let ids = self.inner.ids.as_ref();
        let mut state = self.inner.state.lock();

        let lb_id = draw_unique(
            || ids.next_load_balancer_id(),
            |id| state.records.contains(id),
        )?;
        let directives = ControlDirectives::from_metadata(&spec.metadata);
        let status = if directives.contains(Directive::Building) {
            LoadBalancerStatus::Build
        } else {
            LoadBalancerStatus::Active
        };

        let mut record =
            LoadBalancerRecord::from_spec(lb_id, tenant_id, &spec, status, now, &self.inner.config.defaults);
        if !spec.nodes.is_empty() {
            record.nodes = Some(node::build_nodes(&spec.nodes, &[], ids)?);
        }
        if !spec.metadata.is_empty() {
            record.metadata = Some(build_metadata(&spec.metadata, ids)?);
        }

        info!(lb_id, tenant_id, %status, "Created load balancer");
        let view = LoadBalancerView::from(&record);
        state.insert(record, directives);

        Ok(Reply::accepted(view))
    }

    /// Get a load balancer
    pub fn get_load_balancer(&self, lb_id: u64) -> Result<Reply<LoadBalancerView>> {
        let now = self.inner.clock.now();
        let mut state = self.inner.state.lock();

        state
            .refresh(lb_id, false, now, &self.inner.holds)
            .ok_or(LoadBalancerError::NotFound { lb_id })?;
        let record = state
            .records
            .get(lb_id)
            .ok_or(LoadBalancerError::NotFound { lb_id })?;

        Ok(Reply::ok(LoadBalancerView::from(record)))
    }

    /// List a tenant's load balancers
    pub fn list_load_balancers(&self, tenant_id: &str) -> Reply<Vec<LoadBalancerView>> {
        let now = self.inner.clock.now();
        let mut state = self.inner.state.lock();

        for lb_id in state.records.ids_for_tenant(tenant_id) {
            state.refresh(lb_id, false, now, &self.inner.holds);
        }
        let views = state
            .records
            .list_by_tenant(tenant_id)
            .map(LoadBalancerView::from)
            .collect();

        Reply::ok(views)
    }

    /// Delete a load balancer
    ///
    /// Only ACTIVE and ERROR load balancers can be deleted; they are removed
    /// immediately.
    pub fn delete_load_balancer(&self, lb_id: u64) -> Result<Reply<()>> {
        let now = self.inner.clock.now();
        let mut state = self.inner.state.lock();

        let status = state
            .records
            .get(lb_id)
            .map(|r| r.status)
            .ok_or(LoadBalancerError::NotFound { lb_id })?;

        match status {
            status if status.is_deletable() => {
                state.remove(lb_id);
                info!(lb_id, %status, "Deleted load balancer");
                Ok(Reply::accepted(()))
            }
            LoadBalancerStatus::Deleted => {
                state.refresh(lb_id, false, now, &self.inner.holds);
                warn!(lb_id, "Delete rejected, load balancer already deleted");
                Err(LoadBalancerError::AlreadyGone { lb_id })
            }
            status => {
                warn!(lb_id, %status, "Delete rejected, load balancer is immutable");
                Err(LoadBalancerError::NotDeletable { lb_id })
            }
        }
    }

    /// Add nodes to a load balancer
    ///
    /// Expired timers are aged first, so a record whose BUILD hold has run
    /// out accepts nodes without an intervening read. The whole batch is
    /// rejected if any (address, port) pair collides with another node in the
    /// batch or an existing node. An empty batch succeeds without touching the
    /// record.
    pub fn add_nodes(&self, lb_id: u64, specs: Vec<NodeSpec>) -> Result<Reply<Vec<Node>>> {
        let now = self.inner.clock.now();
        let ids = self.inner.ids.as_ref();
        let mut state = self.inner.state.lock();

        state
            .refresh(lb_id, false, now, &self.inner.holds)
            .ok_or(LoadBalancerError::NotFound { lb_id })?;
        let record = state
            .records
            .get_mut(lb_id)
            .ok_or(LoadBalancerError::NotFound { lb_id })?;
        ensure_mutable(record)?;

        if let Some((address, port)) = node::find_duplicate(record.node_list(), &specs) {
            warn!(lb_id, address, port, "Add nodes rejected, duplicate node");
            return Err(LoadBalancerError::DuplicateNodes);
        }

        let nodes = node::build_nodes(&specs, record.node_list(), ids)?;
        let first_assignment = node::attach_nodes(&mut record.nodes, nodes.clone());
        info!(lb_id, count = nodes.len(), "Added nodes");

        if first_assignment {
            state.refresh(lb_id, true, now, &self.inner.holds);
        }

        Ok(Reply::ok(nodes))
    }

    /// List the nodes of a load balancer
    pub fn list_nodes(&self, lb_id: u64) -> Result<Reply<Vec<Node>>> {
        let record = self.read_for_nodes(lb_id)?;
        Ok(Reply::ok(record.nodes.unwrap_or_default()))
    }

    /// Get a single node
    pub fn get_node(&self, lb_id: u64, node_id: u64) -> Result<Reply<Node>> {
        let record = self.read_for_nodes(lb_id)?;
        record
            .nodes
            .unwrap_or_default()
            .into_iter()
            .find(|n| n.id == node_id)
            .map(Reply::ok)
            .ok_or(LoadBalancerError::NodeNotFound { lb_id, node_id })
    }

    /// Delete a node
    ///
    /// Deleting an unknown node id still succeeds.
    pub fn delete_node(&self, lb_id: u64, node_id: u64) -> Result<Reply<()>> {
        let now = self.inner.clock.now();
        let mut state = self.inner.state.lock();

        state
            .refresh(lb_id, false, now, &self.inner.holds)
            .ok_or(LoadBalancerError::NotFound { lb_id })?;
        let record = state
            .records
            .get_mut(lb_id)
            .ok_or(LoadBalancerError::NotFound { lb_id })?;
        ensure_mutable(record)?;

        if node::detach_node(&mut record.nodes, node_id) {
            info!(lb_id, node_id, "Deleted node");
        }
        state.refresh(lb_id, true, now, &self.inner.holds);

        Ok(Reply::accepted(()))
    }

    /// List the metadata of a load balancer
    pub fn list_metadata(&self, lb_id: u64) -> Result<Reply<Vec<Metadata>>> {
        let now = self.inner.clock.now();
        let mut state = self.inner.state.lock();

        state
            .refresh(lb_id, false, now, &self.inner.holds)
            .ok_or(LoadBalancerError::NotFound { lb_id })?;
        let metadata = state
            .records
            .get(lb_id)
            .and_then(|r| r.metadata.clone())
            .unwrap_or_default();

        Ok(Reply::ok(metadata))
    }

    /// Get the control directives of a load balancer
    pub fn directives(&self, lb_id: u64) -> Result<ControlDirectives> {
        let state = self.inner.state.lock();
        if !state.records.contains(lb_id) {
            return Err(LoadBalancerError::NotFound { lb_id });
        }
        Ok(state.directives.get(lb_id).cloned().unwrap_or_default())
    }

    /// Replace the control directives of an existing load balancer
    ///
    /// Test hook for flagging a directive on a load balancer that was created
    /// without it.
    pub fn set_directives(&self, lb_id: u64, directives: ControlDirectives) -> Result<()> {
        let mut state = self.inner.state.lock();
        if !state.records.contains(lb_id) {
            return Err(LoadBalancerError::NotFound { lb_id });
        }
        info!(lb_id, "Replacing control directives");
        state.directives.insert(lb_id, directives);
        Ok(())
    }

    /// Refresh a load balancer for node access and copy it out
    fn read_for_nodes(&self, lb_id: u64) -> Result<LoadBalancerRecord> {
        let now = self.inner.clock.now();
        let mut state = self.inner.state.lock();

        let status = state
            .refresh(lb_id, false, now, &self.inner.holds)
            .ok_or(LoadBalancerError::NotFound { lb_id })?;
        // Reported as 410, the fault the API documents for deleted load balancers.
        if status == LoadBalancerStatus::Deleted {
            return Err(LoadBalancerError::MarkedDeleted { lb_id });
        }

        state
            .records
            .get(lb_id)
            .cloned()
            .ok_or(LoadBalancerError::NotFound { lb_id })
    }
}

fn ensure_mutable(record: &LoadBalancerRecord) -> Result<()> {
    if record.status.is_mutable() {
        Ok(())
    } else {
        warn!(lb_id = record.id, status = %record.status, "Rejected mutation of immutable load balancer");
        Err(LoadBalancerError::Immutable {
            lb_id: record.id,
            status: record.status,
        })
    }
}

fn build_metadata(entries: &[MetadataSpec], ids: &dyn IdGenerator) -> Result<Vec<Metadata>> {
    let mut metadata: Vec<Metadata> = Vec::with_capacity(entries.len());
    for entry in entries {
        let id = draw_unique(
            || ids.next_metadata_id(),
            |id| metadata.iter().any(|m| m.id == id),
        )?;
        metadata.push(Metadata {
            id,
            key: entry.key.clone(),
            value: entry.value.clone(),
        });
    }
    Ok(metadata)
}
