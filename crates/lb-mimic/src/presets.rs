//! Preset documentation table
//!
//! Lists the control directives and preset values test authors can rely on.

use crate::directives::Directive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Load balancer id the simulator documents as always failing
pub const FAILING_LB_ID: &str = "175647";
/// Load balancer id the simulator documents as invalid
pub const INVALID_LB_ID: &str = "3909";
/// Documented add-node count after which a 422 is expected
pub const RETURN_422_ON_ADD_NODE_COUNT: u32 = 3;

/// Preset table served to test authors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presets {
    pub loadbalancers: BTreeMap<String, serde_json::Value>,
}

impl Directive {
    /// Human readable description of the directive's effect
    pub fn description(&self) -> &'static str {
        match self {
            Directive::Building => {
                "Keeps the load balancer in building state for given seconds. \
                 Used only on create load balancer"
            }
            Directive::ErrorState => {
                "Puts the LB in error state, and such an LB can only be deleted"
            }
            Directive::PendingUpdate => {
                "Changes the load balancer to PENDING-UPDATE state for the given number, \
                 any action other than delete is performed on the server"
            }
            Directive::PendingDelete => {
                "Changes the load balancer to PENDING-DELETE state for the given seconds, \
                 when deleted"
            }
        }
    }
}

/// Build the preset table
pub fn presets() -> Presets {
    let mut loadbalancers: BTreeMap<String, serde_json::Value> = Directive::ALL
        .iter()
        .map(|d| (d.key().to_string(), d.description().into()))
        .collect();
    loadbalancers.insert("failing_lb_id".to_string(), FAILING_LB_ID.into());
    loadbalancers.insert("invalid_lb".to_string(), INVALID_LB_ID.into());
    loadbalancers.insert(
        "return_422_on_add_node_count".to_string(),
        RETURN_422_ON_ADD_NODE_COUNT.into(),
    );
    Presets { loadbalancers }
}
