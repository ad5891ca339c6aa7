//! Control directives
//!
//! Test authors steer a simulated load balancer through its lifecycle by
//! attaching metadata entries with well-known keys at creation time. The
//! metadata list is folded once into a [`ControlDirectives`] map; afterwards
//! only the presence of a key and its optional duration matter.

use crate::lifecycle::{hold_from_secs, MAX_HOLD_SECS};
use crate::model::MetadataSpec;
use chrono::Duration;
use std::collections::{BTreeMap, HashMap};

/// Recognized control directive keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Directive {
    /// Hold BUILD for the given seconds
    Building,
    /// Enter PENDING-UPDATE on the next mutation and hold it for the given seconds
    PendingUpdate,
    /// Enter PENDING-DELETE on the next mutation and hold it for the given seconds
    PendingDelete,
    /// Enter ERROR on the next mutation
    ErrorState,
}

impl Directive {
    pub const ALL: [Directive; 4] = [
        Directive::Building,
        Directive::PendingUpdate,
        Directive::PendingDelete,
        Directive::ErrorState,
    ];

    /// Metadata key carrying this directive
    pub fn key(&self) -> &'static str {
        match self {
            Directive::Building => "lb_building",
            Directive::PendingUpdate => "lb_pending_update",
            Directive::PendingDelete => "lb_pending_delete",
            Directive::ErrorState => "lb_error_state",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.key() == key)
    }
}

/// Directive presence plus optional duration in seconds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlDirectives {
    entries: BTreeMap<Directive, Option<u64>>,
}

impl ControlDirectives {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold creation-time metadata into directives
    ///
    /// Unrecognized keys are ignored. A repeated key keeps the last value.
    /// Values are read as seconds from a JSON number or a numeric string.
    /// Fractions round up to the next whole second and values beyond
    /// [`MAX_HOLD_SECS`] saturate. Zero, negatives or anything unparsable
    /// count as "present, no duration".
    pub fn from_metadata(metadata: &[MetadataSpec]) -> Self {
        let mut directives = Self::new();
        for entry in metadata {
            if let Some(directive) = Directive::from_key(&entry.key) {
                directives.set(directive, seconds_from_value(&entry.value));
            }
        }
        directives
    }

    /// Builder-style insert
    pub fn with(mut self, directive: Directive, secs: Option<u64>) -> Self {
        self.set(directive, secs);
        self
    }

    pub fn set(&mut self, directive: Directive, secs: Option<u64>) {
        let secs = secs.filter(|s| *s > 0).map(|s| s.min(MAX_HOLD_SECS));
        self.entries.insert(directive, secs);
    }

    pub fn remove(&mut self, directive: Directive) {
        self.entries.remove(&directive);
    }

    pub fn contains(&self, directive: Directive) -> bool {
        self.entries.contains_key(&directive)
    }

    /// Explicit duration, if the directive is present and carries one
    pub fn seconds(&self, directive: Directive) -> Option<u64> {
        self.entries.get(&directive).copied().flatten()
    }

    /// Hold duration for a directive, persisting `default` when none was given
    ///
    /// The directive is recorded as present even if it was absent before.
    pub fn hold_or_default(&mut self, directive: Directive, default: Duration) -> Duration {
        let slot = self.entries.entry(directive).or_insert(None);
        let secs = *slot.get_or_insert(default.num_seconds().max(0) as u64);
        hold_from_secs(secs)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Directive, Option<u64>)> + '_ {
        self.entries.iter().map(|(d, s)| (*d, *s))
    }
}

fn seconds_from_value(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(seconds_from_float)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(seconds_from_float))
        }
        _ => None,
    }
}

fn seconds_from_float(secs: f64) -> Option<u64> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    // `as` saturates, the clamp in `set` bounds the rest.
    Some(secs.ceil() as u64)
}

/// Per load balancer directive storage
#[derive(Debug, Default)]
pub struct DirectiveStore {
    by_load_balancer: HashMap<u64, ControlDirectives>,
}

impl DirectiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, lb_id: u64, directives: ControlDirectives) {
        self.by_load_balancer.insert(lb_id, directives);
    }

    pub fn get(&self, lb_id: u64) -> Option<&ControlDirectives> {
        self.by_load_balancer.get(&lb_id)
    }

    /// Directives for a load balancer, creating an empty set if missing
    pub fn entry(&mut self, lb_id: u64) -> &mut ControlDirectives {
        self.by_load_balancer.entry(lb_id).or_default()
    }

    pub fn remove(&mut self, lb_id: u64) -> Option<ControlDirectives> {
        self.by_load_balancer.remove(&lb_id)
    }
}
