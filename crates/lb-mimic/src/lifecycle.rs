//! Lifecycle transition engine
//!
//! A simulated load balancer moves through
//!
//! ```text
//! BUILD -> ACTIVE -> { PENDING-UPDATE -> ACTIVE,
//!                      PENDING-DELETE -> DELETED -> (expunged),
//!                      ERROR }
//! ```
//!
//! Nothing drives these transitions in the background. Every operation that
//! touches a record first asks [`advance`] what the record's status should be
//! now, given when it last changed and which control directives it carries.
//!
//! Timer expiry (BUILD, PENDING-UPDATE, PENDING-DELETE, DELETED) is evaluated
//! on every call. Leaving ACTIVE for a pending or error state only happens on a
//! side-effecting call, i.e. one made on behalf of a mutating operation.

use crate::config::LifecycleConfig;
use crate::directives::{ControlDirectives, Directive};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Load balancer status as reported by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadBalancerStatus {
    #[serde(rename = "BUILD")]
    Build,
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "PENDING-UPDATE")]
    PendingUpdate,
    #[serde(rename = "PENDING-DELETE")]
    PendingDelete,
    #[serde(rename = "DELETED")]
    Deleted,
    #[serde(rename = "ERROR")]
    Error,
}

impl LoadBalancerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadBalancerStatus::Build => "BUILD",
            LoadBalancerStatus::Active => "ACTIVE",
            LoadBalancerStatus::PendingUpdate => "PENDING-UPDATE",
            LoadBalancerStatus::PendingDelete => "PENDING-DELETE",
            LoadBalancerStatus::Deleted => "DELETED",
            LoadBalancerStatus::Error => "ERROR",
        }
    }

    /// Whether nodes may be added or removed
    pub fn is_mutable(&self) -> bool {
        matches!(self, LoadBalancerStatus::Active)
    }

    /// Whether a delete request removes the record immediately
    pub fn is_deletable(&self) -> bool {
        matches!(self, LoadBalancerStatus::Active | LoadBalancerStatus::Error)
    }
}

impl fmt::Display for LoadBalancerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Longest hold, in seconds, that a directive or config value can express
pub const MAX_HOLD_SECS: u64 = (i64::MAX / 1000) as u64;

/// Convert whole seconds to a hold, saturating at [`MAX_HOLD_SECS`]
pub fn hold_from_secs(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_HOLD_SECS) as i64)
}

/// Hold durations used when a directive carries no explicit value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Holds {
    pub building: Duration,
    pub pending_update: Duration,
    pub pending_delete: Duration,
    /// How long a DELETED record stays visible before it is expunged
    pub deleted_retention: Duration,
}

impl Default for Holds {
    fn default() -> Self {
        Self {
            building: Duration::seconds(10),
            pending_update: Duration::seconds(10),
            pending_delete: Duration::seconds(10),
            deleted_retention: Duration::seconds(3600),
        }
    }
}

impl From<&LifecycleConfig> for Holds {
    fn from(config: &LifecycleConfig) -> Self {
        Self {
            building: hold_from_secs(config.default_building_secs),
            pending_update: hold_from_secs(config.default_pending_update_secs),
            pending_delete: hold_from_secs(config.default_pending_delete_secs),
            deleted_retention: hold_from_secs(config.deleted_retention_secs),
        }
    }
}

/// Outcome of [`advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Status is current
    Stay,
    /// Move to a new status; the record's update time becomes `now`
    Enter(LoadBalancerStatus),
    /// Remove the record from the store
    Expunge,
}

/// Compute the next status of a load balancer
///
/// `updated_at` is the time of the last observable status change. A hold
/// defaulted from `holds` is written back into `directives` so later calls see
/// the same duration.
pub fn advance(
    status: LoadBalancerStatus,
    updated_at: DateTime<Utc>,
    directives: &mut ControlDirectives,
    now: DateTime<Utc>,
    side_effecting: bool,
    holds: &Holds,
) -> Transition {
    let elapsed = now - updated_at;

    match status {
        LoadBalancerStatus::Build => {
            let hold = directives.hold_or_default(Directive::Building, holds.building);
            if elapsed >= hold {
                Transition::Enter(LoadBalancerStatus::Active)
            } else {
                Transition::Stay
            }
        }
        LoadBalancerStatus::Active if side_effecting => {
            // Later checks override earlier ones: error > pending-delete > pending-update.
            let mut next = None;
            if directives.contains(Directive::PendingUpdate) {
                next = Some(LoadBalancerStatus::PendingUpdate);
            }
            if directives.contains(Directive::PendingDelete) {
                next = Some(LoadBalancerStatus::PendingDelete);
            }
            if directives.contains(Directive::ErrorState) {
                next = Some(LoadBalancerStatus::Error);
            }
            next.map_or(Transition::Stay, Transition::Enter)
        }
        LoadBalancerStatus::Active => Transition::Stay,
        LoadBalancerStatus::PendingUpdate => {
            if !directives.contains(Directive::PendingUpdate) {
                return Transition::Stay;
            }
            let hold = directives.hold_or_default(Directive::PendingUpdate, holds.pending_update);
            if elapsed >= hold {
                Transition::Enter(LoadBalancerStatus::Active)
            } else {
                Transition::Stay
            }
        }
        LoadBalancerStatus::PendingDelete => {
            let hold = directives.hold_or_default(Directive::PendingDelete, holds.pending_delete);
            if elapsed >= hold {
                Transition::Enter(LoadBalancerStatus::Deleted)
            } else {
                Transition::Stay
            }
        }
        LoadBalancerStatus::Deleted => {
            if elapsed >= holds.deleted_retention {
                Transition::Expunge
            } else {
                Transition::Stay
            }
        }
        LoadBalancerStatus::Error => Transition::Stay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_704_067_200, 0).unwrap()
    }

    fn secs(n: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(n)
    }

    fn run(
        status: LoadBalancerStatus,
        directives: &mut ControlDirectives,
        at: i64,
        side_effecting: bool,
    ) -> Transition {
        advance(status, t0(), directives, secs(at), side_effecting, &Holds::default())
    }

    #[test]
    fn test_build_holds_then_activates() {
        let mut d = ControlDirectives::new().with(Directive::Building, Some(5));
        assert_eq!(run(LoadBalancerStatus::Build, &mut d, 4, false), Transition::Stay);
        assert_eq!(
            run(LoadBalancerStatus::Build, &mut d, 5, false),
            Transition::Enter(LoadBalancerStatus::Active)
        );
    }

    #[test]
    fn test_build_default_hold_is_persisted() {
        let mut d = ControlDirectives::new().with(Directive::Building, None);
        assert_eq!(run(LoadBalancerStatus::Build, &mut d, 9, false), Transition::Stay);
        assert_eq!(d.seconds(Directive::Building), Some(10));
        assert_eq!(
            run(LoadBalancerStatus::Build, &mut d, 10, false),
            Transition::Enter(LoadBalancerStatus::Active)
        );
    }

    #[test]
    fn test_read_never_leaves_active() {
        let mut d = ControlDirectives::new()
            .with(Directive::PendingUpdate, None)
            .with(Directive::PendingDelete, None)
            .with(Directive::ErrorState, None);
        assert_eq!(run(LoadBalancerStatus::Active, &mut d, 100, false), Transition::Stay);
    }

    #[test]
    fn test_write_without_directives_stays_active() {
        let mut d = ControlDirectives::new();
        assert_eq!(run(LoadBalancerStatus::Active, &mut d, 0, true), Transition::Stay);
    }

    #[test]
    fn test_active_trigger_precedence() {
        let mut d = ControlDirectives::new().with(Directive::PendingUpdate, None);
        assert_eq!(
            run(LoadBalancerStatus::Active, &mut d, 0, true),
            Transition::Enter(LoadBalancerStatus::PendingUpdate)
        );

        d.set(Directive::PendingDelete, Some(2));
        assert_eq!(
            run(LoadBalancerStatus::Active, &mut d, 0, true),
            Transition::Enter(LoadBalancerStatus::PendingDelete)
        );

        d.set(Directive::ErrorState, None);
        assert_eq!(
            run(LoadBalancerStatus::Active, &mut d, 0, true),
            Transition::Enter(LoadBalancerStatus::Error)
        );
    }

    #[test]
    fn test_pending_update_expires_to_active() {
        let mut d = ControlDirectives::new().with(Directive::PendingUpdate, Some(3));
        assert_eq!(run(LoadBalancerStatus::PendingUpdate, &mut d, 2, false), Transition::Stay);
        assert_eq!(
            run(LoadBalancerStatus::PendingUpdate, &mut d, 3, false),
            Transition::Enter(LoadBalancerStatus::Active)
        );
    }

    #[test]
    fn test_pending_update_without_directive_is_stuck() {
        let mut d = ControlDirectives::new();
        assert_eq!(
            run(LoadBalancerStatus::PendingUpdate, &mut d, 10_000, true),
            Transition::Stay
        );
        assert!(d.is_empty());
    }

    #[test]
    fn test_pending_delete_ages_on_read() {
        let mut d = ControlDirectives::new().with(Directive::PendingDelete, Some(2));
        assert_eq!(run(LoadBalancerStatus::PendingDelete, &mut d, 1, false), Transition::Stay);
        assert_eq!(
            run(LoadBalancerStatus::PendingDelete, &mut d, 2, false),
            Transition::Enter(LoadBalancerStatus::Deleted)
        );
    }

    #[test]
    fn test_pending_delete_defaults_to_ten_seconds() {
        let mut d = ControlDirectives::new();
        assert_eq!(run(LoadBalancerStatus::PendingDelete, &mut d, 9, false), Transition::Stay);
        assert_eq!(
            run(LoadBalancerStatus::PendingDelete, &mut d, 10, false),
            Transition::Enter(LoadBalancerStatus::Deleted)
        );
    }

    #[test]
    fn test_deleted_is_expunged_after_retention() {
        let mut d = ControlDirectives::new();
        assert_eq!(run(LoadBalancerStatus::Deleted, &mut d, 3599, false), Transition::Stay);
        assert_eq!(run(LoadBalancerStatus::Deleted, &mut d, 3600, false), Transition::Expunge);
    }

    #[test]
    fn test_error_is_terminal() {
        let mut d = ControlDirectives::new()
            .with(Directive::Building, Some(1))
            .with(Directive::PendingUpdate, Some(1));
        assert_eq!(run(LoadBalancerStatus::Error, &mut d, 100_000, true), Transition::Stay);
    }

    #[test]
    fn test_saturated_build_hold_never_expires() {
        let mut d = ControlDirectives::new().with(Directive::Building, Some(u64::MAX));
        assert_eq!(run(LoadBalancerStatus::Build, &mut d, 0, false), Transition::Stay);
        let a_century = 100 * 365 * 24 * 3600;
        assert_eq!(run(LoadBalancerStatus::Build, &mut d, a_century, true), Transition::Stay);
    }

    #[test]
    fn test_hold_from_secs_saturates() {
        assert_eq!(hold_from_secs(0), Duration::zero());
        assert_eq!(hold_from_secs(42), Duration::seconds(42));
        assert_eq!(hold_from_secs(u64::MAX), hold_from_secs(MAX_HOLD_SECS));
        assert!(hold_from_secs(u64::MAX) > Duration::zero());
    }

    #[test]
    fn test_holds_from_oversized_config() {
        let config = LifecycleConfig {
            deleted_retention_secs: 10_000_000_000_000_000,
            ..LifecycleConfig::default()
        };
        let holds = Holds::from(&config);
        assert_eq!(holds.deleted_retention, hold_from_secs(MAX_HOLD_SECS));
        assert_eq!(holds.building, Duration::seconds(10));
    }

    #[test]
    fn test_clock_skew_does_not_expire_timers() {
        let mut d = ControlDirectives::new().with(Directive::Building, Some(1));
        assert_eq!(run(LoadBalancerStatus::Build, &mut d, -60, false), Transition::Stay);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(LoadBalancerStatus::PendingDelete.to_string(), "PENDING-DELETE");
        assert_eq!(
            serde_json::to_string(&LoadBalancerStatus::PendingUpdate).unwrap(),
            "\"PENDING-UPDATE\""
        );
        assert!(LoadBalancerStatus::Error.is_deletable());
        assert!(!LoadBalancerStatus::Build.is_deletable());
        assert!(!LoadBalancerStatus::Error.is_mutable());
    }
}
