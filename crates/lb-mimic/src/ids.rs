//! Identifier generation
//!
//! Load balancers, nodes and metadata entries draw from separate pools. The
//! random pools mirror the small integer ids handed out by the real API.

use crate::error::{LoadBalancerError, Result};
use rand::Rng;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

/// Upper bound (exclusive) for random load balancer ids
pub const LOAD_BALANCER_ID_CEILING: u64 = 99_999;
/// Upper bound (exclusive) for random node ids
pub const NODE_ID_CEILING: u64 = 999_999;
/// Upper bound (exclusive) for random metadata ids
pub const METADATA_ID_CEILING: u64 = 999;

const MAX_DRAWS: usize = 128;

/// Source of fresh identifiers
pub trait IdGenerator: Send + Sync + Debug {
    fn next_load_balancer_id(&self) -> u64;

    fn next_node_id(&self) -> u64;

    fn next_metadata_id(&self) -> u64;
}

/// Random identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_load_balancer_id(&self) -> u64 {
        rand::thread_rng().gen_range(1..LOAD_BALANCER_ID_CEILING)
    }

    fn next_node_id(&self) -> u64 {
        rand::thread_rng().gen_range(1..NODE_ID_CEILING)
    }

    fn next_metadata_id(&self) -> u64 {
        rand::thread_rng().gen_range(1..METADATA_ID_CEILING)
    }
}

/// Counting identifiers, one counter per pool
#[derive(Debug)]
pub struct SequentialIds {
    load_balancers: AtomicU64,
    nodes: AtomicU64,
    metadata: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self {
            load_balancers: AtomicU64::new(1),
            nodes: AtomicU64::new(1),
            metadata: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIds {
    fn next_load_balancer_id(&self) -> u64 {
        self.load_balancers.fetch_add(1, Ordering::Relaxed)
    }

    fn next_node_id(&self) -> u64 {
        self.nodes.fetch_add(1, Ordering::Relaxed)
    }

    fn next_metadata_id(&self) -> u64 {
        self.metadata.fetch_add(1, Ordering::Relaxed)
    }
}

/// Draw ids until one is not taken
pub fn draw_unique(mut draw: impl FnMut() -> u64, taken: impl Fn(u64) -> bool) -> Result<u64> {
    for _ in 0..MAX_DRAWS {
        let id = draw();
        if !taken(id) {
            return Ok(id);
        }
    }
    Err(LoadBalancerError::Internal(format!(
        "no free identifier after {} draws",
        MAX_DRAWS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_pools_are_independent() {
        let ids = SequentialIds::new();
        assert_eq!(ids.next_load_balancer_id(), 1);
        assert_eq!(ids.next_load_balancer_id(), 2);
        assert_eq!(ids.next_node_id(), 1);
        assert_eq!(ids.next_metadata_id(), 1);
    }

    #[test]
    fn test_random_ids_within_range() {
        let ids = RandomIds;
        for _ in 0..100 {
            assert!(ids.next_load_balancer_id() < LOAD_BALANCER_ID_CEILING);
            assert!(ids.next_node_id() < NODE_ID_CEILING);
            assert!(ids.next_metadata_id() < METADATA_ID_CEILING);
        }
    }

    #[test]
    fn test_draw_unique_skips_taken() {
        let ids = SequentialIds::new();
        let id = draw_unique(|| ids.next_node_id(), |id| id < 4).unwrap();
        assert_eq!(id, 4);
    }

    #[test]
    fn test_draw_unique_gives_up() {
        let result = draw_unique(|| 7, |_| true);
        assert!(matches!(result, Err(LoadBalancerError::Internal(_))));
    }
}
