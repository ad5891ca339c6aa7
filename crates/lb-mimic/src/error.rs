//! Error types for the load balancer simulator

use crate::lifecycle::LoadBalancerStatus;
use thiserror::Error;

/// Result type for simulator operations
pub type Result<T> = std::result::Result<T, LoadBalancerError>;

/// Errors returned by simulator operations
///
/// Every variant maps onto the numeric status code the real load balancer API
/// answers with, see [`LoadBalancerError::status_code`].
#[derive(Error, Debug)]
pub enum LoadBalancerError {
    /// Unknown load balancer id
    #[error("Load balancer not found")]
    NotFound { lb_id: u64 },

    /// Unknown node id on an existing load balancer
    #[error("Node not found")]
    NodeNotFound { lb_id: u64, node_id: u64 },

    /// Two nodes with the same address and port
    #[error("Duplicate nodes detected. One or more nodes already configured on load balancer.")]
    DuplicateNodes,

    /// Node mutation attempted while the load balancer is not ACTIVE
    #[error("Load Balancer '{lb_id}' has a status of {status} and is considered immutable.")]
    Immutable {
        lb_id: u64,
        status: LoadBalancerStatus,
    },

    /// Delete attempted mid-transition
    #[error("Must provide valid load balancers: {lb_id} are immutable and could not be processed.")]
    NotDeletable { lb_id: u64 },

    /// Delete attempted on a load balancer that already reached DELETED
    #[error("Must provide valid load balancers: {lb_id} could not be found.")]
    AlreadyGone { lb_id: u64 },

    /// Node listing on a load balancer that already reached DELETED
    #[error("The loadbalancer is marked as deleted.")]
    MarkedDeleted { lb_id: u64 },

    /// Malformed request
    #[error("{0}")]
    BadRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LoadBalancerError {
    /// Status code mirrored from the real API
    pub fn status_code(&self) -> u16 {
        match self {
            LoadBalancerError::NotFound { .. } | LoadBalancerError::NodeNotFound { .. } => 404,
            LoadBalancerError::DuplicateNodes => 413,
            LoadBalancerError::Immutable { .. } => 422,
            LoadBalancerError::NotDeletable { .. } | LoadBalancerError::AlreadyGone { .. } => 400,
            LoadBalancerError::MarkedDeleted { .. } => 410,
            LoadBalancerError::BadRequest(_) | LoadBalancerError::Serialization(_) => 400,
            LoadBalancerError::Configuration(_)
            | LoadBalancerError::Io(_)
            | LoadBalancerError::Internal(_) => 500,
        }
    }

    /// Whether the error is a validation fault reported back to the caller
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LoadBalancerError::DuplicateNodes
                | LoadBalancerError::Immutable { .. }
                | LoadBalancerError::NotDeletable { .. }
                | LoadBalancerError::AlreadyGone { .. }
                | LoadBalancerError::MarkedDeleted { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            LoadBalancerError::NotFound { .. } => "not_found",
            LoadBalancerError::NodeNotFound { .. } => "node_not_found",
            LoadBalancerError::DuplicateNodes => "conflict",
            LoadBalancerError::Immutable { .. } => "immutable",
            LoadBalancerError::NotDeletable { .. } => "immutable",
            LoadBalancerError::AlreadyGone { .. } => "already_gone",
            LoadBalancerError::MarkedDeleted { .. } => "already_gone",
            LoadBalancerError::BadRequest(_) => "bad_request",
            LoadBalancerError::Configuration(_) => "configuration",
            LoadBalancerError::Io(_) => "io",
            LoadBalancerError::Serialization(_) => "serialization",
            LoadBalancerError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(LoadBalancerError::NotFound { lb_id: 1 }.status_code(), 404);
        assert_eq!(LoadBalancerError::DuplicateNodes.status_code(), 413);
        assert_eq!(
            LoadBalancerError::Immutable {
                lb_id: 1,
                status: LoadBalancerStatus::Build
            }
            .status_code(),
            422
        );
        assert_eq!(LoadBalancerError::NotDeletable { lb_id: 1 }.status_code(), 400);
        assert_eq!(LoadBalancerError::AlreadyGone { lb_id: 1 }.status_code(), 400);
        assert_eq!(LoadBalancerError::MarkedDeleted { lb_id: 1 }.status_code(), 410);
    }

    #[test]
    fn test_messages() {
        let err = LoadBalancerError::Immutable {
            lb_id: 42,
            status: LoadBalancerStatus::PendingUpdate,
        };
        assert_eq!(
            err.to_string(),
            "Load Balancer '42' has a status of PENDING-UPDATE and is considered immutable."
        );
        assert_eq!(
            LoadBalancerError::AlreadyGone { lb_id: 7 }.to_string(),
            "Must provide valid load balancers: 7 could not be found."
        );
    }

    #[test]
    fn test_error_category() {
        assert!(LoadBalancerError::DuplicateNodes.is_validation());
        assert!(!LoadBalancerError::NotFound { lb_id: 1 }.is_validation());
        assert_eq!(LoadBalancerError::DuplicateNodes.category(), "conflict");
        assert_eq!(LoadBalancerError::Internal("x".into()).category(), "internal");
    }
}
