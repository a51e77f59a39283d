//! Error types for component management
//!
//! Protocol violations are caller mistakes and abort the triggering call.
//! Stale references and state repairs are not errors; they are logged by
//! the manager and never reach this module.

use crate::id::{ComponentId, ContainerId};
use thiserror::Error;

/// Misuse of the manager or transaction protocol
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// A transaction was committed twice
    #[error("commit already called")]
    AlreadyCommitted,
    /// A transaction reached the queue without going through commit
    #[error("transaction was never committed")]
    NotCommitted,
    /// An op or option was added to a transaction after it was committed
    #[error("transaction modified after commit")]
    ModifiedAfterCommit,
    /// `add_to_back_stack` after `disallow_add_to_back_stack`
    #[error("this transaction is not allowed to be added to the back stack")]
    BackStackDisallowed,
    /// `disallow_add_to_back_stack` (or a commit-now) on a back-stack-bound transaction
    #[error("this transaction is already being added to the back stack")]
    BackStackRequested,
    /// A back-stack-bound transaction ran without an allocated index
    #[error("add_to_back_stack requested but no back stack index was allocated")]
    MissingBackStackIndex,
    /// A component was added while already in the added list
    #[error("component already added: {0}")]
    AlreadyAdded(ComponentId),
    /// An op tried to move a component to a different container
    #[error("can't change container of {component} from {from} to {to}")]
    ContainerChanged {
        component: ComponentId,
        from: ContainerId,
        to: ContainerId,
    },
    /// An op tried to retag a component
    #[error("can't change tag of {component} from {from:?} to {to:?}")]
    TagChanged {
        component: ComponentId,
        from: String,
        to: String,
    },
    /// `replace` without a container
    #[error("replace requires a container")]
    MissingContainer,
    /// The host has no container view for a component's container id
    #[error("no container view found for id {container} (component {component})")]
    NoContainerView {
        component: ComponentId,
        container: ContainerId,
    },
    /// Structural call made off the owning thread
    #[error("{operation} must be called from the owning thread")]
    OffThread { operation: &'static str },
    /// The pending action queue was drained from inside a drain
    #[error("recursive entry to exec_pending_actions")]
    RecursiveExecution,
    /// Commit after the manager's state was saved
    #[error("can not perform this action after state has been saved")]
    StateAlreadySaved,
    /// Structural mutation is currently fenced off
    #[error("can not perform this action inside of {0}")]
    TransactionsForbidden(String),
    /// The manager has been torn down
    #[error("manager has been destroyed")]
    Destroyed,
    /// A transaction referenced a component this manager does not know
    #[error("unknown component: {0}")]
    UnknownComponent(ComponentId),
    /// The pending action queue is full
    #[error("pending action queue is full ({0} actions)")]
    QueueFull(usize),
}

/// Snapshot encoding, decoding and consistency errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    /// Version mismatch
    #[error("Version mismatch: snapshot version {found}, current version {expected}")]
    VersionMismatch { found: u32, expected: u32 },
    /// An active component has no registry index
    #[error("failure saving state: active component {0} has cleared index")]
    ClearedIndex(ComponentId),
    /// An added component is not in the active table
    #[error("failure saving state: added component {0} is not active")]
    AddedNotActive(ComponentId),
    /// A saved component targets a component that is not active
    #[error("failure saving state: {component} has target not in manager: {target}")]
    TargetNotActive {
        component: ComponentId,
        target: ComponentId,
    },
    /// A back-stack op refers to a component that is not active
    #[error("failure saving state: back stack op target {0} is not active")]
    OpTargetNotActive(ComponentId),
    /// An added index in a snapshot has no active record
    #[error("no instantiated component for added index {0}")]
    MissingAddedIndex(usize),
    /// The component factory could not rebuild a saved component
    #[error("no factory for component kind {0:?}")]
    UnknownKind(String),
}

/// The manager error type
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Protocol violation
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),
    /// Snapshot error
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ManagerError {
    /// The protocol violation behind this error, if any
    pub fn as_protocol(&self) -> Option<&ProtocolViolation> {
        match self {
            Self::Protocol(violation) => Some(violation),
            _ => None,
        }
    }
}

/// Result type alias
pub type Result<T> = core::result::Result<T, ManagerError>;
