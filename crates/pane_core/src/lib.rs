//! # pane_core - Pane Core Primitives
//!
//! The small set of types every other Pane crate builds on:
//! - **Identities**: component, transaction, container, view and animation ids
//! - **Lifecycle**: the strictly ordered component lifecycle states
//! - **Index allocation**: dense, freelist-backed index tables
//! - **Threading**: the owner-thread guard for structural mutation
//! - **Errors**: the protocol / snapshot error taxonomy

pub mod error;
pub mod id;
pub mod index;
pub mod state;
pub mod thread;

pub use error::*;
pub use id::*;
pub use index::IndexTable;
pub use state::LifecycleState;
pub use thread::OwnerThread;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{ManagerError, ProtocolViolation, Result, SnapshotError};
    pub use crate::id::{AnimationRes, ComponentId, ContainerId, TransactionId, ViewId};
    pub use crate::index::IndexTable;
    pub use crate::state::LifecycleState;
    pub use crate::thread::OwnerThread;
}
