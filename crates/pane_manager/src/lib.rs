//! # Pane Manager - Component Registry & Back Stack
//!
//! Hosts a tree of components with their own lifecycle. Callers never move
//! components directly - they build transactions that are queued, drained
//! on the owning thread and replayed in reverse when popped off the back
//! stack.
//!
//! ## Architecture
//!
//! ```text
//! Caller ──► Transaction ──► Pending Queue ──► run() ──► Lifecycle ──► Host
//!                                                │
//!                                                └──► Back Stack ──► pop()
//! ```
//!
//! ## Key Concepts
//!
//! - **Component**: a unit of UI and state driven through [`LifecycleState`]
//! - **Transaction**: an ordered, reversible batch of ops
//! - **Back Stack**: committed transactions that can be undone newest first
//! - **Snapshot**: the whole component graph, saved by dense index
//!
//! [`LifecycleState`]: pane_core::LifecycleState

pub mod animation;
pub mod back_stack;
pub mod component;
pub mod config;
pub mod dump;
pub mod host;
pub mod lifecycle;
pub mod manager;
pub mod pending;
pub mod snapshot;
pub mod transaction;

pub use animation::{
    AnimationListener, AnimationRequest, AnimationSpec, AnimationStyle, Interpolator,
    ListenerChain, Transit,
};
pub use back_stack::{BackStackEntry, BackStackIndices, BackStackListener, ListenerId, PopRequest};
pub use component::{AnimatingAway, Component, ComponentCallbacks, ComponentFactory};
pub use config::ManagerConfig;
pub use host::{Host, LaunchRequest, RenderContext};
pub use lifecycle::{Step, SubStateManager, Transition};
pub use manager::ComponentManager;
pub use pending::{ActionFn, CommittedTransaction, PendingAction};
pub use snapshot::{
    BackStackRecord, ComponentRecord, ManagerSnapshot, OpRecord, RetainedComponents,
    SnapshotFormat, SNAPSHOT_VERSION,
};
pub use transaction::{Op, OpCommand, Transaction};

pub use pane_core::{
    AnimationRes, ComponentId, ContainerId, LifecycleState, ManagerError, ProtocolViolation,
    Result, SnapshotError, TransactionId, ViewId,
};
