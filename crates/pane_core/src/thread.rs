//! Owner-thread guard for structural mutation

use crate::error::ProtocolViolation;
use std::thread::{self, ThreadId};

/// Records the thread that owns a manager and rejects calls from any other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerThread {
    id: ThreadId,
}

impl OwnerThread {
    /// Bind to the calling thread
    pub fn current() -> Self {
        Self {
            id: thread::current().id(),
        }
    }

    /// The owning thread
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Check whether the calling thread is the owner
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.id
    }

    /// Fail with [`ProtocolViolation::OffThread`] unless called on the owner
    pub fn check(&self, operation: &'static str) -> Result<(), ProtocolViolation> {
        if self.is_current() {
            Ok(())
        } else {
            Err(ProtocolViolation::OffThread { operation })
        }
    }
}
