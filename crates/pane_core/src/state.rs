//! Component lifecycle states

use core::fmt;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a component.
///
/// States are strictly ordered; a component advances and retreats one
/// state at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Not yet attached, or fully torn down
    Initializing,
    /// Attached and created, no view
    Created,
    /// View materialized in its container and the host reported its own creation
    ContainerAttached,
    /// Visible-capable but not started
    Stopped,
    /// Started
    Started,
    /// Resumed and interactive
    Resumed,
}

impl LifecycleState {
    /// All states in ascending order
    pub const ALL: [LifecycleState; 6] = [
        Self::Initializing,
        Self::Created,
        Self::ContainerAttached,
        Self::Stopped,
        Self::Started,
        Self::Resumed,
    ];

    /// Next state up, if any
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Initializing => Some(Self::Created),
            Self::Created => Some(Self::ContainerAttached),
            Self::ContainerAttached => Some(Self::Stopped),
            Self::Stopped => Some(Self::Started),
            Self::Started => Some(Self::Resumed),
            Self::Resumed => None,
        }
    }

    /// Next state down, if any
    pub fn prev(self) -> Option<Self> {
        match self {
            Self::Initializing => None,
            Self::Created => Some(Self::Initializing),
            Self::ContainerAttached => Some(Self::Created),
            Self::Stopped => Some(Self::ContainerAttached),
            Self::Started => Some(Self::Stopped),
            Self::Resumed => Some(Self::Started),
        }
    }

    /// Short uppercase name used in dumps and logs
    pub fn name(self) -> &'static str {
        match self {
            Self::Initializing => "INITIALIZING",
            Self::Created => "CREATED",
            Self::ContainerAttached => "CONTAINER_ATTACHED",
            Self::Stopped => "STOPPED",
            Self::Started => "STARTED",
            Self::Resumed => "RESUMED",
        }
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::Initializing
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
