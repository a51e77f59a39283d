//! Host callback surface
//!
//! The host owns the window and the container views. The manager only
//! asks it questions and relays requests keyed by component identity.

use crate::animation::AnimationSpec;
use pane_core::{AnimationRes, ComponentId, ContainerId, ViewId};
use serde::{Deserialize, Serialize};

/// Rendering context handed to components when they attach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderContext {
    /// Host name, for diagnostics
    pub name: String,
    /// Display density scale
    pub density: f32,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            name: "host".to_string(),
            density: 1.0,
        }
    }
}

/// Launch request relayed from a component to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchRequest {
    /// What to launch
    pub target: String,
    /// Result routing code, if a result is expected
    pub request_code: Option<i32>,
    /// Free-form launch arguments
    pub extras: Option<serde_json::Value>,
}

impl LaunchRequest {
    /// Launch `target` without expecting a result
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            request_code: None,
            extras: None,
        }
    }

    /// Expect a result routed back with `code`
    pub fn for_result(mut self, code: i32) -> Self {
        self.request_code = Some(code);
        self
    }
}

/// Callbacks the manager needs from its host
pub trait Host: Send {
    /// Rendering context for attaching components
    fn context(&self) -> RenderContext;

    /// Whether any container view exists yet
    fn has_container_views(&self) -> bool;

    /// Whether the container with `id` exists
    fn has_container(&self, id: ContainerId) -> bool;

    /// Arrange for `exec_pending_actions` to run on the owning thread
    fn schedule_drain(&mut self);

    /// Structural state changed (menus and similar must be rebuilt)
    fn invalidate_structure(&mut self) {}

    /// A component was attached to the manager
    fn on_attach_component(&mut self, _component: ComponentId) {}

    /// Place a component's view into a container
    fn attach_view(&mut self, _container: ContainerId, _view: ViewId) {}

    /// Take a component's view out of a container
    fn detach_view(&mut self, _container: ContainerId, _view: ViewId) {}

    /// Show or hide a view without detaching it
    fn set_view_visible(&mut self, _view: ViewId, _visible: bool) {}

    /// Resolve a custom animation resource
    fn load_animation(&mut self, _res: AnimationRes) -> Option<AnimationSpec> {
        None
    }

    /// Start playing an animation on a component's view
    fn start_animation(&mut self, _component: ComponentId, _view: ViewId, _spec: &AnimationSpec) {}

    /// Stop an in-flight animation immediately
    fn cancel_animation(&mut self, _component: ComponentId, _view: ViewId) {}

    /// Relay a launch request
    fn start_launch(&mut self, _component: ComponentId, _request: LaunchRequest) {}

    /// Relay a permission request
    fn request_permissions(&mut self, _component: ComponentId, _permissions: &[String], _request_code: i32) {}
}
