//! Logging host
//!
//! Prints every host callback and remembers what the session loop has to
//! act on: a requested drain and exit animations waiting to finish.

use pane_manager::{
    AnimationRes, AnimationSpec, ComponentId, ContainerId, Host, LaunchRequest, RenderContext,
    ViewId,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Work the host owes the manager
#[derive(Debug, Default)]
pub struct HostQueue {
    pub drain_requested: bool,
    pub animating: Vec<ComponentId>,
}

pub type SharedQueue = Arc<Mutex<HostQueue>>;

pub struct LogHost {
    name: String,
    containers: Vec<ContainerId>,
    queue: SharedQueue,
}

impl LogHost {
    pub fn new(name: &str, containers: &[ContainerId]) -> (Self, SharedQueue) {
        let queue = SharedQueue::default();
        let host = Self {
            name: name.to_string(),
            containers: containers.to_vec(),
            queue: queue.clone(),
        };
        (host, queue)
    }
}

impl Host for LogHost {
    fn context(&self) -> RenderContext {
        RenderContext {
            name: self.name.clone(),
            density: 1.0,
        }
    }

    fn has_container_views(&self) -> bool {
        !self.containers.is_empty()
    }

    fn has_container(&self, id: ContainerId) -> bool {
        self.containers.contains(&id)
    }

    fn schedule_drain(&mut self) {
        log::debug!("[{}] drain scheduled", self.name);
        self.queue.lock().drain_requested = true;
    }

    fn invalidate_structure(&mut self) {
        log::info!("[{}] structure invalidated", self.name);
    }

    fn attach_view(&mut self, container: ContainerId, view: ViewId) {
        log::info!("[{}] attach {:?} to {}", self.name, view, container);
    }

    fn detach_view(&mut self, container: ContainerId, view: ViewId) {
        log::info!("[{}] detach {:?} from {}", self.name, view, container);
    }

    fn set_view_visible(&mut self, view: ViewId, visible: bool) {
        log::info!("[{}] {:?} visible={}", self.name, view, visible);
    }

    fn load_animation(&mut self, res: AnimationRes) -> Option<AnimationSpec> {
        Some(AnimationSpec::Resource {
            res,
            duration: Duration::from_millis(150),
        })
    }

    fn start_animation(&mut self, component: ComponentId, view: ViewId, spec: &AnimationSpec) {
        log::info!(
            "[{}] animate {:?} of {} for {:?}",
            self.name,
            view,
            component,
            spec.duration()
        );
        self.queue.lock().animating.push(component);
    }

    fn cancel_animation(&mut self, component: ComponentId, view: ViewId) {
        log::info!("[{}] cancel animation of {:?} ({})", self.name, view, component);
        self.queue.lock().animating.retain(|id| *id != component);
    }

    fn start_launch(&mut self, component: ComponentId, request: LaunchRequest) {
        log::info!("[{}] {} launches {:?}", self.name, component, request.target);
    }
}
