//! Shared fixtures: a recording host and recording components

#![allow(dead_code)]

use pane_manager::*;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Everything the host was asked to do
#[derive(Debug, Default)]
pub struct HostProbe {
    pub drains: usize,
    pub invalidations: usize,
    pub attached_components: Vec<ComponentId>,
    pub views: Vec<(ContainerId, ViewId)>,
    pub visibility: Vec<(ViewId, bool)>,
    pub animations: Vec<(ComponentId, AnimationSpec)>,
    pub cancelled: Vec<ComponentId>,
    pub launches: Vec<(ComponentId, String, Option<i32>)>,
    pub permissions: Vec<(ComponentId, Vec<String>, i32)>,
}

pub type Probe = Arc<Mutex<HostProbe>>;

pub struct TestHost {
    containers: Vec<ContainerId>,
    probe: Probe,
}

impl TestHost {
    pub fn new(containers: &[u32]) -> (Self, Probe) {
        let probe = Probe::default();
        let host = Self {
            containers: containers.iter().copied().map(ContainerId).collect(),
            probe: probe.clone(),
        };
        (host, probe)
    }
}

impl Host for TestHost {
    fn context(&self) -> RenderContext {
        RenderContext {
            name: "test".to_string(),
            density: 2.0,
        }
    }

    fn has_container_views(&self) -> bool {
        !self.containers.is_empty()
    }

    fn has_container(&self, id: ContainerId) -> bool {
        self.containers.contains(&id)
    }

    fn schedule_drain(&mut self) {
        self.probe.lock().drains += 1;
    }

    fn invalidate_structure(&mut self) {
        self.probe.lock().invalidations += 1;
    }

    fn on_attach_component(&mut self, component: ComponentId) {
        self.probe.lock().attached_components.push(component);
    }

    fn attach_view(&mut self, container: ContainerId, view: ViewId) {
        self.probe.lock().views.push((container, view));
    }

    fn detach_view(&mut self, container: ContainerId, view: ViewId) {
        self.probe.lock().views.retain(|placed| *placed != (container, view));
    }

    fn set_view_visible(&mut self, view: ViewId, visible: bool) {
        self.probe.lock().visibility.push((view, visible));
    }

    fn load_animation(&mut self, res: AnimationRes) -> Option<AnimationSpec> {
        Some(AnimationSpec::Resource {
            res,
            duration: Duration::from_millis(100),
        })
    }

    fn start_animation(&mut self, component: ComponentId, _view: ViewId, spec: &AnimationSpec) {
        self.probe.lock().animations.push((component, spec.clone()));
    }

    fn cancel_animation(&mut self, component: ComponentId, _view: ViewId) {
        self.probe.lock().cancelled.push(component);
    }

    fn start_launch(&mut self, component: ComponentId, request: LaunchRequest) {
        self.probe
            .lock()
            .launches
            .push((component, request.target, request.request_code));
    }

    fn request_permissions(&mut self, component: ComponentId, permissions: &[String], request_code: i32) {
        self.probe
            .lock()
            .permissions
            .push((component, permissions.to_vec(), request_code));
    }
}

/// Component that logs every callback as `Kind:event`
pub struct Recorder {
    kind: String,
    log: Log,
    view: Option<ViewId>,
    state: Option<Value>,
    busy: Option<Arc<AtomicBool>>,
    animation_log: Option<Log>,
}

impl Recorder {
    pub fn new(kind: &str, log: &Log) -> Self {
        Self {
            kind: kind.to_string(),
            log: log.clone(),
            view: None,
            state: None,
            busy: None,
            animation_log: None,
        }
    }

    pub fn with_view(mut self, view: u64) -> Self {
        self.view = Some(ViewId(view));
        self
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_busy_flag(mut self, busy: &Arc<AtomicBool>) -> Self {
        self.busy = Some(busy.clone());
        self
    }

    pub fn with_animation_log(mut self, log: &Log) -> Self {
        self.animation_log = Some(log.clone());
        self
    }

    fn record(&self, event: &str) {
        self.log.lock().push(format!("{}:{}", self.kind, event));
    }
}

impl ComponentCallbacks for Recorder {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn on_attach(&mut self, _context: &RenderContext) {
        self.record("attach");
    }

    fn on_create(&mut self, saved_state: Option<&Value>) {
        match saved_state {
            Some(state) => self.record(&format!("create({})", state)),
            None => self.record("create"),
        }
    }

    fn on_create_view(&mut self, _container: Option<ContainerId>, _saved_state: Option<&Value>) -> Option<ViewId> {
        self.record("create_view");
        self.view
    }

    fn on_view_created(&mut self, _view: ViewId) {
        self.record("view_created");
    }

    fn on_container_attached(&mut self) {
        self.record("container_attached");
    }

    fn on_start(&mut self) {
        self.record("start");
    }

    fn on_resume(&mut self) {
        self.record("resume");
    }

    fn on_pause(&mut self) {
        self.record("pause");
    }

    fn on_stop(&mut self) {
        self.record("stop");
    }

    fn on_really_stop(&mut self) {
        self.record("really_stop");
    }

    fn on_destroy_view(&mut self) {
        self.record("destroy_view");
    }

    fn on_destroy(&mut self) {
        self.record("destroy");
    }

    fn on_detach(&mut self) {
        self.record("detach");
    }

    fn on_hidden_changed(&mut self, hidden: bool) {
        self.record(&format!("hidden={}", hidden));
    }

    fn on_low_memory(&mut self) {
        self.record("low_memory");
    }

    fn animation_listener(&mut self) -> Option<Box<dyn AnimationListener>> {
        let log = self.animation_log.clone()?;
        Some(Box::new(LogListener {
            name: self.kind.clone(),
            log,
        }))
    }

    fn save_state(&self) -> Option<Value> {
        self.state.clone()
    }

    fn has_running_work(&self) -> bool {
        self.busy
            .as_ref()
            .map_or(false, |busy| busy.load(Ordering::SeqCst))
    }
}

struct LogListener {
    name: String,
    log: Log,
}

impl AnimationListener for LogListener {
    fn on_animation_end(&mut self) {
        self.log.lock().push(format!("{}:anim_end", self.name));
    }

    fn on_animation_cancel(&mut self) {
        self.log.lock().push(format!("{}:anim_cancel", self.name));
    }
}

/// Sub-state manager whose running-work flag is controlled by the test
pub struct Loader {
    pub log: Log,
    pub busy: Arc<AtomicBool>,
}

impl SubStateManager for Loader {
    fn name(&self) -> &str {
        "loader"
    }

    fn on_start(&mut self) {
        self.log.lock().push("loader:start".to_string());
    }

    fn on_stop(&mut self) {
        self.log.lock().push("loader:stop".to_string());
    }

    fn on_destroy(&mut self) {
        self.log.lock().push("loader:destroy".to_string());
    }

    fn has_running_work(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

/// Rebuilds recorders by kind, all with a view
pub fn recorder_factory(log: &Log) -> impl Fn(&str, Option<&Value>) -> Option<Box<dyn ComponentCallbacks>> {
    let log = log.clone();
    move |kind: &str, _arguments: Option<&Value>| -> Option<Box<dyn ComponentCallbacks>> {
        if kind == "Unknown" {
            return None;
        }
        Some(Box::new(Recorder::new(kind, &log).with_view(1)))
    }
}

/// Fresh manager in `Initializing`, with container 0 available
pub fn manager() -> (ComponentManager, Probe) {
    manager_with(ManagerConfig::testing())
}

pub fn manager_with(config: ManagerConfig) -> (ComponentManager, Probe) {
    init_logging();
    let (host, probe) = TestHost::new(&[0]);
    (ComponentManager::new(Box::new(host), config), probe)
}

/// Drive a manager all the way to `Resumed`
pub fn resume(manager: &mut ComponentManager) {
    manager.dispatch_create().unwrap();
    manager.dispatch_container_attached().unwrap();
    manager.dispatch_start().unwrap();
    manager.dispatch_resume().unwrap();
}

pub fn resumed_manager() -> (ComponentManager, Probe) {
    let (mut manager, probe) = manager();
    resume(&mut manager);
    (manager, probe)
}

/// Commit a transaction and drain the queue
pub fn commit_and_run(manager: &mut ComponentManager, transaction: &mut Transaction) -> Option<usize> {
    let index = manager.commit(transaction).unwrap();
    manager.exec_pending_actions().unwrap();
    index
}

pub fn state_of(manager: &ComponentManager, id: ComponentId) -> LifecycleState {
    manager.component(id).unwrap().state()
}

pub fn events(log: &Log) -> Vec<String> {
    log.lock().clone()
}
