//! Components - units of UI and state with their own lifecycle
//!
//! A [`Component`] is the manager's record of one instance: identity,
//! lifecycle state, flags and relationships. Behavior lives behind the
//! [`ComponentCallbacks`] trait object it owns.

use crate::animation::{AnimationListener, AnimationRequest, AnimationSpec};
use crate::host::RenderContext;
use pane_core::{ComponentId, ContainerId, LifecycleState, ViewId};
use serde_json::Value;

/// Behavior of a component, invoked by the lifecycle state machine
pub trait ComponentCallbacks: Send {
    /// Name used to re-instantiate this component after a restart
    fn kind(&self) -> &str;

    fn on_attach(&mut self, _context: &RenderContext) {}

    fn on_create(&mut self, _saved_state: Option<&Value>) {}

    /// Materialize a view. `container` is where it will be placed, if anywhere.
    fn on_create_view(&mut self, _container: Option<ContainerId>, _saved_state: Option<&Value>) -> Option<ViewId> {
        None
    }

    fn on_view_created(&mut self, _view: ViewId) {}

    /// The host finished its own creation; the component's view is in place
    fn on_container_attached(&mut self) {}

    fn on_view_state_restored(&mut self, _state: Option<&Value>) {}

    fn on_start(&mut self) {}

    fn on_resume(&mut self) {}

    fn on_pause(&mut self) {}

    fn on_stop(&mut self) {}

    /// Stopped for real; release anything that only lives while started
    fn on_really_stop(&mut self) {}

    fn on_destroy_view(&mut self) {}

    fn on_destroy(&mut self) {}

    fn on_detach(&mut self) {}

    fn on_hidden_changed(&mut self, _hidden: bool) {}

    fn on_low_memory(&mut self) {}

    /// Supply an animation for entering or leaving, overriding the defaults
    fn on_create_animation(&mut self, _request: AnimationRequest) -> Option<AnimationSpec> {
        None
    }

    /// Listener to chain in front of the manager's own completion handling
    fn animation_listener(&mut self) -> Option<Box<dyn AnimationListener>> {
        None
    }

    fn save_state(&self) -> Option<Value> {
        None
    }

    fn save_view_state(&self) -> Option<Value> {
        None
    }

    /// Whether the component still has asynchronous work in flight
    fn has_running_work(&self) -> bool {
        false
    }
}

/// Rebuilds component behavior from its kind name after a restart
pub trait ComponentFactory {
    fn create(&self, kind: &str, arguments: Option<&Value>) -> Option<Box<dyn ComponentCallbacks>>;
}

impl<F> ComponentFactory for F
where
    F: Fn(&str, Option<&Value>) -> Option<Box<dyn ComponentCallbacks>>,
{
    fn create(&self, kind: &str, arguments: Option<&Value>) -> Option<Box<dyn ComponentCallbacks>> {
        self(kind, arguments)
    }
}

/// A view that is animating out while its component waits to finish teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimatingAway {
    pub view: ViewId,
    pub container: ContainerId,
}

/// The manager's record of one component instance
pub struct Component {
    id: ComponentId,
    pub(crate) callbacks: Box<dyn ComponentCallbacks>,

    // Identity and placement
    pub(crate) index: Option<usize>,
    pub(crate) tag: Option<String>,
    pub(crate) container: Option<ContainerId>,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) arguments: Option<Value>,

    // Lifecycle
    pub(crate) state: LifecycleState,
    pub(crate) saved_state: Option<Value>,
    pub(crate) saved_view_state: Option<Value>,

    // Flags
    pub(crate) added: bool,
    pub(crate) hidden: bool,
    pub(crate) detached: bool,
    pub(crate) removing: bool,
    pub(crate) restored: bool,
    pub(crate) has_menu: bool,
    pub(crate) menu_visible: bool,
    pub(crate) retain_instance: bool,
    pub(crate) retaining: bool,
    pub(crate) back_stack_nesting: u32,
    pub(crate) defer_start: bool,
    pub(crate) user_visible_hint: bool,

    // Target back-reference (lookup only)
    pub(crate) target: Option<ComponentId>,
    pub(crate) target_request_code: i32,

    // View
    pub(crate) view: Option<ViewId>,
    pub(crate) in_container: Option<ContainerId>,
    pub(crate) next_anim: Option<pane_core::AnimationRes>,
    pub(crate) animating_away: Option<AnimatingAway>,
    pub(crate) state_after_animating: LifecycleState,
}

impl Component {
    /// Wrap behavior into a fresh, unregistered record
    pub fn new(callbacks: Box<dyn ComponentCallbacks>) -> Self {
        Self::with_id(ComponentId::new(), callbacks)
    }

    pub(crate) fn with_id(id: ComponentId, callbacks: Box<dyn ComponentCallbacks>) -> Self {
        Self {
            id,
            callbacks,
            index: None,
            tag: None,
            container: None,
            parent: None,
            arguments: None,
            state: LifecycleState::Initializing,
            saved_state: None,
            saved_view_state: None,
            added: false,
            hidden: false,
            detached: false,
            removing: false,
            restored: false,
            has_menu: false,
            menu_visible: true,
            retain_instance: false,
            retaining: false,
            back_stack_nesting: 0,
            defer_start: false,
            user_visible_hint: true,
            target: None,
            target_request_code: 0,
            view: None,
            in_container: None,
            next_anim: None,
            animating_away: None,
            state_after_animating: LifecycleState::Initializing,
        }
    }

    /// Reset registration-scoped fields after the component leaves the active table
    pub(crate) fn reset_registration(&mut self) {
        self.index = None;
        self.added = false;
        self.removing = false;
        self.restored = false;
        self.back_stack_nesting = 0;
        self.parent = None;
        self.container = None;
        self.tag = None;
        self.hidden = false;
        self.detached = false;
        self.retaining = false;
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn kind(&self) -> &str {
        self.callbacks.kind()
    }

    /// Dense registry index, `None` while unregistered
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn container(&self) -> Option<ContainerId> {
        self.container
    }

    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    pub fn arguments(&self) -> Option<&Value> {
        self.arguments.as_ref()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_added(&self) -> bool {
        self.added
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn is_removing(&self) -> bool {
        self.removing
    }

    pub fn has_menu(&self) -> bool {
        self.has_menu
    }

    pub fn is_menu_visible(&self) -> bool {
        self.menu_visible
    }

    pub fn retain_instance(&self) -> bool {
        self.retain_instance
    }

    /// Number of back-stack entries keeping this component alive while removed
    pub fn back_stack_nesting(&self) -> u32 {
        self.back_stack_nesting
    }

    pub fn is_in_back_stack(&self) -> bool {
        self.back_stack_nesting > 0
    }

    pub fn is_deferred_start(&self) -> bool {
        self.defer_start
    }

    pub fn user_visible_hint(&self) -> bool {
        self.user_visible_hint
    }

    pub fn target(&self) -> Option<ComponentId> {
        self.target
    }

    pub fn target_request_code(&self) -> i32 {
        self.target_request_code
    }

    pub fn view(&self) -> Option<ViewId> {
        self.view
    }

    /// Container the view is currently placed in
    pub fn view_container(&self) -> Option<ContainerId> {
        self.in_container
    }

    pub fn animating_away(&self) -> Option<AnimatingAway> {
        self.animating_away
    }

    /// State the component moves to once its exit animation completes
    pub fn state_after_animating(&self) -> LifecycleState {
        self.state_after_animating
    }

    /// Added, visible and holding a view
    pub fn is_visible(&self) -> bool {
        self.added && !self.hidden && self.view.is_some()
    }

    pub fn callbacks(&self) -> &dyn ComponentCallbacks {
        self.callbacks.as_ref()
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = f.debug_struct("Component");
        out.field("id", &self.id)
            .field("kind", &self.kind())
            .field("index", &self.index)
            .field("state", &self.state);
        if let Some(tag) = &self.tag {
            out.field("tag", tag);
        }
        if let Some(container) = self.container {
            out.field("container", &container);
        }
        out.finish()
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{{{}", self.kind(), self.id)?;
        if let Some(index) = self.index {
            write!(f, " #{}", index)?;
        }
        if let Some(container) = self.container {
            write!(f, " id={}", container)?;
        }
        if let Some(tag) = &self.tag {
            write!(f, " {}", tag)?;
        }
        write!(f, "}}")
    }
}
