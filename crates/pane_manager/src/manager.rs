//! Component manager - registry, dispatch and structural primitives
//!
//! The manager owns every component instance it has been handed, the
//! active table that gives registered components their dense index, the
//! ordered list of added components and the back stack. All structural
//! mutation happens on the thread that created the manager.

use crate::animation::{AnimationListener, ListenerChain, Transit};
use crate::back_stack::{BackStackIndices, BackStackListener, ListenerId};
use crate::component::{Component, ComponentCallbacks};
use crate::config::ManagerConfig;
use crate::host::{Host, LaunchRequest};
use crate::lifecycle::SubStateManager;
use crate::pending::PendingAction;
use crate::transaction::Transaction;
use pane_core::{
    AnimationRes, ComponentId, ContainerId, IndexTable, LifecycleState, OwnerThread,
    ProtocolViolation, Result,
};
use serde_json::Value;
use std::collections::HashMap;

/// Registry and lifecycle manager for a set of components hosted in one container tree
pub struct ComponentManager {
    pub(crate) config: ManagerConfig,
    pub(crate) host: Box<dyn Host>,
    pub(crate) owner: OwnerThread,
    /// Component this manager is nested in, if any
    pub(crate) parent: Option<ComponentId>,

    /// Every instance handed to this manager, registered or not
    pub(crate) components: HashMap<ComponentId, Component>,
    /// Registered components by dense index
    pub(crate) active: IndexTable<ComponentId>,
    /// Added components in display order
    pub(crate) added: Vec<ComponentId>,

    pub(crate) back_stack: Vec<Transaction>,
    pub(crate) back_stack_indices: BackStackIndices,
    pub(crate) back_stack_listeners: Vec<(ListenerId, Box<dyn BackStackListener>)>,
    pub(crate) next_listener_id: u64,

    pub(crate) pending: Vec<PendingAction>,
    pub(crate) executing_actions: bool,

    /// Completion listeners of views animating away
    pub(crate) animations: HashMap<ComponentId, ListenerChain>,
    pub(crate) sub_managers: Vec<Box<dyn SubStateManager>>,

    pub(crate) cur_state: LifecycleState,
    pub(crate) state_saved: bool,
    pub(crate) destroyed: bool,
    pub(crate) no_transactions_because: Option<String>,
    pub(crate) have_pending_deferred_start: bool,
    pub(crate) need_menu_invalidate: bool,
}

impl ComponentManager {
    /// Create a manager bound to the calling thread
    pub fn new(host: Box<dyn Host>, config: ManagerConfig) -> Self {
        Self {
            config,
            host,
            owner: OwnerThread::current(),
            parent: None,
            components: HashMap::new(),
            active: IndexTable::new(),
            added: Vec::new(),
            back_stack: Vec::new(),
            back_stack_indices: BackStackIndices::new(),
            back_stack_listeners: Vec::new(),
            next_listener_id: 1,
            pending: Vec::new(),
            executing_actions: false,
            animations: HashMap::new(),
            sub_managers: Vec::new(),
            cur_state: LifecycleState::Initializing,
            state_saved: false,
            destroyed: false,
            no_transactions_because: None,
            have_pending_deferred_start: false,
            need_menu_invalidate: false,
        }
    }

    /// Create a manager for components nested inside `parent`
    pub fn nested(host: Box<dyn Host>, config: ManagerConfig, parent: ComponentId) -> Self {
        Self {
            parent: Some(parent),
            ..Self::new(host, config)
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> &mut dyn Host {
        self.host.as_mut()
    }

    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    /// State the manager drives its components toward
    pub fn cur_state(&self) -> LifecycleState {
        self.cur_state
    }

    pub fn is_state_saved(&self) -> bool {
        self.state_saved
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_executing_actions(&self) -> bool {
        self.executing_actions
    }

    // ------------------------------------------------------------------
    // Instances
    // ------------------------------------------------------------------

    /// Hand a component to the manager. It stays unregistered until a
    /// transaction adds it.
    pub fn instantiate<C: ComponentCallbacks + 'static>(&mut self, callbacks: C) -> ComponentId {
        self.instantiate_boxed(Box::new(callbacks), None)
    }

    /// Hand a component with arguments to the manager
    pub fn instantiate_with_arguments<C: ComponentCallbacks + 'static>(
        &mut self,
        callbacks: C,
        arguments: Value,
    ) -> ComponentId {
        self.instantiate_boxed(Box::new(callbacks), Some(arguments))
    }

    pub fn instantiate_boxed(
        &mut self,
        callbacks: Box<dyn ComponentCallbacks>,
        arguments: Option<Value>,
    ) -> ComponentId {
        let mut component = Component::new(callbacks);
        component.arguments = arguments;
        let id = component.id();
        log::trace!("Instantiated {}", component);
        self.components.insert(id, component);
        id
    }

    /// Take an unregistered component back out of the manager.
    ///
    /// Registered components stay; they leave the registry through a
    /// transaction.
    pub fn release(&mut self, id: ComponentId) -> Option<Component> {
        let component = self.components.get(&id)?;
        if component.index.is_some() {
            log::warn!("Not releasing {}: still registered", component);
            return None;
        }
        self.animations.remove(&id);
        self.components.remove(&id)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id)
    }

    /// Registered component at a dense index
    pub fn component_at(&self, index: usize) -> Option<&Component> {
        let id = self.active.get(index)?;
        self.components.get(id)
    }

    /// Added components in display order
    pub fn added(&self) -> &[ComponentId] {
        &self.added
    }

    /// Registered components in index order
    pub fn active(&self) -> Vec<ComponentId> {
        self.active.iter().map(|(_, id)| *id).collect()
    }

    /// Registered component indices
    pub fn active_indices(&self) -> Vec<usize> {
        self.active.iter().map(|(index, _)| index).collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Find by container, newest added first, then among all registered
    pub fn find_by_container(&self, container: ContainerId) -> Option<ComponentId> {
        self.find(|component| component.container == Some(container))
    }

    /// Find by tag, newest added first, then among all registered
    pub fn find_by_tag(&self, tag: &str) -> Option<ComponentId> {
        self.find(|component| component.tag.as_deref() == Some(tag))
    }

    fn find(&self, predicate: impl Fn(&Component) -> bool) -> Option<ComponentId> {
        let in_added = self
            .added
            .iter()
            .rev()
            .filter_map(|id| self.components.get(id))
            .find(|component| predicate(component));
        if let Some(component) = in_added {
            return Some(component.id());
        }
        self.active
            .iter()
            .rev()
            .filter_map(|(_, id)| self.components.get(id))
            .find(|component| predicate(component))
            .map(Component::id)
    }

    // ------------------------------------------------------------------
    // Registry primitives used by transactions
    // ------------------------------------------------------------------

    pub(crate) fn make_active(&mut self, id: ComponentId) {
        let Some(component) = self.components.get_mut(&id) else {
            return;
        };
        if component.index.is_some() {
            return;
        }
        let index = self.active.allocate(id);
        component.index = Some(index);
        component.parent = self.parent;
        log::debug!("Allocated component index {}", component);
    }

    pub(crate) fn make_inactive(&mut self, id: ComponentId) {
        let Some(component) = self.components.get_mut(&id) else {
            return;
        };
        let Some(index) = component.index else {
            return;
        };
        log::debug!("Freeing component index {}", component);
        self.active.free(index);
        component.reset_registration();
    }

    pub(crate) fn add_component(&mut self, id: ComponentId, move_now: bool) -> Result<()> {
        if !self.components.contains_key(&id) {
            log::warn!("add: component {} no longer exists", id);
            return Ok(());
        }
        self.make_active(id);
        let Some(component) = self.components.get_mut(&id) else {
            return Ok(());
        };
        log::debug!("add: {}", component);
        if component.detached {
            return Ok(());
        }
        if self.added.contains(&id) {
            return Err(ProtocolViolation::AlreadyAdded(id).into());
        }
        self.added.push(id);
        component.added = true;
        component.removing = false;
        if component.has_menu && component.menu_visible {
            self.need_menu_invalidate = true;
        }
        if move_now {
            self.move_component_to_state(id, self.cur_state, Transit::NONE, 0, false)?;
        }
        Ok(())
    }

    pub(crate) fn remove_component(
        &mut self,
        id: ComponentId,
        transit: Transit,
        transition_style: u32,
    ) -> Result<()> {
        let Some(component) = self.components.get_mut(&id) else {
            log::warn!("remove: component {} no longer exists", id);
            return Ok(());
        };
        log::debug!("remove: {} nesting={}", component, component.back_stack_nesting);
        let inactive = !component.is_in_back_stack();
        if component.detached && !inactive {
            return Ok(());
        }
        self.added.retain(|added| *added != id);
        if component.has_menu && component.menu_visible {
            self.need_menu_invalidate = true;
        }
        component.added = false;
        component.removing = true;
        let target = if inactive {
            LifecycleState::Initializing
        } else {
            LifecycleState::Created
        };
        self.move_component_to_state(id, target, transit, transition_style, false)
    }

    pub(crate) fn hide_component(&mut self, id: ComponentId, transit: Transit, transition_style: u32) {
        let Some(component) = self.components.get(&id) else {
            log::warn!("hide: component {} no longer exists", id);
            return;
        };
        log::debug!("hide: {}", component);
        if component.hidden {
            return;
        }
        if let Some(view) = component.view {
            if let Some(spec) = self.load_animation(id, transit, false, transition_style) {
                self.host.start_animation(id, view, &spec);
            }
            self.host.set_view_visible(view, false);
        }
        let Some(component) = self.components.get_mut(&id) else {
            return;
        };
        component.hidden = true;
        if component.added && component.has_menu && component.menu_visible {
            self.need_menu_invalidate = true;
        }
        component.callbacks.on_hidden_changed(true);
    }

    pub(crate) fn show_component(&mut self, id: ComponentId, transit: Transit, transition_style: u32) {
        let Some(component) = self.components.get(&id) else {
            log::warn!("show: component {} no longer exists", id);
            return;
        };
        log::debug!("show: {}", component);
        if !component.hidden {
            return;
        }
        if let Some(view) = component.view {
            if let Some(spec) = self.load_animation(id, transit, true, transition_style) {
                self.host.start_animation(id, view, &spec);
            }
            self.host.set_view_visible(view, true);
        }
        let Some(component) = self.components.get_mut(&id) else {
            return;
        };
        component.hidden = false;
        if component.added && component.has_menu && component.menu_visible {
            self.need_menu_invalidate = true;
        }
        component.callbacks.on_hidden_changed(false);
    }

    pub(crate) fn detach_component(
        &mut self,
        id: ComponentId,
        transit: Transit,
        transition_style: u32,
    ) -> Result<()> {
        let Some(component) = self.components.get_mut(&id) else {
            log::warn!("detach: component {} no longer exists", id);
            return Ok(());
        };
        log::debug!("detach: {}", component);
        if component.detached {
            return Ok(());
        }
        component.detached = true;
        if !component.added {
            return Ok(());
        }
        self.added.retain(|added| *added != id);
        if component.has_menu && component.menu_visible {
            self.need_menu_invalidate = true;
        }
        component.added = false;
        self.move_component_to_state(id, LifecycleState::Created, transit, transition_style, false)
    }

    pub(crate) fn attach_component(
        &mut self,
        id: ComponentId,
        transit: Transit,
        transition_style: u32,
    ) -> Result<()> {
        let Some(component) = self.components.get_mut(&id) else {
            log::warn!("attach: component {} no longer exists", id);
            return Ok(());
        };
        log::debug!("attach: {}", component);
        if !component.detached {
            return Ok(());
        }
        component.detached = false;
        if component.added {
            return Ok(());
        }
        if self.added.contains(&id) {
            return Err(ProtocolViolation::AlreadyAdded(id).into());
        }
        self.added.push(id);
        component.added = true;
        if component.has_menu && component.menu_visible {
            self.need_menu_invalidate = true;
        }
        self.make_active(id);
        self.move_component_to_state(id, self.cur_state, transit, transition_style, false)
    }

    pub(crate) fn bump_back_stack_nesting(&mut self, id: ComponentId, amount: i32) {
        let Some(component) = self.components.get_mut(&id) else {
            log::warn!("bump nesting: component {} no longer exists", id);
            return;
        };
        let nesting = (component.back_stack_nesting as i64 + amount as i64).max(0);
        component.back_stack_nesting = nesting as u32;
        log::trace!("Bump nesting of {} to {}", component, nesting);
    }

    pub(crate) fn set_next_anim(&mut self, id: ComponentId, anim: Option<AnimationRes>) {
        if let Some(component) = self.components.get_mut(&id) {
            component.next_anim = anim;
        }
    }

    pub(crate) fn container_of(&self, id: ComponentId) -> Option<ContainerId> {
        self.components.get(&id).and_then(|component| component.container)
    }

    // ------------------------------------------------------------------
    // Host lifecycle dispatch
    // ------------------------------------------------------------------

    pub fn dispatch_create(&mut self) -> Result<()> {
        self.owner.check("dispatch_create")?;
        self.state_saved = false;
        self.move_to_state(LifecycleState::Created, Transit::NONE, 0, false)
    }

    /// The host finished creating itself; container views exist
    pub fn dispatch_container_attached(&mut self) -> Result<()> {
        self.owner.check("dispatch_container_attached")?;
        self.state_saved = false;
        self.move_to_state(LifecycleState::ContainerAttached, Transit::NONE, 0, false)
    }

    pub fn dispatch_start(&mut self) -> Result<()> {
        self.owner.check("dispatch_start")?;
        self.state_saved = false;
        self.move_to_state(LifecycleState::Started, Transit::NONE, 0, false)
    }

    pub fn dispatch_resume(&mut self) -> Result<()> {
        self.owner.check("dispatch_resume")?;
        self.state_saved = false;
        self.move_to_state(LifecycleState::Resumed, Transit::NONE, 0, false)
    }

    pub fn dispatch_pause(&mut self) -> Result<()> {
        self.owner.check("dispatch_pause")?;
        self.move_to_state(LifecycleState::Started, Transit::NONE, 0, false)
    }

    /// Stop; from here on the host may save state at any moment
    pub fn dispatch_stop(&mut self) -> Result<()> {
        self.owner.check("dispatch_stop")?;
        self.state_saved = true;
        self.move_to_state(LifecycleState::Stopped, Transit::NONE, 0, false)
    }

    pub fn dispatch_really_stop(&mut self) -> Result<()> {
        self.owner.check("dispatch_really_stop")?;
        self.move_to_state(LifecycleState::ContainerAttached, Transit::NONE, 0, false)
    }

    pub fn dispatch_destroy_view(&mut self) -> Result<()> {
        self.owner.check("dispatch_destroy_view")?;
        self.move_to_state(LifecycleState::Created, Transit::NONE, 0, false)
    }

    /// Tear everything down. Pending actions are drained first and
    /// in-flight exit animations are cancelled rather than awaited.
    pub fn dispatch_destroy(&mut self) -> Result<()> {
        self.owner.check("dispatch_destroy")?;
        self.destroyed = true;
        self.exec_pending_actions()?;
        self.move_to_state(LifecycleState::Initializing, Transit::NONE, 0, false)
    }

    pub fn dispatch_low_memory(&mut self) -> Result<()> {
        self.owner.check("dispatch_low_memory")?;
        for id in self.added.clone() {
            if let Some(component) = self.components.get_mut(&id) {
                component.callbacks.on_low_memory();
            }
        }
        Ok(())
    }

    /// The host's saved state is stale again; commits are allowed
    pub fn note_state_not_saved(&mut self) {
        self.state_saved = false;
    }

    // ------------------------------------------------------------------
    // Structural-mutation fence
    // ------------------------------------------------------------------

    /// Reject commits until [`allow_transactions`](Self::allow_transactions)
    pub fn forbid_transactions(&mut self, reason: impl Into<String>) {
        self.no_transactions_because = Some(reason.into());
    }

    pub fn allow_transactions(&mut self) {
        self.no_transactions_because = None;
    }

    // ------------------------------------------------------------------
    // Per-component controls
    // ------------------------------------------------------------------

    pub fn set_has_menu(&mut self, id: ComponentId, has_menu: bool) -> Result<()> {
        let component = self
            .components
            .get_mut(&id)
            .ok_or(ProtocolViolation::UnknownComponent(id))?;
        if component.has_menu != has_menu {
            component.has_menu = has_menu;
            if component.added && !component.hidden {
                self.host.invalidate_structure();
            }
        }
        Ok(())
    }

    pub fn set_menu_visibility(&mut self, id: ComponentId, visible: bool) -> Result<()> {
        let component = self
            .components
            .get_mut(&id)
            .ok_or(ProtocolViolation::UnknownComponent(id))?;
        if component.menu_visible != visible {
            component.menu_visible = visible;
            if component.has_menu && component.added && !component.hidden {
                self.host.invalidate_structure();
            }
        }
        Ok(())
    }

    /// Keep the instance alive across a host restart
    pub fn set_retain_instance(&mut self, id: ComponentId, retain: bool) -> Result<()> {
        let component = self
            .components
            .get_mut(&id)
            .ok_or(ProtocolViolation::UnknownComponent(id))?;
        component.retain_instance = retain;
        Ok(())
    }

    /// Hint whether the component is visible to the user. A component that
    /// is not stays capped at `Stopped` until the hint turns true.
    pub fn set_user_visible_hint(&mut self, id: ComponentId, visible: bool) -> Result<()> {
        let component = self
            .components
            .get(&id)
            .ok_or(ProtocolViolation::UnknownComponent(id))?;
        let release = !component.user_visible_hint
            && visible
            && component.state < LifecycleState::Started
            && component.added;
        if release {
            self.perform_pending_deferred_start(id)?;
        }
        if let Some(component) = self.components.get_mut(&id) {
            component.user_visible_hint = visible;
            // A release postponed by a drain keeps the flag until the drain ends
            if !(release && component.defer_start) {
                component.defer_start = component.state < LifecycleState::Started && !visible;
            }
        }
        Ok(())
    }

    /// Point `id` at another component for result delivery. The link is a
    /// lookup key only.
    pub fn set_target(
        &mut self,
        id: ComponentId,
        target: Option<ComponentId>,
        request_code: i32,
    ) -> Result<()> {
        let component = self
            .components
            .get_mut(&id)
            .ok_or(ProtocolViolation::UnknownComponent(id))?;
        component.target = target;
        component.target_request_code = request_code;
        Ok(())
    }

    /// Resolve a component's target, if it still exists
    pub fn target_of(&self, id: ComponentId) -> Option<&Component> {
        let target = self.components.get(&id)?.target?;
        match self.components.get(&target) {
            Some(component) => Some(component),
            None => {
                log::warn!("target {} of {} no longer exists", target, id);
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Host relays
    // ------------------------------------------------------------------

    pub fn start_launch_from(&mut self, id: ComponentId, request: LaunchRequest) -> Result<()> {
        self.require_registered(id)?;
        self.host.start_launch(id, request);
        Ok(())
    }

    pub fn request_permissions_from(
        &mut self,
        id: ComponentId,
        permissions: &[String],
        request_code: i32,
    ) -> Result<()> {
        self.require_registered(id)?;
        self.host.request_permissions(id, permissions, request_code);
        Ok(())
    }

    fn require_registered(&self, id: ComponentId) -> Result<()> {
        match self.components.get(&id) {
            Some(component) if component.index.is_some() => Ok(()),
            _ => Err(ProtocolViolation::UnknownComponent(id).into()),
        }
    }

    // ------------------------------------------------------------------
    // Animation completion
    // ------------------------------------------------------------------

    /// The host started the animation it was handed for `id`
    pub fn on_animation_start(&mut self, id: ComponentId) {
        if let Some(chain) = self.animations.get_mut(&id) {
            chain.on_animation_start();
        }
    }

    /// The host finished the exit animation of `id`; apply the parked
    /// lifecycle transition.
    pub fn on_animation_end(&mut self, id: ComponentId) -> Result<()> {
        self.owner.check("on_animation_end")?;
        if let Some(mut chain) = self.animations.remove(&id) {
            chain.on_animation_end();
        }
        let Some(component) = self.components.get_mut(&id) else {
            log::warn!("animation end: component {} no longer exists", id);
            return Ok(());
        };
        let Some(away) = component.animating_away.take() else {
            return Ok(());
        };
        let after = component.state_after_animating;
        self.host.detach_view(away.container, away.view);
        self.move_component_to_state(id, after, Transit::NONE, 0, false)
    }

    /// Drop an in-flight exit animation and detach its view now
    pub(crate) fn cancel_exit_animation(&mut self, id: ComponentId) {
        let Some(component) = self.components.get_mut(&id) else {
            return;
        };
        let Some(away) = component.animating_away.take() else {
            return;
        };
        log::debug!("Cancelling exit animation of {}", component);
        self.host.cancel_animation(id, away.view);
        self.host.detach_view(away.container, away.view);
        if let Some(mut chain) = self.animations.remove(&id) {
            chain.on_animation_cancel();
        }
    }

    // ------------------------------------------------------------------
    // Sub-state managers
    // ------------------------------------------------------------------

    /// Register a nested state holder that follows the manager's start/stop
    pub fn register_sub_manager(&mut self, manager: Box<dyn SubStateManager>) {
        log::debug!("Registered sub-state manager {}", manager.name());
        self.sub_managers.push(manager);
    }

    // ------------------------------------------------------------------
    // Back stack listeners
    // ------------------------------------------------------------------

    pub fn add_back_stack_listener(&mut self, listener: Box<dyn BackStackListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.back_stack_listeners.push((id, listener));
        id
    }

    pub fn remove_back_stack_listener(&mut self, id: ListenerId) -> bool {
        let before = self.back_stack_listeners.len();
        self.back_stack_listeners.retain(|(listener, _)| *listener != id);
        before != self.back_stack_listeners.len()
    }
}

impl std::fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentManager")
            .field("cur_state", &self.cur_state)
            .field("active", &self.active.len())
            .field("added", &self.added.len())
            .field("back_stack", &self.back_stack.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}
