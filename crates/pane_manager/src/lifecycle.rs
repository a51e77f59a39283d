//! Lifecycle state machine
//!
//! A component moves one adjacent state at a time. Every adjacent pair
//! has an entry in [`FORWARD`] or [`BACKWARD`] listing the steps run while
//! crossing it; the walker applies them in order until the (possibly
//! capped) target is reached.

use crate::animation::{AnimationRequest, AnimationSpec, AnimationStyle, ListenerChain, Transit};
use crate::component::AnimatingAway;
use crate::manager::ComponentManager;
use pane_core::{ComponentId, LifecycleState, ProtocolViolation, Result};

/// One unit of work run while crossing between adjacent states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Attach,
    Create,
    CreateView,
    NotifyContainerAttached,
    Start,
    Resume,
    Pause,
    Stop,
    ReallyStop,
    DestroyView,
    Destroy,
    Detach,
}

/// Steps run while crossing from `from` to the adjacent `to`
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub from: LifecycleState,
    pub to: LifecycleState,
    pub steps: &'static [Step],
}

/// Upward crossings
pub const FORWARD: [Transition; 5] = [
    Transition {
        from: LifecycleState::Initializing,
        to: LifecycleState::Created,
        steps: &[Step::Attach, Step::Create],
    },
    Transition {
        from: LifecycleState::Created,
        to: LifecycleState::ContainerAttached,
        steps: &[Step::CreateView, Step::NotifyContainerAttached],
    },
    Transition {
        from: LifecycleState::ContainerAttached,
        to: LifecycleState::Stopped,
        steps: &[],
    },
    Transition {
        from: LifecycleState::Stopped,
        to: LifecycleState::Started,
        steps: &[Step::Start],
    },
    Transition {
        from: LifecycleState::Started,
        to: LifecycleState::Resumed,
        steps: &[Step::Resume],
    },
];

/// Downward crossings
pub const BACKWARD: [Transition; 5] = [
    Transition {
        from: LifecycleState::Resumed,
        to: LifecycleState::Started,
        steps: &[Step::Pause],
    },
    Transition {
        from: LifecycleState::Started,
        to: LifecycleState::Stopped,
        steps: &[Step::Stop],
    },
    Transition {
        from: LifecycleState::Stopped,
        to: LifecycleState::ContainerAttached,
        steps: &[Step::ReallyStop],
    },
    Transition {
        from: LifecycleState::ContainerAttached,
        to: LifecycleState::Created,
        steps: &[Step::DestroyView],
    },
    Transition {
        from: LifecycleState::Created,
        to: LifecycleState::Initializing,
        steps: &[Step::Destroy, Step::Detach],
    },
];

pub fn forward_from(state: LifecycleState) -> Option<&'static Transition> {
    FORWARD.iter().find(|t| t.from == state)
}

pub fn backward_from(state: LifecycleState) -> Option<&'static Transition> {
    BACKWARD.iter().find(|t| t.from == state)
}

/// Nested state holder that follows the manager across `Started`
pub trait SubStateManager: Send {
    fn name(&self) -> &str;

    fn on_start(&mut self) {}

    fn on_stop(&mut self) {}

    /// The manager was torn down
    fn on_destroy(&mut self) {}

    /// Asynchronous work still in flight; deferred starts wait for it
    fn has_running_work(&self) -> bool {
        false
    }
}

/// Per-move parameters, shared by the steps of one walk
struct StepContext {
    transit: Transit,
    transition_style: u32,
    target: LifecycleState,
}

impl ComponentManager {
    /// Drive one component toward `new_state`.
    ///
    /// The target is capped first: an unadded or detached component never
    /// goes past `Created`, a removing one never moves up, and a deferred
    /// start holds at `Stopped`. With `keep_active` the component keeps its
    /// index when it falls back to `Initializing`.
    pub(crate) fn move_component_to_state(
        &mut self,
        id: ComponentId,
        new_state: LifecycleState,
        transit: Transit,
        transition_style: u32,
        keep_active: bool,
    ) -> Result<()> {
        let Some(component) = self.components.get(&id) else {
            log::warn!("move_to_state: component {} no longer exists", id);
            return Ok(());
        };

        let mut target = new_state;
        if (!component.added || component.detached) && target > LifecycleState::Created {
            target = LifecycleState::Created;
        }
        if component.removing && target > component.state {
            target = component.state;
        }
        if component.defer_start
            && component.state < LifecycleState::Started
            && target > LifecycleState::Stopped
        {
            target = LifecycleState::Stopped;
        }
        let mut ctx = StepContext {
            transit,
            transition_style,
            target,
        };

        if component.state < ctx.target {
            if component.animating_away.is_some() {
                // Coming back while still animating out: finish the
                // parked teardown before starting over.
                let after = component.state_after_animating;
                self.cancel_exit_animation(id);
                self.move_component_to_state(id, after, Transit::NONE, 0, true)?;
            }
            loop {
                let Some(component) = self.components.get(&id) else {
                    break;
                };
                if component.state >= ctx.target {
                    break;
                }
                let Some(transition) = forward_from(component.state) else {
                    break;
                };
                log::trace!("moveto {}: {}", transition.to, component);
                for step in transition.steps {
                    self.run_step(id, *step, &mut ctx)?;
                }
                if let Some(component) = self.components.get_mut(&id) {
                    component.state = transition.to;
                }
            }
        } else if component.state > ctx.target {
            loop {
                let Some(component) = self.components.get(&id) else {
                    break;
                };
                if component.state <= ctx.target {
                    break;
                }
                let Some(transition) = backward_from(component.state) else {
                    break;
                };
                if transition.to == LifecycleState::Initializing {
                    if self.destroyed && component.animating_away.is_some() {
                        self.cancel_exit_animation(id);
                    }
                    if let Some(component) = self.components.get_mut(&id) {
                        if component.animating_away.is_some() {
                            // Finish once the exit animation ends
                            component.state_after_animating = ctx.target;
                            ctx.target = LifecycleState::Created;
                            break;
                        }
                    }
                }
                if let Some(component) = self.components.get(&id) {
                    log::trace!("movefrom {}: {}", component.state, component);
                }
                for step in transition.steps {
                    self.run_step(id, *step, &mut ctx)?;
                }
                if let Some(component) = self.components.get_mut(&id) {
                    component.state = transition.to;
                }
                if transition.to == LifecycleState::Initializing && !keep_active {
                    self.finish_detach(id);
                }
            }
        }

        if let Some(component) = self.components.get_mut(&id) {
            if component.state != ctx.target {
                log::warn!(
                    "move_to_state: state of {} not updated inline; expected {} found {}",
                    component,
                    ctx.target,
                    component.state
                );
                component.state = ctx.target;
            }
        }
        Ok(())
    }

    fn finish_detach(&mut self, id: ComponentId) {
        let retaining = match self.components.get_mut(&id) {
            Some(component) if component.retaining => {
                component.parent = None;
                true
            }
            Some(_) => false,
            None => return,
        };
        if !retaining {
            self.make_inactive(id);
        }
    }

    fn run_step(&mut self, id: ComponentId, step: Step, ctx: &mut StepContext) -> Result<()> {
        match step {
            Step::Attach => {
                let context = self.host.context();
                let parent = self.parent;
                let Some(component) = self.components.get_mut(&id) else {
                    return Ok(());
                };
                component.parent = parent;
                if component.restored && !component.user_visible_hint {
                    component.defer_start = true;
                    if ctx.target > LifecycleState::Stopped {
                        ctx.target = LifecycleState::Stopped;
                    }
                }
                component.callbacks.on_attach(&context);
                self.host.on_attach_component(id);
            }
            Step::Create => {
                let Some(component) = self.components.get_mut(&id) else {
                    return Ok(());
                };
                if !component.retaining {
                    component.callbacks.on_create(component.saved_state.as_ref());
                }
                component.retaining = false;
            }
            Step::CreateView => self.create_view(id, ctx)?,
            Step::NotifyContainerAttached => {
                let Some(component) = self.components.get_mut(&id) else {
                    return Ok(());
                };
                component.callbacks.on_container_attached();
                if component.view.is_some() {
                    component
                        .callbacks
                        .on_view_state_restored(component.saved_view_state.as_ref());
                }
                component.saved_state = None;
            }
            Step::Start => {
                if let Some(component) = self.components.get_mut(&id) {
                    component.callbacks.on_start();
                }
            }
            Step::Resume => {
                if let Some(component) = self.components.get_mut(&id) {
                    component.callbacks.on_resume();
                    component.saved_view_state = None;
                }
            }
            Step::Pause => {
                if let Some(component) = self.components.get_mut(&id) {
                    component.callbacks.on_pause();
                }
            }
            Step::Stop => {
                if let Some(component) = self.components.get_mut(&id) {
                    component.callbacks.on_stop();
                }
            }
            Step::ReallyStop => {
                if let Some(component) = self.components.get_mut(&id) {
                    component.callbacks.on_really_stop();
                }
            }
            Step::DestroyView => self.destroy_view(id, ctx),
            Step::Destroy => {
                if let Some(component) = self.components.get_mut(&id) {
                    if !component.retaining {
                        component.callbacks.on_destroy();
                    }
                }
            }
            Step::Detach => {
                if let Some(component) = self.components.get_mut(&id) {
                    component.callbacks.on_detach();
                }
            }
        }
        Ok(())
    }

    fn create_view(&mut self, id: ComponentId, ctx: &StepContext) -> Result<()> {
        let Some(component) = self.components.get(&id) else {
            return Ok(());
        };
        let mut placed = None;
        if let Some(container) = component.container {
            if self.host.has_container(container) {
                placed = Some(container);
            } else if !component.restored {
                return Err(ProtocolViolation::NoContainerView {
                    component: id,
                    container,
                }
                .into());
            }
        }

        let Some(component) = self.components.get_mut(&id) else {
            return Ok(());
        };
        component.in_container = placed;
        let view = component
            .callbacks
            .on_create_view(placed, component.saved_state.as_ref());
        component.view = view;
        let hidden = component.hidden;
        let Some(view) = view else {
            return Ok(());
        };

        if let Some(container) = placed {
            let animation = self.load_animation(id, ctx.transit, true, ctx.transition_style);
            self.host.attach_view(container, view);
            if let Some(spec) = animation {
                self.host.start_animation(id, view, &spec);
            }
        }
        if hidden {
            self.host.set_view_visible(view, false);
        }
        if let Some(component) = self.components.get_mut(&id) {
            component.callbacks.on_view_created(view);
        }
        Ok(())
    }

    fn destroy_view(&mut self, id: ComponentId, ctx: &StepContext) {
        let Some(component) = self.components.get_mut(&id) else {
            return;
        };
        if component.view.is_some() && component.saved_view_state.is_none() {
            component.saved_view_state = component.callbacks.save_view_state();
        }
        component.callbacks.on_destroy_view();
        let placement = component.view.zip(component.in_container);
        component.view = None;
        component.in_container = None;

        let Some((view, container)) = placement else {
            return;
        };
        let animation = if self.cur_state > LifecycleState::Initializing && !self.destroyed {
            self.load_animation(id, ctx.transit, false, ctx.transition_style)
        } else {
            None
        };
        let Some(spec) = animation else {
            self.host.detach_view(container, view);
            return;
        };

        let Some(component) = self.components.get_mut(&id) else {
            return;
        };
        component.animating_away = Some(AnimatingAway { view, container });
        component.state_after_animating = ctx.target;
        let mut chain = ListenerChain::new();
        if let Some(listener) = component.callbacks.animation_listener() {
            chain.push(listener);
        }
        log::debug!("Animating away {} for {:?}", component, spec.duration());
        self.animations.insert(id, chain);
        self.host.start_animation(id, view, &spec);
    }

    /// Pick the animation for a component entering or leaving.
    ///
    /// The component's own choice wins, then the custom resource set on the
    /// op, then the built-in style for the transit.
    pub(crate) fn load_animation(
        &mut self,
        id: ComponentId,
        transit: Transit,
        enter: bool,
        transition_style: u32,
    ) -> Option<AnimationSpec> {
        if !self.config.animations_enabled || !self.host.has_container_views() {
            return None;
        }
        let component = self.components.get_mut(&id)?;
        let request = AnimationRequest {
            transit,
            enter,
            transition_style,
            next: component.next_anim,
        };
        if let Some(spec) = component.callbacks.on_create_animation(request) {
            return Some(spec);
        }
        if let Some(res) = request.next {
            if let Some(spec) = self.host.load_animation(res) {
                return Some(spec);
            }
        }
        if transit.is_none() {
            return None;
        }
        AnimationStyle::for_transit(transit, enter).map(AnimationStyle::spec)
    }

    /// Drive every registered component toward `new_state`
    pub(crate) fn move_to_state(
        &mut self,
        new_state: LifecycleState,
        transit: Transit,
        transition_style: u32,
        always: bool,
    ) -> Result<()> {
        if !always && self.cur_state == new_state {
            return Ok(());
        }
        let previous = self.cur_state;
        self.cur_state = new_state;

        let ids: Vec<ComponentId> = self.active.iter().map(|(_, id)| *id).collect();
        let mut work_running = false;
        for id in ids {
            self.move_component_to_state(id, new_state, transit, transition_style, false)?;
            if let Some(component) = self.components.get(&id) {
                work_running |= component.callbacks.has_running_work();
            }
        }

        let started = LifecycleState::Started;
        for sub in &mut self.sub_managers {
            if previous < started && new_state >= started {
                sub.on_start();
            } else if previous >= started && new_state < started {
                sub.on_stop();
            }
            if previous > LifecycleState::Initializing && new_state == LifecycleState::Initializing {
                sub.on_destroy();
            }
            work_running |= sub.has_running_work();
        }

        if !work_running {
            self.start_pending_deferred()?;
        }
        if self.need_menu_invalidate && self.cur_state == LifecycleState::Resumed {
            self.host.invalidate_structure();
            self.need_menu_invalidate = false;
        }
        Ok(())
    }

    pub(crate) fn start_pending_deferred(&mut self) -> Result<()> {
        let ids: Vec<ComponentId> = self.active.iter().map(|(_, id)| *id).collect();
        for id in ids {
            self.perform_pending_deferred_start(id)?;
        }
        Ok(())
    }

    pub(crate) fn perform_pending_deferred_start(&mut self, id: ComponentId) -> Result<()> {
        let Some(component) = self.components.get_mut(&id) else {
            return Ok(());
        };
        if !component.defer_start {
            return Ok(());
        }
        if self.executing_actions {
            self.have_pending_deferred_start = true;
            return Ok(());
        }
        component.defer_start = false;
        self.move_component_to_state(id, self.cur_state, Transit::NONE, 0, false)
    }
}
