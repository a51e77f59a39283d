//! Transactions - ordered, reversible batches of structural ops
//!
//! A [`Transaction`] is built by the caller, committed exactly once, run
//! forward once and, if it was placed on the back stack, run in reverse
//! once when popped. Committing seals the caller's handle: the queued copy
//! is what runs, the handle only remembers that it was committed and the
//! back-stack index it was given.

use crate::animation::Transit;
use crate::back_stack::BackStackEntry;
use crate::manager::ComponentManager;
use crate::pending::{CommittedTransaction, PendingAction};
use pane_core::{AnimationRes, ComponentId, ContainerId, ProtocolViolation, Result, TransactionId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural command carried by an op
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpCommand {
    Add,
    Remove,
    Replace,
    Hide,
    Show,
    Detach,
    Attach,
}

impl OpCommand {
    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Remove => "REMOVE",
            Self::Replace => "REPLACE",
            Self::Hide => "HIDE",
            Self::Show => "SHOW",
            Self::Detach => "DETACH",
            Self::Attach => "ATTACH",
        }
    }
}

/// One entry of a transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Op {
    pub command: OpCommand,
    /// Target; cleared when a replace turns out to replace the target with itself
    pub component: Option<ComponentId>,
    pub container: Option<ContainerId>,
    pub tag: Option<String>,
    pub enter_anim: Option<AnimationRes>,
    pub exit_anim: Option<AnimationRes>,
    pub pop_enter_anim: Option<AnimationRes>,
    pub pop_exit_anim: Option<AnimationRes>,
    /// Components a replace took out, in the order it removed them
    pub removed: Vec<ComponentId>,
}

impl Op {
    fn new(command: OpCommand, component: ComponentId) -> Self {
        Self {
            command,
            component: Some(component),
            container: None,
            tag: None,
            enter_anim: None,
            exit_anim: None,
            pop_enter_anim: None,
            pop_exit_anim: None,
            removed: Vec::new(),
        }
    }
}

/// An ordered batch of ops against a [`ComponentManager`]
#[derive(Debug, Clone)]
pub struct Transaction {
    pub(crate) id: TransactionId,
    pub(crate) index: Option<usize>,
    pub(crate) name: Option<String>,
    pub(crate) ops: Vec<Op>,
    pub(crate) transition: Transit,
    pub(crate) transition_style: u32,
    enter_anim: Option<AnimationRes>,
    exit_anim: Option<AnimationRes>,
    pop_enter_anim: Option<AnimationRes>,
    pop_exit_anim: Option<AnimationRes>,
    pub(crate) add_to_back_stack: bool,
    pub(crate) allow_add_to_back_stack: bool,
    pub(crate) committed: bool,
    pub(crate) breadcrumb_title: Option<String>,
    pub(crate) breadcrumb_short_title: Option<String>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            id: TransactionId::new(),
            index: None,
            name: None,
            ops: Vec::new(),
            transition: Transit::NONE,
            transition_style: 0,
            enter_anim: None,
            exit_anim: None,
            pop_enter_anim: None,
            pop_exit_anim: None,
            add_to_back_stack: false,
            allow_add_to_back_stack: true,
            committed: false,
            breadcrumb_title: None,
            breadcrumb_short_title: None,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Back-stack index, once committed onto the back stack
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn transition(&self) -> Transit {
        self.transition
    }

    pub fn transition_style(&self) -> u32 {
        self.transition_style
    }

    pub fn is_add_to_back_stack(&self) -> bool {
        self.add_to_back_stack
    }

    pub fn is_add_to_back_stack_allowed(&self) -> bool {
        self.allow_add_to_back_stack
    }

    pub fn breadcrumb_title(&self) -> Option<&str> {
        self.breadcrumb_title.as_deref()
    }

    pub fn breadcrumb_short_title(&self) -> Option<&str> {
        self.breadcrumb_short_title.as_deref()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.committed {
            return Err(ProtocolViolation::ModifiedAfterCommit.into());
        }
        Ok(())
    }

    fn push_op(&mut self, mut op: Op) -> Result<&mut Self> {
        self.ensure_open()?;
        op.enter_anim = self.enter_anim;
        op.exit_anim = self.exit_anim;
        op.pop_enter_anim = self.pop_enter_anim;
        op.pop_exit_anim = self.pop_exit_anim;
        self.ops.push(op);
        Ok(self)
    }

    fn placed(
        &mut self,
        command: OpCommand,
        component: ComponentId,
        container: Option<ContainerId>,
        tag: Option<&str>,
    ) -> Result<&mut Self> {
        let mut op = Op::new(command, component);
        op.container = container;
        op.tag = tag.map(str::to_string);
        self.push_op(op)
    }

    /// Add a component without a container (no view placement)
    pub fn add(&mut self, component: ComponentId) -> Result<&mut Self> {
        self.placed(OpCommand::Add, component, None, None)
    }

    pub fn add_tagged(&mut self, component: ComponentId, tag: &str) -> Result<&mut Self> {
        self.placed(OpCommand::Add, component, None, Some(tag))
    }

    /// Add a component whose view goes into `container`
    pub fn add_to(&mut self, container: ContainerId, component: ComponentId) -> Result<&mut Self> {
        self.placed(OpCommand::Add, component, Some(container), None)
    }

    pub fn add_to_tagged(
        &mut self,
        container: ContainerId,
        component: ComponentId,
        tag: &str,
    ) -> Result<&mut Self> {
        self.placed(OpCommand::Add, component, Some(container), Some(tag))
    }

    /// Remove everything added to `container`, then add `component` there
    pub fn replace(&mut self, container: ContainerId, component: ComponentId) -> Result<&mut Self> {
        self.placed(OpCommand::Replace, component, Some(container), None)
    }

    pub fn replace_tagged(
        &mut self,
        container: ContainerId,
        component: ComponentId,
        tag: &str,
    ) -> Result<&mut Self> {
        self.placed(OpCommand::Replace, component, Some(container), Some(tag))
    }

    pub fn remove(&mut self, component: ComponentId) -> Result<&mut Self> {
        self.push_op(Op::new(OpCommand::Remove, component))
    }

    pub fn hide(&mut self, component: ComponentId) -> Result<&mut Self> {
        self.push_op(Op::new(OpCommand::Hide, component))
    }

    pub fn show(&mut self, component: ComponentId) -> Result<&mut Self> {
        self.push_op(Op::new(OpCommand::Show, component))
    }

    /// Take a component down to `Created` while keeping it registered
    pub fn detach(&mut self, component: ComponentId) -> Result<&mut Self> {
        self.push_op(Op::new(OpCommand::Detach, component))
    }

    pub fn attach(&mut self, component: ComponentId) -> Result<&mut Self> {
        self.push_op(Op::new(OpCommand::Attach, component))
    }

    /// Custom animations for ops added after this call
    pub fn set_custom_animations(
        &mut self,
        enter: Option<AnimationRes>,
        exit: Option<AnimationRes>,
    ) -> Result<&mut Self> {
        self.set_custom_animations_with_pop(enter, exit, None, None)
    }

    pub fn set_custom_animations_with_pop(
        &mut self,
        enter: Option<AnimationRes>,
        exit: Option<AnimationRes>,
        pop_enter: Option<AnimationRes>,
        pop_exit: Option<AnimationRes>,
    ) -> Result<&mut Self> {
        self.ensure_open()?;
        self.enter_anim = enter;
        self.exit_anim = exit;
        self.pop_enter_anim = pop_enter;
        self.pop_exit_anim = pop_exit;
        Ok(self)
    }

    pub fn set_transition(&mut self, transit: Transit) -> Result<&mut Self> {
        self.ensure_open()?;
        self.transition = transit;
        Ok(self)
    }

    pub fn set_transition_style(&mut self, style: u32) -> Result<&mut Self> {
        self.ensure_open()?;
        self.transition_style = style;
        Ok(self)
    }

    /// Record this transaction on the back stack when it runs
    pub fn add_to_back_stack(&mut self, name: Option<&str>) -> Result<&mut Self> {
        self.ensure_open()?;
        if !self.allow_add_to_back_stack {
            return Err(ProtocolViolation::BackStackDisallowed.into());
        }
        self.add_to_back_stack = true;
        self.name = name.map(str::to_string);
        Ok(self)
    }

    /// Seal the transaction against back-stack use
    pub fn disallow_add_to_back_stack(&mut self) -> Result<&mut Self> {
        if self.add_to_back_stack {
            return Err(ProtocolViolation::BackStackRequested.into());
        }
        self.allow_add_to_back_stack = false;
        Ok(self)
    }

    pub fn set_breadcrumb_title(&mut self, title: &str) -> Result<&mut Self> {
        self.ensure_open()?;
        self.breadcrumb_title = Some(title.to_string());
        Ok(self)
    }

    pub fn set_breadcrumb_short_title(&mut self, title: &str) -> Result<&mut Self> {
        self.ensure_open()?;
        self.breadcrumb_short_title = Some(title.to_string());
        Ok(self)
    }

    /// Components referenced by this transaction's ops
    fn referenced(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.ops
            .iter()
            .flat_map(|op| op.component.into_iter().chain(op.removed.iter().copied()))
    }

    fn bump_back_stack_nesting(&self, manager: &mut ComponentManager, amount: i32) {
        if !self.add_to_back_stack {
            return;
        }
        log::trace!("Bump nesting in {} by {}", self, amount);
        for id in self.referenced() {
            manager.bump_back_stack_nesting(id, amount);
        }
    }

    /// Execute forward, then place on the back stack if requested
    pub(crate) fn run(mut self, manager: &mut ComponentManager) -> Result<()> {
        log::debug!("Run: {}", self);
        if self.add_to_back_stack && self.index.is_none() {
            return Err(ProtocolViolation::MissingBackStackIndex.into());
        }
        if let Err(err) = self.execute_ops(manager) {
            if let Some(index) = self.index.take() {
                manager.back_stack_indices.free(index);
            }
            return Err(err);
        }
        if self.add_to_back_stack {
            manager.add_back_stack_state(self);
        }
        Ok(())
    }

    fn execute_ops(&mut self, manager: &mut ComponentManager) -> Result<()> {
        self.bump_back_stack_nesting(manager, 1);
        let transit = self.transition;
        let style = self.transition_style;
        let back_stack_bound = self.add_to_back_stack;

        for op in &mut self.ops {
            match op.command {
                OpCommand::Add => {
                    if let Some(id) = op.component {
                        manager.set_next_anim(id, op.enter_anim);
                        manager.add_component(id, false)?;
                    }
                }
                OpCommand::Replace => {
                    let container = op.container.ok_or(ProtocolViolation::MissingContainer)?;
                    op.removed.clear();
                    for old in manager.added.clone().into_iter().rev() {
                        if manager.container_of(old) != Some(container) {
                            continue;
                        }
                        if op.component == Some(old) {
                            // Replacing with itself; the component stays
                            op.component = None;
                            if back_stack_bound {
                                manager.bump_back_stack_nesting(old, -1);
                            }
                            continue;
                        }
                        op.removed.push(old);
                        manager.set_next_anim(old, op.exit_anim);
                        if back_stack_bound {
                            manager.bump_back_stack_nesting(old, 1);
                        }
                        manager.remove_component(old, transit, style)?;
                    }
                    if let Some(id) = op.component {
                        manager.set_next_anim(id, op.enter_anim);
                        manager.add_component(id, false)?;
                    }
                }
                OpCommand::Remove => {
                    if let Some(id) = op.component {
                        manager.set_next_anim(id, op.exit_anim);
                        manager.remove_component(id, transit, style)?;
                    }
                }
                OpCommand::Hide => {
                    if let Some(id) = op.component {
                        manager.set_next_anim(id, op.exit_anim);
                        manager.hide_component(id, transit, style);
                    }
                }
                OpCommand::Show => {
                    if let Some(id) = op.component {
                        manager.set_next_anim(id, op.enter_anim);
                        manager.show_component(id, transit, style);
                    }
                }
                OpCommand::Detach => {
                    if let Some(id) = op.component {
                        manager.set_next_anim(id, op.exit_anim);
                        manager.detach_component(id, transit, style)?;
                    }
                }
                OpCommand::Attach => {
                    if let Some(id) = op.component {
                        manager.set_next_anim(id, op.enter_anim);
                        manager.attach_component(id, transit, style)?;
                    }
                }
            }
        }

        let state = manager.cur_state;
        manager.move_to_state(state, transit, style, true)
    }

    /// Undo this transaction's ops, newest first.
    ///
    /// With `do_state_move` false the caller is batching several pops and
    /// runs the registry-wide sweep itself once the last one is undone.
    pub(crate) fn pop_from_back_stack(
        mut self,
        manager: &mut ComponentManager,
        do_state_move: bool,
    ) -> Result<()> {
        log::debug!("Pop: {}", self);
        self.bump_back_stack_nesting(manager, -1);
        let transit = self.transition.reverse();
        let style = self.transition_style;

        let result = self.undo_ops(manager, transit, style).and_then(|()| {
            if do_state_move {
                let state = manager.cur_state;
                manager.move_to_state(state, transit, style, true)
            } else {
                Ok(())
            }
        });
        if let Some(index) = self.index.take() {
            manager.back_stack_indices.free(index);
        }
        result
    }

    fn undo_ops(&self, manager: &mut ComponentManager, transit: Transit, style: u32) -> Result<()> {
        for op in self.ops.iter().rev() {
            match op.command {
                OpCommand::Add => {
                    if let Some(id) = op.component {
                        manager.set_next_anim(id, op.pop_exit_anim);
                        manager.remove_component(id, transit, style)?;
                    }
                }
                OpCommand::Replace => {
                    if let Some(id) = op.component {
                        manager.set_next_anim(id, op.pop_exit_anim);
                        manager.remove_component(id, transit, style)?;
                    }
                    for old in &op.removed {
                        manager.set_next_anim(*old, op.pop_enter_anim);
                        manager.add_component(*old, false)?;
                    }
                }
                OpCommand::Remove => {
                    if let Some(id) = op.component {
                        manager.set_next_anim(id, op.pop_enter_anim);
                        manager.add_component(id, false)?;
                    }
                }
                OpCommand::Hide => {
                    if let Some(id) = op.component {
                        manager.set_next_anim(id, op.pop_enter_anim);
                        manager.show_component(id, transit, style);
                    }
                }
                OpCommand::Show => {
                    if let Some(id) = op.component {
                        manager.set_next_anim(id, op.pop_exit_anim);
                        manager.hide_component(id, transit, style);
                    }
                }
                OpCommand::Detach => {
                    if let Some(id) = op.component {
                        manager.set_next_anim(id, op.pop_enter_anim);
                        manager.attach_component(id, transit, style)?;
                    }
                }
                OpCommand::Attach => {
                    if let Some(id) = op.component {
                        manager.set_next_anim(id, op.pop_exit_anim);
                        manager.detach_component(id, transit, style)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transaction{{{}", self.id)?;
        if let Some(index) = self.index {
            write!(f, " #{}", index)?;
        }
        if let Some(name) = &self.name {
            write!(f, " {}", name)?;
        }
        write!(f, "}}")
    }
}

impl ComponentManager {
    /// Start building a transaction
    pub fn begin_transaction(&self) -> Transaction {
        Transaction::new()
    }

    /// Queue a transaction. Returns its back-stack index if it asked for one.
    pub fn commit(&mut self, transaction: &mut Transaction) -> Result<Option<usize>> {
        self.commit_internal(transaction, false)
    }

    /// Queue a transaction even if the manager's state was already saved
    pub fn commit_allowing_state_loss(
        &mut self,
        transaction: &mut Transaction,
    ) -> Result<Option<usize>> {
        self.commit_internal(transaction, true)
    }

    /// Run a transaction synchronously. It may not go on the back stack.
    pub fn commit_now(&mut self, transaction: &mut Transaction) -> Result<()> {
        self.commit_now_internal(transaction, false)
    }

    pub fn commit_now_allowing_state_loss(&mut self, transaction: &mut Transaction) -> Result<()> {
        self.commit_now_internal(transaction, true)
    }

    fn commit_internal(
        &mut self,
        transaction: &mut Transaction,
        allow_state_loss: bool,
    ) -> Result<Option<usize>> {
        if transaction.committed {
            return Err(ProtocolViolation::AlreadyCommitted.into());
        }
        self.check_enqueue(allow_state_loss)?;
        self.place_ops(transaction)?;
        transaction.committed = true;

        let mut staged = transaction.clone();
        if staged.add_to_back_stack {
            let index = self.back_stack_indices.allocate(BackStackEntry {
                id: staged.id,
                name: staged.name.clone(),
            });
            staged.index = Some(index);
            transaction.index = Some(index);
        }
        log::debug!("Commit: {}", staged);
        self.push_pending(PendingAction::Commit(CommittedTransaction::new(staged)));
        Ok(transaction.index)
    }

    fn commit_now_internal(
        &mut self,
        transaction: &mut Transaction,
        allow_state_loss: bool,
    ) -> Result<()> {
        if transaction.committed {
            return Err(ProtocolViolation::AlreadyCommitted.into());
        }
        transaction.disallow_add_to_back_stack()?;
        self.check_exec_ready("commit_now")?;
        if !allow_state_loss {
            self.check_state_loss()?;
        }
        self.place_ops(transaction)?;
        transaction.committed = true;
        log::debug!("Commit now: {}", transaction);
        let sealed = CommittedTransaction::new(transaction.clone());
        self.exec_single_action(PendingAction::Commit(sealed), allow_state_loss)
    }

    /// Check every op target and stamp its container and tag.
    ///
    /// All checks run before anything is stamped so a rejected commit
    /// leaves the components untouched.
    fn place_ops(&mut self, transaction: &Transaction) -> Result<()> {
        for op in &transaction.ops {
            let Some(id) = op.component else {
                continue;
            };
            let component = self
                .components
                .get(&id)
                .ok_or(ProtocolViolation::UnknownComponent(id))?;
            if let (Some(tag), Some(current)) = (&op.tag, &component.tag) {
                if tag != current {
                    return Err(ProtocolViolation::TagChanged {
                        component: id,
                        from: current.clone(),
                        to: tag.clone(),
                    }
                    .into());
                }
            }
            if let (Some(container), Some(current)) = (op.container, component.container) {
                if container != current {
                    return Err(ProtocolViolation::ContainerChanged {
                        component: id,
                        from: current,
                        to: container,
                    }
                    .into());
                }
            }
        }
        for op in &transaction.ops {
            let Some(component) = op.component.and_then(|id| self.components.get_mut(&id)) else {
                continue;
            };
            if op.tag.is_some() {
                component.tag = op.tag.clone();
            }
            if op.container.is_some() {
                component.container = op.container;
            }
        }
        Ok(())
    }
}
