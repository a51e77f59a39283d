//! Pending action queue
//!
//! Commits, queued pops and posted callbacks are serialized here and run
//! in FIFO order on the owning thread. The host is asked to schedule a
//! drain when the first action lands in an empty queue.

use crate::back_stack::PopRequest;
use crate::manager::ComponentManager;
use crate::transaction::Transaction;
use pane_core::{ProtocolViolation, Result};
use std::fmt;

/// Callback run against the manager when the queue drains
pub type ActionFn = Box<dyn FnOnce(&mut ComponentManager) -> Result<()> + Send>;

/// A transaction sealed by one of the manager's commit calls.
///
/// Only the manager creates these, once per commit, so a committed
/// transaction runs forward exactly once.
pub struct CommittedTransaction(Transaction);

impl CommittedTransaction {
    pub(crate) fn new(transaction: Transaction) -> Self {
        Self(transaction)
    }

    pub fn transaction(&self) -> &Transaction {
        &self.0
    }
}

/// A queued structural action
pub enum PendingAction {
    Commit(CommittedTransaction),
    Pop(PopRequest),
    Run(ActionFn),
}

impl PendingAction {
    fn execute(self, manager: &mut ComponentManager) -> Result<()> {
        match self {
            Self::Commit(CommittedTransaction(transaction)) => transaction.run(manager),
            Self::Pop(request) => manager.pop_back_stack_state(&request).map(|_| ()),
            Self::Run(action) => action(manager),
        }
    }

    /// Give back anything the action holds when it is dropped unexecuted
    fn discard(self, manager: &mut ComponentManager) {
        if let Self::Commit(CommittedTransaction(transaction)) = self {
            log::debug!("Dropping {} after a failed action", transaction);
            if let Some(index) = transaction.index() {
                manager.back_stack_indices.free(index);
            }
        }
    }
}

impl fmt::Debug for PendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit(committed) => write!(f, "Commit({})", committed.0),
            Self::Pop(request) => write!(f, "Pop({:?})", request),
            Self::Run(_) => write!(f, "Run(..)"),
        }
    }
}

impl ComponentManager {
    /// Fail if the host's state was saved or mutation is fenced off
    pub(crate) fn check_state_loss(&self) -> Result<()> {
        if self.state_saved {
            return Err(ProtocolViolation::StateAlreadySaved.into());
        }
        if let Some(reason) = &self.no_transactions_because {
            return Err(ProtocolViolation::TransactionsForbidden(reason.clone()).into());
        }
        Ok(())
    }

    pub(crate) fn check_enqueue(&self, allow_state_loss: bool) -> Result<()> {
        if self.destroyed {
            return Err(ProtocolViolation::Destroyed.into());
        }
        if !allow_state_loss {
            self.check_state_loss()?;
        }
        if self.pending.len() >= self.config.max_pending_actions {
            return Err(ProtocolViolation::QueueFull(self.pending.len()).into());
        }
        Ok(())
    }

    pub(crate) fn push_pending(&mut self, action: PendingAction) {
        self.pending.push(action);
        if self.pending.len() == 1 {
            self.host.schedule_drain();
        }
    }

    /// Queue an action for the next drain
    pub fn enqueue(&mut self, action: PendingAction, allow_state_loss: bool) -> Result<()> {
        if let PendingAction::Commit(committed) = &action {
            if !committed.0.committed {
                return Err(ProtocolViolation::NotCommitted.into());
            }
        }
        self.check_enqueue(allow_state_loss)?;
        self.push_pending(action);
        Ok(())
    }

    /// Queue a callback for the next drain
    pub fn post<F>(&mut self, action: F) -> Result<()>
    where
        F: FnOnce(&mut ComponentManager) -> Result<()> + Send + 'static,
    {
        self.enqueue(PendingAction::Run(Box::new(action)), false)
    }

    /// Actions waiting for the next drain
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn check_exec_ready(&self, operation: &'static str) -> Result<()> {
        if self.executing_actions {
            return Err(ProtocolViolation::RecursiveExecution.into());
        }
        self.owner.check(operation)?;
        if self.destroyed {
            return Err(ProtocolViolation::Destroyed.into());
        }
        Ok(())
    }

    /// Run every queued action, including actions queued while draining.
    /// Returns whether anything ran.
    pub fn exec_pending_actions(&mut self) -> Result<bool> {
        if self.executing_actions {
            return Err(ProtocolViolation::RecursiveExecution.into());
        }
        self.owner.check("exec_pending_actions")?;

        let mut did_something = false;
        while !self.pending.is_empty() {
            let batch = std::mem::take(&mut self.pending);
            log::debug!("Executing {} pending actions", batch.len());
            self.executing_actions = true;
            let result = self.run_batch(batch);
            self.executing_actions = false;
            result?;
            did_something = true;
        }
        self.do_pending_deferred_start()?;
        Ok(did_something)
    }

    /// Run one action now, bypassing the queue. A transaction run this way
    /// must have given up any claim on the back stack.
    pub fn exec_single_action(&mut self, action: PendingAction, allow_state_loss: bool) -> Result<()> {
        if let PendingAction::Commit(CommittedTransaction(transaction)) = &action {
            if !transaction.committed {
                return Err(ProtocolViolation::NotCommitted.into());
            }
            if transaction.add_to_back_stack || transaction.allow_add_to_back_stack {
                return Err(ProtocolViolation::BackStackRequested.into());
            }
        }
        self.check_exec_ready("exec_single_action")?;
        if !allow_state_loss {
            self.check_state_loss()?;
        }
        self.executing_actions = true;
        let result = action.execute(self);
        self.executing_actions = false;
        result?;
        self.do_pending_deferred_start()
    }

    fn run_batch(&mut self, batch: Vec<PendingAction>) -> Result<()> {
        let mut actions = batch.into_iter();
        while let Some(action) = actions.next() {
            if let Err(err) = action.execute(self) {
                for dropped in actions {
                    dropped.discard(self);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn do_pending_deferred_start(&mut self) -> Result<()> {
        if !self.have_pending_deferred_start {
            return Ok(());
        }
        let components_busy = self
            .active
            .iter()
            .filter_map(|(_, id)| self.components.get(id))
            .any(|component| component.callbacks().has_running_work());
        let subs_busy = self.sub_managers.iter().any(|sub| sub.has_running_work());
        if !components_busy && !subs_busy {
            self.have_pending_deferred_start = false;
            self.start_pending_deferred()?;
        }
        Ok(())
    }
}
