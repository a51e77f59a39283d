//! Back stack - committed, reversible transactions and their indices

use crate::manager::ComponentManager;
use crate::transaction::Transaction;
use pane_core::{IndexTable, Result, TransactionId};
use parking_lot::Mutex;
use std::fmt::Write as _;
use std::sync::Arc;

/// Handle returned when registering a back-stack listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Notified once after every successful push, pop or batch pop
pub trait BackStackListener: Send {
    fn on_back_stack_changed(&mut self, entry_count: usize);
}

impl<F> BackStackListener for F
where
    F: FnMut(usize) + Send,
{
    fn on_back_stack_changed(&mut self, entry_count: usize) {
        self(entry_count)
    }
}

/// Summary of a transaction holding a back-stack index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackStackEntry {
    pub id: TransactionId,
    pub name: Option<String>,
}

/// Shared back-stack index table.
///
/// Indices are allocated at commit time, possibly long before the
/// transaction reaches the back stack, and freed when it is popped. The
/// table sits behind a lock so a clone of this handle can render it from
/// another thread.
#[derive(Debug, Clone, Default)]
pub struct BackStackIndices {
    table: Arc<Mutex<IndexTable<BackStackEntry>>>,
}

impl BackStackIndices {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate(&self, entry: BackStackEntry) -> usize {
        let mut table = self.table.lock();
        let index = table.allocate(entry);
        log::debug!("Setting back stack index {} to {}", index, table_entry_label(table.get(index)));
        index
    }

    pub(crate) fn free(&self, index: usize) {
        let mut table = self.table.lock();
        if table.free(index).is_some() {
            log::debug!("Freeing back stack index {}", index);
        } else {
            log::warn!("Freeing back stack index {} that was not in use", index);
        }
    }

    /// Replace the whole table, after a restore
    pub(crate) fn reset(&self, table: IndexTable<BackStackEntry>) {
        *self.table.lock() = table;
    }

    pub fn get(&self, index: usize) -> Option<BackStackEntry> {
        self.table.lock().get(index).cloned()
    }

    /// Indices in use
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }

    /// Free indices in reuse order
    pub fn free_indices(&self) -> Vec<usize> {
        self.table.lock().free_indices().collect()
    }

    /// Render the table and its freelist
    pub fn dump(&self, prefix: &str) -> String {
        let table = self.table.lock();
        let mut out = String::new();
        if table.slot_count() > 0 {
            let _ = writeln!(out, "{}Back Stack Indices:", prefix);
            for (index, slot) in table.slots().iter().enumerate() {
                let _ = writeln!(out, "{}  #{}: {}", prefix, index, table_entry_label(slot.as_ref()));
            }
        }
        let free: Vec<String> = table.free_indices().map(|i| i.to_string()).collect();
        if !free.is_empty() {
            let _ = writeln!(out, "{}Free back stack indices: [{}]", prefix, free.join(", "));
        }
        out
    }
}

fn table_entry_label(entry: Option<&BackStackEntry>) -> String {
    match entry {
        Some(BackStackEntry { id, name: Some(name) }) => format!("{} {}", id, name),
        Some(BackStackEntry { id, name: None }) => id.to_string(),
        None => "null".to_string(),
    }
}

/// Which back-stack entries a pop removes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopRequest {
    pub name: Option<String>,
    pub id: Option<usize>,
    pub inclusive: bool,
}

impl PopRequest {
    /// Pop the top entry
    pub fn top() -> Self {
        Self::default()
    }

    /// Pop everything above the newest entry named `name`
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Pop everything above the entry with back-stack index `id`
    pub fn to_id(id: usize) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Also pop the matched entry and any matching entries directly below it
    pub fn inclusive(mut self) -> Self {
        self.inclusive = true;
        self
    }

    fn matches(&self, transaction: &Transaction) -> bool {
        (self.name.is_some() && transaction.name() == self.name.as_deref())
            || (self.id.is_some() && transaction.index() == self.id)
    }
}

impl ComponentManager {
    pub fn back_stack_entry_count(&self) -> usize {
        self.back_stack.len()
    }

    /// Entry `n`, counting from the bottom of the stack
    pub fn back_stack_entry_at(&self, n: usize) -> Option<&Transaction> {
        self.back_stack.get(n)
    }

    /// Handle to the back-stack index table
    pub fn back_stack_indices(&self) -> BackStackIndices {
        self.back_stack_indices.clone()
    }

    /// Queue a pop
    pub fn pop_back_stack(&mut self, request: PopRequest) -> Result<()> {
        self.enqueue(crate::pending::PendingAction::Pop(request), false)
    }

    /// Drain pending actions, then pop synchronously. Returns whether
    /// anything was popped.
    pub fn pop_back_stack_immediate(&mut self, request: PopRequest) -> Result<bool> {
        self.check_state_loss()?;
        self.exec_pending_actions()?;
        self.pop_back_stack_state(&request)
    }

    pub(crate) fn add_back_stack_state(&mut self, transaction: Transaction) {
        self.back_stack.push(transaction);
        self.report_back_stack_changed();
    }

    pub(crate) fn report_back_stack_changed(&mut self) {
        let count = self.back_stack.len();
        for (_, listener) in &mut self.back_stack_listeners {
            listener.on_back_stack_changed(count);
        }
    }

    pub(crate) fn pop_back_stack_state(&mut self, request: &PopRequest) -> Result<bool> {
        if self.back_stack.is_empty() {
            return Ok(false);
        }

        if request.name.is_none() && request.id.is_none() && !request.inclusive {
            let Some(transaction) = self.back_stack.pop() else {
                return Ok(false);
            };
            transaction.pop_from_back_stack(self, true)?;
            self.report_back_stack_changed();
            return Ok(true);
        }

        // Number of entries that stay on the stack
        let keep = if request.name.is_some() || request.id.is_some() {
            let Some(found) = self.back_stack.iter().rposition(|t| request.matches(t)) else {
                return Ok(false);
            };
            if request.inclusive {
                let mut keep = found;
                while keep > 0 && request.matches(&self.back_stack[keep - 1]) {
                    keep -= 1;
                }
                keep
            } else {
                found + 1
            }
        } else {
            0
        };
        if keep == self.back_stack.len() {
            return Ok(false);
        }

        let mut popped: Vec<Transaction> = self.back_stack.drain(keep..).collect();
        log::debug!("Popping {} back stack entries", popped.len());
        while let Some(transaction) = popped.pop() {
            let last = popped.is_empty();
            if let Err(err) = transaction.pop_from_back_stack(self, last) {
                for dropped in popped {
                    if let Some(index) = dropped.index() {
                        self.back_stack_indices.free(index);
                    }
                }
                return Err(err);
            }
        }
        self.report_back_stack_changed();
        Ok(true)
    }
}
