//! State snapshots
//!
//! A [`ManagerSnapshot`] captures the active table, the added list and the
//! back stack by dense index, so it can be restored into a fresh manager
//! whose components are rebuilt by a [`ComponentFactory`]. Component state
//! values travel as JSON text so the binary encoding stays self-contained.

use crate::animation::Transit;
use crate::back_stack::BackStackEntry;
use crate::component::{Component, ComponentFactory};
use crate::manager::ComponentManager;
use crate::transaction::{Op, OpCommand, Transaction};
use pane_core::{
    AnimationRes, ComponentId, ContainerId, IndexTable, LifecycleState, ProtocolViolation, Result,
    SnapshotError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Byte encoding of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    /// JSON (human-readable)
    Json,
    /// Binary (compact)
    #[default]
    Binary,
}

/// Saved state of one registered component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub kind: String,
    pub index: usize,
    pub tag: Option<String>,
    pub container: Option<ContainerId>,
    pub retain_instance: bool,
    pub detached: bool,
    pub hidden: bool,
    pub menu_visible: bool,
    pub has_menu: bool,
    pub user_visible_hint: bool,
    pub arguments: Option<String>,
    pub saved_state: Option<String>,
    pub saved_view_state: Option<String>,
    /// Active index of the target component
    pub target: Option<usize>,
    pub target_request_code: i32,
}

/// Saved op of a back-stack entry, with components by active index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpRecord {
    pub command: OpCommand,
    pub target: Option<usize>,
    pub container: Option<ContainerId>,
    pub enter_anim: Option<AnimationRes>,
    pub exit_anim: Option<AnimationRes>,
    pub pop_enter_anim: Option<AnimationRes>,
    pub pop_exit_anim: Option<AnimationRes>,
    pub removed: Vec<usize>,
}

/// Saved back-stack entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackStackRecord {
    pub name: Option<String>,
    pub index: Option<usize>,
    pub transition: Transit,
    pub transition_style: u32,
    pub breadcrumb_title: Option<String>,
    pub breadcrumb_short_title: Option<String>,
    pub ops: Vec<OpRecord>,
}

/// Everything needed to rebuild a manager's component graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerSnapshot {
    pub version: u32,
    /// Active table by index; `None` marks a free slot
    pub active: Vec<Option<ComponentRecord>>,
    /// Added components by active index, in display order
    pub added: Vec<usize>,
    pub back_stack: Vec<BackStackRecord>,
}

impl ManagerSnapshot {
    /// Encode using `format`
    pub fn encode(&self, format: SnapshotFormat) -> Result<Vec<u8>> {
        let bytes = match format {
            SnapshotFormat::Json => serde_json::to_vec_pretty(self)
                .map_err(|e| SnapshotError::Serialization(e.to_string()))?,
            SnapshotFormat::Binary => {
                bincode::serialize(self).map_err(|e| SnapshotError::Serialization(e.to_string()))?
            }
        };
        Ok(bytes)
    }

    /// Decode bytes produced by [`encode`](Self::encode)
    pub fn decode(bytes: &[u8], format: SnapshotFormat) -> Result<Self> {
        let snapshot: Self = match format {
            SnapshotFormat::Json => serde_json::from_slice(bytes)
                .map_err(|e| SnapshotError::Deserialization(e.to_string()))?,
            SnapshotFormat::Binary => bincode::deserialize(bytes)
                .map_err(|e| SnapshotError::Deserialization(e.to_string()))?,
        };
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::VersionMismatch {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            }
            .into());
        }
        Ok(snapshot)
    }

    /// Number of saved components
    pub fn component_count(&self) -> usize {
        self.active.iter().flatten().count()
    }
}

/// Component instances kept alive across a host restart
#[derive(Debug, Default)]
pub struct RetainedComponents(pub Vec<Component>);

impl RetainedComponents {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> Vec<ComponentId> {
        self.0.iter().map(Component::id).collect()
    }
}

fn to_text(value: Option<&Value>) -> std::result::Result<Option<String>, SnapshotError> {
    value
        .map(|v| serde_json::to_string(v).map_err(|e| SnapshotError::Serialization(e.to_string())))
        .transpose()
}

fn from_text(text: Option<&str>) -> std::result::Result<Option<Value>, SnapshotError> {
    text.map(|t| serde_json::from_str(t).map_err(|e| SnapshotError::Deserialization(e.to_string())))
        .transpose()
}

impl ComponentManager {
    /// Registered index of `id`, if it is active here
    fn active_index_of(&self, id: ComponentId) -> Option<usize> {
        let index = self.components.get(&id)?.index?;
        (self.active.get(index) == Some(&id)).then_some(index)
    }

    /// Drain pending work and capture the component graph.
    ///
    /// Returns `None` when nothing is registered. From here on commits
    /// need state loss to be allowed until the host dispatches again.
    pub fn save_all_state(&mut self) -> Result<Option<ManagerSnapshot>> {
        self.exec_pending_actions()?;
        self.state_saved = true;
        if self.active.is_empty() {
            return Ok(None);
        }

        let mut active = Vec::with_capacity(self.active.slot_count());
        for slot in self.active.slots() {
            let Some(id) = slot else {
                active.push(None);
                continue;
            };
            let Some(component) = self.components.get(id) else {
                log::warn!("save_all_state: active component {} no longer exists", id);
                active.push(None);
                continue;
            };
            let index = component.index.ok_or(SnapshotError::ClearedIndex(*id))?;

            let saved_state = if component.state > LifecycleState::Initializing {
                component.callbacks.save_state()
            } else {
                component.saved_state.clone()
            };
            let saved_view_state = if component.view.is_some() {
                component.callbacks.save_view_state()
            } else {
                component.saved_view_state.clone()
            };
            let target = match component.target {
                Some(target) => Some(self.active_index_of(target).ok_or(
                    SnapshotError::TargetNotActive {
                        component: *id,
                        target,
                    },
                )?),
                None => None,
            };

            log::trace!("Saved state of {}", component);
            active.push(Some(ComponentRecord {
                kind: component.kind().to_string(),
                index,
                tag: component.tag.clone(),
                container: component.container,
                retain_instance: component.retain_instance,
                detached: component.detached,
                hidden: component.hidden,
                menu_visible: component.menu_visible,
                has_menu: component.has_menu,
                user_visible_hint: component.user_visible_hint,
                arguments: to_text(component.arguments.as_ref())?,
                saved_state: to_text(saved_state.as_ref())?,
                saved_view_state: to_text(saved_view_state.as_ref())?,
                target,
                target_request_code: component.target_request_code,
            }));
        }

        let mut added = Vec::with_capacity(self.added.len());
        for id in &self.added {
            let index = self.active_index_of(*id).ok_or(SnapshotError::AddedNotActive(*id))?;
            log::trace!("save_all_state: adding component #{}", index);
            added.push(index);
        }

        let mut back_stack = Vec::with_capacity(self.back_stack.len());
        for transaction in &self.back_stack {
            back_stack.push(self.record_transaction(transaction)?);
        }

        Ok(Some(ManagerSnapshot {
            version: SNAPSHOT_VERSION,
            active,
            added,
            back_stack,
        }))
    }

    fn record_transaction(&self, transaction: &Transaction) -> Result<BackStackRecord> {
        let index_of = |id: ComponentId| {
            self.active_index_of(id)
                .ok_or(SnapshotError::OpTargetNotActive(id))
        };
        let mut ops = Vec::with_capacity(transaction.ops.len());
        for op in &transaction.ops {
            ops.push(OpRecord {
                command: op.command,
                target: op.component.map(index_of).transpose()?,
                container: op.container,
                enter_anim: op.enter_anim,
                exit_anim: op.exit_anim,
                pop_enter_anim: op.pop_enter_anim,
                pop_exit_anim: op.pop_exit_anim,
                removed: op
                    .removed
                    .iter()
                    .map(|id| index_of(*id))
                    .collect::<std::result::Result<_, _>>()?,
            });
        }
        Ok(BackStackRecord {
            name: transaction.name.clone(),
            index: transaction.index,
            transition: transaction.transition,
            transition_style: transaction.transition_style,
            breadcrumb_title: transaction.breadcrumb_title.clone(),
            breadcrumb_short_title: transaction.breadcrumb_short_title.clone(),
            ops,
        })
    }

    /// [`save_all_state`](Self::save_all_state), encoded in the configured format
    pub fn save_all_state_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        let format = self.config.snapshot_format;
        self.save_all_state()?
            .map(|snapshot| snapshot.encode(format))
            .transpose()
    }

    /// Decode bytes in the configured format and restore them
    pub fn restore_all_state_bytes(
        &mut self,
        bytes: &[u8],
        retained: RetainedComponents,
        factory: &dyn ComponentFactory,
    ) -> Result<()> {
        let snapshot = ManagerSnapshot::decode(bytes, self.config.snapshot_format)?;
        self.restore_all_state(snapshot, retained, factory)
    }

    /// Rebuild the component graph from a snapshot.
    ///
    /// Retained components are re-bound to their saved index; every other
    /// record is re-created through `factory`. Restored components start
    /// at `Initializing` and catch up on the next dispatch.
    pub fn restore_all_state(
        &mut self,
        snapshot: ManagerSnapshot,
        retained: RetainedComponents,
        factory: &dyn ComponentFactory,
    ) -> Result<()> {
        self.owner.check("restore_all_state")?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::VersionMismatch {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            }
            .into());
        }

        let mut retained_by_index: HashMap<usize, Component> = HashMap::new();
        for component in retained.0 {
            match component.index {
                Some(index) => {
                    retained_by_index.insert(index, component);
                }
                None => log::warn!("restore_all_state: retained {} has no index", component),
            }
        }

        let mut slots = Vec::with_capacity(snapshot.active.len());
        let mut targets = Vec::new();
        for (index, record) in snapshot.active.into_iter().enumerate() {
            let Some(record) = record else {
                slots.push(None);
                continue;
            };
            let arguments = from_text(record.arguments.as_deref())?;
            let mut component = match retained_by_index.remove(&index) {
                Some(component) => {
                    log::debug!("restore_all_state: re-attaching retained {}", component);
                    component
                }
                None => {
                    let callbacks = factory
                        .create(&record.kind, arguments.as_ref())
                        .ok_or_else(|| SnapshotError::UnknownKind(record.kind.clone()))?;
                    let mut component = Component::new(callbacks);
                    component.arguments = arguments;
                    component
                }
            };

            component.index = Some(index);
            component.parent = self.parent;
            component.tag = record.tag;
            component.container = record.container;
            component.retain_instance = record.retain_instance;
            component.detached = record.detached;
            component.hidden = record.hidden;
            component.menu_visible = record.menu_visible;
            component.has_menu = record.has_menu;
            component.user_visible_hint = record.user_visible_hint;
            component.saved_state = from_text(record.saved_state.as_deref())?;
            component.saved_view_state = from_text(record.saved_view_state.as_deref())?;
            component.target_request_code = record.target_request_code;
            component.added = false;
            component.removing = false;
            component.restored = true;
            component.back_stack_nesting = 0;
            component.target = None;

            let id = component.id();
            log::debug!("restore_all_state: active #{}: {}", index, component);
            targets.push((id, record.target));
            slots.push(Some(id));
            self.components.insert(id, component);
        }
        for (index, component) in retained_by_index {
            log::warn!(
                "Discarding retained {} at #{}: not in the saved active set",
                component,
                index
            );
        }
        self.active = IndexTable::from_slots(slots);

        for (id, target) in targets {
            let Some(target) = target else {
                continue;
            };
            let resolved = self.active.get(target).copied();
            if resolved.is_none() {
                log::warn!("restore_all_state: target #{} of {} no longer exists", target, id);
            }
            if let Some(component) = self.components.get_mut(&id) {
                component.target = resolved;
            }
        }

        self.added.clear();
        for index in snapshot.added {
            let id = self
                .active
                .get(index)
                .copied()
                .ok_or(SnapshotError::MissingAddedIndex(index))?;
            if self.added.contains(&id) {
                return Err(ProtocolViolation::AlreadyAdded(id).into());
            }
            if let Some(component) = self.components.get_mut(&id) {
                component.added = true;
                log::trace!("restore_all_state: added #{}: {}", index, component);
            }
            self.added.push(id);
        }

        self.back_stack.clear();
        let mut indices = IndexTable::new();
        for record in snapshot.back_stack {
            let transaction = self.instantiate_record(record)?;
            log::debug!("restore_all_state: back stack {}", transaction);
            if let Some(index) = transaction.index {
                indices.insert_at(
                    index,
                    BackStackEntry {
                        id: transaction.id,
                        name: transaction.name.clone(),
                    },
                );
            }
            self.back_stack.push(transaction);
        }
        self.back_stack_indices.reset(indices);
        Ok(())
    }

    fn instantiate_record(&mut self, record: BackStackRecord) -> Result<Transaction> {
        let resolve = |manager: &Self, index: usize| {
            manager
                .active
                .get(index)
                .copied()
                .ok_or(SnapshotError::MissingAddedIndex(index))
        };
        let mut transaction = Transaction::new();
        for op in record.ops {
            let component = op.target.map(|index| resolve(self, index)).transpose()?;
            let removed = op
                .removed
                .iter()
                .map(|index| resolve(self, *index))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            transaction.ops.push(Op {
                command: op.command,
                component,
                container: op.container,
                tag: None,
                enter_anim: op.enter_anim,
                exit_anim: op.exit_anim,
                pop_enter_anim: op.pop_enter_anim,
                pop_exit_anim: op.pop_exit_anim,
                removed,
            });
        }
        transaction.name = record.name;
        transaction.index = record.index;
        transaction.transition = record.transition;
        transaction.transition_style = record.transition_style;
        transaction.breadcrumb_title = record.breadcrumb_title;
        transaction.breadcrumb_short_title = record.breadcrumb_short_title;
        transaction.add_to_back_stack = true;
        transaction.committed = true;

        let referenced: Vec<ComponentId> = transaction
            .ops
            .iter()
            .flat_map(|op| op.component.into_iter().chain(op.removed.iter().copied()))
            .collect();
        for id in referenced {
            self.bump_back_stack_nesting(id, 1);
        }
        Ok(transaction)
    }

    /// Mark retain-instance components so the coming teardown keeps them.
    /// Returns the ids that will be retained.
    pub fn retain_non_config(&mut self) -> Vec<ComponentId> {
        let mut retained = Vec::new();
        for (_, id) in self.active.iter() {
            let Some(component) = self.components.get_mut(id) else {
                continue;
            };
            if component.retain_instance {
                component.retaining = true;
                log::trace!("retain_non_config: keeping retained {}", component);
                retained.push(*id);
            }
        }
        retained
    }

    /// Take the retained components out after teardown, for a new manager
    pub fn take_retained(&mut self) -> RetainedComponents {
        let ids: Vec<ComponentId> = self
            .active
            .iter()
            .filter(|(_, id)| {
                self.components
                    .get(id)
                    .map_or(false, |component| component.retaining)
            })
            .map(|(_, id)| *id)
            .collect();
        let mut retained = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(index) = self.active_index_of(id) {
                self.active.free(index);
            }
            self.added.retain(|added| *added != id);
            self.animations.remove(&id);
            if let Some(component) = self.components.remove(&id) {
                retained.push(component);
            }
        }
        RetainedComponents(retained)
    }
}
