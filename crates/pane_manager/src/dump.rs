//! Diagnostic dump of a manager's full state

use crate::component::Component;
use crate::manager::ComponentManager;
use crate::transaction::Transaction;
use std::fmt::Write as _;

impl Component {
    /// Render the component's fields, one group per line
    pub fn dump(&self, prefix: &str, out: &mut String) {
        let _ = writeln!(
            out,
            "{}index={:?} id={} state={} tag={:?} container={:?}",
            prefix,
            self.index,
            self.id(),
            self.state,
            self.tag,
            self.container.map(|c| c.to_string()),
        );
        let _ = writeln!(
            out,
            "{}added={} removing={} restored={} nesting={} retain={} retaining={}",
            prefix,
            self.added,
            self.removing,
            self.restored,
            self.back_stack_nesting,
            self.retain_instance,
            self.retaining,
        );
        let _ = writeln!(
            out,
            "{}hidden={} detached={} menu_visible={} has_menu={} user_visible_hint={} defer_start={}",
            prefix,
            self.hidden,
            self.detached,
            self.menu_visible,
            self.has_menu,
            self.user_visible_hint,
            self.defer_start,
        );
        if let Some(target) = self.target {
            let _ = writeln!(out, "{}target={} request_code={}", prefix, target, self.target_request_code);
        }
        if let Some(next) = self.next_anim {
            let _ = writeln!(out, "{}next_anim={:?}", prefix, next);
        }
        if let Some(view) = self.view {
            let _ = writeln!(out, "{}view={:?} in={:?}", prefix, view, self.in_container);
        }
        if let Some(away) = self.animating_away {
            let _ = writeln!(
                out,
                "{}animating_away={:?} state_after_animating={}",
                prefix, away.view, self.state_after_animating
            );
        }
        if self.saved_state.is_some() || self.saved_view_state.is_some() {
            let _ = writeln!(
                out,
                "{}saved_state={} saved_view_state={}",
                prefix,
                self.saved_state.is_some(),
                self.saved_view_state.is_some()
            );
        }
    }
}

impl Transaction {
    /// Render the transaction and its ops
    pub fn dump(&self, prefix: &str, out: &mut String) {
        let _ = writeln!(
            out,
            "{}name={:?} index={:?} committed={}",
            prefix, self.name, self.index, self.committed
        );
        if !self.transition.is_none() || self.transition_style != 0 {
            let _ = writeln!(
                out,
                "{}transition=#{:x} transition_style=#{:x}",
                prefix, self.transition.0, self.transition_style
            );
        }
        if let Some(title) = &self.breadcrumb_title {
            let _ = writeln!(out, "{}breadcrumb_title={}", prefix, title);
        }
        if self.ops.is_empty() {
            return;
        }
        let _ = writeln!(out, "{}Operations:", prefix);
        for (n, op) in self.ops.iter().enumerate() {
            let target = op
                .component
                .map_or_else(|| "null".to_string(), |id| id.to_string());
            let _ = writeln!(out, "{}  Op #{}: {} {}", prefix, n, op.command.name(), target);
            if op.enter_anim.is_some() || op.exit_anim.is_some() {
                let _ = writeln!(
                    out,
                    "{}    enter_anim={:?} exit_anim={:?}",
                    prefix, op.enter_anim, op.exit_anim
                );
            }
            if op.pop_enter_anim.is_some() || op.pop_exit_anim.is_some() {
                let _ = writeln!(
                    out,
                    "{}    pop_enter_anim={:?} pop_exit_anim={:?}",
                    prefix, op.pop_enter_anim, op.pop_exit_anim
                );
            }
            for (r, removed) in op.removed.iter().enumerate() {
                let _ = writeln!(out, "{}    Removed #{}: {}", prefix, r, removed);
            }
        }
    }
}

impl ComponentManager {
    /// Render active, added, back stack, back-stack indices and the
    /// pending queue.
    pub fn dump(&self) -> String {
        let prefix = self.config.dump_prefix.as_str();
        let inner = format!("{}{}", prefix, prefix);
        let mut out = String::new();

        if self.active.slot_count() > 0 {
            let _ = writeln!(out, "{}Active Components:", prefix);
            for (index, slot) in self.active.slots().iter().enumerate() {
                match slot.and_then(|id| self.components.get(&id)) {
                    Some(component) => {
                        let _ = writeln!(out, "{}  #{}: {}", prefix, index, component);
                        component.dump(&inner, &mut out);
                    }
                    None => {
                        let _ = writeln!(out, "{}  #{}: null", prefix, index);
                    }
                }
            }
        }

        if !self.added.is_empty() {
            let _ = writeln!(out, "{}Added Components:", prefix);
            for (n, id) in self.added.iter().enumerate() {
                match self.components.get(id) {
                    Some(component) => {
                        let _ = writeln!(out, "{}  #{}: {}", prefix, n, component);
                    }
                    None => {
                        let _ = writeln!(out, "{}  #{}: {}", prefix, n, id);
                    }
                }
            }
        }

        if !self.back_stack.is_empty() {
            let _ = writeln!(out, "{}Back Stack:", prefix);
            for (n, transaction) in self.back_stack.iter().enumerate() {
                let _ = writeln!(out, "{}  #{}: {}", prefix, n, transaction);
                transaction.dump(&inner, &mut out);
            }
        }

        out.push_str(&self.back_stack_indices.dump(prefix));

        if !self.pending.is_empty() {
            let _ = writeln!(out, "{}Pending Actions:", prefix);
            for (n, action) in self.pending.iter().enumerate() {
                let _ = writeln!(out, "{}  #{}: {:?}", prefix, n, action);
            }
        }

        let _ = writeln!(out, "{}Manager misc state:", prefix);
        let _ = writeln!(
            out,
            "{}  cur_state={} state_saved={} destroyed={}",
            prefix, self.cur_state, self.state_saved, self.destroyed
        );
        if let Some(reason) = &self.no_transactions_because {
            let _ = writeln!(out, "{}  no_transactions_because={}", prefix, reason);
        }
        if self.need_menu_invalidate {
            let _ = writeln!(out, "{}  need_menu_invalidate=true", prefix);
        }
        out
    }
}
