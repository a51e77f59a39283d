//! Demo components

use pane_manager::{ComponentCallbacks, ContainerId, RenderContext, ViewId};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VIEW: AtomicU64 = AtomicU64::new(1);

/// A screen that logs its lifecycle and keeps a scroll offset as state
pub struct Screen {
    kind: String,
    scroll: u64,
}

impl Screen {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            scroll: 0,
        }
    }

    pub fn scrolled(mut self, scroll: u64) -> Self {
        self.scroll = scroll;
        self
    }
}

impl ComponentCallbacks for Screen {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn on_attach(&mut self, context: &RenderContext) {
        log::info!("{} attached to {}", self.kind, context.name);
    }

    fn on_create(&mut self, saved_state: Option<&Value>) {
        if let Some(scroll) = saved_state.and_then(|state| state["scroll"].as_u64()) {
            self.scroll = scroll;
        }
        log::info!("{} created (scroll={})", self.kind, self.scroll);
    }

    fn on_create_view(&mut self, container: Option<ContainerId>, _saved_state: Option<&Value>) -> Option<ViewId> {
        container.map(|_| ViewId(NEXT_VIEW.fetch_add(1, Ordering::Relaxed)))
    }

    fn on_resume(&mut self) {
        log::info!("{} resumed", self.kind);
    }

    fn on_pause(&mut self) {
        log::info!("{} paused", self.kind);
    }

    fn on_destroy(&mut self) {
        log::info!("{} destroyed", self.kind);
    }

    fn save_state(&self) -> Option<Value> {
        Some(json!({ "scroll": self.scroll }))
    }
}

/// Rebuilds screens by kind after a restart
pub fn rebuild(kind: &str, _arguments: Option<&Value>) -> Option<Box<dyn ComponentCallbacks>> {
    match kind {
        "Inbox" | "Message" | "Compose" => Some(Box::new(Screen::new(kind))),
        _ => None,
    }
}
