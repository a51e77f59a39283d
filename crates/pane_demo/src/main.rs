//! Pane demo
//!
//! Walks one manager through a short session: add a screen, replace it on
//! the back stack, pop back, then save, tear down and restore into a new
//! manager. The diagnostic dump is printed along the way.
//!
//! Run with: cargo run -p pane_demo [config.toml]
//!
//! `PANE_CONFIG` names a config file when no path is given.

mod host;
mod screens;

use host::{LogHost, SharedQueue};
use pane_manager::{
    ComponentManager, ContainerId, ManagerConfig, PopRequest, Result, RetainedComponents, Transit,
};
use screens::Screen;

const CONTENT: ContainerId = ContainerId(1);

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let config = load_config();
    log::info!("Manager config: {:?}", config);

    if let Err(err) = run(config) {
        log::error!("Session failed: {}", err);
        std::process::exit(1);
    }
}

/// Config from the first non-flag argument, then `PANE_CONFIG`, then defaults
fn load_config() -> ManagerConfig {
    let path = std::env::args()
        .skip(1)
        .find(|arg| !arg.starts_with("--"))
        .or_else(|| std::env::var("PANE_CONFIG").ok());

    match path {
        Some(path) => match ManagerConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Ignoring config {}: {}", path, err);
                ManagerConfig::default()
            }
        },
        None => ManagerConfig::default(),
    }
}

/// Do what the host promised: drain the queue and finish exit animations
fn pump(manager: &mut ComponentManager, queue: &SharedQueue) -> Result<()> {
    loop {
        let (drain, finished) = {
            let mut queue = queue.lock();
            let drain = std::mem::take(&mut queue.drain_requested);
            (drain, std::mem::take(&mut queue.animating))
        };
        if !drain && finished.is_empty() {
            return Ok(());
        }
        if drain {
            manager.exec_pending_actions()?;
        }
        for id in finished {
            manager.on_animation_start(id);
            manager.on_animation_end(id)?;
        }
    }
}

fn bring_up(manager: &mut ComponentManager) -> Result<()> {
    manager.dispatch_create()?;
    manager.dispatch_container_attached()?;
    manager.dispatch_start()?;
    manager.dispatch_resume()
}

fn run(config: ManagerConfig) -> Result<()> {
    let (host, queue) = LogHost::new("main", &[CONTENT]);
    let mut manager = ComponentManager::new(Box::new(host), config.clone());
    manager.add_back_stack_listener(Box::new(|count: usize| {
        log::info!("Back stack now holds {} entries", count);
    }));
    bring_up(&mut manager)?;

    let inbox = manager.instantiate(Screen::new("Inbox").scrolled(12));
    let mut tx = manager.begin_transaction();
    tx.add_to_tagged(CONTENT, inbox, "inbox")?;
    manager.commit(&mut tx)?;
    pump(&mut manager, &queue)?;

    let message = manager.instantiate(Screen::new("Message"));
    let mut tx = manager.begin_transaction();
    tx.replace(CONTENT, message)?
        .set_transition(Transit::OPEN)?
        .add_to_back_stack(Some("message"))?;
    manager.commit(&mut tx)?;
    pump(&mut manager, &queue)?;
    println!("{}", manager.dump());

    manager.pop_back_stack(PopRequest::top())?;
    pump(&mut manager, &queue)?;

    let compose = manager.instantiate(Screen::new("Compose"));
    let mut tx = manager.begin_transaction();
    tx.replace(CONTENT, compose)?
        .add_to_back_stack(Some("compose"))?;
    manager.commit(&mut tx)?;
    pump(&mut manager, &queue)?;

    let saved = manager.save_all_state_bytes()?;
    manager.dispatch_pause()?;
    manager.dispatch_stop()?;
    manager.dispatch_really_stop()?;
    manager.dispatch_destroy_view()?;
    manager.dispatch_destroy()?;
    pump(&mut manager, &queue)?;

    let Some(saved) = saved else {
        log::info!("Nothing to restore");
        return Ok(());
    };
    log::info!("Saved {} bytes as {:?}", saved.len(), config.snapshot_format);

    let (host, queue) = LogHost::new("restored", &[CONTENT]);
    let mut restored = ComponentManager::new(Box::new(host), config);
    restored.restore_all_state_bytes(&saved, RetainedComponents::default(), &screens::rebuild)?;
    bring_up(&mut restored)?;
    pump(&mut restored, &queue)?;
    println!("{}", restored.dump());

    if restored.pop_back_stack_immediate(PopRequest::named("compose").inclusive())? {
        pump(&mut restored, &queue)?;
        if let Some(id) = restored.find_by_tag("inbox") {
            log::info!("Back at {:?}", restored.component(id).map(|c| c.state()));
        }
    }
    Ok(())
}
