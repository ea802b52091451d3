//! # Action Concurrency Guard
//!
//! Reference-counted registry of in-flight action names. It drives the busy
//! indicator and lets callers skip a redundant dispatch of an action that is
//! already running. It is not a mutex for tree mutations; those are
//! serialized by running one state transition at a time.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Default)]
struct Registry {
    counts: HashMap<String, usize>,
    /// Set when an effectful release happened since the registry last drained
    pending_effect: bool,
    action_group_index: u64,
}

impl Registry {
    fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Multiset of running action names, cheap to clone and share
#[derive(Debug, Clone)]
pub struct RunningActions {
    registry: Arc<Mutex<Registry>>,
    busy: Arc<watch::Sender<bool>>,
}

impl Default for RunningActions {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningActions {
    pub fn new() -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            busy: Arc::new(busy),
        }
    }

    /// Add one token per name
    pub fn acquire<S: AsRef<str>>(&self, names: &[S]) {
        let mut registry = self.registry.lock();
        for name in names {
            *registry.counts.entry(name.as_ref().to_string()).or_insert(0) += 1;
        }
        let busy = registry.total() > 0;
        drop(registry);
        self.publish(busy);
    }

    /// Remove one token per name. Unknown names are ignored.
    ///
    /// When the last token drains and at least one release since the
    /// previous drain applied an effect, the action group index advances.
    pub fn release<S: AsRef<str>>(&self, names: &[S], effect_applied: bool) {
        let mut registry = self.registry.lock();
        let mut released = 0;
        for name in names {
            let name = name.as_ref();
            match registry.counts.get_mut(name) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    released += 1;
                }
                Some(_) => {
                    registry.counts.remove(name);
                    released += 1;
                }
                None => tracing::warn!(action = name, "released an action that was not running"),
            }
        }
        if released == 0 {
            return;
        }
        registry.pending_effect |= effect_applied;

        let busy = registry.total() > 0;
        if !busy && registry.pending_effect {
            registry.pending_effect = false;
            registry.action_group_index += 1;
        }
        drop(registry);
        self.publish(busy);
    }

    /// Acquire `names` and release them when the returned scope drops
    pub fn scope<S: AsRef<str>>(&self, names: &[S]) -> RunningActionScope {
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        self.acquire(&names);
        RunningActionScope {
            actions: self.clone(),
            names,
            effect_applied: false,
        }
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.registry.lock().counts.contains_key(name)
    }

    pub fn is_busy(&self) -> bool {
        self.registry.lock().total() > 0
    }

    pub fn running_count(&self, name: &str) -> usize {
        self.registry.lock().counts.get(name).copied().unwrap_or(0)
    }

    /// Advances once per drained group of actions that changed something
    pub fn action_group_index(&self) -> u64 {
        self.registry.lock().action_group_index
    }

    pub fn subscribe_busy(&self) -> watch::Receiver<bool> {
        self.busy.subscribe()
    }

    fn publish(&self, busy: bool) {
        self.busy.send_if_modified(|current| {
            if *current == busy {
                false
            } else {
                *current = busy;
                true
            }
        });
    }
}

/// Tokens held for the lifetime of one action
#[derive(Debug)]
pub struct RunningActionScope {
    actions: RunningActions,
    names: Vec<String>,
    effect_applied: bool,
}

impl RunningActionScope {
    /// Mark the action as having changed state
    pub fn applied(&mut self) {
        self.effect_applied = true;
    }
}

impl Drop for RunningActionScope {
    fn drop(&mut self) {
        self.actions.release(&self.names, self.effect_applied);
    }
}
