//! Registry of in-flight swarm statuses.
//!
//! Mutated by the engine, read concurrently by the status endpoint and the
//! WebSocket poller. Terminal entries linger for a grace period before the
//! engine evicts them.

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use super::types::SwarmStatus;

#[derive(Default)]
pub struct ActiveSwarms {
    inner: RwLock<HashMap<Uuid, SwarmStatus>>,
}

impl ActiveSwarms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, status: SwarmStatus) {
        self.inner.write().insert(status.trace_id, status);
    }

    pub fn get(&self, trace_id: Uuid) -> Option<SwarmStatus> {
        self.inner.read().get(&trace_id).cloned()
    }

    /// Apply a mutation to a live status; no-op when evicted.
    pub fn update(&self, trace_id: Uuid, patch: impl FnOnce(&mut SwarmStatus)) {
        if let Some(status) = self.inner.write().get_mut(&trace_id) {
            patch(status);
        }
    }

    pub fn remove(&self, trace_id: Uuid) {
        self.inner.write().remove(&trace_id);
    }

    pub fn list(&self) -> Vec<SwarmStatus> {
        self.inner.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swarm::types::SwarmPhase;

    #[test]
    fn insert_update_get() {
        let swarms = ActiveSwarms::new();
        let id = Uuid::new_v4();
        swarms.insert(SwarmStatus::pending(id, 2, "m"));

        swarms.update(id, |s| {
            s.status = SwarmPhase::Running;
            s.progress = 40;
        });

        let status = swarms.get(id).unwrap();
        assert_eq!(status.status, SwarmPhase::Running);
        assert_eq!(status.progress, 40);
    }

    #[test]
    fn update_after_eviction_is_a_noop() {
        let swarms = ActiveSwarms::new();
        let id = Uuid::new_v4();
        swarms.insert(SwarmStatus::pending(id, 1, "m"));
        swarms.remove(id);
        swarms.update(id, |s| s.progress = 99);
        assert!(swarms.get(id).is_none());
        assert!(swarms.is_empty());
    }
}
