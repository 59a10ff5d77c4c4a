//! Two-tier trace store: authoritative memory, best-effort disk.
//!
//! One pretty-printed JSON file per trace under a fixed directory. The first
//! disk failure flips a sticky memory-only flag (logged once); the store keeps
//! serving from memory. Corrupt disk files are skipped, never a panic.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::swarm::types::Trace;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A page of traces plus the total count across both tiers.
#[derive(Debug)]
pub struct TracePage {
    pub items: Vec<Trace>,
    pub total: usize,
}

pub struct TraceStore {
    dir: PathBuf,
    memory: RwLock<HashMap<Uuid, Trace>>,
    memory_only: AtomicBool,
}

impl TraceStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    /// An unwritable directory degrades to memory-only from the start.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let memory_only = match fs::create_dir_all(&dir) {
            Ok(()) => false,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Trace directory unavailable; running memory-only");
                true
            }
        };
        Self {
            dir,
            memory: RwLock::new(HashMap::new()),
            memory_only: AtomicBool::new(memory_only),
        }
    }

    /// Whether disk persistence has been disabled by a failure.
    pub fn is_memory_only(&self) -> bool {
        self.memory_only.load(Ordering::Relaxed)
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Persist a trace to both tiers.
    pub fn save(&self, trace: &Trace) {
        self.memory.write().insert(trace.trace_id, trace.clone());
        self.write_disk(trace);
    }

    /// Fetch a trace, hydrating memory from disk on miss.
    pub fn get(&self, id: Uuid) -> Option<Trace> {
        if let Some(t) = self.memory.read().get(&id) {
            return Some(t.clone());
        }
        if self.is_memory_only() {
            return None;
        }
        let trace = read_trace_file(&self.path_for(id))?;
        self.memory.write().insert(id, trace.clone());
        Some(trace)
    }

    /// Apply a patch to a trace and persist the result.
    pub fn update(&self, id: Uuid, patch: impl FnOnce(&mut Trace)) -> Option<Trace> {
        let updated = {
            let mut memory = self.memory.write();
            if !memory.contains_key(&id) {
                // Hydrate under the write lock so concurrent updates to the
                // same trace serialize.
                if self.is_memory_only() {
                    return None;
                }
                let hydrated = read_trace_file(&self.path_for(id))?;
                memory.insert(id, hydrated);
            }
            let trace = memory.get_mut(&id)?;
            patch(trace);
            trace.clone()
        };
        self.write_disk(&updated);
        Some(updated)
    }

    /// List traces newest-first across both tiers. Memory wins on collision.
    pub fn list(&self, limit: usize, offset: usize) -> TracePage {
        let mut merged: HashMap<Uuid, Trace> = HashMap::new();

        if !self.is_memory_only() {
            if let Ok(entries) = fs::read_dir(&self.dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.extension().and_then(|e| e.to_str()) != Some("json") {
                        continue;
                    }
                    if let Some(trace) = read_trace_file(&path) {
                        merged.insert(trace.trace_id, trace);
                    }
                }
            }
        }

        for (id, trace) in self.memory.read().iter() {
            merged.insert(*id, trace.clone());
        }

        let total = merged.len();
        let mut items: Vec<Trace> = merged.into_values().collect();
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let items = items.into_iter().skip(offset).take(limit).collect();

        TracePage { items, total }
    }

    /// Remove a trace from both tiers. Returns whether anything was removed.
    pub fn delete(&self, id: Uuid) -> bool {
        let in_memory = self.memory.write().remove(&id).is_some();
        let on_disk = if self.is_memory_only() {
            false
        } else {
            fs::remove_file(self.path_for(id)).is_ok()
        };
        in_memory || on_disk
    }

    fn write_disk(&self, trace: &Trace) {
        if self.is_memory_only() {
            return;
        }
        if let Err(e) = try_write_trace(&self.path_for(trace.trace_id), trace) {
            // Sticky: first failure disables disk writes and logs once.
            if !self.memory_only.swap(true, Ordering::Relaxed) {
                warn!(
                    trace_id = %trace.trace_id,
                    error = %e,
                    "Trace disk write failed; store is now memory-only"
                );
            }
        }
    }
}

fn try_write_trace(path: &Path, trace: &Trace) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(trace)?;
    fs::write(path, json)?;
    Ok(())
}

fn read_trace_file(path: &Path) -> Option<Trace> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(trace) => Some(trace),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Skipping corrupt trace file");
            None
        }
    }
}
