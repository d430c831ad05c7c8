// Per-unit handle cache tied to a connection generation

use crate::systemd::{SystemdBus, UnitName};
use std::collections::HashMap;

/// Resolved unit handles for the current connection generation
#[derive(Debug)]
pub struct UnitHandleCache<H> {
    handles: HashMap<UnitName, H>,
    generation: u64,
}

impl<H> Default for UnitHandleCache<H> {
    fn default() -> Self {
        Self {
            handles: HashMap::new(),
            generation: 0,
        }
    }
}

impl<H> UnitHandleCache<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached handle for `unit`, resolving it on a miss.
    ///
    /// A failed resolution is logged as a warning and yields `None`; nothing
    /// is cached so the next call tries again.
    pub async fn get_or_resolve<B>(&mut self, bus: &B, unit: &UnitName) -> Option<&H>
    where
        B: SystemdBus<Handle = H>,
    {
        if !self.handles.contains_key(unit) {
            match bus.resolve(unit).await {
                Ok(handle) => {
                    tracing::debug!("Resolved unit {} (generation {})", unit, self.generation);
                    self.handles.insert(unit.clone(), handle);
                }
                Err(e) => {
                    tracing::warn!("failed to monitor unit {}: {}", unit, e);
                    return None;
                }
            }
        }

        self.handles.get(unit)
    }

    /// Drop every handle and start a new generation
    pub fn invalidate_all(&mut self) {
        self.handles.clear();
        self.generation += 1;
    }

    pub fn contains(&self, unit: &UnitName) -> bool {
        self.handles.contains_key(unit)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Number of rebuilds seen so far
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
