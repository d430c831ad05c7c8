// State reads with a single reconnect-and-retry

use crate::error::Result;
use crate::systemd::{StateAxis, StateValue, SystemdBus, UnitHandleCache, UnitName};
use crate::verbose;

/// Reads unit state through a cached handle, recovering once from failures.
///
/// The reader owns both the connection and the handle cache, so a rebuild
/// and the matching cache invalidation always happen together.
pub struct StateReader<B: SystemdBus> {
    bus: B,
    cache: UnitHandleCache<B::Handle>,
    verbose: bool,
}

impl<B: SystemdBus> StateReader<B> {
    pub fn new(bus: B, verbose: bool) -> Self {
        Self {
            bus,
            cache: UnitHandleCache::new(),
            verbose,
        }
    }

    /// Read one axis of a unit; every failure collapses to `StateValue::Broken`.
    ///
    /// A broken first attempt triggers exactly one reconnect followed by one
    /// more attempt, whose outcome is final.
    pub async fn read_state(&mut self, unit: &UnitName, axis: StateAxis) -> StateValue {
        let value = self.attempt(unit, axis).await;
        if !value.is_broken() {
            return value;
        }

        verbose!(
            self.verbose,
            "Unit {} reported as broken. Reinitializing the connection to dbus & retrying.",
            unit
        );
        if let Err(e) = self.reinitialize().await {
            tracing::warn!("Failed to reinitialize systemd connection: {}", e);
        }

        self.attempt(unit, axis).await
    }

    /// Rebuild the bus session and drop every cached handle
    pub async fn reinitialize(&mut self) -> Result<()> {
        let outcome = self.bus.connect().await;
        self.cache.invalidate_all();
        outcome
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn cache(&self) -> &UnitHandleCache<B::Handle> {
        &self.cache
    }

    async fn attempt(&mut self, unit: &UnitName, axis: StateAxis) -> StateValue {
        let Some(handle) = self.cache.get_or_resolve(&self.bus, unit).await else {
            return StateValue::Broken;
        };

        match self.bus.get_property(handle, axis).await {
            Ok(value) => {
                verbose!(self.verbose, "Unit {} {}={}", unit, axis, value);
                StateValue::Observed(value)
            }
            Err(e) => {
                verbose!(self.verbose, "failed to monitor unit {}: {}", unit, e);
                StateValue::Broken
            }
        }
    }
}
