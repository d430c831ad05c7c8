// Axis value to boolean gauge conversion

use crate::metrics::{MetricSink, Sample, PLUGIN_NAME};
use crate::systemd::{ServiceName, StateAxis, StateValue};
use crate::verbose;

/// Turns one axis reading into a gauge per known enumerant
pub struct MetricEmitter<S: MetricSink> {
    sink: S,
    plugin: String,
    verbose: bool,
}

impl<S: MetricSink> MetricEmitter<S> {
    pub fn new(sink: S, verbose: bool) -> Self {
        Self {
            sink,
            plugin: PLUGIN_NAME.to_string(),
            verbose,
        }
    }

    /// Emit one gauge per enumerant of `axis`, in declared order.
    ///
    /// At most one gauge is 1; a broken or unknown value yields all zeros.
    /// Returns the number of samples the sink accepted.
    pub fn emit(&mut self, axis: StateAxis, service: &ServiceName, state: &StateValue) -> usize {
        let mut accepted = 0;

        for enumerant in axis.known_states() {
            let sample = Sample::gauge(
                &self.plugin,
                format!("{}.{}", axis.metric_prefix(), enumerant),
                service,
                state.matches(enumerant),
            );

            verbose!(
                self.verbose,
                "Sending value: {}.{}={} (state={})",
                self.plugin,
                service,
                sample.value,
                state
            );

            match self.sink.dispatch(&sample) {
                Ok(()) => accepted += 1,
                Err(e) => tracing::warn!(
                    "Failed to dispatch {} for service {}: {}",
                    sample.type_instance,
                    service,
                    e
                ),
            }
        }

        accepted
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
