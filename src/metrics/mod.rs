// Metric conversion and sinks

pub mod emitter;
pub mod sample;
pub mod sink;


pub use emitter::MetricEmitter;
pub use sample::{Sample, GAUGE, PLUGIN_NAME, SERVICE_DIMENSION};
pub use sink::{default_hostname, LogSink, MetricSink, PutvalSink};

#[cfg(test)]
pub use sink::MockMetricSink;
