// Metric sinks: collectd exec protocol and structured logs

use crate::error::{MonitorError, Result};
use crate::metrics::Sample;
use std::io::Write;
use std::time::Duration;

/// Receiver of metric samples
#[cfg_attr(test, mockall::automock)]
pub trait MetricSink {
    fn dispatch(&mut self, sample: &Sample) -> Result<()>;
}

/// Writes samples as collectd exec-plugin `PUTVAL` lines
pub struct PutvalSink<W: Write> {
    writer: W,
    hostname: String,
    interval: Duration,
}

impl<W: Write> PutvalSink<W> {
    pub fn new(writer: W, hostname: impl Into<String>, interval: Duration) -> Self {
        Self {
            writer,
            hostname: hostname.into(),
            interval,
        }
    }

    /// Format a sample as a single `PUTVAL` line (without newline)
    pub fn format_line(&self, sample: &Sample) -> String {
        format!(
            "PUTVAL \"{}/{}-{}/{}-{}\" interval={} {}:{}",
            self.hostname,
            sample.plugin,
            sample.plugin_instance(),
            sample.kind,
            sample.type_instance,
            self.interval.as_secs_f64(),
            sample.time.timestamp(),
            sample.value
        )
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> MetricSink for PutvalSink<W> {
    fn dispatch(&mut self, sample: &Sample) -> Result<()> {
        let line = self.format_line(sample);
        writeln!(self.writer, "{}", line)
            .and_then(|_| self.writer.flush())
            .map_err(|e| MonitorError::Dispatch(e.to_string()))?;
        Ok(())
    }
}

/// Reports samples as structured tracing events
#[derive(Debug, Default)]
pub struct LogSink;

impl MetricSink for LogSink {
    fn dispatch(&mut self, sample: &Sample) -> Result<()> {
        tracing::info!(
            plugin = %sample.plugin,
            service = %sample.service,
            kind = sample.kind,
            type_instance = %sample.type_instance,
            value = sample.value,
            "metric"
        );
        Ok(())
    }
}

/// Host name to report under.
///
/// Uses `COLLECTD_HOSTNAME` when collectd's exec plugin provides it, then the
/// kernel host name, then `localhost`.
pub fn default_hostname() -> String {
    if let Ok(name) = std::env::var("COLLECTD_HOSTNAME") {
        if !name.trim().is_empty() {
            return name.trim().to_string();
        }
    }

    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
