// Sysgauge - systemd unit state gauges
// Library root

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod poller;
pub mod systemd;
pub mod version;

#[cfg(test)]
mod test_support;
