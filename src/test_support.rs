// In-memory stand-ins for the bus and the metric sink

use crate::error::{MonitorError, Result};
use crate::metrics::{MetricSink, Sample};
use crate::systemd::{StateAxis, SystemdBus, UnitName};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    Resolve(String),
    Get(String, StateAxis),
}

#[derive(Debug)]
pub struct FakeHandle {
    pub unit: String,
    pub generation: u64,
}

#[derive(Debug, Default)]
struct Daemon {
    /// Bumped on every simulated daemon restart
    generation: u64,
    /// Generation the client session was opened against
    session: Option<u64>,
    refuse_connect: bool,
    states: HashMap<(String, StateAxis), String>,
    resolve_failures: HashMap<String, usize>,
    read_failures: HashMap<String, usize>,
    calls: Vec<Call>,
}

/// Scriptable systemd stand-in.
///
/// Handles and sessions go stale when the daemon is restarted, like real
/// object proxies after systemd re-executes.
#[derive(Debug, Default)]
pub struct FakeBus {
    daemon: Mutex<Daemon>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(self, unit: &str, axis: StateAxis, value: &str) -> Self {
        self.set_state(unit, axis, value);
        self
    }

    pub fn set_state(&self, unit: &str, axis: StateAxis, value: &str) {
        self.daemon
            .lock()
            .unwrap()
            .states
            .insert((unit.to_string(), axis), value.to_string());
    }

    /// Make the next `times` resolutions of `unit` fail
    pub fn fail_resolve(&self, unit: &str, times: usize) {
        self.daemon.lock().unwrap().resolve_failures.insert(unit.to_string(), times);
    }

    /// Make the next `times` property reads of `unit` fail
    pub fn fail_reads(&self, unit: &str, times: usize) {
        self.daemon.lock().unwrap().read_failures.insert(unit.to_string(), times);
    }

    pub fn refuse_connect(&self, refuse: bool) {
        self.daemon.lock().unwrap().refuse_connect = refuse;
    }

    /// Invalidate the current session and every handle resolved under it
    pub fn restart_daemon(&self) {
        self.daemon.lock().unwrap().generation += 1;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.daemon.lock().unwrap().calls.clone()
    }

    pub fn count(&self, matcher: impl Fn(&Call) -> bool) -> usize {
        self.daemon.lock().unwrap().calls.iter().filter(|c| matcher(c)).count()
    }

    pub fn connects(&self) -> usize {
        self.count(|c| *c == Call::Connect)
    }

    pub fn resolves(&self) -> usize {
        self.count(|c| matches!(c, Call::Resolve(_)))
    }

    pub fn reads(&self) -> usize {
        self.count(|c| matches!(c, Call::Get(..)))
    }

    pub fn clear_calls(&self) {
        self.daemon.lock().unwrap().calls.clear();
    }
}

fn take_failure(failures: &mut HashMap<String, usize>, unit: &str) -> bool {
    match failures.get_mut(unit) {
        Some(remaining) if *remaining > 0 => {
            *remaining -= 1;
            true
        }
        _ => false,
    }
}

impl SystemdBus for FakeBus {
    type Handle = FakeHandle;

    async fn connect(&mut self) -> Result<()> {
        let daemon = self.daemon.get_mut().unwrap();
        daemon.calls.push(Call::Connect);
        daemon.session = None;
        if daemon.refuse_connect {
            return Err(MonitorError::SystemdConnection("connection refused".to_string()).into());
        }
        daemon.session = Some(daemon.generation);
        Ok(())
    }

    async fn resolve(&self, unit: &UnitName) -> Result<FakeHandle> {
        let mut daemon = self.daemon.lock().unwrap();
        daemon.calls.push(Call::Resolve(unit.to_string()));

        if daemon.session != Some(daemon.generation) {
            return Err(MonitorError::SystemdConnection("Not connected".to_string()).into());
        }
        let known = daemon.states.keys().any(|(name, _)| name == unit.as_str());
        if take_failure(&mut daemon.resolve_failures, unit.as_str()) || !known {
            return Err(MonitorError::UnitResolution {
                unit: unit.to_string(),
                message: format!("Unit {} not loaded.", unit),
            }
            .into());
        }

        Ok(FakeHandle {
            unit: unit.to_string(),
            generation: daemon.generation,
        })
    }

    async fn get_property(&self, handle: &FakeHandle, axis: StateAxis) -> Result<String> {
        let mut daemon = self.daemon.lock().unwrap();
        daemon.calls.push(Call::Get(handle.unit.clone(), axis));

        let read_error = |message: &str| MonitorError::PropertyRead {
            unit: handle.unit.clone(),
            property: axis.property().to_string(),
            message: message.to_string(),
        };

        if handle.generation != daemon.generation {
            return Err(read_error("stale handle").into());
        }
        if take_failure(&mut daemon.read_failures, &handle.unit) {
            return Err(read_error("read failed").into());
        }

        daemon
            .states
            .get(&(handle.unit.clone(), axis))
            .cloned()
            .ok_or_else(|| read_error("unknown property").into())
    }
}

/// Sink that keeps every sample in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub samples: Vec<Sample>,
}

impl RecordingSink {
    /// `(service, type_instance, value)` triples, in dispatch order
    pub fn readings(&self) -> Vec<(String, String, u8)> {
        self.samples
            .iter()
            .map(|s| (s.service.to_string(), s.type_instance.clone(), s.value))
            .collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl MetricSink for RecordingSink {
    fn dispatch(&mut self, sample: &Sample) -> Result<()> {
        self.samples.push(sample.clone());
        Ok(())
    }
}

/// One captured tracing event
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
}

/// Layer that records every event it sees
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl LogCapture {
    /// Capture events on the current thread until the guard is dropped
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn at_level(&self, level: Level) -> Vec<LogEvent> {
        self.events().into_iter().filter(|e| e.level == level).collect()
    }

    pub fn with_target(&self, target: &str) -> Vec<LogEvent> {
        self.events().into_iter().filter(|e| e.target == target).collect()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(LogEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.0,
        });
    }
}
