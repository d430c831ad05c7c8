// Periodic poll cycle and host integration

use crate::config::{Config, PollPlan, SkipReason};
use crate::metrics::{MetricEmitter, MetricSink};
use crate::systemd::{AxisSet, ServiceName, StateReader, SystemdBus};
use crate::verbose;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Something a host drives on a fixed interval
pub trait Poller {
    /// Run one full poll cycle
    fn tick(&mut self) -> impl Future<Output = ()> + Send;

    /// Time between cycles
    fn interval(&self) -> Duration;
}

/// Reads every configured (service, axis) pair and emits its gauges
pub struct ServicePoller<B: SystemdBus, S: MetricSink> {
    services: Vec<ServiceName>,
    axes: AxisSet,
    interval: Duration,
    verbose: bool,
    pub(crate) reader: StateReader<B>,
    pub(crate) emitter: MetricEmitter<S>,
}

impl<B: SystemdBus, S: MetricSink> ServicePoller<B, S> {
    /// Build a poller from a validated plan without touching the bus
    pub fn new(plan: PollPlan, bus: B, sink: S) -> Self {
        Self {
            reader: StateReader::new(bus, plan.verbose),
            emitter: MetricEmitter::new(sink, plan.verbose),
            services: plan.services,
            axes: plan.axes,
            interval: plan.interval,
            verbose: plan.verbose,
        }
    }

    /// Run one cycle: services in configuration order, axes in declared order
    pub async fn poll_once(&mut self) {
        verbose!(self.verbose, "Read callback called");

        for service in &self.services {
            let unit = service.unit_name();
            for axis in self.axes.iter() {
                let state = self.reader.read_state(&unit, axis).await;
                self.emitter.emit(axis, service, &state);
            }
        }
    }

    pub fn services(&self) -> &[ServiceName] {
        &self.services
    }

    pub fn reader(&self) -> &StateReader<B> {
        &self.reader
    }

    pub fn emitter(&self) -> &MetricEmitter<S> {
        &self.emitter
    }
}

impl<B, S> Poller for ServicePoller<B, S>
where
    B: SystemdBus + Send + Sync,
    B::Handle: Send + Sync,
    S: MetricSink + Send,
{
    fn tick(&mut self) -> impl Future<Output = ()> + Send {
        self.poll_once()
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Validate the configuration and set up a poller.
///
/// Returns `None` when there is nothing to poll; the reason is logged. A
/// failed initial connection is only a warning: reads report `broken` and
/// each one retries the connection.
pub async fn register<B, S>(config: &Config, bus: B, sink: S) -> Option<ServicePoller<B, S>>
where
    B: SystemdBus,
    S: MetricSink,
{
    let plan = match config.poll_plan() {
        Ok(plan) => plan,
        Err(reason @ SkipReason::InvalidServiceStates(_)) => {
            tracing::error!("{}", reason);
            return None;
        }
        Err(reason) => {
            tracing::info!("Polling not registered: {}", reason);
            return None;
        }
    };

    let mut poller = ServicePoller::new(plan, bus, sink);
    if let Err(e) = poller.reader.reinitialize().await {
        tracing::warn!("Initial systemd connection failed: {}", e);
    }

    verbose!(
        poller.verbose,
        "Configured with services={:?}, interval={:?}",
        poller.services.iter().map(ServiceName::as_str).collect::<Vec<_>>(),
        poller.interval
    );

    Some(poller)
}

/// Drive `poller` on its interval until `shutdown` resolves.
///
/// The first cycle runs immediately. A cycle that overruns the interval
/// delays the next one instead of overlapping it.
pub async fn run<P, F>(poller: &mut P, shutdown: F)
where
    P: Poller,
    F: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(poller.interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => poller.tick().await,
            _ = &mut shutdown => {
                tracing::info!("Poller shutdown");
                break;
            }
        }
    }
}
