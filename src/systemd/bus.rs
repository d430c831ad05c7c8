// Systemd D-Bus connection with bounded calls

use crate::error::{MonitorError, Result};
use crate::systemd::{StateAxis, UnitName, UNIT_INTERFACE};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use zbus::fdo::PropertiesProxy;
use zbus::names::InterfaceName;
use zbus::zvariant::OwnedObjectPath;
use zbus::{Connection, Proxy};

const SYSTEMD_DESTINATION: &str = "org.freedesktop.systemd1";
const SYSTEMD_PATH: &str = "/org/freedesktop/systemd1";
const MANAGER_INTERFACE: &str = "org.freedesktop.systemd1.Manager";

/// Default upper bound for a single bus call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Operations the poller needs from the service manager.
///
/// `connect` replaces any previous session. Handles returned by `resolve`
/// belong to the session that produced them and must be dropped when the
/// session is rebuilt.
pub trait SystemdBus {
    type Handle;

    /// (Re)establish the session and acquire the manager interface
    fn connect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Locate a unit and wrap it as a property-query handle
    fn resolve(&self, unit: &UnitName) -> impl Future<Output = Result<Self::Handle>> + Send;

    /// Read one state property through a resolved handle
    fn get_property(
        &self,
        handle: &Self::Handle,
        axis: StateAxis,
    ) -> impl Future<Output = Result<String>> + Send;
}

struct Session {
    connection: Connection,
    manager: Proxy<'static>,
}

/// System bus connection to systemd
pub struct DbusConnection {
    call_timeout: Duration,
    session: Option<Session>,
}

impl Default for DbusConnection {
    fn default() -> Self {
        Self::new(DEFAULT_CALL_TIMEOUT)
    }
}

impl DbusConnection {
    /// Create a disconnected client; call `connect` before resolving units
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            call_timeout,
            session: None,
        }
    }

    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| MonitorError::SystemdConnection("Not connected".to_string()).into())
    }
}

impl SystemdBus for DbusConnection {
    type Handle = PropertiesProxy<'static>;

    async fn connect(&mut self) -> Result<()> {
        self.session = None;

        let connection = tokio::time::timeout(self.call_timeout, Connection::system())
            .await
            .map_err(|_| MonitorError::SystemdConnection("Connection timeout".to_string()))?
            .map_err(|e| MonitorError::SystemdConnection(format!("Failed to connect: {}", e)))?;

        let manager = Proxy::new(
            &connection,
            SYSTEMD_DESTINATION,
            SYSTEMD_PATH,
            MANAGER_INTERFACE,
        )
        .await
        .map_err(|e| MonitorError::SystemdConnection(e.to_string()))?;

        tracing::debug!("Connected to systemd manager on the system bus");
        self.session = Some(Session { connection, manager });
        Ok(())
    }

    async fn resolve(&self, unit: &UnitName) -> Result<Self::Handle> {
        let session = self.session()?;
        let resolution_error = |message: String| MonitorError::UnitResolution {
            unit: unit.to_string(),
            message,
        };

        let unit_path: OwnedObjectPath =
            bounded(self.call_timeout, session.manager.call("GetUnit", &(unit.as_str(),)))
                .await
                .map_err(resolution_error)?;

        let proxy = PropertiesProxy::builder(&session.connection)
            .destination(SYSTEMD_DESTINATION)
            .and_then(|builder| builder.path(unit_path.into_inner()))
            .map_err(|e| resolution_error(e.to_string()))?
            .build();
        let proxy = bounded(self.call_timeout, proxy)
            .await
            .map_err(resolution_error)?;

        Ok(proxy)
    }

    async fn get_property(&self, handle: &Self::Handle, axis: StateAxis) -> Result<String> {
        let read_error = |message: String| MonitorError::PropertyRead {
            unit: handle.inner().path().to_string(),
            property: axis.property().to_string(),
            message,
        };

        let interface = InterfaceName::from_static_str_unchecked(UNIT_INTERFACE);
        let value = bounded(self.call_timeout, handle.get(interface, axis.property()))
            .await
            .map_err(read_error)?;

        let state = value
            .downcast_ref::<String>()
            .map_err(|e| read_error(format!("unexpected value type: {}", e)))?;

        Ok(state)
    }
}

/// Await a bus call, giving up after `limit`
async fn bounded<T, E, F>(limit: Duration, call: F) -> std::result::Result<T, String>
where
    E: Display,
    F: Future<Output = std::result::Result<T, E>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {:?}", limit)),
    }
}
