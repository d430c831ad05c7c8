// Systemd integration module

pub mod bus;
pub mod cache;
pub mod models;
pub mod reader;


pub use bus::{DbusConnection, SystemdBus, DEFAULT_CALL_TIMEOUT};
pub use cache::UnitHandleCache;
pub use models::{AxisSet, ServiceName, StateAxis, StateValue, UnitName, SERVICE_SUFFIX, UNIT_INTERFACE};
pub use reader::StateReader;
