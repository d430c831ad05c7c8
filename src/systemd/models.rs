// Systemd unit state data models

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Suffix appended to every configured service name before querying systemd
pub const SERVICE_SUFFIX: &str = ".service";

/// Interface that carries the state properties of a unit
pub const UNIT_INTERFACE: &str = "org.freedesktop.systemd1.Unit";

/// Operator-facing service name, e.g. `nginx`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full systemd unit name (`<name>.service`)
    pub fn unit_name(&self) -> UnitName {
        UnitName(format!("{}{}", self.0, SERVICE_SUFFIX))
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Systemd unit name as passed to the manager, e.g. `nginx.service`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitName(String);

impl UnitName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One of the three independent state axes systemd exposes per unit.
///
/// Variant order is the declared polling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StateAxis {
    ActiveState,
    SubState,
    LoadState,
}

impl StateAxis {
    /// All axes in polling order
    pub const ALL: [StateAxis; 3] = [StateAxis::ActiveState, StateAxis::SubState, StateAxis::LoadState];

    /// D-Bus property name on `org.freedesktop.systemd1.Unit`
    pub fn property(&self) -> &'static str {
        match self {
            StateAxis::ActiveState => "ActiveState",
            StateAxis::SubState => "SubState",
            StateAxis::LoadState => "LoadState",
        }
    }

    /// Prefix of the metric type instance
    pub fn metric_prefix(&self) -> &'static str {
        match self {
            StateAxis::ActiveState => "active_state",
            StateAxis::SubState => "substate",
            StateAxis::LoadState => "load_state",
        }
    }

    /// Known values of this axis, in emission order
    pub fn known_states(&self) -> &'static [&'static str] {
        match self {
            StateAxis::ActiveState => &[
                "active",
                "inactive",
                "activating",
                "deactivating",
                "reloading",
                "failed",
            ],
            StateAxis::SubState => &["running", "exited", "failed", "dead"],
            StateAxis::LoadState => &["loaded", "not-found", "error", "masked"],
        }
    }
}

impl fmt::Display for StateAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.property())
    }
}

impl FromStr for StateAxis {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        StateAxis::ALL
            .into_iter()
            .find(|axis| axis.property() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Set of axes to monitor; iteration always follows the declared order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisSet(BTreeSet<StateAxis>);

impl AxisSet {
    pub fn contains(&self, axis: StateAxis) -> bool {
        self.0.contains(&axis)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = StateAxis> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<StateAxis> for AxisSet {
    fn from_iter<I: IntoIterator<Item = StateAxis>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Value observed on one axis of one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateValue {
    /// Value reported by systemd; may fall outside the known enumeration
    Observed(String),
    /// Could not be determined, even after reconnecting
    Broken,
}

impl StateValue {
    pub fn is_broken(&self) -> bool {
        matches!(self, StateValue::Broken)
    }

    pub fn as_str(&self) -> &str {
        match self {
            StateValue::Observed(value) => value,
            StateValue::Broken => "broken",
        }
    }

    /// Whether this value equals the given enumerant
    pub fn matches(&self, enumerant: &str) -> bool {
        match self {
            StateValue::Observed(value) => value == enumerant,
            StateValue::Broken => false,
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
