// Configuration management

use crate::error::{MonitorError, Result};
use crate::systemd::{AxisSet, ServiceName, StateAxis, DEFAULT_CALL_TIMEOUT};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Poll interval used when `Interval` is not configured
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Recognized configuration keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    /// Repeatable; appends service names
    Service,
    /// Repeatable; adds state axes to monitor
    ServiceStates,
    Interval,
    Verbose,
    /// Upper bound for a single bus call, in seconds
    Timeout,
}

impl FromStr for ConfigKey {
    type Err = MonitorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Service" => Ok(ConfigKey::Service),
            "ServiceStates" => Ok(ConfigKey::ServiceStates),
            "Interval" => Ok(ConfigKey::Interval),
            "Verbose" => Ok(ConfigKey::Verbose),
            "Timeout" => Ok(ConfigKey::Timeout),
            other => Err(MonitorError::UnknownConfigKey(other.to_string())),
        }
    }
}

/// A single value inside a host configuration block
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => f.write_str(s),
            ConfigValue::Number(n) => write!(f, "{}", n),
            ConfigValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<f64> for ConfigValue {
    fn from(n: f64) -> Self {
        ConfigValue::Number(n)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Boolean(b)
    }
}

/// One `Key value...` line of a host configuration block
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigNode {
    pub key: String,
    pub values: Vec<ConfigValue>,
}

impl ConfigNode {
    pub fn new(key: impl Into<String>, values: Vec<ConfigValue>) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }

    fn first(&self) -> Result<String> {
        self.values
            .first()
            .map(|v| v.to_string())
            .ok_or_else(|| MonitorError::Config(format!("{} requires a value", self.key)).into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub services: Vec<ServiceName>,
    /// Raw axis names; validated when the poll plan is built
    pub service_states: BTreeSet<String>,
    pub interval: Duration,
    pub timeout: Duration,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            services: Vec::new(),
            service_states: BTreeSet::new(),
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_CALL_TIMEOUT,
            verbose: false,
        }
    }
}

/// Everything the poller needs, after validation
#[derive(Debug, Clone, PartialEq)]
pub struct PollPlan {
    pub services: Vec<ServiceName>,
    pub axes: AxisSet,
    pub interval: Duration,
    pub timeout: Duration,
    pub verbose: bool,
}

/// Why polling was not registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoServices,
    NoServiceStates,
    InvalidServiceStates(Vec<String>),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoServices => f.write_str("No services defined in configuration"),
            SkipReason::NoServiceStates => {
                f.write_str("No service state(s) defined in configuration")
            }
            SkipReason::InvalidServiceStates(invalid) => write!(
                f,
                "Invalid service state(s) {:?} defined in configuration. Valid service states are {}, {} and {}",
                invalid,
                StateAxis::ActiveState,
                StateAxis::SubState,
                StateAxis::LoadState
            ),
        }
    }
}

impl Config {
    /// Decode a host configuration block.
    ///
    /// Unknown keys and malformed values are fatal.
    pub fn from_nodes(nodes: &[ConfigNode]) -> Result<Self> {
        let mut config = Self::default();

        for node in nodes {
            match node.key.parse::<ConfigKey>()? {
                ConfigKey::Service => config
                    .services
                    .extend(node.values.iter().map(|v| ServiceName::new(v.to_string()))),
                ConfigKey::ServiceStates => config
                    .service_states
                    .extend(node.values.iter().map(|v| v.to_string())),
                ConfigKey::Interval => config.interval = parse_seconds(node)?,
                ConfigKey::Timeout => config.timeout = parse_seconds(node)?,
                ConfigKey::Verbose => config.verbose = node.first()?.to_lowercase() == "true",
            }
        }

        Ok(config)
    }

    /// Decode a YAML configuration document
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let file: FileConfig = serde_yaml::from_str(contents)
            .map_err(|e| MonitorError::Config(e.to_string()))?;
        Self::from_nodes(&file.into_nodes())
    }

    /// Get default config path: ~/.config/sysgauge/config.yaml
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("sysgauge").join("config.yaml"))
    }

    /// Load config from path, falling back to defaults if not found
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        Self::load_or_default(path, Self::default_path)
    }

    pub(crate) fn load_or_default(
        path: Option<PathBuf>,
        default_path: impl FnOnce() -> Result<PathBuf>,
    ) -> Result<Self> {
        let config_path = match path {
            Some(path) => path,
            None => match default_path() {
                Ok(path) => path,
                Err(e) => {
                    tracing::debug!("No default config path ({}), using defaults", e);
                    return Ok(Self::default());
                }
            },
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(MonitorError::Io)?;
            Self::from_yaml_str(&contents)
        } else {
            tracing::debug!("No config file at {}, using defaults", config_path.display());
            Ok(Self::default())
        }
    }

    /// Validate services and axes; `Err` means polling must not be registered
    pub fn poll_plan(&self) -> std::result::Result<PollPlan, SkipReason> {
        if self.services.is_empty() {
            return Err(SkipReason::NoServices);
        }
        if self.service_states.is_empty() {
            return Err(SkipReason::NoServiceStates);
        }

        let mut axes = Vec::new();
        let mut invalid = Vec::new();
        for state in &self.service_states {
            match state.parse::<StateAxis>() {
                Ok(axis) => axes.push(axis),
                Err(name) => invalid.push(name),
            }
        }
        if !invalid.is_empty() {
            return Err(SkipReason::InvalidServiceStates(invalid));
        }

        Ok(PollPlan {
            services: self.services.clone(),
            axes: axes.into_iter().collect(),
            interval: self.interval,
            timeout: self.timeout,
            verbose: self.verbose,
        })
    }
}

fn parse_seconds(node: &ConfigNode) -> Result<Duration> {
    let raw = node.first()?;
    let secs: f64 = raw
        .parse()
        .map_err(|_| MonitorError::Config(format!("{} must be a number, got '{}'", node.key, raw)))?;

    if !secs.is_finite() || secs <= 0.0 {
        return Err(MonitorError::Config(format!("{} must be positive, got {}", node.key, secs)).into());
    }

    let duration = Duration::try_from_secs_f64(secs)
        .map_err(|e| MonitorError::Config(format!("{} out of range ({}): {}", node.key, secs, e)))?;
    if duration.is_zero() {
        return Err(MonitorError::Config(format!("{} rounds down to zero: {}", node.key, secs)).into());
    }

    Ok(duration)
}

/// On-disk YAML layout; keys match the host block keys
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
struct FileConfig {
    service: Option<OneOrMany>,
    service_states: Option<OneOrMany>,
    interval: Option<f64>,
    verbose: Option<bool>,
    timeout: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_values(self) -> Vec<ConfigValue> {
        match self {
            OneOrMany::One(value) => vec![ConfigValue::String(value)],
            OneOrMany::Many(values) => values.into_iter().map(ConfigValue::String).collect(),
        }
    }
}

impl FileConfig {
    fn into_nodes(self) -> Vec<ConfigNode> {
        let mut nodes = Vec::new();
        if let Some(services) = self.service {
            nodes.push(ConfigNode::new("Service", services.into_values()));
        }
        if let Some(states) = self.service_states {
            nodes.push(ConfigNode::new("ServiceStates", states.into_values()));
        }
        if let Some(interval) = self.interval {
            nodes.push(ConfigNode::new("Interval", vec![interval.into()]));
        }
        if let Some(verbose) = self.verbose {
            nodes.push(ConfigNode::new("Verbose", vec![verbose.into()]));
        }
        if let Some(timeout) = self.timeout {
            nodes.push(ConfigNode::new("Timeout", vec![timeout.into()]));
        }
        nodes
    }
}
