//! System-wide configuration, with sensible defaults.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

// Layer 2: Third-party crate imports
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::error::ConfigError;

/// Default path `actors.json` is loaded from, relative to the process's
/// current working directory, unless overridden (§0.3, §4.10).
pub const DEFAULT_ACTORS_CONFIG_PATH: &str = "actors.json";

/// Default remote listen port (§0.3, §4.9).
pub const DEFAULT_LISTEN_PORT: u16 = 6161;

/// Default interval between `parent-ping`s, when a remote actor's
/// `pingTimeout` is not otherwise specified.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(10);

/// One cluster member: a reachable remote listening server (§4.5, §4.10
/// `options.clusters: {clusterName: [host[:port], …]}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterEndpoint {
    pub host: String,
    #[serde(default = "default_cluster_port")]
    pub port: u16,
}

fn default_cluster_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

impl ClusterEndpoint {
    /// Parses a `host` or `host:port` entry, defaulting the port to
    /// [`DEFAULT_LISTEN_PORT`] (§4.10 "Default port is 6161").
    pub fn parse(entry: &str) -> Result<Self, ConfigError> {
        match entry.split_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .map_err(|_| ConfigError::Unknown(format!("invalid cluster endpoint '{entry}'")))?;
                Ok(Self { host: host.to_string(), port })
            }
            None => Ok(Self { host: entry.to_string(), port: DEFAULT_LISTEN_PORT }),
        }
    }

    pub fn as_host_port(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

/// What happens to a remote actor's proxy once its heartbeat declares it
/// crashed (§4.4, §4.5). Gates whether a heartbeat runs at all — per
/// §9's resolved open question, pinging stays off unless `Respawn` is
/// configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnCrash {
    Respawn,
    Stop,
}

impl Default for OnCrash {
    fn default() -> Self {
        OnCrash::Stop
    }
}

/// System-wide configuration for the actor runtime (§0.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Path `actors.json`-shaped per-actor option overrides are loaded
    /// from, merged into `createActor` calls by name (§4.10).
    pub actors_config_path: PathBuf,

    /// Default port [`ActorSystem::listen`] binds when none is given.
    pub listen_port: u16,

    /// Interface [`ActorSystem::listen`] binds when none is given.
    /// `None` discovers the first non-loopback IPv4 address, mirroring
    /// §4.10's "scanning network interfaces" note.
    pub listen_host: Option<String>,

    /// Named clusters resolvable from `ChildSpec::cluster` (§4.5,
    /// §4.10).
    pub clusters: HashMap<String, Vec<ClusterEndpoint>>,

    /// Default heartbeat interval for remote actors that don't specify
    /// their own `ping_timeout` (§4.4, §4.5).
    pub ping_timeout: Duration,

    /// Whether a crashed remote actor is respawned or left crashed.
    pub on_crash: OnCrash,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            actors_config_path: PathBuf::from(DEFAULT_ACTORS_CONFIG_PATH),
            listen_port: DEFAULT_LISTEN_PORT,
            listen_host: None,
            clusters: HashMap::new(),
            ping_timeout: DEFAULT_PING_TIMEOUT,
            on_crash: OnCrash::default(),
        }
    }
}

impl SystemConfig {
    pub fn builder() -> SystemConfigBuilder {
        SystemConfigBuilder::default()
    }

    /// Loads `self.actors_config_path` (if it exists) layered over
    /// these defaults, following the `config` crate's layered-source
    /// pattern (§0.3). A missing file is not an error — `actors.json`
    /// is optional.
    pub fn load_actors_file(&self) -> Result<serde_json::Value, ConfigError> {
        load_json_layer(&self.actors_config_path)
    }

    /// Resolves a named cluster to its member endpoints.
    pub fn resolve_cluster(&self, name: &str) -> Result<&[ClusterEndpoint], ConfigError> {
        self.clusters
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ConfigError::UnknownCluster(name.to_string()))
    }
}

fn load_json_layer(path: &Path) -> Result<serde_json::Value, ConfigError> {
    if !path.exists() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    let built = Config::builder()
        .add_source(File::new(path.to_string_lossy().as_ref(), FileFormat::Json).required(false))
        .build()
        .map_err(|e| ConfigError::Load { path: path.display().to_string(), source: e.to_string() })?;
    built
        .try_deserialize()
        .map_err(|e| ConfigError::Load { path: path.display().to_string(), source: e.to_string() })
}

/// Fluent builder for [`SystemConfig`].
#[derive(Debug, Clone, Default)]
pub struct SystemConfigBuilder {
    config: SystemConfigOverrides,
}

#[derive(Debug, Clone, Default)]
struct SystemConfigOverrides {
    actors_config_path: Option<PathBuf>,
    listen_port: Option<u16>,
    listen_host: Option<String>,
    clusters: HashMap<String, Vec<ClusterEndpoint>>,
    ping_timeout: Option<Duration>,
    on_crash: Option<OnCrash>,
}

impl SystemConfigBuilder {
    pub fn with_actors_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.actors_config_path = Some(path.into());
        self
    }

    pub fn with_listen_port(mut self, port: u16) -> Self {
        self.config.listen_port = Some(port);
        self
    }

    pub fn with_listen_host(mut self, host: impl Into<String>) -> Self {
        self.config.listen_host = Some(host.into());
        self
    }

    pub fn with_cluster(mut self, name: impl Into<String>, endpoints: Vec<ClusterEndpoint>) -> Self {
        self.config.clusters.insert(name.into(), endpoints);
        self
    }

    pub fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.config.ping_timeout = Some(timeout);
        self
    }

    pub fn with_on_crash(mut self, on_crash: OnCrash) -> Self {
        self.config.on_crash = Some(on_crash);
        self
    }

    pub fn build(self) -> SystemConfig {
        let defaults = SystemConfig::default();
        SystemConfig {
            actors_config_path: self.config.actors_config_path.unwrap_or(defaults.actors_config_path),
            listen_port: self.config.listen_port.unwrap_or(defaults.listen_port),
            listen_host: self.config.listen_host.or(defaults.listen_host),
            clusters: if self.config.clusters.is_empty() { defaults.clusters } else { self.config.clusters },
            ping_timeout: self.config.ping_timeout.unwrap_or(defaults.ping_timeout),
            on_crash: self.config.on_crash.unwrap_or(defaults.on_crash),
        }
    }
}

/// Process-wide `on_crash` policy, mirrored here so `remote::parent`
/// can gate its heartbeat without threading a `SystemConfig` through
/// every `ChildSpec` (§9 "pinging stays gated on `on_crash: Respawn`").
/// Set once by [`crate::system::ActorSystem::new`]; defaults to `Stop`
/// for any actor spawned outside of a constructed system.
static ON_CRASH_POLICY: OnceLock<OnCrash> = OnceLock::new();

pub(crate) fn set_on_crash_policy(policy: OnCrash) {
    let _ = ON_CRASH_POLICY.set(policy);
}

pub(crate) fn on_crash_policy() -> OnCrash {
    ON_CRASH_POLICY.get().copied().unwrap_or_default()
}
