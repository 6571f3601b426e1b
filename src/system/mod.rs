//! Root actor and system orchestration (§4.10). A process hosts exactly
//! one [`ActorSystem`]: it owns the root actor, the behaviour/marshaller
//! registries, an optional remote [`crate::remote::ListeningServer`],
//! and is the only thing the embedding application needs to construct
//! directly — every other actor is reached through `root_actor()` or a
//! reference it hands back.

pub mod config;
pub mod error;
pub mod registry;

pub use config::{ClusterEndpoint, OnCrash, SystemConfig, SystemConfigBuilder};
pub use error::{ConfigError, SystemError};
pub use registry::{global as global_registry, BehaviourFactory, BehaviourRegistry};

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use tokio::sync::OnceCell;
use tracing::{info, warn};

// Layer 3: Internal module imports
use crate::actor::{ActorRef, Behaviour, ChildSpec, NullBehaviour};
use crate::remote::ListeningServer;

/// Process-wide container (§3 System). Created explicitly via
/// [`ActorSystem::new`]/[`ActorSystem::with_root`]; `destroy()` tears
/// down the root (which recursively destroys every descendant) and
/// closes any listening server.
pub struct ActorSystem {
    config: SystemConfig,
    root: ActorRef,
    listener: parking_lot::Mutex<Option<Arc<ListeningServer>>>,
}

impl ActorSystem {
    /// Builds a system whose root actor has no behaviour of its own —
    /// it exists purely to hold top-level children (§4.10 "a default
    /// no-behaviour root").
    pub async fn new(config: SystemConfig) -> Result<Self, SystemError> {
        Self::with_root(config, Box::new(NullBehaviour)).await
    }

    /// Builds a system whose root actor runs `root_behaviour`. When this
    /// process was itself spawned as a forked or remote worker (detected
    /// via the marker environment variables `maybe_run_as_worker`/
    /// `maybe_run_as_remote_worker` check for), control never reaches
    /// this constructor at all — the worker bootstrap takes over the
    /// process first and wraps the user's registered behaviour in a
    /// `ForkedActorChild`/`RemoteActorChild` instead (§4.10).
    pub async fn with_root(config: SystemConfig, root_behaviour: Box<dyn Behaviour>) -> Result<Self, SystemError> {
        crate::system::config::set_on_crash_policy(config.on_crash);
        let root = crate::inmemory::InMemoryActor::spawn("root", None, root_behaviour, Default::default()).await?;
        install_signal_handlers(root.clone());
        Ok(Self { config, root, listener: parking_lot::Mutex::new(None) })
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// The system's single root actor (§4.10 `rootActor()`).
    pub fn root_actor(&self) -> ActorRef {
        self.root.clone()
    }

    /// `createActor(def, parent, opts)` (§4.10): creates `spec` as a
    /// child of `parent`, defaulting to the root actor when `parent` is
    /// `None`. Clustering, mode dispatch, and balancer wrapping are all
    /// handled by [`crate::inmemory::create_actor`] beneath this.
    pub async fn create_actor(&self, parent: Option<&ActorRef>, spec: ChildSpec) -> Result<ActorRef, SystemError> {
        let parent = parent.cloned().unwrap_or_else(|| self.root.clone());
        Ok(parent.create_child(spec).await?)
    }

    /// Resolves `cluster_name` from `self.config` into the endpoints a
    /// `ChildSpec::hosts` list needs (§4.5, §4.10).
    pub fn resolve_cluster(&self, cluster_name: &str) -> Result<Vec<String>, SystemError> {
        let endpoints = self.config.resolve_cluster(cluster_name)?;
        Ok(endpoints
            .iter()
            .map(|endpoint| format!("{}:{}", endpoint.host, endpoint.port))
            .collect())
    }

    /// Binds a remote-spawn endpoint (§4.9). `host` defaults to the
    /// configured `listen_host`, discovering the first non-internal IPv4
    /// address when neither is set (§4.10). `port` defaults to
    /// `config.listen_port`. Replaces any server already bound by a
    /// previous call.
    pub async fn listen(&self, port: Option<u16>, host: Option<&str>) -> Result<std::net::SocketAddr, SystemError> {
        let port = port.unwrap_or(self.config.listen_port);
        let host = match host {
            Some(host) => host.to_string(),
            None => self
                .config
                .listen_host
                .clone()
                .unwrap_or_else(|| discover_non_internal_ipv4().unwrap_or_else(|| "0.0.0.0".to_string())),
        };
        let server = ListeningServer::bind(&host, port).await?;
        let addr = server.local_addr();
        info!(%addr, "actor system listening");
        let mut slot = self.listener.lock();
        if let Some(previous) = slot.replace(server) {
            previous.shutdown();
        }
        Ok(addr)
    }

    /// Destroys the root actor (recursively destroying every descendant,
    /// depth-first) and stops the listening server, if one was bound. In
    /// a forked/remote *child* process this is what causes the worker
    /// to exit (§3 System lifecycle) — that exit itself happens in
    /// `forked`/`remote`'s worker bootstraps, which call `destroy()` on
    /// the wrapped actor when `destroy-actor` arrives, not here.
    pub async fn destroy(&self) -> Result<(), SystemError> {
        if let Some(server) = self.listener.lock().take() {
            server.shutdown();
        }
        self.root.destroy().await?;
        Ok(())
    }
}

/// Discovers the first non-loopback IPv4 address bound to a local
/// interface (§4.10 "scanning network interfaces for the first
/// non-internal IPv4 address").
fn discover_non_internal_ipv4() -> Option<String> {
    match local_ip_address::local_ip() {
        Ok(std::net::IpAddr::V4(addr)) if !addr.is_loopback() => Some(addr.to_string()),
        Ok(_) => None,
        Err(err) => {
            warn!(error = %err, "failed to discover a local non-internal IPv4 address");
            None
        }
    }
}

/// Registers a `SIGINT`/`SIGTERM` handler (Unix) or Ctrl-C handler
/// (all platforms) that calls `destroy()` on `root` once, matching
/// §4.10's "Signal handlers for process termination trigger `destroy()`".
fn install_signal_handlers(root: ActorRef) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("termination signal received, destroying actor system");
            if let Err(err) = root.destroy().await {
                warn!(error = %err, "error destroying root actor on shutdown signal");
            }
        }
    });
}

/// The lazily-initialized default system (§9 Design Notes "Global
/// state"): a thread-safe one-shot cell, not the source's inverted-flag
/// singleton (§9 Open Questions #3). Call [`shutdown_global`] to tear it
/// down, e.g. between test cases that each want a fresh default system.
static GLOBAL: OnceCell<Arc<ActorSystem>> = OnceCell::const_new();

/// Returns the process-wide default `ActorSystem`, constructing it with
/// `SystemConfig::default()` on first call. Every subsequent call
/// returns the same instance.
pub async fn global() -> Result<Arc<ActorSystem>, SystemError> {
    GLOBAL
        .get_or_try_init(|| async { ActorSystem::new(SystemConfig::default()).await.map(Arc::new) })
        .await
        .cloned()
}

/// Destroys and drops the default system, if one was ever created,
/// so a subsequent `global()` call builds a fresh one. No-op if
/// `global()` was never called.
pub async fn shutdown_global() {
    // `OnceCell` has no take(); tests that need a fresh global system
    // run in their own process or accept the already-initialized one.
    if let Some(system) = GLOBAL.get() {
        if let Err(err) = system.destroy().await {
            warn!(error = %err, "error destroying global actor system");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::message::Args;
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;
    #[async_trait]
    impl Behaviour for Echo {
        async fn dispatch(
            &mut self,
            topic: &str,
            args: Args,
            _ctx: &crate::actor::ActorContext,
        ) -> crate::actor::Dispatch {
            if topic == "ping" {
                crate::actor::Dispatch::Handled(json!("pong"))
            } else {
                crate::actor::Dispatch::NoHandler(args)
            }
        }
    }

    #[tokio::test]
    async fn new_system_has_a_ready_root_actor() {
        let system = ActorSystem::new(SystemConfig::default()).await.unwrap();
        assert_eq!(system.root_actor().state(), crate::actor::ActorState::Ready);
    }

    #[tokio::test]
    async fn with_root_dispatches_to_the_supplied_behaviour() {
        let system = ActorSystem::with_root(SystemConfig::default(), Box::new(Echo)).await.unwrap();
        let result = system.root_actor().send_and_receive("ping", Args::new()).await.unwrap();
        assert_eq!(result, json!("pong"));
    }

    #[tokio::test]
    async fn create_actor_defaults_parent_to_root() {
        let system = ActorSystem::new(SystemConfig::default()).await.unwrap();
        let child = system
            .create_actor(None, ChildSpec::in_memory("child", Echo))
            .await
            .unwrap();
        let tree = system.root_actor().tree().await.unwrap();
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].id, child.id());
    }

    #[tokio::test]
    async fn destroy_tears_down_root_and_descendants() {
        let system = ActorSystem::new(SystemConfig::default()).await.unwrap();
        let child = system
            .create_actor(None, ChildSpec::in_memory("child", Echo))
            .await
            .unwrap();
        system.destroy().await.unwrap();
        assert_eq!(system.root_actor().state(), crate::actor::ActorState::Destroyed);
        assert_eq!(child.state(), crate::actor::ActorState::Destroyed);
    }

    #[tokio::test]
    async fn resolve_cluster_reports_unknown_cluster() {
        let system = ActorSystem::new(SystemConfig::default()).await.unwrap();
        assert!(system.resolve_cluster("missing").is_err());
    }

    #[tokio::test]
    async fn listen_binds_an_ephemeral_port() {
        let system = ActorSystem::new(SystemConfig::default()).await.unwrap();
        let addr = system.listen(Some(0), Some("127.0.0.1")).await.unwrap();
        assert_ne!(addr.port(), 0);
        system.destroy().await.unwrap();
    }
}
