// Layer 1: Standard library imports
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use tokio::process::{Child, Command};
use tracing::{info, warn};

// Layer 3: Internal module imports
use super::{WORKER_MARKER_ENV, WORKER_SCM_FD_ENV};
use crate::actor::{ActorProxy, ChildSpec, Connection};
use crate::actor::{ActorError, ActorRef};
use crate::bus::PipeBus;
use crate::marshal::default_registry;
use crate::message::{CreateActorBody, DefinitionFormat, Envelope, EnvelopeBody};
use crate::util::{ActorId, ActorMode};

/// Parent-side handle to a forked child process (§4.4). Construction
/// spawns the worker, completes the `create-actor` handshake, and
/// returns only once the child has acknowledged — matching §4.1's
/// "`new → ready`: completion of `initialize()`" for the proxy itself.
pub struct ForkedActorParent;

impl ForkedActorParent {
    pub async fn spawn(parent: Option<ActorRef>, spec: ChildSpec) -> Result<ActorRef, ActorError> {
        if spec.behaviour.is_some() {
            return Err(ActorError::Config(
                "forked actors are constructed from a module_path, not an in-process behaviour object".to_string(),
            ));
        }
        let module_path = spec.module_path.clone().ok_or_else(|| {
            ActorError::Config("module_path is required to spawn a forked actor".to_string())
        })?;

        let exe = std::env::current_exe().map_err(|e| ActorError::Transport(e.to_string()))?;
        let id = ActorId::new();

        #[cfg(unix)]
        let (parent_scm, child_scm_fd) = open_scm_channel()?;

        let mut command = Command::new(&exe);
        command
            .env(WORKER_MARKER_ENV, "1")
            .arg(&spec.name)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        #[cfg(unix)]
        {
            command.env(WORKER_SCM_FD_ENV, child_scm_fd.to_string());
            clear_close_on_exec(child_scm_fd)?;
        }

        let mut child: Child = command
            .spawn()
            .map_err(|e| ActorError::Transport(format!("failed to spawn forked worker: {e}")))?;
        let pid = child.id();
        info!(actor = %id, name = %spec.name, pid, "forked worker spawned");

        // The worker inherited its own copy of the fd across fork/exec;
        // this process no longer needs the one it held purely for that
        // inheritance to happen.
        #[cfg(unix)]
        let _ = nix::unistd::close(child_scm_fd);

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ActorError::Transport("forked worker has no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ActorError::Transport("forked worker has no stdout".to_string()))?;

        #[cfg(unix)]
        let bus = PipeBus::new(Box::new(stdin), Box::new(stdout), Some(parent_scm));
        #[cfg(not(unix))]
        let bus = PipeBus::new(Box::new(stdin), Box::new(stdout));

        let connection = Connection::new(bus);
        let registry = Arc::new(default_registry());

        let body = CreateActorBody {
            id,
            definition: module_path,
            definition_format: DefinitionFormat::ModulePath,
            parent_id: parent.as_ref().map(ActorRef::id),
            mode: ActorMode::Forked,
            config: serde_json::Value::Null,
            resources: serde_json::Value::Null,
            marshallers: Vec::new(),
            custom_parameters: spec.custom_parameters,
            custom_parameters_marshalled_types: None,
            ping_timeout_ms: spec.ping_timeout.map(|d| d.as_millis() as u64),
            log_level: None,
            test: false,
            debug: false,
            additional_requires: Vec::new(),
            clusters: HashMap::new(),
            name: Some(spec.name.clone()),
        };

        let reply = connection
            .call(Envelope::new(id, EnvelopeBody::CreateActor(Box::new(body))))
            .await
            .map_err(|e| ActorError::transport_for(id, e))?;
        match reply {
            EnvelopeBody::ActorResponse { error: Some(error), .. } => {
                return Err(ActorError::Handler(error));
            }
            EnvelopeBody::ActorResponse { .. } => {}
            other => {
                return Err(ActorError::Transport(format!(
                    "unexpected reply to create-actor: {}",
                    other.type_name()
                )));
            }
        }

        let proxy = ActorProxy::new(id, spec.name, ActorMode::Forked, connection, registry);
        spawn_exit_watcher(child, proxy.clone());
        Ok(ActorRef::new(proxy))
    }
}

/// Forked peers do not auto-respawn (§4.4) — a dead worker simply marks
/// its proxy `crashed` so `require_ready` starts rejecting calls.
fn spawn_exit_watcher(mut child: Child, proxy: Arc<ActorProxy>) {
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => warn!(status = %status, "forked worker exited"),
            Err(err) => warn!(error = %err, "failed to wait on forked worker"),
        }
        proxy.mark_crashed();
    });
}

#[cfg(unix)]
fn open_scm_channel() -> Result<(tokio::net::UnixStream, std::os::fd::RawFd), ActorError> {
    use std::os::fd::IntoRawFd;

    let (parent, child) = std::os::unix::net::UnixStream::pair()
        .map_err(|e| ActorError::Transport(format!("failed to create handle-transfer channel: {e}")))?;
    parent
        .set_nonblocking(true)
        .map_err(|e| ActorError::Transport(e.to_string()))?;
    let parent = tokio::net::UnixStream::from_std(parent).map_err(|e| ActorError::Transport(e.to_string()))?;
    Ok((parent, child.into_raw_fd()))
}

/// Clears `FD_CLOEXEC` on the worker's end of the side channel so it
/// survives the upcoming `execve` instead of being silently closed.
#[cfg(unix)]
fn clear_close_on_exec(fd: std::os::fd::RawFd) -> Result<(), ActorError> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};
    fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty()))
        .map_err(|e| ActorError::Transport(format!("failed to clear close-on-exec: {e}")))?;
    Ok(())
}
