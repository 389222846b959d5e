//! Bundler subprocess supervision.
//!
//! A monitor task owns each `Child` and is driven through a control
//! channel; the supervisor only keeps the handle. Restarting replaces the
//! handle, so state never carries over from one process to the next.

use crate::config::ControllerConfig;
use crate::controller::events::{EventChannel, Notification};
use crate::error::{ConfigError, ProcessError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

/// Stdout marker the bundler prints once it accepts requests.
pub const READY_MARKER: &str = "React packager ready.";

/// Lifecycle of one bundler process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubprocessState {
    Running,
    Terminating,
    /// Exit code; `None` when killed by a signal
    Exited(Option<i32>),
}

/// Snapshot of the current bundler process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubprocessStatus {
    pub pid: Option<u32>,
    pub state: SubprocessState,
}

#[derive(Debug)]
enum Control {
    Terminate,
    Kill,
}

struct SubprocessHandle {
    pid: Option<u32>,
    state: watch::Receiver<SubprocessState>,
    control: mpsc::UnboundedSender<Control>,
}

impl SubprocessHandle {
    fn is_alive(&self) -> bool {
        !matches!(*self.state.borrow(), SubprocessState::Exited(_))
    }

    /// Wait until the monitor reports an exit.
    async fn exited(&mut self) -> Option<i32> {
        loop {
            if let SubprocessState::Exited(code) = *self.state.borrow_and_update() {
                return code;
            }
            if self.state.changed().await.is_err() {
                // Monitor gone without reporting; treat as killed.
                return None;
            }
        }
    }
}

/// Starts, monitors and stops the bundler.
pub struct Supervisor {
    events: EventChannel,
    handle: Mutex<Option<SubprocessHandle>>,
}

impl Supervisor {
    pub fn new(events: EventChannel) -> Self {
        Self {
            events,
            handle: Mutex::new(None),
        }
    }

    /// Start the bundler, stopping any previous one first.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the packager port or project root
    /// is missing, a stop error when the old process won't exit, and
    /// [`ProcessError::Spawn`] when the runtime can't be launched.
    pub async fn start(&self, config: &ControllerConfig, reset_cache: bool) -> Result<()> {
        let packager_port = config.packager_port.ok_or(ProcessError::PortNotAssigned)?;
        if config.project_root.as_os_str().is_empty() {
            return Err(ConfigError::MissingField {
                field: "project_root".to_string(),
                hint: "The project root must be set to start the packager".to_string(),
            }
            .into());
        }

        let mut slot = self.handle.lock().await;
        self.stop_locked(&mut slot, config.stop_timeout()).await?;

        let cli_path = config.cli_path();
        let mut cmd = packager_command(config, &cli_path, packager_port, reset_cache);
        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            command: config.runtime.clone(),
            source,
        })?;

        let pid = child.id();
        info!("Packager started on port {} (pid {:?})", packager_port, pid);

        if let Some(stdout) = child.stdout.take() {
            let events = self.events.clone();
            tokio::spawn(async move { read_stdout(stdout, events).await });
        }
        if let Some(stderr) = child.stderr.take() {
            let events = self.events.clone();
            tokio::spawn(async move { read_stderr(stderr, events).await });
        }

        let (state_tx, state_rx) = watch::channel(SubprocessState::Running);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        tokio::spawn(monitor(child, control_rx, state_tx, self.events.clone()));

        *slot = Some(SubprocessHandle {
            pid,
            state: state_rx,
            control: control_tx,
        });
        Ok(())
    }

    /// Terminate the bundler and wait up to `timeout` for it to exit.
    ///
    /// Returns the exit code, or `None` when nothing was running or the
    /// process died from a signal.
    ///
    /// # Errors
    ///
    /// [`ProcessError::StopTimeout`] when the deadline passes; the process
    /// is left running and still owned by the supervisor.
    pub async fn stop(&self, timeout: Duration) -> Result<Option<i32>> {
        let mut slot = self.handle.lock().await;
        self.stop_locked(&mut slot, timeout).await
    }

    async fn stop_locked(
        &self,
        slot: &mut Option<SubprocessHandle>,
        timeout: Duration,
    ) -> Result<Option<i32>> {
        if !slot.as_ref().is_some_and(SubprocessHandle::is_alive) {
            debug!("Packager already stopped.");
            *slot = None;
            return Ok(None);
        }
        let Some(handle) = slot.as_mut() else {
            return Ok(None);
        };

        info!("Stopping packager...");
        self.events.emit(Notification::PackagerWillStop);
        let _ = handle.control.send(Control::Terminate);

        let exited = tokio::time::timeout(timeout, handle.exited()).await;
        match exited {
            Ok(code) => {
                *slot = None;
                Ok(code)
            }
            Err(_) => {
                warn!("Stopping packager timed out!");
                Err(ProcessError::StopTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                }
                .into())
            }
        }
    }

    /// Forcibly kill the bundler, if one is alive, and wait for it to exit.
    pub async fn kill(&self) -> Option<i32> {
        let mut slot = self.handle.lock().await;
        let mut handle = slot.take()?;
        if !handle.is_alive() {
            return None;
        }
        let _ = handle.control.send(Control::Kill);
        handle.exited().await
    }

    /// Pid and state of the current process, if any.
    pub async fn status(&self) -> Option<SubprocessStatus> {
        let slot = self.handle.lock().await;
        slot.as_ref().map(|handle| SubprocessStatus {
            pid: handle.pid,
            state: *handle.state.borrow(),
        })
    }

    /// Whether a bundler process is alive.
    pub async fn is_running(&self) -> bool {
        let slot = self.handle.lock().await;
        slot.as_ref().is_some_and(SubprocessHandle::is_alive)
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        // Children are also spawned with kill_on_drop; this covers the case
        // where the monitor task outlives the supervisor.
        if let Some(handle) = self.handle.get_mut().take() {
            let _ = handle.control.send(Control::Kill);
        }
    }
}

fn packager_command(
    config: &ControllerConfig,
    cli_path: &Path,
    packager_port: u16,
    reset_cache: bool,
) -> Command {
    let root = &config.project_root;

    let mut cmd = Command::new(&config.runtime);
    cmd.arg(cli_path)
        .arg("start")
        .arg("--port")
        .arg(packager_port.to_string())
        .arg("--projectRoots")
        .arg(root)
        .arg("--assetRoots")
        .arg(root);
    if reset_cache {
        cmd.arg("--reset-cache");
    }

    cmd.current_dir(working_dir(cli_path, root))
        .env_remove("NODE_PATH")
        .env("ELECTRON_RUN_AS_NODE", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Two levels above the CLI script (the react-native package), else the
/// project root.
fn working_dir(cli_path: &Path, project_root: &Path) -> PathBuf {
    cli_path
        .parent()
        .and_then(Path::parent)
        .filter(|dir| dir.is_dir())
        .unwrap_or(project_root)
        .to_path_buf()
}

async fn monitor(
    mut child: Child,
    mut control: mpsc::UnboundedReceiver<Control>,
    state: watch::Sender<SubprocessState>,
    events: EventChannel,
) {
    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            Some(command) = control.recv() => match command {
                Control::Terminate => {
                    state.send_replace(SubprocessState::Terminating);
                    if let Err(e) = terminate(&mut child) {
                        warn!("{}", e);
                    }
                }
                Control::Kill => {
                    state.send_replace(SubprocessState::Terminating);
                    if let Err(e) = child.start_kill() {
                        warn!("Failed to kill packager: {}", e);
                    }
                }
            },
        }
    };

    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            warn!("Error waiting for packager: {}", e);
            None
        }
    };
    info!("Packager process exited with code {:?}", code);
    state.send_replace(SubprocessState::Exited(code));
    events.emit(Notification::PackagerStopped { code });
}

#[cfg(unix)]
fn terminate(child: &mut Child) -> std::result::Result<(), ProcessError> {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return Ok(());
    };
    signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(|e| ProcessError::Signal {
        pid,
        message: e.to_string(),
    })
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) -> std::result::Result<(), ProcessError> {
    let pid = child.id().unwrap_or_default();
    child.start_kill().map_err(|e| ProcessError::Signal {
        pid,
        message: e.to_string(),
    })
}

async fn read_stdout<R>(stdout: R, events: EventChannel)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stdout).lines();
    let mut ready = false;
    while let Ok(Some(line)) = lines.next_line().await {
        let is_ready = !ready && line.contains(READY_MARKER);
        events.emit(Notification::Stdout(line));
        if is_ready {
            ready = true;
            events.emit(Notification::PackagerReady);
        }
    }
}

async fn read_stderr<R>(stderr: R, events: EventChannel)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        events.emit(Notification::Stderr(line));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let mut config = ControllerConfig::new("/tmp/app");
        config.packager_port = Some(19001);
        let cli_path = config.cli_path();
        let cmd = packager_command(&config, &cli_path, 19001, true);
        let std_cmd = cmd.as_std();

        assert_eq!(std_cmd.get_program(), "node");
        let args: Vec<_> = std_cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "/tmp/app/node_modules/react-native/local-cli/cli.js",
                "start",
                "--port",
                "19001",
                "--projectRoots",
                "/tmp/app",
                "--assetRoots",
                "/tmp/app",
                "--reset-cache",
            ]
        );

        let envs: Vec<_> = std_cmd.get_envs().collect();
        assert!(envs.contains(&(
            std::ffi::OsStr::new("ELECTRON_RUN_AS_NODE"),
            Some(std::ffi::OsStr::new("1"))
        )));
        assert!(envs.contains(&(std::ffi::OsStr::new("NODE_PATH"), None)));
    }

    #[test]
    fn test_working_dir_falls_back_to_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let cli = dir.path().join("node_modules/react-native/local-cli/cli.js");
        assert_eq!(working_dir(&cli, dir.path()), dir.path());

        std::fs::create_dir_all(cli.parent().unwrap()).unwrap();
        assert_eq!(
            working_dir(&cli, dir.path()),
            dir.path().join("node_modules/react-native")
        );
    }

    #[tokio::test]
    async fn test_start_requires_packager_port() {
        let supervisor = Supervisor::new(EventChannel::new());
        let config = ControllerConfig::new("/tmp/app");
        let err = supervisor.start(&config, false).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::CliError::Process(ProcessError::PortNotAssigned)
        ));
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let events = EventChannel::new();
        let mut rx = events.subscribe();
        let supervisor = Supervisor::new(events);

        assert_eq!(supervisor.stop(Duration::from_millis(10)).await.unwrap(), None);
        assert!(rx.try_recv().is_err());
        assert!(!supervisor.is_running().await);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let supervisor = Supervisor::new(EventChannel::new());
        let mut config = ControllerConfig::new("/tmp");
        config.packager_port = Some(19001);
        config.runtime = PathBuf::from("/definitely/not/a/runtime");

        let err = supervisor.start(&config, false).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::CliError::Process(ProcessError::Spawn { .. })
        ));
        assert!(supervisor.status().await.is_none());
    }
}
