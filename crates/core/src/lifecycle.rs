//! Service-under-test lifecycle: spawn, wait for readiness, tear down
//!
//! [`ServiceHandle`] owns the child process. Dropping it stops the
//! service, so every exit path out of a run (success, readiness timeout,
//! an error deep inside evaluation) reclaims the process.

use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Readiness polling parameters
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    /// Full URL that is polled
    pub url: String,
    /// Give up after this long
    pub timeout: Duration,
    /// Bound on a single probe request
    pub probe_timeout: Duration,
    /// Pause between probes
    pub interval: Duration,
}

impl ReadinessProbe {
    pub fn new(base_url: &str, wait_path: &str, timeout: Duration) -> Self {
        Self {
            url: format!("{}{}", base_url, wait_path),
            timeout,
            probe_timeout: Duration::from_secs(2),
            interval: Duration::from_secs(1),
        }
    }

    /// Any status in `[200, 500)` counts as ready
    pub fn is_ready_status(status: u16) -> bool {
        (200..500).contains(&status)
    }

    /// Poll until the service answers with a ready status. Returns the
    /// time elapsed since `started`.
    pub async fn wait(&self, started: Instant) -> Result<Duration> {
        let client = reqwest::Client::builder()
            .timeout(self.probe_timeout)
            .build()?;

        let deadline = Instant::now() + self.timeout;
        let mut attempts = 0usize;

        while Instant::now() < deadline {
            attempts += 1;

            match client
                .get(&self.url)
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await
            {
                Ok(resp) if Self::is_ready_status(resp.status().as_u16()) => {
                    let elapsed = started.elapsed();
                    info!(
                        "OK: runtime ready at {} (status {}) in {:.1} ms",
                        self.url,
                        resp.status().as_u16(),
                        elapsed.as_secs_f64() * 1000.0
                    );
                    return Ok(elapsed);
                }
                Ok(resp) => {
                    debug!(attempts, status = resp.status().as_u16(), "readiness probe not ready");
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for runtime to start...");
                    }
                    // Connection refused is expected while the service is starting
                    if !e.is_connect() {
                        warn!("Readiness probe error: {}", e);
                    }
                }
            }

            sleep(self.interval).await;
        }

        Err(Error::ReadinessTimeout {
            url: self.url.clone(),
            timeout: self.timeout,
        })
    }
}

/// Handle to a spawned service process
pub struct ServiceHandle {
    child: Child,
    command: String,
    grace: Duration,
    stopped: bool,
}

impl ServiceHandle {
    /// Run `command` through `sh -c` with `cwd` as working directory
    pub fn spawn(command: &str, cwd: &Path, grace: Duration) -> Result<Self> {
        info!("RUN: starting runtime with command: {}", command);

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Own process group, so teardown reaches whatever the shell started
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd.spawn().map_err(|source| Error::Spawn {
            command: command.to_string(),
            source,
        })?;

        Ok(Self {
            child,
            command: command.to_string(),
            grace,
            stopped: false,
        })
    }

    /// Spawn `command` and block until `probe` succeeds. Returns the handle
    /// and the spawn-to-ready latency. On timeout the process is stopped
    /// before the error is returned.
    pub async fn start(
        command: &str,
        cwd: &Path,
        grace: Duration,
        probe: &ReadinessProbe,
    ) -> Result<(Self, Duration)> {
        let started = Instant::now();
        let handle = Self::spawn(command, cwd, grace)?;
        let startup = probe.wait(started).await?;
        Ok((handle, startup))
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Whether the process has already exited on its own
    pub fn has_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }

    /// Terminate the service and everything it started. The whole process
    /// group is signalled even when the shell itself has already exited,
    /// and is killed if anything in it outlives the grace period.
    pub fn stop(&mut self) -> Result<Option<ExitStatus>> {
        if self.stopped {
            return Ok(None);
        }
        self.stopped = true;

        let pid = self.child.id();
        match self.child.try_wait()? {
            Some(status) => debug!(pid, %status, "runtime leader already exited, signalling its group"),
            None => info!("Stopping runtime (pid: {})", pid),
        }

        if self.terminate() {
            let deadline = Instant::now() + self.grace;
            loop {
                if self.child.try_wait()?.is_some() && !self.group_alive() {
                    return Ok(Some(self.child.wait()?));
                }
                if Instant::now() >= deadline {
                    break;
                }
                std::thread::sleep(Duration::from_millis(50));
            }

            warn!(
                "Runtime did not exit within {:?}, killing process group {}",
                self.grace, pid
            );
            self.kill();
        }

        Ok(Some(self.child.wait()?))
    }

    /// Signal the process group. `false` means the group no longer exists.
    #[cfg(unix)]
    fn signal_group(&self, signal: Option<nix::sys::signal::Signal>) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::killpg;
        use nix::unistd::Pid;

        match killpg(Pid::from_raw(self.child.id() as i32), signal) {
            Ok(()) => true,
            Err(Errno::ESRCH) => false,
            Err(e) => {
                debug!("signal {:?} to process group failed: {}", signal, e);
                true
            }
        }
    }

    /// SIGTERM the group. Returns whether there was anything left to signal.
    #[cfg(unix)]
    fn terminate(&mut self) -> bool {
        self.signal_group(Some(nix::sys::signal::Signal::SIGTERM))
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> bool {
        let _ = self.child.kill();
        true
    }

    #[cfg(unix)]
    fn group_alive(&self) -> bool {
        self.signal_group(None)
    }

    #[cfg(not(unix))]
    fn group_alive(&self) -> bool {
        false
    }

    #[cfg(unix)]
    fn kill(&mut self) {
        self.signal_group(Some(nix::sys::signal::Signal::SIGKILL));
        let _ = self.child.kill();
    }

    #[cfg(not(unix))]
    fn kill(&mut self) {
        let _ = self.child.kill();
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Failed to stop runtime `{}`: {}", self.command, e);
        }
    }
}
