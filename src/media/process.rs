//! External media server process
//!
//! The gateway never touches RTMP bytes. When configured, it launches the
//! media server (nginx-rtmp, MediaMTX, ...) at startup and kills it on
//! shutdown; publishers push to it directly using the URL from the start
//! response.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::error::Result;

/// Supervisor for the external media server
#[derive(Debug)]
pub struct MediaServer {
    command: PathBuf,
    args: Vec<String>,
    child: Mutex<Option<Child>>,
}

impl MediaServer {
    /// Create a supervisor for `command args...`
    pub fn new(command: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            child: Mutex::new(None),
        }
    }

    /// Program path
    pub fn command(&self) -> &Path {
        &self.command
    }

    /// Launch the process
    ///
    /// Does nothing if it is already running.
    pub async fn start(&self) -> Result<()> {
        let mut child = self.child.lock().await;

        if let Some(ref mut running) = *child {
            if running.try_wait()?.is_none() {
                return Ok(());
            }
        }

        let spawned = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        tracing::info!(
            command = %self.command.display(),
            pid = ?spawned.id(),
            "Media server started"
        );

        *child = Some(spawned);
        Ok(())
    }

    /// Check if the process is alive
    pub async fn is_running(&self) -> bool {
        match self.child.lock().await.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Kill the process and wait for it to exit
    pub async fn stop(&self) {
        let Some(mut child) = self.child.lock().await.take() else {
            return;
        };

        if let Err(e) = child.kill().await {
            tracing::warn!(error = %e, "Failed to stop media server");
            return;
        }

        tracing::info!(command = %self.command.display(), "Media server stopped");
    }
}
