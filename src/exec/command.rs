// src/exec/command.rs

//! Shell-command task actions declared in the config file
//! (`[task.<name>] cmd = "..."`).

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::engine::{ActionFuture, TaskAction, TaskName};

/// Runs `cmd` through the platform shell inside `working_dir`.
#[derive(Debug, Clone)]
pub struct CommandAction {
    name: TaskName,
    cmd: String,
    working_dir: PathBuf,
}

impl CommandAction {
    pub fn new(name: impl Into<TaskName>, cmd: impl Into<String>, working_dir: PathBuf) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            working_dir,
        }
    }

    async fn execute(self) -> Result<()> {
        info!(task = %self.name, cmd = %self.cmd, "starting task process");

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };

        cmd.current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for task '{}'", self.name))?;

        // Always consume both pipes so buffers don't fill; log at debug.
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(log_lines(self.name.clone(), "stdout", stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(log_lines(self.name.clone(), "stderr", stderr));
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for process of task '{}'", self.name))?;

        let code = status.code().unwrap_or(-1);
        info!(
            task = %self.name,
            exit_code = code,
            success = status.success(),
            "task process exited"
        );

        if !status.success() {
            bail!("command `{}` exited with code {}", self.cmd, code);
        }
        Ok(())
    }
}

impl TaskAction for CommandAction {
    fn run(&self) -> ActionFuture {
        Box::pin(self.clone().execute())
    }
}

async fn log_lines<R>(task: TaskName, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(task = %task, stream, "{}", line);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_exit_is_success() {
        let action = CommandAction::new("ok", "true", PathBuf::from("."));
        action.run().await.unwrap();
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error_with_the_code() {
        let action = CommandAction::new("bad", "exit 3", PathBuf::from("."));
        let err = action.run().await.unwrap_err();
        assert!(format!("{err:#}").contains("code 3"));
    }

    #[tokio::test]
    async fn runs_inside_the_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let action = CommandAction::new("touch", "echo hi > marker.txt", dir.path().to_path_buf());
        action.run().await.unwrap();
        assert!(dir.path().join("marker.txt").is_file());
    }
}
