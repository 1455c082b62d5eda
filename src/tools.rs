//! Invocation of the external `zip`/`unzip` utilities.
//!
//! Only the exit status is inspected. stdout and stderr are discarded, and
//! stdin is closed so an interactive prompt (`zip -FF` asks questions on
//! some archives) reads EOF instead of blocking.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tracing::debug;

use crate::config::ToolConfig;
use crate::error::{Error, Result};
use crate::fs::mkdirs;

/// Runs the external utilities described by a [`ToolConfig`]
#[derive(Debug, Clone)]
pub struct Tools {
    config: ToolConfig,
}

impl Tools {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    /// `zip -FF <archive> --out <output>`
    pub async fn repair(&self, archive: &Path, output: &Path) -> Result<()> {
        let args = [
            OsStr::new("-FF"),
            archive.as_os_str(),
            OsStr::new("--out"),
            output.as_os_str(),
        ];
        self.run(&self.config.zip_program, &args).await
    }

    /// `unzip <archive> -d <target_dir>`, creating `target_dir` first.
    pub async fn extract(&self, archive: &Path, target_dir: &Path) -> Result<()> {
        mkdirs(target_dir)?;
        let args = [archive.as_os_str(), OsStr::new("-d"), target_dir.as_os_str()];
        self.run(&self.config.unzip_program, &args).await
    }

    async fn run(&self, program: &str, args: &[&OsStr]) -> Result<()> {
        debug!(
            "calling: \"{}\" {}",
            program,
            args.iter()
                .map(|arg| format!("\"{}\"", arg.to_string_lossy()))
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::ToolSpawn {
                program: program.to_string(),
                source,
            })?;

        let status: ExitStatus = match self.config.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    // kill_on_drop only signals; reap the child as well
                    let _ = child.kill().await;
                    return Err(Error::ToolTimedOut {
                        program: program.to_string(),
                        timeout,
                    });
                }
            },
            None => child.wait().await?,
        };

        debug!(program, %status, "tool exited");
        if status.success() {
            Ok(())
        } else {
            Err(Error::ToolFailed {
                program: program.to_string(),
                status,
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;
    use std::sync::{Mutex, MutexGuard};
    use tempfile::TempDir;

    // A script written while another test forks can fail to exec with ETXTBSY
    static SERIAL: Mutex<()> = Mutex::new(());

    fn serial() -> MutexGuard<'static, ()> {
        SERIAL.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn script(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_exit_status_drives_result() {
        let _guard = serial();
        let tmp = TempDir::new().unwrap();
        let ok = script(tmp.path(), "ok", "exit 0");
        let bad = script(tmp.path(), "bad", "exit 3");

        let tools = Tools::new(ToolConfig {
            unzip_program: ok,
            zip_program: bad,
            timeout: None,
        });

        let target = tmp.path().join("out/dir");
        tools.extract(Path::new("a.zip"), &target).await.unwrap();
        assert!(target.is_dir());

        let err = tools
            .repair(Path::new("a.zip"), &tmp.path().join("b.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolFailed { .. }));
    }

    #[tokio::test]
    async fn test_arguments_are_passed_in_order() {
        let _guard = serial();
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("args.txt");
        let zip = script(
            tmp.path(),
            "zip",
            &format!("echo \"$@\" > '{}'", log.display()),
        );

        let tools = Tools::new(ToolConfig {
            zip_program: zip,
            ..ToolConfig::default()
        });
        tools
            .repair(Path::new("in.xmind"), Path::new("out.zip"))
            .await
            .unwrap();

        let args = std::fs::read_to_string(&log).unwrap();
        assert_eq!(args.trim(), "-FF in.xmind --out out.zip");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let tools = Tools::new(ToolConfig {
            unzip_program: "/nonexistent/xmfix-unzip".to_string(),
            ..ToolConfig::default()
        });
        let tmp = TempDir::new().unwrap();
        let err = tools
            .extract(Path::new("a.zip"), &tmp.path().join("d"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolSpawn { .. }));
    }

    #[tokio::test]
    async fn test_timeout_kills_tool() {
        let _guard = serial();
        let tmp = TempDir::new().unwrap();
        let slow = script(tmp.path(), "slow", "sleep 30");

        let tools = Tools::new(ToolConfig {
            unzip_program: slow,
            zip_program: "zip".to_string(),
            timeout: Some(Duration::from_millis(200)),
        });
        let err = tools
            .extract(Path::new("a.zip"), &tmp.path().join("d"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolTimedOut { .. }));
    }
}
