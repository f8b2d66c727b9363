//! 외부 프로세스 실행: install 스크립트, 훅 커맨드, git, docker-compose 모두
//! 이 모듈의 `CommandRunner`를 통해 실행됩니다.

use futures_util::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{LifecycleError, Result};

/// Apply platform-specific flags to hide the console window on Windows.
/// Only used for captured executions; interactive spawns keep the console.
#[cfg(target_os = "windows")]
fn apply_creation_flags(cmd: &mut Command) -> &mut Command {
    const CREATE_NO_WINDOW: u32 = 0x08000000;
    cmd.creation_flags(CREATE_NO_WINDOW)
}

#[cfg(not(target_os = "windows"))]
fn apply_creation_flags(cmd: &mut Command) -> &mut Command {
    cmd
}

/// 실행할 외부 커맨드 명세
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub envs: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// 로그/에러 메시지용 한 줄 표현
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        for (k, v) in &self.envs {
            cmd.env(k, v);
        }
        cmd
    }
}

/// 캡처된 실행 결과
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// 외부 프로세스 실행 seam. 테스트에서는 기록용 구현으로 교체됩니다.
pub trait CommandRunner: Send + Sync {
    /// stdio를 상속하여 실행하고 종료까지 대기. 0이 아닌 종료 코드는 에러.
    fn spawn<'a>(&'a self, spec: &'a CommandSpec) -> BoxFuture<'a, Result<()>>;

    /// stdout/stderr를 캡처하여 실행. 0이 아닌 종료 코드는 에러.
    fn exec<'a>(&'a self, spec: &'a CommandSpec) -> BoxFuture<'a, Result<CommandOutput>>;
}

/// tokio 프로세스 기반 실제 실행기
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn spawn<'a>(&'a self, spec: &'a CommandSpec) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            tracing::debug!("Spawning: {}", spec.display());
            let mut cmd = spec.to_command();
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());

            let status = cmd.status().await.map_err(|e| {
                tracing::error!("Failed to start '{}': {}", spec.display(), e);
                LifecycleError::ExternalCommandFailure {
                    command: spec.display(),
                    code: None,
                }
            })?;

            if !status.success() {
                return Err(LifecycleError::ExternalCommandFailure {
                    command: spec.display(),
                    code: status.code(),
                });
            }
            Ok(())
        })
    }

    fn exec<'a>(&'a self, spec: &'a CommandSpec) -> BoxFuture<'a, Result<CommandOutput>> {
        Box::pin(async move {
            tracing::debug!("Executing: {}", spec.display());
            let mut cmd = spec.to_command();
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            apply_creation_flags(&mut cmd);

            let output = cmd.output().await.map_err(|e| {
                tracing::error!("Failed to start '{}': {}", spec.display(), e);
                LifecycleError::ExternalCommandFailure {
                    command: spec.display(),
                    code: None,
                }
            })?;

            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();

            if !output.status.success() {
                if !stderr.trim().is_empty() {
                    tracing::warn!("'{}' stderr: {}", spec.display(), stderr.trim());
                }
                return Err(LifecycleError::ExternalCommandFailure {
                    command: spec.display(),
                    code: output.status.code(),
                });
            }

            Ok(CommandOutput { stdout, stderr })
        })
    }
}
