//! docker-compose 재시작 (`--restart`)
//!
//! `stop` 후 `up -d --remove-orphans`로 다시 올립니다. `restart`와 달리 새로 생성된
//! compose 파일의 서비스 변경이 반영됩니다.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::process::{CommandRunner, CommandSpec};

const COMPOSE_BIN: &str = "docker-compose";

pub struct ComposeController {
    working_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl ComposeController {
    pub fn new(working_dir: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            working_dir: working_dir.into(),
            runner,
        }
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(COMPOSE_BIN).cwd(&self.working_dir)
    }

    /// `docker-compose stop` (컨테이너는 유지)
    pub async fn stop(&self) -> Result<()> {
        tracing::info!("Docker Compose stop: {}", self.working_dir.display());
        self.runner.spawn(&self.command().arg("stop")).await
    }

    /// `docker-compose up -d --remove-orphans`
    pub async fn up(&self) -> Result<()> {
        tracing::info!("Docker Compose up: {}", self.working_dir.display());
        self.runner
            .spawn(&self.command().args(["up", "-d", "--remove-orphans"]))
            .await
    }

    pub async fn restart(&self) -> Result<()> {
        tracing::info!("Restarting docker-compose for you...");
        self.stop().await?;
        self.up().await
    }
}
