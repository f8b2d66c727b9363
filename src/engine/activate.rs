use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::path::{Path, PathBuf};

use super::{ActivationReport, DeactivationOutcome, LifecycleEngine};
use crate::config::effective_handlers;
use crate::error::{LifecycleError, Result};
use crate::process::CommandSpec;
use crate::registry::ModuleDescriptor;

const INSTALL_SCRIPT: &str = "install";
const POSTINSTALL_SCRIPT: &str = "postinstall";

impl LifecycleEngine {
    /// 단일 모듈 활성화. 의존성은 재귀적으로 먼저 활성화합니다.
    ///
    /// `in_progress`는 현재 요청에서 활성화 중인 모듈 스택이며 의존성 순환을
    /// 감지하는 데 사용됩니다.
    pub(super) fn activate_module<'a>(
        &'a mut self,
        name: &'a str,
        in_progress: &'a mut Vec<String>,
        report: &'a mut ActivationReport,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            if let Some(pos) = in_progress.iter().position(|n| n == name) {
                let mut chain = in_progress[pos..].to_vec();
                chain.push(name.to_string());
                return Err(LifecycleError::DependencyCycle { chain });
            }

            let module_dir = self
                .registry
                .find(name)
                .map(|m| m.dir.clone())
                .ok_or_else(|| LifecycleError::ModuleNotFound(name.to_string()))?;
            let descriptor = self.registry.load_descriptor(name)?;
            // forced 모듈은 항상 활성이므로 파일에 기록된 경우만 이미 설치된 것으로 봄
            let was_installed = self.active.contains(name) && !self.active.is_forced(name);

            tracing::info!("Activating module {}", name);
            in_progress.push(name.to_string());

            for dep in &descriptor.dependencies {
                if self.active.contains(dep) {
                    tracing::debug!("Dependency {} of {} is already active", dep, name);
                    continue;
                }
                tracing::info!("{} is a dependency of {}, activating it..", dep, name);
                self.activate_module(dep, in_progress, report).await?;
            }

            for conflict in descriptor.conflicts() {
                tracing::info!("{} needs to be deactivated by {}", conflict, name);
                match self.deactivate(&conflict, false).await? {
                    DeactivationOutcome::Deactivated => report.deactivated.push(conflict),
                    DeactivationOutcome::NotFound => {
                        tracing::warn!("Conflicting module '{}' of {} is unknown, skipping", conflict, name);
                    }
                    DeactivationOutcome::NotActive | DeactivationOutcome::Forced => {}
                }
            }

            let (workdir, cloned) = self.acquire_repository(name, &descriptor).await?;

            let hooks = self.hook_chain(
                self.configured_activate_handlers(),
                &self.activate_hooks,
                Some((
                    effective_handlers(&descriptor.handler, &descriptor.handlers),
                    module_dir.as_path(),
                )),
            );
            if !hooks.is_empty() {
                tracing::debug!("Running {} activation hook(s) for {}", hooks.len(), name);
                hooks.run_all(&descriptor, &self.services()).await?;
            }

            let script_cwd = workdir.unwrap_or_else(|| self.root.clone());
            if was_installed && !cloned {
                tracing::info!("Module {} was already active, skipping install scripts", name);
            } else {
                self.run_install_scripts(name, &module_dir, &script_cwd).await?;
            }

            if self.active.insert(name) {
                tracing::debug!("Adding {} to the active set", name);
            } else {
                tracing::debug!("Module {} was already in the active set", name);
            }
            self.active.save()?;

            in_progress.pop();
            report.activated.push(name.to_string());
            tracing::info!("Activated {}", name);
            Ok(())
        }
        .boxed()
    }

    /// 레포지토리가 선언된 경우 작업 디렉토리를 해석하고 없으면 clone.
    /// (작업 디렉토리, 새로 clone 했는지) 반환.
    async fn acquire_repository(
        &self,
        name: &str,
        descriptor: &ModuleDescriptor,
    ) -> Result<(Option<PathBuf>, bool)> {
        let repository = match &descriptor.repository {
            Some(r) => r,
            None => return Ok((None, false)),
        };

        let repo = self.config.resolve_repository(repository);
        let dir_name = descriptor.working_directory_name().ok_or_else(|| {
            LifecycleError::ConfigurationMissing(format!(
                "Module '{}' has no usable working directory name for repository '{}'",
                name, repository
            ))
        })?;
        let dir = self.config.resolve_directory(&self.root, &dir_name)?;

        tracing::debug!("Repo: {}", repo);
        tracing::debug!("Repo dir: {}", dir.display());

        if dir.exists() {
            tracing::info!("Repository for {} already present at {}", name, dir.display());
            return Ok((Some(dir), false));
        }

        tracing::info!("Cloning {} into {}", repo, dir.display());
        let spec = CommandSpec::new("git")
            .arg("clone")
            .arg(repo)
            .args(self.config.clone_options())
            .arg(dir.to_string_lossy())
            .cwd(&self.root);
        self.runner.spawn(&spec).await?;
        Ok((Some(dir), true))
    }

    async fn run_install_scripts(&self, name: &str, module_dir: &Path, cwd: &Path) -> Result<()> {
        let install = module_dir.join(INSTALL_SCRIPT);
        if install.is_file() {
            tracing::info!("Running module install script ({})", install.display());
            let spec = self.script_spec(name, &install, cwd);
            self.runner.spawn(&spec).await?;
        }

        // 의존성을 포함한 전체 활성화가 성공한 뒤에만 실행
        let postinstall = module_dir.join(POSTINSTALL_SCRIPT);
        if postinstall.is_file() {
            tracing::info!("Registering post-install script ({})", postinstall.display());
            let spec = self.script_spec(name, &postinstall, cwd);
            let runner = self.runner.clone();
            self.post_install.register(
                format!("{} postinstall", name),
                Box::new(move || {
                    async move {
                        runner.spawn(&spec).await?;
                        Ok::<(), anyhow::Error>(())
                    }
                    .boxed()
                }),
            );
        }
        Ok(())
    }

    fn script_spec(&self, name: &str, script: &Path, cwd: &Path) -> CommandSpec {
        CommandSpec::new(script)
            .cwd(cwd)
            .env("SUITECTL_MODULE", name)
            .env("SUITECTL_ROOT", self.root.to_string_lossy())
    }
}
