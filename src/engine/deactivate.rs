use std::path::PathBuf;

use super::{DeactivationOutcome, LifecycleEngine};
use crate::config::normalize_lexically;
use crate::error::{LifecycleError, Result};
use crate::registry::ModuleDescriptor;

impl LifecycleEngine {
    /// 단일 모듈 비활성화.
    ///
    /// `delete`가 설정되면 삭제 대상 경로를 훅 실행이나 상태 변경 전에 먼저
    /// 검증합니다. 검증에 실패하면 파일시스템은 그대로 남습니다.
    pub async fn deactivate(&mut self, name: &str, delete: bool) -> Result<DeactivationOutcome> {
        let module_dir = match self.registry.find(name) {
            Some(m) => m.dir.clone(),
            None => {
                tracing::info!("Module {} is unknown, nothing to deactivate", name);
                return Ok(DeactivationOutcome::NotFound);
            }
        };

        if !self.active.contains(name) {
            tracing::info!("Module {} is not active.", name);
            return Ok(DeactivationOutcome::NotActive);
        }

        if self.active.is_forced(name) {
            tracing::info!("{} is a mandatory module and will not be deactivated.", name);
            return Ok(DeactivationOutcome::Forced);
        }

        let descriptor = self.registry.load_descriptor(name)?;
        let delete_target = if delete {
            self.deletion_target(name, &descriptor)?
        } else {
            None
        };

        let hooks = self.hook_chain(self.configured_deactivate_handlers(), &self.deactivate_hooks, None);
        if !hooks.is_empty() {
            tracing::debug!(
                "Running {} deactivation hook(s) for {} ({})",
                hooks.len(),
                name,
                module_dir.display()
            );
            hooks.run_all(&descriptor, &self.services()).await?;
        }

        self.active.remove(name);
        self.active.save()?;

        if let Some(dir) = delete_target {
            if dir.exists() {
                tracing::info!("Deleting directory {}", dir.display());
                tokio::fs::remove_dir_all(&dir).await?;
            } else {
                tracing::info!("Directory {} does not exist, nothing to delete", dir.display());
            }
        }

        tracing::info!("Deactivated {}", name);
        Ok(DeactivationOutcome::Deactivated)
    }

    /// 삭제할 작업 디렉토리를 해석하고 환경 루트 안에 있는지 검증
    fn deletion_target(&self, name: &str, descriptor: &ModuleDescriptor) -> Result<Option<PathBuf>> {
        let dir_name = match descriptor.working_directory_name() {
            Some(d) => d,
            None => {
                tracing::info!("Module {} has no repository or directory, nothing to delete", name);
                return Ok(None);
            }
        };

        let target = self.config.resolve_directory(&self.root, &dir_name)?;
        let root = normalize_lexically(&self.root);

        if !target.is_absolute() || !target.starts_with(&root) || target == root {
            tracing::error!(
                "Refusing to delete {} for module {}: outside of {}",
                target.display(),
                name,
                root.display()
            );
            return Err(LifecycleError::UnsafeDeletePath { path: target, root });
        }

        // 작업 디렉토리 자체나 모듈 정의 트리는 삭제 대상이 될 수 없음
        let workspace = self.config.resolve_directory(&self.root, ".")?;
        let modules = normalize_lexically(&self.config.modules_path(&self.root));
        if workspace.starts_with(&target) || modules.starts_with(&target) || target.starts_with(&modules) {
            tracing::error!(
                "Refusing to delete {} for module {}: it contains the workspace or module definitions",
                target.display(),
                name
            );
            return Err(LifecycleError::UnsafeDeletePath { path: target, root });
        }
        Ok(Some(target))
    }
}
