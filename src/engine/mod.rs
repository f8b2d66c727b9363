//! 모듈 라이프사이클 엔진
//!
//! 레지스트리, 번들 테이블, 활성 목록 저장소를 소유하고 활성화/비활성화 요청을
//! 단일 모듈 단위의 순차 작업으로 풀어서 실행합니다. 모든 변경은 `&mut self`를
//! 거치므로 활성 목록의 읽기-수정-기록이 직렬화됩니다.

mod activate;
mod deactivate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::active_set::{ActiveSetStore, ACTIVE_FILE};
use crate::bundle::{BundleTable, Target, BUNDLES_FILE};
use crate::config::{effective_handlers, HookCommand, SuiteConfig};
use crate::error::Result;
use crate::hooks::{HookSet, ModuleHook, SharedServices};
use crate::post_install::{DrainReport, PostInstallQueue};
use crate::process::CommandRunner;
use crate::registry::{Module, ModuleRegistry};

/// 활성화 요청 결과 (완료 순서)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    pub activated: Vec<String>,
    /// 상호 배타 선언으로 비활성화된 모듈
    pub deactivated: Vec<String>,
}

/// 단일 모듈 비활성화 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeactivationOutcome {
    Deactivated,
    NotActive,
    Forced,
    NotFound,
}

pub struct LifecycleEngine {
    root: PathBuf,
    config: SuiteConfig,
    registry: ModuleRegistry,
    bundles: BundleTable,
    active: ActiveSetStore,
    runner: Arc<dyn CommandRunner>,
    activate_hooks: HookSet,
    deactivate_hooks: HookSet,
    post_install: PostInstallQueue,
}

impl LifecycleEngine {
    /// 번들, 활성 목록, 모듈 목록을 디스크에서 읽어 엔진 구성
    pub fn new(root: impl Into<PathBuf>, config: SuiteConfig, runner: Arc<dyn CommandRunner>) -> Result<Self> {
        let root = root.into();
        let modules_dir = config.modules_path(&root);

        let bundles = BundleTable::load(&modules_dir.join(BUNDLES_FILE));
        let mut active = ActiveSetStore::new(modules_dir.join(ACTIVE_FILE), bundles.forced());
        active.load();

        let mut registry = ModuleRegistry::new(&modules_dir, config.external_paths(&root));
        let count = registry.discover()?;
        tracing::info!(
            "Environment at {}: {} module(s), {} active",
            root.display(),
            count,
            active.names().len()
        );

        Ok(Self {
            root,
            config,
            registry,
            bundles,
            active,
            runner,
            activate_hooks: HookSet::new(),
            deactivate_hooks: HookSet::new(),
            post_install: PostInstallQueue::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn bundles(&self) -> &BundleTable {
        &self.bundles
    }

    pub fn active(&self) -> &ActiveSetStore {
        &self.active
    }

    pub fn runner(&self) -> Arc<dyn CommandRunner> {
        self.runner.clone()
    }

    pub fn post_install(&self) -> &PostInstallQueue {
        &self.post_install
    }

    pub fn list_modules(&self) -> Vec<Module> {
        self.registry.list(&self.active)
    }

    pub fn get_module(&self, name: &str) -> Result<Module> {
        self.registry.get(name, &self.active)
    }

    pub fn refresh(&mut self) -> Result<usize> {
        self.registry.refresh()
    }

    /// 설정 훅 다음, 디스크립터 훅 이전에 실행
    pub fn register_activate_hook(&mut self, hook: Arc<dyn ModuleHook>) {
        self.activate_hooks.push(hook);
    }

    pub fn register_deactivate_hook(&mut self, hook: Arc<dyn ModuleHook>) {
        self.deactivate_hooks.push(hook);
    }

    pub fn services(&self) -> SharedServices {
        SharedServices::new(self.runner.clone(), self.post_install.clone(), self.root.clone())
    }

    /// 모듈 또는 번들 이름을 받아 순서대로 활성화
    pub async fn activate_request(&mut self, token: &str) -> Result<ActivationReport> {
        let target = self.resolve(token)?;
        if let Target::Bundle { name, members } = &target {
            tracing::info!("Activating bundle '{}' ({})", name, members.join(", "));
        }

        let mut report = ActivationReport::default();
        for module in target.module_names() {
            let mut in_progress = Vec::new();
            self.activate_module(&module, &mut in_progress, &mut report).await?;
        }
        Ok(report)
    }

    /// 정확한 모듈 이름 하나를 활성화
    pub async fn activate(&mut self, name: &str) -> Result<ActivationReport> {
        let mut report = ActivationReport::default();
        let mut in_progress = Vec::new();
        self.activate_module(name, &mut in_progress, &mut report).await?;
        Ok(report)
    }

    /// 모듈 또는 번들 이름을 받아 순서대로 비활성화
    pub async fn deactivate_request(
        &mut self,
        token: &str,
        delete: bool,
    ) -> Result<Vec<(String, DeactivationOutcome)>> {
        let target = self.resolve(token)?;
        let mut outcomes = Vec::new();
        for module in target.module_names() {
            let outcome = self.deactivate(&module, delete).await?;
            outcomes.push((module, outcome));
        }
        Ok(outcomes)
    }

    /// 대기 중인 post-install 작업 실행
    pub async fn drain_post_install(&self) -> DrainReport {
        self.post_install.drain().await
    }

    fn resolve(&self, token: &str) -> Result<Target> {
        let registry = &self.registry;
        self.bundles.resolve(token, |name| registry.contains(name))
    }

    /// 설정 훅 + 등록 훅 (+ 디스크립터 훅)
    fn hook_chain(
        &self,
        configured: Vec<HookCommand>,
        registered: &HookSet,
        declared: Option<(Vec<HookCommand>, &Path)>,
    ) -> HookSet {
        let mut chain = HookSet::from_commands(&configured, &self.root);
        chain.extend(registered);
        if let Some((commands, module_dir)) = declared {
            chain.extend(&HookSet::from_commands(&commands, module_dir));
        }
        chain
    }

    fn configured_activate_handlers(&self) -> Vec<HookCommand> {
        effective_handlers(&self.config.activate.handler, &self.config.activate.handlers)
    }

    fn configured_deactivate_handlers(&self) -> Vec<HookCommand> {
        effective_handlers(&self.config.deactivate.handler, &self.config.deactivate.handlers)
    }
}
