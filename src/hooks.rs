//! 플러그인 훅: 활성화/비활성화 시점에 실행되는 핸들러
//!
//! 핸들러는 모두 `ModuleHook` 트레이트를 구현하며 `(descriptor, services)`를 받습니다.
//! 설정 파일과 모듈 디스크립터에 선언된 훅은 `CommandHook`(외부 커맨드)으로,
//! 라이브러리 사용자는 직접 구현한 훅을 등록할 수 있습니다.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::HookCommand;
use crate::error::{LifecycleError, Result};
use crate::post_install::{PostInstallAction, PostInstallQueue};
use crate::process::{CommandOutput, CommandRunner, CommandSpec};
use crate::registry::ModuleDescriptor;

/// 모든 핸들러에 전달되는 공유 서비스
#[derive(Clone)]
pub struct SharedServices {
    runner: Arc<dyn CommandRunner>,
    post_install: PostInstallQueue,
    root: PathBuf,
}

impl SharedServices {
    pub fn new(runner: Arc<dyn CommandRunner>, post_install: PostInstallQueue, root: PathBuf) -> Self {
        Self {
            runner,
            post_install,
            root,
        }
    }

    /// stdio 상속 실행
    pub async fn spawn(&self, spec: &CommandSpec) -> Result<()> {
        self.runner.spawn(spec).await
    }

    /// 출력 캡처 실행
    pub async fn exec(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.runner.exec(spec).await
    }

    pub fn register_post_install(&self, label: impl Into<String>, action: PostInstallAction) {
        self.post_install.register(label, action);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn runner(&self) -> Arc<dyn CommandRunner> {
        self.runner.clone()
    }
}

pub trait ModuleHook: Send + Sync {
    fn name(&self) -> &str;

    fn run<'a>(
        &'a self,
        descriptor: &'a ModuleDescriptor,
        services: &'a SharedServices,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// 외부 커맨드 훅. 모듈 정보는 환경 변수로 전달됩니다.
///
/// - `SUITECTL_MODULE`: 모듈 이름
/// - `SUITECTL_ROOT`: 환경 루트
/// - `SUITECTL_DESCRIPTOR`: 디스크립터 JSON
pub struct CommandHook {
    label: String,
    program: PathBuf,
    args: Vec<String>,
    cwd: PathBuf,
}

impl CommandHook {
    /// 상대 커맨드는 `base_dir` 기준으로 해석
    pub fn from_config(cmd: &HookCommand, base_dir: &Path) -> Self {
        let program = if looks_like_path(&cmd.command) {
            base_dir.join(&cmd.command)
        } else {
            PathBuf::from(&cmd.command)
        };
        Self {
            label: cmd.command.clone(),
            program,
            args: cmd.args.clone(),
            cwd: base_dir.to_path_buf(),
        }
    }
}

/// `scripts/x.sh`, `./x` 처럼 경로 구분자가 있는 상대 경로만 base 기준으로 해석.
/// `docker` 같은 단일 이름은 PATH 검색에 맡김.
fn looks_like_path(command: &str) -> bool {
    let p = Path::new(command);
    !p.is_absolute() && command.contains(['/', '\\'])
}

impl ModuleHook for CommandHook {
    fn name(&self) -> &str {
        &self.label
    }

    fn run<'a>(
        &'a self,
        descriptor: &'a ModuleDescriptor,
        services: &'a SharedServices,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        async move {
            let descriptor_json = serde_json::to_string(descriptor)?;
            let spec = CommandSpec::new(&self.program)
                .args(self.args.iter().cloned())
                .cwd(&self.cwd)
                .env("SUITECTL_MODULE", descriptor.display_name())
                .env("SUITECTL_ROOT", services.root().to_string_lossy())
                .env("SUITECTL_DESCRIPTOR", descriptor_json);
            services.spawn(&spec).await?;
            Ok(())
        }
        .boxed()
    }
}

/// 순서가 있는 핸들러 목록
#[derive(Clone, Default)]
pub struct HookSet {
    hooks: Vec<Arc<dyn ModuleHook>>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_commands(commands: &[HookCommand], base_dir: &Path) -> Self {
        let hooks = commands
            .iter()
            .map(|c| Arc::new(CommandHook::from_config(c, base_dir)) as Arc<dyn ModuleHook>)
            .collect();
        Self { hooks }
    }

    pub fn push(&mut self, hook: Arc<dyn ModuleHook>) {
        self.hooks.push(hook);
    }

    pub fn extend(&mut self, other: &HookSet) {
        self.hooks.extend(other.hooks.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// 모든 핸들러를 순서대로 실행. 하나가 실패해도 나머지는 실행하고,
    /// 실패가 있었다면 첫 번째 실패를 반환.
    pub async fn run_all(&self, descriptor: &ModuleDescriptor, services: &SharedServices) -> Result<()> {
        let module = descriptor.display_name();
        let mut first_failure: Option<LifecycleError> = None;

        for hook in &self.hooks {
            tracing::debug!("Running hook '{}' for module '{}'", hook.name(), module);
            if let Err(e) = hook.run(descriptor, services).await {
                tracing::error!("Hook '{}' failed for module '{}': {:#}", hook.name(), module, e);
                if first_failure.is_none() {
                    first_failure = Some(LifecycleError::HookFailed {
                        hook: hook.name().to_string(),
                        module: module.to_string(),
                        reason: format!("{:#}", e),
                    });
                }
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::SystemRunner;
    use std::sync::Mutex;

    struct Recorder {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl ModuleHook for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn run<'a>(
            &'a self,
            descriptor: &'a ModuleDescriptor,
            _services: &'a SharedServices,
        ) -> BoxFuture<'a, anyhow::Result<()>> {
            async move {
                self.log
                    .lock()
                    .unwrap()
                    .push(format!("{}:{}", self.name, descriptor.display_name()));
                if self.fail {
                    anyhow::bail!("{} failed", self.name);
                }
                Ok(())
            }
            .boxed()
        }
    }

    fn services() -> SharedServices {
        SharedServices::new(Arc::new(SystemRunner), PostInstallQueue::new(), PathBuf::from("/"))
    }

    fn descriptor(name: &str) -> ModuleDescriptor {
        ModuleDescriptor {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_all_hooks_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut set = HookSet::new();
        for n in ["one", "two"] {
            set.push(Arc::new(Recorder {
                name: n.into(),
                log: log.clone(),
                fail: false,
            }));
        }

        set.run_all(&descriptor("api"), &services()).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["one:api", "two:api"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_skip_remaining_hooks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut set = HookSet::new();
        set.push(Arc::new(Recorder {
            name: "bad".into(),
            log: log.clone(),
            fail: true,
        }));
        set.push(Arc::new(Recorder {
            name: "good".into(),
            log: log.clone(),
            fail: false,
        }));

        let err = set.run_all(&descriptor("api"), &services()).await.unwrap_err();
        assert!(matches!(err, LifecycleError::HookFailed { ref hook, .. } if hook == "bad"));
        assert_eq!(*log.lock().unwrap(), vec!["bad:api", "good:api"]);
    }

    #[test]
    fn test_command_hook_path_resolution() {
        let base = Path::new("/srv/env");
        let relative = CommandHook::from_config(
            &HookCommand {
                command: "scripts/register.sh".into(),
                args: vec![],
            },
            base,
        );
        assert_eq!(relative.program, PathBuf::from("/srv/env/scripts/register.sh"));

        let bare = CommandHook::from_config(
            &HookCommand {
                command: "docker".into(),
                args: vec!["ps".into()],
            },
            base,
        );
        assert_eq!(bare.program, PathBuf::from("docker"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_hook_receives_module_env() {
        let tmp = tempfile::tempdir().unwrap();
        let hook = CommandHook::from_config(
            &HookCommand {
                command: "sh".into(),
                args: vec!["-c".into(), "echo \"$SUITECTL_MODULE\" > hook.out".into()],
            },
            tmp.path(),
        );

        hook.run(&descriptor("gateway"), &services()).await.unwrap();
        let out = std::fs::read_to_string(tmp.path().join("hook.out")).unwrap();
        assert_eq!(out.trim(), "gateway");
    }
}
