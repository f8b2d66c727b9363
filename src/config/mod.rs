//! `suitectl.toml` 설정: 환경 루트 탐색, 레포지토리/작업 디렉토리 해석,
//! 훅 커맨드와 generate 지시 정의.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::error::{LifecycleError, Result};

/// 환경 루트를 표시하는 설정 파일 이름
pub const CONFIG_FILE: &str = "suitectl.toml";

/// 루트 오버라이드 환경 변수
pub const ROOT_ENV: &str = "SUITECTL_ROOT";

/// git clone 추가 옵션 환경 변수 (공백 구분)
pub const GIT_CLONE_OPTIONS_ENV: &str = "GIT_CLONE_OPTIONS";

#[derive(Deserialize, Debug, Clone)]
pub struct SuiteConfig {
    /// 내부 모듈 디렉토리 (루트 기준 상대 경로)
    #[serde(default = "default_modules_dir")]
    pub modules_dir: String,
    /// 외부 모듈을 제공하는 디렉토리 목록 (루트 기준 상대 경로 또는 절대 경로)
    #[serde(default)]
    pub external_module_dirs: Vec<String>,
    #[serde(default)]
    pub git_clone_options: Vec<String>,
    #[serde(default)]
    pub activate: ActivateConfig,
    #[serde(default)]
    pub deactivate: DeactivateConfig,
    #[serde(default)]
    pub generate: Vec<GenerateInstruction>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ActivateConfig {
    /// 상대 레포지토리 참조 앞에 붙는 접두사 (예: "git@github.com:acme/")
    pub repository_base: Option<String>,
    /// 모듈 작업 디렉토리가 위치할 디렉토리 (루트 기준)
    pub workspace_dir: Option<String>,
    pub handler: Option<HookCommand>,
    #[serde(default)]
    pub handlers: Vec<HookCommand>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct DeactivateConfig {
    pub handler: Option<HookCommand>,
    #[serde(default)]
    pub handlers: Vec<HookCommand>,
}

/// 외부 커맨드로 구현된 훅
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct HookCommand {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// `generate` 명령의 지시 하나
#[derive(Deserialize, Debug, Clone)]
pub struct GenerateInstruction {
    pub name: String,
    /// 모듈 디렉토리 안에서 찾을 파일 후보 (`{status}` 치환 지원), 앞쪽 우선
    pub find: Vec<String>,
    /// 루트 기준 출력 파일
    pub output: String,
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_modules_dir() -> String {
    "modules".to_string()
}

fn default_separator() -> String {
    "\n".to_string()
}

/// handler 단일 지정이 있으면 그것만, 없으면 handlers 목록
pub fn effective_handlers(handler: &Option<HookCommand>, handlers: &[HookCommand]) -> Vec<HookCommand> {
    match handler {
        Some(h) => vec![h.clone()],
        None => handlers.to_vec(),
    }
}

impl SuiteConfig {
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let cfg: Self = toml::from_str(content).context("Failed to parse suitectl.toml")?;
        Ok(cfg)
    }

    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let path = root.join(CONFIG_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content)
    }

    /// `GIT_CLONE_OPTIONS` 환경 변수가 있으면 설정값을 대체
    pub fn clone_options(&self) -> Vec<String> {
        match std::env::var(GIT_CLONE_OPTIONS_ENV) {
            Ok(opts) if !opts.trim().is_empty() => {
                opts.split_whitespace().map(|s| s.to_string()).collect()
            }
            _ => self.git_clone_options.clone(),
        }
    }

    /// 상대 레포지토리 참조를 해석합니다. `://`가 포함된 참조는 그대로 통과.
    pub fn resolve_repository(&self, repository: &str) -> String {
        if repository.contains("://") {
            return repository.to_string();
        }
        match &self.activate.repository_base {
            Some(base) => format!("{}{}", base, repository),
            None => repository.to_string(),
        }
    }

    /// 작업 디렉토리 이름을 절대 경로로 해석합니다.
    pub fn resolve_directory(&self, root: &Path, directory: &str) -> Result<PathBuf> {
        let workspace = self.activate.workspace_dir.as_deref().ok_or_else(|| {
            LifecycleError::ConfigurationMissing(
                "Please configure [activate] workspace_dir in suitectl.toml".to_string(),
            )
        })?;
        Ok(normalize_lexically(&root.join(workspace).join(directory)))
    }

    pub fn modules_path(&self, root: &Path) -> PathBuf {
        root.join(&self.modules_dir)
    }

    pub fn external_paths(&self, root: &Path) -> Vec<PathBuf> {
        self.external_module_dirs.iter().map(|d| root.join(d)).collect()
    }
}

/// 환경 루트 탐색: 명시 경로 → `SUITECTL_ROOT` → 현재 디렉토리부터 상위로 `suitectl.toml` 탐색
pub fn find_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var(ROOT_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let cwd = std::env::current_dir()?;
    find_root_from(&cwd).ok_or_else(|| {
        LifecycleError::ConfigurationMissing(format!(
            "Could not find a {} file from {}, did you create it?",
            CONFIG_FILE,
            cwd.display()
        ))
    })
}

pub fn find_root_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE).is_file())
        .map(|dir| dir.to_path_buf())
}

/// `.`/`..` 컴포넌트를 파일시스템 접근 없이 정리
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
