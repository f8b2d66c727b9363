//! 라이프사이클 엔진 전용 에러 타입: 에러 종류를 구분하여 CLI가
//! 사람이 읽을 수 있는 메시지와 머신 리더블 코드를 함께 출력할 수 있게 합니다.

use std::path::PathBuf;

/// 모듈 활성화/비활성화 중 발생할 수 있는 에러 유형
#[derive(thiserror::Error, Debug)]
pub enum LifecycleError {
    #[error("Module '{0}' not found (neither a module nor a bundle)")]
    ModuleNotFound(String),

    #[error("Failed to load module descriptor {}: {reason}", .path.display())]
    DescriptorLoad { path: PathBuf, reason: String },

    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    #[error(
        "The directory ({}) we want to delete is not absolute or lies outside of {}. Refusing to go forward.",
        .path.display(),
        .root.display()
    )]
    UnsafeDeletePath { path: PathBuf, root: PathBuf },

    #[error("Command '{command}' failed{}", exit_suffix(.code))]
    ExternalCommandFailure { command: String, code: Option<i32> },

    #[error("Dependency cycle detected: {}", .chain.join(" -> "))]
    DependencyCycle { chain: Vec<String> },

    #[error("Hook '{hook}' failed for module '{module}': {reason}")]
    HookFailed {
        hook: String,
        module: String,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!(" with exit code {}", c),
        None => " (terminated by signal)".to_string(),
    }
}

impl LifecycleError {
    /// 머신 리더블 에러 코드
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ModuleNotFound(_) => "MODULE_NOT_FOUND",
            Self::DescriptorLoad { .. } => "DESCRIPTOR_LOAD_ERROR",
            Self::ConfigurationMissing(_) => "CONFIGURATION_MISSING",
            Self::UnsafeDeletePath { .. } => "UNSAFE_DELETE_PATH",
            Self::ExternalCommandFailure { .. } => "EXTERNAL_COMMAND_FAILURE",
            Self::DependencyCycle { .. } => "DEPENDENCY_CYCLE",
            Self::HookFailed { .. } => "HOOK_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn descriptor_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::DescriptorLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
