use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::HookCommand;
use crate::error::{LifecycleError, Result};

/// 모듈 디스크립터 파일 이름
pub const DESCRIPTOR_FILE: &str = "module.json";

/// 단일 이름 또는 이름 목록 (`"green"` / `["green", "blue"]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NameList {
    One(String),
    Many(Vec<String>),
}

impl Default for NameList {
    fn default() -> Self {
        NameList::Many(Vec::new())
    }
}

impl NameList {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            NameList::One(name) => vec![name.clone()],
            NameList::Many(names) => names.clone(),
        }
    }
}

/// 모듈 디스크립터: module.json을 역직렬화한 것
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// 외부 모듈은 필수, 내부 모듈은 디렉토리 이름으로 채워짐
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// 이 모듈 활성화 전에 비활성화할 모듈 (상호 배타)
    #[serde(default)]
    pub deactivate: NameList,
    #[serde(default)]
    pub repository: Option<String>,
    /// 작업 디렉토리 오버라이드 (기본값: repository의 basename)
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub handler: Option<HookCommand>,
    #[serde(default)]
    pub handlers: Vec<HookCommand>,
}

impl ModuleDescriptor {
    pub fn parse(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// `<dir>/module.json` 로드
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(DESCRIPTOR_FILE);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| LifecycleError::descriptor_load(&path, e))?;
        Self::parse(&content).map_err(|e| LifecycleError::descriptor_load(&path, e))
    }

    pub fn conflicts(&self) -> Vec<String> {
        self.deactivate.to_vec()
    }

    /// 작업 디렉토리 이름: `directory` 우선, 없으면 repository basename (`.git` 제거)
    pub fn working_directory_name(&self) -> Option<String> {
        if let Some(dir) = &self.directory {
            return Some(dir.clone());
        }
        let repo = self.repository.as_deref()?;
        let base = repo
            .trim_end_matches('/')
            .rsplit(|c: char| c == '/' || c == ':')
            .next()
            .unwrap_or(repo);
        let base = base.strip_suffix(".git").unwrap_or(base);
        if base.is_empty() {
            None
        } else {
            Some(base.to_string())
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deactivate_accepts_string_or_list() {
        let single = ModuleDescriptor::parse(r#"{"deactivate": "green"}"#).unwrap();
        assert_eq!(single.conflicts(), vec!["green"]);

        let many = ModuleDescriptor::parse(r#"{"deactivate": ["green", "red"]}"#).unwrap();
        assert_eq!(many.conflicts(), vec!["green", "red"]);

        let none = ModuleDescriptor::parse("{}").unwrap();
        assert!(none.conflicts().is_empty());
    }

    #[test]
    fn test_working_directory_name() {
        let d = ModuleDescriptor::parse(r#"{"repository": "https://git.example.com/acme/gateway.git"}"#)
            .unwrap();
        assert_eq!(d.working_directory_name().as_deref(), Some("gateway"));

        let d = ModuleDescriptor::parse(r#"{"repository": "git@github.com:billing"}"#).unwrap();
        assert_eq!(d.working_directory_name().as_deref(), Some("billing"));

        let d = ModuleDescriptor::parse(r#"{"repository": "x/y", "directory": "custom"}"#).unwrap();
        assert_eq!(d.working_directory_name().as_deref(), Some("custom"));

        let d = ModuleDescriptor::parse("{}").unwrap();
        assert!(d.working_directory_name().is_none());
    }

    #[test]
    fn test_descriptor_with_hooks() {
        let d = ModuleDescriptor::parse(
            r#"{
                "dependencies": ["db"],
                "handlers": [{"command": "./hooks/seed.sh", "args": ["--fast"]}]
            }"#,
        )
        .unwrap();
        assert_eq!(d.dependencies, vec!["db"]);
        assert_eq!(d.handlers[0].command, "./hooks/seed.sh");
    }

    #[test]
    fn test_load_malformed_descriptor() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(DESCRIPTOR_FILE), "{ nope").unwrap();
        let err = ModuleDescriptor::load_from_dir(tmp.path()).unwrap_err();
        assert_eq!(err.error_code(), "DESCRIPTOR_LOAD_ERROR");
    }
}
