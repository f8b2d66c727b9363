//! 모듈 레지스트리
//!
//! 내부 모듈(`modules/*/module.json`)과 외부 디렉토리가 제공하는 모듈
//! (`<dir>/*/.suitectl/module.json`, `<dir>/*/.suitectl/*/module.json`)을
//! 스캔하여 `{name, path, status}` 목록을 제공합니다. 상태는 호출 시점의
//! 활성 목록으로 매번 계산합니다.

pub mod descriptor;

use anyhow::Context;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::active_set::ActiveSetStore;
use crate::error::{LifecycleError, Result};
pub use descriptor::{ModuleDescriptor, NameList, DESCRIPTOR_FILE};

/// 외부 프로젝트 안에서 모듈 디스크립터를 담는 마커 디렉토리
pub const EXTERNAL_MARKER: &str = ".suitectl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    Active,
    Inactive,
}

impl ModuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStatus::Active => "active",
            ModuleStatus::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleSource {
    Internal,
    External,
}

/// 발견된 모듈 (상태 제외)
#[derive(Debug, Clone)]
pub struct DiscoveredModule {
    pub name: String,
    /// module.json이 있는 디렉토리
    pub dir: PathBuf,
    pub source: ModuleSource,
}

/// 목록/조회 응답용 모듈 정보
#[derive(Debug, Clone, Serialize)]
pub struct Module {
    pub name: String,
    pub path: PathBuf,
    pub source: ModuleSource,
    pub status: ModuleStatus,
}

pub struct ModuleRegistry {
    modules_dir: PathBuf,
    external_dirs: Vec<PathBuf>,
    /// 이름순이 아닌 발견 순서 (내부 → 외부로 덮어쓰기)
    discovered: Vec<DiscoveredModule>,
    index: HashMap<String, usize>,
}

impl ModuleRegistry {
    pub fn new(modules_dir: impl Into<PathBuf>, external_dirs: Vec<PathBuf>) -> Self {
        Self {
            modules_dir: modules_dir.into(),
            external_dirs,
            discovered: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// 디스크를 스캔하여 모듈 목록 재구성
    pub fn discover(&mut self) -> Result<usize> {
        self.discovered.clear();
        self.index.clear();

        for module in self.scan_internal()? {
            self.insert(module);
        }

        for dir in self.external_dirs.clone() {
            for module in scan_external(&dir)? {
                if let Some(existing) = self.index.get(&module.name).map(|i| &self.discovered[*i]) {
                    tracing::warn!(
                        "Module '{}' from {} overrides {:?} module at {}",
                        module.name,
                        module.dir.display(),
                        existing.source,
                        existing.dir.display()
                    );
                }
                self.insert(module);
            }
        }

        tracing::debug!("Module discovery complete: {} found", self.discovered.len());
        Ok(self.discovered.len())
    }

    /// 디스크 재스캔 (discover 별칭)
    pub fn refresh(&mut self) -> Result<usize> {
        self.discover()
    }

    fn insert(&mut self, module: DiscoveredModule) {
        match self.index.get(&module.name) {
            Some(&i) => self.discovered[i] = module,
            None => {
                self.index.insert(module.name.clone(), self.discovered.len());
                self.discovered.push(module);
            }
        }
    }

    fn scan_internal(&self) -> Result<Vec<DiscoveredModule>> {
        let mut found = Vec::new();

        if !self.modules_dir.is_dir() {
            tracing::warn!("Modules directory does not exist: {}", self.modules_dir.display());
            return Ok(found);
        }

        let entries = std::fs::read_dir(&self.modules_dir).with_context(|| {
            format!("Failed to read modules directory: {}", self.modules_dir.display())
        })?;

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_dir() || !path.join(DESCRIPTOR_FILE).is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            found.push(DiscoveredModule {
                name,
                dir: path,
                source: ModuleSource::Internal,
            });
        }

        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn find(&self, name: &str) -> Option<&DiscoveredModule> {
        self.index.get(name).map(|&i| &self.discovered[i])
    }

    /// 모듈 목록 (상태는 현재 활성 목록 기준으로 계산)
    pub fn list(&self, active: &ActiveSetStore) -> Vec<Module> {
        self.discovered.iter().map(|m| to_module(m, active)).collect()
    }

    pub fn get(&self, name: &str, active: &ActiveSetStore) -> Result<Module> {
        self.find(name)
            .map(|m| to_module(m, active))
            .ok_or_else(|| LifecycleError::ModuleNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.discovered.iter().map(|m| m.name.clone()).collect()
    }

    /// 디스크립터 로드 (요청 시점마다 새로 읽음)
    pub fn load_descriptor(&self, name: &str) -> Result<ModuleDescriptor> {
        let module = self
            .find(name)
            .ok_or_else(|| LifecycleError::ModuleNotFound(name.to_string()))?;
        let mut descriptor = ModuleDescriptor::load_from_dir(&module.dir)?;
        if module.source == ModuleSource::Internal || descriptor.name.is_none() {
            descriptor.name = Some(module.name.clone());
        }
        Ok(descriptor)
    }

    pub fn modules_dir(&self) -> &Path {
        &self.modules_dir
    }
}

fn to_module(m: &DiscoveredModule, active: &ActiveSetStore) -> Module {
    Module {
        name: m.name.clone(),
        path: m.dir.clone(),
        source: m.source,
        status: if active.contains(&m.name) {
            ModuleStatus::Active
        } else {
            ModuleStatus::Inactive
        },
    }
}

/// 외부 디렉토리 스캔: 단일 모듈 프로젝트와 다중 모듈 프로젝트 모두 지원
fn scan_external(dir: &Path) -> Result<Vec<DiscoveredModule>> {
    let mut found = Vec::new();

    if !dir.is_dir() {
        tracing::warn!("External module directory does not exist: {}", dir.display());
        return Ok(found);
    }

    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let patterns = [
        format!("{}/*/{}/{}", base, EXTERNAL_MARKER, DESCRIPTOR_FILE),
        format!("{}/*/{}/*/{}", base, EXTERNAL_MARKER, DESCRIPTOR_FILE),
    ];

    for pattern in &patterns {
        let paths = glob::glob(pattern)
            .map_err(|e| anyhow::anyhow!("Invalid glob pattern {}: {}", pattern, e))?;

        for entry in paths {
            let file = match entry {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", e.path().display(), e);
                    continue;
                }
            };
            let module_dir = match file.parent() {
                Some(p) => p.to_path_buf(),
                None => continue,
            };

            match ModuleDescriptor::load_from_dir(&module_dir) {
                Ok(ModuleDescriptor { name: Some(name), .. }) => {
                    tracing::debug!("Discovered external module '{}' at {}", name, module_dir.display());
                    found.push(DiscoveredModule {
                        name,
                        dir: module_dir,
                        source: ModuleSource::External,
                    });
                }
                Ok(_) => {
                    tracing::warn!("External module at {} has no name, skipping", file.display());
                }
                Err(e) => {
                    tracing::warn!("Failed to load external module {}: {}", file.display(), e);
                }
            }
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_module(dir: &Path, body: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(DESCRIPTOR_FILE), body).unwrap();
    }

    #[test]
    fn test_discover_internal_modules() {
        let tmp = tempfile::tempdir().unwrap();
        let modules = tmp.path().join("modules");
        write_module(&modules.join("gateway"), "{}");
        write_module(&modules.join("db"), "{}");
        fs::create_dir_all(modules.join("not-a-module")).unwrap();

        let mut registry = ModuleRegistry::new(&modules, vec![]);
        assert_eq!(registry.discover().unwrap(), 2);
        assert_eq!(registry.names(), vec!["db", "gateway"]);
        assert!(!registry.contains("not-a-module"));
    }

    #[test]
    fn test_missing_modules_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let mut registry = ModuleRegistry::new(tmp.path().join("nope"), vec![]);
        assert_eq!(registry.discover().unwrap(), 0);
    }

    #[test]
    fn test_discover_external_single_and_multi() {
        let tmp = tempfile::tempdir().unwrap();
        let services = tmp.path().join("services");
        write_module(
            &services.join("billing").join(EXTERNAL_MARKER),
            r#"{"name": "billing"}"#,
        );
        write_module(
            &services.join("search").join(EXTERNAL_MARKER).join("indexer"),
            r#"{"name": "search-indexer"}"#,
        );
        write_module(
            &services.join("search").join(EXTERNAL_MARKER).join("api"),
            r#"{"name": "search-api"}"#,
        );
        write_module(
            &services.join("broken").join(EXTERNAL_MARKER),
            r#"{"description": "no name"}"#,
        );

        let mut registry = ModuleRegistry::new(tmp.path().join("modules"), vec![services]);
        registry.discover().unwrap();

        let mut names = registry.names();
        names.sort();
        assert_eq!(names, vec!["billing", "search-api", "search-indexer"]);
        assert_eq!(registry.find("billing").unwrap().source, ModuleSource::External);
    }

    #[test]
    fn test_external_overrides_internal() {
        let tmp = tempfile::tempdir().unwrap();
        let modules = tmp.path().join("modules");
        let services = tmp.path().join("services");
        write_module(&modules.join("billing"), "{}");
        write_module(
            &services.join("billing-svc").join(EXTERNAL_MARKER),
            r#"{"name": "billing"}"#,
        );

        let mut registry = ModuleRegistry::new(&modules, vec![services.clone()]);
        registry.discover().unwrap();

        assert_eq!(registry.names(), vec!["billing"]);
        let found = registry.find("billing").unwrap();
        assert_eq!(found.source, ModuleSource::External);
        assert!(found.dir.starts_with(&services));
    }

    #[test]
    fn test_status_reflects_current_active_set() {
        let tmp = tempfile::tempdir().unwrap();
        let modules = tmp.path().join("modules");
        write_module(&modules.join("gateway"), "{}");

        let mut registry = ModuleRegistry::new(&modules, vec![]);
        registry.discover().unwrap();

        let mut active = ActiveSetStore::new(modules.join(".active"), vec![]);
        assert_eq!(
            registry.get("gateway", &active).unwrap().status,
            ModuleStatus::Inactive
        );

        active.insert("gateway");
        assert_eq!(registry.list(&active)[0].status, ModuleStatus::Active);
    }

    #[test]
    fn test_get_unknown_module() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = ModuleRegistry::new(tmp.path(), vec![]);
        let active = ActiveSetStore::new(tmp.path().join(".active"), vec![]);
        assert!(matches!(
            registry.get("ghost", &active),
            Err(LifecycleError::ModuleNotFound(_))
        ));
    }

    #[test]
    fn test_load_descriptor_fills_internal_name() {
        let tmp = tempfile::tempdir().unwrap();
        let modules = tmp.path().join("modules");
        write_module(&modules.join("gateway"), r#"{"name": "ignored", "dependencies": ["db"]}"#);

        let mut registry = ModuleRegistry::new(&modules, vec![]);
        registry.discover().unwrap();

        let descriptor = registry.load_descriptor("gateway").unwrap();
        assert_eq!(descriptor.name.as_deref(), Some("gateway"));
        assert_eq!(descriptor.dependencies, vec!["db"]);
    }
}
