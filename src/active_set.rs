//! 활성 모듈 저장소: `modules/.active` 파일 관리
//!
//! 파일에는 한 줄에 모듈 이름 하나가 기록됩니다. 읽을 때는 빈 줄과 `#` 주석 줄을
//! 무시하고, forced 모듈(default 번들)은 항상 활성으로 간주하되 파일에는 절대
//! 기록하지 않습니다.

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

/// 활성 파일 이름 (모듈 디렉토리 기준)
pub const ACTIVE_FILE: &str = ".active";

pub struct ActiveSetStore {
    file_path: PathBuf,
    forced: Vec<String>,
    /// forced 모듈이 앞쪽에 오는 삽입 순서 목록
    active: Vec<String>,
}

/// 활성 파일 내용 파싱 (주석/빈 줄 제거, 앞뒤 공백 제거)
pub fn parse_active_lines(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if !names.iter().any(|n| n == trimmed) {
            names.push(trimmed.to_string());
        }
    }
    names
}

impl ActiveSetStore {
    pub fn new(file_path: impl Into<PathBuf>, forced: Vec<String>) -> Self {
        let active = forced.clone();
        Self {
            file_path: file_path.into(),
            forced,
            active,
        }
    }

    /// 파일에서 활성 목록 로드. 파일이 없거나 읽을 수 없으면 forced 모듈만 활성.
    pub fn load(&mut self) {
        self.active = self.forced.clone();

        if !self.file_path.exists() {
            tracing::debug!(
                "Active module file {} does not exist, only forced modules are active",
                self.file_path.display()
            );
            return;
        }

        let content = match fs::read_to_string(&self.file_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    "Failed to read {}: {}, only forced modules are active",
                    self.file_path.display(),
                    e
                );
                return;
            }
        };
        for name in parse_active_lines(&content) {
            if !self.active.contains(&name) {
                self.active.push(name);
            }
        }
        tracing::debug!("Loaded active set: {} module(s)", self.active.len());
    }

    /// 현재 활성 목록을 파일로 기록. forced 모듈은 제외.
    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let mut content = String::new();
        for name in self.persisted_names() {
            content.push_str(name);
            content.push('\n');
        }

        fs::write(&self.file_path, content)
            .with_context(|| format!("Failed to write {}", self.file_path.display()))?;
        tracing::debug!("Saved active set to {}", self.file_path.display());
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.active.iter().any(|n| n == name)
    }

    pub fn is_forced(&self, name: &str) -> bool {
        self.forced.iter().any(|n| n == name)
    }

    /// 추가되면 true, 이미 있었으면 false
    pub fn insert(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.active.push(name.to_string());
        true
    }

    /// forced 모듈은 제거할 수 없음. 실제로 제거되면 true.
    pub fn remove(&mut self, name: &str) -> bool {
        if self.is_forced(name) {
            return false;
        }
        let before = self.active.len();
        self.active.retain(|n| n != name);
        self.active.len() != before
    }

    pub fn names(&self) -> &[String] {
        &self.active
    }

    pub fn forced(&self) -> &[String] {
        &self.forced
    }

    /// 파일에 기록될 이름 (forced 제외)
    pub fn persisted_names(&self) -> impl Iterator<Item = &str> {
        self.active
            .iter()
            .filter(move |n| !self.is_forced(n))
            .map(|n| n.as_str())
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forced(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_filters_comments_and_blanks() {
        let names = parse_active_lines("# note\n\nmodA\n");
        assert_eq!(names, vec!["modA"]);

        let names = parse_active_lines("  # indented comment\n  api  \n\napi\ndb");
        assert_eq!(names, vec!["api", "db"]);
    }

    #[test]
    fn test_missing_file_yields_forced_only() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ActiveSetStore::new(tmp.path().join(ACTIVE_FILE), forced(&["f"]));
        store.load();
        assert_eq!(store.names(), &["f".to_string()]);
    }

    #[test]
    fn test_round_trip_excludes_forced() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(ACTIVE_FILE);

        let mut store = ActiveSetStore::new(&path, forced(&["f"]));
        store.load();
        assert!(store.insert("a"));
        assert!(store.insert("b"));
        store.save().unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "a\nb\n");

        let mut reloaded = ActiveSetStore::new(&path, forced(&["f"]));
        reloaded.load();
        let mut names = reloaded.names().to_vec();
        names.sort();
        assert_eq!(names, vec!["a", "b", "f"]);
    }

    #[test]
    fn test_forced_listed_in_file_is_not_duplicated() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(ACTIVE_FILE);
        fs::write(&path, "f\na\n").unwrap();

        let mut store = ActiveSetStore::new(&path, forced(&["f"]));
        store.load();
        assert_eq!(store.names(), &["f".to_string(), "a".to_string()]);

        store.save().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\n");
    }

    #[test]
    fn test_insert_and_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ActiveSetStore::new(tmp.path().join(ACTIVE_FILE), forced(&["f"]));

        assert!(store.insert("a"));
        assert!(!store.insert("a"));
        assert!(store.contains("a"));

        assert!(!store.remove("f"), "forced modules can't be removed");
        assert!(store.contains("f"));

        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        assert!(!store.contains("a"));
    }

    #[test]
    fn test_unreadable_file_yields_forced_only() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(ACTIVE_FILE);
        // 디렉토리는 read_to_string이 실패함
        fs::create_dir_all(&path).unwrap();

        let mut store = ActiveSetStore::new(&path, forced(&["f"]));
        store.load();
        assert_eq!(store.names(), &["f".to_string()]);
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("modules").join(ACTIVE_FILE);
        let mut store = ActiveSetStore::new(&path, Vec::new());
        store.insert("x");
        store.save().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "x\n");
    }
}
