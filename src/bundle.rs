//! 번들 테이블: `modules/bundles.json`
//!
//! 번들 이름 → 순서가 있는 모듈 목록. `default` 번들의 멤버는 forced 모듈로,
//! 항상 활성이며 비활성화할 수 없습니다.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{LifecycleError, Result};

pub const BUNDLES_FILE: &str = "bundles.json";
pub const DEFAULT_BUNDLE: &str = "default";

/// 요청 토큰 해석 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Module(String),
    Bundle { name: String, members: Vec<String> },
}

impl Target {
    /// 처리할 모듈 이름 (순서 유지)
    pub fn module_names(&self) -> Vec<String> {
        match self {
            Target::Module(name) => vec![name.clone()],
            Target::Bundle { members, .. } => members.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BundleTable {
    bundles: BTreeMap<String, Vec<String>>,
}

impl BundleTable {
    pub fn new(bundles: BTreeMap<String, Vec<String>>) -> Self {
        Self { bundles }
    }

    /// 번들 파일 로드. 파일이 없거나 형식이 잘못되면 빈 테이블 (경고 로그).
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("No bundle file at {}", path.display());
            return Self::default();
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Error reading module bundles {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match Self::parse(&content) {
            Ok(table) => {
                tracing::debug!("Loaded {} bundle(s) from {}", table.bundles.len(), path.display());
                table
            }
            Err(e) => {
                tracing::warn!("Error parsing module bundles {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        let obj = value
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("bundles must be a JSON object"))?;

        let mut bundles = BTreeMap::new();
        for (name, members) in obj {
            let members: Vec<String> = serde_json::from_value(members.clone())
                .map_err(|e| anyhow::anyhow!("bundle '{}': {}", name, e))?;
            bundles.insert(name.clone(), members);
        }
        Ok(Self { bundles })
    }

    /// forced 모듈 목록 (default 번들)
    pub fn forced(&self) -> Vec<String> {
        self.bundles.get(DEFAULT_BUNDLE).cloned().unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.bundles.get(name).map(|m| m.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bundles.keys().map(|k| k.as_str())
    }

    /// 모듈 이름이 우선, 그 다음 번들 이름
    pub fn resolve(&self, token: &str, is_module: impl Fn(&str) -> bool) -> Result<Target> {
        let token = normalize_module_name(token);
        if is_module(token.as_str()) {
            return Ok(Target::Module(token));
        }
        if let Some(members) = self.bundles.get(&token) {
            return Ok(Target::Bundle {
                name: token,
                members: members.clone(),
            });
        }
        Err(LifecycleError::ModuleNotFound(token))
    }
}

/// 공백과 앞뒤 `/` 제거 (쉘 자동완성으로 붙은 `gateway/` 등)
pub fn normalize_module_name(token: &str) -> String {
    token.trim().trim_matches('/').trim().to_string()
}
